//! HTTP layer: extractors, handlers and the router.

pub mod auth;
pub mod comments;
pub mod error;
pub mod feed;
pub mod follows;
pub mod guard;
pub mod posts;
pub mod relations;
pub mod reports;
pub mod routes;
pub mod saves;
pub mod search;
pub mod state;
pub mod viewer;
pub mod views;

pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::{AppState, AppStateInner, AuthSettings};
