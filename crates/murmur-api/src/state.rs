use std::sync::Arc;

use tracing::error;

use murmur_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    /// Mark the session cookie `Secure`. Off for plain-HTTP development.
    pub secure_cookies: bool,
}

impl AppStateInner {
    pub fn new(db: Database, auth: AuthSettings) -> AppState {
        Arc::new(Self { db, auth })
    }
}

/// Runs store work off the async runtime. Every handler funnels its
/// SQLite calls (and password hashing) through here.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal("background task failed".into())
        })?
}
