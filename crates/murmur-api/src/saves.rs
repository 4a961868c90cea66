use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use murmur_db::{FeedPage, RelationKind, Toggle};
use murmur_types::api::{FeedResponse, PageQuery, SaveToggleResponse};

use crate::error::ApiResult;
use crate::feed::{self, FeedKind};
use crate::relations;
use crate::state::{AppState, blocking};
use crate::viewer::Viewer;

/// Saves the post for the viewer, or unsaves it if already saved.
pub async fn toggle_save(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<String>,
) -> ApiResult<(StatusCode, Json<SaveToggleResponse>)> {
    let outcome = blocking(&state, move |s| {
        relations::toggle(&s.db, RelationKind::Save, &viewer.id, &post_id)
    })
    .await?;

    Ok(match outcome {
        Toggle::Created => (
            StatusCode::CREATED,
            Json(SaveToggleResponse {
                message: "Post saved".into(),
                saved: true,
            }),
        ),
        Toggle::Deleted => (
            StatusCode::OK,
            Json(SaveToggleResponse {
                message: "Post unsaved".into(),
                saved: false,
            }),
        ),
    })
}

pub async fn saved_posts(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<FeedResponse>> {
    let page = FeedPage::parse(q.page.as_deref());
    Ok(Json(feed::compose(&state, FeedKind::Saved, page, Some(viewer.id)).await?))
}
