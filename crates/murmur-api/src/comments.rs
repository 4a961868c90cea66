use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::info;

use murmur_db::models::CommentRow;
use murmur_db::{Database, DbError, new_id, now_timestamp};
use murmur_types::api::{CommentRequest, CommentResponse, CommentView, MessageResponse};

use crate::error::{ApiError, ApiResult};
use crate::guard::check_ownership;
use crate::state::{AppState, blocking};
use crate::viewer::{MaybeViewer, Viewer};
use crate::views::{comment_view, present};

fn find_comment(db: &Database, id: &str) -> Result<CommentRow, ApiError> {
    db.get_comment(id)?
        .ok_or_else(|| ApiError::not_found("Comment not found"))
}

fn require_content(content: Option<String>) -> Result<String, ApiError> {
    present(content).ok_or_else(|| ApiError::validation("Comment content is required"))
}

/// Comments on a post, newest first.
pub async fn list_comments(
    State(state): State<AppState>,
    viewer: MaybeViewer,
    Path(post_id): Path<String>,
) -> ApiResult<Json<Vec<CommentView>>> {
    let rows = blocking(&state, move |s| {
        if s.db.get_post(&post_id)?.is_none() {
            return Err(ApiError::not_found("Post not found"));
        }
        Ok(s.db.list_comments(&post_id)?)
    })
    .await?;

    let viewer_id = viewer.id();
    Ok(Json(
        rows.into_iter()
            .map(|row| comment_view(row, viewer_id))
            .collect(),
    ))
}

pub async fn add_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentResponse>)> {
    let content = require_content(req.content)?;
    let now = now_timestamp();
    let row = CommentRow {
        id: new_id(),
        post_id,
        user_id: viewer.id.clone(),
        username: viewer.username,
        user_avatar: viewer.avatar,
        content,
        is_edited: false,
        created_at: now.clone(),
        updated_at: now,
    };

    let stored = row.clone();
    blocking(&state, move |s| {
        s.db.create_comment(&stored).map_err(|e| match e {
            DbError::MissingReference(_) => ApiError::not_found("Post not found"),
            other => other.into(),
        })
    })
    .await?;

    info!("Comment {} added to post {}", row.id, row.post_id);
    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            message: "Comment added successfully".into(),
            comment: comment_view(row, Some(&viewer.id)),
        }),
    ))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(comment_id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<CommentResponse>> {
    let content = require_content(req.content)?;
    let viewer_id = viewer.id.clone();

    let row = blocking(&state, move |s| {
        let existing = find_comment(&s.db, &comment_id)?;
        check_ownership(&viewer_id, &existing.user_id)?;
        s.db
            .edit_comment(&comment_id, &content)?
            .ok_or_else(|| ApiError::not_found("Comment not found"))
    })
    .await?;

    Ok(Json(CommentResponse {
        message: "Comment updated successfully".into(),
        comment: comment_view(row, Some(&viewer.id)),
    }))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(comment_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    blocking(&state, move |s| {
        let existing = find_comment(&s.db, &comment_id)?;
        check_ownership(&viewer.id, &existing.user_id)?;
        if !s.db.delete_comment(&comment_id)? {
            return Err(ApiError::not_found("Comment not found"));
        }
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse {
        message: "Comment deleted successfully".into(),
    }))
}
