use axum::Json;
use axum::extract::{Path, State};

use murmur_db::{RelationKind, Toggle};
use murmur_types::api::{FollowToggleRequest, FollowToggleResponse, FollowersResponse, FollowingResponse};

use crate::error::{ApiError, ApiResult};
use crate::relations;
use crate::state::{AppState, blocking};
use crate::viewer::Viewer;
use crate::views::{follow_view, present};

pub async fn toggle_follow(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(req): Json<FollowToggleRequest>,
) -> ApiResult<Json<FollowToggleResponse>> {
    let Some(target) = present(req.user_id_to_follow) else {
        return Err(ApiError::validation("userIdToFollow is required"));
    };

    let outcome = blocking(&state, move |s| {
        relations::toggle(&s.db, RelationKind::Follow, &viewer.id, &target)
    })
    .await?;

    let following = outcome == Toggle::Created;
    let message = if following {
        "User followed successfully"
    } else {
        "User unfollowed successfully"
    };

    Ok(Json(FollowToggleResponse {
        message: message.into(),
        following,
    }))
}

pub async fn followers(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<FollowersResponse>> {
    let rows = blocking(&state, move |s| {
        if !s.db.user_exists(&user_id)? {
            return Err(ApiError::not_found("User not found"));
        }
        Ok(s.db.list_followers(&user_id)?)
    })
    .await?;

    let followers: Vec<_> = rows.into_iter().map(follow_view).collect();
    Ok(Json(FollowersResponse {
        followers_count: followers.len(),
        followers,
    }))
}

pub async fn following(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<FollowingResponse>> {
    let rows = blocking(&state, move |s| {
        if !s.db.user_exists(&user_id)? {
            return Err(ApiError::not_found("User not found"));
        }
        Ok(s.db.list_following(&user_id)?)
    })
    .await?;

    let following: Vec<_> = rows.into_iter().map(follow_view).collect();
    Ok(Json(FollowingResponse {
        following_count: following.len(),
        following,
    }))
}
