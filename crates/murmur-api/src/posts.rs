use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tracing::info;

use murmur_db::models::{NewPost, PostEdit, PostRow};
use murmur_db::{Database, FeedPage, RelationKind, new_id};
use murmur_types::api::{
    FeedResponse, LikeCountResponse, MessageResponse, PageQuery, PostRequest, PostResponse, PostView,
    SinglePostResponse,
};

use crate::error::{ApiError, ApiResult};
use crate::feed::{self, FeedKind, annotate};
use crate::guard::check_ownership;
use crate::relations;
use crate::state::{AppState, blocking};
use crate::viewer::{MaybeViewer, Viewer};
use crate::views::present;

fn find_post(db: &Database, id: &str) -> Result<PostRow, ApiError> {
    db.get_post(id)?
        .ok_or_else(|| ApiError::not_found("Post not found"))
}

fn single_view(db: &Database, row: PostRow, viewer_id: &str) -> Result<PostView, ApiError> {
    annotate(db, vec![row], Some(viewer_id))?
        .pop()
        .ok_or_else(|| ApiError::Internal("annotation dropped a post".into()))
}

pub async fn create_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(req): Json<PostRequest>,
) -> ApiResult<(StatusCode, Json<PostResponse>)> {
    let (Some(title), Some(content)) = (present(req.title), present(req.content)) else {
        return Err(ApiError::validation("Title and content are required"));
    };

    let new = NewPost {
        id: new_id(),
        author_id: viewer.id.clone(),
        author: viewer.username.clone(),
        author_avatar: viewer.avatar.clone(),
        title,
        subtitle: present(req.subtitle),
        content,
        image: present(req.image),
        video: present(req.video),
    };

    let post = blocking(&state, move |s| {
        let row = s.db.create_post(&new)?;
        single_view(&s.db, row, &viewer.id)
    })
    .await?;

    info!("Post {} created by {}", post.id, post.author_id);
    Ok((
        StatusCode::CREATED,
        Json(PostResponse {
            message: "Post created successfully".into(),
            post,
        }),
    ))
}

pub async fn all_posts(
    State(state): State<AppState>,
    viewer: MaybeViewer,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<FeedResponse>> {
    let page = FeedPage::parse(q.page.as_deref());
    let viewer_id = viewer.id().map(str::to_string);
    Ok(Json(feed::compose(&state, FeedKind::All, page, viewer_id).await?))
}

pub async fn latest_posts(
    State(state): State<AppState>,
    viewer: MaybeViewer,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<FeedResponse>> {
    let page = FeedPage::parse(q.page.as_deref());
    let viewer_id = viewer.id().map(str::to_string);
    Ok(Json(feed::compose(&state, FeedKind::Latest, page, viewer_id).await?))
}

pub async fn most_liked_posts(
    State(state): State<AppState>,
    viewer: MaybeViewer,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<FeedResponse>> {
    let page = FeedPage::parse(q.page.as_deref());
    let viewer_id = viewer.id().map(str::to_string);
    Ok(Json(feed::compose(&state, FeedKind::MostLiked, page, viewer_id).await?))
}

pub async fn author_posts(
    State(state): State<AppState>,
    viewer: MaybeViewer,
    Path(user_id): Path<String>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<FeedResponse>> {
    let page = FeedPage::parse(q.page.as_deref());
    let viewer_id = viewer.id().map(str::to_string);
    Ok(Json(
        feed::compose(&state, FeedKind::ByAuthor(user_id), page, viewer_id).await?,
    ))
}

pub async fn my_posts(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<FeedResponse>> {
    let page = FeedPage::parse(q.page.as_deref());
    Ok(Json(feed::compose(&state, FeedKind::Mine, page, Some(viewer.id)).await?))
}

pub async fn get_post(
    State(state): State<AppState>,
    viewer: MaybeViewer,
    Path(post_id): Path<String>,
) -> ApiResult<Json<SinglePostResponse>> {
    let viewer_id = viewer.id().map(str::to_string);
    Ok(Json(feed::single(&state, post_id, viewer_id).await?))
}

pub async fn edit_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<String>,
    Json(req): Json<PostRequest>,
) -> ApiResult<Json<PostResponse>> {
    let edit = PostEdit {
        title: present(req.title),
        subtitle: present(req.subtitle),
        content: present(req.content),
        image: present(req.image),
        video: present(req.video),
    };

    let post = blocking(&state, move |s| {
        let existing = find_post(&s.db, &post_id)?;
        check_ownership(&viewer.id, &existing.author_id)?;
        let row = s
            .db
            .edit_post(&post_id, &edit)?
            .ok_or_else(|| ApiError::not_found("Post not found"))?;
        single_view(&s.db, row, &viewer.id)
    })
    .await?;

    Ok(Json(PostResponse {
        message: "Post updated successfully".into(),
        post,
    }))
}

pub async fn delete_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    blocking(&state, move |s| {
        let existing = find_post(&s.db, &post_id)?;
        check_ownership(&viewer.id, &existing.author_id)?;
        if !s.db.delete_post(&post_id)? {
            return Err(ApiError::not_found("Post not found"));
        }
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse {
        message: "Post deleted successfully".into(),
    }))
}

pub async fn like_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<String>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    blocking(&state, move |s| {
        relations::create(
            &s.db,
            RelationKind::Like,
            &viewer.id,
            &post_id,
            "You have already liked this post",
        )
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Post liked successfully".into(),
        }),
    ))
}

pub async fn unlike_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    blocking(&state, move |s| {
        relations::remove(
            &s.db,
            RelationKind::Like,
            &viewer.id,
            &post_id,
            "You haven't liked this post yet",
        )
    })
    .await?;

    Ok(Json(MessageResponse {
        message: "Post unliked successfully".into(),
    }))
}

pub async fn post_likes(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<LikeCountResponse>> {
    let post = blocking(&state, move |s| find_post(&s.db, &post_id)).await?;
    Ok(Json(LikeCountResponse {
        like_count: post.like_count,
    }))
}
