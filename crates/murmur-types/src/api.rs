use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ReportStatus, ReportTarget};

// -- JWT Claims --

/// Claims carried by the session cookie. Only the user id and expiry:
/// everything else about the viewer is looked up per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupProfileRequest {
    pub avatar: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub birthday: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAvatarRequest {
    pub avatar_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserView,
}

/// Full account representation. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: Option<String>,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub birthday: Option<String>,
    pub avatar: Option<String>,
    pub is_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub user: UserView,
    pub total_posts: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub is_allowed: bool,
    pub is_me: bool,
    pub is_following: bool,
}

/// Public subset of a user, used in search results and follow lists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarView {
    pub id: String,
    pub url: String,
    pub label: Option<String>,
}

// -- Posts --

#[derive(Debug, Default, Deserialize)]
pub struct PostRequest {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub video: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// A post enriched with counts and viewer-relative flags. Every field is
/// always present; anonymous viewers get `false` for all three flags.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub author_id: String,
    pub author: Option<String>,
    pub author_avatar: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub content: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub like_count: i64,
    pub comment_count: i64,
    pub is_liked: bool,
    pub is_me: bool,
    pub is_saved: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub is_allowed: bool,
    pub posts: Vec<PostView>,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SinglePostResponse {
    pub is_allowed: bool,
    pub post: PostView,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub message: String,
    pub post: PostView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeCountResponse {
    pub like_count: i64,
}

#[derive(Debug, Serialize)]
pub struct SaveToggleResponse {
    pub message: String,
    pub saved: bool,
}

// -- Comments --

#[derive(Debug, Default, Deserialize)]
pub struct CommentRequest {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub username: Option<String>,
    pub user_avatar: Option<String>,
    pub content: String,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_me: bool,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub message: String,
    pub comment: CommentView,
}

// -- Follows --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowToggleRequest {
    pub user_id_to_follow: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FollowToggleResponse {
    pub message: String,
    pub following: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUserView {
    #[serde(flatten)]
    pub user: UserSummary,
    pub follow_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowersResponse {
    pub followers_count: usize,
    pub followers: Vec<FollowUserView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowingResponse {
    pub following_count: usize,
    pub following: Vec<FollowUserView>,
}

// -- Search --

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub users_results: usize,
    pub users: Vec<UserSummary>,
    pub posts_results: usize,
    pub posts: Vec<PostView>,
}

// -- Reports --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub target_id: Option<String>,
    pub target_type: Option<String>,
    pub reason: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReportStatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    pub id: String,
    pub reporter_id: String,
    pub target_id: String,
    pub target_type: ReportTarget,
    pub reason: String,
    pub description: Option<String>,
    pub status: ReportStatus,
    /// False once the reported user or post has been deleted.
    pub target_exists: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub message: String,
    pub report: ReportView,
}

// -- Generic --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
