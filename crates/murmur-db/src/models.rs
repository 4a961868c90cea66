//! Database row types. These map directly to SQLite rows and are kept
//! distinct from the murmur-types API views so the store stays independent
//! of the wire format.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: Option<String>,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub birthday: Option<String>,
    pub avatar: Option<String>,
    pub is_verified: bool,
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct UserSummaryRow {
    pub id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub avatar: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub birthday: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AvatarRow {
    pub id: String,
    pub url: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub id: String,
    pub author_id: String,
    pub author: Option<String>,
    pub author_avatar: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub content: String,
    pub image: Option<String>,
    pub video: Option<String>,
}

/// Fields an owner may change. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct PostEdit {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub video: Option<String>,
}

/// A post together with its like and comment counts.
#[derive(Debug, Clone)]
pub struct PostRow {
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
    pub created_at: String,
    pub updated_at: String,
    pub like_count: i64,
    pub comment_count: i64,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub username: Option<String>,
    pub user_avatar: Option<String>,
    pub content: String,
    pub is_edited: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct FollowRow {
    pub user: UserSummaryRow,
    pub followed_at: String,
}

#[derive(Debug, Clone)]
pub struct ReportRow {
    pub id: String,
    pub reporter_id: String,
    pub target_id: String,
    pub target_type: String,
    pub reason: String,
    pub description: Option<String>,
    pub status: String,
    pub target_exists: bool,
    pub created_at: String,
    pub updated_at: String,
}
