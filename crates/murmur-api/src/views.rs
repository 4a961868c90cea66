//! Row → view conversions. Views are always fully populated; corrupt
//! stored values are logged and replaced rather than failing the request.

use chrono::{DateTime, Utc};
use tracing::warn;

use murmur_db::models::{AvatarRow, CommentRow, FollowRow, PostRow, ReportRow, UserRow, UserSummaryRow};
use murmur_types::api::{
    AvatarView, CommentView, FollowUserView, PostView, ReportView, UserSummary, UserView,
};
use murmur_types::models::{ReportStatus, ReportTarget};

/// Trimmed, non-empty value of an optional request field.
pub(crate) fn present(field: Option<String>) -> Option<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn parse_timestamp(raw: &str, owner: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by the sqlite CLI use datetime('now'): no timezone
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on '{}': {}", raw, owner, e);
            DateTime::default()
        })
}

pub(crate) fn user_view(row: &UserRow) -> UserView {
    UserView {
        id: row.id.clone(),
        username: row.username.clone(),
        email: row.email.clone(),
        first_name: row.first_name.clone(),
        last_name: row.last_name.clone(),
        bio: row.bio.clone(),
        birthday: row.birthday.clone(),
        avatar: row.avatar.clone(),
        is_verified: row.is_verified,
        last_login: row.last_login.as_deref().map(|ts| parse_timestamp(ts, &row.id)),
        created_at: parse_timestamp(&row.created_at, &row.id),
    }
}

pub(crate) fn user_summary(row: UserSummaryRow) -> UserSummary {
    UserSummary {
        id: row.id,
        username: row.username,
        first_name: row.first_name,
        last_name: row.last_name,
        avatar: row.avatar,
    }
}

pub(crate) fn follow_view(row: FollowRow) -> FollowUserView {
    let follow_date = parse_timestamp(&row.followed_at, &row.user.id);
    FollowUserView {
        user: user_summary(row.user),
        follow_date,
    }
}

pub(crate) fn avatar_view(row: AvatarRow) -> AvatarView {
    AvatarView {
        id: row.id,
        url: row.url,
        label: row.label,
    }
}

/// Viewer-relative flags for one post. All false for anonymous viewers.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PostFlags {
    pub is_liked: bool,
    pub is_me: bool,
    pub is_saved: bool,
}

pub(crate) fn post_view(row: PostRow, flags: PostFlags) -> PostView {
    let created_at = parse_timestamp(&row.created_at, &row.id);
    let updated_at = parse_timestamp(&row.updated_at, &row.id);
    PostView {
        id: row.id,
        author_id: row.author_id,
        author: row.author,
        author_avatar: row.author_avatar,
        title: row.title,
        subtitle: row.subtitle,
        content: row.content,
        image: row.image,
        video: row.video,
        is_edited: row.is_edited,
        created_at,
        updated_at,
        like_count: row.like_count,
        comment_count: row.comment_count,
        is_liked: flags.is_liked,
        is_me: flags.is_me,
        is_saved: flags.is_saved,
    }
}

pub(crate) fn comment_view(row: CommentRow, viewer_id: Option<&str>) -> CommentView {
    let created_at = parse_timestamp(&row.created_at, &row.id);
    let updated_at = parse_timestamp(&row.updated_at, &row.id);
    let is_me = viewer_id == Some(row.user_id.as_str());
    CommentView {
        id: row.id,
        post_id: row.post_id,
        user_id: row.user_id,
        username: row.username,
        user_avatar: row.user_avatar,
        content: row.content,
        is_edited: row.is_edited,
        created_at,
        updated_at,
        is_me,
    }
}

pub(crate) fn report_view(row: ReportRow) -> ReportView {
    let target_type = row.target_type.parse::<ReportTarget>().unwrap_or_else(|e| {
        warn!("Corrupt target_type on report '{}': {}", row.id, e);
        ReportTarget::Post
    });
    let status = row.status.parse::<ReportStatus>().unwrap_or_else(|e| {
        warn!("Corrupt status on report '{}': {}", row.id, e);
        ReportStatus::default()
    });
    let created_at = parse_timestamp(&row.created_at, &row.id);
    let updated_at = parse_timestamp(&row.updated_at, &row.id);
    ReportView {
        id: row.id,
        reporter_id: row.reporter_id,
        target_id: row.target_id,
        target_type,
        reason: row.reason,
        description: row.description,
        status,
        target_exists: row.target_exists,
        created_at,
        updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_stored_and_legacy_timestamps() {
        let ts = parse_timestamp("2024-03-01T10:20:30.123456Z", "x");
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 3, 1));
        assert_eq!(ts.nanosecond(), 123_456_000);

        let legacy = parse_timestamp("2024-03-01 10:20:30", "x");
        assert_eq!(legacy.hour(), 10);
    }

    #[test]
    fn blank_fields_are_absent() {
        assert_eq!(present(Some("  ".into())), None);
        assert_eq!(present(Some(" bob ".into())), Some("bob".into()));
        assert_eq!(present(None), None);
    }

    #[test]
    fn corrupt_timestamp_falls_back_to_epoch() {
        assert_eq!(parse_timestamp("yesterday", "x"), DateTime::<Utc>::default());
    }

    #[test]
    fn comment_is_me_only_for_its_author() {
        let row = CommentRow {
            id: "c1".into(),
            post_id: "p1".into(),
            user_id: "u1".into(),
            username: None,
            user_avatar: None,
            content: "hi".into(),
            is_edited: false,
            created_at: "2024-01-01T00:00:00.000000Z".into(),
            updated_at: "2024-01-01T00:00:00.000000Z".into(),
        };
        assert!(comment_view(row.clone(), Some("u1")).is_me);
        assert!(!comment_view(row.clone(), Some("u2")).is_me);
        assert!(!comment_view(row, None).is_me);
    }
}
