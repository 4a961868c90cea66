use murmur_db::models::PostRow;
use murmur_db::{Database, FeedFilter, FeedOrder, FeedPage, RelationKind};
use murmur_types::api::{FeedResponse, PostView, SinglePostResponse};

use crate::error::ApiError;
use crate::state::{AppState, blocking};
use crate::views::{PostFlags, post_view};

/// The feed variants the API serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedKind {
    All,
    Latest,
    MostLiked,
    ByAuthor(String),
    /// Posts the viewer saved.
    Saved,
    /// Posts the viewer wrote.
    Mine,
}

impl FeedKind {
    fn plan(&self, viewer_id: Option<&str>) -> Result<(FeedFilter, FeedOrder), ApiError> {
        let needs_viewer = || {
            viewer_id
                .map(str::to_string)
                .ok_or_else(|| ApiError::Unauthorized("No token provided".into()))
        };

        Ok(match self {
            FeedKind::All => (FeedFilter::All, FeedOrder::Insertion),
            FeedKind::Latest => (FeedFilter::All, FeedOrder::Newest),
            FeedKind::MostLiked => (FeedFilter::All, FeedOrder::MostLiked),
            FeedKind::ByAuthor(id) => (FeedFilter::Author(id.clone()), FeedOrder::Insertion),
            FeedKind::Saved => (FeedFilter::SavedBy(needs_viewer()?), FeedOrder::Insertion),
            FeedKind::Mine => (FeedFilter::Author(needs_viewer()?), FeedOrder::Insertion),
        })
    }
}

/// Builds one page of a feed: select, count, sort and paginate in the
/// store, then attach the viewer's flags.
pub async fn compose(
    state: &AppState,
    kind: FeedKind,
    page: FeedPage,
    viewer_id: Option<String>,
) -> Result<FeedResponse, ApiError> {
    let (filter, order) = kind.plan(viewer_id.as_deref())?;
    let is_allowed = viewer_id.is_some();

    let posts = blocking(state, move |s| {
        let rows = s.db.feed(&filter, order, page)?;
        annotate(&s.db, rows, viewer_id.as_deref())
    })
    .await?;

    Ok(FeedResponse {
        is_allowed,
        posts,
        page: page.page,
        limit: page.limit,
    })
}

/// A single post with counts and viewer flags.
pub async fn single(
    state: &AppState,
    post_id: String,
    viewer_id: Option<String>,
) -> Result<SinglePostResponse, ApiError> {
    let is_allowed = viewer_id.is_some();
    let post = blocking(state, move |s| {
        let row = s
            .db
            .get_post(&post_id)?
            .ok_or_else(|| ApiError::not_found("Post not found"))?;
        let mut views = annotate(&s.db, vec![row], viewer_id.as_deref())?;
        views.pop().ok_or_else(|| ApiError::Internal("annotation dropped a post".into()))
    })
    .await?;

    Ok(SinglePostResponse { is_allowed, post })
}

/// Attaches `isLiked`, `isSaved` and `isMe` to each row. Two batched
/// existence queries per page, none for anonymous viewers.
pub(crate) fn annotate(
    db: &Database,
    rows: Vec<PostRow>,
    viewer_id: Option<&str>,
) -> Result<Vec<PostView>, ApiError> {
    let Some(viewer_id) = viewer_id else {
        return Ok(rows
            .into_iter()
            .map(|row| post_view(row, PostFlags::default()))
            .collect());
    };

    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let liked = db.related_targets(RelationKind::Like, viewer_id, &ids)?;
    let saved = db.related_targets(RelationKind::Save, viewer_id, &ids)?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let flags = PostFlags {
                is_liked: liked.contains(&row.id),
                is_saved: saved.contains(&row.id),
                is_me: row.author_id == viewer_id,
            };
            post_view(row, flags)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_db::models::NewPost;
    use murmur_db::new_id;

    fn user(db: &Database, name: &str) -> String {
        let id = new_id();
        db.create_user(&id, &format!("{name}@example.com"), Some(name), "h").unwrap();
        id
    }

    fn post(db: &Database, author: &str, title: &str) -> PostRow {
        db.create_post(&NewPost {
            id: new_id(),
            author_id: author.to_string(),
            author: None,
            author_avatar: None,
            title: title.to_string(),
            subtitle: None,
            content: "body".into(),
            image: None,
            video: None,
        })
        .unwrap()
    }

    #[test]
    fn personal_feeds_need_a_viewer() {
        assert!(matches!(FeedKind::Saved.plan(None), Err(ApiError::Unauthorized(_))));
        assert!(matches!(FeedKind::Mine.plan(None), Err(ApiError::Unauthorized(_))));
        assert_eq!(
            FeedKind::Mine.plan(Some("u1")).unwrap(),
            (FeedFilter::Author("u1".into()), FeedOrder::Insertion)
        );
        assert_eq!(
            FeedKind::Latest.plan(None).unwrap(),
            (FeedFilter::All, FeedOrder::Newest)
        );
    }

    #[test]
    fn anonymous_flags_are_all_false() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let row = post(&db, &alice, "p");
        db.create_relation(RelationKind::Like, &alice, &row.id).unwrap();

        let views = annotate(&db, vec![db.get_post(&row.id).unwrap().unwrap()], None).unwrap();
        assert_eq!(views[0].like_count, 1);
        assert!(!views[0].is_liked && !views[0].is_saved && !views[0].is_me);
    }

    #[test]
    fn viewer_flags_reflect_store_state() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let mine = post(&db, &bob, "mine");
        let liked = post(&db, &alice, "liked");
        let saved = post(&db, &alice, "saved");
        db.create_relation(RelationKind::Like, &bob, &liked.id).unwrap();
        db.create_relation(RelationKind::Save, &bob, &saved.id).unwrap();
        db.create_relation(RelationKind::Like, &alice, &saved.id).unwrap();

        let views = annotate(&db, vec![mine, liked, saved], Some(&bob)).unwrap();
        let flags: Vec<_> = views.iter().map(|v| (v.is_me, v.is_liked, v.is_saved)).collect();
        assert_eq!(
            flags,
            vec![(true, false, false), (false, true, false), (false, false, true)]
        );
    }
}
