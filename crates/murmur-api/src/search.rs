use axum::Json;
use axum::extract::{Query, State};
use tracing::debug;

use murmur_db::{contains_pattern, prefix_pattern};
use murmur_types::api::{SearchQuery, SearchResponse};

use crate::error::ApiResult;
use crate::feed::annotate;
use crate::state::{AppState, blocking};
use crate::viewer::MaybeViewer;
use crate::views::user_summary;

/// How a raw query is matched, chosen on its length in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTier {
    /// One character: values starting with it.
    Prefix(String),
    /// A query with spaces: any non-empty word, anywhere, post content
    /// included.
    AnyWord(Vec<String>),
    /// A single word of three or more characters: values containing it.
    /// Post content is not searched.
    Substring(String),
    Nothing,
}

impl SearchTier {
    pub fn classify(query: &str) -> Self {
        if query.chars().count() == 1 {
            return SearchTier::Prefix(query.to_string());
        }

        if query.contains(' ') {
            let words: Vec<String> = query
                .split(' ')
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect();
            return if words.is_empty() {
                SearchTier::Nothing
            } else {
                SearchTier::AnyWord(words)
            };
        }

        if query.chars().count() >= 3 {
            SearchTier::Substring(query.to_string())
        } else {
            SearchTier::Nothing
        }
    }

    /// LIKE patterns for the tier, and whether post content is searched.
    fn patterns(&self) -> (Vec<String>, bool) {
        match self {
            SearchTier::Prefix(c) => (vec![prefix_pattern(c)], false),
            SearchTier::AnyWord(words) => (words.iter().map(|w| contains_pattern(w)).collect(), true),
            SearchTier::Substring(needle) => (vec![contains_pattern(needle)], false),
            SearchTier::Nothing => (vec![], false),
        }
    }
}

pub async fn search(
    State(state): State<AppState>,
    viewer: MaybeViewer,
    Query(q): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let tier = SearchTier::classify(q.query.as_deref().unwrap_or_default());
    debug!(?tier, "Search");

    let viewer_id = viewer.id().map(str::to_string);
    let (patterns, include_content) = tier.patterns();

    let (users, posts) = blocking(&state, move |s| {
        let users = s.db.search_users(&patterns)?;
        let rows = s.db.search_posts(&patterns, include_content)?;
        let posts = annotate(&s.db, rows, viewer_id.as_deref())?;
        Ok((users, posts))
    })
    .await?;

    let users: Vec<_> = users.into_iter().map(user_summary).collect();
    Ok(Json(SearchResponse {
        users_results: users.len(),
        users,
        posts_results: posts.len(),
        posts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> SearchTier {
        SearchTier::AnyWord(list.iter().map(|w| w.to_string()).collect())
    }

    #[test]
    fn single_character_is_a_prefix_search() {
        assert_eq!(SearchTier::classify("a"), SearchTier::Prefix("a".into()));
        assert_eq!(SearchTier::classify(" "), SearchTier::Prefix(" ".into()));
    }

    #[test]
    fn two_letter_word_finds_nothing() {
        assert_eq!(SearchTier::classify("ab"), SearchTier::Nothing);
        assert_eq!(SearchTier::classify(""), SearchTier::Nothing);
    }

    #[test]
    fn long_single_word_is_a_substring_search() {
        assert_eq!(SearchTier::classify("abc"), SearchTier::Substring("abc".into()));
        assert_eq!(SearchTier::Substring("abc".into()).patterns(), (vec!["%abc%".to_string()], false));
    }

    #[test]
    fn queries_with_spaces_match_any_word() {
        assert_eq!(SearchTier::classify("foo bar"), words(&["foo", "bar"]));
        assert_eq!(SearchTier::classify("a b"), words(&["a", "b"]));
        assert_eq!(SearchTier::classify("a "), words(&["a"]));
        assert_eq!(SearchTier::classify(" rust  lang "), words(&["rust", "lang"]));
        assert_eq!(SearchTier::classify("  "), SearchTier::Nothing);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert_eq!(SearchTier::classify("é"), SearchTier::Prefix("é".into()));
        assert_eq!(SearchTier::classify("éé"), SearchTier::Nothing);
    }

    #[test]
    fn any_word_searches_post_content() {
        let (patterns, content) = words(&["foo", "bar"]).patterns();
        assert_eq!(patterns, vec!["%foo%".to_string(), "%bar%".to_string()]);
        assert!(content);
        assert_eq!(SearchTier::Nothing.patterns(), (vec![], false));
    }
}
