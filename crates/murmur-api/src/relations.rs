use tracing::info;

use murmur_db::{Database, DbError, RelationKind, Toggle};

use crate::error::ApiError;

fn missing_target(kind: RelationKind) -> ApiError {
    match kind {
        RelationKind::Like | RelationKind::Save => ApiError::not_found("Post not found"),
        RelationKind::Follow => ApiError::not_found("User not found"),
    }
}

fn reject_self_follow(kind: RelationKind, actor: &str, target: &str) -> Result<(), ApiError> {
    if kind == RelationKind::Follow && actor == target {
        return Err(ApiError::validation("You cannot follow yourself"));
    }
    Ok(())
}

/// Creates the actor→target edge if absent, removes it if present.
/// Self-follow is refused before the store is touched.
pub fn toggle(db: &Database, kind: RelationKind, actor: &str, target: &str) -> Result<Toggle, ApiError> {
    reject_self_follow(kind, actor, target)?;

    let outcome = db
        .toggle_relation(kind, actor, target)
        .map_err(|e| match e {
            DbError::MissingReference(_) => missing_target(kind),
            other => other.into(),
        })?;

    info!(?kind, actor, target, ?outcome, "Relation toggled");
    Ok(outcome)
}

/// Creates the edge, failing with `Conflict(conflict_msg)` if it exists.
pub fn create(
    db: &Database,
    kind: RelationKind,
    actor: &str,
    target: &str,
    conflict_msg: &str,
) -> Result<(), ApiError> {
    reject_self_follow(kind, actor, target)?;

    db.create_relation(kind, actor, target).map_err(|e| match e {
        DbError::Conflict(_) => ApiError::Conflict(conflict_msg.to_string()),
        DbError::MissingReference(_) => missing_target(kind),
        other => other.into(),
    })
}

/// Removes the edge, failing with `NotFound(absent_msg)` if there was none.
pub fn remove(
    db: &Database,
    kind: RelationKind,
    actor: &str,
    target: &str,
    absent_msg: &str,
) -> Result<(), ApiError> {
    if db.remove_relation(kind, actor, target)? {
        Ok(())
    } else {
        Err(ApiError::not_found(absent_msg))
    }
}
