use crate::error::ApiError;

/// Allows a mutation only when the actor authored the resource.
pub fn check_ownership(actor_id: &str, owner_id: &str) -> Result<(), ApiError> {
    if actor_id == owner_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "You are not the owner of this resource".into(),
        ))
    }
}
