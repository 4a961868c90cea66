use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{debug, error};
use uuid::Uuid;

use murmur_types::api::Claims;

use crate::error::ApiError;
use crate::state::{AppState, AuthSettings, blocking};

/// Name of the HTTP-only cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

/// The identity behind the current request.
///
/// As an extractor this is the fail-closed entry point: no credential,
/// a bad credential and a credential for a deleted user all reject with
/// 401. Use [`MaybeViewer`] for routes that also serve anonymous readers.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub id: String,
    pub username: Option<String>,
    pub avatar: Option<String>,
}

/// Optional identity: `None` when no credential was sent. A credential
/// that is present but invalid or expired still rejects with 401.
#[derive(Debug, Clone)]
pub struct MaybeViewer(pub Option<Viewer>);

impl MaybeViewer {
    pub fn id(&self) -> Option<&str> {
        self.0.as_ref().map(|v| v.id.as_str())
    }
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("No token provided".into()))
    }
}

impl FromRequestParts<AppState> for MaybeViewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeViewer(resolve(parts, state).await?))
    }
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<Viewer>, ApiError> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = match jar.get(TOKEN_COOKIE) {
        // A logged-out browser may still send the cleared, empty cookie
        Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
        _ => return Ok(None),
    };

    let claims = decode_token(&state.auth, &token)?;
    let user_id = claims.sub.to_string();

    let user = blocking(state, move |s| Ok(s.db.get_user_by_id(&user_id)?))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    Ok(Some(Viewer {
        id: user.id,
        username: user.username,
        avatar: user.avatar,
    }))
}

/// Signs a token for `user_id` that expires after the configured TTL.
pub fn issue_token(settings: &AuthSettings, user_id: &str) -> Result<String, ApiError> {
    let sub: Uuid = user_id.parse().map_err(|e| {
        error!("User id '{}' is not a UUID: {}", user_id, e);
        ApiError::Internal("corrupt user id".into())
    })?;

    let claims = Claims {
        sub,
        exp: (chrono::Utc::now() + settings.token_ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))
}

pub fn decode_token(settings: &AuthSettings, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!("Rejected session token: {}", e);
        ApiError::Unauthorized("Invalid token".into())
    })
}

pub fn session_cookie(settings: &AuthSettings, token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(settings.secure_cookies)
        .same_site(SameSite::Strict)
        .build()
}

/// Cookie value that, passed to `CookieJar::remove`, expires the session.
pub fn expired_cookie() -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, "")).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AuthSettings {
        AuthSettings {
            jwt_secret: "unit-test-secret".into(),
            token_ttl: chrono::Duration::hours(1),
            secure_cookies: false,
        }
    }

    #[test]
    fn issued_token_round_trips_to_user_id() {
        let id = Uuid::new_v4().to_string();
        let token = issue_token(&settings(), &id).unwrap();
        let claims = decode_token(&settings(), &token).unwrap();
        assert_eq!(claims.sub.to_string(), id);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let id = Uuid::new_v4().to_string();
        let mut other = settings();
        other.jwt_secret = "someone-else".into();
        let token = issue_token(&other, &id).unwrap();
        assert!(matches!(
            decode_token(&settings(), &token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut stale = settings();
        // Beyond the default 60s validation leeway
        stale.token_ttl = chrono::Duration::minutes(-5);
        let token = issue_token(&stale, &Uuid::new_v4().to_string()).unwrap();
        assert!(decode_token(&settings(), &token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(decode_token(&settings(), "not-a-jwt").is_err());
    }

    #[test]
    fn session_cookie_is_http_only_and_strict() {
        let cookie = session_cookie(&settings(), "abc".into());
        assert_eq!(cookie.name(), TOKEN_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
    }
}
