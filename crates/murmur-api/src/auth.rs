use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_extra::extract::CookieJar;
use tracing::{info, warn};

use murmur_db::models::ProfileUpdate;
use murmur_db::{DbError, RelationKind, new_id};
use murmur_types::api::{
    AuthResponse, AvatarView, LoginRequest, MessageResponse, ProfileView, SetAvatarRequest,
    SetupProfileRequest, SignupRequest, UserResponse,
};

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, blocking};
use crate::viewer::{MaybeViewer, Viewer, expired_cookie, issue_token, session_cookie};
use crate::views::{avatar_view, present, user_view};

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(email), Some(password), Some(confirm)) = (
        present(req.email),
        req.password.filter(|p| !p.is_empty()),
        req.confirm_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::validation("All fields are required"));
    };
    if password != confirm {
        return Err(ApiError::validation("Passwords do not match"));
    }
    let username = present(req.username);

    let user = blocking(&state, move |s| {
        let hash = hash_password(&password)?;
        let id = new_id();
        s.db
            .create_user(&id, &email, username.as_deref(), &hash)
            .map_err(|e| match e {
                DbError::Conflict(_) => ApiError::Conflict("User already exists".into()),
                other => other.into(),
            })?;
        s.db
            .get_user_by_id(&id)?
            .ok_or_else(|| ApiError::Internal("user vanished after insert".into()))
    })
    .await?;

    let token = issue_token(&state.auth, &user.id)?;
    info!("User signed up: {}", user.id);

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(&state.auth, token)),
        Json(AuthResponse {
            message: "User created successfully".into(),
            user: user_view(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(email), Some(password)) = (present(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::validation("All fields are required"));
    };

    let user = blocking(&state, move |s| {
        let invalid = || ApiError::Unauthorized("Invalid email or password".into());
        let user = s.db.get_user_by_email(&email)?.ok_or_else(invalid)?;
        if !verify_password(&password, &user.password) {
            return Err(invalid());
        }
        s.db.touch_last_login(&user.id)?;
        Ok(s.db.get_user_by_id(&user.id)?.unwrap_or(user))
    })
    .await?;

    let token = issue_token(&state.auth, &user.id)?;
    info!("User logged in: {}", user.id);

    Ok((
        jar.add(session_cookie(&state.auth, token)),
        Json(AuthResponse {
            message: "Logged in successfully".into(),
            user: user_view(&user),
        }),
    ))
}

pub async fn logout(_viewer: Viewer, jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(expired_cookie()),
        Json(MessageResponse {
            message: "Logged out successfully".into(),
        }),
    )
}

pub async fn current_user(State(state): State<AppState>, viewer: Viewer) -> ApiResult<Json<UserResponse>> {
    let user = blocking(&state, move |s| {
        s.db
            .get_user_by_id(&viewer.id)?
            .ok_or_else(|| ApiError::not_found("User not found"))
    })
    .await?;

    Ok(Json(UserResponse { user: user_view(&user) }))
}

pub async fn get_user_profile(
    State(state): State<AppState>,
    viewer: MaybeViewer,
    Path(id): Path<String>,
) -> ApiResult<Json<ProfileView>> {
    let viewer_id = viewer.id().map(str::to_string);

    let profile = blocking(&state, move |s| {
        let user = s
            .db
            .get_user_by_id(&id)?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        let (total_posts, followers_count, following_count) = s.db.user_stats(&id)?;
        let is_following = match viewer_id.as_deref() {
            Some(v) if v != id => s.db.relation_exists(RelationKind::Follow, v, &id)?,
            _ => false,
        };

        Ok(ProfileView {
            user: user_view(&user),
            total_posts,
            followers_count,
            following_count,
            is_allowed: viewer_id.is_some(),
            is_me: viewer_id.as_deref() == Some(id.as_str()),
            is_following,
        })
    })
    .await?;

    Ok(Json(profile))
}

pub async fn setup_profile(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(req): Json<SetupProfileRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let Some(username) = present(req.username) else {
        return Err(ApiError::validation("Username is required"));
    };

    let update = ProfileUpdate {
        avatar: present(req.avatar),
        first_name: present(req.first_name),
        last_name: present(req.last_name),
        username: Some(username),
        bio: present(req.bio),
        birthday: present(req.birthday),
    };

    let user = blocking(&state, move |s| {
        let found = s.db.update_profile(&viewer.id, &update).map_err(|e| match e {
            DbError::Conflict(_) => ApiError::Conflict("Username already taken".into()),
            other => other.into(),
        })?;
        if !found {
            return Err(ApiError::not_found("User not found"));
        }
        s.db
            .get_user_by_id(&viewer.id)?
            .ok_or_else(|| ApiError::not_found("User not found"))
    })
    .await?;

    info!("Profile set up for {}", user.id);
    Ok(Json(AuthResponse {
        message: "Profile updated successfully".into(),
        user: user_view(&user),
    }))
}

pub async fn list_avatars(State(state): State<AppState>) -> ApiResult<Json<Vec<AvatarView>>> {
    let avatars = blocking(&state, |s| Ok(s.db.list_avatars()?)).await?;
    Ok(Json(avatars.into_iter().map(avatar_view).collect()))
}

pub async fn get_avatar(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<AvatarView>> {
    let avatar = blocking(&state, move |s| {
        s.db
            .get_avatar(&id)?
            .ok_or_else(|| ApiError::not_found("Avatar not found"))
    })
    .await?;

    Ok(Json(avatar_view(avatar)))
}

pub async fn set_avatar(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(req): Json<SetAvatarRequest>,
) -> ApiResult<Json<UserResponse>> {
    let Some(avatar_id) = present(req.avatar_id) else {
        return Err(ApiError::validation("avatarId is required"));
    };

    let user = blocking(&state, move |s| {
        s.db
            .get_avatar(&avatar_id)?
            .ok_or_else(|| ApiError::not_found("Avatar not found"))?;
        if !s.db.set_user_avatar(&viewer.id, &avatar_id)? {
            return Err(ApiError::not_found("User not found"));
        }
        s.db
            .get_user_by_id(&viewer.id)?
            .ok_or_else(|| ApiError::not_found("User not found"))
    })
    .await?;

    Ok(Json(UserResponse { user: user_view(&user) }))
}
