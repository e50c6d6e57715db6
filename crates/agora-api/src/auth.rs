use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use tracing::{info, warn};

use agora_db::Database;
use agora_db::models::NewUser;
use agora_types::api::{Claims, LoginRequest, MessageResponse, RegisterRequest};
use agora_types::models::User;

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::metadata::MetadataClient;
use crate::storage::ObjectStore;
use crate::validate::{self, NAME_MAX, PASSWORD_MIN, USERNAME_MAX};
use crate::with_db;

/// Cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "accessToken";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Marks the session cookie `Secure; SameSite=None` for cross-site frontends.
    pub secure_cookies: bool,
    pub store: Arc<dyn ObjectStore>,
    pub metadata: MetadataClient,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = validate::required("username", &req.username, USERNAME_MAX)?.to_string();
    let email = validate::email(&req.email)?.to_string();
    let name = validate::required("name", &req.name, NAME_MAX)?.to_string();
    if req.password.len() < PASSWORD_MIN {
        return Err(ApiError::validation(format!(
            "password must be at least {PASSWORD_MIN} characters"
        )));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?
        .to_string();

    let user = with_db(&state, move |db| {
        let id = db.create_user(&NewUser {
            username: &username,
            email: &email,
            password_hash: &password_hash,
            name: &name,
        })?;
        db.get_user(id)
    })
    .await?;

    info!("Registered user {} ({})", user.id, user.username);
    Ok((StatusCode::CREATED, Json(User::from(user))))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.trim().to_string();
    let user = with_db(&state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(format!("stored hash unreadable: {e}")))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| {
            warn!("Failed login for {}", user.username);
            ApiError::Unauthenticated
        })?;

    let token = create_token(&state.jwt_secret, user.id, &user.username, state.token_ttl_hours)?;
    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .http_only(true)
        .path("/")
        .secure(state.secure_cookies)
        .same_site(if state.secure_cookies {
            SameSite::None
        } else {
            SameSite::Lax
        });

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token,
            user: user.into(),
        }),
    ))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(MessageResponse::new("User has been logged out.")),
    )
}

pub fn create_token(secret: &str, user_id: i64, username: &str, ttl_hours: i64) -> ApiResult<String> {
    let expires = chrono::TimeDelta::try_hours(ttl_hours)
        .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| ApiError::Internal(format!("token lifetime of {ttl_hours}h is out of range")))?;
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: expires.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
}
