use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::info;

use agora_db::models::UserChanges;
use agora_types::api::{Claims, MessageResponse, UpdateUserRequest};
use agora_types::models::User;

use crate::auth::{AppState, SESSION_COOKIE};
use crate::extract::{ApiJson, ApiPath};
use crate::error::ApiResult;
use crate::validate::{self, CITY_MAX, NAME_MAX, PIC_MAX, USERNAME_MAX, WEBSITE_MAX};
use crate::with_db;

pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<Json<User>> {
    let row = with_db(&state, move |db| db.get_user(user_id)).await?;
    Ok(Json(row.into()))
}

pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    validate::optional("username", req.username.as_deref(), USERNAME_MAX)?;
    validate::optional("name", req.name.as_deref(), NAME_MAX)?;
    validate::optional("coverPic", req.cover_pic.as_deref(), PIC_MAX)?;
    validate::optional("profilePic", req.profile_pic.as_deref(), PIC_MAX)?;
    validate::optional("city", req.city.as_deref(), CITY_MAX)?;
    validate::optional("website", req.website.as_deref(), WEBSITE_MAX)?;
    if let Some(email) = req.email.as_deref() {
        validate::email(email)?;
    }

    let row = with_db(&state, move |db| {
        let changes = UserChanges {
            username: trimmed(&req.username),
            email: trimmed(&req.email),
            name: trimmed(&req.name),
            cover_pic: trimmed(&req.cover_pic),
            profile_pic: trimmed(&req.profile_pic),
            city: trimmed(&req.city),
            website: trimmed(&req.website),
        };
        db.update_user(user_id, claims.sub, &changes)
    })
    .await?;

    Ok(Json(row.into()))
}

/// Deletes the caller's own account and ends the session.
pub async fn delete_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    with_db(&state, move |db| db.delete_user(user_id, claims.sub)).await?;
    info!("User {} deleted their account", user_id);

    Ok((
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(MessageResponse::new("User has been deleted.")),
    ))
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
