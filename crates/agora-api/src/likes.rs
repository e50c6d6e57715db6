use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use agora_types::api::{Claims, CreateLikeRequest, MessageResponse, PostQuery};
use agora_types::models::Like;

use crate::auth::AppState;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::error::{ApiError, ApiResult};
use crate::with_db;

pub async fn list_likes(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PostQuery>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Like>>> {
    let rows = with_db(&state, move |db| db.list_likes(query.post_id)).await?;
    Ok(Json(rows.into_iter().map(Like::from).collect()))
}

pub async fn create_like(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateLikeRequest>,
) -> ApiResult<impl IntoResponse> {
    let row = with_db(&state, move |db| {
        let id = db.create_like(claims.sub, req.post_id)?;
        db.get_like(id)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(Like::from(row))))
}

pub async fn get_like(
    State(state): State<AppState>,
    ApiPath(like_id): ApiPath<i64>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<Json<Like>> {
    let row = with_db(&state, move |db| db.get_like(like_id)).await?;
    Ok(Json(row.into()))
}

pub async fn delete_like(
    State(state): State<AppState>,
    ApiPath(like_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<MessageResponse>> {
    with_db(&state, move |db| db.delete_like(like_id, claims.sub)).await?;
    Ok(Json(MessageResponse::new("Like has been removed.")))
}

/// DELETE /likes?postId= — removes the caller's likes on a post.
pub async fn unlike_post(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PostQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<MessageResponse>> {
    let removed =
        with_db(&state, move |db| db.delete_likes_for_post(claims.sub, query.post_id)).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("like not found".into()));
    }
    Ok(Json(MessageResponse::new("Post has been disliked.")))
}
