use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use agora_types::api::{Claims, CreateCommentRequest, MessageResponse, PostQuery, UpdateCommentRequest};
use agora_types::models::Comment;

use crate::auth::AppState;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::error::ApiResult;
use crate::validate::{self, DESC_MAX};
use crate::with_db;

pub async fn list_comments(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PostQuery>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Comment>>> {
    let rows = with_db(&state, move |db| db.list_comments(query.post_id)).await?;
    Ok(Json(rows.into_iter().map(Comment::from).collect()))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let desc = validate::required("desc", &req.desc, DESC_MAX)?.to_string();
    let post_id = req.post_id;

    let row = with_db(&state, move |db| {
        let id = db.create_comment(claims.sub, post_id, &desc)?;
        db.get_comment(id)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(Comment::from(row))))
}

pub async fn get_comment(
    State(state): State<AppState>,
    ApiPath(comment_id): ApiPath<i64>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<Json<Comment>> {
    let row = with_db(&state, move |db| db.get_comment(comment_id)).await?;
    Ok(Json(row.into()))
}

pub async fn update_comment(
    State(state): State<AppState>,
    ApiPath(comment_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateCommentRequest>,
) -> ApiResult<Json<Comment>> {
    let desc = validate::required("desc", &req.desc, DESC_MAX)?.to_string();
    let row = with_db(&state, move |db| db.update_comment(comment_id, claims.sub, &desc)).await?;
    Ok(Json(row.into()))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    ApiPath(comment_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<MessageResponse>> {
    with_db(&state, move |db| db.delete_comment(comment_id, claims.sub)).await?;
    Ok(Json(MessageResponse::new("Comment has been deleted.")))
}
