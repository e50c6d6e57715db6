use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use agora_db::models::{PostFields, PostFilter};
use agora_types::api::{Claims, CreatePostRequest, MessageResponse, UpdatePostRequest, UserQuery};
use agora_types::models::Post;

use crate::auth::AppState;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::error::{ApiError, ApiResult};
use crate::validate::{self, DESC_MAX, IMG_MAX};
use crate::with_db;

/// GET /posts — posts by `userId`, or the caller's feed when omitted.
pub async fn list_posts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Post>>> {
    let filter = match query.user_id {
        Some(user_id) => PostFilter::ByUser(user_id),
        None => PostFilter::Feed(claims.sub),
    };
    let rows = with_db(&state, move |db| db.list_posts(filter)).await?;
    Ok(Json(rows.into_iter().map(Post::from).collect()))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    let desc = validate::optional("desc", req.desc.as_deref(), DESC_MAX)?.map(str::to_string);
    let img = validate::optional("img", req.img.as_deref(), IMG_MAX)?.map(str::to_string);
    if desc.is_none() && img.is_none() {
        return Err(ApiError::validation("a post needs a desc or an img"));
    }

    let row = with_db(&state, move |db| {
        let id = db.create_post(
            claims.sub,
            &PostFields {
                description: desc.as_deref(),
                img: img.as_deref(),
            },
        )?;
        db.get_post(id)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(Post::from(row))))
}

pub async fn get_post(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<i64>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<Json<Post>> {
    let row = with_db(&state, move |db| db.get_post(post_id)).await?;
    Ok(Json(row.into()))
}

pub async fn update_post(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdatePostRequest>,
) -> ApiResult<Json<Post>> {
    let desc = validate::optional("desc", req.desc.as_deref(), DESC_MAX)?.map(str::to_string);
    let img = validate::optional("img", req.img.as_deref(), IMG_MAX)?.map(str::to_string);

    let row = with_db(&state, move |db| {
        db.update_post(
            post_id,
            claims.sub,
            &PostFields {
                description: desc.as_deref(),
                img: img.as_deref(),
            },
        )
    })
    .await?;

    Ok(Json(row.into()))
}

pub async fn delete_post(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<MessageResponse>> {
    with_db(&state, move |db| db.delete_post(post_id, claims.sub)).await?;
    Ok(Json(MessageResponse::new("Post has been deleted.")))
}
