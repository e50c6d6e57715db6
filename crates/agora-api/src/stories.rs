use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use agora_db::models::StoryFilter;
use agora_types::api::{Claims, CreateStoryRequest, MessageResponse, UpdateStoryRequest, UserQuery};
use agora_types::models::Story;

use crate::auth::AppState;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::error::ApiResult;
use crate::validate::{self, IMG_MAX};
use crate::with_db;

/// GET /stories — stories by `userId`, or the caller's story feed.
pub async fn list_stories(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Story>>> {
    let filter = match query.user_id {
        Some(user_id) => StoryFilter::ByUser(user_id),
        None => StoryFilter::Feed(claims.sub),
    };
    let rows = with_db(&state, move |db| db.list_stories(filter)).await?;
    Ok(Json(rows.into_iter().map(Story::from).collect()))
}

pub async fn create_story(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateStoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let img = validate::required("img", &req.img, IMG_MAX)?.to_string();
    let row = with_db(&state, move |db| {
        let id = db.create_story(claims.sub, &img)?;
        db.get_story(id)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(Story::from(row))))
}

pub async fn get_story(
    State(state): State<AppState>,
    ApiPath(story_id): ApiPath<i64>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<Json<Story>> {
    let row = with_db(&state, move |db| db.get_story(story_id)).await?;
    Ok(Json(row.into()))
}

pub async fn update_story(
    State(state): State<AppState>,
    ApiPath(story_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateStoryRequest>,
) -> ApiResult<Json<Story>> {
    let img = validate::required("img", &req.img, IMG_MAX)?.to_string();
    let row = with_db(&state, move |db| db.update_story(story_id, claims.sub, &img)).await?;
    Ok(Json(row.into()))
}

pub async fn delete_story(
    State(state): State<AppState>,
    ApiPath(story_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<MessageResponse>> {
    with_db(&state, move |db| db.delete_story(story_id, claims.sub)).await?;
    Ok(Json(MessageResponse::new("Story has been deleted.")))
}
