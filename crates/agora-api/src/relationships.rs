use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use agora_db::models::RelationshipFilter;
use agora_types::api::{Claims, FollowRequest, MessageResponse, RelationshipQuery, UnfollowQuery};
use agora_types::models::Relationship;

use crate::auth::AppState;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::error::{ApiError, ApiResult};
use crate::with_db;

/// GET /relationships — exactly one of `followerUserId` / `followedUserId`.
pub async fn list_relationships(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RelationshipQuery>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Relationship>>> {
    let filter = match (query.follower_user_id, query.followed_user_id) {
        (Some(id), None) => RelationshipFilter::Follower(id),
        (None, Some(id)) => RelationshipFilter::Followed(id),
        _ => {
            return Err(ApiError::validation(
                "pass exactly one of followerUserId or followedUserId",
            ));
        }
    };
    let rows = with_db(&state, move |db| db.list_relationships(filter)).await?;
    Ok(Json(rows.into_iter().map(Relationship::from).collect()))
}

pub async fn follow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<FollowRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.user_id == claims.sub {
        return Err(ApiError::validation("you cannot follow yourself"));
    }

    let row = with_db(&state, move |db| {
        let id = db.create_relationship(claims.sub, req.user_id)?;
        db.get_relationship(id)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(Relationship::from(row))))
}

/// DELETE /relationships?userId= — stop following `userId`.
pub async fn unfollow(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UnfollowQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<MessageResponse>> {
    let removed = with_db(&state, move |db| db.unfollow(claims.sub, query.user_id)).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("relationship not found".into()));
    }
    Ok(Json(MessageResponse::new("Unfollowed.")))
}

pub async fn get_relationship(
    State(state): State<AppState>,
    ApiPath(relationship_id): ApiPath<i64>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<Json<Relationship>> {
    let row = with_db(&state, move |db| db.get_relationship(relationship_id)).await?;
    Ok(Json(row.into()))
}

pub async fn delete_relationship(
    State(state): State<AppState>,
    ApiPath(relationship_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<MessageResponse>> {
    with_db(&state, move |db| db.delete_relationship(relationship_id, claims.sub)).await?;
    Ok(Json(MessageResponse::new("Unfollowed.")))
}
