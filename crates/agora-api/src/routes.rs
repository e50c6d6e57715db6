use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{comments, host, likes, posts, relationships, stories, upload, users};

/// Every API route, nested under `/api`. CORS, tracing and static file
/// serving are layered on by the server binary.
pub fn api_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/health", get(host::health))
        .route("/about", get(host::about))
        .route("/info", get(host::info));

    let upload_routes = Router::new()
        .route("/upload", post(upload::upload_file))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes));

    let protected_routes = Router::new()
        .route(
            "/users/{id}",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/{id}",
            get(posts::get_post).put(posts::update_post).delete(posts::delete_post),
        )
        .route(
            "/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/comments/{id}",
            get(comments::get_comment)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route(
            "/likes",
            get(likes::list_likes).post(likes::create_like).delete(likes::unlike_post),
        )
        .route("/likes/{id}", get(likes::get_like).delete(likes::delete_like))
        .route(
            "/stories",
            get(stories::list_stories).post(stories::create_story),
        )
        .route(
            "/stories/{id}",
            get(stories::get_story)
                .put(stories::update_story)
                .delete(stories::delete_story),
        )
        .route(
            "/relationships",
            get(relationships::list_relationships)
                .post(relationships::follow)
                .delete(relationships::unfollow),
        )
        .route(
            "/relationships/{id}",
            get(relationships::get_relationship).delete(relationships::delete_relationship),
        )
        .merge(upload_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .with_state(state)
}
