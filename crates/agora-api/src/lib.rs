pub mod auth;
pub mod comments;
pub mod error;
pub mod extract;
pub mod host;
pub mod likes;
pub mod metadata;
pub mod middleware;
pub mod posts;
pub mod relationships;
pub mod routes;
pub mod storage;
pub mod stories;
pub mod upload;
pub mod users;
pub mod validate;

use tracing::error;

use agora_db::{Database, DbResult};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

/// Runs a blocking repository call off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> DbResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(ApiError::from)
}
