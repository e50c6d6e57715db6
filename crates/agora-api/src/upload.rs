use axum::{
    Extension, Json,
    extract::{Multipart, State},
};
use tracing::{info, warn};

use agora_types::api::{Claims, UploadResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::storage::object_key;

/// Multipart field holding the payload.
const FILE_FIELD: &str = "file";

/// POST /upload — single-file multipart upload. The returned URL is meant
/// to be sent back as the `img` of a post or story; no row is written here.
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        // over the body limit this fails with 413
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::validation("uploaded file is empty"));
        }

        let key = object_key(&original_name);
        let size = bytes.len();
        let url = state
            .store
            .put_object(&key, bytes, &content_type, FILE_FIELD)
            .await
            .map_err(|e| {
                warn!("Object store rejected {}: {}", key, e);
                ApiError::Upstream(format!("could not store upload: {e}"))
            })?;

        info!("User {} uploaded {} ({} bytes)", claims.sub, key, size);
        return Ok(Json(UploadResponse { url }));
    }

    Err(ApiError::validation(format!("missing `{FILE_FIELD}` field")))
}
