use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Extension, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::database::models::ActionType;
use crate::error::ApiError;
use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::services::audit;
use crate::state::AppState;
use crate::storage::object_name;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
    pub bucket: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Uploaded {
    pub bucket: String,
    pub path: String,
    pub public_url: String,
}

/// POST /api/admin/upload?filename=...[&bucket=...] - Store a question image
///
/// The request body is the raw image; its `Content-Type` must be an allowed
/// image type.
pub async fn upload(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Uploaded> {
    let limits = &state.config.storage;

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
        .unwrap_or_default();
    if !limits.allowed_content_types.iter().any(|allowed| *allowed == content_type) {
        return Err(ApiError::unsupported_media_type(format!(
            "Content-Type must be one of: {}",
            limits.allowed_content_types.join(", ")
        )));
    }

    let bytes = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::payload_too_large(format!("Upload exceeds {} bytes", limits.max_upload_bytes))
        } else {
            ApiError::bad_request(rejection.body_text())
        }
    })?;
    if bytes.is_empty() {
        return Err(ApiError::bad_request("Upload body is empty"));
    }
    if bytes.len() > limits.max_upload_bytes {
        return Err(ApiError::payload_too_large(format!("Upload exceeds {} bytes", limits.max_upload_bytes)));
    }

    let storage = state
        .storage
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Object storage is not configured"))?;

    let bucket = query.bucket.unwrap_or_else(|| limits.image_bucket.clone());
    let path = object_name(query.filename.as_deref().unwrap_or("image"));
    let size = bytes.len();
    let public_url = storage.upload(&bucket, &path, &content_type, bytes).await?;

    audit::record_action(
        state.store.as_ref(),
        admin.id,
        ActionType::Upload,
        "storage",
        Some(&path),
        json!({ "bucket": bucket, "content_type": content_type, "size": size }),
    )
    .await;

    Ok(ApiResponse::created(Uploaded { bucket, path, public_url }))
}
