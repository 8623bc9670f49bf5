//! Object storage for question images.

use async_trait::async_trait;
use axum::body::Bytes;
use thiserror::Error;
use uuid::Uuid;

use crate::config::BackendConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object storage is not configured")]
    NotConfigured,

    #[error("Invalid object name: {0}")]
    InvalidObjectName(String),

    #[error("Storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Storage rejected upload ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Bucket-based blob store; returns the public URL of the stored object
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, bucket: &str, path: &str, content_type: &str, bytes: Bytes) -> Result<String, StorageError>;
}

/// Storage API of the hosted backend, authenticated with the service-role key
pub struct BackendStorage {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl BackendStorage {
    pub fn from_config(config: &BackendConfig) -> Result<Self, StorageError> {
        let (Some(url), Some(key)) = (config.url.as_deref(), config.service_role_key.as_deref()) else {
            return Err(StorageError::NotConfigured);
        };
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: url.trim_end_matches('/').to_string(),
            service_key: key.to_string(),
        })
    }

    pub fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path)
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, path)
    }
}

#[async_trait]
impl ObjectStorage for BackendStorage {
    async fn upload(&self, bucket: &str, path: &str, content_type: &str, bytes: Bytes) -> Result<String, StorageError> {
        if !is_safe_segment(bucket) {
            return Err(StorageError::InvalidObjectName(bucket.to_string()));
        }

        let response = self
            .client
            .post(self.object_url(bucket, path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected { status: status.as_u16(), body });
        }

        tracing::info!(bucket, path, "Uploaded object");
        Ok(self.public_url(bucket, path))
    }
}

fn is_safe_segment(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Reduce a client-supplied file name to `[a-z0-9._-]`
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() => c.to_ascii_lowercase(),
            '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    let cleaned: String = cleaned.chars().rev().take(100).collect::<Vec<_>>().into_iter().rev().collect();
    if cleaned.is_empty() { "upload".to_string() } else { cleaned }
}

/// Unique object name for an uploaded file
pub fn object_name(filename: &str) -> String {
    format!("{}-{}", Uuid::new_v4(), sanitize_filename(filename))
}
