#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use portal_pnd::auth::{generate_jwt, Claims};
use portal_pnd::config::AppConfig;
use portal_pnd::database::{DatabaseError, MemoryStore, TableStore};
use portal_pnd::query::{QuerySpec, Row};
use portal_pnd::storage::{ObjectStorage, StorageError};
use portal_pnd::{app, AppState};

pub const SECRET: &str = "integration-secret";

/// Router over an in-memory store seeded with one admin, one user and a few questions
pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub admin_id: Uuid,
    pub user_id: Uuid,
    pub question_ids: Vec<String>,
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.auth.jwt_secret = SECRET.to_string();
    config.auth.profile_timeout_ms = 200;
    config.storage.max_upload_bytes = 1024;
    config
}

fn object(value: Value) -> Row {
    value.as_object().cloned().unwrap_or_default()
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::build(|store, config| AppState::new(Arc::new(store), config)).await
    }

    pub async fn with_storage(storage: Arc<dyn ObjectStorage>) -> Result<Self> {
        Self::build(move |store, config| AppState::new(Arc::new(store), config).with_storage(storage)).await
    }

    /// Profile reads take `delay`, everything else is immediate
    pub async fn with_slow_profiles(delay: Duration) -> Result<Self> {
        let wrap = move |store| WrappedStore { inner: store, profile_delay: Some(delay), healthy: true };
        Self::build(move |store, config| AppState::new(Arc::new(wrap(store)), config)).await
    }

    /// Health probes fail with a connection error carrying backend detail
    pub async fn with_unhealthy_backend() -> Result<Self> {
        let wrap = |store| WrappedStore { inner: store, profile_delay: None, healthy: false };
        Self::build(move |store, config| AppState::new(Arc::new(wrap(store)), config)).await
    }

    async fn build<F>(make_state: F) -> Result<Self>
    where
        F: FnOnce(MemoryStore, AppConfig) -> AppState,
    {
        let store = MemoryStore::new();
        let admin_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        store
            .insert("profiles", object(json!({ "id": admin_id, "email": "admin@pnd.test", "role": "admin" })))
            .await?;
        store
            .insert("profiles", object(json!({ "id": user_id, "email": "aluno@pnd.test", "role": "user" })))
            .await?;

        let mut question_ids = vec![];
        for (i, (subject, board, year)) in [
            ("Didática", "FCC", 2021),
            ("Didática", "CESPE", 2022),
            ("Legislação", "FCC", 2023),
        ]
        .into_iter()
        .enumerate()
        {
            let row = store
                .insert(
                    "questions",
                    object(json!({
                        "statement": format!("Questão {} sobre {}", i + 1, subject),
                        "alternatives": [
                            { "letter": "A", "text": "Primeira" },
                            { "letter": "B", "text": "Segunda" },
                            { "letter": "C", "text": "Terceira" },
                        ],
                        "correct_answer": "B",
                        "subject": subject,
                        "exam_board": board,
                        "year": year,
                        "difficulty": "medio",
                    })),
                )
                .await?;
            let id = row["id"].as_str().unwrap_or_default().to_string();
            store
                .insert("question_metadata", object(json!({ "question_id": id, "topic": format!("Tópico {}", i + 1) })))
                .await?;
            question_ids.push(id);
        }

        let router = app(make_state(store.clone(), test_config()));
        Ok(Self { router, store, admin_id, user_id, question_ids })
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        let claims = Claims::new(user_id, None, chrono::Duration::hours(1));
        generate_jwt(&claims, SECRET).unwrap_or_default()
    }

    pub fn admin_token(&self) -> String {
        self.token_for(self.admin_id)
    }

    pub fn user_token(&self) -> String {
        self.token_for(self.user_id)
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok((status, body))
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn count(&self, table: &str, spec: QuerySpec) -> i64 {
        self.store.count(table, &spec).await.unwrap_or(-1)
    }
}

/// MemoryStore with slow profile reads or a failing health probe
struct WrappedStore {
    inner: MemoryStore,
    profile_delay: Option<Duration>,
    healthy: bool,
}

#[async_trait]
impl TableStore for WrappedStore {
    async fn select(&self, table: &str, spec: &QuerySpec) -> Result<Vec<Row>, DatabaseError> {
        self.inner.select(table, spec).await
    }

    async fn count(&self, table: &str, spec: &QuerySpec) -> Result<i64, DatabaseError> {
        self.inner.count(table, spec).await
    }

    async fn find(&self, table: &str, id: &str) -> Result<Option<Row>, DatabaseError> {
        if let (Some(delay), "profiles") = (self.profile_delay, table) {
            tokio::time::sleep(delay).await;
        }
        self.inner.find(table, id).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, DatabaseError> {
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Option<Row>, DatabaseError> {
        self.inner.update(table, id, patch).await
    }

    async fn delete(&self, table: &str, id: &str) -> Result<bool, DatabaseError> {
        self.inner.delete(table, id).await
    }

    async fn delete_where(&self, table: &str, spec: &QuerySpec) -> Result<u64, DatabaseError> {
        self.inner.delete_where(table, spec).await
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        if !self.healthy {
            return Err(DatabaseError::ConnectionError("password authentication failed for user \"service_role\"".into()));
        }
        self.inner.health_check().await
    }
}

/// Records uploads in memory, or fails every upload
#[derive(Default)]
pub struct FakeStorage {
    pub uploads: Mutex<Vec<(String, String, String, usize)>>,
    pub fail: bool,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(&self, bucket: &str, path: &str, content_type: &str, bytes: Bytes) -> Result<String, StorageError> {
        if self.fail {
            return Err(StorageError::Rejected { status: 500, body: "storage down".to_string() });
        }
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push((bucket.to_string(), path.to_string(), content_type.to_string(), bytes.len()));
        }
        Ok(format!("https://storage.test/{}/{}", bucket, path))
    }
}
