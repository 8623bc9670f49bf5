use std::sync::Arc;

use async_trait::async_trait;

use super::manager::DatabaseError;
use crate::query::{QuerySpec, Row};

/// Repository interface over the backend's tables.
///
/// Handlers and services never build backend queries themselves; they describe
/// reads with a `QuerySpec` and hand rows to one of these methods.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn select(&self, table: &str, spec: &QuerySpec) -> Result<Vec<Row>, DatabaseError>;

    /// Number of rows matching the query's conditions and search
    async fn count(&self, table: &str, spec: &QuerySpec) -> Result<i64, DatabaseError>;

    async fn find(&self, table: &str, id: &str) -> Result<Option<Row>, DatabaseError>;

    /// Insert a row; backend defaults fill `id` and `created_at`
    async fn insert(&self, table: &str, row: Row) -> Result<Row, DatabaseError>;

    /// Apply the given columns; `None` when the row does not exist
    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Option<Row>, DatabaseError>;

    async fn delete(&self, table: &str, id: &str) -> Result<bool, DatabaseError>;

    async fn delete_where(&self, table: &str, spec: &QuerySpec) -> Result<u64, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;

    /// First row matching the query
    async fn select_one(&self, table: &str, spec: &QuerySpec) -> Result<Option<Row>, DatabaseError> {
        let spec = QuerySpec { range: Some(crate::query::Range { offset: 0, limit: 1 }), ..spec.clone() };
        Ok(self.select(table, &spec).await?.into_iter().next())
    }

    /// Like `find`, but a missing row is an error
    async fn find_404(&self, table: &str, id: &str) -> Result<Row, DatabaseError> {
        self.find(table, id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {} not found", table, id)))
    }
}

pub type DynStore = Arc<dyn TableStore>;
