use axum::extract::State;
use futures::future::join_all;
use serde::Serialize;

use crate::catalog::{self, TableDef};
use crate::middleware::{ApiResponse, ApiResult};
use crate::query::QuerySpec;
use crate::state::AppState;

/// GET /api/admin/database/tables - Catalog for the dashboard tabs
pub async fn tables() -> ApiResult<&'static [TableDef]> {
    Ok(ApiResponse::success(catalog::tables()))
}

#[derive(Debug, Serialize)]
pub struct TableStat {
    pub table: &'static str,
    pub label: &'static str,
    /// `None` when the count failed
    pub count: Option<i64>,
}

/// GET /api/admin/database/stats - Row count per table
pub async fn stats(State(state): State<AppState>) -> ApiResult<Vec<TableStat>> {
    let spec = QuerySpec::new();
    let counts = join_all(catalog::tables().iter().map(|t| state.store.count(t.name, &spec))).await;

    let stats = catalog::tables()
        .iter()
        .zip(counts)
        .map(|(table, count)| TableStat {
            table: table.name,
            label: table.label,
            count: count
                .map_err(|e| tracing::warn!("Failed to count {}: {}", table.name, e))
                .ok(),
        })
        .collect();

    Ok(ApiResponse::success(stats))
}
