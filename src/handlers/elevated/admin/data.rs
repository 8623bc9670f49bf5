use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use super::{table_def, writable_table};
use crate::database::models::ActionType;
use crate::error::ApiError;
use crate::handlers::json_object;
use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::query::{ListParams, Page, Row};
use crate::services::{audit, questions};
use crate::state::AppState;

fn row_id(row: &Row) -> Option<String> {
    match row.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// GET /api/admin/database/data/:table - Filtered, paginated rows
pub async fn list(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Page> {
    let def = table_def(&table)?;
    let list = ListParams::from_query(def, &params, &state.config.query)?;

    let total = state.store.count(def.name, &list.spec).await?;
    let rows = state.store.select(def.name, &list.spec).await?;
    Ok(ApiResponse::success(Page::new(rows, total, list.page, list.limit)))
}

/// POST /api/admin/database/data/:table - Create a row
pub async fn create(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(table): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Row> {
    let def = writable_table(&table)?;
    let row = def.validate_insert(json_object(body)?)?;

    let created = state.store.insert(def.name, row.clone()).await?;
    audit::record_action(
        state.store.as_ref(),
        admin.id,
        ActionType::Create,
        def.name,
        row_id(&created).as_deref(),
        json!({ "columns": row.keys().collect::<Vec<_>>() }),
    )
    .await;

    Ok(ApiResponse::created(created))
}

/// PATCH /api/admin/database/data/:table - Inline single-column edit
///
/// Body: `{ "rowId": ..., "columnName": ..., "value": ... }`
pub async fn patch_cell(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(table): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Row> {
    let def = writable_table(&table)?;
    let mut body = json_object(body)?;

    let row_id = match body.get("rowId") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    let column = body.get("columnName").and_then(Value::as_str).filter(|c| !c.is_empty()).map(str::to_string);
    let (Some(row_id), Some(column)) = (row_id, column) else {
        return Err(ApiError::bad_request("rowId and columnName are required"));
    };
    let value = body.remove("value").unwrap_or(Value::Null);

    let mut patch = Row::new();
    patch.insert(column.clone(), value);
    let patch = def.validate_patch(patch)?;

    let updated = state
        .store
        .update(def.name, &row_id, patch.clone())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} {} not found", def.name, row_id)))?;

    audit::record_action(
        state.store.as_ref(),
        admin.id,
        ActionType::Update,
        def.name,
        Some(&row_id),
        json!({ "column": column, "value": patch.get(&column) }),
    )
    .await;

    Ok(ApiResponse::success(updated))
}

/// GET /api/admin/database/data/:table/:id - Single row
pub async fn show(State(state): State<AppState>, Path((table, id)): Path<(String, String)>) -> ApiResult<Row> {
    let def = table_def(&table)?;
    Ok(ApiResponse::success(state.store.find_404(def.name, &id).await?))
}

/// PUT /api/admin/database/data/:table/:id - Update any subset of columns
pub async fn update(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path((table, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Row> {
    let def = writable_table(&table)?;
    let patch = def.validate_patch(json_object(body)?)?;

    let updated = state
        .store
        .update(def.name, &id, patch.clone())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} {} not found", def.name, id)))?;

    audit::record_action(
        state.store.as_ref(),
        admin.id,
        ActionType::Update,
        def.name,
        Some(&id),
        json!({ "columns": patch.keys().collect::<Vec<_>>() }),
    )
    .await;

    Ok(ApiResponse::success(updated))
}

/// DELETE /api/admin/database/data/:table/:id - Delete a row
///
/// Deleting a question also removes its metadata rows (best-effort).
pub async fn delete(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path((table, id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let def = writable_table(&table)?;

    let deleted = match def.name {
        "questions" => questions::delete_question(state.store.as_ref(), &id).await?,
        name => state.store.delete(name, &id).await?,
    };
    if !deleted {
        return Err(ApiError::not_found(format!("{} {} not found", def.name, id)));
    }

    audit::record_action(state.store.as_ref(), admin.id, ActionType::Delete, def.name, Some(&id), Value::Null).await;

    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
