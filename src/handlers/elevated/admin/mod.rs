pub mod data;
pub mod database;
pub mod upload;

use crate::catalog::{self, TableDef};
use crate::error::ApiError;

/// Catalog table or 404
pub(crate) fn table_def(name: &str) -> Result<&'static TableDef, ApiError> {
    catalog::table(name).ok_or_else(|| ApiError::not_found(format!("Unknown table '{}'", name)))
}

/// Catalog table that accepts writes through the dashboard
pub(crate) fn writable_table(name: &str) -> Result<&'static TableDef, ApiError> {
    let table = table_def(name)?;
    if table.read_only {
        return Err(ApiError::forbidden(format!("Table '{}' is read-only", name)));
    }
    Ok(table)
}
