use super::error::FilterError;
use super::{quote_identifier, validate_identifier};
use crate::catalog::SortOrder;

pub struct FilterOrder;

impl FilterOrder {
    pub fn generate(order: &[(String, SortOrder)]) -> Result<String, FilterError> {
        if order.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(order.len());
        for (column, direction) in order {
            if !validate_identifier(column) {
                return Err(FilterError::InvalidColumn(column.clone()));
            }
            // Nulls last in both directions, matching the in-memory store
            let sql = match direction {
                SortOrder::Asc => "ASC NULLS LAST",
                SortOrder::Desc => "DESC NULLS LAST",
            };
            parts.push(format!("{} {}", quote_identifier(column), sql));
        }
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }
}
