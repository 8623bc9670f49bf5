//! Typed views over catalog rows.
//!
//! Stores hand back `Row`s; services convert them here when they need to reason
//! about specific columns.

mod admin_action;
mod profile;
mod question;
mod simulado;

pub use admin_action::{ActionType, AdminAction};
pub use profile::Profile;
pub use question::{Alternative, Question, QuestionMetadata};
pub use simulado::{AttemptStatus, SimuladoAnswer, SimuladoAttempt};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::manager::DatabaseError;
use crate::query::Row;

/// Deserialize a store row into a model
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, DatabaseError> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| DatabaseError::QueryError(format!("unexpected row shape: {}", e)))
}

/// Deserialize a listing, skipping (and logging) rows that do not fit the model
pub fn from_rows<T: DeserializeOwned>(table: &str, rows: Vec<Row>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").cloned().unwrap_or(Value::Null);
            match from_row(row) {
                Ok(model) => Some(model),
                Err(e) => {
                    tracing::warn!("Skipping malformed {} row {}: {}", table, id, e);
                    None
                }
            }
        })
        .collect()
}

/// Serialize a model into a row, dropping null columns so backend defaults apply
pub fn to_row<T: Serialize>(model: &T) -> Result<Row, DatabaseError> {
    match serde_json::to_value(model) {
        Ok(Value::Object(map)) => Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        Ok(other) => Err(DatabaseError::QueryError(format!("model is not an object: {}", other))),
        Err(e) => Err(DatabaseError::QueryError(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listings_skip_rows_that_do_not_fit() {
        let good = json!({
            "id": "6f1c3c1e-7a8e-4a52-9a53-0c2b1f9f3d10",
            "statement": "Ok",
            "alternatives": [{ "letter": "A", "text": "Sim" }],
            "subject": "Didática",
        });
        let bad = json!({
            "id": "0b6f6c2e-3f3a-4d55-8d0e-9e8f5a7b1c22",
            "statement": "Broken",
            "alternatives": "not a list",
            "subject": "Didática",
        });
        let rows = vec![good, bad].into_iter().filter_map(|v| v.as_object().cloned()).collect();

        let questions: Vec<Question> = from_rows("questions", rows);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].statement, "Ok");
    }
}
