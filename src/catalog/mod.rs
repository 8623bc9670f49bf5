//! Static description of the tables exposed through the admin data grid.
//!
//! The column metadata drives query-parameter parsing, write validation and
//! the dashboard's table/column listing.

use std::collections::HashMap;

use chrono::DateTime;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::Alternative;

pub mod tables;

pub use tables::{ANSWER_LETTERS, TABLES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Integer,
    /// Integer within an inclusive range
    IntegerRange { min: i64, max: i64 },
    Boolean,
    Uuid,
    Timestamp,
    Json,
    TextArray,
    /// JSON array of uuid strings
    UuidList,
    /// JSON array of `{ letter, text }` answer choices
    Alternatives,
    Enum(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
    /// Must be present when creating a row
    pub required: bool,
    pub editable: bool,
    /// Included in the free-text `search` across the table
    pub searchable: bool,
    /// Accepted as an equality filter in list queries
    pub filterable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TableDef {
    pub name: &'static str,
    pub label: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [ColumnDef],
    pub default_order: (&'static str, SortOrder),
    pub read_only: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Column '{column}' cannot be null")]
    NotNullable { column: String },
    #[error("Column '{column}' expects {expected}, got {got}")]
    WrongType { column: String, expected: &'static str, got: String },
    #[error("Column '{column}' must be one of: {allowed}")]
    NotAllowed { column: String, allowed: String },
    #[error("Column '{column}' must be between {min} and {max}")]
    OutOfRange { column: String, min: i64, max: i64 },
    #[error("Column '{column}' {reason}")]
    BadShape { column: String, reason: String },
    #[error("Invalid row: {message}")]
    Row { message: String, field_errors: HashMap<String, String> },
}

impl ValidationError {
    pub fn field_errors(&self) -> HashMap<String, String> {
        match self {
            ValidationError::Row { field_errors, .. } => field_errors.clone(),
            ValidationError::NotNullable { column }
            | ValidationError::WrongType { column, .. }
            | ValidationError::NotAllowed { column, .. }
            | ValidationError::OutOfRange { column, .. }
            | ValidationError::BadShape { column, .. } => {
                HashMap::from([(column.clone(), self.to_string())])
            }
        }
    }
}

/// Look up a catalog table by name
pub fn table(name: &str) -> Option<&'static TableDef> {
    TABLES.iter().find(|t| t.name == name)
}

pub fn tables() -> &'static [TableDef] {
    TABLES
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn searchable_columns(&self) -> Vec<&'static str> {
        self.columns.iter().filter(|c| c.searchable).map(|c| c.name).collect()
    }

    pub fn filterable_columns(&self) -> Vec<&'static str> {
        self.columns.iter().filter(|c| c.filterable).map(|c| c.name).collect()
    }

    /// Validate and coerce a row for insertion
    pub fn validate_insert(&self, row: Map<String, Value>) -> Result<Map<String, Value>, ValidationError> {
        let mut field_errors = HashMap::new();
        let coerced = self.validate_columns(row, &mut field_errors);

        for column in self.columns.iter().filter(|c| c.required) {
            let missing = coerced.get(column.name).map_or(true, Value::is_null);
            if missing {
                field_errors.insert(column.name.to_string(), "This field is required".to_string());
            }
        }

        if field_errors.is_empty() {
            Ok(coerced)
        } else {
            Err(ValidationError::Row { message: format!("Invalid {} row", self.name), field_errors })
        }
    }

    /// Validate and coerce a partial update
    pub fn validate_patch(&self, row: Map<String, Value>) -> Result<Map<String, Value>, ValidationError> {
        let mut field_errors = HashMap::new();
        let coerced = self.validate_columns(row, &mut field_errors);

        if coerced.is_empty() && field_errors.is_empty() {
            return Err(ValidationError::Row {
                message: "Update contains no columns".to_string(),
                field_errors,
            });
        }

        if field_errors.is_empty() {
            Ok(coerced)
        } else {
            Err(ValidationError::Row { message: format!("Invalid {} update", self.name), field_errors })
        }
    }

    fn validate_columns(
        &self,
        row: Map<String, Value>,
        field_errors: &mut HashMap<String, String>,
    ) -> Map<String, Value> {
        let mut coerced = Map::new();
        for (key, value) in row {
            let Some(column) = self.column(&key) else {
                field_errors.insert(key, "Unknown column".to_string());
                continue;
            };
            if !column.editable {
                field_errors.insert(key, "Column is not editable".to_string());
                continue;
            }
            match column.coerce(value) {
                Ok(v) => {
                    coerced.insert(key, v);
                }
                Err(e) => {
                    field_errors.insert(key, e.to_string());
                }
            }
        }
        coerced
    }
}

impl ColumnDef {
    /// Convert JSON or query-string input into this column's JSON representation
    pub fn coerce(&self, value: Value) -> Result<Value, ValidationError> {
        if value.is_null() {
            return if self.nullable {
                Ok(Value::Null)
            } else {
                Err(ValidationError::NotNullable { column: self.name.to_string() })
            };
        }
        self.kind.coerce(self.name, value)
    }

    /// Coerce a raw query-string value
    pub fn coerce_str(&self, raw: &str) -> Result<Value, ValidationError> {
        if raw.eq_ignore_ascii_case("null") && self.nullable {
            return Ok(Value::Null);
        }
        match self.kind {
            ColumnKind::Json | ColumnKind::TextArray | ColumnKind::UuidList | ColumnKind::Alternatives => {
                let parsed = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
                self.coerce(parsed)
            }
            _ => self.coerce(Value::String(raw.to_string())),
        }
    }
}

impl ColumnKind {
    pub fn describe(&self) -> &'static str {
        match self {
            ColumnKind::Text => "text",
            ColumnKind::Integer | ColumnKind::IntegerRange { .. } => "integer",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Uuid => "uuid",
            ColumnKind::Timestamp => "timestamp",
            ColumnKind::Json => "json",
            ColumnKind::TextArray => "text array",
            ColumnKind::UuidList => "uuid list",
            ColumnKind::Alternatives => "alternatives",
            ColumnKind::Enum(_) => "enum",
        }
    }

    fn coerce(&self, column: &str, value: Value) -> Result<Value, ValidationError> {
        let wrong = |got: &Value| ValidationError::WrongType {
            column: column.to_string(),
            expected: self.describe(),
            got: got.to_string(),
        };

        match self {
            ColumnKind::Text => match value {
                Value::String(_) => Ok(value),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                other => Err(wrong(&other)),
            },
            ColumnKind::Integer => match &value {
                Value::Number(n) if n.is_i64() => Ok(value),
                Value::String(s) => s.trim().parse::<i64>().map(Value::from).map_err(|_| wrong(&value)),
                _ => Err(wrong(&value)),
            },
            ColumnKind::IntegerRange { min, max } => {
                let n = ColumnKind::Integer.coerce(column, value)?;
                match n.as_i64() {
                    Some(v) if (*min..=*max).contains(&v) => Ok(n),
                    _ => Err(ValidationError::OutOfRange { column: column.to_string(), min: *min, max: *max }),
                }
            }
            ColumnKind::Boolean => match &value {
                Value::Bool(_) => Ok(value),
                Value::String(s) => match s.to_ascii_lowercase().as_str() {
                    "true" | "1" => Ok(Value::Bool(true)),
                    "false" | "0" => Ok(Value::Bool(false)),
                    _ => Err(wrong(&value)),
                },
                _ => Err(wrong(&value)),
            },
            ColumnKind::Uuid => match &value {
                Value::String(s) => Uuid::parse_str(s.trim())
                    .map(|u| Value::String(u.to_string()))
                    .map_err(|_| wrong(&value)),
                _ => Err(wrong(&value)),
            },
            ColumnKind::Timestamp => match &value {
                Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                    .map(|ts| Value::String(ts.to_rfc3339()))
                    .map_err(|_| wrong(&value)),
                _ => Err(wrong(&value)),
            },
            ColumnKind::Json => Ok(value),
            ColumnKind::TextArray => match &value {
                Value::Array(items) if items.iter().all(Value::is_string) => Ok(value),
                Value::String(s) => Ok(Value::Array(
                    s.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(|t| Value::String(t.to_string()))
                        .collect(),
                )),
                _ => Err(wrong(&value)),
            },
            ColumnKind::UuidList => match &value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => Uuid::parse_str(s.trim()).map(|u| Value::String(u.to_string())).ok(),
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>()
                    .map(Value::Array)
                    .ok_or_else(|| wrong(&value)),
                _ => Err(wrong(&value)),
            },
            ColumnKind::Alternatives => coerce_alternatives(column, value),
            ColumnKind::Enum(allowed) => match &value {
                Value::String(s) if allowed.contains(&s.as_str()) => Ok(value),
                _ => Err(ValidationError::NotAllowed {
                    column: column.to_string(),
                    allowed: allowed.join(", "),
                }),
            },
        }
    }
}

fn coerce_alternatives(column: &str, value: Value) -> Result<Value, ValidationError> {
    let bad = |reason: String| ValidationError::BadShape { column: column.to_string(), reason };

    let mut alternatives: Vec<Alternative> = serde_json::from_value(value)
        .map_err(|e| bad(format!("must be a list of {{ letter, text }} objects ({})", e)))?;
    if alternatives.is_empty() {
        return Err(bad("must contain at least one alternative".to_string()));
    }

    let mut seen = Vec::with_capacity(alternatives.len());
    for alternative in &mut alternatives {
        alternative.letter = alternative.letter.trim().to_ascii_uppercase();
        if !ANSWER_LETTERS.contains(&alternative.letter.as_str()) {
            return Err(bad(format!("has invalid letter '{}'", alternative.letter)));
        }
        if seen.contains(&alternative.letter) {
            return Err(bad(format!("repeats letter '{}'", alternative.letter)));
        }
        seen.push(alternative.letter.clone());
    }

    serde_json::to_value(alternatives).map_err(|e| bad(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_known_tables() {
        assert!(table("questions").is_some());
        assert!(table("profiles").is_some());
        assert!(table("pg_catalog").is_none());
        assert!(table("admin_actions").unwrap().read_only);
    }

    #[test]
    fn coerces_query_string_values() {
        let questions = table("questions").unwrap();
        let year = questions.column("year").unwrap();
        assert_eq!(year.coerce_str("2023").unwrap(), json!(2023));
        assert!(year.coerce_str("twenty").is_err());

        let profiles = table("profiles").unwrap();
        let role = profiles.column("role").unwrap();
        assert_eq!(role.coerce_str("admin").unwrap(), json!("admin"));
        assert!(matches!(role.coerce_str("root"), Err(ValidationError::NotAllowed { .. })));
    }

    #[test]
    fn insert_reports_missing_and_unknown_columns() {
        let questions = table("questions").unwrap();
        let row = json!({ "statement": "What is 2+2?", "bogus": 1 });
        let err = questions.validate_insert(row.as_object().cloned().unwrap()).unwrap_err();
        let fields = err.field_errors();
        assert_eq!(fields.get("bogus").map(String::as_str), Some("Unknown column"));
        assert!(fields.contains_key("subject"));
        assert!(fields.contains_key("correct_answer"));
        assert!(!fields.contains_key("statement"));
    }

    #[test]
    fn patch_rejects_non_editable_columns() {
        let profiles = table("profiles").unwrap();
        let row = json!({ "id": "6f1c3c1e-7a8e-4a52-9a53-0c2b1f9f3d10" });
        let err = profiles.validate_patch(row.as_object().cloned().unwrap()).unwrap_err();
        assert_eq!(err.field_errors().get("id").map(String::as_str), Some("Column is not editable"));
    }

    #[test]
    fn nulls_only_for_nullable_columns() {
        let questions = table("questions").unwrap();
        assert_eq!(questions.column("image_url").unwrap().coerce(Value::Null).unwrap(), Value::Null);
        assert!(questions.column("statement").unwrap().coerce(Value::Null).is_err());
    }

    #[test]
    fn alternatives_must_be_lettered_choices() {
        let column = table("questions").unwrap().column("alternatives").unwrap();

        let ok = column.coerce(json!([{ "letter": "a", "text": "Sim" }, { "letter": "B", "text": "Não" }])).unwrap();
        assert_eq!(ok[0]["letter"], "A");

        assert!(matches!(column.coerce(json!("not a list")), Err(ValidationError::BadShape { .. })));
        assert!(column.coerce(json!([])).is_err());
        assert!(column.coerce(json!([{ "letter": "Z", "text": "?" }])).is_err());
        assert!(column.coerce(json!([{ "letter": "A", "text": "x" }, { "letter": "a", "text": "y" }])).is_err());
    }

    #[test]
    fn bounded_integers_reject_out_of_range_values() {
        let attempts = table("simulado_attempts").unwrap();
        let limit = attempts.column("time_limit_minutes").unwrap();
        assert_eq!(limit.coerce(json!(90)).unwrap(), json!(90));
        assert_eq!(limit.coerce_str("600").unwrap(), json!(600));
        assert!(matches!(
            limit.coerce(json!(1_000_000_000_000_000i64)),
            Err(ValidationError::OutOfRange { min: 1, max: 600, .. })
        ));
        assert!(limit.coerce(json!(0)).is_err());

        let ids = attempts.column("question_ids").unwrap();
        assert!(ids.coerce(json!(["6f1c3c1e-7a8e-4a52-9a53-0c2b1f9f3d10"])).is_ok());
        assert!(ids.coerce(json!(["nope"])).is_err());
        assert!(ids.coerce(json!({ "id": 1 })).is_err());
    }
}
