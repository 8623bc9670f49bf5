//! In-process `TableStore` evaluating `QuerySpec`s with the same semantics as
//! the SQL rendering: text equality, ILIKE wildcards, nulls sorted last.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::store::TableStore;
use crate::catalog::SortOrder;
use crate::filter::validate_identifier;
use crate::query::{Condition, QuerySpec, Row};

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, Vec<Row>>>>,
    /// Tables whose operations fail, for exercising error paths
    failing: Arc<RwLock<Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation on `table` fail with a query error
    pub async fn fail_table(&self, table: &str) {
        self.failing.write().await.push(table.to_string());
    }

    async fn check(&self, table: &str) -> Result<(), DatabaseError> {
        if !validate_identifier(table) {
            return Err(DatabaseError::InvalidIdentifier(table.to_string()));
        }
        if self.failing.read().await.iter().any(|t| t == table) {
            return Err(DatabaseError::QueryError(format!("table {} is unavailable", table)));
        }
        Ok(())
    }

    fn matching<'a>(rows: &'a [Row], spec: &QuerySpec) -> Vec<&'a Row> {
        rows.iter().filter(|row| matches_spec(row, spec)).collect()
    }
}

fn id_of(row: &Row) -> Option<String> {
    row.get("id").map(text_of)
}

/// Postgres `::text` rendering of a JSON value
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches_spec(row: &Row, spec: &QuerySpec) -> bool {
    let conditions_hold = spec.conditions.iter().all(|condition| match condition {
        Condition::Eq { column, value } => match (row.get(column), value) {
            (None | Some(Value::Null), Value::Null) => true,
            (None | Some(Value::Null), _) | (_, Value::Null) => false,
            (Some(actual), Value::Number(_) | Value::Bool(_)) => actual == value,
            (Some(actual), expected) => text_of(actual) == text_of(expected),
        },
        Condition::ILike { column, pattern } => row
            .get(column)
            .filter(|v| !v.is_null())
            .map_or(false, |v| ilike(&text_of(v), pattern)),
        Condition::In { column, values } => row
            .get(column)
            .filter(|v| !v.is_null())
            .map_or(false, |v| values.iter().any(|candidate| text_of(candidate) == text_of(v))),
    });

    let search_holds = spec.search.as_ref().map_or(true, |search| {
        let pattern = search.pattern();
        search
            .columns
            .iter()
            .filter_map(|c| row.get(c))
            .filter(|v| !v.is_null())
            .any(|v| ilike(&text_of(v), &pattern))
    });

    conditions_hold && search_holds
}

/// Case-insensitive LIKE with `%`, `_` and backslash escapes
pub fn ilike(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let mut tokens = Vec::new();
    let mut chars = pattern.to_lowercase().chars().collect::<Vec<_>>().into_iter();
    while let Some(c) = chars.next() {
        match c {
            '\\' => tokens.push(Token::Literal(chars.next().unwrap_or('\\'))),
            '%' => tokens.push(Token::Many),
            '_' => tokens.push(Token::One),
            other => tokens.push(Token::Literal(other)),
        }
    }
    like_match(&text, &tokens)
}

#[derive(Clone, Copy)]
enum Token {
    Literal(char),
    One,
    Many,
}

fn like_match(text: &[char], tokens: &[Token]) -> bool {
    // dp[j] = tokens[..i] matches text[..j]
    let mut dp = vec![false; text.len() + 1];
    dp[0] = true;
    for token in tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            Token::Many => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= dp[j];
                    next[j] = seen;
                }
            }
            Token::One => {
                for j in 1..=text.len() {
                    next[j] = dp[j - 1];
                }
            }
            Token::Literal(c) => {
                for j in 1..=text.len() {
                    next[j] = dp[j - 1] && text[j - 1] == *c;
                }
            }
        }
        dp = next;
    }
    dp[text.len()]
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.filter(|v| !v.is_null()), b.filter(|v| !v.is_null())) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(x), Some(y)) => text_of(x).cmp(&text_of(y)),
    }
}

fn sort_rows(rows: &mut [&Row], order: &[(String, SortOrder)]) {
    rows.sort_by(|a, b| {
        for (column, direction) in order {
            let ordering = match compare(a.get(column), b.get(column)) {
                // Nulls stay last regardless of direction
                o if a.get(column).map_or(true, Value::is_null) || b.get(column).map_or(true, Value::is_null) => o,
                o => match direction {
                    SortOrder::Asc => o,
                    SortOrder::Desc => o.reverse(),
                },
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn select(&self, table: &str, spec: &QuerySpec) -> Result<Vec<Row>, DatabaseError> {
        self.check(table).await?;
        let tables = self.tables.read().await;
        let rows = tables.get(table).map(Vec::as_slice).unwrap_or(&[]);

        let mut matched = Self::matching(rows, spec);
        sort_rows(&mut matched, &spec.order);

        let iter = matched.into_iter().cloned();
        Ok(match spec.range {
            Some(range) => iter.skip(range.offset as usize).take(range.limit as usize).collect(),
            None => iter.collect(),
        })
    }

    async fn count(&self, table: &str, spec: &QuerySpec) -> Result<i64, DatabaseError> {
        self.check(table).await?;
        let tables = self.tables.read().await;
        let rows = tables.get(table).map(Vec::as_slice).unwrap_or(&[]);
        Ok(Self::matching(rows, spec).len() as i64)
    }

    async fn find(&self, table: &str, id: &str) -> Result<Option<Row>, DatabaseError> {
        self.check(table).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .and_then(|rows| rows.iter().find(|r| id_of(r).as_deref() == Some(id)))
            .cloned())
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Row, DatabaseError> {
        self.check(table).await?;
        if !row.get("id").map_or(false, |v| !v.is_null()) {
            row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        if !row.get("created_at").map_or(false, |v| !v.is_null()) {
            row.insert("created_at".to_string(), Value::String(Utc::now().to_rfc3339()));
        }

        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        if rows.iter().any(|r| id_of(r) == id_of(&row)) {
            return Err(DatabaseError::QueryError(format!("duplicate key in {}", table)));
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Option<Row>, DatabaseError> {
        self.check(table).await?;
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| id_of(r).as_deref() == Some(id)))
        else {
            return Ok(None);
        };
        for (key, value) in patch {
            row.insert(key, value);
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, table: &str, id: &str) -> Result<bool, DatabaseError> {
        self.check(table).await?;
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|r| id_of(r).as_deref() != Some(id));
        Ok(rows.len() < before)
    }

    async fn delete_where(&self, table: &str, spec: &QuerySpec) -> Result<u64, DatabaseError> {
        self.check(table).await?;
        if spec.conditions.is_empty() && spec.search.is_none() {
            return Err(DatabaseError::QueryError("refusing to delete without conditions".to_string()));
        }
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !matches_spec(r, spec));
        Ok((before - rows.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (subject, year, board) in [
            ("Didática", 2021, Some("FCC")),
            ("Legislação", 2022, Some("CESPE")),
            ("Didática", 2023, None),
        ] {
            store
                .insert("questions", row(json!({ "subject": subject, "year": year, "exam_board": board })))
                .await
                .unwrap();
        }
        store
    }

    #[test]
    fn ilike_supports_wildcards_and_escapes() {
        assert!(ilike("Didática Geral", "%geral"));
        assert!(ilike("abc", "a_c"));
        assert!(!ilike("abc", "a_d"));
        assert!(ilike("50% off", "%50\\%%"));
        assert!(!ilike("500 off", "%50\\%%"));
    }

    #[tokio::test]
    async fn insert_fills_defaults() {
        let store = MemoryStore::new();
        let inserted = store.insert("profiles", row(json!({ "email": "a@b.c" }))).await.unwrap();
        assert!(Uuid::parse_str(inserted["id"].as_str().unwrap()).is_ok());
        assert!(inserted.contains_key("created_at"));
    }

    #[tokio::test]
    async fn select_filters_orders_and_pages() {
        let store = seeded().await;
        let spec = QuerySpec::new().eq("subject", "Didática").order_by("year", SortOrder::Desc);
        let rows = store.select("questions", &spec).await.unwrap();
        assert_eq!(rows.iter().map(|r| r["year"].clone()).collect::<Vec<_>>(), vec![json!(2023), json!(2021)]);

        let spec = QuerySpec::new().order_by("year", SortOrder::Asc).range(1, 1);
        let rows = store.select("questions", &spec).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["year"], json!(2022));
        assert_eq!(store.count("questions", &spec).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn nulls_sort_last_in_both_directions() {
        let store = seeded().await;
        for direction in [SortOrder::Asc, SortOrder::Desc] {
            let spec = QuerySpec::new().order_by("exam_board", direction);
            let rows = store.select("questions", &spec).await.unwrap();
            assert!(rows[2]["exam_board"].is_null());
        }
    }

    #[tokio::test]
    async fn search_matches_any_column() {
        let store = seeded().await;
        let spec = QuerySpec::new().search(vec!["subject".into(), "exam_board".into()], "cesp");
        assert_eq!(store.count("questions", &spec).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let store = seeded().await;
        assert!(store.update("questions", "missing", Row::new()).await.unwrap().is_none());
        assert!(!store.delete("questions", "missing").await.unwrap());

        let first = store.select("questions", &QuerySpec::new()).await.unwrap().remove(0);
        let id = first["id"].as_str().unwrap();
        let updated = store.update("questions", id, row(json!({ "year": 1999 }))).await.unwrap().unwrap();
        assert_eq!(updated["year"], json!(1999));
        assert!(store.delete("questions", id).await.unwrap());
        assert!(store.find("questions", id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_where_removes_matches_only() {
        let store = seeded().await;
        let removed = store.delete_where("questions", &QuerySpec::new().eq("subject", "Didática")).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count("questions", &QuerySpec::new()).await.unwrap(), 1);
        assert!(store.delete_where("questions", &QuerySpec::new()).await.is_err());
    }

    #[tokio::test]
    async fn failing_tables_error() {
        let store = seeded().await;
        store.fail_table("questions").await;
        assert!(matches!(
            store.select("questions", &QuerySpec::new()).await,
            Err(DatabaseError::QueryError(_))
        ));
    }
}
