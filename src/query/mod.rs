//! Backend-neutral read specification shared by every `TableStore`.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::catalog::{SortOrder, TableDef, ValidationError};
use crate::config::QueryConfig;

pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Unknown filter column '{0}'")]
    UnknownColumn(String),
    #[error("Column '{0}' cannot be used as a filter")]
    NotFilterable(String),
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),
    #[error("Invalid order: {0}")]
    InvalidOrder(String),
    #[error(transparent)]
    Value(#[from] ValidationError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq { column: String, value: Value },
    /// Case-insensitive LIKE; `%` and `_` are wildcards
    ILike { column: String, pattern: String },
    In { column: String, values: Vec<Value> },
}

impl Condition {
    pub fn column(&self) -> &str {
        match self {
            Condition::Eq { column, .. }
            | Condition::ILike { column, .. }
            | Condition::In { column, .. } => column,
        }
    }
}

/// Free-text search: term matched as a contains-pattern against any of the columns
#[derive(Debug, Clone, PartialEq)]
pub struct Search {
    pub columns: Vec<String>,
    pub term: String,
}

impl Search {
    pub fn pattern(&self) -> String {
        format!("%{}%", escape_like(&self.term))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub offset: u64,
    pub limit: u64,
}

impl Range {
    /// Inclusive end index, as in `range(from, to)`
    pub fn last(&self) -> u64 {
        self.offset.saturating_add(self.limit.saturating_sub(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub conditions: Vec<Condition>,
    pub search: Option<Search>,
    pub order: Vec<(String, SortOrder)>,
    pub range: Option<Range>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq { column: column.into(), value: value.into() });
        self
    }

    pub fn ilike(mut self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.conditions.push(Condition::ILike { column: column.into(), pattern: pattern.into() });
        self
    }

    pub fn is_in(mut self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.conditions.push(Condition::In { column: column.into(), values });
        self
    }

    pub fn search(mut self, columns: Vec<String>, term: impl Into<String>) -> Self {
        let term = term.into();
        if !term.trim().is_empty() && !columns.is_empty() {
            self.search = Some(Search { columns, term: term.trim().to_string() });
        }
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order.push((column.into(), order));
        self
    }

    pub fn range(mut self, offset: u64, limit: u64) -> Self {
        self.range = Some(Range { offset, limit });
        self
    }

    /// Every column name the query references, for identifier validation
    pub fn referenced_columns(&self) -> impl Iterator<Item = &str> {
        self.conditions
            .iter()
            .map(Condition::column)
            .chain(self.search.iter().flat_map(|s| s.columns.iter().map(String::as_str)))
            .chain(self.order.iter().map(|(c, _)| c.as_str()))
    }

    /// Same filters without ordering or pagination, for counting
    pub fn without_range(&self) -> Self {
        Self {
            conditions: self.conditions.clone(),
            search: self.search.clone(),
            order: vec![],
            range: None,
        }
    }
}

/// Escape LIKE metacharacters in user-supplied search terms
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Parsed list request: filters plus the page being requested
#[derive(Debug, Clone)]
pub struct ListParams {
    pub spec: QuerySpec,
    pub page: u64,
    pub limit: u64,
}

const RESERVED: &[&str] = &["page", "limit", "search", "order"];

impl ListParams {
    /// Build list parameters for `table` from raw query-string pairs.
    ///
    /// `page`/`limit`/`search`/`order` are reserved; any other key must be a
    /// filterable column and becomes an equality condition.
    pub fn from_query(
        table: &TableDef,
        params: &HashMap<String, String>,
        config: &QueryConfig,
    ) -> Result<Self, QueryError> {
        let page = parse_positive(params.get("page"), 1, "page")?;
        let requested = parse_positive(params.get("limit"), config.default_page_size as u64, "limit")?;
        let limit = requested.min((config.max_page_size as u64).max(1));
        if limit < requested && config.debug_logging {
            tracing::debug!("Limit {} exceeds max {}, capping", requested, limit);
        }

        let mut spec = QuerySpec::new();

        // Stable key order keeps generated SQL deterministic
        let mut keys: Vec<&String> = params.keys().filter(|k| !RESERVED.contains(&k.as_str())).collect();
        keys.sort();
        for key in keys {
            let raw = &params[key];
            if raw.is_empty() {
                continue;
            }
            let column = table.column(key).ok_or_else(|| QueryError::UnknownColumn(key.clone()))?;
            if !column.filterable {
                return Err(QueryError::NotFilterable(key.clone()));
            }
            spec = spec.eq(key.clone(), column.coerce_str(raw)?);
        }

        if let Some(term) = params.get("search") {
            let columns = table.searchable_columns().into_iter().map(String::from).collect();
            spec = spec.search(columns, term.clone());
        }

        match params.get("order").filter(|o| !o.trim().is_empty()) {
            Some(order) => {
                for (column, direction) in parse_order(order)? {
                    if table.column(&column).is_none() {
                        return Err(QueryError::InvalidOrder(format!("unknown column '{}'", column)));
                    }
                    spec = spec.order_by(column, direction);
                }
            }
            None => {
                let (column, direction) = table.default_order;
                spec = spec.order_by(column, direction);
            }
        }

        // Postgres OFFSET is a bigint
        let offset = (page - 1)
            .checked_mul(limit)
            .filter(|offset| *offset <= i64::MAX as u64)
            .ok_or_else(|| QueryError::InvalidPagination("page is out of range".to_string()))?;
        spec = spec.range(offset, limit);
        Ok(Self { spec, page, limit })
    }
}

fn parse_positive(raw: Option<&String>, default: u64, name: &str) -> Result<u64, QueryError> {
    match raw.map(|s| s.trim()).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(s) => match s.parse::<u64>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(QueryError::InvalidPagination(format!("{} must be a positive integer", name))),
        },
    }
}

/// Parse `col.asc,other.desc` (direction defaults to ascending)
pub fn parse_order(raw: &str) -> Result<Vec<(String, SortOrder)>, QueryError> {
    let mut out = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (column, direction) = match part.rsplit_once('.') {
            Some((c, d)) => (c, d),
            None => (part, "asc"),
        };
        let direction = match direction.to_ascii_lowercase().as_str() {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            other => return Err(QueryError::InvalidOrder(format!("unknown direction '{}'", other))),
        };
        out.push((column.to_string(), direction));
    }
    Ok(out)
}

/// One page of rows plus the totals the data grid needs
#[derive(Debug, Clone, Serialize)]
pub struct Page<T = Row> {
    pub rows: Vec<T>,
    pub total: i64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(rows: Vec<T>, total: i64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { (total.max(0) as u64).div_ceil(limit) };
        Self { rows, total, page, limit, total_pages }
    }
}
