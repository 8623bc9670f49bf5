use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::{quote_identifier, validate_identifier, SqlResult};
use crate::query::QuerySpec;

/// SQL statements for one table and one `QuerySpec`
pub struct Filter<'a> {
    table_name: String,
    spec: &'a QuerySpec,
}

impl<'a> Filter<'a> {
    pub fn new(table_name: &str, spec: &'a QuerySpec) -> Result<Self, FilterError> {
        if !validate_identifier(table_name) {
            return Err(FilterError::InvalidTableName(table_name.to_string()));
        }
        Ok(Self { table_name: quote_identifier(table_name), spec })
    }

    /// Rows as JSON objects: `SELECT row_to_json(t) AS row FROM (...) t`
    pub fn to_select_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = self.where_parts()?;
        let order_clause = FilterOrder::generate(&self.spec.order)?;
        let limit_clause = self.limit_clause();

        let inner = [
            format!("SELECT * FROM {}", self.table_name),
            Self::prefixed("WHERE", &where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query: format!("SELECT row_to_json(t) AS row FROM ({}) t", inner), params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = self.where_parts()?;
        let query = format!(
            "SELECT COUNT(*) AS count FROM {}{}",
            self.table_name,
            Self::spaced("WHERE", &where_clause)
        );
        Ok(SqlResult { query, params })
    }

    pub fn to_delete_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = self.where_parts()?;
        if where_clause.is_empty() {
            return Err(FilterError::InvalidCondition("refusing to delete without conditions".to_string()));
        }
        Ok(SqlResult { query: format!("DELETE FROM {} WHERE {}", self.table_name, where_clause), params })
    }

    fn where_parts(&self) -> Result<(String, Vec<serde_json::Value>), FilterError> {
        FilterWhere::generate(&self.spec.conditions, self.spec.search.as_ref())
    }

    fn limit_clause(&self) -> String {
        match self.spec.range {
            Some(range) => format!("LIMIT {} OFFSET {}", range.limit, range.offset),
            None => String::new(),
        }
    }

    fn prefixed(keyword: &str, clause: &str) -> String {
        if clause.is_empty() { String::new() } else { format!("{} {}", keyword, clause) }
    }

    fn spaced(keyword: &str, clause: &str) -> String {
        if clause.is_empty() { String::new() } else { format!(" {} {}", keyword, clause) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SortOrder;
    use serde_json::json;

    #[test]
    fn select_wraps_rows_as_json() {
        let spec = QuerySpec::new()
            .eq("subject", "Didática")
            .order_by("created_at", SortOrder::Desc)
            .range(20, 10);
        let sql = Filter::new("questions", &spec).unwrap().to_select_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM \"questions\" WHERE \"subject\"::text = $1 \
             ORDER BY \"created_at\" DESC NULLS LAST LIMIT 10 OFFSET 20) t"
        );
        assert_eq!(sql.params, vec![json!("Didática")]);
    }

    #[test]
    fn count_ignores_range() {
        let spec = QuerySpec::new().range(0, 5);
        let sql = Filter::new("profiles", &spec.without_range()).unwrap().to_count_sql().unwrap();
        assert_eq!(sql.query, "SELECT COUNT(*) AS count FROM \"profiles\"");
    }

    #[test]
    fn delete_requires_conditions() {
        let spec = QuerySpec::new();
        assert!(Filter::new("questions", &spec).unwrap().to_delete_sql().is_err());

        let spec = QuerySpec::new().eq("question_id", "5b0b8f3e-2c1a-4c55-9d8e-1f1f2a3b4c5d");
        let sql = Filter::new("question_metadata", &spec).unwrap().to_delete_sql().unwrap();
        assert_eq!(sql.query, "DELETE FROM \"question_metadata\" WHERE \"question_id\"::text = $1");
    }

    #[test]
    fn rejects_bad_table_names() {
        let spec = QuerySpec::new();
        assert!(Filter::new("questions; DROP TABLE x", &spec).is_err());
        assert!(Filter::new("", &spec).is_err());
    }
}
