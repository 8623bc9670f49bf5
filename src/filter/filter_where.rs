use serde_json::Value;

use super::error::FilterError;
use super::{quote_identifier, validate_identifier};
use crate::query::{Condition, Search};

/// Accumulates WHERE predicates and their bound parameters.
///
/// Text-valued comparisons cast the column to `text`, so uuid, timestamp and
/// enum columns compare against string input without type errors.
pub struct FilterWhere {
    params: Vec<Value>,
    predicates: Vec<String>,
}

impl FilterWhere {
    pub fn new() -> Self {
        Self { params: vec![], predicates: vec![] }
    }

    pub fn generate(conditions: &[Condition], search: Option<&Search>) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new();
        for condition in conditions {
            filter_where.condition(condition)?;
        }
        if let Some(search) = search {
            filter_where.search(search)?;
        }
        Ok(filter_where.finish())
    }

    fn finish(self) -> (String, Vec<Value>) {
        let clause = if self.predicates.is_empty() { String::new() } else { self.predicates.join(" AND ") };
        (clause, self.params)
    }

    fn condition(&mut self, condition: &Condition) -> Result<(), FilterError> {
        let column = Self::column(condition.column())?;
        let predicate = match condition {
            Condition::Eq { value, .. } if value.is_null() => format!("{} IS NULL", column),
            Condition::Eq { value, .. } => {
                let (lhs, param) = self.comparable(&column, value);
                format!("{} = {}", lhs, param)
            }
            Condition::ILike { pattern, .. } => {
                let param = self.param(Value::String(pattern.clone()));
                format!("{}::text ILIKE {}", column, param)
            }
            Condition::In { values, .. } => {
                if values.is_empty() {
                    "1=0".to_string()
                } else {
                    if values.iter().any(Value::is_null) {
                        return Err(FilterError::InvalidCondition("IN list cannot contain null".to_string()));
                    }
                    // Compare as text so mixed-type lists bind uniformly
                    let params: Vec<String> =
                        values.iter().map(|v| self.param(Value::String(Self::text_of(v)))).collect();
                    format!("{}::text IN ({})", column, params.join(", "))
                }
            }
        };
        self.predicates.push(predicate);
        Ok(())
    }

    fn search(&mut self, search: &Search) -> Result<(), FilterError> {
        if search.columns.is_empty() {
            return Ok(());
        }
        let param = self.param(Value::String(search.pattern()));
        let mut parts = Vec::with_capacity(search.columns.len());
        for column in &search.columns {
            parts.push(format!("{}::text ILIKE {}", Self::column(column)?, param));
        }
        self.predicates.push(format!("({})", parts.join(" OR ")));
        Ok(())
    }

    /// Left-hand side and parameter placeholder for an equality comparison
    fn comparable(&mut self, column: &str, value: &Value) -> (String, String) {
        match value {
            Value::Bool(_) | Value::Number(_) => (column.to_string(), self.param(value.clone())),
            other => (format!("{}::text", column), self.param(Value::String(Self::text_of(other)))),
        }
    }

    fn text_of(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn column(name: &str) -> Result<String, FilterError> {
        if !validate_identifier(name) {
            return Err(FilterError::InvalidColumn(name.to_string()));
        }
        Ok(quote_identifier(name))
    }

    fn param(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }
}

impl Default for FilterWhere {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equality_casts_strings_to_text() {
        let conditions = vec![
            Condition::Eq { column: "subject".into(), value: json!("Didática") },
            Condition::Eq { column: "year".into(), value: json!(2021) },
            Condition::Eq { column: "image_url".into(), value: Value::Null },
        ];
        let (sql, params) = FilterWhere::generate(&conditions, None).unwrap();
        assert_eq!(sql, "\"subject\"::text = $1 AND \"year\" = $2 AND \"image_url\" IS NULL");
        assert_eq!(params, vec![json!("Didática"), json!(2021)]);
    }

    #[test]
    fn search_reuses_one_parameter_across_columns() {
        let search = Search { columns: vec!["statement".into(), "subject".into()], term: "lei".into() };
        let (sql, params) = FilterWhere::generate(&[], Some(&search)).unwrap();
        assert_eq!(sql, "(\"statement\"::text ILIKE $1 OR \"subject\"::text ILIKE $1)");
        assert_eq!(params, vec![json!("%lei%")]);
    }

    #[test]
    fn empty_in_matches_nothing() {
        let conditions = vec![Condition::In { column: "id".into(), values: vec![] }];
        let (sql, params) = FilterWhere::generate(&conditions, None).unwrap();
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn rejects_injected_identifiers() {
        let conditions = vec![Condition::Eq { column: "id\" OR 1=1 --".into(), value: json!(1) }];
        assert!(matches!(FilterWhere::generate(&conditions, None), Err(FilterError::InvalidColumn(_))));
    }
}
