//! Renders a `QuerySpec` into parameterized Postgres SQL.

pub mod error;
pub mod filter;
pub mod filter_order;
pub mod filter_where;

pub use error::FilterError;
pub use filter::Filter;

/// SQL text plus the values bound to `$1..$n`
#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<serde_json::Value>,
}

/// Validate an identifier before it is quoted into SQL
pub fn validate_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
