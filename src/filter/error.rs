use thiserror::Error;

/// Reasons a `QuerySpec` cannot be rendered as SQL
#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Invalid table name '{0}'")]
    InvalidTableName(String),

    #[error("Invalid column name '{0}'")]
    InvalidColumn(String),

    #[error("Unsupported condition: {0}")]
    InvalidCondition(String),
}
