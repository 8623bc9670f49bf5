use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgArguments, PgPool, Row as _};

use super::manager::{DatabaseError, DatabaseManager};
use super::store::TableStore;
use crate::filter::{quote_identifier, validate_identifier, Filter, SqlResult};
use crate::query::{QuerySpec, Row};

/// `TableStore` over the backend Postgres using the service-role pool.
///
/// Rows travel as JSON (`row_to_json`); writes go through
/// `jsonb_populate_record` so Postgres performs the column type conversion.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn table(name: &str) -> Result<String, DatabaseError> {
        if !validate_identifier(name) {
            return Err(DatabaseError::InvalidIdentifier(name.to_string()));
        }
        Ok(quote_identifier(name))
    }

    fn columns(row: &Row) -> Result<Vec<String>, DatabaseError> {
        row.keys()
            .map(|k| {
                if validate_identifier(k) {
                    Ok(quote_identifier(k))
                } else {
                    Err(DatabaseError::InvalidIdentifier(k.clone()))
                }
            })
            .collect()
    }

    async fn fetch_rows(&self, sql: &SqlResult) -> Result<Vec<Row>, DatabaseError> {
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| json_row(&r)).collect()
    }
}

fn json_row(row: &sqlx::postgres::PgRow) -> Result<Row, DatabaseError> {
    match row.try_get::<Value, _>("row")? {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::QueryError(format!("unexpected row format: {}", other))),
    }
}

#[async_trait]
impl TableStore for PgStore {
    async fn select(&self, table: &str, spec: &QuerySpec) -> Result<Vec<Row>, DatabaseError> {
        let sql = Filter::new(table, spec)?.to_select_sql()?;
        tracing::debug!(query = %sql.query, "select");
        self.fetch_rows(&sql).await
    }

    async fn count(&self, table: &str, spec: &QuerySpec) -> Result<i64, DatabaseError> {
        let spec = spec.without_range();
        let sql = Filter::new(table, &spec)?.to_count_sql()?;
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>("count")?)
    }

    async fn find(&self, table: &str, id: &str) -> Result<Option<Row>, DatabaseError> {
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM {} WHERE id::text = $1) t",
            Self::table(table)?
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(json_row).transpose()
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, DatabaseError> {
        let table = Self::table(table)?;
        let columns = Self::columns(&row)?;

        let sql = if columns.is_empty() {
            format!("WITH ins AS (INSERT INTO {} DEFAULT VALUES RETURNING *) SELECT row_to_json(ins) AS row FROM ins", table)
        } else {
            let selected: Vec<String> = columns.iter().map(|c| format!("r.{}", c)).collect();
            format!(
                "WITH ins AS (INSERT INTO {table} ({cols}) SELECT {sel} FROM jsonb_populate_record(NULL::{table}, $1) AS r RETURNING *) \
                 SELECT row_to_json(ins) AS row FROM ins",
                table = table,
                cols = columns.join(", "),
                sel = selected.join(", "),
            )
        };

        let record = sqlx::query(&sql).bind(Value::Object(row)).fetch_one(&self.pool).await?;
        json_row(&record)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Option<Row>, DatabaseError> {
        let quoted = Self::table(table)?;
        let columns = Self::columns(&patch)?;
        if columns.is_empty() {
            return self.find(table, id).await;
        }

        let assignments: Vec<String> = columns.iter().map(|c| format!("{c} = r.{c}")).collect();
        let sql = format!(
            "WITH upd AS (UPDATE {table} SET {set} FROM jsonb_populate_record(NULL::{table}, $1) AS r \
             WHERE {table}.id::text = $2 RETURNING {table}.*) SELECT row_to_json(upd) AS row FROM upd",
            table = quoted,
            set = assignments.join(", "),
        );

        let record = sqlx::query(&sql)
            .bind(Value::Object(patch))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        record.as_ref().map(json_row).transpose()
    }

    async fn delete(&self, table: &str, id: &str) -> Result<bool, DatabaseError> {
        let sql = format!("DELETE FROM {} WHERE id::text = $1", Self::table(table)?);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_where(&self, table: &str, spec: &QuerySpec) -> Result<u64, DatabaseError> {
        let sql = Filter::new(table, spec)?.to_delete_sql()?;
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param(q, p);
        }
        Ok(q.execute(&self.pool).await?.rows_affected())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        // Filter rendering only emits scalar parameters; composite values go as JSONB
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}
