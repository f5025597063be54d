//! SQLite driver backed by an `sqlx::Pool<Sqlite>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rowmap::{DatabaseError, Driver, RawResultSet, SqlValue};
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Column, Pool, Row, TypeInfo, ValueRef};

use crate::error::SqlxErrorExt;

/// `rowmap` driver backed by an SQLite connection pool.
#[derive(Clone)]
pub struct SqliteDriver {
    pool: Pool<Sqlite>,
}

impl SqliteDriver {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_values<'q>(mut query: SqliteQuery<'q>, params: &[SqlValue]) -> SqliteQuery<'q> {
    for value in params {
        query = match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Double(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Bytes(v) => query.bind(v.clone()),
            SqlValue::Timestamp(v) => query.bind(*v),
            // SQLite has no native uuid/json/enum types; store them as text.
            SqlValue::Uuid(v) => query.bind(v.to_string()),
            SqlValue::Json(v) => query.bind(v.to_string()),
            SqlValue::Enum(v) => query.bind(v.value.clone()),
        };
    }
    query
}

fn decode_row(row: &SqliteRow) -> Result<Vec<SqlValue>, DatabaseError> {
    let mut values = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index).map_err(|e| e.into_database_error())?;
        if raw.is_null() {
            values.push(SqlValue::Null);
            continue;
        }
        let type_name = column.type_info().name().to_uppercase();
        let value = match type_name.as_str() {
            "INTEGER" | "INT" | "BIGINT" => SqlValue::Int(
                row.try_get::<i64, _>(index)
                    .map_err(|e| e.into_database_error())?,
            ),
            "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => SqlValue::Double(
                row.try_get::<f64, _>(index)
                    .map_err(|e| e.into_database_error())?,
            ),
            "BOOLEAN" | "BOOL" => SqlValue::Bool(
                row.try_get::<bool, _>(index)
                    .map_err(|e| e.into_database_error())?,
            ),
            "BLOB" => SqlValue::Bytes(
                row.try_get::<Vec<u8>, _>(index)
                    .map_err(|e| e.into_database_error())?,
            ),
            "DATETIME" | "TIMESTAMP" => SqlValue::Timestamp(
                row.try_get::<DateTime<Utc>, _>(index)
                    .map_err(|e| e.into_database_error())?,
            ),
            _ => SqlValue::Text(
                row.try_get::<String, _>(index)
                    .map_err(|e| e.into_database_error())?,
            ),
        };
        values.push(value);
    }
    Ok(values)
}

#[async_trait]
impl Driver for SqliteDriver {
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<RawResultSet, DatabaseError> {
        let query = bind_values(sqlx::query(sql), params);
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.into_database_error())?;
        let columns = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => Vec::new(),
        };
        let mut decoded = Vec::with_capacity(rows.len());
        for row in &rows {
            decoded.push(decode_row(row)?);
        }
        Ok(RawResultSet {
            columns,
            rows: decoded,
        })
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DatabaseError> {
        let query = bind_values(sqlx::query(sql), params);
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| e.into_database_error())?;
        Ok(result.rows_affected())
    }

    async fn execute_batch(
        &self,
        sql: &str,
        batches: &[Vec<SqlValue>],
    ) -> Result<Vec<u64>, DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(|e| e.into_database_error())?;
        let mut counts = Vec::with_capacity(batches.len());
        for params in batches {
            let query = bind_values(sqlx::query(sql), params);
            let result = query
                .execute(&mut *tx)
                .await
                .map_err(|e| e.into_database_error())?;
            counts.push(result.rows_affected());
        }
        tx.commit().await.map_err(|e| e.into_database_error())?;
        Ok(counts)
    }
}
