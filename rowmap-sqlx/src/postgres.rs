//! PostgreSQL driver backed by an `sqlx::Pool<Postgres>`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rowmap::{DatabaseError, Driver, RawResultSet, SqlValue};
use sqlx::postgres::{PgArguments, PgRow, Postgres};
use sqlx::{Column, Pool, Row, TypeInfo, ValueRef};

use crate::error::SqlxErrorExt;

/// `rowmap` driver backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PostgresDriver {
    pool: Pool<Postgres>,
}

impl PostgresDriver {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

fn bind_values<'q>(mut query: PgQuery<'q>, params: &[SqlValue]) -> PgQuery<'q> {
    for value in params {
        query = match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Double(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Bytes(v) => query.bind(v.clone()),
            SqlValue::Timestamp(v) => query.bind(*v),
            SqlValue::Uuid(v) => query.bind(*v),
            SqlValue::Json(v) => query.bind(v.clone()),
            // Bound as text; the statement casts to the enum type, e.g.
            // `insert ... values ($1::order_status)`.
            SqlValue::Enum(v) => query.bind(v.value.clone()),
        };
    }
    query
}

fn decode_row(row: &PgRow) -> Result<Vec<SqlValue>, DatabaseError> {
    let mut values = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index).map_err(|e| e.into_database_error())?;
        if raw.is_null() {
            values.push(SqlValue::Null);
            continue;
        }
        let type_name = column.type_info().name().to_uppercase();
        let value = match type_name.as_str() {
            "BOOL" => SqlValue::Bool(
                row.try_get::<bool, _>(index)
                    .map_err(|e| e.into_database_error())?,
            ),
            "INT2" => SqlValue::Int(i64::from(
                row.try_get::<i16, _>(index)
                    .map_err(|e| e.into_database_error())?,
            )),
            "INT4" => SqlValue::Int(i64::from(
                row.try_get::<i32, _>(index)
                    .map_err(|e| e.into_database_error())?,
            )),
            "INT8" => SqlValue::Int(
                row.try_get::<i64, _>(index)
                    .map_err(|e| e.into_database_error())?,
            ),
            "FLOAT4" => SqlValue::Double(f64::from(
                row.try_get::<f32, _>(index)
                    .map_err(|e| e.into_database_error())?,
            )),
            "FLOAT8" => SqlValue::Double(
                row.try_get::<f64, _>(index)
                    .map_err(|e| e.into_database_error())?,
            ),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => SqlValue::Text(
                row.try_get::<String, _>(index)
                    .map_err(|e| e.into_database_error())?,
            ),
            "BYTEA" => SqlValue::Bytes(
                row.try_get::<Vec<u8>, _>(index)
                    .map_err(|e| e.into_database_error())?,
            ),
            "UUID" => SqlValue::Uuid(
                row.try_get::<uuid::Uuid, _>(index)
                    .map_err(|e| e.into_database_error())?,
            ),
            "JSON" | "JSONB" => SqlValue::Json(
                row.try_get::<serde_json::Value, _>(index)
                    .map_err(|e| e.into_database_error())?,
            ),
            "TIMESTAMPTZ" => SqlValue::Timestamp(
                row.try_get::<DateTime<Utc>, _>(index)
                    .map_err(|e| e.into_database_error())?,
            ),
            "TIMESTAMP" => SqlValue::Timestamp(
                row.try_get::<NaiveDateTime, _>(index)
                    .map_err(|e| e.into_database_error())?
                    .and_utc(),
            ),
            "DATE" => SqlValue::Text(
                row.try_get::<NaiveDate, _>(index)
                    .map_err(|e| e.into_database_error())?
                    .to_string(),
            ),
            "TIME" => SqlValue::Text(
                row.try_get::<NaiveTime, _>(index)
                    .map_err(|e| e.into_database_error())?
                    .to_string(),
            ),
            // User-defined types (enums in particular) come back as text.
            other => match row.try_get::<String, _>(index) {
                Ok(text) => SqlValue::Text(text),
                Err(_) => {
                    return Err(DatabaseError::Conversion(format!(
                        "unsupported postgres column type `{other}`"
                    )))
                }
            },
        };
        values.push(value);
    }
    Ok(values)
}

#[async_trait]
impl Driver for PostgresDriver {
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
