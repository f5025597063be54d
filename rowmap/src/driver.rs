use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::value::SqlValue;

/// Raw rows as produced by a backend driver, before conversion.
#[derive(Debug, Clone, Default)]
pub struct RawResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

/// Async seam to the host database driver.
///
/// Connection pooling and transactions belong to the driver; this layer
/// only needs statement execution with positional parameters.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Execute a statement returning rows.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<RawResultSet, DatabaseError>;

    /// Execute a statement returning the number of affected rows.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DatabaseError>;

    /// Execute a statement once per parameter set, returning the affected
    /// count of each execution. Drivers with transaction support run the
    /// whole batch in one transaction.
    async fn execute_batch(
        &self,
        sql: &str,
        batches: &[Vec<SqlValue>],
    ) -> Result<Vec<u64>, DatabaseError> {
        let mut counts = Vec::with_capacity(batches.len());
        for params in batches {
            counts.push(self.execute(sql, params).await?);
        }
        Ok(counts)
    }
}
