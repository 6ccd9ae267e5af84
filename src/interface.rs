use async_trait::async_trait;

use crate::core::{DbError, Result};
use crate::params::Params;
use crate::result::QueryResult;

/// A generic trait for database clients.
///
/// This trait allows writing code that is agnostic to the underlying database implementation.
/// Use [`MemoryClient`](crate::MemoryClient) for tests and demos, or wrap a real driver
/// (Postgres, SQL Server, SQLite) to implement it for production use. Placeholders in the
/// SQL text are named (`@Name`) and resolved from the supplied [`Params`].
///
/// Errors returned by an implementation are passed through this crate unchanged.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Execute a statement that is expected to return rows (SELECT).
    async fn query(&self, sql: &str, params: &Params) -> Result<QueryResult>;

    /// Execute a statement that modifies data and return the affected-row count.
    async fn execute(&self, sql: &str, params: &Params) -> Result<u64>;

    /// Execute a query expected to match at most one row.
    ///
    /// More than one row is an error.
    async fn query_optional(&self, sql: &str, params: &Params) -> Result<Option<QueryResult>> {
        let result = self.query(sql, params).await?;
        match result.row_count() {
            0 => Ok(None),
            1 => Ok(Some(result)),
            n => Err(DbError::Execution(format!(
                "query returned {} rows where at most one was expected",
                n
            ))),
        }
    }

    /// Check if the connection is active
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
