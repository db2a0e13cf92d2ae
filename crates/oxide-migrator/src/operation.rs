//! Forward and backward migration operations.
//!
//! An operation is an async function that receives the connection of the
//! active session. Every ledger read and write of a run goes through the same
//! connection, so an operation sees the run's own uncommitted changes when
//! the run is transactional.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::Result;

type OperationFn =
    dyn for<'c> Fn(&'c mut SqliteConnection) -> BoxFuture<'c, Result<()>> + Send + Sync;

/// A schema change, or its reversal, run against the session connection.
///
/// # Example
///
/// ```rust
/// use oxide_migrator::Operation;
///
/// let create = Operation::new(|conn| {
///     Box::pin(async move {
///         sqlx::query("CREATE TABLE people (id INTEGER PRIMARY KEY)")
///             .execute(&mut *conn)
///             .await?;
///         Ok(())
///     })
/// });
/// let drop = Operation::sql("DROP TABLE people");
/// # let _ = (create, drop);
/// ```
#[derive(Clone)]
pub struct Operation(Arc<OperationFn>);

impl Operation {
    /// Wraps an async closure as an operation.
    pub fn new<F>(f: F) -> Self
    where
        F: for<'c> Fn(&'c mut SqliteConnection) -> BoxFuture<'c, Result<()>>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(f))
    }

    /// An operation that does nothing.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|_| Box::pin(async { Ok(()) }))
    }

    /// An operation executing a single SQL statement.
    pub fn sql(statement: impl Into<String>) -> Self {
        Self::statements([statement.into()])
    }

    /// An operation executing SQL statements in order.
    pub fn statements<I, S>(statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let statements: Arc<[String]> = statements.into_iter().map(Into::into).collect();
        Self::new(move |conn| {
            let statements = Arc::clone(&statements);
            Box::pin(async move {
                for sql in statements.iter() {
                    debug!(sql = %sql, "Executing SQL");
                    sqlx::query(sql.as_str()).execute(&mut *conn).await?;
                }
                Ok(())
            })
        })
    }

    /// Runs the operation on the given connection.
    pub fn run<'c>(&self, conn: &'c mut SqliteConnection) -> BoxFuture<'c, Result<()>> {
        (self.0)(conn)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Operation(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Connection;

    #[tokio::test]
    async fn test_statements_run_in_order() {
        let mut conn = SqliteConnection::connect(":memory:").await.unwrap();
        let op = Operation::statements([
            "CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT)",
            "INSERT INTO people (name) VALUES ('alice')",
        ]);
        op.run(&mut conn).await.unwrap();

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM people")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(row.0, 1);
    }

    #[tokio::test]
    async fn test_operation_is_reusable() {
        let mut conn = SqliteConnection::connect(":memory:").await.unwrap();
        Operation::sql("CREATE TABLE counter (n INTEGER)")
            .run(&mut conn)
            .await
            .unwrap();
        let insert = Operation::sql("INSERT INTO counter VALUES (1)");
        insert.run(&mut conn).await.unwrap();
        insert.clone().run(&mut conn).await.unwrap();

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM counter")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(row.0, 2);
    }

    #[tokio::test]
    async fn test_failing_statement_propagates() {
        let mut conn = SqliteConnection::connect(":memory:").await.unwrap();
        let result = Operation::sql("DROP TABLE missing").run(&mut conn).await;
        assert!(matches!(result, Err(crate::MigrateError::Database(_))));
    }

    #[tokio::test]
    async fn test_noop() {
        let mut conn = SqliteConnection::connect(":memory:").await.unwrap();
        Operation::noop().run(&mut conn).await.unwrap();
    }
}
