//! Unit of work for a migration run.

use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqlitePool;
use sqlx::{Sqlite, SqliteConnection, Transaction};
use tracing::debug;

use crate::error::Result;

/// Connection scope shared by every ledger access and operation of a run.
///
/// A transactional session wraps the whole run in one transaction. An
/// autocommit session makes each statement visible immediately, and
/// [`commit`](Self::commit) and [`rollback`](Self::rollback) do nothing.
pub enum Session {
    /// Run inside a single transaction.
    Transactional(Transaction<'static, Sqlite>),
    /// Run statement by statement.
    Autocommit(PoolConnection<Sqlite>),
}

impl Session {
    /// Opens a session on a connection from `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::MigrateError::Database)
    /// if no connection can be acquired or the transaction cannot start.
    pub async fn begin(pool: &SqlitePool, use_transaction: bool) -> Result<Self> {
        if use_transaction {
            debug!("Beginning transaction");
            Ok(Self::Transactional(pool.begin().await?))
        } else {
            Ok(Self::Autocommit(pool.acquire().await?))
        }
    }

    /// Returns whether the session wraps a transaction.
    #[must_use]
    pub const fn is_transactional(&self) -> bool {
        matches!(self, Self::Transactional(_))
    }

    /// Returns the session connection.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        match self {
            Self::Transactional(tx) => &mut **tx,
            Self::Autocommit(conn) => &mut **conn,
        }
    }

    /// Makes the session's changes permanent.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::MigrateError::Database)
    /// if the commit fails.
    pub async fn commit(self) -> Result<()> {
        if let Self::Transactional(tx) = self {
            debug!("Committing transaction");
            tx.commit().await?;
        }
        Ok(())
    }

    /// Discards the session's changes, when transactional.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::MigrateError::Database)
    /// if the rollback fails.
    pub async fn rollback(self) -> Result<()> {
        if let Self::Transactional(tx) = self {
            debug!("Rolling back transaction");
            tx.rollback().await?;
        }
        Ok(())
    }
}
