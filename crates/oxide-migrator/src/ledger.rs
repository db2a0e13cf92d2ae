//! Migration ledger.
//!
//! This module manages the table recording which migrations have been
//! applied. Every applied migration owns one *presence row* keyed by its id
//! with a null dependency, plus one *link row* per declared dependency.
//! Link rows let a rollback find the applied migrations that depend on the
//! one being reverted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::dialect::LedgerDialect;
use crate::error::Result;
use crate::options::{MigratorOptions, DEFAULT_TABLE_NAME};

/// A row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    /// Row key.
    pub id: String,
    /// Applied migration.
    pub migration_id: String,
    /// Migration the applied one depends on, for link rows.
    pub dependency_id: Option<String>,
    /// When the row was written.
    pub created_at: DateTime<Utc>,
    /// When the row was last changed.
    pub updated_at: DateTime<Utc>,
}

/// Returns the row key of a presence row (`dependency_id == None`) or of a
/// link row.
#[must_use]
pub fn row_key(migration_id: &str, dependency_id: Option<&str>) -> String {
    dependency_id.map_or_else(
        || migration_id.to_string(),
        |dependency| format!("{migration_id}->{dependency}"),
    )
}

/// Reads and writes the ledger table through a caller-provided connection.
#[derive(Debug, Clone)]
pub struct Ledger<D: LedgerDialect> {
    dialect: D,
    options: MigratorOptions,
    table: String,
    id_column: String,
    dependency_column: String,
}

impl<D: LedgerDialect> Ledger<D> {
    /// Creates a ledger for the table described by `options`.
    pub fn new(dialect: D, options: MigratorOptions) -> Self {
        let table = dialect.quote_identifier(&options.table_name);
        let id_column = dialect.quote_identifier(&options.id_column_name);
        let dependency_column = dialect.quote_identifier(&options.dependency_column_name);
        Self {
            dialect,
            options,
            table,
            id_column,
            dependency_column,
        }
    }

    /// Returns the options naming the ledger table and columns.
    #[must_use]
    pub const fn options(&self) -> &MigratorOptions {
        &self.options
    }

    /// Checks whether a table exists.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::MigrateError::Database)
    /// if the query fails.
    pub async fn table_exists(&self, conn: &mut SqliteConnection, name: &str) -> Result<bool> {
        let sql = self.dialect.table_exists_sql();
        let row: (i64,) = sqlx::query_as(&sql).bind(name).fetch_one(&mut *conn).await?;
        Ok(row.0 > 0)
    }

    async fn column_exists(
        &self,
        conn: &mut SqliteConnection,
        table: &str,
        column: &str,
    ) -> Result<bool> {
        let sql = self.dialect.column_exists_sql(table);
        let row: (i64,) = sqlx::query_as(&sql)
            .bind(column)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.0 > 0)
    }

    /// Ensures the ledger table exists.
    ///
    /// When a custom table name is configured and only a default-named
    /// ledger exists, that table is renamed instead of creating a new one.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::MigrateError::Database)
    /// if the table cannot be inspected, created or renamed.
    pub async fn ensure_table(&self, conn: &mut SqliteConnection) -> Result<()> {
        let name = &self.options.table_name;
        if self.table_exists(conn, name).await? {
            return Ok(());
        }

        if name != DEFAULT_TABLE_NAME
            && self.table_exists(conn, DEFAULT_TABLE_NAME).await?
            && self
                .column_exists(conn, DEFAULT_TABLE_NAME, &self.options.id_column_name)
                .await?
        {
            info!(from = DEFAULT_TABLE_NAME, to = %name, "Renaming migration table");
            let sql = self.dialect.rename_table_sql(DEFAULT_TABLE_NAME, name);
            sqlx::query(&sql).execute(&mut *conn).await?;
            return Ok(());
        }

        for sql in self.dialect.create_ledger_sql(&self.options) {
            debug!(sql = %sql, "Executing SQL");
            sqlx::query(&sql).execute(&mut *conn).await?;
        }
        info!(table = %name, dialect = self.dialect.name(), "Created migration table");
        Ok(())
    }

    /// Checks if a migration has been applied.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::MigrateError::Database)
    /// if the query fails.
    pub async fn is_applied(&self, conn: &mut SqliteConnection, id: &str) -> Result<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?",
            self.table, self.id_column
        );
        let row: (i64,) = sqlx::query_as(&sql).bind(id).fetch_one(&mut *conn).await?;
        Ok(row.0 > 0)
    }

    /// Counts ledger rows.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::MigrateError::Database)
    /// if the query fails.
    pub async fn count(&self, conn: &mut SqliteConnection) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let row: (i64,) = sqlx::query_as(&sql).fetch_one(&mut *conn).await?;
        Ok(row.0)
    }

    /// Returns the distinct applied ids, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::MigrateError::Database)
    /// if the query fails.
    pub async fn applied_ids(&self, conn: &mut SqliteConnection) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT {id} FROM {table} GROUP BY {id} ORDER BY MIN(rowid)",
            id = self.id_column,
            table = self.table,
        );
        let rows: Vec<(String,)> = sqlx::query_as(&sql).fetch_all(&mut *conn).await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Returns the applied migrations that declared a dependency on `id`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::MigrateError::Database)
    /// if the query fails.
    pub async fn dependents_of(&self, conn: &mut SqliteConnection, id: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT {id} FROM {table} WHERE {dep} = ? AND {id} <> ? GROUP BY {id} ORDER BY MIN(rowid)",
            id = self.id_column,
            table = self.table,
            dep = self.dependency_column,
        );
        let rows: Vec<(String,)> = sqlx::query_as(&sql)
            .bind(id)
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Records a migration as applied, with a link row per dependency.
    ///
    /// Rows that already exist are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::MigrateError::Database)
    /// if a row cannot be inserted.
    pub async fn record(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        dependencies: &[&str],
    ) -> Result<()> {
        let sql = self.dialect.insert_or_ignore_sql(&self.options);
        let now = Utc::now();

        let rows = std::iter::once(None).chain(dependencies.iter().map(|d| Some(*d)));
        for dependency in rows {
            sqlx::query(&sql)
                .bind(row_key(id, dependency))
                .bind(id)
                .bind(dependency)
                .bind(now)
                .bind(now)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Removes every row of a migration. Returns the number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::MigrateError::Database)
    /// if the query fails.
    pub async fn remove(&self, conn: &mut SqliteConnection, id: &str) -> Result<u64> {
        let sql = format!("DELETE FROM {} WHERE {} = ?", self.table, self.id_column);
        let result = sqlx::query(&sql).bind(id).execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }

    /// Clears the dependency of every link row pointing at `id`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::MigrateError::Database)
    /// if the query fails.
    pub async fn detach_dependents(&self, conn: &mut SqliteConnection, id: &str) -> Result<u64> {
        let sql = format!(
            "UPDATE {table} SET {dep} = NULL, {updated} = ? WHERE {dep} = ?",
            table = self.table,
            dep = self.dependency_column,
            updated = self.dialect.quote_identifier("updated_at"),
        );
        let result = sqlx::query(&sql)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Gets all ledger rows in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::MigrateError::Database)
    /// if the query fails or a row cannot be decoded.
    pub async fn entries(&self, conn: &mut SqliteConnection) -> Result<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT {key}, {id}, {dep}, {created}, {updated} FROM {table} ORDER BY rowid",
            key = self.dialect.quote_identifier("id"),
            id = self.id_column,
            dep = self.dependency_column,
            created = self.dialect.quote_identifier("created_at"),
            updated = self.dialect.quote_identifier("updated_at"),
            table = self.table,
        );
        let rows: Vec<(String, String, Option<String>, DateTime<Utc>, DateTime<Utc>)> =
            sqlx::query_as(&sql).fetch_all(&mut *conn).await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, migration_id, dependency_id, created_at, updated_at)| LedgerEntry {
                    id,
                    migration_id,
                    dependency_id,
                    created_at,
                    updated_at,
                },
            )
            .collect())
    }
}
