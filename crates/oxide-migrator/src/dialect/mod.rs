//! Database dialect implementations.
//!
//! The ledger's table and column names are configurable, so its SQL is
//! built at runtime. Each dialect knows the statements that differ between
//! database systems; the portable ones are built by the ledger itself with
//! [`LedgerDialect::quote_identifier`].

mod sqlite;

pub use sqlite::SqliteDialect;

use crate::options::MigratorOptions;

/// Trait for database-specific ledger SQL generation.
pub trait LedgerDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Returns the SQL type for id columns of the given length.
    fn id_type(&self, size: u32) -> String {
        format!("VARCHAR({size})")
    }

    /// Returns the SQL type for timestamp columns.
    fn timestamp_type(&self) -> &'static str;

    /// Counts tables with the name bound as the only parameter.
    fn table_exists_sql(&self) -> String;

    /// Counts columns of `table` with the name bound as the only parameter.
    fn column_exists_sql(&self, table: &str) -> String;

    /// Generates the statements creating the ledger table and its indexes.
    fn create_ledger_sql(&self, options: &MigratorOptions) -> Vec<String> {
        let table = self.quote_identifier(&options.table_name);
        let id_type = self.id_type(options.id_column_size);
        let timestamp = self.timestamp_type();

        let create = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\n  \
             {id} {id_type} PRIMARY KEY,\n  \
             {created} {timestamp} NOT NULL,\n  \
             {updated} {timestamp} NOT NULL,\n  \
             {migration} {id_type} NOT NULL,\n  \
             {dependency} {id_type}\n)",
            id = self.quote_identifier("id"),
            created = self.quote_identifier("created_at"),
            updated = self.quote_identifier("updated_at"),
            migration = self.quote_identifier(&options.id_column_name),
            dependency = self.quote_identifier(&options.dependency_column_name),
        );

        let index = |column: &str| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {table} ({})",
                self.quote_identifier(&format!("idx_{}_{}", options.table_name, column)),
                self.quote_identifier(column),
            )
        };

        vec![
            create,
            index(&options.id_column_name),
            index(&options.dependency_column_name),
        ]
    }

    /// Generates SQL renaming a table.
    fn rename_table_sql(&self, old_name: &str, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_identifier(old_name),
            self.quote_identifier(new_name)
        )
    }

    /// Generates an insert that silently skips rows whose key already exists.
    ///
    /// Binds, in order: row key, migration id, dependency id, created at,
    /// updated at.
    fn insert_or_ignore_sql(&self, options: &MigratorOptions) -> String;

    /// Quote an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}
