//! SQLite dialect for the ledger.

use crate::options::MigratorOptions;

use super::LedgerDialect;

/// SQLite ledger dialect.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LedgerDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn timestamp_type(&self) -> &'static str {
        "TIMESTAMP"
    }

    fn table_exists_sql(&self) -> String {
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?".to_string()
    }

    fn column_exists_sql(&self, table: &str) -> String {
        // pragma_table_info takes the table name as a string literal.
        format!(
            "SELECT COUNT(*) FROM pragma_table_info('{}') WHERE name = ?",
            table.replace('\'', "''")
        )
    }

    fn insert_or_ignore_sql(&self, options: &MigratorOptions) -> String {
        format!(
            "INSERT OR IGNORE INTO {} ({}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?)",
            self.quote_identifier(&options.table_name),
            self.quote_identifier("id"),
            self.quote_identifier(&options.id_column_name),
            self.quote_identifier(&options.dependency_column_name),
            self.quote_identifier("created_at"),
            self.quote_identifier("updated_at"),
        )
    }
}
