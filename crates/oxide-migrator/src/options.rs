//! Migrator configuration.

use serde::{Deserialize, Serialize};

/// Default name of the ledger table.
pub const DEFAULT_TABLE_NAME: &str = "migrations";

/// Options shared by every run of a [`Migrator`](crate::executor::Migrator).
///
/// # Example
///
/// ```rust
/// use oxide_migrator::MigratorOptions;
///
/// let options = MigratorOptions::default()
///     .table_name("schema_history")
///     .use_transaction(true);
/// assert_eq!(options.id_column_name, "migration_id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigratorOptions {
    /// Ledger table name.
    pub table_name: String,
    /// Column storing the migration id.
    pub id_column_name: String,
    /// Declared length of id columns.
    pub id_column_size: u32,
    /// Column storing the id of the migration depended on.
    pub dependency_column_name: String,
    /// Wraps each run in a single transaction.
    ///
    /// Not every database supports DDL inside transactions; SQLite does.
    pub use_transaction: bool,
    /// Fails a forward run when the ledger holds ids no longer supplied.
    pub validate_unknown_migrations: bool,
}

impl Default for MigratorOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            id_column_name: "migration_id".to_string(),
            id_column_size: 255,
            dependency_column_name: "dependency_id".to_string(),
            use_transaction: false,
            validate_unknown_migrations: false,
        }
    }
}

impl MigratorOptions {
    /// Sets the ledger table name.
    #[must_use]
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    /// Sets the migration id column name.
    #[must_use]
    pub fn id_column_name(mut self, name: impl Into<String>) -> Self {
        self.id_column_name = name.into();
        self
    }

    /// Sets the declared length of id columns.
    #[must_use]
    pub const fn id_column_size(mut self, size: u32) -> Self {
        self.id_column_size = size;
        self
    }

    /// Sets the dependency column name.
    #[must_use]
    pub fn dependency_column_name(mut self, name: impl Into<String>) -> Self {
        self.dependency_column_name = name.into();
        self
    }

    /// Enables or disables the per-run transaction.
    #[must_use]
    pub const fn use_transaction(mut self, enabled: bool) -> Self {
        self.use_transaction = enabled;
        self
    }

    /// Enables or disables the unknown past migration check.
    #[must_use]
    pub const fn validate_unknown_migrations(mut self, enabled: bool) -> Self {
        self.validate_unknown_migrations = enabled;
        self
    }
}
