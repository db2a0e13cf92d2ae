//! Dependency-aware code migrations for SQLite.
//!
//! `oxide-migrator` runs migrations written as Rust closures, where:
//! - Each migration declares the migrations it depends on
//! - Migrations whose dependencies cannot be satisfied are skipped, not failed
//! - Every applied migration is recorded in a ledger table, together with its
//!   dependency links
//! - Rolling back a migration first rolls back the applied migrations that
//!   depend on it
//!
//! # Architecture
//!
//! - **Operation** - An async closure run on the migration connection
//! - **Migration** - An id, a forward and an optional backward operation
//! - **Resolver** - Orders migrations by dependency and drops unsatisfiable ones
//! - **Ledger** - The table of applied migrations and their links
//! - **Migrator** - Applies and rolls back migrations, optionally in one transaction
//! - **Dialect** - Database-specific ledger SQL
//!
//! # Example
//!
//! ```rust,no_run
//! use oxide_migrator::prelude::*;
//! use sqlx::sqlite::SqlitePoolOptions;
//!
//! # async fn run() -> oxide_migrator::Result<()> {
//! let pool = SqlitePoolOptions::new().connect("sqlite::memory:").await?;
//!
//! let people = Migration::new(
//!     "201608301400",
//!     Operation::sql("CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT)"),
//! )
//! .backward(Operation::sql("DROP TABLE people"));
//!
//! let pets = Migration::new(
//!     "201608301430",
//!     Operation::statements([
//!         "CREATE TABLE pets (id INTEGER PRIMARY KEY, name TEXT)",
//!         "CREATE INDEX idx_pets_name ON pets (name)",
//!     ]),
//! )
//! .backward(Operation::sql("DROP TABLE pets"))
//! .depends_on(&people);
//!
//! let migrator = Migrator::new(
//!     pool,
//!     SqliteDialect::new(),
//!     MigratorOptions::default().use_transaction(true),
//!     vec![people, pets],
//! );
//!
//! let report = migrator.migrate().await?;
//! assert_eq!(report.applied, vec!["201608301400", "201608301430"]);
//! # Ok(())
//! # }
//! ```

pub mod dialect;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod migration;
pub mod operation;
pub mod options;
pub mod resolver;
pub mod session;
pub mod validate;

pub use error::{ErrorCategory, MigrateError, Result};
pub use executor::{MigrationReport, Migrator, RollbackReport, RunState};
pub use migration::{Migration, MigrationRef, SCHEMA_INIT};
pub use operation::Operation;
pub use options::MigratorOptions;
pub use resolver::Resolution;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::dialect::{LedgerDialect, SqliteDialect};
    pub use crate::error::{MigrateError, Result};
    pub use crate::executor::{MigrationReport, Migrator, RollbackReport};
    pub use crate::ledger::{Ledger, LedgerEntry};
    pub use crate::migration::{Migration, MigrationRef, SCHEMA_INIT};
    pub use crate::operation::Operation;
    pub use crate::options::MigratorOptions;
    pub use crate::resolver::Resolution;
}
