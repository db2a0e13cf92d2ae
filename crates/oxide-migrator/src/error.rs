//! Error types for the migrator.

/// Errors that can occur while validating, resolving or running migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Neither migrations nor an init schema were supplied.
    #[error("No migration defined")]
    NoMigrationDefined,

    /// A migration was supplied without an identifier.
    #[error("Missing ID in migration")]
    MissingId,

    /// A migration uses the identifier reserved for schema initialization.
    #[error("Migration ID '{0}' is reserved")]
    ReservedId(String),

    /// Two supplied migrations share an identifier.
    #[error("Duplicated migration ID: {0}")]
    DuplicatedId(String),

    /// The requested target is not among the supplied migrations.
    #[error("Tried to migrate to an ID that doesn't exist: '{0}'")]
    MigrationIdNotFound(String),

    /// The requested target exists but its dependency chain cannot be satisfied.
    #[error("Migration '{0}' cannot run: its dependencies are unsatisfiable")]
    TargetDropped(String),

    /// The ledger holds migrations that are no longer supplied.
    #[error("Migration table contains unknown past migrations: {}", .0.join(", "))]
    UnknownPastMigration(Vec<String>),

    /// A rollback was requested for a migration without a backward operation.
    #[error("It's impossible to rollback migration '{0}'")]
    RollbackImpossible(String),

    /// Rolling back to a target would revert a migration the target keeps.
    #[error("Cannot rollback migration '{migration}': '{dependent}' depends on it and is kept")]
    RollbackBlocked {
        /// Migration being rolled back.
        migration: String,
        /// Kept migration depending on it.
        dependent: String,
    },

    /// A rollback of the last migration found nothing applied.
    #[error("Could not find last run migration")]
    NoAppliedMigration,

    /// Database error from the ledger or the session.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failure raised by a migration operation itself.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Broad classification of [`MigrateError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid migration set, detected before touching storage.
    Configuration,
    /// Missing or unreachable migrate-to / rollback-to target.
    Target,
    /// Ledger contents disagree with the supplied migrations.
    History,
    /// A rollback step has no backward operation.
    Reversibility,
    /// A forward or backward operation failed.
    Operation,
    /// The ledger or session storage failed.
    Storage,
}

impl MigrateError {
    /// Returns the category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NoMigrationDefined
            | Self::MissingId
            | Self::ReservedId(_)
            | Self::DuplicatedId(_) => ErrorCategory::Configuration,
            Self::MigrationIdNotFound(_)
            | Self::TargetDropped(_)
            | Self::RollbackBlocked { .. }
            | Self::NoAppliedMigration => ErrorCategory::Target,
            Self::UnknownPastMigration(_) => ErrorCategory::History,
            Self::RollbackImpossible(_) => ErrorCategory::Reversibility,
            Self::Other(_) => ErrorCategory::Operation,
            Self::Database(_) => ErrorCategory::Storage,
        }
    }
}

/// Result type for migrator operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
