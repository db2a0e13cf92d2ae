//! Checks run on the supplied migrations before any storage access.

use std::collections::HashSet;

use crate::error::{MigrateError, Result};
use crate::migration::{Migration, SCHEMA_INIT};

/// Rejects missing, reserved and duplicated ids.
///
/// # Errors
///
/// Returns [`MigrateError::MissingId`], [`MigrateError::ReservedId`] or
/// [`MigrateError::DuplicatedId`] for the first offending migration.
pub fn validate_ids(migrations: &[Migration]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(migrations.len());
    for migration in migrations {
        if migration.id.is_empty() {
            return Err(MigrateError::MissingId);
        }
        if migration.id == SCHEMA_INIT {
            return Err(MigrateError::ReservedId(migration.id.clone()));
        }
        if !seen.insert(migration.id.as_str()) {
            return Err(MigrateError::DuplicatedId(migration.id.clone()));
        }
    }
    Ok(())
}

/// Rejects a target that is not among the supplied migrations.
///
/// # Errors
///
/// Returns [`MigrateError::MigrationIdNotFound`] for an unknown target.
pub fn validate_target(migrations: &[Migration], target: &str) -> Result<()> {
    if migrations.iter().any(|m| m.id == target) {
        Ok(())
    } else {
        Err(MigrateError::MigrationIdNotFound(target.to_string()))
    }
}

/// Returns the ledger ids that match neither a supplied migration nor
/// the schema initialization marker.
#[must_use]
pub fn unknown_past_migrations(ledger_ids: &[String], migrations: &[Migration]) -> Vec<String> {
    let known: HashSet<&str> = migrations.iter().map(|m| m.id.as_str()).collect();
    ledger_ids
        .iter()
        .filter(|id| id.as_str() != SCHEMA_INIT && !known.contains(id.as_str()))
        .cloned()
        .collect()
}
