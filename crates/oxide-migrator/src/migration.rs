//! Migration records.

use crate::operation::Operation;

/// Identifier reserved for the row recording schema initialization.
pub const SCHEMA_INIT: &str = "SCHEMA_INIT";

/// A single schema change with a mandatory forward operation.
///
/// Migrations are built by the caller and stay read-only while the migrator
/// resolves and runs them.
#[derive(Debug, Clone)]
pub struct Migration {
    /// Caller-chosen identifier, unique within a run.
    pub id: String,
    /// Operation applying the change.
    pub forward: Operation,
    /// Operation reverting the change. `None` makes the migration irreversible.
    pub backward: Option<Operation>,
    /// Migrations that must have run before this one.
    pub dependencies: Vec<MigrationRef>,
    placeholder: bool,
}

impl Migration {
    /// Creates a migration from its identifier and forward operation.
    pub fn new(id: impl Into<String>, forward: Operation) -> Self {
        Self {
            id: id.into(),
            forward,
            backward: None,
            dependencies: Vec::new(),
            placeholder: false,
        }
    }

    /// Creates a no-op stand-in for a migration that is satisfied elsewhere.
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            placeholder: true,
            ..Self::new(id, Operation::noop())
        }
    }

    /// Sets the backward operation.
    #[must_use]
    pub fn backward(mut self, op: Operation) -> Self {
        self.backward = Some(op);
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn depends_on(mut self, dependency: impl Into<MigrationRef>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// Returns whether this migration can be rolled back.
    #[must_use]
    pub const fn is_reversible(&self) -> bool {
        self.backward.is_some()
    }

    /// Returns whether this is a stand-in produced from history.
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Returns the declared dependency ids, without repeats, in declaration order.
    #[must_use]
    pub fn dependency_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::with_capacity(self.dependencies.len());
        for dependency in &self.dependencies {
            let id = dependency.id();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Converts a fuller definition into a stand-in that keeps its rollback.
    ///
    /// A stand-in is already satisfied, so it carries no dependencies.
    pub(crate) fn into_placeholder(self) -> Self {
        Self {
            forward: Operation::noop(),
            dependencies: Vec::new(),
            placeholder: true,
            ..self
        }
    }
}

/// Reference to a dependency of a migration.
#[derive(Debug, Clone)]
pub enum MigrationRef {
    /// Bare reference by id: must be satisfied by history or by this run.
    Id(String),
    /// Fuller definition of the dependency.
    Defined(Box<Migration>),
}

impl MigrationRef {
    /// Returns the referenced migration id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Defined(migration) => &migration.id,
        }
    }

    /// Returns the fuller definition, if any.
    #[must_use]
    pub fn definition(&self) -> Option<&Migration> {
        match self {
            Self::Id(_) => None,
            Self::Defined(migration) => Some(migration),
        }
    }
}

impl From<&str> for MigrationRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for MigrationRef {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<Migration> for MigrationRef {
    fn from(migration: Migration) -> Self {
        Self::Defined(Box::new(migration))
    }
}

impl From<&Migration> for MigrationRef {
    fn from(migration: &Migration) -> Self {
        Self::Defined(Box::new(migration.clone()))
    }
}
