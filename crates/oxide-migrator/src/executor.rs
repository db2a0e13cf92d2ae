//! Migration executor.
//!
//! This module applies and rolls back migrations against a database, in the
//! order computed by the [resolver](crate::resolver), while keeping the
//! [ledger](crate::ledger) up to date.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use futures::future::BoxFuture;
use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use crate::dialect::LedgerDialect;
use crate::error::{MigrateError, Result};
use crate::ledger::Ledger;
use crate::migration::{Migration, SCHEMA_INIT};
use crate::operation::Operation;
use crate::options::MigratorOptions;
use crate::resolver::{resolve, Resolution};
use crate::session::Session;
use crate::validate::{unknown_past_migrations, validate_ids, validate_target};

/// Stage of a migration run, as reported in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run in progress.
    Idle,
    /// Reading history and ordering migrations.
    Resolving,
    /// Running operations.
    Applying,
    /// The run finished and its changes are kept.
    Committed,
    /// The run failed and its session was rolled back.
    RolledBack,
}

/// Outcome of a forward run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Migrations whose forward operation ran, in order.
    pub applied: Vec<String>,
    /// Supplied migrations that had already been applied.
    pub skipped: Vec<String>,
    /// Supplied migrations left out because their dependencies are unsatisfiable.
    pub dropped: Vec<String>,
    /// Whether the init schema ran instead of the migrations.
    pub initialized_schema: bool,
}

/// Outcome of a backward run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    /// Migrations whose backward operation ran, in order.
    pub rolled_back: Vec<String>,
}

/// Bookkeeping for one cascading rollback.
struct Cascade<'m> {
    definitions: HashMap<&'m str, &'m Migration>,
    /// Migrations the run must leave applied.
    kept: HashSet<&'m str>,
    visited: HashSet<String>,
    report: RollbackReport,
}

impl<'m> Cascade<'m> {
    fn new(definitions: HashMap<&'m str, &'m Migration>) -> Self {
        Self {
            definitions,
            kept: HashSet::new(),
            visited: HashSet::new(),
            report: RollbackReport::default(),
        }
    }
}

/// Applies and rolls back a set of migrations.
///
/// # Example
///
/// ```rust,no_run
/// use oxide_migrator::prelude::*;
/// use sqlx::sqlite::SqlitePoolOptions;
///
/// # async fn run() -> oxide_migrator::Result<()> {
/// let pool = SqlitePoolOptions::new().connect("sqlite:db.sqlite3").await?;
/// let migrations = vec![
///     Migration::new("1", Operation::sql("CREATE TABLE people (id INTEGER PRIMARY KEY)"))
///         .backward(Operation::sql("DROP TABLE people")),
///     Migration::new("2", Operation::sql("CREATE TABLE pets (id INTEGER PRIMARY KEY)"))
///         .backward(Operation::sql("DROP TABLE pets"))
///         .depends_on("1"),
/// ];
///
/// let migrator = Migrator::new(pool, SqliteDialect::new(), MigratorOptions::default(), migrations);
/// migrator.migrate().await?;
/// migrator.rollback_last().await?;
/// # Ok(())
/// # }
/// ```
pub struct Migrator<D: LedgerDialect> {
    pool: SqlitePool,
    ledger: Ledger<D>,
    migrations: Vec<Migration>,
    init_schema: Option<Operation>,
}

impl<D: LedgerDialect> Migrator<D> {
    /// Creates a new migrator.
    pub fn new(
        pool: SqlitePool,
        dialect: D,
        options: MigratorOptions,
        migrations: Vec<Migration>,
    ) -> Self {
        Self {
            pool,
            ledger: Ledger::new(dialect, options),
            migrations,
            init_schema: None,
        }
    }

    /// Sets an operation that builds the whole schema on a fresh database.
    ///
    /// It runs instead of the migrations when the ledger is empty, and all
    /// supplied migrations are then recorded as applied.
    #[must_use]
    pub fn init_schema(mut self, op: Operation) -> Self {
        self.init_schema = Some(op);
        self
    }

    /// Returns the supplied migrations.
    #[must_use]
    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Returns the options.
    #[must_use]
    pub const fn options(&self) -> &MigratorOptions {
        self.ledger.options()
    }

    /// Returns the ledger.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger<D> {
        &self.ledger
    }

    /// Applies every migration that did not run yet.
    ///
    /// # Errors
    ///
    /// Fails on an invalid migration set, on unknown past migrations when
    /// those are checked, and on any ledger or operation failure.
    pub async fn migrate(&self) -> Result<MigrationReport> {
        self.run_forward(None).await
    }

    /// Applies migrations up to and including `id`.
    ///
    /// # Errors
    ///
    /// Same as [`migrate`](Self::migrate), plus
    /// [`MigrateError::MigrationIdNotFound`] for an unknown target and
    /// [`MigrateError::TargetDropped`] when the target cannot run.
    pub async fn migrate_to(&self, id: &str) -> Result<MigrationReport> {
        self.run_forward(Some(id)).await
    }

    /// Rolls back every applied migration after `id`, in reverse order.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::MigrationIdNotFound`] for an unknown target,
    /// [`MigrateError::RollbackImpossible`] when a migration to revert has no
    /// backward operation, and [`MigrateError::RollbackBlocked`] when a
    /// migration at or before the target depends on one to revert.
    pub async fn rollback_to(&self, id: &str) -> Result<RollbackReport> {
        self.run_backward(Some(id)).await
    }

    /// Rolls back every applied migration, in reverse order.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::RollbackImpossible`] when an applied migration
    /// has no backward operation, or any ledger or operation failure.
    pub async fn rollback_all(&self) -> Result<RollbackReport> {
        self.run_backward(None).await
    }

    /// Rolls back the last applied migration.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::NoAppliedMigration`] when nothing supplied is
    /// applied, or fails like [`rollback_all`](Self::rollback_all).
    pub async fn rollback_last(&self) -> Result<RollbackReport> {
        if self.migrations.is_empty() {
            return Err(MigrateError::NoMigrationDefined);
        }
        validate_ids(&self.migrations)?;

        let mut session = Session::begin(&self.pool, self.options().use_transaction).await?;
        let result = self.rollback_last_in(session.conn()).await;
        self.finish(session, result).await
    }

    /// Rolls back a single migration, and the applied migrations depending on it.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::MigrationIdNotFound`] for an unknown id, or
    /// fails like [`rollback_all`](Self::rollback_all).
    pub async fn rollback_migration(&self, id: &str) -> Result<RollbackReport> {
        validate_ids(&self.migrations)?;
        let migration = *self
            .definitions()
            .get(id)
            .ok_or_else(|| MigrateError::MigrationIdNotFound(id.to_string()))?;

        let mut session = Session::begin(&self.pool, self.options().use_transaction).await?;
        let result = self.rollback_one_in(session.conn(), migration).await;
        self.finish(session, result).await
    }

    /// Resolves the migrations against the ledger without running anything.
    ///
    /// # Errors
    ///
    /// Fails on an invalid migration set or when the ledger cannot be read.
    pub async fn plan(&self) -> Result<Resolution> {
        validate_ids(&self.migrations)?;
        let mut session = Session::begin(&self.pool, false).await?;
        let conn = session.conn();

        let applied: HashSet<String> =
            if self.ledger.table_exists(conn, &self.options().table_name).await? {
                self.ledger.applied_ids(conn).await?.into_iter().collect()
            } else {
                HashSet::new()
            };
        Ok(resolve(&self.migrations, &applied))
    }

    /// Returns the ids of the migrations a forward run would apply, in order.
    ///
    /// When an init schema is set and the ledger is still empty, the next run
    /// only records the migrations, so nothing is pending.
    ///
    /// # Errors
    ///
    /// Fails like [`plan`](Self::plan).
    pub async fn pending(&self) -> Result<Vec<String>> {
        validate_ids(&self.migrations)?;
        if self.init_schema.is_some() {
            let mut session = Session::begin(&self.pool, false).await?;
            let conn = session.conn();
            if !self.ledger.table_exists(conn, &self.options().table_name).await?
                || self.can_initialize_schema(conn).await?
            {
                return Ok(Vec::new());
            }
        }

        let resolution = self.plan().await?;
        Ok(resolution
            .sorted
            .into_iter()
            .filter(|m| !m.is_placeholder())
            .map(|m| m.id)
            .collect())
    }

    async fn run_forward(&self, target: Option<&str>) -> Result<MigrationReport> {
        if self.migrations.is_empty() && self.init_schema.is_none() {
            return Err(MigrateError::NoMigrationDefined);
        }
        validate_ids(&self.migrations)?;
        if let Some(target) = target {
            validate_target(&self.migrations, target)?;
        }

        let mut session = Session::begin(&self.pool, self.options().use_transaction).await?;
        let result = self.forward_in(session.conn(), target).await;
        self.finish(session, result).await
    }

    async fn run_backward(&self, target: Option<&str>) -> Result<RollbackReport> {
        validate_ids(&self.migrations)?;
        if let Some(target) = target {
            validate_target(&self.migrations, target)?;
        }

        let mut session = Session::begin(&self.pool, self.options().use_transaction).await?;
        let result = self.backward_in(session.conn(), target).await;
        self.finish(session, result).await
    }

    /// Commits the session on success, rolls it back on failure.
    async fn finish<T>(&self, session: Session, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                session.commit().await?;
                debug!(state = ?RunState::Committed, "Run finished");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = session.rollback().await {
                    warn!(error = %rollback_err, "Failed to roll back session");
                }
                debug!(state = ?RunState::RolledBack, error = %err, "Run aborted");
                Err(err)
            }
        }
    }

    async fn forward_in(
        &self,
        conn: &mut SqliteConnection,
        target: Option<&str>,
    ) -> Result<MigrationReport> {
        self.ledger.ensure_table(conn).await?;

        if self.options().validate_unknown_migrations {
            let ids = self.ledger.applied_ids(conn).await?;
            let unknown = unknown_past_migrations(&ids, &self.migrations);
            if !unknown.is_empty() {
                return Err(MigrateError::UnknownPastMigration(unknown));
            }
        }

        if let Some(init_schema) = &self.init_schema {
            if self.can_initialize_schema(conn).await? {
                return self.run_init_schema(conn, init_schema).await;
            }
        }

        debug!(state = ?RunState::Resolving, "Resolving dependencies");
        let applied: HashSet<String> = self.ledger.applied_ids(conn).await?.into_iter().collect();
        let resolution = resolve(&self.migrations, &applied);

        let mut report = MigrationReport::default();
        for dropped in resolution.dropped.iter().filter(|m| !m.is_placeholder()) {
            warn!(
                migration = %dropped.id,
                "Dependencies cannot be satisfied, migration will not run"
            );
            report.dropped.push(dropped.id.clone());
        }
        if let Some(target) = target {
            if resolution.is_dropped(target) {
                return Err(MigrateError::TargetDropped(target.to_string()));
            }
        }

        debug!(state = ?RunState::Applying, count = resolution.sorted.len(), "Applying migrations");
        let supplied: HashSet<&str> = self.migrations.iter().map(|m| m.id.as_str()).collect();
        for migration in &resolution.sorted {
            if self.ledger.is_applied(conn, &migration.id).await? {
                debug!(migration = %migration.id, "Migration already applied, skipping");
                if supplied.contains(migration.id.as_str()) {
                    report.skipped.push(migration.id.clone());
                }
            } else {
                info!(migration = %migration.id, "Applying migration");
                migration.forward.run(conn).await?;
                self.ledger
                    .record(conn, &migration.id, &migration.dependency_ids())
                    .await?;
                report.applied.push(migration.id.clone());
            }

            if target == Some(migration.id.as_str()) {
                break;
            }
        }

        info!(applied = report.applied.len(), "Migrations applied");
        Ok(report)
    }

    async fn can_initialize_schema(&self, conn: &mut SqliteConnection) -> Result<bool> {
        if self.ledger.is_applied(conn, SCHEMA_INIT).await? {
            return Ok(false);
        }
        Ok(self.ledger.count(conn).await? == 0)
    }

    async fn run_init_schema(
        &self,
        conn: &mut SqliteConnection,
        init_schema: &Operation,
    ) -> Result<MigrationReport> {
        info!("Initializing schema");
        init_schema.run(conn).await?;
        self.ledger.record(conn, SCHEMA_INIT, &[]).await?;
        for migration in &self.migrations {
            self.ledger
                .record(conn, &migration.id, &migration.dependency_ids())
                .await?;
        }

        Ok(MigrationReport {
            initialized_schema: true,
            ..MigrationReport::default()
        })
    }

    async fn backward_in(
        &self,
        conn: &mut SqliteConnection,
        target: Option<&str>,
    ) -> Result<RollbackReport> {
        self.ledger.ensure_table(conn).await?;

        let mut state = Cascade::new(self.definitions());
        if let Some(target) = target {
            for migration in &self.migrations {
                state.kept.insert(migration.id.as_str());
                if migration.id == target {
                    break;
                }
            }
        }

        for migration in self.migrations.iter().rev() {
            if target == Some(migration.id.as_str()) {
                break;
            }
            if self.ledger.is_applied(conn, &migration.id).await? {
                self.cascade(conn, migration, &mut state).await?;
            }
        }
        Ok(state.report)
    }

    async fn rollback_last_in(&self, conn: &mut SqliteConnection) -> Result<RollbackReport> {
        self.ledger.ensure_table(conn).await?;

        let mut last = None;
        for migration in self.migrations.iter().rev() {
            if self.ledger.is_applied(conn, &migration.id).await? {
                last = Some(migration);
                break;
            }
        }
        let migration = last.ok_or(MigrateError::NoAppliedMigration)?;

        self.rollback_one_in(conn, migration).await
    }

    async fn rollback_one_in(
        &self,
        conn: &mut SqliteConnection,
        migration: &Migration,
    ) -> Result<RollbackReport> {
        self.ledger.ensure_table(conn).await?;

        if !self.ledger.is_applied(conn, &migration.id).await? {
            warn!(migration = %migration.id, "Migration not applied, skipping rollback");
            return Ok(RollbackReport::default());
        }

        let mut state = Cascade::new(self.definitions());
        self.cascade(conn, migration, &mut state).await?;
        Ok(state.report)
    }

    /// Rolls back `migration` after the applied migrations depending on it.
    ///
    /// Walks the ledger's dependency links depth-first, handling each
    /// migration at most once per run. Dependents without a known definition
    /// cannot be reverted; their links are detached instead. Reaching a kept
    /// migration fails the run.
    fn cascade<'a, 'm: 'a>(
        &'a self,
        conn: &'a mut SqliteConnection,
        migration: &'m Migration,
        state: &'a mut Cascade<'m>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if !state.visited.insert(migration.id.clone()) {
                return Ok(());
            }
            let backward = migration
                .backward
                .as_ref()
                .ok_or_else(|| MigrateError::RollbackImpossible(migration.id.clone()))?;

            let mut dependents = self.ledger.dependents_of(conn, &migration.id).await?;
            dependents.sort_by_key(|id| Reverse(self.position(id)));

            let mut detach = false;
            for dependent in &dependents {
                if state.visited.contains(dependent) {
                    continue;
                }
                if let Some(definition) = state.definitions.get(dependent.as_str()).copied() {
                    if !self.ledger.is_applied(conn, dependent).await? {
                        continue;
                    }
                    if state.kept.contains(dependent.as_str()) {
                        return Err(MigrateError::RollbackBlocked {
                            migration: migration.id.clone(),
                            dependent: dependent.clone(),
                        });
                    }
                    debug!(
                        migration = %migration.id,
                        dependent = %dependent,
                        "Cascading rollback"
                    );
                    self.cascade(conn, definition, state).await?;
                } else {
                    warn!(
                        migration = %migration.id,
                        dependent = %dependent,
                        "Dependent migration is unknown, detaching it"
                    );
                    detach = true;
                }
            }
            if detach {
                self.ledger.detach_dependents(conn, &migration.id).await?;
            }

            info!(migration = %migration.id, "Rolling back migration");
            backward.run(conn).await?;
            self.ledger.remove(conn, &migration.id).await?;
            state.report.rolled_back.push(migration.id.clone());
            Ok(())
        })
    }

    /// Position of `id` in the supplied list.
    fn position(&self, id: &str) -> Option<usize> {
        self.migrations.iter().position(|m| m.id == id)
    }

    /// Every definition reachable from the supplied migrations, including
    /// fuller definitions given as dependencies. Supplied ones win.
    fn definitions(&self) -> HashMap<&str, &Migration> {
        let mut definitions: HashMap<&str, &Migration> = HashMap::new();
        let mut stack: Vec<&Migration> = self.migrations.iter().rev().collect();
        for migration in &self.migrations {
            definitions.insert(migration.id.as_str(), migration);
        }

        while let Some(migration) = stack.pop() {
            for definition in migration
                .dependencies
                .iter()
                .filter_map(|dependency| dependency.definition())
            {
                if !definitions.contains_key(definition.id.as_str()) {
                    definitions.insert(definition.id.as_str(), definition);
                    stack.push(definition);
                }
            }
        }
        definitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqliteDialect;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn create_test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("Failed to create in-memory SQLite pool")
    }

    fn migrator(pool: &SqlitePool, migrations: Vec<Migration>) -> Migrator<SqliteDialect> {
        Migrator::new(
            pool.clone(),
            SqliteDialect::new(),
            MigratorOptions::default(),
            migrations,
        )
    }

    fn counting(counter: &Arc<AtomicUsize>) -> Operation {
        let counter = Arc::clone(counter);
        Operation::new(move |_| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
    }

    fn create_table(id: &str, table: &str) -> Migration {
        Migration::new(
            id,
            Operation::sql(format!("CREATE TABLE {table} (id INTEGER PRIMARY KEY)")),
        )
        .backward(Operation::sql(format!("DROP TABLE {table}")))
    }

    async fn has_table(pool: &SqlitePool, name: &str) -> bool {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(name)
                .fetch_one(pool)
                .await
                .unwrap();
        row.0 > 0
    }

    #[tokio::test]
    async fn test_migrate_twice_is_noop() {
        let pool = create_test_pool().await;
        let counter = Arc::new(AtomicUsize::new(0));
        let migrations = vec![
            Migration::new("1", counting(&counter)),
            Migration::new("2", counting(&counter)).depends_on("1"),
        ];
        let migrator = migrator(&pool, migrations);

        let first = migrator.migrate().await.unwrap();
        assert_eq!(first.applied, vec!["1", "2"]);
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        let second = migrator.migrate().await.unwrap();
        assert!(second.applied.is_empty());
        assert_eq!(second.skipped, vec!["1", "2"]);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_history_dependency_runs_only_new_work() {
        let pool = create_test_pool().await;
        let counter = Arc::new(AtomicUsize::new(0));

        migrator(&pool, vec![Migration::new("1", counting(&counter))])
            .migrate()
            .await
            .unwrap();

        let migrator = migrator(
            &pool,
            vec![Migration::new("2", counting(&counter)).depends_on("1")],
        );
        let plan = migrator.plan().await.unwrap();
        assert_eq!(plan.sorted_ids(), vec!["1", "2"]);
        assert!(plan.sorted[0].is_placeholder());
        assert_eq!(migrator.pending().await.unwrap(), vec!["2"]);

        let report = migrator.migrate().await.unwrap();
        assert_eq!(report.applied, vec!["2"]);
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        let mut conn = pool.acquire().await.unwrap();
        let dependents = migrator.ledger().dependents_of(&mut conn, "1").await.unwrap();
        assert_eq!(dependents, vec!["2"]);
    }

    #[tokio::test]
    async fn test_unsatisfiable_migration_is_skipped() {
        let pool = create_test_pool().await;
        let counter = Arc::new(AtomicUsize::new(0));
        let migrations = vec![
            Migration::new("1", counting(&counter)),
            Migration::new(
                "(will not run)",
                Operation::new(|_| {
                    Box::pin(async {
                        Err::<(), _>(MigrateError::Other(anyhow::anyhow!("should not run")))
                    })
                }),
            )
            .depends_on("NotSatisfied"),
        ];
        let migrator = migrator(&pool, migrations);

        let report = migrator.migrate().await.unwrap();
        assert_eq!(report.applied, vec!["1"]);
        assert_eq!(report.dropped, vec!["(will not run)"]);

        let result = migrator.migrate_to("(will not run)").await;
        assert!(matches!(result, Err(MigrateError::TargetDropped(id)) if id == "(will not run)"));
    }

    #[tokio::test]
    async fn test_migrate_to_missing_target_applies_nothing() {
        let pool = create_test_pool().await;
        let migrator = migrator(&pool, vec![create_table("1", "people")]);

        let result = migrator.migrate_to("X").await;
        assert!(matches!(result, Err(MigrateError::MigrationIdNotFound(id)) if id == "X"));
        assert!(!has_table(&pool, "people").await);
        assert!(!has_table(&pool, "migrations").await);
    }

    #[tokio::test]
    async fn test_rollback_cascades_to_dependents() {
        let pool = create_test_pool().await;
        let migrations = vec![
            create_table("1", "people"),
            create_table("2", "pets").depends_on("1"),
            create_table("3", "books"),
            create_table("4", "toys").depends_on("2").depends_on("1"),
        ];
        let migrator = migrator(&pool, migrations);
        migrator.migrate().await.unwrap();

        let report = migrator.rollback_migration("1").await.unwrap();
        assert_eq!(report.rolled_back, vec!["4", "2", "1"]);
        assert!(!has_table(&pool, "people").await);
        assert!(!has_table(&pool, "pets").await);
        assert!(!has_table(&pool, "toys").await);
        assert!(has_table(&pool, "books").await);

        // Rolling back again is a no-op.
        let report = migrator.rollback_migration("1").await.unwrap();
        assert!(report.rolled_back.is_empty());
    }

    #[tokio::test]
    async fn test_cascade_needs_reversible_target() {
        let pool = create_test_pool().await;
        let migrations = vec![
            Migration::new("1", Operation::noop()),
            create_table("2", "pets").depends_on("1"),
        ];
        let migrator = migrator(&pool, migrations);
        migrator.migrate().await.unwrap();

        let result = migrator.rollback_migration("1").await;
        assert!(matches!(result, Err(MigrateError::RollbackImpossible(id)) if id == "1"));
        assert!(has_table(&pool, "pets").await);
    }

    #[tokio::test]
    async fn test_unknown_dependent_is_detached() {
        let pool = create_test_pool().await;
        migrator(
            &pool,
            vec![
                create_table("1", "people"),
                create_table("2", "pets").depends_on("1"),
            ],
        )
        .migrate()
        .await
        .unwrap();

        let migrator = migrator(&pool, vec![create_table("1", "people")]);
        let report = migrator.rollback_last().await.unwrap();
        assert_eq!(report.rolled_back, vec!["1"]);

        let mut conn = pool.acquire().await.unwrap();
        let ledger = migrator.ledger();
        assert!(ledger.is_applied(&mut conn, "2").await.unwrap());
        assert!(ledger.dependents_of(&mut conn, "1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_uses_defined_dependency() {
        let pool = create_test_pool().await;
        let people = create_table("1", "people");
        let pets = create_table("2", "pets").depends_on(&people);
        migrator(&pool, vec![people.clone(), pets.clone()])
            .migrate()
            .await
            .unwrap();

        // Only "3" is supplied; "1" is known through its fuller definition.
        let migrator = migrator(&pool, vec![create_table("3", "books").depends_on(pets)]);
        migrator.migrate().await.unwrap();
        assert!(has_table(&pool, "books").await);

        let report = migrator.rollback_migration("1").await.unwrap();
        assert_eq!(report.rolled_back, vec!["3", "2", "1"]);
        assert!(!has_table(&pool, "people").await);
    }
}
