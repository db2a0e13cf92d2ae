#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use oxide_migrator::prelude::*;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub async fn create_test_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

pub fn migrator(
    pool: &SqlitePool,
    options: MigratorOptions,
    migrations: Vec<Migration>,
) -> Migrator<SqliteDialect> {
    Migrator::new(pool.clone(), SqliteDialect::new(), options, migrations)
}

pub async fn has_table(pool: &SqlitePool, name: &str) -> bool {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(name)
            .fetch_one(pool)
            .await
            .unwrap_or_else(|e| panic!("Failed to look up table {name}: {e}"));
    row.0 > 0
}

pub async fn has_column(pool: &SqlitePool, table: &str, column: &str) -> bool {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
        .bind(table)
        .bind(column)
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| panic!("Failed to look up column {table}.{column}: {e}"));
    row.0 > 0
}

pub async fn table_count(pool: &SqlitePool, table: &str) -> i64 {
    let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM \"{table}\""))
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| panic!("Failed to count rows of {table}: {e}"));
    row.0
}

/// Ledger rows as `(migration_id, dependency_id)` pairs, sorted.
pub async fn ledger_rows(
    migrator: &Migrator<SqliteDialect>,
    pool: &SqlitePool,
) -> Vec<(String, Option<String>)> {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut rows: Vec<(String, Option<String>)> = migrator
        .ledger()
        .entries(&mut conn)
        .await
        .expect("Failed to read ledger")
        .into_iter()
        .map(|entry| (entry.migration_id, entry.dependency_id))
        .collect();
    rows.sort();
    rows
}

/// An operation that only counts its runs.
pub fn counting(counter: &Arc<AtomicUsize>) -> Operation {
    let counter = Arc::clone(counter);
    Operation::new(move |_| {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    })
}

/// An operation that fails without touching the database.
pub fn failing(message: &'static str) -> Operation {
    Operation::new(move |_| {
        Box::pin(async move { Err::<(), _>(MigrateError::Other(anyhow::anyhow!(message))) })
    })
}

pub fn create_people() -> Migration {
    Migration::new(
        "201608301400",
        Operation::sql("CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT)"),
    )
    .backward(Operation::sql("DROP TABLE people"))
}

pub fn create_pets() -> Migration {
    Migration::new(
        "201608301430",
        Operation::sql("CREATE TABLE pets (id INTEGER PRIMARY KEY, name TEXT, person_id INTEGER)"),
    )
    .backward(Operation::sql("DROP TABLE pets"))
}

pub fn create_books() -> Migration {
    Migration::new(
        "201807221927",
        Operation::sql("CREATE TABLE books (id INTEGER PRIMARY KEY, name TEXT, person_id INTEGER)"),
    )
    .backward(Operation::sql("DROP TABLE books"))
}

pub fn migrations() -> Vec<Migration> {
    vec![create_people(), create_pets()]
}

pub fn extended_migrations() -> Vec<Migration> {
    vec![create_people(), create_pets(), create_books()]
}
