//! Example: Blog Application Migrations
//!
//! This example demonstrates how to use oxide-migrator to manage database
//! schema changes for a blog application with users, posts, and comments.
//!
//! Run with: `cargo run --example blog_migrations -p oxide-migrator`

use oxide_migrator::prelude::*;
use sqlx::sqlite::SqlitePoolOptions;

// =============================================================================
// Migration Definitions
// =============================================================================

fn create_users() -> Migration {
    Migration::new(
        "0001_create_users",
        Operation::statements([
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(100) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            "CREATE INDEX idx_users_email ON users (email)",
        ]),
    )
    .backward(Operation::sql("DROP TABLE users"))
}

fn create_posts(users: &Migration) -> Migration {
    Migration::new(
        "0002_create_posts",
        Operation::sql(
            "CREATE TABLE posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id INTEGER NOT NULL REFERENCES users (id),
                title VARCHAR(200) NOT NULL,
                body TEXT
            )",
        ),
    )
    .backward(Operation::sql("DROP TABLE posts"))
    .depends_on(users)
}

fn create_comments(posts: &Migration) -> Migration {
    Migration::new(
        "0003_create_comments",
        Operation::sql(
            "CREATE TABLE comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL REFERENCES posts (id),
                body TEXT NOT NULL
            )",
        ),
    )
    .backward(Operation::sql("DROP TABLE comments"))
    .depends_on(posts)
}

/// Seeds data through a hand-written operation instead of plain SQL.
fn seed_admin(users: &Migration) -> Migration {
    Migration::new(
        "0004_seed_admin",
        Operation::new(|conn| {
            Box::pin(async move {
                sqlx::query("INSERT INTO users (username, email) VALUES (?, ?)")
                    .bind("admin")
                    .bind("admin@example.com")
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        }),
    )
    .backward(Operation::sql("DELETE FROM users WHERE username = 'admin'"))
    .depends_on(users)
}

/// Never runs: its dependency is not part of the blog.
fn add_likes() -> Migration {
    Migration::new(
        "0005_add_likes",
        Operation::sql("CREATE TABLE likes (id INTEGER PRIMARY KEY)"),
    )
    .backward(Operation::sql("DROP TABLE likes"))
    .depends_on("0000_create_reactions")
}

fn blog_migrations() -> Vec<Migration> {
    let users = create_users();
    let posts = create_posts(&users);
    let comments = create_comments(&posts);
    let seed = seed_admin(&users);
    vec![users, posts, comments, seed, add_likes()]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("{}", "=".repeat(70));
    println!(" oxide-migrator example: blog application");
    println!("{}", "=".repeat(70));
    println!();

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    let migrator = Migrator::new(
        pool.clone(),
        SqliteDialect::new(),
        MigratorOptions::default().use_transaction(true),
        blog_migrations(),
    );

    println!("[1] Planning migrations...\n");
    let plan = migrator.plan().await?;
    for migration in &plan.sorted {
        println!("    [ ] {}", migration.id);
    }
    for migration in &plan.dropped {
        println!("    [!] {} (dependencies missing)", migration.id);
    }
    println!();

    println!("[2] Applying migrations...\n");
    let report = migrator.migrate().await?;
    for id in &report.applied {
        println!("    [X] {id}");
    }
    println!();

    println!("[3] Ledger contents:\n");
    let mut conn = pool.acquire().await?;
    for entry in migrator.ledger().entries(&mut conn).await? {
        match &entry.dependency_id {
            Some(dependency) => println!("        {} -> {}", entry.migration_id, dependency),
            None => println!("    [X] {}", entry.migration_id),
        }
    }
    drop(conn);
    println!();

    println!("[4] Rolling back users (and everything built on it)...\n");
    let report = migrator.rollback_migration("0001_create_users").await?;
    for id in &report.rolled_back {
        println!("    [ ] {id}");
    }
    println!();

    println!("[5] Pending after rollback: {:?}\n", migrator.pending().await?);

    println!("{}", "=".repeat(70));
    println!(" Example completed successfully!");
    println!("{}", "=".repeat(70));

    Ok(())
}
