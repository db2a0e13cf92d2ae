//! oxide-migrator CLI
//!
//! Command-line tool for inspecting and repairing a migration ledger.

use clap::{Parser, Subcommand};
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_migrator::prelude::*;
use oxide_migrator::session::Session;

/// Inspect and repair the ledger of applied migrations.
#[derive(Parser)]
#[command(name = "oxide-migrator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Name of the ledger table.
    #[arg(long, default_value = "migrations")]
    table: String,

    /// Column holding migration ids.
    #[arg(long, default_value = "migration_id")]
    id_column: String,

    /// Length of the id columns.
    #[arg(long, default_value_t = 255)]
    id_column_size: u32,

    /// Column holding dependency ids.
    #[arg(long, default_value = "dependency_id")]
    dependency_column: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn options(&self) -> MigratorOptions {
        MigratorOptions::default()
            .table_name(&self.table)
            .id_column_name(&self.id_column)
            .id_column_size(self.id_column_size)
            .dependency_column_name(&self.dependency_column)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the ledger table if it does not exist.
    Init,

    /// Show the ledger rows.
    Status {
        /// Print the rows as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Remove a migration from the ledger without running its rollback.
    Forget {
        /// Id of the migration to forget.
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Connect to database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&cli.database)
        .await?;
    let ledger = Ledger::new(SqliteDialect::new(), cli.options());

    match &cli.command {
        Commands::Init => {
            info!("Initializing migration ledger...");
            let mut conn = pool.acquire().await?;
            ledger.ensure_table(&mut conn).await?;
            info!(table = %cli.table, "Migration ledger ready.");
        }

        Commands::Status { json } => {
            let mut conn = pool.acquire().await?;
            if !ledger.table_exists(&mut conn, &cli.table).await? {
                warn!(table = %cli.table, "Migration ledger does not exist. Run `init` first.");
                return Ok(());
            }

            let entries = ledger.entries(&mut conn).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                info!("No migrations have been applied yet.");
            } else {
                println!("\nApplied migrations:");
                println!("{:-<60}", "");

                for entry in &entries {
                    match &entry.dependency_id {
                        Some(dependency) => println!(
                            "     {} -> {}",
                            entry.migration_id, dependency
                        ),
                        None => println!(
                            " [X] {} ({})",
                            entry.migration_id,
                            entry.created_at.format("%Y-%m-%d %H:%M:%S")
                        ),
                    }
                }
                println!();
            }
        }

        Commands::Forget { id } => {
            let mut session = Session::begin(&pool, true).await?;
            if !ledger.table_exists(session.conn(), &cli.table).await? {
                anyhow::bail!("migration ledger `{}` does not exist", cli.table);
            }

            let removed = ledger.remove(session.conn(), id).await?;
            if removed == 0 {
                warn!(migration = %id, "Migration not found in ledger");
            }
            let detached = ledger.detach_dependents(session.conn(), id).await?;
            session.commit().await?;
            info!(migration = %id, removed, detached, "Forgot migration");
        }
    }

    Ok(())
}
