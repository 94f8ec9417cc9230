use std::collections::HashSet;
use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use motionify_portal::jwt::JwtConfig;
use motionify_portal::lifecycle::allowed_transitions;
use motionify_portal::models::project::ProjectStatus;
use motionify_portal::models::user::{Role, User};

#[derive(Parser, Debug)]
#[command(author, version, about = "motionify portal admin tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Create a user and print a bearer token for it
    CreateUser {
        name: String,
        email: String,
        /// super_admin, project_manager, team_member or client
        role: String,
    },
    /// Print the project status transition table
    Transitions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            motionify_portal::db::migrate(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            print_status(&pool).await?;
        }
        Commands::CreateUser { name, email, role } => {
            let role: Role = role.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
            let pool = get_pool().await?;
            let jwt = JwtConfig::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

            let user = User::new(name, email, role);
            sqlx::query("INSERT INTO users (id, name, email, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)")
                .bind(user.id)
                .bind(&user.name)
                .bind(&user.email)
                .bind(user.role.as_str())
                .bind(user.created_at)
                .bind(user.updated_at)
                .execute(&pool)
                .await
                .context("failed to insert user")?;

            let token = jwt.encode(user.id).map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("Created {} ({}) as {}", user.name, user.id, user.role);
            println!("{token}");
        }
        Commands::Transitions => {
            for status in ProjectStatus::ALL {
                let next: Vec<&str> = allowed_transitions(status).iter().map(|s| s.as_str()).collect();
                let next = if next.is_empty() { "(terminal)".to_string() } else { next.join(", ") };
                println!("{:<18} -> {}", status.as_str(), next);
            }
        }
    }

    Ok(())
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    let options = SqliteConnectOptions::from_str(&database_url)
        .context("invalid DATABASE_URL")?
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool) -> anyhow::Result<()> {
    let migrator = sqlx::migrate!();

    let has_table = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
        .fetch_optional(pool)
        .await?
        .is_some();

    let applied_versions: HashSet<i64> = if has_table {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} Name", "Status", "Version");
    for migration in migrator.iter() {
        let status = if applied_versions.contains(&migration.version) { "applied" } else { "pending" };
        let desc = migration.description.trim();
        println!("{:<8} {:<20} {}", status, migration.version, if desc.is_empty() { "unknown" } else { desc });
    }

    Ok(())
}
