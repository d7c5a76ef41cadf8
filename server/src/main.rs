mod config;
mod graphql;
mod http;

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_db::{DatabaseSettings, DbPool, connect};
use platform_obs::{ObsConfig, init_tracing};
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::{config::AppConfig, http::AppState};

#[derive(Parser, Debug)]
#[command(name = "crm-server", version, about = "CRM deal pipeline server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP + GraphQL server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Load the demo companies, contacts and deals.
    Seed,
    /// Print the GraphQL schema (SDL).
    #[command(name = "schema:print")]
    SchemaPrint {
        #[arg(long, value_name = "FILE", help = "Write to a file instead of stdout")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Roll back the most recent migration.
    Down,
    /// Roll back every migration.
    Reset,
}

#[derive(Args, Debug)]
struct ServeCommand {
    /// Overrides `BIND`.
    #[arg(long)]
    bind: Option<SocketAddr>,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(ObsConfig::default())?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, AppConfig::load()?).await,
        Command::Migrate(action) => migrate(action).await,
        Command::Seed => run_seed().await,
        Command::SchemaPrint { output } => schema_print(output),
    }
}

async fn setup_pool() -> Result<DbPool> {
    let settings = DatabaseSettings::from_env();
    connect(&settings).await.context("database connection failed")
}

async fn run_server(cmd: ServeCommand, config: AppConfig) -> Result<()> {
    let pool = Arc::new(setup_pool().await?);
    ensure_migrations(&pool, cmd.allow_dirty).await?;
    let addr = cmd.bind.unwrap_or(config.bind);
    let state = AppState {
        schema: graphql::build_schema(pool.clone()),
        pool,
        config: Arc::new(config),
    };
    http::serve(addr, state).await
}

async fn ensure_migrations(pool: &DatabaseConnection, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        anyhow::bail!(
            "pending migrations detected; run `crm-server migrate up` or pass --allow-dirty"
        );
    }
    Ok(())
}

async fn migrate(action: MigrateCommand) -> Result<()> {
    let pool = setup_pool().await?;
    match action {
        MigrateCommand::Up => {
            Migrator::up(&pool, None).await?;
            info!("database migrations applied");
        }
        MigrateCommand::Down => {
            Migrator::down(&pool, Some(1)).await?;
            info!("most recent migration rolled back");
        }
        MigrateCommand::Reset => {
            Migrator::reset(&pool).await?;
            info!("all migrations rolled back");
        }
    }
    Ok(())
}

async fn run_seed() -> Result<()> {
    let pool = setup_pool().await?;
    let seeded = products_crm::seed_crm_demo(&pool)
        .await
        .context("seed data failed")?;
    info!(deals = seeded.deals.len(), "seed complete");
    Ok(())
}

fn schema_print(path: Option<PathBuf>) -> Result<()> {
    let sdl = graphql::schema_sdl();
    match path {
        Some(target) => {
            std::fs::write(&target, sdl)
                .with_context(|| format!("failed to write {}", target.display()))?;
            info!(path = %target.display(), "schema written");
        }
        None => println!("{sdl}"),
    }
    Ok(())
}
