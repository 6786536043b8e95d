use anyhow::Context;
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::{error, info};

use cargolink_api::{config, db, migrator::Migrator};

#[derive(Parser, Debug)]
#[command(name = "migration", about = "CargoLink database migrations")]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply every pending migration (default)
    Up,
    /// Roll back the most recent migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Print applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = config::load_config().context("loading configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("connecting to the database")?;

    match cli.command.unwrap_or(Command::Up) {
        Command::Up => db::run_migrations(&pool)
            .await
            .context("applying migrations")?,
        Command::Down { steps } => {
            info!(steps, "rolling back migrations");
            Migrator::down(&pool, Some(steps)).await.map_err(|e| {
                error!("Rollback failed: {}", e);
                e
            })?;
        }
        Command::Status => Migrator::status(&pool)
            .await
            .context("reading migration status")?,
    }

    info!("Migration command completed");
    Ok(())
}
