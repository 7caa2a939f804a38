use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use careers_service::{CareerService, ServiceConfig};
use careers_storage::{load_catalog_fixture, seed_catalog, CareerStore, MemoryStore, PgStore};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

mod telemetry;

#[derive(Debug, Parser)]
#[command(name = "careers-cli")]
#[command(about = "Careers catalog command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the JSON API.
    Serve(ServeArgs),
    /// Apply database migrations.
    Migrate,
    /// Load the catalog fixture into the database.
    Seed {
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Print the HTTP routes.
    Routes,
}

#[derive(Debug, Default, Args)]
struct ServeArgs {
    /// Use an in-process store seeded from the fixture instead of PostgreSQL.
    #[arg(long)]
    memory: bool,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // a missing .env is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let mut config = ServiceConfig::from_env();
    telemetry::init(&config.log_level).context("initialising telemetry")?;

    match cli.command.unwrap_or(Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => {
            if let Some(host) = args.host {
                config.web_host = host;
            }
            if let Some(port) = args.port {
                config.web_port = port;
            }
            let store = open_store(&config, args.memory).await?;
            careers_web::serve(CareerService::new(store, config)).await?;
        }
        Commands::Migrate => {
            let store = connect(&config).await?;
            store.migrate().await.context("applying migrations")?;
            println!("migrations applied");
        }
        Commands::Seed { path } => {
            let path = path.unwrap_or_else(|| config.seed_path.clone());
            let store = connect(&config).await?;
            let fixture = load_catalog_fixture(&path).await?;
            let summary = seed_catalog(&store, &fixture).await?;
            println!(
                "seed complete: references +{}/~{} positions +{}/~{} skill_links={}",
                summary.references_inserted,
                summary.references_updated,
                summary.positions_inserted,
                summary.positions_updated,
                summary.skill_links
            );
        }
        Commands::Routes => {
            for (method, path) in careers_web::ROUTES {
                println!("{method:<7}{path}");
            }
        }
    }

    Ok(())
}

async fn connect(config: &ServiceConfig) -> Result<PgStore> {
    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is not set")?;
    PgStore::connect(url, config.db_max_connections)
        .await
        .context("connecting to PostgreSQL")
}

async fn open_store(config: &ServiceConfig, memory: bool) -> Result<Arc<dyn CareerStore>> {
    if !memory && config.database_url.is_some() {
        return Ok(Arc::new(connect(config).await?));
    }
    if !memory {
        warn!("DATABASE_URL is not set; serving from an in-memory store");
    }
    let store = MemoryStore::new();
    let fixture = load_catalog_fixture(&config.seed_path).await?;
    let summary = seed_catalog(&store, &fixture).await?;
    info!(
        positions = summary.positions_inserted,
        path = %config.seed_path.display(),
        "in-memory catalog seeded"
    );
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_flags_parse() {
        let cli = Cli::parse_from(["careers-cli", "serve", "--memory", "--port", "9000"]);
        match cli.command {
            Some(Commands::Serve(args)) => {
                assert!(args.memory);
                assert_eq!(args.port, Some(9000));
                assert_eq!(args.host, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[tokio::test]
    async fn memory_store_is_seeded_from_the_fixture() {
        let config = ServiceConfig {
            seed_path: PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("../../fixtures/catalog.yaml"),
            ..ServiceConfig::default()
        };
        let store = open_store(&config, true).await.unwrap();
        let service = CareerService::new(store, config);
        assert!(service.get_by_slug("platform-engineer").await.is_some());
    }
}
