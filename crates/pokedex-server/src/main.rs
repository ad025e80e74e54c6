//! Pokedex Server
//!
//! Serves the Pokemon record API, or seeds the configured store from
//! PokeAPI.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pokedex_server::config::{Backend, ServerConfig};
use pokedex_server::{pokeapi, router, storage, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pokedex-server")]
#[command(author, version, about = "Pokedex record service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./pokedex.toml when present)
    #[arg(short, long, global = true, env = "POKEDEX_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<String>,

        /// Storage backend
        #[arg(long, value_enum)]
        backend: Option<Backend>,
    },

    /// Fill the store with species from PokeAPI
    Seed {
        /// First national dex number
        #[arg(long, default_value_t = 1)]
        from: i64,

        /// Last national dex number (inclusive)
        #[arg(long, default_value_t = 151)]
        to: i64,

        /// Seed every species PokeAPI reports, ignoring --to
        #[arg(long)]
        all: bool,

        /// PokeAPI base URL
        #[arg(long, default_value = pokeapi::DEFAULT_BASE_URL)]
        base_url: String,

        /// Storage backend
        #[arg(long, value_enum)]
        backend: Option<Backend>,
    },
}

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
    {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Serve { bind, backend } => run_server(cli.config, bind, backend).await,
        Commands::Seed {
            from,
            to,
            all,
            base_url,
            backend,
        } => run_seed(cli.config, from, to, all, base_url, backend).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<PathBuf>, backend: Option<Backend>) -> Result<ServerConfig> {
    let mut config =
        ServerConfig::load(path.as_deref()).context("Failed to load configuration")?;
    if let Some(backend) = backend {
        config.backend = backend;
    }
    Ok(config)
}

async fn run_server(
    config_path: Option<PathBuf>,
    bind: Option<String>,
    backend: Option<Backend>,
) -> Result<()> {
    info!("Starting Pokedex Server v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(config_path, backend)?;
    if let Some(bind) = bind {
        config.bind_address = bind;
    }
    info!(
        "Config loaded: bind={}, backend={}",
        config.bind_address, config.backend
    );

    let store = storage::open_store(&config)
        .await
        .context("Failed to open store")?;
    let app = router(AppState::new(store));

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .context("Failed to parse bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}

async fn run_seed(
    config_path: Option<PathBuf>,
    from: i64,
    to: i64,
    all: bool,
    base_url: String,
    backend: Option<Backend>,
) -> Result<()> {
    let config = load_config(config_path, backend)?;
    let store = storage::open_store(&config)
        .await
        .context("Failed to open store")?;
    let client = pokeapi::PokeApiClient::new(base_url).context("Failed to build HTTP client")?;

    let to = if all {
        client
            .species_count()
            .await
            .context("Failed to fetch species count")?
    } else {
        to
    };
    info!("Seeding pokemon {}..={} into {}", from, to, config.backend);

    let report = pokeapi::seed(store.as_ref(), &client, from..=to)
        .await
        .context("Seeding failed")?;
    info!(
        "Seed complete: {} inserted, {} skipped",
        report.inserted, report.skipped
    );

    Ok(())
}
