//! # Songbook Server Main Driver
//!
//! ## Purpose
//! Main entry point for the songbook search server. Loads configuration,
//! initializes logging and the entity pipeline, and starts the REST
//! boundary.
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Build the document source, parser, cache and query engine
//! 4. Start the API server
//! 5. Handle shutdown signals gracefully

use clap::{Arg, Command};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use songbook_search::{
    api::ApiServer,
    cache::EntityCache,
    config::Config,
    documents::HttpDocumentSource,
    errors::{Result, SongbookError},
    format::ResponseFormatter,
    normalize::Normalizer,
    parser::EntityParser,
    search::QueryEngine,
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("songbook-server")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Songbook Team")
        .about("Songbook search service: document parsing and fuzzy lookup for a chat assistant")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Server port")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("check-health")
                .long("check-health")
                .help("Validate configuration and document registry, then exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").unwrap();
    let mut config = Config::from_file(config_path)?;

    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }

    let config = Arc::new(config);

    init_logging(&config)?;

    info!("starting songbook server v{}", env!("CARGO_PKG_VERSION"));
    info!("configuration loaded from: {}", config_path);

    if matches.get_flag("check-health") {
        return run_health_checks(&config);
    }

    let app_state = initialize_components(config.clone())?;

    let server = ApiServer::new(app_state);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("server error: {}", e);
        }
    });

    info!(
        "songbook server listening on {}:{}",
        config.server.host, config.server.port
    );

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("received SIGINT, shutting down");
        }
        _ = server_handle => {
            warn!("server stopped unexpectedly");
        }
    }

    Ok(())
}

/// Initialize logging and tracing
fn init_logging(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));

    let fmt_layer = if config.logging.json_format {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .json()
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    info!("logging initialized with level: {}", config.logging.level);
    Ok(())
}

/// Build the document pipeline and shared application state
fn initialize_components(config: Arc<Config>) -> Result<AppState> {
    info!("initializing components");

    if config.documents.entries.is_empty() {
        warn!("no documents registered; every query will come back empty");
    }

    let source = Arc::new(HttpDocumentSource::new(&config.documents)?);
    let parser = EntityParser::new(&config.parser)?;
    let normalizer = Normalizer::new(&config.normalize);

    let cache = Arc::new(EntityCache::new(
        source,
        parser,
        &config.cache,
        &config.documents.entries,
    ));
    let engine = Arc::new(QueryEngine::new(normalizer));
    let formatter = Arc::new(ResponseFormatter::new(&config.format));

    info!(
        documents = config.documents.entries.len(),
        "components initialized"
    );

    Ok(AppState {
        config,
        cache,
        engine,
        formatter,
        joke_cursor: Arc::new(AtomicUsize::new(0)),
    })
}

/// Validate configuration and the document registry without serving
fn run_health_checks(config: &Config) -> Result<()> {
    info!("running health checks");

    for entry in &config.documents.entries {
        if entry.url.is_empty() {
            return Err(SongbookError::Config {
                message: format!("document '{}' has an empty URL", entry.id),
            });
        }
        info!(document = entry.id.as_str(), kind = ?entry.kind, "document registered");
    }

    info!("all health checks passed");
    Ok(())
}
