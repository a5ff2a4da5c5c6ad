//! calibre-opds server entry point.

use calibre_opds::{
    config::{Cli, Command, Config},
    db::CatalogStore,
    server,
};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Find or load config
    let config_path = cli.config.clone().or_else(Config::find_config_file);

    let config = if let Some(ref path) = config_path {
        Config::load(path)?
    } else {
        Config::default()
    };

    match cli.command {
        Some(Command::Init { force }) => cmd_init(force),
        Some(Command::Check { database }) => cmd_check(config, database),
        Some(Command::Serve { bind, database }) => cmd_serve(config, bind, database).await,
        None => cmd_serve(config, None, None).await,
    }
}

/// Write a default config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());
    println!("\nPoint [library].database at your Calibre metadata.db,");
    println!("then run: calibre-opds serve");

    Ok(())
}

/// Validate the library database and print statistics.
fn cmd_check(mut config: Config, database: Option<PathBuf>) -> anyhow::Result<()> {
    if let Some(path) = database {
        config.library.database = path;
    }

    let store = CatalogStore::open(&config.library.database, config.library.pool_size)?;
    let stats = store.stats()?;

    println!("Database: {}", config.library.database.display());
    println!("Books:    {}", stats.total_books);
    println!("Authors:  {}", stats.total_authors);

    if stats.formats.is_empty() {
        println!("Formats:  none");
    } else {
        let mut formats: Vec<_> = stats.formats.iter().collect();
        formats.sort_by(|a, b| a.0.cmp(b.0));
        println!("Formats:");
        for (format, count) in formats {
            println!("  {:<8} {}", format, count);
        }
    }

    Ok(())
}

/// Start the server.
async fn cmd_serve(
    mut config: Config,
    bind: Option<SocketAddr>,
    database: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(addr) = bind {
        config.server.bind = addr;
    }
    if let Some(path) = database {
        config.library.database = path;
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calibre_opds=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = CatalogStore::open(&config.library.database, config.library.pool_size)?;
    let book_count = store.count(&Default::default())?;

    tracing::info!(
        bind = %config.server.bind,
        database = %config.library.database.display(),
        books = book_count,
        "Starting calibre-opds server"
    );

    let bind = config.server.bind;
    let state = server::AppState::new(config, store);
    let app = server::create_router(state);

    let listener = TcpListener::bind(bind).await?;
    tracing::info!(address = %bind, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
