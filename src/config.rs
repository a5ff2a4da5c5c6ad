use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Read-only OPDS catalog server for Calibre libraries.
#[derive(Parser, Debug, Clone)]
#[command(name = "calibre-opds")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "CALIBRE_OPDS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Write a default config file to the current directory.
    Init {
        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },

    /// Start the server (default if no command given).
    Serve {
        /// Address to bind the server to.
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Path to the Calibre metadata.db (overrides config).
        #[arg(short, long, env = "CALIBRE_DB_PATH")]
        database: Option<PathBuf>,
    },

    /// Validate the library database and print statistics.
    Check {
        /// Path to the Calibre metadata.db (overrides config).
        #[arg(short, long, env = "CALIBRE_DB_PATH")]
        database: Option<PathBuf>,
    },
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Library configuration.
    #[serde(default)]
    pub library: LibraryConfig,

    /// Pagination configuration.
    #[serde(default)]
    pub pagination: PaginationConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Catalog title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Base URL prefix for generated links (empty for relative links).
    #[serde(default)]
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            title: default_title(),
            base_url: String::new(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::new(
        std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        1580,
    )
}

fn default_title() -> String {
    "Calibre OPDS Catalog".to_string()
}

/// Library configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Path to the Calibre metadata.db.
    #[serde(default = "default_db_path")]
    pub database: PathBuf,

    /// Path to the Calibre library root holding book directories.
    /// Relative paths resolve against the database directory.
    #[serde(default = "default_books_path")]
    pub books: PathBuf,

    /// Maximum idle read connections kept in the pool.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            database: default_db_path(),
            books: default_books_path(),
            pool_size: default_pool_size(),
        }
    }
}

impl LibraryConfig {
    /// Absolute path of the book file root.
    pub fn books_root(&self) -> PathBuf {
        if self.books.is_absolute() {
            self.books.clone()
        } else {
            self.database
                .parent()
                .map(|dir| dir.join(&self.books))
                .unwrap_or_else(|| self.books.clone())
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("books/metadata.db")
}

fn default_books_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_pool_size() -> usize {
    4
}

/// Pagination configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Default page size for book feeds.
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Default page size for author/series/tag listings.
    #[serde(default = "default_list_limit")]
    pub list_limit: u64,

    /// Hard upper bound on any requested page size.
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            list_limit: default_list_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> u64 {
    20
}

fn default_list_limit() -> u64 {
    50
}

fn default_max_limit() -> u64 {
    100
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("calibre-opds.toml"),
            dirs::config_dir()
                .map(|p| p.join("calibre-opds").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/calibre-opds/config.toml"),
        ];

        candidates.into_iter().find(|p| p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# calibre-opds configuration

[server]
bind = "0.0.0.0:1580"
title = "Calibre OPDS Catalog"
# base_url = "https://books.example.org"

[library]
# Path to the Calibre metadata database (read-only).
database = "books/metadata.db"
# Book file root; relative paths resolve against the database directory.
books = "."
pool_size = 4

[pagination]
default_limit = 20
list_limit = 50
max_limit = 100
"#
        .to_string()
    }
}
