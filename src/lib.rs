//! calibre-opds: a read-only OPDS catalog server for Calibre libraries.
//!
//! This crate serves an existing Calibre library over OPDS 1.x and a small
//! JSON API. It never writes to the library; Calibre stays the sole owner
//! of `metadata.db` and the book files.
//!
//! # Features
//!
//! - OPDS navigation and acquisition feeds (latest, by author/series/tag)
//! - Full-text search over titles and author sort keys
//! - Paginated feeds with OPDS result counters
//! - Cover images and book downloads streamed from the library
//! - JSON API mirroring the catalog queries
//! - Read-only SQLite connection pool

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Configuration and CLI.
pub mod config;
/// Read-only Calibre database access.
pub mod db;
/// Error types.
pub mod error;
/// Format code to MIME type and extension tables.
pub mod formats;
/// OPDS feed generation.
pub mod opds;
/// Pagination windows and links.
pub mod pager;
/// HTTP server.
pub mod server;

#[cfg(test)]
mod tests;

pub use config::{Cli, Command, Config};
pub use db::{BookFilter, CatalogStore};
pub use error::{AppError, Result};
pub use server::AppState;
