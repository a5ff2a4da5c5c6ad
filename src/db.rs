mod filter;
mod store;

pub use filter::BookFilter;
pub use store::CatalogStore;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A book row from the Calibre `books` table.
///
/// Associations (`authors`, `tags`, `series`, `formats`) are empty until
/// filled by [`CatalogStore::hydrate`]; everything here is a read-only
/// projection built fresh per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    /// Stable row identifier.
    pub id: i64,
    /// Book title.
    pub title: String,
    /// Author sort key (e.g. "Liu, Cixin").
    pub author_sort: String,
    /// Directory of the book inside the library, relative to the library root.
    pub path: String,
    /// Position within the series, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_index: Option<f64>,
    /// ISBN, if recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    /// Publication date as stored by Calibre.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubdate: Option<String>,
    /// Last metadata modification; the catalog sort key.
    pub last_modified: DateTime<Utc>,
    /// Whether Calibre extracted a cover image for this book.
    pub has_cover: bool,
    /// Calibre-assigned UUID, used for Atom entry identifiers.
    pub uuid: String,
    /// Free-text comments; becomes the entry summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,

    /// Credited authors in credit order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub authors: Vec<Author>,
    /// Tags sorted by name.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    /// Series membership (at most one).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<Series>,
    /// Available file formats sorted by format code.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub formats: Vec<Format>,
}

/// Author name and sort key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    /// Display name.
    pub name: String,
    /// Sort key.
    pub sort: String,
}

/// Series membership of a book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    /// Series name.
    pub name: String,
    /// Sort key.
    pub sort: String,
    /// Book's position within the series.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<f64>,
}

/// A downloadable file format of a book (row in the `data` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Format {
    /// Format code (e.g. "EPUB").
    pub format: String,
    /// Uncompressed size in bytes.
    pub size: i64,
    /// Stored filename, usually without extension.
    pub filename: String,
}

/// Author listing row with book count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorListing {
    /// Display name.
    pub name: String,
    /// Sort key.
    pub sort: String,
    /// Number of associated books.
    pub book_count: i64,
}

/// Series listing row with book count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesListing {
    /// Series name.
    pub name: String,
    /// Sort key.
    pub sort: String,
    /// Number of associated books.
    pub book_count: i64,
}

/// Tag listing row with book count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagListing {
    /// Tag name.
    pub name: String,
    /// Number of associated books.
    pub book_count: i64,
}

/// Library-wide statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    /// Total books in the library.
    pub total_books: i64,
    /// Total authors in the library.
    pub total_authors: i64,
    /// Book count per format code.
    pub formats: HashMap<String, i64>,
}

/// Parse a Calibre timestamp column.
///
/// Calibre writes `last_modified` as text, usually
/// `2024-01-05 10:00:00+00:00` but older libraries carry naive or
/// fractional-second variants. Unparseable values sort as the epoch rather
/// than failing the row.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return dt.with_timezone(&Utc);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return naive.and_utc();
        }
    }
    DateTime::<Utc>::UNIX_EPOCH
}
