//! Read-only access to the Calibre metadata database.

use crate::db::{
    Author, AuthorListing, Book, BookFilter, Format, Series, SeriesListing, Stats, TagListing,
    parse_timestamp,
};
use crate::error::{AppError, Result};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params, params_from_iter};
use std::collections::HashMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Tables the catalog queries depend on; checked once at startup.
const REQUIRED_TABLES: &[&str] = &["books", "authors", "tags", "series", "data"];

/// Column list shared by every query that produces a [`Book`].
const BOOK_COLUMNS: &str = "b.id, b.title, b.author_sort, b.path, b.series_index, \
     b.isbn, b.pubdate, b.last_modified, b.has_cover, b.uuid";

/// Catalog store over a read-only connection pool.
///
/// Every operation checks a connection out of the pool and releases it when
/// the checkout guard drops, including on error paths. The store never
/// writes; the database stays owned by Calibre.
#[derive(Clone)]
pub struct CatalogStore {
    pool: Arc<Pool>,
}

struct Pool {
    path: PathBuf,
    idle: Mutex<Vec<Connection>>,
    max_idle: usize,
}

impl Pool {
    fn open_connection(&self) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Ok(Connection::open_with_flags(&self.path, flags)?)
    }
}

/// Checkout guard; returns the connection to the pool on drop.
struct PooledConnection<'a> {
    conn: Option<Connection>,
    pool: &'a Pool,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection taken before drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            let mut idle = self.pool.idle.lock();
            if idle.len() < self.pool.max_idle {
                idle.push(conn);
            }
        }
    }
}

impl CatalogStore {
    /// Open the store against an existing Calibre `metadata.db`.
    ///
    /// Fails when the file does not exist or one of the required tables is
    /// missing, so a misconfigured library path surfaces at startup rather
    /// than on the first request.
    pub fn open(path: &Path, pool_size: usize) -> Result<Self> {
        if !path.is_file() {
            return Err(AppError::Config(format!(
                "database file not found: {}",
                path.display()
            )));
        }

        let store = Self {
            pool: Arc::new(Pool {
                path: path.to_path_buf(),
                idle: Mutex::new(Vec::new()),
                max_idle: pool_size.max(1),
            }),
        };

        store.validate()?;
        Ok(store)
    }

    fn checkout(&self) -> Result<PooledConnection<'_>> {
        let conn = match self.pool.idle.lock().pop() {
            Some(conn) => conn,
            None => self.pool.open_connection()?,
        };
        Ok(PooledConnection {
            conn: Some(conn),
            pool: &self.pool,
        })
    }

    /// Check that the expected Calibre schema is present.
    pub fn validate(&self) -> Result<()> {
        let conn = self.checkout()?;
        for table in REQUIRED_TABLES {
            let found: Option<String> = conn
                .query_row(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
                    params![table],
                    |row| row.get(0),
                )
                .optional()?;

            if found.is_none() {
                return Err(AppError::Config(format!(
                    "required table '{}' not found in {}",
                    table,
                    self.pool.path.display()
                )));
            }
        }
        tracing::debug!(path = %self.pool.path.display(), "Schema validation successful");
        Ok(())
    }

    /// Total books matching the filter.
    ///
    /// Uses the same predicate set as [`CatalogStore::page`] so the total
    /// and the page contents never disagree.
    pub fn count(&self, filter: &BookFilter) -> Result<u64> {
        let (clause, args) = filter.where_clause();
        let sql = format!("SELECT COUNT(DISTINCT b.id) FROM books b{clause}");

        let conn = self.checkout()?;
        let count: i64 = conn.query_row(&sql, params_from_iter(args), |row| row.get(0))?;
        Ok(count as u64)
    }

    /// One page of books matching the filter, ordered by last-modified
    /// descending. Associations are not populated; see
    /// [`CatalogStore::hydrate`].
    pub fn page(&self, filter: &BookFilter, limit: u64, offset: u64) -> Result<Vec<Book>> {
        let (clause, mut args) = filter.where_clause();
        let sql = format!(
            "SELECT DISTINCT {BOOK_COLUMNS} FROM books b{clause} \
             ORDER BY b.last_modified DESC LIMIT ? OFFSET ?"
        );
        args.push(Value::Integer(limit as i64));
        args.push(Value::Integer(offset as i64));

        let conn = self.checkout()?;
        let mut stmt = conn.prepare(&sql)?;
        let books = stmt
            .query_map(params_from_iter(args), book_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(books)
    }

    /// Fetch a single book by id, fully hydrated and with comments.
    ///
    /// A missing row is `Ok(None)`, not an error.
    pub fn book_by_id(&self, id: i64) -> Result<Option<Book>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books b WHERE b.id = ?");

        let conn = self.checkout()?;
        let Some(mut book) = conn
            .query_row(&sql, params![id], book_from_row)
            .optional()?
        else {
            return Ok(None);
        };

        book.comments = conn
            .query_row(
                "SELECT text FROM comments WHERE book = ?",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        drop(conn);

        self.hydrate(std::slice::from_mut(&mut book))?;
        Ok(Some(book))
    }

    /// Fill authors, tags, series and formats for a page of books.
    ///
    /// One batched query per association type across the whole page instead
    /// of four queries per book. Any lookup failure aborts the whole page;
    /// associations that are merely absent stay empty.
    pub fn hydrate(&self, books: &mut [Book]) -> Result<()> {
        if books.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = books.iter().map(|b| b.id).collect();
        let conn = self.checkout()?;

        let mut authors = authors_for(&conn, &ids)?;
        let mut tags = tags_for(&conn, &ids)?;
        let mut series = series_for(&conn, &ids)?;
        let mut formats = formats_for(&conn, &ids)?;

        for book in books {
            book.authors = authors.remove(&book.id).unwrap_or_default();
            book.tags = tags.remove(&book.id).unwrap_or_default();
            book.series = series.remove(&book.id);
            book.formats = formats.remove(&book.id).unwrap_or_default();
        }
        Ok(())
    }

    /// Authors with at least one book, ordered by sort key.
    pub fn list_authors(&self, limit: u64, offset: u64) -> Result<Vec<AuthorListing>> {
        let conn = self.checkout()?;
        let mut stmt = conn.prepare(
            "SELECT a.name, a.sort, COUNT(b.id) AS book_count \
             FROM authors a \
             JOIN books_authors_link bal ON a.id = bal.author \
             JOIN books b ON bal.book = b.id \
             GROUP BY a.id, a.name, a.sort \
             ORDER BY a.sort LIMIT ? OFFSET ?",
        )?;
        let rows = stmt
            .query_map(params![limit as i64, offset as i64], |row| {
                Ok(AuthorListing {
                    name: row.get(0)?,
                    sort: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    book_count: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Series with at least one book, ordered by sort key.
    pub fn list_series(&self, limit: u64, offset: u64) -> Result<Vec<SeriesListing>> {
        let conn = self.checkout()?;
        let mut stmt = conn.prepare(
            "SELECT s.name, s.sort, COUNT(b.id) AS book_count \
             FROM series s \
             JOIN books_series_link bsl ON s.id = bsl.series \
             JOIN books b ON bsl.book = b.id \
             GROUP BY s.id, s.name, s.sort \
             ORDER BY s.sort LIMIT ? OFFSET ?",
        )?;
        let rows = stmt
            .query_map(params![limit as i64, offset as i64], |row| {
                Ok(SeriesListing {
                    name: row.get(0)?,
                    sort: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    book_count: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Tags with at least one book, ordered by name.
    pub fn list_tags(&self, limit: u64, offset: u64) -> Result<Vec<TagListing>> {
        let conn = self.checkout()?;
        let mut stmt = conn.prepare(
            "SELECT t.name, COUNT(b.id) AS book_count \
             FROM tags t \
             JOIN books_tags_link btl ON t.id = btl.tag \
             JOIN books b ON btl.book = b.id \
             GROUP BY t.id, t.name \
             ORDER BY t.name LIMIT ? OFFSET ?",
        )?;
        let rows = stmt
            .query_map(params![limit as i64, offset as i64], |row| {
                Ok(TagListing {
                    name: row.get(0)?,
                    book_count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Library-wide statistics.
    pub fn stats(&self) -> Result<Stats> {
        let conn = self.checkout()?;

        let total_books: i64 =
            conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
        let total_authors: i64 =
            conn.query_row("SELECT COUNT(*) FROM authors", [], |row| row.get(0))?;

        let mut stmt = conn.prepare("SELECT format, COUNT(*) FROM data GROUP BY format")?;
        let formats = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;

        Ok(Stats {
            total_books,
            total_authors,
            formats,
        })
    }
}

fn book_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
    let last_modified: String = row.get::<_, Option<String>>(7)?.unwrap_or_default();
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author_sort: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        path: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        series_index: row.get(4)?,
        isbn: row.get(5)?,
        pubdate: row.get(6)?,
        last_modified: parse_timestamp(&last_modified),
        has_cover: row.get::<_, Option<bool>>(8)?.unwrap_or(false),
        uuid: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
        comments: None,
        authors: Vec::new(),
        tags: Vec::new(),
        series: None,
        formats: Vec::new(),
    })
}

/// `?,?,...` placeholder list for an IN clause. Ids are still bound as
/// parameters; only the placeholder count varies.
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

fn id_params(ids: &[i64]) -> impl Iterator<Item = Value> + '_ {
    ids.iter().map(|id| Value::Integer(*id))
}

/// Authors per book in credit order (link-table insertion order).
fn authors_for(conn: &Connection, ids: &[i64]) -> Result<HashMap<i64, Vec<Author>>> {
    let sql = format!(
        "SELECT bal.book, a.name, a.sort \
         FROM authors a \
         JOIN books_authors_link bal ON a.id = bal.author \
         WHERE bal.book IN ({}) \
         ORDER BY bal.book, bal.id",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut grouped: HashMap<i64, Vec<Author>> = HashMap::new();
    let rows = stmt.query_map(params_from_iter(id_params(ids)), |row| {
        Ok((
            row.get::<_, i64>(0)?,
            Author {
                name: row.get(1)?,
                sort: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            },
        ))
    })?;
    for row in rows {
        let (book, author) = row?;
        grouped.entry(book).or_default().push(author);
    }
    Ok(grouped)
}

/// Tags per book, sorted by name.
fn tags_for(conn: &Connection, ids: &[i64]) -> Result<HashMap<i64, Vec<String>>> {
    let sql = format!(
        "SELECT btl.book, t.name \
         FROM tags t \
         JOIN books_tags_link btl ON t.id = btl.tag \
         WHERE btl.book IN ({}) \
         ORDER BY btl.book, t.name",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut grouped: HashMap<i64, Vec<String>> = HashMap::new();
    let rows = stmt.query_map(params_from_iter(id_params(ids)), |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (book, tag) = row?;
        grouped.entry(book).or_default().push(tag);
    }
    Ok(grouped)
}

/// Series per book; Calibre links at most one.
fn series_for(conn: &Connection, ids: &[i64]) -> Result<HashMap<i64, Series>> {
    let sql = format!(
        "SELECT bsl.book, s.name, s.sort, b.series_index \
         FROM series s \
         JOIN books_series_link bsl ON s.id = bsl.series \
         JOIN books b ON bsl.book = b.id \
         WHERE bsl.book IN ({})",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut grouped: HashMap<i64, Series> = HashMap::new();
    let rows = stmt.query_map(params_from_iter(id_params(ids)), |row| {
        Ok((
            row.get::<_, i64>(0)?,
            Series {
                name: row.get(1)?,
                sort: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                index: row.get(3)?,
            },
        ))
    })?;
    for row in rows {
        let (book, series) = row?;
        grouped.entry(book).or_insert(series);
    }
    Ok(grouped)
}

/// Formats per book, sorted by format code. Duplicate codes, if present in
/// the store, pass through unchanged.
fn formats_for(conn: &Connection, ids: &[i64]) -> Result<HashMap<i64, Vec<Format>>> {
    let sql = format!(
        "SELECT book, format, uncompressed_size, name \
         FROM data \
         WHERE book IN ({}) \
         ORDER BY book, format",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut grouped: HashMap<i64, Vec<Format>> = HashMap::new();
    let rows = stmt.query_map(params_from_iter(id_params(ids)), |row| {
        Ok((
            row.get::<_, i64>(0)?,
            Format {
                format: row.get(1)?,
                size: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                filename: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            },
        ))
    })?;
    for row in rows {
        let (book, format) = row?;
        grouped.entry(book).or_default().push(format);
    }
    Ok(grouped)
}
