//! HTTP request handlers.

use crate::db::{Book, BookFilter, Stats};
use crate::error::{AppError, Result};
use crate::formats;
use crate::opds::{FeedBuilder, Link};
use crate::pager::{PageParams, Pager};
use crate::server::AppState;
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

/// Content type served for OPDS feeds.
const OPDS_MIME: &str = "application/atom+xml;charset=utf-8";

/// Build an XML feed response.
fn xml_response(xml: String) -> Response {
    ([(header::CONTENT_TYPE, OPDS_MIME)], xml).into_response()
}

/// Combined filter and pagination query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    search: Option<String>,
    author: Option<String>,
    series: Option<String>,
    tag: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl CatalogQuery {
    fn filter(&self) -> BookFilter {
        BookFilter {
            search: self.search.clone(),
            author: self.author.clone(),
            series: self.series.clone(),
            tag: self.tag.clone(),
        }
    }

    fn page(&self) -> PageParams {
        PageParams {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

// ============================================================================
// OPDS CATALOG
// ============================================================================

/// Build the root navigation feed: the four fixed sub-catalogs.
pub(crate) fn root_feed(state: &AppState) -> Result<String> {
    let base = state.base_url();

    FeedBuilder::new(&format!("{base}/opds"), &state.config.server.title)
        .link(Link::feed("self", format!("{base}/opds")))
        .link(Link::feed("start", format!("{base}/opds")))
        .navigation_entry(
            "Latest Books",
            "Books sorted by most recently added or modified",
            format!("{base}/opds/books"),
        )
        .navigation_entry(
            "By Author",
            "Books grouped by author",
            format!("{base}/opds/authors"),
        )
        .navigation_entry(
            "By Series",
            "Books grouped by series",
            format!("{base}/opds/series"),
        )
        .navigation_entry(
            "By Tag",
            "Books grouped by tag",
            format!("{base}/opds/tags"),
        )
        .build()
}

/// Catalog root.
pub async fn opds_root(State(state): State<AppState>) -> Result<Response> {
    Ok(xml_response(root_feed(&state)?))
}

/// Paginated, filterable book feed.
pub async fn opds_books(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Response> {
    let pagination = &state.config.pagination;
    let filter = query.filter();
    let (limit, offset) = query
        .page()
        .clamp(pagination.default_limit, pagination.max_limit);

    let total = state.store.count(&filter)?;
    let mut books = state.store.page(&filter, limit, offset)?;
    state.store.hydrate(&mut books)?;

    let base = format!("{}/opds/books", state.base_url());
    let pager = Pager::new(&base, &filter, limit, offset, total);

    let mut feed = FeedBuilder::new(&pager.self_href(), pager.title())
        .links(pager.links())
        .pagination(total, offset, limit);

    for book in &books {
        feed = feed.book_entry(book, state.base_url());
    }

    Ok(xml_response(feed.build()?))
}

/// Single-book feed.
pub async fn opds_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response> {
    let book = state
        .store
        .book_by_id(id)?
        .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", id)))?;

    let self_href = format!("{}/opds/book/{}", state.base_url(), id);
    let feed = FeedBuilder::new(&self_href, format!("Book: {}", book.title))
        .link(Link::feed("self", self_href.clone()))
        .book_entry(&book, state.base_url())
        .build()?;

    Ok(xml_response(feed))
}

/// Author navigation feed.
pub async fn opds_authors(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Response> {
    let pagination = &state.config.pagination;
    let (limit, offset) = query
        .page()
        .clamp(pagination.list_limit, pagination.max_limit);

    let authors = state.store.list_authors(limit, offset)?;
    let base = state.base_url().to_string();
    let self_href = format!("{base}/opds/authors?limit={limit}&offset={offset}");

    let mut feed = FeedBuilder::new(
        &self_href,
        format!("By Author - page {}", offset / limit + 1),
    )
    .link(Link::feed("self", self_href.clone()));

    for author in authors {
        feed = feed.navigation_entry(
            format!("{} ({} books)", author.name, author.book_count),
            format!("Author: {}", author.name),
            format!("{base}/opds/books?author={}", urlencoding::encode(&author.name)),
        );
    }

    Ok(xml_response(feed.build()?))
}

/// Series navigation feed.
pub async fn opds_series(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Response> {
    let pagination = &state.config.pagination;
    let (limit, offset) = query
        .page()
        .clamp(pagination.list_limit, pagination.max_limit);

    let series_list = state.store.list_series(limit, offset)?;
    let base = state.base_url().to_string();
    let self_href = format!("{base}/opds/series?limit={limit}&offset={offset}");

    let mut feed = FeedBuilder::new(
        &self_href,
        format!("By Series - page {}", offset / limit + 1),
    )
    .link(Link::feed("self", self_href.clone()));

    for series in series_list {
        feed = feed.navigation_entry(
            format!("{} ({} books)", series.name, series.book_count),
            format!("Series: {}", series.name),
            format!("{base}/opds/books?series={}", urlencoding::encode(&series.name)),
        );
    }

    Ok(xml_response(feed.build()?))
}

/// Tag navigation feed.
pub async fn opds_tags(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Response> {
    let pagination = &state.config.pagination;
    let (limit, offset) = query
        .page()
        .clamp(pagination.list_limit, pagination.max_limit);

    let tags = state.store.list_tags(limit, offset)?;
    let base = state.base_url().to_string();
    let self_href = format!("{base}/opds/tags?limit={limit}&offset={offset}");

    let mut feed = FeedBuilder::new(&self_href, format!("By Tag - page {}", offset / limit + 1))
        .link(Link::feed("self", self_href.clone()));

    for tag in tags {
        feed = feed.navigation_entry(
            format!("{} ({} books)", tag.name, tag.book_count),
            format!("Tag: {}", tag.name),
            format!("{base}/opds/books?tag={}", urlencoding::encode(&tag.name)),
        );
    }

    Ok(xml_response(feed.build()?))
}

// ============================================================================
// FILE SERVING
// ============================================================================

/// Book cover image, served from the book's library directory.
pub async fn opds_cover(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response> {
    let book = state
        .store
        .book_by_id(id)?
        .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", id)))?;

    let dir = state.books_root().join(book.path.replace('\\', "/"));

    for (name, mime) in [("cover.jpg", "image/jpeg"), ("cover.png", "image/png")] {
        let path = dir.join(name);
        if path.is_file() {
            let file = tokio::fs::File::open(&path).await?;
            let len = file.metadata().await?.len();
            let body = Body::from_stream(ReaderStream::new(file));

            return Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, mime)
                .header(header::CONTENT_LENGTH, len)
                .header(header::CACHE_CONTROL, "public, max-age=3600")
                .body(body)
                .map_err(|e| AppError::Assembly(e.to_string()));
        }
    }

    Err(AppError::NotFound(format!("Cover not found: {}", id)))
}

/// Stream a book file in the requested format.
pub async fn download_book(
    State(state): State<AppState>,
    Path((id, format)): Path<(i64, String)>,
) -> Result<Response> {
    let book = state
        .store
        .book_by_id(id)?
        .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", id)))?;

    let target = book
        .formats
        .iter()
        .find(|f| f.format.eq_ignore_ascii_case(&format))
        .ok_or_else(|| AppError::NotFound(format!("Format {} not found", format)))?;

    let dir = state.books_root().join(book.path.replace('\\', "/"));

    // Calibre stores filenames without extension; try both spellings.
    let mut candidates = vec![dir.join(&target.filename)];
    if let Some(ext) = formats::file_extension(&target.format)
        && !target.filename.to_lowercase().ends_with(ext)
    {
        candidates.push(dir.join(format!("{}{}", target.filename, ext)));
    }

    let full_path = candidates
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| AppError::NotFound(format!("File not found for format {}", format)))?;

    let file = tokio::fs::File::open(&full_path).await?;
    let len = file.metadata().await?.len();
    let body = Body::from_stream(ReaderStream::new(file));

    let filename = safe_filename(&book.title, &target.format);
    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(&filename)
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, formats::mime_type(&target.format))
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, len)
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Assembly(e.to_string()))
}

/// Download filename derived from the title: strip characters that are
/// illegal on common filesystems, then append the format extension.
pub(crate) fn safe_filename(title: &str, format: &str) -> String {
    let mut safe: String = title
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();

    if let Some(ext) = formats::file_extension(format)
        && !safe.to_lowercase().ends_with(ext)
    {
        safe.push_str(ext);
    }
    safe
}

// ============================================================================
// JSON API
// ============================================================================

/// Book list response.
#[derive(Serialize)]
pub struct BooksResponse {
    books: Vec<Book>,
    total: u64,
    limit: u64,
    offset: u64,
}

/// API: filterable, paginated book list.
pub async fn api_books(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<BooksResponse>> {
    let pagination = &state.config.pagination;
    let filter = query.filter();
    let (limit, offset) = query
        .page()
        .clamp(pagination.default_limit, pagination.max_limit);

    let total = state.store.count(&filter)?;
    let mut books = state.store.page(&filter, limit, offset)?;
    state.store.hydrate(&mut books)?;

    Ok(Json(BooksResponse {
        books,
        total,
        limit,
        offset,
    }))
}

/// API: single book with associations and comments.
pub async fn api_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Book>> {
    let book = state
        .store
        .book_by_id(id)?
        .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", id)))?;

    Ok(Json(book))
}

/// API: library statistics.
pub async fn api_stats(State(state): State<AppState>) -> Result<Json<Stats>> {
    Ok(Json(state.store.stats()?))
}

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    book_count: Option<u64>,
    timestamp: String,
}

/// API: health check, exercises one store read.
pub async fn api_health(State(state): State<AppState>) -> Response {
    let timestamp = chrono::Utc::now().to_rfc3339();

    match state.store.count(&BookFilter::default()) {
        Ok(count) => Json(HealthResponse {
            status: "healthy",
            book_count: Some(count),
            timestamp,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    book_count: None,
                    timestamp,
                }),
            )
                .into_response()
        }
    }
}
