use crate::config::Config;
use crate::db::{Author, Book, BookFilter, CatalogStore, Format, Series, parse_timestamp};
use crate::error::AppError;
use crate::formats;
use crate::opds::{FeedBuilder, Link};
use crate::pager::{PageParams, Pager};
use crate::server::{AppState, handlers};
use chrono::{TimeZone, Utc};
use rusqlite::{Connection, params};

const SCHEMA: &str = "
    CREATE TABLE books (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        author_sort TEXT,
        path TEXT,
        series_index REAL,
        isbn TEXT,
        pubdate TEXT,
        last_modified TEXT,
        has_cover BOOL,
        uuid TEXT
    );
    CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL, sort TEXT);
    CREATE TABLE tags (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
    CREATE TABLE series (id INTEGER PRIMARY KEY, name TEXT NOT NULL, sort TEXT);
    CREATE TABLE comments (id INTEGER PRIMARY KEY, book INTEGER, text TEXT);
    CREATE TABLE data (
        id INTEGER PRIMARY KEY,
        book INTEGER,
        format TEXT,
        uncompressed_size INTEGER,
        name TEXT
    );
    CREATE TABLE books_authors_link (id INTEGER PRIMARY KEY, book INTEGER, author INTEGER);
    CREATE TABLE books_series_link (id INTEGER PRIMARY KEY, book INTEGER, series INTEGER);
    CREATE TABLE books_tags_link (id INTEGER PRIMARY KEY, book INTEGER, tag INTEGER);
";

struct TestLibrary {
    _dir: tempfile::TempDir,
    path: std::path::PathBuf,
    store: CatalogStore,
}

fn add_book(conn: &Connection, id: i64, title: &str, sort: &str, modified: &str, cover: bool) {
    conn.execute(
        "INSERT INTO books (id, title, author_sort, path, last_modified, has_cover, uuid) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            title,
            sort,
            format!("{}/{} ({})", sort, title, id),
            modified,
            cover,
            format!("00000000-0000-0000-0000-00000000000{}", id),
        ],
    )
    .unwrap();
}

fn add_format(conn: &Connection, book: i64, format: &str, size: i64, name: &str) {
    conn.execute(
        "INSERT INTO data (book, format, uncompressed_size, name) VALUES (?, ?, ?, ?)",
        params![book, format, size, name],
    )
    .unwrap();
}

/// Three books, two linked authors, one series, two tags.
///
/// Book 1 is the newest, has a cover, two authors (Cixin Liu credited
/// first), both tags, two formats and a comment. Book 2 is mid-age, no
/// cover, same series. Book 3 is oldest and has no associations at all.
fn test_library() -> TestLibrary {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metadata.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(SCHEMA).unwrap();

    conn.execute_batch(
        "INSERT INTO authors (id, name, sort) VALUES
            (1, 'Cixin Liu', 'Liu, Cixin'),
            (2, 'Ken Liu', 'Liu, Ken'),
            (3, 'Amy Zed', 'Zed, Amy');
         INSERT INTO series (id, name, sort) VALUES (1, 'Remembrance', 'Remembrance');
         INSERT INTO tags (id, name) VALUES (1, 'Science Fiction'), (2, 'Award Winner');",
    )
    .unwrap();

    add_book(
        &conn,
        1,
        "The Three-Body Problem",
        "Liu, Cixin",
        "2024-03-01 10:00:00+00:00",
        true,
    );
    add_book(
        &conn,
        2,
        "The Dark Forest",
        "Liu, Cixin",
        "2024-02-01 10:00:00+00:00",
        false,
    );
    add_book(
        &conn,
        3,
        "Standalone",
        "Zed, Amy",
        "2024-01-01 10:00:00+00:00",
        false,
    );

    conn.execute_batch(
        "INSERT INTO books_authors_link (book, author) VALUES (1, 1), (1, 2), (2, 1), (3, 3);
         INSERT INTO books_series_link (book, series) VALUES (1, 1), (2, 1);
         INSERT INTO books_tags_link (book, tag) VALUES (1, 1), (1, 2), (2, 1);
         INSERT INTO comments (book, text) VALUES (1, 'First contact story.');
         UPDATE books SET series_index = 1.0 WHERE id = 1;
         UPDATE books SET series_index = 2.0 WHERE id = 2;",
    )
    .unwrap();

    add_format(&conn, 1, "MOBI", 2000, "three-body");
    add_format(&conn, 1, "EPUB", 1000, "three-body");
    add_format(&conn, 2, "EPUB", 1500, "dark-forest");
    drop(conn);

    let store = CatalogStore::open(&path, 2).unwrap();
    TestLibrary {
        _dir: dir,
        path,
        store,
    }
}

fn test_book() -> Book {
    Book {
        id: 1,
        title: "The Three-Body Problem".to_string(),
        author_sort: "Liu, Cixin".to_string(),
        path: "Liu, Cixin/The Three-Body Problem (1)".to_string(),
        series_index: Some(1.0),
        isbn: None,
        pubdate: None,
        last_modified: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        has_cover: true,
        uuid: "00000000-0000-0000-0000-000000000001".to_string(),
        comments: Some("First contact story.".to_string()),
        authors: vec![
            Author {
                name: "Cixin Liu".to_string(),
                sort: "Liu, Cixin".to_string(),
            },
            Author {
                name: "Ken Liu".to_string(),
                sort: "Liu, Ken".to_string(),
            },
        ],
        tags: vec!["Award Winner".to_string(), "Science Fiction".to_string()],
        series: Some(Series {
            name: "Remembrance".to_string(),
            sort: "Remembrance".to_string(),
            index: Some(1.0),
        }),
        formats: vec![
            Format {
                format: "EPUB".to_string(),
                size: 1000,
                filename: "three-body".to_string(),
            },
            Format {
                format: "MOBI".to_string(),
                size: 2000,
                filename: "three-body".to_string(),
            },
        ],
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

#[test]
fn filter_empty_produces_no_clause() {
    let (clause, args) = BookFilter::default().where_clause();
    assert!(clause.is_empty());
    assert!(args.is_empty());
}

#[test]
fn filter_search_binds_pattern_twice() {
    let filter = BookFilter {
        search: Some("dark".to_string()),
        ..Default::default()
    };
    let (clause, args) = filter.where_clause();
    assert!(clause.starts_with(" WHERE "));
    assert!(clause.contains("b.title LIKE ?"));
    assert!(clause.contains("b.author_sort LIKE ?"));
    assert_eq!(args.len(), 2);
}

#[test]
fn filter_facets_combine_with_and() {
    let filter = BookFilter {
        search: Some("dark".to_string()),
        author: Some("Cixin Liu".to_string()),
        tag: Some("Science Fiction".to_string()),
        ..Default::default()
    };
    let (clause, args) = filter.where_clause();
    assert_eq!(clause.matches(" AND ").count(), 2);
    assert_eq!(args.len(), 4);
}

#[test]
fn filter_empty_strings_count_as_absent() {
    let filter = BookFilter {
        search: Some(String::new()),
        author: Some(String::new()),
        ..Default::default()
    };
    assert!(filter.is_empty());
    let (clause, args) = filter.where_clause();
    assert!(clause.is_empty());
    assert!(args.is_empty());
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[test]
fn store_open_rejects_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = CatalogStore::open(&dir.path().join("nope.db"), 2);
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn store_open_rejects_incomplete_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metadata.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT);")
        .unwrap();
    drop(conn);

    let result = CatalogStore::open(&path, 2);
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn store_count_matches_page_for_every_facet() {
    let lib = test_library();
    let filters = [
        BookFilter::default(),
        BookFilter {
            author: Some("Cixin Liu".to_string()),
            ..Default::default()
        },
        BookFilter {
            series: Some("Remembrance".to_string()),
            ..Default::default()
        },
        BookFilter {
            tag: Some("Science Fiction".to_string()),
            ..Default::default()
        },
        BookFilter {
            search: Some("dark".to_string()),
            ..Default::default()
        },
    ];

    for filter in filters {
        let total = lib.store.count(&filter).unwrap();
        let page = lib.store.page(&filter, 100, 0).unwrap();
        assert_eq!(total as usize, page.len());
    }
}

#[test]
fn store_page_orders_by_last_modified_desc() {
    let lib = test_library();
    let books = lib.store.page(&BookFilter::default(), 100, 0).unwrap();
    let titles: Vec<&str> = books.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(
        titles,
        ["The Three-Body Problem", "The Dark Forest", "Standalone"]
    );
}

#[test]
fn store_page_respects_window() {
    let lib = test_library();
    let books = lib.store.page(&BookFilter::default(), 2, 2).unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title, "Standalone");
}

#[test]
fn store_search_is_case_insensitive_substring() {
    let lib = test_library();
    let filter = BookFilter {
        search: Some("DARK".to_string()),
        ..Default::default()
    };
    let books = lib.store.page(&filter, 100, 0).unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title, "The Dark Forest");
}

#[test]
fn store_book_by_id_hydrates_everything() {
    let lib = test_library();
    let book = lib.store.book_by_id(1).unwrap().unwrap();

    assert_eq!(book.comments.as_deref(), Some("First contact story."));

    // Authors in credit order, not alphabetical.
    let authors: Vec<&str> = book.authors.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(authors, ["Cixin Liu", "Ken Liu"]);

    // Tags sorted by name.
    assert_eq!(book.tags, ["Award Winner", "Science Fiction"]);

    let series = book.series.unwrap();
    assert_eq!(series.name, "Remembrance");
    assert_eq!(series.index, Some(1.0));

    // Formats sorted by format code.
    let codes: Vec<&str> = book.formats.iter().map(|f| f.format.as_str()).collect();
    assert_eq!(codes, ["EPUB", "MOBI"]);
}

#[test]
fn store_book_by_id_missing_is_none() {
    let lib = test_library();
    assert!(lib.store.book_by_id(999).unwrap().is_none());
}

#[test]
fn store_hydrate_fills_page_and_leaves_bare_books_empty() {
    let lib = test_library();
    let mut books = lib.store.page(&BookFilter::default(), 100, 0).unwrap();
    assert!(books.iter().all(|b| b.authors.is_empty()));

    lib.store.hydrate(&mut books).unwrap();

    let first = &books[0];
    assert_eq!(first.authors.len(), 2);
    assert_eq!(first.formats.len(), 2);

    let bare = books.iter().find(|b| b.title == "Standalone").unwrap();
    assert_eq!(bare.authors.len(), 1);
    assert!(bare.tags.is_empty());
    assert!(bare.series.is_none());
    assert!(bare.formats.is_empty());
}

#[test]
fn store_hydrate_aborts_whole_page_on_lookup_failure() {
    let lib = test_library();
    let mut books = lib.store.page(&BookFilter::default(), 100, 0).unwrap();

    // Break one association lookup underneath the store.
    let conn = Connection::open(&lib.path).unwrap();
    conn.execute_batch("DROP TABLE books_tags_link;").unwrap();
    drop(conn);

    let result = lib.store.hydrate(&mut books);
    assert!(matches!(result, Err(AppError::Store(_))));

    // No partial hydration: nothing was assigned before the failure.
    assert!(books.iter().all(|b| b.authors.is_empty()));
    assert!(books.iter().all(|b| b.tags.is_empty()));
    assert!(books.iter().all(|b| b.formats.is_empty()));
}

#[test]
fn store_passes_duplicate_format_codes_through() {
    let lib = test_library();
    let conn = Connection::open(&lib.path).unwrap();
    add_format(&conn, 2, "EPUB", 900, "dark-forest-retail");
    drop(conn);

    let book = lib.store.book_by_id(2).unwrap().unwrap();
    let codes: Vec<&str> = book.formats.iter().map(|f| f.format.as_str()).collect();
    assert_eq!(codes, ["EPUB", "EPUB"]);

    // Only the first link in list order is open-access.
    let xml = FeedBuilder::new("/opds/book/2", "Test")
        .book_entry(&book, "")
        .build()
        .unwrap();
    assert_eq!(
        xml.matches(r#"rel="http://opds-spec.org/acquisition/open-access""#)
            .count(),
        1
    );
    assert_eq!(
        xml.matches(r#"rel="http://opds-spec.org/acquisition" "#).count(),
        1
    );
}

#[test]
fn store_listings_carry_book_counts() {
    let lib = test_library();

    let authors = lib.store.list_authors(100, 0).unwrap();
    let names: Vec<&str> = authors.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Cixin Liu", "Ken Liu", "Amy Zed"]);
    assert_eq!(authors[0].book_count, 2);
    assert_eq!(authors[1].book_count, 1);

    let series = lib.store.list_series(100, 0).unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].book_count, 2);

    let tags = lib.store.list_tags(100, 0).unwrap();
    let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Award Winner", "Science Fiction"]);
    assert_eq!(tags[1].book_count, 2);
}

#[test]
fn store_stats_counts_formats() {
    let lib = test_library();
    let stats = lib.store.stats().unwrap();
    assert_eq!(stats.total_books, 3);
    assert_eq!(stats.total_authors, 3);
    assert_eq!(stats.formats.get("EPUB"), Some(&2));
    assert_eq!(stats.formats.get("MOBI"), Some(&1));
}

#[test]
fn book_json_omits_empty_fields() {
    let mut book = test_book();
    book.comments = None;
    book.tags.clear();
    book.series = None;

    let json = serde_json::to_value(&book).unwrap();
    assert_eq!(json["title"], "The Three-Body Problem");
    assert_eq!(json["formats"][0]["format"], "EPUB");
    assert!(json.get("comments").is_none());
    assert!(json.get("tags").is_none());
    assert!(json.get("series").is_none());
    assert!(json.get("isbn").is_none());
}

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

#[test]
fn format_mime_types() {
    assert_eq!(formats::mime_type("EPUB"), "application/epub+zip");
    assert_eq!(formats::mime_type("epub"), "application/epub+zip");
    assert_eq!(formats::mime_type("PDF"), "application/pdf");
    assert_eq!(formats::mime_type("DJVU"), "application/octet-stream");
}

#[test]
fn format_extensions() {
    assert_eq!(formats::file_extension("EPUB"), Some(".epub"));
    assert_eq!(formats::file_extension("azw3"), Some(".azw3"));
    assert_eq!(formats::file_extension("DJVU"), None);
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[test]
fn page_params_clamp_bounds() {
    let defaults = PageParams::default();
    assert_eq!(defaults.clamp(20, 100), (20, 0));

    let oversized = PageParams {
        limit: Some(1000),
        offset: Some(-5),
    };
    assert_eq!(oversized.clamp(20, 100), (100, 0));

    let undersized = PageParams {
        limit: Some(0),
        offset: Some(40),
    };
    assert_eq!(undersized.clamp(20, 100), (1, 40));

    // A zero max_limit from a bad config degrades instead of panicking.
    let zero_max = PageParams {
        limit: Some(5),
        offset: None,
    };
    assert_eq!(zero_max.clamp(20, 0), (1, 0));
}

#[test]
fn pager_first_page_has_next_but_no_previous() {
    let filter = BookFilter::default();
    let pager = Pager::new("/opds/books", &filter, 20, 0, 45);

    assert_eq!(pager.next_offset(), Some(20));
    assert_eq!(pager.prev_offset(), None);
    assert_eq!(pager.current_page(), 1);
    assert_eq!(pager.total_pages(), 3);

    let links = pager.links();
    let rels: Vec<&str> = links.iter().map(|l| l.rel.as_str()).collect();
    assert_eq!(rels, ["self", "next"]);
}

#[test]
fn pager_last_page_has_previous_but_no_next() {
    let filter = BookFilter::default();
    let pager = Pager::new("/opds/books", &filter, 20, 40, 45);

    assert_eq!(pager.next_offset(), None);
    assert_eq!(pager.prev_offset(), Some(20));
    assert_eq!(pager.current_page(), 3);

    let links = pager.links();
    let rels: Vec<&str> = links.iter().map(|l| l.rel.as_str()).collect();
    assert_eq!(rels, ["self", "previous"]);
}

#[test]
fn pager_exact_boundary_has_no_next() {
    let filter = BookFilter::default();
    let pager = Pager::new("/opds/books", &filter, 20, 20, 40);
    assert_eq!(pager.next_offset(), None);
}

#[test]
fn pager_links_reencode_facets() {
    let filter = BookFilter {
        search: Some("三体".to_string()),
        tag: Some("Science Fiction".to_string()),
        ..Default::default()
    };
    let pager = Pager::new("/opds/books", &filter, 20, 0, 45);

    let next = &pager.links()[1];
    assert_eq!(next.rel, "next");
    assert!(next.href.contains("search=%E4%B8%89%E4%BD%93"));
    assert!(next.href.contains("tag=Science%20Fiction"));
    assert!(next.href.ends_with("limit=20&offset=20"));
}

#[test]
fn pager_titles_follow_dominant_facet() {
    let plain = BookFilter::default();
    assert_eq!(
        Pager::new("/opds/books", &plain, 20, 0, 45).title(),
        "Latest Books - page 1/3"
    );

    let by_author = BookFilter {
        author: Some("Cixin Liu".to_string()),
        search: Some("dark".to_string()),
        ..Default::default()
    };
    assert_eq!(
        Pager::new("/opds/books", &by_author, 20, 0, 2).title(),
        "Author: Cixin Liu - page 1/1"
    );

    let by_search = BookFilter {
        search: Some("dark".to_string()),
        ..Default::default()
    };
    assert_eq!(
        Pager::new("/opds/books", &by_search, 20, 0, 2).title(),
        "Search: \"dark\" - page 1/1"
    );
}

// ---------------------------------------------------------------------------
// OPDS feeds
// ---------------------------------------------------------------------------

/// Drop the feed-level <updated> element, the only non-deterministic part.
fn strip_feed_updated(xml: &str) -> String {
    let start = xml.find("<updated>").unwrap();
    let end = start + xml[start..].find("</updated>").unwrap() + "</updated>".len();
    format!("{}{}", &xml[..start], &xml[end..])
}

#[test]
fn book_entry_orders_acquisition_links() {
    let xml = FeedBuilder::new("/opds/books", "Test")
        .book_entry(&test_book(), "")
        .build()
        .unwrap();

    let cover = xml.find(r#"rel="http://opds-spec.org/image""#).unwrap();
    let open_access = xml
        .find(r#"rel="http://opds-spec.org/acquisition/open-access""#)
        .unwrap();
    let acquisition = xml
        .find(r#"rel="http://opds-spec.org/acquisition" "#)
        .unwrap();

    // Cover first, then open-access for the first format, plain
    // acquisition for the rest.
    assert!(cover < open_access);
    assert!(open_access < acquisition);

    assert!(xml.contains(r#"href="/download/1/EPUB""#));
    assert!(xml.contains(r#"href="/download/1/MOBI""#));
    assert!(xml.contains(r#"href="/opds/cover/1""#));
    assert!(xml.contains("urn:uuid:00000000-0000-0000-0000-000000000001"));
    assert!(xml.contains("<name>Cixin Liu</name>"));
    assert!(xml.contains("First contact story."));
}

#[test]
fn book_entry_without_cover_has_no_image_link() {
    let mut book = test_book();
    book.has_cover = false;

    let xml = FeedBuilder::new("/opds/books", "Test")
        .book_entry(&book, "")
        .build()
        .unwrap();

    assert!(!xml.contains("http://opds-spec.org/image"));
}

#[test]
fn feed_emits_pagination_counters() {
    let xml = FeedBuilder::new("/opds/books", "Test")
        .pagination(45, 20, 20)
        .build()
        .unwrap();

    assert!(xml.contains("<opds:totalResults>45</opds:totalResults>"));
    assert!(xml.contains("<opds:startIndex>20</opds:startIndex>"));
    assert!(xml.contains("<opds:itemsPerPage>20</opds:itemsPerPage>"));
}

#[test]
fn feed_omits_zero_counters() {
    let xml = FeedBuilder::new("/opds/books", "Test")
        .pagination(0, 0, 20)
        .build()
        .unwrap();

    assert!(!xml.contains("opds:totalResults"));
    assert!(xml.contains("<opds:startIndex>0</opds:startIndex>"));
    assert!(xml.contains("<opds:itemsPerPage>20</opds:itemsPerPage>"));
}

#[test]
fn feed_declares_atom_and_opds_namespaces() {
    let xml = FeedBuilder::new("/opds", "Test").build().unwrap();
    assert!(xml.contains(r#"xmlns="http://www.w3.org/2005/Atom""#));
    assert!(xml.contains(r#"xmlns:opds="http://opds-spec.org/2010/catalog""#));
}

#[test]
fn feed_is_stable_across_rebuilds() {
    let build = || {
        FeedBuilder::new("/opds/books?limit=20&offset=0", "Latest Books")
            .link(Link::feed("self", "/opds/books?limit=20&offset=0"))
            .pagination(1, 0, 20)
            .book_entry(&test_book(), "")
            .build()
            .unwrap()
    };

    assert_eq!(strip_feed_updated(&build()), strip_feed_updated(&build()));
}

#[test]
fn root_feed_lists_the_four_catalogs_in_order() {
    let lib = test_library();
    let state = AppState::new(Config::default(), lib.store.clone());

    let xml = handlers::root_feed(&state).unwrap();

    assert_eq!(xml.matches("<entry>").count(), 4);

    let latest = xml.find("Latest Books").unwrap();
    let by_author = xml.find("By Author").unwrap();
    let by_series = xml.find("By Series").unwrap();
    let by_tag = xml.find("By Tag").unwrap();
    assert!(latest < by_author && by_author < by_series && by_series < by_tag);

    assert!(xml.contains(r#"href="/opds/books""#));
    assert!(xml.contains(r#"href="/opds/authors""#));
    assert!(xml.contains(r#"href="/opds/series""#));
    assert!(xml.contains(r#"href="/opds/tags""#));

    // Navigation entries carry no per-entry timestamp, so the feed is
    // identical apart from its own updated element.
    let again = handlers::root_feed(&state).unwrap();
    assert_eq!(strip_feed_updated(&xml), strip_feed_updated(&again));
}

// ---------------------------------------------------------------------------
// Downloads
// ---------------------------------------------------------------------------

#[test]
fn safe_filename_strips_reserved_characters() {
    assert_eq!(
        handlers::safe_filename("The Three-Body Problem", "EPUB"),
        "The_Three-Body_Problem.epub"
    );
    assert_eq!(
        handlers::safe_filename("What? A/B \"Test\"", "PDF"),
        "What_AB_Test.pdf"
    );
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[test]
fn config_defaults() {
    let config = Config::default();
    assert_eq!(config.server.bind.port(), 1580);
    assert_eq!(config.server.title, "Calibre OPDS Catalog");
    assert!(config.server.base_url.is_empty());
    assert_eq!(config.pagination.default_limit, 20);
    assert_eq!(config.pagination.max_limit, 100);
    assert_eq!(config.library.pool_size, 4);
}

#[test]
fn config_parses_partial_toml() {
    let config: Config = toml::from_str(
        r#"
        [server]
        bind = "127.0.0.1:8080"
        title = "My Shelf"

        [pagination]
        default_limit = 10
        "#,
    )
    .unwrap();

    assert_eq!(config.server.bind.port(), 8080);
    assert_eq!(config.server.title, "My Shelf");
    assert_eq!(config.pagination.default_limit, 10);
    assert_eq!(config.pagination.max_limit, 100);
}

#[test]
fn config_generate_default_is_valid_toml() {
    let config: Config = toml::from_str(&Config::generate_default()).unwrap();
    assert_eq!(config.server.bind.port(), 1580);
}

#[test]
fn config_books_root_resolves_against_database_dir() {
    let mut config = Config::default();
    config.library.database = "/data/calibre/metadata.db".into();
    config.library.books = "files".into();
    assert_eq!(
        config.library.books_root(),
        std::path::PathBuf::from("/data/calibre/files")
    );

    config.library.books = "/srv/books".into();
    assert_eq!(
        config.library.books_root(),
        std::path::PathBuf::from("/srv/books")
    );
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

#[test]
fn timestamps_parse_calibre_variants() {
    let expected = Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap();

    assert_eq!(parse_timestamp("2024-01-05T10:00:00+00:00"), expected);
    assert_eq!(parse_timestamp("2024-01-05 10:00:00+00:00"), expected);
    assert_eq!(parse_timestamp("2024-01-05 10:00:00.000000+00:00"), expected);
    assert_eq!(parse_timestamp("2024-01-05 10:00:00"), expected);
    assert_eq!(
        parse_timestamp("garbage"),
        chrono::DateTime::<Utc>::UNIX_EPOCH
    );
}
