//! Facet filters and WHERE-clause assembly.

use rusqlite::types::Value;
use serde::Deserialize;

/// Optional filter facets for catalog queries.
///
/// Each non-empty facet contributes one predicate; predicates combine with
/// AND. Values are always bound, never concatenated into query text. Empty
/// strings count as absent so `?search=` behaves like no filter at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookFilter {
    /// Case-insensitive substring match against title or author sort key.
    pub search: Option<String>,
    /// Exact author name.
    pub author: Option<String>,
    /// Exact series name.
    pub series: Option<String>,
    /// Exact tag name.
    pub tag: Option<String>,
}

impl BookFilter {
    /// Whether no facet is active (the full-catalog query).
    pub fn is_empty(&self) -> bool {
        self.search().is_none()
            && self.author().is_none()
            && self.series().is_none()
            && self.tag().is_none()
    }

    /// Active search facet, with empty strings normalized away.
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }

    /// Active author facet.
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref().filter(|s| !s.is_empty())
    }

    /// Active series facet.
    pub fn series(&self) -> Option<&str> {
        self.series.as_deref().filter(|s| !s.is_empty())
    }

    /// Active tag facet.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref().filter(|s| !s.is_empty())
    }

    /// Build the WHERE clause and its bound values.
    ///
    /// Returns an empty string when no facet is active, otherwise
    /// `" WHERE <p1> AND <p2> ..."`. The same clause must back both the
    /// count query and the page query so pagination totals stay consistent
    /// with page contents.
    pub(crate) fn where_clause(&self) -> (String, Vec<Value>) {
        let mut predicates: Vec<&str> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if let Some(search) = self.search() {
            predicates.push("(b.title LIKE ? OR b.author_sort LIKE ?)");
            let pattern = format!("%{}%", search);
            args.push(Value::Text(pattern.clone()));
            args.push(Value::Text(pattern));
        }

        if let Some(author) = self.author() {
            predicates.push(
                "EXISTS (SELECT 1 FROM books_authors_link bal \
                 JOIN authors a ON bal.author = a.id \
                 WHERE bal.book = b.id AND a.name = ?)",
            );
            args.push(Value::Text(author.to_string()));
        }

        if let Some(series) = self.series() {
            predicates.push(
                "EXISTS (SELECT 1 FROM books_series_link bsl \
                 JOIN series s ON bsl.series = s.id \
                 WHERE bsl.book = b.id AND s.name = ?)",
            );
            args.push(Value::Text(series.to_string()));
        }

        if let Some(tag) = self.tag() {
            predicates.push(
                "EXISTS (SELECT 1 FROM books_tags_link btl \
                 JOIN tags t ON btl.tag = t.id \
                 WHERE btl.book = b.id AND t.name = ?)",
            );
            args.push(Value::Text(tag.to_string()));
        }

        if predicates.is_empty() {
            (String::new(), args)
        } else {
            (format!(" WHERE {}", predicates.join(" AND ")), args)
        }
    }

    /// Active facets as query-string pairs, for pagination links.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();
        if let Some(search) = self.search() {
            pairs.push(("search", search));
        }
        if let Some(author) = self.author() {
            pairs.push(("author", author));
        }
        if let Some(series) = self.series() {
            pairs.push(("series", series));
        }
        if let Some(tag) = self.tag() {
            pairs.push(("tag", tag));
        }
        pairs
    }
}
