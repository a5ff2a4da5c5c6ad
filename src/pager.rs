//! Pagination links and page titles for catalog feeds.

use crate::db::BookFilter;
use crate::opds::Link;
use serde::Deserialize;

/// Raw limit/offset query parameters, before clamping.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    /// Requested page size.
    pub limit: Option<i64>,
    /// Requested offset into the result set.
    pub offset: Option<i64>,
}

impl PageParams {
    /// Clamp to a usable window: limit in `[1, max_limit]`, offset >= 0.
    /// Clamping happens here, before any value reaches the store. A zero
    /// `max_limit` from a bad config degrades to 1 instead of panicking.
    pub fn clamp(&self, default_limit: u64, max_limit: u64) -> (u64, u64) {
        let limit = self
            .limit
            .unwrap_or(default_limit as i64)
            .clamp(1, (max_limit as i64).max(1)) as u64;
        let offset = self.offset.unwrap_or(0).max(0) as u64;
        (limit, offset)
    }
}

/// Computes self/next/previous links for one request window.
///
/// Every link re-encodes all active filter facets so browsing pages never
/// silently drops a filter.
pub struct Pager<'a> {
    base: &'a str,
    filter: &'a BookFilter,
    limit: u64,
    offset: u64,
    total: u64,
}

impl<'a> Pager<'a> {
    /// Create a pager for the given feed path (e.g. `/opds/books`),
    /// active filter and clamped window.
    pub fn new(base: &'a str, filter: &'a BookFilter, limit: u64, offset: u64, total: u64) -> Self {
        Self {
            base,
            filter,
            limit: limit.max(1),
            offset,
            total,
        }
    }

    /// Href for the current window.
    pub fn self_href(&self) -> String {
        self.href(self.offset)
    }

    /// Offset of the next page, present iff more results remain.
    pub fn next_offset(&self) -> Option<u64> {
        (self.offset + self.limit < self.total).then(|| self.offset + self.limit)
    }

    /// Offset of the previous page, present iff the window is not at the
    /// start. Retreats by `limit`, clamped at zero.
    pub fn prev_offset(&self) -> Option<u64> {
        (self.offset > 0).then(|| self.offset.saturating_sub(self.limit))
    }

    /// One-based page number of the current window.
    pub fn current_page(&self) -> u64 {
        self.offset / self.limit + 1
    }

    /// Total number of pages, at least one.
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.limit).max(1)
    }

    /// Self link plus next/previous links where applicable.
    pub fn links(&self) -> Vec<Link> {
        let mut links = vec![Link::feed("self", self.self_href())];

        if let Some(next) = self.next_offset() {
            links.push(
                Link::feed("next", self.href(next))
                    .with_title(format!("Next page (page {})", self.current_page() + 1)),
            );
        }

        if let Some(prev) = self.prev_offset() {
            links.push(
                Link::feed("previous", self.href(prev))
                    .with_title(format!("Previous page (page {})", self.current_page() - 1)),
            );
        }

        links
    }

    /// Feed title derived from the dominant facet.
    pub fn title(&self) -> String {
        let pages = format!("page {}/{}", self.current_page(), self.total_pages());
        if let Some(author) = self.filter.author() {
            format!("Author: {} - {}", author, pages)
        } else if let Some(series) = self.filter.series() {
            format!("Series: {} - {}", series, pages)
        } else if let Some(tag) = self.filter.tag() {
            format!("Tag: {} - {}", tag, pages)
        } else if let Some(search) = self.filter.search() {
            format!("Search: \"{}\" - {}", search, pages)
        } else {
            format!("Latest Books - {}", pages)
        }
    }

    fn href(&self, offset: u64) -> String {
        let mut query = String::new();
        for (key, value) in self.filter.query_pairs() {
            query.push_str(key);
            query.push('=');
            query.push_str(&urlencoding::encode(value));
            query.push('&');
        }
        format!(
            "{}?{}limit={}&offset={}",
            self.base, query, self.limit, offset
        )
    }
}
