//! OPDS catalog feed generation.

use crate::db::Book;
use crate::error::{AppError, Result};
use crate::formats;
use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use uuid::Uuid;

/// MIME type of OPDS catalog feeds, used for navigation and paging links.
pub const OPDS_FEED_TYPE: &str = "application/atom+xml;type=feed;profile=opds-catalog";

/// Relation for links into a child catalog.
pub const REL_SUBSECTION: &str = "http://opds-spec.org/subsection";
/// Relation for the first (free) download link of an entry.
pub const REL_OPEN_ACCESS: &str = "http://opds-spec.org/acquisition/open-access";
/// Relation for additional download links.
pub const REL_ACQUISITION: &str = "http://opds-spec.org/acquisition";
/// Relation for cover image links.
pub const REL_IMAGE: &str = "http://opds-spec.org/image";

/// OPDS feed link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    /// Link relation type (e.g. "self", "next", an OPDS relation URI).
    pub rel: String,
    /// URL of the linked resource.
    pub href: String,
    /// MIME type of the linked resource.
    pub link_type: String,
    /// Optional human-readable title.
    pub title: Option<String>,
    /// Optional byte length, set on acquisition links.
    pub length: Option<i64>,
}

impl Link {
    /// A feed-typed link with the given relation.
    pub fn feed(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            link_type: OPDS_FEED_TYPE.to_string(),
            title: None,
            length: None,
        }
    }

    /// Attach a human-readable title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// OPDS feed entry.
///
/// Navigation entries carry a single subsection link and nothing else;
/// acquisition entries carry authors, a summary and download/cover links.
/// The distinction is by construction, not a stored discriminant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Unique identifier (URN).
    pub id: String,
    /// Entry title.
    pub title: String,
    /// Last update; the book's modification time for acquisition entries,
    /// absent for navigation entries so identical requests serialize
    /// identically.
    pub updated: Option<DateTime<Utc>>,
    /// Author names in credit order.
    pub authors: Vec<String>,
    /// Summary text.
    pub summary: Option<String>,
    /// Links associated with this entry.
    pub links: Vec<Link>,
}

/// Pagination counters emitted in the OPDS namespace.
#[derive(Debug, Clone, Copy)]
struct PageCounters {
    total_results: u64,
    start_index: u64,
    items_per_page: u64,
}

/// OPDS feed builder.
pub struct FeedBuilder {
    id: String,
    title: String,
    updated: DateTime<Utc>,
    links: Vec<Link>,
    entries: Vec<Entry>,
    counters: Option<PageCounters>,
}

impl FeedBuilder {
    /// Create a feed. The id is derived from the self href so re-issuing
    /// the same request yields the same identifier; only `updated` reflects
    /// assembly time. Links (self included) are added by the caller.
    pub fn new(self_href: &str, title: impl Into<String>) -> Self {
        Self {
            id: urn_from(self_href),
            title: title.into(),
            updated: Utc::now(),
            links: Vec::new(),
            entries: Vec::new(),
            counters: None,
        }
    }

    /// Add a navigational link (next, previous, start).
    pub fn link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    /// Add several navigational links.
    pub fn links(mut self, links: impl IntoIterator<Item = Link>) -> Self {
        self.links.extend(links);
        self
    }

    /// Set pagination counters (total results, start index, items per page).
    pub fn pagination(mut self, total: u64, start_index: u64, items_per_page: u64) -> Self {
        self.counters = Some(PageCounters {
            total_results: total,
            start_index,
            items_per_page,
        });
        self
    }

    /// Add a navigation entry pointing at a child feed.
    pub fn navigation_entry(
        mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        href: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let id = urn_from(&title);
        self.entries.push(Entry {
            id,
            title,
            updated: None,
            authors: Vec::new(),
            summary: Some(description.into()),
            links: vec![Link {
                rel: REL_SUBSECTION.to_string(),
                href: href.into(),
                link_type: OPDS_FEED_TYPE.to_string(),
                title: None,
                length: None,
            }],
        });
        self
    }

    /// Add an acquisition entry for a book.
    ///
    /// The cover link is present iff the book has a cover. The first
    /// format link carries the open-access relation, all subsequent ones
    /// the generic acquisition relation; formats arrive already sorted by
    /// format code from the store.
    pub fn book_entry(mut self, book: &Book, base_url: &str) -> Self {
        let mut links = Vec::with_capacity(book.formats.len() + 1);

        if book.has_cover {
            links.push(Link {
                rel: REL_IMAGE.to_string(),
                href: format!("{}/opds/cover/{}", base_url, book.id),
                link_type: "image/jpeg".to_string(),
                title: None,
                length: None,
            });
        }

        for (i, format) in book.formats.iter().enumerate() {
            let rel = if i == 0 {
                REL_OPEN_ACCESS
            } else {
                REL_ACQUISITION
            };
            links.push(Link {
                rel: rel.to_string(),
                href: format!("{}/download/{}/{}", base_url, book.id, format.format),
                link_type: formats::mime_type(&format.format).to_string(),
                title: Some(format!("Download {}", format.format)),
                length: Some(format.size),
            });
        }

        self.entries.push(Entry {
            id: format!("urn:uuid:{}", book.uuid),
            title: book.title.clone(),
            updated: Some(book.last_modified),
            authors: book.authors.iter().map(|a| a.name.clone()).collect(),
            summary: book.comments.clone(),
            links,
        });
        self
    }

    /// Serialize the feed to XML.
    pub fn build(self) -> Result<String> {
        self.write().map_err(|e| AppError::Assembly(e.to_string()))
    }

    fn write(self) -> std::io::Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut feed = BytesStart::new("feed");
        feed.push_attribute(("xmlns", "http://www.w3.org/2005/Atom"));
        feed.push_attribute(("xmlns:opds", "http://opds-spec.org/2010/catalog"));
        writer.write_event(Event::Start(feed))?;

        write_text_element(&mut writer, "id", &self.id)?;
        write_text_element(&mut writer, "title", &self.title)?;
        write_text_element(&mut writer, "updated", &self.updated.to_rfc3339())?;

        // Zero-valued totalResults/itemsPerPage are omitted; startIndex is
        // always present so clients can tell an empty page from no counters.
        if let Some(counters) = self.counters {
            if counters.total_results > 0 {
                write_text_element(
                    &mut writer,
                    "opds:totalResults",
                    &counters.total_results.to_string(),
                )?;
            }
            write_text_element(
                &mut writer,
                "opds:startIndex",
                &counters.start_index.to_string(),
            )?;
            if counters.items_per_page > 0 {
                write_text_element(
                    &mut writer,
                    "opds:itemsPerPage",
                    &counters.items_per_page.to_string(),
                )?;
            }
        }

        for link in &self.links {
            write_link(&mut writer, link)?;
        }

        for entry in &self.entries {
            write_entry(&mut writer, entry)?;
        }

        writer.write_event(Event::End(BytesEnd::new("feed")))?;

        String::from_utf8(writer.into_inner().into_inner()).map_err(std::io::Error::other)
    }
}

/// Deterministic URN identifier derived from a stable seed string.
fn urn_from(seed: &str) -> String {
    format!(
        "urn:uuid:{}",
        Uuid::new_v5(&Uuid::NAMESPACE_URL, seed.as_bytes())
    )
}

fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> std::io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_link<W: std::io::Write>(writer: &mut Writer<W>, link: &Link) -> std::io::Result<()> {
    let mut elem = BytesStart::new("link");
    elem.push_attribute(("rel", link.rel.as_str()));
    elem.push_attribute(("href", link.href.as_str()));
    elem.push_attribute(("type", link.link_type.as_str()));
    if let Some(title) = &link.title {
        elem.push_attribute(("title", title.as_str()));
    }
    if let Some(length) = link.length {
        elem.push_attribute(("length", length.to_string().as_str()));
    }
    writer.write_event(Event::Empty(elem))
}

fn write_entry<W: std::io::Write>(writer: &mut Writer<W>, entry: &Entry) -> std::io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new("entry")))?;

    write_text_element(writer, "id", &entry.id)?;
    write_text_element(writer, "title", &entry.title)?;

    if let Some(updated) = &entry.updated {
        write_text_element(writer, "updated", &updated.to_rfc3339())?;
    }

    for author in &entry.authors {
        writer.write_event(Event::Start(BytesStart::new("author")))?;
        write_text_element(writer, "name", author)?;
        writer.write_event(Event::End(BytesEnd::new("author")))?;
    }

    if let Some(summary) = &entry.summary {
        let mut elem = BytesStart::new("summary");
        elem.push_attribute(("type", "text"));
        writer.write_event(Event::Start(elem))?;
        writer.write_event(Event::Text(BytesText::new(summary)))?;
        writer.write_event(Event::End(BytesEnd::new("summary")))?;
    }

    for link in &entry.links {
        write_link(writer, link)?;
    }

    writer.write_event(Event::End(BytesEnd::new("entry")))
}
