//! Fixed lookup tables for Calibre format codes.
//!
//! Calibre stores format codes as uppercase strings in the `data` table.
//! Both tables here are shared by the feed assembler (acquisition link
//! types) and the download handler (content types, filename extensions).

/// MIME type for a Calibre format code. Unknown codes fall back to
/// `application/octet-stream`.
pub fn mime_type(format: &str) -> &'static str {
    match format.to_ascii_uppercase().as_str() {
        "EPUB" => "application/epub+zip",
        "PDF" => "application/pdf",
        "MOBI" => "application/x-mobipocket-ebook",
        "AZW3" => "application/vnd.amazon.ebook",
        "FB2" => "application/x-fictionbook+xml",
        "RTF" => "application/rtf",
        "TXT" => "text/plain",
        "HTML" => "text/html",
        "LIT" => "application/x-ms-reader",
        _ => "application/octet-stream",
    }
}

/// File extension (with leading dot) for a Calibre format code.
pub fn file_extension(format: &str) -> Option<&'static str> {
    match format.to_ascii_uppercase().as_str() {
        "EPUB" => Some(".epub"),
        "PDF" => Some(".pdf"),
        "MOBI" => Some(".mobi"),
        "AZW3" => Some(".azw3"),
        "FB2" => Some(".fb2"),
        "RTF" => Some(".rtf"),
        "TXT" => Some(".txt"),
        "HTML" => Some(".html"),
        "LIT" => Some(".lit"),
        _ => None,
    }
}
