//! Text normalization, filesystem-safe naming, and link/extension
//! heuristics.
//!
//! Inputs come from uncontrolled third-party markup, so every function here
//! is total: no input panics, empty results fall back to placeholders.

use percent_encoding::percent_decode_str;

/// Length cap for document file-name stems.
pub const DOCUMENT_NAME_MAX: usize = 180;
/// Length cap for query-derived folder names.
pub const QUERY_NAME_MAX: usize = 120;

/// Stem used when a document name sanitizes away entirely.
pub const DOCUMENT_PLACEHOLDER: &str = "document";
const QUERY_PLACEHOLDER: &str = "query";

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize cell text for matching: fold no-break/invisible spaces into
/// regular ones, collapse whitespace, lowercase.
pub fn normalize_text(s: &str) -> String {
    let folded: String = s
        .chars()
        .map(|c| match c {
            '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
            other => other,
        })
        .collect();
    collapse_ws(&folded).to_lowercase()
}

fn sanitize(name: &str, max_chars: usize, placeholder: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if (c as u32) < 0x20 => '_',
            c => c,
        })
        .collect();
    let collapsed = collapse_ws(&cleaned);
    let truncated: String = collapsed.chars().take(max_chars).collect();
    let trimmed = truncated.trim_end().to_string();
    if trimmed.is_empty() {
        placeholder.to_string()
    } else {
        trimmed
    }
}

/// Sanitize a designation into a file-name stem (no extension).
///
/// HTML entities are expected to be decoded already (the parser does that);
/// this only handles filesystem safety, whitespace, and length.
pub fn sanitize_document_name(name: &str) -> String {
    sanitize(name, DOCUMENT_NAME_MAX, DOCUMENT_PLACEHOLDER)
}

/// Sanitize a search query into a folder-name component.
pub fn sanitize_query_name(name: &str) -> String {
    sanitize(name, QUERY_NAME_MAX, QUERY_PLACEHOLDER)
}

/// Split an href into (path, query), dropping any fragment.
fn split_href(href: &str) -> (&str, &str) {
    let no_frag = href.split('#').next().unwrap_or("");
    match no_frag.split_once('?') {
        Some((p, q)) => (p, q),
        None => (no_frag, ""),
    }
}

/// The path component of an href, with any `scheme://host` prefix removed.
fn href_path(href: &str) -> &str {
    let (path, _) = split_href(href);
    match path.find("://") {
        Some(i) => {
            let rest = &path[i + 3..];
            match rest.find('/') {
                Some(j) => &rest[j..],
                None => "",
            }
        }
        None => path,
    }
}

/// Does this href point at a PDF?
///
/// Checks the percent-decoded path and the raw query string (covers
/// `?file=x.pdf` style links) as well as a plain `.pdf` suffix.
pub fn is_pdf_href(href: &str) -> bool {
    let href = href.trim();
    let (path, query) = split_href(href);
    let decoded_path = percent_decode_str(path)
        .decode_utf8_lossy()
        .to_lowercase();
    decoded_path.contains(".pdf")
        || query.to_lowercase().contains(".pdf")
        || href.to_lowercase().ends_with(".pdf")
}

/// Known content-type → extension pairs. Anything else falls through to the
/// URL-derived extension or `.bin`.
fn extension_for_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "application/pdf" => Some(".pdf"),
        "text/html" => Some(".html"),
        "text/plain" => Some(".txt"),
        "text/csv" => Some(".csv"),
        "application/xml" | "text/xml" => Some(".xml"),
        "application/json" => Some(".json"),
        "application/zip" => Some(".zip"),
        "application/msword" => Some(".doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some(".docx"),
        "application/vnd.ms-excel" => Some(".xls"),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => Some(".xlsx"),
        "image/jpeg" => Some(".jpg"),
        "image/png" => Some(".png"),
        "image/gif" => Some(".gif"),
        "image/tiff" => Some(".tif"),
        _ => None,
    }
}

/// Extension implied by the href's path, if any (`.pdf`, `.zip`, ...).
fn extension_from_path(href: &str) -> Option<String> {
    let path = href_path(href);
    let segment = path.rsplit('/').next().unwrap_or("");
    let dot = segment.rfind('.')?;
    let ext = &segment[dot + 1..];
    if ext.is_empty() || dot == 0 {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}

/// Decide the true extension for a downloaded body.
///
/// The response's declared content type is ground truth; the URL is a
/// fallback. PDF-looking URLs short-circuit so that a misconfigured server
/// serving `text/html` error pages cannot rename an obvious datasheet.
pub fn guess_extension(content_type: Option<&str>, url: &str) -> String {
    if is_pdf_href(url) {
        return ".pdf".to_string();
    }
    if let Some(ct) = content_type {
        let ct = ct.split(';').next().unwrap_or("").trim().to_lowercase();
        if ct == "application/pdf" {
            return ".pdf".to_string();
        }
        if let Some(ext) = extension_for_mime(&ct) {
            return ext.to_string();
        }
    }
    extension_from_path(url).unwrap_or_else(|| ".bin".to_string())
}
