//! Shared types for the docgrab pipelines: the error taxonomy, run
//! configuration, and the data model passed between the catalog, download,
//! and search stages.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod geom;
pub mod naming;

pub use geom::Rect;

/// Catalog page the tool was originally written against.
pub const DEFAULT_CATALOG_URL: &str = "https://new-shop.ksm.kz/egfntd/ntdgo/kds/4.php";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("html error: {0}")]
    Html(String),
    #[error("no table with a designation column found")]
    NoTable,
    #[error("no document rows found in the selected table")]
    NoRows,
    #[error("empty search query")]
    EmptyQuery,
    #[error("documents directory not found: {}", .0.display())]
    MissingCorpus(PathBuf),
    #[error("no PDF files found under: {}", .0.display())]
    NoPdfs(PathBuf),
    #[error("pdf error: {0}")]
    Pdf(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration for the catalog download pipeline.
///
/// Defaults reproduce the tool's stock behavior: PDF-only rows, TLS
/// verification on, three retries, dated folders under `downloads/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Catalog page to scrape.
    pub url: String,
    /// Root under which a `DD.MM.YYYY` folder is created per run.
    pub out_root: PathBuf,
    /// Drop rows whose selected hyperlink does not look like a PDF.
    pub only_pdf: bool,
    /// Verify TLS certificates.
    pub verify_tls: bool,
    /// Retry budget for rate-limit/server-error responses.
    pub max_retries: u32,
    pub connect_timeout_s: u64,
    pub read_timeout_s: u64,
    /// Substrings (normalized form) that identify the designation column
    /// header. The stock marker covers "обозначение", "обозн." and "обозн".
    pub designation_markers: Vec<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CATALOG_URL.to_string(),
            out_root: PathBuf::from("downloads"),
            only_pdf: true,
            verify_tls: true,
            max_retries: 3,
            connect_timeout_s: 10,
            read_timeout_s: 30,
            designation_markers: vec!["обозн".to_string()],
        }
    }
}

/// Configuration for the corpus search pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub query: String,
    /// Directory scanned recursively for PDFs.
    pub docs_dir: PathBuf,
    /// Root under which a `<timestamp>__<query>` folder is created per run.
    pub out_root: PathBuf,
    /// Highlight color, RGB components in 0..=1.
    pub highlight_color: [f32; 3],
    /// Open matched output files after the run.
    pub auto_open: bool,
    /// Hard cap on how many files auto-open may launch.
    pub open_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            query: String::new(),
            docs_dir: PathBuf::from("downloads"),
            out_root: PathBuf::from("search_output"),
            highlight_color: [1.0, 1.0, 0.0],
            auto_open: true,
            open_limit: 10,
        }
    }
}

/// One extracted catalog row: a sanitized file-name stem plus the raw href
/// exactly as it appeared in the cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub designation: String,
    pub href: String,
}

/// One text match on one page, before/after rectangle dedup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// 1-based page number.
    pub page: u32,
    pub rect: Rect,
}

/// A document that produced at least one hit and was written out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedDocument {
    pub output_path: PathBuf,
    pub hit_count: usize,
    /// 1-based page numbers, strictly ascending.
    pub pages: Vec<u32>,
}

/// Final tally of a download run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub dir: PathBuf,
}

/// Final tally of a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub files_scanned: usize,
    pub total_hits: usize,
    pub matched: Vec<MatchedDocument>,
    pub output_dir: PathBuf,
}
