//! Corpus discovery: find the PDFs to scan under a root directory.

use std::path::{Path, PathBuf};

use docgrab_core::{Error, Result};
use walkdir::WalkDir;

/// Recursively collect PDF files under `root`, matched by a
/// case-insensitive `.pdf` extension, in a stable name-sorted order.
///
/// A missing root is an error; an existing but PDF-free tree is not —
/// callers decide whether an empty corpus is fatal. Unreadable entries are
/// logged and skipped so one bad subdirectory cannot sink a scan.
pub fn scan(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::MissingCorpus(root.to_path_buf()));
    }
    let mut out = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("skipping unreadable entry under {}: {e}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let is_pdf = entry
            .path()
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            out.push(entry.into_path());
        }
    }
    Ok(out)
}
