//! File download: URL resolution, output naming, atomic writes.

use std::fs;
use std::path::{Path, PathBuf};

use docgrab_core::naming::guess_extension;
use docgrab_core::{Error, Result};
use tempfile::NamedTempFile;
use url::Url;

use crate::fetch::HttpClient;

/// Resolve a row's `href` against the page it came from. Absolute targets
/// pass through untouched.
pub fn resolve_url(base: &str, href: &str) -> Result<Url> {
    if let Ok(abs) = Url::parse(href) {
        return Ok(abs);
    }
    let base = Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{base}: {e}")))?;
    base.join(href)
        .map_err(|e| Error::InvalidUrl(format!("{href}: {e}")))
}

/// Per-run output directory named after the current date, created under
/// `root`. Re-running on the same day reuses the directory; collision
/// handling happens per file.
pub fn dated_dir(root: &Path) -> Result<PathBuf> {
    let dir = root.join(chrono::Local::now().format("%d.%m.%Y").to_string());
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// First free path for `stem` + `ext` in `dir`, probing `stem (1)`,
/// `stem (2)`, ... past existing files.
pub fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let plain = dir.join(format!("{stem}{ext}"));
    if !plain.exists() {
        return plain;
    }
    let mut i = 1u32;
    loop {
        let candidate = dir.join(format!("{stem} ({i}){ext}"));
        if !candidate.exists() {
            return candidate;
        }
        i += 1;
    }
}

/// Download one document into `dir` and return the final path.
///
/// The extension comes from the response `Content-Type` when it is
/// recognizable, falling back to the URL path. The body lands in a temp
/// file in the same directory and is renamed into place, so a failed or
/// interrupted transfer never leaves a half-written file under the final
/// name.
pub fn fetch_to_dir(client: &HttpClient, url: &Url, dir: &Path, stem: &str) -> Result<PathBuf> {
    let mut resp = client.get(url.as_str())?;
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let ext = guess_extension(content_type.as_deref(), url.as_str());

    let dest = unique_path(dir, stem, &ext);
    let mut tmp = NamedTempFile::new_in(dir)?;
    resp.copy_to(tmp.as_file_mut())
        .map_err(|e| Error::Fetch(format!("{url}: {e}")))?;
    tmp.persist(&dest).map_err(|e| Error::Io(e.error))?;
    Ok(dest)
}

/// Stem for a downloaded file when the catalog row text is unusable:
/// fall back to the URL's last path segment, minus its extension.
pub fn stem_from_url(url: &Url) -> Option<String> {
    let seg = url.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let stem = match seg.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() && ext.len() <= 4 => stem,
        _ => seg,
    };
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}
