//! Local pipelines: catalog scraping with file download, and corpus
//! search with highlight annotation.

pub mod catalog;
pub mod corpus;
pub mod download;
pub mod fetch;
pub mod pdf;
pub mod report;

use std::fs;
use std::time::Duration;

use docgrab_core::naming::{sanitize_query_name, DOCUMENT_PLACEHOLDER};
use docgrab_core::{
    DownloadConfig, DownloadSummary, Error, MatchedDocument, Result, SearchConfig, SearchReport,
};

use catalog::Classifier;
use fetch::HttpClient;

/// Fetch the catalog page, extract its document rows, and download each
/// row's file into a date-named directory.
///
/// Individual download failures are tallied, not fatal; the run only
/// errors when the page itself cannot be fetched or classified.
pub fn run_download(cfg: &DownloadConfig) -> Result<DownloadSummary> {
    let client = HttpClient::new(
        cfg.verify_tls,
        cfg.max_retries,
        Duration::from_secs(cfg.connect_timeout_s),
        Duration::from_secs(cfg.read_timeout_s),
    )?;
    log::info!("fetching catalog page {}", cfg.url);
    let resp = client.get(&cfg.url)?;
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = resp
        .bytes()
        .map_err(|e| Error::Fetch(format!("{}: {e}", cfg.url)))?;
    let html = fetch::decode_html(&body, content_type.as_deref());

    let rows = Classifier::new(cfg.designation_markers.clone(), cfg.only_pdf).extract(&html)?;
    log::info!("{} document row(s) extracted", rows.len());

    let dir = download::dated_dir(&cfg.out_root)?;
    let mut succeeded = 0usize;
    let mut failed = 0usize;
    for row in &rows {
        let url = match download::resolve_url(&cfg.url, &row.href) {
            Ok(u) => u,
            Err(e) => {
                log::warn!("{}: {e}", row.designation);
                failed += 1;
                continue;
            }
        };
        // Rows whose visible text sanitized away entirely fall back to the
        // URL's file name.
        let stem = if row.designation == DOCUMENT_PLACEHOLDER {
            download::stem_from_url(&url).unwrap_or_else(|| row.designation.clone())
        } else {
            row.designation.clone()
        };
        match download::fetch_to_dir(&client, &url, &dir, &stem) {
            Ok(path) => {
                log::info!("saved {}", path.display());
                succeeded += 1;
            }
            Err(e) => {
                log::warn!("{}: {e}", row.designation);
                failed += 1;
            }
        }
    }
    Ok(DownloadSummary {
        succeeded,
        failed,
        dir,
    })
}

/// Scan a PDF corpus for a query and write highlighted copies of every
/// matching file into a fresh timestamped output directory.
///
/// One unreadable or malformed PDF is logged and skipped; it never aborts
/// the scan of the rest of the corpus.
pub fn run_search(cfg: &SearchConfig) -> Result<SearchReport> {
    let query = cfg.query.trim();
    if query.is_empty() {
        return Err(Error::EmptyQuery);
    }
    let files = corpus::scan(&cfg.docs_dir)?;
    if files.is_empty() {
        return Err(Error::NoPdfs(cfg.docs_dir.clone()));
    }
    log::info!("scanning {} file(s) for \"{query}\"", files.len());

    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let output_dir = cfg
        .out_root
        .join(format!("{stamp}__{}", sanitize_query_name(query)));
    fs::create_dir_all(&output_dir)?;

    let mut matched = Vec::new();
    let mut total_hits = 0usize;
    for file in &files {
        match pdf::highlight_file(file, query, &output_dir, cfg.highlight_color) {
            Ok(Some((output_path, m))) => {
                log::info!(
                    "{}: {} hit(s) on {} page(s)",
                    file.display(),
                    m.hits,
                    m.pages.len()
                );
                total_hits += m.hits;
                matched.push(MatchedDocument {
                    output_path,
                    hit_count: m.hits,
                    pages: m.pages,
                });
            }
            Ok(None) => log::debug!("{}: no match", file.display()),
            Err(e) => log::warn!("{}: skipped: {e}", file.display()),
        }
    }

    let report = SearchReport {
        files_scanned: files.len(),
        total_hits,
        matched,
        output_dir,
    };
    if cfg.auto_open {
        report::open_matches(&report, cfg.open_limit);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::serve;
    use crate::pdf::tests_support::write_fixture;
    use axum::http::header;
    use axum::routing::get;
    use axum::Router;
    use std::path::PathBuf;

    fn download_cfg(url: String, out_root: PathBuf) -> DownloadConfig {
        DownloadConfig {
            url,
            out_root,
            ..DownloadConfig::default()
        }
    }

    #[test]
    fn download_pipeline_end_to_end() {
        let catalog = r#"
        <table>
          <tr><th>№</th><th>Обозначение</th></tr>
          <tr><td>1</td><td><a href="/files/doc.pdf">ГОСТ 1-2020</a></td></tr>
          <tr><td>2</td><td><a href="/files/missing.pdf">ГОСТ 2-2020</a></td></tr>
        </table>
        "#;
        let app = Router::new()
            .route("/catalog", get(move || async move { axum::response::Html(catalog) }))
            .route(
                "/files/doc.pdf",
                get(|| async {
                    ([(header::CONTENT_TYPE, "application/pdf")], "%PDF-1.4")
                }),
            );
        let addr = serve(app);
        let out = tempfile::tempdir().unwrap();
        let cfg = download_cfg(
            format!("http://{addr}/catalog"),
            out.path().to_path_buf(),
        );
        let summary = run_download(&cfg).unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert!(summary.dir.join("ГОСТ 1-2020.pdf").is_file());
    }

    #[test]
    fn download_decodes_legacy_encoded_catalog_pages() {
        // The stock catalog serves windows-1251 without declaring a charset;
        // both the header marker and the designation text must survive.
        let catalog = r#"
        <table>
          <tr><th>№</th><th>Обозначение</th></tr>
          <tr><td>1</td><td><a href="/files/doc.pdf">ГОСТ 1-2020</a></td></tr>
        </table>
        "#;
        let (encoded, _, _) = encoding_rs::WINDOWS_1251.encode(catalog);
        let body = encoded.into_owned();
        let app = Router::new()
            .route(
                "/catalog",
                get(move || async move { ([(header::CONTENT_TYPE, "text/html")], body) }),
            )
            .route(
                "/files/doc.pdf",
                get(|| async {
                    ([(header::CONTENT_TYPE, "application/pdf")], "%PDF-1.4")
                }),
            );
        let addr = serve(app);
        let out = tempfile::tempdir().unwrap();
        let cfg = download_cfg(format!("http://{addr}/catalog"), out.path().to_path_buf());
        let summary = run_download(&cfg).unwrap();
        assert_eq!(summary.succeeded, 1);
        assert!(summary.dir.join("ГОСТ 1-2020.pdf").is_file());
    }

    #[test]
    fn download_fails_when_page_has_no_table() {
        let app = Router::new().route("/catalog", get(|| async { "<p>nothing</p>" }));
        let addr = serve(app);
        let out = tempfile::tempdir().unwrap();
        let cfg = download_cfg(format!("http://{addr}/catalog"), out.path().to_path_buf());
        assert!(matches!(run_download(&cfg), Err(Error::NoTable)));
    }

    fn search_cfg(docs_dir: PathBuf, out_root: PathBuf, query: &str) -> SearchConfig {
        SearchConfig {
            query: query.to_string(),
            docs_dir,
            out_root,
            auto_open: false,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn search_pipeline_end_to_end() {
        let docs = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_fixture(&docs.path().join("hit.pdf"), "the needle is here");
        write_fixture(&docs.path().join("miss.pdf"), "nothing to see");

        let report = run_search(&search_cfg(
            docs.path().to_path_buf(),
            out.path().to_path_buf(),
            "needle",
        ))
        .unwrap();
        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.total_hits, 1);
        assert_eq!(report.matched.len(), 1);
        assert!(report.matched[0].output_path.is_file());
        assert!(report
            .output_dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("__needle"));
        // The miss produced no copy.
        assert_eq!(std::fs::read_dir(&report.output_dir).unwrap().count(), 1);
    }

    #[test]
    fn blank_query_is_rejected_before_touching_disk() {
        let out = tempfile::tempdir().unwrap();
        let cfg = search_cfg(PathBuf::from("does-not-exist"), out.path().to_path_buf(), "  ");
        assert!(matches!(run_search(&cfg), Err(Error::EmptyQuery)));
    }

    #[test]
    fn missing_corpus_and_empty_corpus_are_distinct_errors() {
        let out = tempfile::tempdir().unwrap();
        let missing = search_cfg(
            PathBuf::from("does-not-exist"),
            out.path().to_path_buf(),
            "x",
        );
        assert!(matches!(run_search(&missing), Err(Error::MissingCorpus(_))));

        let empty = tempfile::tempdir().unwrap();
        let cfg = search_cfg(empty.path().to_path_buf(), out.path().to_path_buf(), "x");
        assert!(matches!(run_search(&cfg), Err(Error::NoPdfs(_))));
    }

    #[test]
    fn corrupt_pdf_is_skipped_not_fatal() {
        let docs = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(docs.path().join("broken.pdf"), b"not a pdf").unwrap();
        write_fixture(&docs.path().join("good.pdf"), "needle");

        let report = run_search(&search_cfg(
            docs.path().to_path_buf(),
            out.path().to_path_buf(),
            "needle",
        ))
        .unwrap();
        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.matched.len(), 1);
    }
}
