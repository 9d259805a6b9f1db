//! Run summaries and best-effort opening of result files.

use std::fmt::Write as _;
use std::path::Path;
use std::process::Command;

use docgrab_core::SearchReport;

/// Open a file with the platform's default handler. Failures are logged
/// and swallowed; viewing results must never fail the run.
pub fn open_file(path: &Path) {
    #[cfg(target_os = "windows")]
    let mut cmd = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]).arg(path);
        c
    };
    #[cfg(target_os = "macos")]
    let mut cmd = {
        let mut c = Command::new("open");
        c.arg(path);
        c
    };
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let mut cmd = {
        let mut c = Command::new("xdg-open");
        c.arg(path);
        c
    };
    if let Err(e) = cmd.spawn() {
        log::debug!("could not open {}: {e}", path.display());
    }
}

/// Open the first `limit` matched files.
pub fn open_matches(report: &SearchReport, limit: usize) {
    for doc in report.matched.iter().take(limit) {
        open_file(&doc.output_path);
    }
    if report.matched.len() > limit {
        log::info!(
            "opened {limit} of {} matched files; the rest are in {}",
            report.matched.len(),
            report.output_dir.display()
        );
    }
}

/// Human-readable search summary, one line per matched file.
pub fn render(report: &SearchReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "scanned {} file(s), {} hit(s) in {} file(s)",
        report.files_scanned,
        report.total_hits,
        report.matched.len()
    );
    for doc in &report.matched {
        let pages: Vec<String> = doc.pages.iter().map(u32::to_string).collect();
        let _ = writeln!(
            out,
            "  {}: {} hit(s) on page(s) {}",
            doc.output_path.display(),
            doc.hit_count,
            pages.join(", ")
        );
    }
    if report.matched.is_empty() {
        let _ = writeln!(out, "  no matches");
    } else {
        let _ = writeln!(out, "results in {}", report.output_dir.display());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgrab_core::MatchedDocument;
    use std::path::PathBuf;

    fn report() -> SearchReport {
        SearchReport {
            files_scanned: 3,
            total_hits: 5,
            matched: vec![
                MatchedDocument {
                    output_path: PathBuf::from("out/a.pdf"),
                    hit_count: 4,
                    pages: vec![1, 3],
                },
                MatchedDocument {
                    output_path: PathBuf::from("out/b.pdf"),
                    hit_count: 1,
                    pages: vec![2],
                },
            ],
            output_dir: PathBuf::from("out"),
        }
    }

    #[test]
    fn render_lists_each_match() {
        let text = render(&report());
        assert!(text.contains("scanned 3 file(s), 5 hit(s) in 2 file(s)"));
        assert!(text.contains("a.pdf: 4 hit(s) on page(s) 1, 3"));
        assert!(text.contains("b.pdf: 1 hit(s) on page(s) 2"));
    }

    #[test]
    fn render_handles_empty_result() {
        let empty = SearchReport {
            files_scanned: 2,
            total_hits: 0,
            matched: vec![],
            output_dir: PathBuf::from("out"),
        };
        let text = render(&empty);
        assert!(text.contains("no matches"));
    }
}
