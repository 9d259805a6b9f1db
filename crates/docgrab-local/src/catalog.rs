//! Table classification and row extraction for catalog pages.
//!
//! Third-party catalog markup is uncontrolled: header cells may be `td`
//! instead of `th`, the header row may be missing entirely, decorative
//! layout tables may precede the real one. The classifier therefore runs an
//! ordered strategy chain per table — header-marker match first, then a
//! link-density heuristic — and takes the first table that yields a column.

use docgrab_core::naming::{collapse_ws, is_pdf_href, normalize_text, sanitize_document_name};
use docgrab_core::{DocumentRef, Error, Result};
use scraper::{ElementRef, Html, Selector};

/// Cell text equal to this marks a row-number header cell, not a data row.
const ROW_NUMBER_MARKER: &str = "№";

struct Sel {
    table: Selector,
    thead: Selector,
    tr: Selector,
    cell: Selector,
    th: Selector,
    link: Selector,
}

impl Sel {
    fn new() -> Option<Self> {
        Some(Self {
            table: Selector::parse("table").ok()?,
            thead: Selector::parse("thead").ok()?,
            tr: Selector::parse("tr").ok()?,
            cell: Selector::parse("th, td").ok()?,
            th: Selector::parse("th").ok()?,
            link: Selector::parse("a[href]").ok()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    markers: Vec<String>,
    only_pdf: bool,
}

impl Classifier {
    pub fn new(markers: Vec<String>, only_pdf: bool) -> Self {
        Self { markers, only_pdf }
    }

    /// Parse the page, pick the first table with a recognizable designation
    /// column, and extract its document rows.
    ///
    /// Later tables are never inspected once one qualifies; pages are
    /// assumed to carry at most one relevant table, and stopping early
    /// avoids false positives on decorative ones.
    pub fn extract(&self, html: &str) -> Result<Vec<DocumentRef>> {
        let sel = Sel::new().ok_or_else(|| Error::Html("selector parse failed".to_string()))?;
        let doc = Html::parse_document(html);
        let tables: Vec<ElementRef> = doc.select(&sel.table).collect();
        log::info!("tables found on page: {}", tables.len());

        for (i, table) in tables.iter().enumerate() {
            if let Some(col) = self.designation_column(*table, &sel) {
                log::info!("selected table #{}, designation column index {col}", i + 1);
                let rows = self.extract_rows(*table, col, &sel);
                if rows.is_empty() {
                    return Err(Error::NoRows);
                }
                return Ok(rows);
            }
        }
        Err(Error::NoTable)
    }

    /// Find the designation column index for one table, if any.
    fn designation_column(&self, table: ElementRef<'_>, sel: &Sel) -> Option<usize> {
        let rows: Vec<ElementRef> = table.select(&sel.tr).collect();

        // Highest-confidence signal: a header cell naming the column.
        if let Some(header) = header_row(table, &rows, sel) {
            for (idx, cell) in header.select(&sel.cell).enumerate() {
                let text = normalize_text(&cell_text(cell));
                if self.markers.iter().any(|m| text.contains(m.as_str())) {
                    return Some(idx);
                }
            }
        }

        // Fallback: the column with the most linked data cells. The first
        // row is treated as the header and excluded from counting.
        let max_cols = rows
            .iter()
            .map(|r| r.select(&sel.cell).count())
            .max()
            .unwrap_or(0);
        let mut counts = vec![0usize; max_cols];
        for row in rows.iter().skip(1) {
            for (col, cell) in row.select(&sel.cell).enumerate() {
                if cell.select(&sel.link).next().is_some() {
                    counts[col] += 1;
                }
            }
        }
        let mut best: Option<(usize, usize)> = None;
        for (idx, &count) in counts.iter().enumerate() {
            if count > 0 && best.map_or(true, |(_, c)| count > c) {
                best = Some((idx, count));
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Walk every row (header included — rows are filtered by content, not
    /// position, because header/data markup is unreliable) and produce one
    /// `DocumentRef` per usable row.
    fn extract_rows(&self, table: ElementRef<'_>, col: usize, sel: &Sel) -> Vec<DocumentRef> {
        let mut out = Vec::new();
        for row in table.select(&sel.tr) {
            let cells: Vec<ElementRef> = row.select(&sel.cell).collect();
            if cells.len() <= col {
                continue;
            }
            let cell = cells[col];
            let raw = cell_text(cell);
            let normalized = normalize_text(&raw);
            if normalized.is_empty()
                || normalized == ROW_NUMBER_MARKER
                || self.markers.iter().any(|m| normalized.contains(m.as_str()))
            {
                continue;
            }
            let Some(href) = pick_link(cell, sel) else {
                continue;
            };
            if self.only_pdf && !is_pdf_href(&href) {
                continue;
            }
            out.push(DocumentRef {
                designation: sanitize_document_name(&raw),
                href,
            });
        }
        out
    }
}

/// Header row preference: first `thead` row, else the first row containing a
/// `th`, else the first row at all. The fallback may be a data row; that is
/// harmless because header matching only ever *adds* a signal.
fn header_row<'a>(
    table: ElementRef<'a>,
    rows: &[ElementRef<'a>],
    sel: &Sel,
) -> Option<ElementRef<'a>> {
    if let Some(thead) = table.select(&sel.thead).next() {
        if let Some(tr) = thead.select(&sel.tr).next() {
            return Some(tr);
        }
    }
    rows.iter()
        .copied()
        .find(|r| r.select(&sel.th).next().is_some())
        .or_else(|| rows.first().copied())
}

/// Cell text with a single-space separator, entity-decoded by the parser,
/// whitespace-collapsed but case-preserving.
fn cell_text(cell: ElementRef<'_>) -> String {
    collapse_ws(&cell.text().collect::<Vec<_>>().join(" "))
}

/// Select the cell's hyperlink: the first PDF-looking target wins, else the
/// first hyperlink of any kind.
fn pick_link(cell: ElementRef<'_>, sel: &Sel) -> Option<String> {
    let mut first: Option<String> = None;
    for a in cell.select(&sel.link) {
        let href = a.value().attr("href")?.trim();
        if href.is_empty() {
            continue;
        }
        if is_pdf_href(href) {
            return Some(href.to_string());
        }
        if first.is_none() {
            first = Some(href.to_string());
        }
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(vec!["обозн".to_string()], true)
    }

    #[test]
    fn header_marker_selects_column() {
        let html = r#"
        <table>
          <tr><th>№</th><th>Обозначение</th><th>Файл</th></tr>
          <tr><td>1</td><td><a href="files/abc.pdf">ABC-123</a></td><td>x</td></tr>
        </table>
        "#;
        let rows = classifier().extract(html).unwrap();
        assert_eq!(
            rows,
            vec![DocumentRef {
                designation: "ABC-123".to_string(),
                href: "files/abc.pdf".to_string(),
            }]
        );
    }

    #[test]
    fn header_marker_found_via_thead() {
        let html = r#"
        <table>
          <thead><tr><td>№</td><td>Обозн.</td></tr></thead>
          <tbody><tr><td>1</td><td><a href="a.pdf">GOST 1</a></td></tr></tbody>
        </table>
        "#;
        let rows = classifier().extract(html).unwrap();
        assert_eq!(rows[0].designation, "GOST 1");
    }

    #[test]
    fn header_matching_tolerates_nbsp_and_case() {
        let html = r#"
        <table>
          <tr><td>№</td><td>ОБОЗН\u{00A0}АЧЕНИЕ</td></tr>
          <tr><td>1</td><td><a href="a.pdf">D-1</a></td></tr>
        </table>
        "#;
        // Literal escape above is not interpreted by HTML; use a real NBSP.
        let html = html.replace("\\u{00A0}", "\u{00A0}");
        // NBSP folds to a plain space during matching, so the marker prefix
        // still hits even though the header word is split.
        let rows = classifier().extract(&html).unwrap();
        assert_eq!(rows[0].designation, "D-1");
    }

    #[test]
    fn link_density_fallback_picks_strict_maximum() {
        let html = r#"
        <table>
          <tr><td>Num</td><td>Name</td><td>Doc</td></tr>
          <tr><td>1</td><td>alpha</td><td><a href="a.pdf">a</a></td></tr>
          <tr><td>2</td><td><a href="x.html">beta</a></td><td><a href="b.pdf">b</a></td></tr>
          <tr><td>3</td><td>gamma</td><td><a href="c.pdf">c</a></td></tr>
        </table>
        "#;
        let rows = Classifier::new(vec!["designation".to_string()], true)
            .extract(html)
            .unwrap();
        // Column 2 has three links vs one in column 1.
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].href, "a.pdf");
    }

    #[test]
    fn link_density_tie_breaks_to_lowest_index() {
        let html = r#"
        <table>
          <tr><td>h1</td><td>h2</td></tr>
          <tr><td><a href="l1.pdf">L1</a></td><td><a href="r1.pdf">R1</a></td></tr>
          <tr><td><a href="l2.pdf">L2</a></td><td><a href="r2.pdf">R2</a></td></tr>
        </table>
        "#;
        let rows = Classifier::new(vec!["nope".to_string()], true)
            .extract(html)
            .unwrap();
        assert_eq!(rows[0].designation, "L1");
        assert_eq!(rows[1].designation, "L2");
    }

    #[test]
    fn first_qualifying_table_wins() {
        let html = r#"
        <table><tr><td>just text, no links</td></tr></table>
        <table>
          <tr><th>Обозначение</th></tr>
          <tr><td><a href="winner.pdf">W-1</a></td></tr>
        </table>
        <table>
          <tr><th>Обозначение</th></tr>
          <tr><td><a href="loser.pdf">L-1</a></td></tr>
        </table>
        "#;
        let rows = classifier().extract(html).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].href, "winner.pdf");
    }

    #[test]
    fn linkless_tables_yield_no_table_error() {
        let html = "<table><tr><td>a</td><td>b</td></tr></table>";
        assert!(matches!(classifier().extract(html), Err(Error::NoTable)));
    }

    #[test]
    fn table_with_column_but_no_usable_rows_is_no_rows() {
        let html = r#"
        <table>
          <tr><th>Обозначение</th></tr>
          <tr><td>no link here</td></tr>
        </table>
        "#;
        assert!(matches!(classifier().extract(html), Err(Error::NoRows)));
    }

    #[test]
    fn header_and_row_number_rows_are_skipped_by_content() {
        // Header cells are td with a link-bearing layout; they must still be
        // skipped because their text is a marker / row-number symbol.
        let html = r#"
        <table>
          <tr><td>№</td><td>Обозначение</td></tr>
          <tr><td>1</td><td><a href="a.pdf">A-1</a></td></tr>
          <tr><td>2</td><td></td></tr>
        </table>
        "#;
        let rows = classifier().extract(html).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].designation, "A-1");
    }

    #[test]
    fn pdf_link_preferred_within_cell() {
        let html = r#"
        <table>
          <tr><th>Обозначение</th></tr>
          <tr><td><a href="preview.html">A</a> <a href="real.pdf">A</a></td></tr>
        </table>
        "#;
        let rows = classifier().extract(html).unwrap();
        assert_eq!(rows[0].href, "real.pdf");
    }

    #[test]
    fn only_pdf_filter_drops_non_pdf_rows() {
        let html = r#"
        <table>
          <tr><th>Обозначение</th></tr>
          <tr><td><a href="a.zip">Z-1</a></td></tr>
          <tr><td><a href="b.pdf">P-1</a></td></tr>
        </table>
        "#;
        let rows = classifier().extract(html).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].designation, "P-1");

        let all = Classifier::new(vec!["обозн".to_string()], false)
            .extract(html)
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn designation_preserves_case_and_entities() {
        let html = r#"
        <table>
          <tr><th>Обозначение</th></tr>
          <tr><td><a href="a.pdf">ГОСТ&nbsp;12.1.044&#8211;89 &quot;X&quot;</a></td></tr>
        </table>
        "#;
        let rows = classifier().extract(html).unwrap();
        assert_eq!(rows[0].designation, "ГОСТ 12.1.044–89 _X_");
    }

    #[test]
    fn short_rows_are_skipped() {
        let html = r#"
        <table>
          <tr><th>№</th><th>Обозначение</th></tr>
          <tr><td>spanning cell</td></tr>
          <tr><td>1</td><td><a href="ok.pdf">OK-1</a></td></tr>
        </table>
        "#;
        let rows = classifier().extract(html).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].designation, "OK-1");
    }
}
