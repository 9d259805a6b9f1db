//! PDF document handling: open, search, annotate, save.

pub mod search;
pub mod text;

use std::path::{Path, PathBuf};

use docgrab_core::geom::Rect;
use docgrab_core::{Error, Result, SearchHit};
use lopdf::{dictionary, Document, Object, ObjectId};

/// Hits found in one file, page numbers 1-based and sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMatches {
    pub hits: usize,
    pub pages: Vec<u32>,
}

pub struct PdfFile {
    doc: Document,
    /// 1-based page number to page object id, in document order.
    pages: Vec<(u32, ObjectId)>,
}

impl PdfFile {
    pub fn open(path: &Path) -> Result<Self> {
        let doc = Document::load(path)
            .map_err(|e| Error::Pdf(format!("{}: {e}", path.display())))?;
        let pages = doc.get_pages().into_iter().collect();
        Ok(Self { doc, pages })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Search every page for `query`, returning deduplicated hit rects.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let mut hits = Vec::new();
        for &(number, page_id) in &self.pages {
            let chars = text::page_chars(&self.doc, page_id)?;
            for rect in search::find_matches(&chars, query) {
                hits.push(SearchHit { page: number, rect });
            }
        }
        Ok(hits)
    }

    /// Add a highlight annotation over `rect` on the given 1-based page and
    /// return the annotation's object id.
    pub fn add_highlight(&mut self, page: u32, rect: &Rect) -> Result<ObjectId> {
        let page_id = self
            .pages
            .iter()
            .find(|(n, _)| *n == page)
            .map(|(_, id)| *id)
            .ok_or_else(|| Error::Pdf(format!("no page {page}")))?;

        let annot_id = self.doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Highlight",
            "Rect" => rect_array(rect),
            // Quad order is upper-left, upper-right, lower-left, lower-right.
            "QuadPoints" => vec![
                real(rect.x0), real(rect.y1),
                real(rect.x1), real(rect.y1),
                real(rect.x0), real(rect.y0),
                real(rect.x1), real(rect.y0),
            ],
            "F" => 4,
        });

        // /Annots may be absent, inline, or an indirect reference.
        let annots_ref = {
            let page_dict = self
                .doc
                .get_object(page_id)
                .and_then(|o| o.as_dict())
                .map_err(|e| Error::Pdf(format!("page {page}: {e}")))?;
            match page_dict.get(b"Annots") {
                Ok(Object::Reference(id)) => Some(*id),
                _ => None,
            }
        };
        if let Some(id) = annots_ref {
            let arr = self
                .doc
                .get_object_mut(id)
                .and_then(|o| o.as_array_mut())
                .map_err(|e| Error::Pdf(format!("page {page} /Annots: {e}")))?;
            arr.push(Object::Reference(annot_id));
        } else {
            let page_dict = self
                .doc
                .get_object_mut(page_id)
                .and_then(|o| o.as_dict_mut())
                .map_err(|e| Error::Pdf(format!("page {page}: {e}")))?;
            match page_dict.get_mut(b"Annots") {
                Ok(Object::Array(arr)) => arr.push(Object::Reference(annot_id)),
                _ => page_dict.set("Annots", vec![Object::Reference(annot_id)]),
            }
        }
        Ok(annot_id)
    }

    /// Color an existing highlight. Kept separate from creation so a bad
    /// color configuration degrades to an uncolored highlight instead of
    /// losing the annotation.
    pub fn set_highlight_color(&mut self, annot: ObjectId, rgb: [f32; 3]) -> Result<()> {
        if rgb.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(Error::Pdf(format!("color out of range: {rgb:?}")));
        }
        let dict = self
            .doc
            .get_object_mut(annot)
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| Error::Pdf(format!("annotation: {e}")))?;
        dict.set(
            "C",
            rgb.iter().map(|&c| Object::Real(c)).collect::<Vec<_>>(),
        );
        Ok(())
    }

    /// Write the document to `path`, pruning unreachable objects and
    /// compressing streams first.
    pub fn save_compacted(&mut self, path: &Path) -> Result<()> {
        self.doc.prune_objects();
        self.doc.renumber_objects();
        self.doc.compress();
        self.doc
            .save(path)
            .map_err(|e| Error::Pdf(format!("{}: {e}", path.display())))?;
        Ok(())
    }
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn rect_array(rect: &Rect) -> Vec<Object> {
    vec![real(rect.x0), real(rect.y0), real(rect.x1), real(rect.y1)]
}

/// Search one file and, on any hit, write a highlighted copy into `out_dir`
/// under the same file name. A hitless file produces no output.
pub fn highlight_file(
    path: &Path,
    query: &str,
    out_dir: &Path,
    color: [f32; 3],
) -> Result<Option<(PathBuf, FileMatches)>> {
    let mut pdf = PdfFile::open(path)?;
    let hits = pdf.search(query)?;
    if hits.is_empty() {
        return Ok(None);
    }

    for hit in &hits {
        let annot = pdf.add_highlight(hit.page, &hit.rect)?;
        if let Err(e) = pdf.set_highlight_color(annot, color) {
            log::warn!("{}: highlight left uncolored: {e}", path.display());
        }
    }

    let mut pages: Vec<u32> = hits.iter().map(|h| h.page).collect();
    pages.sort_unstable();
    pages.dedup();

    let name = path
        .file_name()
        .ok_or_else(|| Error::Pdf(format!("{}: no file name", path.display())))?;
    let dest = out_dir.join(name);
    pdf.save_compacted(&dest)?;
    Ok(Some((
        dest,
        FileMatches {
            hits: hits.len(),
            pages,
        },
    )))
}
