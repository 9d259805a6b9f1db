//! Query matching against positioned page text.
//!
//! Characters are regrouped into baseline lines, the line text is matched
//! against a small set of case variants of the query, and every match is
//! mapped back to a bounding rectangle over its source glyphs.

use docgrab_core::geom::{dedup_rects, Rect};

use super::text::PageChar;

/// Baselines closer than this fraction of the font size share a line.
const BASELINE_TOLERANCE: f64 = 0.5;
/// Horizontal gaps wider than this fraction of the font size read as a
/// word break even when no space glyph was emitted.
const GAP_AS_SPACE: f64 = 0.25;

/// Case variants tried in order: verbatim, lowercase, uppercase, and
/// first-letter capitalized. This approximates case-insensitive search
/// without a per-character fold; mixed-case text that matches none of the
/// variants is missed, which is accepted.
pub fn case_variants(query: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |s: String| {
        if !s.is_empty() && !out.contains(&s) {
            out.push(s);
        }
    };
    push(query.to_string());
    push(query.to_lowercase());
    push(query.to_uppercase());
    let mut cap = String::new();
    let mut chars = query.chars();
    if let Some(first) = chars.next() {
        cap.extend(first.to_uppercase());
        cap.push_str(&chars.as_str().to_lowercase());
    }
    push(cap);
    out
}

/// A line of text with a per-character map back to the glyphs that own it.
/// Inferred spaces have no owner.
struct Line {
    text: String,
    /// One entry per `char` of `text`.
    owners: Vec<Option<usize>>,
}

fn assemble_lines(chars: &[PageChar]) -> Vec<Line> {
    // Group by baseline, tolerant of tiny jitter between show operations.
    let mut groups: Vec<(f64, Vec<usize>)> = Vec::new();
    for (i, c) in chars.iter().enumerate() {
        let tolerance = c.size.max(1.0) * BASELINE_TOLERANCE;
        match groups
            .iter_mut()
            .find(|(base, _)| (c.baseline - *base).abs() <= tolerance)
        {
            Some((_, members)) => members.push(i),
            None => groups.push((c.baseline, vec![i])),
        }
    }
    // Top of page first; PDF y grows upward.
    groups.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut lines = Vec::new();
    for (_, mut members) in groups {
        members.sort_by(|&a, &b| chars[a].x0.total_cmp(&chars[b].x0));
        let mut text = String::new();
        let mut owners = Vec::new();
        let mut prev: Option<usize> = None;
        for idx in members {
            let c = &chars[idx];
            if let Some(p) = prev {
                let gap = c.x0 - chars[p].x1;
                if gap > chars[p].size.max(1.0) * GAP_AS_SPACE && c.ch != ' ' {
                    text.push(' ');
                    owners.push(None);
                }
            }
            text.push(c.ch);
            owners.push(Some(idx));
            prev = Some(idx);
        }
        lines.push(Line { text, owners });
    }
    lines
}

/// Bounding rectangle over the glyphs of one match. The height spans from
/// the baseline to the cap of the tallest glyph involved.
fn match_rect(chars: &[PageChar], owners: &[Option<usize>]) -> Option<Rect> {
    let mut rect: Option<Rect> = None;
    for idx in owners.iter().flatten() {
        let c = &chars[*idx];
        let glyph = Rect::new(c.x0, c.baseline, c.x1, c.baseline + c.size);
        rect = Some(match rect {
            Some(r) => r.union(&glyph),
            None => glyph,
        });
    }
    rect
}

/// Find every occurrence of any case variant of `query` in the page's
/// text, deduplicated by rounded coordinates.
pub fn find_matches(chars: &[PageChar], query: &str) -> Vec<Rect> {
    let variants = case_variants(query);
    if variants.is_empty() {
        return Vec::new();
    }
    let mut rects = Vec::new();
    for line in assemble_lines(chars) {
        // Byte offset of each char of line.text, for match_indices mapping.
        let char_starts: Vec<usize> = line.text.char_indices().map(|(b, _)| b).collect();
        for variant in &variants {
            for (byte_start, matched) in line.text.match_indices(variant.as_str()) {
                let byte_end = byte_start + matched.len();
                let lo = char_starts.partition_point(|&b| b < byte_start);
                let hi = char_starts.partition_point(|&b| b < byte_end);
                if let Some(rect) = match_rect(chars, &line.owners[lo..hi]) {
                    rects.push(rect);
                }
            }
        }
    }
    dedup_rects(rects)
}
