//! Positioned-character extraction from PDF content streams.
//!
//! A deliberately small interpreter: it tracks the graphics and text state
//! operators that influence glyph placement (`q`/`Q`, `cm`, `BT`..`ET`,
//! `Tf`, `Td`/`TD`/`Tm`/`TL`/`T*`, `Tc`/`Tw`/`Tz`, `Tj`/`TJ`/`'`/`"`) and
//! ignores everything else. Simple fonts are decoded byte-per-glyph: WinAnsi
//! as the base map, `/Encoding` `/Differences` overrides on top, and
//! `/Widths`-driven advances. Composite (Type0) fonts have multi-byte codes
//! and are skipped rather than mis-positioned.

use docgrab_core::{Error, Result};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

const DEFAULT_GLYPH_WIDTH: f64 = 500.0;

/// Row-vector convention: a point transforms as `[x y 1] * M`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self * rhs`, applying `self` first.
    pub fn mul(&self, rhs: &Matrix) -> Matrix {
        Matrix {
            a: self.a * rhs.a + self.b * rhs.c,
            b: self.a * rhs.b + self.b * rhs.d,
            c: self.c * rhs.a + self.d * rhs.c,
            d: self.c * rhs.b + self.d * rhs.d,
            e: self.e * rhs.a + self.f * rhs.c + rhs.e,
            f: self.e * rhs.b + self.f * rhs.d + rhs.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }
}

/// One placed glyph in device space.
#[derive(Debug, Clone, PartialEq)]
pub struct PageChar {
    pub ch: char,
    pub x0: f64,
    pub x1: f64,
    /// Baseline y of the glyph origin.
    pub baseline: f64,
    /// Effective font size, used for line grouping and rect heights.
    pub size: f64,
}

#[derive(Debug, Clone)]
struct FontInfo {
    first_char: u32,
    widths: Vec<f64>,
    missing_width: f64,
    composite: bool,
    /// Per-code overrides from the font's `/Encoding` `/Differences`.
    diffs: HashMap<u8, char>,
}

impl FontInfo {
    fn width(&self, code: u8) -> f64 {
        let idx = (code as u32).checked_sub(self.first_char);
        idx.and_then(|i| self.widths.get(i as usize))
            .copied()
            .unwrap_or(self.missing_width)
    }

    fn decode(&self, code: u8) -> char {
        self.diffs.get(&code).copied().unwrap_or_else(|| base_char(code))
    }
}

/// WinAnsi byte decoding. WinAnsi agrees with Latin-1 everywhere except the
/// 0x80..=0x9F block, which Windows fills with punctuation and currency.
fn base_char(code: u8) -> char {
    match code {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        other => other as char,
    }
}

const CYRILLIC_UPPER: &str = "АБВГДЕЁЖЗИЙКЛМНОПРСТУФХЦЧШЩЪЫЬЭЮЯ";
const CYRILLIC_LOWER: &str = "абвгдеёжзийклмнопрстуфхцчшщъыьэюя";

/// Map a `/Differences` glyph name to a character.
///
/// Covers single-character names, `uniXXXX`, the AFII range used by
/// Cyrillic simple fonts, and a handful of common punctuation names. An
/// unmapped name leaves the byte's WinAnsi decoding in place.
fn glyph_char(name: &[u8]) -> Option<char> {
    let name = std::str::from_utf8(name).ok()?;
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(c);
    }
    if let Some(hex) = name.strip_prefix("uni") {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(digits) = name.strip_prefix("afii") {
        let n: u32 = digits.parse().ok()?;
        return match n {
            10017..=10049 => CYRILLIC_UPPER.chars().nth((n - 10017) as usize),
            10065..=10097 => CYRILLIC_LOWER.chars().nth((n - 10065) as usize),
            _ => None,
        };
    }
    match name {
        "space" => Some(' '),
        "period" => Some('.'),
        "comma" => Some(','),
        "hyphen" => Some('-'),
        "colon" => Some(':'),
        "slash" => Some('/'),
        "quotedbl" => Some('"'),
        "numbersign" => Some('#'),
        "parenleft" => Some('('),
        "parenright" => Some(')'),
        _ => None,
    }
}

struct TextState {
    tm: Matrix,
    tlm: Matrix,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    h_scale: f64,
    leading: f64,
    rise: f64,
    font: Option<String>,
}

impl TextState {
    fn new() -> Self {
        Self {
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            font: None,
        }
    }

    fn next_line(&mut self, tx: f64, ty: f64) {
        self.tlm = Matrix::translation(tx, ty).mul(&self.tlm);
        self.tm = self.tlm;
    }
}

fn as_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn operand_f64(op: &lopdf::content::Operation, idx: usize) -> Option<f64> {
    op.operands.get(idx).and_then(as_f64)
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Page-tree lookup with /Parent inheritance, for keys like /Resources.
fn resolve_inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    loop {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
}

/// Concatenated content stream bytes for a page. Decompresses when the
/// filter is supported, falls back to raw bytes otherwise.
fn content_bytes(doc: &Document, page_dict: &Dictionary) -> Option<Vec<u8>> {
    fn stream_bytes(stream: &lopdf::Stream) -> Option<Vec<u8>> {
        stream
            .decompressed_content()
            .ok()
            .or_else(|| Some(stream.content.clone()))
            .filter(|b| !b.is_empty())
    }

    let contents = page_dict.get(b"Contents").ok()?;
    match resolve(doc, contents) {
        Object::Stream(s) => stream_bytes(s),
        Object::Array(items) => {
            let mut all = Vec::new();
            for item in items {
                if let Ok(stream) = resolve(doc, item).as_stream() {
                    if let Some(bytes) = stream_bytes(stream) {
                        all.extend_from_slice(&bytes);
                        all.push(b' ');
                    }
                }
            }
            if all.is_empty() {
                None
            } else {
                Some(all)
            }
        }
        _ => None,
    }
}

/// Load the page's font resources into name -> width tables.
fn load_fonts(doc: &Document, page_id: ObjectId) -> HashMap<String, FontInfo> {
    let mut fonts = HashMap::new();
    let Some(resources) = resolve_inherited(doc, page_id, b"Resources") else {
        return fonts;
    };
    let Ok(resources) = resolve(doc, resources).as_dict() else {
        return fonts;
    };
    let Ok(font_dict) = resources.get(b"Font") else {
        return fonts;
    };
    let Ok(font_dict) = resolve(doc, font_dict).as_dict() else {
        return fonts;
    };
    for (name, font_obj) in font_dict.iter() {
        if let Ok(font) = resolve(doc, font_obj).as_dict() {
            let name = String::from_utf8_lossy(name).into_owned();
            fonts.insert(name, load_font(doc, font));
        }
    }
    fonts
}

fn load_font(doc: &Document, font: &Dictionary) -> FontInfo {
    let composite = font
        .get(b"Subtype")
        .ok()
        .and_then(|o| o.as_name().ok())
        .map_or(false, |n| n == b"Type0");
    let first_char = font
        .get(b"FirstChar")
        .ok()
        .and_then(|o| as_f64(resolve(doc, o)))
        .map_or(0, |v| v as u32);
    let widths = font
        .get(b"Widths")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .map(|arr| {
            arr.iter()
                .filter_map(|w| as_f64(resolve(doc, w)))
                .collect()
        })
        .unwrap_or_default();
    let missing_width = font
        .get(b"FontDescriptor")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
        .and_then(|d| d.get(b"MissingWidth").ok())
        .and_then(as_f64)
        .unwrap_or(DEFAULT_GLYPH_WIDTH);
    let diffs = font
        .get(b"Encoding")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
        .and_then(|d| d.get(b"Differences").ok())
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .map(|arr| load_differences(arr))
        .unwrap_or_default();
    FontInfo {
        first_char,
        widths,
        missing_width,
        composite,
        diffs,
    }
}

/// `/Differences` walks as `[code name name ... code name ...]`: an integer
/// resets the current code, each name assigns it and advances.
fn load_differences(arr: &[Object]) -> HashMap<u8, char> {
    let mut diffs = HashMap::new();
    let mut code: u32 = 0;
    for item in arr {
        match item {
            Object::Integer(n) => code = *n as u32,
            Object::Name(name) => {
                if let (Ok(byte), Some(ch)) = (u8::try_from(code), glyph_char(name)) {
                    diffs.insert(byte, ch);
                }
                code += 1;
            }
            _ => {}
        }
    }
    diffs
}

/// Interpret a page's content streams and return every placed character.
///
/// Pages without contents decode to an empty list rather than an error.
pub fn page_chars(doc: &Document, page_id: ObjectId) -> Result<Vec<PageChar>> {
    let page_dict = doc
        .get_object(page_id)
        .and_then(|o| o.as_dict())
        .map_err(|e| Error::Pdf(format!("page dictionary: {e}")))?;
    let Some(bytes) = content_bytes(doc, page_dict) else {
        return Ok(Vec::new());
    };
    let content =
        Content::decode(&bytes).map_err(|e| Error::Pdf(format!("content stream: {e}")))?;
    let fonts = load_fonts(doc, page_id);

    let mut chars = Vec::new();
    let mut ctm = Matrix::IDENTITY;
    let mut ctm_stack: Vec<Matrix> = Vec::new();
    let mut ts = TextState::new();
    let mut skipped_fonts: Vec<String> = Vec::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => ctm_stack.push(ctm),
            "Q" => {
                if let Some(prev) = ctm_stack.pop() {
                    ctm = prev;
                }
            }
            "cm" => {
                if let (Some(a), Some(b), Some(c), Some(d), Some(e), Some(f)) = (
                    operand_f64(op, 0),
                    operand_f64(op, 1),
                    operand_f64(op, 2),
                    operand_f64(op, 3),
                    operand_f64(op, 4),
                    operand_f64(op, 5),
                ) {
                    ctm = Matrix::new(a, b, c, d, e, f).mul(&ctm);
                }
            }
            "BT" => {
                ts.tm = Matrix::IDENTITY;
                ts.tlm = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                ts.font = op
                    .operands
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .map(|n| String::from_utf8_lossy(n).into_owned());
                if let Some(size) = operand_f64(op, 1) {
                    ts.size = size;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (operand_f64(op, 0), operand_f64(op, 1)) {
                    ts.next_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (operand_f64(op, 0), operand_f64(op, 1)) {
                    ts.leading = -ty;
                    ts.next_line(tx, ty);
                }
            }
            "Tm" => {
                if let (Some(a), Some(b), Some(c), Some(d), Some(e), Some(f)) = (
                    operand_f64(op, 0),
                    operand_f64(op, 1),
                    operand_f64(op, 2),
                    operand_f64(op, 3),
                    operand_f64(op, 4),
                    operand_f64(op, 5),
                ) {
                    ts.tm = Matrix::new(a, b, c, d, e, f);
                    ts.tlm = ts.tm;
                }
            }
            "TL" => {
                if let Some(l) = operand_f64(op, 0) {
                    ts.leading = l;
                }
            }
            "T*" => {
                let leading = ts.leading;
                ts.next_line(0.0, -leading);
            }
            "Tc" => {
                if let Some(v) = operand_f64(op, 0) {
                    ts.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = operand_f64(op, 0) {
                    ts.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = operand_f64(op, 0) {
                    ts.h_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = operand_f64(op, 0) {
                    ts.rise = v;
                }
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    show_text(bytes, &fonts, &mut ts, &ctm, &mut chars, &mut skipped_fonts);
                }
            }
            "'" => {
                let leading = ts.leading;
                ts.next_line(0.0, -leading);
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    show_text(bytes, &fonts, &mut ts, &ctm, &mut chars, &mut skipped_fonts);
                }
            }
            "\"" => {
                if let Some(aw) = operand_f64(op, 0) {
                    ts.word_spacing = aw;
                }
                if let Some(ac) = operand_f64(op, 1) {
                    ts.char_spacing = ac;
                }
                let leading = ts.leading;
                ts.next_line(0.0, -leading);
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    show_text(bytes, &fonts, &mut ts, &ctm, &mut chars, &mut skipped_fonts);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => show_text(
                                bytes,
                                &fonts,
                                &mut ts,
                                &ctm,
                                &mut chars,
                                &mut skipped_fonts,
                            ),
                            other => {
                                if let Some(n) = as_f64(other) {
                                    let tx = -n / 1000.0 * ts.size * ts.h_scale;
                                    ts.tm = Matrix::translation(tx, 0.0).mul(&ts.tm);
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(chars)
}

fn show_text(
    bytes: &[u8],
    fonts: &HashMap<String, FontInfo>,
    ts: &mut TextState,
    ctm: &Matrix,
    out: &mut Vec<PageChar>,
    skipped: &mut Vec<String>,
) {
    let font = ts.font.as_deref().and_then(|name| fonts.get(name));
    if let (Some(name), Some(info)) = (ts.font.as_deref(), font) {
        if info.composite {
            if !skipped.iter().any(|s| s == name) {
                log::debug!("skipping composite font {name}: multi-byte codes unsupported");
                skipped.push(name.to_string());
            }
            return;
        }
    }

    for &code in bytes {
        let w0 = font.map_or(DEFAULT_GLYPH_WIDTH, |f| f.width(code)) / 1000.0;
        let trm = Matrix::new(
            ts.size * ts.h_scale,
            0.0,
            0.0,
            ts.size,
            0.0,
            ts.rise,
        )
        .mul(&ts.tm)
        .mul(ctm);
        let (x0, baseline) = trm.apply(0.0, 0.0);
        let (x1, _) = trm.apply(w0, 0.0);
        out.push(PageChar {
            ch: font.map_or_else(|| base_char(code), |f| f.decode(code)),
            x0,
            x1,
            baseline,
            size: ts.size,
        });

        let word = if code == b' ' { ts.word_spacing } else { 0.0 };
        let tx = (w0 * ts.size + ts.char_spacing + word) * ts.h_scale;
        ts.tm = Matrix::translation(tx, 0.0).mul(&ts.tm);
    }
}
