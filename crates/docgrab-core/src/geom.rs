//! Rectangle model for page-space hit boxes.

use serde::{Deserialize, Serialize};

/// An axis-aligned box in PDF user space (y grows upward), `x0 <= x1` and
/// `y0 <= y1` by construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Identity key with coordinates rounded to two decimals.
    ///
    /// Case-variant searches over the same text return boxes that agree up
    /// to float jitter; rounding collapses those while keeping genuinely
    /// distinct nearby matches apart.
    pub fn rounded_key(&self) -> (i64, i64, i64, i64) {
        fn r2(v: f64) -> i64 {
            (v * 100.0).round() as i64
        }
        (r2(self.x0), r2(self.y0), r2(self.x1), r2(self.y1))
    }
}

/// Drop rectangles whose rounded key was already seen, preserving first-seen
/// order.
pub fn dedup_rects(rects: Vec<Rect>) -> Vec<Rect> {
    let mut seen = std::collections::BTreeSet::new();
    let mut out = Vec::with_capacity(rects.len());
    for r in rects {
        if seen.insert(r.rounded_key()) {
            out.push(r);
        }
    }
    out
}
