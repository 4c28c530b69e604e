use serde::ser::Serializer;
use serde::Serialize;

/// A 2D point in inches.
pub type Point = [f64; 2];

/// Decimal places kept in JSON output (a micro-inch).
const OUTPUT_PLACES: u32 = 6;

/// Round `v` to `places` decimal places.
pub fn round_f64(v: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (v * scale).round() / scale
}

pub(crate) fn round_point(p: &Point) -> Point {
    [round_f64(p[0], OUTPUT_PLACES), round_f64(p[1], OUTPUT_PLACES)]
}

pub(crate) fn serialize_f64_rounded<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(round_f64(*v, OUTPUT_PLACES))
}

pub(crate) fn serialize_point<S: Serializer>(p: &Point, s: S) -> Result<S::Ok, S::Error> {
    round_point(p).serialize(s)
}

pub(crate) fn serialize_contours<S: Serializer>(
    contours: &[Vec<Point>],
    s: S,
) -> Result<S::Ok, S::Error> {
    let rounded: Vec<Vec<Point>> = contours
        .iter()
        .map(|c| c.iter().map(round_point).collect())
        .collect();
    rounded.serialize(s)
}

/// Whether an item adds copper (union) or removes it (subtract).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Dark,
    Clear,
}

// ─── Bounding Box ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BBox {
    #[serde(serialize_with = "serialize_f64_rounded")]
    pub minx: f64,
    #[serde(serialize_with = "serialize_f64_rounded")]
    pub miny: f64,
    #[serde(serialize_with = "serialize_f64_rounded")]
    pub maxx: f64,
    #[serde(serialize_with = "serialize_f64_rounded")]
    pub maxy: f64,
}

impl Default for BBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BBox {
    pub fn empty() -> Self {
        Self {
            minx: f64::INFINITY,
            miny: f64::INFINITY,
            maxx: f64::NEG_INFINITY,
            maxy: f64::NEG_INFINITY,
        }
    }

    /// True until at least one point has been added.
    pub fn is_empty(&self) -> bool {
        self.minx > self.maxx || self.miny > self.maxy
    }

    pub fn expand_point(&mut self, x: f64, y: f64) {
        self.minx = self.minx.min(x);
        self.miny = self.miny.min(y);
        self.maxx = self.maxx.max(x);
        self.maxy = self.maxy.max(y);
    }

    pub fn expand_bbox(&mut self, other: &BBox) {
        if other.is_empty() {
            return;
        }
        self.expand_point(other.minx, other.miny);
        self.expand_point(other.maxx, other.maxy);
    }
}
