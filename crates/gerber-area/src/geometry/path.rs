use serde::Serialize;

use crate::types::{serialize_point, Point};

use super::shape::arc_points;

/// One edge of a region contour, ending at `end`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Segment {
    Line {
        #[serde(serialize_with = "serialize_point")]
        end: Point,
    },
    /// Circular edge. Angles in degrees, sweep signed (negative is clockwise).
    Arc {
        #[serde(serialize_with = "serialize_point")]
        center: Point,
        radius: f64,
        start_angle: f64,
        sweep: f64,
        #[serde(serialize_with = "serialize_point")]
        end: Point,
    },
}

/// A closed loop: a start point and the edges walked from it. The last edge
/// implicitly returns to `start`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contour {
    #[serde(serialize_with = "serialize_point")]
    pub start: Point,
    pub segments: Vec<Segment>,
}

impl Contour {
    fn new(start: Point) -> Self {
        Self {
            start,
            segments: Vec::new(),
        }
    }

    pub fn flatten(&self, segments_per_turn: usize) -> Vec<Point> {
        let mut pts = vec![self.start];
        for seg in &self.segments {
            match seg {
                Segment::Line { end } => pts.push(*end),
                Segment::Arc {
                    center,
                    radius,
                    start_angle,
                    sweep,
                    end,
                } => {
                    let mut arc = arc_points(
                        *center,
                        *radius,
                        start_angle.to_radians(),
                        sweep.to_radians(),
                        segments_per_turn,
                    );
                    // The first point is where the previous edge ended; the
                    // last is snapped to the programmed end point.
                    arc.remove(0);
                    arc.pop();
                    pts.extend(arc);
                    pts.push(*end);
                }
            }
        }
        if pts.len() > 1 && pts.first() == pts.last() {
            pts.pop();
        }
        pts
    }
}

/// The outline of a finished G36/G37 region.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegionPath {
    pub contours: Vec<Contour>,
}

impl RegionPath {
    pub fn flatten(&self, segments_per_turn: usize) -> Vec<Vec<Point>> {
        self.contours
            .iter()
            .map(|c| c.flatten(segments_per_turn))
            .filter(|pts| pts.len() >= 3)
            .collect()
    }
}

/// Accumulates region edges between G36 and G37.
///
/// D02 starts a new contour. The first D01 after G36 implicitly starts one at
/// its own target (linear) or at the current point (circular).
#[derive(Debug, Default)]
pub struct RegionBuilder {
    done: Vec<Contour>,
    current: Option<Contour>,
}

impl RegionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, p: Point) {
        if let Some(c) = self.current.take() {
            self.done.push(c);
        }
        self.current = Some(Contour::new(p));
    }

    pub fn line_to(&mut self, p: Point) {
        match self.current.as_mut() {
            Some(c) => c.segments.push(Segment::Line { end: p }),
            None => self.move_to(p),
        }
    }

    /// Append a circular edge. `from` opens a contour if none is open.
    pub fn arc_to(
        &mut self,
        from: Point,
        center: Point,
        radius: f64,
        start_angle: f64,
        sweep: f64,
        end: Point,
    ) {
        if self.current.is_none() {
            self.move_to(from);
        }
        if let Some(c) = self.current.as_mut() {
            c.segments.push(Segment::Arc {
                center,
                radius,
                start_angle,
                sweep,
                end,
            });
        }
    }

    /// Close the region. Contours that cannot enclose area are dropped;
    /// `None` if nothing remains.
    pub fn finish(mut self) -> Option<RegionPath> {
        if let Some(c) = self.current.take() {
            self.done.push(c);
        }
        let contours: Vec<Contour> = self
            .done
            .into_iter()
            .filter(|c| c.flatten(8).len() >= 3)
            .collect();
        if contours.is_empty() {
            None
        } else {
            Some(RegionPath { contours })
        }
    }
}
