use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::Serialize;

use crate::types::{serialize_contours, serialize_point, BBox, Point};

use super::path::RegionPath;

/// Flattening resolution used when only the extents of a curved shape are needed.
const BOUNDS_SEGMENTS_PER_TURN: usize = 360;

/// End treatment of a stroked line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    /// Semicircle of the stroke width past each end point.
    Round,
    /// Square end exactly at the end point.
    Butt,
}

/// How a circular arc is turned into area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "style", rename_all = "lowercase")]
pub enum ArcStyle {
    /// Filled wedge bounded by the arc and the two radii.
    Pie,
    /// Round-capped, round-joined stroke along the arc.
    Stroke { width: f64 },
}

/// A geometric primitive of a board layer. All lengths are inches, all
/// angles are degrees, counterclockwise positive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Circle {
        #[serde(serialize_with = "serialize_point")]
        center: Point,
        diameter: f64,
    },
    /// Axis-aligned rectangle.
    Rect {
        #[serde(serialize_with = "serialize_point")]
        center: Point,
        width: f64,
        height: f64,
    },
    /// Axis-aligned rectangle with circular corners.
    RoundedRect {
        #[serde(serialize_with = "serialize_point")]
        center: Point,
        width: f64,
        height: f64,
        corner_radius: f64,
    },
    /// One or more closed vertex loops, filled with the non-zero rule.
    Polygon {
        #[serde(serialize_with = "serialize_contours")]
        contours: Vec<Vec<Point>>,
    },
    /// A closed G36/G37 region outline, which may contain arc segments.
    Region(RegionPath),
    /// A straight stroke.
    Line {
        #[serde(serialize_with = "serialize_point")]
        start: Point,
        #[serde(serialize_with = "serialize_point")]
        end: Point,
        width: f64,
        cap: LineCap,
    },
    Arc {
        #[serde(serialize_with = "serialize_point")]
        center: Point,
        radius: f64,
        start_angle: f64,
        sweep: f64,
        #[serde(flatten)]
        style: ArcStyle,
    },
}

impl Shape {
    /// Extents of the shape.
    pub fn bounds(&self) -> BBox {
        let mut bbox = BBox::empty();
        match self {
            Shape::Circle { center, diameter } => {
                let r = diameter.abs() / 2.0;
                bbox.expand_point(center[0] - r, center[1] - r);
                bbox.expand_point(center[0] + r, center[1] + r);
            }
            Shape::Rect {
                center,
                width,
                height,
            }
            | Shape::RoundedRect {
                center,
                width,
                height,
                ..
            } => {
                let (hw, hh) = (width.abs() / 2.0, height.abs() / 2.0);
                bbox.expand_point(center[0] - hw, center[1] - hh);
                bbox.expand_point(center[0] + hw, center[1] + hh);
            }
            Shape::Line {
                start,
                end,
                width,
                cap: LineCap::Round,
            } => {
                let r = width.abs() / 2.0;
                for p in [start, end] {
                    bbox.expand_point(p[0] - r, p[1] - r);
                    bbox.expand_point(p[0] + r, p[1] + r);
                }
            }
            _ => {
                for contour in self.to_contours(BOUNDS_SEGMENTS_PER_TURN) {
                    for p in contour {
                        bbox.expand_point(p[0], p[1]);
                    }
                }
            }
        }
        bbox
    }

    /// Flatten the shape into closed vertex loops.
    ///
    /// Curves are split so a full turn uses `segments_per_turn` segments.
    /// Degenerate shapes yield no contours.
    pub fn to_contours(&self, segments_per_turn: usize) -> Vec<Vec<Point>> {
        let spt = segments_per_turn.max(8);
        match self {
            Shape::Circle { center, diameter } => {
                if *diameter <= 0.0 {
                    return Vec::new();
                }
                vec![circle_points(*center, diameter / 2.0, spt)]
            }
            Shape::Rect {
                center,
                width,
                height,
            } => {
                if *width <= 0.0 || *height <= 0.0 {
                    return Vec::new();
                }
                let (hw, hh) = (width / 2.0, height / 2.0);
                vec![vec![
                    [center[0] - hw, center[1] - hh],
                    [center[0] + hw, center[1] - hh],
                    [center[0] + hw, center[1] + hh],
                    [center[0] - hw, center[1] + hh],
                ]]
            }
            Shape::RoundedRect {
                center,
                width,
                height,
                corner_radius,
            } => rounded_rect_points(*center, *width, *height, *corner_radius, spt)
                .into_iter()
                .collect(),
            Shape::Polygon { contours } => contours
                .iter()
                .filter(|c| c.len() >= 3)
                .cloned()
                .collect(),
            Shape::Region(path) => path.flatten(spt),
            Shape::Line {
                start,
                end,
                width,
                cap,
            } => line_stroke_points(*start, *end, *width, *cap, spt)
                .into_iter()
                .collect(),
            Shape::Arc {
                center,
                radius,
                start_angle,
                sweep,
                style,
            } => match style {
                ArcStyle::Pie => pie_points(*center, *radius, *start_angle, *sweep, spt)
                    .into_iter()
                    .collect(),
                ArcStyle::Stroke { width } => {
                    arc_stroke_contours(*center, *radius, *start_angle, *sweep, *width, spt)
                }
            },
        }
    }
}

/// Rotate `p` about the origin by `degrees`, counterclockwise positive.
pub fn rotate_point(p: Point, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [p[0] * cos - p[1] * sin, p[0] * sin + p[1] * cos]
}

/// Points along an arc, both ends included. Angles are radians.
pub fn arc_points(
    center: Point,
    radius: f64,
    start: f64,
    sweep: f64,
    segments_per_turn: usize,
) -> Vec<Point> {
    let n = ((sweep.abs() / TAU) * segments_per_turn as f64).ceil().max(1.0) as usize;
    (0..=n)
        .map(|k| {
            let a = start + sweep * (k as f64) / (n as f64);
            [center[0] + radius * a.cos(), center[1] + radius * a.sin()]
        })
        .collect()
}

fn circle_points(center: Point, radius: f64, spt: usize) -> Vec<Point> {
    let mut pts = arc_points(center, radius, 0.0, TAU, spt);
    pts.pop(); // same as the first point
    pts
}

fn rounded_rect_points(
    center: Point,
    width: f64,
    height: f64,
    corner_radius: f64,
    spt: usize,
) -> Option<Vec<Point>> {
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    let (hw, hh) = (width / 2.0, height / 2.0);
    let r = corner_radius.clamp(0.0, hw.min(hh));
    let (ix, iy) = (hw - r, hh - r);
    // Corner centers counterclockwise from top-right, each owning a quarter turn.
    let corners = [
        ([center[0] + ix, center[1] + iy], 0.0),
        ([center[0] - ix, center[1] + iy], FRAC_PI_2),
        ([center[0] - ix, center[1] - iy], PI),
        ([center[0] + ix, center[1] - iy], 3.0 * FRAC_PI_2),
    ];
    let mut pts = Vec::new();
    for (c, a) in corners {
        if r > 0.0 {
            pts.extend(arc_points(c, r, a, FRAC_PI_2, spt));
        } else {
            pts.push(c);
        }
    }
    pts.dedup_by(|a, b| (a[0] - b[0]).abs() < 1e-12 && (a[1] - b[1]).abs() < 1e-12);
    Some(pts)
}

fn line_stroke_points(
    start: Point,
    end: Point,
    width: f64,
    cap: LineCap,
    spt: usize,
) -> Option<Vec<Point>> {
    if width <= 0.0 {
        return None;
    }
    let r = width / 2.0;
    let (dx, dy) = (end[0] - start[0], end[1] - start[1]);
    let len = dx.hypot(dy);
    if len < 1e-12 {
        // A zero-length round stroke is a dot; a butt stroke is nothing.
        return match cap {
            LineCap::Round => Some(circle_points(start, r, spt)),
            LineCap::Butt => None,
        };
    }
    let dir = dy.atan2(dx);
    match cap {
        LineCap::Round => {
            let mut pts = arc_points(end, r, dir - FRAC_PI_2, PI, spt);
            pts.extend(arc_points(start, r, dir + FRAC_PI_2, PI, spt));
            Some(pts)
        }
        LineCap::Butt => {
            let (nx, ny) = (-dy / len * r, dx / len * r);
            Some(vec![
                [start[0] - nx, start[1] - ny],
                [end[0] - nx, end[1] - ny],
                [end[0] + nx, end[1] + ny],
                [start[0] + nx, start[1] + ny],
            ])
        }
    }
}

fn pie_points(
    center: Point,
    radius: f64,
    start_angle: f64,
    sweep: f64,
    spt: usize,
) -> Option<Vec<Point>> {
    if radius <= 0.0 {
        return None;
    }
    if sweep.abs() >= 360.0 {
        return Some(circle_points(center, radius, spt));
    }
    let mut pts = vec![center];
    pts.extend(arc_points(
        center,
        radius,
        start_angle.to_radians(),
        sweep.to_radians(),
        spt,
    ));
    Some(pts)
}

fn arc_stroke_contours(
    center: Point,
    radius: f64,
    start_angle: f64,
    sweep: f64,
    width: f64,
    spt: usize,
) -> Vec<Vec<Point>> {
    if width <= 0.0 {
        return Vec::new();
    }
    let half = width / 2.0;
    let outer = radius + half;
    let inner = radius - half;

    if sweep.abs() >= 360.0 {
        // Annulus: the inner loop runs the other way so non-zero filling leaves a hole.
        let mut contours = vec![circle_points(center, outer, spt)];
        if inner > 0.0 {
            let mut hole = circle_points(center, inner, spt);
            hole.reverse();
            contours.push(hole);
        }
        return contours;
    }

    let a0 = start_angle.to_radians();
    let s = sweep.to_radians();
    let a1 = a0 + s;
    let dir = s.signum();
    let on_arc = |a: f64| [center[0] + radius * a.cos(), center[1] + radius * a.sin()];

    let mut pts = arc_points(center, outer, a0, s, spt);
    pts.extend(arc_points(on_arc(a1), half, a1, dir * PI, spt));
    if inner > 0.0 {
        pts.extend(arc_points(center, inner, a1, -s, spt));
    } else {
        pts.push(center);
    }
    pts.extend(arc_points(on_arc(a0), half, a0 + PI, dir * PI, spt));
    vec![pts]
}
