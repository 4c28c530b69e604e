use log::debug;

use crate::board::BoardProgram;
use crate::error::WarningKind;
use crate::geometry::{rotate_point, Shape};
use crate::gerber::apertures::{Aperture, StandardAperture, StandardKind, POLYGON_VERTICES};
use crate::gerber::macros::MacroPrimitive;
use crate::types::{Point, Polarity};

/// Stamp `aperture` at `at` (D03).
///
/// Returns one warning per macro primitive that produced no geometry.
pub fn flash(
    board: &mut BoardProgram,
    aperture: &Aperture,
    at: Point,
    polarity: Polarity,
) -> Vec<WarningKind> {
    match aperture {
        Aperture::Standard(std) => {
            flash_standard(board, std, at, polarity);
            Vec::new()
        }
        Aperture::Macro { name, primitives } => {
            let mut warnings = Vec::new();
            for prim in primitives {
                if let Err(kind) = flash_primitive(board, prim, at, polarity) {
                    debug!("Gerber: macro {name}: {prim:?} produces no geometry");
                    warnings.push(kind);
                }
            }
            warnings
        }
    }
}

fn flash_standard(board: &mut BoardProgram, std: &StandardAperture, at: Point, polarity: Polarity) {
    let m = &std.modifiers;
    let size = |i: usize| m.get(i).copied().unwrap_or(0.0);
    let shape = match std.kind {
        StandardKind::Circle => Shape::Circle {
            center: at,
            diameter: size(0),
        },
        StandardKind::Rectangle => Shape::Rect {
            center: at,
            width: size(0),
            height: size(1),
        },
        StandardKind::Obround => Shape::RoundedRect {
            center: at,
            width: size(0),
            height: size(1),
            corner_radius: size(0).min(size(1)) / 2.0,
        },
        StandardKind::Polygon => regular_polygon(at, size(0) / 2.0, size(1), size(2)),
    };
    board.append(shape, polarity);

    if let Some(hole) = std.hole_diameter().filter(|d| *d > 0.0) {
        board.append(
            Shape::Circle {
                center: at,
                diameter: hole,
            },
            Polarity::Clear,
        );
    }
}

/// Regular n-gon with its first vertex at `rotation` degrees.
fn regular_polygon(center: Point, radius: f64, sides: f64, rotation: f64) -> Shape {
    let n = sides
        .round()
        .clamp(*POLYGON_VERTICES.start(), *POLYGON_VERTICES.end()) as usize;
    let vertices = (0..n)
        .map(|i| {
            let a = (rotation + 360.0 * i as f64 / n as f64).to_radians();
            [center[0] + radius * a.cos(), center[1] + radius * a.sin()]
        })
        .collect();
    Shape::Polygon {
        contours: vec![vertices],
    }
}

/// Macro-local point to board coordinates. Macro rotation is clockwise
/// positive, so the point turns by `360 - rotation`.
fn place(local: Point, rotation: f64, at: Point) -> Point {
    let p = rotate_point(local, 360.0 - rotation);
    [p[0] + at[0], p[1] + at[1]]
}

fn flash_primitive(
    board: &mut BoardProgram,
    prim: &MacroPrimitive,
    at: Point,
    polarity: Polarity,
) -> Result<(), WarningKind> {
    let (exposure, shape) = match prim {
        MacroPrimitive::Circle {
            exposure,
            diameter,
            center,
            rotation,
        } => (
            *exposure,
            Shape::Circle {
                center: place(*center, *rotation, at),
                diameter: *diameter,
            },
        ),
        MacroPrimitive::CenterLine {
            exposure,
            width,
            height,
            center,
            rotation,
        } => {
            let (hw, hh) = (width / 2.0, height / 2.0);
            let corners = [[-hw, -hh], [hw, -hh], [hw, hh], [-hw, hh]]
                .into_iter()
                .map(|[dx, dy]| place([center[0] + dx, center[1] + dy], *rotation, at))
                .collect();
            (
                *exposure,
                Shape::Polygon {
                    contours: vec![corners],
                },
            )
        }
        MacroPrimitive::Outline {
            exposure,
            vertices,
            rotation,
        } => (
            *exposure,
            Shape::Polygon {
                contours: vec![vertices.iter().map(|v| place(*v, *rotation, at)).collect()],
            },
        ),
        MacroPrimitive::Unsupported(_) => return Err(WarningKind::UnsupportedPrimitive),
    };

    // Exposure off cuts out of the dark layer; under clear polarity it has nothing to cut.
    match (exposure, polarity) {
        (true, _) => board.append(shape, polarity),
        (false, Polarity::Dark) => board.append(shape, Polarity::Clear),
        (false, Polarity::Clear) => {}
    }
    Ok(())
}
