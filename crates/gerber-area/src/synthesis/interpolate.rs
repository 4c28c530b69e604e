use crate::board::BoardProgram;
use crate::error::WarningKind;
use crate::geometry::{ArcStyle, LineCap, Shape};
use crate::gerber::apertures::{Aperture, StandardKind};
use crate::types::{Point, Polarity};

use super::arc::ArcGeometry;

/// Drag `aperture` in a straight line from `from` to `to` (linear D01).
///
/// Only circle and rectangle apertures can be dragged. A rectangle is
/// approximated by a butt stroke as wide as its diagonal plus the rectangle
/// itself at both ends.
pub fn stroke_line(
    board: &mut BoardProgram,
    aperture: &Aperture,
    from: Point,
    to: Point,
    polarity: Polarity,
) -> Result<(), WarningKind> {
    let Aperture::Standard(std) = aperture else {
        return Err(WarningKind::UnsupportedInterpolationAperture);
    };
    let size = |i: usize| std.modifiers.get(i).copied().unwrap_or(0.0);

    match std.kind {
        StandardKind::Circle => board.append(
            Shape::Line {
                start: from,
                end: to,
                width: size(0),
                cap: LineCap::Round,
            },
            polarity,
        ),
        StandardKind::Rectangle => {
            let (w, h) = (size(0), size(1));
            board.append(
                Shape::Line {
                    start: from,
                    end: to,
                    width: w.hypot(h),
                    cap: LineCap::Butt,
                },
                polarity,
            );
            for center in [from, to] {
                board.append(
                    Shape::Rect {
                        center,
                        width: w,
                        height: h,
                    },
                    polarity,
                );
            }
        }
        StandardKind::Obround | StandardKind::Polygon => {
            return Err(WarningKind::UnsupportedInterpolationAperture)
        }
    }
    Ok(())
}

/// Drag `aperture` along a circular arc, stroke width being its first modifier.
pub fn stroke_arc(
    board: &mut BoardProgram,
    aperture: &Aperture,
    arc: &ArcGeometry,
    polarity: Polarity,
) -> Result<(), WarningKind> {
    let width = aperture
        .primary_size()
        .ok_or(WarningKind::UnsupportedInterpolationAperture)?;
    board.append(
        Shape::Arc {
            center: arc.center,
            radius: arc.radius,
            start_angle: arc.start_angle,
            sweep: arc.sweep,
            style: ArcStyle::Stroke { width },
        },
        polarity,
    );
    Ok(())
}

/// The filled wedge between the arc and its center.
pub fn fill_pie(board: &mut BoardProgram, arc: &ArcGeometry, polarity: Polarity) {
    board.append(
        Shape::Arc {
            center: arc.center,
            radius: arc.radius,
            start_angle: arc.start_angle,
            sweep: arc.sweep,
            style: ArcStyle::Pie,
        },
        polarity,
    );
}
