use crate::types::Point;

/// Sweeps this close to zero are read as a full turn.
const FULL_TURN_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    Clockwise,
    CounterClockwise,
}

/// G74 / G75.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuadrantMode {
    #[default]
    Single,
    Multi,
}

/// A resolved circular interpolation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcGeometry {
    pub center: Point,
    pub radius: f64,
    /// Degrees in [0, 360).
    pub start_angle: f64,
    /// Degrees; positive counterclockwise. Magnitude 360 is a full circle.
    pub sweep: f64,
}

/// Locate the arc center from the current point, the target and the I/J
/// offset.
///
/// In multi-quadrant mode the offset is signed and simply added. In
/// single-quadrant mode the offset is unsigned and its signs come from the
/// direction and the relative position of the end point.
pub fn resolve_center(
    current: Point,
    target: Point,
    offset: Point,
    direction: ArcDirection,
    quadrant: QuadrantMode,
) -> Point {
    let [x, y] = current;
    let [i, j] = offset;
    match quadrant {
        QuadrantMode::Multi => [x + i, y + j],
        QuadrantMode::Single => {
            let moving_right = x < target[0];
            let moving_up = y < target[1];
            match direction {
                ArcDirection::CounterClockwise => [
                    if moving_up { x - i } else { x + i },
                    if moving_right { y + j } else { y - j },
                ],
                ArcDirection::Clockwise => [
                    if moving_up { x + i } else { x - i },
                    if moving_right { y - j } else { y + j },
                ],
            }
        }
    }
}

/// Angle of `p` seen from `center`, degrees in [0, 360).
pub fn angle_of(center: Point, p: Point) -> f64 {
    let a = (p[1] - center[1]).atan2(p[0] - center[0]).to_degrees().rem_euclid(360.0);
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Signed sweep from `start` to `end` (both in [0, 360)) in `direction`.
///
/// Coincident start and end points make a full circle.
pub fn sweep_between(start: f64, end: f64, direction: ArcDirection) -> f64 {
    match direction {
        ArcDirection::CounterClockwise => {
            let mut sweep = end - start;
            if sweep < 0.0 {
                sweep += 360.0;
            }
            if sweep.abs() < FULL_TURN_EPSILON {
                sweep = 360.0;
            }
            sweep
        }
        ArcDirection::Clockwise => {
            let mut sweep = end - start - 360.0;
            if sweep < -360.0 {
                sweep += 360.0;
            }
            if sweep.abs() < FULL_TURN_EPSILON {
                sweep = -360.0;
            }
            sweep
        }
    }
}

/// Resolve a circular D01 into center, radius and angles.
///
/// The radius is the length of the I/J offset.
pub fn resolve_arc(
    current: Point,
    target: Point,
    offset: Point,
    direction: ArcDirection,
    quadrant: QuadrantMode,
) -> ArcGeometry {
    let center = resolve_center(current, target, offset, direction, quadrant);
    let radius = offset[0].hypot(offset[1]);
    let start_angle = angle_of(center, current);
    let end_angle = angle_of(center, target);
    ArcGeometry {
        center,
        radius,
        start_angle,
        sweep: sweep_between(start_angle, end_angle, direction),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_multi_quadrant_cw_quarter() {
        // From (0,1) to (1,0) around the origin, clockwise
        let arc = resolve_arc(
            [0.0, 1.0],
            [1.0, 0.0],
            [0.0, -1.0],
            ArcDirection::Clockwise,
            QuadrantMode::Multi,
        );
        assert_eq!(arc.center, [0.0, 0.0]);
        assert_abs_diff_eq!(arc.radius, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(arc.start_angle, 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(arc.sweep, -90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_multi_quadrant_full_circle() {
        let ccw = resolve_arc(
            [1.0, 0.0],
            [1.0, 0.0],
            [-1.0, 0.0],
            ArcDirection::CounterClockwise,
            QuadrantMode::Multi,
        );
        assert_abs_diff_eq!(ccw.sweep, 360.0, epsilon = 1e-9);
        let cw = resolve_arc(
            [1.0, 0.0],
            [1.0, 0.0],
            [-1.0, 0.0],
            ArcDirection::Clockwise,
            QuadrantMode::Multi,
        );
        assert_abs_diff_eq!(cw.sweep, -360.0, epsilon = 1e-9);
    }

    #[test]
    fn test_single_quadrant_ccw_signs() {
        // Quarter from (1,0) to (0,1) around the origin; offsets unsigned
        let center = resolve_center(
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 0.0],
            ArcDirection::CounterClockwise,
            QuadrantMode::Single,
        );
        assert_eq!(center, [0.0, 0.0]);

        let arc = resolve_arc(
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 0.0],
            ArcDirection::CounterClockwise,
            QuadrantMode::Single,
        );
        assert_abs_diff_eq!(arc.start_angle, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(arc.sweep, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_single_quadrant_cw_signs() {
        // Quarter from (0,1) to (1,0) around the origin
        let center = resolve_center(
            [0.0, 1.0],
            [1.0, 0.0],
            [0.0, 1.0],
            ArcDirection::Clockwise,
            QuadrantMode::Single,
        );
        assert_eq!(center, [0.0, 0.0]);
    }

    #[test]
    fn test_single_quadrant_sign_table() {
        use ArcDirection::*;
        // Current point (10,20), unsigned offset (1,2); the target only
        // picks the horizontal and vertical direction of travel.
        let cases = [
            (CounterClockwise, [11.0, 21.0], [9.0, 22.0]),
            (CounterClockwise, [11.0, 19.0], [11.0, 22.0]),
            (CounterClockwise, [9.0, 21.0], [9.0, 18.0]),
            (CounterClockwise, [9.0, 19.0], [11.0, 18.0]),
            (Clockwise, [11.0, 21.0], [11.0, 18.0]),
            (Clockwise, [11.0, 19.0], [9.0, 18.0]),
            (Clockwise, [9.0, 21.0], [11.0, 22.0]),
            (Clockwise, [9.0, 19.0], [9.0, 22.0]),
        ];
        for (direction, target, expected) in cases {
            let center = resolve_center(
                [10.0, 20.0],
                target,
                [1.0, 2.0],
                direction,
                QuadrantMode::Single,
            );
            assert_eq!(center, expected, "{direction:?} towards {target:?}");
        }
    }

    #[test]
    fn test_sweep_ranges() {
        use ArcDirection::*;
        assert_abs_diff_eq!(sweep_between(350.0, 10.0, CounterClockwise), 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(sweep_between(10.0, 350.0, Clockwise), -20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(sweep_between(10.0, 350.0, CounterClockwise), 340.0, epsilon = 1e-9);
        assert_abs_diff_eq!(sweep_between(350.0, 10.0, Clockwise), -340.0, epsilon = 1e-9);
        assert_abs_diff_eq!(sweep_between(45.0, 45.0, Clockwise), -360.0, epsilon = 1e-9);
    }

    #[test]
    fn test_angle_of_is_normalized() {
        assert_abs_diff_eq!(angle_of([0.0, 0.0], [0.0, -1.0]), 270.0, epsilon = 1e-9);
        assert_abs_diff_eq!(angle_of([0.0, 0.0], [-1.0, 0.0]), 180.0, epsilon = 1e-9);
        let a = angle_of([0.0, 0.0], [1.0, -1e-20]);
        assert!((0.0..360.0).contains(&a));
    }
}
