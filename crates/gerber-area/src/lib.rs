pub mod board;
pub mod compose;
pub mod error;
pub mod geometry;
pub mod gerber;
pub mod synthesis;
pub mod types;

pub use board::{BoardProgram, DrawItem};
pub use compose::{
    compose, compose_cancellable, ComposeOptions, CompositeArea, CompositeJob, CompositeWorker,
};
pub use error::{ComposeError, ErrorKind, GerberError, Warning, WarningKind};
pub use geometry::Shape;
pub use gerber::coord::Unit;
pub use gerber::interpreter::{ParseOptions, ParseOutput};
pub use gerber::parse;
pub use types::{BBox, Point, Polarity};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LineCap;
    use approx::assert_abs_diff_eq;

    fn parse_default(src: &str) -> Result<ParseOutput, GerberError> {
        parse(src, ParseOptions::default())
    }

    #[test]
    fn test_single_stroke_program() {
        // Under FS 2.4 with leading-zero omission, 001000 is 0.1000 in.
        let src = "%FSLAX24Y24*%\n%MOIN*%\n%ADD10C,0.010*%\nD10*\n\
                   X001000Y001000D02*\nX002000Y001000D01*\nM02*\n";
        let out = parse_default(src).unwrap();
        assert!(out.stopped);
        assert_eq!(out.program.len(), 1);
        let item = &out.program.items()[0];
        assert_eq!(item.polarity, Polarity::Dark);
        let Shape::Line {
            start,
            end,
            width,
            cap,
        } = item.shape
        else {
            panic!("expected a stroke, got {:?}", item.shape);
        };
        assert_eq!(cap, LineCap::Round);
        assert_abs_diff_eq!(width, 0.010, epsilon = 1e-12);
        assert_abs_diff_eq!(start[0], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(start[1], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(end[0], 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(end[1], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_one_inch_stroke_bounds() {
        let src = "%FSLAX24Y24*%\n%MOIN*%\n%ADD10C,0.010*%\nD10*\n\
                   X010000Y010000D02*\nX020000Y010000D01*\nM02*\n";
        let out = parse_default(src).unwrap();
        assert_eq!(out.program.len(), 1);
        assert_eq!(out.program.unit(), Unit::Inch);
        let b = out.program.bounds();
        assert_abs_diff_eq!(b.minx, 0.995, epsilon = 1e-9);
        assert_abs_diff_eq!(b.maxx, 2.005, epsilon = 1e-9);
        assert_abs_diff_eq!(b.miny, 0.995, epsilon = 1e-9);
        assert_abs_diff_eq!(b.maxy, 1.005, epsilon = 1e-9);
    }

    #[test]
    fn test_undefined_aperture_appends_nothing() {
        let src = "%FSLAX24Y24*%%ADD10C,0.01*%D10*X0Y0D03*D11*X010000Y0D03*";
        let err = parse_default(src).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ApertureNotDefined { id: 11 });
        assert_eq!(err.command, "D11");
    }

    #[test]
    fn test_unbounded_polygon_apertures_fail_cleanly() {
        let err = parse_default("%FSLAX24Y24*%%ADD10P,0.1Xinf*%D10*X0Y0D03*M02*").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedNumber("inf".into()));
        assert_eq!(err.command, "ADD10P,0.1Xinf");

        let err = parse_default("%FSLAX24Y24*%%ADD10P,0.1X1e9*%D10*X0Y0D03*M02*").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MalformedCommand(_)));
    }

    #[test]
    fn test_flash_with_hole_composes_to_ring() {
        let src = "%FSLAX24Y24*%%MOIN*%%ADD10C,0.2X0.1*%D10*X0Y0D03*M02*";
        let out = parse_default(src).unwrap();
        assert_eq!(out.program.len(), 2);
        let area = compose(
            &out.program,
            &ComposeOptions {
                segments_per_turn: 720,
            },
            |_| {},
        );
        let expected = std::f64::consts::PI * (0.1 * 0.1 - 0.05 * 0.05);
        assert_abs_diff_eq!(area.area(), expected, epsilon = 1e-4);
    }

    #[test]
    fn test_clear_layer_order_matters() {
        let dark_then_clear = "%FSLAX24Y24*%%ADD10R,0.2X0.2*%D10*X0Y0D03*%LPC*%X001000Y0D03*M02*";
        let clear_then_dark = "%FSLAX24Y24*%%ADD10R,0.2X0.2*%D10*%LPC*%X001000Y0D03*%LPD*%X0Y0D03*M02*";
        let opts = ComposeOptions::default();
        let a = compose(&parse_default(dark_then_clear).unwrap().program, &opts, |_| {});
        let b = compose(&parse_default(clear_then_dark).unwrap().program, &opts, |_| {});
        assert_abs_diff_eq!(a.area(), 0.1 * 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(b.area(), 0.2 * 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_macro_parameter_substitution() {
        let src = "%FSLAX24Y24*%%MOIN*%%AMDOT*1,1,$1,0,0*%%ADD10DOT,0.5X0.2*%D10*X0Y0D03*M02*";
        let out = parse_default(src).unwrap();
        assert!(matches!(
            out.program.items()[0].shape,
            Shape::Circle { diameter, .. } if (diameter - 0.5).abs() < 1e-12
        ));
    }
}
