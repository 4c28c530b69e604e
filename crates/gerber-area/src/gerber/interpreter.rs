use log::{debug, info, warn};

use crate::board::BoardProgram;
use crate::error::{ErrorKind, GerberError, Warning, WarningKind};
use crate::geometry::{RegionBuilder, Shape};
use crate::synthesis::arc::{resolve_arc, ArcDirection, QuadrantMode};
use crate::synthesis::{flash, interpolate};
use crate::types::{Point, Polarity};

use super::apertures::{parse_definition, Aperture, ApertureLibrary};
use super::coord::{Axis, CoordinateFormat, Unit};
use super::lexer::{Token, TokenCursor};

/// Extended commands that are accepted and have no effect.
const IGNORED_EXTENDED: &[&str] = &["AS", "IN", "IP", "IR", "LN", "MI", "OF", "SF"];

/// Knobs for interpretation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Render circular D01 outside a region as a stroked arc instead of a
    /// filled pie wedge.
    pub stroke_circular_draws: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InterpolationMode {
    #[default]
    Linear,
    Clockwise,
    CounterClockwise,
}

impl InterpolationMode {
    fn arc_direction(self) -> Option<ArcDirection> {
        match self {
            Self::Linear => None,
            Self::Clockwise => Some(ArcDirection::Clockwise),
            Self::CounterClockwise => Some(ArcDirection::CounterClockwise),
        }
    }
}

/// Modal state carried from command to command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphicsState {
    pub current: Point,
    /// Last I/J seen; persists until overwritten.
    pub arc_offset: Point,
    pub interpolation: InterpolationMode,
    pub quadrant: QuadrantMode,
    pub in_region: bool,
    pub polarity: Polarity,
    pub selected_aperture: Option<u32>,
}

/// Result of a successful pass.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub program: BoardProgram,
    pub warnings: Vec<Warning>,
    /// True if the program ended with M00/M02 rather than running off the end.
    pub stopped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Extended,
}

/// Gerber state machine. Walks tokens and appends shapes to the board.
struct Interpreter {
    options: ParseOptions,
    format: CoordinateFormat,
    state: GraphicsState,
    library: ApertureLibrary,
    region: RegionBuilder,
    /// Token index of the G36 that opened the current region.
    region_start: usize,
    program: BoardProgram,
    warnings: Vec<Warning>,
    stopped: bool,
}

impl Interpreter {
    fn new(options: ParseOptions) -> Self {
        Self {
            options,
            format: CoordinateFormat::default(),
            state: GraphicsState::default(),
            library: ApertureLibrary::new(),
            region: RegionBuilder::new(),
            region_start: 0,
            program: BoardProgram::new(),
            warnings: Vec::new(),
            stopped: false,
        }
    }

    fn push_warning(&mut self, kind: WarningKind, command: &str, position: usize) {
        warn!("Gerber: {kind} in {command:?} (token {position})");
        self.warnings.push(Warning::new(kind, command, position));
    }

    // ─── Extended commands ───────────────────────────────────────────

    fn extended(
        &mut self,
        body: &str,
        position: usize,
        cursor: &mut TokenCursor<'_>,
    ) -> Result<(), GerberError> {
        let fail = |kind: ErrorKind| GerberError::new(kind, body, position);
        let Some(code) = body.get(..2) else {
            self.push_warning(WarningKind::UnknownCommand, body, position);
            return Ok(());
        };

        match code {
            "FS" => self.format.apply_format_spec(body).map_err(fail)?,
            "MO" => match &body[2..] {
                "IN" => self.format.unit = Unit::Inch,
                "MM" => self.format.unit = Unit::Millimeter,
                _ => self.push_warning(WarningKind::UnknownCommand, body, position),
            },
            "AD" => {
                let def = parse_definition(body).map_err(fail)?;
                let warnings = self
                    .library
                    .define_aperture(def.id, &def.type_spec, def.modifiers, self.format.unit)
                    .map_err(fail)?;
                for kind in warnings {
                    self.push_warning(kind, body, position);
                }
            }
            "AM" => {
                let name = &body[2..];
                if name.is_empty() {
                    return Err(fail(ErrorKind::MalformedCommand(
                        "AM: missing macro name".into(),
                    )));
                }
                let lines = cursor
                    .take_until_delimiter()
                    .into_iter()
                    .map(|(_, line)| line.to_string())
                    .collect();
                self.library.define_macro(name, lines);
            }
            "LP" => match body[2..].chars().next() {
                Some('D') => self.state.polarity = Polarity::Dark,
                Some('C') => self.state.polarity = Polarity::Clear,
                _ => self.push_warning(WarningKind::UnknownCommand, body, position),
            },
            c if IGNORED_EXTENDED.contains(&c) => {
                debug!("Gerber: ignoring deprecated extended command {body}");
            }
            _ => self.push_warning(WarningKind::UnknownCommand, body, position),
        }
        Ok(())
    }

    // ─── Normal commands ─────────────────────────────────────────────

    /// Process one normal-mode token, e.g. `G01X100Y200D01`.
    ///
    /// Letters are handled left to right. Coordinates accumulate into a
    /// target that becomes the current point after each D-code and at the
    /// end of the token.
    fn normal(&mut self, body: &str, position: usize) -> Result<(), GerberError> {
        let fail = |kind: ErrorKind| GerberError::new(kind, body, position);
        let mut target = self.state.current;
        let mut rest = body;

        while let Some(letter) = rest.chars().next() {
            let after = &rest[letter.len_utf8()..];
            match letter {
                'N' => {
                    // Line number
                    rest = split_number(after).1;
                }
                'G' => {
                    let (digits, tail) = split_digits(after);
                    rest = tail;
                    let known = match digits.parse::<u32>() {
                        // Comment; the rest of the token is its text
                        Ok(4) => {
                            rest = "";
                            true
                        }
                        Ok(code) => self.g_code(code, position),
                        Err(_) => false,
                    };
                    if !known {
                        self.push_warning(WarningKind::UnknownCommand, body, position);
                        rest = "";
                    }
                }
                'X' | 'Y' | 'I' | 'J' => {
                    let (digits, tail) = split_number(after);
                    rest = tail;
                    let axis = if matches!(letter, 'X' | 'I') { Axis::X } else { Axis::Y };
                    let value = self.format.decode_axis(digits, axis).map_err(fail)?;
                    match letter {
                        'X' => target[0] = value,
                        'Y' => target[1] = value,
                        'I' => self.state.arc_offset[0] = value,
                        _ => self.state.arc_offset[1] = value,
                    }
                }
                'D' => {
                    let (digits, tail) = split_digits(after);
                    rest = tail;
                    let code: u32 = digits
                        .parse()
                        .map_err(|_| fail(ErrorKind::MalformedNumber(digits.to_string())))?;
                    self.d_code(code, target, body, position)?;
                    self.state.current = target;
                }
                'M' => {
                    let (digits, _) = split_digits(after);
                    rest = "";
                    match digits.parse::<u32>() {
                        Ok(0) | Ok(2) => {
                            debug!("Gerber: program stop at token {position}");
                            self.stopped = true;
                        }
                        Ok(1) => {}
                        _ => self.push_warning(WarningKind::UnknownCommand, body, position),
                    }
                }
                _ => {
                    self.push_warning(WarningKind::UnknownCommand, body, position);
                    rest = "";
                }
            }
        }

        self.state.current = target;
        Ok(())
    }

    /// Apply a G-code. Returns false if the code is not known.
    fn g_code(&mut self, code: u32, position: usize) -> bool {
        match code {
            1 | 10 => self.state.interpolation = InterpolationMode::Linear,
            2 => self.state.interpolation = InterpolationMode::Clockwise,
            3 => self.state.interpolation = InterpolationMode::CounterClockwise,
            36 => {
                self.state.in_region = true;
                self.region = RegionBuilder::new();
                self.region_start = position;
            }
            37 => self.end_region(position),
            54 | 55 | 90 | 91 => {}
            70 => self.format.unit = Unit::Inch,
            71 => self.format.unit = Unit::Millimeter,
            74 => self.state.quadrant = QuadrantMode::Single,
            75 => self.state.quadrant = QuadrantMode::Multi,
            _ => return false,
        }
        true
    }

    fn end_region(&mut self, position: usize) {
        if !self.state.in_region {
            self.push_warning(WarningKind::RegionNotOpen, "G37", position);
            return;
        }
        self.state.in_region = false;
        match std::mem::take(&mut self.region).finish() {
            Some(path) => self.program.append(Shape::Region(path), self.state.polarity),
            None => debug!("Gerber: region closed at token {position} encloses nothing"),
        }
    }

    fn d_code(
        &mut self,
        code: u32,
        target: Point,
        body: &str,
        position: usize,
    ) -> Result<(), GerberError> {
        match code {
            1 => self.interpolate(target, body, position),
            2 => {
                if self.state.in_region {
                    self.region.move_to(target);
                }
            }
            3 => {
                if let Some(aperture) = selected_aperture(&self.library, &self.state) {
                    let warnings =
                        flash::flash(&mut self.program, aperture, target, self.state.polarity);
                    for kind in warnings {
                        self.push_warning(kind, body, position);
                    }
                }
            }
            id if id >= 10 => {
                self.library
                    .lookup(id)
                    .map_err(|kind| GerberError::new(kind, body, position))?;
                self.state.selected_aperture = Some(id);
            }
            _ => self.push_warning(WarningKind::UnknownCommand, body, position),
        }
        Ok(())
    }

    /// D01.
    fn interpolate(&mut self, target: Point, body: &str, position: usize) {
        let from = self.state.current;
        let polarity = self.state.polarity;

        let Some(direction) = self.state.interpolation.arc_direction() else {
            if self.state.in_region {
                self.region.line_to(target);
                return;
            }
            let Some(aperture) = selected_aperture(&self.library, &self.state) else {
                debug!("Gerber: D01 without an aperture at token {position}");
                return;
            };
            if let Err(kind) =
                interpolate::stroke_line(&mut self.program, aperture, from, target, polarity)
            {
                self.push_warning(kind, body, position);
            }
            return;
        };

        let arc = resolve_arc(
            from,
            target,
            self.state.arc_offset,
            direction,
            self.state.quadrant,
        );
        if self.state.in_region {
            self.region
                .arc_to(from, arc.center, arc.radius, arc.start_angle, arc.sweep, target);
            return;
        }
        let Some(aperture) = selected_aperture(&self.library, &self.state) else {
            debug!("Gerber: D01 without an aperture at token {position}");
            return;
        };
        if self.options.stroke_circular_draws {
            if let Err(kind) = interpolate::stroke_arc(&mut self.program, aperture, &arc, polarity)
            {
                self.push_warning(kind, body, position);
            }
        } else {
            interpolate::fill_pie(&mut self.program, &arc, polarity);
        }
    }
}

/// The aperture chosen by the last Dnn, if any.
fn selected_aperture<'a>(library: &'a ApertureLibrary, state: &GraphicsState) -> Option<&'a Aperture> {
    // Selection already checked that the id exists
    library.lookup(state.selected_aperture?).ok()
}

/// Split off a leading number (digits, sign, decimal point).
fn split_number(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.')))
        .unwrap_or(s.len());
    s.split_at(end)
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

/// Interpret a token stream into a board program.
///
/// Stops at the first fatal error. Everything after M00/M02 is ignored.
pub fn interpret(tokens: &[Token], options: ParseOptions) -> Result<ParseOutput, GerberError> {
    let mut interp = Interpreter::new(options);
    let mut cursor = TokenCursor::new(tokens);
    let mut mode = Mode::Normal;
    let mut block_start = 0;

    while !interp.stopped {
        let Some((position, token)) = cursor.bump() else {
            break;
        };
        match (token, mode) {
            (Token::Delimiter, Mode::Normal) => {
                mode = Mode::Extended;
                block_start = position;
            }
            (Token::Delimiter, Mode::Extended) => mode = Mode::Normal,
            (Token::Command(body), Mode::Extended) => {
                interp.extended(body, position, &mut cursor)?
            }
            (Token::Command(body), Mode::Normal) => interp.normal(body, position)?,
        }
    }

    if !interp.stopped && mode == Mode::Extended {
        return Err(GerberError::new(
            ErrorKind::UnterminatedExtendedBlock,
            "%",
            block_start,
        ));
    }
    if interp.state.in_region {
        let start = interp.region_start;
        interp.push_warning(WarningKind::UnclosedRegion, "G36", start);
    }

    info!(
        "Gerber: {} items, {} warnings{}",
        interp.program.len(),
        interp.warnings.len(),
        if interp.stopped { "" } else { ", no program stop" }
    );
    Ok(ParseOutput {
        program: interp.program,
        warnings: interp.warnings,
        stopped: interp.stopped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ArcStyle, LineCap};
    use crate::gerber::lexer::tokenize;
    use approx::assert_abs_diff_eq;

    fn run(src: &str) -> Result<ParseOutput, GerberError> {
        interpret(&tokenize(src), ParseOptions::default())
    }

    const HEADER: &str = "%FSLAX24Y24*%\n%MOIN*%\n%ADD10C,0.010*%\n";

    #[test]
    fn test_linear_stroke() {
        let out = run(&format!("{HEADER}D10*\nX010000Y010000D02*\nX020000Y010000D01*\nM02*\n"))
            .unwrap();
        assert!(out.stopped);
        assert!(out.warnings.is_empty());
        assert_eq!(out.program.len(), 1);
        let item = &out.program.items()[0];
        assert_eq!(item.polarity, Polarity::Dark);
        match item.shape {
            Shape::Line {
                start,
                end,
                width,
                cap,
            } => {
                assert_abs_diff_eq!(start[0], 1.0, epsilon = 1e-12);
                assert_abs_diff_eq!(end[0], 2.0, epsilon = 1e-12);
                assert_abs_diff_eq!(width, 0.010, epsilon = 1e-12);
                assert_eq!(cap, LineCap::Round);
            }
            ref other => panic!("expected line, got {other:?}"),
        }
    }

    #[test]
    fn test_coordinates_persist_between_commands() {
        let out = run(&format!(
            "{HEADER}D10*X010000Y020000D02*X030000D01*Y040000D01*M02*"
        ))
        .unwrap();
        assert_eq!(out.program.len(), 2);
        let Shape::Line { start, end, .. } = out.program.items()[1].shape else {
            panic!("expected line");
        };
        assert_abs_diff_eq!(start[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(start[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(end[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(end[1], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_undefined_aperture_is_fatal() {
        let err = run(&format!("{HEADER}D10*X0Y0D03*D11*X010000D03*M02*")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ApertureNotDefined { id: 11 });
        assert_eq!(err.command, "D11");
        // %, FS, %, %, MO, %, %, AD, %, D10, X0Y0D03, D11
        assert_eq!(err.position, 11);
    }

    #[test]
    fn test_undefined_macro_is_fatal() {
        let err = run("%ADD10NOPE,1*%").unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::MacroNotDefined {
                name: "NOPE".into()
            }
        );
    }

    #[test]
    fn test_unterminated_extended_block() {
        let err = run("G01*%FSLAX24Y24*").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedExtendedBlock);
        assert_eq!(err.position, 1);
    }

    #[test]
    fn test_everything_after_stop_is_ignored() {
        let out = run(&format!("{HEADER}D10*X0Y0D03*M02*X010000D03*%FSLA")).unwrap();
        assert!(out.stopped);
        assert_eq!(out.program.len(), 1);
    }

    #[test]
    fn test_polarity_applies_to_later_items() {
        let out = run(&format!(
            "{HEADER}D10*X0Y0D03*%LPC*%X010000D03*%LPD*%X020000D03*M02*"
        ))
        .unwrap();
        let polarities: Vec<_> = out.program.items().iter().map(|i| i.polarity).collect();
        assert_eq!(
            polarities,
            vec![Polarity::Dark, Polarity::Clear, Polarity::Dark]
        );
    }

    #[test]
    fn test_millimeter_program() {
        let out = run("%FSLAX33Y33*%%MOMM*%%ADD10C,0.254*%D10*X25400Y0D03*M02*").unwrap();
        let Shape::Circle { center, diameter } = out.program.items()[0].shape else {
            panic!("expected circle");
        };
        assert_abs_diff_eq!(center[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(diameter, 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_deprecated_unit_codes() {
        let out = run("%FSLAX33Y33*%%ADD10C,0.1*%G71*D10*X25400Y0D03*G70*X1000D03*M02*").unwrap();
        let centers: Vec<f64> = out
            .program
            .items()
            .iter()
            .map(|i| match i.shape {
                Shape::Circle { center, .. } => center[0],
                _ => f64::NAN,
            })
            .collect();
        assert_abs_diff_eq!(centers[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(centers[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_region_with_move_and_close() {
        let out = run(&format!(
            "{HEADER}G36*X0Y0D02*X010000D01*Y010000D01*X0D01*Y0D01*G37*M02*"
        ))
        .unwrap();
        assert_eq!(out.program.len(), 1);
        let Shape::Region(path) = &out.program.items()[0].shape else {
            panic!("expected region");
        };
        assert_eq!(path.contours.len(), 1);
        let b = out.program.bounds();
        assert_abs_diff_eq!(b.maxx, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b.maxy, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_region_arc_needs_no_aperture() {
        let out = run(
            "%FSLAX24Y24*%G75*G36*X010000Y0D02*G03*X010000Y0I-010000J0D01*G37*M02*",
        )
        .unwrap();
        assert!(out.warnings.is_empty());
        assert_eq!(out.program.len(), 1);
        let b = out.program.bounds();
        assert_abs_diff_eq!(b.minx, -1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(b.maxy, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_region_warnings() {
        let out = run("G37*G36*X0Y0D02*").unwrap();
        let kinds: Vec<_> = out.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![WarningKind::RegionNotOpen, WarningKind::UnclosedRegion]
        );
        assert_eq!(out.warnings[1].position, 1);
        assert!(out.program.is_empty());
        assert!(!out.stopped);
    }

    #[test]
    fn test_circular_draw_pie_and_stroke() {
        let src = format!(
            "{HEADER}D10*G75*X010000Y0D02*G03*X0Y010000I-010000J0D01*M02*"
        );
        let pie = run(&src).unwrap();
        let Shape::Arc {
            center,
            radius,
            start_angle,
            sweep,
            style,
        } = pie.program.items()[0].shape
        else {
            panic!("expected arc");
        };
        assert_abs_diff_eq!(center[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(radius, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(start_angle, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(sweep, 90.0, epsilon = 1e-9);
        assert_eq!(style, ArcStyle::Pie);

        let stroked = interpret(
            &tokenize(&src),
            ParseOptions {
                stroke_circular_draws: true,
            },
        )
        .unwrap();
        assert!(matches!(
            stroked.program.items()[0].shape,
            Shape::Arc { style: ArcStyle::Stroke { width }, .. } if (width - 0.01).abs() < 1e-12
        ));
    }

    #[test]
    fn test_full_circle_draw() {
        let out = run(&format!(
            "{HEADER}D10*G75*X010000Y0D02*G02*I-010000J0D01*M02*"
        ))
        .unwrap();
        let Shape::Arc { sweep, .. } = out.program.items()[0].shape else {
            panic!("expected arc");
        };
        assert_abs_diff_eq!(sweep, -360.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unknown_commands_warn() {
        let out = run("%FSLAX24Y24*%%TF.FileFunction,Copper*%G99*M77*Z5*%ASAXBY*%M02*").unwrap();
        let kinds: Vec<_> = out.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::UnknownCommand; 4]);
        assert!(out.stopped);
    }

    #[test]
    fn test_macro_flash_and_warnings() {
        let src = "%FSLAX24Y24*%%MOIN*%\
                   %AMPAD*0 pad with hole*21,1,$1,$2,0,0,0*1,0,$3,0,0*7,0,0,0.8,0.5,0.1,45*%\
                   %ADD20PAD,0.4X0.2X0.1*%D20*X010000Y010000D03*D20*X0Y0D01*M02*";
        let out = run(src).unwrap();
        assert_eq!(out.program.len(), 2);
        assert_eq!(out.program.items()[1].polarity, Polarity::Clear);
        let kinds: Vec<_> = out.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![
                WarningKind::UnsupportedPrimitive,
                WarningKind::UnsupportedInterpolationAperture
            ]
        );
    }

    #[test]
    fn test_single_quadrant_is_default() {
        assert_eq!(GraphicsState::default().quadrant, QuadrantMode::Single);
        // Unsigned offsets, sign chosen from the travel direction
        let out = run(&format!(
            "{HEADER}D10*X010000Y0D02*G03*X0Y010000I010000J0D01*M02*"
        ))
        .unwrap();
        let Shape::Arc { center, sweep, .. } = out.program.items()[0].shape else {
            panic!("expected arc");
        };
        assert_abs_diff_eq!(center[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(center[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sweep, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_malformed_coordinate_is_fatal() {
        let err = run("%FSLAX24Y24*%X1.5Y0D02*").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedNumber("1.5".into()));
        assert_eq!(err.command, "X1.5Y0D02");
    }
}
