use log::debug;

use crate::error::WarningKind;
use crate::types::Point;

/// An aperture macro definition (from %AM...% blocks).
///
/// The body is kept as raw lines; it is only interpreted when an %AD
/// instantiates the macro with concrete modifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub name: String,
    pub lines: Vec<String>,
}

/// Macro primitive codes this reader recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// Code 1
    Circle,
    /// Code 20 (or 2)
    VectorLine,
    /// Code 21
    CenterLine,
    /// Code 4
    Outline,
    /// Code 5
    Polygon,
    /// Code 6
    Moire,
    /// Code 7
    Thermal,
}

impl PrimitiveKind {
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => Self::Circle,
            2 | 20 => Self::VectorLine,
            21 => Self::CenterLine,
            4 => Self::Outline,
            5 => Self::Polygon,
            6 => Self::Moire,
            7 => Self::Thermal,
            _ => return None,
        })
    }

    /// Parameters (after the code) a well-formed line carries at minimum.
    fn min_params(self) -> usize {
        match self {
            Self::Circle => 4,
            Self::VectorLine => 7,
            Self::CenterLine => 5,
            Self::Outline => 2,
            Self::Polygon => 6,
            Self::Moire => 9,
            Self::Thermal => 6,
        }
    }
}

/// A macro primitive with every parameter resolved to a number.
///
/// Offsets are relative to the flash point, before rotation.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroPrimitive {
    Circle {
        exposure: bool,
        diameter: f64,
        center: Point,
        rotation: f64,
    },
    CenterLine {
        exposure: bool,
        width: f64,
        height: f64,
        center: Point,
        rotation: f64,
    },
    Outline {
        exposure: bool,
        vertices: Vec<Point>,
        rotation: f64,
    },
    /// Recognized but produces no geometry when flashed.
    Unsupported(PrimitiveKind),
}

impl MacroPrimitive {
    /// Multiply every length by `factor`; angles and exposure are unchanged.
    pub fn scaled(self, factor: f64) -> Self {
        let scale = |p: Point| [p[0] * factor, p[1] * factor];
        match self {
            MacroPrimitive::Circle {
                exposure,
                diameter,
                center,
                rotation,
            } => MacroPrimitive::Circle {
                exposure,
                diameter: diameter * factor,
                center: scale(center),
                rotation,
            },
            MacroPrimitive::CenterLine {
                exposure,
                width,
                height,
                center,
                rotation,
            } => MacroPrimitive::CenterLine {
                exposure,
                width: width * factor,
                height: height * factor,
                center: scale(center),
                rotation,
            },
            MacroPrimitive::Outline {
                exposure,
                vertices,
                rotation,
            } => MacroPrimitive::Outline {
                exposure,
                vertices: vertices.into_iter().map(scale).collect(),
                rotation,
            },
            unsupported @ MacroPrimitive::Unsupported(_) => unsupported,
        }
    }
}

/// Why a single macro line was skipped.
enum LineError {
    Equation,
    Malformed,
}

impl From<LineError> for WarningKind {
    fn from(e: LineError) -> Self {
        match e {
            LineError::Equation => WarningKind::UnsupportedMacroEquation,
            LineError::Malformed => WarningKind::MalformedMacroLine,
        }
    }
}

/// Instantiate `mac` with the modifiers of an %AD.
///
/// `$n` parameters are replaced by the n-th modifier (1-based). Lines that
/// cannot be instantiated are skipped; each one yields a warning kind.
pub fn expand(mac: &Macro, modifiers: &[f64]) -> (Vec<MacroPrimitive>, Vec<WarningKind>) {
    let mut primitives = Vec::new();
    let mut warnings = Vec::new();

    for line in &mac.lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed == "0" || trimmed.starts_with("0 ") {
            continue;
        }
        if trimmed.starts_with('$') {
            // Variable definition, e.g. "$3=$1x2"
            debug!("Gerber: macro {}: variable assignment not supported: {trimmed}", mac.name);
            warnings.push(WarningKind::UnsupportedMacroEquation);
            continue;
        }
        match instantiate_line(trimmed, modifiers) {
            Ok(prim) => primitives.push(prim),
            Err(e) => {
                let kind = WarningKind::from(e);
                debug!("Gerber: macro {}: skipping line {trimmed:?}: {kind}", mac.name);
                warnings.push(kind);
            }
        }
    }

    (primitives, warnings)
}

fn instantiate_line(line: &str, modifiers: &[f64]) -> Result<MacroPrimitive, LineError> {
    let mut fields = line.split(',');
    let code: u32 = fields
        .next()
        .and_then(|c| c.trim().parse().ok())
        .ok_or(LineError::Malformed)?;
    let kind = PrimitiveKind::from_code(code).ok_or(LineError::Malformed)?;

    let params = fields
        .map(|f| resolve_param(f.trim(), modifiers))
        .collect::<Result<Vec<f64>, _>>()?;
    if params.len() < kind.min_params() {
        return Err(LineError::Malformed);
    }

    let exposure = params[0] != 0.0;
    Ok(match kind {
        PrimitiveKind::Circle => MacroPrimitive::Circle {
            exposure,
            diameter: params[1],
            center: [params[2], params[3]],
            rotation: params.get(4).copied().unwrap_or(0.0),
        },
        PrimitiveKind::CenterLine => MacroPrimitive::CenterLine {
            exposure,
            width: params[1],
            height: params[2],
            center: [params[3], params[4]],
            rotation: params.get(5).copied().unwrap_or(0.0),
        },
        PrimitiveKind::Outline => {
            // n segments means n + 1 points, the last repeating the first
            let n = params[1];
            if n < 1.0 || n.fract() != 0.0 || n > params.len() as f64 {
                return Err(LineError::Malformed);
            }
            let end = (n as usize)
                .checked_add(1)
                .and_then(|count| count.checked_mul(2))
                .and_then(|len| len.checked_add(2))
                .ok_or(LineError::Malformed)?;
            let coords = params.get(2..end).ok_or(LineError::Malformed)?;
            MacroPrimitive::Outline {
                exposure,
                vertices: coords.chunks_exact(2).map(|c| [c[0], c[1]]).collect(),
                rotation: params.get(end).copied().unwrap_or(0.0),
            }
        }
        other => MacroPrimitive::Unsupported(other),
    })
}

/// Resolve one parameter field: a literal or a bare `$n` reference.
fn resolve_param(field: &str, modifiers: &[f64]) -> Result<f64, LineError> {
    if let Some(index) = field.strip_prefix('$') {
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LineError::Equation);
        }
        let n: usize = index.parse().map_err(|_| LineError::Malformed)?;
        return n
            .checked_sub(1)
            .and_then(|i| modifiers.get(i))
            .copied()
            .ok_or(LineError::Malformed);
    }
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err(LineError::Malformed),
        Err(_) if is_expression(field) => Err(LineError::Equation),
        Err(_) => Err(LineError::Malformed),
    }
}

/// Arithmetic in macro parameters uses `x`/`X` for multiplication.
fn is_expression(field: &str) -> bool {
    let body = field.strip_prefix(['+', '-']).unwrap_or(field);
    body.contains(['$', 'x', 'X', '+', '-', '/', '(', ')'])
}
