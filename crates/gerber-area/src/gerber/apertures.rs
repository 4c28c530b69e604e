use std::collections::HashMap;

use log::debug;

use crate::error::{ErrorKind, WarningKind};

use super::coord::{Unit, MM_PER_INCH};
use super::macros::{self, Macro, MacroPrimitive};

/// The four built-in aperture templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardKind {
    Circle,
    Rectangle,
    Obround,
    Polygon,
}

impl StandardKind {
    fn from_letter(s: &str) -> Option<Self> {
        Some(match s {
            "C" => Self::Circle,
            "R" => Self::Rectangle,
            "O" => Self::Obround,
            "P" => Self::Polygon,
            _ => return None,
        })
    }

    /// Whether modifier `index` is a length (as opposed to a count or angle).
    fn is_length(self, index: usize) -> bool {
        match self {
            Self::Polygon => index == 0 || index == 3,
            _ => true,
        }
    }

    /// Index of the optional hole diameter among the modifiers.
    pub fn hole_index(self) -> usize {
        match self {
            Self::Circle => 1,
            Self::Rectangle | Self::Obround => 2,
            Self::Polygon => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandardAperture {
    pub kind: StandardKind,
    /// Sizes in inches, as listed after the comma in %AD.
    pub modifiers: Vec<f64>,
}

impl StandardAperture {
    pub fn hole_diameter(&self) -> Option<f64> {
        self.modifiers.get(self.kind.hole_index()).copied()
    }
}

/// An entry of the aperture library.
#[derive(Debug, Clone, PartialEq)]
pub enum Aperture {
    Standard(StandardAperture),
    /// A macro instantiated with its %AD modifiers.
    Macro {
        name: String,
        primitives: Vec<MacroPrimitive>,
    },
}

impl Aperture {
    /// Stroke width when the aperture is dragged along a path: the first
    /// modifier of a standard aperture. Macro apertures have none.
    pub fn primary_size(&self) -> Option<f64> {
        match self {
            Aperture::Standard(std) => std.modifiers.first().copied(),
            Aperture::Macro { .. } => None,
        }
    }
}

/// A parsed %AD body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApertureDefinition {
    pub id: u32,
    pub type_spec: String,
    pub modifiers: Vec<f64>,
}

/// Parse an %AD body such as `ADD10C,0.020` or `ADD12RECT1,0.4X0.3`.
///
/// Modifiers are returned as written; unit conversion is up to the caller.
pub fn parse_definition(body: &str) -> Result<ApertureDefinition, ErrorKind> {
    let s = body
        .strip_prefix("ADD")
        .ok_or_else(|| ErrorKind::MalformedCommand(format!("AD: expected ADD, got: {body}")))?;

    let type_pos = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| ErrorKind::MalformedCommand(format!("AD: no template type in: {body}")))?;
    let id: u32 = s[..type_pos]
        .parse()
        .map_err(|_| ErrorKind::MalformedCommand(format!("AD: bad aperture code: {body}")))?;
    if id < 10 {
        return Err(ErrorKind::MalformedCommand(format!(
            "AD: aperture codes start at D10: {body}"
        )));
    }

    let rest = &s[type_pos..];
    let (type_spec, params) = match rest.split_once(',') {
        Some((t, p)) => (t, p),
        None => (rest, ""),
    };
    if type_spec.is_empty() {
        return Err(ErrorKind::MalformedCommand(format!(
            "AD: empty template name: {body}"
        )));
    }

    let modifiers = if params.is_empty() {
        Vec::new()
    } else {
        params
            .split('X')
            .map(|p| {
                p.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| ErrorKind::MalformedNumber(p.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(ApertureDefinition {
        id,
        type_spec: type_spec.to_string(),
        modifiers,
    })
}

/// Macro definitions and the aperture table built from %AM and %AD.
#[derive(Debug, Default)]
pub struct ApertureLibrary {
    macros: HashMap<String, Macro>,
    apertures: HashMap<u32, Aperture>,
}

impl ApertureLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a macro body. A later definition with the same name replaces it.
    pub fn define_macro(&mut self, name: impl Into<String>, lines: Vec<String>) {
        let name = name.into();
        debug!("Gerber: macro {name} defined with {} lines", lines.len());
        self.macros.insert(name.clone(), Macro { name, lines });
    }

    /// Define aperture `id`.
    ///
    /// A one-letter `type_spec` names a standard template; anything else is
    /// a macro name, instantiated now. Lengths are given in `unit` and stored
    /// in inches. Returns the warnings raised by macro lines that had to be
    /// skipped.
    pub fn define_aperture(
        &mut self,
        id: u32,
        type_spec: &str,
        modifiers: Vec<f64>,
        unit: Unit,
    ) -> Result<Vec<WarningKind>, ErrorKind> {
        let scale = match unit {
            Unit::Inch => 1.0,
            Unit::Millimeter => 1.0 / MM_PER_INCH,
        };
        if self.apertures.contains_key(&id) {
            return Err(ErrorKind::ApertureRedefined { id });
        }

        let (aperture, warnings) = match StandardKind::from_letter(type_spec) {
            Some(kind) => {
                validate_standard(kind, &modifiers)?;
                let modifiers = modifiers
                    .into_iter()
                    .enumerate()
                    .map(|(i, m)| if kind.is_length(i) { m * scale } else { m })
                    .collect();
                (Aperture::Standard(StandardAperture { kind, modifiers }), Vec::new())
            }
            None => {
                let mac = self
                    .macros
                    .get(type_spec)
                    .ok_or_else(|| ErrorKind::MacroNotDefined {
                        name: type_spec.to_string(),
                    })?;
                let (primitives, warnings) = macros::expand(mac, &modifiers);
                let primitives = primitives.into_iter().map(|p| p.scaled(scale)).collect();
                (
                    Aperture::Macro {
                        name: mac.name.clone(),
                        primitives,
                    },
                    warnings,
                )
            }
        };

        self.apertures.insert(id, aperture);
        Ok(warnings)
    }

    pub fn lookup(&self, id: u32) -> Result<&Aperture, ErrorKind> {
        self.apertures
            .get(&id)
            .ok_or(ErrorKind::ApertureNotDefined { id })
    }
}

/// Vertex counts RS-274X allows for the P template.
pub const POLYGON_VERTICES: std::ops::RangeInclusive<f64> = 3.0..=12.0;

fn validate_standard(kind: StandardKind, modifiers: &[f64]) -> Result<(), ErrorKind> {
    let needed = match kind {
        StandardKind::Circle => 1,
        _ => 2,
    };
    if modifiers.len() < needed {
        return Err(ErrorKind::MalformedCommand(format!(
            "AD {kind:?}: need at least {needed} modifiers, got {}",
            modifiers.len()
        )));
    }
    if kind == StandardKind::Polygon && !POLYGON_VERTICES.contains(&modifiers[1].round()) {
        return Err(ErrorKind::MalformedCommand(format!(
            "AD polygon: vertex count must be 3 to 12, got {}",
            modifiers[1]
        )));
    }
    Ok(())
}
