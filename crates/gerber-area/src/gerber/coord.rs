use log::warn;
use serde::Serialize;

use crate::error::ErrorKind;

pub const MM_PER_INCH: f64 = 25.4;

/// Which zeros a coordinate digit string leaves out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZeroOmission {
    #[default]
    Leading,
    /// Deprecated. Digits missing on the right are restored before scaling.
    Trailing,
}

/// Unit system from the %MO command (or the deprecated G70/G71).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Inch,
    Millimeter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Coordinate format from the %FS (Format Specification) command plus the
/// unit from %MO.
///
/// Example: `%FSLAX24Y24*%` means leading-zero omission, absolute notation,
/// 2 integer digits + 4 decimal digits for both X and Y.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateFormat {
    pub zero_omission: ZeroOmission,
    pub x_integer: u8,
    pub x_decimal: u8,
    pub y_integer: u8,
    pub y_decimal: u8,
    pub unit: Unit,
}

impl Default for CoordinateFormat {
    fn default() -> Self {
        // Legacy 2.3 inch format, used until a %FS arrives
        Self {
            zero_omission: ZeroOmission::Leading,
            x_integer: 2,
            x_decimal: 3,
            y_integer: 2,
            y_decimal: 3,
            unit: Unit::Inch,
        }
    }
}

impl CoordinateFormat {
    /// Apply a %FS body such as `FSLAX24Y24` or `FSTAX35Y35`.
    ///
    /// An axis that is not mentioned keeps its current digit counts.
    pub fn apply_format_spec(&mut self, body: &str) -> Result<(), ErrorKind> {
        let spec = body
            .strip_prefix("FS")
            .ok_or_else(|| ErrorKind::MalformedCommand(format!("FS: not a format spec: {body}")))?;
        let mut chars = spec.chars().peekable();

        self.zero_omission = match chars.next() {
            Some('L') | Some('D') => ZeroOmission::Leading,
            Some('T') => ZeroOmission::Trailing,
            other => {
                return Err(ErrorKind::MalformedCommand(format!(
                    "FS: bad zero omission flag {other:?}"
                )))
            }
        };
        // Absolute/incremental notation; only absolute is interpreted.
        if let Some(&notation @ ('A' | 'I')) = chars.peek() {
            chars.next();
            if notation == 'I' {
                warn!("Gerber: incremental notation is not supported, treating as absolute");
            }
        }

        let rest: String = chars.collect();
        if let Some((int, dec)) = axis_digits(&rest, 'X')? {
            self.x_integer = int;
            self.x_decimal = dec;
        }
        if let Some((int, dec)) = axis_digits(&rest, 'Y')? {
            self.y_integer = int;
            self.y_decimal = dec;
        }
        Ok(())
    }

    /// Decode a coordinate digit string for one axis into inches.
    pub fn decode_axis(&self, digits: &str, axis: Axis) -> Result<f64, ErrorKind> {
        let (int_digits, frac_digits) = match axis {
            Axis::X => (self.x_integer, self.x_decimal),
            Axis::Y => (self.y_integer, self.y_decimal),
        };
        decode(digits, int_digits, frac_digits, self)
    }
}

/// Read the two single-digit counts after `key`, e.g. `X24` -> (2, 4).
fn axis_digits(s: &str, key: char) -> Result<Option<(u8, u8)>, ErrorKind> {
    let Some(pos) = s.find(key) else {
        return Ok(None);
    };
    let mut digits = s[pos + 1..].chars().map(|c| c.to_digit(10));
    match (digits.next(), digits.next()) {
        (Some(Some(int)), Some(Some(dec))) => Ok(Some((int as u8, dec as u8))),
        _ => Err(ErrorKind::MalformedCommand(format!(
            "FS: bad {key} digit counts in: {s}"
        ))),
    }
}

/// Convert a fixed-point digit string (no decimal point, optional sign) into
/// inches.
///
/// With trailing-zero omission the value is first multiplied by
/// `10^(int_digits + frac_digits - digit_count)` to restore the digits that
/// were left out on the right.
pub fn decode(
    digits: &str,
    int_digits: u8,
    frac_digits: u8,
    format: &CoordinateFormat,
) -> Result<f64, ErrorKind> {
    let unsigned = digits.strip_prefix(['+', '-']).unwrap_or(digits);
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ErrorKind::MalformedNumber(digits.to_string()));
    }
    let mut value: f64 = digits
        .parse()
        .map_err(|_| ErrorKind::MalformedNumber(digits.to_string()))?;

    if format.zero_omission == ZeroOmission::Trailing {
        let missing = i32::from(int_digits) + i32::from(frac_digits) - unsigned.len() as i32;
        value *= 10f64.powi(missing);
    }
    value /= 10f64.powi(i32::from(frac_digits));

    Ok(match format.unit {
        Unit::Inch => value,
        Unit::Millimeter => value / MM_PER_INCH,
    })
}
