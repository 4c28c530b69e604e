use serde::Serialize;
use thiserror::Error;

/// What went wrong, without the command context.
///
/// Helpers below the interpreter (coordinate decoding, the aperture library)
/// return this directly; the interpreter wraps it into a [`GerberError`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    #[error("malformed number: {0:?}")]
    MalformedNumber(String),

    #[error("aperture D{id} is not defined")]
    ApertureNotDefined { id: u32 },

    #[error("aperture macro {name:?} is not defined")]
    MacroNotDefined { name: String },

    #[error("aperture D{id} is already defined")]
    ApertureRedefined { id: u32 },

    #[error("malformed command: {0}")]
    MalformedCommand(String),

    #[error("extended command block is never closed")]
    UnterminatedExtendedBlock,
}

/// A fatal parse failure. Aborts the pass.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} (command {command:?} at token {position})")]
pub struct GerberError {
    pub kind: ErrorKind,
    /// Raw text of the offending token.
    pub command: String,
    /// Index of the offending token in the token stream.
    pub position: usize,
}

impl GerberError {
    pub fn new(kind: ErrorKind, command: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            command: command.into(),
            position,
        }
    }
}

/// Non-fatal conditions. The affected geometry is omitted and parsing continues.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningKind {
    #[error("unsupported macro primitive")]
    UnsupportedPrimitive,
    #[error("unsupported macro equation")]
    UnsupportedMacroEquation,
    #[error("aperture cannot be used for interpolation")]
    UnsupportedInterpolationAperture,
    #[error("unknown command")]
    UnknownCommand,
    #[error("malformed macro primitive line")]
    MalformedMacroLine,
    #[error("region end without region start")]
    RegionNotOpen,
    #[error("input ended inside a region")]
    UnclosedRegion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub command: String,
    pub position: usize,
}

impl Warning {
    pub fn new(kind: WarningKind, command: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            command: command.into(),
            position,
        }
    }
}

/// Failures of the board-area compositor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error("a composite pass is already running for this board")]
    Busy,

    #[error("composite pass was cancelled")]
    Cancelled,

    #[error("composite worker panicked")]
    WorkerPanicked,
}
