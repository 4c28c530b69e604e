//! Turning interpreted draw/flash operations into board shapes.

pub mod arc;
pub mod flash;
pub mod interpolate;

pub use arc::{resolve_arc, ArcDirection, ArcGeometry, QuadrantMode};
