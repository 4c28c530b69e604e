//! Shape primitives and their flattening into vertex loops.

pub mod path;
pub mod shape;

pub use path::{Contour, RegionBuilder, RegionPath, Segment};
pub use shape::{rotate_point, ArcStyle, LineCap, Shape};
