use serde::Serialize;

use crate::geometry::Shape;
use crate::gerber::coord::Unit;
use crate::types::{BBox, Polarity};

/// One shape of a layer together with the polarity it was drawn in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawItem {
    pub shape: Shape,
    pub polarity: Polarity,
}

/// The interpreted layer: draw items in program order plus their running
/// bounds. Lengths are always inches.
///
/// Items are only ever appended; order matters because clear items remove
/// area from everything drawn before them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoardProgram {
    items: Vec<DrawItem>,
    bounds: BBox,
}

impl BoardProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, shape: Shape, polarity: Polarity) {
        self.bounds.expand_bbox(&shape.bounds());
        self.items.push(DrawItem { shape, polarity });
    }

    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    /// Union of the bounds of every item, clear ones included.
    pub fn bounds(&self) -> BBox {
        self.bounds
    }

    pub fn unit(&self) -> Unit {
        Unit::Inch
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
