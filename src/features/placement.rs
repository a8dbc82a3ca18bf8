use serde::{Deserialize, Serialize};

pub const DEFAULT_OFFSET: f64 = 40.0;

/// Offset of the signature from the top-left of the page preview.
/// The overlay and the compositor both read this value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            x: DEFAULT_OFFSET,
            y: DEFAULT_OFFSET,
        }
    }
}

impl Placement {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Accumulates a drag-end delta. No clamping, no snapping.
    pub fn apply_drag(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }
}
