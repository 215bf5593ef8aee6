//! Persisted focus point.

use serde::{Deserialize, Serialize};

/// Last focus point that produced a lock or a decode.
///
/// Coordinates are normalised to the viewport, `0.0..=1.0` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusSession {
    /// Horizontal position.
    pub last_x: f32,
    /// Vertical position.
    pub last_y: f32,
    /// Whether a point has ever been saved.
    pub has_saved: bool,
}

impl FocusSession {
    /// A saved session at the given normalised point.
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            last_x: x.clamp(0.0, 1.0),
            last_y: y.clamp(0.0, 1.0),
            has_saved: true,
        }
    }

    /// The saved point, if there is one
    pub fn point(&self) -> Option<(f32, f32)> {
        self.has_saved.then_some((self.last_x, self.last_y))
    }
}

impl Default for FocusSession {
    fn default() -> Self {
        Self {
            last_x: 0.5,
            last_y: 0.5,
            has_saved: false,
        }
    }
}
