//! Pointer drag handling.
//!
//! Turns press/move/release pointer events (mouse or touch) into viewport pan
//! deltas. Dragging the pointer left moves the viewport right, so the terrain
//! follows the pointer.

/// Drag state of a single pointer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerDrag {
    /// Whether the pointer is held down
    down: bool,
    /// Last pointer position in screen coordinates
    last: (i64, i64),
}

impl PointerDrag {
    /// Create a released pointer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            down: false,
            last: (0, 0),
        }
    }

    /// Pointer pressed at `(x, y)`.
    pub fn press(&mut self, x: i64, y: i64) {
        self.down = true;
        self.last = (x, y);
    }

    /// Pointer moved to `(x, y)`. Returns the viewport pan delta while held.
    pub fn move_to(&mut self, x: i64, y: i64) -> Option<(i64, i64)> {
        if !self.down {
            return None;
        }
        let delta = (self.last.0 - x, self.last.1 - y);
        self.last = (x, y);
        Some(delta)
    }

    /// Pointer released.
    pub fn release(&mut self) {
        self.down = false;
    }

    /// Whether the pointer is held down.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_without_press_is_ignored() {
        let mut drag = PointerDrag::new();
        assert_eq!(drag.move_to(10, 10), None);
    }

    #[test]
    fn test_drag_produces_inverse_deltas() {
        let mut drag = PointerDrag::new();
        drag.press(100, 100);
        assert!(drag.is_dragging());
        assert_eq!(drag.move_to(90, 105), Some((10, -5)));
        assert_eq!(drag.move_to(90, 105), Some((0, 0)));
        drag.release();
        assert!(!drag.is_dragging());
        assert_eq!(drag.move_to(0, 0), None);
    }
}
