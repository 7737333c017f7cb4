//=========================================================================
// Pointer Event Types
//
// Defines the engine's representation of pointer input.
//
// Events are produced on the host thread in render-surface coordinates
// and consumed exactly once on the render thread, in production order.
//
// Event Flow:
// ```text
// Host Shell (window / control)
//         ↓
//    InputEvent (this module)
//         ↓
//    InputEventQueue (thread-safe FIFO)
//         ↓
//    PointerTracker → CoordinateMapper → active scene
// ```
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::time::Instant;

//=== External Crates =====================================================

use kurbo::Point;

//=== PointerKind =========================================================

/// What the pointer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    /// Pointer moved (button state unchanged).
    Move,

    /// Primary button went down.
    Press,

    /// Primary button went up.
    Release,
}

//=== InputEvent ==========================================================

/// Immutable pointer event in render-surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEvent {
    pub kind: PointerKind,
    pub x: f32,
    pub y: f32,
    pub timestamp: Instant,
}

impl InputEvent {
    pub fn new(kind: PointerKind, x: f32, y: f32) -> Self {
        Self { kind, x, y, timestamp: Instant::now() }
    }

    pub fn moved(x: f32, y: f32) -> Self {
        Self::new(PointerKind::Move, x, y)
    }

    pub fn pressed(x: f32, y: f32) -> Self {
        Self::new(PointerKind::Press, x, y)
    }

    pub fn released(x: f32, y: f32) -> Self {
        Self::new(PointerKind::Release, x, y)
    }

    /// Position as a render-space point.
    pub fn position(&self) -> Point {
        Point::new(f64::from(self.x), f64::from(self.y))
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_kind() {
        assert_eq!(InputEvent::moved(1.0, 2.0).kind, PointerKind::Move);
        assert_eq!(InputEvent::pressed(1.0, 2.0).kind, PointerKind::Press);
        assert_eq!(InputEvent::released(1.0, 2.0).kind, PointerKind::Release);
    }

    #[test]
    fn timestamps_are_monotonic() {
        let a = InputEvent::moved(0.0, 0.0);
        let b = InputEvent::moved(0.0, 0.0);
        assert!(b.timestamp >= a.timestamp);
    }

    #[test]
    fn position_widens_to_f64() {
        assert_eq!(InputEvent::pressed(3.5, -2.0).position(), Point::new(3.5, -2.0));
    }
}
