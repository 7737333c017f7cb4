//=========================================================================
// Input System
//
// Pointer input pipeline between the host thread and the render thread.
//
// Responsibilities:
// - Define the pointer event type (`event`)
// - Queue events across the thread boundary (`queue`)
// - Track button state across drained events (`PointerTracker`)
//
// Notes:
// The tracker lives on the render thread next to the scene it feeds. It
// resolves each event into the move/down/up calls a scene expects,
// remembering whether the button is held so a Move between Press and
// Release still reports "down".
//
//=========================================================================

//=== Submodules ==========================================================

pub mod event;
pub mod queue;

//=== Public Exports ======================================================

pub use event::{InputEvent, PointerKind};
pub use queue::InputEventQueue;

//=== PointerAction =======================================================

/// What a scene should be told for one event, after state tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerAction {
    pub kind: PointerKind,
    /// Button state after applying this event.
    pub is_down: bool,
}

//=== PointerTracker ======================================================

/// Remembers the last known pointer-down state.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerTracker {
    down: bool,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_down(&self) -> bool {
        self.down
    }

    /// Applies one event and returns the resolved action.
    pub fn track(&mut self, kind: PointerKind) -> PointerAction {
        match kind {
            PointerKind::Press => self.down = true,
            PointerKind::Release => self.down = false,
            PointerKind::Move => {}
        }
        PointerAction { kind, is_down: self.down }
    }

    /// Forgets button state (e.g. when the scene is replaced).
    pub fn reset(&mut self) {
        self.down = false;
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_between_press_and_release_is_down() {
        let mut tracker = PointerTracker::new();
        assert!(!tracker.track(PointerKind::Move).is_down);
        assert!(tracker.track(PointerKind::Press).is_down);
        assert!(tracker.track(PointerKind::Move).is_down);
        assert!(!tracker.track(PointerKind::Release).is_down);
        assert!(!tracker.track(PointerKind::Move).is_down);
    }

    #[test]
    fn reset_clears_down_state() {
        let mut tracker = PointerTracker::new();
        tracker.track(PointerKind::Press);
        tracker.reset();
        assert!(!tracker.is_down());
    }
}
