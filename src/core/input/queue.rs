//=========================================================================
// Input Event Queue
//
// Thread-safe FIFO between the host thread (producer) and the render
// thread (sole consumer).
//
// Responsibilities:
// - Accept pointer events from any thread without blocking or dropping
// - Hand the render thread everything queued so far, in order, once
// - Discard queued events outright when no scene is bound, so input aimed
//   at content that is gone is never replayed against what loads next
//
// Notes:
// Unlike a per-frame input buffer, nothing is coalesced or deduplicated:
// a Move between a Press and a Release carries meaning for hit-testing.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

//=== External Crates =====================================================

use log::trace;

//=== Internal Modules ====================================================

use super::event::InputEvent;

//=== InputEventQueue =====================================================

pub struct InputEventQueue {
    events: Mutex<VecDeque<InputEvent>>,
}

impl InputEventQueue {
    //--- Construction -----------------------------------------------------
    //
    // Preallocates for a burst of pointer traffic between two frames.
    //
    pub fn new() -> Self {
        const BASE_CAPACITY: usize = 64;

        Self {
            events: Mutex::new(VecDeque::with_capacity(BASE_CAPACITY)),
        }
    }

    //--- Producer Side ----------------------------------------------------

    /// Appends an event. Callable from any thread.
    pub fn push(&self, event: InputEvent) {
        self.lock().push_back(event);
    }

    //--- Consumer Side ----------------------------------------------------

    /// Empties the queue in one step.
    ///
    /// Returns the events in production order when `scene_bound` is true;
    /// otherwise the events are dropped and an empty vector is returned.
    pub fn drain_all(&self, scene_bound: bool) -> Vec<InputEvent> {
        let drained = std::mem::take(&mut *self.lock());

        if scene_bound {
            drained.into()
        } else {
            if !drained.is_empty() {
                trace!(target: "input", "Discarding {} stale pointer events", drained.len());
            }
            Vec::new()
        }
    }

    //--- Utilities --------------------------------------------------------

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<InputEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InputEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
