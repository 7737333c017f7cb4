//=========================================================================
// Scene System
//=========================================================================
//
// Loaded content and the one scene driving it.
//
// Architecture:
//   SceneController
//     ├─ file:       Box<dyn SceneFile>      (imported bytes)
//     ├─ artboard:   Box<dyn Artboard>       (default artboard instance)
//     ├─ scene:      ActiveScene             (state machine | animation | static)
//     └─ view_model: ViewModelHandle         (bound to artboard and scene)
//
// Flow:
//   SceneBackend::import() → SceneFile::default_artboard()
//     → Artboard::state_machine_at() | animation_at() | static fallback
//
// The backend traits are the seam to a vector-animation runtime. The
// crate ships a JSON motion-document backend (`document`) and a
// `NullBackend` for hosts that render nothing.
//
//=========================================================================

//=== External Dependencies ===============================================

use kurbo::{Point, Rect};

//=== Internal Dependencies ===============================================

use crate::error::SceneError;
use crate::platform::canvas::Canvas;

//=== Module Declarations =================================================

mod controller;
pub mod document;
pub mod view_model;

#[cfg(test)]
pub(crate) mod testing;

//=== Public API ==========================================================

pub use controller::{ActiveScene, PlaybackState, SceneController};
pub use document::DocumentBackend;
pub use view_model::{
    PropertyKind, PropertyValue, ViewModelHandle, ViewModelInstance, ViewModelProperty,
    ViewModelPropertyInfo,
};

//=== Descriptors =========================================================

/// One state machine of the loaded artboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMachineInfo {
    pub name: String,
    pub index: usize,
    pub is_default: bool,
}

/// Declared type of a state-machine input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Boolean,
    Number,
    Trigger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMachineInputInfo {
    pub name: String,
    pub kind: InputKind,
}

/// Which variant of scene is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneKind {
    StateMachine,
    Animation,
    Static,
}

//=== Backend Traits ======================================================

/// Imports raw file bytes into a scene file.
pub trait SceneBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn import(&self, bytes: &[u8]) -> Result<Box<dyn SceneFile>, SceneError>;
}

/// An imported file.
pub trait SceneFile: Send {
    fn artboard_count(&self) -> usize;

    /// Fresh instance of the file's default artboard.
    fn default_artboard(&self) -> Option<Box<dyn Artboard>>;

    fn view_model_count(&self) -> usize {
        0
    }

    /// Default instance of view model `index`.
    fn instantiate_view_model(&self, _index: usize) -> Option<ViewModelInstance> {
        None
    }
}

/// A live artboard: drawable content with animations and state machines.
pub trait Artboard: Send {
    fn name(&self) -> &str;

    /// Artboard-space bounds used for fit and alignment.
    fn bounds(&self) -> Rect;

    fn animation_count(&self) -> usize;
    fn animation_name_at(&self, index: usize) -> Option<String>;
    fn animation_at(&self, index: usize) -> Option<Box<dyn SceneInstance>>;

    fn state_machine_count(&self) -> usize;
    fn state_machine_name_at(&self, index: usize) -> Option<String>;
    fn state_machine_at(&self, index: usize) -> Option<Box<dyn SceneInstance>>;

    /// Author-designated default state machine, if any.
    fn default_state_machine_index(&self) -> Option<usize> {
        None
    }

    /// View model the artboard declares, if any.
    fn view_model_index(&self) -> Option<usize> {
        None
    }

    fn bind_view_model_instance(&mut self, _view_model: ViewModelHandle) {}

    /// Draws the current pose in artboard space.
    fn draw(&self, canvas: &mut dyn Canvas);
}

/// A playable scene bound to the artboard it was created from.
///
/// Pointer positions are in artboard space.
pub trait SceneInstance: Send {
    fn name(&self) -> &str;

    /// Advances by `elapsed` seconds and applies the result to the artboard.
    /// Returns false once a non-looping scene has settled.
    fn advance_and_apply(&mut self, elapsed: f32) -> bool;

    fn bind_view_model_instance(&mut self, _view_model: ViewModelHandle) {}

    fn bound_view_model(&self) -> Option<&ViewModelHandle> {
        None
    }

    fn pointer_move(&mut self, _position: Point, _is_down: bool) {}
    fn pointer_down(&mut self, _position: Point) {}
    fn pointer_up(&mut self, _position: Point) {}

    fn inputs(&self) -> Vec<StateMachineInputInfo> {
        Vec::new()
    }

    fn set_boolean_input(&mut self, _name: &str, _value: bool) -> bool {
        false
    }

    fn set_number_input(&mut self, _name: &str, _value: f64) -> bool {
        false
    }

    fn fire_trigger(&mut self, _name: &str) -> bool {
        false
    }

    fn boolean_input(&self, _name: &str) -> Option<bool> {
        None
    }

    fn number_input(&self, _name: &str) -> Option<f64> {
        None
    }

    /// Name of the current state, for state machines.
    fn current_state(&self) -> Option<String> {
        None
    }
}

//=== NullBackend =========================================================

/// Backend that can import nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

impl SceneBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn import(&self, _bytes: &[u8]) -> Result<Box<dyn SceneFile>, SceneError> {
        Err(SceneError::BackendUnavailable(self.name()))
    }
}
