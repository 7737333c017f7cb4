//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use aetheric_animator::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine facade
pub use crate::engine::{Engine, EngineBuilder};
pub use crate::error::{DeviceError, EngineError, SceneError};

// Render loop
pub use crate::core::FrameOutcome;

// Input
pub use crate::core::input::{InputEvent, PointerKind};

// Scenes
pub use crate::core::scene::{
    DocumentBackend, InputKind, NullBackend, PropertyKind, SceneBackend, SceneKind,
    StateMachineInfo, StateMachineInputInfo, ViewModelPropertyInfo,
};

// Platform
pub use crate::platform::{
    Color, DeviceFactory, EngineShell, FrameSnapshot, HostShell, ShellDriver,
    SoftwareDeviceFactory, VisualHandle,
};
