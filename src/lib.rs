//=========================================================================
// Aetheric Animator — Library Root
//
// Threaded vector-animation player: loads an animation file, drives its
// state machine or timeline on a render thread, recovers from graphics
// device loss, and presents into a visual the host composites.
//
// Responsibilities:
// - Expose the host-facing facade (`Engine`, `EngineBuilder`)
// - Expose the scene backend seam (`core::scene`) for custom file formats
// - Expose device providers and the winit host shell (`platform`)
//
// Typical usage:
// ```no_run
// use std::sync::Arc;
// use aetheric_animator::platform::{EngineShell, ShellDriver};
// use aetheric_animator::Engine;
//
// let engine = Arc::new(Engine::new());
// engine.load_file("clip.riv");
// ShellDriver::new(EngineShell::new(engine)).run().ok();
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` holds the platform-independent engine: render loop, coordinate
// mapping, input queue and scene control.
//
// `platform` holds device providers, presentation, drawing and the host
// shell driver.
//
pub mod core;
pub mod error;
pub mod platform;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------
//
// `engine` defines the facade and its builder, re-exported below.
//
mod engine;

//--- Public Exports ------------------------------------------------------

pub use engine::{Engine, EngineBuilder};
pub use error::EngineError;
