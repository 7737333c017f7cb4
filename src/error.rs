//=========================================================================
// Error Taxonomy
//
// Every fallible primitive in the engine reports through one of these
// enums. The host-facing `Engine` converts them into boolean/sentinel
// results at its boundary, so nothing here ever crosses the render/host
// thread boundary as a panic.
//
// Categories:
// - DeviceError   → fatal initialization or transient device loss
// - PresentError  → per-frame presentation outcome
// - SceneError    → content problems (bad path, unreadable blob, ...)
// - EngineError   → lifecycle misuse plus wrapped causes
//
//=========================================================================

//=== External Crates =====================================================

use thiserror::Error;

//=== DeviceError =========================================================

/// Failures reported by a graphics device or its presentation chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The platform could not supply a compatible device. Fatal for the
    /// engine instance that requested it.
    #[error("no compatible graphics device: {0}")]
    NoCompatibleDevice(String),

    /// The device was removed or reset and must be recreated.
    #[error("graphics device lost")]
    Lost,

    /// The presentation chain (or its compositor surface) could not be built.
    #[error("presentation surface creation failed: {0}")]
    SurfaceCreation(String),

    /// In-place buffer resize was rejected by the device.
    #[error("presentation chain resize to {width}x{height} failed")]
    ResizeFailed { width: u32, height: u32 },
}

//=== PresentError ========================================================

/// Outcome of a failed present.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresentError {
    /// Presentation failed because the device went away. The render loop
    /// marks the device lost and recovers on its next iteration.
    #[error("present failed: device lost")]
    DeviceLost,

    /// Any other presentation failure. Logged, never fatal.
    #[error("present failed: {0}")]
    Other(String),
}

//=== SceneError ==========================================================

/// Content errors raised while loading or instantiating a scene file.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The file could not be read from disk.
    #[error("failed to read scene file: {0}")]
    Io(#[from] std::io::Error),

    /// The scene backend rejected the byte blob.
    #[error("unreadable scene file: {0}")]
    Unreadable(String),

    /// The file parsed but names no default artboard.
    #[error("scene file has no default artboard")]
    NoDefaultArtboard,

    /// No animation backend is linked into this engine.
    #[error("scene backend '{0}' cannot load files")]
    BackendUnavailable(&'static str),
}

//=== EngineError =========================================================

/// Errors surfaced by the `try_*` family on [`crate::Engine`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is not initialized")]
    NotInitialized,

    #[error("engine is already initialized")]
    AlreadyInitialized,

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("render thread could not be spawned: {0}")]
    RenderThread(String),
}

//=========================================================================
// Unit Tests
//=========================================================================
