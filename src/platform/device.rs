//=========================================================================
// Device Abstraction
//
// Capability traits that separate the engine from any one graphics API.
//
// Ownership chain:
// ```text
//   DeviceFactory ──create_device()──> GraphicsDevice
//                                          │
//                       create_presentation_chain(w, h)
//                                          ↓
//                                  PresentationChain
//                                   ├─ back_buffer()  (draw target)
//                                   └─ present()      (swap + publish)
// ```
//
// A device is either valid or lost; nothing derived from a lost device
// may be touched until the manager has rebuilt the whole chain.
//
//=========================================================================

//=== External Crates =====================================================

use tiny_skia::Pixmap;

//=== Internal Dependencies ===============================================

use crate::error::{DeviceError, PresentError};
use crate::platform::surface::FrameSnapshot;

//=== DeviceFactory =======================================================

/// Produces graphics devices. Called once at initialization and again on
/// every device-loss recovery.
pub trait DeviceFactory: Send + Sync {
    /// Human-readable provider name for logs.
    fn name(&self) -> &str;

    /// Creates a fresh device.
    ///
    /// # Errors
    ///
    /// [`DeviceError::NoCompatibleDevice`] when the platform cannot supply
    /// one.
    fn create_device(&self) -> Result<Box<dyn GraphicsDevice>, DeviceError>;
}

//=== GraphicsDevice ======================================================

/// An owned GPU (or GPU-like) device.
pub trait GraphicsDevice: Send {
    /// Polls device-removal status.
    fn is_lost(&self) -> bool;

    /// Builds a double-buffered presentation chain sized `width`×`height`.
    fn create_presentation_chain(
        &self,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn PresentationChain>, DeviceError>;
}

//=== PresentationChain ===================================================

/// Double-buffered surface the engine draws into and hands to the
/// compositor.
pub trait PresentationChain: Send {
    /// Current buffer size in pixels.
    fn size(&self) -> (u32, u32);

    /// Resizes both buffers in place.
    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<(), DeviceError>;

    /// CPU-side back buffer for the frame being built.
    fn back_buffer(&mut self) -> &mut Pixmap;

    /// Presents the back buffer and swaps.
    ///
    /// Returns the presented frame so the compositor binding can publish
    /// it to the host.
    fn present(&mut self) -> Result<FrameSnapshot, PresentError>;
}
