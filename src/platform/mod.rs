//=========================================================================
// Platform Subsystem
//
// Everything that touches a graphics device or a host window.
//
// Architecture:
// ```text
//  ┌───────────────────────────┐      ┌──────────────────────────────┐
//  │  DeviceFactory            │      │  GraphicsDeviceManager       │
//  │   ├─ SoftwareDeviceFactory│ ───> │   ├─ GraphicsDevice          │
//  │   └─ GpuDeviceFactory     │      │   ├─ PresentationChain       │
//  └───────────────────────────┘      │   └─ CompositorSurfaceBinding│
//                                     │         ↓ publish            │
//                                     │      VisualHandle ──> host   │
//                                     └──────────────────────────────┘
//  ShellDriver<H: HostShell> ── winit events ──> EngineShell ──> Engine
// ```
//
// Responsibilities:
// - Device creation, loss detection and recreation (`manager`)
// - Presentation into a host-owned visual (`surface`)
// - Immediate-mode drawing onto back buffers (`canvas`)
// - The winit message-loop driver for hosts (`shell`)
//
//=========================================================================

//=== Submodules ==========================================================

pub mod canvas;
pub mod device;
pub mod manager;
pub mod shell;
pub mod software;
pub mod surface;

#[cfg(feature = "gpu")]
pub mod gpu;

//=== Public Exports ======================================================

pub use canvas::{Canvas, Color, PixmapCanvas};
pub use device::{DeviceFactory, GraphicsDevice, PresentationChain};
pub use manager::GraphicsDeviceManager;
pub use shell::{EngineShell, HostShell, ShellDriver, ShellError};
pub use software::{DeviceLossInjector, ResourceCounter, SoftwareDeviceFactory};
pub use surface::{CompositorSurfaceBinding, FrameSnapshot, VisualHandle};

#[cfg(feature = "gpu")]
pub use gpu::GpuDeviceFactory;
