//=========================================================================
// Compositor Surface Binding
//
// Wraps the presentation chain as a drawable the host can place in its
// visual tree. The host only ever holds a `VisualHandle`; the binding
// keeps that handle's declared size in step with the render dimensions
// and publishes every presented frame through it.
//
// The handle outlives device loss: when the manager rebuilds the chain it
// rebinds the same handle, so the host never has to re-fetch its visual.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::sync::{Arc, Mutex, PoisonError};

//=== External Crates =====================================================

use log::trace;

//=== FrameSnapshot =======================================================

/// One presented frame: premultiplied RGBA8 pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    pub width: u32,
    pub height: u32,
    /// Monotonic per presentation chain; restarts after recreation.
    pub frame_index: u64,
    pub pixels: Arc<[u8]>,
}

impl FrameSnapshot {
    /// RGBA of the pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        let px = self.pixels.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Copies the pixels out as straight (non-premultiplied) RGBA8, the
    /// layout image encoders expect.
    pub fn to_straight_rgba(&self) -> Vec<u8> {
        let mut rgba = self.pixels.to_vec();
        for px in rgba.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 {
                px[..3].fill(0);
                continue;
            }
            for channel in &mut px[..3] {
                *channel = ((u16::from(*channel) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        rgba
    }

    /// True when both frames carry the same image, ignoring frame index.
    pub fn same_image(&self, other: &FrameSnapshot) -> bool {
        self.width == other.width && self.height == other.height && self.pixels == other.pixels
    }
}

//=== VisualHandle ========================================================

#[derive(Debug, Default)]
struct VisualState {
    size: (u32, u32),
    bound: bool,
    surface_generation: u64,
    latest: Option<FrameSnapshot>,
}

/// Host-side handle to the engine's drawable surface.
///
/// Cheap to clone; every clone observes the same surface.
#[derive(Debug, Clone, Default)]
pub struct VisualHandle {
    inner: Arc<Mutex<VisualState>>,
}

impl VisualHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared size, matching the current render dimensions.
    pub fn size(&self) -> (u32, u32) {
        self.lock().size
    }

    /// Whether a presentation chain currently backs this visual.
    pub fn is_bound(&self) -> bool {
        self.lock().bound
    }

    /// Number of times a presentation chain has been (re)bound.
    pub fn surface_generation(&self) -> u64 {
        self.lock().surface_generation
    }

    /// Latest presented frame, if any.
    pub fn snapshot(&self) -> Option<FrameSnapshot> {
        self.lock().latest.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VisualState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//=== CompositorSurfaceBinding ============================================

/// Keeps a [`VisualHandle`] synchronized with the presentation chain.
pub struct CompositorSurfaceBinding {
    visual: VisualHandle,
}

impl CompositorSurfaceBinding {
    pub fn new(visual: VisualHandle) -> Self {
        Self { visual }
    }

    pub fn visual(&self) -> &VisualHandle {
        &self.visual
    }

    /// Binds a freshly created chain of the given size.
    pub fn bind(&self, width: u32, height: u32) {
        let mut state = self.visual.lock();
        state.size = (width, height);
        state.bound = true;
        state.surface_generation += 1;
        state.latest = None;
        trace!(target: "device", "Visual bound (generation {})", state.surface_generation);
    }

    /// Drops the chain reference; the host keeps its handle.
    pub fn unbind(&self) {
        let mut state = self.visual.lock();
        state.bound = false;
        state.latest = None;
    }

    pub fn set_size(&self, width: u32, height: u32) {
        self.visual.lock().size = (width, height);
    }

    /// Publishes a presented frame to the host.
    pub fn publish(&self, frame: FrameSnapshot) {
        self.visual.lock().latest = Some(frame);
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
