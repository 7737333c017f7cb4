//=========================================================================
// Software Device
//
// CPU implementation of the device traits, backed by tiny-skia pixmaps.
// This is the default provider: it needs no GPU and behaves like one in
// every way the engine cares about, including device loss.
//
// Test hooks (all reachable through `SoftwareDeviceFactory`):
// - DeviceLossInjector  → flips the removal flag of the live device
// - ResourceCounter     → counts live devices, chains and buffers
// - refuse_devices()    → makes every creation fail (fatal init path)
// - fail_next_creations → makes the next N creations fail (retry path)
// - fail_next_resizes   → makes in-place resize fail (recreate fallback)
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

//=== External Crates =====================================================

use log::{debug, trace, warn};
use tiny_skia::Pixmap;

//=== Internal Dependencies ===============================================

use crate::error::{DeviceError, PresentError};
use crate::platform::device::{DeviceFactory, GraphicsDevice, PresentationChain};
use crate::platform::surface::FrameSnapshot;

//=== ResourceCounter =====================================================

/// Shared count of live device-derived objects.
#[derive(Debug, Clone, Default)]
pub struct ResourceCounter {
    live: Arc<AtomicUsize>,
}

impl ResourceCounter {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn acquire(&self) -> ResourceGuard {
        self.live.fetch_add(1, Ordering::SeqCst);
        ResourceGuard { live: Arc::clone(&self.live) }
    }
}

/// Decrements its counter when dropped.
#[derive(Debug)]
struct ResourceGuard {
    live: Arc<AtomicUsize>,
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

//=== DeviceLossInjector ==================================================

/// Simulates a driver reset on whatever device is currently live.
#[derive(Debug, Clone)]
pub struct DeviceLossInjector {
    shared: Arc<FactoryShared>,
}

impl DeviceLossInjector {
    /// Marks the live device as removed. No-op when no device exists.
    pub fn inject(&self) {
        let current = self.shared.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(flag) = current.as_ref() {
            warn!(target: "device", "Injecting device loss");
            flag.store(true, Ordering::SeqCst);
        }
    }
}

//=== SoftwareDeviceFactory ===============================================

#[derive(Debug, Default)]
struct FactoryShared {
    current: Mutex<Option<Arc<AtomicBool>>>,
    counter: ResourceCounter,
    refuse: AtomicBool,
    failing_creations: AtomicUsize,
    failing_resizes: AtomicUsize,
    failing_presents: AtomicUsize,
    devices_created: AtomicUsize,
}

/// Default [`DeviceFactory`]: tiny-skia backed devices.
#[derive(Debug, Clone, Default)]
pub struct SoftwareDeviceFactory {
    shared: Arc<FactoryShared>,
}

impl SoftwareDeviceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that can mark the live device as lost.
    pub fn loss_injector(&self) -> DeviceLossInjector {
        DeviceLossInjector { shared: Arc::clone(&self.shared) }
    }

    pub fn resource_counter(&self) -> ResourceCounter {
        self.shared.counter.clone()
    }

    /// Total devices created so far, recoveries included.
    pub fn devices_created(&self) -> usize {
        self.shared.devices_created.load(Ordering::SeqCst)
    }

    /// Makes every subsequent creation fail, as if no adapter existed.
    pub fn refuse_devices(&self, refuse: bool) {
        self.shared.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn fail_next_creations(&self, count: usize) {
        self.shared.failing_creations.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_resizes(&self, count: usize) {
        self.shared.failing_resizes.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` presents fail without losing the device.
    pub fn fail_next_presents(&self, count: usize) {
        self.shared.failing_presents.store(count, Ordering::SeqCst);
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl DeviceFactory for SoftwareDeviceFactory {
    fn name(&self) -> &str {
        "software"
    }

    fn create_device(&self) -> Result<Box<dyn GraphicsDevice>, DeviceError> {
        if self.shared.refuse.load(Ordering::SeqCst) {
            return Err(DeviceError::NoCompatibleDevice("software device refused".into()));
        }
        if take_one(&self.shared.failing_creations) {
            return Err(DeviceError::NoCompatibleDevice("software device creation failed".into()));
        }

        let removed = Arc::new(AtomicBool::new(false));
        *self.shared.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&removed));
        let ordinal = self.shared.devices_created.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(target: "device", "Software device #{} created", ordinal);

        Ok(Box::new(SoftwareDevice {
            removed,
            shared: Arc::clone(&self.shared),
            _guard: self.shared.counter.acquire(),
        }))
    }
}

//=== SoftwareDevice ======================================================

struct SoftwareDevice {
    removed: Arc<AtomicBool>,
    shared: Arc<FactoryShared>,
    _guard: ResourceGuard,
}

impl GraphicsDevice for SoftwareDevice {
    fn is_lost(&self) -> bool {
        self.removed.load(Ordering::SeqCst)
    }

    fn create_presentation_chain(
        &self,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn PresentationChain>, DeviceError> {
        if self.is_lost() {
            return Err(DeviceError::Lost);
        }
        let buffers = SoftwareChain::allocate(&self.shared.counter, width, height).ok_or_else(|| {
            DeviceError::SurfaceCreation(format!("cannot allocate {}x{} buffers", width, height))
        })?;

        Ok(Box::new(SoftwareChain {
            buffers,
            back: 0,
            frame_index: 0,
            removed: Arc::clone(&self.removed),
            shared: Arc::clone(&self.shared),
            _guard: self.shared.counter.acquire(),
        }))
    }
}

//=== SoftwareChain =======================================================

struct Buffer {
    pixmap: Pixmap,
    _guard: ResourceGuard,
}

struct SoftwareChain {
    buffers: [Buffer; 2],
    back: usize,
    frame_index: u64,
    removed: Arc<AtomicBool>,
    shared: Arc<FactoryShared>,
    _guard: ResourceGuard,
}

impl SoftwareChain {
    fn allocate(counter: &ResourceCounter, width: u32, height: u32) -> Option<[Buffer; 2]> {
        let first = Pixmap::new(width, height)?;
        let second = Pixmap::new(width, height)?;
        Some([
            Buffer { pixmap: first, _guard: counter.acquire() },
            Buffer { pixmap: second, _guard: counter.acquire() },
        ])
    }
}

impl PresentationChain for SoftwareChain {
    fn size(&self) -> (u32, u32) {
        let pixmap = &self.buffers[self.back].pixmap;
        (pixmap.width(), pixmap.height())
    }

    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<(), DeviceError> {
        if take_one(&self.shared.failing_resizes) {
            return Err(DeviceError::ResizeFailed { width, height });
        }
        let buffers = Self::allocate(&self.shared.counter, width, height)
            .ok_or(DeviceError::ResizeFailed { width, height })?;
        self.buffers = buffers;
        self.back = 0;
        Ok(())
    }

    fn back_buffer(&mut self) -> &mut Pixmap {
        &mut self.buffers[self.back].pixmap
    }

    fn present(&mut self) -> Result<FrameSnapshot, PresentError> {
        if self.removed.load(Ordering::SeqCst) {
            return Err(PresentError::DeviceLost);
        }
        if take_one(&self.shared.failing_presents) {
            return Err(PresentError::Other("software present failed".into()));
        }
        let pixmap = &self.buffers[self.back].pixmap;
        let frame = FrameSnapshot {
            width: pixmap.width(),
            height: pixmap.height(),
            frame_index: self.frame_index,
            pixels: Arc::from(pixmap.data()),
        };
        trace!(target: "device", "Presented frame {}", self.frame_index);
        self.frame_index += 1;
        self.back ^= 1;
        Ok(frame)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
