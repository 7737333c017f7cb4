//=========================================================================
// Graphics Device Manager
//
// Owns the device, its presentation chain and the compositor binding,
// and is the only code that creates or destroys them.
//
// Lifecycle:
// ```text
//   create() ──> [Valid] ──present() fails / device removed──> [Lost]
//                   ↑                                             │
//                   └──────────── recreate() succeeds ────────────┘
// ```
//
// Teardown order is fixed: drawing resources → presentation chain →
// device. Nothing derived from the device is handed out while it is lost.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::sync::Arc;

//=== External Crates =====================================================

use log::{debug, info, warn};
use tiny_skia::Pixmap;

//=== Internal Dependencies ===============================================

use crate::error::{DeviceError, PresentError};
use crate::platform::device::{DeviceFactory, GraphicsDevice, PresentationChain};
use crate::platform::surface::{CompositorSurfaceBinding, VisualHandle};

//=== GraphicsDeviceManager ===============================================

pub struct GraphicsDeviceManager {
    factory: Arc<dyn DeviceFactory>,
    device: Option<Box<dyn GraphicsDevice>>,
    chain: Option<Box<dyn PresentationChain>>,
    binding: CompositorSurfaceBinding,
    width: u32,
    height: u32,
    /// Set when a present reported device loss.
    present_lost: bool,
    recoveries: u64,
}

impl GraphicsDeviceManager {
    //--- Construction -----------------------------------------------------

    /// Builds the device and a presentation chain sized `width`×`height`
    /// and binds it to `visual`.
    ///
    /// # Errors
    ///
    /// Propagates the factory's error; the caller treats it as fatal.
    pub fn create(
        factory: Arc<dyn DeviceFactory>,
        visual: VisualHandle,
        width: u32,
        height: u32,
    ) -> Result<Self, DeviceError> {
        let mut manager = Self {
            factory,
            device: None,
            chain: None,
            binding: CompositorSurfaceBinding::new(visual),
            width,
            height,
            present_lost: false,
            recoveries: 0,
        };
        manager.build()?;
        info!(
            target: "device",
            "Graphics device created ({}, {}x{})",
            manager.factory.name(),
            width,
            height
        );
        Ok(manager)
    }

    //--- Queries ----------------------------------------------------------

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn visual(&self) -> &VisualHandle {
        self.binding.visual()
    }

    /// Number of successful recoveries since creation.
    pub fn recoveries(&self) -> u64 {
        self.recoveries
    }

    /// Polls device-removal status.
    pub fn is_device_lost(&self) -> bool {
        self.present_lost
            || self.chain.is_none()
            || self.device.as_ref().map_or(true, |device| device.is_lost())
    }

    //--- Recovery ---------------------------------------------------------

    /// Tears down every owned resource and rebuilds from scratch.
    pub fn recreate(&mut self) -> Result<(), DeviceError> {
        debug!(target: "device", "Recreating device resources");
        self.teardown();
        self.build()?;
        self.recoveries += 1;
        info!(target: "device", "Device resources recreated (recovery #{})", self.recoveries);
        Ok(())
    }

    //--- Resize -----------------------------------------------------------

    /// Resizes the chain in place, recreating everything only if the
    /// in-place resize fails. Zero or unchanged sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), DeviceError> {
        if width == 0 || height == 0 || (width, height) == (self.width, self.height) {
            return Ok(());
        }
        self.width = width;
        self.height = height;
        self.binding.set_size(width, height);

        if self.is_device_lost() {
            // Recovery will build at the new size.
            return Ok(());
        }

        let resized = match self.chain.as_mut() {
            Some(chain) => chain.resize_buffers(width, height),
            None => Err(DeviceError::Lost),
        };

        match resized {
            Ok(()) => {
                debug!(target: "device", "Presentation chain resized to {}x{}", width, height);
                Ok(())
            }
            Err(err) => {
                warn!(target: "device", "In-place resize failed ({}), recreating", err);
                self.recreate()
            }
        }
    }

    //--- Frame ------------------------------------------------------------

    /// Back buffer for the next frame, or `None` while the device is lost.
    pub fn back_buffer(&mut self) -> Option<&mut Pixmap> {
        if self.is_device_lost() {
            return None;
        }
        self.chain.as_mut().map(|chain| chain.back_buffer())
    }

    /// Presents the back buffer and publishes it to the visual.
    ///
    /// A device-loss failure marks the manager lost so the next render
    /// iteration recovers.
    pub fn present(&mut self) -> Result<(), PresentError> {
        let Some(chain) = self.chain.as_mut() else {
            return Err(PresentError::DeviceLost);
        };
        match chain.present() {
            Ok(frame) => {
                self.binding.publish(frame);
                Ok(())
            }
            Err(PresentError::DeviceLost) => {
                self.present_lost = true;
                Err(PresentError::DeviceLost)
            }
            Err(other) => Err(other),
        }
    }

    //--- Shutdown ---------------------------------------------------------

    /// Releases all device resources and unbinds the visual.
    pub fn release(&mut self) {
        self.teardown();
        self.binding.unbind();
        info!(target: "device", "Graphics device released");
    }

    //--- Internal Helpers -------------------------------------------------

    fn build(&mut self) -> Result<(), DeviceError> {
        let device = self.factory.create_device()?;
        let chain = device.create_presentation_chain(self.width, self.height)?;
        self.device = Some(device);
        self.chain = Some(chain);
        self.present_lost = false;
        self.binding.bind(self.width, self.height);
        Ok(())
    }

    fn teardown(&mut self) {
        self.binding.unbind();
        self.chain = None;
        self.device = None;
    }
}

impl Drop for GraphicsDeviceManager {
    fn drop(&mut self) {
        self.teardown();
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::software::SoftwareDeviceFactory;

    fn manager(factory: &SoftwareDeviceFactory, w: u32, h: u32) -> GraphicsDeviceManager {
        GraphicsDeviceManager::create(Arc::new(factory.clone()), VisualHandle::new(), w, h).unwrap()
    }

    #[test]
    fn create_binds_visual() {
        let factory = SoftwareDeviceFactory::new();
        let m = manager(&factory, 800, 600);
        assert_eq!(m.visual().size(), (800, 600));
        assert!(m.visual().is_bound());
        assert!(!m.is_device_lost());
    }

    #[test]
    fn create_propagates_missing_device() {
        let factory = SoftwareDeviceFactory::new();
        factory.refuse_devices(true);
        let result = GraphicsDeviceManager::create(Arc::new(factory), VisualHandle::new(), 10, 10);
        assert!(matches!(result, Err(DeviceError::NoCompatibleDevice(_))));
    }

    #[test]
    fn resize_is_in_place_when_possible() {
        let factory = SoftwareDeviceFactory::new();
        let mut m = manager(&factory, 100, 100);
        m.resize(200, 50).unwrap();
        assert_eq!(m.size(), (200, 50));
        assert_eq!(m.visual().size(), (200, 50));
        assert_eq!(factory.devices_created(), 1);
        assert_eq!(m.back_buffer().map(|p| (p.width(), p.height())), Some((200, 50)));
    }

    #[test]
    fn resize_falls_back_to_recreate() {
        let factory = SoftwareDeviceFactory::new();
        let mut m = manager(&factory, 100, 100);
        factory.fail_next_resizes(1);
        m.resize(300, 300).unwrap();
        assert_eq!(factory.devices_created(), 2);
        assert_eq!(m.recoveries(), 1);
        assert_eq!(m.back_buffer().map(|p| p.width()), Some(300));
    }

    #[test]
    fn unchanged_or_zero_resize_is_ignored() {
        let factory = SoftwareDeviceFactory::new();
        let mut m = manager(&factory, 100, 100);
        m.resize(100, 100).unwrap();
        m.resize(0, 40).unwrap();
        assert_eq!(m.size(), (100, 100));
    }

    #[test]
    fn lost_device_hides_back_buffer_until_recreated() {
        let factory = SoftwareDeviceFactory::new();
        let mut m = manager(&factory, 10, 10);
        factory.loss_injector().inject();
        assert!(m.is_device_lost());
        assert!(m.back_buffer().is_none());

        m.recreate().unwrap();
        assert!(!m.is_device_lost());
        assert!(m.back_buffer().is_some());
        assert_eq!(m.visual().surface_generation(), 2);
    }

    #[test]
    fn present_loss_marks_manager_lost() {
        let factory = SoftwareDeviceFactory::new();
        let mut m = manager(&factory, 10, 10);
        assert!(m.present().is_ok());
        assert!(m.visual().snapshot().is_some());

        factory.loss_injector().inject();
        assert_eq!(m.present(), Err(PresentError::DeviceLost));
        assert!(m.is_device_lost());
    }

    #[test]
    fn repeated_recovery_does_not_leak() {
        let factory = SoftwareDeviceFactory::new();
        let counter = factory.resource_counter();
        let mut m = manager(&factory, 16, 16);

        factory.loss_injector().inject();
        m.recreate().unwrap();
        let after_one = counter.live();

        for _ in 0..10 {
            factory.loss_injector().inject();
            m.recreate().unwrap();
        }
        assert_eq!(counter.live(), after_one);

        m.release();
        assert_eq!(counter.live(), 0);
        assert!(!m.visual().is_bound());
    }

    #[test]
    fn failed_recreate_leaves_manager_lost() {
        let factory = SoftwareDeviceFactory::new();
        let mut m = manager(&factory, 10, 10);
        factory.loss_injector().inject();
        factory.fail_next_creations(1);
        assert!(m.recreate().is_err());
        assert!(m.is_device_lost());
        assert!(m.recreate().is_ok());
    }
}
