//=========================================================================
// wgpu Device
//
// Hardware provider for the device traits. Frames are still rasterised by
// the tiny-skia canvas into a CPU staging pixmap; present uploads the
// staging pixels into the back texture and swaps.
//
// Device loss is reported by wgpu through the device-lost callback, which
// flips the same kind of removal flag the software device uses.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

//=== External Crates =====================================================

use log::{debug, info, trace, warn};
use tiny_skia::Pixmap;

//=== Internal Dependencies ===============================================

use crate::error::{DeviceError, PresentError};
use crate::platform::device::{DeviceFactory, GraphicsDevice, PresentationChain};
use crate::platform::surface::FrameSnapshot;

//=== GpuDeviceFactory ====================================================

/// Requests a fresh adapter and device on every creation, so a recovery
/// after a driver reset never reuses a dead adapter.
#[derive(Debug, Clone)]
pub struct GpuDeviceFactory {
    power_preference: wgpu::PowerPreference,
}

impl GpuDeviceFactory {
    pub fn new() -> Self {
        Self { power_preference: wgpu::PowerPreference::HighPerformance }
    }

    pub fn with_power_preference(mut self, preference: wgpu::PowerPreference) -> Self {
        self.power_preference = preference;
        self
    }
}

impl Default for GpuDeviceFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceFactory for GpuDeviceFactory {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn create_device(&self) -> Result<Box<dyn GraphicsDevice>, DeviceError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: self.power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                DeviceError::NoCompatibleDevice("no gpu adapter available".into())
            }
            other => DeviceError::NoCompatibleDevice(format!("wgpu request_adapter failed: {other:?}")),
        })?;

        let adapter_info = adapter.get_info();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("aetheric_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| DeviceError::NoCompatibleDevice(format!("wgpu request_device failed: {e:?}")))?;

        let removed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&removed);
        device.set_device_lost_callback(move |reason, message| {
            warn!(target: "device", "wgpu device lost ({reason:?}): {message}");
            flag.store(true, Ordering::SeqCst);
        });

        info!(
            target: "device",
            "wgpu device created on {} ({:?})",
            adapter_info.name,
            adapter_info.backend
        );

        Ok(Box::new(GpuDevice { device: Arc::new(device), queue: Arc::new(queue), removed }))
    }
}

//=== GpuDevice ===========================================================

struct GpuDevice {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    removed: Arc<AtomicBool>,
}

impl GraphicsDevice for GpuDevice {
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
        let (staging, textures) = allocate(&self.device, width, height)
            .map_err(DeviceError::SurfaceCreation)?;

        Ok(Box::new(GpuChain {
            device: Arc::clone(&self.device),
            queue: Arc::clone(&self.queue),
            removed: Arc::clone(&self.removed),
            staging,
            textures,
            back: 0,
            frame_index: 0,
        }))
    }
}

//=== GpuChain ============================================================

struct GpuChain {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    removed: Arc<AtomicBool>,
    staging: Pixmap,
    textures: [wgpu::Texture; 2],
    back: usize,
    frame_index: u64,
}

fn allocate(device: &wgpu::Device, width: u32, height: u32) -> Result<(Pixmap, [wgpu::Texture; 2]), String> {
    let max = device.limits().max_texture_dimension_2d;
    if width > max || height > max {
        return Err(format!("{width}x{height} exceeds the device limit of {max}"));
    }
    let staging = Pixmap::new(width, height)
        .ok_or_else(|| format!("cannot allocate {width}x{height} staging buffer"))?;
    let textures = [
        create_texture(device, width, height, "aetheric_buffer_0"),
        create_texture(device, width, height, "aetheric_buffer_1"),
    ];
    Ok((staging, textures))
}

fn create_texture(device: &wgpu::Device, width: u32, height: u32, label: &str) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

impl PresentationChain for GpuChain {
    fn size(&self) -> (u32, u32) {
        (self.staging.width(), self.staging.height())
    }

    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<(), DeviceError> {
        let (staging, textures) = allocate(&self.device, width, height).map_err(|reason| {
            debug!(target: "device", "wgpu resize rejected: {reason}");
            DeviceError::ResizeFailed { width, height }
        })?;
        for texture in &self.textures {
            texture.destroy();
        }
        self.staging = staging;
        self.textures = textures;
        self.back = 0;
        Ok(())
    }

    fn back_buffer(&mut self) -> &mut Pixmap {
        &mut self.staging
    }

    fn present(&mut self) -> Result<FrameSnapshot, PresentError> {
        if self.removed.load(Ordering::SeqCst) {
            return Err(PresentError::DeviceLost);
        }
        let (width, height) = self.size();

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.textures[self.back],
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            self.staging.data(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
        self.queue.submit(std::iter::empty());

        // The lost callback can fire during submit.
        if self.removed.load(Ordering::SeqCst) {
            return Err(PresentError::DeviceLost);
        }

        let frame = FrameSnapshot {
            width,
            height,
            frame_index: self.frame_index,
            pixels: Arc::from(self.staging.data()),
        };
        trace!(target: "device", "Uploaded frame {} to texture {}", self.frame_index, self.back);
        self.frame_index += 1;
        self.back ^= 1;
        Ok(frame)
    }
}

impl Drop for GpuChain {
    fn drop(&mut self) {
        for texture in &self.textures {
            texture.destroy();
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
