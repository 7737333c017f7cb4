//=========================================================================
// Host Shell
//
// One generic winit driver for every way of hosting the engine. A host
// implements the `HostShell` capability trait; `ShellDriver` owns the
// window and translates winit events into those callbacks.
//
// Architecture:
// ```text
//  Main Thread:                              Render Thread:
//  ┌───────────────────────────────┐        ┌──────────────────┐
//  │  winit event loop             │        │  RenderLoop      │
//  │   ↓                           │        │   ├─ drain input │
//  │  ShellDriver<H>               │        │   ├─ advance     │
//  │   ├─ PointerTranslator        │        │   ├─ draw        │
//  │   └─ H: HostShell             │        │   └─ present     │
//  │       ↓ (EngineShell)         │        └──────────────────┘
//  │  Engine::queue_pointer_*() ───┼──── InputEventQueue ───↑
//  └───────────────────────────────┘
// ```
//
// winit requires the event loop on the main thread on macOS/iOS, so
// `ShellDriver::run` must be called from `main`.
//
//=========================================================================

//=== External Crates =====================================================

use std::sync::Arc;

use log::{debug, error, info, trace};
use thiserror::Error;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes, WindowId},
};

//=== Internal Imports ====================================================

use crate::core::input::PointerKind;
use crate::engine::Engine;

//=== HostShell ===========================================================

/// Lifecycle hooks a host implements once. Sizes are physical pixels.
pub trait HostShell {
    fn on_created(&mut self, width: u32, height: u32);

    fn on_resize(&mut self, width: u32, height: u32);

    /// Pointer event in render-surface pixels.
    fn on_pointer(&mut self, kind: PointerKind, x: f32, y: f32);

    fn on_dpi_changed(&mut self, scale_factor: f64) {
        let _ = scale_factor;
    }

    fn on_close(&mut self);
}

//=== ShellError ==========================================================

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Event loop creation failed: {0}")]
    EventLoopCreation(#[source] winit::error::EventLoopError),

    #[error("Event loop error: {0}")]
    EventLoopExecution(#[source] winit::error::EventLoopError),
}

//=== PointerTranslator ===================================================

/// Turns winit cursor and button events into pointer events.
///
/// winit reports button changes without a position, so the last cursor
/// position is cached. Only the primary button produces press/release.
#[derive(Debug, Default)]
pub(crate) struct PointerTranslator {
    cursor: (f32, f32),
}

impl PointerTranslator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cursor_moved(&mut self, x: f64, y: f64) -> (PointerKind, f32, f32) {
        self.cursor = (x as f32, y as f32);
        (PointerKind::Move, self.cursor.0, self.cursor.1)
    }

    pub(crate) fn button(
        &self,
        button: MouseButton,
        state: ElementState,
    ) -> Option<(PointerKind, f32, f32)> {
        if button != MouseButton::Left {
            return None;
        }
        let kind = match state {
            ElementState::Pressed => PointerKind::Press,
            ElementState::Released => PointerKind::Release,
        };
        Some((kind, self.cursor.0, self.cursor.1))
    }
}

//=== ShellDriver =========================================================

/// Owns the window and forwards its events to a [`HostShell`].
///
/// The window is created lazily in `resumed()` (mobile compatibility).
pub struct ShellDriver<H: HostShell> {
    host: H,
    title: String,
    initial_size: LogicalSize<u32>,
    window: Option<Window>,
    pointer: PointerTranslator,
}

impl<H: HostShell> ShellDriver<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            title: "Aetheric Animator".to_string(),
            initial_size: LogicalSize::new(800, 600),
            window: None,
            pointer: PointerTranslator::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.initial_size = LogicalSize::new(width, height);
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Runs the event loop until the window closes.
    ///
    /// # Errors
    ///
    /// [`ShellError`] if the event loop cannot be created or fails.
    pub fn run(mut self) -> Result<H, ShellError> {
        debug!(target: "shell", "Starting winit event loop");
        let event_loop = EventLoop::new().map_err(ShellError::EventLoopCreation)?;
        event_loop.run_app(&mut self).map_err(ShellError::EventLoopExecution)?;
        Ok(self.host)
    }

    fn forward_pointer(&mut self, event: Option<(PointerKind, f32, f32)>) {
        if let Some((kind, x, y)) = event {
            self.host.on_pointer(kind, x, y);
        }
    }
}

impl<H: HostShell> ApplicationHandler for ShellDriver<H> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            debug!(target: "shell", "Window already exists (resume)");
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title(self.title.clone())
            .with_inner_size(self.initial_size);

        match event_loop.create_window(attrs) {
            Ok(window) => {
                let PhysicalSize { width, height } = window.inner_size();
                info!(
                    target: "shell",
                    "Window created: {}x{} @ {}x DPI",
                    width,
                    height,
                    window.scale_factor()
                );
                self.window = Some(window);
                self.host.on_created(width, height);
            }
            Err(e) => {
                error!(target: "shell", "Window creation failed: {}", e);
                self.host.on_close();
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!(target: "shell", "Window close requested");
                self.host.on_close();
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                trace!(target: "shell", "Resized to {}x{}", size.width, size.height);
                self.host.on_resize(size.width, size.height);
            }

            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.host.on_dpi_changed(scale_factor);
            }

            WindowEvent::CursorMoved { position, .. } => {
                let event = self.pointer.cursor_moved(position.x, position.y);
                self.forward_pointer(Some(event));
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let event = self.pointer.button(button, state);
                self.forward_pointer(event);
            }

            _ => {}
        }
    }
}

//=== EngineShell =========================================================

/// [`HostShell`] that drives an [`Engine`].
///
/// Initializes the engine and starts rendering when the window appears,
/// keeps the render size in sync, and shuts the engine down on close.
/// Move and press events outside the render bounds are dropped; releases
/// always go through so a drag that leaves the window still ends.
pub struct EngineShell {
    engine: Arc<Engine>,
    size: (u32, u32),
}

impl EngineShell {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine, size: (0, 0) }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    fn accepts(&self, kind: PointerKind, x: f32, y: f32) -> bool {
        let (width, height) = self.size;
        match kind {
            PointerKind::Release => true,
            PointerKind::Move | PointerKind::Press => {
                x >= 0.0 && y >= 0.0 && x < width as f32 && y < height as f32
            }
        }
    }
}

impl HostShell for EngineShell {
    fn on_created(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        if self.engine.is_initialized() {
            self.engine.set_size(width, height);
        } else if !self.engine.initialize(width, height) {
            return;
        }
        self.engine.start_render_loop();
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.engine.set_size(width, height);
    }

    fn on_pointer(&mut self, kind: PointerKind, x: f32, y: f32) {
        if !self.accepts(kind, x, y) {
            trace!(target: "shell", "Dropping {:?} outside render bounds at ({}, {})", kind, x, y);
            return;
        }
        match kind {
            PointerKind::Move => self.engine.queue_pointer_move(x, y),
            PointerKind::Press => self.engine.queue_pointer_press(x, y),
            PointerKind::Release => self.engine.queue_pointer_release(x, y),
        }
    }

    fn on_dpi_changed(&mut self, scale_factor: f64) {
        // winit follows up with Resized in physical pixels.
        debug!(target: "shell", "Scale factor changed to {}", scale_factor);
    }

    fn on_close(&mut self) {
        self.engine.shutdown();
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
