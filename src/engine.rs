//=========================================================================
// Aetheric Animator
//
// Host-facing facade over the render core.
//
// Architecture:
// ```text
//     EngineBuilder  ──build()──>  Engine  ──initialize()──>  [Device]
//         │                          │
//         ├─ with_fps()              ├─ load_file() / set_size()    (device lock)
//         ├─ with_clear_color()      ├─ queue_pointer_*()           (input queue)
//         ├─ with_scene_backend()    └─ start_render_loop()
//         └─ with_device_factory()         └─> RenderLoop (render thread)
// ```
//
// Every operation reports failure through its return value. The `try_*`
// variants carry the typed cause; the plain variants log it and return a
// boolean or an empty result.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use kurbo::Rect;
use log::{debug, error, info, warn};

//=== Internal Dependencies ===============================================

use crate::core::input::{InputEvent, InputEventQueue};
use crate::core::scene::{
    DocumentBackend, SceneBackend, SceneController, SceneKind, StateMachineInfo,
    StateMachineInputInfo, ViewModelInstance, ViewModelPropertyInfo,
};
use crate::core::{lock_state, render_frame, EngineState, FrameOutcome, RenderLoop, SharedState};
use crate::error::EngineError;
use crate::platform::canvas::Color;
use crate::platform::device::DeviceFactory;
use crate::platform::manager::GraphicsDeviceManager;
use crate::platform::software::SoftwareDeviceFactory;
use crate::platform::surface::VisualHandle;

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// # Default Values
///
/// - **FPS**: 60.0 (render iterations per second, also the advance step)
/// - **Clear color**: `0xff404040`
/// - **Scene backend**: [`DocumentBackend`]
/// - **Device factory**: [`SoftwareDeviceFactory`]
///
/// # Examples
///
/// ```no_run
/// use aetheric_animator::EngineBuilder;
///
/// let engine = EngineBuilder::new().with_fps(120.0).build();
/// assert!(engine.initialize(800, 600));
/// engine.load_file("clip.riv");
/// engine.start_render_loop();
/// ```
pub struct EngineBuilder {
    fps: f64,
    clear_color: Color,
    backend: Arc<dyn SceneBackend>,
    device_factory: Arc<dyn DeviceFactory>,
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            fps: 60.0,
            clear_color: Color::from_argb(0xff40_4040),
            backend: Arc::new(DocumentBackend::new()),
            device_factory: Arc::new(SoftwareDeviceFactory::new()),
        }
    }

    /// Sets the render loop rate. Each iteration advances the scene by
    /// `1 / fps` seconds.
    ///
    /// # Panics
    ///
    /// Panics if `fps <= 0.0`.
    pub fn with_fps(mut self, fps: f64) -> Self {
        assert!(fps > 0.0, "FPS must be positive, got {}", fps);
        self.fps = fps;
        self
    }

    /// Color behind the artboard, packed `0xAARRGGBB`.
    pub fn with_clear_color(mut self, argb: u32) -> Self {
        self.clear_color = Color::from_argb(argb);
        self
    }

    /// Backend used to import files. Pass [`crate::core::scene::NullBackend`]
    /// for an engine that renders only its clear color.
    pub fn with_scene_backend(mut self, backend: impl SceneBackend + 'static) -> Self {
        self.backend = Arc::new(backend);
        self
    }

    pub fn with_device_factory(mut self, factory: impl DeviceFactory + 'static) -> Self {
        self.device_factory = Arc::new(factory);
        self
    }

    /// Builds the engine. No device exists until [`Engine::initialize`].
    pub fn build(self) -> Engine {
        info!(
            target: "engine",
            "Building engine (FPS: {}, backend: {}, device: {})",
            self.fps,
            self.backend.name(),
            self.device_factory.name()
        );

        let scene = SceneController::new(self.backend);
        Engine {
            state: Arc::new(Mutex::new(EngineState::new(scene, self.clear_color))),
            input: Arc::new(InputEventQueue::new()),
            render_loop: Mutex::new(None),
            visual: VisualHandle::new(),
            device_factory: self.device_factory,
            fps: self.fps,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Engine ==============================================================

/// Animation engine instance.
///
/// All methods take `&self` and may be called from any thread; the engine
/// is typically shared with the host shell through an `Arc`.
pub struct Engine {
    state: SharedState,
    input: Arc<InputEventQueue>,
    render_loop: Mutex<Option<RenderLoop>>,
    visual: VisualHandle,
    device_factory: Arc<dyn DeviceFactory>,
    fps: f64,
}

impl Engine {
    /// Engine with default configuration.
    pub fn new() -> Self {
        EngineBuilder::new().build()
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        lock_state(&self.state)
    }

    fn render_loop(&self) -> MutexGuard<'_, Option<RenderLoop>> {
        self.render_loop.lock().unwrap_or_else(PoisonError::into_inner)
    }

    //=====================================================================
    // Lifecycle
    //=====================================================================

    /// Creates the graphics device and binds it to the visual.
    /// A failure here is fatal for this engine instance.
    pub fn initialize(&self, width: u32, height: u32) -> bool {
        match self.try_initialize(width, height) {
            Ok(()) => true,
            Err(e) => {
                error!(target: "engine", "Initialization failed: {e}");
                false
            }
        }
    }

    pub fn try_initialize(&self, width: u32, height: u32) -> Result<(), EngineError> {
        let mut state = self.lock();
        if state.graphics.is_some() {
            return Err(EngineError::AlreadyInitialized);
        }

        let graphics = GraphicsDeviceManager::create(
            Arc::clone(&self.device_factory),
            self.visual.clone(),
            width,
            height,
        )?;
        state.graphics = Some(graphics);
        state.mapper.set_render_size(width, height);
        info!(target: "engine", "Engine initialized at {width}x{height}");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().graphics.is_some()
    }

    /// Resizes the presentation chain and the visual. Zero sizes are ignored.
    pub fn set_size(&self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            debug!(target: "engine", "Ignoring zero size {width}x{height}");
            return;
        }
        let mut state = self.lock();
        if let Some(graphics) = state.graphics.as_mut() {
            if let Err(e) = graphics.resize(width, height) {
                // Recovery at the top of the next frame rebuilds at this size.
                warn!(target: "engine", "Resize to {width}x{height} failed: {e}");
            }
        }
        state.mapper.set_render_size(width, height);
    }

    /// Stops rendering, releases the device and clears the loaded file.
    /// Safe to call repeatedly.
    pub fn shutdown(&self) {
        self.stop_render_loop();

        let mut state = self.lock();
        let had_device = match state.graphics.take() {
            Some(mut graphics) => {
                graphics.release();
                true
            }
            None => false,
        };
        let had_content = state.scene.unload();
        state.sync_artboard();
        drop(state);
        self.input.clear();

        if had_device || had_content {
            info!(target: "engine", "Engine shut down");
        }
    }

    //=====================================================================
    // Content
    //=====================================================================

    /// Loads a file from disk, replacing current content only on success.
    pub fn load_file(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.try_load_file(path) {
            Ok(()) => true,
            Err(e) => {
                warn!(target: "engine", "Failed to load {}: {e}", path.display());
                false
            }
        }
    }

    pub fn try_load_file(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.scene.load_file(path)?;
        self.content_replaced(&mut state);
        Ok(())
    }

    /// Loads an in-memory file.
    pub fn load_bytes(&self, bytes: impl Into<Arc<[u8]>>) -> bool {
        let mut state = self.lock();
        match state.scene.load_bytes(bytes) {
            Ok(()) => {
                self.content_replaced(&mut state);
                true
            }
            Err(e) => {
                warn!(target: "engine", "Failed to load scene bytes: {e}");
                false
            }
        }
    }

    /// Drops the loaded file. Pending input is discarded.
    pub fn unload_file(&self) {
        let mut state = self.lock();
        if state.scene.unload() {
            self.content_replaced(&mut state);
        }
    }

    fn content_replaced(&self, state: &mut EngineState) {
        state.sync_artboard();
        self.input.clear();
    }

    pub fn is_file_loaded(&self) -> bool {
        self.lock().scene.is_loaded()
    }

    pub fn loaded_file_path(&self) -> Option<PathBuf> {
        self.lock().scene.loaded_path().map(Path::to_path_buf)
    }

    pub fn artboard_name(&self) -> Option<String> {
        self.lock().scene.artboard_name().map(str::to_string)
    }

    pub fn artboard_bounds(&self) -> Option<Rect> {
        self.lock().scene.artboard_bounds()
    }

    pub fn animation_count(&self) -> usize {
        self.lock().scene.animation_names().len()
    }

    pub fn animation_names(&self) -> Vec<String> {
        self.lock().scene.animation_names()
    }

    pub fn active_scene_kind(&self) -> Option<SceneKind> {
        self.lock().scene.scene_kind()
    }

    //=====================================================================
    // Rendering
    //=====================================================================

    /// Starts the render thread. Returns true if it is running afterwards.
    pub fn start_render_loop(&self) -> bool {
        match self.try_start_render_loop() {
            Ok(()) => true,
            Err(e) => {
                error!(target: "engine", "Cannot start render loop: {e}");
                false
            }
        }
    }

    pub fn try_start_render_loop(&self) -> Result<(), EngineError> {
        if !self.is_initialized() {
            return Err(EngineError::NotInitialized);
        }
        let mut slot = self.render_loop();
        if slot.is_none() {
            *slot = Some(RenderLoop::spawn(Arc::clone(&self.state), Arc::clone(&self.input), self.fps)?);
        }
        Ok(())
    }

    /// Stops and joins the render thread. No-op when not running.
    pub fn stop_render_loop(&self) {
        let render_loop = self.render_loop().take();
        if let Some(mut render_loop) = render_loop {
            render_loop.stop();
        }
    }

    pub fn pause_rendering(&self) {
        if let Some(render_loop) = self.render_loop().as_ref() {
            render_loop.pause();
        }
    }

    pub fn resume_rendering(&self) {
        if let Some(render_loop) = self.render_loop().as_ref() {
            render_loop.resume();
        }
    }

    pub fn is_rendering(&self) -> bool {
        self.render_loop().is_some()
    }

    pub fn is_rendering_paused(&self) -> bool {
        self.render_loop().as_ref().map_or(false, RenderLoop::is_paused)
    }

    /// Frames presented by the current render loop.
    pub fn frames_presented(&self) -> u64 {
        self.render_loop().as_ref().map_or(0, RenderLoop::frames_presented)
    }

    /// Renders one iteration on the calling thread, for hosts that drive
    /// frames themselves instead of running the render loop.
    pub fn step_frame(&self) -> FrameOutcome {
        let elapsed = (1.0 / self.fps) as f32;
        render_frame(&mut self.lock(), &self.input, elapsed)
    }

    /// Handle the host compositor displays.
    pub fn get_visual(&self) -> VisualHandle {
        self.visual.clone()
    }

    //=====================================================================
    // Pointer Input
    //=====================================================================
    //
    // Coordinates are render-surface pixels. Events are consumed on the
    // next render iteration, or discarded if nothing is loaded by then.
    //

    pub fn queue_pointer_move(&self, x: f32, y: f32) {
        self.input.push(InputEvent::moved(x, y));
    }

    pub fn queue_pointer_press(&self, x: f32, y: f32) {
        self.input.push(InputEvent::pressed(x, y));
    }

    pub fn queue_pointer_release(&self, x: f32, y: f32) {
        self.input.push(InputEvent::released(x, y));
    }

    //=====================================================================
    // State Machines
    //=====================================================================

    pub fn enumerate_state_machines(&self) -> Vec<StateMachineInfo> {
        self.lock().scene.enumerate_state_machines()
    }

    pub fn default_state_machine(&self) -> Option<StateMachineInfo> {
        self.lock().scene.default_state_machine()
    }

    pub fn state_machine_count(&self) -> usize {
        self.lock().scene.state_machine_count()
    }

    pub fn set_active_state_machine(&self, index: usize) -> bool {
        self.lock().scene.set_active_state_machine(index)
    }

    pub fn set_active_state_machine_by_name(&self, name: &str) -> bool {
        self.lock().scene.set_active_state_machine_by_name(name)
    }

    pub fn active_state_machine_index(&self) -> Option<usize> {
        self.lock().scene.active_state_machine_index()
    }

    pub fn active_state_machine_name(&self) -> Option<String> {
        self.lock().scene.active_state_machine_name()
    }

    /// Resumes a paused state machine. Animations ignore play/pause.
    pub fn play(&self) {
        self.lock().scene.play();
    }

    pub fn pause(&self) {
        self.lock().scene.pause();
    }

    /// Rebuilds the active state machine, keeping the view-model binding.
    pub fn reset(&self) {
        self.lock().scene.reset();
    }

    /// True while a state machine is the active scene, even if paused.
    pub fn is_active(&self) -> bool {
        self.lock().scene.is_active()
    }

    /// True when the next frame will advance the scene.
    pub fn is_playing(&self) -> bool {
        self.lock().scene.is_playing()
    }

    pub fn current_state(&self) -> Option<String> {
        self.lock().scene.current_state()
    }

    //--- Inputs -----------------------------------------------------------

    pub fn state_machine_inputs(&self) -> Vec<StateMachineInputInfo> {
        self.lock().scene.state_machine_inputs()
    }

    pub fn set_boolean_input(&self, name: &str, value: bool) -> bool {
        self.lock().scene.set_boolean_input(name, value)
    }

    pub fn set_number_input(&self, name: &str, value: f64) -> bool {
        self.lock().scene.set_number_input(name, value)
    }

    pub fn fire_trigger(&self, name: &str) -> bool {
        self.lock().scene.fire_trigger(name)
    }

    pub fn boolean_input(&self, name: &str) -> Option<bool> {
        self.lock().scene.boolean_input(name)
    }

    pub fn number_input(&self, name: &str) -> Option<f64> {
        self.lock().scene.number_input(name)
    }

    //=====================================================================
    // View-Model Properties
    //=====================================================================

    pub fn view_model_name(&self) -> Option<String> {
        let state = self.lock();
        let vm = state.scene.view_model()?.lock();
        vm.view_model_name().map(str::to_string)
    }

    pub fn view_model_properties(&self) -> Vec<ViewModelPropertyInfo> {
        self.read_view_model(|vm| vm.properties()).unwrap_or_default()
    }

    pub fn get_string_property(&self, name: &str) -> Option<String> {
        self.read_view_model(|vm| vm.string(name).map(str::to_string)).flatten()
    }

    pub fn get_number_property(&self, name: &str) -> Option<f64> {
        self.read_view_model(|vm| vm.number(name)).flatten()
    }

    pub fn get_boolean_property(&self, name: &str) -> Option<bool> {
        self.read_view_model(|vm| vm.boolean(name)).flatten()
    }

    pub fn get_color_property(&self, name: &str) -> Option<u32> {
        self.read_view_model(|vm| vm.color(name)).flatten()
    }

    pub fn get_enum_property(&self, name: &str) -> Option<i32> {
        self.read_view_model(|vm| vm.enum_index(name)).flatten()
    }

    pub fn set_string_property(&self, name: &str, value: &str) -> bool {
        self.write_view_model(|vm| vm.set_string(name, value))
    }

    pub fn set_number_property(&self, name: &str, value: f64) -> bool {
        self.write_view_model(|vm| vm.set_number(name, value))
    }

    pub fn set_boolean_property(&self, name: &str, value: bool) -> bool {
        self.write_view_model(|vm| vm.set_boolean(name, value))
    }

    pub fn set_color_property(&self, name: &str, argb: u32) -> bool {
        self.write_view_model(|vm| vm.set_color(name, argb))
    }

    pub fn set_enum_property(&self, name: &str, index: i32) -> bool {
        self.write_view_model(|vm| vm.set_enum(name, index))
    }

    pub fn fire_view_model_trigger(&self, name: &str) -> bool {
        self.write_view_model(|vm| vm.fire_trigger(name))
    }

    fn read_view_model<T>(&self, read: impl FnOnce(&ViewModelInstance) -> T) -> Option<T> {
        let state = self.lock();
        let vm = state.scene.view_model()?.lock();
        Some(read(&vm))
    }

    fn write_view_model(&self, write: impl FnOnce(&mut ViewModelInstance) -> bool) -> bool {
        let state = self.lock();
        let Some(handle) = state.scene.view_model() else {
            return false;
        };
        let written = write(&mut handle.lock());
        written
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scene::NullBackend;
    use crate::error::DeviceError;
    use std::thread;
    use std::time::{Duration, Instant};

    const CLIP: &str = r#"{
        "view_models": [{"name": "Theme", "properties": [
            {"name": "accent", "kind": "color", "value": 4294901760},
            {"name": "title", "kind": "string", "value": "clip"},
            {"name": "speed", "kind": "number", "value": 1}
        ]}],
        "artboards": [{
            "name": "Clip", "width": 400, "height": 300, "view_model": 0,
            "shapes": [
                {"name": "bg", "x": 0, "y": 0, "width": 400, "height": 300, "bind_color": "accent"},
                {"name": "ball", "kind": "ellipse", "x": 0, "y": 100, "width": 100, "height": 100, "color": 4278190335}
            ],
            "animations": [{"name": "roll", "duration": 2, "loop": "loop", "tracks": [
                {"shape": 1, "property": "x", "keys": [{"time": 0, "value": 0}, {"time": 2, "value": 300}]}
            ]}],
            "state_machines": [{"name": "Main",
                "inputs": [{"name": "pressed", "kind": "boolean"}],
                "states": [{"name": "Rolling", "animation": 0}],
                "listeners": [{"shape": 0, "event": "down", "input": "pressed", "value": true}]
            }],
            "default_state_machine": 0
        }]
    }"#;

    fn write_clip(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("clip.riv");
        std::fs::write(&path, CLIP).unwrap();
        path
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    //=====================================================================
    // EngineBuilder Tests
    //=====================================================================

    #[test]
    fn builder_defaults() {
        let builder = EngineBuilder::new();
        assert_eq!(builder.fps, 60.0);
        assert_eq!(builder.clear_color, Color::from_argb(0xff40_4040));
        assert_eq!(builder.backend.name(), "motion-document");
        assert_eq!(builder.device_factory.name(), "software");
    }

    #[test]
    #[should_panic(expected = "FPS must be positive")]
    fn builder_with_fps_panics_on_zero() {
        EngineBuilder::new().with_fps(0.0);
    }

    #[test]
    #[should_panic(expected = "FPS must be positive")]
    fn builder_with_fps_panics_on_negative() {
        EngineBuilder::new().with_fps(-60.0);
    }

    #[test]
    fn builder_fluent_api_chaining() {
        let engine = EngineBuilder::new()
            .with_fps(30.0)
            .with_clear_color(0xff000000)
            .with_scene_backend(NullBackend)
            .build();
        assert_eq!(engine.fps(), 30.0);
        assert!(!engine.load_bytes(CLIP.as_bytes().to_vec()));
    }

    //=====================================================================
    // Lifecycle
    //=====================================================================

    #[test]
    fn concrete_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new();
        assert!(engine.initialize(800, 600));
        assert!(engine.load_file(write_clip(&dir)));

        assert_eq!(
            engine.default_state_machine(),
            Some(StateMachineInfo { name: "Main".into(), index: 0, is_default: true })
        );
        assert!(engine.set_active_state_machine(0));
        assert!(engine.is_active());

        assert!(engine.start_render_loop());
        let visual = engine.get_visual();
        assert!(wait_for(|| visual.snapshot().is_some()));

        engine.pause();
        assert!(engine.is_active());
        assert!(!engine.is_playing());

        let before = visual.snapshot().unwrap();
        assert!(wait_for(|| visual.snapshot().map_or(false, |f| f.frame_index >= before.frame_index + 3)));
        let after = visual.snapshot().unwrap();
        assert!(after.same_image(&before));

        engine.shutdown();
    }

    #[test]
    fn fatal_initialization_leaves_engine_unusable() {
        let factory = SoftwareDeviceFactory::new();
        factory.refuse_devices(true);
        let engine = EngineBuilder::new().with_device_factory(factory).build();

        assert!(matches!(
            engine.try_initialize(100, 100),
            Err(EngineError::Device(DeviceError::NoCompatibleDevice(_)))
        ));
        assert!(!engine.is_initialized());
        assert!(!engine.start_render_loop());
        assert_eq!(engine.step_frame(), FrameOutcome::NoDevice);
    }

    #[test]
    fn initialize_twice_is_rejected() {
        let engine = Engine::new();
        assert!(engine.initialize(10, 10));
        assert!(matches!(engine.try_initialize(10, 10), Err(EngineError::AlreadyInitialized)));
    }

    #[test]
    fn shutdown_and_stop_are_idempotent() {
        let engine = Engine::new();
        assert!(engine.initialize(64, 64));
        assert!(engine.load_bytes(CLIP.as_bytes().to_vec()));
        assert!(engine.start_render_loop());
        assert!(engine.start_render_loop(), "already running");

        engine.stop_render_loop();
        engine.stop_render_loop();
        assert!(!engine.is_rendering());

        engine.shutdown();
        engine.shutdown();
        assert!(!engine.is_initialized());
        assert!(!engine.is_file_loaded());
        assert!(!engine.get_visual().is_bound());
    }

    #[test]
    fn set_size_tracks_visual() {
        let engine = Engine::new();
        assert!(engine.initialize(100, 100));
        engine.set_size(320, 240);
        engine.set_size(0, 240);
        assert_eq!(engine.get_visual().size(), (320, 240));
    }

    #[test]
    fn render_pause_and_resume() {
        let engine = Engine::new();
        assert!(engine.initialize(32, 32));
        assert!(engine.start_render_loop());
        engine.pause_rendering();
        assert!(engine.is_rendering_paused());
        engine.resume_rendering();
        assert!(!engine.is_rendering_paused());
        assert!(wait_for(|| engine.frames_presented() > 0));
    }

    //=====================================================================
    // Content
    //=====================================================================

    #[test]
    fn failed_load_preserves_current_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_clip(&dir);
        let bad = dir.path().join("bad.riv");
        std::fs::write(&bad, b"\x00not a motion document").unwrap();

        let engine = Engine::new();
        assert!(engine.load_file(&path));
        assert!(!engine.load_file(&bad));
        assert!(!engine.load_file(dir.path().join("missing.riv")));
        assert_eq!(engine.loaded_file_path(), Some(path));
        assert_eq!(engine.artboard_name().as_deref(), Some("Clip"));
        assert_eq!(engine.animation_count(), 1);
        assert_eq!(engine.active_scene_kind(), Some(SceneKind::StateMachine));
    }

    #[test]
    fn pointer_press_reaches_listener() {
        let engine = Engine::new();
        assert!(engine.initialize(800, 600));
        assert!(engine.load_bytes(CLIP.as_bytes().to_vec()));

        // Artboard 400x300 fills 800x600 at 2x.
        engine.queue_pointer_press(10.0, 10.0);
        assert_eq!(engine.step_frame(), FrameOutcome::Presented);
        assert_eq!(engine.boolean_input("pressed"), Some(true));
    }

    #[test]
    fn unload_discards_pending_input() {
        let engine = Engine::new();
        assert!(engine.initialize(800, 600));
        assert!(engine.load_bytes(CLIP.as_bytes().to_vec()));
        engine.queue_pointer_press(10.0, 10.0);
        engine.unload_file();
        assert!(engine.load_bytes(CLIP.as_bytes().to_vec()));
        engine.step_frame();
        assert_eq!(engine.boolean_input("pressed"), Some(false));
    }

    #[test]
    fn view_model_round_trip_through_engine() {
        let engine = Engine::new();
        assert!(engine.load_bytes(CLIP.as_bytes().to_vec()));
        assert_eq!(engine.view_model_name().as_deref(), Some("Theme"));
        assert_eq!(engine.view_model_properties().len(), 3);

        assert!(engine.set_color_property("accent", 0xff00ff00));
        assert!(!engine.set_color_property("title", 0));
        assert!(engine.set_string_property("title", "renamed"));
        assert_eq!(engine.get_color_property("accent"), Some(0xff00ff00));
        assert_eq!(engine.get_string_property("title").as_deref(), Some("renamed"));
        assert_eq!(engine.get_number_property("speed"), Some(1.0));
        assert_eq!(engine.get_boolean_property("speed"), None);
        assert!(!engine.fire_view_model_trigger("speed"));
    }

    #[test]
    fn view_model_survives_state_machine_reset() {
        let engine = Engine::new();
        assert!(engine.load_bytes(CLIP.as_bytes().to_vec()));
        assert!(engine.set_number_property("speed", 4.0));
        assert!(engine.set_boolean_input("pressed", true));
        engine.reset();
        assert_eq!(engine.boolean_input("pressed"), Some(false));
        assert_eq!(engine.get_number_property("speed"), Some(4.0));
        assert!(engine.set_active_state_machine_by_name("Main"));
        assert!(!engine.set_active_state_machine(3));
        assert_eq!(engine.get_number_property("speed"), Some(4.0));
    }

    #[test]
    fn queries_without_content_are_empty() {
        let engine = Engine::new();
        assert!(engine.enumerate_state_machines().is_empty());
        assert_eq!(engine.default_state_machine(), None);
        assert_eq!(engine.state_machine_count(), 0);
        assert_eq!(engine.active_state_machine_index(), None);
        assert!(!engine.is_active());
        assert!(!engine.fire_trigger("x"));
        assert_eq!(engine.get_string_property("x"), None);
        assert!(!engine.set_number_property("x", 1.0));
    }

    #[test]
    fn device_loss_is_invisible_to_the_host() {
        let factory = SoftwareDeviceFactory::new();
        let injector = factory.loss_injector();
        let engine = EngineBuilder::new().with_device_factory(factory.clone()).build();
        assert!(engine.initialize(50, 50));
        assert!(engine.load_bytes(CLIP.as_bytes().to_vec()));

        for _ in 0..3 {
            injector.inject();
            assert_eq!(engine.step_frame(), FrameOutcome::Presented);
        }
        assert_eq!(factory.devices_created(), 4);
        assert!(engine.get_visual().snapshot().is_some());
    }
}
