//=========================================================================
// Render Loop
//
// Dedicated worker thread that turns host-side state into presented
// frames.
//
// Responsibilities:
// - Recover a lost graphics device before touching anything derived from it
// - Drain pointer input and forward it, in artboard space, to the scene
// - Advance the active scene and draw it through the alignment transform
// - Present, and remember a device loss for the next iteration
// - Keep a fixed pacing and react promptly to pause/resume/stop
//
// Notes:
// All mutable engine state lives in `EngineState` behind one mutex (the
// "device lock"). The host takes it around load/resize/playback calls and
// the render thread takes it once per iteration, so a frame always sees a
// consistent device, scene and mapper. Commands travel over a channel so
// a paused loop sleeps instead of polling.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

//=== External Crates =====================================================

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, trace, warn};

//=== Internal Modules ====================================================

pub mod coords;
pub mod input;
pub mod scene;

use crate::error::{EngineError, PresentError};
use crate::platform::canvas::{Canvas, Color, PixmapCanvas};
use crate::platform::manager::GraphicsDeviceManager;
use coords::CoordinateMapper;
use input::{InputEventQueue, PointerTracker};
use scene::SceneController;

//=== EngineState =========================================================

/// Everything the render thread reads or mutates, guarded as one unit.
pub struct EngineState {
    /// `None` until initialized and after shutdown.
    pub graphics: Option<GraphicsDeviceManager>,
    pub scene: SceneController,
    pub mapper: CoordinateMapper,
    pub pointer: PointerTracker,
    pub clear_color: Color,
}

pub type SharedState = Arc<Mutex<EngineState>>;

impl EngineState {
    pub fn new(scene: SceneController, clear_color: Color) -> Self {
        Self {
            graphics: None,
            scene,
            mapper: CoordinateMapper::new(0, 0),
            pointer: PointerTracker::new(),
            clear_color,
        }
    }

    /// Points the mapper at whatever artboard is loaded now.
    pub fn sync_artboard(&mut self) {
        self.mapper.bind_artboard(self.scene.artboard_bounds());
        self.pointer.reset();
    }
}

/// Acquires the device lock, recovering the state if a holder panicked.
pub fn lock_state(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

//=== Frame Driver ========================================================

/// Result of one render iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// Nothing to render into (not initialized or shut down).
    NoDevice,
    /// The device was lost and could not be rebuilt; retried next frame.
    RecoveryFailed,
    /// Present reported device loss; recovery runs next frame.
    DeviceLost,
    /// Present failed for another reason; logged and ignored.
    PresentFailed,
}

/// Runs one iteration: recover → input → advance → draw → present.
pub fn render_frame(state: &mut EngineState, input: &InputEventQueue, elapsed: f32) -> FrameOutcome {
    //--- Step 1: Device recovery ---------------------------------------
    {
        let Some(graphics) = state.graphics.as_mut() else {
            return FrameOutcome::NoDevice;
        };
        if graphics.is_device_lost() {
            warn!(target: "render", "Graphics device lost; recreating");
            if let Err(err) = graphics.recreate() {
                warn!(target: "render", "Device recovery failed, retrying next frame: {err}");
                return FrameOutcome::RecoveryFailed;
            }
        }
    }

    //--- Step 2: Pointer input -----------------------------------------
    for event in input.drain_all(state.scene.is_loaded()) {
        let action = state.pointer.track(event.kind);
        match state.mapper.to_scene_space(event.position()) {
            Some(position) => state.scene.pointer(action, position),
            None => trace!(target: "input", "Dropping {:?}: no scene-space mapping", event.kind),
        }
    }

    //--- Step 3: Advance -----------------------------------------------
    state.scene.advance(elapsed);

    //--- Step 4: Draw --------------------------------------------------
    let transform = state.mapper.transform();
    let Some(graphics) = state.graphics.as_mut() else {
        return FrameOutcome::NoDevice;
    };
    let Some(back_buffer) = graphics.back_buffer() else {
        return FrameOutcome::DeviceLost;
    };
    let mut canvas = PixmapCanvas::new(back_buffer);
    canvas.clear(state.clear_color);
    if let Some(transform) = transform {
        state.scene.draw(&mut canvas, transform);
    }

    //--- Step 5: Present -----------------------------------------------
    match graphics.present() {
        Ok(()) => FrameOutcome::Presented,
        Err(PresentError::DeviceLost) => {
            warn!(target: "render", "Present reported device loss");
            FrameOutcome::DeviceLost
        }
        Err(err) => {
            warn!(target: "render", "{err}");
            FrameOutcome::PresentFailed
        }
    }
}

//=== TickControl =========================================================
//
// Whether the loop keeps running after handling commands.
//
pub(crate) enum TickControl {
    Continue,
    Exit,
}

//=== LoopCommand =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCommand {
    Pause,
    Resume,
    Stop,
}

//=== RenderLoop ==========================================================

pub struct RenderLoop {
    commands: Sender<LoopCommand>,
    handle: Option<thread::JoinHandle<()>>,
    paused: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
}

impl RenderLoop {
    //--- spawn() ----------------------------------------------------------
    //
    // Starts the render thread at `fps` iterations per second. Each scene
    // advance uses the fixed step 1/fps.
    //
    pub fn spawn(
        state: SharedState,
        input: Arc<InputEventQueue>,
        fps: f64,
    ) -> Result<Self, EngineError> {
        let frame_duration = Duration::from_secs_f64(1.0 / fps);
        let (commands, receiver) = unbounded();
        let paused = Arc::new(AtomicBool::new(false));
        let frames = Arc::new(AtomicU64::new(0));

        let thread_frames = Arc::clone(&frames);
        let handle = thread::Builder::new()
            .name("render".into())
            .spawn(move || Self::run(state, input, receiver, thread_frames, frame_duration))
            .map_err(|e| EngineError::RenderThread(e.to_string()))?;

        info!(target: "render", "Render loop started ({fps} fps)");
        Ok(Self { commands, handle: Some(handle), paused, frames })
    }

    fn run(
        state: SharedState,
        input: Arc<InputEventQueue>,
        receiver: Receiver<LoopCommand>,
        frames: Arc<AtomicU64>,
        frame_duration: Duration,
    ) {
        let elapsed = frame_duration.as_secs_f32();
        let mut paused = false;

        loop {
            let frame_start = Instant::now();

            //--- Step 1: Render one frame --------------------------------
            if !paused {
                let outcome = render_frame(&mut lock_state(&state), &input, elapsed);
                if outcome == FrameOutcome::Presented {
                    frames.fetch_add(1, Ordering::Relaxed);
                }
            }

            //--- Step 2: Handle commands, pacing to the next frame -------
            let deadline = frame_start + frame_duration;
            if let TickControl::Exit = Self::wait_for_commands(&receiver, &mut paused, deadline) {
                info!(target: "render", "Render thread exiting");
                break;
            }
        }
    }

    //--- wait_for_commands() ---------------------------------------------
    //
    // Sleeps until `deadline`, applying commands as they arrive. While
    // paused it blocks until resumed or stopped.
    //
    fn wait_for_commands(
        receiver: &Receiver<LoopCommand>,
        paused: &mut bool,
        deadline: Instant,
    ) -> TickControl {
        loop {
            let received = if *paused {
                receiver.recv().map_err(|_| RecvTimeoutError::Disconnected)
            } else {
                receiver.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            };

            match received {
                Ok(LoopCommand::Stop) | Err(RecvTimeoutError::Disconnected) => {
                    return TickControl::Exit
                }
                Ok(LoopCommand::Pause) => {
                    debug!(target: "render", "Rendering paused");
                    *paused = true;
                }
                Ok(LoopCommand::Resume) if *paused => {
                    debug!(target: "render", "Rendering resumed");
                    *paused = false;
                    return TickControl::Continue;
                }
                Ok(LoopCommand::Resume) => {}
                Err(RecvTimeoutError::Timeout) => return TickControl::Continue,
            }
        }
    }

    //--- Control ----------------------------------------------------------

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        let _ = self.commands.send(LoopCommand::Pause);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        let _ = self.commands.send(LoopCommand::Resume);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Frames presented since the loop started.
    pub fn frames_presented(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Signals the thread and joins it. Idempotent.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.commands.send(LoopCommand::Stop);
        match handle.join() {
            Ok(()) => info!(target: "render", "Render loop stopped"),
            Err(e) => error!(target: "render", "Render thread panicked: {e:?}"),
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
