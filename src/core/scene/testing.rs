//=========================================================================
// Scene Test Doubles
//=========================================================================
//
// A scriptable backend that records what the engine asks of it.
//
// Every artboard and scene created from one `MockBackend` shares a call
// log and an animation clock. Drawing paints the artboard background and
// a marker whose position follows the clock, so frames differ exactly
// when something advanced.
//
//=========================================================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use kurbo::{Point, Rect};

use super::view_model::{ViewModelHandle, ViewModelInstance};
use super::{
    Artboard, InputKind, SceneBackend, SceneFile, SceneInstance, StateMachineInputInfo,
};
use crate::error::SceneError;
use crate::platform::canvas::{Canvas, Color};

//=== MockSpec ============================================================

#[derive(Debug, Clone)]
pub(crate) struct MockSpec {
    /// `None` means the file has no default artboard.
    pub artboard: Option<Rect>,
    pub animations: Vec<&'static str>,
    pub state_machines: Vec<&'static str>,
    pub default_state_machine: Option<usize>,
    pub view_model: Option<ViewModelInstance>,
}

impl Default for MockSpec {
    fn default() -> Self {
        Self {
            artboard: Some(Rect::new(0.0, 0.0, 100.0, 100.0)),
            animations: Vec::new(),
            state_machines: Vec::new(),
            default_state_machine: None,
            view_model: None,
        }
    }
}

//=== Shared Recorder =====================================================

#[derive(Default)]
struct Recorder {
    calls: Vec<String>,
    clock: f64,
}

type SharedRecorder = Arc<Mutex<Recorder>>;

fn record(recorder: &SharedRecorder, call: String) {
    recorder.lock().unwrap_or_else(PoisonError::into_inner).calls.push(call);
}

//=== MockBackend =========================================================

#[derive(Clone)]
pub(crate) struct MockBackend {
    spec: MockSpec,
    recorder: SharedRecorder,
}

impl MockBackend {
    pub fn new(spec: MockSpec) -> Self {
        Self { spec, recorder: SharedRecorder::default() }
    }

    pub fn calls(&self) -> Vec<String> {
        self.recorder.lock().unwrap().calls.clone()
    }

    /// Recorded calls excluding advances.
    pub fn pointer_calls(&self) -> Vec<String> {
        self.calls().into_iter().filter(|c| !c.starts_with("advance") && !c.starts_with("bind")).collect()
    }

    pub fn clear_calls(&self) {
        self.recorder.lock().unwrap().calls.clear();
    }

    /// Total time advanced across all scenes.
    pub fn clock(&self) -> f64 {
        self.recorder.lock().unwrap().clock
    }
}

impl SceneBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn import(&self, bytes: &[u8]) -> Result<Box<dyn SceneFile>, SceneError> {
        if bytes == b"garbage" {
            return Err(SceneError::Unreadable("garbage".into()));
        }
        Ok(Box::new(MockFile { spec: self.spec.clone(), recorder: Arc::clone(&self.recorder) }))
    }
}

//=== MockFile / MockArtboard =============================================

struct MockFile {
    spec: MockSpec,
    recorder: SharedRecorder,
}

impl SceneFile for MockFile {
    fn artboard_count(&self) -> usize {
        usize::from(self.spec.artboard.is_some())
    }

    fn default_artboard(&self) -> Option<Box<dyn Artboard>> {
        let bounds = self.spec.artboard?;
        Some(Box::new(MockArtboard {
            spec: self.spec.clone(),
            bounds,
            recorder: Arc::clone(&self.recorder),
        }))
    }

    fn view_model_count(&self) -> usize {
        usize::from(self.spec.view_model.is_some())
    }

    fn instantiate_view_model(&self, index: usize) -> Option<ViewModelInstance> {
        (index == 0).then(|| self.spec.view_model.clone()).flatten()
    }
}

struct MockArtboard {
    spec: MockSpec,
    bounds: Rect,
    recorder: SharedRecorder,
}

impl MockArtboard {
    fn scene(&self, name: &str) -> Box<dyn SceneInstance> {
        Box::new(MockScene {
            name: name.to_string(),
            recorder: Arc::clone(&self.recorder),
            view_model: None,
            booleans: HashMap::from([("flag".to_string(), false)]),
        })
    }
}

impl Artboard for MockArtboard {
    fn name(&self) -> &str {
        "Mock"
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn animation_count(&self) -> usize {
        self.spec.animations.len()
    }

    fn animation_name_at(&self, index: usize) -> Option<String> {
        self.spec.animations.get(index).map(|s| s.to_string())
    }

    fn animation_at(&self, index: usize) -> Option<Box<dyn SceneInstance>> {
        self.spec.animations.get(index).map(|name| self.scene(name))
    }

    fn state_machine_count(&self) -> usize {
        self.spec.state_machines.len()
    }

    fn state_machine_name_at(&self, index: usize) -> Option<String> {
        self.spec.state_machines.get(index).map(|s| s.to_string())
    }

    fn state_machine_at(&self, index: usize) -> Option<Box<dyn SceneInstance>> {
        self.spec.state_machines.get(index).map(|name| self.scene(name))
    }

    fn default_state_machine_index(&self) -> Option<usize> {
        self.spec.default_state_machine
    }

    fn view_model_index(&self) -> Option<usize> {
        self.spec.view_model.as_ref().map(|_| 0)
    }

    fn bind_view_model_instance(&mut self, _view_model: ViewModelHandle) {
        record(&self.recorder, "bind-artboard".into());
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        let clock = self.recorder.lock().unwrap_or_else(PoisonError::into_inner).clock;
        canvas.fill_rect(self.bounds, Color::WHITE);
        let x = self.bounds.x0 + (clock * 40.0) % (self.bounds.width() - 10.0).max(1.0);
        canvas.fill_rect(Rect::new(x, self.bounds.y0, x + 10.0, self.bounds.y0 + 10.0), Color::BLACK);
    }
}

//=== MockScene ===========================================================

struct MockScene {
    name: String,
    recorder: SharedRecorder,
    view_model: Option<ViewModelHandle>,
    booleans: HashMap<String, bool>,
}

impl SceneInstance for MockScene {
    fn name(&self) -> &str {
        &self.name
    }

    fn advance_and_apply(&mut self, elapsed: f32) -> bool {
        let mut recorder = self.recorder.lock().unwrap_or_else(PoisonError::into_inner);
        recorder.clock += f64::from(elapsed);
        recorder.calls.push(format!("advance:{}", self.name));
        true
    }

    fn bind_view_model_instance(&mut self, view_model: ViewModelHandle) {
        record(&self.recorder, format!("bind:{}", self.name));
        self.view_model = Some(view_model);
    }

    fn bound_view_model(&self) -> Option<&ViewModelHandle> {
        self.view_model.as_ref()
    }

    fn pointer_move(&mut self, position: Point, is_down: bool) {
        record(&self.recorder, format!("move({:.0},{:.0},{})", position.x, position.y, is_down));
    }

    fn pointer_down(&mut self, position: Point) {
        record(&self.recorder, format!("down({:.0},{:.0})", position.x, position.y));
    }

    fn pointer_up(&mut self, position: Point) {
        record(&self.recorder, format!("up({:.0},{:.0})", position.x, position.y));
    }

    fn inputs(&self) -> Vec<StateMachineInputInfo> {
        vec![StateMachineInputInfo { name: "flag".into(), kind: InputKind::Boolean }]
    }

    fn set_boolean_input(&mut self, name: &str, value: bool) -> bool {
        match self.booleans.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn boolean_input(&self, name: &str) -> Option<bool> {
        self.booleans.get(name).copied()
    }
}
