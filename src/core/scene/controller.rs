//=========================================================================
// Scene Controller
//=========================================================================
//
// Owns the loaded file, its default artboard, the active scene and the
// view-model instance bound to both.
//
// Lifecycle:
//   Empty → Loaded → { StateMachine | Animation | Static } active
//
// A failed load never disturbs what is already loaded. Switching or
// resetting the state machine builds a fresh instance against the same
// artboard and rebinds the same view-model handle.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kurbo::{Affine, Point, Rect};
use log::{debug, info, warn};

//=== Internal Dependencies ===============================================

use super::view_model::{ViewModelHandle, ViewModelInstance};
use super::{
    Artboard, SceneBackend, SceneFile, SceneInstance, SceneKind, StateMachineInfo,
    StateMachineInputInfo,
};
use crate::core::input::{PointerAction, PointerKind};
use crate::error::SceneError;
use crate::platform::canvas::Canvas;

//=== PlaybackState =======================================================

/// Whether a state-machine scene advances. Animation scenes ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Active,
    Paused,
}

//=== ActiveScene =========================================================

/// The scene bound to the artboard, tagged by kind.
pub enum ActiveScene {
    StateMachine { index: usize, instance: Box<dyn SceneInstance> },
    Animation { index: usize, instance: Box<dyn SceneInstance> },
    Static,
}

impl ActiveScene {
    pub fn kind(&self) -> SceneKind {
        match self {
            Self::StateMachine { .. } => SceneKind::StateMachine,
            Self::Animation { .. } => SceneKind::Animation,
            Self::Static => SceneKind::Static,
        }
    }

    pub fn instance(&self) -> Option<&dyn SceneInstance> {
        match self {
            Self::StateMachine { instance, .. } | Self::Animation { instance, .. } => {
                Some(instance.as_ref())
            }
            Self::Static => None,
        }
    }

    pub fn instance_mut(&mut self) -> Option<&mut (dyn SceneInstance + 'static)> {
        match self {
            Self::StateMachine { instance, .. } | Self::Animation { instance, .. } => {
                Some(instance.as_mut())
            }
            Self::Static => None,
        }
    }

    fn state_machine_mut(&mut self) -> Option<&mut (dyn SceneInstance + 'static)> {
        match self {
            Self::StateMachine { instance, .. } => Some(instance.as_mut()),
            _ => None,
        }
    }

    fn state_machine(&self) -> Option<&dyn SceneInstance> {
        match self {
            Self::StateMachine { instance, .. } => Some(instance.as_ref()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for ActiveScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StateMachine { index, instance } => {
                write!(f, "StateMachine({index}, {:?})", instance.name())
            }
            Self::Animation { index, instance } => {
                write!(f, "Animation({index}, {:?})", instance.name())
            }
            Self::Static => f.write_str("Static"),
        }
    }
}

//=== LoadedContent =======================================================

struct LoadedContent {
    path: Option<PathBuf>,
    bytes: Arc<[u8]>,
    /// Kept alive for the lifetime of everything instantiated from it.
    file: Box<dyn SceneFile>,
    artboard: Box<dyn Artboard>,
    scene: ActiveScene,
    view_model: ViewModelHandle,
    /// Author default, else 0 when any state machine exists.
    default_state_machine: Option<usize>,
}

//=== SceneController =====================================================

pub struct SceneController {
    backend: Arc<dyn SceneBackend>,
    content: Option<LoadedContent>,
    playback: PlaybackState,
}

impl SceneController {
    //--- Construction -----------------------------------------------------

    pub fn new(backend: Arc<dyn SceneBackend>) -> Self {
        Self {
            backend,
            content: None,
            playback: PlaybackState::Active,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    //--- Loading ----------------------------------------------------------

    /// Reads `path` in full and loads it.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        self.load(bytes.into(), Some(path.to_path_buf()))
    }

    /// Loads an in-memory file.
    pub fn load_bytes(&mut self, bytes: impl Into<Arc<[u8]>>) -> Result<(), SceneError> {
        self.load(bytes.into(), None)
    }

    fn load(&mut self, bytes: Arc<[u8]>, path: Option<PathBuf>) -> Result<(), SceneError> {
        let file = self.backend.import(&bytes)?;
        let mut artboard = file.default_artboard().ok_or(SceneError::NoDefaultArtboard)?;

        let state_machines = artboard.state_machine_count();
        let default_state_machine = artboard
            .default_state_machine_index()
            .filter(|&index| index < state_machines)
            .or((state_machines > 0).then_some(0));

        let instance = artboard
            .view_model_index()
            .and_then(|index| file.instantiate_view_model(index))
            .unwrap_or_else(ViewModelInstance::anonymous);
        let view_model = ViewModelHandle::new(instance);
        artboard.bind_view_model_instance(view_model.clone());

        let mut scene = select_scene(artboard.as_ref(), default_state_machine);
        if let Some(instance) = scene.instance_mut() {
            instance.bind_view_model_instance(view_model.clone());
            instance.advance_and_apply(0.0);
        }

        info!(
            target: "scene",
            "Loaded {} ({} bytes): artboard '{}', scene {:?}",
            path.as_deref().map_or_else(|| String::from("<memory>"), |p| p.display().to_string()),
            bytes.len(),
            artboard.name(),
            scene,
        );

        self.content = Some(LoadedContent {
            path,
            bytes,
            file,
            artboard,
            scene,
            view_model,
            default_state_machine,
        });
        self.playback = PlaybackState::Active;
        Ok(())
    }

    /// Drops everything loaded. Returns false if nothing was.
    pub fn unload(&mut self) -> bool {
        self.playback = PlaybackState::Active;
        let unloaded = self.content.take().is_some();
        if unloaded {
            debug!(target: "scene", "Scene content unloaded");
        }
        unloaded
    }

    //--- Introspection ----------------------------------------------------

    /// True when a scene is bound and may receive input.
    pub fn is_loaded(&self) -> bool {
        self.content.is_some()
    }

    pub fn loaded_path(&self) -> Option<&Path> {
        self.content.as_ref()?.path.as_deref()
    }

    pub fn file_size(&self) -> usize {
        self.content.as_ref().map_or(0, |c| c.bytes.len())
    }

    pub fn artboard_count(&self) -> usize {
        self.content.as_ref().map_or(0, |c| c.file.artboard_count())
    }

    pub fn artboard_name(&self) -> Option<&str> {
        Some(self.content.as_ref()?.artboard.name())
    }

    pub fn artboard_bounds(&self) -> Option<Rect> {
        Some(self.content.as_ref()?.artboard.bounds())
    }

    pub fn animation_names(&self) -> Vec<String> {
        let Some(content) = &self.content else {
            return Vec::new();
        };
        (0..content.artboard.animation_count())
            .filter_map(|i| content.artboard.animation_name_at(i))
            .collect()
    }

    pub fn scene_kind(&self) -> Option<SceneKind> {
        Some(self.content.as_ref()?.scene.kind())
    }

    pub fn active_scene(&self) -> Option<&ActiveScene> {
        Some(&self.content.as_ref()?.scene)
    }

    pub fn view_model(&self) -> Option<&ViewModelHandle> {
        Some(&self.content.as_ref()?.view_model)
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    //--- State Machines ---------------------------------------------------

    pub fn state_machine_count(&self) -> usize {
        self.content.as_ref().map_or(0, |c| c.artboard.state_machine_count())
    }

    pub fn enumerate_state_machines(&self) -> Vec<StateMachineInfo> {
        let Some(content) = &self.content else {
            return Vec::new();
        };
        (0..content.artboard.state_machine_count())
            .map(|index| StateMachineInfo {
                name: content.artboard.state_machine_name_at(index).unwrap_or_default(),
                index,
                is_default: content.default_state_machine == Some(index),
            })
            .collect()
    }

    pub fn default_state_machine(&self) -> Option<StateMachineInfo> {
        let content = self.content.as_ref()?;
        let index = content.default_state_machine?;
        Some(StateMachineInfo {
            name: content.artboard.state_machine_name_at(index)?,
            index,
            is_default: true,
        })
    }

    pub fn active_state_machine_index(&self) -> Option<usize> {
        match self.content.as_ref()?.scene {
            ActiveScene::StateMachine { index, .. } => Some(index),
            _ => None,
        }
    }

    pub fn active_state_machine_name(&self) -> Option<String> {
        let content = self.content.as_ref()?;
        content.artboard.state_machine_name_at(self.active_state_machine_index()?)
    }

    /// Replaces the active scene with a fresh instance of state machine
    /// `index`. Fails without side effects on an unknown index.
    pub fn set_active_state_machine(&mut self, index: usize) -> bool {
        let Some(content) = &mut self.content else {
            warn!(target: "scene", "No file loaded; cannot activate state machine {index}");
            return false;
        };
        let Some(mut instance) = content.artboard.state_machine_at(index) else {
            warn!(target: "scene", "Invalid state machine index: {index}");
            return false;
        };
        instance.bind_view_model_instance(content.view_model.clone());

        debug!(target: "scene", "Activating state machine {index} '{}'", instance.name());
        content.scene = ActiveScene::StateMachine { index, instance };
        self.playback = PlaybackState::Active;
        true
    }

    pub fn set_active_state_machine_by_name(&mut self, name: &str) -> bool {
        let found = self.enumerate_state_machines().into_iter().find(|info| info.name == name);
        match found {
            Some(info) => self.set_active_state_machine(info.index),
            None => {
                warn!(target: "scene", "State machine not found: '{name}'");
                false
            }
        }
    }

    //--- Playback ---------------------------------------------------------
    //
    // Only state-machine scenes honour play/pause. Animation scenes keep
    // advancing every frame.
    //

    pub fn play(&mut self) -> bool {
        if self.scene_kind() != Some(SceneKind::StateMachine) {
            return false;
        }
        self.playback = PlaybackState::Active;
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.scene_kind() != Some(SceneKind::StateMachine) {
            return false;
        }
        self.playback = PlaybackState::Paused;
        true
    }

    /// Rebuilds the active state machine from its definition. Playback
    /// state is kept: a paused machine stays paused.
    pub fn reset(&mut self) -> bool {
        let Some(index) = self.active_state_machine_index() else {
            return false;
        };
        let playback = self.playback;
        let rebuilt = self.set_active_state_machine(index);
        self.playback = playback;
        rebuilt
    }

    /// True while a state machine is the active scene, playing or paused.
    pub fn is_active(&self) -> bool {
        self.scene_kind() == Some(SceneKind::StateMachine)
    }

    /// True when the next frame will advance the scene.
    pub fn is_playing(&self) -> bool {
        match self.scene_kind() {
            Some(SceneKind::Animation) => true,
            Some(SceneKind::StateMachine) => self.playback == PlaybackState::Active,
            _ => false,
        }
    }

    //--- Inputs -----------------------------------------------------------

    pub fn state_machine_inputs(&self) -> Vec<StateMachineInputInfo> {
        self.state_machine().map(|sm| sm.inputs()).unwrap_or_default()
    }

    pub fn set_boolean_input(&mut self, name: &str, value: bool) -> bool {
        self.state_machine_mut().map_or(false, |sm| sm.set_boolean_input(name, value))
    }

    pub fn set_number_input(&mut self, name: &str, value: f64) -> bool {
        self.state_machine_mut().map_or(false, |sm| sm.set_number_input(name, value))
    }

    pub fn fire_trigger(&mut self, name: &str) -> bool {
        self.state_machine_mut().map_or(false, |sm| sm.fire_trigger(name))
    }

    pub fn boolean_input(&self, name: &str) -> Option<bool> {
        self.state_machine()?.boolean_input(name)
    }

    pub fn number_input(&self, name: &str) -> Option<f64> {
        self.state_machine()?.number_input(name)
    }

    pub fn current_state(&self) -> Option<String> {
        self.state_machine()?.current_state()
    }

    fn state_machine(&self) -> Option<&dyn SceneInstance> {
        self.content.as_ref()?.scene.state_machine()
    }

    fn state_machine_mut(&mut self) -> Option<&mut (dyn SceneInstance + 'static)> {
        self.content.as_mut()?.scene.state_machine_mut()
    }

    //--- Frame Work -------------------------------------------------------

    /// Forwards one tracked pointer event, already in artboard space.
    pub fn pointer(&mut self, action: PointerAction, position: Point) {
        let Some(scene) = self.content.as_mut().and_then(|c| c.scene.instance_mut()) else {
            return;
        };
        match action.kind {
            PointerKind::Move => scene.pointer_move(position, action.is_down),
            PointerKind::Press => scene.pointer_down(position),
            PointerKind::Release => scene.pointer_up(position),
        }
    }

    /// Advances the active scene by `elapsed` seconds, per kind.
    /// Returns whether anything advanced.
    pub fn advance(&mut self, elapsed: f32) -> bool {
        let playing = self.is_playing();
        let Some(content) = &mut self.content else {
            return false;
        };
        match &mut content.scene {
            ActiveScene::Static => false,
            // Animations do not observe play/pause.
            ActiveScene::Animation { instance, .. } => {
                instance.advance_and_apply(elapsed);
                true
            }
            ActiveScene::StateMachine { instance, .. } => {
                if playing {
                    instance.advance_and_apply(elapsed);
                }
                playing
            }
        }
    }

    /// Draws the artboard through `transform` (render ← artboard).
    pub fn draw(&self, canvas: &mut dyn Canvas, transform: Affine) {
        let Some(content) = &self.content else {
            return;
        };
        canvas.save();
        canvas.transform(transform);
        content.artboard.draw(canvas);
        canvas.restore();
    }
}

//=== Scene Selection =====================================================
//
// State machine (default, else 0) → first animation → static.
//
fn select_scene(artboard: &dyn Artboard, default_state_machine: Option<usize>) -> ActiveScene {
    if let Some(index) = default_state_machine {
        if let Some(instance) = artboard.state_machine_at(index) {
            return ActiveScene::StateMachine { index, instance };
        }
    }
    if let Some(instance) = artboard.animation_at(0) {
        return ActiveScene::Animation { index: 0, instance };
    }
    ActiveScene::Static
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scene::testing::{MockBackend, MockSpec};
    use crate::core::scene::view_model::ViewModelProperty;
    use crate::core::scene::NullBackend;

    fn controller(spec: MockSpec) -> (SceneController, MockBackend) {
        let backend = MockBackend::new(spec);
        (SceneController::new(Arc::new(backend.clone())), backend)
    }

    fn with_view_model() -> MockSpec {
        MockSpec {
            state_machines: vec!["A", "B"],
            view_model: Some(ViewModelInstance::new(
                "Card",
                vec![ViewModelProperty::number("progress", 0.0)],
            )),
            ..MockSpec::default()
        }
    }

    //=====================================================================
    // Loading
    //=====================================================================

    #[test]
    fn prefers_default_state_machine() {
        let (mut sc, _) = controller(MockSpec {
            state_machines: vec!["Idle", "Main"],
            default_state_machine: Some(1),
            animations: vec!["spin"],
            ..MockSpec::default()
        });
        sc.load_bytes(b"ok".to_vec()).unwrap();
        assert_eq!(sc.scene_kind(), Some(SceneKind::StateMachine));
        assert_eq!(sc.active_state_machine_index(), Some(1));
        assert_eq!(
            sc.default_state_machine(),
            Some(StateMachineInfo { name: "Main".into(), index: 1, is_default: true })
        );
    }

    #[test]
    fn falls_back_to_first_state_machine_then_animation_then_static() {
        let (mut sc, _) = controller(MockSpec {
            state_machines: vec!["One"],
            animations: vec!["spin"],
            ..MockSpec::default()
        });
        sc.load_bytes(b"ok".to_vec()).unwrap();
        assert_eq!(sc.active_state_machine_index(), Some(0));
        assert!(sc.enumerate_state_machines()[0].is_default);

        let (mut sc, _) = controller(MockSpec { animations: vec!["spin"], ..MockSpec::default() });
        sc.load_bytes(b"ok".to_vec()).unwrap();
        assert_eq!(sc.scene_kind(), Some(SceneKind::Animation));
        assert!(sc.default_state_machine().is_none());

        let (mut sc, _) = controller(MockSpec::default());
        sc.load_bytes(b"ok".to_vec()).unwrap();
        assert_eq!(sc.scene_kind(), Some(SceneKind::Static));
        assert!(!sc.advance(1.0));
    }

    #[test]
    fn load_advances_by_zero_and_binds_view_model() {
        let (mut sc, backend) = controller(with_view_model());
        sc.load_bytes(b"ok".to_vec()).unwrap();
        assert_eq!(backend.clock(), 0.0);
        assert_eq!(backend.calls(), vec!["bind-artboard", "bind:A", "advance:A"]);
        assert_eq!(sc.view_model().unwrap().lock().view_model_name(), Some("Card"));
    }

    #[test]
    fn artboard_without_view_model_gets_anonymous_instance() {
        let (mut sc, _) = controller(MockSpec { state_machines: vec!["A"], ..MockSpec::default() });
        sc.load_bytes(b"ok".to_vec()).unwrap();
        assert!(sc.view_model().unwrap().lock().is_anonymous());
    }

    #[test]
    fn failed_load_keeps_previous_content() {
        let (mut sc, _) = controller(with_view_model());
        sc.load_bytes(b"ok".to_vec()).unwrap();
        sc.set_active_state_machine(1);

        assert!(matches!(sc.load_bytes(b"garbage".to_vec()), Err(SceneError::Unreadable(_))));
        assert!(matches!(
            sc.load_file("/definitely/not/here.riv"),
            Err(SceneError::Io(_))
        ));
        assert_eq!(sc.active_state_machine_index(), Some(1));
        assert_eq!(sc.file_size(), 2);
    }

    #[test]
    fn missing_default_artboard_is_reported() {
        let (mut sc, _) = controller(MockSpec { artboard: None, ..MockSpec::default() });
        assert!(matches!(sc.load_bytes(b"ok".to_vec()), Err(SceneError::NoDefaultArtboard)));
        assert!(!sc.is_loaded());
    }

    #[test]
    fn null_backend_loads_nothing() {
        let mut sc = SceneController::new(Arc::new(NullBackend));
        assert!(matches!(
            sc.load_bytes(b"anything".to_vec()),
            Err(SceneError::BackendUnavailable("null"))
        ));
        assert_eq!(sc.backend_name(), "null");
    }

    #[test]
    fn load_file_records_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.riv");
        std::fs::write(&path, b"ok").unwrap();

        let (mut sc, _) = controller(MockSpec::default());
        sc.load_file(&path).unwrap();
        assert_eq!(sc.loaded_path(), Some(path.as_path()));
        assert!(sc.unload());
        assert!(!sc.unload());
        assert_eq!(sc.loaded_path(), None);
    }

    //=====================================================================
    // State Machines
    //=====================================================================

    #[test]
    fn switch_preserves_view_model_values() {
        let (mut sc, _) = controller(with_view_model());
        sc.load_bytes(b"ok".to_vec()).unwrap();
        let handle = sc.view_model().unwrap().clone();
        handle.lock().set_number("progress", 0.75);

        assert!(sc.set_active_state_machine_by_name("B"));
        assert_eq!(sc.active_state_machine_index(), Some(1));
        assert_eq!(sc.view_model().unwrap().lock().number("progress"), Some(0.75));

        let bound = sc.active_scene().unwrap().instance().unwrap().bound_view_model().unwrap();
        assert!(bound.ptr_eq(&handle));
    }

    #[test]
    fn invalid_switch_changes_nothing() {
        let (mut sc, _) = controller(with_view_model());
        assert!(!sc.set_active_state_machine(0), "nothing loaded");

        sc.load_bytes(b"ok".to_vec()).unwrap();
        assert!(!sc.set_active_state_machine(7));
        assert!(!sc.set_active_state_machine_by_name("Nope"));
        assert_eq!(sc.active_state_machine_index(), Some(0));
    }

    #[test]
    fn reset_rebuilds_but_keeps_binding() {
        let (mut sc, backend) = controller(with_view_model());
        sc.load_bytes(b"ok".to_vec()).unwrap();
        let handle = sc.view_model().unwrap().clone();
        assert!(sc.set_boolean_input("flag", true));
        assert_eq!(sc.boolean_input("flag"), Some(true));

        backend.clear_calls();
        assert!(sc.reset());
        assert_eq!(sc.boolean_input("flag"), Some(false));
        assert_eq!(backend.calls(), vec!["bind:A"]);
        let bound = sc.active_scene().unwrap().instance().unwrap().bound_view_model().unwrap();
        assert!(bound.ptr_eq(&handle));
    }

    #[test]
    fn reset_preserves_pause() {
        let (mut sc, backend) = controller(with_view_model());
        sc.load_bytes(b"ok".to_vec()).unwrap();
        assert!(sc.pause());
        assert!(sc.reset());
        assert_eq!(sc.playback(), PlaybackState::Paused);
        assert!(sc.is_active());
        assert!(!sc.is_playing());
        assert!(!sc.advance(0.5));
        assert_eq!(backend.clock(), 0.0);

        assert!(sc.play());
        assert!(sc.reset());
        assert!(sc.is_playing());
    }

    #[test]
    fn pause_only_applies_to_state_machines() {
        let (mut sc, backend) = controller(with_view_model());
        sc.load_bytes(b"ok".to_vec()).unwrap();
        assert!(sc.pause());
        assert!(sc.is_active());
        assert!(!sc.is_playing());
        assert!(!sc.advance(0.5));
        assert_eq!(backend.clock(), 0.0);
        assert!(sc.play());
        assert!(sc.advance(0.5));
        assert_eq!(backend.clock(), 0.5);

        let (mut sc, backend) = controller(MockSpec { animations: vec!["spin"], ..MockSpec::default() });
        sc.load_bytes(b"ok".to_vec()).unwrap();
        assert!(!sc.pause());
        assert!(!sc.is_active());
        assert!(sc.advance(0.25));
        assert_eq!(backend.clock(), 0.25);
    }

    #[test]
    fn inputs_route_to_state_machine_only() {
        let (mut sc, _) = controller(MockSpec { animations: vec!["spin"], ..MockSpec::default() });
        sc.load_bytes(b"ok".to_vec()).unwrap();
        assert!(!sc.set_boolean_input("flag", true));
        assert!(sc.state_machine_inputs().is_empty());

        let (mut sc, _) = controller(with_view_model());
        sc.load_bytes(b"ok".to_vec()).unwrap();
        assert_eq!(sc.state_machine_inputs().len(), 1);
        assert!(!sc.set_number_input("flag", 1.0));
        assert!(!sc.fire_trigger("missing"));
    }
}
