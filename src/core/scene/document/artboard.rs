//=========================================================================
// Document Artboards
//=========================================================================
//
// An artboard instance is its definition plus a mutable pose. Scenes
// created from the artboard hold the same `ArtboardState`, so whatever a
// scene applies is what the artboard draws and what hit-testing sees.
//
//=========================================================================

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use kurbo::{Point, Rect};

use super::animation::AnimationInstance;
use super::schema::{ArtboardDef, ShapeDef, ShapeKind, ShapeProperty};
use super::state_machine::StateMachineInstance;
use crate::core::scene::view_model::{ViewModelHandle, ViewModelInstance};
use crate::core::scene::{Artboard, SceneInstance};
use crate::platform::canvas::{Canvas, Color};

//=== Pose ================================================================

/// Animated geometry of one shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapePose {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ShapePose {
    fn from_def(shape: &ShapeDef) -> Self {
        Self { x: shape.x, y: shape.y, width: shape.width, height: shape.height }
    }

    pub fn set(&mut self, property: ShapeProperty, value: f64) {
        match property {
            ShapeProperty::X => self.x = value,
            ShapeProperty::Y => self.y = value,
            ShapeProperty::Width => self.width = value,
            ShapeProperty::Height => self.height = value,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

//=== ArtboardState =======================================================

/// Shared between an artboard instance and the scenes built from it.
pub(crate) struct ArtboardState {
    def: Arc<ArtboardDef>,
    pose: Mutex<Vec<ShapePose>>,
}

impl ArtboardState {
    pub fn new(def: Arc<ArtboardDef>) -> Self {
        let pose = def.shapes.iter().map(ShapePose::from_def).collect();
        Self { def, pose: Mutex::new(pose) }
    }

    pub fn def(&self) -> &ArtboardDef {
        &self.def
    }

    pub fn pose(&self) -> MutexGuard<'_, Vec<ShapePose>> {
        self.pose.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_visible(&self, shape: &ShapeDef, view_model: Option<&ViewModelInstance>) -> bool {
        shape
            .bind_visible
            .as_deref()
            .and_then(|name| view_model?.boolean(name))
            .unwrap_or(shape.visible)
    }

    fn color(&self, shape: &ShapeDef, view_model: Option<&ViewModelInstance>) -> Color {
        shape
            .bind_color
            .as_deref()
            .and_then(|name| view_model?.color(name))
            .map_or(Color(shape.color), Color)
    }

    /// Visible shapes under `point`, in artboard space.
    pub fn hit_test(&self, point: Point, view_model: Option<&ViewModelInstance>) -> Vec<usize> {
        let pose = self.pose();
        self.def
            .shapes
            .iter()
            .zip(pose.iter())
            .enumerate()
            .filter(|(_, (shape, pose))| {
                self.is_visible(shape, view_model) && contains(shape.kind, pose.rect(), point)
            })
            .map(|(index, _)| index)
            .collect()
    }
}

fn contains(kind: ShapeKind, rect: Rect, point: Point) -> bool {
    match kind {
        ShapeKind::Rect => rect.contains(point),
        ShapeKind::Ellipse => {
            let (rx, ry) = (rect.width() / 2.0, rect.height() / 2.0);
            if rx <= 0.0 || ry <= 0.0 {
                return false;
            }
            let c = rect.center();
            let (dx, dy) = ((point.x - c.x) / rx, (point.y - c.y) / ry);
            dx * dx + dy * dy <= 1.0
        }
    }
}

//=== DocumentArtboard ====================================================

pub(crate) struct DocumentArtboard {
    state: Arc<ArtboardState>,
    view_model: Option<ViewModelHandle>,
}

impl DocumentArtboard {
    pub fn new(def: Arc<ArtboardDef>) -> Self {
        Self { state: Arc::new(ArtboardState::new(def)), view_model: None }
    }
}

impl Artboard for DocumentArtboard {
    fn name(&self) -> &str {
        &self.state.def().name
    }

    fn bounds(&self) -> Rect {
        let def = self.state.def();
        Rect::new(0.0, 0.0, def.width, def.height)
    }

    fn animation_count(&self) -> usize {
        self.state.def().animations.len()
    }

    fn animation_name_at(&self, index: usize) -> Option<String> {
        self.state.def().animations.get(index).map(|a| a.name.clone())
    }

    fn animation_at(&self, index: usize) -> Option<Box<dyn SceneInstance>> {
        let instance = AnimationInstance::new(Arc::clone(&self.state), index)?;
        Some(Box::new(instance))
    }

    fn state_machine_count(&self) -> usize {
        self.state.def().state_machines.len()
    }

    fn state_machine_name_at(&self, index: usize) -> Option<String> {
        self.state.def().state_machines.get(index).map(|m| m.name.clone())
    }

    fn state_machine_at(&self, index: usize) -> Option<Box<dyn SceneInstance>> {
        let instance = StateMachineInstance::new(Arc::clone(&self.state), index)?;
        Some(Box::new(instance))
    }

    fn default_state_machine_index(&self) -> Option<usize> {
        self.state.def().default_state_machine
    }

    fn view_model_index(&self) -> Option<usize> {
        self.state.def().view_model
    }

    fn bind_view_model_instance(&mut self, view_model: ViewModelHandle) {
        self.view_model = Some(view_model);
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        let guard = self.view_model.as_ref().map(|vm| vm.lock());
        let view_model = guard.as_deref();
        let pose = self.state.pose();

        for (shape, pose) in self.state.def().shapes.iter().zip(pose.iter()) {
            if !self.state.is_visible(shape, view_model) {
                continue;
            }
            let color = self.state.color(shape, view_model);
            match shape.kind {
                ShapeKind::Rect => canvas.fill_rect(pose.rect(), color),
                ShapeKind::Ellipse => canvas.fill_ellipse(pose.rect(), color),
            }
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
