//=========================================================================
// Document State Machines
//=========================================================================
//
// A state machine instance holds input values, the current state and the
// playhead of that state's animation.
//
// Per advance:
//   1. Take the first transition whose source and conditions match
//   2. Advance the current state's animation and apply it
//   3. Consume fired triggers (state-machine and view-model)
//
// Listeners react to pointer events hit-tested against the current pose.
//
//=========================================================================

use std::sync::Arc;

use kurbo::Point;
use log::trace;

use super::animation::AnimationPlayer;
use super::artboard::ArtboardState;
use super::schema::{
    ConditionDef, ConditionOp, InputKindDef, ListenerEvent, Scalar, StateMachineDef,
};
use crate::core::scene::view_model::ViewModelHandle;
use crate::core::scene::{SceneInstance, StateMachineInputInfo};

//=== InputValue ==========================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum InputValue {
    Boolean(bool),
    Number(f64),
    Trigger(bool),
}

impl InputValue {
    fn initial(kind: InputKindDef, default: Option<Scalar>) -> Self {
        match (kind, default) {
            (InputKindDef::Boolean, Some(Scalar::Bool(v))) => Self::Boolean(v),
            (InputKindDef::Boolean, _) => Self::Boolean(false),
            (InputKindDef::Number, Some(Scalar::Number(v))) => Self::Number(v),
            (InputKindDef::Number, _) => Self::Number(0.0),
            (InputKindDef::Trigger, _) => Self::Trigger(false),
        }
    }
}

//=== StateMachineInstance ================================================

pub(crate) struct StateMachineInstance {
    artboard: Arc<ArtboardState>,
    index: usize,
    inputs: Vec<InputValue>,
    current: usize,
    player: Option<AnimationPlayer>,
    hovered: Vec<bool>,
    view_model: Option<ViewModelHandle>,
}

impl StateMachineInstance {
    pub fn new(artboard: Arc<ArtboardState>, index: usize) -> Option<Self> {
        let def = artboard.def().state_machines.get(index)?;
        let inputs = def.inputs.iter().map(|i| InputValue::initial(i.kind, i.value)).collect();
        let initial = def.initial;
        let shapes = artboard.def().shapes.len();

        let mut instance = Self {
            artboard,
            index,
            inputs,
            current: 0,
            player: None,
            hovered: vec![false; shapes],
            view_model: None,
        };
        instance.enter(initial);
        Some(instance)
    }

    fn def(&self) -> &StateMachineDef {
        &self.artboard.def().state_machines[self.index]
    }

    fn enter(&mut self, state: usize) {
        self.current = state;
        self.player = self.def().states[state].animation.map(AnimationPlayer::new);
    }

    //--- Inputs -----------------------------------------------------------

    fn slot_mut(&mut self, name: &str) -> Option<&mut InputValue> {
        let (index, _) = self.def().input(name)?;
        self.inputs.get_mut(index)
    }

    fn slot(&self, name: &str) -> Option<InputValue> {
        let (index, _) = self.def().input(name)?;
        self.inputs.get(index).copied()
    }

    fn condition_holds(&self, condition: &ConditionDef) -> bool {
        let Some(value) = self.slot(&condition.input) else {
            return false;
        };
        match value {
            InputValue::Trigger(fired) => condition.op == ConditionOp::Fired && fired,
            InputValue::Boolean(actual) => {
                let expected = match condition.value {
                    Some(Scalar::Bool(v)) => v,
                    _ => true,
                };
                match condition.op {
                    ConditionOp::Eq => actual == expected,
                    ConditionOp::Ne => actual != expected,
                    _ => false,
                }
            }
            InputValue::Number(actual) => {
                let expected = match condition.value {
                    Some(Scalar::Number(v)) => v,
                    _ => 0.0,
                };
                match condition.op {
                    ConditionOp::Eq => actual == expected,
                    ConditionOp::Ne => actual != expected,
                    ConditionOp::Lt => actual < expected,
                    ConditionOp::Le => actual <= expected,
                    ConditionOp::Gt => actual > expected,
                    ConditionOp::Ge => actual >= expected,
                    ConditionOp::Fired => false,
                }
            }
        }
    }

    /// First matching transition target. Any-state transitions never
    /// re-enter the current state.
    fn pending_transition(&self) -> Option<usize> {
        self.def()
            .transitions
            .iter()
            .find(|t| {
                let source = match t.from {
                    Some(from) => from == self.current,
                    None => t.to != self.current,
                };
                source && t.conditions.iter().all(|c| self.condition_holds(c))
            })
            .map(|t| t.to)
    }

    //--- Listeners --------------------------------------------------------

    fn dispatch(&mut self, event: ListenerEvent, shapes: &[usize]) {
        let actions: Vec<(String, Option<Scalar>)> = self
            .def()
            .listeners
            .iter()
            .filter(|l| l.event == event && shapes.contains(&l.shape))
            .map(|l| (l.input.clone(), l.value))
            .collect();

        for (input, value) in actions {
            trace!(target: "scene", "Listener {event:?} → input '{input}'");
            if let Some(slot) = self.slot_mut(&input) {
                *slot = match (*slot, value) {
                    (InputValue::Boolean(_), Some(Scalar::Bool(v))) => InputValue::Boolean(v),
                    (InputValue::Boolean(current), _) => InputValue::Boolean(!current),
                    (InputValue::Number(_), Some(Scalar::Number(v))) => InputValue::Number(v),
                    (InputValue::Number(current), _) => InputValue::Number(current),
                    (InputValue::Trigger(_), _) => InputValue::Trigger(true),
                };
            }
        }
    }

    fn hits(&self, position: Point) -> Vec<usize> {
        let guard = self.view_model.as_ref().map(|vm| vm.lock());
        self.artboard.hit_test(position, guard.as_deref())
    }

    fn update_hover(&mut self, hits: &[usize]) {
        let mut entered = Vec::new();
        let mut exited = Vec::new();
        for (shape, hovered) in self.hovered.iter_mut().enumerate() {
            let inside = hits.contains(&shape);
            if inside && !*hovered {
                entered.push(shape);
            } else if !inside && *hovered {
                exited.push(shape);
            }
            *hovered = inside;
        }
        if !exited.is_empty() {
            self.dispatch(ListenerEvent::Exit, &exited);
        }
        if !entered.is_empty() {
            self.dispatch(ListenerEvent::Enter, &entered);
        }
    }
}

impl SceneInstance for StateMachineInstance {
    fn name(&self) -> &str {
        &self.def().name
    }

    fn advance_and_apply(&mut self, elapsed: f32) -> bool {
        if let Some(next) = self.pending_transition() {
            trace!(
                target: "scene",
                "'{}': {} → {}",
                self.def().name,
                self.def().states[self.current].name,
                self.def().states[next].name
            );
            self.enter(next);
        }

        if let Some(player) = &mut self.player {
            let def = &self.artboard.def().animations[player.index()];
            player.advance(def, elapsed);
            player.apply(def, &mut self.artboard.pose());
        }

        for input in &mut self.inputs {
            if let InputValue::Trigger(fired) = input {
                *fired = false;
            }
        }
        if let Some(vm) = &self.view_model {
            vm.lock().consume_triggers();
        }
        true
    }

    fn bind_view_model_instance(&mut self, view_model: ViewModelHandle) {
        self.view_model = Some(view_model);
    }

    fn bound_view_model(&self) -> Option<&ViewModelHandle> {
        self.view_model.as_ref()
    }

    fn pointer_move(&mut self, position: Point, _is_down: bool) {
        let hits = self.hits(position);
        self.update_hover(&hits);
    }

    fn pointer_down(&mut self, position: Point) {
        let hits = self.hits(position);
        self.update_hover(&hits);
        self.dispatch(ListenerEvent::Down, &hits);
    }

    fn pointer_up(&mut self, position: Point) {
        let hits = self.hits(position);
        self.update_hover(&hits);
        self.dispatch(ListenerEvent::Up, &hits);
    }

    fn inputs(&self) -> Vec<StateMachineInputInfo> {
        self.def()
            .inputs
            .iter()
            .map(|i| StateMachineInputInfo { name: i.name.clone(), kind: i.kind.into() })
            .collect()
    }

    fn set_boolean_input(&mut self, name: &str, value: bool) -> bool {
        match self.slot_mut(name) {
            Some(slot) if matches!(slot, InputValue::Boolean(_)) => {
                *slot = InputValue::Boolean(value);
                true
            }
            _ => false,
        }
    }

    fn set_number_input(&mut self, name: &str, value: f64) -> bool {
        match self.slot_mut(name) {
            Some(slot) if matches!(slot, InputValue::Number(_)) => {
                *slot = InputValue::Number(value);
                true
            }
            _ => false,
        }
    }

    fn fire_trigger(&mut self, name: &str) -> bool {
        match self.slot_mut(name) {
            Some(slot) if matches!(slot, InputValue::Trigger(_)) => {
                *slot = InputValue::Trigger(true);
                true
            }
            _ => false,
        }
    }

    fn boolean_input(&self, name: &str) -> Option<bool> {
        match self.slot(name)? {
            InputValue::Boolean(v) => Some(v),
            _ => None,
        }
    }

    fn number_input(&self, name: &str) -> Option<f64> {
        match self.slot(name)? {
            InputValue::Number(v) => Some(v),
            _ => None,
        }
    }

    fn current_state(&self) -> Option<String> {
        Some(self.def().states[self.current].name.clone())
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
