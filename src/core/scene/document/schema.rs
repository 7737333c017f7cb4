//=========================================================================
// Motion Document Schema
//=========================================================================
//
// Serde model of a motion document plus structural validation.
//
// Every index in a document (shape, animation, state, view model) is
// checked once at import, so evaluation code may index freely.
//
//=========================================================================

use serde::{Deserialize, Serialize};

use crate::core::scene::InputKind;
use crate::core::scene::PropertyKind;

pub type SchemaResult<T> = Result<T, String>;

//=== Document ============================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub artboards: Vec<ArtboardDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_artboard: Option<usize>,
    #[serde(default)]
    pub view_models: Vec<ViewModelDef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtboardDef {
    pub name: String,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub shapes: Vec<ShapeDef>,
    #[serde(default)]
    pub animations: Vec<AnimationDef>,
    #[serde(default)]
    pub state_machines: Vec<StateMachineDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_state_machine: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_model: Option<usize>,
}

//=== Shapes ==============================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    #[default]
    Rect,
    Ellipse,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShapeDef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: ShapeKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "opaque_black")]
    pub color: u32,
    #[serde(default = "yes")]
    pub visible: bool,
    /// Color property overriding `color`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_color: Option<String>,
    /// Boolean property overriding `visible`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_visible: Option<String>,
}

fn opaque_black() -> u32 {
    0xff00_0000
}

fn yes() -> bool {
    true
}

//=== Animations ==========================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    #[default]
    OneShot,
    Loop,
    PingPong,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeProperty {
    X,
    Y,
    Width,
    Height,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnimationDef {
    pub name: String,
    /// Seconds.
    pub duration: f32,
    #[serde(default, rename = "loop")]
    pub loop_mode: LoopMode,
    #[serde(default)]
    pub tracks: Vec<TrackDef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackDef {
    pub shape: usize,
    pub property: ShapeProperty,
    pub keys: Vec<KeyDef>, // sorted by time
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct KeyDef {
    pub time: f32,
    pub value: f64,
}

impl TrackDef {
    /// Linear interpolation, holding the first/last key outside the range.
    pub fn sample(&self, time: f32) -> f64 {
        let idx = self.keys.partition_point(|k| k.time <= time);
        if idx == 0 {
            return self.keys[0].value;
        }
        if idx >= self.keys.len() {
            return self.keys[self.keys.len() - 1].value;
        }

        let a = self.keys[idx - 1];
        let b = self.keys[idx];
        let span = b.time - a.time;
        if span <= 0.0 {
            return a.value;
        }
        let t = f64::from((time - a.time) / span);
        a.value + (b.value - a.value) * t
    }
}

//=== State Machines ======================================================

/// Literal used by input defaults, conditions and listeners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateMachineDef {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<InputDef>,
    pub states: Vec<StateDef>,
    #[serde(default)]
    pub initial: usize,
    #[serde(default)]
    pub transitions: Vec<TransitionDef>,
    #[serde(default)]
    pub listeners: Vec<ListenerDef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputDef {
    pub name: String,
    pub kind: InputKindDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Scalar>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKindDef {
    Boolean,
    Number,
    Trigger,
}

impl From<InputKindDef> for InputKind {
    fn from(kind: InputKindDef) -> Self {
        match kind {
            InputKindDef::Boolean => InputKind::Boolean,
            InputKindDef::Number => InputKind::Number,
            InputKindDef::Trigger => InputKind::Trigger,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionDef {
    /// `None` matches any state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,
    pub to: usize,
    #[serde(default)]
    pub conditions: Vec<ConditionDef>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Fired,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConditionDef {
    pub input: String,
    pub op: ConditionOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Scalar>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerEvent {
    Down,
    Up,
    Enter,
    Exit,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListenerDef {
    pub shape: usize,
    pub event: ListenerEvent,
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Scalar>,
}

//=== View Models =========================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViewModelDef {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKindDef {
    String,
    Number,
    Boolean,
    Color,
    Enum,
    Trigger,
}

impl From<PropertyKindDef> for PropertyKind {
    fn from(kind: PropertyKindDef) -> Self {
        match kind {
            PropertyKindDef::String => PropertyKind::String,
            PropertyKindDef::Number => PropertyKind::Number,
            PropertyKindDef::Boolean => PropertyKind::Boolean,
            PropertyKindDef::Color => PropertyKind::Color,
            PropertyKindDef::Enum => PropertyKind::Enum,
            PropertyKindDef::Trigger => PropertyKind::Trigger,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub kind: PropertyKindDef,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub value: serde_json::Value,
    /// Enum value names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

//=========================================================================
// Validation
//=========================================================================

impl Document {
    /// Effective default artboard: explicit, else the first.
    pub fn default_artboard_index(&self) -> Option<usize> {
        match self.default_artboard {
            Some(index) => Some(index),
            None => (!self.artboards.is_empty()).then_some(0),
        }
    }

    pub fn validate(&self) -> SchemaResult<()> {
        if let Some(index) = self.default_artboard {
            if index >= self.artboards.len() {
                return Err(format!("default_artboard {index} out of range"));
            }
        }
        for vm in &self.view_models {
            vm.validate()?;
        }
        for artboard in &self.artboards {
            artboard.validate(self)?;
        }
        Ok(())
    }
}

impl ViewModelDef {
    fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    fn validate(&self) -> SchemaResult<()> {
        for p in &self.properties {
            let ok = match p.kind {
                _ if p.value.is_null() => true,
                PropertyKindDef::String => p.value.is_string(),
                PropertyKindDef::Number => p.value.is_number(),
                PropertyKindDef::Boolean => p.value.is_boolean(),
                PropertyKindDef::Color => p.value.as_u64().map_or(false, |v| v <= u64::from(u32::MAX)),
                PropertyKindDef::Enum => p
                    .value
                    .as_u64()
                    .map_or(false, |v| p.values.is_empty() || (v as usize) < p.values.len()),
                PropertyKindDef::Trigger => false,
            };
            if !ok {
                return Err(format!(
                    "view model '{}' property '{}' has an invalid default",
                    self.name, p.name
                ));
            }
        }
        Ok(())
    }
}

impl ArtboardDef {
    fn validate(&self, doc: &Document) -> SchemaResult<()> {
        let name = &self.name;
        if !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0) {
            return Err(format!("artboard '{name}' must have a positive size"));
        }
        if let Some(index) = self.default_state_machine {
            if index >= self.state_machines.len() {
                return Err(format!("artboard '{name}' default_state_machine {index} out of range"));
            }
        }
        let view_model = match self.view_model {
            Some(index) => Some(
                doc.view_models
                    .get(index)
                    .ok_or_else(|| format!("artboard '{name}' view_model {index} out of range"))?,
            ),
            None => None,
        };

        for shape in &self.shapes {
            let bindings = [
                (&shape.bind_color, PropertyKindDef::Color),
                (&shape.bind_visible, PropertyKindDef::Boolean),
            ];
            for (binding, kind) in bindings {
                let Some(property) = binding else { continue };
                let resolved = view_model.and_then(|vm| vm.property(property));
                if resolved.map(|p| p.kind) != Some(kind) {
                    return Err(format!(
                        "shape '{}' binds '{property}', which is not a {kind:?} property of the artboard's view model",
                        shape.name
                    ));
                }
            }
        }

        for animation in &self.animations {
            if !(animation.duration.is_finite() && animation.duration >= 0.0) {
                return Err(format!("animation '{}' has an invalid duration", animation.name));
            }
            for track in &animation.tracks {
                if track.shape >= self.shapes.len() {
                    return Err(format!("animation '{}' targets missing shape {}", animation.name, track.shape));
                }
                if track.keys.is_empty() {
                    return Err(format!("animation '{}' has a track without keys", animation.name));
                }
                if !track.keys.windows(2).all(|w| w[0].time <= w[1].time) {
                    return Err(format!("animation '{}' keys must be sorted by time", animation.name));
                }
            }
        }

        for machine in &self.state_machines {
            machine.validate(self)?;
        }
        Ok(())
    }
}

impl StateMachineDef {
    pub fn input(&self, name: &str) -> Option<(usize, &InputDef)> {
        self.inputs.iter().enumerate().find(|(_, i)| i.name == name)
    }

    fn validate(&self, artboard: &ArtboardDef) -> SchemaResult<()> {
        let name = &self.name;
        if self.states.is_empty() {
            return Err(format!("state machine '{name}' has no states"));
        }
        if self.initial >= self.states.len() {
            return Err(format!("state machine '{name}' initial state out of range"));
        }
        for input in &self.inputs {
            let ok = matches!(
                (input.kind, input.value),
                (_, None)
                    | (InputKindDef::Boolean, Some(Scalar::Bool(_)))
                    | (InputKindDef::Number, Some(Scalar::Number(_)))
            );
            if !ok {
                return Err(format!("input '{}' has a default of the wrong type", input.name));
            }
        }
        for state in &self.states {
            if state.animation.map_or(false, |a| a >= artboard.animations.len()) {
                return Err(format!("state '{}' references a missing animation", state.name));
            }
        }
        for transition in &self.transitions {
            let from_ok = transition.from.map_or(true, |f| f < self.states.len());
            if !from_ok || transition.to >= self.states.len() {
                return Err(format!("state machine '{name}' has a transition to or from a missing state"));
            }
            for condition in &transition.conditions {
                self.validate_condition(condition)?;
            }
        }
        for listener in &self.listeners {
            if listener.shape >= artboard.shapes.len() {
                return Err(format!("state machine '{name}' listener targets missing shape {}", listener.shape));
            }
            let (_, input) = self
                .input(&listener.input)
                .ok_or_else(|| format!("listener references unknown input '{}'", listener.input))?;
            let ok = matches!(
                (input.kind, listener.value),
                (_, None)
                    | (InputKindDef::Boolean, Some(Scalar::Bool(_)))
                    | (InputKindDef::Number, Some(Scalar::Number(_)))
            );
            if !ok {
                return Err(format!("listener value does not match input '{}'", input.name));
            }
        }
        Ok(())
    }

    fn validate_condition(&self, condition: &ConditionDef) -> SchemaResult<()> {
        let (_, input) = self
            .input(&condition.input)
            .ok_or_else(|| format!("condition references unknown input '{}'", condition.input))?;
        let ok = match input.kind {
            InputKindDef::Trigger => condition.op == ConditionOp::Fired,
            InputKindDef::Boolean => {
                matches!(condition.op, ConditionOp::Eq | ConditionOp::Ne)
                    && matches!(condition.value, None | Some(Scalar::Bool(_)))
            }
            InputKindDef::Number => {
                condition.op != ConditionOp::Fired
                    && matches!(condition.value, None | Some(Scalar::Number(_)))
            }
        };
        if ok {
            Ok(())
        } else {
            Err(format!("condition {:?} is not valid for input '{}'", condition.op, input.name))
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Document {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let doc = parse(r#"{"artboards":[{"name":"A","width":10,"height":10,"shapes":[{"x":0,"y":0,"width":1,"height":1}]}]}"#);
        let shape = &doc.artboards[0].shapes[0];
        assert_eq!(shape.kind, ShapeKind::Rect);
        assert_eq!(shape.color, 0xff00_0000);
        assert!(shape.visible);
        assert_eq!(doc.default_artboard_index(), Some(0));
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn empty_document_has_no_default_artboard() {
        assert_eq!(Document::default().default_artboard_index(), None);
    }

    #[test]
    fn track_sampling_interpolates_and_holds() {
        let track = TrackDef {
            shape: 0,
            property: ShapeProperty::X,
            keys: vec![KeyDef { time: 0.0, value: 0.0 }, KeyDef { time: 1.0, value: 100.0 }],
        };
        assert_eq!(track.sample(-1.0), 0.0);
        assert_eq!(track.sample(0.25), 25.0);
        assert_eq!(track.sample(2.0), 100.0);
    }

    #[test]
    fn rejects_dangling_references() {
        let bad = [
            r#"{"artboards":[],"default_artboard":0}"#,
            r#"{"artboards":[{"name":"A","width":1,"height":1,"default_state_machine":0}]}"#,
            r#"{"artboards":[{"name":"A","width":1,"height":1,"view_model":2}]}"#,
            r#"{"artboards":[{"name":"A","width":1,"height":1,
                "animations":[{"name":"a","duration":1,"tracks":[{"shape":3,"property":"x","keys":[{"time":0,"value":0}]}]}]}]}"#,
            r#"{"artboards":[{"name":"A","width":1,"height":1,
                "state_machines":[{"name":"m","states":[{"name":"s","animation":0}]}]}]}"#,
            r#"{"artboards":[{"name":"A","width":1,"height":1,
                "state_machines":[{"name":"m","states":[{"name":"s"}],"transitions":[{"to":4}]}]}]}"#,
            r#"{"artboards":[{"name":"A","width":0,"height":1}]}"#,
        ];
        for json in bad {
            assert!(parse(json).validate().is_err(), "accepted: {json}");
        }
    }

    #[test]
    fn rejects_mistyped_conditions_and_bindings() {
        let condition = r#"{"artboards":[{"name":"A","width":1,"height":1,
            "state_machines":[{"name":"m","inputs":[{"name":"go","kind":"trigger"}],
            "states":[{"name":"s"}],"transitions":[{"to":0,"conditions":[{"input":"go","op":"gt","value":1}]}]}]}]}"#;
        assert!(parse(condition).validate().is_err());

        let binding = r#"{"view_models":[{"name":"V","properties":[{"name":"on","kind":"boolean"}]}],
            "artboards":[{"name":"A","width":1,"height":1,"view_model":0,
            "shapes":[{"x":0,"y":0,"width":1,"height":1,"bind_color":"on"}]}]}"#;
        assert!(parse(binding).validate().is_err());
    }
}
