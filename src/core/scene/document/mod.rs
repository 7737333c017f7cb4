//=========================================================================
// Motion Document Backend
//=========================================================================
//
// Built-in `SceneBackend` reading JSON motion documents: artboards of
// rect/ellipse shapes, keyframe animations, state machines with inputs,
// transitions and pointer listeners, and view models for data binding.
//
// Import pipeline:
//   bytes → serde_json → Document::validate() → DocumentFile
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::Arc;

use log::debug;

//=== Internal Dependencies ===============================================

use crate::core::scene::view_model::{ViewModelInstance, ViewModelProperty};
use crate::core::scene::{Artboard, SceneBackend, SceneFile};
use crate::error::SceneError;

//=== Module Declarations =================================================

mod animation;
mod artboard;
pub mod schema;
mod state_machine;

use artboard::DocumentArtboard;
use schema::{Document, PropertyDef, PropertyKindDef, ViewModelDef};

//=== DocumentBackend =====================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentBackend;

impl DocumentBackend {
    pub fn new() -> Self {
        Self
    }

    /// Parses and validates without instantiating anything.
    pub fn parse(bytes: &[u8]) -> Result<Document, SceneError> {
        let doc: Document = serde_json::from_slice(bytes)
            .map_err(|e| SceneError::Unreadable(format!("malformed motion document: {e}")))?;
        doc.validate().map_err(SceneError::Unreadable)?;
        Ok(doc)
    }
}

impl SceneBackend for DocumentBackend {
    fn name(&self) -> &'static str {
        "motion-document"
    }

    fn import(&self, bytes: &[u8]) -> Result<Box<dyn SceneFile>, SceneError> {
        let doc = Self::parse(bytes)?;
        debug!(
            target: "scene",
            "Imported motion document: {} artboard(s), {} view model(s)",
            doc.artboards.len(),
            doc.view_models.len()
        );
        Ok(Box::new(DocumentFile::new(doc)))
    }
}

//=== DocumentFile ========================================================

struct DocumentFile {
    artboards: Vec<Arc<schema::ArtboardDef>>,
    default_artboard: Option<usize>,
    view_models: Vec<ViewModelDef>,
}

impl DocumentFile {
    fn new(doc: Document) -> Self {
        let default_artboard = doc.default_artboard_index();
        Self {
            artboards: doc.artboards.into_iter().map(Arc::new).collect(),
            default_artboard,
            view_models: doc.view_models,
        }
    }
}

impl SceneFile for DocumentFile {
    fn artboard_count(&self) -> usize {
        self.artboards.len()
    }

    fn default_artboard(&self) -> Option<Box<dyn Artboard>> {
        let def = self.artboards.get(self.default_artboard?)?;
        Some(Box::new(DocumentArtboard::new(Arc::clone(def))))
    }

    fn view_model_count(&self) -> usize {
        self.view_models.len()
    }

    fn instantiate_view_model(&self, index: usize) -> Option<ViewModelInstance> {
        let def = self.view_models.get(index)?;
        let properties = def.properties.iter().map(property_from_def).collect();
        Some(ViewModelInstance::new(def.name.clone(), properties))
    }
}

/// Default-valued property from its declaration. Defaults were type-checked
/// at validation; anything absent falls back to the kind's zero value.
fn property_from_def(def: &PropertyDef) -> ViewModelProperty {
    let name = def.name.clone();
    let value = &def.value;
    match def.kind {
        PropertyKindDef::String => {
            ViewModelProperty::string(name, value.as_str().unwrap_or_default())
        }
        PropertyKindDef::Number => ViewModelProperty::number(name, value.as_f64().unwrap_or(0.0)),
        PropertyKindDef::Boolean => {
            ViewModelProperty::boolean(name, value.as_bool().unwrap_or(false))
        }
        PropertyKindDef::Color => ViewModelProperty::color(
            name,
            value.as_u64().and_then(|v| u32::try_from(v).ok()).unwrap_or(0xff00_0000),
        ),
        PropertyKindDef::Enum => ViewModelProperty::enumeration(
            name,
            def.values.clone(),
            value.as_u64().and_then(|v| i32::try_from(v).ok()).unwrap_or(0),
        ),
        PropertyKindDef::Trigger => ViewModelProperty::trigger(name),
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scene::{PropertyKind, SceneController, SceneKind};
    use kurbo::Rect;

    const CLIP: &str = r#"{
        "view_models": [{"name": "Theme", "properties": [
            {"name": "accent", "kind": "color", "value": 4278255360},
            {"name": "label", "kind": "string", "value": "hi"},
            {"name": "size", "kind": "enum", "values": ["s", "m"], "value": 1},
            {"name": "pulse", "kind": "trigger"}
        ]}],
        "artboards": [{
            "name": "Clip", "width": 200, "height": 100, "view_model": 0,
            "shapes": [{"name": "bg", "x": 0, "y": 0, "width": 200, "height": 100, "bind_color": "accent"}],
            "animations": [{"name": "fade", "duration": 1}],
            "state_machines": [
                {"name": "Main", "states": [{"name": "Idle"}]},
                {"name": "Alt", "states": [{"name": "Idle"}]}
            ],
            "default_state_machine": 0
        }]
    }"#;

    #[test]
    fn imports_and_instantiates() {
        let file = DocumentBackend.import(CLIP.as_bytes()).unwrap();
        assert_eq!(file.artboard_count(), 1);
        let artboard = file.default_artboard().unwrap();
        assert_eq!(artboard.name(), "Clip");
        assert_eq!(artboard.bounds(), Rect::new(0.0, 0.0, 200.0, 100.0));
        assert_eq!(artboard.state_machine_name_at(1).as_deref(), Some("Alt"));
        assert_eq!(artboard.view_model_index(), Some(0));

        let vm = file.instantiate_view_model(0).unwrap();
        assert_eq!(vm.color("accent"), Some(0xff00ff00));
        assert_eq!(vm.string("label"), Some("hi"));
        assert_eq!(vm.enum_index("size"), Some(1));
        assert_eq!(vm.property("pulse").map(|p| p.kind()), Some(PropertyKind::Trigger));
    }

    #[test]
    fn malformed_bytes_are_unreadable() {
        for bytes in [&b"\x00\x01riv"[..], &b"{\"artboards\": 3}"[..], &b"{\"default_artboard\": 1}"[..]] {
            assert!(matches!(DocumentBackend.import(bytes), Err(SceneError::Unreadable(_))));
        }
    }

    #[test]
    fn document_without_artboards_has_no_default() {
        let file = DocumentBackend.import(b"{}").unwrap();
        assert!(file.default_artboard().is_none());
    }

    #[test]
    fn controller_loads_documents() {
        let mut sc = SceneController::new(Arc::new(DocumentBackend));
        sc.load_bytes(CLIP.as_bytes().to_vec()).unwrap();
        assert_eq!(sc.scene_kind(), Some(SceneKind::StateMachine));
        assert_eq!(sc.default_state_machine().unwrap().name, "Main");
        assert_eq!(sc.view_model().unwrap().lock().view_model_name(), Some("Theme"));
    }
}
