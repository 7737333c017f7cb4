//=========================================================================
// View-Model Instances
//=========================================================================
//
// A view-model instance is a bag of named, typed properties that a scene
// reads while it draws and advances, and that the host reads and writes
// for data binding.
//
// One instance is bound to the artboard and the active scene at the same
// time, so it is shared through a `ViewModelHandle`. Switching or
// resetting the state machine rebinds the same handle; values survive.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

//=== PropertyKind ========================================================

/// Property types a view model can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    String,
    Number,
    Boolean,
    /// Packed `0xAARRGGBB`.
    Color,
    /// Index into the property's value list.
    Enum,
    /// Stateless pulse; fired, then consumed by the scene.
    Trigger,
}

//=== PropertyValue =======================================================

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Color(u32),
    Enum(i32),
    /// Pending (fired but unconsumed) pulses.
    Trigger(u32),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::String(_) => PropertyKind::String,
            Self::Number(_) => PropertyKind::Number,
            Self::Boolean(_) => PropertyKind::Boolean,
            Self::Color(_) => PropertyKind::Color,
            Self::Enum(_) => PropertyKind::Enum,
            Self::Trigger(_) => PropertyKind::Trigger,
        }
    }
}

//=== ViewModelProperty ===================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ViewModelProperty {
    name: String,
    value: PropertyValue,
    enum_values: Vec<String>,
}

impl ViewModelProperty {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self { name: name.into(), value, enum_values: Vec::new() }
    }

    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, PropertyValue::String(value.into()))
    }

    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, PropertyValue::Number(value))
    }

    pub fn boolean(name: impl Into<String>, value: bool) -> Self {
        Self::new(name, PropertyValue::Boolean(value))
    }

    pub fn color(name: impl Into<String>, argb: u32) -> Self {
        Self::new(name, PropertyValue::Color(argb))
    }

    pub fn enumeration(name: impl Into<String>, values: Vec<String>, index: i32) -> Self {
        Self { name: name.into(), value: PropertyValue::Enum(index), enum_values: values }
    }

    pub fn trigger(name: impl Into<String>) -> Self {
        Self::new(name, PropertyValue::Trigger(0))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    pub fn kind(&self) -> PropertyKind {
        self.value.kind()
    }

    pub fn enum_values(&self) -> &[String] {
        &self.enum_values
    }
}

/// Host-facing description of one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModelPropertyInfo {
    pub name: String,
    pub kind: PropertyKind,
    pub index: usize,
}

//=== ViewModelInstance ===================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewModelInstance {
    view_model: Option<String>,
    properties: Vec<ViewModelProperty>,
    revision: u64,
}

impl ViewModelInstance {
    //--- Construction -----------------------------------------------------

    /// Instance of the named view model.
    pub fn new(view_model: impl Into<String>, properties: Vec<ViewModelProperty>) -> Self {
        Self { view_model: Some(view_model.into()), properties, revision: 0 }
    }

    /// Instance not tied to any declared view model.
    pub fn anonymous() -> Self {
        Self::default()
    }

    //--- Introspection ----------------------------------------------------

    pub fn view_model_name(&self) -> Option<&str> {
        self.view_model.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.view_model.is_none()
    }

    /// Bumped on every successful write or trigger.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn properties(&self) -> Vec<ViewModelPropertyInfo> {
        self.properties
            .iter()
            .enumerate()
            .map(|(index, p)| ViewModelPropertyInfo { name: p.name.clone(), kind: p.kind(), index })
            .collect()
    }

    pub fn property(&self, name: &str) -> Option<&ViewModelProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_at(&self, index: usize) -> Option<&ViewModelProperty> {
        self.properties.get(index)
    }

    //--- Typed Getters ----------------------------------------------------

    pub fn string(&self, name: &str) -> Option<&str> {
        match self.property(name)?.value() {
            PropertyValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.property(name)?.value() {
            PropertyValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.property(name)?.value() {
            PropertyValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn color(&self, name: &str) -> Option<u32> {
        match self.property(name)?.value() {
            PropertyValue::Color(v) => Some(*v),
            _ => None,
        }
    }

    pub fn enum_index(&self, name: &str) -> Option<i32> {
        match self.property(name)?.value() {
            PropertyValue::Enum(v) => Some(*v),
            _ => None,
        }
    }

    /// Pending pulses of a trigger property.
    pub fn pending_triggers(&self, name: &str) -> Option<u32> {
        match self.property(name)?.value() {
            PropertyValue::Trigger(n) => Some(*n),
            _ => None,
        }
    }

    //--- Typed Setters ----------------------------------------------------
    //
    // Each returns false, leaving the instance untouched, when the name
    // is unknown or declared with another kind.
    //

    pub fn set_string(&mut self, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        self.write(name, PropertyKind::String, |slot| *slot = PropertyValue::String(value))
    }

    pub fn set_number(&mut self, name: &str, value: f64) -> bool {
        self.write(name, PropertyKind::Number, |slot| *slot = PropertyValue::Number(value))
    }

    pub fn set_boolean(&mut self, name: &str, value: bool) -> bool {
        self.write(name, PropertyKind::Boolean, |slot| *slot = PropertyValue::Boolean(value))
    }

    pub fn set_color(&mut self, name: &str, argb: u32) -> bool {
        self.write(name, PropertyKind::Color, |slot| *slot = PropertyValue::Color(argb))
    }

    /// Sets an enum property; indices outside a declared value list fail.
    pub fn set_enum(&mut self, name: &str, index: i32) -> bool {
        let in_range = match self.property(name) {
            Some(p) if p.enum_values.is_empty() => index >= 0,
            Some(p) => usize::try_from(index).map_or(false, |i| i < p.enum_values.len()),
            None => false,
        };
        in_range && self.write(name, PropertyKind::Enum, |slot| *slot = PropertyValue::Enum(index))
    }

    /// Latches one pulse. Pulses stay pending until the bound scene next
    /// advances, so a paused state machine sees them when it resumes.
    pub fn fire_trigger(&mut self, name: &str) -> bool {
        self.write(name, PropertyKind::Trigger, |slot| {
            if let PropertyValue::Trigger(n) = slot {
                *n = n.saturating_add(1);
            }
        })
    }

    /// Consumes every pending trigger pulse. Called once per advance.
    pub fn consume_triggers(&mut self) {
        for property in &mut self.properties {
            if let PropertyValue::Trigger(n) = &mut property.value {
                *n = 0;
            }
        }
    }

    fn write(&mut self, name: &str, kind: PropertyKind, apply: impl FnOnce(&mut PropertyValue)) -> bool {
        let Some(property) = self.properties.iter_mut().find(|p| p.name == name) else {
            return false;
        };
        if property.kind() != kind {
            return false;
        }
        apply(&mut property.value);
        self.revision += 1;
        true
    }
}

//=== ViewModelHandle =====================================================

/// Shared handle to the instance bound to an artboard and its scene.
#[derive(Debug, Clone)]
pub struct ViewModelHandle {
    inner: Arc<Mutex<ViewModelInstance>>,
}

impl ViewModelHandle {
    pub fn new(instance: ViewModelInstance) -> Self {
        Self { inner: Arc::new(Mutex::new(instance)) }
    }

    pub fn lock(&self) -> MutexGuard<'_, ViewModelInstance> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True when both handles refer to the same instance.
    pub fn ptr_eq(&self, other: &ViewModelHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
