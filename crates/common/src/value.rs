//! # Values
//!
//! The live object graph edited by the inspector. Objects are dynamically
//! typed composites (type name + named fields); their layout and metadata
//! live in the [`TypeRegistry`](crate::schema::TypeRegistry).

use bevy::math::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::error::{InspectorError, Result};
use crate::path::{FieldPath, PathSegment};

/// Reference kind accepted by fields declared as "any asset"
pub const ANY_ASSET_KIND: &str = "Asset";

/// Identity of an editable root object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value of an enum-typed field. `bits` holds the discriminant, or the OR of
/// the set flags for flag enums.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumValue {
    pub type_name: String,
    pub bits: i64,
}

impl EnumValue {
    pub fn new(type_name: impl Into<String>, bits: i64) -> Self {
        Self { type_name: type_name.into(), bits }
    }
}

/// Reference to an asset or scene object owned by the host
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: u64,
    /// Concrete referenced type, e.g. `Image`, `Sprite`, `SceneNode`
    pub kind: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(id: u64, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id, kind: kind.into(), name: name.into() }
    }
}

/// Dynamically typed composite value
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub type_name: String,
    pub fields: BTreeMap<String, Value>,
}

/// Any value held by a field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Enum(EnumValue),
    Vector2(Vec2),
    Vector3(Vec3),
    /// RGBA in 0.0-1.0
    Color([f32; 4]),
    Reference(Option<ObjectRef>),
    Object(Object),
    List(Vec<Value>),
}

/// Declared type of a member
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Bool,
    Int,
    Float,
    String,
    Enum(String),
    Vector2,
    Vector3,
    Color,
    /// Reference to an object of the named kind
    Reference(String),
    Object(String),
    List(Box<FieldType>),
}

impl FieldType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Float)
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, FieldType::Vector2 | FieldType::Vector3)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Reference(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FieldType::List(_))
    }

    pub fn element_type(&self) -> Option<&FieldType> {
        match self {
            FieldType::List(element) => Some(element),
            _ => None,
        }
    }

    /// Whether `value` is a legal value for this declared type
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::Bool, Value::Bool(_))
            | (FieldType::Int, Value::Int(_))
            | (FieldType::Float, Value::Float(_))
            | (FieldType::String, Value::String(_))
            | (FieldType::Vector2, Value::Vector2(_))
            | (FieldType::Vector3, Value::Vector3(_))
            | (FieldType::Color, Value::Color(_))
            | (FieldType::Reference(_), Value::Reference(None)) => true,
            (FieldType::Enum(name), Value::Enum(e)) => *name == e.type_name,
            (FieldType::Reference(kind), Value::Reference(Some(r))) => {
                kind == ANY_ASSET_KIND || *kind == r.kind
            }
            (FieldType::Object(name), Value::Object(o)) => *name == o.type_name,
            (FieldType::List(element), Value::List(items)) => items.iter().all(|v| element.accepts(v)),
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Bool => f.write_str("bool"),
            FieldType::Int => f.write_str("int"),
            FieldType::Float => f.write_str("float"),
            FieldType::String => f.write_str("string"),
            FieldType::Enum(name) => write!(f, "enum {}", name),
            FieldType::Vector2 => f.write_str("Vector2"),
            FieldType::Vector3 => f.write_str("Vector3"),
            FieldType::Color => f.write_str("Color"),
            FieldType::Reference(kind) => write!(f, "&{}", kind),
            FieldType::Object(name) => f.write_str(name),
            FieldType::List(element) => write!(f, "[{}]", element),
        }
    }
}

impl Value {
    /// Short name of the value's kind, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Enum(_) => "enum",
            Value::Vector2(_) => "Vector2",
            Value::Vector3(_) => "Vector3",
            Value::Color(_) => "Color",
            Value::Reference(_) => "reference",
            Value::Object(_) => "object",
            Value::List(_) => "list",
        }
    }

    /// Type inferred from the value itself, for objects with no schema.
    /// Empty lists and null references fall back to the widest kind.
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Bool(_) => FieldType::Bool,
            Value::Int(_) => FieldType::Int,
            Value::Float(_) => FieldType::Float,
            Value::String(_) => FieldType::String,
            Value::Enum(e) => FieldType::Enum(e.type_name.clone()),
            Value::Vector2(_) => FieldType::Vector2,
            Value::Vector3(_) => FieldType::Vector3,
            Value::Color(_) => FieldType::Color,
            Value::Reference(Some(r)) => FieldType::Reference(r.kind.clone()),
            Value::Reference(None) => FieldType::Reference(ANY_ASSET_KIND.to_string()),
            Value::Object(o) => FieldType::Object(o.type_name.clone()),
            Value::List(items) => {
                let element = items.first().map(Value::field_type).unwrap_or(FieldType::String);
                FieldType::List(Box::new(element))
            }
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view of int and float values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<Option<&ObjectRef>> {
        match self {
            Value::Reference(r) => Some(r.as_ref()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null_reference(&self) -> bool {
        matches!(self, Value::Reference(None))
    }

    fn child(&self, segment: &PathSegment) -> Option<&Value> {
        match (self, segment) {
            (Value::Object(o), PathSegment::Field(name)) => o.fields.get(name),
            (Value::List(items), PathSegment::Index(i)) => items.get(*i),
            _ => None,
        }
    }

    fn child_mut(&mut self, segment: &PathSegment) -> Option<&mut Value> {
        match (self, segment) {
            (Value::Object(o), PathSegment::Field(name)) => o.fields.get_mut(name),
            (Value::List(items), PathSegment::Index(i)) => items.get_mut(*i),
            _ => None,
        }
    }
}

impl Object {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), fields: BTreeMap::new() }
    }

    /// Builder-style field assignment
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    /// Value at `path`; the root path has no value (it is the object itself)
    pub fn get_path(&self, path: &FieldPath) -> Option<&Value> {
        let (first, rest) = path.segments().split_first()?;
        let PathSegment::Field(name) = first else {
            return None;
        };
        let mut current = self.fields.get(name)?;
        for segment in rest {
            current = current.child(segment)?;
        }
        Some(current)
    }

    pub fn get_path_mut(&mut self, path: &FieldPath) -> Option<&mut Value> {
        let (first, rest) = path.segments().split_first()?;
        let PathSegment::Field(name) = first else {
            return None;
        };
        let mut current = self.fields.get_mut(name)?;
        for segment in rest {
            current = current.child_mut(segment)?;
        }
        Some(current)
    }

    /// Object at `path`; the root path yields `self`
    pub fn object_at(&self, path: &FieldPath) -> Option<&Object> {
        if path.is_root() {
            return Some(self);
        }
        self.get_path(path)?.as_object()
    }

    pub fn object_at_mut(&mut self, path: &FieldPath) -> Option<&mut Object> {
        if path.is_root() {
            return Some(self);
        }
        self.get_path_mut(path)?.as_object_mut()
    }

    /// Overwrite the value at `path`, returning the previous value
    pub fn replace_path(&mut self, path: &FieldPath, value: Value) -> Result<Value> {
        let slot = self
            .get_path_mut(path)
            .ok_or_else(|| InspectorError::PathNotFound(path.clone()))?;
        Ok(std::mem::replace(slot, value))
    }

    pub fn list_at_mut(&mut self, path: &FieldPath) -> Result<&mut Vec<Value>> {
        let slot = self
            .get_path_mut(path)
            .ok_or_else(|| InspectorError::PathNotFound(path.clone()))?;
        slot.as_list_mut().ok_or_else(|| InspectorError::TypeMismatch {
            path: path.clone(),
            expected: "a list",
        })
    }
}

/// An editable root: identity, display name and root object
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub id: InstanceId,
    pub name: String,
    pub object: Object,
}

impl Instance {
    pub fn new(name: impl Into<String>, object: Object) -> Self {
        Self { id: InstanceId::new(), name: name.into(), object }
    }
}
