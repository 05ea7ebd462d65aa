//! # Type Schemas
//!
//! Per-type member tables that replace runtime reflection. A schema is built
//! once per concrete type and lists, in declaration order, its stored fields,
//! derived (display-only) members and action triggers, plus the properties
//! and methods that attributes may reference by name.
//!
//! ## Example
//!
//! ```rust
//! use gantry_common::prelude::*;
//!
//! let schema = TypeSchema::build("Enemy")
//!     .field("health", FieldType::Float)
//!     .attr(MetaAttribute::Foldout("Stats".into()))
//!     .attr(MetaAttribute::Min(Bound::Const(0.0)))
//!     .field("armor", FieldType::Float)
//!     .attr(MetaAttribute::Foldout("Stats".into()))
//!     .property("is_alive", FieldType::Bool, |o| {
//!         Value::Bool(o.get("health").and_then(Value::as_f64).unwrap_or(0.0) > 0.0)
//!     })
//!     .finish();
//!
//! let mut registry = TypeRegistry::default();
//! registry.register(schema);
//! assert_eq!(registry.render_schema("Enemy").unwrap().members.len(), 2);
//! ```

use bevy::math::{Vec2, Vec3};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::attributes::{AttributeSet, MetaAttribute};
use crate::error::{InspectorError, Result};
use crate::value::{EnumValue, FieldType, Object, Value};

/// Read-only accessor (properties and derived members)
pub type Getter = Arc<dyn Fn(&Object) -> Value + Send + Sync>;

/// Method body: receives the owning object and positional arguments
pub type MethodFn = Arc<dyn Fn(&mut Object, &[Value]) -> Option<Value> + Send + Sync>;

/// What a displayed member is
#[derive(Clone)]
pub enum MemberKind {
    /// Stored, editable field
    Field { default: Option<Value> },
    /// Non-persisted value shown read-only
    Derived(Getter),
    /// Zero-argument invocable shown as a button
    Action(MethodFn),
}

impl fmt::Debug for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Field { default } => f.debug_struct("Field").field("default", default).finish(),
            MemberKind::Derived(_) => f.write_str("Derived"),
            MemberKind::Action(_) => f.write_str("Action"),
        }
    }
}

/// One member of a type, in declaration order
#[derive(Clone, Debug)]
pub struct MemberDescriptor {
    pub name: String,
    /// Declared type; actions use `FieldType::Bool` as a placeholder and never read it
    pub ty: FieldType,
    pub kind: MemberKind,
    pub attributes: AttributeSet,
    /// Resolvable by name but never displayed
    pub internal: bool,
    pub declared_in: String,
}

impl MemberDescriptor {
    pub fn is_field(&self) -> bool {
        matches!(self.kind, MemberKind::Field { .. })
    }

    pub fn is_derived(&self) -> bool {
        matches!(self.kind, MemberKind::Derived(_))
    }

    pub fn is_action(&self) -> bool {
        matches!(self.kind, MemberKind::Action(_))
    }

    /// Label override or the member name
    pub fn display_name(&self) -> &str {
        self.attributes.label().unwrap_or(&self.name)
    }
}

#[derive(Clone)]
pub struct PropertyDescriptor {
    pub name: String,
    pub ty: FieldType,
    pub getter: Getter,
}

#[derive(Clone)]
pub struct MethodDescriptor {
    pub name: String,
    pub params: Vec<FieldType>,
    /// `None` for methods returning nothing
    pub returns: Option<FieldType>,
    pub body: MethodFn,
}

impl MethodDescriptor {
    /// Human-readable signature for diagnostics
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        match &self.returns {
            Some(ret) => format!("{}({}) -> {}", self.name, params.join(", "), ret),
            None => format!("{}({})", self.name, params.join(", ")),
        }
    }
}

/// Member table for one concrete type
#[derive(Clone)]
pub struct TypeSchema {
    pub name: String,
    pub base: Option<String>,
    pub members: Vec<MemberDescriptor>,
    pub properties: Vec<PropertyDescriptor>,
    pub methods: Vec<MethodDescriptor>,
}

impl TypeSchema {
    pub fn build(name: impl Into<String>) -> TypeSchemaBuilder {
        TypeSchemaBuilder {
            schema: TypeSchema {
                name: name.into(),
                base: None,
                members: Vec::new(),
                properties: Vec::new(),
                methods: Vec::new(),
            },
            attach_to_member: false,
        }
    }

    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Builder returned by [`TypeSchema::build`]. `attr` and `internal` apply to
/// the most recently added field, derived member or action.
pub struct TypeSchemaBuilder {
    schema: TypeSchema,
    attach_to_member: bool,
}

impl TypeSchemaBuilder {
    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.schema.base = Some(base.into());
        self
    }

    fn push_member(mut self, name: &str, ty: FieldType, kind: MemberKind) -> Self {
        let declared_in = self.schema.name.clone();
        self.schema.members.push(MemberDescriptor {
            name: name.to_string(),
            ty,
            kind,
            attributes: AttributeSet::default(),
            internal: false,
            declared_in,
        });
        self.attach_to_member = true;
        self
    }

    pub fn field(self, name: &str, ty: FieldType) -> Self {
        self.push_member(name, ty, MemberKind::Field { default: None })
    }

    pub fn field_with_default(self, name: &str, ty: FieldType, default: Value) -> Self {
        self.push_member(name, ty, MemberKind::Field { default: Some(default) })
    }

    pub fn derived<F>(self, name: &str, ty: FieldType, getter: F) -> Self
    where
        F: Fn(&Object) -> Value + Send + Sync + 'static,
    {
        self.push_member(name, ty, MemberKind::Derived(Arc::new(getter)))
    }

    pub fn action<F>(self, name: &str, body: F) -> Self
    where
        F: Fn(&mut Object) + Send + Sync + 'static,
    {
        let body: MethodFn = Arc::new(move |object: &mut Object, _: &[Value]| {
            body(object);
            None
        });
        self.push_member(name, FieldType::Bool, MemberKind::Action(body))
    }

    pub fn property<F>(mut self, name: &str, ty: FieldType, getter: F) -> Self
    where
        F: Fn(&Object) -> Value + Send + Sync + 'static,
    {
        self.schema.properties.push(PropertyDescriptor {
            name: name.to_string(),
            ty,
            getter: Arc::new(getter),
        });
        self.attach_to_member = false;
        self
    }

    pub fn method<F>(mut self, name: &str, params: Vec<FieldType>, returns: Option<FieldType>, body: F) -> Self
    where
        F: Fn(&mut Object, &[Value]) -> Option<Value> + Send + Sync + 'static,
    {
        self.schema.methods.push(MethodDescriptor {
            name: name.to_string(),
            params,
            returns,
            body: Arc::new(body),
        });
        self.attach_to_member = false;
        self
    }

    pub fn attr(mut self, attribute: MetaAttribute) -> Self {
        match self.schema.members.last_mut() {
            Some(member) if self.attach_to_member => member.attributes.push(attribute),
            _ => warn!(
                "Attribute {:?} on '{}' has no member to attach to",
                attribute, self.schema.name
            ),
        }
        self
    }

    /// Hide the last member from display while keeping it resolvable
    pub fn internal(mut self) -> Self {
        if let Some(member) = self.schema.members.last_mut() {
            member.internal = true;
        }
        self
    }

    pub fn finish(self) -> TypeSchema {
        self.schema
    }
}

/// Named enum variants; flags enums combine variants bitwise
#[derive(Clone, Debug, PartialEq)]
pub struct EnumDescriptor {
    pub name: String,
    pub variants: Vec<(String, i64)>,
    pub flags: bool,
}

impl EnumDescriptor {
    pub fn new(name: &str, variants: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            variants: variants.iter().enumerate().map(|(i, v)| (v.to_string(), i as i64)).collect(),
            flags: false,
        }
    }

    pub fn flags(name: &str, variants: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            variants: variants.iter().enumerate().map(|(i, v)| (v.to_string(), 1i64 << i)).collect(),
            flags: true,
        }
    }

    pub fn variant_name(&self, bits: i64) -> Option<&str> {
        self.variants.iter().find(|(_, b)| *b == bits).map(|(n, _)| n.as_str())
    }
}

/// Members of a type in display order: base type first, declaration order
/// within a type, actions after the data members of their declaring type.
/// Internal members are excluded.
#[derive(Clone, Debug)]
pub struct RenderSchema {
    pub type_name: String,
    pub members: Vec<MemberDescriptor>,
}

impl RenderSchema {
    pub fn position(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }
}

/// All known schemas and enums, plus memoized render schemas
#[derive(Default)]
pub struct TypeRegistry {
    schemas: HashMap<String, TypeSchema>,
    enums: HashMap<String, EnumDescriptor>,
    render_cache: RwLock<HashMap<String, Arc<RenderSchema>>>,
}

impl TypeRegistry {
    pub fn register(&mut self, schema: TypeSchema) {
        self.render_cache.get_mut().clear();
        self.schemas.insert(schema.name.clone(), schema);
    }

    pub fn register_enum(&mut self, descriptor: EnumDescriptor) {
        self.enums.insert(descriptor.name.clone(), descriptor);
    }

    pub fn schema(&self, name: &str) -> Option<&TypeSchema> {
        self.schemas.get(name)
    }

    pub fn enum_descriptor(&self, name: &str) -> Option<&EnumDescriptor> {
        self.enums.get(name)
    }

    /// The type and its ancestors, most-derived first. Stops on unknown or
    /// cyclic base declarations.
    pub fn ancestry(&self, name: &str) -> Vec<&TypeSchema> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(name);
        while let Some(type_name) = current {
            if !seen.insert(type_name) {
                warn!("Type '{}' has a cyclic base declaration", name);
                break;
            }
            let Some(schema) = self.schemas.get(type_name) else {
                break;
            };
            chain.push(schema);
            current = schema.base.as_deref();
        }
        chain
    }

    /// True if `ty` is `base` or derives from it
    pub fn is_assignable(&self, ty: &str, base: &str) -> bool {
        self.ancestry(ty).iter().any(|s| s.name == base)
    }

    /// Memoized display order for `type_name`
    pub fn render_schema(&self, type_name: &str) -> Option<Arc<RenderSchema>> {
        if let Some(cached) = self.render_cache.read().get(type_name) {
            return Some(cached.clone());
        }
        if !self.schemas.contains_key(type_name) {
            return None;
        }

        let mut members = Vec::new();
        for schema in self.ancestry(type_name).into_iter().rev() {
            let visible = schema.members.iter().filter(|m| !m.internal);
            members.extend(visible.clone().filter(|m| !m.is_action()).cloned());
            members.extend(visible.filter(|m| m.is_action()).cloned());
        }
        let built = Arc::new(RenderSchema { type_name: type_name.to_string(), members });
        self.render_cache.write().insert(type_name.to_string(), built.clone());
        Some(built)
    }

    /// Default value for a declared type; objects get every stored field of
    /// their ancestry filled in
    pub fn default_value(&self, ty: &FieldType) -> Result<Value> {
        self.default_value_in(ty, &mut Vec::new())
    }

    /// New object of `type_name` with default field values
    pub fn instantiate(&self, type_name: &str) -> Result<Object> {
        self.instantiate_in(type_name, &mut Vec::new())
    }

    fn default_value_in(&self, ty: &FieldType, building: &mut Vec<String>) -> Result<Value> {
        Ok(match ty {
            FieldType::Bool => Value::Bool(false),
            FieldType::Int => Value::Int(0),
            FieldType::Float => Value::Float(0.0),
            FieldType::String => Value::String(String::new()),
            FieldType::Enum(name) => {
                let bits = match self.enums.get(name) {
                    Some(e) if e.flags => 0,
                    Some(e) => e.variants.first().map(|(_, b)| *b).unwrap_or(0),
                    None => 0,
                };
                Value::Enum(EnumValue::new(name.clone(), bits))
            }
            FieldType::Vector2 => Value::Vector2(Vec2::ZERO),
            FieldType::Vector3 => Value::Vector3(Vec3::ZERO),
            FieldType::Color => Value::Color([1.0, 1.0, 1.0, 1.0]),
            FieldType::Reference(_) => Value::Reference(None),
            FieldType::Object(name) => Value::Object(self.instantiate_in(name, building)?),
            FieldType::List(_) => Value::List(Vec::new()),
        })
    }

    fn instantiate_in(&self, type_name: &str, building: &mut Vec<String>) -> Result<Object> {
        let chain = self.ancestry(type_name);
        if chain.is_empty() {
            return Err(InspectorError::UnknownType(type_name.to_string()));
        }
        // a type that contains itself gets an empty nested object
        if building.iter().any(|t| t == type_name) {
            return Ok(Object::new(type_name));
        }
        building.push(type_name.to_string());

        let mut object = Object::new(type_name);
        for schema in chain.into_iter().rev() {
            for member in &schema.members {
                if let MemberKind::Field { default } = &member.kind {
                    let value = match default {
                        Some(v) => v.clone(),
                        None => self.default_value_in(&member.ty, building)?,
                    };
                    object.set(&member.name, value);
                }
            }
        }
        building.pop();
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::default();
        registry.register(
            TypeSchema::build("Actor")
                .field("name", FieldType::String)
                .action("Reset", |_| {})
                .field("speed", FieldType::Float)
                .field("cache", FieldType::Int)
                .internal()
                .finish(),
        );
        registry.register(
            TypeSchema::build("Enemy")
                .extends("Actor")
                .action("Kill", |o| o.set("health", Value::Float(0.0)))
                .field_with_default("health", FieldType::Float, Value::Float(100.0))
                .derived("dps", FieldType::Float, |_| Value::Float(3.0))
                .finish(),
        );
        registry
    }

    #[test]
    fn test_render_schema_order() {
        let registry = registry();
        let schema = registry.render_schema("Enemy").unwrap();
        let names: Vec<&str> = schema.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["name", "speed", "Reset", "health", "dps", "Kill"]);
    }

    #[test]
    fn test_render_schema_is_memoized() {
        let registry = registry();
        let a = registry.render_schema("Enemy").unwrap();
        let b = registry.render_schema("Enemy").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(registry.render_schema("Missing").is_none());
    }

    #[test]
    fn test_instantiate_fills_ancestry() {
        let registry = registry();
        let enemy = registry.instantiate("Enemy").unwrap();
        assert_eq!(enemy.get("health"), Some(&Value::Float(100.0)));
        assert_eq!(enemy.get("name"), Some(&Value::String(String::new())));
        assert_eq!(enemy.get("cache"), Some(&Value::Int(0)));
        assert!(enemy.get("dps").is_none());
        assert!(registry.is_assignable("Enemy", "Actor"));
        assert!(!registry.is_assignable("Actor", "Enemy"));
    }

    #[test]
    fn test_self_referential_type_instantiates() {
        let mut registry = TypeRegistry::default();
        registry.register(
            TypeSchema::build("Node")
                .field("label", FieldType::String)
                .field("child", FieldType::Object("Node".into()))
                .finish(),
        );
        let node = registry.instantiate("Node").unwrap();
        let child = node.get("child").and_then(Value::as_object).unwrap();
        assert!(child.fields.is_empty());
    }

    #[test]
    fn test_cyclic_base_terminates() {
        let mut registry = TypeRegistry::default();
        registry.register(TypeSchema::build("A").extends("B").finish());
        registry.register(TypeSchema::build("B").extends("A").finish());
        assert_eq!(registry.ancestry("A").len(), 2);
    }
}
