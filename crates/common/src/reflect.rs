//! Reflection accessor: resolve members on live objects by name through the
//! type registry, walking base types. Priority is field > property > method.

use crate::path::{FieldPath, PathSegment};
use crate::schema::{MemberDescriptor, MemberKind, MethodDescriptor, TypeRegistry};
use crate::value::{FieldType, Object, Value};

/// A member found by name
#[derive(Clone, Copy)]
pub enum ResolvedMember<'r> {
    /// Stored field; `None` declared type for untyped objects
    Field(Option<&'r FieldType>),
    /// Property getter or derived member
    Property(&'r FieldType, &'r crate::schema::Getter),
    Method(&'r MethodDescriptor),
}

/// Why a named member could not be used
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessError {
    /// No field, property or method has this name
    Unresolved,
    /// The member exists but has the wrong shape; carries a description
    BadSignature(String),
}

/// Resolve `name` on `object`
pub fn resolve<'r>(registry: &'r TypeRegistry, object: &Object, name: &str) -> Option<ResolvedMember<'r>> {
    let chain = registry.ancestry(&object.type_name);

    for schema in &chain {
        if let Some(member) = schema.members.iter().find(|m| m.name == name && m.is_field()) {
            return Some(ResolvedMember::Field(Some(&member.ty)));
        }
    }
    if chain.is_empty() && object.fields.contains_key(name) {
        return Some(ResolvedMember::Field(None));
    }

    for schema in &chain {
        if let Some(property) = schema.properties.iter().find(|p| p.name == name) {
            return Some(ResolvedMember::Property(&property.ty, &property.getter));
        }
        if let Some(member) = schema.members.iter().find(|m| m.name == name) {
            if let MemberKind::Derived(getter) = &member.kind {
                return Some(ResolvedMember::Property(&member.ty, getter));
            }
        }
    }

    for schema in &chain {
        if let Some(method) = schema.methods.iter().find(|m| m.name == name) {
            return Some(ResolvedMember::Method(method));
        }
    }
    None
}

/// Find an action member by name, walking base types
pub fn resolve_action<'r>(registry: &'r TypeRegistry, type_name: &str, name: &str) -> Option<&'r MemberDescriptor> {
    registry
        .ancestry(type_name)
        .into_iter()
        .find_map(|schema| schema.members.iter().find(|m| m.name == name && m.is_action()))
}

/// Read a field, property, or zero-argument method returning a value
pub fn read_value(registry: &TypeRegistry, object: &mut Object, name: &str) -> Result<Value, AccessError> {
    match resolve(registry, object, name) {
        None => Err(AccessError::Unresolved),
        Some(ResolvedMember::Field(_)) => object
            .get(name)
            .cloned()
            .ok_or_else(|| AccessError::BadSignature(format!("field '{}' has no value", name))),
        Some(ResolvedMember::Property(_, getter)) => Ok(getter(&*object)),
        Some(ResolvedMember::Method(method)) => {
            if !method.params.is_empty() || method.returns.is_none() {
                return Err(AccessError::BadSignature(format!(
                    "'{}' must take no arguments and return a value",
                    method.signature()
                )));
            }
            let body = method.body.clone();
            body(object, &[])
                .ok_or_else(|| AccessError::BadSignature(format!("'{}' returned nothing", method.name)))
        }
    }
}

pub fn read_bool(registry: &TypeRegistry, object: &mut Object, name: &str) -> Result<bool, AccessError> {
    let value = read_value(registry, object, name)?;
    value
        .as_bool()
        .ok_or_else(|| AccessError::BadSignature(format!("'{}' is {}, expected bool", name, value.kind_name())))
}

/// Invoke a zero-argument method that returns nothing (change callbacks and actions)
pub fn invoke_callback(registry: &TypeRegistry, object: &mut Object, name: &str) -> Result<(), AccessError> {
    if let Some(action) = resolve_action(registry, &object.type_name, name) {
        if let MemberKind::Action(body) = &action.kind {
            let body = body.clone();
            body(object, &[]);
            return Ok(());
        }
    }
    match resolve(registry, object, name) {
        None => Err(AccessError::Unresolved),
        Some(ResolvedMember::Method(method)) => {
            if !method.params.is_empty() || method.returns.is_some() {
                return Err(AccessError::BadSignature(format!(
                    "callback '{}' must take no arguments and return nothing",
                    method.signature()
                )));
            }
            let body = method.body.clone();
            body(object, &[]);
            Ok(())
        }
        Some(_) => Err(AccessError::BadSignature(format!("'{}' is not a method", name))),
    }
}

/// Declared type of the value at `path` under `root`, using live object
/// types so polymorphic fields resolve against their concrete type
pub fn field_type_at(registry: &TypeRegistry, root: &Object, path: &FieldPath) -> Option<FieldType> {
    let mut current_type: Option<FieldType> = None;
    let mut cursor = FieldPath::root();

    for segment in path.segments() {
        current_type = match segment {
            PathSegment::Field(name) => {
                let owner = root.object_at(&cursor)?;
                member_for(registry, &owner.type_name, name).map(|member| member.ty.clone())
            }
            PathSegment::Index(_) => match current_type {
                Some(FieldType::List(element)) => Some(*element),
                _ => None,
            },
        };
        cursor = match segment {
            PathSegment::Field(name) => cursor.field(name),
            PathSegment::Index(i) => cursor.index(*i),
        };
        current_type.as_ref()?;
    }
    current_type
}

/// The schema member named `name` on `type_name` or its bases
pub fn member_for<'r>(registry: &'r TypeRegistry, type_name: &str, name: &str) -> Option<&'r MemberDescriptor> {
    registry
        .ancestry(type_name)
        .into_iter()
        .find_map(|schema| schema.member(name))
}

/// The member backing the last field segment of `path`
pub fn member_at<'r>(registry: &'r TypeRegistry, root: &Object, path: &FieldPath) -> Option<&'r MemberDescriptor> {
    let name = path.leaf_name()?;
    let owner = root.object_at(&path.container())?;
    member_for(registry, &owner.type_name, name)
}
