//! Condition evaluator for show/hide and enable/disable attributes.

use gantry_common::attributes::{Condition, ConditionOp};
use gantry_common::reflect::{self, AccessError};
use gantry_common::schema::TypeRegistry;
use gantry_common::value::{Object, Value};
use thiserror::Error;

/// A condition that produced no usable term
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("none of the condition members {0:?} resolve on '{1}'")]
    Unresolved(Vec<String>, String),

    #[error("condition member {0}")]
    BadMember(String),
}

/// Evaluate `condition` against `target`, applying `invert` last.
///
/// Member names that do not resolve contribute no term; an error is returned
/// only when no term at all could be read, so callers can fall back to the
/// conservative choice instead of silently showing or enabling.
pub fn evaluate(
    registry: &TypeRegistry,
    target: &mut Object,
    condition: &Condition,
    invert: bool,
) -> Result<bool, ConditionError> {
    let value = match condition {
        Condition::Members { names, op } => evaluate_members(registry, target, names, *op)?,
        Condition::Enum { member, target: wanted } => evaluate_enum(registry, target, member, *wanted)?,
    };
    Ok(value != invert)
}

fn evaluate_members(
    registry: &TypeRegistry,
    target: &mut Object,
    names: &[String],
    op: ConditionOp,
) -> Result<bool, ConditionError> {
    let mut terms = Vec::with_capacity(names.len());
    let mut bad_member = None;

    for name in names {
        match reflect::read_bool(registry, target, name) {
            Ok(term) => terms.push(term),
            Err(AccessError::Unresolved) => {}
            Err(AccessError::BadSignature(reason)) => {
                bad_member.get_or_insert(reason);
            }
        }
    }

    if terms.is_empty() {
        return Err(match bad_member {
            Some(reason) => ConditionError::BadMember(reason),
            None => ConditionError::Unresolved(names.to_vec(), target.type_name.clone()),
        });
    }

    Ok(match op {
        ConditionOp::And => terms.iter().all(|t| *t),
        ConditionOp::Or => terms.iter().any(|t| *t),
    })
}

fn evaluate_enum(
    registry: &TypeRegistry,
    target: &mut Object,
    member: &str,
    wanted: i64,
) -> Result<bool, ConditionError> {
    let value = match reflect::read_value(registry, target, member) {
        Ok(value) => value,
        Err(AccessError::Unresolved) => {
            return Err(ConditionError::Unresolved(vec![member.to_string()], target.type_name.clone()))
        }
        Err(AccessError::BadSignature(reason)) => return Err(ConditionError::BadMember(reason)),
    };

    let Value::Enum(current) = value else {
        return Err(ConditionError::BadMember(format!(
            "'{}' is {}, expected an enum",
            member,
            value.kind_name()
        )));
    };

    let flags = registry
        .enum_descriptor(&current.type_name)
        .map(|e| e.flags)
        .unwrap_or(false);

    Ok(if flags && wanted != 0 {
        current.bits & wanted == wanted
    } else {
        current.bits == wanted
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_common::schema::{EnumDescriptor, TypeSchema};
    use gantry_common::value::{EnumValue, FieldType};

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::default();
        registry.register_enum(EnumDescriptor::new("Mode", &["Walk", "Fly"]));
        registry.register_enum(EnumDescriptor::flags("Layers", &["Ground", "Water", "Air"]));
        registry.register(
            TypeSchema::build("Unit")
                .field("armed", FieldType::Bool)
                .field("shielded", FieldType::Bool)
                .field("mode", FieldType::Enum("Mode".into()))
                .field("layers", FieldType::Enum("Layers".into()))
                .field("count", FieldType::Int)
                .method("is_ready", vec![], Some(FieldType::Bool), |_, _| Some(Value::Bool(true)))
                .finish(),
        );
        registry
    }

    fn unit(registry: &TypeRegistry) -> Object {
        let mut unit = registry.instantiate("Unit").unwrap();
        unit.set("armed", Value::Bool(true));
        unit.set("mode", Value::Enum(EnumValue::new("Mode", 1)));
        unit.set("layers", Value::Enum(EnumValue::new("Layers", 0b011)));
        unit
    }

    #[test]
    fn test_and_or_invert() {
        let registry = registry();
        let mut unit = unit(&registry);

        let both = Condition::all(&["armed", "shielded"]);
        assert_eq!(evaluate(&registry, &mut unit, &both, false), Ok(false));
        assert_eq!(evaluate(&registry, &mut unit, &both, true), Ok(true));

        let either = Condition::any(&["armed", "shielded"]);
        assert_eq!(evaluate(&registry, &mut unit, &either, false), Ok(true));

        let method = Condition::member("is_ready");
        assert_eq!(evaluate(&registry, &mut unit, &method, false), Ok(true));
    }

    #[test]
    fn test_unresolved_names_are_skipped() {
        let registry = registry();
        let mut unit = unit(&registry);

        let partial = Condition::all(&["armed", "no_such_member"]);
        assert_eq!(evaluate(&registry, &mut unit, &partial, false), Ok(true));

        let none = Condition::all(&["ghost", "phantom"]);
        assert!(matches!(
            evaluate(&registry, &mut unit, &none, false),
            Err(ConditionError::Unresolved(..))
        ));

        let wrong_type = Condition::member("count");
        assert!(matches!(
            evaluate(&registry, &mut unit, &wrong_type, false),
            Err(ConditionError::BadMember(_))
        ));
    }

    #[test]
    fn test_enum_conditions() {
        let registry = registry();
        let mut unit = unit(&registry);

        assert_eq!(evaluate(&registry, &mut unit, &Condition::enum_is("mode", 1), false), Ok(true));
        assert_eq!(evaluate(&registry, &mut unit, &Condition::enum_is("mode", 0), false), Ok(false));
        assert_eq!(evaluate(&registry, &mut unit, &Condition::enum_is("mode", 0), true), Ok(true));

        // flags: Ground|Water contains Water, not Air
        assert_eq!(evaluate(&registry, &mut unit, &Condition::enum_is("layers", 0b010), false), Ok(true));
        assert_eq!(evaluate(&registry, &mut unit, &Condition::enum_is("layers", 0b100), false), Ok(false));

        assert!(matches!(
            evaluate(&registry, &mut unit, &Condition::enum_is("armed", 1), false),
            Err(ConditionError::BadMember(_))
        ));
    }
}
