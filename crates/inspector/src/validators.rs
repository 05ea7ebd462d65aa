//! Validator pipeline: min/max clamping and required-reference checks.
//!
//! Validators run against a copy of the field value and hand back the
//! rewritten value; committing it (and recording it for undo) is the
//! renderer's job.

use bevy::math::{Vec2, Vec3};
use gantry_common::attributes::{Bound, ValidatorAttribute};
use gantry_common::reflect::{self, ResolvedMember};
use gantry_common::schema::{MemberDescriptor, TypeRegistry};
use gantry_common::value::{Object, Value};

/// Result of one validation pass over one field
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Validation {
    /// Set when a validator rewrote the value
    pub rewritten: Option<Value>,
    /// Data errors (error severity)
    pub errors: Vec<String>,
    /// Configuration problems (warning severity)
    pub warnings: Vec<String>,
}

impl Validation {
    pub fn did_mutate(&self) -> bool {
        self.rewritten.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Min,
    Max,
}

/// Run every validator on `member` against `value`. `owner` is the object
/// holding the field; dynamic bounds are resolved on it.
pub fn apply(registry: &TypeRegistry, owner: &mut Object, member: &MemberDescriptor, value: &Value) -> Validation {
    let mut outcome = Validation::default();
    let mut current = value.clone();

    for validator in member.attributes.validators() {
        match validator {
            ValidatorAttribute::Min(bound) => {
                clamp_step(registry, owner, member, bound, Direction::Min, &mut current, &mut outcome)
            }
            ValidatorAttribute::Max(bound) => {
                clamp_step(registry, owner, member, bound, Direction::Max, &mut current, &mut outcome)
            }
            ValidatorAttribute::Required(message) => check_required(member, &current, message, &mut outcome),
        }
    }

    if current != *value {
        outcome.rewritten = Some(current);
    }
    outcome
}

fn clamp_step(
    registry: &TypeRegistry,
    owner: &mut Object,
    member: &MemberDescriptor,
    bound: &Bound,
    direction: Direction,
    current: &mut Value,
    outcome: &mut Validation,
) {
    if !member.ty.is_numeric() && !member.ty.is_vector() {
        outcome.warnings.push(format!(
            "{:?} validator on '{}' needs a numeric or vector field, found {}",
            direction, member.name, member.ty
        ));
        return;
    }

    let Some(limit) = resolve_bound(registry, owner, member, bound, current, outcome) else {
        return;
    };
    if let Some(clamped) = clamp(current, limit, direction) {
        *current = clamped;
    }
}

/// Numeric value of a bound, or `None` after recording why it is unusable
fn resolve_bound(
    registry: &TypeRegistry,
    owner: &mut Object,
    member: &MemberDescriptor,
    bound: &Bound,
    current: &Value,
    outcome: &mut Validation,
) -> Option<f64> {
    let name = match bound {
        Bound::Const(limit) => return Some(*limit),
        Bound::Member(name) => name,
    };

    let value = match reflect::resolve(registry, owner, name) {
        None => {
            outcome.warnings.push(format!(
                "Bound '{}' for '{}' does not resolve on '{}'",
                name, member.name, owner.type_name
            ));
            return None;
        }
        Some(ResolvedMember::Method(method)) => match method.params.as_slice() {
            _ if method.returns.is_none() => {
                outcome.warnings.push(format!(
                    "Bound method '{}' for '{}' returns nothing",
                    method.signature(),
                    member.name
                ));
                return None;
            }
            [] => (method.body.clone())(owner, &[]),
            [param] if *param == member.ty => (method.body.clone())(owner, std::slice::from_ref(current)),
            _ => {
                outcome.warnings.push(format!(
                    "Bound method '{}' for '{}' must take no argument or one {}",
                    method.signature(),
                    member.name,
                    member.ty
                ));
                return None;
            }
        },
        Some(_) => match reflect::read_value(registry, owner, name) {
            Ok(value) => Some(value),
            Err(e) => {
                outcome.warnings.push(format!("Bound '{}' for '{}': {:?}", name, member.name, e));
                return None;
            }
        },
    };

    match value.as_ref().and_then(Value::as_f64) {
        Some(limit) => Some(limit),
        None => {
            let kind = value.as_ref().map(Value::kind_name).unwrap_or("nothing");
            outcome
                .errors
                .push(format!("Bound '{}' for '{}' is {}, not a number", name, member.display_name(), kind));
            None
        }
    }
}

/// Clamped value, or `None` when `value` already satisfies the bound
fn clamp(value: &Value, limit: f64, direction: Direction) -> Option<Value> {
    let violates = |v: f64| match direction {
        Direction::Max => v > limit,
        Direction::Min => v < limit,
    };
    let limit32 = limit as f32;
    let clamp32 = |v: f32| if violates(v as f64) { limit32 } else { v };

    match value {
        Value::Int(v) if violates(*v as f64) => {
            // stay on the allowed side of a fractional bound
            let snapped = match direction {
                Direction::Max => limit.floor(),
                Direction::Min => limit.ceil(),
            };
            Some(Value::Int(snapped as i64))
        }
        Value::Float(v) if violates(*v) => Some(Value::Float(limit)),
        Value::Vector2(v) => {
            let clamped = Vec2::new(clamp32(v.x), clamp32(v.y));
            (clamped != *v).then_some(Value::Vector2(clamped))
        }
        Value::Vector3(v) => {
            let clamped = Vec3::new(clamp32(v.x), clamp32(v.y), clamp32(v.z));
            (clamped != *v).then_some(Value::Vector3(clamped))
        }
        _ => None,
    }
}

fn check_required(member: &MemberDescriptor, current: &Value, message: Option<&str>, outcome: &mut Validation) {
    if !member.ty.is_reference() {
        outcome.warnings.push(format!(
            "Required on '{}' only applies to reference fields, found {}",
            member.name, member.ty
        ));
        return;
    }
    if current.is_null_reference() {
        let text = match message {
            Some(custom) => custom.to_string(),
            None => format!("{} is required", member.display_name()),
        };
        outcome.errors.push(text);
    }
}
