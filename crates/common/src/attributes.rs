//! # Attributes Module
//!
//! Declarative meta-attributes attached to schema members: visibility and
//! enablement conditions, grouping, labels, change callbacks, custom
//! renderers and value validators.

use serde::{Deserialize, Serialize};

/// How the terms of a member condition combine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOp {
    And,
    Or,
}

/// Boolean condition evaluated against the object that owns a field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// Bool-valued fields, properties or zero-argument methods, combined with `op`
    Members { names: Vec<String>, op: ConditionOp },
    /// One enum-valued member compared to `target` (equality, or flag containment
    /// when the enum is a flags enum)
    Enum { member: String, target: i64 },
}

impl Condition {
    pub fn member(name: &str) -> Self {
        Condition::Members { names: vec![name.to_string()], op: ConditionOp::And }
    }

    pub fn all(names: &[&str]) -> Self {
        Condition::Members {
            names: names.iter().map(|n| n.to_string()).collect(),
            op: ConditionOp::And,
        }
    }

    pub fn any(names: &[&str]) -> Self {
        Condition::Members {
            names: names.iter().map(|n| n.to_string()).collect(),
            op: ConditionOp::Or,
        }
    }

    pub fn enum_is(member: &str, target: i64) -> Self {
        Condition::Enum { member: member.to_string(), target }
    }
}

/// Numeric bound of a min/max validator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Bound {
    Const(f64),
    /// Sibling field, property, or zero/one-argument method
    Member(String),
}

/// The two grouping kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupKind {
    /// Collapsible section; members are a contiguous run of siblings
    Foldout,
    /// Always-open bordered panel; members are all same-named direct siblings
    Box,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MetaAttribute {
    ShowIf(Condition),
    HideIf(Condition),
    EnableIf(Condition),
    DisableIf(Condition),
    ReadOnly,
    Foldout(String),
    BoxGroup(String),
    Label(String),
    /// Zero-argument method invoked after the user changes the value
    OnValueChanged(String),
    /// Zero-argument method invoked after a validator rewrote the value
    OnValidated(String),
    /// Renderer that fully replaces default drawing for the member
    CustomRenderer(String),
    Min(Bound),
    Max(Bound),
    Required { message: Option<String> },
}

/// Validators pulled out of an [`AttributeSet`]
#[derive(Clone, Debug, PartialEq)]
pub enum ValidatorAttribute<'a> {
    Min(&'a Bound),
    Max(&'a Bound),
    Required(Option<&'a str>),
}

/// All meta-attributes on one member
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSet(pub Vec<MetaAttribute>);

impl AttributeSet {
    pub fn push(&mut self, attribute: MetaAttribute) {
        self.0.push(attribute);
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetaAttribute> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_read_only(&self) -> bool {
        self.0.iter().any(|a| matches!(a, MetaAttribute::ReadOnly))
    }

    /// Enable condition and whether it is inverted
    pub fn enable_condition(&self) -> Option<(&Condition, bool)> {
        self.0.iter().find_map(|a| match a {
            MetaAttribute::EnableIf(c) => Some((c, false)),
            MetaAttribute::DisableIf(c) => Some((c, true)),
            _ => None,
        })
    }

    /// Show condition and whether it is inverted
    pub fn show_condition(&self) -> Option<(&Condition, bool)> {
        self.0.iter().find_map(|a| match a {
            MetaAttribute::ShowIf(c) => Some((c, false)),
            MetaAttribute::HideIf(c) => Some((c, true)),
            _ => None,
        })
    }

    pub fn group(&self, kind: GroupKind) -> Option<&str> {
        self.0.iter().find_map(|a| match (kind, a) {
            (GroupKind::Foldout, MetaAttribute::Foldout(name)) => Some(name.as_str()),
            (GroupKind::Box, MetaAttribute::BoxGroup(name)) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn label(&self) -> Option<&str> {
        self.0.iter().find_map(|a| match a {
            MetaAttribute::Label(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn custom_renderer(&self) -> Option<&str> {
        self.0.iter().find_map(|a| match a {
            MetaAttribute::CustomRenderer(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn on_value_changed(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|a| match a {
            MetaAttribute::OnValueChanged(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn on_validated(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|a| match a {
            MetaAttribute::OnValidated(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn validators(&self) -> impl Iterator<Item = ValidatorAttribute<'_>> {
        self.0.iter().filter_map(|a| match a {
            MetaAttribute::Min(bound) => Some(ValidatorAttribute::Min(bound)),
            MetaAttribute::Max(bound) => Some(ValidatorAttribute::Max(bound)),
            MetaAttribute::Required { message } => Some(ValidatorAttribute::Required(message.as_deref())),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup() {
        let set = AttributeSet(vec![
            MetaAttribute::HideIf(Condition::member("hidden")),
            MetaAttribute::Foldout("Stats".into()),
            MetaAttribute::Min(Bound::Const(0.0)),
            MetaAttribute::OnValueChanged("a".into()),
            MetaAttribute::OnValueChanged("b".into()),
        ]);
        let (condition, inverted) = set.show_condition().unwrap();
        assert_eq!(condition, &Condition::member("hidden"));
        assert!(inverted);
        assert_eq!(set.group(GroupKind::Foldout), Some("Stats"));
        assert_eq!(set.group(GroupKind::Box), None);
        assert_eq!(set.on_value_changed().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(set.validators().count(), 1);
        assert!(set.enable_condition().is_none());
    }
}
