//! Meta-attribute resolution for one node: enablement, visibility and
//! grouping.
//!
//! A node that belongs to a foldout or box group is either the group's owner
//! (its first visible member, which draws the group chrome and every member)
//! or is consumed and draws nothing. Group resolution recurses into the
//! renderer, so it is bounded by the context's depth limit and by a guard set
//! of in-progress `(instance, path, kind)` resolutions.

use gantry_common::attributes::{Condition, GroupKind};
use gantry_common::path::FieldPath;
use gantry_common::schema::MemberDescriptor;
use tracing::debug;

use crate::conditions;
use crate::context::{GuardKey, RenderContext};
use crate::renderer::{FieldNode, Renderer};
use crate::state::group_key;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub visible: bool,
    pub enabled: bool,
    /// Already drawn (or to be drawn) by its group's owner
    pub consumed_by_group: bool,
}

impl Resolution {
    /// Render nothing
    pub const HIDDEN: Resolution = Resolution { visible: false, enabled: false, consumed_by_group: false };
}

enum GroupRole {
    /// This node drew the group
    Owner,
    /// Another member owns the group
    Member,
    /// Re-entrant or too deep; render nothing
    Blocked,
    /// No visible group around this node
    Ungrouped,
}

impl Renderer<'_> {
    pub fn resolve(&mut self, ctx: &mut RenderContext, node: &FieldNode) -> Resolution {
        let Some(member) = &node.member else {
            return Resolution { visible: true, enabled: !ctx.is_disabled(), consumed_by_group: false };
        };
        let container = node.path.container();
        let attributes = &member.attributes;

        let mut enabled = !ctx.is_disabled() && !attributes.is_read_only();
        if enabled {
            if let Some((condition, invert)) = attributes.enable_condition() {
                enabled = self.check(&container, condition, invert, &node.path);
            }
        }

        if let Some((condition, invert)) = attributes.show_condition() {
            if !self.check(&container, condition, invert, &node.path) {
                return Resolution { visible: false, enabled, consumed_by_group: false };
            }
        }

        for kind in [GroupKind::Foldout, GroupKind::Box] {
            if ctx.is_suppressed(kind) {
                continue;
            }
            let Some(group) = attributes.group(kind) else {
                continue;
            };
            match self.resolve_group(ctx, node, kind, group) {
                GroupRole::Owner | GroupRole::Member => {
                    return Resolution { visible: true, enabled, consumed_by_group: true };
                }
                GroupRole::Blocked => return Resolution::HIDDEN,
                GroupRole::Ungrouped => {}
            }
        }

        Resolution { visible: true, enabled, consumed_by_group: false }
    }

    /// Evaluate a condition on the object at `container`. Failures count as
    /// false: hidden, or disabled.
    fn check(&mut self, container: &FieldPath, condition: &Condition, invert: bool, path: &FieldPath) -> bool {
        let registry = self.registry;
        let result = match self.instance.object.object_at_mut(container) {
            Some(target) => conditions::evaluate(registry, target, condition, invert),
            None => return false,
        };
        match result {
            Ok(value) => value,
            Err(e) => {
                self.warn(format!("Condition on '{}': {}", path, e));
                false
            }
        }
    }

    fn is_visible(&mut self, container: &FieldPath, member: &MemberDescriptor) -> bool {
        match member.attributes.show_condition() {
            Some((condition, invert)) => self.check(container, condition, invert, &container.field(&member.name)),
            None => true,
        }
    }

    fn resolve_group(&mut self, ctx: &mut RenderContext, node: &FieldNode, kind: GroupKind, group: &str) -> GroupRole {
        let Some(name) = node.path.leaf_name() else {
            return GroupRole::Ungrouped;
        };
        let container = node.path.container();
        let members = self.group_members(&container, kind, group, name);

        match members.first() {
            None => GroupRole::Ungrouped,
            Some(first) if first.name != name => GroupRole::Member,
            Some(_) => {
                if ctx.depth() >= ctx.max_depth() {
                    debug!("Group '{}' at {} exceeds the depth bound", group, node.path);
                    return GroupRole::Blocked;
                }
                let guard = GuardKey { instance: self.instance.id, path: node.path.clone(), kind };
                if !ctx.try_activate(guard.clone()) {
                    debug!("Group '{}' at {} is already being resolved", group, node.path);
                    return GroupRole::Blocked;
                }
                self.render_group(ctx, &container, kind, group, &members);
                ctx.deactivate(&guard);
                GroupRole::Owner
            }
        }
    }

    /// Visible members of the group containing `name`: the contiguous run for
    /// foldouts, every same-named member for boxes
    fn group_members(&mut self, container: &FieldPath, kind: GroupKind, group: &str, name: &str) -> Vec<MemberDescriptor> {
        let Some(type_name) = self.instance.object.object_at(container).map(|o| o.type_name.clone()) else {
            return Vec::new();
        };
        let Some(schema) = self.registry.render_schema(&type_name) else {
            return Vec::new();
        };
        let in_group = |m: &MemberDescriptor| m.attributes.group(kind) == Some(group);

        let candidates = match kind {
            GroupKind::Foldout => {
                let Some(position) = schema.position(name) else {
                    return Vec::new();
                };
                let mut start = position;
                while start > 0 && in_group(&schema.members[start - 1]) {
                    start -= 1;
                }
                let mut end = position + 1;
                while end < schema.members.len() && in_group(&schema.members[end]) {
                    end += 1;
                }
                &schema.members[start..end]
            }
            GroupKind::Box => &schema.members[..],
        };

        let mut members = Vec::new();
        for member in candidates.iter().filter(|m| in_group(m)) {
            if self.is_visible(container, member) {
                members.push(member.clone());
            }
        }
        members
    }

    fn render_group(
        &mut self,
        ctx: &mut RenderContext,
        container: &FieldPath,
        kind: GroupKind,
        group: &str,
        members: &[MemberDescriptor],
    ) {
        match kind {
            GroupKind::Foldout => {
                let key = group_key(self.instance.id, container, group);
                let expanded = self.state.is_expanded(&key, self.settings.expand_foldouts_by_default);
                let now = self.ui.group_header(&key, group, members.len(), expanded);
                if now != expanded {
                    self.state.set_expanded(&key, now);
                    if !now {
                        for member in members {
                            self.state.collapse(self.instance.id, &container.field(&member.name));
                        }
                    }
                }
                if now {
                    self.ui.indent(1);
                    self.render_members(ctx, container, kind, members);
                    self.ui.indent(-1);
                }
            }
            GroupKind::Box => {
                let id = format!("{}/{}@{}", self.instance.id, container, group);
                self.ui.begin_box(&id, group);
                self.render_members(ctx, container, kind, members);
                self.ui.end_box();
            }
        }
    }

    fn render_members(&mut self, ctx: &mut RenderContext, container: &FieldPath, kind: GroupKind, members: &[MemberDescriptor]) {
        for member in members {
            ctx.suppress(kind);
            self.render(ctx, &FieldNode::member(container, member), true);
            ctx.release(kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DrawCall, Harness};
    use crate::widgets::FrameInput;
    use gantry_common::attributes::MetaAttribute;
    use gantry_common::diagnostics::Severity;
    use gantry_common::schema::{TypeRegistry, TypeSchema};
    use gantry_common::settings::InspectorSettings;
    use gantry_common::value::{FieldType, Instance, Object, Value};

    fn foldout(name: &str) -> MetaAttribute {
        MetaAttribute::Foldout(name.into())
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::default();
        registry.register(
            TypeSchema::build("Hero")
                .field("name", FieldType::String)
                .field("health", FieldType::Int)
                .attr(foldout("Stats"))
                .field("armor", FieldType::Int)
                .attr(foldout("Stats"))
                .field("speed", FieldType::Float)
                .attr(foldout("Stats"))
                .field("title", FieldType::String)
                .field("luck", FieldType::Int)
                .attr(foldout("Stats"))
                .field("icon", FieldType::String)
                .attr(MetaAttribute::BoxGroup("Look".into()))
                .field("tint", FieldType::Color)
                .attr(MetaAttribute::BoxGroup("Look".into()))
                .finish(),
        );
        registry
    }

    fn hero(registry: &TypeRegistry) -> Instance {
        Instance::new("Hero", registry.instantiate("Hero").unwrap())
    }

    fn expanded() -> InspectorSettings {
        InspectorSettings { expand_foldouts_by_default: true, ..Default::default() }
    }

    #[test]
    fn test_foldout_run_renders_once() {
        let registry = registry();
        let mut instance = hero(&registry);
        let mut harness = Harness::with_settings(registry, expanded());

        harness.render(&mut instance);

        assert_eq!(harness.ui.group_headers(), vec![("Stats", 3), ("Stats", 1)]);
        assert_eq!(
            harness.ui.field_labels(),
            vec!["name", "health", "armor", "speed", "title", "luck", "icon", "tint"]
        );
    }

    #[test]
    fn test_foldout_expansion_is_stable() {
        let registry = registry();
        let mut instance = hero(&registry);
        let mut harness = Harness::new(registry);

        harness.render(&mut instance);
        assert!(!harness.ui.field_labels().contains(&"health"));

        harness.ui.toggle("#Stats");
        harness.render(&mut instance);
        assert!(harness.ui.field_labels().contains(&"health"));

        for _ in 0..2 {
            harness.render(&mut instance);
            let headers = harness.ui.calls_for("#Stats");
            assert!(matches!(headers[0], DrawCall::GroupHeader { expanded: true, count: 3, .. }));
        }
    }

    #[test]
    fn test_box_group_collects_all_members() {
        let registry = registry();
        let mut instance = hero(&registry);
        let mut harness = Harness::with_settings(registry, expanded());

        harness.render(&mut instance);

        let begin = harness.ui.calls.iter().position(|c| matches!(c, DrawCall::BeginBox { .. })).unwrap();
        let end = harness.ui.calls.iter().position(|c| matches!(c, DrawCall::EndBox)).unwrap();
        let inside: Vec<_> = harness.ui.calls[begin..end]
            .iter()
            .filter_map(|c| match c {
                DrawCall::Field { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(inside, vec!["icon", "tint"]);
        assert_eq!(harness.ui.calls.iter().filter(|c| matches!(c, DrawCall::BeginBox { .. })).count(), 1);
    }

    #[test]
    fn test_same_group_name_in_different_containers() {
        let mut registry = TypeRegistry::default();
        registry.register(
            TypeSchema::build("Part")
                .field("a", FieldType::Int)
                .attr(foldout("Stats"))
                .field("b", FieldType::Int)
                .attr(foldout("Stats"))
                .finish(),
        );
        registry.register(
            TypeSchema::build("Rig")
                .field("left", FieldType::Object("Part".into()))
                .field("right", FieldType::Object("Part".into()))
                .finish(),
        );
        let mut instance = Instance::new("Rig", registry.instantiate("Rig").unwrap());
        let settings = InspectorSettings { expand_fields_by_default: true, ..expanded() };
        let mut harness = Harness::with_settings(registry, settings);

        harness.render(&mut instance);
        assert_eq!(harness.ui.group_headers(), vec![("Stats", 2), ("Stats", 2)]);
        assert_eq!(harness.ui.calls_for("left#Stats").len(), 1);
        assert_eq!(harness.ui.calls_for("right#Stats").len(), 1);
    }

    #[test]
    fn test_hidden_members_excluded_and_next_member_owns() {
        let mut registry = TypeRegistry::default();
        registry.register(
            TypeSchema::build("Trap")
                .field("armed", FieldType::Bool)
                .field("damage", FieldType::Int)
                .attr(foldout("Tuning"))
                .attr(MetaAttribute::ShowIf(Condition::member("armed")))
                .field("delay", FieldType::Float)
                .attr(foldout("Tuning"))
                .finish(),
        );
        let mut instance = Instance::new("Trap", registry.instantiate("Trap").unwrap());
        let mut harness = Harness::with_settings(registry, expanded());

        harness.render(&mut instance);
        assert_eq!(harness.ui.group_headers(), vec![("Tuning", 1)]);
        assert_eq!(harness.ui.field_labels(), vec!["armed", "delay"]);

        instance.object.set("armed", Value::Bool(true));
        harness.render(&mut instance);
        assert_eq!(harness.ui.group_headers(), vec![("Tuning", 2)]);
        assert_eq!(harness.ui.field_labels(), vec!["armed", "damage", "delay"]);
    }

    #[test]
    fn test_unresolved_condition_hides_with_warning() {
        let mut registry = TypeRegistry::default();
        registry.register(
            TypeSchema::build("Door")
                .field("open", FieldType::Bool)
                .field("hinge", FieldType::Float)
                .attr(MetaAttribute::ShowIf(Condition::member("isLocked")))
                .field("knob", FieldType::Float)
                .attr(MetaAttribute::EnableIf(Condition::member("isLocked")))
                .finish(),
        );
        let mut instance = Instance::new("Door", registry.instantiate("Door").unwrap());
        let mut harness = Harness::new(registry);

        harness.render(&mut instance);
        harness.render(&mut instance);

        assert_eq!(harness.ui.field_labels(), vec!["open", "knob"]);
        assert!(matches!(harness.ui.find("knob"), Some(DrawCall::Field { enabled: false, .. })));
        // reported once per condition, not once per pass
        assert_eq!(harness.sink.with_severity(Severity::Warning).count(), 2);
    }

    #[test]
    fn test_active_guard_renders_nothing() {
        let registry = registry();
        let mut instance = hero(&registry);
        let member = registry.schema("Hero").and_then(|s| s.member("health")).cloned().unwrap();
        let mut harness = Harness::with_settings(registry, expanded());
        let input = FrameInput::default();

        let mut ctx = RenderContext::new(64);
        let guard = GuardKey { instance: instance.id, path: FieldPath::parse("health"), kind: GroupKind::Foldout };
        assert!(ctx.try_activate(guard));

        let resolution = {
            let mut renderer = harness.renderer(&mut instance, &input);
            renderer.resolve(&mut ctx, &FieldNode::member(&FieldPath::root(), &member))
        };
        assert_eq!(resolution, Resolution::HIDDEN);
        assert!(harness.ui.group_headers().is_empty());
    }

    #[test]
    fn test_cyclic_group_terminates() {
        // a node type whose grouped member is itself a node nests groups forever
        let mut registry = TypeRegistry::default();
        registry.register(
            TypeSchema::build("Link")
                .field("next", FieldType::Object("Link".into()))
                .attr(foldout("Chain"))
                .finish(),
        );
        fn chain(depth: usize) -> Object {
            let link = Object::new("Link");
            if depth == 0 {
                link
            } else {
                link.with("next", Value::Object(chain(depth - 1)))
            }
        }
        let mut instance = Instance::new("Chain", chain(200));
        let settings = InspectorSettings { expand_fields_by_default: true, max_depth: 64, ..expanded() };
        let mut harness = Harness::with_settings(registry, settings);

        harness.render(&mut instance);
        let headers = harness.ui.group_headers().len();
        assert!(headers > 0 && headers <= 64);
    }
}
