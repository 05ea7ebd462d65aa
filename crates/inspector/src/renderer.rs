//! Property tree renderer.
//!
//! One [`Renderer`] lives for one call into the inspector and walks the live
//! object of a single instance. Every node goes through the same pipeline:
//! resolve attributes, then draw exactly one control (or hand the node to a
//! custom renderer, a group owner or the collection controller), commit user
//! edits with undo, run validators once, and recurse into children.

use std::collections::HashMap;
use std::sync::Arc;

use gantry_common::assets::AssetDatabase;
use gantry_common::diagnostics::{DiagnosticSink, Severity};
use gantry_common::history::{Command, PropertyCommand, UndoLog};
use gantry_common::path::{FieldPath, PathSegment};
use gantry_common::reflect::{self, AccessError};
use gantry_common::schema::{Getter, MemberDescriptor, MemberKind, TypeRegistry};
use gantry_common::settings::InspectorSettings;
use gantry_common::value::{FieldType, Instance, Value};
use tracing::debug;

use crate::collection::ops::{self, Selection};
use crate::collection::{drop, ListKey, PointerOutcome, SortStrategy};
use crate::context::RenderContext;
use crate::state::{field_key, InspectorState};
use crate::validators;
use crate::widgets::{FrameInput, ListOp, MenuEntry, Widgets};

/// Renderer that fully owns the drawing of a member
pub trait FieldRenderer: Send + Sync {
    /// Draw `value`; return the new value when the user changed it
    fn render(&self, ui: &mut dyn Widgets, id: &str, label: &str, value: &Value, enabled: bool) -> Option<Value>;
}

impl<F> FieldRenderer for F
where
    F: Fn(&mut dyn Widgets, &str, &str, &Value, bool) -> Option<Value> + Send + Sync,
{
    fn render(&self, ui: &mut dyn Widgets, id: &str, label: &str, value: &Value, enabled: bool) -> Option<Value> {
        self(ui, id, label, value, enabled)
    }
}

/// Custom renderers by the name used in `CustomRenderer` attributes
pub type CustomRenderers = HashMap<String, Arc<dyn FieldRenderer>>;

/// One renderable slot: a path under the instance root plus the member that
/// declares it (`None` for collection elements and untyped fields)
#[derive(Clone, Debug)]
pub struct FieldNode {
    pub path: FieldPath,
    pub member: Option<MemberDescriptor>,
    pub ty: FieldType,
}

impl FieldNode {
    pub fn member(container: &FieldPath, member: &MemberDescriptor) -> Self {
        Self {
            path: container.field(&member.name),
            ty: member.ty.clone(),
            member: Some(member.clone()),
        }
    }

    pub fn element(list: &FieldPath, index: usize, ty: FieldType) -> Self {
        Self { path: list.index(index), member: None, ty }
    }

    pub fn label(&self) -> String {
        match (&self.member, self.path.last()) {
            (Some(member), _) => member.display_name().to_string(),
            (None, Some(PathSegment::Index(index))) => format!("Element {}", index),
            (None, Some(PathSegment::Field(name))) => name.clone(),
            (None, None) => String::new(),
        }
    }
}

pub struct Renderer<'a> {
    pub(crate) registry: &'a TypeRegistry,
    pub(crate) settings: &'a InspectorSettings,
    pub(crate) renderers: &'a CustomRenderers,
    pub(crate) state: &'a mut InspectorState,
    pub(crate) ui: &'a mut dyn Widgets,
    pub(crate) undo: &'a mut dyn UndoLog,
    pub(crate) sink: &'a mut dyn DiagnosticSink,
    pub(crate) assets: &'a dyn AssetDatabase,
    pub(crate) input: &'a FrameInput,
    pub(crate) instance: &'a mut Instance,
}

impl Renderer<'_> {
    /// Render one node and, when `include_children` is set and it is
    /// expanded, everything under it
    pub fn render(&mut self, ctx: &mut RenderContext, node: &FieldNode, include_children: bool) {
        if !ctx.enter() {
            debug!("Depth bound reached at {}", node.path);
            return;
        }

        let resolution = self.resolve(ctx, node);
        if resolution.visible && !resolution.consumed_by_group {
            let enabled = resolution.enabled;
            if !enabled {
                ctx.push_disabled();
            }
            self.draw(ctx, node, enabled, include_children);
            if !enabled {
                ctx.pop_disabled();
            }
        }

        ctx.exit();
    }

    /// Members of the object at `container`, in render-schema order, with
    /// grouping re-enabled for this level
    pub fn render_children(&mut self, ctx: &mut RenderContext, container: &FieldPath) {
        let Some(type_name) = self.instance.object.object_at(container).map(|o| o.type_name.clone()) else {
            return;
        };

        let saved = ctx.reenable_grouping();
        match self.registry.render_schema(&type_name) {
            Some(schema) => {
                for member in &schema.members {
                    self.render(ctx, &FieldNode::member(container, member), true);
                }
            }
            None => {
                debug!("No schema for '{}', listing raw fields", type_name);
                let fields: Vec<(String, FieldType)> = self
                    .instance
                    .object
                    .object_at(container)
                    .map(|o| {
                        o.fields
                            .iter()
                            .filter(|(name, _)| !name.starts_with('_'))
                            .map(|(name, value)| (name.clone(), value.field_type()))
                            .collect()
                    })
                    .unwrap_or_default();
                for (name, ty) in fields {
                    let node = FieldNode { path: container.field(&name), member: None, ty };
                    self.render(ctx, &node, true);
                }
            }
        }
        ctx.restore_grouping(saved);
    }

    fn draw(&mut self, ctx: &mut RenderContext, node: &FieldNode, enabled: bool, include_children: bool) {
        match node.member.as_ref().map(|m| &m.kind) {
            Some(MemberKind::Action(_)) => return self.draw_action(node, enabled),
            Some(MemberKind::Derived(getter)) => return self.draw_derived(node, getter),
            _ => {}
        }

        if let Some(name) = node.member.as_ref().and_then(|m| m.attributes.custom_renderer()) {
            if self.draw_custom(node, name, enabled) {
                return;
            }
        }

        match &node.ty {
            FieldType::List(element) => self.draw_collection(ctx, node, element, enabled),
            FieldType::Object(_) => self.draw_object(ctx, node, enabled, include_children),
            _ => self.draw_leaf(ctx, node, enabled),
        }
    }

    pub(crate) fn id(&self, path: &FieldPath) -> String {
        field_key(self.instance.id, path)
    }

    pub(crate) fn warn(&mut self, message: String) {
        let context = Some(self.instance.id);
        self.state.diagnostics.config_warning(&mut *self.sink, context, message);
    }

    pub(crate) fn data_error(&mut self, id: Option<&str>, message: String) {
        if let Some(id) = id {
            self.ui.message(id, &message, Severity::Error);
        }
        let context = Some(self.instance.id);
        self.state.diagnostics.data_error(&mut *self.sink, context, message);
    }

    fn value_at(&mut self, path: &FieldPath) -> Option<Value> {
        let value = self.instance.object.get_path(path).cloned();
        if value.is_none() {
            self.data_error(None, format!("No value at '{}'", path));
        }
        value
    }

    fn draw_leaf(&mut self, ctx: &mut RenderContext, node: &FieldNode, enabled: bool) {
        let id = self.id(&node.path);
        let label = node.label();
        let Some(value) = self.value_at(&node.path) else {
            return;
        };

        if let Some(edited) = self.ui.value_field(&id, &label, &value, enabled) {
            if enabled && edited != value {
                if node.ty.accepts(&edited) {
                    self.commit_edit(node, value, edited);
                } else {
                    self.data_error(
                        Some(&id),
                        format!("'{}' expects {}, got {}", label, node.ty, edited.kind_name()),
                    );
                }
            }
        }

        self.validate(ctx, node);
    }

    fn draw_derived(&mut self, node: &FieldNode, getter: &Getter) {
        let id = self.id(&node.path);
        let Some(owner) = self.instance.object.object_at(&node.path.container()) else {
            return;
        };
        let value = getter(owner);
        self.ui.read_only_field(&id, &node.label(), &value);
    }

    fn draw_action(&mut self, node: &FieldNode, enabled: bool) {
        let id = self.id(&node.path);
        let label = node.label();
        if !self.ui.button(&id, &label, enabled) || !enabled {
            return;
        }
        let Some(name) = node.path.leaf_name().map(str::to_string) else {
            return;
        };
        debug!("Invoking action {} on {}", name, self.instance.name);
        if let Some(command) = self.invoke_recorded(&node.path.container(), std::slice::from_ref(&name)) {
            self.record(vec![command.described(format!("Invoke {}", name))]);
        }
    }

    /// Returns false when the renderer is unknown, so default drawing applies
    fn draw_custom(&mut self, node: &FieldNode, name: &str, enabled: bool) -> bool {
        let Some(renderer) = self.renderers.get(name).cloned() else {
            self.warn(format!("Custom renderer '{}' for '{}' is not registered", name, node.path));
            return false;
        };
        let id = self.id(&node.path);
        let Some(value) = self.value_at(&node.path) else {
            return true;
        };

        if let Some(edited) = renderer.render(&mut *self.ui, &id, &node.label(), &value, enabled) {
            if enabled && edited != value {
                match self.instance.object.replace_path(&node.path, edited.clone()) {
                    Ok(_) => {
                        let command = PropertyCommand::new(self.instance.id, node.path.clone(), value, edited);
                        self.record(vec![command]);
                    }
                    Err(e) => self.data_error(None, e.to_string()),
                }
            }
        }
        true
    }

    fn draw_object(&mut self, ctx: &mut RenderContext, node: &FieldNode, enabled: bool, include_children: bool) {
        let id = self.id(&node.path);
        if self.instance.object.get_path(&node.path).and_then(Value::as_object).is_none() {
            self.data_error(None, format!("'{}' does not hold an object", node.path));
            return;
        }

        let expanded = self.state.is_expanded(&id, self.settings.expand_fields_by_default);
        let now = self.ui.foldout(&id, &node.label(), expanded, enabled);
        if now != expanded {
            self.set_expanded(&node.path, &id, now);
        }

        self.validate(ctx, node);

        if include_children && now {
            self.ui.indent(1);
            self.render_children(ctx, &node.path);
            self.ui.indent(-1);
        }
    }

    /// Store a field's expansion; collapsing evicts what was cached below it
    pub(crate) fn set_expanded(&mut self, path: &FieldPath, key: &str, expanded: bool) {
        self.state.set_expanded(key, expanded);
        if !expanded {
            self.state.collapse(self.instance.id, path);
        }
    }

    fn commit_edit(&mut self, node: &FieldNode, old: Value, new: Value) {
        if let Err(e) = self.instance.object.replace_path(&node.path, new.clone()) {
            self.data_error(None, e.to_string());
            return;
        }
        let mut commands = vec![PropertyCommand::new(self.instance.id, node.path.clone(), old, new)];
        commands.extend(self.notify_changed(&node.path));
        self.record(commands);
    }

    /// Run the `OnValueChanged` callbacks of the nearest member at or above
    /// `path` that declares any. Elements and nested fields report to the
    /// collection or object field that holds them.
    fn notify_changed(&mut self, path: &FieldPath) -> Option<PropertyCommand> {
        let mut cursor = path.clone();
        while !cursor.is_root() {
            let callbacks: Vec<String> = reflect::member_at(self.registry, &self.instance.object, &cursor)
                .map(|member| member.attributes.on_value_changed().map(str::to_string).collect())
                .unwrap_or_default();
            if !callbacks.is_empty() {
                return self.invoke_recorded(&cursor.container(), &callbacks);
            }
            cursor = cursor.container();
        }
        None
    }

    /// Run validators on `node` once per pass and commit any rewrite
    fn validate(&mut self, ctx: &mut RenderContext, node: &FieldNode) {
        let Some(member) = &node.member else {
            return;
        };
        if member.attributes.validators().next().is_none() {
            return;
        }
        if !ctx.mark_validated(self.instance.id, &node.path) {
            return;
        }
        let Some(value) = self.instance.object.get_path(&node.path).cloned() else {
            return;
        };

        let registry = self.registry;
        let container = node.path.container();
        let Some(owner) = self.instance.object.object_at_mut(&container) else {
            return;
        };
        let outcome = validators::apply(registry, owner, member, &value);

        let id = self.id(&node.path);
        for warning in outcome.warnings {
            self.warn(warning);
        }
        for error in outcome.errors {
            self.data_error(Some(&id), error);
        }

        let Some(rewritten) = outcome.rewritten else {
            return;
        };
        if let Err(e) = self.instance.object.replace_path(&node.path, rewritten.clone()) {
            self.data_error(None, e.to_string());
            return;
        }
        debug!("Validator rewrote {} to {:?}", node.path, rewritten);

        let mut commands = vec![PropertyCommand::new(self.instance.id, node.path.clone(), value, rewritten)];
        let callbacks: Vec<String> = member.attributes.on_validated().map(str::to_string).collect();
        commands.extend(self.invoke_recorded(&container, &callbacks));
        self.record(commands);
    }

    /// Invoke zero-argument methods on the object at `container`. Returns a
    /// snapshot command when they changed it.
    fn invoke_recorded(&mut self, container: &FieldPath, names: &[String]) -> Option<PropertyCommand> {
        if names.is_empty() {
            return None;
        }
        let registry = self.registry;
        let instance = self.instance.id;
        let mut problems = Vec::new();

        let command = {
            let owner = self.instance.object.object_at_mut(container)?;
            let before = owner.clone();
            for name in names {
                match reflect::invoke_callback(registry, owner, name) {
                    Ok(()) => {}
                    Err(AccessError::Unresolved) => problems.push(format!(
                        "Callback '{}' does not resolve on '{}'",
                        name, owner.type_name
                    )),
                    Err(AccessError::BadSignature(reason)) => problems.push(reason),
                }
            }
            (*owner != before).then(|| {
                PropertyCommand::new(instance, container.clone(), Value::Object(before), Value::Object(owner.clone()))
            })
        };

        for problem in problems {
            self.warn(problem);
        }
        command
    }

    fn record(&mut self, mut commands: Vec<PropertyCommand>) {
        match commands.len() {
            0 => {}
            1 => {
                if let Some(command) = commands.pop() {
                    self.undo.record(Command::Property(command));
                }
            }
            _ => {
                let description = commands[0].description.clone();
                self.undo.record(Command::Batch { commands, description });
            }
        }
    }

    fn draw_collection(&mut self, ctx: &mut RenderContext, node: &FieldNode, element: &FieldType, enabled: bool) {
        let key = ListKey::new(self.instance.id, node.path.clone());
        let id = self.id(&node.path);
        let Some(len) = self.instance.object.get_path(&node.path).and_then(Value::as_list).map(Vec::len) else {
            self.data_error(None, format!("'{}' does not hold a collection", node.path));
            return;
        };

        let expanded = self.state.is_expanded(&id, self.settings.expand_fields_by_default);
        let now = self.ui.list_header(&id, &node.label(), len, expanded);
        if now != expanded {
            self.set_expanded(&node.path, &id, now);
        }

        if now {
            self.ui.indent(1);
            let mut rects = Vec::with_capacity(len);
            for index in 0..len {
                let element_node = FieldNode::element(&node.path, index, element.clone());
                if self.instance.object.get_path(&element_node.path).is_none() {
                    break;
                }
                let selected = self.state.collections.is_selected(&key, index);
                rects.push(self.ui.list_element(&id, index, selected));
                self.render(ctx, &element_node, true);
            }
            self.state.collections.set_layout(&key, rects);

            if enabled {
                self.handle_pointer(&key, element);
            }
            if let Some(insertion) = self.state.collections.insertion(&key) {
                self.ui.insertion_marker(&id, insertion);
            }
            self.ui.indent(-1);
        }

        if enabled {
            self.handle_drops(&key, element, &id);
            self.handle_menu(&key, element, &id);
        }

        self.validate(ctx, node);
    }

    fn handle_pointer(&mut self, key: &ListKey, element: &FieldType) {
        let input = self.input;
        if input.pointer.is_empty() {
            return;
        }
        let Some(elements) = self.instance.object.get_path(&key.path).and_then(Value::as_list).cloned() else {
            return;
        };

        if let PointerOutcome::Reorder { dragged, insertion } =
            self.state.collections.handle(key, &input.pointer, &elements, element)
        {
            self.mutate_list(key, "Reorder", |items| Ok(ops::reorder(items, &dragged, insertion)));
        }
    }

    fn handle_drops(&mut self, key: &ListKey, element: &FieldType, id: &str) {
        let input = self.input;
        let registry = self.registry;
        let assets = self.assets;

        for incoming in input.drops.iter().filter(|d| d.instance == key.instance && d.path == key.path) {
            let mut added = 0;
            self.mutate_list(key, "Drop onto", |items| {
                let start = items.len();
                added = drop::accept_drop(registry, assets, element, items, &incoming.objects);
                Ok((added > 0).then(|| (start..items.len()).collect()))
            });
            if added == 0 {
                self.ui.drop_rejected(id);
            }
        }
    }

    fn handle_menu(&mut self, key: &ListKey, element: &FieldType, id: &str) {
        let len = self
            .instance
            .object
            .get_path(&key.path)
            .and_then(Value::as_list)
            .map(Vec::len)
            .unwrap_or(0);
        let selection = self.state.collections.selection(key);
        let sort = SortStrategy::for_type(element);

        let mut entries = vec![MenuEntry::new(ListOp::Add, "Add")];
        if !selection.is_empty() {
            entries.push(MenuEntry::new(ListOp::Delete, "Delete"));
            entries.push(MenuEntry::new(ListOp::Duplicate, "Duplicate"));
        }
        if len > 0 {
            entries.push(MenuEntry::new(ListOp::Clear, "Clear"));
            if element.is_reference() {
                entries.push(MenuEntry::new(ListOp::RemoveNulls, "Remove Null References"));
                entries.push(MenuEntry::new(ListOp::RemoveDuplicates, "Remove Duplicates"));
            }
            entries.push(MenuEntry::new(ListOp::Reverse, "Reverse"));
            if let Some(strategy) = sort {
                entries.push(MenuEntry::new(ListOp::Sort, strategy.label()));
            }
        }

        let Some(op) = self.ui.list_menu(id, &entries) else {
            return;
        };
        if !entries.iter().any(|e| e.op == op) {
            return;
        }

        match op {
            ListOp::Add => match self.registry.default_value(element) {
                Ok(value) => self.mutate_list(key, "Add to", |items| Ok(Some(ops::add(items, value)))),
                Err(e) => self.data_error(None, format!("Cannot add to '{}': {}", key.path, e)),
            },
            ListOp::Delete => {
                self.mutate_list(key, "Delete from", |items| Ok(Some(ops::delete(items, &selection))))
            }
            ListOp::Duplicate => {
                self.mutate_list(key, "Duplicate in", |items| Ok(Some(ops::duplicate(items, &selection))))
            }
            ListOp::Clear => self.mutate_list(key, "Clear", |items| Ok(Some(ops::clear(items)))),
            ListOp::RemoveNulls => self.mutate_list(key, "Remove nulls from", |items| {
                Ok(Some(ops::remove_nulls(items, &selection)))
            }),
            ListOp::RemoveDuplicates => self.mutate_list(key, "Remove duplicates from", |items| {
                Ok(Some(ops::remove_duplicates(items, &selection)))
            }),
            ListOp::Reverse => self.mutate_list(key, "Reverse", |items| Ok(Some(ops::reverse(items, &selection)))),
            ListOp::Sort => {
                if let Some(strategy) = sort {
                    debug!("{} on {}", strategy.label(), key);
                    self.mutate_list(key, "Sort", |items| Ok(Some(ops::sort(items, strategy, &selection))));
                }
            }
        }
    }

    /// Apply a structural edit to the collection at `key` as one undo step,
    /// together with the change callbacks it triggers. `mutate` returns the
    /// new selection, or `None` when nothing changed.
    fn mutate_list<F>(&mut self, key: &ListKey, action: &str, mutate: F)
    where
        F: FnOnce(&mut Vec<Value>) -> gantry_common::Result<Option<Selection>>,
    {
        let result = match self.instance.object.list_at_mut(&key.path) {
            Ok(items) => {
                let before = items.clone();
                match mutate(items) {
                    Ok(selection) => Ok((before, items.clone(), selection)),
                    Err(e) => {
                        *items = before;
                        Err(e)
                    }
                }
            }
            Err(e) => Err(e),
        };

        let (before, after, selection) = match result {
            Ok(changed) => changed,
            Err(e) => {
                self.data_error(None, format!("{} '{}' failed: {}", action, key.path, e));
                return;
            }
        };

        let Some(selection) = selection else {
            return;
        };
        self.state.collections.set_selection(key, selection);
        if before == after {
            return;
        }

        debug!("{} {}", action, key);
        self.state.evict_elements(key.instance, &key.path);
        let command = PropertyCommand::new(key.instance, key.path.clone(), Value::List(before), Value::List(after))
            .described(format!("{} {}", action, key.path));
        let description = command.description.clone();
        let mut commands = vec![command];
        commands.extend(self.notify_changed(&key.path));
        // batches never merge
        self.undo.record(Command::Batch { commands, description });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DrawCall, Harness};
    use crate::widgets::{ExternalDrop, Modifiers, PointerEvent};
    use bevy::math::Vec2;
    use gantry_common::attributes::{Bound, MetaAttribute};
    use gantry_common::schema::TypeSchema;
    use gantry_common::value::{Object, ObjectRef};

    fn unit(id: u64, name: &str) -> Value {
        Value::Reference(Some(ObjectRef::new(id, "Unit", name)))
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::default();
        registry.register(
            TypeSchema::build("Turret")
                .field("range", FieldType::Float)
                .attr(MetaAttribute::Min(Bound::Const(0.0)))
                .attr(MetaAttribute::Max(Bound::Const(100.0)))
                .attr(MetaAttribute::OnValueChanged("recalculate".into()))
                .field("recalculated", FieldType::Int)
                .field("capacity", FieldType::Int)
                .field("ammo", FieldType::Int)
                .attr(MetaAttribute::Max(Bound::Member("capacity".into())))
                .field("target", FieldType::Reference("Unit".into()))
                .attr(MetaAttribute::Required { message: None })
                .field("locked", FieldType::Int)
                .attr(MetaAttribute::ReadOnly)
                .derived("reach", FieldType::Float, |o| {
                    Value::Float(o.get("range").and_then(Value::as_f64).unwrap_or(0.0) * 2.0)
                })
                .action("reload", |o| o.set("ammo", Value::Int(30)))
                .method("recalculate", vec![], None, |o, _| {
                    let count = o.get("recalculated").and_then(Value::as_f64).unwrap_or(0.0) as i64;
                    o.set("recalculated", Value::Int(count + 1));
                    None
                })
                .finish(),
        );
        registry.register(
            TypeSchema::build("Squad")
                .field("members", FieldType::List(Box::new(FieldType::Reference("Unit".into()))))
                .finish(),
        );
        registry
    }

    fn turret(registry: &TypeRegistry) -> Instance {
        let mut object = registry.instantiate("Turret").unwrap();
        object.set("capacity", Value::Int(30));
        Instance::new("Turret", object)
    }

    fn squad() -> Instance {
        let members = vec![unit(1, "A"), unit(4, "D"), unit(2, "B"), unit(3, "C"), unit(5, "E")];
        Instance::new("Squad", Object::new("Squad").with("members", Value::List(members)))
    }

    fn names(instance: &Instance) -> Vec<String> {
        instance
            .object
            .get("members")
            .and_then(Value::as_list)
            .unwrap()
            .iter()
            .map(|v| v.as_reference().flatten().map(|r| r.name.clone()).unwrap_or_default())
            .collect()
    }

    fn expanded_harness() -> Harness {
        let settings = InspectorSettings { expand_fields_by_default: true, ..Default::default() };
        Harness::with_settings(registry(), settings)
    }

    fn press(position: Vec2, modifiers: Modifiers) -> Vec<PointerEvent> {
        vec![PointerEvent::Down { position, modifiers }, PointerEvent::Up { position }]
    }

    #[test]
    fn test_edit_commits_with_undo_and_callback() {
        let mut harness = Harness::new(registry());
        let mut instance = turret(harness.inspector.registry());

        harness.ui.edit("range", Value::Float(40.0));
        harness.render(&mut instance);

        assert_eq!(instance.object.get("range"), Some(&Value::Float(40.0)));
        assert_eq!(instance.object.get("recalculated"), Some(&Value::Int(1)));
        assert_eq!(harness.history.len(), 1);

        harness.history.undo(std::slice::from_mut(&mut instance)).unwrap();
        assert_eq!(instance.object.get("range"), Some(&Value::Float(0.0)));
        assert_eq!(instance.object.get("recalculated"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_validator_rewrite_merges_with_edit() {
        let mut harness = Harness::new(registry());
        let mut instance = turret(harness.inspector.registry());

        harness.ui.edit("ammo", Value::Int(50));
        harness.render(&mut instance);

        // clamped to the dynamic bound in the same pass
        assert_eq!(instance.object.get("ammo"), Some(&Value::Int(30)));
        assert_eq!(harness.history.len(), 1);

        harness.history.undo(std::slice::from_mut(&mut instance)).unwrap();
        assert_eq!(instance.object.get("ammo"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_required_reference_reported_every_pass() {
        let mut harness = Harness::new(registry());
        let mut instance = turret(harness.inspector.registry());

        harness.render(&mut instance);
        assert_eq!(harness.ui.messages(Severity::Error), vec!["target is required"]);
        harness.render(&mut instance);
        assert_eq!(harness.sink.with_severity(Severity::Error).count(), 2);

        instance.object.set("target", unit(7, "Boss"));
        harness.render(&mut instance);
        assert!(harness.ui.messages(Severity::Error).is_empty());
        assert_eq!(harness.sink.with_severity(Severity::Error).count(), 2);
    }

    #[test]
    fn test_read_only_and_mistyped_edits_are_ignored() {
        let mut harness = Harness::new(registry());
        let mut instance = turret(harness.inspector.registry());

        harness.ui.edit("locked", Value::Int(9));
        harness.ui.edit("capacity", Value::String("lots".into()));
        harness.render(&mut instance);

        assert!(matches!(harness.ui.find("locked"), Some(DrawCall::Field { enabled: false, .. })));
        assert_eq!(instance.object.get("locked"), Some(&Value::Int(0)));
        assert_eq!(instance.object.get("capacity"), Some(&Value::Int(30)));
        assert!(harness.sink.contains("expects int"));
        assert!(harness.history.is_empty());
    }

    #[test]
    fn test_derived_and_action_members() {
        let mut harness = Harness::new(registry());
        let mut instance = turret(harness.inspector.registry());
        instance.object.set("range", Value::Float(12.5));

        harness.ui.click("reload");
        harness.render(&mut instance);

        assert!(matches!(
            harness.ui.find("reach"),
            Some(DrawCall::ReadOnly { value: Value::Float(v), .. }) if *v == 25.0
        ));
        let labels = harness.ui.field_labels();
        assert_eq!(labels.last(), Some(&"reach"));
        assert!(matches!(harness.ui.calls.last(), Some(DrawCall::Button { label, .. }) if label == "reload"));

        assert_eq!(instance.object.get("ammo"), Some(&Value::Int(30)));
        assert_eq!(harness.history.undo_description(), Some("Invoke reload"));
        harness.history.undo(std::slice::from_mut(&mut instance)).unwrap();
        assert_eq!(instance.object.get("ammo"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_deep_nesting_terminates() {
        let mut registry = TypeRegistry::default();
        registry.register(
            TypeSchema::build("Node")
                .field("label", FieldType::String)
                .field("child", FieldType::Object("Node".into()))
                .finish(),
        );
        let mut object = Object::new("Node").with("label", Value::String("leaf".into()));
        for _ in 0..200 {
            object = Object::new("Node")
                .with("label", Value::String("node".into()))
                .with("child", Value::Object(object));
        }
        let mut instance = Instance::new("Tree", object);
        let settings = InspectorSettings { expand_fields_by_default: true, max_depth: 64, ..Default::default() };
        let mut harness = Harness::with_settings(registry, settings);

        harness.render(&mut instance);
        let labels = harness.ui.field_labels().len();
        assert!(labels > 10 && labels <= 64);
    }

    #[test]
    fn test_drag_reorders_selected_block() {
        let mut harness = expanded_harness();
        let mut instance = squad();

        harness.render(&mut instance);
        let rects = harness.ui.element_rects("members");
        assert_eq!(rects.len(), 5);

        harness.render_with(&mut instance, &FrameInput::pointer(press(rects[2].center(), Modifiers::TOGGLE)));
        harness.render_with(&mut instance, &FrameInput::pointer(press(rects[3].center(), Modifiers::TOGGLE)));
        let key = ListKey::new(instance.id, FieldPath::parse("members"));
        assert_eq!(harness.inspector.state().collections.selection(&key), Selection::from([2, 3]));

        let target = rects[1].center() - Vec2::new(0.0, 5.0);
        let drag = vec![
            PointerEvent::Down { position: rects[2].center(), modifiers: Modifiers::NONE },
            PointerEvent::Move { position: target },
            PointerEvent::Up { position: target },
        ];
        harness.render_with(&mut instance, &FrameInput::pointer(drag));

        assert_eq!(names(&instance), vec!["A", "B", "C", "D", "E"]);
        assert_eq!(harness.inspector.state().collections.selection(&key), Selection::from([1, 2]));
        assert_eq!(harness.history.len(), 1);

        harness.history.undo(std::slice::from_mut(&mut instance)).unwrap();
        assert_eq!(names(&instance), vec!["A", "D", "B", "C", "E"]);
    }

    #[test]
    fn test_drag_within_own_block_is_noop() {
        let mut harness = expanded_harness();
        let mut instance = squad();
        harness.render(&mut instance);
        let rects = harness.ui.element_rects("members");

        let target = rects[2].center() + Vec2::new(0.0, 8.0);
        let drag = vec![
            PointerEvent::Down { position: rects[2].center(), modifiers: Modifiers::TOGGLE },
            PointerEvent::Move { position: target },
            PointerEvent::Up { position: target },
        ];
        harness.render_with(&mut instance, &FrameInput::pointer(drag));

        assert_eq!(names(&instance), vec!["A", "D", "B", "C", "E"]);
        assert!(harness.history.is_empty());
    }

    #[test]
    fn test_menu_duplicate_then_delete() {
        let mut harness = expanded_harness();
        let mut instance = squad();
        harness.render(&mut instance);
        let rects = harness.ui.element_rects("members");

        // nothing selected: delete is not offered and is ignored
        harness.ui.choose("members", ListOp::Delete);
        harness.render(&mut instance);
        assert_eq!(names(&instance).len(), 5);

        harness.render_with(&mut instance, &FrameInput::pointer(press(rects[1].center(), Modifiers::NONE)));
        harness.ui.choose("members", ListOp::Duplicate);
        harness.render(&mut instance);
        assert_eq!(names(&instance), vec!["A", "D", "D", "B", "C", "E"]);

        harness.ui.choose("members", ListOp::Delete);
        harness.render(&mut instance);
        assert_eq!(names(&instance), vec!["A", "D", "B", "C", "E"]);
        assert_eq!(harness.history.len(), 2);
        assert_eq!(harness.history.undo_description(), Some("Delete from members"));
    }

    #[test]
    fn test_menu_entries_follow_element_type() {
        let mut harness = expanded_harness();
        let mut instance = squad();
        harness.render(&mut instance);

        let entries = harness
            .ui
            .calls
            .iter()
            .find_map(|c| match c {
                DrawCall::Menu { entries, .. } => Some(entries.iter().map(|e| e.label.clone()).collect::<Vec<_>>()),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            entries,
            vec!["Add", "Clear", "Remove Null References", "Remove Duplicates", "Reverse", "Sort by Name"]
        );

        harness.ui.choose("members", ListOp::Sort);
        harness.render(&mut instance);
        assert_eq!(names(&instance), vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_drops_append_or_reject() {
        let mut harness = expanded_harness();
        let mut instance = squad();
        let path = FieldPath::parse("members");

        let rejected = FrameInput {
            pointer: Vec::new(),
            drops: vec![ExternalDrop {
                instance: instance.id,
                path: path.clone(),
                objects: vec![ObjectRef::new(90, "Image", "splash")],
            }],
        };
        harness.render_with(&mut instance, &rejected);
        assert!(harness.ui.find("members").is_some());
        assert!(harness.ui.calls.iter().any(|c| matches!(c, DrawCall::DropRejected { .. })));
        assert!(harness.history.is_empty());
        assert!(harness.sink.entries.is_empty());

        let accepted = FrameInput {
            pointer: Vec::new(),
            drops: vec![ExternalDrop { instance: instance.id, path, objects: vec![ObjectRef::new(6, "Unit", "F")] }],
        };
        harness.render_with(&mut instance, &accepted);
        assert_eq!(names(&instance).last().map(String::as_str), Some("F"));
        assert_eq!(harness.history.len(), 1);
    }

    #[test]
    fn test_custom_renderer_replaces_default_drawing() {
        let mut registry = TypeRegistry::default();
        registry.register(
            TypeSchema::build("Light")
                .field("intensity", FieldType::Float)
                .attr(MetaAttribute::CustomRenderer("slider".into()))
                .attr(MetaAttribute::Max(Bound::Const(1.0)))
                .field("hue", FieldType::Float)
                .attr(MetaAttribute::CustomRenderer("wheel".into()))
                .finish(),
        );
        let mut instance = Instance::new("Light", registry.instantiate("Light").unwrap());
        let mut harness = Harness::new(registry);
        harness.inspector.register_renderer(
            "slider",
            |ui: &mut dyn Widgets, id: &str, label: &str, value: &Value, _enabled: bool| {
                ui.read_only_field(id, label, value);
                Some(Value::Float(5.0))
            },
        );

        harness.render(&mut instance);

        // custom renderers own the value: no clamp afterwards
        assert_eq!(instance.object.get("intensity"), Some(&Value::Float(5.0)));
        assert!(matches!(harness.ui.find("intensity"), Some(DrawCall::ReadOnly { .. })));
        assert_eq!(harness.history.len(), 1);
        // unknown renderer: warning, default field
        assert!(matches!(harness.ui.find("hue"), Some(DrawCall::Field { .. })));
        assert!(harness.sink.contains("wheel"));
    }

    fn bump_hits(object: &mut Object, _: &[Value]) -> Option<Value> {
        let hits = object.get("hits").and_then(Value::as_f64).unwrap_or(0.0) as i64;
        object.set("hits", Value::Int(hits + 1));
        None
    }

    fn callback_harness() -> Harness {
        let mut registry = TypeRegistry::default();
        registry.register(
            TypeSchema::build("Bag")
                .field("items", FieldType::List(Box::new(FieldType::Int)))
                .attr(MetaAttribute::OnValueChanged("changed".into()))
                .field("hits", FieldType::Int)
                .method("changed", vec![], None, bump_hits)
                .finish(),
        );
        registry.register(TypeSchema::build("Gauge").field("level", FieldType::Int).finish());
        registry.register(
            TypeSchema::build("Holder")
                .field("gauge", FieldType::Object("Gauge".into()))
                .attr(MetaAttribute::OnValueChanged("changed".into()))
                .field("hits", FieldType::Int)
                .method("changed", vec![], None, bump_hits)
                .finish(),
        );
        let settings = InspectorSettings { expand_fields_by_default: true, ..Default::default() };
        Harness::with_settings(registry, settings)
    }

    fn ints(instance: &Instance) -> Vec<Value> {
        instance.object.get("items").and_then(Value::as_list).cloned().unwrap()
    }

    #[test]
    fn test_collection_changes_fire_change_callbacks() {
        let mut harness = callback_harness();
        let mut instance = Instance::new(
            "Bag",
            Object::new("Bag")
                .with("items", Value::List(vec![Value::Int(9), Value::Int(2)]))
                .with("hits", Value::Int(0)),
        );

        harness.ui.choose("items", ListOp::Add);
        harness.render(&mut instance);
        assert_eq!(ints(&instance), vec![Value::Int(9), Value::Int(2), Value::Int(0)]);
        assert_eq!(instance.object.get("hits"), Some(&Value::Int(1)));

        // element rows report to the collection field
        harness.ui.edit("items[1]", Value::Int(7));
        harness.render(&mut instance);
        assert_eq!(ints(&instance), vec![Value::Int(9), Value::Int(7), Value::Int(0)]);
        assert_eq!(instance.object.get("hits"), Some(&Value::Int(2)));
        assert_eq!(harness.history.len(), 2);

        harness.history.undo(std::slice::from_mut(&mut instance)).unwrap();
        assert_eq!(ints(&instance), vec![Value::Int(9), Value::Int(2), Value::Int(0)]);
        assert_eq!(instance.object.get("hits"), Some(&Value::Int(1)));

        harness.history.undo(std::slice::from_mut(&mut instance)).unwrap();
        assert_eq!(ints(&instance), vec![Value::Int(9), Value::Int(2)]);
        assert_eq!(instance.object.get("hits"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_nested_edit_fires_callback_of_holding_field() {
        let mut harness = callback_harness();
        let registry = harness.inspector.registry().clone();
        let mut instance = Instance::new("Holder", registry.instantiate("Holder").unwrap());

        harness.ui.edit("gauge.level", Value::Int(4));
        harness.render(&mut instance);

        assert_eq!(instance.object.get_path(&FieldPath::parse("gauge.level")), Some(&Value::Int(4)));
        assert_eq!(instance.object.get("hits"), Some(&Value::Int(1)));

        // no edit, no callback
        harness.render(&mut instance);
        assert_eq!(instance.object.get("hits"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_grouped_custom_renderer_draws_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let mut registry = TypeRegistry::default();
        registry.register(
            TypeSchema::build("Panel")
                .field("gain", FieldType::Float)
                .attr(MetaAttribute::Foldout("Tuning".into()))
                .attr(MetaAttribute::CustomRenderer("knob".into()))
                .field("bias", FieldType::Float)
                .attr(MetaAttribute::Foldout("Tuning".into()))
                .attr(MetaAttribute::CustomRenderer("knob".into()))
                .finish(),
        );
        let mut instance = Instance::new("Panel", registry.instantiate("Panel").unwrap());
        let settings = InspectorSettings { expand_foldouts_by_default: true, ..Default::default() };
        let mut harness = Harness::with_settings(registry, settings);

        let drawn = Arc::new(AtomicUsize::new(0));
        let counter = drawn.clone();
        harness.inspector.register_renderer(
            "knob",
            move |ui: &mut dyn Widgets, id: &str, label: &str, value: &Value, _enabled: bool| {
                counter.fetch_add(1, Ordering::SeqCst);
                ui.read_only_field(id, label, value);
                None
            },
        );

        harness.render(&mut instance);

        assert_eq!(harness.ui.group_headers(), vec![("Tuning", 2)]);
        assert_eq!(drawn.load(Ordering::SeqCst), 2);
        assert_eq!(harness.ui.calls_for("gain").len(), 1);
        assert_eq!(harness.ui.calls_for("bias").len(), 1);
    }

    #[test]
    fn test_collapse_clears_selection_below() {
        let mut harness = expanded_harness();
        let mut instance = squad();
        harness.render(&mut instance);
        let rects = harness.ui.element_rects("members");
        harness.render_with(&mut instance, &FrameInput::pointer(press(rects[0].center(), Modifiers::NONE)));
        let key = ListKey::new(instance.id, FieldPath::parse("members"));
        assert!(!harness.inspector.state().collections.selection(&key).is_empty());

        harness.ui.toggle("members");
        harness.render(&mut instance);
        assert!(harness.inspector.state().collections.selection(&key).is_empty());
        assert!(harness.ui.element_rects("members").is_empty());
    }
}
