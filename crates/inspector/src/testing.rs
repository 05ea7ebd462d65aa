//! Recording widget backend and a small harness for driving render passes
//! without a real UI toolkit.
//!
//! [`RecordingUi`] logs every widget call as a [`DrawCall`] and answers user
//! interaction from one-shot scripts keyed by id suffix, so `"health"`
//! matches `"<instance>/health"` and `"stats.health"` matches
//! `"<instance>/stats.health"`.

use bevy::math::Rect;
use gantry_common::assets::MemoryAssets;
use gantry_common::diagnostics::{CollectingSink, Severity};
use gantry_common::history::CommandHistory;
use gantry_common::prefs::MemoryPrefs;
use gantry_common::schema::TypeRegistry;
use gantry_common::settings::InspectorSettings;
use gantry_common::value::{Instance, Value};
use std::sync::Arc;

use crate::renderer::Renderer;
use crate::widgets::{FrameInput, ListOp, MenuEntry, Widgets};
use crate::{Inspector, RenderEnv};

pub const ROW_HEIGHT: f32 = 20.0;
pub const ROW_WIDTH: f32 = 300.0;

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCall {
    Field { id: String, label: String, value: Value, enabled: bool },
    ReadOnly { id: String, label: String, value: Value },
    Foldout { id: String, label: String, expanded: bool, enabled: bool },
    GroupHeader { id: String, label: String, count: usize, expanded: bool },
    BeginBox { id: String, label: String },
    EndBox,
    Button { id: String, label: String, enabled: bool },
    ListHeader { id: String, label: String, len: usize, expanded: bool },
    ListElement { id: String, index: usize, selected: bool, rect: Rect },
    InsertionMarker { id: String, index: usize },
    Menu { id: String, entries: Vec<MenuEntry> },
    DropRejected { id: String },
    Message { id: String, text: String, severity: Severity },
}

impl DrawCall {
    pub fn id(&self) -> Option<&str> {
        match self {
            DrawCall::Field { id, .. }
            | DrawCall::ReadOnly { id, .. }
            | DrawCall::Foldout { id, .. }
            | DrawCall::GroupHeader { id, .. }
            | DrawCall::BeginBox { id, .. }
            | DrawCall::Button { id, .. }
            | DrawCall::ListHeader { id, .. }
            | DrawCall::ListElement { id, .. }
            | DrawCall::InsertionMarker { id, .. }
            | DrawCall::Menu { id, .. }
            | DrawCall::DropRejected { id }
            | DrawCall::Message { id, .. } => Some(id),
            DrawCall::EndBox => None,
        }
    }
}

/// True if `id` is `suffix` or ends with `/suffix`
fn matches(id: &str, suffix: &str) -> bool {
    id.strip_suffix(suffix).is_some_and(|rest| rest.is_empty() || rest.ends_with('/'))
}

/// Take the first scripted entry for `id`
fn take<T>(script: &mut Vec<(String, T)>, id: &str) -> Option<T> {
    let position = script.iter().position(|(suffix, _)| matches(id, suffix))?;
    Some(script.remove(position).1)
}

#[derive(Default, Debug)]
pub struct RecordingUi {
    pub calls: Vec<DrawCall>,
    edits: Vec<(String, Value)>,
    toggles: Vec<(String, ())>,
    clicks: Vec<(String, ())>,
    choices: Vec<(String, ListOp)>,
    cursor: f32,
    depth: i32,
}

impl RecordingUi {
    /// The next `value_field` for `suffix` reports `value` as the user's edit
    pub fn edit(&mut self, suffix: &str, value: Value) {
        self.edits.push((suffix.to_string(), value));
    }

    /// The next header or foldout for `suffix` flips its expansion
    pub fn toggle(&mut self, suffix: &str) {
        self.toggles.push((suffix.to_string(), ()));
    }

    /// The next button for `suffix` reports a click
    pub fn click(&mut self, suffix: &str) {
        self.clicks.push((suffix.to_string(), ()));
    }

    /// The next menu for `suffix` returns `op`
    pub fn choose(&mut self, suffix: &str, op: ListOp) {
        self.choices.push((suffix.to_string(), op));
    }

    /// Forget the previous frame's calls; pending scripts are kept
    pub fn begin_frame(&mut self) {
        self.calls.clear();
        self.cursor = 0.0;
        self.depth = 0;
    }

    pub fn find(&self, suffix: &str) -> Option<&DrawCall> {
        self.calls.iter().find(|c| c.id().is_some_and(|id| matches(id, suffix)))
    }

    pub fn calls_for(&self, suffix: &str) -> Vec<&DrawCall> {
        self.calls.iter().filter(|c| c.id().is_some_and(|id| matches(id, suffix))).collect()
    }

    /// Labels of editable and read-only fields, in draw order
    pub fn field_labels(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Field { label, .. } | DrawCall::ReadOnly { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn group_headers(&self) -> Vec<(&str, usize)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::GroupHeader { label, count, .. } => Some((label.as_str(), *count)),
                _ => None,
            })
            .collect()
    }

    /// Rows drawn for the elements of the collection at `suffix`
    pub fn element_rects(&self, suffix: &str) -> Vec<Rect> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::ListElement { id, rect, .. } if matches(id, suffix) => Some(*rect),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self, severity: Severity) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Message { text, severity: s, .. } if *s == severity => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn row(&mut self) -> Rect {
        let left = self.depth as f32 * ROW_HEIGHT;
        let rect = Rect::new(left, self.cursor, ROW_WIDTH, self.cursor + ROW_HEIGHT);
        self.cursor += ROW_HEIGHT;
        rect
    }

    fn toggled(&mut self, id: &str, expanded: bool) -> bool {
        match take(&mut self.toggles, id) {
            Some(()) => !expanded,
            None => expanded,
        }
    }
}

impl Widgets for RecordingUi {
    fn value_field(&mut self, id: &str, label: &str, value: &Value, enabled: bool) -> Option<Value> {
        self.row();
        self.calls.push(DrawCall::Field {
            id: id.to_string(),
            label: label.to_string(),
            value: value.clone(),
            enabled,
        });
        take(&mut self.edits, id)
    }

    fn read_only_field(&mut self, id: &str, label: &str, value: &Value) {
        self.row();
        self.calls.push(DrawCall::ReadOnly { id: id.to_string(), label: label.to_string(), value: value.clone() });
    }

    fn foldout(&mut self, id: &str, label: &str, expanded: bool, enabled: bool) -> bool {
        self.row();
        self.calls.push(DrawCall::Foldout { id: id.to_string(), label: label.to_string(), expanded, enabled });
        self.toggled(id, expanded)
    }

    fn group_header(&mut self, id: &str, label: &str, member_count: usize, expanded: bool) -> bool {
        self.row();
        self.calls.push(DrawCall::GroupHeader {
            id: id.to_string(),
            label: label.to_string(),
            count: member_count,
            expanded,
        });
        self.toggled(id, expanded)
    }

    fn begin_box(&mut self, id: &str, label: &str) {
        self.row();
        self.calls.push(DrawCall::BeginBox { id: id.to_string(), label: label.to_string() });
    }

    fn end_box(&mut self) {
        self.calls.push(DrawCall::EndBox);
    }

    fn indent(&mut self, delta: i32) {
        self.depth += delta;
    }

    fn button(&mut self, id: &str, label: &str, enabled: bool) -> bool {
        self.row();
        self.calls.push(DrawCall::Button { id: id.to_string(), label: label.to_string(), enabled });
        take(&mut self.clicks, id).is_some()
    }

    fn list_header(&mut self, id: &str, label: &str, len: usize, expanded: bool) -> bool {
        self.row();
        self.calls.push(DrawCall::ListHeader { id: id.to_string(), label: label.to_string(), len, expanded });
        self.toggled(id, expanded)
    }

    fn list_element(&mut self, id: &str, index: usize, selected: bool) -> Rect {
        let rect = self.row();
        self.calls.push(DrawCall::ListElement { id: id.to_string(), index, selected, rect });
        rect
    }

    fn insertion_marker(&mut self, id: &str, index: usize) {
        self.calls.push(DrawCall::InsertionMarker { id: id.to_string(), index });
    }

    fn list_menu(&mut self, id: &str, entries: &[MenuEntry]) -> Option<ListOp> {
        self.calls.push(DrawCall::Menu { id: id.to_string(), entries: entries.to_vec() });
        take(&mut self.choices, id)
    }

    fn drop_rejected(&mut self, id: &str) {
        self.calls.push(DrawCall::DropRejected { id: id.to_string() });
    }

    fn message(&mut self, id: &str, text: &str, severity: Severity) {
        self.calls.push(DrawCall::Message { id: id.to_string(), text: text.to_string(), severity });
    }
}

/// An inspector wired to in-memory collaborators
pub struct Harness {
    pub inspector: Inspector,
    pub ui: RecordingUi,
    pub history: CommandHistory,
    pub sink: CollectingSink,
    pub assets: MemoryAssets,
}

impl Harness {
    pub fn new(registry: TypeRegistry) -> Self {
        Self::with_settings(registry, InspectorSettings::default())
    }

    pub fn with_settings(registry: TypeRegistry, settings: InspectorSettings) -> Self {
        let history = settings.command_history();
        Self {
            inspector: Inspector::new(Arc::new(registry), settings, Box::new(MemoryPrefs::default())),
            ui: RecordingUi::default(),
            history,
            sink: CollectingSink::default(),
            assets: MemoryAssets::default(),
        }
    }

    /// One full pass over `instance` with no pointer input
    pub fn render(&mut self, instance: &mut Instance) {
        self.render_with(instance, &FrameInput::default());
    }

    pub fn render_with(&mut self, instance: &mut Instance, input: &FrameInput) {
        self.ui.begin_frame();
        let env = RenderEnv {
            ui: &mut self.ui,
            undo: &mut self.history,
            sink: &mut self.sink,
            assets: &self.assets,
            input,
        };
        self.inspector.render_instance(instance, env);
    }

    /// A renderer over `instance` for driving single nodes by hand
    pub fn renderer<'a>(&'a mut self, instance: &'a mut Instance, input: &'a FrameInput) -> Renderer<'a> {
        self.ui.begin_frame();
        Renderer {
            registry: &self.inspector.registry,
            settings: &self.inspector.settings,
            renderers: &self.inspector.renderers,
            state: &mut self.inspector.state,
            ui: &mut self.ui,
            undo: &mut self.history,
            sink: &mut self.sink,
            assets: &self.assets,
            input,
            instance,
        }
    }
}
