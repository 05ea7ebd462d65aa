//! Widget and input boundary between the inspector and the host UI toolkit.
//!
//! The inspector never paints anything itself: it calls one [`Widgets`]
//! method per control, in render order, and reads pointer input from a
//! toolkit-neutral [`FrameInput`].

use bevy::math::{Rect, Vec2};
use gantry_common::diagnostics::Severity;
use gantry_common::path::FieldPath;
use gantry_common::value::{InstanceId, ObjectRef, Value};

/// Modifier keys held during a pointer press
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Toggle membership of the clicked element (ctrl / cmd)
    pub toggle: bool,
    /// Extend selection to a range (shift)
    pub range: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { toggle: false, range: false };
    pub const TOGGLE: Modifiers = Modifiers { toggle: true, range: false };
    pub const RANGE: Modifiers = Modifiers { toggle: false, range: true };

    pub fn any(&self) -> bool {
        self.toggle || self.range
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PointerEvent {
    Down { position: Vec2, modifiers: Modifiers },
    Move { position: Vec2 },
    Up { position: Vec2 },
    /// Pointer left the inspector surface
    Leave,
}

/// Objects dragged in from outside and released over a collection
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalDrop {
    pub instance: InstanceId,
    pub path: FieldPath,
    pub objects: Vec<ObjectRef>,
}

/// Input gathered by the host for one redraw
#[derive(Clone, Debug, Default)]
pub struct FrameInput {
    pub pointer: Vec<PointerEvent>,
    pub drops: Vec<ExternalDrop>,
}

impl FrameInput {
    pub fn pointer(events: Vec<PointerEvent>) -> Self {
        Self { pointer: events, drops: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.pointer.is_empty() && self.drops.is_empty()
    }
}

/// Context operations offered on a collection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListOp {
    Add,
    Delete,
    Duplicate,
    Clear,
    RemoveNulls,
    RemoveDuplicates,
    Reverse,
    Sort,
}

/// One entry of a collection context menu
#[derive(Clone, Debug, PartialEq)]
pub struct MenuEntry {
    pub op: ListOp,
    pub label: String,
}

impl MenuEntry {
    pub fn new(op: ListOp, label: impl Into<String>) -> Self {
        Self { op, label: label.into() }
    }
}

/// Host widget library. `id` is stable across frames for the same control.
pub trait Widgets {
    /// Editable control for a value; returns the new value when the user changed it
    fn value_field(&mut self, id: &str, label: &str, value: &Value, enabled: bool) -> Option<Value>;

    fn read_only_field(&mut self, id: &str, label: &str, value: &Value);

    /// Header of a composite field; returns the expansion after user input
    fn foldout(&mut self, id: &str, label: &str, expanded: bool, enabled: bool) -> bool;

    /// Header of a collapsible group; returns the expansion after user input
    fn group_header(&mut self, id: &str, label: &str, member_count: usize, expanded: bool) -> bool;

    fn begin_box(&mut self, id: &str, label: &str);

    fn end_box(&mut self);

    fn indent(&mut self, delta: i32);

    /// Returns true when clicked
    fn button(&mut self, id: &str, label: &str, enabled: bool) -> bool;

    /// Header of a collection; returns the expansion after user input
    fn list_header(&mut self, id: &str, label: &str, len: usize, expanded: bool) -> bool;

    /// Chrome for one element row; returns the row bounds used for hit testing
    fn list_element(&mut self, id: &str, index: usize, selected: bool) -> Rect;

    fn insertion_marker(&mut self, id: &str, index: usize);

    /// Context menu; returns the chosen operation
    fn list_menu(&mut self, id: &str, entries: &[MenuEntry]) -> Option<ListOp>;

    /// Visual state for a drop that was refused
    fn drop_rejected(&mut self, id: &str);

    /// Inline message under a field
    fn message(&mut self, id: &str, text: &str, severity: Severity);
}
