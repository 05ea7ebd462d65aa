//! Selection and pointer state machine for collection fields.
//!
//! `Idle -> Pressed -> Dragging -> Idle`. One pointer slot is shared by every
//! collection, so at most one collection is ever mid-drag.

use bevy::math::{Rect, Vec2};
use gantry_common::value::{FieldType, Value};
use std::collections::HashMap;
use tracing::debug;

use super::ops::Selection;
use super::ListKey;
use crate::widgets::{Modifiers, PointerEvent};

/// The global pointer slot
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PointerState {
    #[default]
    Idle,
    /// Pointer went down on an element and has not travelled far enough to drag
    Pressed {
        key: ListKey,
        index: usize,
        origin: Vec2,
        modifiers: Modifiers,
        /// Element was selected before this press
        was_selected: bool,
    },
    Dragging {
        key: ListKey,
        /// Indices captured at drag start, ascending
        dragged: Vec<usize>,
        insertion: usize,
    },
}

impl PointerState {
    pub fn owner(&self) -> Option<&ListKey> {
        match self {
            PointerState::Idle => None,
            PointerState::Pressed { key, .. } | PointerState::Dragging { key, .. } => Some(key),
        }
    }
}

/// What the renderer must apply after a batch of pointer events
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PointerOutcome {
    None,
    Reorder { dragged: Vec<usize>, insertion: usize },
}

#[derive(Debug)]
pub struct CollectionController {
    selections: HashMap<ListKey, Selection>,
    layouts: HashMap<ListKey, Vec<Rect>>,
    pointer: PointerState,
    drag_threshold: f32,
    smart_selection: bool,
}

impl CollectionController {
    pub fn new(drag_threshold: f32, smart_selection: bool) -> Self {
        Self {
            selections: HashMap::new(),
            layouts: HashMap::new(),
            pointer: PointerState::Idle,
            drag_threshold,
            smart_selection,
        }
    }

    /// Apply changed settings; interaction state is kept
    pub fn configure(&mut self, drag_threshold: f32, smart_selection: bool) {
        self.drag_threshold = drag_threshold;
        self.smart_selection = smart_selection;
    }

    pub fn selection(&self, key: &ListKey) -> Selection {
        self.selections.get(key).cloned().unwrap_or_default()
    }

    pub fn is_selected(&self, key: &ListKey, index: usize) -> bool {
        self.selections.get(key).is_some_and(|s| s.contains(&index))
    }

    pub fn set_selection(&mut self, key: &ListKey, selection: Selection) {
        if selection.is_empty() {
            self.selections.remove(key);
        } else {
            self.selections.insert(key.clone(), selection);
        }
    }

    /// Collections holding a selection
    pub fn selected_keys(&self) -> impl Iterator<Item = &ListKey> {
        self.selections.keys()
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    /// Live insertion index if `key` is being dragged
    pub fn insertion(&self, key: &ListKey) -> Option<usize> {
        match &self.pointer {
            PointerState::Dragging { key: owner, insertion, .. } if owner == key => Some(*insertion),
            _ => None,
        }
    }

    /// Element bounds drawn this frame
    pub fn set_layout(&mut self, key: &ListKey, rects: Vec<Rect>) {
        self.layouts.insert(key.clone(), rects);
    }

    pub fn layout(&self, key: &ListKey) -> &[Rect] {
        self.layouts.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Selection update for a click on `index`
    pub fn click(&mut self, key: &ListKey, index: usize, modifiers: Modifiers) {
        if !modifiers.any() {
            self.selections.retain(|k, _| k == key);
        }
        let selection = self.selections.entry(key.clone()).or_default();

        if modifiers.toggle {
            if !selection.remove(&index) {
                selection.insert(index);
            }
        } else if modifiers.range {
            match selection.iter().next_back().copied() {
                Some(anchor) => selection.extend(anchor.min(index)..=anchor.max(index)),
                None => {
                    selection.insert(index);
                }
            }
        } else {
            selection.clear();
            selection.insert(index);
        }

        if selection.is_empty() {
            self.selections.remove(key);
        }
    }

    /// Abandon any press or drag without mutating anything
    pub fn cancel(&mut self) {
        if self.pointer != PointerState::Idle {
            debug!("Collection drag cancelled");
        }
        self.pointer = PointerState::Idle;
    }

    /// Feed this frame's pointer events to the collection `key`.
    /// `elements` is the current content, used for smart selection.
    pub fn handle(
        &mut self,
        key: &ListKey,
        events: &[PointerEvent],
        elements: &[Value],
        element_type: &FieldType,
    ) -> PointerOutcome {
        let mut outcome = PointerOutcome::None;
        for event in events {
            if let Some(reorder) = self.handle_one(key, event, elements, element_type) {
                outcome = reorder;
            }
        }
        outcome
    }

    fn owns_pointer(&self, key: &ListKey) -> bool {
        self.pointer.owner() == Some(key)
    }

    fn handle_one(
        &mut self,
        key: &ListKey,
        event: &PointerEvent,
        elements: &[Value],
        element_type: &FieldType,
    ) -> Option<PointerOutcome> {
        match event {
            PointerEvent::Down { position, modifiers } => {
                let Some(index) = hit_test(self.layout(key), *position) else {
                    if self.owns_pointer(key) {
                        self.cancel();
                    }
                    return None;
                };
                let was_selected = self.is_selected(key, index);
                // a plain press on a selected element may start dragging the
                // whole selection; the click itself waits for release
                if !(was_selected && !modifiers.any()) {
                    self.click(key, index, *modifiers);
                }
                self.pointer = PointerState::Pressed {
                    key: key.clone(),
                    index,
                    origin: *position,
                    modifiers: *modifiers,
                    was_selected,
                };
                None
            }
            PointerEvent::Move { position } => {
                if !self.owns_pointer(key) {
                    return None;
                }
                let live = insertion_index(self.layout(key), *position);
                let mut start = None;
                match &mut self.pointer {
                    PointerState::Dragging { insertion, .. } => *insertion = live,
                    PointerState::Pressed { index, origin, modifiers, was_selected, .. } => {
                        if position.distance(*origin) > self.drag_threshold {
                            start = Some((*index, *modifiers, *was_selected));
                        }
                    }
                    PointerState::Idle => {}
                }
                if let Some((index, modifiers, was_selected)) = start {
                    self.start_drag(key, index, modifiers, was_selected, *position, elements, element_type);
                }
                None
            }
            PointerEvent::Up { position } => {
                if !self.owns_pointer(key) {
                    return None;
                }
                match std::mem::take(&mut self.pointer) {
                    PointerState::Pressed { index, modifiers, was_selected, .. } => {
                        if was_selected && !modifiers.any() {
                            self.click(key, index, Modifiers::NONE);
                        }
                        None
                    }
                    PointerState::Dragging { dragged, .. } => {
                        let insertion = insertion_index(self.layout(key), *position);
                        debug!("Drop on {} at {} ({} elements)", key, insertion, dragged.len());
                        Some(PointerOutcome::Reorder { dragged, insertion })
                    }
                    PointerState::Idle => None,
                }
            }
            PointerEvent::Leave => {
                if self.owns_pointer(key) {
                    self.cancel();
                }
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn start_drag(
        &mut self,
        key: &ListKey,
        index: usize,
        modifiers: Modifiers,
        was_selected: bool,
        position: Vec2,
        elements: &[Value],
        element_type: &FieldType,
    ) {
        let dragged: Selection = if !was_selected && !modifiers.any() {
            let smart = if self.smart_selection && element_type.is_reference() {
                smart_selection(elements, index)
            } else {
                Selection::from([index])
            };
            let chosen = if smart.len() > 1 { smart } else { Selection::from([index]) };
            self.set_selection(key, chosen.clone());
            chosen
        } else if self.is_selected(key, index) {
            self.selection(key)
        } else {
            Selection::from([index])
        };

        let insertion = insertion_index(self.layout(key), position);
        debug!("Drag started on {} with {:?}", key, dragged);
        self.pointer = PointerState::Dragging {
            key: key.clone(),
            dragged: dragged.into_iter().collect(),
            insertion,
        };
    }

    /// Drop cached state for every collection matching `evict`
    pub fn evict<F>(&mut self, evict: F)
    where
        F: Fn(&ListKey) -> bool,
    {
        self.selections.retain(|k, _| !evict(k));
        self.layouts.retain(|k, _| !evict(k));
        if self.pointer.owner().is_some_and(&evict) {
            self.cancel();
        }
    }

    pub fn clear(&mut self) {
        self.selections.clear();
        self.layouts.clear();
        self.pointer = PointerState::Idle;
    }
}

fn hit_test(rects: &[Rect], position: Vec2) -> Option<usize> {
    rects.iter().position(|r| r.contains(position))
}

/// Insertion index for a pointer at `position`: before the first element
/// whose vertical midpoint lies below the pointer, else at the end
pub fn insertion_index(rects: &[Rect], position: Vec2) -> usize {
    rects
        .iter()
        .position(|r| position.y < r.center().y)
        .unwrap_or(rects.len())
}

/// Elements that count as the same kind for smart selection
pub fn similar(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Reference(a), Value::Reference(b)) => match (a, b) {
            (Some(a), Some(b)) => a.kind == b.kind,
            (None, None) => true,
            _ => false,
        },
        (Value::Object(a), Value::Object(b)) => a.type_name == b.type_name,
        (Value::Enum(a), Value::Enum(b)) => a.type_name == b.type_name,
        _ => std::mem::discriminant(a) == std::mem::discriminant(b),
    }
}

/// Run of similar neighbours around `index`
pub fn smart_selection(elements: &[Value], index: usize) -> Selection {
    let Some(pressed) = elements.get(index) else {
        return Selection::new();
    };
    let mut start = index;
    while start > 0 && similar(&elements[start - 1], pressed) {
        start -= 1;
    }
    let mut end = index;
    while end + 1 < elements.len() && similar(&elements[end + 1], pressed) {
        end += 1;
    }
    (start..=end).collect()
}
