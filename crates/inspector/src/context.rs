//! Per-pass render context threaded through every recursive render call.
//!
//! Carries the grouping suppression counters, the set of group resolutions
//! currently in progress, the recursion depth and the set of fields already
//! validated this pass.

use gantry_common::attributes::GroupKind;
use gantry_common::path::FieldPath;
use gantry_common::value::InstanceId;
use std::collections::HashSet;

/// Identity of one in-progress group resolution
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GuardKey {
    pub instance: InstanceId,
    pub path: FieldPath,
    pub kind: GroupKind,
}

/// Saved suppression counters, see [`RenderContext::reenable_grouping`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Suppression {
    foldout: u32,
    boxed: u32,
}

#[derive(Debug)]
pub struct RenderContext {
    depth: usize,
    max_depth: usize,
    suppression: Suppression,
    disabled: u32,
    active: HashSet<GuardKey>,
    validated: HashSet<(InstanceId, FieldPath)>,
}

impl RenderContext {
    pub fn new(max_depth: usize) -> Self {
        Self {
            depth: 0,
            max_depth,
            suppression: Suppression::default(),
            disabled: 0,
            active: HashSet::new(),
            validated: HashSet::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Descend one level. Returns false (without descending) past the bound.
    pub fn enter(&mut self) -> bool {
        if self.depth >= self.max_depth {
            return false;
        }
        self.depth += 1;
        true
    }

    pub fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn is_suppressed(&self, kind: GroupKind) -> bool {
        match kind {
            GroupKind::Foldout => self.suppression.foldout > 0,
            GroupKind::Box => self.suppression.boxed > 0,
        }
    }

    pub fn suppress(&mut self, kind: GroupKind) {
        match kind {
            GroupKind::Foldout => self.suppression.foldout += 1,
            GroupKind::Box => self.suppression.boxed += 1,
        }
    }

    pub fn release(&mut self, kind: GroupKind) {
        match kind {
            GroupKind::Foldout => self.suppression.foldout = self.suppression.foldout.saturating_sub(1),
            GroupKind::Box => self.suppression.boxed = self.suppression.boxed.saturating_sub(1),
        }
    }

    /// Clear suppression for a child level; hand the result to
    /// [`RenderContext::restore_grouping`] afterwards
    pub fn reenable_grouping(&mut self) -> Suppression {
        std::mem::take(&mut self.suppression)
    }

    pub fn restore_grouping(&mut self, saved: Suppression) {
        self.suppression = saved;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled > 0
    }

    pub fn push_disabled(&mut self) {
        self.disabled += 1;
    }

    pub fn pop_disabled(&mut self) {
        self.disabled = self.disabled.saturating_sub(1);
    }

    /// Mark a group resolution as in progress. False if it already is.
    pub fn try_activate(&mut self, key: GuardKey) -> bool {
        self.active.insert(key)
    }

    pub fn deactivate(&mut self, key: &GuardKey) {
        self.active.remove(key);
    }

    /// First call for a field this pass returns true
    pub fn mark_validated(&mut self, instance: InstanceId, path: &FieldPath) -> bool {
        self.validated.insert((instance, path.clone()))
    }
}
