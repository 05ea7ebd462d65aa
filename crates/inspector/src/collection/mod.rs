//! Reorderable collection controller.
//!
//! Interaction state (selection, element layout, the pointer state machine)
//! lives in [`CollectionController`]; the structural edits it triggers are
//! plain functions over a `Vec<Value>` in [`ops`] and [`drop`].

pub mod controller;
pub mod drop;
pub mod ops;

use gantry_common::path::FieldPath;
use gantry_common::value::InstanceId;
use std::fmt;

pub use controller::{CollectionController, PointerOutcome, PointerState};
pub use ops::SortStrategy;

/// Identity of one collection field
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListKey {
    pub instance: InstanceId,
    pub path: FieldPath,
}

impl ListKey {
    pub fn new(instance: InstanceId, path: FieldPath) -> Self {
        Self { instance, path }
    }

    /// True if this collection is `path` itself or nested under it
    pub fn is_under(&self, instance: InstanceId, path: &FieldPath) -> bool {
        self.instance == instance && self.path.starts_with(path)
    }
}

impl fmt::Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.instance, self.path)
    }
}
