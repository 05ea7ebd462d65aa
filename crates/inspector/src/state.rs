//! Per-editor caches that outlive a render pass.
//!
//! Expansion flags live in the persisted [`PrefsStore`]; selection, layout
//! and the pointer slot live in the [`CollectionController`]. Everything is
//! keyed by `(InstanceId, FieldPath)` and evicted on structural change.

use gantry_common::diagnostics::Diagnostics;
use gantry_common::path::FieldPath;
use gantry_common::prefs::PrefsStore;
use gantry_common::settings::InspectorSettings;
use gantry_common::value::InstanceId;
use tracing::debug;

use crate::collection::CollectionController;

/// Prefs key for the expansion of a field
pub fn field_key(instance: InstanceId, path: &FieldPath) -> String {
    format!("{}/{}", instance, path)
}

/// Prefs key for the expansion of a foldout group
pub fn group_key(instance: InstanceId, container: &FieldPath, group: &str) -> String {
    format!("{}/{}#{}", instance, container, group)
}

pub struct InspectorState {
    pub prefs: Box<dyn PrefsStore>,
    pub diagnostics: Diagnostics,
    pub collections: CollectionController,
}

impl InspectorState {
    pub fn new(prefs: Box<dyn PrefsStore>, settings: &InspectorSettings) -> Self {
        Self {
            prefs,
            diagnostics: Diagnostics::default(),
            collections: CollectionController::new(settings.drag_threshold, settings.smart_selection),
        }
    }

    pub fn is_expanded(&self, key: &str, default: bool) -> bool {
        self.prefs.get_bool(key).unwrap_or(default)
    }

    pub fn set_expanded(&mut self, key: &str, expanded: bool) {
        self.prefs.set_bool(key, expanded);
    }

    /// A field collapsed: forget everything cached underneath it, keeping
    /// the field's own expansion flag
    pub fn collapse(&mut self, instance: InstanceId, path: &FieldPath) {
        debug!("Evicting caches under {}/{}", instance, path);
        self.collections.evict(|key| key.is_under(instance, path));
        let base = field_key(instance, path);
        for separator in [".", "[", "#"] {
            self.prefs.remove_prefix(&format!("{}{}", base, separator));
        }
    }

    /// Elements of a collection moved or vanished: positional caches below
    /// the collection are stale
    pub fn evict_elements(&mut self, instance: InstanceId, list: &FieldPath) {
        let depth = list.len();
        self.collections
            .evict(|key| key.is_under(instance, list) && key.path.len() > depth);
        self.prefs.remove_prefix(&format!("{}[", field_key(instance, list)));
    }

    /// The instance is gone; drop all of its state
    pub fn forget_instance(&mut self, instance: InstanceId) {
        self.collections.evict(|key| key.instance == instance);
        self.prefs.remove_prefix(&format!("{}/", instance));
        self.diagnostics.forget(instance);
    }

    /// The edited object set changed identity
    pub fn reset(&mut self) {
        self.collections.clear();
        self.diagnostics.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ListKey;
    use crate::widgets::Modifiers;
    use gantry_common::prefs::MemoryPrefs;

    fn state() -> InspectorState {
        InspectorState::new(Box::new(MemoryPrefs::default()), &InspectorSettings::default())
    }

    #[test]
    fn test_collapse_evicts_nested_state_only() {
        let mut state = state();
        let id = InstanceId::new();
        let squad = FieldPath::parse("squad");

        state.set_expanded(&field_key(id, &squad), true);
        state.set_expanded(&field_key(id, &FieldPath::parse("squad.leader")), true);
        state.set_expanded(&group_key(id, &squad, "Stats"), true);
        state.set_expanded(&field_key(id, &FieldPath::parse("squadron")), true);
        let members = ListKey::new(id, FieldPath::parse("squad.members"));
        state.collections.click(&members, 1, Modifiers::NONE);

        state.collapse(id, &squad);

        assert_eq!(state.prefs.get_bool(&field_key(id, &squad)), Some(true));
        assert_eq!(state.prefs.get_bool(&field_key(id, &FieldPath::parse("squad.leader"))), None);
        assert_eq!(state.prefs.get_bool(&group_key(id, &squad, "Stats")), None);
        assert_eq!(state.prefs.get_bool(&field_key(id, &FieldPath::parse("squadron"))), Some(true));
        assert!(state.collections.selection(&members).is_empty());
    }

    #[test]
    fn test_evict_elements_keeps_list_selection() {
        let mut state = state();
        let id = InstanceId::new();
        let list = ListKey::new(id, FieldPath::parse("items"));
        let nested = ListKey::new(id, FieldPath::parse("items[0].tags"));
        state.collections.click(&list, 0, Modifiers::TOGGLE);
        state.collections.click(&nested, 2, Modifiers::TOGGLE);
        state.set_expanded(&field_key(id, &FieldPath::parse("items[0]")), true);

        state.evict_elements(id, &list.path);

        assert!(!state.collections.selection(&list).is_empty());
        assert!(state.collections.selection(&nested).is_empty());
        assert_eq!(state.prefs.get_bool(&field_key(id, &FieldPath::parse("items[0]"))), None);
    }

    #[test]
    fn test_forget_instance() {
        let mut state = state();
        let gone = InstanceId::new();
        let kept = InstanceId::new();
        state.set_expanded(&field_key(gone, &FieldPath::parse("a")), true);
        state.set_expanded(&field_key(kept, &FieldPath::parse("a")), true);

        state.forget_instance(gone);
        assert_eq!(state.prefs.get_bool(&field_key(gone, &FieldPath::parse("a"))), None);
        assert_eq!(state.prefs.get_bool(&field_key(kept, &FieldPath::parse("a"))), Some(true));
    }
}
