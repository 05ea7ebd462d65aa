//! # Gantry Inspector
//!
//! Attribute-driven property inspector. Walks a live object graph through the
//! [`TypeRegistry`], turns each member's meta-attributes into visibility,
//! enablement, grouping, validation and change callbacks, and drives the
//! host's widgets through the [`Widgets`] trait.
//!
//! ## Architecture
//! - [`resolver`]: visible / enabled / consumed-by-group per node, group chrome
//! - [`renderer`]: the recursive render pass, edits, undo recording
//! - [`collection`]: selection, drag-reorder and context operations on lists
//! - [`validators`] and [`conditions`]: attribute evaluation against live objects
//! - [`state`]: caches that outlive a pass, keyed by instance and path

pub mod collection;
pub mod conditions;
pub mod context;
pub mod renderer;
pub mod resolver;
pub mod state;
pub mod validators;
pub mod widgets;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use bevy::prelude::*;
use gantry_common::assets::AssetDatabase;
use gantry_common::diagnostics::DiagnosticSink;
use gantry_common::history::UndoLog;
use gantry_common::path::FieldPath;
use gantry_common::prefs::{JsonPrefs, MemoryPrefs, PrefsStore};
use gantry_common::reflect;
use gantry_common::schema::TypeRegistry;
use gantry_common::settings::InspectorSettings;
use gantry_common::value::{Instance, InstanceId, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub use context::RenderContext;
pub use renderer::{CustomRenderers, FieldNode, FieldRenderer, Renderer};
pub use resolver::Resolution;
pub use state::InspectorState;
pub use widgets::{ExternalDrop, FrameInput, ListOp, MenuEntry, Modifiers, PointerEvent, Widgets};

/// Host collaborators for one render call
pub struct RenderEnv<'a> {
    pub ui: &'a mut dyn Widgets,
    pub undo: &'a mut dyn UndoLog,
    pub sink: &'a mut dyn DiagnosticSink,
    pub assets: &'a dyn AssetDatabase,
    pub input: &'a FrameInput,
}

/// The inspector: type registry, settings, custom renderers and the caches
/// that persist between render passes
#[derive(Resource)]
pub struct Inspector {
    registry: Arc<TypeRegistry>,
    settings: InspectorSettings,
    renderers: CustomRenderers,
    state: InspectorState,
}

impl Inspector {
    pub fn new(registry: Arc<TypeRegistry>, settings: InspectorSettings, prefs: Box<dyn PrefsStore>) -> Self {
        let state = InspectorState::new(prefs, &settings);
        Self { registry, settings, renderers: CustomRenderers::new(), state }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &InspectorSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: InspectorSettings) {
        self.state.collections.configure(settings.drag_threshold, settings.smart_selection);
        self.settings = settings;
    }

    pub fn state(&self) -> &InspectorState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut InspectorState {
        &mut self.state
    }

    /// Make `renderer` available to `CustomRenderer(name)` attributes
    pub fn register_renderer(&mut self, name: impl Into<String>, renderer: impl FieldRenderer + 'static) {
        self.renderers.insert(name.into(), Arc::new(renderer));
    }

    /// Render every member of the instance's root object
    pub fn render_instance(&mut self, instance: &mut Instance, env: RenderEnv<'_>) {
        self.render_field(instance, &FieldPath::root(), true, env);
    }

    /// Render the field at `path`. The root path renders the root's members.
    pub fn render_field(
        &mut self,
        instance: &mut Instance,
        path: &FieldPath,
        include_children: bool,
        env: RenderEnv<'_>,
    ) {
        let mut ctx = RenderContext::new(self.settings.max_depth);

        let node = if path.is_root() {
            None
        } else {
            let member = reflect::member_at(&self.registry, &instance.object, path).cloned();
            let ty = reflect::field_type_at(&self.registry, &instance.object, path)
                .or_else(|| instance.object.get_path(path).map(Value::field_type));
            match ty {
                Some(ty) => Some(FieldNode { path: path.clone(), member, ty }),
                None => {
                    warn!("Nothing to render at {} on {}", path, instance.name);
                    return;
                }
            }
        };

        let RenderEnv { ui, undo, sink, assets, input } = env;
        let mut renderer = Renderer {
            registry: &self.registry,
            settings: &self.settings,
            renderers: &self.renderers,
            state: &mut self.state,
            ui,
            undo,
            sink,
            assets,
            input,
            instance,
        };
        match node {
            Some(node) => renderer.render(&mut ctx, &node, include_children),
            None => renderer.render_children(&mut ctx, path),
        }
    }

    /// The edited selection changed; drop interaction state and reported warnings
    pub fn reset_caches(&mut self) {
        debug!("Resetting inspector caches");
        self.state.reset();
    }

    /// The instance was destroyed
    pub fn forget_instance(&mut self, instance: InstanceId) {
        self.state.forget_instance(instance);
    }

    pub fn flush_prefs(&mut self) -> gantry_common::Result<()> {
        self.state.prefs.flush()
    }
}

/// Installs the inspector, its settings and an undo history
pub struct InspectorPlugin {
    registry: Arc<TypeRegistry>,
}

impl InspectorPlugin {
    pub fn new(registry: TypeRegistry) -> Self {
        Self { registry: Arc::new(registry) }
    }
}

impl Plugin for InspectorPlugin {
    fn build(&self, app: &mut App) {
        let settings = InspectorSettings::load();
        let prefs: Box<dyn PrefsStore> = match JsonPrefs::open_default() {
            Ok(prefs) => Box::new(prefs),
            Err(e) => {
                warn!("Inspector preferences unavailable ({}). Expansion state will not persist.", e);
                Box::new(MemoryPrefs::default())
            }
        };

        app.insert_resource(settings.command_history())
            .insert_resource(Inspector::new(self.registry.clone(), settings.clone(), prefs))
            .insert_resource(settings)
            .add_systems(Update, (apply_settings, auto_save_settings))
            .add_systems(Last, flush_prefs);
    }
}

/// Push edited settings into the inspector
fn apply_settings(settings: Res<InspectorSettings>, mut inspector: ResMut<Inspector>) {
    if settings.is_changed() && !settings.is_added() {
        inspector.set_settings(settings.clone());
    }
}

/// Auto-save settings when they change
fn auto_save_settings(settings: Res<InspectorSettings>) {
    if settings.is_changed() && !settings.is_added() {
        if let Err(e) = settings.save() {
            warn!("Failed to save inspector settings: {}", e);
        }
    }
}

fn flush_prefs(mut inspector: ResMut<Inspector>) {
    if let Err(e) = inspector.bypass_change_detection().flush_prefs() {
        warn!("Failed to save inspector preferences: {}", e);
    }
}
