//! # Gantry Common
//!
//! Data model and leaf services shared by the inspector: values and paths,
//! type schemas with their meta-attributes, the reflection accessor, undo
//! history, diagnostics, persisted preferences and settings.

pub mod assets;
pub mod attributes;
pub mod diagnostics;
pub mod error;
pub mod history;
pub mod path;
pub mod prefs;
pub mod reflect;
pub mod schema;
pub mod settings;
pub mod value;

pub use error::{InspectorError, Result};

pub mod prelude {
    pub use crate::assets::{AssetDatabase, MemoryAssets, NoAssets};
    pub use crate::attributes::{AttributeSet, Bound, Condition, ConditionOp, GroupKind, MetaAttribute};
    pub use crate::diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, Diagnostics, LogSink, Severity};
    pub use crate::error::InspectorError;
    pub use crate::history::{Command, CommandHistory, PropertyCommand, UndoLog};
    pub use crate::path::{FieldPath, PathSegment};
    pub use crate::prefs::{JsonPrefs, MemoryPrefs, PrefsStore};
    pub use crate::schema::{EnumDescriptor, MemberDescriptor, MemberKind, RenderSchema, TypeRegistry, TypeSchema};
    pub use crate::settings::InspectorSettings;
    pub use crate::value::{EnumValue, FieldType, Instance, InstanceId, Object, ObjectRef, Value, ANY_ASSET_KIND};
}
