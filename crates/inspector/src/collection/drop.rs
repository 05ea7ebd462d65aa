//! Acceptance of objects dragged onto a collection from outside.

use gantry_common::assets::{AssetDatabase, IMAGE_KIND, SCENE_NODE_KIND, SPRITE_KIND, TRANSFORM_KIND};
use gantry_common::schema::TypeRegistry;
use gantry_common::value::{FieldType, ObjectRef, Value, ANY_ASSET_KIND};

/// Whether `incoming` can be stored as-is in a `kind` reference
pub fn is_assignable(registry: &TypeRegistry, kind: &str, incoming: &ObjectRef) -> bool {
    kind == ANY_ASSET_KIND || incoming.kind == kind || registry.is_assignable(&incoming.kind, kind)
}

/// The reference to store for `incoming` in a collection of `kind`, trying
/// direct assignment first and then the smart conversions
pub fn convert(
    registry: &TypeRegistry,
    assets: &dyn AssetDatabase,
    kind: &str,
    incoming: &ObjectRef,
) -> Option<ObjectRef> {
    if is_assignable(registry, kind, incoming) {
        return Some(incoming.clone());
    }

    match incoming.kind.as_str() {
        IMAGE_KIND if kind == SPRITE_KIND => single(assets.sprites_of(incoming)),
        SCENE_NODE_KIND if kind == TRANSFORM_KIND => assets.transform_of(incoming),
        SCENE_NODE_KIND => single(
            assets
                .components_of(incoming)
                .into_iter()
                .filter(|c| is_assignable(registry, kind, c))
                .collect(),
        ),
        _ => None,
    }
}

fn single(mut candidates: Vec<ObjectRef>) -> Option<ObjectRef> {
    if candidates.len() == 1 {
        candidates.pop()
    } else {
        None
    }
}

/// Append one element per convertible object, in presentation order.
/// Returns how many were appended; zero means the drop is rejected.
pub fn accept_drop(
    registry: &TypeRegistry,
    assets: &dyn AssetDatabase,
    element: &FieldType,
    items: &mut Vec<Value>,
    objects: &[ObjectRef],
) -> usize {
    let FieldType::Reference(kind) = element else {
        return 0;
    };
    let before = items.len();
    items.extend(
        objects
            .iter()
            .filter_map(|object| convert(registry, assets, kind, object))
            .map(|converted| Value::Reference(Some(converted))),
    );
    items.len() - before
}
