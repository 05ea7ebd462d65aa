//! Host asset database interface used for smart drop conversions.

use std::collections::HashMap;

use crate::value::ObjectRef;

pub const IMAGE_KIND: &str = "Image";
pub const SPRITE_KIND: &str = "Sprite";
pub const SCENE_NODE_KIND: &str = "SceneNode";
pub const TRANSFORM_KIND: &str = "Transform";

/// Lookups the inspector needs from the host's asset/scene database
pub trait AssetDatabase {
    /// Cropped-region assets generated from an image
    fn sprites_of(&self, image: &ObjectRef) -> Vec<ObjectRef>;
    /// Spatial frame of a scene node
    fn transform_of(&self, node: &ObjectRef) -> Option<ObjectRef>;
    /// Components attached to a scene node
    fn components_of(&self, node: &ObjectRef) -> Vec<ObjectRef>;
}

/// Database with no associations
#[derive(Default)]
pub struct NoAssets;

impl AssetDatabase for NoAssets {
    fn sprites_of(&self, _image: &ObjectRef) -> Vec<ObjectRef> {
        Vec::new()
    }

    fn transform_of(&self, _node: &ObjectRef) -> Option<ObjectRef> {
        None
    }

    fn components_of(&self, _node: &ObjectRef) -> Vec<ObjectRef> {
        Vec::new()
    }
}

/// In-memory associations keyed by object id
#[derive(Default, Debug)]
pub struct MemoryAssets {
    pub sprites: HashMap<u64, Vec<ObjectRef>>,
    pub transforms: HashMap<u64, ObjectRef>,
    pub components: HashMap<u64, Vec<ObjectRef>>,
}

impl AssetDatabase for MemoryAssets {
    fn sprites_of(&self, image: &ObjectRef) -> Vec<ObjectRef> {
        self.sprites.get(&image.id).cloned().unwrap_or_default()
    }

    fn transform_of(&self, node: &ObjectRef) -> Option<ObjectRef> {
        self.transforms.get(&node.id).cloned()
    }

    fn components_of(&self, node: &ObjectRef) -> Vec<ObjectRef> {
        self.components.get(&node.id).cloned().unwrap_or_default()
    }
}
