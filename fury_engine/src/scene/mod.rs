//! Scene management module
//!
//! Provides the entity tree, attachments and capabilities, bounding
//! volumes, and the spatial indices queried by render passes.

mod aabb;
mod attachment;
mod octree_scene_index;
mod query_volume;
mod scene;
mod scene_index;

pub use aabb::AABB;
pub use attachment::{
    AssetId, Attachment, AttachmentKind, Capabilities, CapabilityTable,
    LightDesc, LightType, MaterialLayer, MeshAttachment,
};
pub use octree_scene_index::{OctreeQuery, OctreeSceneIndex};
pub use query_volume::{Containment, QueryVolume, Sphere};
pub use scene::{EntityKey, Scene, SceneEntity, SyncStats};
pub use scene_index::{LinearSceneIndex, SceneIndex};
