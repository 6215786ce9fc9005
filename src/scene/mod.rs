//! Scene graph
//!
//! Owns the spatial hierarchy and the entities attached to it:
//! - Node: tree node with a transform and renderable attachments
//! - Transform: TRS with cached matrices and a dirty flag
//! - Scene: the container, draw-list builder and frame driver
//! - Camera: view and projection used for MVP
//! - PointLight: light component attached to nodes
//! - transform_system: hierarchy update free functions

pub mod camera;
pub mod light;
pub mod node;
pub mod scene;
pub mod transform;
pub mod transform_system;

pub use camera::Camera;
pub use light::{Attenuation, PointLight};
pub use node::{Node, Renderable, RenderableKind};
pub use scene::Scene;
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct MeshKey;
    pub struct LightKey;
}
