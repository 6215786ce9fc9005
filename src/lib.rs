#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Scene graph, keyframe animation sampling and a multi-pass, material-sorted
//! draw pipeline.
//!
//! ```rust,ignore
//! use trellis::{HeadlessDevice, Material, MaterialType, Mesh, Scene, ShaderLibrary};
//!
//! let mut scene = Scene::new("demo");
//! let cube = scene.add_mesh(Mesh::cube("cube", Material::new(MaterialType::Specular)));
//! scene.build_node("Cube").with_mesh(cube).build();
//!
//! let mut device = HeadlessDevice::new();
//! scene.compile(&mut device)?;
//! let stats = scene.render(&mut device, &shaders)?;
//! ```

pub mod animation;
pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use animation::{Animation, AnimationManager, AnimationTrack, InterpolationMode, KeyframeTrack};
pub use errors::{Result, SceneError};
pub use renderer::{
    FramePhase, FrameStats, GraphicsDevice, HeadlessDevice, LightingStrategy, SceneSettings,
    ShaderLibrary, TickRatePolicy,
};
pub use resources::{Material, MaterialType, Mesh, Vertex};
pub use scene::{Attenuation, Camera, Node, NodeHandle, PointLight, Scene, Transform};
