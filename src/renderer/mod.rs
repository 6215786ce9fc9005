//! Draw pipeline
//!
//! Backend-independent half of rendering:
//! - `device`: the [`GraphicsDevice`] seam a GPU backend implements
//! - `headless`: a recording device for tests and headless runs
//! - `geometry_buffers`: shared vertex/index packing done by `Scene::compile`
//! - `draw_list`: per-frame draw entries and material sorting
//! - `lighting`: point light discovery and light block packing
//! - `passes`: depth pre-pass, ambient pass and light passes
//! - `settings`: per-scene configuration

pub mod device;
pub mod draw_list;
pub mod frame;
pub mod geometry_buffers;
pub mod headless;
pub mod lighting;
pub mod passes;
pub mod settings;
pub mod shader_library;

pub use device::{GraphicsDevice, PassState, UniformValue};
pub use draw_list::{DrawEntry, DrawList};
pub use frame::{FramePhase, FrameStats};
pub use headless::HeadlessDevice;
pub use settings::{LightingStrategy, SceneSettings, TickRatePolicy};
pub use shader_library::ShaderLibrary;
