//! Point light discovery and packing
//!
//! Lights are found by a depth-first walk of the node tree that runs after the
//! draw list is built. The walk follows the same visibility rule as the draw
//! walk (an invisible node hides its subtree) and brings world transforms up
//! to date on the way, since a light's position is its node's world
//! translation.
//!
//! For the light-buffer strategy the gathered lights are packed into a
//! std140 uniform block:
//!
//! ```text
//! struct PointLight {            // 64 bytes
//!     vec4 position;             // xyz, w = 1
//!     vec4 diffuse;              // rgb, a unused
//!     vec4 specular;             // rgb, a unused
//!     vec4 attenuation;          // kc, kl, kq, cutoff
//! };
//! layout(std140) uniform LightBlock {
//!     uvec4 count;               // x = light count
//!     PointLight lights[CAPACITY];
//! };
//! ```

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use slotmap::SlotMap;

use crate::errors::{Result, SceneError};
use crate::scene::light::{Attenuation, PointLight};
use crate::scene::node::Node;
use crate::scene::transform_system;
use crate::scene::{LightKey, NodeHandle};

/// Uniform block name the light-buffer shaders declare.
pub const LIGHT_BLOCK_NAME: &str = "LightBlock";
/// Binding point the light block is bound to.
pub const LIGHT_BLOCK_BINDING: u32 = 1;
/// Size of the block header preceding the light array.
pub const LIGHT_BLOCK_HEADER_SIZE: usize = 16;
/// Largest light count a block may be sized for.
pub const MAX_LIGHT_BUFFER_CAPACITY: usize = 1024;

/// A light resolved for this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLight {
    pub key: LightKey,
    pub node: NodeHandle,
    pub position: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub attenuation: Attenuation,
    pub cutoff: f32,
}

/// std140 layout of one light inside the block.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuPointLight {
    pub position: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub attenuation: [f32; 4],
}

const _: () = assert!(std::mem::size_of::<GpuPointLight>() == 64);

impl From<&FrameLight> for GpuPointLight {
    fn from(light: &FrameLight) -> Self {
        Self {
            position: light.position.extend(1.0).to_array(),
            diffuse: light.diffuse.extend(0.0).to_array(),
            specular: light.specular.extend(0.0).to_array(),
            attenuation: [
                light.attenuation.constant,
                light.attenuation.linear,
                light.attenuation.quadratic,
                light.cutoff,
            ],
        }
    }
}

/// Byte size of a light block holding `capacity` lights, `None` on overflow.
#[inline]
#[must_use]
pub fn light_block_size(capacity: usize) -> Option<usize> {
    capacity
        .checked_mul(std::mem::size_of::<GpuPointLight>())?
        .checked_add(LIGHT_BLOCK_HEADER_SIZE)
}

/// Rejects capacities above [`MAX_LIGHT_BUFFER_CAPACITY`].
pub fn check_capacity(capacity: usize) -> Result<usize> {
    if capacity > MAX_LIGHT_BUFFER_CAPACITY {
        log::error!("Light buffer capacity {capacity} exceeds {MAX_LIGHT_BUFFER_CAPACITY}");
        return Err(SceneError::LightCapacity {
            capacity,
            max: MAX_LIGHT_BUFFER_CAPACITY,
        });
    }
    light_block_size(capacity).ok_or(SceneError::LightCapacity {
        capacity,
        max: MAX_LIGHT_BUFFER_CAPACITY,
    })
}

/// Packs up to `capacity` lights, in walk order, into block bytes.
///
/// `capacity` is clamped to [`MAX_LIGHT_BUFFER_CAPACITY`]. Returns the bytes
/// and the number of lights packed.
#[must_use]
pub fn pack_light_block(lights: &[FrameLight], capacity: usize) -> (Vec<u8>, usize) {
    let capacity = capacity.min(MAX_LIGHT_BUFFER_CAPACITY);
    let size = LIGHT_BLOCK_HEADER_SIZE + capacity * std::mem::size_of::<GpuPointLight>();
    let count = lights.len().min(capacity);
    if count < lights.len() {
        log::warn!(
            "{} point light(s) exceed the light buffer capacity of {capacity} and are dropped",
            lights.len() - count
        );
    }

    let mut bytes = Vec::with_capacity(size);
    bytes.extend_from_slice(bytemuck::bytes_of(&[count as u32, 0, 0, 0]));
    for light in &lights[..count] {
        bytes.extend_from_slice(bytemuck::bytes_of(&GpuPointLight::from(light)));
    }
    bytes.resize(size, 0);

    (bytes, count)
}

/// Collects every light attached to a visible node under `root`, depth-first
/// in child order.
pub fn gather_lights(
    nodes: &mut SlotMap<NodeHandle, Node>,
    lights: &SlotMap<LightKey, PointLight>,
    root: NodeHandle,
    default_radius: f32,
    out: &mut Vec<FrameLight>,
) {
    out.clear();

    let mut stack: Vec<(NodeHandle, bool)> = vec![(root, false)];
    while let Some((handle, parent_changed)) = stack.pop() {
        let visible = nodes.get(handle).is_some_and(|n| n.visible);
        if !visible {
            continue;
        }

        if parent_changed {
            if let Some(node) = nodes.get_mut(handle) {
                node.transform.mark_dirty();
            }
        }
        let changed = transform_system::update_node(nodes, handle);

        let Some(node) = nodes.get(handle) else {
            continue;
        };
        let position = node.transform.world_position();
        for key in node.lights() {
            let Some(light) = lights.get(key) else {
                continue;
            };
            out.push(FrameLight {
                key,
                node: handle,
                position,
                diffuse: light.diffuse,
                specular: light.specular,
                attenuation: light.resolved_attenuation(default_radius),
                cutoff: light.cutoff,
            });
        }

        for &child in node.children.iter().rev() {
            stack.push((child, changed));
        }
    }

    log::trace!("Gathered {} point light(s)", out.len());
}
