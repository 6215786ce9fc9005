use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Byte size of one packed [`Vertex`].
pub const VERTEX_SIZE: usize = std::mem::size_of::<Vertex>();

/// Interleaved vertex as laid out in the shared GPU vertex buffer.
///
/// 16 floats, 64 bytes. The trailing padding keeps every vertex on a 16-byte
/// boundary so base-vertex offsets are plain divisions of byte offsets.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
    pub texcoord: [f32; 2],
    _padding: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<Vertex>() == 64);

impl Vertex {
    #[must_use]
    pub fn new(position: Vec3, normal: Vec3, texcoord: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            tangent: [0.0; 3],
            bitangent: [0.0; 3],
            texcoord: texcoord.to_array(),
            _padding: [0.0; 2],
        }
    }

    /// Sets the tangent frame used for normal mapping.
    #[must_use]
    pub fn with_tangents(mut self, tangent: Vec3, bitangent: Vec3) -> Self {
        self.tangent = tangent.to_array();
        self.bitangent = bitangent.to_array();
        self
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}
