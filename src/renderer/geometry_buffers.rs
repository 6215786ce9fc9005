//! Shared scene geometry buffers
//!
//! Every mesh of a scene is packed into one vertex buffer and one index buffer
//! so that a frame binds a single vertex array and each draw is an indexed
//! draw with a base vertex.
//!
//! Layout:
//! - vertices: meshes back to back, each run starting on a vertex boundary
//! - indices: meshes back to back, each run padded to a 16-byte boundary

use slotmap::{SecondaryMap, SlotMap};

use crate::errors::{Result, SceneError};
use crate::renderer::device::{BufferId, BufferTarget, GraphicsDevice, VertexArrayId};
use crate::resources::Mesh;
use crate::resources::geometry::VERTEX_SIZE;
use crate::scene::MeshKey;

/// Alignment of each mesh's index run, in bytes.
pub const INDEX_RUN_ALIGNMENT: usize = 16;

#[inline]
#[must_use]
pub fn align16(size: usize) -> usize {
    (size + INDEX_RUN_ALIGNMENT - 1) & !(INDEX_RUN_ALIGNMENT - 1)
}

/// Where one mesh lives inside the shared buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshRange {
    /// Byte offset of the first vertex
    pub vertex_offset: usize,
    /// Byte offset of the first index
    pub index_offset: usize,
    pub index_count: u32,
    /// `vertex_offset / VERTEX_SIZE`, added to every index by the draw call
    pub base_vertex: i32,
}

/// GPU-side packed geometry of a compiled scene.
#[derive(Debug)]
pub struct GeometryBuffers {
    pub(crate) vertex_buffer: BufferId,
    pub(crate) index_buffer: BufferId,
    pub(crate) vertex_array: VertexArrayId,
    ranges: SecondaryMap<MeshKey, MeshRange>,
    vertex_bytes: usize,
    index_bytes: usize,
}

impl GeometryBuffers {
    /// Packs all `meshes` into a fresh buffer pair.
    ///
    /// Fails if the device hands back a buffer smaller than the packed size.
    /// Buffers created before the failure are released.
    pub fn build(
        device: &mut dyn GraphicsDevice,
        meshes: &SlotMap<MeshKey, Mesh>,
    ) -> Result<Self> {
        // 1. Layout pass
        let mut ranges = SecondaryMap::with_capacity(meshes.len());
        let mut vertex_bytes = 0;
        let mut index_bytes = 0;

        for (key, mesh) in meshes {
            ranges.insert(
                key,
                MeshRange {
                    vertex_offset: vertex_bytes,
                    index_offset: index_bytes,
                    index_count: mesh.index_count() as u32,
                    base_vertex: (vertex_bytes / VERTEX_SIZE) as i32,
                },
            );
            vertex_bytes += mesh.vertex_bytes();
            index_bytes += align16(mesh.index_bytes());
        }

        // 2. Allocation
        let vertex_buffer = device.create_buffer(BufferTarget::Vertex, vertex_bytes);
        if let Err(err) = check_capacity(device, vertex_buffer, BufferTarget::Vertex, vertex_bytes) {
            device.destroy_buffer(vertex_buffer);
            return Err(err);
        }

        let index_buffer = device.create_buffer(BufferTarget::Index, index_bytes);
        if let Err(err) = check_capacity(device, index_buffer, BufferTarget::Index, index_bytes) {
            device.destroy_buffer(vertex_buffer);
            device.destroy_buffer(index_buffer);
            return Err(err);
        }

        // 3. Upload
        for (key, mesh) in meshes {
            let Some(range) = ranges.get(key).copied() else {
                continue;
            };
            let written = write_checked(
                device,
                vertex_buffer,
                range.vertex_offset,
                bytemuck::cast_slice(&mesh.vertices),
            )
            .and_then(|()| {
                write_checked(
                    device,
                    index_buffer,
                    range.index_offset,
                    bytemuck::cast_slice(&mesh.indices),
                )
            });
            if let Err(err) = written {
                device.destroy_buffer(vertex_buffer);
                device.destroy_buffer(index_buffer);
                return Err(err);
            }
        }

        let vertex_array = device.create_vertex_array(vertex_buffer, index_buffer);

        log::info!(
            "Packed {} mesh(es): {} vertex bytes, {} index bytes",
            meshes.len(),
            vertex_bytes,
            index_bytes
        );

        Ok(Self {
            vertex_buffer,
            index_buffer,
            vertex_array,
            ranges,
            vertex_bytes,
            index_bytes,
        })
    }

    /// Releases the vertex array and both GPU buffers.
    pub fn release(self, device: &mut dyn GraphicsDevice) {
        device.destroy_vertex_array(self.vertex_array);
        device.destroy_buffer(self.vertex_buffer);
        device.destroy_buffer(self.index_buffer);
    }

    #[inline]
    #[must_use]
    pub fn range(&self, mesh: MeshKey) -> Option<&MeshRange> {
        self.ranges.get(mesh)
    }

    #[inline]
    #[must_use]
    pub fn vertex_array(&self) -> VertexArrayId {
        self.vertex_array
    }

    #[inline]
    #[must_use]
    pub fn vertex_bytes(&self) -> usize {
        self.vertex_bytes
    }

    #[inline]
    #[must_use]
    pub fn index_bytes(&self) -> usize {
        self.index_bytes
    }
}

fn check_capacity(
    device: &dyn GraphicsDevice,
    buffer: BufferId,
    target: BufferTarget,
    required: usize,
) -> Result<()> {
    let allocated = device.buffer_capacity(buffer);
    if allocated < required {
        log::error!("{target:?} buffer allocation failed: required {required} bytes, got {allocated}");
        return Err(SceneError::BufferAllocation {
            target,
            required,
            allocated,
        });
    }
    Ok(())
}

/// Writes `data` at `offset`, refusing writes that overrun the buffer.
pub(crate) fn write_checked(
    device: &mut dyn GraphicsDevice,
    buffer: BufferId,
    offset: usize,
    data: &[u8],
) -> Result<()> {
    let capacity = device.buffer_capacity(buffer);
    if offset + data.len() > capacity {
        log::error!(
            "Buffer write out of range: {} bytes at {offset}, capacity {capacity}",
            data.len()
        );
        return Err(SceneError::BufferWrite {
            offset,
            len: data.len(),
            capacity,
        });
    }
    if !data.is_empty() {
        device.write_buffer(buffer, offset, data);
    }
    Ok(())
}
