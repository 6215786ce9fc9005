use crate::resources::geometry::{VERTEX_SIZE, Vertex};
use crate::resources::material::Material;

/// Renderable geometry: interleaved vertices, 16-bit triangle indices and a
/// single material.
///
/// Meshes live in the scene's mesh registry and are referenced from nodes by
/// [`MeshKey`](crate::scene::MeshKey). Several nodes may draw the same mesh.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    pub material: Material,
}

impl Mesh {
    pub fn new(
        name: impl Into<String>,
        vertices: Vec<Vertex>,
        indices: Vec<u16>,
        material: Material,
    ) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices,
            material,
        }
    }

    /// Copies the geometry under a new name and material.
    #[must_use]
    pub fn duplicate(&self, name: impl Into<String>, material: Material) -> Self {
        Self {
            name: name.into(),
            vertices: self.vertices.clone(),
            indices: self.indices.clone(),
            material,
        }
    }

    #[inline]
    #[must_use]
    pub fn vertex_bytes(&self) -> usize {
        self.vertices.len() * VERTEX_SIZE
    }

    #[inline]
    #[must_use]
    pub fn index_bytes(&self) -> usize {
        self.indices.len() * std::mem::size_of::<u16>()
    }

    #[inline]
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Unit cube centered on the origin, 24 vertices with per-face normals.
    pub fn cube(name: impl Into<String>, material: Material) -> Self {
        use glam::{Vec2, Vec3};

        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Y, Vec3::NEG_Z),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::Z, Vec3::NEG_X),
            (Vec3::Z, Vec3::Y, Vec3::NEG_X),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, up, right) in faces {
            let base = vertices.len() as u16;
            for (u, v) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let position = (normal + right * u + up * v) * 0.5;
                let texcoord = Vec2::new((u + 1.0) * 0.5, (v + 1.0) * 0.5);
                vertices.push(Vertex::new(position, normal, texcoord).with_tangents(right, up));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(name, vertices, indices, material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::MaterialType;

    #[test]
    fn cube_has_expected_counts() {
        let cube = Mesh::cube("cube", Material::default());
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.index_count(), 36);
        assert_eq!(cube.vertex_bytes(), 24 * 64);
        assert_eq!(cube.index_bytes(), 72);
    }

    #[test]
    fn duplicate_copies_geometry_only() {
        let cube = Mesh::cube("cube", Material::default());
        let copy = cube.duplicate("indicator", Material::new(MaterialType::Emissive));
        assert_eq!(copy.name, "indicator");
        assert_eq!(copy.vertices, cube.vertices);
        assert_eq!(copy.indices, cube.indices);
        assert_eq!(copy.material.kind, MaterialType::Emissive);
    }
}
