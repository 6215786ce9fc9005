use glam::{Mat3, Mat4};

use crate::resources::MaterialType;
use crate::scene::{MeshKey, NodeHandle};

/// One mesh instance queued for submission this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawEntry {
    pub node: NodeHandle,
    pub mesh: MeshKey,
    pub material: MaterialType,
    /// World matrix (`M`)
    pub model: Mat4,
    /// Inverse-transpose of the upper 3×3 of `M` (`NM`)
    pub normal: Mat3,
    /// `P * V * M`
    pub mvp: Mat4,
}

impl DrawEntry {
    /// Builds an entry from a world matrix and the camera view-projection.
    #[must_use]
    pub fn new(
        node: NodeHandle,
        mesh: MeshKey,
        material: MaterialType,
        model: Mat4,
        view_projection: &Mat4,
    ) -> Self {
        Self {
            node,
            mesh,
            material,
            model,
            normal: normal_matrix(&model),
            mvp: *view_projection * model,
        }
    }
}

/// Inverse-transpose of the upper 3×3 of `model`.
///
/// A singular matrix (zero scale on some axis) has no inverse; its upper
/// 3×3 is returned unchanged.
#[must_use]
pub fn normal_matrix(model: &Mat4) -> Mat3 {
    let upper = Mat3::from_mat4(*model);
    if upper.determinant() == 0.0 {
        return upper;
    }
    let normal = upper.inverse().transpose();
    if normal.is_finite() { normal } else { upper }
}

/// Per-frame list of draw entries.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    entries: Vec<DrawEntry>,
}

impl DrawList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, entry: DrawEntry) {
        self.entries.push(entry);
    }

    /// Empties the list, keeping its allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Stable sort by material type, so the renderer only switches programs at
    /// group boundaries.
    pub fn sort_by_material(&mut self) {
        self.entries.sort_by_key(|e| e.material);
    }

    /// Whether adjacent entries are in non-decreasing material order.
    #[must_use]
    pub fn is_sorted_by_material(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].material <= w[1].material)
    }

    /// Number of program switches a submission of this list costs.
    #[must_use]
    pub fn material_switches(&self) -> usize {
        let mut switches = 0;
        let mut current = None;
        for entry in &self.entries {
            if current != Some(entry.material) {
                switches += 1;
                current = Some(entry.material);
            }
        }
        switches
    }

    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[DrawEntry] {
        &self.entries
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, DrawEntry> {
        self.entries.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a DrawList {
    type Item = &'a DrawEntry;
    type IntoIter = std::slice::Iter<'a, DrawEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
