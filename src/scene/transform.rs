use glam::{Affine3A, EulerRot, Mat3, Mat4, Quat, Vec3};

/// Transform component
///
/// Holds a node's local translation, rotation and scale (TRS) together with
/// the cached local and world matrices and the dirty flag that guards them.
///
/// Mutating any TRS component marks the transform dirty. The caches are only
/// rebuilt by [`Transform::update_world`]; until then they keep the values of
/// the last update.
#[derive(Debug, Clone)]
pub struct Transform {
    position: Vec3,
    rotation: Quat,
    scale: Vec3,

    // === Matrix caches ===
    pub(crate) local_matrix: Affine3A,
    pub(crate) world_matrix: Affine3A,

    dirty: bool,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,

            local_matrix: Affine3A::IDENTITY,
            world_matrix: Affine3A::IDENTITY,

            dirty: true,
        }
    }

    /// Creates a transform from explicit TRS components.
    #[must_use]
    pub fn from_trs(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
            ..Self::new()
        }
    }

    // ========================================================================
    // Matrix update
    // ========================================================================

    /// Rebuilds the cached matrices if the transform is dirty.
    ///
    /// The local matrix is composed as `T * R * S`. The world matrix is
    /// `parent * local`, or `local` when there is no parent.
    ///
    /// Returns `true` if the caches were rebuilt. A clean transform is left
    /// untouched, so calling this twice in a row is a no-op the second time.
    pub fn update_world(&mut self, parent: Option<&Affine3A>) -> bool {
        if !self.dirty {
            return false;
        }

        self.local_matrix =
            Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position);
        self.world_matrix = match parent {
            Some(parent) => *parent * self.local_matrix,
            None => self.local_matrix,
        };
        self.dirty = false;

        true
    }

    /// Marks the cached matrices as stale.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // ========================================================================
    // TRS accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    #[inline]
    #[must_use]
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.dirty = true;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.dirty = true;
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.dirty = true;
    }

    /// Sets the rotation from Euler angles in radians (XYZ order).
    pub fn set_rotation_euler(&mut self, x: f32, y: f32, z: f32) {
        self.set_rotation(Quat::from_euler(EulerRot::XYZ, x, y, z));
    }

    /// Returns the current rotation as XYZ Euler angles in radians.
    #[must_use]
    pub fn rotation_euler(&self) -> Vec3 {
        let (x, y, z) = self.rotation.to_euler(EulerRot::XYZ);
        Vec3::new(x, y, z)
    }

    // ========================================================================
    // Matrix getters
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> &Affine3A {
        &self.local_matrix
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    /// World matrix widened to a `Mat4` for uniform upload.
    #[inline]
    #[must_use]
    pub fn world_matrix_as_mat4(&self) -> Mat4 {
        Mat4::from(self.world_matrix)
    }

    /// World-space translation of this transform.
    #[inline]
    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        Vec3::from(self.world_matrix.translation)
    }

    /// Sets the local transform from a matrix, decomposing it into TRS.
    ///
    /// Shear is lost in the decomposition.
    pub fn apply_local_matrix(&mut self, mat: Affine3A) {
        let (scale, rotation, translation) = mat.to_scale_rotation_translation();
        self.scale = scale;
        self.rotation = rotation;
        self.position = translation;
        self.dirty = true;
    }

    /// `Mat4` variant of [`Transform::apply_local_matrix`].
    pub fn apply_local_matrix_from_mat4(&mut self, mat: Mat4) {
        self.apply_local_matrix(Affine3A::from_mat4(mat));
    }

    /// Rotates the transform so that -Z points at `target`.
    ///
    /// `target` and `up` are in the parent's space. Degenerate inputs (target
    /// on the up axis, or at the current position) leave the rotation alone.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let to_target = target - self.position;
        if to_target.length_squared() < 1e-8 {
            return;
        }
        let forward = to_target.normalize();

        if forward.cross(up).length_squared() < 1e-4 {
            return;
        }

        let right = forward.cross(up).normalize();
        let new_up = right.cross(forward).normalize();

        let rot_mat = Mat3::from_cols(right, new_up, -forward);
        self.set_rotation(Quat::from_mat3(&rot_mat));
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
