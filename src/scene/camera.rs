use glam::{Mat4, Vec3};

/// Perspective camera feeding the view-projection and eye position to the
/// draw pipeline.
///
/// The windowing layer moves it between frames; the scene only reads it.
#[derive(Debug, Clone)]
pub struct Camera {
    // === Projection ===
    /// Vertical field of view in radians
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,

    // === View ===
    eye: Vec3,
    target: Vec3,
    up: Vec3,

    // Cached matrices
    pub(crate) view_matrix: Mat4,
    pub(crate) projection_matrix: Mat4,
    pub(crate) view_projection_matrix: Mat4,
}

impl Camera {
    /// `fov_y` is in degrees.
    #[must_use]
    pub fn new_perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut cam = Self {
            fov_y: fov_y.to_radians(),
            aspect,
            near,
            far,
            eye: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_projection_matrix: Mat4::IDENTITY,
        };
        cam.update_view_matrix();
        cam.update_projection_matrix();
        cam
    }

    /// Sets the projection. `fov_y` is in degrees.
    pub fn set_perspective(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        self.fov_y = fov_y.to_radians();
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self.update_projection_matrix();
    }

    pub fn set_look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.eye = eye;
        self.target = target;
        self.up = up;
        self.update_view_matrix();
    }

    fn update_view_matrix(&mut self) {
        self.view_matrix = Mat4::look_at_rh(self.eye, self.target, self.up);
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
    }

    fn update_projection_matrix(&mut self) {
        // OpenGL-style clip space, depth in [-1, 1]
        self.projection_matrix = Mat4::perspective_rh_gl(self.fov_y, self.aspect, self.near, self.far);
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
    }

    /// Vertical field of view in degrees.
    #[inline]
    #[must_use]
    pub fn fov_y(&self) -> f32 {
        self.fov_y.to_degrees()
    }

    #[inline]
    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    #[inline]
    #[must_use]
    pub fn near(&self) -> f32 {
        self.near
    }

    #[inline]
    #[must_use]
    pub fn far(&self) -> f32 {
        self.far
    }

    #[inline]
    #[must_use]
    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> Vec3 {
        self.target
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    #[inline]
    #[must_use]
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    #[inline]
    #[must_use]
    pub fn view_projection_matrix(&self) -> &Mat4 {
        &self.view_projection_matrix
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new_perspective(45.0, 16.0 / 9.0, 0.1, 100.0)
    }
}
