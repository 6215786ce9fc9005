use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Coarse shading technique tag.
///
/// The derived ordering is the draw-list sort order: entries sharing a
/// technique end up adjacent so the renderer only switches programs at the
/// boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MaterialType {
    Diffuse,
    Specular,
    Emissive,
    /// Depth-only technique, forced for every entry during the depth pre-pass.
    DepthOnly,
}

impl MaterialType {
    pub const ALL: [MaterialType; 4] = [
        MaterialType::Diffuse,
        MaterialType::Specular,
        MaterialType::Emissive,
        MaterialType::DepthOnly,
    ];
}

/// Phong material attached to a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub kind: MaterialType,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    pub alpha: f32,
}

impl Material {
    #[must_use]
    pub fn new(kind: MaterialType) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Flat-colored material: ambient and diffuse share `color`.
    #[must_use]
    pub fn colored(kind: MaterialType, color: Vec3) -> Self {
        Self {
            kind,
            ambient: color * 0.1,
            diffuse: color,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_specular(mut self, specular: Vec3, shininess: f32) -> Self {
        self.specular = specular;
        self.shininess = shininess;
        self
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            kind: MaterialType::Diffuse,
            ambient: Vec3::splat(0.1),
            diffuse: Vec3::splat(0.8),
            specular: Vec3::ZERO,
            shininess: 1.0,
            alpha: 1.0,
        }
    }
}
