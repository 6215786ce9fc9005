use glam::Vec3;

/// Constant, linear and quadratic distance attenuation terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Attenuation {
    /// Attenuation that falls to roughly a quarter of full intensity at
    /// `radius`: `kc = 1`, `kl = 2 / r`, `kq = 1 / r²`.
    #[must_use]
    pub fn from_radius(radius: f32) -> Self {
        let radius = radius.max(f32::EPSILON);
        Self {
            constant: 1.0,
            linear: 2.0 / radius,
            quadratic: 1.0 / (radius * radius),
        }
    }
}

/// Point light attached to a scene node.
///
/// Its world position comes from the owning node. Lights without explicit
/// attenuation use the scene's default light radius at the time they are
/// gathered.
#[derive(Debug, Clone)]
pub struct PointLight {
    pub name: String,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub attenuation: Option<Attenuation>,
    /// Distance beyond which the light contributes nothing
    pub cutoff: f32,
}

impl PointLight {
    #[must_use]
    pub fn new(name: impl Into<String>, diffuse: Vec3, specular: Vec3) -> Self {
        Self {
            name: name.into(),
            diffuse,
            specular,
            attenuation: None,
            cutoff: f32::MAX,
        }
    }

    #[must_use]
    pub fn with_attenuation(mut self, attenuation: Attenuation) -> Self {
        self.attenuation = Some(attenuation);
        self
    }

    #[must_use]
    pub fn with_cutoff(mut self, cutoff: f32) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Attenuation in effect, falling back to `default_radius`.
    #[inline]
    #[must_use]
    pub fn resolved_attenuation(&self, default_radius: f32) -> Attenuation {
        self.attenuation
            .unwrap_or_else(|| Attenuation::from_radius(default_radius))
    }
}
