//! Scene Settings & Lighting Strategy Configuration
//!
//! This module defines the per-scene configuration consumed by
//! [`Scene::with_settings`](crate::scene::Scene::with_settings).
//!
//! The core abstraction is [`LightingStrategy`], which determines how point
//! lights reach the shaders: re-submitting the draw list once per light, or
//! packing every light into one uniform block and submitting once.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use trellis::renderer::settings::{LightingStrategy, SceneSettings};
//!
//! // Default: per-light additive forward passes
//! let settings = SceneSettings::default();
//!
//! // Single light pass with up to 32 packed lights
//! let settings = SceneSettings {
//!     lighting: LightingStrategy::LightBuffer { capacity: 32 },
//!     ..Default::default()
//! };
//!
//! // Or from JSON
//! let settings = SceneSettings::from_json_str(r#"{ "default_light_radius": 4.0 }"#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::renderer::lighting;

/// Default number of lights packed into the light uniform block.
pub const DEFAULT_LIGHT_BUFFER_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// LightingStrategy
// ---------------------------------------------------------------------------

/// How the light pass feeds point lights to the shaders.
///
/// | Strategy          | Submissions per frame | Light count          |
/// |-------------------|-----------------------|----------------------|
/// | `PerLightForward` | `lights × entries`    | unbounded            |
/// | `LightBuffer`     | `entries`             | bounded by capacity  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightingStrategy {
    /// One additive pass per point light, light parameters bound as plain
    /// uniforms.
    PerLightForward,

    /// All point lights packed into one uniform block, bound once, with a
    /// single additive submission of the draw list.
    LightBuffer {
        /// Maximum number of lights in the block. Extra lights are dropped.
        #[serde(default = "default_light_buffer_capacity")]
        capacity: usize,
    },
}

impl Default for LightingStrategy {
    #[inline]
    fn default() -> Self {
        Self::PerLightForward
    }
}

fn default_light_buffer_capacity() -> usize {
    DEFAULT_LIGHT_BUFFER_CAPACITY
}

impl LightingStrategy {
    /// Light buffer strategy with the default capacity.
    #[must_use]
    pub fn light_buffer() -> Self {
        Self::LightBuffer {
            capacity: DEFAULT_LIGHT_BUFFER_CAPACITY,
        }
    }

    /// Returns the packed block capacity, or `None` for per-light passes.
    #[inline]
    #[must_use]
    pub fn light_buffer_capacity(&self) -> Option<usize> {
        match self {
            Self::PerLightForward => None,
            Self::LightBuffer { capacity } => Some(*capacity),
        }
    }
}

// ---------------------------------------------------------------------------
// TickRatePolicy
// ---------------------------------------------------------------------------

/// How the animation manager converts seconds into animation ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickRatePolicy {
    /// One shared clock advanced at the rate of the most recently registered
    /// animation and wrapped at the longest registered duration.
    #[default]
    LastRegistered,

    /// Every animation keeps its own clock, advanced at its own rate and
    /// wrapped at its own duration.
    PerAnimation,
}

// ---------------------------------------------------------------------------
// SceneSettings
// ---------------------------------------------------------------------------

/// Per-scene configuration.
///
/// | Field                   | Default           |
/// |-------------------------|-------------------|
/// | `lighting`              | `PerLightForward` |
/// | `default_light_radius`  | `1.0`             |
/// | `tick_rate`             | `LastRegistered`  |
/// | `hermite_interpolation` | `false`           |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Light pass strategy.
    pub lighting: LightingStrategy,

    /// Radius used to derive attenuation for lights without explicit
    /// coefficients.
    pub default_light_radius: f32,

    /// Animation clock policy.
    pub tick_rate: TickRatePolicy,

    /// Whether tracks created through the scene default to Hermite
    /// interpolation.
    pub hermite_interpolation: bool,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            lighting: LightingStrategy::default(),
            default_light_radius: 1.0,
            tick_rate: TickRatePolicy::default(),
            hermite_interpolation: false,
        }
    }
}

impl SceneSettings {
    /// Parses settings from JSON. Missing fields take their defaults.
    ///
    /// A light buffer capacity above
    /// [`MAX_LIGHT_BUFFER_CAPACITY`](lighting::MAX_LIGHT_BUFFER_CAPACITY) is
    /// rejected.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        if let Some(capacity) = settings.lighting.light_buffer_capacity() {
            lighting::check_capacity(capacity)?;
        }
        log::info!("Loaded scene settings: {settings:?}");
        Ok(settings)
    }

    /// Serializes the settings to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
