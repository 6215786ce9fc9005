//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! Most scene operations degrade silently: unknown names return `None`, empty
//! tracks and empty draw lists are no-ops. [`SceneError`] only covers the
//! conditions under which a frame cannot be produced correctly:
//! - GPU buffers that cannot hold the packed scene geometry
//! - Material types without a registered shader program
//! - Rendering a scene whose geometry was never packed
//! - Malformed settings
//!
//! # Usage
//!
//! Fallible APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, SceneError>`.
//!
//! ```rust,ignore
//! use trellis::errors::Result;
//!
//! fn prepare(scene: &mut Scene, device: &mut impl GraphicsDevice) -> Result<()> {
//!     scene.compile(device)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::renderer::device::BufferTarget;
use crate::resources::MaterialType;

/// The main error type for the engine.
#[derive(Error, Debug)]
pub enum SceneError {
    // ========================================================================
    // GPU Buffer Errors
    // ========================================================================
    /// The device returned a buffer smaller than the packed scene requires.
    #[error("GPU {target:?} buffer allocation failed: required {required} bytes, got {allocated}")]
    BufferAllocation {
        /// Which shared buffer was being allocated
        target: BufferTarget,
        /// Bytes needed by the packed meshes
        required: usize,
        /// Bytes the device actually provided
        allocated: usize,
    },

    /// A write would run past the end of a GPU buffer.
    #[error("GPU buffer write out of range: {len} bytes at offset {offset} exceeds capacity {capacity}")]
    BufferWrite {
        /// Byte offset of the write
        offset: usize,
        /// Length of the write in bytes
        len: usize,
        /// Capacity of the target buffer
        capacity: usize,
    },

    // ========================================================================
    // Rendering Errors
    // ========================================================================
    /// A draw entry references a material type with no shader program.
    #[error("No shader program registered for material {0:?}")]
    MissingShader(MaterialType),

    /// `render` was called on a scene whose geometry buffers were never built.
    #[error("Scene '{0}' must be compiled before rendering")]
    NotCompiled(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Settings could not be parsed.
    #[error("Invalid scene settings: {0}")]
    InvalidSettings(#[from] serde_json::Error),

    /// The light buffer strategy asks for more lights than one block can hold.
    #[error("Light buffer capacity {capacity} exceeds the maximum of {max}")]
    LightCapacity {
        /// Requested light count
        capacity: usize,
        /// Largest supported light count
        max: usize,
    },
}

/// Alias for `Result<T, SceneError>`.
pub type Result<T> = std::result::Result<T, SceneError>;
