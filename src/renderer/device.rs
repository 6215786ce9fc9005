//! GPU Abstraction Seam
//!
//! The draw pipeline never talks to a graphics API directly. It drives a
//! [`GraphicsDevice`], which exposes exactly the operations the passes need:
//! shared buffers, a vertex-array object, render state, program binding, named
//! uniforms, uniform blocks and an indexed draw with base vertex.
//!
//! Backends (OpenGL, wgpu, ...) implement the trait outside this crate. The
//! [`HeadlessDevice`](crate::renderer::headless::HeadlessDevice) records the
//! command stream instead of executing it.

use bitflags::bitflags;
use glam::{Mat3, Mat4, Vec3};

/// Opaque GPU buffer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Opaque vertex-array object handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayId(pub u32);

/// Opaque linked shader program handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Binding target of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Less,
    LessEqual,
    Equal,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullFace {
    Front,
    Back,
}

bitflags! {
    /// Color channels written by a pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorMask: u8 {
        const RED   = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE  = 1 << 2;
        const ALPHA = 1 << 3;
        const RGBA  = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

bitflags! {
    /// Framebuffer attachments cleared at the start of a pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
    }
}

/// Source and destination blend factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl BlendState {
    /// `one, one` accumulation used by the light passes.
    pub const ADDITIVE: Self = Self {
        src: BlendFactor::One,
        dst: BlendFactor::One,
    };
}

/// Fixed-function state for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassState {
    /// `None` disables the depth test.
    pub depth_test: Option<CompareFunction>,
    pub depth_write: bool,
    pub color_mask: ColorMask,
    /// `None` disables blending.
    pub blend: Option<BlendState>,
    pub cull: Option<CullFace>,
}

impl PassState {
    /// Depth pre-pass: `Less` test, depth writes on, no color output.
    pub const DEPTH_PREPASS: Self = Self {
        depth_test: Some(CompareFunction::Less),
        depth_write: true,
        color_mask: ColorMask::empty(),
        blend: None,
        cull: Some(CullFace::Back),
    };

    /// Ambient pass: `LessEqual` against the pre-pass depth, color on.
    pub const AMBIENT: Self = Self {
        depth_test: Some(CompareFunction::LessEqual),
        depth_write: false,
        color_mask: ColorMask::RGBA,
        blend: None,
        cull: Some(CullFace::Back),
    };

    /// Light pass: `Equal` depth test with additive blending.
    pub const ADDITIVE_LIGHT: Self = Self {
        depth_test: Some(CompareFunction::Equal),
        depth_write: false,
        color_mask: ColorMask::RGBA,
        blend: Some(BlendState::ADDITIVE),
        cull: Some(CullFace::Back),
    };
}

/// Value of a named uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    F32(f32),
    I32(i32),
    Vec3(Vec3),
    Mat3(Mat3),
    Mat4(Mat4),
}

/// Operations the draw pipeline requires from a GPU backend.
///
/// Buffer creation may return a buffer smaller than requested (driver
/// out-of-memory); callers check [`GraphicsDevice::buffer_capacity`].
pub trait GraphicsDevice {
    // === Buffers ===
    fn create_buffer(&mut self, target: BufferTarget, size: usize) -> BufferId;
    fn destroy_buffer(&mut self, buffer: BufferId);
    /// Capacity in bytes, `0` for unknown buffers.
    fn buffer_capacity(&self, buffer: BufferId) -> usize;
    /// Writes `data` at `offset`. The caller guarantees the range fits.
    fn write_buffer(&mut self, buffer: BufferId, offset: usize, data: &[u8]);
    /// Binds a uniform buffer to an indexed binding point.
    fn bind_buffer_base(&mut self, binding: u32, buffer: BufferId);

    // === Vertex arrays ===
    /// Creates a vertex array over the shared vertex/index buffer pair.
    fn create_vertex_array(&mut self, vertices: BufferId, indices: BufferId) -> VertexArrayId;
    fn destroy_vertex_array(&mut self, vao: VertexArrayId);
    fn bind_vertex_array(&mut self, vao: VertexArrayId);

    // === State ===
    fn set_pass_state(&mut self, state: &PassState);
    fn clear(&mut self, flags: ClearFlags);

    // === Programs ===
    fn use_program(&mut self, program: ProgramId);
    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue);
    fn bind_uniform_block(&mut self, program: ProgramId, block: &str, binding: u32);

    // === Draw ===
    /// Draws `count` 16-bit indices starting at byte `index_offset` of the
    /// bound index buffer, adding `base_vertex` to every index.
    fn draw_indexed_base_vertex(&mut self, count: u32, index_offset: usize, base_vertex: i32);
}
