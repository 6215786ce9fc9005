//! Recording device
//!
//! A [`GraphicsDevice`] that executes nothing and keeps every command in
//! submission order. Used for tests, benchmarks and headless runs.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::renderer::device::{
    BufferId, BufferTarget, ClearFlags, GraphicsDevice, PassState, ProgramId, UniformValue,
    VertexArrayId,
};

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateBuffer { id: BufferId, target: BufferTarget, size: usize },
    DestroyBuffer(BufferId),
    WriteBuffer { id: BufferId, offset: usize, len: usize },
    BindBufferBase { binding: u32, id: BufferId },
    CreateVertexArray(VertexArrayId),
    DestroyVertexArray(VertexArrayId),
    BindVertexArray(VertexArrayId),
    SetPassState(PassState),
    Clear(ClearFlags),
    UseProgram(ProgramId),
    SetUniform { program: ProgramId, name: String, value: UniformValue },
    BindUniformBlock { program: ProgramId, block: String, binding: u32 },
    DrawIndexed { count: u32, index_offset: usize, base_vertex: i32 },
}

#[derive(Debug, Default)]
struct HeadlessBuffer {
    target: Option<BufferTarget>,
    data: Vec<u8>,
}

/// Command-recording device with optional allocation cap.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    commands: Vec<Command>,
    buffers: FxHashMap<BufferId, HeadlessBuffer>,
    vertex_arrays: FxHashSet<VertexArrayId>,
    next_id: u32,
    max_buffer_size: Option<usize>,
}

impl HeadlessDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every buffer allocation is truncated to `limit` bytes, simulating an
    /// out-of-memory driver.
    #[must_use]
    pub fn with_buffer_limit(limit: usize) -> Self {
        Self {
            max_buffer_size: Some(limit),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Drains the recorded commands, keeping buffer contents.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Contents of a live buffer.
    #[must_use]
    pub fn buffer_data(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    #[must_use]
    pub fn buffer_target(&self, buffer: BufferId) -> Option<BufferTarget> {
        self.buffers.get(&buffer).and_then(|b| b.target)
    }

    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    /// Recorded draw calls, in order.
    pub fn draw_calls(&self) -> impl Iterator<Item = &Command> {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::DrawIndexed { .. }))
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_buffer(&mut self, target: BufferTarget, size: usize) -> BufferId {
        let id = BufferId(self.next());
        let size = self.max_buffer_size.map_or(size, |limit| size.min(limit));
        self.buffers.insert(
            id,
            HeadlessBuffer {
                target: Some(target),
                data: vec![0; size],
            },
        );
        self.commands.push(Command::CreateBuffer { id, target, size });
        id
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        self.commands.push(Command::DestroyBuffer(buffer));
    }

    fn buffer_capacity(&self, buffer: BufferId) -> usize {
        self.buffers.get(&buffer).map_or(0, |b| b.data.len())
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: usize, data: &[u8]) {
        if let Some(b) = self.buffers.get_mut(&buffer) {
            let end = (offset + data.len()).min(b.data.len());
            if offset < end {
                b.data[offset..end].copy_from_slice(&data[..end - offset]);
            }
        }
        self.commands.push(Command::WriteBuffer {
            id: buffer,
            offset,
            len: data.len(),
        });
    }

    fn bind_buffer_base(&mut self, binding: u32, buffer: BufferId) {
        self.commands.push(Command::BindBufferBase { binding, id: buffer });
    }

    fn create_vertex_array(&mut self, _vertices: BufferId, _indices: BufferId) -> VertexArrayId {
        let id = VertexArrayId(self.next());
        self.vertex_arrays.insert(id);
        self.commands.push(Command::CreateVertexArray(id));
        id
    }

    fn destroy_vertex_array(&mut self, vao: VertexArrayId) {
        self.vertex_arrays.remove(&vao);
        self.commands.push(Command::DestroyVertexArray(vao));
    }

    fn bind_vertex_array(&mut self, vao: VertexArrayId) {
        self.commands.push(Command::BindVertexArray(vao));
    }

    fn set_pass_state(&mut self, state: &PassState) {
        self.commands.push(Command::SetPassState(*state));
    }

    fn clear(&mut self, flags: ClearFlags) {
        self.commands.push(Command::Clear(flags));
    }

    fn use_program(&mut self, program: ProgramId) {
        self.commands.push(Command::UseProgram(program));
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) {
        self.commands.push(Command::SetUniform {
            program,
            name: name.to_owned(),
            value,
        });
    }

    fn bind_uniform_block(&mut self, program: ProgramId, block: &str, binding: u32) {
        self.commands.push(Command::BindUniformBlock {
            program,
            block: block.to_owned(),
            binding,
        });
    }

    fn draw_indexed_base_vertex(&mut self, count: u32, index_offset: usize, base_vertex: i32) {
        self.commands.push(Command::DrawIndexed {
            count,
            index_offset,
            base_vertex,
        });
    }
}
