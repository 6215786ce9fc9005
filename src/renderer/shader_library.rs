use rustc_hash::FxHashMap;

use crate::errors::{Result, SceneError};
use crate::renderer::device::ProgramId;
use crate::resources::MaterialType;

/// Maps each material technique to its linked shader program.
///
/// Shader sources and compilation belong to the backend; the library only
/// records which program serves which [`MaterialType`].
#[derive(Debug, Default, Clone)]
pub struct ShaderLibrary {
    programs: FxHashMap<MaterialType, ProgramId>,
}

impl ShaderLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `program` for `kind`, returning the program it replaces.
    pub fn register(&mut self, kind: MaterialType, program: ProgramId) -> Option<ProgramId> {
        let previous = self.programs.insert(kind, program);
        if let Some(previous) = previous {
            log::debug!("Shader for {kind:?} replaced: {previous:?} -> {program:?}");
        }
        previous
    }

    #[must_use]
    pub fn with(mut self, kind: MaterialType, program: ProgramId) -> Self {
        self.register(kind, program);
        self
    }

    #[inline]
    #[must_use]
    pub fn get(&self, kind: MaterialType) -> Option<ProgramId> {
        self.programs.get(&kind).copied()
    }

    /// Like [`ShaderLibrary::get`], but a missing program is an error.
    pub fn program_for(&self, kind: MaterialType) -> Result<ProgramId> {
        self.get(kind).ok_or_else(|| {
            log::error!("No shader program registered for {kind:?}");
            SceneError::MissingShader(kind)
        })
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
