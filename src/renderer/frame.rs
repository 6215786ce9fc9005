use smallvec::SmallVec;

/// Stage of the per-frame state machine.
///
/// `Idle → BuildDrawList → SortDrawList → DepthPrePass → AmbientPass →
/// LightPass → Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FramePhase {
    #[default]
    Idle,
    BuildDrawList,
    SortDrawList,
    DepthPrePass,
    AmbientPass,
    LightPass,
}

impl FramePhase {
    /// The phase that follows this one.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            FramePhase::Idle => FramePhase::BuildDrawList,
            FramePhase::BuildDrawList => FramePhase::SortDrawList,
            FramePhase::SortDrawList => FramePhase::DepthPrePass,
            FramePhase::DepthPrePass => FramePhase::AmbientPass,
            FramePhase::AmbientPass => FramePhase::LightPass,
            FramePhase::LightPass => FramePhase::Idle,
        }
    }
}

/// What one call to [`Scene::render`](crate::scene::Scene::render) submitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// Draw entries in the sorted list
    pub entries: usize,
    /// Lights that reached the light pass
    pub lights: usize,
    pub draw_calls: usize,
    /// `use_program` calls
    pub program_binds: usize,
    /// Render passes issued (a per-light strategy issues one per light)
    pub passes: usize,
    /// Phases entered, in order
    pub phases: SmallVec<[FramePhase; 8]>,
}

impl FrameStats {
    pub(crate) fn enter(&mut self, phase: FramePhase) {
        self.phases.push(phase);
    }
}
