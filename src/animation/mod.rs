mod values;
pub mod tracks;
pub mod clip;
pub mod manager;

pub use clip::{Animation, AnimationTrack, TrackChannel, TrackData};
pub use manager::AnimationManager;
pub use tracks::{Bracket, InterpolationMode, Keyframe, KeyframeTrack};
pub use values::Interpolatable;
