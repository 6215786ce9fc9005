use glam::{Quat, Vec3};
use slotmap::SlotMap;

use crate::animation::tracks::{InterpolationMode, KeyframeTrack};
use crate::scene::NodeHandle;
use crate::scene::node::Node;
use crate::scene::transform_system;

/// Transform channel a track drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackChannel {
    Position,
    Rotation,
}

#[derive(Debug, Clone)]
pub enum TrackData {
    Position(KeyframeTrack<Vec3>),
    Rotation(KeyframeTrack<Quat>),
}

impl TrackData {
    #[must_use]
    pub fn channel(&self) -> TrackChannel {
        match self {
            TrackData::Position(_) => TrackChannel::Position,
            TrackData::Rotation(_) => TrackChannel::Rotation,
        }
    }

    #[must_use]
    pub fn max_time(&self) -> f32 {
        match self {
            TrackData::Position(track) => track.max_time(),
            TrackData::Rotation(track) => track.max_time(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            TrackData::Position(track) => track.is_empty(),
            TrackData::Rotation(track) => track.is_empty(),
        }
    }
}

/// A keyframe track bound to one node.
///
/// The binding is a plain handle: if the node is removed, the track becomes
/// inert.
#[derive(Debug, Clone)]
pub struct AnimationTrack {
    pub name: String,
    pub node: NodeHandle,
    pub data: TrackData,
}

impl AnimationTrack {
    #[must_use]
    pub fn position(name: impl Into<String>, node: NodeHandle, interpolation: InterpolationMode) -> Self {
        Self {
            name: name.into(),
            node,
            data: TrackData::Position(KeyframeTrack::new(interpolation)),
        }
    }

    #[must_use]
    pub fn rotation(name: impl Into<String>, node: NodeHandle, interpolation: InterpolationMode) -> Self {
        Self {
            name: name.into(),
            node,
            data: TrackData::Rotation(KeyframeTrack::new(interpolation)),
        }
    }

    #[inline]
    #[must_use]
    pub fn channel(&self) -> TrackChannel {
        self.data.channel()
    }

    /// Samples the track and writes the result into the bound node, marking
    /// the node animated and its subtree dirty.
    ///
    /// Returns `false` when nothing was written (empty track or missing node).
    pub fn apply_on_node(
        &self,
        nodes: &mut SlotMap<NodeHandle, Node>,
        time: f32,
        duration: f32,
        looping: bool,
    ) -> bool {
        let Some(node) = nodes.get_mut(self.node) else {
            log::trace!("Track '{}' bound to a removed node, skipped", self.name);
            return false;
        };

        match &self.data {
            TrackData::Position(track) => {
                let Some(position) = track.sample(time, duration, looping) else {
                    return false;
                };
                node.animated = true;
                node.transform.set_position(position);
            }
            TrackData::Rotation(track) => {
                let Some(rotation) = track.sample(time, duration, looping) else {
                    return false;
                };
                node.animated = true;
                node.transform.set_rotation(rotation);
            }
        }

        transform_system::mark_subtree_dirty(nodes, self.node);
        true
    }
}

/// Named set of tracks sharing a duration and playback rate.
#[derive(Debug, Clone)]
pub struct Animation {
    pub name: String,
    /// Length in ticks
    pub duration: f32,
    pub ticks_per_second: f32,
    /// Whether sampling past the last key wraps to the first key
    pub looping: bool,
    tracks: Vec<AnimationTrack>,
}

impl Animation {
    #[must_use]
    pub fn new(name: impl Into<String>, duration: f32, ticks_per_second: f32) -> Self {
        Self {
            name: name.into(),
            duration,
            ticks_per_second,
            looping: true,
            tracks: Vec::new(),
        }
    }

    /// Appends a track and returns it for keyframe population.
    pub fn add_track(&mut self, track: AnimationTrack) -> &mut AnimationTrack {
        self.tracks.push(track);
        let last = self.tracks.len() - 1;
        &mut self.tracks[last]
    }

    #[must_use]
    pub fn track(&self, index: usize) -> Option<&AnimationTrack> {
        self.tracks.get(index)
    }

    pub fn track_mut(&mut self, index: usize) -> Option<&mut AnimationTrack> {
        self.tracks.get_mut(index)
    }

    /// First track with the given name.
    #[must_use]
    pub fn track_by_name(&self, name: &str) -> Option<&AnimationTrack> {
        self.tracks.iter().find(|t| t.name == name)
    }

    pub fn track_by_name_mut(&mut self, name: &str) -> Option<&mut AnimationTrack> {
        self.tracks.iter_mut().find(|t| t.name == name)
    }

    #[must_use]
    pub fn tracks(&self) -> &[AnimationTrack] {
        &self.tracks
    }

    /// Applies every track at `time` (in ticks). Returns the number of tracks
    /// that wrote to a node.
    pub fn apply(&self, nodes: &mut SlotMap<NodeHandle, Node>, time: f32) -> usize {
        let mut applied = 0;
        for track in &self.tracks {
            if track.apply_on_node(nodes, time, self.duration, self.looping) {
                applied += 1;
            }
        }
        applied
    }
}
