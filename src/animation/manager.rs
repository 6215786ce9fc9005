//! Animation clock
//!
//! The manager owns the registered animations and advances time in ticks.
//! Two clock policies exist (see [`TickRatePolicy`]):
//!
//! - `LastRegistered`: one shared clock, advanced at the rate of the most
//!   recently registered animation and wrapped at the longest duration. Each
//!   tick, an animation is applied only while its duration still covers the
//!   clock.
//! - `PerAnimation`: every animation advances and wraps its own clock.
//!
//! Wrapping subtracts the period once per update, so a step longer than a
//! whole period leaves the clock past the period until later updates catch up.

use slotmap::SlotMap;

use crate::animation::clip::Animation;
use crate::renderer::settings::TickRatePolicy;
use crate::scene::NodeHandle;
use crate::scene::node::Node;

#[derive(Debug, Clone)]
struct AnimationState {
    animation: Animation,
    /// Own clock, used by `PerAnimation` only
    clock: f32,
}

#[derive(Debug, Clone, Default)]
pub struct AnimationManager {
    animations: Vec<AnimationState>,
    policy: TickRatePolicy,
    frame: f32,
    max_frame_time: f32,
    ticks_per_second: f32,
}

impl AnimationManager {
    #[must_use]
    pub fn new(policy: TickRatePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Registers an animation.
    ///
    /// The shared period grows to the longest registered duration; the shared
    /// rate becomes this animation's rate. A negative or non-finite rate is
    /// stored as zero.
    pub fn add_animation(&mut self, mut animation: Animation) {
        let rate = animation.ticks_per_second;
        if !rate.is_finite() || rate < 0.0 {
            log::warn!(
                "Animation '{}' has an invalid tick rate {rate}, using 0",
                animation.name
            );
            animation.ticks_per_second = 0.0;
        }

        self.max_frame_time = self.max_frame_time.max(animation.duration);
        self.ticks_per_second = animation.ticks_per_second;

        log::debug!(
            "Registered animation '{}' ({} ticks @ {} tps, {} tracks)",
            animation.name,
            animation.duration,
            animation.ticks_per_second,
            animation.tracks().len()
        );

        self.animations.push(AnimationState {
            animation,
            clock: 0.0,
        });
    }

    /// Applies every animation at its current time, then advances the clock by
    /// `dt` seconds.
    pub fn update_state(&mut self, dt: f32, nodes: &mut SlotMap<NodeHandle, Node>) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        match self.policy {
            TickRatePolicy::LastRegistered => {
                for state in &self.animations {
                    if state.animation.duration >= self.frame {
                        state.animation.apply(nodes, self.frame);
                    }
                }
                self.frame = advance(self.frame, dt * self.ticks_per_second, self.max_frame_time);
            }
            TickRatePolicy::PerAnimation => {
                for state in &mut self.animations {
                    state.animation.apply(nodes, state.clock);
                    state.clock = advance(
                        state.clock,
                        dt * state.animation.ticks_per_second,
                        state.animation.duration,
                    );
                }
            }
        }
    }

    /// Resets every clock to zero.
    pub fn rewind(&mut self) {
        self.frame = 0.0;
        for state in &mut self.animations {
            state.clock = 0.0;
        }
    }

    /// Shared clock in ticks.
    #[inline]
    #[must_use]
    pub fn frame(&self) -> f32 {
        self.frame
    }

    /// Clock of the animation at `index` under the active policy.
    #[must_use]
    pub fn clock_of(&self, index: usize) -> Option<f32> {
        let state = self.animations.get(index)?;
        Some(match self.policy {
            TickRatePolicy::LastRegistered => self.frame,
            TickRatePolicy::PerAnimation => state.clock,
        })
    }

    #[inline]
    #[must_use]
    pub fn max_frame_time(&self) -> f32 {
        self.max_frame_time
    }

    #[inline]
    #[must_use]
    pub fn ticks_per_second(&self) -> f32 {
        self.ticks_per_second
    }

    #[inline]
    #[must_use]
    pub fn policy(&self) -> TickRatePolicy {
        self.policy
    }

    pub fn animations(&self) -> impl Iterator<Item = &Animation> {
        self.animations.iter().map(|s| &s.animation)
    }

    #[must_use]
    pub fn animation_by_name(&self, name: &str) -> Option<&Animation> {
        self.animations().find(|a| a.name == name)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.animations.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }
}

/// Advances `clock` by `step` ticks with a single wrap at `period`.
///
/// A zero period never advances.
fn advance(clock: f32, step: f32, period: f32) -> f32 {
    if period <= 0.0 {
        return clock;
    }
    let next = clock + step;
    if next >= period { next - period } else { next }
}
