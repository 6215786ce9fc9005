use crate::animation::values::Interpolatable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    /// Lerp for vectors, slerp for rotations.
    #[default]
    Linear,
    /// Catmull-Rom over the two neighbouring keys on interior brackets,
    /// linear on the first and last bracket.
    Hermite,
}

/// One time-stamped sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
}

/// Result of locating a query time among the keys.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    /// Index of key A
    pub from: usize,
    /// Index of key B
    pub to: usize,
    /// Blend factor between A and B, in `[0, 1)`
    pub t: f32,
}

/// Keys for a single channel, kept sorted by time.
#[derive(Debug, Clone, Default)]
pub struct KeyframeTrack<T: Interpolatable> {
    keys: Vec<Keyframe<T>>,
    pub interpolation: InterpolationMode,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    #[must_use]
    pub fn new(interpolation: InterpolationMode) -> Self {
        Self {
            keys: Vec::new(),
            interpolation,
        }
    }

    /// Inserts a key at `time` and returns it so the caller can fill in the
    /// value.
    ///
    /// Keys are inserted in sorted position; a key whose time equals existing
    /// keys goes after them.
    pub fn create_keyframe(&mut self, time: f32) -> &mut Keyframe<T> {
        let index = self.keys.partition_point(|k| k.time <= time);
        if index < self.keys.len() {
            log::debug!(
                "Keyframe at t={time} inserted before {} later key(s)",
                self.keys.len() - index
            );
        }
        self.keys.insert(
            index,
            Keyframe {
                time,
                value: T::default(),
            },
        );
        &mut self.keys[index]
    }

    /// Inserts a key with its value.
    pub fn insert(&mut self, time: f32, value: T) {
        self.create_keyframe(time).value = value;
    }

    #[inline]
    #[must_use]
    pub fn key(&self, index: usize) -> Option<&Keyframe<T>> {
        self.keys.get(index)
    }

    #[inline]
    #[must_use]
    pub fn keys(&self) -> &[Keyframe<T>] {
        &self.keys
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Time of the last key, `0` for an empty track.
    #[inline]
    #[must_use]
    pub fn max_time(&self) -> f32 {
        self.keys.last().map_or(0.0, |k| k.time)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Locates the keys around `time` after clamping it to `[0, duration]`.
    ///
    /// - At or past the last key the bracket is `(last, first)` with `t = 0`.
    /// - Before the first key the bracket is `(0, 0)` with `t = 0`.
    /// - Otherwise `to` is the first key strictly after `time` and `from` its
    ///   predecessor.
    #[must_use]
    pub fn bracket(&self, time: f32, duration: f32) -> Option<Bracket> {
        if self.keys.is_empty() {
            return None;
        }

        let time = if time.is_nan() { 0.0 } else { time.clamp(0.0, duration.max(0.0)) };
        let last = self.keys.len() - 1;

        if time >= self.max_time() {
            return Some(Bracket { from: last, to: 0, t: 0.0 });
        }

        let to = self.keys.partition_point(|k| k.time <= time);
        if to == 0 {
            return Some(Bracket { from: 0, to: 0, t: 0.0 });
        }

        let from = to - 1;
        let a = self.keys[from].time;
        let b = self.keys[to].time;
        Some(Bracket {
            from,
            to,
            t: (time - a) / (b - a),
        })
    }

    /// Samples the track at `time`.
    ///
    /// Past the last key the value snaps instead of interpolating: to the first
    /// key when `looping`, to the last key otherwise. Returns `None` for an
    /// empty track.
    #[must_use]
    pub fn sample(&self, time: f32, duration: f32, looping: bool) -> Option<T> {
        let bracket = self.bracket(time, duration)?;

        if bracket.t == 0.0 {
            let seam = bracket.from == self.keys.len() - 1 && bracket.to == 0;
            let index = if seam && looping { 0 } else { bracket.from };
            return Some(self.keys[index].value);
        }

        let a = bracket.from;
        let b = bracket.to;
        let value = match self.interpolation {
            InterpolationMode::Hermite if a > 0 && a + 2 < self.keys.len() => {
                T::interpolate_catmull_rom(
                    self.keys[a - 1].value,
                    self.keys[a].value,
                    self.keys[b].value,
                    self.keys[a + 2].value,
                    bracket.t,
                )
            }
            _ => T::interpolate_linear(self.keys[a].value, self.keys[b].value, bracket.t),
        };

        Some(value)
    }
}
