//! Keyframed animation clips handed to a [`Stage`](crate::Stage) for playback.

use std::{f32::consts::PI, time::Duration};

use glam::{Quat, Vec3};

/// Frame rate used by clips unless configured otherwise.
pub const DEFAULT_FRAME_RATE: u32 = 60;

/// Inclusive range of frames played by a clip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameRange {
    start: u32,
    end: u32,
}

impl FrameRange {
    /// Creates a range spanning `start..=end`. Reversed bounds are swapped.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// First frame of the range.
    #[must_use]
    pub const fn start(&self) -> u32 {
        self.start
    }

    /// Last frame of the range.
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.end
    }

    /// Number of frame steps between the first and last frame.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Reports whether the range covers a single frame.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Mesh property animated by a track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackProperty {
    /// World-space position.
    Position,
    /// World-space orientation.
    Rotation,
}

/// Value stored in a keyframe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackValue {
    /// Position value.
    Position(Vec3),
    /// Orientation value.
    Rotation(Quat),
}

impl TrackValue {
    /// Property the value applies to.
    #[must_use]
    pub const fn property(&self) -> TrackProperty {
        match self {
            Self::Position(_) => TrackProperty::Position,
            Self::Rotation(_) => TrackProperty::Rotation,
        }
    }

    fn interpolate(self, other: Self, amount: f32) -> Option<Self> {
        match (self, other) {
            (Self::Position(from), Self::Position(to)) => {
                Some(Self::Position(from.lerp(to, amount)))
            }
            (Self::Rotation(from), Self::Rotation(to)) => {
                Some(Self::Rotation(from.slerp(to, amount)))
            }
            _ => None,
        }
    }
}

/// Single keyed value of a track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe {
    /// Frame the value is reached on.
    pub frame: u32,
    /// Value at that frame.
    pub value: TrackValue,
}

/// Easing curve applied between two keyframes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Easing {
    /// Constant speed.
    Linear,
    /// Back easing in both directions; pulls back before leaving and
    /// overshoots before settling. `amplitude` controls the overshoot.
    BackInOut {
        /// Strength of the overshoot, clamped to be non-negative.
        amplitude: f32,
    },
}

impl Easing {
    /// Maps linear progress in `0.0..=1.0` onto the curve.
    #[must_use]
    pub fn ease(&self, progress: f32) -> f32 {
        let progress = progress.clamp(0.0, 1.0);
        match *self {
            Self::Linear => progress,
            Self::BackInOut { amplitude } => {
                if progress >= 0.5 {
                    (1.0 - back_in((1.0 - progress) * 2.0, amplitude)) * 0.5 + 0.5
                } else {
                    back_in(progress * 2.0, amplitude) * 0.5
                }
            }
        }
    }
}

fn back_in(progress: f32, amplitude: f32) -> f32 {
    let amplitude = amplitude.max(0.0);
    progress.powi(3) - progress * amplitude * (PI * progress).sin()
}

/// Keyed values of one property plus the easing used between them.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationTrack {
    name: String,
    property: TrackProperty,
    keys: Vec<Keyframe>,
    easing: Easing,
}

impl AnimationTrack {
    /// Creates a position track moving from `from` to `to` across `range`.
    #[must_use]
    pub fn position(
        name: impl Into<String>,
        from: Vec3,
        to: Vec3,
        range: FrameRange,
        easing: Easing,
    ) -> Self {
        Self::between(
            name.into(),
            TrackValue::Position(from),
            TrackValue::Position(to),
            range,
            easing,
        )
    }

    /// Creates a rotation track turning from `from` to `to` across `range`.
    #[must_use]
    pub fn rotation(
        name: impl Into<String>,
        from: Quat,
        to: Quat,
        range: FrameRange,
        easing: Easing,
    ) -> Self {
        Self::between(
            name.into(),
            TrackValue::Rotation(from),
            TrackValue::Rotation(to),
            range,
            easing,
        )
    }

    fn between(
        name: String,
        from: TrackValue,
        to: TrackValue,
        range: FrameRange,
        easing: Easing,
    ) -> Self {
        Self {
            name,
            property: from.property(),
            keys: vec![
                Keyframe {
                    frame: range.start(),
                    value: from,
                },
                Keyframe {
                    frame: range.end(),
                    value: to,
                },
            ],
            easing,
        }
    }

    /// Name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Property animated by the track.
    #[must_use]
    pub const fn property(&self) -> TrackProperty {
        self.property
    }

    /// Keyframes sorted by frame.
    #[must_use]
    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    /// Easing applied between keyframes.
    #[must_use]
    pub const fn easing(&self) -> Easing {
        self.easing
    }

    /// Evaluates the track at a (possibly fractional) frame.
    ///
    /// Frames before the first key hold the first value and frames after the
    /// last key hold the last value. Returns `None` for a track without keys.
    #[must_use]
    pub fn sample(&self, frame: f32) -> Option<TrackValue> {
        let first = self.keys.first()?;
        if frame <= first.frame as f32 {
            return Some(first.value);
        }

        for pair in self.keys.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            if frame > to.frame as f32 {
                continue;
            }
            let span = to.frame.saturating_sub(from.frame);
            if span == 0 {
                return Some(to.value);
            }
            let progress = (frame - from.frame as f32) / span as f32;
            return from.value.interpolate(to.value, self.easing.ease(progress));
        }

        self.keys.last().map(|key| key.value)
    }
}

/// Set of tracks played together on one mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationClip {
    frame_rate: u32,
    range: FrameRange,
    tracks: Vec<AnimationTrack>,
}

impl AnimationClip {
    /// Creates a clip that plays `tracks` concurrently over `range`.
    ///
    /// A frame rate of zero falls back to [`DEFAULT_FRAME_RATE`].
    #[must_use]
    pub fn new(frame_rate: u32, range: FrameRange, tracks: Vec<AnimationTrack>) -> Self {
        let frame_rate = if frame_rate == 0 {
            DEFAULT_FRAME_RATE
        } else {
            frame_rate
        };
        Self {
            frame_rate,
            range,
            tracks,
        }
    }

    /// Frames played per second.
    #[must_use]
    pub const fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// Frames covered by the clip.
    #[must_use]
    pub const fn range(&self) -> FrameRange {
        self.range
    }

    /// Tracks played by the clip.
    #[must_use]
    pub fn tracks(&self) -> &[AnimationTrack] {
        &self.tracks
    }

    /// Wall-clock length of the clip.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(f64::from(self.range.len()) / f64::from(self.frame_rate))
    }
}
