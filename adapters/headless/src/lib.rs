#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! In-memory stage used when no renderer is attached.
//!
//! The stage keeps unit poses, highlight outlines and intent lines in plain
//! collections. Animation clips are sampled frame by frame and applied
//! immediately, unless playback is held behind a [`PlaybackGate`].

mod picking;

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
    task::{Poll, Waker},
};

use futures::future::{self, FutureExt, LocalBoxFuture};
use glam::Vec3;
use tactica_core::{
    AnimationClip, IntentLineId, Stage, StageError, TrackValue, UnitId, UnitPose,
};

pub use picking::{TopDownPicker, DEFAULT_UNIT_RADIUS};

/// Line drawn from a move's start to its destination.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntentLine {
    /// World-space start of the line.
    pub from: Vec3,
    /// World-space end of the line.
    pub to: Vec3,
}

/// Record of a clip played on a unit.
#[derive(Clone, Debug, PartialEq)]
pub struct Playback {
    unit: UnitId,
    clip: AnimationClip,
    samples: Vec<UnitPose>,
}

impl Playback {
    /// Unit the clip was played on.
    #[must_use]
    pub const fn unit(&self) -> UnitId {
        self.unit
    }

    /// Clip that was played.
    #[must_use]
    pub const fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    /// Pose of the unit after each frame of the clip, first frame first.
    #[must_use]
    pub fn samples(&self) -> &[UnitPose] {
        &self.samples
    }
}

#[derive(Debug, Default)]
struct GateState {
    open: Cell<bool>,
    waiters: RefCell<Vec<Waker>>,
}

/// Shared switch that holds animation playback until it is opened.
#[derive(Clone, Debug, Default)]
pub struct PlaybackGate {
    state: Rc<GateState>,
}

impl PlaybackGate {
    /// Lets every held and future playback proceed.
    pub fn open(&self) {
        self.state.open.set(true);
        for waker in self.state.waiters.borrow_mut().drain(..) {
            waker.wake();
        }
    }

    /// Reports whether the gate was opened.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.open.get()
    }

    async fn wait(&self) {
        future::poll_fn(|cx| {
            if self.state.open.get() {
                Poll::Ready(())
            } else {
                self.state.waiters.borrow_mut().push(cx.waker().clone());
                Poll::Pending
            }
        })
        .await;
    }
}

/// Stage that renders nothing and records everything.
#[derive(Debug, Default)]
pub struct HeadlessStage {
    poses: BTreeMap<UnitId, UnitPose>,
    highlighted: BTreeSet<UnitId>,
    lines: BTreeMap<IntentLineId, IntentLine>,
    next_line: u32,
    playbacks: Vec<Playback>,
    gate: Option<PlaybackGate>,
}

impl HeadlessStage {
    /// Creates an empty stage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unit mesh, replacing any previous pose.
    pub fn place_unit(&mut self, unit: UnitId, pose: UnitPose) {
        let _ = self.poses.insert(unit, pose);
    }

    /// Units on stage in identifier order.
    pub fn units(&self) -> impl Iterator<Item = (UnitId, UnitPose)> + '_ {
        self.poses.iter().map(|(unit, pose)| (*unit, *pose))
    }

    /// Reports whether the unit's highlight outline is enabled.
    #[must_use]
    pub fn is_highlighted(&self, unit: UnitId) -> bool {
        self.highlighted.contains(&unit)
    }

    /// Looks up a live intent line.
    #[must_use]
    pub fn intent_line(&self, line: IntentLineId) -> Option<IntentLine> {
        self.lines.get(&line).copied()
    }

    /// Number of intent lines currently drawn.
    #[must_use]
    pub fn intent_line_count(&self) -> usize {
        self.lines.len()
    }

    /// Every clip played so far, oldest first.
    #[must_use]
    pub fn playbacks(&self) -> &[Playback] {
        &self.playbacks
    }

    /// Holds every subsequent playback until the returned gate is opened.
    pub fn hold_playback(&mut self) -> PlaybackGate {
        let gate = PlaybackGate::default();
        self.gate = Some(gate.clone());
        gate
    }

    fn apply_clip(&mut self, unit: UnitId, clip: AnimationClip) -> Result<(), StageError> {
        let mut pose = self
            .poses
            .get(&unit)
            .copied()
            .ok_or(StageError::UnknownUnit { unit })?;

        let range = clip.range();
        let mut samples = Vec::with_capacity(range.len() as usize + 1);
        for frame in range.start()..=range.end() {
            for track in clip.tracks() {
                match track.sample(frame as f32) {
                    Some(TrackValue::Position(position)) => pose.position = position,
                    Some(TrackValue::Rotation(rotation)) => pose.rotation = rotation,
                    None => {}
                }
            }
            samples.push(pose);
        }

        let _ = self.poses.insert(unit, pose);
        log::debug!(
            "played {} frames on {unit} over {:?}",
            samples.len(),
            clip.duration()
        );
        self.playbacks.push(Playback {
            unit,
            clip,
            samples,
        });
        Ok(())
    }
}

impl Stage for HeadlessStage {
    fn unit_pose(&self, unit: UnitId) -> Option<UnitPose> {
        self.poses.get(&unit).copied()
    }

    fn set_unit_pose(&mut self, unit: UnitId, pose: UnitPose) -> Result<(), StageError> {
        let slot = self
            .poses
            .get_mut(&unit)
            .ok_or(StageError::UnknownUnit { unit })?;
        *slot = pose;
        Ok(())
    }

    fn set_highlight(&mut self, unit: UnitId, enabled: bool) -> Result<(), StageError> {
        if !self.poses.contains_key(&unit) {
            return Err(StageError::UnknownUnit { unit });
        }
        if enabled {
            let _ = self.highlighted.insert(unit);
        } else {
            let _ = self.highlighted.remove(&unit);
        }
        Ok(())
    }

    fn spawn_intent_line(&mut self, from: Vec3, to: Vec3) -> IntentLineId {
        let line = IntentLineId::new(self.next_line);
        self.next_line = self.next_line.wrapping_add(1);
        let _ = self.lines.insert(line, IntentLine { from, to });
        line
    }

    fn release_intent_line(&mut self, line: IntentLineId) -> Result<(), StageError> {
        self.lines
            .remove(&line)
            .map(|_| ())
            .ok_or(StageError::UnknownIntentLine { line })
    }

    fn play(
        &mut self,
        unit: UnitId,
        clip: AnimationClip,
    ) -> LocalBoxFuture<'_, Result<(), StageError>> {
        let gate = self.gate.clone();
        async move {
            if let Some(gate) = gate {
                gate.wait().await;
            }
            self.apply_clip(unit, clip)
        }
        .boxed_local()
    }
}
