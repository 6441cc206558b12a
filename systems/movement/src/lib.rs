#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turn command that walks a unit from one grid cell to another.

use std::fmt;

use futures::future::{FutureExt, LocalBoxFuture};
use glam::{Mat3, Quat, Vec3};
use tactica_core::{
    animation::DEFAULT_FRAME_RATE, AnimationClip, AnimationTrack, CommandError, Easing,
    FrameRange, GridPosition, IntentLineId, Stage, UnitId,
};
use tactica_system_commander::Command;

/// Overshoot used by the default move easing.
pub const DEFAULT_BACK_AMPLITUDE: f32 = 0.5;

/// Frames spent on each phase of a move unless configured otherwise.
pub const DEFAULT_MOVE_FRAMES: u32 = 60;

/// Playback settings shared by the turn and walk phases of a move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveTiming {
    /// Frames played per second.
    pub frame_rate: u32,
    /// Frames per phase.
    pub frames: u32,
    /// Easing applied to both phases.
    pub easing: Easing,
}

impl MoveTiming {
    fn range(&self) -> FrameRange {
        FrameRange::new(0, self.frames)
    }
}

impl Default for MoveTiming {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            frames: DEFAULT_MOVE_FRAMES,
            easing: Easing::BackInOut {
                amplitude: DEFAULT_BACK_AMPLITUDE,
            },
        }
    }
}

/// Orientation whose local +Z axis points from `from` towards `to`, keeping
/// the local +Y axis as close to world up as possible.
///
/// Returns `None` when the two points coincide or `to` lies straight above or
/// below `from`.
#[must_use]
pub fn facing_towards(from: Vec3, to: Vec3) -> Option<Quat> {
    let forward = (to - from).try_normalize()?;
    let right = Vec3::Y.cross(forward).try_normalize()?;
    let up = forward.cross(right);
    Some(Quat::from_mat3(&Mat3::from_cols(right, up, forward)).normalize())
}

/// Moves a unit to the centre of a grid cell: first turns it to face the
/// destination, then walks it there.
///
/// The command draws an intent line from its start to its destination when it
/// is created and removes it once it finishes, fails or is abandoned.
#[derive(Debug)]
pub struct MoveCommand {
    unit: UnitId,
    destination: GridPosition,
    previous: Option<GridPosition>,
    timing: MoveTiming,
    line: Option<IntentLineId>,
}

impl MoveCommand {
    /// Creates a move and draws its intent line.
    ///
    /// The line starts at `previous` when the move continues a chain, otherwise
    /// at the unit's current position. Both ends sit at the unit's height.
    pub fn new(
        stage: &mut dyn Stage,
        unit: UnitId,
        destination: GridPosition,
        previous: Option<GridPosition>,
        timing: MoveTiming,
    ) -> Result<Self, CommandError> {
        let pose = stage
            .unit_pose(unit)
            .ok_or(CommandError::UnknownUnit { unit })?;
        let height = pose.position.y;
        let start = previous.map_or(pose.position, |previous| {
            at_height(previous.normalised_world_position(), height)
        });
        let end = at_height(destination.normalised_world_position(), height);
        let line = stage.spawn_intent_line(start, end);

        Ok(Self {
            unit,
            destination,
            previous,
            timing,
            line: Some(line),
        })
    }

    /// Unit being moved.
    #[must_use]
    pub const fn unit(&self) -> UnitId {
        self.unit
    }

    /// Cell the unit walks to.
    #[must_use]
    pub const fn destination(&self) -> GridPosition {
        self.destination
    }

    /// Destination of the move queued before this one for the same unit.
    #[must_use]
    pub const fn previous(&self) -> Option<GridPosition> {
        self.previous
    }

    /// Intent line owned by the command, until it is released.
    #[must_use]
    pub const fn intent_line(&self) -> Option<IntentLineId> {
        self.line
    }

    async fn walk(&mut self, stage: &mut dyn Stage) -> Result<(), CommandError> {
        let unit = self.unit;
        let range = self.timing.range();
        let pose = stage
            .unit_pose(unit)
            .ok_or(CommandError::UnknownUnit { unit })?;
        let target = at_height(self.destination.normalised_world_position(), pose.position.y);
        let facing = facing_towards(pose.position, target).unwrap_or(pose.rotation);

        let rotate = AnimationClip::new(
            self.timing.frame_rate,
            range,
            vec![AnimationTrack::rotation(
                "rotate",
                pose.rotation,
                facing,
                range,
                self.timing.easing,
            )],
        );
        stage.play(unit, rotate).await?;

        let start = stage
            .unit_pose(unit)
            .ok_or(CommandError::UnknownUnit { unit })?
            .position;
        let translate = AnimationClip::new(
            self.timing.frame_rate,
            range,
            vec![AnimationTrack::position(
                "move",
                start,
                target,
                range,
                self.timing.easing,
            )],
        );
        stage.play(unit, translate).await?;
        Ok(())
    }

    fn release_line(&mut self, stage: &mut dyn Stage) -> Result<(), CommandError> {
        match self.line.take() {
            Some(line) => stage.release_intent_line(line).map_err(CommandError::from),
            None => Ok(()),
        }
    }
}

impl Command for MoveCommand {
    fn execute<'a>(
        &'a mut self,
        stage: &'a mut dyn Stage,
    ) -> LocalBoxFuture<'a, Result<(), CommandError>> {
        async move {
            let walked = self.walk(&mut *stage).await;
            let released = self.release_line(stage);
            walked.and(released)
        }
        .boxed_local()
    }

    fn abandon(&mut self, stage: &mut dyn Stage) {
        if let Err(error) = self.release_line(stage) {
            log::warn!("{} could not release its intent line: {error}", self);
        }
    }
}

impl fmt::Display for MoveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MoveCommand({} -> (row {}, column {}))",
            self.unit,
            self.destination.row(),
            self.destination.column()
        )
    }
}

fn at_height(point: Vec3, height: f32) -> Vec3 {
    Vec3::new(point.x, height, point.z)
}
