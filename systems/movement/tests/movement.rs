use futures::{
    executor::block_on,
    future::{self, FutureExt, LocalBoxFuture},
};
use glam::{Quat, Vec3};
use tactica_core::{
    AnimationClip, CellCoord, CommandError, GridPosition, IntentLineId, Stage, StageError,
    TrackProperty, UnitId, UnitPose,
};
use tactica_headless::{HeadlessStage, IntentLine};
use tactica_system_commander::Command;
use tactica_system_movement::{MoveCommand, MoveTiming};
use tactica_world::Grid;

const PAWN: UnitId = UnitId::new(1);
const EPSILON: f32 = 1e-4;

fn grid() -> Grid {
    Grid::new(12.0, 4).expect("grid")
}

fn cell(row: u32, column: u32) -> GridPosition {
    let grid = grid();
    grid.resolve(grid.resolve_world_position(CellCoord::new(row, column)))
}

fn stage_with_pawn() -> HeadlessStage {
    let mut stage = HeadlessStage::new();
    stage.place_unit(PAWN, UnitPose::at(Vec3::new(0.0, 1.0, 0.0)));
    stage
}

#[test]
fn creating_a_move_draws_an_intent_line_at_unit_height() {
    let mut stage = stage_with_pawn();
    let command = MoveCommand::new(&mut stage, PAWN, cell(0, 3), None, MoveTiming::default())
        .expect("pawn is on stage");

    let line = command.intent_line().expect("line spawned");
    assert_eq!(
        stage.intent_line(line),
        Some(IntentLine {
            from: Vec3::new(0.0, 1.0, 0.0),
            to: Vec3::new(4.5, 1.0, -4.5),
        })
    );
}

#[test]
fn chained_move_starts_its_line_at_the_previous_destination() {
    let mut stage = stage_with_pawn();
    let command = MoveCommand::new(
        &mut stage,
        PAWN,
        cell(3, 3),
        Some(cell(0, 3)),
        MoveTiming::default(),
    )
    .expect("pawn is on stage");

    let line = stage
        .intent_line(command.intent_line().expect("line spawned"))
        .expect("line drawn");
    assert!(line.from.abs_diff_eq(Vec3::new(4.5, 1.0, -4.5), EPSILON));
    assert!(line.to.abs_diff_eq(Vec3::new(4.5, 1.0, 4.5), EPSILON));
    assert_eq!(command.previous(), Some(cell(0, 3)));
}

#[test]
fn unknown_units_cannot_be_moved() {
    let mut stage = HeadlessStage::new();
    let error = MoveCommand::new(&mut stage, PAWN, cell(0, 0), None, MoveTiming::default())
        .expect_err("stage has no pawn");

    assert_eq!(error, CommandError::UnknownUnit { unit: PAWN });
    assert_eq!(stage.intent_line_count(), 0);
}

#[test]
fn execute_turns_then_walks_and_releases_the_line() {
    let mut stage = stage_with_pawn();
    let mut command =
        MoveCommand::new(&mut stage, PAWN, cell(1, 3), None, MoveTiming::default())
            .expect("pawn is on stage");

    block_on(command.execute(&mut stage)).expect("move succeeds");

    let playbacks = stage.playbacks();
    assert_eq!(playbacks.len(), 2, "a move plays a turn clip then a walk clip");
    assert_eq!(
        playbacks[0].clip().tracks()[0].property(),
        TrackProperty::Rotation
    );
    assert_eq!(
        playbacks[1].clip().tracks()[0].property(),
        TrackProperty::Position
    );

    let pose = stage.unit_pose(PAWN).expect("pawn pose");
    assert!(pose.position.abs_diff_eq(Vec3::new(4.5, 1.0, -1.5), EPSILON));
    let forward = (pose.rotation * Vec3::Z).normalize();
    let expected = Vec3::new(4.5, 0.0, -1.5).normalize();
    assert!(forward.abs_diff_eq(expected, EPSILON));

    assert_eq!(stage.intent_line_count(), 0);
    assert_eq!(command.intent_line(), None);
}

#[test]
fn walking_never_leaves_the_unit_plane() {
    let mut stage = stage_with_pawn();
    let mut command =
        MoveCommand::new(&mut stage, PAWN, cell(3, 0), None, MoveTiming::default())
            .expect("pawn is on stage");

    block_on(command.execute(&mut stage)).expect("move succeeds");

    for playback in stage.playbacks() {
        for sample in playback.samples() {
            assert!(
                (sample.position.y - 1.0).abs() < EPSILON,
                "unit height changed to {}",
                sample.position.y
            );
        }
    }
}

#[test]
fn moving_onto_the_current_cell_keeps_the_rotation() {
    let mut stage = HeadlessStage::new();
    let start = Quat::from_rotation_y(0.3);
    stage.place_unit(
        PAWN,
        UnitPose {
            position: Vec3::new(-4.5, 1.0, -4.5),
            rotation: start,
        },
    );
    let mut command =
        MoveCommand::new(&mut stage, PAWN, cell(0, 0), None, MoveTiming::default())
            .expect("pawn is on stage");

    block_on(command.execute(&mut stage)).expect("move succeeds");

    let pose = stage.unit_pose(PAWN).expect("pawn pose");
    assert!(pose.rotation.abs_diff_eq(start, EPSILON));
    assert!(pose.position.abs_diff_eq(Vec3::new(-4.5, 1.0, -4.5), EPSILON));
}

#[test]
fn abandoning_releases_the_line() {
    let mut stage = stage_with_pawn();
    let mut command =
        MoveCommand::new(&mut stage, PAWN, cell(2, 2), None, MoveTiming::default())
            .expect("pawn is on stage");
    assert_eq!(stage.intent_line_count(), 1);

    command.abandon(&mut stage);

    assert_eq!(stage.intent_line_count(), 0);
    assert!(stage.playbacks().is_empty());
}

#[test]
fn display_names_the_unit_and_destination() {
    let mut stage = stage_with_pawn();
    let command = MoveCommand::new(&mut stage, PAWN, cell(2, 1), None, MoveTiming::default())
        .expect("pawn is on stage");

    assert_eq!(
        command.to_string(),
        "MoveCommand(unit 1 -> (row 2, column 1))"
    );
}

/// Stage whose animation player always reports an interruption.
struct InterruptedStage(HeadlessStage);

impl Stage for InterruptedStage {
    fn unit_pose(&self, unit: UnitId) -> Option<UnitPose> {
        self.0.unit_pose(unit)
    }

    fn set_unit_pose(&mut self, unit: UnitId, pose: UnitPose) -> Result<(), StageError> {
        self.0.set_unit_pose(unit, pose)
    }

    fn set_highlight(&mut self, unit: UnitId, enabled: bool) -> Result<(), StageError> {
        self.0.set_highlight(unit, enabled)
    }

    fn spawn_intent_line(&mut self, from: Vec3, to: Vec3) -> IntentLineId {
        self.0.spawn_intent_line(from, to)
    }

    fn release_intent_line(&mut self, line: IntentLineId) -> Result<(), StageError> {
        self.0.release_intent_line(line)
    }

    fn play(
        &mut self,
        unit: UnitId,
        _clip: AnimationClip,
    ) -> LocalBoxFuture<'_, Result<(), StageError>> {
        future::ready(Err(StageError::PlaybackInterrupted { unit })).boxed_local()
    }
}

#[test]
fn failed_playback_still_releases_the_line() {
    let mut stage = InterruptedStage(stage_with_pawn());
    let mut command =
        MoveCommand::new(&mut stage, PAWN, cell(0, 3), None, MoveTiming::default())
            .expect("pawn is on stage");

    let error = block_on(command.execute(&mut stage)).expect_err("playback fails");

    assert_eq!(
        error,
        CommandError::Stage(StageError::PlaybackInterrupted { unit: PAWN })
    );
    assert_eq!(stage.0.intent_line_count(), 0);
}
