use std::{
    cell::RefCell,
    fmt,
    rc::Rc,
    task::{Context, Poll},
};

use futures::{
    executor::block_on,
    future::{FutureExt, LocalBoxFuture},
    task::noop_waker_ref,
};
use glam::Vec3;
use tactica_core::{
    CellCoord, CommandError, Diagnostics, GridPosition, OnScreenLog, Stage, TurnError, TurnState,
    UnitId, UnitPose,
};
use tactica_headless::HeadlessStage;
use tactica_system_commander::Command;
use tactica_system_movement::{MoveCommand, MoveTiming};
use tactica_system_turn::{AdvanceError, EndTurn, TurnStateMachine};
use tactica_world::Grid;

const PAWN: UnitId = UnitId::new(1);

fn stage_with_pawn() -> HeadlessStage {
    let mut stage = HeadlessStage::new();
    stage.place_unit(PAWN, UnitPose::at(Vec3::new(0.0, 1.0, 0.0)));
    stage
}

fn cell(row: u32, column: u32) -> GridPosition {
    let grid = Grid::new(12.0, 4).expect("grid");
    grid.resolve(grid.resolve_world_position(CellCoord::new(row, column)))
}

fn move_to(stage: &mut HeadlessStage, row: u32, column: u32) -> Box<dyn Command> {
    Box::new(
        MoveCommand::new(stage, PAWN, cell(row, column), None, MoveTiming::default())
            .expect("pawn is on stage"),
    )
}

fn record_states(machine: &mut TurnStateMachine) -> Rc<RefCell<Vec<TurnState>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _ = machine.subscribe(move |state| sink.borrow_mut().push(*state));
    seen
}

struct Broken;

impl fmt::Display for Broken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Broken")
    }
}

impl Command for Broken {
    fn execute<'a>(
        &'a mut self,
        _stage: &'a mut dyn Stage,
    ) -> LocalBoxFuture<'a, Result<(), CommandError>> {
        async { Err(CommandError::UnknownUnit { unit: PAWN }) }.boxed_local()
    }
}

#[test]
fn machine_starts_in_plan() {
    let machine = TurnStateMachine::new(Diagnostics::disabled());
    assert_eq!(machine.state(), TurnState::Plan);
    assert!(machine.queue().is_empty());
}

#[test]
fn requesting_the_current_state_is_rejected() {
    let mut machine = TurnStateMachine::new(Diagnostics::disabled());
    let seen = record_states(&mut machine);

    let error = machine
        .request_transition(TurnState::Plan)
        .expect_err("already planning");

    assert_eq!(
        error,
        TurnError::AlreadyInState {
            state: TurnState::Plan
        }
    );
    assert_eq!(machine.state(), TurnState::Plan);
    assert!(seen.borrow().is_empty(), "rejected requests must not notify");
}

#[test]
fn entering_resolve_notifies_observers_in_registration_order() {
    let mut machine = TurnStateMachine::new(Diagnostics::disabled());
    let order = Rc::new(RefCell::new(Vec::new()));
    for name in ["mover", "hud"] {
        let order = Rc::clone(&order);
        let _ = machine.subscribe(move |state| order.borrow_mut().push((name, *state)));
    }

    let _pass = machine
        .request_transition(TurnState::Resolve)
        .expect("plan to resolve is legal");

    assert_eq!(machine.state(), TurnState::Resolve);
    assert_eq!(
        *order.borrow(),
        vec![("mover", TurnState::Resolve), ("hud", TurnState::Resolve)]
    );
}

#[test]
fn players_cannot_skip_the_resolve_phase() {
    let mut machine = TurnStateMachine::new(Diagnostics::disabled());
    let _pass = machine
        .request_transition(TurnState::Resolve)
        .expect("plan to resolve is legal");

    assert_eq!(
        machine.request_transition(TurnState::Plan).expect_err("drain owns this edge"),
        TurnError::IllegalTransition {
            from: TurnState::Resolve,
            to: TurnState::Plan,
        }
    );
    assert_eq!(
        machine
            .request_transition(TurnState::Resolve)
            .expect_err("already resolving"),
        TurnError::AlreadyInState {
            state: TurnState::Resolve
        }
    );
    assert_eq!(machine.state(), TurnState::Resolve);
}

#[test]
fn finishing_outside_resolve_is_rejected() {
    let mut stage = stage_with_pawn();
    let mut other = TurnStateMachine::new(Diagnostics::disabled());
    let pass = other
        .request_transition(TurnState::Resolve)
        .expect("plan to resolve is legal");
    let resolved = block_on(pass.run(&mut stage));

    let mut machine = TurnStateMachine::new(Diagnostics::disabled());
    let error = machine
        .finish_resolve(resolved)
        .expect_err("machine is still planning");

    assert!(matches!(
        error,
        AdvanceError::Turn(TurnError::AlreadyInState {
            state: TurnState::Plan
        })
    ));
}

#[test]
fn a_pass_that_never_ran_keeps_the_turn_resolving() {
    let mut stage = stage_with_pawn();
    let mut machine = TurnStateMachine::new(Diagnostics::disabled());
    let seen = record_states(&mut machine);
    let pending = move_to(&mut stage, 0, 3);
    machine.queue_mut().enqueue(pending);

    let pass = machine
        .request_transition(TurnState::Resolve)
        .expect("plan to resolve is legal");
    assert_eq!(pass.len(), 1);
    drop(pass);

    assert_eq!(machine.state(), TurnState::Resolve);
    assert!(matches!(machine.end_turn(), EndTurn::StillResolving));
    assert!(machine.request_transition(TurnState::Plan).is_err());
    assert_eq!(*seen.borrow(), vec![TurnState::Resolve]);
    let pose = stage.unit_pose(PAWN).expect("pawn pose");
    assert_eq!(pose.position, Vec3::new(0.0, 1.0, 0.0));
}

#[test]
fn unsubscribed_observers_miss_later_turns() {
    let mut stage = stage_with_pawn();
    let mut machine = TurnStateMachine::new(Diagnostics::disabled());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let id = machine.subscribe(move |state| sink.borrow_mut().push(*state));

    let _ = block_on(machine.advance(&mut stage)).expect("empty turn");
    assert!(machine.unsubscribe(id));
    let _ = block_on(machine.advance(&mut stage)).expect("empty turn");

    assert_eq!(*seen.borrow(), vec![TurnState::Resolve, TurnState::Plan]);
}

#[test]
fn advance_runs_the_queue_and_returns_to_plan() {
    let mut stage = stage_with_pawn();
    let mut machine = TurnStateMachine::new(Diagnostics::disabled());
    let seen = record_states(&mut machine);

    let first = move_to(&mut stage, 0, 3);
    let second = move_to(&mut stage, 3, 3);
    machine.queue_mut().enqueue(first);
    machine.queue_mut().enqueue(second);

    let report = block_on(machine.advance(&mut stage)).expect("turn resolves");

    assert_eq!(report.executed(), 2);
    assert_eq!(machine.state(), TurnState::Plan);
    assert!(machine.queue().is_empty());
    assert_eq!(*seen.borrow(), vec![TurnState::Resolve, TurnState::Plan]);
    let pose = stage.unit_pose(PAWN).expect("pawn pose");
    assert!(pose.position.abs_diff_eq(Vec3::new(4.5, 1.0, 4.5), 1e-4));
    assert_eq!(stage.intent_line_count(), 0);
}

#[test]
fn failed_turn_still_returns_to_plan() {
    let mut stage = stage_with_pawn();
    let mut machine = TurnStateMachine::new(Diagnostics::disabled());
    let pending = move_to(&mut stage, 1, 1);
    machine.queue_mut().enqueue(Box::new(Broken));
    machine.queue_mut().enqueue(pending);

    let error = block_on(machine.advance(&mut stage)).expect_err("first command fails");

    let AdvanceError::Drain(drain) = error else {
        panic!("expected a drain failure");
    };
    assert_eq!(drain.command(), "Broken");
    assert_eq!(drain.abandoned(), 1);
    assert_eq!(machine.state(), TurnState::Plan);
    assert_eq!(
        stage.intent_line_count(),
        0,
        "abandoned moves must release their lines"
    );
}

#[test]
fn end_turn_while_resolving_is_ignored() {
    let log = Rc::new(OnScreenLog::default());
    let mut machine = TurnStateMachine::new(Diagnostics::new(log.clone()));

    let EndTurn::Resolve(pass) = machine.end_turn() else {
        panic!("first press must start resolving");
    };
    assert!(pass.is_empty());
    assert!(matches!(machine.end_turn(), EndTurn::StillResolving));
    assert_eq!(machine.state(), TurnState::Resolve);
    assert!(log.contains("Still resolving..."));
}

#[test]
fn machine_stays_usable_while_a_pass_is_in_flight() {
    let mut stage = stage_with_pawn();
    let gate = stage.hold_playback();
    let mut machine = TurnStateMachine::new(Diagnostics::disabled());
    let seen = record_states(&mut machine);

    let first = move_to(&mut stage, 0, 3);
    let late = move_to(&mut stage, 0, 0);
    machine.queue_mut().enqueue(first);

    let EndTurn::Resolve(pass) = machine.end_turn() else {
        panic!("plan phase must accept End Turn");
    };
    assert_eq!(pass.len(), 1);

    let mut cx = Context::from_waker(noop_waker_ref());
    let resolved = {
        let mut running = pass.run(&mut stage).boxed_local();
        assert!(running.as_mut().poll(&mut cx).is_pending());

        assert_eq!(machine.state(), TurnState::Resolve);
        assert!(matches!(machine.end_turn(), EndTurn::StillResolving));
        assert!(machine.request_transition(TurnState::Plan).is_err());
        machine.queue_mut().enqueue(late);
        assert_eq!(machine.queue().len(), 1);

        gate.open();
        let Poll::Ready(resolved) = running.as_mut().poll(&mut cx) else {
            panic!("pass must finish once playback is released");
        };
        resolved
    };
    assert!(resolved.succeeded());

    let report = machine.finish_resolve(resolved).expect("resolve to plan");
    assert_eq!(report.executed(), 1);
    assert_eq!(machine.state(), TurnState::Plan);
    assert_eq!(*seen.borrow(), vec![TurnState::Resolve, TurnState::Plan]);
    assert_eq!(
        machine.queue().labels(),
        vec!["MoveCommand(unit 1 -> (row 0, column 0))".to_owned()],
        "commands queued mid-pass wait for the next turn"
    );

    let second = block_on(machine.advance(&mut stage)).expect("second turn");
    assert_eq!(second.executed(), 1);
    let pose = stage.unit_pose(PAWN).expect("pawn pose");
    assert!(pose.position.abs_diff_eq(Vec3::new(-4.5, 1.0, -4.5), 1e-4));
}
