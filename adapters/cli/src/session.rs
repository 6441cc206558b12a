//! Wires the world, the turn systems and the headless stage into a session
//! that can be driven by scripted pointer input.

use std::{cell::RefCell, rc::Rc};

use anyhow::{Context, Result};
use glam::{Vec2, Vec3};
use tactica_core::{
    Action, DiagnosticSink, Diagnostics, Event, FanOut, LogSink, OnScreenLog, PickingService,
    PointerKind, Stage, TurnState, UnitId, UnitPose,
};
use tactica_headless::{HeadlessStage, TopDownPicker};
use tactica_system_commander::DrainReport;
use tactica_system_mover::Mover;
use tactica_system_turn::{EndTurn, TurnStateMachine};
use tactica_world::{apply, query, Grid, World};

use crate::config::{ScriptStep, SessionConfig};

/// Interactive game session running on the headless stage.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    turn: TurnStateMachine,
    mover: Mover,
    stage: HeadlessStage,
    mailbox: Rc<RefCell<Vec<Event>>>,
    log: Rc<OnScreenLog>,
}

impl Session {
    /// Builds the scene described by `config`.
    pub(crate) fn new(config: &SessionConfig) -> Result<Self> {
        config.validate()?;

        let log = Rc::new(OnScreenLog::with_capacity(config.diagnostics.on_screen_lines));
        let sinks: Vec<Rc<dyn DiagnosticSink>> = vec![log.clone(), Rc::new(LogSink)];
        let diagnostics = Diagnostics::new(Rc::new(FanOut::new(sinks)));

        let grid = Grid::new(config.grid.size, config.grid.subdivisions)
            .context("failed to build the grid")?;
        let world = World::new(grid, diagnostics.clone());

        let mailbox = Rc::new(RefCell::new(Vec::new()));
        let mut turn = TurnStateMachine::new(diagnostics.clone());
        let inbox = Rc::clone(&mailbox);
        let _ = turn.subscribe(move |state: &TurnState| {
            inbox
                .borrow_mut()
                .push(Event::TurnStateChanged { state: *state });
        });

        let mut session = Self {
            world,
            turn,
            mover: Mover::new(config.move_timing(), diagnostics),
            stage: HeadlessStage::new(),
            mailbox,
            log,
        };

        let mut actions = vec![Action::TransformGrid {
            transform: config.grid_transform(),
        }];
        for (index, unit) in config.units.iter().enumerate() {
            let id = UnitId::new(u32::try_from(index + 1).context("too many units")?);
            session
                .stage
                .place_unit(id, UnitPose::at(Vec3::from(unit.position)));
            actions.push(Action::SpawnUnit {
                unit: id,
                name: unit.name.clone(),
            });
        }
        session.dispatch(actions);

        Ok(session)
    }

    /// Read-only view of the world.
    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    /// Stage holding unit poses and transient visuals.
    pub(crate) fn stage(&self) -> &HeadlessStage {
        &self.stage
    }

    /// Lines currently shown by the on-screen log.
    pub(crate) fn log_lines(&self) -> Vec<String> {
        self.log.lines()
    }

    /// Plays a script step by step.
    pub(crate) async fn run_script(&mut self, steps: &[ScriptStep]) -> Result<()> {
        for (index, step) in steps.iter().enumerate() {
            log::debug!("script step {index}: {step:?}");
            match step {
                ScriptStep::Click { pointer } => self.click(Vec2::from(*pointer)),
                ScriptStep::Hover { pointer } => self.hover(Vec2::from(*pointer)),
                ScriptStep::EndTurn => {
                    let _ = self
                        .end_turn()
                        .await
                        .with_context(|| format!("script step {index} failed to end the turn"))?;
                }
            }
        }
        Ok(())
    }

    /// Clicks at a top-down pointer position.
    pub(crate) fn click(&mut self, pointer: Vec2) {
        self.pointer(PointerKind::Click, pointer);
    }

    /// Moves the pointer to a top-down position.
    pub(crate) fn hover(&mut self, pointer: Vec2) {
        self.pointer(PointerKind::Move, pointer);
    }

    /// Presses End Turn and resolves the queued commands.
    ///
    /// Returns `None` when a previous turn was still resolving.
    pub(crate) async fn end_turn(&mut self) -> Result<Option<DrainReport>> {
        let pass = match self.turn.end_turn() {
            EndTurn::Resolve(pass) => pass,
            EndTurn::StillResolving => return Ok(None),
        };
        self.dispatch(Vec::new());

        let resolved = pass.run(&mut self.stage).await;
        let outcome = self.turn.finish_resolve(resolved);
        self.dispatch(Vec::new());

        Ok(Some(outcome.context("turn resolved with a failed command")?))
    }

    fn pointer(&mut self, kind: PointerKind, pointer: Vec2) {
        let hit = TopDownPicker::new(&self.stage, query::grid(&self.world)).pick(pointer);
        self.dispatch(vec![Action::Pointer { kind, hit }]);
    }

    /// Applies actions and feeds the resulting events to the systems until no
    /// system has anything left to say.
    fn dispatch(&mut self, mut actions: Vec<Action>) {
        loop {
            let mut events = Vec::new();
            for action in actions.drain(..) {
                apply(&mut self.world, action, &mut events);
            }
            events.append(&mut self.mailbox.borrow_mut());
            if events.is_empty() {
                break;
            }

            self.sync_stage(&events);
            self.mover.handle(
                &events,
                &mut self.stage,
                self.turn.queue_mut(),
                &mut actions,
            );
        }
    }

    fn sync_stage(&mut self, events: &[Event]) {
        for event in events {
            let (unit, enabled) = match event {
                Event::UnitSelected { unit } => (*unit, true),
                Event::UnitDeselected { unit } => (*unit, false),
                _ => continue,
            };
            if let Err(error) = self.stage.set_highlight(unit, enabled) {
                log::warn!("cannot update the highlight of {unit}: {error}");
            }
        }
    }
}
