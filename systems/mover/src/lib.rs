#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Selection orchestrator that turns grid clicks into queued moves.

use glam::Vec3;
use tactica_core::{Action, Diagnostics, Event, GridPosition, Stage, TurnState, UnitId};
use tactica_system_commander::CommandQueue;
use tactica_system_movement::{MoveCommand, MoveTiming};

/// Tracks the selected unit and queues a move for every grid click.
///
/// Consecutive clicks chain: each new move starts where the previously
/// queued move of the same selection ends.
#[derive(Debug)]
pub struct Mover {
    tracked: Vec<UnitId>,
    current: Option<UnitId>,
    previous: Option<GridPosition>,
    timing: MoveTiming,
    diagnostics: Diagnostics,
}

impl Mover {
    /// Creates a mover that builds moves with the provided timing.
    #[must_use]
    pub fn new(timing: MoveTiming, diagnostics: Diagnostics) -> Self {
        Self {
            tracked: Vec::new(),
            current: None,
            previous: None,
            timing,
            diagnostics,
        }
    }

    /// Registers units whose selection the mover coordinates.
    pub fn track_units<I>(&mut self, units: I)
    where
        I: IntoIterator<Item = UnitId>,
    {
        for unit in units {
            if !self.tracked.contains(&unit) {
                self.tracked.push(unit);
            }
        }
    }

    /// Units the mover coordinates, in registration order.
    #[must_use]
    pub fn tracked(&self) -> &[UnitId] {
        &self.tracked
    }

    /// Unit that clicks on the grid currently move.
    #[must_use]
    pub const fn current(&self) -> Option<UnitId> {
        self.current
    }

    /// Destination of the most recently queued move for the current selection.
    #[must_use]
    pub const fn previous(&self) -> Option<GridPosition> {
        self.previous
    }

    /// Consumes world and turn events, queues moves and emits follow-up world
    /// actions.
    pub fn handle(
        &mut self,
        events: &[Event],
        stage: &mut dyn Stage,
        queue: &mut CommandQueue,
        out: &mut Vec<Action>,
    ) {
        for event in events {
            match event {
                Event::UnitSpawned { unit } => self.track_units([*unit]),
                Event::UnitSelected { unit } => self.on_selected(*unit, out),
                Event::UnitDeselected { unit } => {
                    if self.current == Some(*unit) {
                        self.current = None;
                        self.previous = None;
                    }
                }
                Event::CellPicked { position } => self.on_cell_picked(*position, stage, queue),
                Event::CellHovered { position } => {
                    if let Some(unit) = self.current {
                        let height = stage
                            .unit_pose(unit)
                            .map_or(0.0, |pose| pose.position.y);
                        let snapped = position.normalised_world_position();
                        out.push(Action::ShowGhost {
                            unit,
                            at: Vec3::new(snapped.x, height, snapped.z),
                        });
                    }
                }
                Event::CellUnhovered => {
                    if let Some(unit) = self.current {
                        out.push(Action::HideGhost { unit });
                    }
                }
                Event::TurnStateChanged {
                    state: TurnState::Resolve,
                } => {
                    self.current = None;
                    self.previous = None;
                    out.extend(
                        self.tracked
                            .iter()
                            .map(|unit| Action::DeselectUnit { unit: *unit }),
                    );
                }
                Event::TurnStateChanged {
                    state: TurnState::Plan,
                }
                | Event::GhostShown { .. }
                | Event::GhostHidden { .. }
                | Event::GridTransformed => {}
            }
        }
    }

    fn on_selected(&mut self, unit: UnitId, out: &mut Vec<Action>) {
        self.track_units([unit]);
        self.current = Some(unit);
        self.previous = None;
        out.extend(
            self.tracked
                .iter()
                .filter(|other| **other != unit)
                .map(|other| Action::DeselectUnit { unit: *other }),
        );
    }

    fn on_cell_picked(
        &mut self,
        position: GridPosition,
        stage: &mut dyn Stage,
        queue: &mut CommandQueue,
    ) {
        let Some(unit) = self.current else {
            self.diagnostics.emit(format_args!("No selected units"));
            return;
        };

        match MoveCommand::new(stage, unit, position, self.previous, self.timing) {
            Ok(command) => {
                queue.enqueue(Box::new(command));
                self.previous = Some(position);
            }
            Err(error) => log::warn!("cannot move {unit}: {error}"),
        }
    }
}
