#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Tactica.

mod grid;
mod pickable;

use glam::Vec3;
use tactica_core::{Action, Diagnostics, Event, PickHit, PointerKind, UnitId, WELCOME_BANNER};

pub use grid::{CellResolution, Grid, HIGHLIGHT_LIFT};
pub use pickable::Pickable;

/// Preview visual of a unit's pending destination.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Ghost {
    visible: bool,
    position: Option<Vec3>,
}

impl Ghost {
    /// Reports whether the ghost is drawn.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// World position the ghost hovers over, `None` while it sits on the unit.
    #[must_use]
    pub const fn position(&self) -> Option<Vec3> {
        self.position
    }
}

/// Player-controllable piece occupying one grid cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    id: UnitId,
    name: String,
    selected: bool,
    ghost: Ghost,
}

impl Unit {
    fn new(id: UnitId, name: String) -> Self {
        Self {
            id,
            name,
            selected: false,
            ghost: Ghost::default(),
        }
    }

    /// Identifier of the unit.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Display name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reports whether the unit is selected.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.selected
    }

    /// Ghost attached to the unit.
    #[must_use]
    pub const fn ghost(&self) -> Ghost {
        self.ghost
    }

    pub(crate) fn select(&mut self, out_events: &mut Vec<Event>) -> bool {
        if self.selected {
            return false;
        }
        self.selected = true;
        self.ghost = Ghost {
            visible: true,
            position: None,
        };
        out_events.push(Event::UnitSelected { unit: self.id });
        out_events.push(Event::GhostShown {
            unit: self.id,
            at: None,
        });
        true
    }

    fn deselect(&mut self, out_events: &mut Vec<Event>) {
        if !self.selected {
            return;
        }
        self.selected = false;
        self.hide_ghost(out_events);
        out_events.push(Event::UnitDeselected { unit: self.id });
    }

    fn show_ghost(&mut self, at: Vec3, out_events: &mut Vec<Event>) {
        self.ghost = Ghost {
            visible: true,
            position: Some(at),
        };
        out_events.push(Event::GhostShown {
            unit: self.id,
            at: Some(at),
        });
    }

    fn hide_ghost(&mut self, out_events: &mut Vec<Event>) {
        if !self.ghost.visible {
            return;
        }
        self.ghost = Ghost::default();
        out_events.push(Event::GhostHidden { unit: self.id });
    }
}

/// Represents the authoritative Tactica world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    grid: Grid,
    units: Vec<Unit>,
    diagnostics: Diagnostics,
}

impl World {
    /// Creates a world around the provided grid with no units.
    #[must_use]
    pub fn new(grid: Grid, diagnostics: Diagnostics) -> Self {
        Self {
            banner: WELCOME_BANNER,
            grid,
            units: Vec::new(),
            diagnostics,
        }
    }

    fn unit_mut(&mut self, unit: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|candidate| candidate.id == unit)
    }

    fn dispatch_pointer(
        &mut self,
        kind: PointerKind,
        hit: Option<PickHit>,
        out_events: &mut Vec<Event>,
    ) {
        let Self {
            grid,
            units,
            diagnostics,
            ..
        } = self;

        let pickables = std::iter::once(grid as &mut dyn Pickable)
            .chain(units.iter_mut().map(|unit| unit as &mut dyn Pickable));

        for pickable in pickables {
            let point = hit
                .filter(|hit| hit.target == pickable.target())
                .map(|hit| hit.point);
            match (kind, point) {
                (PointerKind::Click, Some(point)) => {
                    pickable.picked(point, diagnostics, out_events);
                }
                (PointerKind::Click, None) => pickable.unpicked(diagnostics, out_events),
                (PointerKind::Move, Some(point)) => {
                    pickable.hovered(point, diagnostics, out_events);
                }
                (PointerKind::Move, None) => pickable.unhovered(diagnostics, out_events),
            }
        }
    }
}

/// Applies the provided action to the world, mutating state deterministically.
pub fn apply(world: &mut World, action: Action, out_events: &mut Vec<Event>) {
    match action {
        Action::SpawnUnit { unit, name } => {
            if world.units.iter().any(|candidate| candidate.id == unit) {
                log::warn!("ignoring spawn of {unit}: identifier already in use");
                return;
            }
            world.units.push(Unit::new(unit, name));
            out_events.push(Event::UnitSpawned { unit });
        }
        Action::TransformGrid { transform } => match world.grid.set_transform(transform) {
            Ok(()) => out_events.push(Event::GridTransformed),
            Err(error) => log::warn!("ignoring grid transform: {error}"),
        },
        Action::Pointer { kind, hit } => world.dispatch_pointer(kind, hit, out_events),
        Action::SelectUnit { unit } => {
            let diagnostics = world.diagnostics.clone();
            if let Some(target) = world.unit_mut(unit) {
                if target.select(out_events) {
                    diagnostics.emit(format_args!("Selected {}", target.name()));
                }
            }
        }
        Action::DeselectUnit { unit } => {
            if let Some(target) = world.unit_mut(unit) {
                target.deselect(out_events);
            }
        }
        Action::ShowGhost { unit, at } => {
            if let Some(target) = world.unit_mut(unit) {
                target.show_ghost(at, out_events);
            }
        }
        Action::HideGhost { unit } => {
            if let Some(target) = world.unit_mut(unit) {
                target.hide_ghost(out_events);
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use tactica_core::UnitId;

    use super::{Grid, Unit, World};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Provides read-only access to the grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Units in registration order.
    #[must_use]
    pub fn units(world: &World) -> &[Unit] {
        &world.units
    }

    /// Looks up a single unit.
    #[must_use]
    pub fn unit(world: &World, unit: UnitId) -> Option<&Unit> {
        world.units.iter().find(|candidate| candidate.id() == unit)
    }

    /// Identifiers of every selected unit, in registration order.
    #[must_use]
    pub fn selected_units(world: &World) -> Vec<UnitId> {
        world
            .units
            .iter()
            .filter(|unit| unit.is_selected())
            .map(Unit::id)
            .collect()
    }
}
