#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tactica engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and the turn systems. Adapters submit [`Action`]
//! values describing pointer input and desired world mutations, the world
//! executes those actions via its `apply` entry point, and then broadcasts
//! [`Event`] values for systems to react to. Systems respond with new action
//! batches or queue asynchronous turn commands that run against a [`Stage`]
//! once the turn resolves.
//!
//! Rendering, picking and diagnostics are collaborators expressed as traits
//! ([`Stage`], [`PickingService`], [`DiagnosticSink`]) so that the game core
//! never reaches into a particular engine.

pub mod animation;
pub mod diagnostics;
pub mod observers;
pub mod stage;

use std::fmt;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

pub use self::animation::{
    AnimationClip, AnimationTrack, Easing, FrameRange, Keyframe, TrackProperty, TrackValue,
};
pub use self::diagnostics::{DiagnosticSink, Diagnostics, FanOut, LogSink, OnScreenLog};
pub use self::observers::{Observers, SubscriptionId};
pub use self::stage::{IntentLineId, PickHit, PickTarget, PickingService, Stage, UnitPose};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Tactica.";

/// Phases of a single turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnState {
    /// Players select units and queue commands.
    Plan,
    /// Queued commands execute in order.
    Resolve,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan => write!(f, "Plan"),
            Self::Resolve => write!(f, "Resolve"),
        }
    }
}

/// Unique identifier assigned to a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit {}", self.0)
    }
}

/// Location of a single grid cell expressed as row and column indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    row: u32,
    column: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the cell, measured along the grid's local z axis.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the cell, measured along the grid's local x axis.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Result of resolving a pick point against the grid.
///
/// Created fresh on every pick or hover; two positions are equal when every
/// component is equal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridPosition {
    cell: CellCoord,
    world_position: Vec3,
    normalised_world_position: Vec3,
    local_position: Vec3,
}

impl GridPosition {
    /// Creates a new grid position from its resolved components.
    #[must_use]
    pub const fn new(
        cell: CellCoord,
        world_position: Vec3,
        normalised_world_position: Vec3,
        local_position: Vec3,
    ) -> Self {
        Self {
            cell,
            world_position,
            normalised_world_position,
            local_position,
        }
    }

    /// Cell that contains the pick point, clamped to the grid.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Row index of the resolved cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.cell.row()
    }

    /// Column index of the resolved cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.cell.column()
    }

    /// Raw world-space point that was picked.
    #[must_use]
    pub const fn world_position(&self) -> Vec3 {
        self.world_position
    }

    /// Centre of the resolved cell expressed in world space.
    #[must_use]
    pub const fn normalised_world_position(&self) -> Vec3 {
        self.normalised_world_position
    }

    /// Pick point expressed in the grid's local frame.
    #[must_use]
    pub const fn local_position(&self) -> Vec3 {
        self.local_position
    }
}

/// Kind of pointer interaction reported by an adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerKind {
    /// The pointer was clicked.
    Click,
    /// The pointer moved.
    Move,
}

/// Actions that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Registers a new unit with the world.
    SpawnUnit {
        /// Identifier allocated to the unit by the caller.
        unit: UnitId,
        /// Display name used in diagnostics.
        name: String,
    },
    /// Replaces the grid's world transform.
    TransformGrid {
        /// New world transform of the grid plane.
        transform: Mat4,
    },
    /// Dispatches a pointer interaction to every pickable in the world.
    Pointer {
        /// Whether the pointer clicked or moved.
        kind: PointerKind,
        /// Result of the picking query under the pointer, if anything was hit.
        hit: Option<PickHit>,
    },
    /// Marks a unit as selected.
    SelectUnit {
        /// Unit to select.
        unit: UnitId,
    },
    /// Clears a unit's selection.
    DeselectUnit {
        /// Unit to deselect.
        unit: UnitId,
    },
    /// Shows the unit's ghost at the provided world position.
    ShowGhost {
        /// Unit owning the ghost.
        unit: UnitId,
        /// World position the ghost should hover over.
        at: Vec3,
    },
    /// Hides the unit's ghost.
    HideGhost {
        /// Unit owning the ghost.
        unit: UnitId,
    },
}

/// Events broadcast by the world and the turn state machine.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a unit joined the world.
    UnitSpawned {
        /// Identifier of the new unit.
        unit: UnitId,
    },
    /// Announces that a unit became selected.
    UnitSelected {
        /// Unit that is now selected.
        unit: UnitId,
    },
    /// Announces that a previously selected unit was deselected.
    UnitDeselected {
        /// Unit that is no longer selected.
        unit: UnitId,
    },
    /// Reports that a grid cell was clicked.
    CellPicked {
        /// Resolved position of the click.
        position: GridPosition,
    },
    /// Reports that the pointer hovers a grid cell.
    CellHovered {
        /// Resolved position under the pointer.
        position: GridPosition,
    },
    /// Reports that the pointer left the grid.
    CellUnhovered,
    /// Confirms that a unit's ghost moved or became visible.
    GhostShown {
        /// Unit owning the ghost.
        unit: UnitId,
        /// World position of the ghost, `None` when it sits on the unit itself.
        at: Option<Vec3>,
    },
    /// Confirms that a unit's ghost was hidden.
    GhostHidden {
        /// Unit owning the ghost.
        unit: UnitId,
    },
    /// Confirms that the grid's world transform changed.
    GridTransformed,
    /// Announces that the turn entered a new phase.
    TurnStateChanged {
        /// Phase that became active.
        state: TurnState,
    },
}

/// Reasons a turn transition request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum TurnError {
    /// The requested state is already active.
    #[error("already in {state} state")]
    AlreadyInState {
        /// State that is currently active.
        state: TurnState,
    },
    /// The transition table has no edge the caller may take.
    #[error("cannot transition from state {from} to {to}")]
    IllegalTransition {
        /// State that is currently active.
        from: TurnState,
        /// State that was requested.
        to: TurnState,
    },
}

/// Failures reported by a [`Stage`] implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum StageError {
    /// The stage holds no mesh for the unit.
    #[error("stage has no mesh for {unit}")]
    UnknownUnit {
        /// Unit that could not be found.
        unit: UnitId,
    },
    /// The intent line was never spawned or was already released.
    #[error("intent line {line} is not on stage")]
    UnknownIntentLine {
        /// Handle that could not be found.
        line: IntentLineId,
    },
    /// Playback stopped before reaching the end of the clip.
    #[error("animation on {unit} was interrupted")]
    PlaybackInterrupted {
        /// Unit whose animation stopped early.
        unit: UnitId,
    },
}

/// Failures raised while building or executing a turn command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The command targets a unit the stage does not know about.
    #[error("{unit} is not on stage")]
    UnknownUnit {
        /// Unit that could not be found.
        unit: UnitId,
    },
    /// The stage rejected an operation requested by the command.
    #[error(transparent)]
    Stage(#[from] StageError),
}

/// Reasons a grid description may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum GridError {
    /// A grid needs at least one subdivision per axis.
    #[error("grid subdivisions must be positive")]
    ZeroSubdivisions,
    /// The grid extent must be a positive, finite number.
    #[error("grid size must be positive and finite (received {size})")]
    InvalidSize {
        /// Size that failed validation.
        size: f32,
    },
    /// The grid transform cannot be inverted, so pick points cannot be
    /// mapped back into the grid's local frame.
    #[error("grid transform is not invertible")]
    SingularTransform,
}
