//! Collaborator contracts implemented by rendering adapters.

use std::fmt;

use futures::future::LocalBoxFuture;
use glam::{Quat, Vec2, Vec3};

use crate::{AnimationClip, StageError, UnitId};

/// Position and orientation of a unit's mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitPose {
    /// World-space position of the mesh origin.
    pub position: Vec3,
    /// World-space orientation of the mesh.
    pub rotation: Quat,
}

impl UnitPose {
    /// Creates a pose at `position` with the identity orientation.
    #[must_use]
    pub const fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Handle to a transient intent line drawn by the stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntentLineId(u32);

impl IntentLineId {
    /// Creates a new handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for IntentLineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Rendering collaborator that owns unit meshes, transient visuals and
/// animation playback.
///
/// Turn commands borrow the stage for the duration of their execution. The
/// future returned by [`Stage::play`] resolves once every track in the clip
/// reached the end of the clip's frame range.
pub trait Stage {
    /// Current pose of the unit's mesh, if the unit is on stage.
    fn unit_pose(&self, unit: UnitId) -> Option<UnitPose>;

    /// Overwrites the pose of the unit's mesh.
    fn set_unit_pose(&mut self, unit: UnitId, pose: UnitPose) -> Result<(), StageError>;

    /// Enables or disables the highlight outline drawn around the unit.
    fn set_highlight(&mut self, unit: UnitId, enabled: bool) -> Result<(), StageError>;

    /// Draws an intent line between two world-space points.
    fn spawn_intent_line(&mut self, from: Vec3, to: Vec3) -> IntentLineId;

    /// Removes an intent line from the stage.
    fn release_intent_line(&mut self, line: IntentLineId) -> Result<(), StageError>;

    /// Plays every track of `clip` on the unit's mesh.
    fn play(&mut self, unit: UnitId, clip: AnimationClip)
        -> LocalBoxFuture<'_, Result<(), StageError>>;
}

/// Thing hit by a picking query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PickTarget {
    /// The grid plane.
    Grid,
    /// A unit's mesh.
    Unit(UnitId),
}

/// Result of casting a ray from the pointer into the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickHit {
    /// Mesh that was hit.
    pub target: PickTarget,
    /// World-space point where the ray met the mesh.
    pub point: Vec3,
}

impl PickHit {
    /// Creates a new pick hit.
    #[must_use]
    pub const fn new(target: PickTarget, point: Vec3) -> Self {
        Self { target, point }
    }
}

/// Collaborator that turns pointer coordinates into scene hits.
pub trait PickingService {
    /// Casts a ray from the pointer and returns the first mesh hit, if any.
    fn pick(&self, pointer: Vec2) -> Option<PickHit>;
}
