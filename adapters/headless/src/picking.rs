//! Picking service that looks straight down onto the scene.

use glam::{Vec2, Vec3};
use tactica_core::{PickHit, PickTarget, PickingService};
use tactica_world::Grid;

use crate::HeadlessStage;

/// Horizontal radius within which a pointer hits a unit.
pub const DEFAULT_UNIT_RADIUS: f32 = 0.5;

const RAY_HEIGHT: f32 = 1_000.0;

/// Picker that treats the pointer as world `(x, z)` and casts a vertical ray.
///
/// Units win over the grid. Among several units under the pointer, the one
/// closest to the ray is hit.
#[derive(Clone, Copy, Debug)]
pub struct TopDownPicker<'a> {
    stage: &'a HeadlessStage,
    grid: &'a Grid,
    unit_radius: f32,
}

impl<'a> TopDownPicker<'a> {
    /// Creates a picker over the stage's units and the grid plane.
    #[must_use]
    pub const fn new(stage: &'a HeadlessStage, grid: &'a Grid) -> Self {
        Self {
            stage,
            grid,
            unit_radius: DEFAULT_UNIT_RADIUS,
        }
    }

    /// Overrides the unit hit radius.
    #[must_use]
    pub fn with_unit_radius(mut self, unit_radius: f32) -> Self {
        self.unit_radius = unit_radius;
        self
    }

    fn pick_unit(&self, pointer: Vec2) -> Option<PickHit> {
        self.stage
            .units()
            .map(|(unit, pose)| {
                let horizontal = Vec2::new(pose.position.x, pose.position.z);
                (unit, pose, horizontal.distance(pointer))
            })
            .filter(|(_, _, distance)| *distance <= self.unit_radius)
            .min_by(|left, right| left.2.total_cmp(&right.2))
            .map(|(unit, pose, _)| PickHit::new(PickTarget::Unit(unit), pose.position))
    }

    fn pick_grid(&self, pointer: Vec2) -> Option<PickHit> {
        let transform = self.grid.transform();
        let plane_origin = transform.transform_point3(Vec3::ZERO);
        let plane_normal = transform.transform_vector3(Vec3::Y).try_normalize()?;

        let ray_origin = Vec3::new(pointer.x, RAY_HEIGHT, pointer.y);
        let ray_direction = Vec3::NEG_Y;
        let facing = ray_direction.dot(plane_normal);
        if facing.abs() < f32::EPSILON {
            return None;
        }

        let distance = (plane_origin - ray_origin).dot(plane_normal) / facing;
        if distance < 0.0 {
            return None;
        }

        let point = ray_origin + ray_direction * distance;
        let local = transform.inverse().transform_point3(point);
        let half = self.grid.size() / 2.0;
        if local.x.abs() > half || local.z.abs() > half {
            return None;
        }

        Some(PickHit::new(PickTarget::Grid, point))
    }
}

impl PickingService for TopDownPicker<'_> {
    fn pick(&self, pointer: Vec2) -> Option<PickHit> {
        self.pick_unit(pointer).or_else(|| self.pick_grid(pointer))
    }
}
