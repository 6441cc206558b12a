//! Square grid plane and the mapping between world points and cells.

use glam::{Mat4, Vec3};
use tactica_core::{CellCoord, GridError, GridPosition};

/// Vertical offset applied to the hover highlight so it renders above the grid.
pub const HIGHLIGHT_LIFT: f32 = 0.01;

const SINGULAR_EPSILON: f32 = 1e-6;

/// Cell index and cell centre resolved from a point in the grid's local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellResolution {
    /// Cell containing the point, clamped to the grid.
    pub cell: CellCoord,
    /// Centre of `cell` in the grid's local frame, on the grid plane.
    pub center_local: Vec3,
}

/// Square grid of `subdivisions` x `subdivisions` cells centred on its local
/// origin and lying in the local XZ plane.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    size: f32,
    subdivisions: u32,
    transform: Mat4,
    highlight: Option<Vec3>,
}

impl Grid {
    /// Creates a grid with the identity transform.
    pub fn new(size: f32, subdivisions: u32) -> Result<Self, GridError> {
        if subdivisions == 0 {
            return Err(GridError::ZeroSubdivisions);
        }
        if !size.is_finite() || size <= 0.0 {
            return Err(GridError::InvalidSize { size });
        }

        Ok(Self {
            size,
            subdivisions,
            transform: Mat4::IDENTITY,
            highlight: None,
        })
    }

    /// Side length of the whole grid in local units.
    #[must_use]
    pub const fn size(&self) -> f32 {
        self.size
    }

    /// Number of cells along each axis.
    #[must_use]
    pub const fn subdivisions(&self) -> u32 {
        self.subdivisions
    }

    /// Side length of a single cell.
    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.size / self.subdivisions as f32
    }

    /// Current local-to-world transform.
    #[must_use]
    pub const fn transform(&self) -> Mat4 {
        self.transform
    }

    /// Replaces the local-to-world transform.
    pub fn set_transform(&mut self, transform: Mat4) -> Result<(), GridError> {
        let determinant = transform.determinant();
        if !determinant.is_finite() || determinant.abs() < SINGULAR_EPSILON {
            return Err(GridError::SingularTransform);
        }
        self.transform = transform;
        Ok(())
    }

    /// World position of the hover highlight, if the pointer is over the grid.
    #[must_use]
    pub const fn highlight(&self) -> Option<Vec3> {
        self.highlight
    }

    pub(crate) fn set_highlight(&mut self, position: Option<Vec3>) -> bool {
        let changed = self.highlight != position;
        self.highlight = position;
        changed
    }

    /// Resolves the cell containing a point expressed in the grid's local frame.
    ///
    /// Cell bounds are half-open, so a point on a shared edge belongs to the
    /// cell with the larger index. Each axis clamps on its own: points outside
    /// the grid, infinities included, snap to the nearest edge cell and NaN
    /// resolves to index zero.
    #[must_use]
    pub fn resolve_cell(&self, local_point: Vec3) -> CellResolution {
        let half = self.size / 2.0;
        let cell_size = self.cell_size();
        let column = self.clamp_index(((local_point.x + half) / cell_size).floor());
        let row = self.clamp_index(((local_point.z + half) / cell_size).floor());
        let cell = CellCoord::new(row, column);

        CellResolution {
            cell,
            center_local: self.cell_center_local(cell),
        }
    }

    /// Centre of a cell in the grid's local frame. Out-of-range indices clamp
    /// to the last cell.
    #[must_use]
    pub fn cell_center_local(&self, cell: CellCoord) -> Vec3 {
        let half = self.size / 2.0;
        let cell_size = self.cell_size();
        let last = self.subdivisions - 1;
        let axis_center = |index: u32| -half + (index.min(last) as f32 + 0.5) * cell_size;

        Vec3::new(axis_center(cell.column()), 0.0, axis_center(cell.row()))
    }

    /// Maps a world point onto the grid.
    ///
    /// The inverse transform is derived on every call so that a grid moved
    /// between picks is always honoured.
    #[must_use]
    pub fn resolve(&self, world_point: Vec3) -> GridPosition {
        let local_point = self.to_local(world_point);
        let resolution = self.resolve_cell(local_point);
        let normalised = self.transform.transform_point3(resolution.center_local);

        GridPosition::new(resolution.cell, world_point, normalised, local_point)
    }

    /// World position of a cell's centre.
    #[must_use]
    pub fn resolve_world_position(&self, cell: CellCoord) -> Vec3 {
        self.transform
            .transform_point3(self.cell_center_local(cell))
    }

    /// A non-finite world component only reaches the local axes that depend on
    /// it, so `inf * 0` never turns a healthy axis into NaN.
    fn to_local(&self, world_point: Vec3) -> Vec3 {
        let inverse = self.transform.inverse();
        if world_point.is_finite() {
            return inverse.transform_point3(world_point);
        }

        let finite_or_zero = |value: f32| if value.is_finite() { value } else { 0.0 };
        let mut local = inverse.transform_point3(Vec3::new(
            finite_or_zero(world_point.x),
            finite_or_zero(world_point.y),
            finite_or_zero(world_point.z),
        ));
        for axis in 0..3 {
            let value = world_point[axis];
            if value.is_finite() {
                continue;
            }
            let column = inverse.col(axis).truncate();
            for component in 0..3 {
                if column[component] != 0.0 {
                    local[component] += column[component] * value;
                }
            }
        }
        local
    }

    fn clamp_index(&self, index: f32) -> u32 {
        let last = self.subdivisions - 1;
        if index.is_nan() || index <= 0.0 {
            0
        } else if index >= last as f32 {
            last
        } else {
            index as u32
        }
    }
}
