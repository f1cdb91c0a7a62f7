//! Conversion between continuous world positions and discrete grid cells.

use glam::Vec3;

use crate::{CellCoord, GridError, ObjectKind};

/// Quantizes world positions onto a uniform cubic lattice.
///
/// Every axis is divided by the cell size and rounded half to even, so a
/// coordinate exactly between two lattice points lands on the even one. Both
/// [`GridMapper::to_cell`] and [`GridMapper::snap`] use the same rounding,
/// which keeps `to_cell(snap(p)) == to_cell(p)` for every finite `p`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridMapper {
    cell_size: f32,
}

impl GridMapper {
    /// Creates a mapper for the provided cell size.
    ///
    /// Zero, negative, infinite and NaN sizes are rejected.
    pub fn new(cell_size: f32) -> Result<Self, GridError> {
        if cell_size.is_finite() && cell_size > 0.0 {
            Ok(Self { cell_size })
        } else {
            Err(GridError::Configuration { cell_size })
        }
    }

    /// Edge length of one cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell containing the provided world position.
    ///
    /// Positions outside the `i32` range saturate at the range bounds.
    #[must_use]
    pub fn to_cell(&self, position: Vec3) -> CellCoord {
        CellCoord::new(
            self.quantize(position.x),
            self.quantize(position.y),
            self.quantize(position.z),
        )
    }

    /// Occupancy key used for a placeable of the provided kind.
    ///
    /// Stacking kinds collapse onto height zero so a whole column shares one
    /// key.
    #[must_use]
    pub fn cell_for(&self, position: Vec3, kind: ObjectKind) -> CellCoord {
        let cell = self.to_cell(position);
        if kind.stacks_vertically() {
            cell.with_y(0)
        } else {
            cell
        }
    }

    /// World position of the lattice point identified by `cell`.
    #[must_use]
    pub fn lattice_point(&self, cell: CellCoord) -> Vec3 {
        Vec3::new(
            cell.x() as f32 * self.cell_size,
            cell.y() as f32 * self.cell_size,
            cell.z() as f32 * self.cell_size,
        )
    }

    /// Re-quantizes a continuous position to its nearest lattice point.
    #[must_use]
    pub fn snap(&self, position: Vec3) -> Vec3 {
        self.lattice_point(self.to_cell(position))
    }

    fn quantize(&self, value: f32) -> i32 {
        (value / self.cell_size).round_ties_even() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_cell_sizes() {
        for cell_size in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert!(
                matches!(
                    GridMapper::new(cell_size),
                    Err(GridError::Configuration { .. })
                ),
                "cell size {cell_size} must be rejected"
            );
        }
    }

    #[test]
    fn ties_round_to_even_on_every_axis() {
        let mapper = GridMapper::new(1.0).expect("valid cell size");
        assert_eq!(
            mapper.to_cell(Vec3::new(0.5, 1.5, -2.5)),
            CellCoord::new(0, 2, -2)
        );
        assert_eq!(
            mapper.snap(Vec3::new(0.5, 1.5, -2.5)),
            Vec3::new(0.0, 2.0, -2.0)
        );
    }

    #[test]
    fn snap_scales_by_cell_size() {
        let mapper = GridMapper::new(2.0).expect("valid cell size");
        assert_eq!(mapper.to_cell(Vec3::new(3.1, -0.9, 7.0)), CellCoord::new(2, 0, 4));
        assert_eq!(
            mapper.snap(Vec3::new(3.1, -0.9, 7.0)),
            Vec3::new(4.0, 0.0, 8.0)
        );
    }

    #[test]
    fn snapping_preserves_the_cell() {
        let mapper = GridMapper::new(0.75).expect("valid cell size");
        let samples = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.374, 0.375, 0.376),
            Vec3::new(-4.2, 13.9, 0.01),
            Vec3::new(1000.3, -999.6, 42.42),
        ];
        for sample in samples {
            assert_eq!(
                mapper.to_cell(mapper.snap(sample)),
                mapper.to_cell(sample),
                "snap must not move {sample:?} into another cell"
            );
        }
    }

    #[test]
    fn stacking_kinds_collapse_the_vertical_axis() {
        let mapper = GridMapper::new(1.0).expect("valid cell size");
        let position = Vec3::new(2.0, 3.0, 4.0);
        assert_eq!(
            mapper.cell_for(position, ObjectKind::GroundAnchored),
            CellCoord::new(2, 0, 4)
        );
        assert_eq!(
            mapper.cell_for(position, ObjectKind::WallAnchored),
            CellCoord::new(2, 3, 4)
        );
    }
}
