//! Sparse occupancy index keyed by grid cell.

use std::collections::HashMap;

use buildgrid_core::{
    CellCoord, GridConfig, GridError, GridMapper, ObjectKind, OccupancyError, PlaceableId,
};
use glam::Vec3;

/// Tracks which placeables occupy which grid cells.
///
/// The grid indexes identifiers only; object lifetime and positions belong to
/// the caller. Keys exist only while at least one placeable occupies them, and
/// each placeable occupies at most one cell.
#[derive(Clone, Debug)]
pub struct OccupancyGrid {
    mapper: GridMapper,
    max_stack_height: u32,
    cells: HashMap<CellCoord, Vec<PlaceableId>>,
    locations: HashMap<PlaceableId, CellCoord>,
}

impl OccupancyGrid {
    /// Creates an empty grid from the provided configuration.
    pub fn new(config: GridConfig) -> Result<Self, GridError> {
        let mapper = GridMapper::new(config.cell_size)?;
        if config.max_stack_height == 0 {
            return Err(GridError::StackHeight {
                max_stack_height: config.max_stack_height,
            });
        }

        Ok(Self {
            mapper,
            max_stack_height: config.max_stack_height,
            cells: HashMap::new(),
            locations: HashMap::new(),
        })
    }

    /// Mapper used to derive cell keys.
    #[must_use]
    pub const fn mapper(&self) -> GridMapper {
        self.mapper
    }

    /// Number of height levels probed by [`OccupancyGrid::resolve_free_position`].
    #[must_use]
    pub const fn max_stack_height(&self) -> u32 {
        self.max_stack_height
    }

    /// Records `placeable` as occupying the cell derived from `position`.
    ///
    /// Performs no availability check; callers resolve a free position first.
    pub fn register(
        &mut self,
        placeable: PlaceableId,
        position: Vec3,
        kind: ObjectKind,
    ) -> Result<CellCoord, OccupancyError> {
        if let Some(cell) = self.locations.get(&placeable) {
            return Err(OccupancyError::AlreadyRegistered {
                placeable,
                cell: *cell,
            });
        }

        let cell = self.mapper.cell_for(position, kind);
        self.cells.entry(cell).or_default().push(placeable);
        let _ = self.locations.insert(placeable, cell);
        Ok(cell)
    }

    /// Removes `placeable` from the cell derived from `position`.
    ///
    /// The cell entry is dropped once its last occupant leaves.
    pub fn unregister(
        &mut self,
        placeable: PlaceableId,
        position: Vec3,
        kind: ObjectKind,
    ) -> Result<CellCoord, OccupancyError> {
        let cell = self.mapper.cell_for(position, kind);
        if self.locations.get(&placeable) != Some(&cell) {
            return Err(OccupancyError::NotRegistered { placeable, cell });
        }

        if let Some(occupants) = self.cells.get_mut(&cell) {
            occupants.retain(|occupant| *occupant != placeable);
            if occupants.is_empty() {
                let _ = self.cells.remove(&cell);
            }
        }
        let _ = self.locations.remove(&placeable);
        Ok(cell)
    }

    /// Reports whether a placeable of `kind` may occupy `position`.
    ///
    /// Wall-anchored kinds are blocked by any occupant of their exact cell.
    /// Stacking kinds always pass; their conflicts are settled by
    /// [`OccupancyGrid::resolve_free_position`].
    #[must_use]
    pub fn is_free(&self, position: Vec3, kind: ObjectKind) -> bool {
        if kind.stacks_vertically() {
            return true;
        }
        !self.cells.contains_key(&self.mapper.cell_for(position, kind))
    }

    /// Finds the position a placeable of `kind` should take near `candidate`.
    ///
    /// Non-stacking kinds get `candidate` back unchanged, as do stacking kinds
    /// aimed at an empty column. Otherwise levels are probed upward from zero
    /// and the lattice point of the first level that no occupant sits on is
    /// returned. `position_of` reports each occupant's current position.
    pub fn resolve_free_position<F>(
        &self,
        candidate: Vec3,
        kind: ObjectKind,
        mut position_of: F,
    ) -> Result<Vec3, GridError>
    where
        F: FnMut(PlaceableId) -> Option<Vec3>,
    {
        if !kind.stacks_vertically() {
            return Ok(candidate);
        }

        let column = self.mapper.cell_for(candidate, kind);
        let occupants = self.occupants(column);
        if occupants.is_empty() {
            return Ok(candidate);
        }

        let occupied_cells: Vec<CellCoord> = occupants
            .iter()
            .filter_map(|occupant| position_of(*occupant))
            .map(|position| self.mapper.to_cell(position))
            .collect();

        for level in 0..self.max_stack_height {
            let Ok(height) = i32::try_from(level) else {
                break;
            };
            let probe = column.with_y(height);
            if !occupied_cells.contains(&probe) {
                return Ok(self.mapper.lattice_point(probe));
            }
        }

        Err(GridError::GridExhausted {
            column,
            max_stack_height: self.max_stack_height,
        })
    }

    /// Placeables registered at `cell`, in registration order.
    #[must_use]
    pub fn occupants(&self, cell: CellCoord) -> &[PlaceableId] {
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cell currently occupied by `placeable`, if registered.
    #[must_use]
    pub fn cell_of(&self, placeable: PlaceableId) -> Option<CellCoord> {
        self.locations.get(&placeable).copied()
    }

    /// Iterates over every occupied cell together with its occupants.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (CellCoord, &[PlaceableId])> + '_ {
        self.cells
            .iter()
            .map(|(cell, occupants)| (*cell, occupants.as_slice()))
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether no cell is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> OccupancyGrid {
        OccupancyGrid::new(GridConfig::default()).expect("default config is valid")
    }

    fn assert_sparse(grid: &OccupancyGrid) {
        for (cell, occupants) in grid.occupied_cells() {
            assert!(!occupants.is_empty(), "cell {cell:?} kept an empty entry");
        }
    }

    #[test]
    fn zero_stack_height_is_reported_as_such() {
        let config = GridConfig {
            max_stack_height: 0,
            ..GridConfig::default()
        };
        let error = OccupancyGrid::new(config).expect_err("zero stack height is refused");
        assert_eq!(error, GridError::StackHeight { max_stack_height: 0 });
        assert!(
            !error.to_string().contains("cell size"),
            "message blames the cell size: {error}"
        );
    }

    #[test]
    fn configured_stack_height_is_kept() {
        let grid = OccupancyGrid::new(GridConfig {
            max_stack_height: 3,
            ..GridConfig::default()
        })
        .expect("valid config");
        assert_eq!(grid.max_stack_height(), 3);
        assert_eq!(grid.mapper().cell_size(), 1.0);
    }

    #[test]
    fn register_appends_in_registration_order() {
        let mut grid = grid();
        let first = PlaceableId::new(1);
        let second = PlaceableId::new(2);
        let cell = grid
            .register(first, Vec3::new(1.0, 0.0, 1.0), ObjectKind::GroundAnchored)
            .expect("first registration");
        let _ = grid
            .register(second, Vec3::new(1.0, 1.0, 1.0), ObjectKind::GroundAnchored)
            .expect("second registration");

        assert_eq!(cell, CellCoord::new(1, 0, 1));
        assert_eq!(grid.occupants(cell), &[first, second]);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn double_registration_is_refused_without_side_effects() {
        let mut grid = grid();
        let placeable = PlaceableId::new(7);
        let _ = grid
            .register(placeable, Vec3::ZERO, ObjectKind::WallAnchored)
            .expect("first registration");

        let error = grid
            .register(placeable, Vec3::new(5.0, 5.0, 5.0), ObjectKind::WallAnchored)
            .expect_err("second registration must fail");

        assert_eq!(
            error,
            OccupancyError::AlreadyRegistered {
                placeable,
                cell: CellCoord::new(0, 0, 0),
            }
        );
        assert_eq!(grid.len(), 1);
        assert!(grid.occupants(CellCoord::new(5, 5, 5)).is_empty());
    }

    #[test]
    fn unregister_drops_empty_cells() {
        let mut grid = grid();
        let placeable = PlaceableId::new(3);
        let position = Vec3::new(2.0, 3.0, 4.0);
        let _ = grid
            .register(placeable, position, ObjectKind::WallAnchored)
            .expect("registration");

        let cell = grid
            .unregister(placeable, position, ObjectKind::WallAnchored)
            .expect("unregistration");

        assert_eq!(cell, CellCoord::new(2, 3, 4));
        assert!(grid.is_empty());
        assert_eq!(grid.cell_of(placeable), None);
    }

    #[test]
    fn unregister_from_the_wrong_cell_is_refused() {
        let mut grid = grid();
        let placeable = PlaceableId::new(3);
        let _ = grid
            .register(placeable, Vec3::ZERO, ObjectKind::WallAnchored)
            .expect("registration");

        let error = grid
            .unregister(placeable, Vec3::new(0.0, 1.0, 0.0), ObjectKind::WallAnchored)
            .expect_err("wrong cell");

        assert!(matches!(error, OccupancyError::NotRegistered { .. }));
        assert_eq!(grid.cell_of(placeable), Some(CellCoord::new(0, 0, 0)));
    }

    #[test]
    fn unregistering_a_stranger_is_refused() {
        let mut grid = grid();
        let error = grid
            .unregister(PlaceableId::new(9), Vec3::ZERO, ObjectKind::GroundAnchored)
            .expect_err("nothing registered");
        assert!(matches!(error, OccupancyError::NotRegistered { .. }));
        assert!(grid.is_empty());
    }

    #[test]
    fn map_stays_sparse_through_mixed_sequences() {
        let mut grid = grid();
        let positions: Vec<Vec3> = (0..6)
            .map(|index| Vec3::new((index % 3) as f32, 0.0, (index / 3) as f32))
            .collect();

        for (index, position) in positions.iter().enumerate() {
            let _ = grid
                .register(
                    PlaceableId::new(index as u32),
                    *position,
                    ObjectKind::GroundAnchored,
                )
                .expect("registration");
        }
        assert_sparse(&grid);

        for (index, position) in positions.iter().enumerate().step_by(2) {
            let _ = grid
                .unregister(
                    PlaceableId::new(index as u32),
                    *position,
                    ObjectKind::GroundAnchored,
                )
                .expect("unregistration");
            assert_sparse(&grid);
        }

        assert_eq!(grid.len(), 3);
    }

    #[test]
    fn ground_anchored_kinds_are_never_blocked_by_is_free() {
        let mut grid = grid();
        let _ = grid
            .register(PlaceableId::new(1), Vec3::ZERO, ObjectKind::GroundAnchored)
            .expect("registration");
        assert!(grid.is_free(Vec3::ZERO, ObjectKind::GroundAnchored));
    }

    #[test]
    fn resolution_is_identity_for_wall_anchored_kinds() {
        let mut grid = grid();
        let position = Vec3::new(1.0, 2.0, 3.0);
        let _ = grid
            .register(PlaceableId::new(1), position, ObjectKind::WallAnchored)
            .expect("registration");

        let resolved = grid
            .resolve_free_position(position, ObjectKind::WallAnchored, |_| Some(position))
            .expect("identity");
        assert_eq!(resolved, position);
    }

    #[test]
    fn resolution_returns_the_candidate_for_empty_columns() {
        let grid = grid();
        let candidate = Vec3::new(4.0, 2.0, -1.0);
        let resolved = grid
            .resolve_free_position(candidate, ObjectKind::GroundAnchored, |_| None)
            .expect("empty column");
        assert_eq!(resolved, candidate);
    }

    #[test]
    fn resolution_fills_gaps_before_climbing() {
        let mut grid = grid();
        let mut positions = HashMap::new();
        for (index, height) in [0.0, 2.0].into_iter().enumerate() {
            let placeable = PlaceableId::new(index as u32);
            let position = Vec3::new(0.0, height, 0.0);
            let _ = grid
                .register(placeable, position, ObjectKind::GroundAnchored)
                .expect("registration");
            let _ = positions.insert(placeable, position);
        }

        let resolved = grid
            .resolve_free_position(Vec3::ZERO, ObjectKind::GroundAnchored, |placeable| {
                positions.get(&placeable).copied()
            })
            .expect("gap at level one");
        assert_eq!(resolved, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn resolution_respects_cell_size() {
        let mut grid = OccupancyGrid::new(GridConfig {
            cell_size: 0.5,
            ..GridConfig::default()
        })
        .expect("valid config");
        let occupant = Vec3::new(1.0, 0.0, 1.5);
        let _ = grid
            .register(PlaceableId::new(1), occupant, ObjectKind::GroundAnchored)
            .expect("registration");

        let resolved = grid
            .resolve_free_position(
                Vec3::new(1.1, 3.0, 1.4),
                ObjectKind::GroundAnchored,
                |_| Some(occupant),
            )
            .expect("level one is free");
        assert_eq!(resolved, Vec3::new(1.0, 0.5, 1.5));
    }

    #[test]
    fn exhausted_columns_report_an_error() {
        let mut grid = OccupancyGrid::new(GridConfig {
            max_stack_height: 3,
            ..GridConfig::default()
        })
        .expect("valid config");
        let mut positions = HashMap::new();
        for level in 0..3 {
            let placeable = PlaceableId::new(level);
            let position = Vec3::new(5.0, level as f32, 5.0);
            let _ = grid
                .register(placeable, position, ObjectKind::GroundAnchored)
                .expect("registration");
            let _ = positions.insert(placeable, position);
        }

        let error = grid
            .resolve_free_position(
                Vec3::new(5.0, 0.0, 5.0),
                ObjectKind::GroundAnchored,
                |placeable| positions.get(&placeable).copied(),
            )
            .expect_err("column is full");
        assert_eq!(
            error,
            GridError::GridExhausted {
                column: CellCoord::new(5, 0, 5),
                max_stack_height: 3,
            }
        );
    }
}
