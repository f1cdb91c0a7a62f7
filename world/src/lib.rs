#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Buildgrid.
//!
//! The world owns the occupancy grid and every placeable in the scene. It is
//! constructed explicitly and passed by reference to whoever needs it; all
//! mutations flow through [`apply`], and read access goes through [`query`].

mod occupancy;
mod placeables;

pub use occupancy::OccupancyGrid;

use buildgrid_core::{
    CellCoord, Command, Event, GridConfig, GridError, ObjectKind, PlaceableId, PlacementError,
};
use glam::Vec3;
use log::{debug, warn};

use self::placeables::PlaceableRegistry;

/// Represents the authoritative Buildgrid world state.
#[derive(Debug)]
pub struct World {
    config: GridConfig,
    occupancy: OccupancyGrid,
    placeables: PlaceableRegistry,
}

impl World {
    /// Creates an empty world using the provided grid configuration.
    ///
    /// Fails without building anything when the configuration is unusable.
    pub fn new(config: GridConfig) -> Result<Self, GridError> {
        let occupancy = OccupancyGrid::new(config)?;
        Ok(Self {
            config,
            occupancy,
            placeables: PlaceableRegistry::new(),
        })
    }

    fn resolve(&self, candidate: Vec3, kind: ObjectKind) -> Result<Vec3, GridError> {
        self.occupancy
            .resolve_free_position(candidate, kind, |placeable| {
                self.placeables.position_of(placeable)
            })
    }

    /// Verifies that `placeable` could be registered at `position` right now.
    fn ensure_available(
        &self,
        placeable: PlaceableId,
        position: Vec3,
        kind: ObjectKind,
    ) -> Result<(), PlacementError> {
        if self.occupancy.cell_of(placeable).is_some() {
            return Err(PlacementError::AlreadyRegistered);
        }

        if !self.occupancy.is_free(position, kind) {
            return Err(PlacementError::Occupied);
        }

        let resolved = self
            .resolve(position, kind)
            .map_err(|_| PlacementError::GridExhausted)?;
        let mapper = self.occupancy.mapper();
        if mapper.to_cell(resolved) != mapper.to_cell(position) {
            return Err(PlacementError::Occupied);
        }

        Ok(())
    }

    fn register_at(
        &mut self,
        placeable: PlaceableId,
        position: Vec3,
    ) -> Result<CellCoord, PlacementError> {
        let kind = self
            .placeables
            .get(placeable)
            .map(|state| state.kind)
            .ok_or(PlacementError::MissingPlaceable)?;
        self.ensure_available(placeable, position, kind)?;

        if let Some(state) = self.placeables.get_mut(placeable) {
            state.position = position;
        }
        self.occupancy
            .register(placeable, position, kind)
            .map_err(PlacementError::from)
    }

    fn unregister_current(&mut self, placeable: PlaceableId) -> bool {
        let Some(state) = self.placeables.get(placeable) else {
            return false;
        };
        if self.occupancy.cell_of(placeable).is_none() {
            return false;
        }

        match self
            .occupancy
            .unregister(placeable, state.position, state.kind)
        {
            Ok(cell) => {
                debug!("unregistered {placeable:?} from {cell:?}");
                true
            }
            Err(error) => {
                warn!("occupancy out of sync: {error}");
                false
            }
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::SpawnPlaceable {
            kind,
            position,
            extent,
        } => {
            let Some(placeable) = world.placeables.spawn(kind, position, extent) else {
                warn!("refused to spawn {kind:?}: identifiers exhausted");
                out_events.push(Event::SpawnRejected {
                    kind,
                    reason: PlacementError::IdsExhausted,
                });
                return;
            };
            debug!("spawned {placeable:?} ({kind:?}) at {position}");
            out_events.push(Event::PlaceableSpawned {
                placeable,
                kind,
                position,
            });
        }
        Command::RegisterPlaceable { placeable } => {
            let position = world.placeables.position_of(placeable);
            let outcome = position
                .ok_or(PlacementError::MissingPlaceable)
                .and_then(|position| world.register_at(placeable, position));
            match outcome {
                Ok(cell) => {
                    debug!("registered {placeable:?} at {cell:?}");
                    out_events.push(Event::PlaceableRegistered { placeable, cell });
                }
                Err(reason) => reject(placeable, reason, out_events),
            }
        }
        Command::BeginPlacement { placeable } => {
            let Some(state) = world.placeables.get_mut(placeable) else {
                reject(placeable, PlacementError::MissingPlaceable, out_events);
                return;
            };
            if state.placing {
                reject(placeable, PlacementError::AlreadyPlacing, out_events);
                return;
            }
            state.placing = true;
            let original = state.position;
            let was_registered = world.unregister_current(placeable);
            debug!("placement began for {placeable:?} at {original}");
            out_events.push(Event::PlacementBegan {
                placeable,
                original,
                was_registered,
            });
        }
        Command::MovePlaceable {
            placeable,
            position,
        } => {
            if world.occupancy.cell_of(placeable).is_some() {
                reject(placeable, PlacementError::AlreadyRegistered, out_events);
                return;
            }
            let Some(state) = world.placeables.get_mut(placeable) else {
                reject(placeable, PlacementError::MissingPlaceable, out_events);
                return;
            };
            state.position = position;
            out_events.push(Event::PlaceableMoved {
                placeable,
                position,
            });
        }
        Command::RotatePlaceable { placeable, degrees } => {
            let Some(state) = world.placeables.get_mut(placeable) else {
                reject(placeable, PlacementError::MissingPlaceable, out_events);
                return;
            };
            state.rotation_degrees = degrees;
            out_events.push(Event::PlaceableRotated { placeable, degrees });
        }
        Command::CommitPlacement {
            placeable,
            position,
        } => {
            let outcome = world.register_at(placeable, position);
            if let Some(state) = world.placeables.get_mut(placeable) {
                state.placing = false;
            }
            match outcome {
                Ok(cell) => {
                    debug!("committed {placeable:?} at {cell:?}");
                    out_events.push(Event::PlacementCommitted {
                        placeable,
                        cell,
                        position,
                    });
                }
                Err(reason) => reject(placeable, reason, out_events),
            }
        }
        Command::CancelPlacement {
            placeable,
            original,
        } => {
            if world.occupancy.cell_of(placeable).is_some() {
                reject(placeable, PlacementError::AlreadyRegistered, out_events);
                return;
            }
            let Some(state) = world.placeables.get_mut(placeable) else {
                reject(placeable, PlacementError::MissingPlaceable, out_events);
                return;
            };
            state.position = original;
            state.placing = false;
            debug!("cancelled placement of {placeable:?}, restored to {original}");
            out_events.push(Event::PlacementCancelled {
                placeable,
                position: original,
            });
        }
        Command::DespawnPlaceable { placeable } => {
            let _ = world.unregister_current(placeable);
            if world.placeables.remove(placeable).is_some() {
                out_events.push(Event::PlaceableDespawned { placeable });
            } else {
                reject(placeable, PlacementError::MissingPlaceable, out_events);
            }
        }
    }
}

fn reject(placeable: PlaceableId, reason: PlacementError, out_events: &mut Vec<Event>) {
    warn!("rejected request for {placeable:?}: {reason:?}");
    out_events.push(Event::PlacementRejected { placeable, reason });
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use buildgrid_core::{CellCoord, GridConfig, GridError, GridMapper, ObjectKind, PlaceableId};
    use glam::Vec3;

    use super::{placeables::PlaceableState, OccupancyGrid, World};

    /// Grid configuration the world was built with.
    #[must_use]
    pub fn config(world: &World) -> GridConfig {
        world.config
    }

    /// Mapper shared by every occupancy lookup in the world.
    #[must_use]
    pub fn mapper(world: &World) -> GridMapper {
        world.occupancy.mapper()
    }

    /// Captures the state of a single placeable.
    #[must_use]
    pub fn placeable(world: &World, placeable: PlaceableId) -> Option<PlaceableSnapshot> {
        world
            .placeables
            .get(placeable)
            .map(|state| snapshot(world, placeable, state))
    }

    /// Captures a read-only view of every placeable in the scene.
    #[must_use]
    pub fn placeable_view(world: &World) -> PlaceableView {
        let snapshots = world
            .placeables
            .iter()
            .map(|(id, state)| snapshot(world, id, state))
            .collect();
        PlaceableView { snapshots }
    }

    fn snapshot(world: &World, id: PlaceableId, state: &PlaceableState) -> PlaceableSnapshot {
        PlaceableSnapshot {
            id,
            kind: state.kind,
            position: state.position,
            extent: state.extent,
            rotation_degrees: state.rotation_degrees,
            cell: world.occupancy.cell_of(id),
            placing: state.placing,
        }
    }

    /// Exposes a read-only view of the occupancy grid.
    #[must_use]
    pub fn occupancy_view(world: &World) -> OccupancyView<'_> {
        OccupancyView {
            grid: &world.occupancy,
        }
    }

    /// Reports whether a placeable of `kind` may occupy `position`.
    #[must_use]
    pub fn is_free(world: &World, position: Vec3, kind: ObjectKind) -> bool {
        world.occupancy.is_free(position, kind)
    }

    /// Finds the free position a placeable of `kind` should take near `candidate`.
    pub fn resolve_free_position(
        world: &World,
        candidate: Vec3,
        kind: ObjectKind,
    ) -> Result<Vec3, GridError> {
        world.resolve(candidate, kind)
    }

    /// Immutable representation of a single placeable.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct PlaceableSnapshot {
        /// Identifier allocated by the world.
        pub id: PlaceableId,
        /// Kind of object.
        pub kind: ObjectKind,
        /// Current world position.
        pub position: Vec3,
        /// Size along the placement normal in world units.
        pub extent: f32,
        /// Accumulated yaw angle in degrees.
        pub rotation_degrees: f32,
        /// Cell the placeable is registered at, if any.
        pub cell: Option<CellCoord>,
        /// Whether a placement session currently drives the placeable.
        pub placing: bool,
    }

    impl PlaceableSnapshot {
        /// Reports whether the placeable currently occupies a cell.
        #[must_use]
        pub const fn is_registered(&self) -> bool {
            self.cell.is_some()
        }
    }

    /// Read-only snapshot describing all placeables in identifier order.
    #[derive(Clone, Debug, Default)]
    pub struct PlaceableView {
        snapshots: Vec<PlaceableSnapshot>,
    }

    impl PlaceableView {
        /// Iterator over the captured snapshots.
        pub fn iter(&self) -> impl Iterator<Item = &PlaceableSnapshot> {
            self.snapshots.iter()
        }
    }

    /// Read-only view into the occupancy grid.
    #[derive(Clone, Copy, Debug)]
    pub struct OccupancyView<'a> {
        grid: &'a OccupancyGrid,
    }

    impl<'a> OccupancyView<'a> {
        /// Placeables registered at `cell`, in registration order.
        #[must_use]
        pub fn occupants(&self, cell: CellCoord) -> &'a [PlaceableId] {
            self.grid.occupants(cell)
        }

        /// Cell occupied by `placeable`, if registered.
        #[must_use]
        pub fn cell_of(&self, placeable: PlaceableId) -> Option<CellCoord> {
            self.grid.cell_of(placeable)
        }

        /// Iterates over every occupied cell together with its occupants.
        pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &'a [PlaceableId])> + 'a {
            self.grid.occupied_cells()
        }

        /// Number of occupied cells.
        #[must_use]
        pub fn len(&self) -> usize {
            self.grid.len()
        }

        /// Reports whether no cell is occupied.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.grid.is_empty()
        }
    }
}
