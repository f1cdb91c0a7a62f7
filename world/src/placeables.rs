//! Authoritative placeable state and identifier allocation.

use std::collections::BTreeMap;

use buildgrid_core::{ObjectKind, PlaceableId};
use glam::Vec3;

/// State of a placeable stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct PlaceableState {
    /// Kind of object.
    pub(crate) kind: ObjectKind,
    /// Current world position, including unregistered preview positions.
    pub(crate) position: Vec3,
    /// Size along the placement normal in world units.
    pub(crate) extent: f32,
    /// Accumulated yaw angle in degrees.
    pub(crate) rotation_degrees: f32,
    /// Set while a placement session drives the placeable.
    pub(crate) placing: bool,
}

/// Registry that stores placeables and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct PlaceableRegistry {
    entries: BTreeMap<PlaceableId, PlaceableState>,
    next_id: Option<PlaceableId>,
}

impl PlaceableRegistry {
    /// Creates an empty registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: Some(PlaceableId::new(0)),
        }
    }

    /// Stores a new placeable and returns its identifier.
    ///
    /// Returns `None` once every identifier has been handed out.
    pub(crate) fn spawn(
        &mut self,
        kind: ObjectKind,
        position: Vec3,
        extent: f32,
    ) -> Option<PlaceableId> {
        let id = self.next_id?;
        self.next_id = id.get().checked_add(1).map(PlaceableId::new);
        let _ = self.entries.insert(
            id,
            PlaceableState {
                kind,
                position,
                extent,
                rotation_degrees: 0.0,
                placing: false,
            },
        );
        Some(id)
    }

    pub(crate) fn get(&self, id: PlaceableId) -> Option<&PlaceableState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: PlaceableId) -> Option<&mut PlaceableState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: PlaceableId) -> Option<PlaceableState> {
        self.entries.remove(&id)
    }

    /// Current position of the placeable, if it exists.
    pub(crate) fn position_of(&self, id: PlaceableId) -> Option<Vec3> {
        self.entries.get(&id).map(|state| state.position)
    }

    /// Iterates over all placeables in identifier order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (PlaceableId, &PlaceableState)> {
        self.entries.iter().map(|(id, state)| (*id, state))
    }
}
