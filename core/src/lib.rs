#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Buildgrid placement engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! describing what actually happened. The grid coordinate mapper lives here as
//! well because both the world and the placement system must quantize
//! positions identically.

mod mapper;

pub use mapper::GridMapper;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cell size used when no configuration overrides it.
pub const DEFAULT_CELL_SIZE: f32 = 1.0;

/// Highest stack level probed before a column is reported as exhausted.
pub const DEFAULT_MAX_STACK_HEIGHT: u32 = 64;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Creates a new, unregistered placeable in the scene.
    SpawnPlaceable {
        /// Kind of object being created.
        kind: ObjectKind,
        /// Initial world position of the object.
        position: Vec3,
        /// Size of the object along its placement normal, in world units.
        extent: f32,
    },
    /// Registers a placeable at its current position without a session.
    ///
    /// Used to seed a scene with pre-placed objects.
    RegisterPlaceable {
        /// Identifier of the placeable to register.
        placeable: PlaceableId,
    },
    /// Opens a placement session on the placeable.
    ///
    /// Already registered objects are unregistered so they do not block their
    /// own cell while previewed.
    BeginPlacement {
        /// Identifier of the placeable being picked up.
        placeable: PlaceableId,
    },
    /// Moves a placeable to a preview position without touching occupancy.
    MovePlaceable {
        /// Identifier of the placeable to move.
        placeable: PlaceableId,
        /// New world position.
        position: Vec3,
    },
    /// Sets the visual orientation of a placeable.
    RotatePlaceable {
        /// Identifier of the placeable to rotate.
        placeable: PlaceableId,
        /// Accumulated yaw angle in degrees.
        degrees: f32,
    },
    /// Finalizes a placement, registering the object at the provided position.
    CommitPlacement {
        /// Identifier of the placeable being committed.
        placeable: PlaceableId,
        /// Snapped world position the object should occupy.
        position: Vec3,
    },
    /// Aborts a placement, restoring the object's pre-session position.
    CancelPlacement {
        /// Identifier of the placeable whose session was cancelled.
        placeable: PlaceableId,
        /// Position captured when the session began.
        original: Vec3,
    },
    /// Removes a placeable from the scene entirely.
    DespawnPlaceable {
        /// Identifier of the placeable to remove.
        placeable: PlaceableId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a placeable was created.
    PlaceableSpawned {
        /// Identifier allocated by the world.
        placeable: PlaceableId,
        /// Kind of the new object.
        kind: ObjectKind,
        /// Initial world position.
        position: Vec3,
    },
    /// Confirms that a placeable was registered without a session.
    PlaceableRegistered {
        /// Identifier of the registered placeable.
        placeable: PlaceableId,
        /// Cell the placeable now occupies.
        cell: CellCoord,
    },
    /// Announces that a placement session started on a placeable.
    PlacementBegan {
        /// Identifier of the placeable being placed.
        placeable: PlaceableId,
        /// Position held before the session started.
        original: Vec3,
        /// Whether the placeable was unregistered as part of starting.
        was_registered: bool,
    },
    /// Confirms that a placeable moved to a new preview position.
    PlaceableMoved {
        /// Identifier of the moved placeable.
        placeable: PlaceableId,
        /// Position after the move.
        position: Vec3,
    },
    /// Confirms that a placeable changed orientation.
    PlaceableRotated {
        /// Identifier of the rotated placeable.
        placeable: PlaceableId,
        /// Accumulated yaw angle in degrees.
        degrees: f32,
    },
    /// Lifecycle notification emitted when a placement was committed.
    PlacementCommitted {
        /// Identifier of the committed placeable.
        placeable: PlaceableId,
        /// Cell registered for the placeable.
        cell: CellCoord,
        /// Final world position.
        position: Vec3,
    },
    /// Lifecycle notification emitted when a placement was cancelled.
    PlacementCancelled {
        /// Identifier of the placeable whose session ended.
        placeable: PlaceableId,
        /// Restored world position.
        position: Vec3,
    },
    /// Confirms that a placeable was removed from the scene.
    PlaceableDespawned {
        /// Identifier of the removed placeable.
        placeable: PlaceableId,
    },
    /// Reports that a request naming an existing placeable was refused.
    PlacementRejected {
        /// Identifier of the placeable named by the request.
        placeable: PlaceableId,
        /// Specific reason the request failed.
        reason: PlacementError,
    },
    /// Reports that a spawn request was refused before an identifier existed.
    SpawnRejected {
        /// Kind that was requested.
        kind: ObjectKind,
        /// Specific reason the request failed.
        reason: PlacementError,
    },
}

/// Unique identifier assigned to a placeable object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaceableId(u32);

impl PlaceableId {
    /// Creates a new placeable identifier with the provided numeric value.
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

/// Location of a single lattice point of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: i32,
    y: i32,
    z: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Cell index along the world X axis.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Cell index along the vertical axis.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Cell index along the world Z axis.
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.z
    }

    /// Returns the same planar cell at the provided height level.
    #[must_use]
    pub const fn with_y(self, y: i32) -> Self {
        Self { y, ..self }
    }
}

/// Types of objects that can be placed into the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Sits on the ground; occupies a planar column and stacks upward.
    GroundAnchored,
    /// Attaches to walls; occupies exactly one 3D cell.
    WallAnchored,
}

impl ObjectKind {
    /// Every kind, in declaration order.
    pub const ALL: [ObjectKind; 2] = [ObjectKind::GroundAnchored, ObjectKind::WallAnchored];

    /// Reports whether the kind's cell ignores the vertical axis.
    ///
    /// Collapsed kinds share one occupancy entry per planar column at height
    /// zero, and free-slot resolution stacks them upward inside that column.
    #[must_use]
    pub const fn stacks_vertically(self) -> bool {
        match self {
            Self::GroundAnchored => true,
            Self::WallAnchored => false,
        }
    }
}

/// Classification attached to a surface by the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceTag {
    /// Walkable ground.
    Ground,
    /// Vertical wall.
    Wall,
    /// Any surface without a placement role.
    Untagged,
}

/// Bit set selecting which scene layers a hit test considers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(u32);

impl LayerMask {
    /// Mask matching every layer.
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    /// Mask matching no layer.
    pub const NONE: LayerMask = LayerMask(0);

    /// Creates a mask from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Creates a mask containing only the provided layer index.
    ///
    /// Indices beyond 31 produce an empty mask.
    #[must_use]
    pub const fn layer(index: u32) -> Self {
        if index < u32::BITS {
            Self(1 << index)
        } else {
            Self::NONE
        }
    }

    /// Reports whether the provided layer index is selected.
    #[must_use]
    pub const fn contains(&self, index: u32) -> bool {
        index < u32::BITS && self.0 & (1 << index) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Half-line in world space used to aim placements.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// Starting point of the ray.
    pub origin: Vec3,
    /// Direction of travel. Not required to be normalized.
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray, normalizing the direction when possible.
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point located `distance` units along the ray.
    #[must_use]
    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Result of intersecting an aim ray with the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceHit {
    /// Intersection point in world space.
    pub point: Vec3,
    /// Surface normal at the intersection point.
    pub normal: Vec3,
    /// Classification of the surface that was hit.
    pub tag: SurfaceTag,
}

/// Visual feedback category for a placement preview.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidityState {
    /// The preview could be committed at its current position.
    Valid,
    /// The preview rests on a surface but cannot be committed there.
    Invalid,
    /// The aim ray hit nothing; the object floats along the ray.
    Floating,
}

/// Grid configuration supplied when the world is constructed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Edge length of one cell in world units. Must be strictly positive.
    pub cell_size: f32,
    /// Number of height levels probed before a column counts as full.
    pub max_stack_height: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            max_stack_height: DEFAULT_MAX_STACK_HEIGHT,
        }
    }
}

/// Errors produced by grid construction and free-slot resolution.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum GridError {
    /// The grid was configured with a non-positive or non-finite cell size.
    #[error("invalid grid configuration: cell size {cell_size} must be positive")]
    Configuration {
        /// Cell size that was rejected.
        cell_size: f32,
    },
    /// The grid was configured to probe no height levels at all.
    #[error("invalid grid configuration: max stack height {max_stack_height} must be non-zero")]
    StackHeight {
        /// Stack height that was rejected.
        max_stack_height: u32,
    },
    /// Every height level up to the configured cap is occupied.
    #[error("column {column:?} has no free level below {max_stack_height}")]
    GridExhausted {
        /// Planar column that was probed, at height zero.
        column: CellCoord,
        /// Cap that was reached.
        max_stack_height: u32,
    },
}

/// Misuse of the occupancy grid's register/unregister contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum OccupancyError {
    /// The placeable already occupies a cell.
    #[error("placeable {placeable:?} is already registered at {cell:?}")]
    AlreadyRegistered {
        /// Placeable named by the request.
        placeable: PlaceableId,
        /// Cell the placeable currently occupies.
        cell: CellCoord,
    },
    /// The placeable does not occupy the cell it was unregistered from.
    #[error("placeable {placeable:?} is not registered at {cell:?}")]
    NotRegistered {
        /// Placeable named by the request.
        placeable: PlaceableId,
        /// Cell that was searched.
        cell: CellCoord,
    },
}

/// Reasons a registration or commit request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// No placeable with the provided identifier exists.
    MissingPlaceable,
    /// The placeable already occupies a cell.
    AlreadyRegistered,
    /// The requested position is taken by another placeable.
    Occupied,
    /// The contested column has no free level left.
    GridExhausted,
    /// The placeable is already driven by a placement session.
    AlreadyPlacing,
    /// Every placeable identifier has been handed out.
    IdsExhausted,
}

impl From<OccupancyError> for PlacementError {
    fn from(error: OccupancyError) -> Self {
        match error {
            OccupancyError::AlreadyRegistered { .. } => Self::AlreadyRegistered,
            OccupancyError::NotRegistered { .. } => Self::MissingPlaceable,
        }
    }
}
