#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure placement system driving one object's preview, commit or cancel.
//!
//! A [`PlacementSession`] reads the world through its query surface, consumes
//! one [`PlacementInput`] snapshot per tick, and answers with commands for the
//! world plus a [`PlacementPreview`] for the renderer.

pub mod policy;

use buildgrid_core::{Command, LayerMask, PlaceableId, Ray, SurfaceHit, ValidityState};
use buildgrid_world::{query, World};
use glam::Vec3;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use self::policy::policy_for;

/// Distance the aim ray is tested against the scene when nothing overrides it.
pub const DEFAULT_MAX_PLACEMENT_DISTANCE: f32 = 5.0;

/// Yaw added per discrete rotate input when nothing overrides it.
pub const DEFAULT_ROTATION_STEP_DEGREES: f32 = 45.0;

/// Tunables shared by every placement session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Maximum hit-test distance along the aim ray.
    pub max_placement_distance: f32,
    /// Scene layers the hit test considers.
    pub layers: LayerMask,
    /// Yaw applied per rotate input, in degrees.
    pub rotation_step_degrees: f32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_placement_distance: DEFAULT_MAX_PLACEMENT_DISTANCE,
            layers: LayerMask::ALL,
            rotation_step_degrees: DEFAULT_ROTATION_STEP_DEGREES,
        }
    }
}

/// Lifecycle stage of a placement session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Waiting for a begin signal.
    Idle,
    /// The object follows the aim ray.
    Following,
    /// The object was placed; the session is finished.
    Committed,
    /// The placement was aborted; the session is finished.
    Cancelled,
}

impl SessionState {
    /// Reports whether the session can no longer change state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Cancelled)
    }
}

/// Input snapshot distilled from adapter-provided frame input data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementInput {
    /// Ray cast from the pointer into the scene.
    pub aim: Ray,
    /// Edge-triggered request to pick the object up.
    pub begin: bool,
    /// Edge-triggered request to place the object.
    pub confirm: bool,
    /// Edge-triggered request to abort placement.
    pub cancel: bool,
    /// Rotation input for this tick; only its sign matters.
    pub rotate_delta: f32,
}

impl PlacementInput {
    /// Creates an input carrying only an aim ray.
    #[must_use]
    pub const fn aimed(aim: Ray) -> Self {
        Self {
            aim,
            begin: false,
            confirm: false,
            cancel: false,
            rotate_delta: 0.0,
        }
    }
}

/// Declarative preview handed to the renderer once per following tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementPreview {
    /// Object being placed.
    pub placeable: PlaceableId,
    /// Position the object is shown at.
    pub position: Vec3,
    /// Accumulated yaw angle in degrees.
    pub rotation_degrees: f32,
    /// Feedback category driving the preview tint.
    pub validity: ValidityState,
}

/// Placement state machine for a single placeable.
#[derive(Clone, Debug)]
pub struct PlacementSession {
    placeable: PlaceableId,
    settings: SessionSettings,
    state: SessionState,
    original: Option<Vec3>,
    rotation_degrees: f32,
    last_validity: Option<ValidityState>,
}

impl PlacementSession {
    /// Creates an idle session for the provided placeable.
    #[must_use]
    pub fn new(placeable: PlaceableId, settings: SessionSettings) -> Self {
        Self {
            placeable,
            settings,
            state: SessionState::Idle,
            original: None,
            rotation_degrees: 0.0,
            last_validity: None,
        }
    }

    /// Placeable driven by the session.
    #[must_use]
    pub const fn placeable(&self) -> PlaceableId {
        self.placeable
    }

    /// Current lifecycle stage.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Position captured when the session began.
    #[must_use]
    pub const fn original(&self) -> Option<Vec3> {
        self.original
    }

    /// Accumulated yaw angle in degrees.
    #[must_use]
    pub const fn rotation_degrees(&self) -> f32 {
        self.rotation_degrees
    }

    /// Validity computed on the most recent following tick.
    #[must_use]
    pub const fn last_validity(&self) -> Option<ValidityState> {
        self.last_validity
    }

    /// Advances the session by one tick.
    ///
    /// `surface_hit` mirrors the adapter's hit test: it receives the aim ray,
    /// the maximum distance and the layer mask, and reports the first surface
    /// hit. Returns the preview to render, or `None` when nothing should be
    /// shown this tick.
    pub fn handle<F>(
        &mut self,
        world: &World,
        input: PlacementInput,
        mut surface_hit: F,
        out: &mut Vec<Command>,
    ) -> Option<PlacementPreview>
    where
        F: FnMut(Ray, f32, LayerMask) -> Option<SurfaceHit>,
    {
        match self.state {
            SessionState::Idle if input.begin => self.begin(world, out),
            SessionState::Idle => None,
            SessionState::Following => self.follow(world, input, &mut surface_hit, out),
            SessionState::Committed | SessionState::Cancelled => None,
        }
    }

    fn begin(&mut self, world: &World, out: &mut Vec<Command>) -> Option<PlacementPreview> {
        let Some(snapshot) = query::placeable(world, self.placeable) else {
            warn!("cannot begin placement of missing {:?}", self.placeable);
            return None;
        };
        if snapshot.placing {
            debug!("{:?} is already being placed, staying idle", self.placeable);
            return None;
        }

        self.state = SessionState::Following;
        self.original = Some(snapshot.position);
        self.rotation_degrees = snapshot.rotation_degrees;
        self.last_validity = Some(ValidityState::Floating);
        out.push(Command::BeginPlacement {
            placeable: self.placeable,
        });
        debug!(
            "{:?} following from {} (registered: {})",
            self.placeable,
            snapshot.position,
            snapshot.is_registered()
        );

        Some(PlacementPreview {
            placeable: self.placeable,
            position: snapshot.position,
            rotation_degrees: self.rotation_degrees,
            validity: ValidityState::Floating,
        })
    }

    fn follow<F>(
        &mut self,
        world: &World,
        input: PlacementInput,
        surface_hit: &mut F,
        out: &mut Vec<Command>,
    ) -> Option<PlacementPreview>
    where
        F: FnMut(Ray, f32, LayerMask) -> Option<SurfaceHit>,
    {
        let Some(snapshot) = query::placeable(world, self.placeable) else {
            warn!("{:?} vanished while following", self.placeable);
            self.state = SessionState::Cancelled;
            return None;
        };

        let max_distance = self.settings.max_placement_distance;
        let hit = surface_hit(input.aim, max_distance, self.settings.layers);
        let (position, validity) = match hit {
            Some(hit) => {
                let policy = policy_for(snapshot.kind);
                let mapper = query::mapper(world);
                let candidate = mapper.snap(policy.candidate_position(&hit, snapshot.extent));
                match query::resolve_free_position(world, candidate, snapshot.kind) {
                    Ok(resolved) => {
                        let valid = query::is_free(world, resolved, snapshot.kind)
                            && policy.accepts(hit.tag);
                        let validity = if valid {
                            ValidityState::Valid
                        } else {
                            ValidityState::Invalid
                        };
                        (resolved, validity)
                    }
                    Err(error) => {
                        debug!("{:?} has no free slot: {error}", self.placeable);
                        (candidate, ValidityState::Invalid)
                    }
                }
            }
            None => (input.aim.point_at(max_distance * 0.5), ValidityState::Floating),
        };
        self.last_validity = Some(validity);
        trace!("{:?} preview at {position} ({validity:?})", self.placeable);

        if input.confirm && validity == ValidityState::Valid {
            let position = query::mapper(world).snap(position);
            self.state = SessionState::Committed;
            out.push(Command::CommitPlacement {
                placeable: self.placeable,
                position,
            });
            debug!("{:?} committed at {position}", self.placeable);
            return Some(self.preview(position, validity));
        }

        if input.cancel {
            let original = self.original.unwrap_or(snapshot.position);
            self.state = SessionState::Cancelled;
            out.push(Command::CancelPlacement {
                placeable: self.placeable,
                original,
            });
            debug!("{:?} cancelled, returning to {original}", self.placeable);
            return None;
        }

        if position != snapshot.position {
            out.push(Command::MovePlaceable {
                placeable: self.placeable,
                position,
            });
        }
        self.rotate(input.rotate_delta, out);

        Some(self.preview(position, validity))
    }

    fn rotate(&mut self, delta: f32, out: &mut Vec<Command>) {
        if delta == 0.0 || !delta.is_finite() {
            return;
        }

        self.rotation_degrees += delta.signum() * self.settings.rotation_step_degrees;
        out.push(Command::RotatePlaceable {
            placeable: self.placeable,
            degrees: self.rotation_degrees,
        });
    }

    fn preview(&self, position: Vec3, validity: ValidityState) -> PlacementPreview {
        PlacementPreview {
            placeable: self.placeable,
            position,
            rotation_degrees: self.rotation_degrees,
            validity,
        }
    }
}
