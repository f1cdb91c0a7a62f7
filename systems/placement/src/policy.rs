//! Per-kind placement rules.

use buildgrid_core::{ObjectKind, SurfaceHit, SurfaceTag};
use glam::Vec3;

/// Pure functions describing how one object kind is placed.
#[derive(Clone, Copy, Debug)]
pub struct KindPolicy {
    /// Fraction of the object's extent used to push it off the hit surface.
    pub placement_offset: f32,
    /// Decides whether a surface is an acceptable placement target.
    pub is_valid_surface: fn(SurfaceTag) -> bool,
}

impl KindPolicy {
    /// Unsnapped position for an object of `extent` resting against `hit`.
    #[must_use]
    pub fn candidate_position(&self, hit: &SurfaceHit, extent: f32) -> Vec3 {
        hit.point + hit.normal * (extent * self.placement_offset)
    }

    /// Reports whether the surface with `tag` accepts this kind.
    #[must_use]
    pub fn accepts(&self, tag: SurfaceTag) -> bool {
        (self.is_valid_surface)(tag)
    }
}

static GROUND_ANCHORED: KindPolicy = KindPolicy {
    placement_offset: 0.5,
    is_valid_surface: ground_surface,
};

static WALL_ANCHORED: KindPolicy = KindPolicy {
    placement_offset: 0.5,
    is_valid_surface: wall_surface,
};

/// Placement rules for the provided kind.
#[must_use]
pub fn policy_for(kind: ObjectKind) -> &'static KindPolicy {
    match kind {
        ObjectKind::GroundAnchored => &GROUND_ANCHORED,
        ObjectKind::WallAnchored => &WALL_ANCHORED,
    }
}

fn ground_surface(tag: SurfaceTag) -> bool {
    tag == SurfaceTag::Ground
}

fn wall_surface(tag: SurfaceTag) -> bool {
    tag == SurfaceTag::Wall
}
