//! Analytic scene made of tagged planes, standing in for an engine raycast.

use buildgrid_core::{LayerMask, Ray, SurfaceHit, SurfaceTag};
use glam::Vec3;

/// Rays closer to parallel than this never hit a plane.
const PARALLEL_EPSILON: f32 = 1e-6;

/// One planar surface, optionally bounded to a square patch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Surface {
    /// Point lying on the plane; centre of the patch when bounded.
    pub(crate) origin: Vec3,
    /// Unit normal facing the side that can be hit.
    pub(crate) normal: Vec3,
    /// Classification reported with hits.
    pub(crate) tag: SurfaceTag,
    /// Layer index checked against the hit-test mask.
    pub(crate) layer: u32,
    /// Half the side length of the patch, unbounded when `None`.
    pub(crate) half_size: Option<f32>,
}

impl Surface {
    /// Distance along `ray` at which it crosses the surface's front face.
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        let denom = self.normal.dot(ray.direction);
        if denom > -PARALLEL_EPSILON {
            return None;
        }

        let distance = (self.origin - ray.origin).dot(self.normal) / denom;
        if distance < 0.0 {
            return None;
        }

        if let Some(half_size) = self.half_size {
            let offset = ray.point_at(distance) - self.origin;
            if offset.abs().max_element() > half_size {
                return None;
            }
        }
        Some(distance)
    }
}

/// Collection of surfaces queried by the placement hit test.
#[derive(Clone, Debug, Default)]
pub(crate) struct Scene {
    surfaces: Vec<Surface>,
}

impl Scene {
    /// Creates a scene from its surfaces.
    pub(crate) fn new(surfaces: Vec<Surface>) -> Self {
        Self { surfaces }
    }

    /// Nearest surface on an allowed layer hit within `max_distance`.
    pub(crate) fn hit(&self, ray: Ray, max_distance: f32, layers: LayerMask) -> Option<SurfaceHit> {
        self.surfaces
            .iter()
            .filter(|surface| layers.contains(surface.layer))
            .filter_map(|surface| {
                surface
                    .intersect(&ray)
                    .filter(|distance| *distance <= max_distance)
                    .map(|distance| (distance, surface))
            })
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(distance, surface)| SurfaceHit {
                point: ray.point_at(distance),
                normal: surface.normal,
                tag: surface.tag,
            })
    }
}
