//! Static structures: reload stations and obstacles.

use glam::{Mat4, Vec3};

use crate::entity::MatrixExt;
use crate::spatial::Aabb;

/// A place where boats refill their missiles.
///
/// Stations carry no state; boats find them through
/// [`EntityRegistry::nearest_of_kind`](crate::registry::EntityRegistry::nearest_of_kind).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadStation;

/// Solid scenery that blocks line of sight and pushes boats away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    bounds: Aabb,
}

impl Obstacle {
    pub(crate) fn new(transform: &Mat4, half_extents: Vec3) -> Self {
        Self {
            bounds: Aabb::from_center_half_extents(transform.position(), half_extents),
        }
    }

    /// World-space bounding box.
    #[must_use]
    pub const fn bounds(&self) -> Aabb {
        self.bounds
    }
}
