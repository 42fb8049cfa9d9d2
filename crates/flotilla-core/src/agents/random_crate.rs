//! Floating pickup crates.

use glam::Mat4;
use tracing::debug;

use super::float_height;
use crate::entity::{MatrixExt, Transforms};
use crate::message::{CrateKind, MessageBody};
use crate::registry::{Lifecycle, TickContext};

/// A crate that surfaces, bobs, and is collected by the first boat that
/// touches it.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomCrate {
    kind: CrateKind,
    start_y: f32,
    elapsed: f32,
}

impl RandomCrate {
    pub(crate) fn new(kind: CrateKind, transform: &Mat4) -> Self {
        Self {
            kind,
            start_y: transform.position().y,
            elapsed: 0.0,
        }
    }

    /// Contents.
    #[must_use]
    pub const fn kind(&self) -> CrateKind {
        self.kind
    }

    pub(crate) fn update(&mut self, transforms: &mut Transforms, ctx: &mut TickContext<'_>) -> Lifecycle {
        while ctx.receive().is_some() {}
        let tuning = &ctx.config.random_crate;
        self.elapsed += ctx.dt;

        let root = transforms.root_mut();
        let mut position = root.position();
        position.y = float_height(self.start_y, self.elapsed, tuning);
        root.set_position(position);
        root.rotate_local_y(tuning.spin_rate * ctx.dt);

        let collector = ctx
            .registry
            .boats()
            .filter(|(_, b)| !b.is_destroyed())
            .map(|(e, _)| (e.id(), e.position().distance(position)))
            .filter(|&(_, d)| d <= tuning.trigger_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match collector {
            Some((boat, _)) => {
                debug!(crate_id = %ctx.current, boat = %boat, kind = %self.kind, "Crate collected");
                ctx.send(boat, MessageBody::CrateCollected { kind: self.kind });
                Lifecycle::Destroy
            }
            None => Lifecycle::Keep,
        }
    }
}
