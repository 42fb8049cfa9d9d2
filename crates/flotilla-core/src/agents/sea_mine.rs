//! Sea mines.

use glam::Mat4;
use tracing::debug;

use super::float_height;
use crate::entity::{MatrixExt, Transforms};
use crate::message::MessageBody;
use crate::registry::{Lifecycle, TickContext};

/// A mine that rises to its resting depth, bobs, and detonates on the first
/// boat that comes within range.
#[derive(Debug, Clone, PartialEq)]
pub struct SeaMine {
    start_y: f32,
    elapsed: f32,
}

impl SeaMine {
    pub(crate) fn new(transform: &Mat4) -> Self {
        Self {
            start_y: transform.position().y,
            elapsed: 0.0,
        }
    }

    /// Time since the mine was placed.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub(crate) fn update(&mut self, transforms: &mut Transforms, ctx: &mut TickContext<'_>) -> Lifecycle {
        while ctx.receive().is_some() {}
        let tuning = &ctx.config.sea_mine;
        self.elapsed += ctx.dt;

        let root = transforms.root_mut();
        let mut position = root.position();
        position.y = float_height(self.start_y, self.elapsed, tuning);
        root.set_position(position);
        root.rotate_local_y(tuning.spin_rate * ctx.dt);

        let victim = ctx
            .registry
            .boats()
            .map(|(e, _)| (e.id(), e.position().distance(position)))
            .filter(|&(_, d)| d <= tuning.trigger_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match victim {
            Some((boat, _)) => {
                debug!(mine = %ctx.current, boat = %boat, "Mine triggered");
                ctx.send(boat, MessageBody::MineHit);
                Lifecycle::Destroy
            }
            None => Lifecycle::Keep,
        }
    }
}
