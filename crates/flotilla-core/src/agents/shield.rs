//! Shield bubbles.

use glam::Mat4;
use std::f32::consts::TAU;
use tracing::debug;

use crate::entity::{EntityId, MatrixExt, RenderSettings, Transforms};
use crate::message::MessageBody;
use crate::registry::{Lifecycle, TickContext};

/// A timed bubble that follows its owner, spinning and pulsing, and tells
/// the owner when it expires.
#[derive(Debug, Clone, PartialEq)]
pub struct Shield {
    owner: EntityId,
    duration: f32,
    elapsed: f32,
    base_scale: f32,
    spin: f32,
}

impl Shield {
    pub(crate) fn new(owner: EntityId, duration: f32, transform: &Mat4) -> Self {
        Self {
            owner,
            duration,
            elapsed: 0.0,
            base_scale: transform.uniform_scale(),
            spin: 0.0,
        }
    }

    /// Boat this shield protects.
    #[must_use]
    pub const fn owner(&self) -> EntityId {
        self.owner
    }

    /// Seconds left before the shield expires.
    #[must_use]
    pub fn remaining(&self) -> f32 {
        (self.duration - self.elapsed).max(0.0)
    }

    pub(crate) fn update(
        &mut self,
        transforms: &mut Transforms,
        render: &mut RenderSettings,
        ctx: &mut TickContext<'_>,
    ) -> Lifecycle {
        while ctx.receive().is_some() {}
        self.elapsed += ctx.dt;

        let owner_pos = ctx.registry.get(self.owner).map(|e| e.position());
        let Some(owner_pos) = owner_pos.filter(|_| self.elapsed < self.duration) else {
            debug!(shield = %ctx.current, owner = %self.owner, "Shield expired");
            if ctx.registry.contains(self.owner) {
                ctx.send(self.owner, MessageBody::ShieldDestroyed);
            }
            return Lifecycle::Destroy;
        };

        let tuning = &ctx.config.shield;
        self.spin += tuning.spin_deg_per_sec.to_radians() * ctx.dt;
        let pulse = 1.0 + tuning.pulse_amplitude * (TAU * tuning.pulse_frequency * self.elapsed).sin();
        *transforms.root_mut() = Mat4::from_translation(owner_pos)
            * Mat4::from_rotation_y(self.spin)
            * Mat4::from_scale(glam::Vec3::splat(self.base_scale * pulse));

        // Fade out over the last second.
        render.tint.w = 0.5 * self.remaining().min(1.0);
        Lifecycle::Keep
    }
}
