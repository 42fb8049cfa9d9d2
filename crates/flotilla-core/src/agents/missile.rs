//! Ballistic missiles.

use glam::{Quat, Vec3};
use tracing::debug;

use crate::entity::{EntityId, MatrixExt, Transforms};
use crate::message::MessageBody;
use crate::registry::{Lifecycle, TickContext};

/// A missile in flight under gravity.
#[derive(Debug, Clone, PartialEq)]
pub struct Missile {
    launcher: EntityId,
    velocity: Vec3,
}

impl Missile {
    pub(crate) fn new(launcher: EntityId, velocity: Vec3) -> Self {
        Self { launcher, velocity }
    }

    /// Boat that fired this missile.
    #[must_use]
    pub const fn launcher(&self) -> EntityId {
        self.launcher
    }

    /// Current velocity.
    #[must_use]
    pub const fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub(crate) fn update(&mut self, transforms: &mut Transforms, ctx: &mut TickContext<'_>) -> Lifecycle {
        while ctx.receive().is_some() {}
        let tuning = &ctx.config.missile;

        self.velocity.y -= tuning.gravity * ctx.dt;
        let root = transforms.root_mut();
        let position = root.position() + self.velocity * ctx.dt;
        let direction = self.velocity.normalize_or_zero();
        if direction != Vec3::ZERO {
            let scale = root.uniform_scale();
            *root = glam::Mat4::from_scale_rotation_translation(
                Vec3::splat(scale),
                Quat::from_rotation_arc(Vec3::Z, direction),
                position,
            );
        } else {
            root.set_position(position);
        }

        if position.y < tuning.min_altitude {
            return Lifecycle::Destroy;
        }

        let hit = ctx
            .registry
            .boats()
            .filter(|(e, _)| e.id() != self.launcher)
            .map(|(e, _)| (e.id(), e.position().distance(position)))
            .filter(|&(_, d)| d <= tuning.hit_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match hit {
            Some((victim, _)) => {
                debug!(missile = %ctx.current, victim = %victim, launcher = %self.launcher, "Missile hit");
                ctx.send(
                    victim,
                    MessageBody::Hit {
                        attacker: self.launcher,
                    },
                );
                Lifecycle::Destroy
            }
            None => Lifecycle::Keep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Spawn;
    use crate::tests::helpers::sim_with_fleet;
    use glam::Mat4;

    #[test]
    fn falls_and_expires_below_min_altitude() {
        let (mut sim, _) = sim_with_fleet(1);
        let id = sim
            .registry_mut()
            .create_entity(
                "Missile",
                Spawn::Missile {
                    launcher: EntityId::NONE,
                    velocity: Vec3::new(0.0, 0.0, 10.0),
                },
                Mat4::from_translation(Vec3::new(0.0, 20.0, -400.0)),
                "",
            )
            .unwrap();
        sim.step(0.1);
        let m = sim.registry().get_as::<Missile>(id).unwrap();
        assert!(m.velocity().y < 0.0);
        let mut removed = false;
        for _ in 0..100 {
            if sim.step(0.1).destroyed.contains(&id) {
                removed = true;
                break;
            }
        }
        assert!(removed);
    }

    #[test]
    fn hits_nearby_boat_but_not_launcher() {
        let (mut sim, [a, b, _c]) = sim_with_fleet(2);
        let a_pos = sim.registry().get(a).unwrap().position();
        let spawn = Spawn::Missile {
            launcher: a,
            velocity: Vec3::ZERO,
        };
        let over_a = Mat4::from_translation(a_pos + Vec3::Y * 2.0);
        let own = sim.registry_mut().create_entity("Missile", spawn, over_a, "").unwrap();
        sim.step(0.01);
        assert!(sim.registry().contains(own));
        assert_eq!(sim.boat(a).unwrap().hp(), 100.0);

        let b_pos = sim.registry().get(b).unwrap().position();
        let over_b = Mat4::from_translation(b_pos + Vec3::Y * 2.0);
        let shot = sim.registry_mut().create_entity("Missile", spawn, over_b, "").unwrap();
        let report = sim.step(0.01);
        assert!(report.destroyed.contains(&shot));
        sim.step(0.01);
        let damage = sim.boat(a).unwrap().stats().missile_damage;
        assert_eq!(sim.boat(b).unwrap().hp(), 100.0 - damage);
    }
}
