//! Closed-form missile aiming.
//!
//! Flight time is estimated from straight-line distance at a fixed
//! projectile speed, the target is extrapolated along its current velocity
//! for that long, and the vertical launch speed is solved so the arc under
//! gravity arrives at the predicted point at the same moment.

use glam::Vec3;

/// A solved shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intercept {
    /// Estimated flight time (s)
    pub time: f32,
    /// Where the target is expected to be on arrival
    pub aim_point: Vec3,
    /// Initial missile velocity
    pub velocity: Vec3,
}

/// Solve a ballistic shot from `launch` at a target moving with `target_velocity`.
///
/// Returns `None` when the target sits on the launch point or the projectile
/// speed is not positive.
#[must_use]
pub fn solve_intercept(
    launch: Vec3,
    target: Vec3,
    target_velocity: Vec3,
    projectile_speed: f32,
    gravity: f32,
) -> Option<Intercept> {
    if projectile_speed <= 0.0 {
        return None;
    }
    let time = (target - launch).length() / projectile_speed;
    if time <= f32::EPSILON {
        return None;
    }
    let aim_point = target + target_velocity * time;
    let delta = aim_point - launch;
    let velocity = Vec3::new(
        delta.x / time,
        (delta.y + 0.5 * gravity * time * time) / time,
        delta.z / time,
    );
    velocity.is_finite().then_some(Intercept {
        time,
        aim_point,
        velocity,
    })
}

/// Position after `t` seconds of flight from `launch` with `velocity`.
#[must_use]
pub fn position_at(launch: Vec3, velocity: Vec3, gravity: f32, t: f32) -> Vec3 {
    launch + velocity * t - Vec3::Y * (0.5 * gravity * t * t)
}
