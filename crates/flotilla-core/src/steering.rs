//! Turn-rate limited facing and local collision avoidance.
//!
//! Everything here is a pure function of its inputs. Boats move on the water
//! plane, so all headings are flattened onto XZ before use and every result
//! lies in that plane.

use glam::{Mat4, Vec3};

use crate::config::AvoidanceConfig;
use crate::entity::MatrixExt;
use crate::spatial::Aabb;

/// Distances below this are treated as "same position" and skipped.
pub const DISTANCE_EPSILON: f32 = 1e-4;

/// Project onto the water plane and normalise, or zero if nothing is left.
#[must_use]
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z).normalize_or_zero()
}

/// Signed yaw (radians) that turns `forward` towards `desired`, clamped to
/// `turn_rate * dt`.
///
/// Positive angles turn towards +X when facing +Z. Returns zero when either
/// vector has no horizontal component.
#[must_use]
pub fn turn_towards(forward: Vec3, desired: Vec3, dt: f32, turn_rate: f32) -> f32 {
    let f = flatten(forward);
    let d = flatten(desired);
    if f == Vec3::ZERO || d == Vec3::ZERO {
        return 0.0;
    }
    let angle = f.cross(d).y.atan2(f.dot(d));
    let max_step = (turn_rate * dt).max(0.0);
    angle.clamp(-max_step, max_step)
}

/// Yaw `transform` towards `desired` by at most `turn_rate * dt`.
///
/// Returns the angle actually applied.
pub fn face_direction(transform: &mut Mat4, desired: Vec3, dt: f32, turn_rate: f32) -> f32 {
    let angle = turn_towards(transform.forward(), desired, dt, turn_rate);
    if angle != 0.0 {
        transform.rotate_local_y(angle);
    }
    angle
}

/// Output of [`compute_avoidance`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Avoidance {
    /// Repulsion, length in `[0, strength]`
    pub vector: Vec3,
    /// Another agent is close and ahead
    pub immediate_threat: bool,
}

/// Weighted repulsion from nearby agents and obstacles.
///
/// Each agent inside `agent_safe_radius` pushes with weight
/// `1 - distance / agent_safe_radius` away from itself; each obstacle whose
/// centre lies inside `obstacle_safe_radius` pushes the same way from its
/// centre. The sum is flattened, normalised and scaled to `strength`.
#[must_use]
pub fn compute_avoidance(
    position: Vec3,
    forward: Vec3,
    agents: &[Vec3],
    obstacles: &[Aabb],
    config: &AvoidanceConfig,
) -> Avoidance {
    let mut push = Vec3::ZERO;
    let mut immediate_threat = false;
    let heading = flatten(forward);
    let threat_cos = config.threat_angle_deg.to_radians().cos();

    for &other in agents {
        let away = position - other;
        let distance = away.length();
        if distance < DISTANCE_EPSILON || distance >= config.agent_safe_radius {
            continue;
        }
        push += away / distance * (1.0 - distance / config.agent_safe_radius);

        if distance < config.threat_radius && heading.dot(-away / distance) > threat_cos {
            immediate_threat = true;
        }
    }

    for obstacle in obstacles {
        let away = position - obstacle.center();
        let distance = away.length();
        if distance < DISTANCE_EPSILON || distance >= config.obstacle_safe_radius {
            continue;
        }
        push += away / distance * (1.0 - distance / config.obstacle_safe_radius);
    }

    let vector = flatten(push) * config.strength;
    Avoidance {
        vector: if vector.is_finite() { vector } else { Vec3::ZERO },
        immediate_threat,
    }
}

/// Blend a goal heading with avoidance, then ease it towards `previous`.
///
/// Returns a unit vector on the water plane, or zero if `goal`, `avoidance`
/// and `previous` are all zero.
#[must_use]
pub fn blend_heading(goal: Vec3, avoidance: Vec3, previous: Vec3, config: &AvoidanceConfig) -> Vec3 {
    let goal = flatten(goal);
    let mut desired = flatten(goal * config.goal_weight + avoidance * config.avoidance_weight);
    if desired == Vec3::ZERO {
        desired = goal;
    }
    let previous = flatten(previous);
    if previous == Vec3::ZERO {
        return desired;
    }
    let smoothed = flatten(desired.lerp(previous, config.smoothing.clamp(0.0, 1.0)));
    if smoothed == Vec3::ZERO {
        desired
    } else {
        smoothed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn config() -> AvoidanceConfig {
        AvoidanceConfig::default()
    }

    mod turn_tests {
        use super::*;

        #[test]
        fn small_angle_is_reached_in_one_step() {
            let desired = Vec3::new(0.1_f32.sin(), 0.0, 0.1_f32.cos());
            let angle = turn_towards(Vec3::Z, desired, 1.0, 1.0);
            assert!((angle - 0.1).abs() < 1e-5);
        }

        #[test]
        fn large_angle_is_clamped() {
            let angle = turn_towards(Vec3::Z, Vec3::X, 0.1, 1.0);
            assert!((angle - 0.1).abs() < 1e-6);
            let angle = turn_towards(Vec3::Z, -Vec3::X, 0.1, 1.0);
            assert!((angle + 0.1).abs() < 1e-6);
        }

        #[test]
        fn vertical_component_is_ignored() {
            let angle = turn_towards(Vec3::Z, Vec3::new(0.0, 50.0, 1.0), 1.0, 10.0);
            assert!(angle.abs() < 1e-6);
        }

        #[test]
        fn degenerate_inputs_do_not_turn() {
            assert_eq!(turn_towards(Vec3::Y, Vec3::X, 1.0, 1.0), 0.0);
            assert_eq!(turn_towards(Vec3::Z, Vec3::ZERO, 1.0, 1.0), 0.0);
        }

        #[test]
        fn face_direction_rotates_forward() {
            let mut m = Mat4::IDENTITY;
            let applied = face_direction(&mut m, Vec3::X, 1.0, FRAC_PI_2);
            assert!((applied - FRAC_PI_2).abs() < 1e-5);
            assert!(m.forward().abs_diff_eq(Vec3::X, 1e-5));
        }

        #[test]
        fn opposite_direction_turns_at_full_rate() {
            let angle = turn_towards(Vec3::Z, -Vec3::Z, 0.5, 1.0);
            assert!((angle.abs() - 0.5).abs() < 1e-6);
            assert!(angle.abs() <= PI);
        }
    }

    mod avoidance_tests {
        use super::*;

        #[test]
        fn nothing_nearby_gives_zero() {
            let a = compute_avoidance(Vec3::ZERO, Vec3::Z, &[Vec3::new(1000.0, 0.0, 0.0)], &[], &config());
            assert_eq!(a.vector, Vec3::ZERO);
            assert!(!a.immediate_threat);
        }

        #[test]
        fn pushes_away_from_agent() {
            let a = compute_avoidance(Vec3::ZERO, Vec3::Z, &[Vec3::new(10.0, 0.0, 0.0)], &[], &config());
            assert!(a.vector.x < 0.0);
            assert!((a.vector.length() - config().strength).abs() < 1e-5);
        }

        #[test]
        fn coincident_agent_is_skipped() {
            let a = compute_avoidance(Vec3::ONE, Vec3::Z, &[Vec3::ONE], &[], &config());
            assert_eq!(a.vector, Vec3::ZERO);
        }

        #[test]
        fn agent_ahead_is_a_threat() {
            let cfg = config();
            let ahead = Vec3::new(0.0, 0.0, cfg.threat_radius * 0.5);
            let a = compute_avoidance(Vec3::ZERO, Vec3::Z, &[ahead], &[], &cfg);
            assert!(a.immediate_threat);

            let behind = -ahead;
            let a = compute_avoidance(Vec3::ZERO, Vec3::Z, &[behind], &[], &cfg);
            assert!(!a.immediate_threat);
        }

        #[test]
        fn pushes_away_from_obstacle_centre() {
            let rock = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, 50.0), Vec3::splat(20.0));
            let a = compute_avoidance(Vec3::ZERO, Vec3::Z, &[], &[rock], &config());
            assert!(a.vector.z < 0.0);
        }
    }

    mod blend_tests {
        use super::*;

        #[test]
        fn no_avoidance_keeps_goal() {
            let cfg = AvoidanceConfig {
                smoothing: 0.0,
                ..config()
            };
            let h = blend_heading(Vec3::X, Vec3::ZERO, Vec3::Z, &cfg);
            assert!(h.abs_diff_eq(Vec3::X, 1e-5));
        }

        #[test]
        fn result_is_unit_on_plane() {
            let h = blend_heading(Vec3::new(1.0, 3.0, 1.0), Vec3::new(-0.5, 0.0, 0.2), Vec3::Z, &config());
            assert!((h.length() - 1.0).abs() < 1e-5);
            assert_eq!(h.y, 0.0);
        }

        #[test]
        fn cancelling_avoidance_falls_back_to_goal() {
            let cfg = AvoidanceConfig {
                goal_weight: 1.0,
                avoidance_weight: 1.0,
                smoothing: 0.0,
                ..config()
            };
            let h = blend_heading(Vec3::X, -Vec3::X, Vec3::ZERO, &cfg);
            assert!(h.abs_diff_eq(Vec3::X, 1e-5));
        }
    }
}
