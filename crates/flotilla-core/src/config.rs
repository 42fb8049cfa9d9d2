//! Gameplay tuning.
//!
//! Every constant the agents use lives here so a headless run can override
//! them from JSON. All structs are `#[serde(default)]`, so an override file
//! only needs the fields it changes.

use serde::{Deserialize, Serialize};

/// Top-level simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Boat behaviour
    pub boat: BoatTuning,
    /// Collision avoidance
    pub avoidance: AvoidanceConfig,
    /// Missile flight
    pub missile: MissileTuning,
    /// Sea mine motion and trigger
    pub sea_mine: FloatTuning,
    /// Crate motion and trigger
    pub random_crate: FloatTuning,
    /// Shield animation
    pub shield: ShieldTuning,
    /// Template used when a boat fires
    pub missile_template: String,
    /// Template used when a boat picks up a shield crate
    pub shield_template: String,
    /// Height of the water plane used for point-and-click targeting
    pub water_plane_y: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            boat: BoatTuning::default(),
            avoidance: AvoidanceConfig::default(),
            missile: MissileTuning::default(),
            sea_mine: FloatTuning::sea_mine(),
            random_crate: FloatTuning::random_crate(),
            shield: ShieldTuning::default(),
            missile_template: "Missile".to_string(),
            shield_template: "Shield".to_string(),
            water_plane_y: -1.5,
        }
    }
}

impl SimConfig {
    /// Parse a (possibly partial) configuration from JSON.
    ///
    /// # Errors
    ///
    /// [`CoreError::ConfigParse`](crate::CoreError::ConfigParse) if `json`
    /// is not a valid configuration.
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(crate::CoreError::ConfigParse)
    }
}

/// Constants for the boat state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoatTuning {
    /// Distance at which a steering target counts as reached
    pub arrival_radius: f32,
    /// Patrol points are drawn from `[-half, half]` on X and Z
    pub patrol_half_extent: f32,
    /// Half-angle of the forward detection cone (degrees)
    pub detect_half_angle_deg: f32,
    /// Detection range
    pub detect_range: f32,
    /// Time spent tracking a target before firing (s)
    pub aim_duration: f32,
    /// Evade speed as a multiple of max speed
    pub evade_speed_factor: f32,
    /// Give up on the evade point after this long (s)
    pub evade_timeout: f32,
    /// Distance from the boat to its evade point
    pub evade_distance: f32,
    /// Evade points are never chosen within this half-angle of the enemy (degrees)
    pub evade_cone_half_angle_deg: f32,
    /// After evading, crates within this range are picked up
    pub crate_search_radius: f32,
    /// Distance to a reload station at which reloading starts
    pub reload_range: f32,
    /// Time spent reloading (s)
    pub reload_duration: f32,
    /// Missiles after a reload
    pub missile_capacity: u32,
    /// Missiles granted by a missile crate
    pub crate_missiles: u32,
    /// Hit points granted by a health crate
    pub crate_health: f32,
    /// Shortest shield duration (s)
    pub shield_duration_min: f32,
    /// Longest shield duration (s)
    pub shield_duration_max: f32,
    /// Damage from a hit whose attacker is unknown
    pub default_hit_damage: f32,
    /// Mine damage without a shield
    pub mine_damage: f32,
    /// Mine damage with a shield
    pub mine_damage_shielded: f32,
    /// Chance a surviving boat calls for help when hit
    pub help_chance: f64,
    /// Smallest help broadcast radius
    pub help_radius_min: f32,
    /// Largest help broadcast radius
    pub help_radius_max: f32,
    /// Wiggle duration after a mine hit (s)
    pub wiggle_duration: f32,
    /// Peak hull roll during a wiggle (radians)
    pub wiggle_amplitude: f32,
    /// Wiggle oscillation rate (rad/s)
    pub wiggle_frequency: f32,
    /// Exponential decay of the wiggle
    pub wiggle_damping: f32,
    /// Backwards drift speed during a wiggle
    pub recoil_speed: f32,
    /// Time from destruction to removal (s)
    pub sink_duration: f32,
    /// Sinking speed
    pub sink_speed: f32,
    /// Roll rate while sinking (rad/s)
    pub sink_roll_rate: f32,
    /// Range at which an assisting boat switches to aiming
    pub assist_engage_range: f32,
    /// How long transient label text is shown (s)
    pub label_duration: f32,
    /// Height above the boat at which missiles spawn
    pub launch_height: f32,
}

impl Default for BoatTuning {
    fn default() -> Self {
        Self {
            arrival_radius: 5.0,
            patrol_half_extent: 300.0,
            detect_half_angle_deg: 70.0,
            detect_range: 140.0,
            aim_duration: 2.0,
            evade_speed_factor: 2.0,
            evade_timeout: 5.0,
            evade_distance: 100.0,
            evade_cone_half_angle_deg: 60.0,
            crate_search_radius: 75.0,
            reload_range: 40.0,
            reload_duration: 5.0,
            missile_capacity: 10,
            crate_missiles: 2,
            crate_health: 20.0,
            shield_duration_min: 7.0,
            shield_duration_max: 15.0,
            default_hit_damage: 20.0,
            mine_damage: 50.0,
            mine_damage_shielded: 25.0,
            help_chance: 0.5,
            help_radius_min: 100.0,
            help_radius_max: 300.0,
            wiggle_duration: 2.0,
            wiggle_amplitude: 0.35,
            wiggle_frequency: 12.0,
            wiggle_damping: 2.0,
            recoil_speed: 5.0,
            sink_duration: 4.0,
            sink_speed: 3.0,
            sink_roll_rate: 0.4,
            assist_engage_range: 120.0,
            label_duration: 3.0,
            launch_height: 3.0,
        }
    }
}

/// Constants for local collision avoidance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceConfig {
    /// Other agents closer than this push back
    pub agent_safe_radius: f32,
    /// Obstacles whose centre is closer than this push back
    pub obstacle_safe_radius: f32,
    /// Agents closer than this and ahead are an immediate threat
    pub threat_radius: f32,
    /// Half-angle of the forward threat cone (degrees)
    pub threat_angle_deg: f32,
    /// Length of a non-zero avoidance vector
    pub strength: f32,
    /// Weight of the goal heading in the blend
    pub goal_weight: f32,
    /// Weight of the avoidance vector in the blend
    pub avoidance_weight: f32,
    /// Fraction of the previous heading kept each tick
    pub smoothing: f32,
    /// Turn rate multiplier while steering with avoidance
    pub turn_boost: f32,
    /// Speed cap under immediate threat, as a fraction of max speed
    pub threat_speed_factor: f32,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            agent_safe_radius: 40.0,
            obstacle_safe_radius: 110.0,
            threat_radius: 25.0,
            threat_angle_deg: 30.0,
            strength: 1.0,
            goal_weight: 1.0,
            avoidance_weight: 1.5,
            smoothing: 0.2,
            turn_boost: 1.5,
            threat_speed_factor: 0.5,
        }
    }
}

/// Constants for missile flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissileTuning {
    /// Speed used to estimate flight time when aiming
    pub speed: f32,
    /// Downward acceleration
    pub gravity: f32,
    /// Missiles below this height are removed
    pub min_altitude: f32,
    /// Distance to a boat at which the missile hits
    pub hit_radius: f32,
}

impl Default for MissileTuning {
    fn default() -> Self {
        Self {
            speed: 60.0,
            gravity: 9.81,
            min_altitude: -15.0,
            hit_radius: 15.0,
        }
    }
}

/// Rise-then-bob motion shared by floating pickups and mines.
///
/// Objects rise from the height they were spawned at to `rest_height`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloatTuning {
    /// Time to rise from the spawn height to the resting height (s)
    pub rise_duration: f32,
    /// Resting height
    pub rest_height: f32,
    /// Bobbing amplitude
    pub bob_amplitude: f32,
    /// Bobbing rate (rad/s)
    pub bob_rate: f32,
    /// Spin about Y (rad/s)
    pub spin_rate: f32,
    /// Distance to a boat that triggers the object
    pub trigger_radius: f32,
}

impl FloatTuning {
    /// Defaults for sea mines.
    #[must_use]
    pub fn sea_mine() -> Self {
        Self {
            rise_duration: 3.0,
            rest_height: -11.5,
            bob_amplitude: 0.7,
            bob_rate: 1.0,
            spin_rate: 0.35,
            trigger_radius: 15.0,
        }
    }

    /// Defaults for crates.
    #[must_use]
    pub fn random_crate() -> Self {
        Self {
            rise_duration: 2.0,
            rest_height: -0.4,
            bob_amplitude: 0.7,
            bob_rate: 1.0,
            spin_rate: 0.75,
            trigger_radius: 15.0,
        }
    }
}

impl Default for FloatTuning {
    fn default() -> Self {
        Self::random_crate()
    }
}

/// Shield animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldTuning {
    /// Spin about Y (degrees/s)
    pub spin_deg_per_sec: f32,
    /// Pulse frequency (Hz)
    pub pulse_frequency: f32,
    /// Pulse amplitude as a fraction of the base scale
    pub pulse_amplitude: f32,
}

impl Default for ShieldTuning {
    fn default() -> Self {
        Self {
            spin_deg_per_sec: 15.0,
            pulse_frequency: 0.5,
            pulse_amplitude: 0.05,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_behaviour() {
        let c = SimConfig::default();
        assert_eq!(c.boat.detect_half_angle_deg, 70.0);
        assert_eq!(c.boat.detect_range, 140.0);
        assert_eq!(c.boat.missile_capacity, 10);
        assert_eq!(c.missile.hit_radius, 15.0);
        assert_eq!(c.sea_mine.rest_height, -11.5);
        assert_eq!(c.random_crate.rest_height, -0.4);
        assert_eq!(c.missile_template, "Missile");
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let c = SimConfig::from_json_str(r#"{ "boat": { "aim_duration": 0.5 }, "missile": { "speed": 90.0 } }"#)
            .unwrap();
        assert_eq!(c.boat.aim_duration, 0.5);
        assert_eq!(c.boat.reload_range, 40.0);
        assert_eq!(c.missile.speed, 90.0);
        assert_eq!(c.missile.gravity, 9.81);
        assert_eq!(c.sea_mine, FloatTuning::sea_mine());
    }

    #[test]
    fn round_trips_through_json() {
        let c = SimConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(SimConfig::from_json_str(&json).unwrap(), c);
    }

    #[test]
    fn bad_json_is_an_error() {
        let err = SimConfig::from_json_str("{ boat: 1 }").unwrap_err();
        assert!(matches!(err, crate::CoreError::ConfigParse(_)), "{err}");
    }
}
