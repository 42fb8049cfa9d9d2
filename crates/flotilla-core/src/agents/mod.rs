//! Kind-specific entity behaviour.
//!
//! Every entity carries one [`Agent`] variant holding its mutable state. The
//! variant is chosen once, at construction, from the [`Spawn`] arguments and
//! never changes. Typed access goes through [`AgentView`]:
//!
//! ```
//! use flotilla_core::agents::{Agent, AgentView, ReloadStation};
//!
//! let agent = Agent::ReloadStation(ReloadStation::default());
//! assert!(ReloadStation::view(&agent).is_some());
//! ```

pub mod boat;
pub mod missile;
pub mod random_crate;
pub mod sea_mine;
pub mod shield;
pub mod structure;

use glam::{Mat4, Vec3, Vec4};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityKind, EntityTemplate, RenderSettings, Team, Transforms};
use crate::error::{ConstructionError, CoreError, Result};
use crate::message::CrateKind;
use crate::registry::{Lifecycle, TickContext};

pub use boat::{Boat, BoatState};
pub use missile::Missile;
pub use random_crate::RandomCrate;
pub use sea_mine::SeaMine;
pub use shield::Shield;
pub use structure::{Obstacle, ReloadStation};

// =============================================================================
// Construction arguments
// =============================================================================

/// Kind-specific constructor arguments for [`EntityRegistry::create_entity`].
///
/// [`EntityRegistry::create_entity`]: crate::registry::EntityRegistry::create_entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Spawn {
    /// Static decoration
    Scenery,
    /// A boat starting at `speed` (clamped to the template's max speed)
    Boat {
        /// Initial speed
        speed: f32,
    },
    /// A missile in flight
    Missile {
        /// Boat that fired it
        launcher: EntityId,
        /// Initial velocity
        velocity: Vec3,
    },
    /// A sea mine
    SeaMine,
    /// A shield bubble around `owner`
    Shield {
        /// Boat the shield protects
        owner: EntityId,
        /// Lifetime (s)
        duration: f32,
    },
    /// A pickup crate
    RandomCrate {
        /// What it contains
        kind: CrateKind,
    },
    /// A reload station
    ReloadStation,
    /// A static obstacle
    Obstacle {
        /// Half size of the bounding box around the entity position
        half_extents: Vec3,
    },
}

impl Spawn {
    /// The kind of entity these arguments build.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Scenery => EntityKind::Scenery,
            Self::Boat { .. } => EntityKind::Boat,
            Self::Missile { .. } => EntityKind::Missile,
            Self::SeaMine => EntityKind::SeaMine,
            Self::Shield { .. } => EntityKind::Shield,
            Self::RandomCrate { .. } => EntityKind::RandomCrate,
            Self::ReloadStation => EntityKind::ReloadStation,
            Self::Obstacle { .. } => EntityKind::Obstacle,
        }
    }
}

// =============================================================================
// Agent
// =============================================================================

/// Kind-specific mutable state of an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Agent {
    /// No behaviour
    Scenery,
    /// Boat state machine
    Boat(Boat),
    /// Missile in flight
    Missile(Missile),
    /// Sea mine
    SeaMine(SeaMine),
    /// Shield bubble
    Shield(Shield),
    /// Pickup crate
    RandomCrate(RandomCrate),
    /// Reload station
    ReloadStation(ReloadStation),
    /// Static obstacle
    Obstacle(Obstacle),
}

impl Agent {
    /// The kind tag for this agent.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Scenery => EntityKind::Scenery,
            Self::Boat(_) => EntityKind::Boat,
            Self::Missile(_) => EntityKind::Missile,
            Self::SeaMine(_) => EntityKind::SeaMine,
            Self::Shield(_) => EntityKind::Shield,
            Self::RandomCrate(_) => EntityKind::RandomCrate,
            Self::ReloadStation(_) => EntityKind::ReloadStation,
            Self::Obstacle(_) => EntityKind::Obstacle,
        }
    }

    pub(crate) fn update(
        &mut self,
        me: EntityId,
        transforms: &mut Transforms,
        render: &mut RenderSettings,
        ctx: &mut TickContext<'_>,
    ) -> Lifecycle {
        match self {
            Self::Boat(boat) => boat.update(me, transforms, ctx),
            Self::Missile(missile) => missile.update(transforms, ctx),
            Self::SeaMine(mine) => mine.update(transforms, ctx),
            Self::Shield(shield) => shield.update(transforms, render, ctx),
            Self::RandomCrate(crate_) => crate_.update(transforms, ctx),
            Self::Scenery | Self::ReloadStation(_) | Self::Obstacle(_) => {
                // Static entities still drain their mailbox.
                while ctx.receive().is_some() {}
                Lifecycle::Keep
            }
        }
    }
}

/// Typed access to one [`Agent`] variant.
pub trait AgentView: Sized {
    /// Kind of entity holding this state.
    const KIND: EntityKind;

    /// Borrow the state if `agent` is this variant.
    fn view(agent: &Agent) -> Option<&Self>;

    /// Mutably borrow the state if `agent` is this variant.
    fn view_mut(agent: &mut Agent) -> Option<&mut Self>;
}

macro_rules! agent_view {
    ($($variant:ident),* $(,)?) => {
        $(
            impl AgentView for $variant {
                const KIND: EntityKind = EntityKind::$variant;

                fn view(agent: &Agent) -> Option<&Self> {
                    match agent {
                        Agent::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn view_mut(agent: &mut Agent) -> Option<&mut Self> {
                    match agent {
                        Agent::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

agent_view!(Boat, Missile, SeaMine, Shield, RandomCrate, ReloadStation, Obstacle);

// =============================================================================
// Construction
// =============================================================================

/// Build agent state and render settings for `spawn` from `template`.
/// Boats start with `missile_capacity` missiles.
pub(crate) fn build(
    spawn: &Spawn,
    template: &EntityTemplate,
    transform: &Mat4,
    missile_capacity: u32,
) -> Result<(Agent, RenderSettings)> {
    let invalid = |source: ConstructionError| CoreError::Construction {
        template: template.name().to_string(),
        source,
    };
    let mut render = RenderSettings::default();

    let agent = match *spawn {
        Spawn::Scenery => Agent::Scenery,
        Spawn::Boat { speed } => {
            let stats = template.boat_stats().ok_or_else(|| CoreError::KindMismatch {
                template: template.name().to_string(),
                requested: EntityKind::Boat,
            })?;
            let nodes = template.geometry().node_count;
            if nodes < boat::NODE_COUNT {
                return Err(invalid(ConstructionError::TooFewNodes {
                    needed: boat::NODE_COUNT,
                    available: nodes,
                }));
            }
            if !speed.is_finite() || speed < 0.0 {
                return Err(invalid(ConstructionError::InvalidParameter {
                    name: "speed",
                    value: speed,
                }));
            }
            render.tint = team_tint(stats.team);
            Agent::Boat(Boat::new(stats, speed, missile_capacity))
        }
        Spawn::Missile { launcher, velocity } => {
            if !velocity.is_finite() {
                return Err(invalid(ConstructionError::InvalidParameter {
                    name: "velocity",
                    value: velocity.length(),
                }));
            }
            Agent::Missile(Missile::new(launcher, velocity))
        }
        Spawn::SeaMine => Agent::SeaMine(SeaMine::new(transform)),
        Spawn::Shield { owner, duration } => {
            if !duration.is_finite() || duration <= 0.0 {
                return Err(invalid(ConstructionError::InvalidParameter {
                    name: "duration",
                    value: duration,
                }));
            }
            render.group = RenderSettings::ADDITIVE;
            render.tint = Vec4::new(0.4, 0.7, 1.0, 0.5);
            Agent::Shield(Shield::new(owner, duration, transform))
        }
        Spawn::RandomCrate { kind } => Agent::RandomCrate(RandomCrate::new(kind, transform)),
        Spawn::ReloadStation => Agent::ReloadStation(ReloadStation::default()),
        Spawn::Obstacle { half_extents } => {
            if !half_extents.is_finite() || half_extents.min_element() <= 0.0 {
                return Err(invalid(ConstructionError::InvalidParameter {
                    name: "half_extents",
                    value: half_extents.min_element(),
                }));
            }
            Agent::Obstacle(Obstacle::new(transform, half_extents))
        }
    };
    Ok((agent, render))
}

fn team_tint(team: Team) -> Vec4 {
    match team {
        Team::TeamA => Vec4::new(0.376, 0.376, 1.0, 1.0),
        Team::TeamB => Vec4::new(0.0, 1.0, 0.0, 1.0),
        Team::TeamC => Vec4::new(1.0, 0.0, 1.0, 1.0),
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Uniform sample from `[a, b]` in either order.
pub(crate) fn uniform(rng: &mut ChaCha8Rng, a: f32, b: f32) -> f32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if hi - lo <= f32::EPSILON {
        lo
    } else {
        rng.gen_range(lo..=hi)
    }
}

/// Distance between two points ignoring height.
pub(crate) fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    let d = b - a;
    d.x.hypot(d.z)
}

/// Rise from the spawn height to `rest`, then bob around it.
///
/// Returns the height for elapsed time `t`.
pub(crate) fn float_height(start: f32, t: f32, tuning: &crate::config::FloatTuning) -> f32 {
    if t < tuning.rise_duration {
        let progress = (t / tuning.rise_duration).clamp(0.0, 1.0);
        start + (tuning.rest_height - start) * progress
    } else {
        let bob_time = t - tuning.rise_duration;
        tuning.rest_height + tuning.bob_amplitude * (bob_time * tuning.bob_rate).sin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FloatTuning;
    use crate::entity::{Geometry, TemplateSpec};
    use crate::tests::helpers::tanker_stats;
    use rand::SeedableRng;

    fn template(spec: TemplateSpec, nodes: usize) -> EntityTemplate {
        EntityTemplate::new(
            spec,
            Geometry {
                handle: 1,
                node_count: nodes,
            },
        )
    }

    #[test]
    fn spawn_kind_matches_agent_kind() {
        let t = template(TemplateSpec::boat("Blue Tanker", "Boat1.fbx", tanker_stats()), 5);
        let spawns = [
            Spawn::Scenery,
            Spawn::Boat { speed: 1.0 },
            Spawn::Missile {
                launcher: EntityId::FIRST,
                velocity: Vec3::X,
            },
            Spawn::SeaMine,
            Spawn::Shield {
                owner: EntityId::FIRST,
                duration: 7.0,
            },
            Spawn::RandomCrate {
                kind: CrateKind::Health,
            },
            Spawn::ReloadStation,
            Spawn::Obstacle {
                half_extents: Vec3::splat(60.0),
            },
        ];
        for spawn in spawns {
            let (agent, _) = build(&spawn, &t, &Mat4::IDENTITY, 10).unwrap();
            assert_eq!(agent.kind(), spawn.kind());
        }
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        let t = template(TemplateSpec::boat("Blue Tanker", "Boat1.fbx", tanker_stats()), 5);
        let bad = [
            Spawn::Boat { speed: -1.0 },
            Spawn::Boat { speed: f32::NAN },
            Spawn::Shield {
                owner: EntityId::FIRST,
                duration: 0.0,
            },
            Spawn::Obstacle {
                half_extents: Vec3::new(1.0, 0.0, 1.0),
            },
            Spawn::Missile {
                launcher: EntityId::FIRST,
                velocity: Vec3::new(f32::INFINITY, 0.0, 0.0),
            },
        ];
        for spawn in bad {
            let err = build(&spawn, &t, &Mat4::IDENTITY, 10).unwrap_err();
            assert!(matches!(err, CoreError::Construction { .. }), "{spawn:?}");
        }
    }

    #[test]
    fn shields_render_additive() {
        let t = template(TemplateSpec::plain("Shield", "Shield.fbx"), 1);
        let (_, render) = build(
            &Spawn::Shield {
                owner: EntityId::FIRST,
                duration: 7.0,
            },
            &t,
            &Mat4::IDENTITY,
            10,
        )
        .unwrap();
        assert_eq!(render.group, RenderSettings::ADDITIVE);
    }

    #[test]
    fn view_matches_variant_only() {
        let agent = Agent::ReloadStation(ReloadStation::default());
        assert!(ReloadStation::view(&agent).is_some());
        assert!(Boat::view(&agent).is_none());
        assert_eq!(<Boat as AgentView>::KIND, EntityKind::Boat);
    }

    #[test]
    fn uniform_accepts_reversed_and_empty_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..100 {
            let v = uniform(&mut rng, 300.0, 100.0);
            assert!((100.0..=300.0).contains(&v));
        }
        assert_eq!(uniform(&mut rng, 5.0, 5.0), 5.0);
    }

    #[test]
    fn float_height_rises_then_bobs() {
        let tuning = FloatTuning::sea_mine();
        let start = tuning.rest_height - 20.0;
        assert_eq!(float_height(start, 0.0, &tuning), start);
        let mid = float_height(start, tuning.rise_duration * 0.5, &tuning);
        assert!((mid - (start + tuning.rest_height) * 0.5).abs() < 1e-4);
        for i in 0..50 {
            let h = float_height(start, tuning.rise_duration + i as f32 * 0.3, &tuning);
            assert!((h - tuning.rest_height).abs() <= tuning.bob_amplitude + 1e-4);
        }
    }

    #[test]
    fn flat_distance_ignores_height() {
        assert_eq!(flat_distance(Vec3::ZERO, Vec3::new(3.0, 100.0, 4.0)), 5.0);
    }
}
