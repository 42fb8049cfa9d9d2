//! Level descriptions.
//!
//! A level is a JSON document listing templates and the entities to create
//! from them. Loading goes through the public registry API only, so a level
//! can do nothing a host could not do by hand.
//!
//! ```json
//! {
//!   "templates": [
//!     { "type": "Boat", "name": "Blue Tanker", "mesh": "Boat1.fbx",
//!       "max_speed": 25, "acceleration": 8, "turn_speed": 0.8,
//!       "gun_turn_speed": 1.2, "max_hp": 100, "missile_damage": 25, "team": "TeamA" }
//!   ],
//!   "entities": [
//!     { "type": "Boat", "template": "Blue Tanker", "name": "Murphy",
//!       "transform": { "position": [0, -1.5, 0], "rotation": [0, 90, 0] } }
//!   ]
//! }
//! ```

use glam::{Mat4, Vec3};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agents::{uniform, Spawn};
use crate::entity::transform::compose;
use crate::entity::{BoatStats, EntityId, ImportFlags, Team, TemplateSpec};
use crate::error::{CoreError, Result};
use crate::message::CrateKind;
use crate::registry::EntityRegistry;

/// A whole level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelDesc {
    /// Templates, created in order
    pub templates: Vec<TemplateDesc>,
    /// Entities, created in order after all templates
    pub entities: Vec<EntityDesc>,
}

/// One template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TemplateDesc {
    /// Template for anything that is not a boat
    Entity {
        /// Unique name
        name: String,
        /// Mesh file
        mesh: String,
        /// Mesh import options
        #[serde(default)]
        import_flags: ImportFlags,
    },
    /// Template carrying boat stats
    Boat {
        /// Unique name
        name: String,
        /// Mesh file
        mesh: String,
        /// Mesh import options
        #[serde(default)]
        import_flags: ImportFlags,
        /// Top speed
        max_speed: f32,
        /// Speed change per second
        acceleration: f32,
        /// Hull turn rate (rad/s)
        turn_speed: f32,
        /// Gun turn rate (rad/s)
        gun_turn_speed: f32,
        /// Starting and maximum hit points
        max_hp: f32,
        /// Damage dealt by this boat's missiles
        missile_damage: f32,
        /// Team
        team: Team,
    },
}

impl TemplateDesc {
    fn name(&self) -> &str {
        match self {
            Self::Entity { name, .. } | Self::Boat { name, .. } => name,
        }
    }

    fn to_spec(&self) -> TemplateSpec {
        match self {
            Self::Entity {
                name,
                mesh,
                import_flags,
            } => TemplateSpec::plain(name, mesh).with_flags(*import_flags),
            Self::Boat {
                name,
                mesh,
                import_flags,
                max_speed,
                acceleration,
                turn_speed,
                gun_turn_speed,
                max_hp,
                missile_damage,
                team,
            } => TemplateSpec::boat(
                name,
                mesh,
                BoatStats {
                    max_speed: *max_speed,
                    acceleration: *acceleration,
                    turn_speed: *turn_speed,
                    gun_turn_speed: *gun_turn_speed,
                    max_hp: *max_hp,
                    missile_damage: *missile_damage,
                    team: *team,
                },
            )
            .with_flags(*import_flags),
        }
    }
}

/// What kind of entity an [`EntityDesc`] creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityDescKind {
    /// Static decoration
    Scenery,
    /// A boat
    Boat,
    /// A sea mine
    SeaMine,
    /// A pickup crate
    RandomCrate,
    /// A reload station
    ReloadStation,
    /// A static obstacle
    Obstacle,
}

/// Placement of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformDesc {
    /// World position
    pub position: Vec3,
    /// Euler rotation in degrees
    pub rotation: Vec3,
    /// Uniform scale
    pub scale: f32,
    /// If set, each position axis is offset by a random amount in
    /// `[-extent/2, extent/2]`
    pub randomise: Option<Vec3>,
}

impl Default for TransformDesc {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: 1.0,
            randomise: None,
        }
    }
}

/// One entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDesc {
    /// Kind to create
    #[serde(rename = "type")]
    pub kind: EntityDescKind,
    /// Template to create it from
    pub template: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Placement
    #[serde(default)]
    pub transform: TransformDesc,
    /// Initial boat speed
    #[serde(default)]
    pub speed: f32,
    /// Obstacle half size
    #[serde(default = "default_half_extents")]
    pub half_extents: Vec3,
    /// Crate contents
    #[serde(default = "default_crate_kind")]
    pub crate_kind: CrateKind,
}

fn default_half_extents() -> Vec3 {
    Vec3::new(60.0, 20.0, 60.0)
}

fn default_crate_kind() -> CrateKind {
    CrateKind::Missile
}

impl EntityDesc {
    fn spawn(&self) -> Spawn {
        match self.kind {
            EntityDescKind::Scenery => Spawn::Scenery,
            EntityDescKind::Boat => Spawn::Boat { speed: self.speed },
            EntityDescKind::SeaMine => Spawn::SeaMine,
            EntityDescKind::RandomCrate => Spawn::RandomCrate { kind: self.crate_kind },
            EntityDescKind::ReloadStation => Spawn::ReloadStation,
            EntityDescKind::Obstacle => Spawn::Obstacle {
                half_extents: self.half_extents,
            },
        }
    }

    fn placement(&self, rng: &mut ChaCha8Rng) -> Mat4 {
        let t = &self.transform;
        let mut position = t.position;
        if let Some(extent) = t.randomise {
            let half = extent.abs() * 0.5;
            position += Vec3::new(
                uniform(rng, -half.x, half.x),
                uniform(rng, -half.y, half.y),
                uniform(rng, -half.z, half.z),
            );
        }
        compose(position, t.rotation, t.scale)
    }
}

/// What a level load created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LevelSummary {
    /// Template names, in creation order
    pub templates: Vec<String>,
    /// Entity IDs, in creation order
    pub entities: Vec<EntityId>,
}

impl LevelDesc {
    /// Parse a level from JSON.
    ///
    /// # Errors
    ///
    /// [`CoreError::LevelParse`] if the document is malformed.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Create every template, then every entity.
    ///
    /// # Errors
    ///
    /// [`CoreError::Level`] wrapping the first failure. Entries created
    /// before it are left in place.
    pub fn load(&self, registry: &mut EntityRegistry, rng: &mut ChaCha8Rng) -> Result<LevelSummary> {
        let mut summary = LevelSummary::default();

        for (index, desc) in self.templates.iter().enumerate() {
            registry.create_template(desc.to_spec()).map_err(|source| CoreError::Level {
                index,
                what: format!("template '{}'", desc.name()),
                source: Box::new(source),
            })?;
            summary.templates.push(desc.name().to_string());
        }

        for (index, desc) in self.entities.iter().enumerate() {
            let placement = desc.placement(rng);
            let id = registry
                .create_entity(&desc.template, desc.spawn(), placement, &desc.name)
                .map_err(|source| CoreError::Level {
                    index,
                    what: format!("entity '{}' from '{}'", desc.name, desc.template),
                    source: Box::new(source),
                })?;
            summary.entities.push(id);
        }

        info!(
            templates = summary.templates.len(),
            entities = summary.entities.len(),
            "Level loaded"
        );
        Ok(summary)
    }
}
