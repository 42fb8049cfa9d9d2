//! Entity templates: shared blueprints for classes of entities.
//!
//! A template owns a reference to loaded geometry, the stats every entity
//! created from it shares, and the list of entity IDs currently using it.
//! Stats are plain `Copy` data handed out by value; entities copy what they
//! need at construction and never reach back into the template.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::EntityId;

bitflags! {
    /// Mesh import options forwarded to the geometry source.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ImportFlags: u32 {
        /// Remap spherical/cubic texture mappings to plain UVs
        const SIMPLE_UV_MAPPING = 0x1;
        /// Drop nodes without meshes (except the root)
        const OPTIMISE_HIERARCHY = 0x2;
        /// Keep only nodes carrying bones
        const FLATTEN_HIERARCHY_EXCEPT_BONES = 0x4;
        /// Collapse the whole hierarchy to a single node
        const FLATTEN_HIERARCHY = 0x6;
        /// Texture V axis points up
        const UV_AXIS_UP = 0x8;
        /// Strip line and point primitives
        const REMOVE_LINES_POINTS = 0x10;
        /// Strip degenerate triangles
        const REMOVE_DEGENERATES = 0x20;
        /// Attempt to repair inverted normals
        const FIX_NORMALS = 0x40;
        /// Remove single-bone skinning
        const SELECTIVE_DEBONE = 0x80;
        /// Render without lighting
        const NO_LIGHTING = 0x100;
        /// Extra validation during import
        const VALIDATE = 0x200;
    }
}

/// Team membership for boats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Team {
    /// First team
    TeamA,
    /// Second team
    TeamB,
    /// Third team
    TeamC,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TeamA => "Team A",
            Self::TeamB => "Team B",
            Self::TeamC => "Team C",
        })
    }
}

/// Shared stats for a class of boat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoatStats {
    /// Top cruising speed (units/s)
    pub max_speed: f32,
    /// Speed gained per second while ramping up
    pub acceleration: f32,
    /// Hull turn rate (rad/s)
    pub turn_speed: f32,
    /// Gun mount turn rate (rad/s)
    pub gun_turn_speed: f32,
    /// Starting and maximum hit points
    pub max_hp: f32,
    /// Damage dealt by this boat's missiles
    pub missile_damage: f32,
    /// Team membership
    pub team: Team,
}

/// Stats attached to a template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TemplateStats {
    /// Geometry only; backs every kind except boats
    Plain,
    /// Boat stats; also backs every other kind
    Boat(BoatStats),
}

/// Geometry handle returned by a [`GeometrySource`](crate::render::GeometrySource).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geometry {
    /// Opaque handle owned by the geometry source
    pub handle: u64,
    /// Number of nodes in the hierarchy (root included)
    pub node_count: usize,
}

/// Everything needed to create a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSpec {
    /// Template name (also its lookup key)
    pub name: String,
    /// Mesh reference handed to the geometry source
    pub mesh: String,
    /// Mesh import options
    #[serde(default)]
    pub import_flags: ImportFlags,
    /// Shared stats
    pub stats: TemplateStats,
}

impl TemplateSpec {
    /// A geometry-only template.
    #[must_use]
    pub fn plain(name: impl Into<String>, mesh: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mesh: mesh.into(),
            import_flags: ImportFlags::empty(),
            stats: TemplateStats::Plain,
        }
    }

    /// A boat template.
    #[must_use]
    pub fn boat(name: impl Into<String>, mesh: impl Into<String>, stats: BoatStats) -> Self {
        Self {
            name: name.into(),
            mesh: mesh.into(),
            import_flags: ImportFlags::empty(),
            stats: TemplateStats::Boat(stats),
        }
    }

    /// Replace the import flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ImportFlags) -> Self {
        self.import_flags = flags;
        self
    }
}

/// A registered template.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityTemplate {
    name: String,
    mesh: String,
    import_flags: ImportFlags,
    stats: TemplateStats,
    geometry: Geometry,
    entities: Vec<EntityId>,
}

impl EntityTemplate {
    pub(crate) fn new(spec: TemplateSpec, geometry: Geometry) -> Self {
        Self {
            name: spec.name,
            mesh: spec.mesh,
            import_flags: spec.import_flags,
            stats: spec.stats,
            geometry,
            entities: Vec::new(),
        }
    }

    /// Template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mesh reference the geometry was loaded from.
    #[must_use]
    pub fn mesh(&self) -> &str {
        &self.mesh
    }

    /// Import options used for the mesh.
    #[must_use]
    pub const fn import_flags(&self) -> ImportFlags {
        self.import_flags
    }

    /// Shared stats.
    #[must_use]
    pub const fn stats(&self) -> TemplateStats {
        self.stats
    }

    /// Boat stats, if this is a boat template.
    #[must_use]
    pub const fn boat_stats(&self) -> Option<BoatStats> {
        match self.stats {
            TemplateStats::Boat(stats) => Some(stats),
            TemplateStats::Plain => None,
        }
    }

    /// Loaded geometry.
    #[must_use]
    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Entities currently created from this template, in creation order.
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub(crate) fn attach(&mut self, id: EntityId) {
        self.entities.push(id);
    }

    pub(crate) fn detach(&mut self, id: EntityId) -> bool {
        match self.entities.iter().position(|&e| e == id) {
            Some(index) => {
                self.entities.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn take_entities(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.entities)
    }
}
