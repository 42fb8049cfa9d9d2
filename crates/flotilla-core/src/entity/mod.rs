//! Entity types for the simulation core.
//!
//! This module provides:
//! - [`EntityId`]: Unique, never-reused identifier for entities
//! - [`EntityKind`]: Classification tag derived from the entity's agent data
//! - [`Entity`]: One live instance of a template, with transforms, render
//!   settings and kind-specific [`Agent`] state
//!
//! Templates live in [`template`], hierarchical transforms in [`transform`].
//!
//! # Example
//!
//! ```
//! use flotilla_core::entity::EntityId;
//!
//! assert!(EntityId::NONE.is_none());
//! assert!(EntityId::SYSTEM < EntityId::FIRST);
//! assert_eq!(EntityId::FIRST.as_u64(), 2);
//! ```

pub mod template;
pub mod transform;

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agents::{Agent, AgentView};
use crate::registry::{Lifecycle, TickContext};

pub use template::{
    BoatStats, EntityTemplate, Geometry, ImportFlags, Team, TemplateSpec, TemplateStats,
};
pub use transform::{MatrixExt, Transforms};

// =============================================================================
// EntityId
// =============================================================================

/// Unique identifier for an entity.
///
/// IDs are allocated from a monotonic counter by the registry and are never
/// reused. Two values are reserved: [`EntityId::NONE`] means "no entity" and
/// [`EntityId::SYSTEM`] is the sender of messages that originate outside the
/// simulation (UI commands, level scripts).
///
/// # Ordering
///
/// IDs order by numeric value, which is also creation order. The registry
/// iterates entities in this order every tick.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// "No entity".
    pub const NONE: Self = Self(0);
    /// Sender ID for messages that come from outside the simulation.
    pub const SYSTEM: Self = Self(1);
    /// First ID handed out by a registry.
    pub const FIRST: Self = Self(2);

    /// Creates a new `EntityId` from a raw `u64` value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` value of this identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns `true` for [`EntityId::NONE`].
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == Self::NONE.0
    }

    /// The identifier following this one.
    #[must_use]
    pub(crate) const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

// =============================================================================
// EntityKind
// =============================================================================

/// What kind of entity this is.
///
/// Always derived from the entity's [`Agent`] variant, so the two can never
/// disagree.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Static decoration with no behaviour (sea, sky, islands)
    Scenery,
    /// Autonomous combat boat
    Boat,
    /// Ballistic missile in flight
    Missile,
    /// Floating mine
    SeaMine,
    /// Protective bubble attached to a boat
    Shield,
    /// Floating pickup
    RandomCrate,
    /// Where boats refill missiles
    ReloadStation,
    /// Static obstacle with a bounding box
    Obstacle,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scenery => "Scenery",
            Self::Boat => "Boat",
            Self::Missile => "Missile",
            Self::SeaMine => "SeaMine",
            Self::Shield => "Shield",
            Self::RandomCrate => "RandomCrate",
            Self::ReloadStation => "ReloadStation",
            Self::Obstacle => "Obstacle",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Render settings
// =============================================================================

/// Per-entity data handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Render pass group (0 = opaque, 1 = additive blended)
    pub group: u32,
    /// RGBA colour multiplier
    pub tint: Vec4,
}

impl RenderSettings {
    /// Opaque geometry group.
    pub const OPAQUE: u32 = 0;
    /// Additive blended group (shields, effects).
    pub const ADDITIVE: u32 = 1;
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            group: Self::OPAQUE,
            tint: Vec4::ONE,
        }
    }
}

// =============================================================================
// Entity
// =============================================================================

/// A live entity.
///
/// # Invariants
///
/// - The `EntityId` is unique within a registry and never reused
/// - `id` appears in the entity list of the template named `template`
/// - `transforms` has exactly as many matrices as the template geometry has nodes
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    name: String,
    template: String,
    transforms: Transforms,
    render: RenderSettings,
    agent: Agent,
}

impl Entity {
    pub(crate) fn new(
        id: EntityId,
        name: String,
        template: String,
        transforms: Transforms,
        render: RenderSettings,
        agent: Agent,
    ) -> Self {
        Self {
            id,
            name,
            template,
            transforms,
            render,
            agent,
        }
    }

    /// Returns the entity's unique identifier.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the entity's name (may be empty).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name of the template this entity was created from.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the entity's kind.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.agent.kind()
    }

    /// Root and sub-part transforms.
    #[must_use]
    pub const fn transforms(&self) -> &Transforms {
        &self.transforms
    }

    /// Mutable access to the transforms.
    #[must_use]
    pub fn transforms_mut(&mut self) -> &mut Transforms {
        &mut self.transforms
    }

    /// Root world matrix.
    #[must_use]
    pub fn transform(&self) -> &Mat4 {
        self.transforms.root()
    }

    /// World position of the root node.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.transforms.root().position()
    }

    /// Render group and tint.
    #[must_use]
    pub const fn render(&self) -> &RenderSettings {
        &self.render
    }

    /// Mutable render settings.
    #[must_use]
    pub fn render_mut(&mut self) -> &mut RenderSettings {
        &mut self.render
    }

    /// Kind-specific state.
    #[must_use]
    pub const fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Mutable kind-specific state.
    #[must_use]
    pub fn agent_mut(&mut self) -> &mut Agent {
        &mut self.agent
    }

    /// Typed view of the agent state, `None` if this entity is another kind.
    #[must_use]
    pub fn get_as<T: AgentView>(&self) -> Option<&T> {
        T::view(&self.agent)
    }

    /// Mutable typed view of the agent state.
    #[must_use]
    pub fn get_as_mut<T: AgentView>(&mut self) -> Option<&mut T> {
        T::view_mut(&mut self.agent)
    }

    /// Returns `true` if this entity is a boat.
    #[must_use]
    pub const fn is_boat(&self) -> bool {
        matches!(self.kind(), EntityKind::Boat)
    }

    /// Runs one tick of this entity's behaviour.
    pub(crate) fn update(&mut self, ctx: &mut TickContext<'_>) -> Lifecycle {
        self.agent.update(self.id, &mut self.transforms, &mut self.render, ctx)
    }
}
