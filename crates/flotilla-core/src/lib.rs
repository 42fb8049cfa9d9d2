//! # Flotilla Core
//!
//! Gameplay simulation core for a naval skirmish between AI-controlled boats.
//!
//! This crate provides the deterministic simulation that sits underneath a
//! renderer: an entity registry built from shared templates, a per-entity
//! mailbox, and the behaviour of every entity kind.
//!
//! ## Architecture
//!
//! - **Registry**: owns templates and entities, allocates IDs, drives the
//!   per-tick update ([`registry`])
//! - **Messages**: FIFO mailboxes, the only way entities affect each other's
//!   state ([`message`])
//! - **Agents**: kind-specific behaviour, most importantly the boat state
//!   machine ([`agents`])
//! - **Steering and ballistics**: pure math used by the agents ([`steering`],
//!   [`ballistics`])
//!
//! Rendering is out of scope; [`render`] defines the traits a renderer and a
//! mesh loader implement, plus headless stand-ins.
//!
//! ## Usage
//!
//! ```
//! use flotilla_core::agents::Spawn;
//! use flotilla_core::entity::{BoatStats, Team, TemplateSpec};
//! use flotilla_core::{MessageBody, Simulation};
//! use glam::Mat4;
//!
//! let mut sim = Simulation::headless(42);
//! let stats = BoatStats {
//!     max_speed: 25.0,
//!     acceleration: 8.0,
//!     turn_speed: 0.8,
//!     gun_turn_speed: 1.2,
//!     max_hp: 100.0,
//!     missile_damage: 25.0,
//!     team: Team::TeamA,
//! };
//! sim.registry_mut()
//!     .create_template(TemplateSpec::boat("Blue Tanker", "Boat1.fbx", stats))
//!     .unwrap();
//! let murphy = sim
//!     .registry_mut()
//!     .create_entity("Blue Tanker", Spawn::Boat { speed: 0.0 }, Mat4::IDENTITY, "Murphy")
//!     .unwrap();
//!
//! sim.broadcast(MessageBody::Start);
//! for _ in 0..60 {
//!     sim.step(1.0 / 60.0);
//! }
//! assert!(sim.boat(murphy).unwrap().speed() > 0.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod agents;
pub mod ballistics;
pub mod config;
pub mod entity;
pub mod error;
pub mod level;
pub mod message;
pub mod registry;
pub mod render;
pub mod simulation;
pub mod spatial;
pub mod steering;

#[cfg(test)]
mod tests;

pub use agents::{Boat, BoatState, Spawn};
pub use config::SimConfig;
pub use entity::{Entity, EntityId, EntityKind};
pub use error::{CoreError, Result};
pub use level::{LevelDesc, LevelSummary};
pub use message::{CrateKind, MessageBody, MessageBus};
pub use registry::{EntityRegistry, Lifecycle, UpdateReport};
pub use simulation::Simulation;
