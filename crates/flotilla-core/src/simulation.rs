//! Simulation driver: the registry, the message bus and the random stream
//! behind a single `step` call.
//!
//! # Determinism
//!
//! Given the same seed, configuration, level and inputs, a simulation
//! produces identical state tick for tick:
//! - Entities are stored in a `BTreeMap` and updated in ID order
//! - Mailboxes are FIFO and keyed by ID
//! - All randomness comes from one `ChaCha8Rng` seeded at construction
//!
//! [`Simulation::state_digest`] hashes the observable state so two runs can
//! be compared cheaply.
//!
//! # Example
//!
//! ```
//! use flotilla_core::{MessageBody, Simulation};
//!
//! let mut sim = Simulation::headless(42);
//! sim.step(1.0 / 60.0);
//! sim.broadcast(MessageBody::Start);
//! assert_eq!(sim.tick(), 1);
//! ```

use glam::{Vec2, Vec3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::{debug, info};

use crate::agents::Boat;
use crate::config::SimConfig;
use crate::entity::{EntityId, EntityKind, MatrixExt};
use crate::error::Result;
use crate::level::{LevelDesc, LevelSummary};
use crate::message::{MessageBody, MessageBus};
use crate::registry::{EntityRegistry, UpdateReport};
use crate::render::{Camera, GeometrySource, HeadlessGeometry, Label, Viewport};

// =============================================================================
// Simulation
// =============================================================================

/// Owner of the world state and the per-tick driver.
#[derive(Debug)]
pub struct Simulation {
    registry: EntityRegistry,
    bus: MessageBus,
    config: SimConfig,
    rng: ChaCha8Rng,
    seed: u64,
    tick: u64,
    elapsed: f64,
}

impl Simulation {
    /// Create an empty simulation.
    #[must_use]
    pub fn new(seed: u64, config: SimConfig, geometry: Box<dyn GeometrySource + Send>) -> Self {
        Self {
            registry: EntityRegistry::new(geometry).with_missile_capacity(config.boat.missile_capacity),
            bus: MessageBus::new(),
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            tick: 0,
            elapsed: 0.0,
        }
    }

    /// Empty simulation with default configuration and placeholder geometry
    /// for every mesh.
    #[must_use]
    pub fn headless(seed: u64) -> Self {
        Self::new(
            seed,
            SimConfig::default(),
            Box::new(HeadlessGeometry::lenient(crate::agents::boat::NODE_COUNT)),
        )
    }

    /// Advance by `dt` seconds.
    pub fn step(&mut self, dt: f32) -> UpdateReport {
        let report = self
            .registry
            .update_all(&mut self.bus, &mut self.rng, &self.config, dt);
        self.tick += 1;
        self.elapsed += f64::from(dt);
        if !report.destroyed.is_empty() {
            debug!(tick = self.tick, destroyed = report.destroyed.len(), "Entities expired");
        }
        report
    }

    /// Entity registry.
    #[must_use]
    pub const fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Mutable entity registry, for setup and external tooling.
    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    /// Pending mail.
    #[must_use]
    pub const fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Ticks stepped so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds so far.
    #[must_use]
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Seed the random stream was created from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Boat state by ID.
    #[must_use]
    pub fn boat(&self, id: EntityId) -> Option<&Boat> {
        self.registry.get_as::<Boat>(id)
    }

    // -------------------------------------------------------------------------
    // Messaging
    // -------------------------------------------------------------------------

    /// Post `body` to `to` on behalf of the host.
    pub fn send(&mut self, to: EntityId, body: MessageBody) {
        self.bus.deliver(EntityId::SYSTEM, to, body);
    }

    /// Post `body` to `to` as if sent by `from`.
    pub fn send_from(&mut self, from: EntityId, to: EntityId, body: MessageBody) {
        self.bus.deliver(from, to, body);
    }

    /// Post `body` to every boat. Returns how many were addressed.
    pub fn broadcast(&mut self, body: MessageBody) -> usize {
        let boats = self.registry.ids_of_kind(EntityKind::Boat);
        for &id in &boats {
            self.bus.deliver(EntityId::SYSTEM, id, body);
        }
        info!(message = %body.tag(), boats = boats.len(), "Broadcast");
        boats.len()
    }

    // -------------------------------------------------------------------------
    // Destruction
    // -------------------------------------------------------------------------

    /// Remove an entity and its pending mail.
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        let removed = self.registry.destroy_entity(id);
        if removed {
            self.bus.discard(id);
        }
        removed
    }

    /// Remove a template, its entities and their pending mail.
    pub fn destroy_template(&mut self, name: &str) -> bool {
        let ids: Vec<EntityId> = match self.registry.template(name) {
            Some(template) => template.entities().to_vec(),
            None => return false,
        };
        let removed = self.registry.destroy_template(name);
        for id in ids {
            self.bus.discard(id);
        }
        removed
    }

    // -------------------------------------------------------------------------
    // Levels
    // -------------------------------------------------------------------------

    /// Create the templates and entities described by `level`.
    ///
    /// # Errors
    ///
    /// The first creation failure, wrapped with the index of the offending
    /// entry. Everything created before it is kept.
    pub fn load_level(&mut self, level: &LevelDesc) -> Result<LevelSummary> {
        level.load(&mut self.registry, &mut self.rng)
    }

    // -------------------------------------------------------------------------
    // Host interaction
    // -------------------------------------------------------------------------

    /// Send `boat` to the water point under `pixel`.
    ///
    /// Returns `false` if the pixel ray misses the water plane or `boat` is
    /// not a live boat.
    pub fn command_target_point(
        &mut self,
        camera: &dyn Camera,
        viewport: Viewport,
        pixel: Vec2,
        boat: EntityId,
        range: f32,
    ) -> bool {
        if self.boat(boat).is_none() {
            return false;
        }
        let Some(point) = camera.world_from_pixel_on_plane(pixel, viewport, self.config.water_plane_y) else {
            return false;
        };
        debug!(boat = %boat, x = point.x, z = point.z, "Target point commanded");
        self.send(boat, MessageBody::TargetPoint { point, range });
        true
    }

    /// Screen-space status labels for every boat in front of the camera,
    /// nearest last.
    #[must_use]
    pub fn boat_labels(&self, camera: &dyn Camera, viewport: Viewport) -> Vec<Label> {
        let mut labels: Vec<Label> = self
            .registry
            .boats()
            .filter_map(|(entity, boat)| {
                let anchor = entity.position() + Vec3::Y * self.config.boat.launch_height;
                let screen = camera.pixel_from_world(anchor, viewport)?;
                let mut lines = vec![
                    entity.name().to_string(),
                    entity.template().to_string(),
                    format!("State: {}", boat.state()),
                    format!("HP: {:.0}/{:.0}", boat.hp(), boat.max_hp()),
                    format!("Missiles: {} (fired {})", boat.missiles(), boat.missiles_fired()),
                ];
                if let Some(text) = boat.label_text() {
                    lines.push(text.to_string());
                }
                Some(Label {
                    entity: entity.id(),
                    pixel: screen.truncate(),
                    depth: screen.z,
                    lines,
                })
            })
            .collect();
        labels.sort_by(|a, b| b.depth.total_cmp(&a.depth));
        labels
    }

    // -------------------------------------------------------------------------
    // Determinism
    // -------------------------------------------------------------------------

    /// Hash of every entity's observable state and the pending mail.
    #[must_use]
    pub fn state_digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        for entity in self.registry.iter() {
            entity.id().hash(&mut hasher);
            entity.kind().hash(&mut hasher);
            for v in entity.transform().position().to_array() {
                v.to_bits().hash(&mut hasher);
            }
            if let Some(boat) = entity.get_as::<Boat>() {
                boat.state().hash(&mut hasher);
                boat.hp().to_bits().hash(&mut hasher);
                boat.missiles().hash(&mut hasher);
            }
            self.bus.pending(entity.id()).hash(&mut hasher);
        }
        self.bus.total_pending().hash(&mut hasher);
        hasher.finish()
    }
}
