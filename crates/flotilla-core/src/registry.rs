//! Entity registry: owner of all templates and entities.
//!
//! The registry allocates IDs, builds entities from templates, answers
//! lookups and geometric queries, and drives the per-tick update.
//!
//! # Update order
//!
//! [`EntityRegistry::update_all`] walks a snapshot of live IDs in ascending
//! order. Each entity is taken out of the map for the duration of its own
//! update so it can freely query and mutate everything else through the
//! [`TickContext`]. Entities created during the pass are first updated on
//! the next tick. An entity that reports [`Lifecycle::Destroy`] stays visible
//! to the rest of the pass and is removed once the pass completes.

use glam::{Mat4, Vec3};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::agents::{self, AgentView, Boat, Obstacle, Spawn};
use crate::config::{BoatTuning, SimConfig};
use crate::entity::{Entity, EntityId, EntityKind, EntityTemplate, TemplateSpec, Transforms};
use crate::error::{CoreError, Result};
use crate::message::{Message, MessageBody, MessageBus};
use crate::render::{GeometrySource, Renderer};
use crate::spatial::Aabb;

// =============================================================================
// Tick plumbing
// =============================================================================

/// What an entity wants after its update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Keep the entity
    Keep,
    /// Remove the entity at the end of the pass
    Destroy,
}

/// Summary of one [`EntityRegistry::update_all`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Entities whose update ran
    pub updated: usize,
    /// Entities removed at the end of the pass, in removal order
    pub destroyed: Vec<EntityId>,
}

/// Everything an entity can reach during its update.
pub(crate) struct TickContext<'a> {
    pub registry: &'a mut EntityRegistry,
    pub bus: &'a mut MessageBus,
    pub rng: &'a mut ChaCha8Rng,
    pub config: &'a SimConfig,
    pub dt: f32,
    pub current: EntityId,
}

impl TickContext<'_> {
    /// Pop the next message for the entity being updated.
    pub fn receive(&mut self) -> Option<Message> {
        self.bus.receive_one(self.current)
    }

    /// Post a message from the entity being updated.
    pub fn send(&mut self, to: EntityId, body: MessageBody) {
        self.bus.deliver(self.current, to, body);
    }

    /// Create an entity. Failures are logged and recorded as the registry's
    /// last error.
    pub fn spawn(&mut self, template: &str, spawn: Spawn, transform: Mat4) -> Result<EntityId> {
        self.registry.create_entity(template, spawn, transform, "")
    }

    /// Destroy another entity immediately and drop its mail.
    ///
    /// The entity being updated cannot destroy itself this way; it returns
    /// [`Lifecycle::Destroy`] instead.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        if id == self.current || !self.registry.destroy_entity(id) {
            return false;
        }
        self.bus.discard(id);
        true
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Owner of all templates and entities.
pub struct EntityRegistry {
    templates: BTreeMap<String, EntityTemplate>,
    entities: BTreeMap<EntityId, Entity>,
    next_id: EntityId,
    last_error: Option<String>,
    geometry: Box<dyn GeometrySource + Send>,
    /// Missiles a newly created boat starts with
    missile_capacity: u32,
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("templates", &self.templates.len())
            .field("entities", &self.entities.len())
            .field("next_id", &self.next_id)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl EntityRegistry {
    /// Create an empty registry loading meshes through `geometry`.
    #[must_use]
    pub fn new(geometry: Box<dyn GeometrySource + Send>) -> Self {
        Self {
            templates: BTreeMap::new(),
            entities: BTreeMap::new(),
            next_id: EntityId::FIRST,
            last_error: None,
            geometry,
            missile_capacity: BoatTuning::default().missile_capacity,
        }
    }

    /// Set the missile load of boats created from now on.
    #[must_use]
    pub fn with_missile_capacity(mut self, missile_capacity: u32) -> Self {
        self.missile_capacity = missile_capacity;
        self
    }

    /// Missile load of newly created boats.
    #[must_use]
    pub const fn missile_capacity(&self) -> u32 {
        self.missile_capacity
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    /// Register a template, replacing (and cascading the destruction of) any
    /// existing template with the same name.
    ///
    /// # Errors
    ///
    /// [`CoreError::GeometryLoad`] if the mesh cannot be loaded. The existing
    /// template, if any, is left untouched in that case.
    pub fn create_template(&mut self, spec: TemplateSpec) -> Result<&EntityTemplate> {
        let geometry = match self.geometry.load(&spec.mesh, spec.import_flags) {
            Ok(geometry) => geometry,
            Err(reason) => {
                return self.fail(CoreError::GeometryLoad {
                    mesh: spec.mesh,
                    reason,
                })
            }
        };

        if self.templates.contains_key(&spec.name) {
            debug!(template = %spec.name, "Replacing template");
            self.destroy_template(&spec.name);
        }

        debug!(
            template = %spec.name,
            mesh = %spec.mesh,
            nodes = geometry.node_count,
            "Created template"
        );
        let name = spec.name.clone();
        Ok(self
            .templates
            .entry(name)
            .or_insert(EntityTemplate::new(spec, geometry)))
    }

    /// Create an entity from `template`.
    ///
    /// On success the next ID is allocated and the entity is registered both
    /// globally and in its template's entity list. On failure no ID is
    /// consumed.
    ///
    /// # Errors
    ///
    /// [`CoreError::TemplateNotFound`] for an unknown template,
    /// [`CoreError::KindMismatch`] if the template cannot back `spawn`, and
    /// [`CoreError::Construction`] if the constructor rejects its arguments.
    pub fn create_entity(
        &mut self,
        template: &str,
        spawn: Spawn,
        transform: Mat4,
        name: &str,
    ) -> Result<EntityId> {
        let Some(entity_template) = self.templates.get(template) else {
            return self.fail(CoreError::TemplateNotFound(template.to_string()));
        };

        let built = agents::build(&spawn, entity_template, &transform, self.missile_capacity);
        let (agent, render) = match built {
            Ok(built) => built,
            Err(err) => return self.fail(err),
        };
        let transforms = Transforms::new(transform, entity_template.geometry().node_count);

        let id = self.next_id;
        self.next_id = id.next();

        let entity = Entity::new(
            id,
            name.to_string(),
            template.to_string(),
            transforms,
            render,
            agent,
        );
        debug!(entity = %id, kind = %entity.kind(), template, name, "Created entity");

        if let Some(entity_template) = self.templates.get_mut(template) {
            entity_template.attach(id);
        }
        self.entities.insert(id, entity);
        Ok(id)
    }

    fn fail<T>(&mut self, err: CoreError) -> Result<T> {
        warn!(error = %err, "Entity registry operation failed");
        self.last_error = Some(err.to_string());
        Err(err)
    }

    /// Text of the most recent creation failure.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Forget the most recent creation failure.
    pub fn clear_last_error(&mut self) {
        self.last_error = None;
    }

    // -------------------------------------------------------------------------
    // Destruction
    // -------------------------------------------------------------------------

    /// Remove an entity. Returns `false` if no such entity is live.
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entities.remove(&id) else {
            return false;
        };
        if let Some(template) = self.templates.get_mut(entity.template()) {
            template.detach(id);
        }
        debug!(entity = %id, kind = %entity.kind(), "Destroyed entity");
        true
    }

    /// Remove a template and every entity created from it.
    ///
    /// Returns `false` if no such template exists.
    pub fn destroy_template(&mut self, name: &str) -> bool {
        let Some(mut template) = self.templates.remove(name) else {
            return false;
        };
        let ids = template.take_entities();
        for id in &ids {
            self.entities.remove(id);
        }
        debug!(template = name, entities = ids.len(), "Destroyed template");
        true
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    /// Entity by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutable entity by ID.
    #[must_use]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// First entity (lowest ID) with the given name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities.values().find(|e| e.name() == name)
    }

    /// Typed agent state by ID; `None` if absent or of another kind.
    #[must_use]
    pub fn get_as<T: AgentView>(&self, id: EntityId) -> Option<&T> {
        self.get(id).and_then(Entity::get_as::<T>)
    }

    /// Mutable typed agent state by ID.
    #[must_use]
    pub fn get_as_mut<T: AgentView>(&mut self, id: EntityId) -> Option<&mut T> {
        self.get_mut(id).and_then(Entity::get_as_mut::<T>)
    }

    /// Template by name.
    #[must_use]
    pub fn template(&self, name: &str) -> Option<&EntityTemplate> {
        self.templates.get(name)
    }

    /// Returns `true` if `id` is live.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if no entities are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All live entities in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// All templates in name order.
    pub fn templates(&self) -> impl Iterator<Item = &EntityTemplate> {
        self.templates.values()
    }

    /// IDs of live entities of `kind`, ascending.
    #[must_use]
    pub fn ids_of_kind(&self, kind: EntityKind) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.kind() == kind)
            .map(Entity::id)
            .collect()
    }

    /// Live boats with their entity.
    pub fn boats(&self) -> impl Iterator<Item = (&Entity, &Boat)> {
        self.entities
            .values()
            .filter_map(|e| e.get_as::<Boat>().map(|boat| (e, boat)))
    }

    // -------------------------------------------------------------------------
    // Geometric queries
    // -------------------------------------------------------------------------

    /// Bounding boxes of every obstacle.
    #[must_use]
    pub fn obstacle_bounds(&self) -> Vec<Aabb> {
        self.entities
            .values()
            .filter_map(|e| e.get_as::<Obstacle>().map(Obstacle::bounds))
            .collect()
    }

    /// Positions of live boats other than `except`.
    #[must_use]
    pub fn boat_positions(&self, except: EntityId) -> Vec<Vec3> {
        self.boats()
            .filter(|(e, _)| e.id() != except)
            .map(|(e, _)| e.position())
            .collect()
    }

    /// Nearest entity of `kind` within `max_range` of `from`, with its distance.
    #[must_use]
    pub fn nearest_of_kind(&self, kind: EntityKind, from: Vec3, max_range: f32) -> Option<(EntityId, f32)> {
        self.entities
            .values()
            .filter(|e| e.kind() == kind)
            .map(|e| (e.id(), e.position().distance(from)))
            .filter(|&(_, d)| d <= max_range)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Returns `true` if no obstacle box blocks the segment `from..to`.
    #[must_use]
    pub fn line_of_sight(&self, from: Vec3, to: Vec3) -> bool {
        self.entities
            .values()
            .filter_map(|e| e.get_as::<Obstacle>())
            .all(|o| !o.bounds().intersects_segment(from, to))
    }

    // -------------------------------------------------------------------------
    // Per-tick dispatch
    // -------------------------------------------------------------------------

    /// Run one update for every live entity.
    pub fn update_all(
        &mut self,
        bus: &mut MessageBus,
        rng: &mut ChaCha8Rng,
        config: &SimConfig,
        dt: f32,
    ) -> UpdateReport {
        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        let mut report = UpdateReport::default();
        let mut expired = Vec::new();

        for id in ids {
            // Destroyed earlier in this pass by another entity.
            let Some(mut entity) = self.entities.remove(&id) else {
                continue;
            };
            let lifecycle = {
                let mut ctx = TickContext {
                    registry: &mut *self,
                    bus: &mut *bus,
                    rng: &mut *rng,
                    config,
                    dt,
                    current: id,
                };
                entity.update(&mut ctx)
            };
            self.entities.insert(id, entity);
            report.updated += 1;
            if lifecycle == Lifecycle::Destroy {
                expired.push(id);
            }
        }

        for id in expired {
            if self.destroy_entity(id) {
                bus.discard(id);
                report.destroyed.push(id);
            }
        }
        report
    }

    /// Draw every entity in render group `group`. Returns how many were drawn.
    pub fn render_group(&self, group: u32, renderer: &mut dyn Renderer) -> usize {
        self.render_filtered(renderer, |e| e.render().group == group)
    }

    /// Draw every entity. Returns how many were drawn.
    pub fn render_all(&self, renderer: &mut dyn Renderer) -> usize {
        self.render_filtered(renderer, |_| true)
    }

    fn render_filtered(&self, renderer: &mut dyn Renderer, keep: impl Fn(&Entity) -> bool) -> usize {
        let mut drawn = 0;
        for entity in self.entities.values().filter(|e| keep(e)) {
            if let Some(template) = self.templates.get(entity.template()) {
                renderer.render(entity, template.geometry());
                drawn += 1;
            }
        }
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{BoatStats, Team};
    use crate::render::{HeadlessGeometry, RecordingRenderer};
    use crate::tests::helpers::tanker_stats;

    fn registry() -> EntityRegistry {
        EntityRegistry::new(Box::new(
            HeadlessGeometry::strict()
                .with_mesh("Boat1.fbx", 5)
                .with_mesh("Rock1.fbx", 1)
                .with_mesh("Tiny.fbx", 2),
        ))
    }

    fn at(x: f32, z: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(x, -1.5, z))
    }

    mod template_tests {
        use super::*;

        #[test]
        fn missing_mesh_fails_with_last_error() {
            let mut reg = registry();
            let err = reg
                .create_template(TemplateSpec::plain("Ghost", "Ghost.fbx"))
                .unwrap_err();
            assert!(matches!(err, CoreError::GeometryLoad { .. }));
            assert!(reg.last_error().unwrap().contains("Ghost.fbx"));
            assert!(reg.template("Ghost").is_none());
            reg.clear_last_error();
            assert!(reg.last_error().is_none());
        }

        #[test]
        fn replacing_template_cascades_old_entities() {
            let mut reg = registry();
            reg.create_template(TemplateSpec::plain("Rock", "Rock1.fbx")).unwrap();
            let old = reg.create_entity("Rock", Spawn::Scenery, at(0.0, 0.0), "").unwrap();

            reg.create_template(TemplateSpec::plain("Rock", "Rock1.fbx")).unwrap();
            assert!(reg.get(old).is_none());
            assert!(reg.template("Rock").unwrap().entities().is_empty());
        }

        #[test]
        fn destroy_template_cascades() {
            let mut reg = registry();
            reg.create_template(TemplateSpec::boat("Blue Tanker", "Boat1.fbx", tanker_stats()))
                .unwrap();
            reg.create_template(TemplateSpec::plain("Rock", "Rock1.fbx")).unwrap();
            let boats: Vec<_> = (0..3)
                .map(|i| {
                    reg.create_entity("Blue Tanker", Spawn::Boat { speed: 0.0 }, at(i as f32 * 50.0, 0.0), "")
                        .unwrap()
                })
                .collect();
            let rock = reg.create_entity("Rock", Spawn::Scenery, at(0.0, 0.0), "").unwrap();

            assert!(reg.destroy_template("Blue Tanker"));
            assert_eq!(reg.len(), 1);
            for id in boats {
                assert!(reg.get(id).is_none());
            }
            assert!(reg.template("Blue Tanker").is_none());
            assert!(reg.get(rock).is_some());
            assert!(!reg.destroy_template("Blue Tanker"));
        }
    }

    mod entity_tests {
        use super::*;

        #[test]
        fn ids_start_at_first_and_increase() {
            let mut reg = registry();
            reg.create_template(TemplateSpec::plain("Rock", "Rock1.fbx")).unwrap();
            let a = reg.create_entity("Rock", Spawn::Scenery, at(0.0, 0.0), "a").unwrap();
            let b = reg.create_entity("Rock", Spawn::Scenery, at(0.0, 0.0), "b").unwrap();
            assert_eq!(a, EntityId::FIRST);
            assert!(b > a);
        }

        #[test]
        fn destroyed_ids_are_not_reused() {
            let mut reg = registry();
            reg.create_template(TemplateSpec::plain("Rock", "Rock1.fbx")).unwrap();
            let a = reg.create_entity("Rock", Spawn::Scenery, at(0.0, 0.0), "").unwrap();
            assert!(reg.destroy_entity(a));
            assert!(!reg.destroy_entity(a));
            let b = reg.create_entity("Rock", Spawn::Scenery, at(0.0, 0.0), "").unwrap();
            assert_ne!(a, b);
            assert_eq!(reg.template("Rock").unwrap().entities(), &[b]);
        }

        #[test]
        fn unknown_template_is_an_error() {
            let mut reg = registry();
            let err = reg
                .create_entity("Nope", Spawn::Scenery, Mat4::IDENTITY, "")
                .unwrap_err();
            assert!(matches!(err, CoreError::TemplateNotFound(ref t) if t == "Nope"));
            assert_eq!(
                reg.last_error(),
                Some("Entity Registry: cannot find entity template 'Nope'")
            );
        }

        #[test]
        fn boat_from_plain_template_is_kind_mismatch() {
            let mut reg = registry();
            reg.create_template(TemplateSpec::plain("Rock", "Rock1.fbx")).unwrap();
            let err = reg
                .create_entity("Rock", Spawn::Boat { speed: 0.0 }, Mat4::IDENTITY, "")
                .unwrap_err();
            assert!(matches!(err, CoreError::KindMismatch { requested: EntityKind::Boat, .. }));
            assert!(reg.is_empty());
        }

        #[test]
        fn boat_needs_enough_nodes() {
            let mut reg = registry();
            reg.create_template(TemplateSpec::boat("Dinghy", "Tiny.fbx", tanker_stats()))
                .unwrap();
            let err = reg
                .create_entity("Dinghy", Spawn::Boat { speed: 0.0 }, Mat4::IDENTITY, "")
                .unwrap_err();
            assert!(matches!(err, CoreError::Construction { .. }));
            assert!(reg.template("Dinghy").unwrap().entities().is_empty());
        }

        #[test]
        fn failed_creation_consumes_no_id() {
            let mut reg = registry();
            reg.create_template(TemplateSpec::plain("Rock", "Rock1.fbx")).unwrap();
            let _ = reg.create_entity("Nope", Spawn::Scenery, Mat4::IDENTITY, "");
            let id = reg.create_entity("Rock", Spawn::Scenery, Mat4::IDENTITY, "").unwrap();
            assert_eq!(id, EntityId::FIRST);
        }

        #[test]
        fn typed_lookup_returns_none_on_mismatch() {
            let mut reg = registry();
            reg.create_template(TemplateSpec::boat("Blue Tanker", "Boat1.fbx", tanker_stats()))
                .unwrap();
            reg.create_template(TemplateSpec::plain("Rock", "Rock1.fbx")).unwrap();
            let boat = reg
                .create_entity("Blue Tanker", Spawn::Boat { speed: 10.0 }, Mat4::IDENTITY, "Murphy")
                .unwrap();
            let rock = reg.create_entity("Rock", Spawn::Scenery, Mat4::IDENTITY, "").unwrap();

            assert!(reg.get_as::<Boat>(boat).is_some());
            assert!(reg.get_as::<Boat>(rock).is_none());
            assert!(reg.get_as::<Boat>(EntityId::new(999)).is_none());
            assert_eq!(reg.get_by_name("Murphy").map(Entity::id), Some(boat));
            assert!(reg.get_by_name("Nobody").is_none());
        }

        #[test]
        fn boat_transforms_sized_from_geometry() {
            let mut reg = registry();
            reg.create_template(TemplateSpec::boat("Blue Tanker", "Boat1.fbx", tanker_stats()))
                .unwrap();
            let boat = reg
                .create_entity("Blue Tanker", Spawn::Boat { speed: 0.0 }, at(10.0, 0.0), "")
                .unwrap();
            let entity = reg.get(boat).unwrap();
            assert_eq!(entity.transforms().len(), 5);
            assert_eq!(entity.position(), Vec3::new(10.0, -1.5, 0.0));
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn obstacle_blocks_line_of_sight() {
            let mut reg = registry();
            reg.create_template(TemplateSpec::plain("Rock", "Rock1.fbx")).unwrap();
            reg.create_entity(
                "Rock",
                Spawn::Obstacle {
                    half_extents: Vec3::new(10.0, 20.0, 10.0),
                },
                at(0.0, 50.0),
                "",
            )
            .unwrap();
            assert!(!reg.line_of_sight(Vec3::new(0.0, -1.5, 0.0), Vec3::new(0.0, -1.5, 100.0)));
            assert!(reg.line_of_sight(Vec3::new(50.0, -1.5, 0.0), Vec3::new(50.0, -1.5, 100.0)));
            assert_eq!(reg.obstacle_bounds().len(), 1);
        }

        #[test]
        fn nearest_of_kind_respects_range() {
            let mut reg = registry();
            reg.create_template(TemplateSpec::plain("Station", "Rock1.fbx")).unwrap();
            let near = reg
                .create_entity("Station", Spawn::ReloadStation, at(30.0, 0.0), "")
                .unwrap();
            reg.create_entity("Station", Spawn::ReloadStation, at(90.0, 0.0), "")
                .unwrap();
            let found = reg.nearest_of_kind(EntityKind::ReloadStation, Vec3::new(0.0, -1.5, 0.0), 1000.0);
            assert_eq!(found.map(|f| f.0), Some(near));
            assert!(reg
                .nearest_of_kind(EntityKind::ReloadStation, Vec3::new(0.0, -1.5, 0.0), 10.0)
                .is_none());
        }
    }

    mod render_tests {
        use super::*;
        use crate::entity::RenderSettings;

        #[test]
        fn render_group_dispatches_only_that_group() {
            let mut reg = registry();
            reg.create_template(TemplateSpec::plain("Rock", "Rock1.fbx")).unwrap();
            let a = reg.create_entity("Rock", Spawn::Scenery, Mat4::IDENTITY, "").unwrap();
            let b = reg.create_entity("Rock", Spawn::Scenery, Mat4::IDENTITY, "").unwrap();
            reg.get_mut(b).unwrap().render_mut().group = RenderSettings::ADDITIVE;

            let mut renderer = RecordingRenderer::default();
            assert_eq!(reg.render_group(RenderSettings::OPAQUE, &mut renderer), 1);
            assert_eq!(renderer.drawn, vec![a]);

            let mut renderer = RecordingRenderer::default();
            assert_eq!(reg.render_all(&mut renderer), 2);
        }
    }

    #[test]
    fn team_stats_are_copied_into_boat() {
        let mut reg = registry();
        let stats = BoatStats {
            team: Team::TeamC,
            ..tanker_stats()
        };
        reg.create_template(TemplateSpec::boat("Purple Eater", "Boat1.fbx", stats))
            .unwrap();
        let id = reg
            .create_entity("Purple Eater", Spawn::Boat { speed: 1000.0 }, Mat4::IDENTITY, "")
            .unwrap();
        let boat = reg.get_as::<Boat>(id).unwrap();
        assert_eq!(boat.team(), Team::TeamC);
        assert_eq!(boat.speed(), stats.max_speed);
    }
}
