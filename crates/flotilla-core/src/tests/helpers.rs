//! Test helper functions for setting up simulations and fleets.
//!
//! Every fleet helper builds the same arena so tests can rely on fixed
//! geometry: two team A boats on the west side, one team B boat on the east
//! side, all further apart than the detection range.

use glam::{Mat4, Vec3};

use crate::agents::Spawn;
use crate::config::SimConfig;
use crate::entity::{BoatStats, EntityId, Team, TemplateSpec};
use crate::message::{CrateKind, MessageBody};
use crate::registry::EntityRegistry;
use crate::render::HeadlessGeometry;
use crate::simulation::Simulation;

// =============================================================================
// Stats
// =============================================================================

/// Stats of the "Blue Tanker" class.
pub fn tanker_stats() -> BoatStats {
    BoatStats {
        max_speed: 25.0,
        acceleration: 8.0,
        turn_speed: 0.8,
        gun_turn_speed: 1.2,
        max_hp: 100.0,
        missile_damage: 25.0,
        team: Team::TeamA,
    }
}

/// Tanker stats on team B.
pub fn raider_stats() -> BoatStats {
    BoatStats {
        team: Team::TeamB,
        ..tanker_stats()
    }
}

// =============================================================================
// Setup
// =============================================================================

/// Registry whose geometry source knows the meshes the helpers use.
pub fn registry() -> EntityRegistry {
    EntityRegistry::new(Box::new(HeadlessGeometry::lenient(crate::agents::boat::NODE_COUNT)))
}

/// Boat position on the water plane.
pub fn water(x: f32, z: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(x, -1.5, z))
}

/// Register boat templates plus one template for every secondary agent.
pub fn add_templates(sim: &mut Simulation) {
    let reg = sim.registry_mut();
    for spec in [
        TemplateSpec::boat("Blue Tanker", "Boat1.fbx", tanker_stats()),
        TemplateSpec::boat("Red Raider", "Boat2.fbx", raider_stats()),
        TemplateSpec::plain("Missile", "Missile.fbx"),
        TemplateSpec::plain("Shield", "Shield.fbx"),
        TemplateSpec::plain("Mine", "Mine.fbx"),
        TemplateSpec::plain("Crate", "Crate.fbx"),
        TemplateSpec::plain("Station", "Station.fbx"),
        TemplateSpec::plain("Rock", "Rock1.fbx"),
    ] {
        reg.create_template(spec).unwrap();
    }
}

/// Spawn an inactive boat at rest.
pub fn spawn_boat(sim: &mut Simulation, template: &str, at: Mat4, name: &str) -> EntityId {
    sim.registry_mut()
        .create_entity(template, Spawn::Boat { speed: 0.0 }, at, name)
        .unwrap()
}

/// Seeded simulation with templates and three inactive boats:
/// `[Murphy (A, west), Sly (B, east), Slam (A, north-west)]`.
pub fn sim_with_fleet(seed: u64) -> (Simulation, [EntityId; 3]) {
    sim_with_fleet_config(seed, SimConfig::default())
}

/// [`sim_with_fleet`] running under `config`.
pub fn sim_with_fleet_config(seed: u64, config: SimConfig) -> (Simulation, [EntityId; 3]) {
    let geometry = HeadlessGeometry::lenient(crate::agents::boat::NODE_COUNT);
    let mut sim = Simulation::new(seed, config, Box::new(geometry));
    add_templates(&mut sim);
    let murphy = spawn_boat(&mut sim, "Blue Tanker", water(-200.0, 0.0), "Murphy");
    let sly = spawn_boat(&mut sim, "Red Raider", water(200.0, 0.0), "Sly");
    let slam = spawn_boat(&mut sim, "Blue Tanker", water(-200.0, 150.0), "Slam");
    (sim, [murphy, sly, slam])
}

/// Seeded simulation with a busy arena for soak and benchmark runs: two
/// teams of `per_team` boats, mines, crates, a station and a few rocks, all
/// started.
pub fn populated_sim(seed: u64, per_team: usize) -> Simulation {
    let mut sim = Simulation::headless(seed);
    add_templates(&mut sim);
    for i in 0..per_team {
        let offset = i as f32 * 60.0 - 120.0;
        spawn_boat(&mut sim, "Blue Tanker", water(-150.0, offset), &format!("Blue {i}"));
        let east = water(150.0, offset) * Mat4::from_rotation_y(std::f32::consts::PI);
        spawn_boat(&mut sim, "Red Raider", east, &format!("Red {i}"));
    }
    let reg = sim.registry_mut();
    reg.create_entity("Station", Spawn::ReloadStation, water(0.0, -250.0), "Station")
        .unwrap();
    for (x, z) in [(0.0, 0.0), (-60.0, 180.0), (90.0, -140.0)] {
        reg.create_entity(
            "Rock",
            Spawn::Obstacle {
                half_extents: Vec3::new(20.0, 20.0, 20.0),
            },
            water(x, z),
            "",
        )
        .unwrap();
    }
    for (x, z) in [(-40.0, 90.0), (60.0, 60.0)] {
        reg.create_entity("Mine", Spawn::SeaMine, Mat4::from_translation(Vec3::new(x, -30.0, z)), "")
            .unwrap();
    }
    for (i, kind) in [
        CrateKind::Missile,
        CrateKind::Health,
        CrateKind::Shield,
    ]
    .into_iter()
    .enumerate()
    {
        let x = i as f32 * 80.0 - 80.0;
        reg.create_entity(
            "Crate",
            Spawn::RandomCrate { kind },
            Mat4::from_translation(Vec3::new(x, -10.0, -60.0)),
            "",
        )
        .unwrap();
    }
    sim.broadcast(MessageBody::Start);
    sim
}

/// Step `sim` `ticks` times at 60 Hz.
pub fn run(sim: &mut Simulation, ticks: usize) {
    for _ in 0..ticks {
        sim.step(1.0 / 60.0);
    }
}
