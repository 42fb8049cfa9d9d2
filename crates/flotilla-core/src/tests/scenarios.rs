//! End-to-end scenarios through the simulation API.
//!
//! These cover the documented behaviours that need more than one entity:
//! - Damage accumulation and destruction
//! - Running dry and reloading
//! - Mailbox delivery
//! - Template cascade
//! - Shield replacement
//! - A full engagement between two boats

use glam::Vec3;

use crate::agents::{BoatState, Shield, Spawn};
use crate::entity::{EntityId, EntityKind, MatrixExt};
use crate::message::{CrateKind, MessageBody, MessageBus};
use crate::simulation::Simulation;

use super::helpers::{add_templates, run, sim_with_fleet, spawn_boat, water};

// =============================================================================
// Damage
// =============================================================================

#[test]
fn three_hits_leave_a_quarter_and_the_fourth_destroys() {
    let (mut sim, [murphy, sly, _slam]) = sim_with_fleet(11);
    sim.send(murphy, MessageBody::Start);
    sim.step(0.01);

    for _ in 0..3 {
        sim.send(murphy, MessageBody::Hit { attacker: sly });
        sim.step(0.01);
    }
    let boat = sim.boat(murphy).unwrap();
    assert_eq!(boat.hp(), 25.0);
    assert_eq!(boat.state(), BoatState::Patrol);

    sim.send(murphy, MessageBody::Hit { attacker: sly });
    sim.step(0.01);
    let boat = sim.boat(murphy).unwrap();
    assert_eq!(boat.hp(), 0.0);
    assert_eq!(boat.state(), BoatState::Destroyed);
}

#[test]
fn shielded_boat_ignores_missile_hits() {
    let (mut sim, [murphy, sly, _slam]) = sim_with_fleet(12);
    sim.send(murphy, MessageBody::CrateCollected { kind: CrateKind::Shield });
    sim.step(0.01);
    assert!(sim.boat(murphy).unwrap().shield().is_some());

    sim.send(murphy, MessageBody::Hit { attacker: sly });
    sim.step(0.01);
    let boat = sim.boat(murphy).unwrap();
    assert_eq!(boat.hp(), 100.0);
    assert_eq!(boat.label_text(), Some("Shield absorbed hit"));

    // Mines still hurt, at half damage.
    sim.send(murphy, MessageBody::MineHit);
    sim.step(0.01);
    assert_eq!(sim.boat(murphy).unwrap().hp(), 75.0);
}

// =============================================================================
// Reloading
// =============================================================================

#[test]
fn empty_patrolling_boat_goes_to_reload() {
    let (mut sim, [murphy, _sly, _slam]) = sim_with_fleet(21);
    sim.registry_mut()
        .create_entity("Station", Spawn::ReloadStation, water(-200.0, -300.0), "Station")
        .unwrap();
    sim.send(murphy, MessageBody::Start);
    sim.step(0.01);
    assert_eq!(sim.boat(murphy).unwrap().state(), BoatState::Patrol);

    sim.registry_mut()
        .get_as_mut::<crate::agents::Boat>(murphy)
        .unwrap()
        .set_missiles(0);
    sim.step(0.01);
    assert_eq!(sim.boat(murphy).unwrap().state(), BoatState::Reloading);
}

#[test]
fn reload_refills_after_waiting_at_station() {
    let (mut sim, [murphy, _sly, _slam]) = sim_with_fleet(22);
    sim.registry_mut()
        .create_entity("Station", Spawn::ReloadStation, water(-200.0, 20.0), "Station")
        .unwrap();
    sim.registry_mut()
        .get_as_mut::<crate::agents::Boat>(murphy)
        .unwrap()
        .set_missiles(0);
    sim.send(murphy, MessageBody::Reload);

    run(&mut sim, 60 * 4);
    let boat = sim.boat(murphy).unwrap();
    assert_eq!(boat.state(), BoatState::Reloading);
    assert_eq!(boat.missiles(), 0);

    run(&mut sim, 60 * 2);
    let boat = sim.boat(murphy).unwrap();
    assert_eq!(boat.missiles(), sim.config().boat.missile_capacity);
    assert_eq!(boat.state(), BoatState::Patrol);
}

// =============================================================================
// Mailbox
// =============================================================================

#[test]
fn delivered_message_is_received_exactly_once() {
    let (a, b) = (EntityId::new(7), EntityId::new(9));
    let mut bus = MessageBus::new();
    bus.deliver(a, b, MessageBody::Hit { attacker: a });

    let message = bus.receive_one(b).unwrap();
    assert_eq!(message.from, a);
    assert_eq!(message.body, MessageBody::Hit { attacker: a });
    assert!(bus.receive_one(b).is_none());
}

#[test]
fn mail_for_destroyed_entity_is_dropped() {
    let (mut sim, [murphy, _sly, _slam]) = sim_with_fleet(32);
    sim.send(murphy, MessageBody::Die);
    run(&mut sim, 60);
    sim.send(murphy, MessageBody::Start);
    run(&mut sim, 60 * 4);
    assert!(sim.boat(murphy).is_none());
    assert_eq!(sim.bus().pending(murphy), 0);
}

// =============================================================================
// Templates
// =============================================================================

#[test]
fn destroying_a_template_removes_all_its_entities() {
    let mut sim = Simulation::headless(41);
    add_templates(&mut sim);
    let ids: Vec<_> = (0..3)
        .map(|i| spawn_boat(&mut sim, "Blue Tanker", water(i as f32 * 100.0, 0.0), ""))
        .collect();
    let other = spawn_boat(&mut sim, "Red Raider", water(0.0, 300.0), "");
    let before = sim.registry().len();

    assert!(sim.destroy_template("Blue Tanker"));
    for id in ids {
        assert!(sim.registry().get(id).is_none());
    }
    assert!(sim.registry().template("Blue Tanker").is_none());
    assert_eq!(sim.registry().len(), before - 3);
    assert!(sim.registry().get(other).is_some());
}

// =============================================================================
// Shields
// =============================================================================

#[test]
fn second_shield_crate_replaces_the_first() {
    let (mut sim, [murphy, _sly, _slam]) = sim_with_fleet(51);
    let shields_of = |sim: &Simulation| {
        sim.registry()
            .ids_of_kind(EntityKind::Shield)
            .into_iter()
            .filter(|&id| sim.registry().get_as::<Shield>(id).map(Shield::owner) == Some(murphy))
            .count()
    };

    sim.send(murphy, MessageBody::CrateCollected { kind: CrateKind::Shield });
    sim.step(0.01);
    let first = sim.boat(murphy).unwrap().shield().unwrap();
    assert_eq!(shields_of(&sim), 1);

    for _ in 0..5 {
        sim.send(murphy, MessageBody::CrateCollected { kind: CrateKind::Shield });
        sim.step(0.01);
        assert!(shields_of(&sim) <= 1);
    }
    assert!(sim.registry().get(first).is_none());
    assert_eq!(shields_of(&sim), 1);
}

// =============================================================================
// Engagement
// =============================================================================

#[test]
fn boat_spots_aims_fires_and_evades() {
    let mut sim = Simulation::headless(61);
    add_templates(&mut sim);
    let hunter = spawn_boat(&mut sim, "Blue Tanker", water(0.0, 0.0), "Hunter");
    let prey = spawn_boat(&mut sim, "Red Raider", water(0.0, 100.0), "Prey");
    sim.send(hunter, MessageBody::Start);

    sim.step(1.0 / 60.0);
    assert_eq!(sim.boat(hunter).unwrap().state(), BoatState::Aim);
    assert_eq!(sim.boat(hunter).unwrap().target(), Some(prey));

    run(&mut sim, 60 * 2 + 5);
    let boat = sim.boat(hunter).unwrap();
    assert_eq!(boat.state(), BoatState::Evade);
    assert_eq!(boat.missiles(), 9);
    assert_eq!(boat.missiles_fired(), 1);

    // The missile lands on the stationary target.
    run(&mut sim, 60 * 3);
    let damage = sim.boat(hunter).unwrap().stats().missile_damage;
    assert_eq!(sim.boat(prey).unwrap().hp(), 100.0 - damage);
    assert!(sim.registry().ids_of_kind(EntityKind::Missile).is_empty());
}

#[test]
fn blocked_line_of_sight_prevents_spotting() {
    let mut sim = Simulation::headless(62);
    add_templates(&mut sim);
    let hunter = spawn_boat(&mut sim, "Blue Tanker", water(0.0, 0.0), "Hunter");
    spawn_boat(&mut sim, "Red Raider", water(0.0, 120.0), "Prey");
    sim.registry_mut()
        .create_entity(
            "Rock",
            Spawn::Obstacle {
                half_extents: Vec3::new(30.0, 20.0, 5.0),
            },
            water(0.0, 60.0),
            "",
        )
        .unwrap();
    sim.send(hunter, MessageBody::Start);
    sim.step(1.0 / 60.0);
    assert_eq!(sim.boat(hunter).unwrap().state(), BoatState::Patrol);
}

#[test]
fn patrolling_boat_moves_and_stays_on_the_water() {
    let (mut sim, [murphy, _sly, _slam]) = sim_with_fleet(71);
    let start = sim.registry().get(murphy).unwrap().position();
    sim.send(murphy, MessageBody::Start);
    run(&mut sim, 60 * 3);
    let entity = sim.registry().get(murphy).unwrap();
    let now = entity.position();
    assert!(now.distance(start) > 1.0);
    assert!((now.y - start.y).abs() < 1e-3);
    assert!(entity.transform().forward().y.abs() < 1e-3);
    let boat = sim.boat(murphy).unwrap();
    assert!(boat.speed() <= boat.stats().max_speed + 1e-4);
}
