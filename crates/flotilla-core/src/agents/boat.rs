//! Boat behaviour: a message-driven state machine with continuous steering.
//!
//! Each tick a boat first drains its mailbox, which may change its state,
//! then runs the behaviour of whatever state it ends up in.
//!
//! # States
//!
//! | State | Behaviour | Leaves to |
//! |---|---|---|
//! | `Inactive` | holds still | `Patrol` on Start |
//! | `Patrol` | roams between random points, scans ahead for enemies | `Aim`, `Reloading` |
//! | `Aim` | stops and tracks the target with the gun | `Evade` after firing, `Patrol` if the target is gone |
//! | `Evade` | runs to a point away from the enemy at boosted speed | `PickupCrate`, `Patrol` |
//! | `Reloading` | drives to the nearest station and waits there | `Patrol` |
//! | `TargetPoint` | drives to a commanded point | `Patrol` |
//! | `PickupCrate` | drives onto a crate | `Patrol` |
//! | `Wiggle` | recoils from a mine hit | `Patrol` |
//! | `MoveToAssist` | closes on a teammate's attacker | `Aim`, `Patrol` |
//! | `Destroyed` | rolls over and sinks, then is removed | - |
//!
//! Collision avoidance is blended into the heading in every state except
//! `Aim` and `Destroyed`. States without a destination steer relative to
//! the current forward axis, so avoidance alone turns them.

use glam::{Mat4, Quat, Vec3};
use rand::Rng;
use std::fmt;
use tracing::{debug, trace};

use super::{flat_distance, uniform, Spawn};
use crate::ballistics::solve_intercept;
use crate::entity::{BoatStats, EntityId, EntityKind, MatrixExt, Team, Transforms};
use crate::message::{CrateKind, Message, MessageBody};
use crate::registry::{Lifecycle, TickContext};
use crate::steering::{blend_heading, compute_avoidance, face_direction, flatten};

/// Root node index.
pub const ROOT: usize = 0;
/// Hull node index; rolls during wiggles and sinking.
pub const HULL: usize = 1;
/// Gun base node index.
pub const GUN_BASE: usize = 2;
/// Gun mount node index; turns to track targets.
pub const GUN_MOUNT: usize = 3;
/// Gun barrels node index.
pub const BARRELS: usize = 4;
/// Nodes a boat mesh must provide.
pub const NODE_COUNT: usize = 5;

/// Boat behaviour states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoatState {
    /// Waiting for Start
    Inactive,
    /// Roaming and scanning for enemies
    Patrol,
    /// Tracking a target before firing
    Aim,
    /// Running from the last target
    Evade,
    /// Going to, or waiting at, a reload station
    Reloading,
    /// Driving to a commanded point
    TargetPoint,
    /// Driving onto a crate
    PickupCrate,
    /// Recoiling from a mine
    Wiggle,
    /// Supporting a teammate
    MoveToAssist,
    /// Sinking
    Destroyed,
}

impl fmt::Display for BoatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Mutable state of one boat.
#[derive(Debug, Clone, PartialEq)]
pub struct Boat {
    stats: BoatStats,
    state: BoatState,
    hp: f32,
    speed: f32,
    missiles: u32,
    missiles_fired: u32,
    /// Time spent in the current state
    timer: f32,
    /// Patrol, evade or commanded destination
    destination: Vec3,
    /// Commanded arrival radius
    destination_range: f32,
    /// Aim target, assist enemy or crate, depending on state
    target: EntityId,
    shield: EntityId,
    heading: Vec3,
    velocity: Vec3,
    /// Hull matrix to restore after a wiggle
    hull_rest: Option<Mat4>,
    label: Option<String>,
    label_timer: f32,
}

impl Boat {
    pub(crate) fn new(stats: BoatStats, speed: f32, missiles: u32) -> Self {
        Self {
            stats,
            state: BoatState::Inactive,
            hp: stats.max_hp,
            speed: speed.min(stats.max_speed),
            missiles,
            missiles_fired: 0,
            timer: 0.0,
            destination: Vec3::ZERO,
            destination_range: 0.0,
            target: EntityId::NONE,
            shield: EntityId::NONE,
            heading: Vec3::ZERO,
            velocity: Vec3::ZERO,
            hull_rest: None,
            label: None,
            label_timer: 0.0,
        }
    }

    /// Template stats this boat was built from.
    #[must_use]
    pub const fn stats(&self) -> BoatStats {
        self.stats
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> BoatState {
        self.state
    }

    /// Team membership.
    #[must_use]
    pub const fn team(&self) -> Team {
        self.stats.team
    }

    /// Hit points, never negative.
    #[must_use]
    pub const fn hp(&self) -> f32 {
        self.hp
    }

    /// Hit points at full health.
    #[must_use]
    pub const fn max_hp(&self) -> f32 {
        self.stats.max_hp
    }

    /// Current forward speed.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// World velocity over the last tick.
    #[must_use]
    pub const fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Missiles remaining.
    #[must_use]
    pub const fn missiles(&self) -> u32 {
        self.missiles
    }

    /// Missiles fired so far.
    #[must_use]
    pub const fn missiles_fired(&self) -> u32 {
        self.missiles_fired
    }

    /// Current aim target, assist enemy or crate.
    #[must_use]
    pub fn target(&self) -> Option<EntityId> {
        (!self.target.is_none()).then_some(self.target)
    }

    /// Attached shield entity, if any.
    #[must_use]
    pub fn shield(&self) -> Option<EntityId> {
        (!self.shield.is_none()).then_some(self.shield)
    }

    /// Transient status text, while it is showing.
    #[must_use]
    pub fn label_text(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns `true` once the boat has been destroyed.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state == BoatState::Destroyed
    }

    #[cfg(test)]
    pub(crate) fn set_missiles(&mut self, missiles: u32) {
        self.missiles = missiles;
    }

    #[cfg(test)]
    pub(crate) fn attach_shield(&mut self, shield: EntityId) {
        self.shield = shield;
    }

    // -------------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------------

    pub(crate) fn update(
        &mut self,
        me: EntityId,
        transforms: &mut Transforms,
        ctx: &mut TickContext<'_>,
    ) -> Lifecycle {
        while let Some(message) = ctx.receive() {
            self.handle_message(me, message, transforms, ctx);
        }
        if !matches!(self.state, BoatState::Wiggle | BoatState::Destroyed) {
            self.restore_hull(transforms);
        }
        self.tick_label(ctx.dt);
        self.timer += ctx.dt;

        let lifecycle = match self.state {
            BoatState::Inactive => {
                self.speed = 0.0;
                let forward = transforms.root().forward();
                self.steer(transforms, ctx, forward, 0.0);
                Lifecycle::Keep
            }
            BoatState::Patrol => self.patrol(me, transforms, ctx),
            BoatState::Aim => self.aim(me, transforms, ctx),
            BoatState::Evade => self.evade(me, transforms, ctx),
            BoatState::Reloading => self.reloading(me, transforms, ctx),
            BoatState::TargetPoint => self.target_point(me, transforms, ctx),
            BoatState::PickupCrate => self.pickup_crate(me, transforms, ctx),
            BoatState::Wiggle => self.wiggle(me, transforms, ctx),
            BoatState::MoveToAssist => self.move_to_assist(me, transforms, ctx),
            BoatState::Destroyed => return self.sink(transforms, ctx),
        };

        if self.state != BoatState::Wiggle {
            let step = self.speed * ctx.dt;
            transforms.root_mut().move_local_z(step);
            self.velocity = transforms.root().forward() * self.speed;
        }
        lifecycle
    }

    fn set_state(&mut self, me: EntityId, state: BoatState) {
        if self.state != state {
            debug!(entity = %me, from = %self.state, to = %state, "Boat state change");
        }
        self.state = state;
        self.timer = 0.0;
    }

    /// Undo any wiggle roll still applied to the hull.
    fn restore_hull(&mut self, transforms: &mut Transforms) {
        if let Some(rest) = self.hull_rest.take() {
            if let Some(hull) = transforms.node_mut(HULL) {
                *hull = rest;
            }
        }
    }

    fn say(&mut self, text: impl Into<String>, duration: f32) {
        self.label = Some(text.into());
        self.label_timer = duration;
    }

    fn tick_label(&mut self, dt: f32) {
        if self.label.is_some() {
            self.label_timer -= dt;
            if self.label_timer <= 0.0 {
                self.label = None;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Messages
    // -------------------------------------------------------------------------

    fn handle_message(
        &mut self,
        me: EntityId,
        message: Message,
        transforms: &mut Transforms,
        ctx: &mut TickContext<'_>,
    ) {
        if self.state == BoatState::Destroyed {
            trace!(entity = %me, message = %message.body.tag(), "Ignored while destroyed");
            return;
        }
        let label_time = ctx.config.boat.label_duration;
        let position = transforms.root().position();

        match message.body {
            MessageBody::Start => {
                if self.state == BoatState::Inactive {
                    self.destination = self.random_patrol_point(position, ctx);
                    self.set_state(me, BoatState::Patrol);
                }
            }
            MessageBody::Stop => {
                self.speed = 0.0;
                self.set_state(me, BoatState::Inactive);
            }
            MessageBody::Evade => {
                if self.state != BoatState::Inactive {
                    let threat = ctx
                        .registry
                        .get(message.from)
                        .map_or(position - transforms.root().forward(), |e| e.position());
                    self.destination = evade_point(position, threat, ctx);
                    self.set_state(me, BoatState::Evade);
                }
            }
            MessageBody::Hit { attacker } => {
                if self.has_shield(ctx) {
                    self.say("Shield absorbed hit", label_time);
                    return;
                }
                let (damage, attacker_alive) = ctx
                    .registry
                    .get_as::<Boat>(attacker)
                    .map_or((ctx.config.boat.default_hit_damage, false), |b| {
                        (b.stats.missile_damage, !b.is_destroyed())
                    });
                if self.take_damage(me, damage) {
                    return;
                }
                self.say(format!("Hit! -{damage:.0}"), label_time);
                if attacker_alive && ctx.rng.gen_bool(ctx.config.boat.help_chance.clamp(0.0, 1.0)) {
                    self.call_for_help(me, position, attacker, ctx);
                }
            }
            MessageBody::MineHit => {
                let damage = if self.has_shield(ctx) {
                    ctx.config.boat.mine_damage_shielded
                } else {
                    ctx.config.boat.mine_damage
                };
                if self.take_damage(me, damage) {
                    return;
                }
                self.say("Mine hit!", label_time);
                if self.hull_rest.is_none() {
                    self.hull_rest = transforms.node(HULL).copied();
                }
                self.speed = 0.0;
                self.set_state(me, BoatState::Wiggle);
            }
            MessageBody::Help { enemy } => {
                if self.state != BoatState::Aim {
                    self.target = enemy;
                    self.say("Assisting", label_time);
                    self.set_state(me, BoatState::MoveToAssist);
                }
            }
            MessageBody::Reload => {
                self.set_state(me, BoatState::Reloading);
            }
            MessageBody::CrateCollected { kind } => self.collect(me, kind, transforms, ctx),
            MessageBody::TargetPoint { point, range } => {
                self.destination = point;
                self.destination_range = range.max(0.0);
                self.set_state(me, BoatState::TargetPoint);
            }
            MessageBody::Die => {
                self.speed = 0.0;
                self.set_state(me, BoatState::Destroyed);
            }
            MessageBody::ShieldDestroyed => {
                if message.from == self.shield {
                    self.shield = EntityId::NONE;
                }
            }
        }
    }

    fn has_shield(&self, ctx: &TickContext<'_>) -> bool {
        !self.shield.is_none() && ctx.registry.contains(self.shield)
    }

    /// Apply damage, clamping at zero. Returns `true` if the boat was destroyed.
    fn take_damage(&mut self, me: EntityId, damage: f32) -> bool {
        self.hp = (self.hp - damage.max(0.0)).max(0.0);
        if self.hp <= 0.0 {
            self.speed = 0.0;
            self.set_state(me, BoatState::Destroyed);
            true
        } else {
            false
        }
    }

    fn call_for_help(&mut self, me: EntityId, position: Vec3, enemy: EntityId, ctx: &mut TickContext<'_>) {
        let tuning = &ctx.config.boat;
        let radius = uniform(ctx.rng, tuning.help_radius_min, tuning.help_radius_max);
        let team = self.team();
        let helpers: Vec<EntityId> = ctx
            .registry
            .boats()
            .filter(|(e, b)| {
                e.id() != me
                    && b.team() == team
                    && !b.is_destroyed()
                    && e.position().distance(position) <= radius
            })
            .map(|(e, _)| e.id())
            .collect();
        debug!(entity = %me, radius, helpers = helpers.len(), "Calling for help");
        for helper in helpers {
            ctx.send(helper, MessageBody::Help { enemy });
        }
    }

    fn collect(&mut self, me: EntityId, kind: CrateKind, transforms: &Transforms, ctx: &mut TickContext<'_>) {
        let tuning = &ctx.config.boat;
        let label_time = tuning.label_duration;
        match kind {
            CrateKind::Missile => {
                self.missiles = self.missiles.saturating_add(tuning.crate_missiles);
                let text = format!("+{} missiles", tuning.crate_missiles);
                self.say(text, label_time);
            }
            CrateKind::Health => {
                self.hp = (self.hp + tuning.crate_health).min(self.stats.max_hp);
                let text = format!("+{:.0} HP", tuning.crate_health);
                self.say(text, label_time);
            }
            CrateKind::Shield => {
                let duration = uniform(ctx.rng, tuning.shield_duration_min, tuning.shield_duration_max);
                if !self.shield.is_none() {
                    ctx.destroy(self.shield);
                    self.shield = EntityId::NONE;
                }
                let template = ctx.config.shield_template.clone();
                let spawn = Spawn::Shield { owner: me, duration };
                let placement = Mat4::from_translation(transforms.root().position());
                if let Ok(shield) = ctx.spawn(&template, spawn, placement) {
                    self.shield = shield;
                    self.say(format!("Shield {duration:.0}s"), label_time);
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Steering
    // -------------------------------------------------------------------------

    /// Turn towards `goal` (a direction) with avoidance and ramp towards
    /// `target_speed`.
    fn steer(&mut self, transforms: &mut Transforms, ctx: &mut TickContext<'_>, goal: Vec3, target_speed: f32) {
        let config = &ctx.config.avoidance;
        let root = transforms.root_mut();
        let position = root.position();

        let agents = ctx.registry.boat_positions(ctx.current);
        let obstacles = ctx.registry.obstacle_bounds();
        let avoidance = compute_avoidance(position, root.forward(), &agents, &obstacles, config);

        let mut turn_rate = self.stats.turn_speed;
        if avoidance.vector != Vec3::ZERO {
            turn_rate *= config.turn_boost;
        }
        let mut cap = target_speed;
        if avoidance.immediate_threat {
            cap = cap.min(self.stats.max_speed * config.threat_speed_factor);
        }

        let heading = blend_heading(goal, avoidance.vector, self.heading, config);
        if heading != Vec3::ZERO {
            self.heading = heading;
            face_direction(root, heading, ctx.dt, turn_rate);
        }
        self.ramp_speed(cap, ctx.dt);
    }

    fn steer_to(&mut self, transforms: &mut Transforms, ctx: &mut TickContext<'_>, point: Vec3, target_speed: f32) {
        let goal = point - transforms.root().position();
        self.steer(transforms, ctx, goal, target_speed);
    }

    fn ramp_speed(&mut self, target: f32, dt: f32) {
        let step = self.stats.acceleration * dt;
        self.speed = if self.speed < target {
            (self.speed + step).min(target)
        } else {
            (self.speed - step).max(target)
        };
    }

    fn random_patrol_point(&self, position: Vec3, ctx: &mut TickContext<'_>) -> Vec3 {
        let half = ctx.config.boat.patrol_half_extent.abs();
        Vec3::new(uniform(ctx.rng, -half, half), position.y, uniform(ctx.rng, -half, half))
    }

    fn back_to_patrol(&mut self, me: EntityId, position: Vec3, ctx: &mut TickContext<'_>) {
        self.target = EntityId::NONE;
        self.destination = self.random_patrol_point(position, ctx);
        self.set_state(me, BoatState::Patrol);
    }

    // -------------------------------------------------------------------------
    // States
    // -------------------------------------------------------------------------

    fn patrol(&mut self, me: EntityId, transforms: &mut Transforms, ctx: &mut TickContext<'_>) -> Lifecycle {
        let position = transforms.root().position();
        if self.missiles == 0 {
            self.say("Out of missiles", ctx.config.boat.label_duration);
            self.set_state(me, BoatState::Reloading);
            return Lifecycle::Keep;
        }
        if flat_distance(position, self.destination) < ctx.config.boat.arrival_radius {
            self.destination = self.random_patrol_point(position, ctx);
        }
        let destination = self.destination;
        self.steer_to(transforms, ctx, destination, self.stats.max_speed);

        if let Some(enemy) = self.scan(me, transforms.root(), ctx) {
            self.target = enemy;
            self.speed = 0.0;
            self.say("Target spotted", ctx.config.boat.label_duration);
            self.set_state(me, BoatState::Aim);
        }
        Lifecycle::Keep
    }

    /// Nearest live enemy inside the forward detection cone with a clear line
    /// of sight.
    fn scan(&self, me: EntityId, root: &Mat4, ctx: &TickContext<'_>) -> Option<EntityId> {
        let tuning = &ctx.config.boat;
        let position = root.position();
        let forward = flatten(root.forward());
        let cone_cos = tuning.detect_half_angle_deg.to_radians().cos();

        ctx.registry
            .boats()
            .filter(|(e, b)| e.id() != me && b.team() != self.team() && !b.is_destroyed())
            .map(|(e, _)| (e.id(), e.position()))
            .filter(|&(_, p)| {
                let distance = p.distance(position);
                distance <= tuning.detect_range && forward.dot(flatten(p - position)) >= cone_cos
            })
            .filter(|&(_, p)| ctx.registry.line_of_sight(position, p))
            .min_by(|a, b| a.1.distance(position).total_cmp(&b.1.distance(position)))
            .map(|(id, _)| id)
    }

    fn aim(&mut self, me: EntityId, transforms: &mut Transforms, ctx: &mut TickContext<'_>) -> Lifecycle {
        self.speed = 0.0;
        let position = transforms.root().position();
        let target = ctx
            .registry
            .get(self.target)
            .and_then(|e| e.get_as::<Boat>().map(|b| (e.position(), b.velocity(), b.is_destroyed())));
        let Some((target_pos, target_vel, false)) = target else {
            self.back_to_patrol(me, position, ctx);
            return Lifecycle::Keep;
        };

        let local = transforms.root().inverse().transform_vector3(target_pos - position);
        if let Some(mount) = transforms.node_mut(GUN_MOUNT) {
            face_direction(mount, local, ctx.dt, self.stats.gun_turn_speed);
        }

        if self.timer < ctx.config.boat.aim_duration {
            return Lifecycle::Keep;
        }

        self.fire(me, position, target_pos, target_vel, ctx);
        self.destination = evade_point(position, target_pos, ctx);
        self.set_state(me, BoatState::Evade);
        Lifecycle::Keep
    }

    fn fire(&mut self, me: EntityId, position: Vec3, target: Vec3, target_velocity: Vec3, ctx: &mut TickContext<'_>) {
        if self.missiles == 0 {
            return;
        }
        let launch = position + Vec3::Y * ctx.config.boat.launch_height;
        let tuning = &ctx.config.missile;
        let Some(shot) = solve_intercept(launch, target, target_velocity, tuning.speed, tuning.gravity) else {
            return;
        };
        let facing = Quat::from_rotation_arc(Vec3::Z, shot.velocity.normalize_or_zero());
        let placement = Mat4::from_rotation_translation(facing, launch);
        let template = ctx.config.missile_template.clone();
        let spawn = Spawn::Missile {
            launcher: me,
            velocity: shot.velocity,
        };
        if ctx.spawn(&template, spawn, placement).is_ok() {
            self.missiles = self.missiles.saturating_sub(1);
            self.missiles_fired += 1;
            debug!(entity = %me, target = %self.target, flight_time = shot.time, "Missile fired");
            self.say("Fire!", ctx.config.boat.label_duration);
        }
    }

    fn evade(&mut self, me: EntityId, transforms: &mut Transforms, ctx: &mut TickContext<'_>) -> Lifecycle {
        let position = transforms.root().position();
        let tuning = &ctx.config.boat;
        let arrived = flat_distance(position, self.destination) < tuning.arrival_radius;
        if arrived || self.timer >= tuning.evade_timeout {
            let search = tuning.crate_search_radius;
            match ctx.registry.nearest_of_kind(EntityKind::RandomCrate, position, search) {
                Some((crate_id, _)) => {
                    self.target = crate_id;
                    self.set_state(me, BoatState::PickupCrate);
                }
                None => self.back_to_patrol(me, position, ctx),
            }
            return Lifecycle::Keep;
        }
        let destination = self.destination;
        let speed = self.stats.max_speed * tuning.evade_speed_factor;
        self.steer_to(transforms, ctx, destination, speed);
        Lifecycle::Keep
    }

    fn reloading(&mut self, me: EntityId, transforms: &mut Transforms, ctx: &mut TickContext<'_>) -> Lifecycle {
        let position = transforms.root().position();
        let Some((station, distance)) =
            ctx.registry
                .nearest_of_kind(EntityKind::ReloadStation, position, f32::INFINITY)
        else {
            self.say("No reload station", ctx.config.boat.label_duration);
            self.back_to_patrol(me, position, ctx);
            return Lifecycle::Keep;
        };

        let tuning = &ctx.config.boat;
        if distance > tuning.reload_range {
            // Not waiting yet.
            self.timer = 0.0;
            let Some(station_pos) = ctx.registry.get(station).map(|e| e.position()) else {
                return Lifecycle::Keep;
            };
            self.steer_to(transforms, ctx, station_pos, self.stats.max_speed);
            return Lifecycle::Keep;
        }

        self.speed = 0.0;
        if self.label.is_none() {
            self.say("Reloading", tuning.label_duration);
        }
        if self.timer >= tuning.reload_duration {
            self.missiles = tuning.missile_capacity;
            self.say("Reloaded", tuning.label_duration);
            self.back_to_patrol(me, position, ctx);
        }
        Lifecycle::Keep
    }

    fn target_point(&mut self, me: EntityId, transforms: &mut Transforms, ctx: &mut TickContext<'_>) -> Lifecycle {
        let position = transforms.root().position();
        let range = if self.destination_range > 0.0 {
            self.destination_range
        } else {
            ctx.config.boat.arrival_radius
        };
        if flat_distance(position, self.destination) <= range {
            self.back_to_patrol(me, position, ctx);
            return Lifecycle::Keep;
        }
        let destination = self.destination;
        self.steer_to(transforms, ctx, destination, self.stats.max_speed);
        Lifecycle::Keep
    }

    fn pickup_crate(&mut self, me: EntityId, transforms: &mut Transforms, ctx: &mut TickContext<'_>) -> Lifecycle {
        let position = transforms.root().position();
        let crate_pos = ctx
            .registry
            .get(self.target)
            .filter(|e| e.kind() == EntityKind::RandomCrate)
            .map(|e| e.position());
        let Some(crate_pos) = crate_pos else {
            self.back_to_patrol(me, position, ctx);
            return Lifecycle::Keep;
        };
        if position.distance(crate_pos) <= ctx.config.random_crate.trigger_radius {
            self.back_to_patrol(me, position, ctx);
            return Lifecycle::Keep;
        }
        self.steer_to(transforms, ctx, crate_pos, self.stats.max_speed);
        Lifecycle::Keep
    }

    fn wiggle(&mut self, me: EntityId, transforms: &mut Transforms, ctx: &mut TickContext<'_>) -> Lifecycle {
        let tuning = &ctx.config.boat;
        let (duration, recoil) = (tuning.wiggle_duration, tuning.recoil_speed);
        let t = self.timer;
        let roll = tuning.wiggle_amplitude * (-tuning.wiggle_damping * t).exp() * (tuning.wiggle_frequency * t).sin();
        let rest = self.hull_rest.unwrap_or(Mat4::IDENTITY);

        self.speed = 0.0;
        let forward = transforms.root().forward();
        self.steer(transforms, ctx, forward, 0.0);
        transforms.root_mut().move_local_z(-recoil * ctx.dt);
        self.velocity = -transforms.root().forward() * recoil;

        if t >= duration {
            self.restore_hull(transforms);
            let position = transforms.root().position();
            self.back_to_patrol(me, position, ctx);
        } else if let Some(hull) = transforms.node_mut(HULL) {
            *hull = rest * Mat4::from_rotation_z(roll);
        }
        Lifecycle::Keep
    }

    fn move_to_assist(&mut self, me: EntityId, transforms: &mut Transforms, ctx: &mut TickContext<'_>) -> Lifecycle {
        let position = transforms.root().position();
        let enemy = ctx
            .registry
            .get(self.target)
            .and_then(|e| e.get_as::<Boat>().map(|b| (e.position(), b.is_destroyed())));
        let Some((enemy_pos, false)) = enemy else {
            self.back_to_patrol(me, position, ctx);
            return Lifecycle::Keep;
        };
        if position.distance(enemy_pos) <= ctx.config.boat.assist_engage_range {
            self.speed = 0.0;
            self.set_state(me, BoatState::Aim);
            return Lifecycle::Keep;
        }
        self.steer_to(transforms, ctx, enemy_pos, self.stats.max_speed);
        Lifecycle::Keep
    }

    fn sink(&mut self, transforms: &mut Transforms, ctx: &mut TickContext<'_>) -> Lifecycle {
        let tuning = &ctx.config.boat;
        self.speed = 0.0;
        self.velocity = Vec3::ZERO;
        let root = transforms.root_mut();
        root.rotate_local_z(tuning.sink_roll_rate * ctx.dt);
        let sunk = root.position() - Vec3::Y * (tuning.sink_speed * ctx.dt);
        root.set_position(sunk);

        if self.timer >= tuning.sink_duration {
            Lifecycle::Destroy
        } else {
            Lifecycle::Keep
        }
    }
}

/// A point `evade_distance` from `position`, outside the cone of
/// `evade_cone_half_angle_deg` around the direction to `threat`.
fn evade_point(position: Vec3, threat: Vec3, ctx: &mut TickContext<'_>) -> Vec3 {
    let tuning = &ctx.config.boat;
    let mut away = flatten(position - threat);
    if away == Vec3::ZERO {
        away = Vec3::X;
    }
    let spread = (180.0 - tuning.evade_cone_half_angle_deg).clamp(0.0, 180.0).to_radians();
    let offset = uniform(ctx.rng, -spread, spread);
    let direction = Quat::from_rotation_y(offset) * away;
    position + direction * tuning.evade_distance
}
