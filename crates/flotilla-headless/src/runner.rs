//! Single headless run.
//!
//! Builds a [`Simulation`] from a level, starts every boat and steps a fixed
//! number of ticks, then reduces the world to a [`RunSummary`].

use std::collections::BTreeMap;

use flotilla_core::entity::Team;
use flotilla_core::{LevelDesc, MessageBody, Result, SimConfig, Simulation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// How long and how finely to step a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum ticks to step
    pub ticks: u64,
    /// Seconds per tick
    pub dt: f32,
    /// End early once at most one team has boats afloat
    pub stop_when_decided: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: 60 * 120,
            dt: 1.0 / 60.0,
            stop_when_decided: true,
        }
    }
}

impl RunConfig {
    /// Run for `ticks` ticks.
    #[must_use]
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }

    /// Keep stepping after one team has won.
    #[must_use]
    pub fn run_to_end(mut self) -> Self {
        self.stop_when_decided = false;
        self
    }
}

/// Per-team tally at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
    /// Team
    pub team: Team,
    /// Boats still registered (sinking boats included)
    pub boats: usize,
    /// Boats not destroyed
    pub afloat: usize,
    /// Hit points across boats afloat
    pub total_hp: f32,
    /// Missiles fired by the team's remaining boats
    pub missiles_fired: u32,
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Seed the run was built with
    pub seed: u64,
    /// Ticks actually stepped
    pub ticks: u64,
    /// Simulated seconds
    pub elapsed: f64,
    /// Entities created by the level
    pub level_entities: usize,
    /// Entities alive at the end
    pub entities_alive: usize,
    /// Tally for each team present at the end, ordered by team
    pub teams: Vec<TeamSummary>,
    /// The only team with boats afloat, if exactly one has any
    pub winner: Option<Team>,
    /// Final [`Simulation::state_digest`]
    pub digest: u64,
}

impl RunSummary {
    /// Tally of `team`, if it has boats left.
    #[must_use]
    pub fn team(&self, team: Team) -> Option<&TeamSummary> {
        self.teams.iter().find(|t| t.team == team)
    }
}

/// Load `level` into a fresh simulation and run it.
///
/// # Errors
///
/// Returns the level load error; stepping itself cannot fail.
pub fn run_level(
    level: &LevelDesc,
    sim_config: &SimConfig,
    seed: u64,
    config: &RunConfig,
) -> Result<RunSummary> {
    let mut sim = Simulation::new(
        seed,
        sim_config.clone(),
        Box::new(flotilla_core::render::HeadlessGeometry::lenient(
            flotilla_core::agents::boat::NODE_COUNT,
        )),
    );
    let loaded = sim.load_level(level)?;
    let started = sim.broadcast(MessageBody::Start);
    debug!(seed, boats = started, "Run started");

    for _ in 0..config.ticks {
        sim.step(config.dt);
        if config.stop_when_decided && teams_afloat(&sim) <= 1 {
            break;
        }
    }

    let summary = summarise(&sim, loaded.entities.len());
    info!(
        seed,
        ticks = summary.ticks,
        winner = ?summary.winner,
        digest = summary.digest,
        "Run finished"
    );
    Ok(summary)
}

fn teams_afloat(sim: &Simulation) -> usize {
    let mut teams: Vec<Team> = sim
        .registry()
        .boats()
        .filter(|(_, b)| !b.is_destroyed())
        .map(|(_, b)| b.team())
        .collect();
    teams.sort_unstable();
    teams.dedup();
    teams.len()
}

/// Reduce the world to a summary.
#[must_use]
pub fn summarise(sim: &Simulation, level_entities: usize) -> RunSummary {
    let mut teams: BTreeMap<Team, TeamSummary> = BTreeMap::new();
    for (_, boat) in sim.registry().boats() {
        let tally = teams.entry(boat.team()).or_insert(TeamSummary {
            team: boat.team(),
            boats: 0,
            afloat: 0,
            total_hp: 0.0,
            missiles_fired: 0,
        });
        tally.boats += 1;
        tally.missiles_fired += boat.missiles_fired();
        if !boat.is_destroyed() {
            tally.afloat += 1;
            tally.total_hp += boat.hp();
        }
    }

    let mut afloat = teams.values().filter(|t| t.afloat > 0).map(|t| t.team);
    let winner = match (afloat.next(), afloat.next()) {
        (Some(team), None) => Some(team),
        _ => None,
    };

    RunSummary {
        seed: sim.seed(),
        ticks: sim.tick(),
        elapsed: sim.elapsed(),
        level_entities,
        entities_alive: sim.registry().len(),
        teams: teams.into_values().collect(),
        winner,
        digest: sim.state_digest(),
    }
}
