//! Headless Flotilla runner.
//!
//! Runs levels without graphics and reports what happened as JSON. The
//! binary in `main.rs` is a thin clap front end over [`runner`] and [`batch`].
//!
//! ```
//! use flotilla_core::{LevelDesc, SimConfig};
//! use flotilla_headless::runner::{run_level, RunConfig};
//!
//! let level = LevelDesc::from_json_str(flotilla_headless::SKIRMISH).unwrap();
//! let summary = run_level(&level, &SimConfig::default(), 42, &RunConfig::default().with_ticks(60)).unwrap();
//! assert_eq!(summary.seed, 42);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod runner;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use runner::{run_level, RunConfig, RunSummary};

/// The bundled two-team skirmish level.
pub const SKIRMISH: &str = include_str!("../levels/skirmish.json");

#[cfg(test)]
mod tests {
    use flotilla_core::LevelDesc;

    /// Parsed bundled level.
    pub fn skirmish() -> LevelDesc {
        LevelDesc::from_json_str(super::SKIRMISH).unwrap()
    }

    #[test]
    fn bundled_level_parses() {
        let level = skirmish();
        assert_eq!(level.templates.len(), 10);
        assert!(level.entities.iter().any(|e| e.name == "Sly"));
    }
}
