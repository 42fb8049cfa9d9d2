//! Crate-level tests.
//!
//! - `scenarios.rs`: end-to-end behaviour through the public simulation API
//! - `properties.rs`: proptest invariants over registry, mailbox and steering
//! - `determinism.rs`: same seed, same world
//! - `helpers.rs`: shared setup, also used by unit tests across the crate

pub mod helpers;

mod scenarios;
