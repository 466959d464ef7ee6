//! metrosim Core - Shared types and errors
//!
//! This crate defines the vocabulary used across:
//! - metrosim-engine (transition tables, walkers, scenario selection)
//! - the `metrosim` CLI
//!
//! Key types:
//! - Station, Trajectory, VisitFrequency
//! - CrimeCategory, Policy and the six ScenarioKeys
//! - ReinforcementSet (anticipatory-patrol targets)
//! - MetroError

pub mod types;
pub mod error;

pub use types::*;
pub use error::*;
