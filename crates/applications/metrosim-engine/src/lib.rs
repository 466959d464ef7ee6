//! metrosim Simulation Engine
//!
//! Discrete-time Markov-chain simulator for crime incidents across Metro
//! stations under three policing policies (base, fixed reinforcement,
//! mobile reinforcement).

pub mod table;
pub mod cache;
pub mod walker;
pub mod config;
pub mod scenario;
pub mod summary;
pub mod export;

pub use cache::TableCache;
pub use config::ScenarioConfig;
pub use scenario::{Scenario, ScenarioSelector};
pub use summary::summarize;
pub use table::TransitionTable;
pub use walker::{
    simulate, simulate_mobile, AdaptiveWalker, StationaryWalker, Walker, WalkerVariant,
    DEFAULT_DAMPING_FACTOR,
};
