//! Markov-chain walkers
//!
//! Two strategies produce trajectories from a transition table:
//! - Stationary: sample the next station straight from the current row
//! - Adaptive (mobile policing): damp the probability of moving toward
//!   reinforced stations, renormalize, then sample
//!
//! Both are first-order: the next station depends only on the current one.
//! The random source is always injected so walks can be replayed from a seed.

use metrosim_core::{MetroError, ReinforcementSet, Result, Trajectory};
use rand::Rng;
use tracing::debug;

use crate::table::TransitionTable;

/// Factor applied to the probability of moving toward a reinforced station
pub const DEFAULT_DAMPING_FACTOR: f64 = 0.5;

/// Damped row sums at or below this are treated as zero
const DEGENERATE_ROW_SUM: f64 = f64::EPSILON;

/// Strategy for walking a transition table
pub trait Walker {
    /// Produce a trajectory of exactly `steps` stations starting at `start`
    fn walk<R: Rng + ?Sized>(
        &self,
        table: &TransitionTable,
        start: &str,
        steps: usize,
        rng: &mut R,
    ) -> Result<Trajectory>;

    /// Get walker name
    fn name(&self) -> &str;
}

/// Samples each step from the raw table row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StationaryWalker;

impl StationaryWalker {
    pub fn new() -> Self {
        StationaryWalker
    }
}

impl Walker for StationaryWalker {
    fn walk<R: Rng + ?Sized>(
        &self,
        table: &TransitionTable,
        start: &str,
        steps: usize,
        rng: &mut R,
    ) -> Result<Trajectory> {
        let mut current = begin(table, start, steps)?;
        let mut stations = Vec::with_capacity(steps);
        stations.push(table.station_at(current).clone());

        for _ in 1..steps {
            // Rows are already stochastic, sample them as-is
            current = sample_index(table.row_at(current), rng);
            stations.push(table.station_at(current).clone());
        }

        debug!(walker = self.name(), start, steps, "Walk complete");
        Ok(Trajectory::new(stations))
    }

    fn name(&self) -> &str {
        "Stationary"
    }
}

/// Suppresses transitions toward reinforced stations before every draw
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveWalker {
    reinforced: ReinforcementSet,
    damping: f64,
}

impl AdaptiveWalker {
    /// Create an adaptive walker with the default damping factor
    pub fn new(reinforced: ReinforcementSet) -> Self {
        AdaptiveWalker {
            reinforced,
            damping: DEFAULT_DAMPING_FACTOR,
        }
    }

    /// Create an adaptive walker with a custom damping factor in `(0, 1]`
    pub fn with_damping(reinforced: ReinforcementSet, damping: f64) -> Result<Self> {
        validate_damping(damping)?;
        Ok(AdaptiveWalker { reinforced, damping })
    }

    pub fn reinforced(&self) -> &ReinforcementSet {
        &self.reinforced
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Damped and renormalized outgoing distribution of `station`, aligned with `table.stations()`
    pub fn adjusted_row(&self, table: &TransitionTable, station: &str) -> Result<Vec<f64>> {
        let idx = table.index_of(station)?;
        let mask = self.mask(table);
        self.adjust(table, idx, &mask, 0)
    }

    /// Which columns of `table` are reinforced; stations outside the table are ignored
    fn mask(&self, table: &TransitionTable) -> Vec<bool> {
        table
            .stations()
            .iter()
            .map(|s| self.reinforced.contains(s.as_str()))
            .collect()
    }

    fn adjust(&self, table: &TransitionTable, idx: usize, mask: &[bool], step: usize) -> Result<Vec<f64>> {
        // Private copy: the shared table is never touched
        let mut row = table.row_at(idx).to_vec();
        for (p, &damped) in row.iter_mut().zip(mask) {
            if damped {
                *p *= self.damping;
            }
        }

        let sum: f64 = row.iter().sum();
        if sum <= DEGENERATE_ROW_SUM {
            return Err(MetroError::DegenerateDistribution {
                station: table.station_at(idx).to_string(),
                step,
            });
        }

        for p in &mut row {
            *p /= sum;
        }
        Ok(row)
    }
}

impl Walker for AdaptiveWalker {
    fn walk<R: Rng + ?Sized>(
        &self,
        table: &TransitionTable,
        start: &str,
        steps: usize,
        rng: &mut R,
    ) -> Result<Trajectory> {
        let mut current = begin(table, start, steps)?;
        let mask = self.mask(table);
        let mut stations = Vec::with_capacity(steps);
        stations.push(table.station_at(current).clone());

        for step in 1..steps {
            let row = self.adjust(table, current, &mask, step)?;
            current = sample_index(&row, rng);
            stations.push(table.station_at(current).clone());
        }

        debug!(
            walker = self.name(),
            start,
            steps,
            reinforced = self.reinforced.len(),
            damping = self.damping,
            "Walk complete"
        );
        Ok(Trajectory::new(stations))
    }

    fn name(&self) -> &str {
        "Adaptive"
    }
}

/// Walker selected for a scenario
#[derive(Debug, Clone, PartialEq)]
pub enum WalkerVariant {
    Stationary(StationaryWalker),
    Adaptive(AdaptiveWalker),
}

impl WalkerVariant {
    /// Reinforced stations, for the adaptive variant only
    pub fn reinforced(&self) -> Option<&ReinforcementSet> {
        match self {
            WalkerVariant::Stationary(_) => None,
            WalkerVariant::Adaptive(walker) => Some(walker.reinforced()),
        }
    }
}

impl Walker for WalkerVariant {
    fn walk<R: Rng + ?Sized>(
        &self,
        table: &TransitionTable,
        start: &str,
        steps: usize,
        rng: &mut R,
    ) -> Result<Trajectory> {
        match self {
            WalkerVariant::Stationary(walker) => walker.walk(table, start, steps, rng),
            WalkerVariant::Adaptive(walker) => walker.walk(table, start, steps, rng),
        }
    }

    fn name(&self) -> &str {
        match self {
            WalkerVariant::Stationary(walker) => walker.name(),
            WalkerVariant::Adaptive(walker) => walker.name(),
        }
    }
}

/// Walk `table` without intervention
pub fn simulate<R: Rng + ?Sized>(
    table: &TransitionTable,
    start: &str,
    steps: usize,
    rng: &mut R,
) -> Result<Trajectory> {
    StationaryWalker.walk(table, start, steps, rng)
}

/// Walk `table` under mobile reinforcement with the default damping factor
pub fn simulate_mobile<R: Rng + ?Sized>(
    table: &TransitionTable,
    start: &str,
    steps: usize,
    reinforced: &ReinforcementSet,
    rng: &mut R,
) -> Result<Trajectory> {
    AdaptiveWalker::new(reinforced.clone()).walk(table, start, steps, rng)
}

pub(crate) fn validate_damping(damping: f64) -> Result<()> {
    if damping.is_finite() && damping > 0.0 && damping <= 1.0 {
        Ok(())
    } else {
        Err(MetroError::config(format!(
            "damping factor must be in (0, 1], got {}",
            damping
        )))
    }
}

/// Validate step count and resolve the start station
fn begin(table: &TransitionTable, start: &str, steps: usize) -> Result<usize> {
    if steps < 1 {
        return Err(MetroError::InvalidStepCount(steps));
    }
    table
        .index_of(start)
        .map_err(|_| MetroError::unknown_station(start, "start station not in transition table"))
}

/// Cumulative-probability draw over `weights`
///
/// Falls back to the last positive weight when rounding leaves the draw
/// above the accumulated total.
fn sample_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    let draw: f64 = rng.gen_range(0.0..1.0);
    let mut cumulative = 0.0;
    let mut last_positive = 0;

    for (idx, &p) in weights.iter().enumerate() {
        if p <= 0.0 {
            continue;
        }
        cumulative += p;
        last_positive = idx;
        if draw < cumulative {
            return idx;
        }
    }

    last_positive
}
