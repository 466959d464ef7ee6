//! Trajectory summaries

use metrosim_core::{Trajectory, VisitFrequency};

/// Count visits per station, in first-occurrence order
pub fn summarize(trajectory: &Trajectory) -> VisitFrequency {
    let mut frequency = VisitFrequency::new();
    for station in trajectory.iter() {
        frequency.record(station);
    }
    frequency
}
