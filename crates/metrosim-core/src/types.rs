//! Core types shared across metrosim components

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap};

use crate::error::{MetroError, Result};

/// A Metro station, identified by its label in the transition tables
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Station(pub String);

impl Station {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Station {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for Station {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Station {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Crime category the transition matrices were estimated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrimeCategory {
    WithViolence,
    WithoutViolence,
}

impl CrimeCategory {
    pub const ALL: [CrimeCategory; 2] = [CrimeCategory::WithViolence, CrimeCategory::WithoutViolence];

    pub fn as_str(&self) -> &'static str {
        match self {
            CrimeCategory::WithViolence => "with_violence",
            CrimeCategory::WithoutViolence => "without_violence",
        }
    }

    /// Parse a category name; accepts snake_case or kebab-case
    pub fn parse(name: &str) -> Option<Self> {
        match normalize(name).as_str() {
            "with_violence" | "violent" => Some(CrimeCategory::WithViolence),
            "without_violence" | "non_violent" | "nonviolent" => Some(CrimeCategory::WithoutViolence),
            _ => None,
        }
    }
}

impl std::fmt::Display for CrimeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Policing policy applied during a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// No intervention
    Base,
    /// Permanent patrols at high-risk stations (separately estimated matrix)
    FixedReinforcement,
    /// Anticipatory patrols: damp transitions toward risk stations every step
    MobileReinforcement,
}

impl Policy {
    pub const ALL: [Policy; 3] = [
        Policy::Base,
        Policy::FixedReinforcement,
        Policy::MobileReinforcement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Base => "base",
            Policy::FixedReinforcement => "fixed_reinforcement",
            Policy::MobileReinforcement => "mobile_reinforcement",
        }
    }

    /// Parse a policy name; accepts snake_case, kebab-case, or the short forms `fixed`/`mobile`
    pub fn parse(name: &str) -> Option<Self> {
        match normalize(name).as_str() {
            "base" => Some(Policy::Base),
            "fixed_reinforcement" | "fixed" => Some(Policy::FixedReinforcement),
            "mobile_reinforcement" | "mobile" => Some(Policy::MobileReinforcement),
            _ => None,
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('-', "_")
}

/// One of the six (category, policy) scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScenarioKey {
    pub category: CrimeCategory,
    pub policy: Policy,
}

impl ScenarioKey {
    pub fn new(category: CrimeCategory, policy: Policy) -> Self {
        Self { category, policy }
    }

    /// Parse a scenario from raw names, failing on anything outside the six combinations
    pub fn parse(category: &str, policy: &str) -> Result<Self> {
        match (CrimeCategory::parse(category), Policy::parse(policy)) {
            (Some(category), Some(policy)) => Ok(Self { category, policy }),
            _ => Err(MetroError::UnknownScenario {
                category: category.to_string(),
                policy: policy.to_string(),
            }),
        }
    }

    /// All six scenarios, category-major
    pub fn all() -> impl Iterator<Item = ScenarioKey> {
        CrimeCategory::ALL
            .into_iter()
            .flat_map(|category| Policy::ALL.into_iter().map(move |policy| ScenarioKey { category, policy }))
    }
}

impl std::fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category, self.policy)
    }
}

/// Stations targeted by anticipatory patrols
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReinforcementSet(BTreeSet<Station>);

impl ReinforcementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, station: &str) -> bool {
        self.0.contains(station)
    }

    pub fn insert(&mut self, station: Station) -> bool {
        self.0.insert(station)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.0.iter()
    }

    pub fn is_disjoint(&self, other: &ReinforcementSet) -> bool {
        self.0.is_disjoint(&other.0)
    }
}

impl<S: Into<String>> FromIterator<S> for ReinforcementSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Station::new).collect())
    }
}

/// One realized sample path of the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trajectory(Vec<Station>);

impl Trajectory {
    pub fn new(stations: Vec<Station>) -> Self {
        Self(stations)
    }

    /// Station the walk started from
    pub fn start(&self) -> Option<&Station> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn stations(&self) -> &[Station] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.0.iter()
    }

    /// `(step, station)` pairs with steps numbered from 1, the tabular export shape
    pub fn steps(&self) -> impl Iterator<Item = (usize, &Station)> {
        self.0.iter().enumerate().map(|(idx, station)| (idx + 1, station))
    }

    pub fn into_inner(self) -> Vec<Station> {
        self.0
    }
}

/// Visit count for a single station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationVisits {
    pub station: Station,
    pub visits: usize,
}

/// Visit counts per station, kept in first-occurrence order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<StationVisits>", into = "Vec<StationVisits>")]
pub struct VisitFrequency {
    entries: Vec<StationVisits>,
    index: HashMap<Station, usize>,
}

impl VisitFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one visit to `station`
    pub fn record(&mut self, station: &Station) {
        match self.index.get(station.as_str()) {
            Some(&idx) => self.entries[idx].visits += 1,
            None => {
                self.index.insert(station.clone(), self.entries.len());
                self.entries.push(StationVisits {
                    station: station.clone(),
                    visits: 1,
                });
            }
        }
    }

    pub fn count(&self, station: &str) -> usize {
        self.index
            .get(station)
            .map(|&idx| self.entries[idx].visits)
            .unwrap_or(0)
    }

    /// Total number of visits (equals the trajectory length)
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.visits).sum()
    }

    /// Number of distinct stations visited
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-occurrence order
    pub fn entries(&self) -> &[StationVisits] {
        &self.entries
    }

    /// Most visited station; ties go to the station seen first
    pub fn most_visited(&self) -> Option<&StationVisits> {
        self.entries
            .iter()
            .fold(None, |best: Option<&StationVisits>, entry| match best {
                Some(b) if b.visits >= entry.visits => Some(b),
                _ => Some(entry),
            })
    }

    /// Entries by descending visit count, first-occurrence order among ties
    pub fn sorted_by_count(&self) -> Vec<&StationVisits> {
        let mut sorted: Vec<&StationVisits> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.visits.cmp(&a.visits));
        sorted
    }
}

impl From<Vec<StationVisits>> for VisitFrequency {
    fn from(entries: Vec<StationVisits>) -> Self {
        let mut frequency = VisitFrequency::new();
        for entry in entries {
            match frequency.index.get(entry.station.as_str()) {
                Some(&idx) => frequency.entries[idx].visits += entry.visits,
                None => {
                    frequency.index.insert(entry.station.clone(), frequency.entries.len());
                    frequency.entries.push(entry);
                }
            }
        }
        frequency
    }
}

impl From<VisitFrequency> for Vec<StationVisits> {
    fn from(frequency: VisitFrequency) -> Self {
        frequency.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_key_parsing() {
        let key = ScenarioKey::parse("with-violence", "mobile").unwrap();
        assert_eq!(key.category, CrimeCategory::WithViolence);
        assert_eq!(key.policy, Policy::MobileReinforcement);

        let key = ScenarioKey::parse("WITHOUT_VIOLENCE", "fixed_reinforcement").unwrap();
        assert_eq!(key, ScenarioKey::new(CrimeCategory::WithoutViolence, Policy::FixedReinforcement));
    }

    #[test]
    fn test_unknown_scenario_rejected() {
        let err = ScenarioKey::parse("arson", "base").unwrap_err();
        assert!(matches!(err, MetroError::UnknownScenario { ref category, .. } if category == "arson"));

        let err = ScenarioKey::parse("with_violence", "curfew").unwrap_err();
        assert!(matches!(err, MetroError::UnknownScenario { ref policy, .. } if policy == "curfew"));
    }

    #[test]
    fn test_all_scenarios() {
        let all: Vec<ScenarioKey> = ScenarioKey::all().collect();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0].to_string(), "with_violence/base");
        assert_eq!(all[5].to_string(), "without_violence/mobile_reinforcement");
    }

    #[test]
    fn test_visit_frequency_first_occurrence_order() {
        let mut frequency = VisitFrequency::new();
        for name in ["B", "A", "B", "C", "A", "B"] {
            frequency.record(&Station::from(name));
        }

        let order: Vec<&str> = frequency.entries().iter().map(|e| e.station.as_str()).collect();
        assert_eq!(order, vec!["B", "A", "C"]);
        assert_eq!(frequency.count("B"), 3);
        assert_eq!(frequency.count("Z"), 0);
        assert_eq!(frequency.total(), 6);
        assert_eq!(frequency.most_visited().unwrap().station.as_str(), "B");
    }

    #[test]
    fn test_sorted_by_count_is_stable() {
        let mut frequency = VisitFrequency::new();
        for name in ["C", "A", "B", "A", "B"] {
            frequency.record(&Station::from(name));
        }

        let sorted: Vec<&str> = frequency.sorted_by_count().iter().map(|e| e.station.as_str()).collect();
        assert_eq!(sorted, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_visit_frequency_json_shape() {
        let mut frequency = VisitFrequency::new();
        frequency.record(&Station::from("Hidalgo"));
        frequency.record(&Station::from("Hidalgo"));

        let json = serde_json::to_string(&frequency).unwrap();
        assert_eq!(json, r#"[{"station":"Hidalgo","visits":2}]"#);

        let back: VisitFrequency = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frequency);
    }

    #[test]
    fn test_trajectory_steps_start_at_one() {
        let trajectory = Trajectory::new(vec![Station::from("A"), Station::from("B")]);
        let steps: Vec<(usize, &str)> = trajectory.steps().map(|(i, s)| (i, s.as_str())).collect();
        assert_eq!(steps, vec![(1, "A"), (2, "B")]);
        assert_eq!(trajectory.start().unwrap().as_str(), "A");
    }
}
