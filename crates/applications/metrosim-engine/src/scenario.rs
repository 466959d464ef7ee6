//! Scenario selection
//!
//! Maps a (crime category, policy) pair onto the transition table and walker
//! that model it:
//!
//! | Policy               | Table                  | Walker                          |
//! |----------------------|------------------------|---------------------------------|
//! | Base                 | category base matrix   | Stationary                      |
//! | FixedReinforcement   | category fixed matrix  | Stationary                      |
//! | MobileReinforcement  | category mobile matrix | Adaptive (category station set) |

use std::path::PathBuf;
use std::sync::Arc;

use metrosim_core::{MetroError, Policy, ReinforcementSet, Result, ScenarioKey, Trajectory};
use rand::Rng;
use tracing::{info, warn};

use crate::cache::TableCache;
use crate::config::ScenarioConfig;
use crate::table::TransitionTable;
use crate::walker::{AdaptiveWalker, StationaryWalker, Walker, WalkerVariant};

/// A ready-to-run scenario: shared table plus the walker for its policy
#[derive(Debug, Clone)]
pub struct Scenario {
    key: ScenarioKey,
    source: PathBuf,
    table: Arc<TransitionTable>,
    walker: WalkerVariant,
}

impl Scenario {
    pub fn key(&self) -> ScenarioKey {
        self.key
    }

    /// File the table was loaded from
    pub fn source(&self) -> &PathBuf {
        &self.source
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub fn walker(&self) -> &WalkerVariant {
        &self.walker
    }

    /// Reinforced stations (mobile policy only)
    pub fn reinforced(&self) -> Option<&ReinforcementSet> {
        self.walker.reinforced()
    }

    /// Walk this scenario's table from `start`
    pub fn run<R: Rng + ?Sized>(&self, start: &str, steps: usize, rng: &mut R) -> Result<Trajectory> {
        self.walker.walk(&self.table, start, steps, rng)
    }
}

/// Builds scenarios from configuration, loading tables through a cache
#[derive(Debug, Clone)]
pub struct ScenarioSelector<'c> {
    config: ScenarioConfig,
    cache: &'c TableCache,
}

impl ScenarioSelector<'static> {
    /// Selector backed by the process-wide table cache
    pub fn new(config: ScenarioConfig) -> Result<Self> {
        Self::with_cache(config, TableCache::global())
    }
}

impl<'c> ScenarioSelector<'c> {
    /// Selector backed by a caller-owned table cache
    pub fn with_cache(config: ScenarioConfig, cache: &'c TableCache) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, cache })
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Walker for `key`'s policy, without loading its table
    pub fn walker_for(&self, key: ScenarioKey) -> Result<WalkerVariant> {
        match key.policy {
            Policy::Base | Policy::FixedReinforcement => Ok(WalkerVariant::Stationary(StationaryWalker::new())),
            Policy::MobileReinforcement => {
                let reinforced = self.config.reinforced.for_category(key.category).clone();
                if reinforced.is_empty() {
                    return Err(MetroError::config(format!(
                        "scenario {} has no reinforced stations",
                        key
                    )));
                }
                Ok(WalkerVariant::Adaptive(AdaptiveWalker::with_damping(
                    reinforced,
                    self.config.damping_factor,
                )?))
            }
        }
    }

    /// Resolve `key` to its table and walker
    pub fn select(&self, key: ScenarioKey) -> Result<Scenario> {
        let source = self.config.matrix_path(key)?;
        let table = self.cache.load(&source)?;
        let walker = self.walker_for(key)?;

        if let Some(reinforced) = walker.reinforced() {
            let unknown: Vec<&str> = reinforced
                .iter()
                .filter(|s| !table.contains(s.as_str()))
                .map(|s| s.as_str())
                .collect();
            if !unknown.is_empty() {
                warn!(scenario = %key, ?unknown, "Reinforced stations missing from table are ignored");
            }
        }

        info!(
            scenario = %key,
            source = %source.display(),
            stations = table.len(),
            walker = walker.name(),
            "Scenario selected"
        );

        Ok(Scenario {
            key,
            source,
            table,
            walker,
        })
    }

    /// Resolve raw category and policy names
    pub fn select_named(&self, category: &str, policy: &str) -> Result<Scenario> {
        self.select(ScenarioKey::parse(category, policy)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrosim_core::CrimeCategory;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sample_config() -> ScenarioConfig {
        ScenarioConfig::with_data_dir(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data"))
    }

    #[test]
    fn test_all_six_scenarios_resolve() {
        let cache = TableCache::new();
        let selector = ScenarioSelector::with_cache(sample_config(), &cache).unwrap();

        for key in ScenarioKey::all() {
            let scenario = selector.select(key).unwrap();
            assert_eq!(scenario.key(), key);
            assert!(!scenario.table().is_empty());

            match key.policy {
                Policy::MobileReinforcement => {
                    assert_eq!(scenario.walker().name(), "Adaptive");
                    assert!(!scenario.reinforced().unwrap().is_empty());
                }
                _ => {
                    assert_eq!(scenario.walker().name(), "Stationary");
                    assert!(scenario.reinforced().is_none());
                }
            }
        }

        assert_eq!(cache.len(), 6);
    }

    #[test]
    fn test_reinforcement_is_category_specific() {
        let cache = TableCache::new();
        let selector = ScenarioSelector::with_cache(sample_config(), &cache).unwrap();

        let violent = selector.select_named("with_violence", "mobile_reinforcement").unwrap();
        let non_violent = selector.select_named("without-violence", "mobile").unwrap();

        let violent_set = violent.reinforced().unwrap();
        let non_violent_set = non_violent.reinforced().unwrap();
        assert!(violent_set.contains("Pantitlán"));
        assert!(non_violent_set.contains("Hidalgo"));
        assert!(violent_set.is_disjoint(non_violent_set));
    }

    #[test]
    fn test_reselecting_reuses_cached_table() {
        let cache = TableCache::new();
        let selector = ScenarioSelector::with_cache(sample_config(), &cache).unwrap();
        let key = ScenarioKey::new(CrimeCategory::WithViolence, Policy::Base);

        let first = selector.select(key).unwrap();
        let second = selector.select(key).unwrap();
        assert!(Arc::ptr_eq(&first.table, &second.table));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_walker_for_matches_selected_walker() {
        let cache = TableCache::new();
        let selector = ScenarioSelector::with_cache(sample_config(), &cache).unwrap();

        for key in ScenarioKey::all() {
            let walker = selector.walker_for(key).unwrap();
            assert_eq!(&walker, selector.select(key).unwrap().walker());
        }

        // No table needed to name the walker
        let offline = ScenarioSelector::with_cache(ScenarioConfig::with_data_dir("/no/such/metro/data"), &cache)
            .unwrap();
        let key = ScenarioKey::new(CrimeCategory::WithViolence, Policy::MobileReinforcement);
        assert_eq!(offline.walker_for(key).unwrap().name(), "Adaptive");
    }

    #[test]
    fn test_unknown_scenario_names() {
        let cache = TableCache::new();
        let selector = ScenarioSelector::with_cache(sample_config(), &cache).unwrap();

        assert!(matches!(
            selector.select_named("with_violence", "martial_law"),
            Err(MetroError::UnknownScenario { .. })
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let mut config = sample_config();
        config.damping_factor = 2.0;

        let cache = TableCache::new();
        assert!(matches!(
            ScenarioSelector::with_cache(config, &cache),
            Err(MetroError::Config(_))
        ));
    }

    #[test]
    fn test_missing_matrix_file() {
        let cache = TableCache::new();
        let selector =
            ScenarioSelector::with_cache(ScenarioConfig::with_data_dir("/no/such/metro/data"), &cache).unwrap();

        let key = ScenarioKey::new(CrimeCategory::WithoutViolence, Policy::Base);
        assert!(matches!(selector.select(key), Err(MetroError::Io { .. })));
    }

    #[test]
    fn test_run_scenario() {
        let cache = TableCache::new();
        let selector = ScenarioSelector::with_cache(sample_config(), &cache).unwrap();
        let scenario = selector.select_named("with_violence", "mobile").unwrap();
        let start = scenario.table().stations()[0].clone();

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let trajectory = scenario.run(start.as_str(), 25, &mut rng).unwrap();

        assert_eq!(trajectory.len(), 25);
        assert_eq!(trajectory.start(), Some(&start));
    }

    #[test]
    fn test_global_selector() {
        let selector = ScenarioSelector::new(sample_config()).unwrap();
        let scenario = selector
            .select(ScenarioKey::new(CrimeCategory::WithoutViolence, Policy::FixedReinforcement))
            .unwrap();
        assert!(scenario.source().ends_with("without_violence_fixed_reinforcement.csv"));
    }
}
