//! Scenario configuration
//!
//! Where the six matrix files live, which stations each crime category
//! reinforces under mobile policing, and the damping factor. The shipped
//! defaults point at the sample data under `data/`; a JSON file can override
//! any field. `metrosim.json` next to this crate's manifest spells the
//! defaults out in full.

use std::fs;
use std::path::{Path, PathBuf};

use metrosim_core::{CrimeCategory, MetroError, Policy, ReinforcementSet, Result, ScenarioKey};
use serde::{Deserialize, Serialize};

use crate::walker::{validate_damping, DEFAULT_DAMPING_FACTOR};

/// Matrix file for one scenario, relative to `data_dir` unless absolute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixFile {
    pub category: CrimeCategory,
    pub policy: Policy,
    pub file: PathBuf,
}

/// Anticipatory-patrol station lists per crime category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinforcementConfig {
    pub with_violence: ReinforcementSet,
    pub without_violence: ReinforcementSet,
}

impl ReinforcementConfig {
    pub fn for_category(&self, category: CrimeCategory) -> &ReinforcementSet {
        match category {
            CrimeCategory::WithViolence => &self.with_violence,
            CrimeCategory::WithoutViolence => &self.without_violence,
        }
    }
}

impl Default for ReinforcementConfig {
    fn default() -> Self {
        Self {
            with_violence: ["Pantitlán", "Indios Verdes", "Tacubaya"].into_iter().collect(),
            without_violence: ["Hidalgo", "Pino Suárez", "Balderas"].into_iter().collect(),
        }
    }
}

/// Configuration for scenario selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Directory relative matrix paths are resolved against
    pub data_dir: PathBuf,

    /// Damping applied to reinforced destinations under mobile policing
    pub damping_factor: f64,

    pub reinforced: ReinforcementConfig,

    pub matrices: Vec<MatrixFile>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let matrices = ScenarioKey::all()
            .map(|key| MatrixFile {
                category: key.category,
                policy: key.policy,
                file: PathBuf::from(format!("{}_{}.csv", key.category, key.policy)),
            })
            .collect();

        Self {
            data_dir: PathBuf::from("data"),
            damping_factor: DEFAULT_DAMPING_FACTOR,
            reinforced: ReinforcementConfig::default(),
            matrices,
        }
    }
}

impl ScenarioConfig {
    /// Default layout rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Read a JSON config file and validate it
    ///
    /// A relative `data_dir` is resolved against the config file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| MetroError::io(path, e))?;
        let mut config: ScenarioConfig = serde_json::from_str(&text)?;
        if config.data_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.data_dir = parent.join(&config.data_dir);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Check the damping factor, the reinforcement lists and the matrix list
    pub fn validate(&self) -> Result<()> {
        validate_damping(self.damping_factor)?;

        if !self.reinforced.with_violence.is_disjoint(&self.reinforced.without_violence) {
            return Err(MetroError::config(
                "reinforced station lists for the two crime categories must be disjoint",
            ));
        }

        for category in CrimeCategory::ALL {
            if self.reinforced.for_category(category).is_empty() {
                return Err(MetroError::config(format!(
                    "mobile reinforcement for {} needs at least one reinforced station",
                    category
                )));
            }
        }

        for key in ScenarioKey::all() {
            let count = self
                .matrices
                .iter()
                .filter(|m| m.category == key.category && m.policy == key.policy)
                .count();
            match count {
                1 => {}
                0 => return Err(MetroError::config(format!("no matrix file for scenario {}", key))),
                _ => return Err(MetroError::config(format!("several matrix files for scenario {}", key))),
            }
        }

        Ok(())
    }

    /// Resolved path of the matrix file for `key`
    pub fn matrix_path(&self, key: ScenarioKey) -> Result<PathBuf> {
        let entry = self
            .matrices
            .iter()
            .find(|m| m.category == key.category && m.policy == key.policy)
            .ok_or_else(|| MetroError::UnknownScenario {
                category: key.category.to_string(),
                policy: key.policy.to_string(),
            })?;

        Ok(if entry.file.is_absolute() {
            entry.file.clone()
        } else {
            self.data_dir.join(&entry.file)
        })
    }
}
