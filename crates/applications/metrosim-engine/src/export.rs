//! Tabular and JSON output of simulation results
//!
//! - Trajectory CSV: `step,station`, steps numbered from 1
//! - Frequency CSV: `station,visits`, first-occurrence order
//! - JSON report: everything needed to reproduce and chart a run

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use metrosim_core::{MetroError, Result, ScenarioKey, Trajectory, VisitFrequency};
use serde::{Deserialize, Serialize};

use crate::summary::summarize;

/// Result of one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub scenario: ScenarioKey,
    pub walker: String,
    pub start: String,
    pub steps: usize,
    pub seed: u64,
    pub trajectory: Trajectory,
    pub frequencies: VisitFrequency,
    pub generated_at: DateTime<Utc>,
}

impl SimulationReport {
    /// Build a report, summarizing the trajectory
    pub fn new(scenario: ScenarioKey, walker: &str, seed: u64, trajectory: Trajectory) -> Self {
        let frequencies = summarize(&trajectory);
        Self {
            scenario,
            walker: walker.to_string(),
            start: trajectory.start().map(|s| s.to_string()).unwrap_or_default(),
            steps: trajectory.len(),
            seed,
            trajectory,
            frequencies,
            generated_at: Utc::now(),
        }
    }

    /// Write the report as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| MetroError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(|e| MetroError::io(path, e))
    }
}

/// Write `step,station` rows
pub fn write_trajectory_csv<W: Write>(trajectory: &Trajectory, mut writer: W) -> std::io::Result<()> {
    writeln!(writer, "step,station")?;
    for (step, station) in trajectory.steps() {
        writeln!(writer, "{},{}", step, csv_field(station.as_str()))?;
    }
    writer.flush()
}

/// Write `station,visits` rows
pub fn write_frequency_csv<W: Write>(frequency: &VisitFrequency, mut writer: W) -> std::io::Result<()> {
    writeln!(writer, "station,visits")?;
    for entry in frequency.entries() {
        writeln!(writer, "{},{}", csv_field(entry.station.as_str()), entry.visits)?;
    }
    writer.flush()
}

/// Save the trajectory CSV to `path`
pub fn save_trajectory_csv(trajectory: &Trajectory, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| MetroError::io(path, e))?;
    write_trajectory_csv(trajectory, BufWriter::new(file)).map_err(|e| MetroError::io(path, e))
}

/// Save the frequency CSV to `path`
pub fn save_frequency_csv(frequency: &VisitFrequency, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| MetroError::io(path, e))?;
    write_frequency_csv(frequency, BufWriter::new(file)).map_err(|e| MetroError::io(path, e))
}

/// Quote a field when it contains a delimiter, quote or line break
pub(crate) fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrosim_core::{CrimeCategory, Policy, Station};

    fn trajectory(names: &[&str]) -> Trajectory {
        Trajectory::new(names.iter().map(|&n| Station::from(n)).collect())
    }

    #[test]
    fn test_trajectory_csv_shape() {
        let mut out = Vec::new();
        write_trajectory_csv(&trajectory(&["Pantitlán", "Hidalgo", "Hidalgo"]), &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "step,station\n1,Pantitlán\n2,Hidalgo\n3,Hidalgo\n"
        );
    }

    #[test]
    fn test_frequency_csv_shape() {
        let frequency = summarize(&trajectory(&["B", "A", "B"]));
        let mut out = Vec::new();
        write_frequency_csv(&frequency, &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "station,visits\nB,2\nA,1\n");
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("Hidalgo"), "Hidalgo");
        assert_eq!(csv_field("Metro, Line 1"), "\"Metro, Line 1\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_report_contents_and_save() {
        let key = ScenarioKey::new(CrimeCategory::WithViolence, Policy::Base);
        let report = SimulationReport::new(key, "Stationary", 42, trajectory(&["A", "B", "A"]));

        assert_eq!(report.start, "A");
        assert_eq!(report.steps, 3);
        assert_eq!(report.frequencies.count("A"), 2);

        let dir = std::env::temp_dir().join(format!("metrosim-export-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.json");
        report.save(&path).unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["scenario"]["category"], "with_violence");
        assert_eq!(json["scenario"]["policy"], "base");
        assert_eq!(json["seed"], 42);
        assert_eq!(json["trajectory"][1], "B");
        assert_eq!(json["frequencies"][0]["visits"], 2);

        let back: SimulationReport = serde_json::from_value(json).unwrap();
        assert_eq!(back.trajectory, report.trajectory);
    }

    #[test]
    fn test_save_csv_files() {
        let dir = std::env::temp_dir().join(format!("metrosim-csv-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let t = trajectory(&["A", "C"]);

        save_trajectory_csv(&t, dir.join("trajectory.csv")).unwrap();
        save_frequency_csv(&summarize(&t), dir.join("frequency.csv")).unwrap();

        let text = std::fs::read_to_string(dir.join("trajectory.csv")).unwrap();
        assert_eq!(text.lines().nth(2), Some("2,C"));
        assert!(save_trajectory_csv(&t, "/no/such/dir/t.csv").is_err());
    }
}
