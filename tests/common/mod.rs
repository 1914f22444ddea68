//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use appliance_loadgen::config::{
    ApplianceConfig, DayScheduleConfig, ScenarioConfig, ScheduleConfig, SimulationConfig,
};
use appliance_loadgen::pattern::PatternStore;
use tempfile::TempDir;

/// Two dishwasher-like recordings at the 7 s native timestep.
pub const DISHWASHER_PATTERNS: &str = r#"{
    "time_warping_patterns": [
        {
            "power_sequence": [5.0, 1900.0, 2000.0, 1950.0, 120.0, 80.0, 2100.0, 1800.0, 10.0],
            "total_duration_seconds": 7200.0,
            "statistical_features": {"max_power": 2100.0}
        },
        {
            "power_sequence": [0.0, 1700.0, 1750.0, 60.0, 1800.0, 1600.0, 0.0],
            "total_duration_seconds": 6300.0,
            "statistical_features": {"max_power": 1800.0}
        }
    ]
}"#;

/// A single kettle-like recording without metadata.
pub const KETTLE_PATTERNS: &str = r#"{
    "time_warping_patterns": [
        {"power_sequence": [0.0, 2400.0, 2450.0, 2400.0, 0.0]}
    ]
}"#;

/// Creates `<tmp>/<dir>/patterns.json` with `body`.
pub fn write_library(base: &Path, dir: &str, body: &str) {
    let sub = base.join(dir);
    fs::create_dir_all(&sub).unwrap_or_else(|e| panic!("create {dir}: {e}"));
    fs::write(sub.join("patterns.json"), body).unwrap_or_else(|e| panic!("write {dir}: {e}"));
}

/// Temporary patterns directory holding `dishwasher_patterns` and
/// `kettle_patterns`.
pub fn pattern_fixture() -> (TempDir, PatternStore) {
    let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    write_library(tmp.path(), "dishwasher_patterns", DISHWASHER_PATTERNS);
    write_library(tmp.path(), "kettle_patterns", KETTLE_PATTERNS);
    let store = PatternStore::new(tmp.path());
    (tmp, store)
}

pub fn hours(pairs: &[(&str, f64)]) -> Option<DayScheduleConfig> {
    Some(DayScheduleConfig {
        hour_probabilities: Some(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        ),
    })
}

/// Dishwasher: 7 per week, 5 weekday evenings (18-22), 2 weekend middays (10-14).
pub fn dishwasher() -> ApplianceConfig {
    ApplianceConfig {
        nominal_power: Some(1800.0),
        duration_min: Some(120.0),
        generation_method: Some("scaling".to_string()),
        schedule: Some(ScheduleConfig {
            activations_per_week: Some(7),
            weekday_activations: Some(5),
            weekend_activations: Some(2),
            weekday: hours(&[("18-22", 1.0)]),
            weekend: hours(&[("10-14", 1.0)]),
        }),
        ..ApplianceConfig::default()
    }
}

/// Kettle on the legacy daily count.
pub fn kettle(per_day: u32) -> ApplianceConfig {
    ApplianceConfig {
        nominal_power: Some(2400.0),
        duration_min: Some(5.0),
        activations_per_day: Some(per_day),
        ..ApplianceConfig::default()
    }
}

/// Two-week scenario (Mon 2024-07-01 to Mon 2024-07-15) with the given appliances.
pub fn two_week_scenario(appliances: &[(&str, ApplianceConfig)]) -> ScenarioConfig {
    ScenarioConfig {
        simulation: SimulationConfig {
            start_time: "2024-07-01 00:00:00".to_string(),
            stop_time: "2024-07-15 00:00:00".to_string(),
            seed: 42,
            patterns_dir: "unused".to_string(),
        },
        appliances: appliances
            .iter()
            .map(|(name, cfg)| ((*name).to_string(), cfg.clone()))
            .collect(),
        appliance_patterns: BTreeMap::new(),
    }
}
