//! TOML-based scenario configuration, appliance overrides and presets.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::appliance::ApplianceTemplate;
use crate::error::ValidationError;
use crate::sim::window::SimWindow;

/// Top-level scenario configuration parsed from TOML.
///
/// `appliances` holds the base templates; `appliance_patterns` holds
/// per-scenario overrides that are deep-merged on top of them. Every name in
/// either table is generated.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation window and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Base appliance templates.
    #[serde(default)]
    pub appliances: BTreeMap<String, ApplianceConfig>,
    /// Scenario overrides keyed by appliance name.
    #[serde(default)]
    pub appliance_patterns: BTreeMap<String, ApplianceConfig>,
}

/// Simulation window and global parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Inclusive window start, `YYYY-MM-DD HH:MM:SS`.
    pub start_time: String,
    /// Exclusive window end, `YYYY-MM-DD HH:MM:SS`.
    pub stop_time: String,
    /// Seed for appliances that do not set their own.
    pub seed: u64,
    /// Base directory holding one sub-directory per pattern library.
    pub patterns_dir: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_time: "2024-07-01 00:00:00".to_string(),
            stop_time: "2024-07-15 00:00:00".to_string(),
            seed: 42,
            patterns_dir: "data/patterns".to_string(),
        }
    }
}

/// Appliance template or override. Absent fields inherit when merged and
/// fall back to built-in defaults when resolved.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApplianceConfig {
    /// Peak power (W).
    pub nominal_power: Option<f64>,
    /// Activation length (minutes).
    pub duration_min: Option<f64>,
    /// `scaling`, `weighted`, `interpolate` or `dtw`.
    pub generation_method: Option<String>,
    /// Idle power (W).
    pub baseline: Option<f64>,
    /// Template sample spacing (s).
    pub timestep_native: Option<f64>,
    /// Output sample spacing (s).
    pub output_timestep: Option<f64>,
    /// Pattern library directory under `simulation.patterns_dir`.
    pub pattern_dir: Option<String>,
    pub seed: Option<u64>,
    pub ref_index: Option<usize>,
    pub template_weights: Option<Vec<f64>>,
    /// Daily count, used only when `schedule` is absent.
    pub activations_per_day: Option<u32>,
    pub schedule: Option<ScheduleConfig>,
}

/// Weekly schedule wire format.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    pub activations_per_week: Option<u32>,
    pub weekday_activations: Option<u32>,
    pub weekend_activations: Option<u32>,
    pub weekday: Option<DayScheduleConfig>,
    pub weekend: Option<DayScheduleConfig>,
}

/// Hour preferences for one day type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DayScheduleConfig {
    /// `"start-end"` hour ranges mapped to weights.
    pub hour_probabilities: Option<BTreeMap<String, f64>>,
}

/// Overlays `over` on `base`.
trait Merge: Sized + Clone {
    fn merged_with(&self, over: &Self) -> Self;
}

fn pick<T: Clone>(over: &Option<T>, base: &Option<T>) -> Option<T> {
    over.as_ref().or(base.as_ref()).cloned()
}

fn merge_nested<T: Merge>(base: &Option<T>, over: &Option<T>) -> Option<T> {
    match (base, over) {
        (Some(b), Some(o)) => Some(b.merged_with(o)),
        _ => pick(over, base),
    }
}

impl Merge for BTreeMap<String, f64> {
    fn merged_with(&self, over: &Self) -> Self {
        let mut out = self.clone();
        out.extend(over.iter().map(|(k, v)| (k.clone(), *v)));
        out
    }
}

impl Merge for DayScheduleConfig {
    fn merged_with(&self, over: &Self) -> Self {
        Self {
            hour_probabilities: merge_nested(&self.hour_probabilities, &over.hour_probabilities),
        }
    }
}

impl Merge for ScheduleConfig {
    fn merged_with(&self, over: &Self) -> Self {
        Self {
            activations_per_week: pick(&over.activations_per_week, &self.activations_per_week),
            weekday_activations: pick(&over.weekday_activations, &self.weekday_activations),
            weekend_activations: pick(&over.weekend_activations, &self.weekend_activations),
            weekday: merge_nested(&self.weekday, &over.weekday),
            weekend: merge_nested(&self.weekend, &over.weekend),
        }
    }
}

impl Merge for ApplianceConfig {
    fn merged_with(&self, over: &Self) -> Self {
        Self {
            nominal_power: pick(&over.nominal_power, &self.nominal_power),
            duration_min: pick(&over.duration_min, &self.duration_min),
            generation_method: pick(&over.generation_method, &self.generation_method),
            baseline: pick(&over.baseline, &self.baseline),
            timestep_native: pick(&over.timestep_native, &self.timestep_native),
            output_timestep: pick(&over.output_timestep, &self.output_timestep),
            pattern_dir: pick(&over.pattern_dir, &self.pattern_dir),
            seed: pick(&over.seed, &self.seed),
            ref_index: pick(&over.ref_index, &self.ref_index),
            template_weights: pick(&over.template_weights, &self.template_weights),
            activations_per_day: pick(&over.activations_per_day, &self.activations_per_day),
            schedule: merge_nested(&self.schedule, &over.schedule),
        }
    }
}

impl ApplianceConfig {
    /// Deep-merges `over` onto `self`.
    ///
    /// Nested schedule tables and hour-probability maps merge key-wise; every
    /// other field present in `over` replaces the base value.
    pub fn merged_with(&self, over: &Self) -> Self {
        Merge::merged_with(self, over)
    }

    /// Applies defaults and validates, producing a resolved template.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn resolve(
        &self,
        name: &str,
        default_seed: u64,
    ) -> Result<ApplianceTemplate, ValidationError> {
        ApplianceTemplate::resolve(name, self, default_seed)
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.start_time"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl From<ValidationError> for ConfigError {
    fn from(e: ValidationError) -> Self {
        Self {
            field: e.field,
            message: e.message,
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: a two-week window with a dishwasher on
    /// a weekly schedule and a washing machine on the daily count.
    pub fn baseline() -> Self {
        let hours = |pairs: &[(&str, f64)]| DayScheduleConfig {
            hour_probabilities: Some(pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()),
        };

        let mut appliances = BTreeMap::new();
        appliances.insert(
            "dishwasher".to_string(),
            ApplianceConfig {
                nominal_power: Some(1800.0),
                duration_min: Some(120.0),
                generation_method: Some("scaling".to_string()),
                schedule: Some(ScheduleConfig {
                    activations_per_week: Some(7),
                    weekday_activations: Some(5),
                    weekend_activations: Some(2),
                    weekday: Some(hours(&[("18-22", 1.0)])),
                    weekend: Some(hours(&[("10-14", 1.0)])),
                }),
                ..ApplianceConfig::default()
            },
        );
        appliances.insert(
            "washing_machine".to_string(),
            ApplianceConfig {
                nominal_power: Some(2000.0),
                duration_min: Some(90.0),
                activations_per_day: Some(1),
                ..ApplianceConfig::default()
            },
        );

        Self {
            simulation: SimulationConfig::default(),
            appliances,
            appliance_patterns: BTreeMap::new(),
        }
    }

    /// Returns the heavy-use preset: baseline appliances run more often and
    /// the dishwasher weights evenings above mornings.
    pub fn heavy_use() -> Self {
        let mut cfg = Self::baseline();
        cfg.appliance_patterns.insert(
            "dishwasher".to_string(),
            ApplianceConfig {
                generation_method: Some("weighted".to_string()),
                schedule: Some(ScheduleConfig {
                    activations_per_week: Some(14),
                    weekday_activations: Some(10),
                    weekend_activations: Some(4),
                    weekday: Some(DayScheduleConfig {
                        hour_probabilities: Some(BTreeMap::from([("6-9".to_string(), 0.3)])),
                    }),
                    ..ScheduleConfig::default()
                }),
                ..ApplianceConfig::default()
            },
        );
        cfg.appliance_patterns.insert(
            "washing_machine".to_string(),
            ApplianceConfig {
                activations_per_day: Some(2),
                ..ApplianceConfig::default()
            },
        );
        cfg
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "heavy_use"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "heavy_use" => Ok(Self::heavy_use()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Adds overrides from a JSON object keyed by appliance name.
    ///
    /// Entries for an appliance already overridden are merged on top.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the JSON is invalid or has unknown fields.
    pub fn apply_overrides_json(&mut self, json: &str) -> Result<(), ConfigError> {
        let overrides: BTreeMap<String, ApplianceConfig> =
            serde_json::from_str(json).map_err(|e| ConfigError {
                field: "overrides".to_string(),
                message: e.to_string(),
            })?;
        for (name, over) in overrides {
            let merged = match self.appliance_patterns.get(&name) {
                Some(existing) => existing.merged_with(&over),
                None => over,
            };
            self.appliance_patterns.insert(name, merged);
        }
        Ok(())
    }

    /// Names of every appliance to generate, in sorted order.
    pub fn appliance_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .appliances
            .keys()
            .chain(self.appliance_patterns.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Base template with the scenario override merged on top.
    pub fn merged_appliance(&self, name: &str) -> ApplianceConfig {
        let base = self.appliances.get(name).cloned().unwrap_or_default();
        match self.appliance_patterns.get(name) {
            Some(over) => base.merged_with(over),
            None => base,
        }
    }

    /// Resolves one appliance with the scenario seed as fallback.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the merged configuration is invalid.
    pub fn resolve_appliance(&self, name: &str) -> Result<ApplianceTemplate, ValidationError> {
        self.merged_appliance(name).resolve(name, self.simulation.seed)
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if let Err(e) = SimWindow::parse(&s.start_time, &s.stop_time, 60) {
            errors.push(ConfigError {
                field: format!("simulation.{}", e.field),
                message: e.message,
            });
        }
        if s.patterns_dir.trim().is_empty() {
            errors.push(ConfigError {
                field: "simulation.patterns_dir".into(),
                message: "must not be empty".into(),
            });
        }

        for name in self.appliance_names() {
            if let Err(e) = self.resolve_appliance(name) {
                errors.push(ConfigError {
                    field: format!("appliances.{name}.{}", e.field),
                    message: e.message,
                });
            }
        }

        errors
    }
}
