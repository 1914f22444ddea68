//! Synthetic appliance load generator.
//!
//! Plans appliance activations from weekly hour-probability schedules,
//! synthesizes power curves from recorded pattern templates and assembles
//! fixed-step consumption series.

/// Resolved appliance templates.
pub mod appliance;
pub mod config;
pub mod error;
pub mod generator;
pub mod io;
/// Pattern templates and waveform synthesis.
pub mod pattern;
/// Hour ranges, probability fields and the activation planner.
pub mod schedule;
/// Simulation window, series and assembly.
pub mod sim;

pub use appliance::ApplianceTemplate;
pub use config::{ApplianceConfig, ConfigError, ScenarioConfig};
pub use error::{ApplianceError, GenerationError, ValidationError};
pub use generator::{ApplianceSeries, ScenarioOutput, generate_appliance, generate_scenario};
