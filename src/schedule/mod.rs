//! Activation scheduling: hour ranges, probability fields and planning.

/// Parser for `"start-end"` hour-range keys.
pub mod hour_range;
pub mod planner;
/// Per-timestep preference weights.
pub mod probability;
pub mod types;

pub use hour_range::HourRange;
pub use planner::plan_activations;
pub use probability::{HourProbabilities, ProbabilityField};
pub use types::{
    Activation, ActivationSplit, DayType, ScheduleSpec, UsageProfile, WeeklyPlan, week_label,
};
