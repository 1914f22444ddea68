//! Resolved appliance templates.

use chrono::TimeDelta;

use crate::config::{ApplianceConfig, DayScheduleConfig, ScheduleConfig};
use crate::error::ValidationError;
use crate::pattern::{GenerationMethod, WaveformRequest};
use crate::schedule::{ActivationSplit, HourProbabilities, ScheduleSpec, UsageProfile};

const DEFAULT_NOMINAL_POWER: f64 = 2000.0;
const DEFAULT_DURATION_MIN: f64 = 90.0;
const DEFAULT_TIMESTEP_NATIVE: f64 = 7.0;
const DEFAULT_OUTPUT_TIMESTEP: f64 = 60.0;
const DEFAULT_ACTIVATIONS_PER_DAY: u32 = 1;
const DEFAULT_ACTIVATIONS_PER_WEEK: u32 = 7;
const SECONDS_PER_DAY: u32 = 86_400;
/// Native samples per activation; DTW memory grows with this count.
const MAX_NATIVE_SAMPLES: f64 = 50_000.0;

/// Fully specified, validated appliance.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplianceTemplate {
    pub name: String,
    /// Peak power (W).
    pub nominal_power: f64,
    pub duration: TimeDelta,
    pub method: GenerationMethod,
    /// Idle power (W).
    pub baseline: f64,
    /// Template sample spacing (s).
    pub timestep_native: f64,
    /// Output sample spacing (s).
    pub output_timestep: u32,
    pub pattern_dir: String,
    pub seed: u64,
    pub ref_index: usize,
    pub template_weights: Option<Vec<f64>>,
    pub usage: UsageProfile,
}

impl ApplianceTemplate {
    /// Applies defaults to `cfg` and checks every input contract.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` naming the offending field.
    pub fn resolve(
        name: &str,
        cfg: &ApplianceConfig,
        default_seed: u64,
    ) -> Result<Self, ValidationError> {
        let nominal_power = positive(
            "nominal_power",
            cfg.nominal_power.unwrap_or(DEFAULT_NOMINAL_POWER),
        )?;
        let duration_min = positive(
            "duration_min",
            cfg.duration_min.unwrap_or(DEFAULT_DURATION_MIN),
        )?;
        let duration = TimeDelta::try_milliseconds((duration_min * 60_000.0).round() as i64)
            .ok_or_else(|| ValidationError::new("duration_min", "out of range"))?;
        let timestep_native = positive(
            "timestep_native",
            cfg.timestep_native.unwrap_or(DEFAULT_TIMESTEP_NATIVE),
        )?;
        if duration_min * 60.0 / timestep_native > MAX_NATIVE_SAMPLES {
            return Err(ValidationError::new(
                "timestep_native",
                format!(
                    "{timestep_native} s over {duration_min} min exceeds \
                     {MAX_NATIVE_SAMPLES} samples per activation"
                ),
            ));
        }
        let output_timestep =
            output_timestep(cfg.output_timestep.unwrap_or(DEFAULT_OUTPUT_TIMESTEP))?;

        let baseline = cfg.baseline.unwrap_or(0.0);
        if !baseline.is_finite() || baseline < 0.0 {
            return Err(ValidationError::new("baseline", "must be finite and >= 0"));
        }

        let method: GenerationMethod = cfg
            .generation_method
            .as_deref()
            .unwrap_or("scaling")
            .parse()?;

        if let Some(weights) = &cfg.template_weights {
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(ValidationError::new(
                    "template_weights",
                    "weights must be finite and >= 0",
                ));
            }
        }

        let usage = match &cfg.schedule {
            Some(schedule) => UsageProfile::Weekly(schedule_spec(schedule)?),
            None => {
                let activations_per_day =
                    cfg.activations_per_day.unwrap_or(DEFAULT_ACTIVATIONS_PER_DAY);
                if activations_per_day == 0 {
                    return Err(ValidationError::new("activations_per_day", "must be > 0"));
                }
                UsageProfile::Daily {
                    activations_per_day,
                }
            }
        };

        Ok(Self {
            name: name.to_string(),
            nominal_power,
            duration,
            method,
            baseline,
            timestep_native,
            output_timestep,
            pattern_dir: cfg
                .pattern_dir
                .clone()
                .unwrap_or_else(|| format!("{name}_patterns")),
            seed: cfg.seed.unwrap_or(default_seed),
            ref_index: cfg.ref_index.unwrap_or(0),
            template_weights: cfg.template_weights.clone(),
            usage,
        })
    }

    /// Synthesis parameters for this appliance.
    pub fn waveform_request(&self) -> WaveformRequest {
        WaveformRequest {
            nominal_power: self.nominal_power,
            baseline: self.baseline,
            duration: self.duration,
            timestep_native: self.timestep_native,
            output_timestep: f64::from(self.output_timestep),
            ref_index: self.ref_index,
            template_weights: self.template_weights.clone(),
        }
    }
}

fn positive(field: &str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::new(field, format!("must be > 0, got {value}")))
    }
}

fn output_timestep(value: f64) -> Result<u32, ValidationError> {
    let secs = positive("output_timestep", value)?;
    if secs.fract() != 0.0
        || secs > f64::from(SECONDS_PER_DAY)
        || SECONDS_PER_DAY % secs as u32 != 0
    {
        return Err(ValidationError::new(
            "output_timestep",
            format!("must be a whole number of seconds dividing 86400, got {value}"),
        ));
    }
    Ok(secs as u32)
}

fn schedule_spec(schedule: &ScheduleConfig) -> Result<ScheduleSpec, ValidationError> {
    let per_week = schedule
        .activations_per_week
        .unwrap_or(DEFAULT_ACTIVATIONS_PER_WEEK);
    if per_week == 0 {
        return Err(ValidationError::new(
            "schedule.activations_per_week",
            "must be > 0",
        ));
    }

    let split = match (schedule.weekday_activations, schedule.weekend_activations) {
        (Some(weekday), Some(weekend)) => {
            if u64::from(weekday) + u64::from(weekend) != u64::from(per_week) {
                return Err(ValidationError::new(
                    "schedule.weekday_activations",
                    format!(
                        "weekday_activations ({weekday}) + weekend_activations ({weekend}) \
                         must equal activations_per_week ({per_week})"
                    ),
                ));
            }
            ActivationSplit::Explicit { weekday, weekend }
        }
        (Some(weekday), None) => ActivationSplit::Explicit {
            weekday,
            weekend: remainder("schedule.weekday_activations", weekday, per_week)?,
        },
        (None, Some(weekend)) => ActivationSplit::Explicit {
            weekday: remainder("schedule.weekend_activations", weekend, per_week)?,
            weekend,
        },
        (None, None) => ActivationSplit::Proportional,
    };

    Ok(ScheduleSpec {
        activations_per_week: per_week,
        split,
        weekday: day_probabilities(
            schedule.weekday.as_ref(),
            "schedule.weekday.hour_probabilities",
        )?,
        weekend: day_probabilities(
            schedule.weekend.as_ref(),
            "schedule.weekend.hour_probabilities",
        )?,
    })
}

fn remainder(field: &str, given: u32, per_week: u32) -> Result<u32, ValidationError> {
    per_week.checked_sub(given).ok_or_else(|| {
        ValidationError::new(
            field,
            format!("{given} exceeds activations_per_week ({per_week})"),
        )
    })
}

fn day_probabilities(
    day: Option<&DayScheduleConfig>,
    field: &str,
) -> Result<HourProbabilities, ValidationError> {
    match day.and_then(|d| d.hour_probabilities.as_ref()) {
        Some(map) => HourProbabilities::from_map(map, field),
        None => Ok(HourProbabilities::default()),
    }
}
