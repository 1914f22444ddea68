//! Per-timestep preference weights for one day type.

use std::collections::BTreeMap;

use crate::error::ValidationError;

use super::hour_range::HourRange;

const SECONDS_PER_DAY: u32 = 86_400;

/// Validated set of hour ranges with their relative weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourProbabilities {
    ranges: Vec<(HourRange, f64)>,
}

impl HourProbabilities {
    /// Parses the wire mapping `{"start-end": weight}`.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for malformed keys and for negative or
    /// non-finite weights. `field` prefixes the error path.
    pub fn from_map(map: &BTreeMap<String, f64>, field: &str) -> Result<Self, ValidationError> {
        let mut ranges = Vec::with_capacity(map.len());
        for (key, &weight) in map {
            let range = HourRange::parse(key)
                .map_err(|e| ValidationError::new(format!("{field}.{key}"), e.message))?;
            if !weight.is_finite() || weight < 0.0 {
                return Err(ValidationError::new(
                    format!("{field}.{key}"),
                    format!("probability must be finite and >= 0, got {weight}"),
                ));
            }
            ranges.push((range, weight));
        }
        Ok(Self { ranges })
    }

    /// Returns `true` when no ranges were supplied.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Effective weight at `hour`: maximum over all ranges containing it.
    pub fn weight_at(&self, hour: f64) -> f64 {
        self.ranges
            .iter()
            .filter(|(r, _)| r.contains(hour))
            .map(|(_, w)| *w)
            .fold(0.0, f64::max)
    }
}

/// Weight per output timestep across one day.
///
/// Slot `i` covers `[i * step, (i + 1) * step)` seconds after midnight and
/// takes the weight of the hour at its start.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityField {
    weights: Vec<f64>,
    step_secs: u32,
}

impl ProbabilityField {
    /// Builds the field for `step_secs`-wide slots.
    ///
    /// # Panics
    ///
    /// Panics if `step_secs` is zero or does not divide a day.
    pub fn build(probabilities: &HourProbabilities, step_secs: u32) -> Self {
        assert!(
            step_secs > 0 && SECONDS_PER_DAY % step_secs == 0,
            "step_secs must divide a day"
        );
        let slots = (SECONDS_PER_DAY / step_secs) as usize;
        let weights = (0..slots)
            .map(|i| {
                let hour = (i as f64 * f64::from(step_secs)) / 3600.0;
                probabilities.weight_at(hour)
            })
            .collect();
        Self { weights, step_secs }
    }

    /// Number of slots in one day.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weight of the slot starting `seconds_of_day` after midnight.
    pub fn weight_at_seconds(&self, seconds_of_day: u32) -> f64 {
        let idx = (seconds_of_day / self.step_secs) as usize;
        self.weights.get(idx).copied().unwrap_or(0.0)
    }

    fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Field rescaled to sum to one, uniform when the total is zero.
    ///
    /// A day type with no preferred hours can still receive activations
    /// from an explicit split; they land anywhere in the day.
    pub fn normalized(&self) -> Self {
        let total = self.total();
        let weights = if total > 0.0 {
            self.weights.iter().map(|w| w / total).collect()
        } else {
            let n = self.weights.len().max(1) as f64;
            vec![1.0 / n; self.weights.len()]
        };
        Self {
            weights,
            step_secs: self.step_secs,
        }
    }
}
