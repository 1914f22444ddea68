//! Fixed-step power time series.

use chrono::NaiveDateTime;

/// One `(timestamp, power)` sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    /// Power draw (W).
    pub power: f64,
}

/// Ordered samples at a fixed output timestep, covering `[start, stop)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    samples: Vec<Sample>,
    step_secs: u32,
}

impl TimeSeries {
    pub(crate) fn from_samples(samples: Vec<Sample>, step_secs: u32) -> Self {
        Self { samples, step_secs }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn step_secs(&self) -> u32 {
        self.step_secs
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn peak(&self) -> f64 {
        self.samples.iter().map(|s| s.power).fold(0.0, f64::max)
    }

    /// Energy over the series in kWh.
    pub fn energy_kwh(&self) -> f64 {
        let hours_per_step = f64::from(self.step_secs) / 3600.0;
        self.samples.iter().map(|s| s.power).sum::<f64>() * hours_per_step / 1000.0
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
