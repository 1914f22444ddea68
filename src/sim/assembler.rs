//! Places activation waveforms onto a baseline time series.

use tracing::warn;

use crate::pattern::Waveform;
use crate::schedule::Activation;

use super::series::{Sample, TimeSeries};
use super::window::SimWindow;

/// Builds the series for one appliance.
///
/// Every slot carries `baseline` except those covered by an activation,
/// where the waveform sample at the matching offset replaces it. Waveform
/// samples beyond the window are dropped.
///
/// # Arguments
///
/// * `window` - Output grid
/// * `baseline` - Idle power (W)
/// * `activations` - Non-overlapping activations inside the window
/// * `waveform` - Curve shared by all activations
pub fn assemble<'a>(
    window: &SimWindow,
    baseline: f64,
    activations: impl IntoIterator<Item = &'a Activation>,
    waveform: &Waveform,
) -> TimeSeries {
    let mut power = vec![baseline; window.len()];

    for activation in activations {
        let Some(first) = window.slot_of(activation.start) else {
            warn!(start = %activation.start, "activation outside window skipped");
            continue;
        };
        for (slot, value) in power[first..].iter_mut().zip(&waveform.samples) {
            *slot = *value;
        }
    }

    let mut samples = Vec::with_capacity(window.len());
    window.for_each_slot(|slot, timestamp| {
        samples.push(Sample {
            timestamp,
            power: power[slot],
        });
    });
    TimeSeries::from_samples(samples, window.step_secs())
}
