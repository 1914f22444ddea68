//! Curve normalisation and piecewise-linear resampling.

/// Min-max normalises `seq` into `[0, 1]`; a flat curve maps to `0.5`.
pub fn normalize(seq: &[f64]) -> Vec<f64> {
    let (min, max) = seq
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if seq.is_empty() || max <= min {
        return vec![0.5; seq.len()];
    }
    seq.iter().map(|v| (v - min) / (max - min)).collect()
}

/// Maps a normalised curve onto `[baseline, nominal]`.
pub fn scale(normalized: &[f64], nominal: f64, baseline: f64) -> Vec<f64> {
    normalized
        .iter()
        .map(|v| v * (nominal - baseline) + baseline)
        .collect()
}

/// Linear interpolation of `(xs, ys)` at `x`, clamping outside the range.
///
/// `xs` must be ascending and the same length as `ys`.
pub fn interp(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    match xs.len() {
        0 => return 0.0,
        1 => return ys[0],
        _ => {}
    }
    if x <= xs[0] {
        return ys[0];
    }
    let last = xs.len() - 1;
    if x >= xs[last] {
        return ys[last];
    }
    let hi = xs.partition_point(|&v| v <= x).min(last);
    let lo = hi - 1;
    let span = xs[hi] - xs[lo];
    if span <= 0.0 {
        return ys[lo];
    }
    let t = (x - xs[lo]) / span;
    ys[lo] + t * (ys[hi] - ys[lo])
}

fn linspace(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n).map(|i| i as f64 / (n - 1) as f64).collect(),
    }
}

/// Stretches or compresses `seq` to `steps` samples, keeping both endpoints.
pub fn stretch(seq: &[f64], steps: usize) -> Vec<f64> {
    if steps == seq.len() {
        return seq.to_vec();
    }
    if seq.is_empty() {
        return vec![0.0; steps];
    }
    let x0 = linspace(seq.len());
    linspace(steps)
        .into_iter()
        .map(|x| interp(x, &x0, seq))
        .collect()
}

/// Number of native samples covering `duration_secs`, at least one.
pub fn native_steps(duration_secs: f64, timestep_native: f64) -> usize {
    ((duration_secs / timestep_native).floor() as usize).max(1)
}

/// Resamples a curve sampled every `native_step` seconds onto `out_len`
/// points spaced `output_step` seconds apart.
pub fn resample(curve: &[f64], native_step: f64, output_step: f64, out_len: usize) -> Vec<f64> {
    let xs: Vec<f64> = (0..curve.len()).map(|i| i as f64 * native_step).collect();
    (0..out_len)
        .map(|j| interp(j as f64 * output_step, &xs, curve))
        .collect()
}

/// Rescales the part of `curve` above `floor` so its maximum equals `peak`.
///
/// Output samples can fall between native samples and shave the peak.
/// Curves already at or above `peak`, or never above `floor`, are unchanged.
pub fn restore_peak(curve: &mut [f64], peak: f64, floor: f64) {
    let max = curve.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max > floor && peak > max) {
        return;
    }
    let gain = (peak - floor) / (max - floor);
    for v in curve.iter_mut().filter(|v| **v > floor) {
        *v = floor + (*v - floor) * gain;
    }
}

/// Clips negative samples to zero.
pub fn clip_non_negative(curve: &mut [f64]) {
    for v in curve.iter_mut() {
        *v = v.max(0.0);
    }
}
