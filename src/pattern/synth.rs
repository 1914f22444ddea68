//! Waveform synthesis strategies.
//!
//! Every strategy builds a curve at the native timestep from the template
//! library; [`synthesize`] then resamples it to the output timestep.

use std::fmt;
use std::str::FromStr;

use chrono::TimeDelta;

use crate::error::{GenerationError, ValidationError};

use super::dtw;
use super::resample::{
    clip_non_negative, native_steps, normalize, resample, restore_peak, scale, stretch,
};
use super::store::{PatternTemplate, TemplateLibrary};

/// Parameters shared by all strategies for one appliance.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformRequest {
    /// Peak power (W).
    pub nominal_power: f64,
    /// Idle power (W).
    pub baseline: f64,
    /// Activation length.
    pub duration: TimeDelta,
    /// Template sample spacing (s).
    pub timestep_native: f64,
    /// Output sample spacing (s).
    pub output_timestep: f64,
    /// Template used as reference by `scaling` and `dtw`.
    pub ref_index: usize,
    /// Fixed template weights for `weighted`.
    pub template_weights: Option<Vec<f64>>,
}

impl WaveformRequest {
    fn duration_secs(&self) -> f64 {
        self.duration.num_milliseconds() as f64 / 1000.0
    }

    fn native_steps(&self) -> usize {
        native_steps(self.duration_secs(), self.timestep_native)
    }

    /// Stretches a template to the duration and maps it onto
    /// `[baseline, nominal]`.
    ///
    /// Normalising after the stretch keeps the peak at `nominal` even when
    /// the stretched grid misses the template's peak sample.
    fn shaped(&self, template: &PatternTemplate) -> Vec<f64> {
        let stretched = stretch(&template.power_sequence, self.native_steps());
        scale(&normalize(&stretched), self.nominal_power, self.baseline)
    }

    fn reference<'a>(&self, library: &'a TemplateLibrary) -> &'a PatternTemplate {
        library
            .templates
            .get(self.ref_index)
            .unwrap_or(&library.templates[0])
    }
}

/// Power curve for one activation at the output timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f64>,
}

impl Waveform {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn peak(&self) -> f64 {
        self.samples.iter().copied().fold(0.0, f64::max)
    }
}

/// Turns templates into a native-resolution curve.
pub trait Synthesizer {
    /// Builds the curve for `request`.
    ///
    /// # Errors
    ///
    /// Returns a `GenerationError` when the library or request cannot
    /// produce a curve with this strategy.
    fn synthesize_native(
        &self,
        library: &TemplateLibrary,
        request: &WaveformRequest,
    ) -> Result<Vec<f64>, GenerationError>;

    /// Checks that `request` can be served from `library` without building
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns the `ValidationError` that synthesis would hit.
    fn check(
        &self,
        _library: &TemplateLibrary,
        _request: &WaveformRequest,
    ) -> Result<(), ValidationError> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

/// Selects the synthesis strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationMethod {
    Scaling,
    Weighted,
    Interpolate,
    Dtw,
}

impl GenerationMethod {
    pub const NAMES: &[&str] = &["scaling", "weighted", "interpolate", "dtw"];

    /// Strategy object for this method.
    pub fn synthesizer(self) -> &'static dyn Synthesizer {
        match self {
            Self::Scaling => &ScalingSynthesizer,
            Self::Weighted => &WeightedSynthesizer,
            Self::Interpolate => &InterpolateSynthesizer,
            Self::Dtw => &DtwSynthesizer,
        }
    }
}

impl FromStr for GenerationMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scaling" => Ok(Self::Scaling),
            "weighted" => Ok(Self::Weighted),
            "interpolate" => Ok(Self::Interpolate),
            "dtw" => Ok(Self::Dtw),
            other => Err(ValidationError::new(
                "generation_method",
                format!(
                    "unknown method \"{other}\", expected one of: {}",
                    Self::NAMES.join(", ")
                ),
            )),
        }
    }
}

impl fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.synthesizer().name())
    }
}

/// One template, amplitude-scaled and stretched to the duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalingSynthesizer;

impl Synthesizer for ScalingSynthesizer {
    fn synthesize_native(
        &self,
        library: &TemplateLibrary,
        request: &WaveformRequest,
    ) -> Result<Vec<f64>, GenerationError> {
        Ok(request.shaped(request.reference(library)))
    }

    fn name(&self) -> &'static str {
        "scaling"
    }
}

/// Weighted average of all templates.
///
/// Without configured weights, each template is weighted by how close its
/// peak power and duration are to the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedSynthesizer;

impl WeightedSynthesizer {
    fn weights(
        library: &TemplateLibrary,
        request: &WaveformRequest,
    ) -> Result<Vec<f64>, ValidationError> {
        Self.check(library, request)?;
        let raw: Vec<f64> = match &request.template_weights {
            Some(w) => w.clone(),
            None => {
                let nominal = request.nominal_power;
                let duration = request.duration_secs();
                library
                    .templates
                    .iter()
                    .map(|t| {
                        let pw = 1.0 / (1.0 + (t.max_power() - nominal).abs() / nominal);
                        let tpl_dur = t.duration_secs(request.timestep_native);
                        let dw = 1.0 / (1.0 + (tpl_dur - duration).abs() / duration);
                        pw * dw
                    })
                    .collect()
            }
        };

        let total: f64 = raw.iter().sum();
        if !(total > 0.0) {
            return Err(ValidationError::new(
                "template_weights",
                "weights must not all be zero",
            ));
        }
        Ok(raw.into_iter().map(|w| w / total).collect())
    }
}

impl Synthesizer for WeightedSynthesizer {
    fn check(
        &self,
        library: &TemplateLibrary,
        request: &WaveformRequest,
    ) -> Result<(), ValidationError> {
        let Some(w) = &request.template_weights else {
            return Ok(());
        };
        if w.len() != library.len() {
            return Err(ValidationError::new(
                "template_weights",
                format!(
                    "expected {} weights (one per template), got {}",
                    library.len(),
                    w.len()
                ),
            ));
        }
        if w.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ValidationError::new(
                "template_weights",
                "weights must be finite and >= 0",
            ));
        }
        if !(w.iter().sum::<f64>() > 0.0) {
            return Err(ValidationError::new(
                "template_weights",
                "weights must not all be zero",
            ));
        }
        Ok(())
    }

    fn synthesize_native(
        &self,
        library: &TemplateLibrary,
        request: &WaveformRequest,
    ) -> Result<Vec<f64>, GenerationError> {
        let weights = Self::weights(library, request)?;
        let mut avg = vec![0.0; request.native_steps()];
        for (template, w) in library.templates.iter().zip(weights) {
            for (acc, v) in avg.iter_mut().zip(request.shaped(template)) {
                *acc += v * w;
            }
        }
        clip_non_negative(&mut avg);
        Ok(avg)
    }

    fn name(&self) -> &'static str {
        "weighted"
    }
}

/// Blend of the two templates closest to the nominal peak power.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpolateSynthesizer;

impl Synthesizer for InterpolateSynthesizer {
    fn synthesize_native(
        &self,
        library: &TemplateLibrary,
        request: &WaveformRequest,
    ) -> Result<Vec<f64>, GenerationError> {
        let nominal = request.nominal_power;
        let mut ranked: Vec<&PatternTemplate> = library.templates.iter().collect();
        ranked.sort_by(|a, b| {
            (a.max_power() - nominal)
                .abs()
                .total_cmp(&(b.max_power() - nominal).abs())
        });

        let first = ranked[0];
        let Some(second) = ranked.get(1).copied() else {
            return Ok(request.shaped(first));
        };

        let (p1, p2) = (first.max_power(), second.max_power());
        let alpha = if p1 == p2 {
            0.5
        } else {
            ((nominal - p1) / (p2 - p1)).clamp(0.0, 1.0)
        };
        let s1 = request.shaped(first);
        let s2 = request.shaped(second);
        Ok(s1
            .iter()
            .zip(&s2)
            .map(|(a, b)| (1.0 - alpha) * a + alpha * b)
            .collect())
    }

    fn name(&self) -> &'static str {
        "interpolate"
    }
}

/// Every template DTW-aligned onto the reference template, then averaged.
#[derive(Debug, Clone, Copy, Default)]
pub struct DtwSynthesizer;

impl Synthesizer for DtwSynthesizer {
    fn synthesize_native(
        &self,
        library: &TemplateLibrary,
        request: &WaveformRequest,
    ) -> Result<Vec<f64>, GenerationError> {
        let reference = request.shaped(request.reference(library));
        let mut avg = vec![0.0; reference.len()];
        for template in &library.templates {
            let warped = dtw::align(&request.shaped(template), &reference);
            for (acc, v) in avg.iter_mut().zip(warped) {
                *acc += v;
            }
        }
        let n = library.len() as f64;
        for v in &mut avg {
            *v /= n;
        }
        clip_non_negative(&mut avg);
        Ok(avg)
    }

    fn name(&self) -> &'static str {
        "dtw"
    }
}

/// Synthesizes the output-resolution waveform for one activation length.
///
/// The result has `ceil(duration / output_timestep)` samples.
///
/// # Errors
///
/// Returns `TemplateNotFound` for an empty library and propagates strategy
/// errors.
pub fn synthesize(
    method: GenerationMethod,
    library: &TemplateLibrary,
    request: &WaveformRequest,
) -> Result<Waveform, GenerationError> {
    if library.is_empty() {
        return Err(GenerationError::TemplateNotFound {
            path: library.dir.clone(),
            reason: "library has no templates".to_string(),
        });
    }
    let native = method.synthesizer().synthesize_native(library, request)?;
    let out_len = (request.duration_secs() / request.output_timestep).ceil() as usize;
    let mut samples = resample(
        &native,
        request.timestep_native,
        request.output_timestep,
        out_len.max(1),
    );
    let native_peak = native.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    restore_peak(&mut samples, native_peak, request.baseline);
    Ok(Waveform { samples })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::store::StatisticalFeatures;

    fn template(seq: &[f64], max_power: f64, secs: f64) -> PatternTemplate {
        PatternTemplate {
            power_sequence: seq.to_vec(),
            total_duration_seconds: Some(secs),
            statistical_features: StatisticalFeatures {
                max_power: Some(max_power),
            },
        }
    }

    fn library() -> TemplateLibrary {
        TemplateLibrary::from_templates(
            "mem",
            vec![
                template(&[0.0, 1500.0, 1800.0, 1200.0, 0.0], 1800.0, 3600.0),
                template(&[0.0, 2200.0, 2400.0, 300.0, 0.0], 2400.0, 5400.0),
                template(&[100.0, 900.0, 1000.0, 950.0, 100.0], 1000.0, 1800.0),
            ],
        )
    }

    fn request() -> WaveformRequest {
        WaveformRequest {
            nominal_power: 2000.0,
            baseline: 0.0,
            duration: TimeDelta::minutes(60),
            timestep_native: 7.0,
            output_timestep: 60.0,
            ref_index: 0,
            template_weights: None,
        }
    }

    #[test]
    fn method_names_parse() {
        for name in GenerationMethod::NAMES {
            let m: Result<GenerationMethod, _> = name.parse();
            assert_eq!(m.map(|m| m.to_string()), Ok((*name).to_string()));
        }
        assert!("fourier".parse::<GenerationMethod>().is_err());
    }

    #[test]
    fn every_method_yields_output_length() {
        let lib = library();
        for name in GenerationMethod::NAMES {
            let method: GenerationMethod = name.parse().unwrap_or(GenerationMethod::Scaling);
            let wf = synthesize(method, &lib, &request()).unwrap_or_else(|e| panic!("{e}"));
            assert_eq!(wf.len(), 60, "{name}");
            assert!(wf.samples.iter().all(|v| v.is_finite() && *v >= 0.0), "{name}");
        }
    }

    #[test]
    fn scaling_peaks_at_nominal() {
        let native = ScalingSynthesizer
            .synthesize_native(&library(), &request())
            .unwrap_or_default();
        let peak = native.iter().copied().fold(0.0, f64::max);
        assert!((peak - 2000.0).abs() < 1e-6);
        assert!(native.iter().all(|v| *v >= 0.0 && *v <= 2000.0 + 1e-9));
    }

    #[test]
    fn scaling_output_keeps_nominal_peak() {
        // 60 s output points fall between the 7 s native samples.
        let lib = TemplateLibrary::from_templates("mem", vec![library().templates[0].clone()]);
        let wf = synthesize(GenerationMethod::Scaling, &lib, &request())
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(wf.len(), 60);
        assert!((wf.peak() - 2000.0).abs() < 1e-6, "peak {}", wf.peak());
        assert!(wf.samples.iter().all(|v| *v >= 0.0 && *v <= 2000.0 + 1e-9));
    }

    #[test]
    fn weights_are_checked_against_library_size() {
        let mut req = request();
        req.template_weights = Some(vec![1.0, 1.0]);
        let err = GenerationMethod::Weighted.synthesizer().check(&library(), &req);
        assert_eq!(err.map_err(|e| e.field), Err("template_weights".to_string()));
        assert!(GenerationMethod::Scaling.synthesizer().check(&library(), &req).is_ok());
        req.template_weights = Some(vec![0.5, 0.0, 0.5]);
        assert!(GenerationMethod::Weighted.synthesizer().check(&library(), &req).is_ok());
    }

    #[test]
    fn scaling_respects_baseline() {
        let mut req = request();
        req.baseline = 50.0;
        let native = ScalingSynthesizer
            .synthesize_native(&library(), &req)
            .unwrap_or_default();
        let min = native.iter().copied().fold(f64::INFINITY, f64::min);
        assert!((min - 50.0).abs() < 1e-6);
    }

    #[test]
    fn scaling_out_of_range_ref_falls_back_to_first() {
        let mut req = request();
        req.ref_index = 99;
        let a = ScalingSynthesizer.synthesize_native(&library(), &req).ok();
        req.ref_index = 0;
        let b = ScalingSynthesizer.synthesize_native(&library(), &req).ok();
        assert_eq!(a, b);
    }

    #[test]
    fn weighted_with_single_weight_equals_scaling() {
        let mut req = request();
        req.template_weights = Some(vec![1.0, 0.0, 0.0]);
        let weighted = WeightedSynthesizer.synthesize_native(&library(), &req).ok();
        let scaled = ScalingSynthesizer.synthesize_native(&library(), &req).ok();
        assert_eq!(weighted, scaled);
    }

    #[test]
    fn weighted_rejects_bad_weights() {
        let mut req = request();
        req.template_weights = Some(vec![1.0]);
        assert!(WeightedSynthesizer.synthesize_native(&library(), &req).is_err());
        req.template_weights = Some(vec![0.0, 0.0, 0.0]);
        assert!(WeightedSynthesizer.synthesize_native(&library(), &req).is_err());
        req.template_weights = Some(vec![1.0, -1.0, 1.0]);
        assert!(WeightedSynthesizer.synthesize_native(&library(), &req).is_err());
    }

    #[test]
    fn similarity_weights_favour_closest_template() {
        let w = WeightedSynthesizer::weights(&library(), &request()).unwrap_or_default();
        assert_eq!(w.len(), 3);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        // 1800 W / 60 min matches 2000 W / 60 min best.
        assert!(w[0] > w[1] && w[0] > w[2]);
    }

    #[test]
    fn interpolate_single_template_is_scaled_shape() {
        let lib = TemplateLibrary::from_templates("mem", vec![library().templates[0].clone()]);
        let a = InterpolateSynthesizer.synthesize_native(&lib, &request()).ok();
        let b = ScalingSynthesizer.synthesize_native(&lib, &request()).ok();
        assert_eq!(a, b);
    }

    #[test]
    fn dtw_of_identical_templates_matches_scaling() {
        let t = library().templates[0].clone();
        let lib = TemplateLibrary::from_templates("mem", vec![t.clone(), t]);
        let mut req = request();
        req.duration = TimeDelta::minutes(5);
        let dtw = DtwSynthesizer.synthesize_native(&lib, &req).unwrap_or_default();
        let scaled = ScalingSynthesizer.synthesize_native(&lib, &req).unwrap_or_default();
        assert_eq!(dtw.len(), scaled.len());
        for (a, b) in dtw.iter().zip(&scaled) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_library_is_template_not_found() {
        let lib = TemplateLibrary::from_templates("mem", Vec::new());
        let err = synthesize(GenerationMethod::Scaling, &lib, &request());
        assert!(matches!(err, Err(GenerationError::TemplateNotFound { .. })));
    }
}
