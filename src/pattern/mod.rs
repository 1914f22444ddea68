//! Pattern templates and waveform synthesis.

pub mod dtw;
pub mod resample;
pub mod store;
pub mod synth;

pub use store::{PatternStore, PatternTemplate, StatisticalFeatures, TemplateLibrary};
pub use synth::{GenerationMethod, Synthesizer, Waveform, WaveformRequest, synthesize};
