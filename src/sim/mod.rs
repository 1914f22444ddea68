/// Baseline-plus-waveform series construction.
pub mod assembler;
pub mod series;
/// Simulation window and slot grid.
pub mod window;

pub use assembler::assemble;
pub use series::{Sample, TimeSeries};
pub use window::{SimWindow, TIMESTAMP_FORMAT};
