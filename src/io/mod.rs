/// CSV export of generated series.
pub mod export;
