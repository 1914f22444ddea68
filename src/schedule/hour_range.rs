//! Parsing of `"start-end"` hour-range keys.

use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Half-open interval of hours `[start, end)` within one day.
///
/// # Examples
///
/// ```
/// use appliance_loadgen::schedule::hour_range::HourRange;
///
/// let r: HourRange = "6-9".parse().unwrap();
/// assert_eq!((r.start, r.end), (6.0, 9.0));
/// assert!(r.contains(8.5));
/// assert!(!r.contains(9.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourRange {
    /// First hour covered (inclusive).
    pub start: f64,
    /// First hour not covered (exclusive).
    pub end: f64,
}

impl HourRange {
    /// Parses a token such as `"18-22"` or `"6.5-9"`.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` unless the token is two numbers separated by
    /// a hyphen with `0 <= start < end <= 24`.
    pub fn parse(token: &str) -> Result<Self, ValidationError> {
        let field = format!("hour range \"{token}\"");
        let (lo, hi) = token
            .split_once('-')
            .ok_or_else(|| ValidationError::new(&field, "expected format \"start-end\""))?;

        let start = parse_bound(lo).ok_or_else(|| {
            ValidationError::new(&field, format!("start \"{}\" is not a number", lo.trim()))
        })?;
        let end = parse_bound(hi).ok_or_else(|| {
            ValidationError::new(&field, format!("end \"{}\" is not a number", hi.trim()))
        })?;

        if !(0.0..=24.0).contains(&start) || !(0.0..=24.0).contains(&end) {
            return Err(ValidationError::new(&field, "bounds must lie within [0, 24]"));
        }
        if end <= start {
            return Err(ValidationError::new(&field, "end must be greater than start"));
        }

        Ok(Self { start, end })
    }

    /// Returns `true` when `hour` falls inside `[start, end)`.
    pub fn contains(&self, hour: f64) -> bool {
        hour >= self.start && hour < self.end
    }
}

fn parse_bound(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl FromStr for HourRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for HourRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
