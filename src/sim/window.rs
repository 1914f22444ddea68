//! Simulation window and its fixed-step slot grid.

use chrono::{Datelike, IsoWeek, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

use crate::error::ValidationError;

/// Timestamp format used by scenario files and CSV export.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SECONDS_PER_DAY: u32 = 86_400;

/// Half-open period `[start, stop)` split into `step_secs`-wide slots.
///
/// Slot `i` starts at `start + i * step`. The grid never includes `stop`
/// itself, so `len() == (stop - start) / step`.
///
/// # Examples
///
/// ```
/// use appliance_loadgen::sim::window::SimWindow;
///
/// let w = SimWindow::parse("2024-07-01 00:00:00", "2024-07-02 00:00:00", 60).unwrap();
/// assert_eq!(w.len(), 1440);
/// assert_eq!(w.slots_per_day(), 1440);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimWindow {
    start: NaiveDateTime,
    stop: NaiveDateTime,
    step_secs: u32,
    len: usize,
}

/// Contiguous run of slots `[start, end)` sharing one calendar period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    /// ISO week containing the segment.
    pub week: IsoWeek,
    /// First calendar date in the segment.
    pub date: NaiveDate,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

impl SimWindow {
    /// Creates a window.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if `stop <= start`, if `step_secs` is zero
    /// or does not divide a day, or if the window is shorter than one step.
    pub fn new(
        start: NaiveDateTime,
        stop: NaiveDateTime,
        step_secs: u32,
    ) -> Result<Self, ValidationError> {
        if step_secs == 0 || SECONDS_PER_DAY % step_secs != 0 {
            return Err(ValidationError::new(
                "output_timestep",
                format!("must be > 0 and divide 86400 seconds, got {step_secs}"),
            ));
        }
        if stop <= start {
            return Err(ValidationError::new(
                "stop_time",
                "must be later than start_time",
            ));
        }
        let span = (stop - start).num_seconds();
        let len = usize::try_from(span / i64::from(step_secs)).unwrap_or(0);
        if len == 0 {
            return Err(ValidationError::new(
                "stop_time",
                "window must span at least one output timestep",
            ));
        }
        Ok(Self {
            start,
            stop,
            step_secs,
            len,
        })
    }

    /// Parses `start`/`stop` in [`TIMESTAMP_FORMAT`] and creates a window.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for unparsable timestamps or an invalid window.
    pub fn parse(start: &str, stop: &str, step_secs: u32) -> Result<Self, ValidationError> {
        Self::new(
            parse_timestamp(start, "start_time")?,
            parse_timestamp(stop, "stop_time")?,
            step_secs,
        )
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn stop(&self) -> NaiveDateTime {
        self.stop
    }

    pub fn step_secs(&self) -> u32 {
        self.step_secs
    }

    /// Number of slots in the window.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slots in a full day.
    pub fn slots_per_day(&self) -> usize {
        (SECONDS_PER_DAY / self.step_secs) as usize
    }

    /// Slots in a full week.
    pub fn slots_per_week(&self) -> usize {
        7 * self.slots_per_day()
    }

    /// Slots needed to cover `duration`, rounded up.
    pub fn slots_for(&self, duration: TimeDelta) -> usize {
        let secs = duration.num_seconds().max(0) as u64;
        let step = u64::from(self.step_secs);
        secs.div_ceil(step) as usize
    }

    /// Start timestamp of `slot`.
    pub fn timestamp(&self, slot: usize) -> NaiveDateTime {
        self.start + TimeDelta::seconds(slot as i64 * i64::from(self.step_secs))
    }

    /// Slot containing `ts`, if inside the window.
    pub fn slot_of(&self, ts: NaiveDateTime) -> Option<usize> {
        if ts < self.start {
            return None;
        }
        let offset = (ts - self.start).num_seconds() / i64::from(self.step_secs);
        usize::try_from(offset).ok().filter(|&s| s < self.len)
    }

    /// Seconds after midnight at which `slot` starts.
    pub fn seconds_of_day(&self, slot: usize) -> u32 {
        self.timestamp(slot).time().num_seconds_from_midnight()
    }

    /// Calls `f` with each slot index and its timestamp in order.
    pub fn for_each_slot(&self, mut f: impl FnMut(usize, NaiveDateTime)) {
        for slot in 0..self.len {
            f(slot, self.timestamp(slot));
        }
    }

    /// Splits the window at ISO week boundaries (Monday 00:00).
    pub fn week_segments(&self) -> Vec<Segment> {
        self.segments_by(|ts| ts.date().iso_week())
    }

    /// Splits the window at midnight.
    pub fn day_segments(&self) -> Vec<Segment> {
        self.segments_by(|ts| ts.date())
    }

    fn segments_by<K: PartialEq>(&self, key: impl Fn(NaiveDateTime) -> K) -> Vec<Segment> {
        let mut segments: Vec<Segment> = Vec::new();
        let mut current: Option<K> = None;
        self.for_each_slot(|slot, ts| {
            let k = key(ts);
            if current.as_ref() == Some(&k) {
                if let Some(seg) = segments.last_mut() {
                    seg.end = slot + 1;
                }
            } else {
                segments.push(Segment {
                    start: slot,
                    end: slot + 1,
                    week: ts.date().iso_week(),
                    date: ts.date(),
                });
                current = Some(k);
            }
        });
        segments
    }
}

/// Parses a timestamp in [`TIMESTAMP_FORMAT`].
///
/// # Errors
///
/// Returns a `ValidationError` naming `field` when parsing fails.
pub fn parse_timestamp(value: &str, field: &str) -> Result<NaiveDateTime, ValidationError> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).map_err(|e| {
        ValidationError::new(
            field,
            format!("\"{value}\" is not a \"YYYY-MM-DD HH:MM:SS\" timestamp: {e}"),
        )
    })
}
