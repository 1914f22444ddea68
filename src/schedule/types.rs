//! Schedule data model: usage profiles, activations and weekly plans.

use std::fmt;

use chrono::{Datelike, IsoWeek, NaiveDate, NaiveDateTime, TimeDelta, Weekday};

use super::probability::HourProbabilities;

/// Weekday (Mon–Fri) or weekend (Sat–Sun).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DayType {
    Weekday,
    Weekend,
}

impl DayType {
    /// Classifies a calendar date.
    pub fn of(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => Self::Weekend,
            _ => Self::Weekday,
        }
    }

    /// Number of days of this type in a full week.
    pub fn days_per_week(self) -> u32 {
        match self {
            Self::Weekday => 5,
            Self::Weekend => 2,
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekday => f.write_str("weekday"),
            Self::Weekend => f.write_str("weekend"),
        }
    }
}

/// How the weekly quota divides between weekdays and weekends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationSplit {
    /// Fixed counts per full week.
    Explicit { weekday: u32, weekend: u32 },
    /// Split by aggregate probability mass of each pool.
    Proportional,
}

/// Resolved weekly usage profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSpec {
    /// Activations in a full week (> 0).
    pub activations_per_week: u32,
    pub split: ActivationSplit,
    pub weekday: HourProbabilities,
    pub weekend: HourProbabilities,
}

impl ScheduleSpec {
    /// Preference ranges for a day type.
    pub fn probabilities(&self, day_type: DayType) -> &HourProbabilities {
        match day_type {
            DayType::Weekday => &self.weekday,
            DayType::Weekend => &self.weekend,
        }
    }
}

/// Either a weekly probabilistic schedule or the legacy daily count.
#[derive(Debug, Clone, PartialEq)]
pub enum UsageProfile {
    Weekly(ScheduleSpec),
    Daily { activations_per_day: u32 },
}

/// One run of an appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Activation {
    pub start: NaiveDateTime,
    pub duration: TimeDelta,
    pub day_type: DayType,
}

impl Activation {
    /// Exclusive end of the activation interval.
    pub fn end(&self) -> NaiveDateTime {
        self.start + self.duration
    }

    /// Returns `true` when the two half-open intervals intersect.
    pub fn overlaps(&self, other: &Activation) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// Activations planned for one ISO week, ordered by start time.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyPlan {
    pub week: IsoWeek,
    pub activations: Vec<Activation>,
}

impl WeeklyPlan {
    pub fn len(&self) -> usize {
        self.activations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activations.is_empty()
    }

    /// Number of activations starting on the given day type.
    pub fn count(&self, day_type: DayType) -> usize {
        self.activations
            .iter()
            .filter(|a| a.day_type == day_type)
            .count()
    }
}

/// Formats an ISO week as `YYYY-Www`.
pub fn week_label(week: IsoWeek) -> String {
    format!("{}-W{:02}", week.year(), week.week())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, d)
            .and_then(|d| d.and_hms_opt(h, 0, 0))
            .unwrap_or_default()
    }

    #[test]
    fn day_type_classification() {
        // 2024-07-01 is a Monday
        let monday = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap_or_default();
        assert_eq!(DayType::of(monday), DayType::Weekday);
        assert_eq!(DayType::of(monday + TimeDelta::days(5)), DayType::Weekend);
        assert_eq!(DayType::of(monday + TimeDelta::days(6)), DayType::Weekend);
        assert_eq!(DayType::of(monday + TimeDelta::days(7)), DayType::Weekday);
    }

    #[test]
    fn adjacent_activations_do_not_overlap() {
        let a = Activation {
            start: at(1, 8),
            duration: TimeDelta::hours(1),
            day_type: DayType::Weekday,
        };
        let b = Activation {
            start: at(1, 9),
            ..a
        };
        let c = Activation {
            start: at(1, 8) + TimeDelta::minutes(30),
            ..a
        };
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn week_label_is_iso() {
        assert_eq!(week_label(at(1, 0).date().iso_week()), "2024-W27");
    }
}
