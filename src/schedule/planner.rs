//! Activation planning: weighted sampling with guaranteed quotas.
//!
//! Each planning period (an ISO week, or a calendar day in legacy mode) is
//! planned independently with the same seeded generator:
//!
//! 1. Per-pool targets are derived from the usage profile.
//! 2. Every pool is sampled without replacement using exponential keys
//!    (`ln(u) / w`, largest first) over its normalised probability field.
//!    Zero-weight slots are never drawn; a field with no mass is uniform.
//! 3. Pools still short of their target are filled by forced placement:
//!    highest weight first, ties broken by the earliest slot.
//! 4. Any remaining shortfall is force-placed across the whole period by
//!    normalised weight, again ties to the earliest slot.
//!
//! A slot is accepted only if its interval overlaps no accepted activation
//! and the period quota stays reachable afterwards. Quotas above the period's
//! non-overlapping capacity are rejected before any sampling happens.

use chrono::{IsoWeek, TimeDelta};
use rand::{Rng, rngs::StdRng};
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::sim::window::{Segment, SimWindow};

use super::probability::ProbabilityField;
use super::types::{
    Activation, ActivationSplit, DayType, ScheduleSpec, UsageProfile, WeeklyPlan, week_label,
};

const WEEKDAY_POOL: usize = 0;
const WEEKEND_POOL: usize = 1;
const POOLS: [DayType; 2] = [DayType::Weekday, DayType::Weekend];

/// Candidate start slot.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    slot: usize,
    pool: usize,
    weight: f64,
}

/// Everything needed to plan one period.
#[derive(Debug)]
struct PeriodRequest {
    segment: Segment,
    label: String,
    candidates: Vec<Candidate>,
    pool_targets: Vec<usize>,
}

impl PeriodRequest {
    fn total_target(&self) -> usize {
        self.pool_targets.iter().sum()
    }
}

/// Plans activations for the whole window.
///
/// `duration` is the length of every activation; its slot footprint is
/// `duration` rounded up to whole output timesteps.
///
/// # Errors
///
/// Returns `GenerationError::Capacity` if any period's quota cannot fit
/// without overlap. The check covers every period before sampling starts.
pub fn plan_activations(
    profile: &UsageProfile,
    window: &SimWindow,
    duration: TimeDelta,
    rng: &mut StdRng,
) -> Result<Vec<WeeklyPlan>, GenerationError> {
    let duration_slots = window.slots_for(duration).max(1);

    let requests = match profile {
        UsageProfile::Weekly(spec) => weekly_requests(spec, window, duration_slots),
        UsageProfile::Daily {
            activations_per_day,
        } => daily_requests(*activations_per_day, window, duration_slots),
    };

    for req in &requests {
        check_capacity(req, duration_slots)?;
    }

    let mut plans: Vec<WeeklyPlan> = Vec::new();
    for req in &requests {
        let slots = plan_period(req, duration_slots, rng)?;
        debug!(
            period = %req.label,
            target = req.total_target(),
            placed = slots.len(),
            "period planned"
        );
        let activations = slots.into_iter().map(|slot| {
            let start = window.timestamp(slot);
            Activation {
                start,
                duration,
                day_type: DayType::of(start.date()),
            }
        });
        push_into_week(&mut plans, req.segment.week, activations);
    }

    Ok(plans)
}

fn push_into_week(
    plans: &mut Vec<WeeklyPlan>,
    week: IsoWeek,
    activations: impl Iterator<Item = Activation>,
) {
    match plans.last_mut() {
        Some(plan) if plan.week == week => plan.activations.extend(activations),
        _ => plans.push(WeeklyPlan {
            week,
            activations: activations.collect(),
        }),
    }
}

fn check_capacity(req: &PeriodRequest, duration_slots: usize) -> Result<(), GenerationError> {
    let required = req.total_target();
    let available = req.segment.len() / duration_slots;
    if required > available {
        return Err(GenerationError::Capacity {
            period: req.label.clone(),
            required,
            available,
            duration_slots,
        });
    }
    Ok(())
}

/// Start slots whose whole interval lies inside the segment.
fn candidate_slots(segment: &Segment, duration_slots: usize) -> std::ops::Range<usize> {
    let last = segment.end.saturating_sub(duration_slots);
    if segment.len() < duration_slots {
        segment.start..segment.start
    } else {
        segment.start..last + 1
    }
}

fn weekly_requests(
    spec: &ScheduleSpec,
    window: &SimWindow,
    duration_slots: usize,
) -> Vec<PeriodRequest> {
    // Raw fields split a proportional quota; normalised ones drive sampling.
    let fields =
        POOLS.map(|day| ProbabilityField::build(spec.probabilities(day), window.step_secs()));
    let sampling = fields.each_ref().map(ProbabilityField::normalized);
    let per_week = window.slots_per_week();
    let per_day = window.slots_per_day();

    window
        .week_segments()
        .into_iter()
        .map(|segment| {
            let candidates: Vec<Candidate> = candidate_slots(&segment, duration_slots)
                .map(|slot| {
                    let pool = pool_of(window, slot);
                    Candidate {
                        slot,
                        pool,
                        weight: sampling[pool].weight_at_seconds(window.seconds_of_day(slot)),
                    }
                })
                .collect();

            let mut pool_slots = [0usize; 2];
            let mut pool_mass = [0.0f64; 2];
            for slot in segment.start..segment.end {
                let pool = pool_of(window, slot);
                pool_slots[pool] += 1;
                pool_mass[pool] += fields[pool].weight_at_seconds(window.seconds_of_day(slot));
            }

            let pool_targets: Vec<usize> = match spec.split {
                ActivationSplit::Explicit { weekday, weekend } => [weekday, weekend]
                    .into_iter()
                    .zip(POOLS)
                    .enumerate()
                    .map(|(pool, (count, day))| {
                        let full = day.days_per_week() as usize * per_day;
                        prorate(count, pool_slots[pool], full)
                    })
                    .collect(),
                ActivationSplit::Proportional => {
                    let total = prorate(spec.activations_per_week, segment.len(), per_week);
                    let (weekday, weekend) = split_by_mass(total, pool_mass, pool_slots);
                    vec![weekday, weekend]
                }
            };

            PeriodRequest {
                label: week_label(segment.week),
                segment,
                candidates,
                pool_targets,
            }
        })
        .collect()
}

fn daily_requests(
    activations_per_day: u32,
    window: &SimWindow,
    duration_slots: usize,
) -> Vec<PeriodRequest> {
    let per_day = window.slots_per_day();
    window
        .day_segments()
        .into_iter()
        .map(|segment| {
            let candidates = candidate_slots(&segment, duration_slots)
                .map(|slot| Candidate {
                    slot,
                    pool: 0,
                    weight: 1.0,
                })
                .collect();
            PeriodRequest {
                label: segment.date.to_string(),
                pool_targets: vec![prorate(activations_per_day, segment.len(), per_day)],
                segment,
                candidates,
            }
        })
        .collect()
}

fn pool_of(window: &SimWindow, slot: usize) -> usize {
    match DayType::of(window.timestamp(slot).date()) {
        DayType::Weekday => WEEKDAY_POOL,
        DayType::Weekend => WEEKEND_POOL,
    }
}

/// `floor(count * available / full)`, exact for full periods.
fn prorate(count: u32, available: usize, full: usize) -> usize {
    if available >= full {
        return count as usize;
    }
    ((u64::from(count) * available as u64) / full as u64) as usize
}

/// Splits `total` between the pools by probability mass; weekday share is
/// rounded, weekend takes the remainder. Zero mass splits by slot count.
fn split_by_mass(total: usize, mass: [f64; 2], slots: [usize; 2]) -> (usize, usize) {
    let (wd, we) = if mass[0] + mass[1] > 0.0 {
        (mass[0], mass[1])
    } else {
        (slots[0] as f64, slots[1] as f64)
    };
    if wd + we <= 0.0 {
        return (0, 0);
    }
    let weekday = ((total as f64) * wd / (wd + we)).round() as usize;
    let weekday = weekday.min(total);
    (weekday, total - weekday)
}

/// Accepted intervals of one period plus its remaining free capacity.
struct Occupancy {
    seg_start: usize,
    seg_end: usize,
    duration: usize,
    starts: Vec<usize>,
    capacity: usize,
}

impl Occupancy {
    fn new(segment: &Segment, duration: usize) -> Self {
        Self {
            seg_start: segment.start,
            seg_end: segment.end,
            duration,
            starts: Vec::new(),
            capacity: segment.len() / duration,
        }
    }

    fn placed(&self) -> usize {
        self.starts.len()
    }

    /// Places an activation at `slot` if it overlaps nothing and `target`
    /// stays reachable afterwards.
    fn try_place(&mut self, slot: usize, target: usize) -> bool {
        let d = self.duration;
        let idx = self.starts.partition_point(|&s| s <= slot);
        let gap_start = if idx > 0 {
            self.starts[idx - 1] + d
        } else {
            self.seg_start
        };
        let gap_end = self.starts.get(idx).copied().unwrap_or(self.seg_end);
        if slot < gap_start || slot + d > gap_end {
            return false;
        }

        let before = (gap_end - gap_start) / d;
        let after = (slot - gap_start) / d + (gap_end - slot - d) / d;
        let capacity = self.capacity - before + after;
        if self.placed() + 1 + capacity < target {
            return false;
        }

        self.starts.insert(idx, slot);
        self.capacity = capacity;
        true
    }
}

fn plan_period(
    req: &PeriodRequest,
    duration_slots: usize,
    rng: &mut StdRng,
) -> Result<Vec<usize>, GenerationError> {
    let target = req.total_target();
    let mut occ = Occupancy::new(&req.segment, duration_slots);
    let mut pool_counts = vec![0usize; req.pool_targets.len()];
    let pool_mass: Vec<f64> = (0..req.pool_targets.len())
        .map(|p| {
            req.candidates
                .iter()
                .filter(|c| c.pool == p)
                .map(|c| c.weight)
                .sum()
        })
        .collect();

    // Weighted sampling without replacement, per pool.
    for (pool, &pool_target) in req.pool_targets.iter().enumerate() {
        if pool_target == 0 {
            continue;
        }
        let mut keyed: Vec<(f64, usize)> = req
            .candidates
            .iter()
            .filter(|c| c.pool == pool && c.weight > 0.0)
            .map(|c| {
                let u: f64 = 1.0 - rng.random::<f64>();
                (u.ln() / c.weight, c.slot)
            })
            .collect();
        keyed.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        for (_, slot) in keyed {
            if pool_counts[pool] >= pool_target {
                break;
            }
            if occ.try_place(slot, target) {
                pool_counts[pool] += 1;
            }
        }
    }

    // Forced placement inside each pool.
    for (pool, &pool_target) in req.pool_targets.iter().enumerate() {
        if pool_counts[pool] >= pool_target {
            continue;
        }
        warn!(
            period = %req.label,
            pool,
            missing = pool_target - pool_counts[pool],
            "weighted sampling fell short, forcing placement"
        );
        let mut ranked: Vec<&Candidate> =
            req.candidates.iter().filter(|c| c.pool == pool).collect();
        ranked.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.slot.cmp(&b.slot)));
        for c in ranked {
            if pool_counts[pool] >= pool_target {
                break;
            }
            if occ.try_place(c.slot, target) {
                pool_counts[pool] += 1;
            }
        }
    }

    // Spill any remainder across the whole period.
    if occ.placed() < target {
        warn!(
            period = %req.label,
            missing = target - occ.placed(),
            "pool capacity exhausted, placing across the period"
        );
        let normalized = |c: &Candidate| {
            if pool_mass[c.pool] > 0.0 {
                c.weight / pool_mass[c.pool]
            } else {
                0.0
            }
        };
        let mut ranked: Vec<&Candidate> = req.candidates.iter().collect();
        ranked.sort_by(|a, b| {
            normalized(b)
                .total_cmp(&normalized(a))
                .then(a.slot.cmp(&b.slot))
        });
        for c in ranked {
            if occ.placed() >= target {
                break;
            }
            occ.try_place(c.slot, target);
        }
    }

    if occ.placed() < target {
        return Err(GenerationError::Capacity {
            period: req.label.clone(),
            required: target,
            available: occ.placed(),
            duration_slots,
        });
    }

    Ok(occ.starts)
}
