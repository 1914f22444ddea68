//! Dynamic time warping inside a Sakoe–Chiba band.

/// Band half-width as a fraction of the longer sequence.
const BAND_FRACTION: f64 = 0.1;
/// Upper bound on the band half-width, keeping memory linear in length.
const MAX_RADIUS: usize = 256;
const MIN_RADIUS: usize = 2;

/// Warping path between `a` and `b` as `(i, j)` index pairs, from `(0, 0)`
/// to `(a.len() - 1, b.len() - 1)`, minimising the summed `|a_i - b_j|`.
///
/// Returns an empty path if either sequence is empty.
pub fn warping_path(a: &[f64], b: &[f64]) -> Vec<(usize, usize)> {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return Vec::new();
    }

    let radius = ((n.max(m) as f64 * BAND_FRACTION).ceil() as usize).clamp(MIN_RADIUS, MAX_RADIUS);
    let band = Band::new(n, m, radius);
    let mut cost = vec![f64::INFINITY; band.cells()];

    for i in 0..n {
        let (lo, hi) = band.range(i);
        for j in lo..=hi {
            let d = (a[i] - b[j]).abs();
            let prev = if i == 0 && j == 0 {
                0.0
            } else {
                let up = if i > 0 { band.get(&cost, i - 1, j) } else { f64::INFINITY };
                let left = if j > 0 { band.get(&cost, i, j - 1) } else { f64::INFINITY };
                let diag = if i > 0 && j > 0 {
                    band.get(&cost, i - 1, j - 1)
                } else {
                    f64::INFINITY
                };
                diag.min(up).min(left)
            };
            if let Some(idx) = band.index(i, j) {
                cost[idx] = d + prev;
            }
        }
    }

    let mut path = vec![(n - 1, m - 1)];
    let (mut i, mut j) = (n - 1, m - 1);
    while i > 0 || j > 0 {
        (i, j) = if i == 0 {
            (0, j - 1)
        } else if j == 0 {
            (i - 1, 0)
        } else {
            let diag = band.get(&cost, i - 1, j - 1);
            let up = band.get(&cost, i - 1, j);
            let left = band.get(&cost, i, j - 1);
            if diag <= up && diag <= left {
                (i - 1, j - 1)
            } else if up <= left {
                (i - 1, j)
            } else {
                (i, j - 1)
            }
        };
        path.push((i, j));
    }
    path.reverse();
    path
}

/// Warps `template` onto the time axis of `reference`, averaging every
/// template sample mapped to the same reference index.
pub fn align(template: &[f64], reference: &[f64]) -> Vec<f64> {
    let mut sums = vec![0.0; reference.len()];
    let mut counts = vec![0usize; reference.len()];
    for (i, j) in warping_path(template, reference) {
        sums[j] += template[i];
        counts[j] += 1;
    }
    sums.iter()
        .zip(&counts)
        .map(|(s, &c)| s / c.max(1) as f64)
        .collect()
}

/// Row-compressed band of cells around the scaled diagonal.
struct Band {
    n: usize,
    m: usize,
    radius: usize,
    width: usize,
}

impl Band {
    fn new(n: usize, m: usize, radius: usize) -> Self {
        Self {
            n,
            m,
            radius,
            width: 2 * radius + 1,
        }
    }

    fn cells(&self) -> usize {
        self.n * self.width
    }

    fn center(&self, i: usize) -> usize {
        if self.n <= 1 {
            return 0;
        }
        ((i as f64) * (self.m - 1) as f64 / (self.n - 1) as f64).round() as usize
    }

    /// Inclusive column range covered in row `i`.
    fn range(&self, i: usize) -> (usize, usize) {
        let c = self.center(i);
        let lo = c.saturating_sub(self.radius);
        let hi = (c + self.radius).min(self.m - 1);
        (lo, hi)
    }

    fn index(&self, i: usize, j: usize) -> Option<usize> {
        let (lo, hi) = self.range(i);
        if j < lo || j > hi {
            return None;
        }
        let offset = j + self.radius - self.center(i);
        Some(i * self.width + offset)
    }

    fn get(&self, cost: &[f64], i: usize, j: usize) -> f64 {
        self.index(i, j).map_or(f64::INFINITY, |idx| cost[idx])
    }
}
