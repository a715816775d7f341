//! Distribution statistics over sampled entry sizes.

/// Summary of one sorted size population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeDistribution {
    pub count: usize,
    /// Integer mean, truncated.
    pub avg: u64,
    pub median: u64,
    pub p95: u64,
    pub p99: u64,
    pub stddev: f64,
}

impl SizeDistribution {
    /// Compute the distribution of `sizes`. Returns `None` for an empty slice.
    ///
    /// The slice is sorted in place.
    pub fn from_sizes(sizes: &mut [u64]) -> Option<Self> {
        if sizes.is_empty() {
            return None;
        }
        sizes.sort_unstable();

        let count = sizes.len();
        let sum: u128 = sizes.iter().map(|&s| s as u128).sum();
        let avg = (sum / count as u128) as u64;

        let variance = sizes
            .iter()
            .map(|&s| {
                let diff = s as f64 - avg as f64;
                diff * diff
            })
            .sum::<f64>()
            / count as f64;

        Some(Self {
            count,
            avg,
            median: sizes[clamped_index(count, count / 2)],
            p95: percentile(sizes, 0.95),
            p99: percentile(sizes, 0.99),
            stddev: variance.sqrt(),
        })
    }

    /// `stddev / avg`, or 0 when the mean is 0.
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.avg == 0 {
            0.0
        } else {
            self.stddev / self.avg as f64
        }
    }

    /// `max(0, 100 - cv * 100)`: 100 for identical sizes, falling with dispersion.
    pub fn efficiency_score(&self) -> f64 {
        (100.0 - self.coefficient_of_variation() * 100.0).max(0.0)
    }
}

/// Value at `floor(len * q)` of an ascending slice, index clamped to the last element.
pub fn percentile(sorted: &[u64], q: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let raw = (sorted.len() as f64 * q).floor() as usize;
    sorted[clamped_index(sorted.len(), raw)]
}

fn clamped_index(len: usize, index: usize) -> usize {
    index.min(len.saturating_sub(1))
}
