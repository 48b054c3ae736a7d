//! Summary statistics over one bucket of values

/// Order-independent summary of a non-empty list of values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation (divides by `count`, not `count - 1`)
    pub std_dev: f64,
    pub count: usize,
}

/// Compute avg/min/max/population stddev/count
///
/// Values are accumulated in sorted order so the floating point sums, and
/// therefore every field of the result, are identical for any permutation of
/// the input.
///
/// # Panics
///
/// If `values` is empty. Buckets are never empty, so this is a caller bug.
pub fn summarize(values: &[f64]) -> Summary {
    assert!(!values.is_empty(), "summarize called on an empty bucket");

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let min = sorted[0];
    let max = sorted[count - 1];

    let (mut avg, mut std_dev) = mean_and_std_dev(&sorted);

    // Near f64::MAX the sums overflow; redo the pass on values scaled into [-1, 1]
    if !avg.is_finite() || !std_dev.is_finite() {
        let scale = min.abs().max(max.abs());
        let scaled: Vec<f64> = sorted.iter().map(|v| v / scale).collect();
        let (scaled_avg, scaled_std_dev) = mean_and_std_dev(&scaled);
        avg = scaled_avg * scale;
        std_dev = scaled_std_dev * scale;
    }

    Summary {
        avg,
        min,
        max,
        std_dev,
        count,
    }
}

fn mean_and_std_dev(sorted: &[f64]) -> (f64, f64) {
    let count = sorted.len() as f64;
    let avg = sorted.iter().sum::<f64>() / count;

    if sorted.len() == 1 {
        return (avg, 0.0);
    }

    let sum_sq: f64 = sorted.iter().map(|v| (v - avg) * (v - avg)).sum();
    (avg, (sum_sq / count).sqrt())
}
