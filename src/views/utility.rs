/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

/// Trailing mean over at most `window` values, emitting a value for every
/// position (the first positions average whatever is available).
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            mean(&values[start..=i])
        })
        .collect()
}

/// Pearson correlation of two equally long series.
///
/// Returns 0.0 when either series has no variance or the lengths differ.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return 0.0;
    }

    let mx = mean(xs);
    let my = mean(ys);
    let sx = stddev(xs, mx);
    let sy = stddev(ys, my);
    if sx == 0.0 || sy == 0.0 {
        return 0.0;
    }

    let cov = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mx) * (y - my))
        .sum::<f64>()
        / xs.len() as f64;

    (cov / (sx * sy)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_stddev() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 5.0), 2.0);
    }

    #[test]
    fn test_moving_average_min_periods_one() {
        let ma = moving_average(&[2.0, 4.0, 6.0, 8.0], 2);
        assert_eq!(ma, vec![2.0, 3.0, 5.0, 7.0]);
        assert!(moving_average(&[], 7).is_empty());
    }

    #[test]
    fn test_moving_average_zero_window_acts_as_one() {
        assert_eq!(moving_average(&[1.0, 5.0], 0), vec![1.0, 5.0]);
    }

    #[test]
    fn test_pearson() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&xs, &[2.0, 4.0, 6.0, 8.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&xs, &[8.0, 6.0, 4.0, 2.0]) + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&xs, &[3.0, 3.0, 3.0, 3.0]), 0.0);
        assert_eq!(pearson(&xs, &[1.0]), 0.0);
    }
}
