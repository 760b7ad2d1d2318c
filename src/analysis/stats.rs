//! Column statistics used by scoring and the quadrant index

/// Rescale to [0, 1] using the observed minimum and maximum.
///
/// A constant column maps to all zeros.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let range = max - min;
    if !range.is_finite() || range == 0.0 {
        return vec![0.0; values.len()];
    }

    values.iter().map(|&v| (v - min) / range).collect()
}

/// Quantile with linear interpolation between closest ranks
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q = q.clamp(0.0, 1.0);
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Percentile rank in (0, 1]; tied values share their average rank
pub fn percentile_rank(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start;
        while end + 1 < n && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        // positions start..=end hold ranks start+1..=end+1
        let average_rank = (start + end + 2) as f64 / 2.0;
        for &index in &order[start..=end] {
            ranks[index] = average_rank / n as f64;
        }
        start = end + 1;
    }

    ranks
}

/// Percentile rank over the present values only; missing entries stay missing
/// and do not count towards n
pub fn percentile_rank_present(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let mut ranks = percentile_rank(&present).into_iter();

    values
        .iter()
        .map(|v| v.and_then(|_| ranks.next()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_extremes_are_exact() {
        let values = vec![3.7, -1.25, 12.9, 0.4, 12.9];
        let normalized = min_max_normalize(&values);

        assert_eq!(normalized[1], 0.0);
        assert_eq!(normalized[2], 1.0);
        assert_eq!(normalized[4], 1.0);
        assert!(normalized.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_min_max_constant_and_empty() {
        assert_eq!(min_max_normalize(&[5.0, 5.0, 5.0]), vec![0.0, 0.0, 0.0]);
        assert!(min_max_normalize(&[]).is_empty());
    }

    #[test]
    fn test_quantile_linear_interpolation() {
        let values = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 1.0), Some(4.0));
        assert_eq!(quantile(&values, 0.5), Some(2.5));
        assert!((quantile(&values, 0.8).unwrap() - 3.4).abs() < 1e-12);
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_percentile_rank_with_ties() {
        let ranks = percentile_rank(&[10.0, 20.0, 20.0, 40.0]);
        assert_eq!(ranks, vec![0.25, 0.625, 0.625, 1.0]);
    }

    #[test]
    fn test_percentile_rank_skips_missing() {
        let ranks = percentile_rank_present(&[Some(10.0), None, Some(30.0), Some(20.0)]);
        assert_eq!(ranks[0], Some(1.0 / 3.0));
        assert_eq!(ranks[1], None);
        assert_eq!(ranks[2], Some(1.0));
        assert_eq!(ranks[3], Some(2.0 / 3.0));
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
        assert_eq!(mean(&[]), None);
    }
}
