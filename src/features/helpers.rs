//! Numeric helpers shared by the feature functions.

use statrs::statistics::Statistics;

/// Root mean square of `values`.
pub fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| v * v).mean().sqrt()
}

/// Geometric mean of strictly positive `values`.
pub fn geo_mean(values: &[f64]) -> f64 {
    values.geometric_mean()
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.mean()
}

/// Scale `samples` so the peak absolute amplitude is 1.
///
/// An all-zero signal is returned unchanged.
pub fn normalize(samples: &[f64]) -> Vec<f64> {
    let peak = samples.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if peak == 0.0 {
        return samples.to_vec();
    }
    samples.iter().map(|v| v / peak).collect()
}

/// Index of the largest value (first one on ties).
pub fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (idx, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((idx, v)),
        })
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms() {
        assert!((rms(&[3.0, -3.0, 3.0, -3.0]) - 3.0).abs() < 1e-12);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_geo_mean() {
        assert!((geo_mean(&[1.0, 4.0, 16.0]) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(&[2.0, -4.0, 1.0]), vec![0.5, -1.0, 0.25]);
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[1.0, 5.0, 5.0, 2.0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
