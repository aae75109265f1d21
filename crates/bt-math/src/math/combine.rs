//! Combination rules for heuristic conditional distributions.

/// Noisy-OR: probability that at least one active cause fires.
///
/// P = 1 - (1 - leak) · Π_i (1 - s_i), with each term clamped to [0, 1].
pub fn noisy_or(leak: f64, strengths: &[f64]) -> f64 {
    let mut off = 1.0 - leak.clamp(0.0, 1.0);
    for s in strengths {
        off *= 1.0 - s.clamp(0.0, 1.0);
    }
    1.0 - off
}

/// Linear interpolation between two probability vectors.
///
/// `t` is clamped to [0, 1]. Both inputs must have equal length; the shorter
/// length wins otherwise.
pub fn interpolate(low: &[f64], high: &[f64], t: f64) -> Vec<f64> {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    low.iter()
        .zip(high.iter())
        .map(|(l, h)| (1.0 - t) * l + t * h)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noisy_or_no_causes_is_leak() {
        assert!((noisy_or(0.05, &[]) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn noisy_or_two_causes() {
        let p = noisy_or(0.0, &[0.5, 0.5]);
        assert!((p - 0.75).abs() < 1e-12);
    }

    #[test]
    fn interpolate_endpoints() {
        let low = [0.7, 0.2, 0.1];
        let high = [0.1, 0.3, 0.6];
        assert_eq!(interpolate(&low, &high, 0.0), low.to_vec());
        assert_eq!(interpolate(&low, &high, 2.0), high.to_vec());
        let mid = interpolate(&low, &high, 0.5);
        assert!((mid.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
}
