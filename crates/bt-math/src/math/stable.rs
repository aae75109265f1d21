//! Numerically stable primitives for probability vectors.

/// Normalize non-negative weights in place so they sum to 1.
///
/// Returns the pre-normalization total. A zero or non-finite total leaves
/// the weights untouched so callers can detect the degenerate case.
pub fn normalize_in_place(weights: &mut [f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() {
        for w in weights.iter_mut() {
            *w /= total;
        }
    }
    total
}

/// Normalize weights into a fresh probability vector (uniform on a zero total).
pub fn normalize_probs(weights: &[f64]) -> Vec<f64> {
    let mut out = weights.to_vec();
    let total = normalize_in_place(&mut out);
    if !(total > 0.0 && total.is_finite()) && !out.is_empty() {
        let u = 1.0 / out.len() as f64;
        out.iter_mut().for_each(|w| *w = u);
    }
    out
}

/// Clamp a probability into `[eps, 1 - eps]`.
pub fn clamp_probability(p: f64, eps: f64) -> f64 {
    if p.is_nan() {
        return 0.5;
    }
    p.clamp(eps, 1.0 - eps)
}

/// True when `probs` sums to one within `tol` and has no negative entries.
pub fn is_distribution(probs: &[f64], tol: f64) -> bool {
    if probs.is_empty() || probs.iter().any(|p| p.is_nan() || *p < 0.0) {
        return false;
    }
    let total: f64 = probs.iter().sum();
    (total - 1.0).abs() <= tol
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn normalize_probs_zero_total_is_uniform() {
        assert_eq!(normalize_probs(&[0.0, 0.0]), vec![0.5, 0.5]);
        let out = normalize_probs(&[1.0, 3.0]);
        assert!(approx_eq(out[0], 0.25, 1e-12));
    }

    #[test]
    fn normalize_in_place_reports_degenerate_total() {
        let mut w = [0.0, 0.0, 0.0];
        assert_eq!(normalize_in_place(&mut w), 0.0);
        assert_eq!(w, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn clamp_and_check() {
        assert_eq!(clamp_probability(0.0, 0.01), 0.01);
        assert_eq!(clamp_probability(1.0, 0.01), 0.99);
        assert_eq!(clamp_probability(f64::NAN, 0.01), 0.5);
        assert!(is_distribution(&[0.2, 0.3, 0.5], 0.01));
        assert!(!is_distribution(&[0.2, 0.3], 0.01));
        assert!(!is_distribution(&[1.2, -0.2], 0.01));
    }
}
