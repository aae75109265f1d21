//! Risk score discretization.
//!
//! Two input conventions share one entry point:
//! - values in `[0, 1)` are probabilities, split into equal-width bands with
//!   inclusive upper bounds (`<= 1/3` Low, `<= 2/3` Medium, else High)
//! - values `>= 1` are 1-5 ratings (`< 2.5` Low, `<= 3.5` Medium, else High)
//!
//! Missing, NaN and unparseable input map to `None`, never to an error.

use bt_common::row::RiskValue;
use bt_common::Error;
use tracing::warn;

use crate::logging::event_names;

/// Level names used when the caller supplies none (or too few).
pub const DEFAULT_LEVELS: [&str; 3] = ["Low", "Medium", "High"];

/// A raw risk score as it arrives from rows or callers.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskInput {
    Number(f64),
    Text(String),
    Missing,
}

impl RiskInput {
    /// Numeric value, if there is one.
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            RiskInput::Number(v) => *v,
            RiskInput::Text(s) => s.trim().parse::<f64>().ok()?,
            RiskInput::Missing => return None,
        };
        (!v.is_nan()).then_some(v)
    }
}

impl From<f64> for RiskInput {
    fn from(v: f64) -> Self {
        RiskInput::Number(v)
    }
}

impl From<Option<f64>> for RiskInput {
    fn from(v: Option<f64>) -> Self {
        v.map_or(RiskInput::Missing, RiskInput::Number)
    }
}

impl From<&str> for RiskInput {
    fn from(s: &str) -> Self {
        RiskInput::Text(s.to_string())
    }
}

impl From<String> for RiskInput {
    fn from(s: String) -> Self {
        RiskInput::Text(s)
    }
}

/// First element of a vector; an empty slice is missing.
impl From<&[f64]> for RiskInput {
    fn from(v: &[f64]) -> Self {
        v.first().copied().into()
    }
}

impl From<&RiskValue> for RiskInput {
    fn from(v: &RiskValue) -> Self {
        match v {
            RiskValue::Number(n) => RiskInput::Number(*n),
            RiskValue::Text(s) => RiskInput::Text(s.clone()),
        }
    }
}

/// Discretize `value` into one of `levels`.
///
/// Fewer than three levels is a configuration slip: it is logged and the
/// default Low/Medium/High set is used instead.
pub fn discretize_risk_level(value: impl Into<RiskInput>, levels: &[&str]) -> Option<String> {
    let levels = effective_levels(levels);
    level_index(&value.into(), levels.len()).map(|i| levels[i].to_string())
}

/// Vectorised [`discretize_risk_level`].
pub fn discretize_all(values: &[f64], levels: &[&str]) -> Vec<Option<String>> {
    let levels = effective_levels(levels);
    values
        .iter()
        .map(|&v| level_index(&RiskInput::Number(v), levels.len()).map(|i| levels[i].to_string()))
        .collect()
}

fn effective_levels<'a>(levels: &'a [&'a str]) -> &'a [&'a str] {
    if levels.len() < 3 {
        let err = Error::validation(
            "levels",
            format!("{} supplied, need at least 3", levels.len()),
        );
        warn!(
            target: event_names::DISCRETIZE_LEVELS,
            supplied = levels.len(),
            code = err.code(),
            error = %err,
            "using Low/Medium/High"
        );
        &DEFAULT_LEVELS
    } else {
        levels
    }
}

/// Ordinal band of `value` among `n` levels (`n >= 1`).
pub fn level_index(value: &RiskInput, n: usize) -> Option<usize> {
    let mut v = value.as_f64()?;
    if n == 0 {
        return None;
    }
    if v < 0.0 {
        let err = Error::validation("risk value", format!("{v} is negative"));
        warn!(
            target: event_names::DISCRETIZE_NEGATIVE,
            value = v,
            code = err.code(),
            error = %err,
            "clamped to 0"
        );
        v = 0.0;
    }

    if v < 1.0 {
        return Some(probability_band(v, n));
    }
    if n == 3 {
        return Some(if v < 2.5 {
            0
        } else if v <= 3.5 {
            1
        } else {
            2
        });
    }
    Some(probability_band(((v - 1.0) / 4.0).min(1.0), n))
}

fn probability_band(p: f64, n: usize) -> usize {
    (0..n)
        .find(|&k| p <= (k + 1) as f64 / n as f64)
        .unwrap_or(n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_log::{capture_events, event_names_of};

    fn d(v: impl Into<RiskInput>) -> Option<String> {
        discretize_risk_level(v, &DEFAULT_LEVELS)
    }

    #[test]
    fn test_probability_scale_boundaries() {
        assert_eq!(d(0.0).as_deref(), Some("Low"));
        assert_eq!(d(0.33).as_deref(), Some("Low"));
        assert_eq!(d(0.34).as_deref(), Some("Medium"));
        assert_eq!(d(0.66).as_deref(), Some("Medium"));
        assert_eq!(d(0.67).as_deref(), Some("High"));
        assert_eq!(d(0.99).as_deref(), Some("High"));
    }

    #[test]
    fn test_rating_scale_boundaries() {
        assert_eq!(d(1.0).as_deref(), Some("Low"));
        assert_eq!(d(2.0).as_deref(), Some("Low"));
        assert_eq!(d(2.5).as_deref(), Some("Medium"));
        assert_eq!(d(3.5).as_deref(), Some("Medium"));
        assert_eq!(d(4.0).as_deref(), Some("High"));
        assert_eq!(d(5.0).as_deref(), Some("High"));
    }

    #[test]
    fn test_missing_values() {
        assert_eq!(d(None::<f64>), None);
        assert_eq!(d(f64::NAN), None);
        assert_eq!(d(&[] as &[f64]), None);
        assert_eq!(d("not a number"), None);
        assert_eq!(d(RiskInput::Missing), None);
    }

    #[test]
    fn test_text_is_coerced() {
        assert_eq!(d("4").as_deref(), Some("High"));
        assert_eq!(d(" 0.2 ").as_deref(), Some("Low"));
        assert_eq!(d(&[0.5, 0.9][..]).as_deref(), Some("Medium"));
    }

    #[test]
    fn test_negative_clamped_to_lowest() {
        let (level, events) = capture_events(|| d(-0.5));
        assert_eq!(level.as_deref(), Some("Low"));
        assert_eq!(event_names_of(&events), vec![event_names::DISCRETIZE_NEGATIVE]);
        assert_eq!(events[0]["level"], "warn");
        assert_eq!(events[0]["fields"]["value"], -0.5);
        assert_eq!(events[0]["fields"]["code"], 40);
    }

    #[test]
    fn test_in_range_values_log_nothing() {
        let (_, events) = capture_events(|| d(0.5));
        assert!(events.is_empty());
    }

    #[test]
    fn test_custom_levels() {
        let levels = ["Negligible", "Minor", "Moderate", "Major", "Severe"];
        assert_eq!(discretize_risk_level(0.1, &levels).as_deref(), Some("Negligible"));
        assert_eq!(discretize_risk_level(0.5, &levels).as_deref(), Some("Moderate"));
        assert_eq!(discretize_risk_level(5.0, &levels).as_deref(), Some("Severe"));
        assert_eq!(discretize_risk_level(1.0, &levels).as_deref(), Some("Negligible"));
    }

    #[test]
    fn test_too_few_levels_fall_back() {
        let (level, events) = capture_events(|| discretize_risk_level(0.9, &["lo", "hi"]));
        assert_eq!(level.as_deref(), Some("High"));
        assert_eq!(event_names_of(&events), vec![event_names::DISCRETIZE_LEVELS]);
        assert_eq!(events[0]["fields"]["supplied"], 2);
    }

    #[test]
    fn test_discretize_all() {
        let out = discretize_all(&[0.1, f64::NAN, 4.2], &DEFAULT_LEVELS);
        assert_eq!(
            out,
            vec![Some("Low".to_string()), None, Some("High".to_string())]
        );
    }
}
