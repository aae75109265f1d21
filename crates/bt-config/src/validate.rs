//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::engine::{CptDefaults, EngineConfig};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate an engine configuration semantically.
pub fn validate_config(config: &EngineConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    if config.min_rows == 0 {
        return Err(invalid("min_rows", "must be at least 1"));
    }
    if config.max_parents == 0 {
        return Err(invalid("max_parents", "must be at least 1"));
    }
    if config.max_nodes == 0 {
        return Err(invalid("max_nodes", "must be at least 1"));
    }
    if config.max_clique_states < 2 {
        return Err(invalid("max_clique_states", "must be at least 2"));
    }
    if !(config.laplace_alpha.is_finite() && config.laplace_alpha > 0.0) {
        return Err(invalid(
            "laplace_alpha",
            &format!("must be finite and > 0, got {}", config.laplace_alpha),
        ));
    }
    if !(config.prior_weight.is_finite() && config.prior_weight >= 0.0) {
        return Err(invalid(
            "prior_weight",
            &format!("must be finite and >= 0, got {}", config.prior_weight),
        ));
    }

    validate_cpt_defaults(&config.cpt)
}

fn validate_cpt_defaults(cpt: &CptDefaults) -> ValidationResult<()> {
    validate_distribution("cpt.roots.activity", &cpt.roots.activity, 2)?;
    validate_distribution("cpt.roots.pressure", &cpt.roots.pressure, 2)?;
    validate_distribution("cpt.roots.control", &cpt.roots.control, 2)?;
    validate_distribution("cpt.roots.escalation", &cpt.roots.escalation, 2)?;
    validate_distribution("cpt.roots.mitigation", &cpt.roots.mitigation, 2)?;
    validate_distribution("cpt.roots.problem", &cpt.roots.problem, 3)?;
    validate_distribution("cpt.roots.consequence", &cpt.roots.consequence, 3)?;
    validate_distribution("cpt.low_profile", &cpt.low_profile, 3)?;
    validate_distribution("cpt.high_profile", &cpt.high_profile, 3)?;

    validate_probability("cpt.activity_strength", cpt.activity_strength)?;
    validate_probability("cpt.pressure_leak", cpt.pressure_leak)?;
    validate_probability("cpt.control_efficacy", cpt.control_efficacy)?;
    validate_probability("cpt.mitigation_efficacy", cpt.mitigation_efficacy)?;
    validate_probability("cpt.escalation_penalty", cpt.escalation_penalty)?;
    validate_probability("cpt.mitigation_damping", cpt.mitigation_damping)?;

    if !(cpt.epsilon > 0.0 && cpt.epsilon < 0.5) {
        return Err(invalid(
            "cpt.epsilon",
            &format!("must be in (0, 0.5), got {}", cpt.epsilon),
        ));
    }
    Ok(())
}

fn validate_distribution(field: &str, probs: &[f64], len: usize) -> ValidationResult<()> {
    if probs.len() != len {
        return Err(invalid(
            field,
            &format!("expected {} entries, got {}", len, probs.len()),
        ));
    }
    if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(invalid(field, "entries must be finite and >= 0"));
    }
    let sum: f64 = probs.iter().sum();
    if (sum - 1.0).abs() > 0.01 {
        return Err(ValidationError::SemanticError(format!(
            "{} must sum to 1.0, got {}",
            field, sum
        )));
    }
    Ok(())
}

fn validate_probability(field: &str, p: f64) -> ValidationResult<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(invalid(field, &format!("must be in [0, 1], got {}", p)));
    }
    Ok(())
}

fn invalid(field: &str, message: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}
