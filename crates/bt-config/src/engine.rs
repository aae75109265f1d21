//! Engine configuration types.
//!
//! Every field has a default so partial files only override what they name.

use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub schema_version: String,

    /// Minimum number of rows in scope before CPTs are estimated from data.
    pub min_rows: usize,

    /// Symmetric Dirichlet pseudo-count added to every state.
    pub laplace_alpha: f64,

    /// Pseudo-count mass placed on the default column when estimating from data.
    pub prior_weight: f64,

    /// Maximum parents per node before the CPT is considered intractable.
    pub max_parents: usize,

    /// Maximum nodes per structure (guards free-text explosions).
    pub max_nodes: usize,

    /// Maximum joint states in a single junction-tree clique.
    pub max_clique_states: usize,

    pub cpt: CptDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            min_rows: 10,
            laplace_alpha: 1.0,
            prior_weight: 2.0,
            max_parents: 12,
            max_nodes: 500,
            max_clique_states: 1 << 22,
            cpt: CptDefaults::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Parse a configuration from TOML.
    pub fn from_toml(text: &str) -> Result<Self, ValidationError> {
        toml::from_str(text).map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e)))
    }

    /// Load a configuration file, choosing the format by extension
    /// (`.toml` → TOML, anything else → JSON).
    pub fn from_file(path: &std::path::Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml(&content)
        } else {
            Self::from_json(&content)
        }
    }
}

/// Prior vectors for nodes without parents, in each type's state order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootPriors {
    /// [Present, Absent]
    pub activity: Vec<f64>,
    /// [Present, Absent]
    pub pressure: Vec<f64>,
    /// [Effective, Failed]
    pub control: Vec<f64>,
    /// [Present, Absent]
    pub escalation: Vec<f64>,
    /// [Effective, Failed]
    pub mitigation: Vec<f64>,
    /// [Low, Medium, High]
    pub problem: Vec<f64>,
    /// [Low, Medium, High]
    pub consequence: Vec<f64>,
}

impl Default for RootPriors {
    fn default() -> Self {
        Self {
            activity: vec![0.5, 0.5],
            pressure: vec![0.4, 0.6],
            control: vec![0.7, 0.3],
            escalation: vec![0.3, 0.7],
            mitigation: vec![0.7, 0.3],
            problem: vec![0.5, 0.3, 0.2],
            consequence: vec![0.5, 0.3, 0.2],
        }
    }
}

/// Parameters of the heuristic (default) CPTs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CptDefaults {
    pub roots: RootPriors,

    /// Noisy-OR strength of each Present activity on a pressure.
    pub activity_strength: f64,

    /// Probability a pressure is Present with no active cause.
    pub pressure_leak: f64,

    /// Fractional reduction of pressure probability per Effective control.
    pub control_efficacy: f64,

    /// Probability a mitigation is Effective with no escalation present.
    pub mitigation_efficacy: f64,

    /// Fractional reduction of mitigation efficacy per Present escalation.
    pub escalation_penalty: f64,

    /// Fractional reduction of consequence severity per Effective mitigation.
    pub mitigation_damping: f64,

    /// [Low, Medium, High] when no parent is in its risky state.
    pub low_profile: Vec<f64>,

    /// [Low, Medium, High] when every parent is in its risky state.
    pub high_profile: Vec<f64>,

    /// Binary probabilities are clamped into [epsilon, 1 - epsilon].
    pub epsilon: f64,
}

impl Default for CptDefaults {
    fn default() -> Self {
        Self {
            roots: RootPriors::default(),
            activity_strength: 0.6,
            pressure_leak: 0.05,
            control_efficacy: 0.6,
            mitigation_efficacy: 0.7,
            escalation_penalty: 0.4,
            mitigation_damping: 0.5,
            low_profile: vec![0.7, 0.2, 0.1],
            high_profile: vec![0.1, 0.3, 0.6],
            epsilon: 0.01,
        }
    }
}
