//! Bowtie row records.
//!
//! One row is one causal chain instance as delivered by the data-loading
//! layer. Column names match the upstream table exactly; every column is
//! optional so partially filled tables deserialize without error.

use serde::{Deserialize, Serialize};

use crate::id::NodeType;

/// Risk level column: either a numeric score or a categorical label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RiskValue {
    Number(f64),
    Text(String),
}

impl RiskValue {
    /// Numeric view of the value, parsing text when possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RiskValue::Number(v) => Some(*v),
            RiskValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

/// A single Activity → Pressure → Problem → Consequence chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BowtieRow {
    #[serde(rename = "Activity", default)]
    pub activity: Option<String>,

    #[serde(rename = "Pressure", default)]
    pub pressure: Option<String>,

    #[serde(rename = "Central_Problem", default)]
    pub central_problem: Option<String>,

    #[serde(rename = "Consequence", default)]
    pub consequence: Option<String>,

    #[serde(rename = "Preventive_Control", default)]
    pub preventive_control: Option<String>,

    #[serde(rename = "Escalation_Factor", default)]
    pub escalation_factor: Option<String>,

    #[serde(rename = "Protective_Mitigation", default)]
    pub protective_mitigation: Option<String>,

    /// 1-5 rating or probability; numeric text is accepted.
    #[serde(rename = "Likelihood", default)]
    pub likelihood: Option<RiskValue>,

    #[serde(rename = "Severity", default)]
    pub severity: Option<RiskValue>,

    #[serde(rename = "Risk_Level", default)]
    pub risk_level: Option<RiskValue>,
}

impl BowtieRow {
    /// Row with the four mandatory chain fields set.
    pub fn chain(activity: &str, pressure: &str, problem: &str, consequence: &str) -> Self {
        BowtieRow {
            activity: Some(activity.to_string()),
            pressure: Some(pressure.to_string()),
            central_problem: Some(problem.to_string()),
            consequence: Some(consequence.to_string()),
            ..Default::default()
        }
    }

    pub fn with_control(mut self, control: &str) -> Self {
        self.preventive_control = Some(control.to_string());
        self
    }

    pub fn with_escalation(mut self, escalation: &str) -> Self {
        self.escalation_factor = Some(escalation.to_string());
        self
    }

    pub fn with_mitigation(mut self, mitigation: &str) -> Self {
        self.protective_mitigation = Some(mitigation.to_string());
        self
    }

    pub fn with_ratings(mut self, likelihood: f64, severity: f64) -> Self {
        self.likelihood = Some(RiskValue::Number(likelihood));
        self.severity = Some(RiskValue::Number(severity));
        self
    }

    /// Field that feeds nodes of `node_type`, exactly as supplied.
    pub fn raw_label(&self, node_type: NodeType) -> Option<&str> {
        let raw = match node_type {
            NodeType::Activity => &self.activity,
            NodeType::Pressure => &self.pressure,
            NodeType::Control => &self.preventive_control,
            NodeType::Escalation => &self.escalation_factor,
            NodeType::Problem => &self.central_problem,
            NodeType::Mitigation => &self.protective_mitigation,
            NodeType::Consequence => &self.consequence,
        };
        raw.as_deref()
    }

    /// Trimmed, non-empty label of the field that feeds nodes of `node_type`.
    pub fn label(&self, node_type: NodeType) -> Option<&str> {
        self.raw_label(node_type)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// True when no causal field carries a label.
    pub fn is_empty_chain(&self) -> bool {
        NodeType::all().iter().all(|t| self.label(*t).is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_upstream_columns() {
        let json = r#"{
            "Activity": "Shipping",
            "Pressure": "Oil spill",
            "Central_Problem": "Water Pollution",
            "Consequence": "Ecosystem Damage",
            "Preventive_Control": "Double hull",
            "Likelihood": 3,
            "Severity": 4,
            "Risk_Level": "High"
        }"#;
        let row: BowtieRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.label(NodeType::Activity), Some("Shipping"));
        assert_eq!(row.label(NodeType::Control), Some("Double hull"));
        assert_eq!(row.label(NodeType::Mitigation), None);
        assert_eq!(row.likelihood, Some(RiskValue::Number(3.0)));
        assert_eq!(row.risk_level, Some(RiskValue::Text("High".into())));
        assert_eq!(row.risk_level.as_ref().and_then(RiskValue::as_f64), None);
    }

    #[test]
    fn test_missing_columns_tolerated() {
        let row: BowtieRow = serde_json::from_str(r#"{"Central_Problem": "Eutrophication"}"#).unwrap();
        assert_eq!(row.label(NodeType::Problem), Some("Eutrophication"));
        assert!(row.risk_level.is_none());
    }

    #[test]
    fn test_blank_labels_are_absent() {
        let mut row = BowtieRow::chain("  ", "", "P", "C");
        assert_eq!(row.label(NodeType::Activity), None);
        assert_eq!(row.label(NodeType::Pressure), None);
        assert!(!row.is_empty_chain());
        row.central_problem = None;
        row.consequence = Some(" ".into());
        assert!(row.is_empty_chain());
    }

    #[test]
    fn test_numeric_risk_level() {
        let row: BowtieRow = serde_json::from_str(r#"{"Risk_Level": 12}"#).unwrap();
        assert_eq!(row.risk_level.as_ref().and_then(RiskValue::as_f64), Some(12.0));
        let row: BowtieRow = serde_json::from_str(r#"{"Risk_Level": "3.5"}"#).unwrap();
        assert_eq!(row.risk_level.as_ref().and_then(RiskValue::as_f64), Some(3.5));
    }

    #[test]
    fn test_text_ratings_accepted() {
        let row: BowtieRow =
            serde_json::from_str(r#"{"Likelihood": "4", "Severity": " 2.5 "}"#).unwrap();
        assert_eq!(row.likelihood.as_ref().and_then(RiskValue::as_f64), Some(4.0));
        assert_eq!(row.severity.as_ref().and_then(RiskValue::as_f64), Some(2.5));
    }

    #[test]
    fn test_raw_label_keeps_whitespace() {
        let row = BowtieRow::chain("  Shipping ", "P", "Prob", "C");
        assert_eq!(row.raw_label(NodeType::Activity), Some("  Shipping "));
        assert_eq!(row.label(NodeType::Activity), Some("Shipping"));
    }
}
