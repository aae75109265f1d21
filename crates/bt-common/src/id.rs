//! Node types and node identity.
//!
//! A node is identified by `{PREFIX}_{sanitized label}`. Ids are only built
//! through [`NodeId::derive`] (or validated by [`NodeId::parse`]), so every id
//! that reaches the graph is safe to use as an engine identifier:
//! ASCII letters, digits and underscores only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The seven node kinds of a bowtie network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Activity,
    Pressure,
    Control,
    Escalation,
    Problem,
    Mitigation,
    Consequence,
}

const PRESENCE_STATES: &[&str] = &["Present", "Absent"];
const EFFICACY_STATES: &[&str] = &["Effective", "Failed"];
const LEVEL_STATES: &[&str] = &["Low", "Medium", "High"];

impl NodeType {
    /// All node types in causal order.
    pub fn all() -> &'static [NodeType] {
        &[
            NodeType::Activity,
            NodeType::Pressure,
            NodeType::Control,
            NodeType::Escalation,
            NodeType::Problem,
            NodeType::Mitigation,
            NodeType::Consequence,
        ]
    }

    /// Prefix used when deriving node ids.
    pub fn prefix(&self) -> &'static str {
        match self {
            NodeType::Activity => "ACT",
            NodeType::Pressure => "PRES",
            NodeType::Control => "CTRL",
            NodeType::Escalation => "ESC",
            NodeType::Problem => "PROB",
            NodeType::Mitigation => "MIT",
            NodeType::Consequence => "CONS",
        }
    }

    /// Discrete state domain for nodes of this type.
    pub fn states(&self) -> &'static [&'static str] {
        match self {
            NodeType::Activity | NodeType::Pressure | NodeType::Escalation => PRESENCE_STATES,
            NodeType::Control | NodeType::Mitigation => EFFICACY_STATES,
            NodeType::Problem | NodeType::Consequence => LEVEL_STATES,
        }
    }

    /// Number of states in the domain.
    pub fn cardinality(&self) -> usize {
        self.states().len()
    }

    /// Index of the state that represents elevated risk.
    pub fn risky_state(&self) -> usize {
        match self {
            NodeType::Activity | NodeType::Pressure | NodeType::Escalation => 0,
            NodeType::Control | NodeType::Mitigation => 1,
            NodeType::Problem | NodeType::Consequence => 2,
        }
    }

    /// Index of a state name, case-insensitive.
    pub fn state_index(&self, state: &str) -> Option<usize> {
        let state = state.trim();
        self.states()
            .iter()
            .position(|s| s.eq_ignore_ascii_case(state))
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeType::Activity => "activity",
            NodeType::Pressure => "pressure",
            NodeType::Control => "control",
            NodeType::Escalation => "escalation",
            NodeType::Problem => "problem",
            NodeType::Mitigation => "mitigation",
            NodeType::Consequence => "consequence",
        };
        write!(f, "{}", s)
    }
}

/// Sanitized node identifier.
///
/// Format: `<PREFIX>_<label>` where label only contains `[A-Za-z0-9_]`.
/// Example: `PROB_Water_Pollution`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Derive the id for a node of `node_type` with display label `label`.
    pub fn derive(node_type: NodeType, label: &str) -> Self {
        NodeId(format!("{}_{}", node_type.prefix(), sanitize_label(label)))
    }

    /// Parse and validate an externally supplied id.
    pub fn parse(s: &str) -> Option<Self> {
        let (prefix, rest) = s.split_once('_')?;
        if !NodeType::all().iter().any(|t| t.prefix() == prefix) {
            return None;
        }
        if rest.is_empty() || !rest.chars().all(is_id_char) {
            return None;
        }
        Some(NodeId(s.to_string()))
    }

    /// Same id with a numeric disambiguation suffix (`_2`, `_3`, ...).
    pub fn with_suffix(&self, n: usize) -> Self {
        NodeId(format!("{}_{}", self.0, n))
    }

    /// Node type encoded in the prefix.
    pub fn node_type(&self) -> Option<NodeType> {
        let prefix = self.0.split('_').next()?;
        NodeType::all().iter().copied().find(|t| t.prefix() == prefix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for NodeId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        NodeId::parse(&value).ok_or_else(|| format!("invalid node id: {value}"))
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`, collapse runs of
/// underscores and trim them from both ends.
pub fn sanitize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut last_underscore = false;
    for c in label.trim().chars() {
        let c = if is_id_char(c) { c } else { '_' };
        if c == '_' {
            if !last_underscore {
                out.push('_');
            }
            last_underscore = true;
        } else {
            out.push(c);
            last_underscore = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}
