//! Graph structure derivation from bowtie rows.
//!
//! Each retained row contributes one node per non-empty causal field and one
//! edge per adjacent causal pair:
//!
//! ```text
//! Activity ──► Pressure ──► Problem ──► Consequence
//!                 ▲            ▲             ▲
//!              Control   Escalation ──► Mitigation
//! ```
//!
//! An escalation factor feeds the row's mitigation when there is one and the
//! central problem otherwise.

use std::collections::{HashMap, HashSet};

use bt_common::{BowtieRow, Error, NodeId, NodeType, Result};
use tracing::{debug, warn};

use super::{BayesianStructure, Edge, EdgeType, Node};
use crate::logging::event_names;

/// Build the structure for `rows`, optionally scoped to one central problem.
///
/// Never fails: empty input yields an empty structure and rows without any
/// causal field are skipped with a warning.
pub fn build_structure(rows: &[BowtieRow], central_problem: Option<&str>) -> BayesianStructure {
    let mut builder = StructureBuilder::new();
    builder.max_nodes = usize::MAX;
    match builder.build(rows, central_problem) {
        Ok(structure) => structure,
        Err(err) => unreachable!("unbounded structure build cannot fail: {err}"),
    }
}

/// Structure builder with a node budget.
#[derive(Debug, Clone)]
pub struct StructureBuilder {
    max_nodes: usize,
}

impl Default for StructureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureBuilder {
    pub fn new() -> Self {
        Self {
            max_nodes: bt_config::EngineConfig::default().max_nodes,
        }
    }

    /// Cap the number of distinct nodes; free-text columns can otherwise
    /// produce networks far too large for exact inference.
    pub fn max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn build(
        &self,
        rows: &[BowtieRow],
        central_problem: Option<&str>,
    ) -> Result<BayesianStructure> {
        let scope = central_problem.map(str::trim);
        let mut registry = IdRegistry::default();
        let mut nodes: Vec<Node> = Vec::new();
        let mut edges: Vec<Edge> = Vec::new();
        let mut seen_edges: HashSet<Edge> = HashSet::new();
        let mut retained = 0usize;

        for (row_idx, row) in rows.iter().enumerate() {
            if let Some(problem) = scope {
                if row.label(NodeType::Problem) != Some(problem) {
                    continue;
                }
            }
            if row.is_empty_chain() {
                warn!(
                    target: event_names::STRUCTURE_ROW_SKIPPED,
                    row = row_idx,
                    "row has no causal fields, skipping"
                );
                continue;
            }
            retained += 1;

            let mut ids: HashMap<NodeType, NodeId> = HashMap::new();
            for &node_type in NodeType::all() {
                let Some(label) = row.label(node_type) else {
                    continue;
                };
                let (id, is_new) = registry.register(node_type, label);
                if is_new {
                    if nodes.len() >= self.max_nodes {
                        return Err(Error::ComplexityLimit {
                            what: "structure nodes".to_string(),
                            actual: nodes.len() + 1,
                            limit: self.max_nodes,
                        });
                    }
                    nodes.push(Node {
                        id: id.clone(),
                        node_type,
                        original_name: row.raw_label(node_type).unwrap_or(label).to_string(),
                    });
                }
                ids.insert(node_type, id);
            }

            for edge in row_edges(&ids) {
                if seen_edges.insert(edge.clone()) {
                    edges.push(edge);
                }
            }
        }

        debug!(
            target: event_names::STRUCTURE_BUILT,
            rows = retained,
            nodes = nodes.len(),
            edges = edges.len(),
            "structure built"
        );

        BayesianStructure::from_parts(nodes, edges, scope.map(str::to_string))
    }
}

/// Edges implied by the node ids present in one row.
fn row_edges(ids: &HashMap<NodeType, NodeId>) -> Vec<Edge> {
    let get = |t: NodeType| ids.get(&t);
    let mut out = Vec::new();
    let mut link = |from: Option<&NodeId>, to: Option<&NodeId>, edge_type: EdgeType| {
        if let (Some(from), Some(to)) = (from, to) {
            out.push(Edge::new(from.clone(), to.clone(), edge_type));
        }
    };

    link(get(NodeType::Activity), get(NodeType::Pressure), EdgeType::ActivityPressure);
    link(get(NodeType::Pressure), get(NodeType::Problem), EdgeType::PressureProblem);
    link(get(NodeType::Control), get(NodeType::Pressure), EdgeType::ControlPressure);
    if get(NodeType::Mitigation).is_some() {
        link(
            get(NodeType::Escalation),
            get(NodeType::Mitigation),
            EdgeType::EscalationMitigation,
        );
    } else {
        link(get(NodeType::Escalation), get(NodeType::Problem), EdgeType::EscalationProblem);
    }
    link(get(NodeType::Problem), get(NodeType::Consequence), EdgeType::ProblemConsequence);
    link(
        get(NodeType::Mitigation),
        get(NodeType::Consequence),
        EdgeType::MitigationConsequence,
    );
    out
}

/// Assigns ids per (type, label), disambiguating sanitization collisions with
/// numeric suffixes in first-seen order.
#[derive(Debug, Default)]
struct IdRegistry {
    by_label: HashMap<(NodeType, String), NodeId>,
    used: HashSet<NodeId>,
}

impl IdRegistry {
    fn register(&mut self, node_type: NodeType, label: &str) -> (NodeId, bool) {
        let key = (node_type, label.to_string());
        if let Some(id) = self.by_label.get(&key) {
            return (id.clone(), false);
        }

        let base = NodeId::derive(node_type, label);
        let mut id = base.clone();
        let mut suffix = 2;
        while self.used.contains(&id) {
            id = base.with_suffix(suffix);
            suffix += 1;
        }
        if id != base {
            warn!(
                target: event_names::STRUCTURE_ID_COLLISION,
                label = label,
                base = %base,
                assigned = %id,
                "sanitized node id collision"
            );
        }

        self.used.insert(id.clone());
        self.by_label.insert(key, id.clone());
        (id, true)
    }
}
