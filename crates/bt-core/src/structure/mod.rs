//! Bayesian structure: typed nodes and directed causal edges.
//!
//! A [`BayesianStructure`] is built once from bowtie rows (see [`builder`])
//! and never mutated afterwards. Derived views, such as the cycle-free
//! structure used for parameterization, are new values.

pub mod builder;
pub mod cycles;
pub mod input;

pub use builder::{build_structure, StructureBuilder};
pub use cycles::{break_cycles, cyclic_components, CycleBreak};
pub use input::rows_from_json;

use bt_common::{Error, NodeId, NodeType, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A typed network node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
    /// Display label exactly as it appeared in the source rows.
    pub original_name: String,
}

/// Causal relationship category of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    ActivityPressure,
    PressureProblem,
    ControlPressure,
    EscalationMitigation,
    EscalationProblem,
    ProblemConsequence,
    MitigationConsequence,
}

impl EdgeType {
    /// Endpoint types this edge category connects.
    pub fn endpoints(&self) -> (NodeType, NodeType) {
        match self {
            EdgeType::ActivityPressure => (NodeType::Activity, NodeType::Pressure),
            EdgeType::PressureProblem => (NodeType::Pressure, NodeType::Problem),
            EdgeType::ControlPressure => (NodeType::Control, NodeType::Pressure),
            EdgeType::EscalationMitigation => (NodeType::Escalation, NodeType::Mitigation),
            EdgeType::EscalationProblem => (NodeType::Escalation, NodeType::Problem),
            EdgeType::ProblemConsequence => (NodeType::Problem, NodeType::Consequence),
            EdgeType::MitigationConsequence => (NodeType::Mitigation, NodeType::Consequence),
        }
    }
}

/// A directed causal edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub edge_type: EdgeType,
}

impl Edge {
    pub fn new(from: NodeId, to: NodeId, edge_type: EdgeType) -> Self {
        Self {
            from,
            to,
            edge_type,
        }
    }
}

/// Node and edge counts per type, for summary panels and logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructureSummary {
    pub nodes: usize,
    pub edges: usize,
    pub by_type: BTreeMap<NodeType, usize>,
}

/// Nodes plus directed edges, in first-seen order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BayesianStructure {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    central_problem: Option<String>,
    #[serde(skip)]
    index: HashMap<NodeId, usize>,
}

impl PartialEq for BayesianStructure {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
            && self.edges == other.edges
            && self.central_problem == other.central_problem
    }
}

impl BayesianStructure {
    /// Assemble a structure from explicit parts.
    ///
    /// Duplicate node ids are rejected; duplicate edges are dropped. Edges
    /// may reference unknown nodes here: that is reported by the stages
    /// that need complete parent sets.
    pub fn from_parts(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        central_problem: Option<String>,
    ) -> Result<Self> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(Error::Structure(format!("duplicate node id {}", node.id)));
            }
        }
        let mut seen = HashSet::new();
        let edges = edges
            .into_iter()
            .filter(|e| seen.insert(e.clone()))
            .collect();
        Ok(Self {
            nodes,
            edges,
            central_problem,
            index,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Central problem the structure was scoped to, if any.
    pub fn central_problem(&self) -> Option<&str> {
        self.central_problem.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// Position of the node in insertion order.
    pub fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Parents in edge order.
    pub fn parents_of(&self, id: &NodeId) -> Vec<&NodeId> {
        self.edges
            .iter()
            .filter(|e| &e.to == id)
            .map(|e| &e.from)
            .fold(Vec::new(), |mut acc, p| {
                if !acc.contains(&p) {
                    acc.push(p);
                }
                acc
            })
    }

    /// Children in edge order.
    pub fn children_of(&self, id: &NodeId) -> Vec<&NodeId> {
        self.edges
            .iter()
            .filter(|e| &e.from == id)
            .map(|e| &e.to)
            .fold(Vec::new(), |mut acc, c| {
                if !acc.contains(&c) {
                    acc.push(c);
                }
                acc
            })
    }

    /// Nodes without incoming edges.
    pub fn roots(&self) -> Vec<&Node> {
        let targets: HashSet<&NodeId> = self.edges.iter().map(|e| &e.to).collect();
        self.nodes
            .iter()
            .filter(|n| !targets.contains(&n.id))
            .collect()
    }

    /// Nodes of one type, in insertion order.
    pub fn nodes_of_type(&self, node_type: NodeType) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.node_type == node_type)
    }

    /// First edge whose endpoint is not a known node.
    pub fn dangling_edge(&self) -> Option<(&Edge, &NodeId)> {
        self.edges.iter().find_map(|e| {
            if !self.contains(&e.from) {
                Some((e, &e.from))
            } else if !self.contains(&e.to) {
                Some((e, &e.to))
            } else {
                None
            }
        })
    }

    /// Fail with a structure error if any edge dangles.
    pub fn check_references(&self) -> Result<()> {
        match self.dangling_edge() {
            Some((edge, missing)) => Err(Error::DanglingReference {
                from: edge.from.to_string(),
                to: edge.to.to_string(),
                missing: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn summary(&self) -> StructureSummary {
        let mut by_type = BTreeMap::new();
        for node in &self.nodes {
            *by_type.entry(node.node_type).or_insert(0) += 1;
        }
        StructureSummary {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            by_type,
        }
    }

    /// Same nodes, a subset of the edges.
    pub(crate) fn with_edges(&self, edges: Vec<Edge>) -> Self {
        Self {
            nodes: self.nodes.clone(),
            edges,
            central_problem: self.central_problem.clone(),
            index: self.index.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(t: NodeType, name: &str) -> Node {
        Node {
            id: NodeId::derive(t, name),
            node_type: t,
            original_name: name.to_string(),
        }
    }

    #[test]
    fn test_from_parts_rejects_duplicate_ids() {
        let a = node(NodeType::Activity, "a");
        let err = BayesianStructure::from_parts(vec![a.clone(), a], vec![], None).unwrap_err();
        assert_eq!(err.code(), 20);
    }

    #[test]
    fn test_from_parts_dedupes_edges() {
        let a = node(NodeType::Activity, "a");
        let p = node(NodeType::Pressure, "p");
        let e = Edge::new(a.id.clone(), p.id.clone(), EdgeType::ActivityPressure);
        let s = BayesianStructure::from_parts(vec![a.clone(), p.clone()], vec![e.clone(), e], None)
            .unwrap();
        assert_eq!(s.edges().len(), 1);
        assert_eq!(s.parents_of(&p.id), vec![&a.id]);
        assert_eq!(s.children_of(&a.id), vec![&p.id]);
        assert_eq!(s.roots().len(), 1);
        assert_eq!(s.summary().by_type.get(&NodeType::Pressure), Some(&1));
    }

    #[test]
    fn test_dangling_reference_detected() {
        let a = node(NodeType::Activity, "a");
        let ghost = NodeId::derive(NodeType::Pressure, "ghost");
        let s = BayesianStructure::from_parts(
            vec![a.clone()],
            vec![Edge::new(a.id, ghost, EdgeType::ActivityPressure)],
            None,
        )
        .unwrap();
        let err = s.check_references().unwrap_err();
        assert!(matches!(err, Error::DanglingReference { .. }));
    }

    #[test]
    fn test_edge_type_endpoints() {
        assert_eq!(
            EdgeType::ControlPressure.endpoints(),
            (NodeType::Control, NodeType::Pressure)
        );
    }
}
