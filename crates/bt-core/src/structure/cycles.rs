//! Cycle breaking for hand-assembled structures.
//!
//! Rows never produce cycles on their own (edge categories only point
//! "downstream"), but structures assembled through
//! [`BayesianStructure::from_parts`] can. Edges are replayed in structure
//! order and any edge whose target already reaches its source is dropped.

use bt_common::{Error, NodeId, Result};
use petgraph::algo::{has_path_connecting, tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::warn;

use super::{BayesianStructure, Edge};
use crate::logging::event_names;

/// Acyclic view of a structure.
#[derive(Debug, Clone)]
pub struct CycleBreak {
    /// Same nodes, only the retained edges.
    pub kept: BayesianStructure,
    /// Edges dropped to break cycles, in structure order.
    pub removed: Vec<Edge>,
    /// Topological order of the retained graph.
    pub order: Vec<NodeId>,
}

fn node_graph(structure: &BayesianStructure) -> DiGraph<NodeId, ()> {
    let mut graph = DiGraph::with_capacity(structure.nodes().len(), structure.edges().len());
    for node in structure.nodes() {
        graph.add_node(node.id.clone());
    }
    graph
}

fn endpoints(structure: &BayesianStructure, edge: &Edge) -> Result<(NodeIndex, NodeIndex)> {
    let lookup = |id: &NodeId| {
        structure
            .index_of(id)
            .map(NodeIndex::new)
            .ok_or_else(|| Error::DanglingReference {
                from: edge.from.to_string(),
                to: edge.to.to_string(),
                missing: id.to_string(),
            })
    };
    Ok((lookup(&edge.from)?, lookup(&edge.to)?))
}

/// Drop the edges that would close a cycle, keeping first-inserted edges.
///
/// Fails only on dangling references; cycles are never an error.
pub fn break_cycles(structure: &BayesianStructure) -> Result<CycleBreak> {
    structure.check_references()?;

    let mut graph = node_graph(structure);
    let mut kept = Vec::with_capacity(structure.edges().len());
    let mut removed = Vec::new();

    for edge in structure.edges() {
        let (from, to) = endpoints(structure, edge)?;
        if from == to || has_path_connecting(&graph, to, from, None) {
            warn!(
                target: event_names::FIT_CYCLE_BROKEN,
                from = %edge.from,
                to = %edge.to,
                "dropping edge that closes a cycle"
            );
            removed.push(edge.clone());
            continue;
        }
        graph.add_edge(from, to, ());
        kept.push(edge.clone());
    }

    let order = toposort(&graph, None)
        .map_err(|cycle| {
            Error::Structure(format!(
                "cycle through {} survived edge pruning",
                graph[cycle.node_id()]
            ))
        })?
        .into_iter()
        .map(|ix| graph[ix].clone())
        .collect();

    Ok(CycleBreak {
        kept: structure.with_edges(kept),
        removed,
        order,
    })
}

/// Strongly connected components that contain a cycle, as node ids.
pub fn cyclic_components(structure: &BayesianStructure) -> Result<Vec<Vec<NodeId>>> {
    structure.check_references()?;
    let mut graph = node_graph(structure);
    for edge in structure.edges() {
        let (from, to) = endpoints(structure, edge)?;
        graph.add_edge(from, to, ());
    }
    Ok(tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| scc.into_iter().map(|ix| graph[ix].clone()).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{build_structure, EdgeType, Node};
    use bt_common::{BowtieRow, NodeType};

    fn node(t: NodeType, name: &str) -> Node {
        Node {
            id: NodeId::derive(t, name),
            node_type: t,
            original_name: name.to_string(),
        }
    }

    fn cyclic() -> BayesianStructure {
        let a = node(NodeType::Pressure, "a");
        let b = node(NodeType::Problem, "b");
        let c = node(NodeType::Consequence, "c");
        let edges = vec![
            Edge::new(a.id.clone(), b.id.clone(), EdgeType::PressureProblem),
            Edge::new(b.id.clone(), c.id.clone(), EdgeType::ProblemConsequence),
            Edge::new(c.id.clone(), a.id.clone(), EdgeType::PressureProblem),
        ];
        BayesianStructure::from_parts(vec![a, b, c], edges, None).unwrap()
    }

    #[test]
    fn test_row_structures_are_acyclic() {
        let rows = vec![BowtieRow::chain("A", "P", "Prob", "C")
            .with_control("K")
            .with_escalation("E")
            .with_mitigation("M")];
        let s = build_structure(&rows, None);
        let broken = break_cycles(&s).unwrap();
        assert!(broken.removed.is_empty());
        assert_eq!(broken.kept, s);
        assert_eq!(broken.order.len(), s.nodes().len());
        assert!(cyclic_components(&s).unwrap().is_empty());
    }

    #[test]
    fn test_last_edge_of_cycle_removed() {
        let s = cyclic();
        assert_eq!(cyclic_components(&s).unwrap().len(), 1);

        let broken = break_cycles(&s).unwrap();
        assert_eq!(broken.removed.len(), 1);
        assert_eq!(broken.removed[0].from.as_str(), "CONS_c");
        assert_eq!(broken.kept.edges().len(), 2);
        let order: Vec<&str> = broken.order.iter().map(NodeId::as_str).collect();
        assert_eq!(order, vec!["PRES_a", "PROB_b", "CONS_c"]);
    }

    #[test]
    fn test_self_loop_removed() {
        let a = node(NodeType::Pressure, "a");
        let s = BayesianStructure::from_parts(
            vec![a.clone()],
            vec![Edge::new(a.id.clone(), a.id.clone(), EdgeType::PressureProblem)],
            None,
        )
        .unwrap();
        assert_eq!(cyclic_components(&s).unwrap(), vec![vec![a.id.clone()]]);
        let broken = break_cycles(&s).unwrap();
        assert_eq!(broken.removed.len(), 1);
        assert!(broken.kept.edges().is_empty());
    }

    #[test]
    fn test_dangling_reference_is_error() {
        let a = node(NodeType::Pressure, "a");
        let ghost = NodeId::derive(NodeType::Problem, "ghost");
        let s = BayesianStructure::from_parts(
            vec![a.clone()],
            vec![Edge::new(a.id, ghost, EdgeType::PressureProblem)],
            None,
        )
        .unwrap();
        assert!(matches!(
            break_cycles(&s).unwrap_err(),
            Error::DanglingReference { .. }
        ));
    }
}
