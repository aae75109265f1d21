//! Critical paths from root causes to central problems.
//!
//! For each root cause (an Activity or Pressure without parents) the root is
//! clamped to Present and the path to each reachable Problem node that
//! maximises the product of downstream risky-state posteriors is found with
//! a log-domain dynamic programme over the topological order.

use std::collections::HashMap;

use bt_common::{NodeId, NodeType};
use serde::Serialize;
use tracing::{debug, warn};

use super::{risky_evidence, risky_probability};
use crate::fit::FittedNetwork;
use crate::inference::{infer, InferenceBackend};
use crate::logging::event_names;

/// One ranked path from a root cause to a Problem node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalPath {
    /// Root first, Problem last.
    pub nodes: Vec<NodeId>,
    /// Root prior risk times the product of conditional risks along the path.
    pub score: f64,
    /// Prior probability that the root is in its risky state.
    pub root_prior: f64,
    /// P(problem = High | root risky).
    pub problem_high: f64,
}

impl CriticalPath {
    pub fn root(&self) -> &NodeId {
        &self.nodes[0]
    }

    pub fn problem(&self) -> &NodeId {
        &self.nodes[self.nodes.len() - 1]
    }
}

/// Rank critical paths by score, highest first (ties by node ids).
pub fn find_critical_paths(
    backend: &dyn InferenceBackend,
    network: Option<&FittedNetwork>,
) -> Vec<CriticalPath> {
    let Some(network) = network else {
        warn!(target: event_names::ANALYSIS_NO_NETWORK, "no fitted network for critical paths");
        return Vec::new();
    };

    let structure = network.structure();
    let roots: Vec<_> = structure
        .roots()
        .into_iter()
        .filter(|n| matches!(n.node_type, NodeType::Activity | NodeType::Pressure))
        .collect();

    let mut paths = Vec::new();
    for root in roots {
        let posterior = infer(
            backend,
            Some(network),
            &risky_evidence(&root.id, root.node_type),
            None,
        );
        if posterior.is_empty() {
            warn!(
                target: event_names::ANALYSIS_ROOT_SKIPPED,
                root = %root.id,
                "no posterior for root cause"
            );
            continue;
        }
        let root_prior = network
            .cpt(&root.id)
            .map_or(0.0, |cpt| cpt.column(0)[root.node_type.risky_state()]);

        // best log-score reaching each node, with predecessor
        let mut best: HashMap<&NodeId, (f64, Option<&NodeId>)> = HashMap::new();
        best.insert(&root.id, (0.0, None));
        for id in network.order() {
            if id == &root.id {
                continue;
            }
            let Some(risk) = risky_probability(network, &posterior, id) else {
                continue;
            };
            let step = risk.ln();
            let mut chosen: Option<(f64, &NodeId)> = None;
            for parent in structure.parents_of(id) {
                if let Some(&(score, _)) = best.get(parent) {
                    let candidate = score + step;
                    if chosen.map_or(true, |(s, _)| candidate > s) {
                        chosen = Some((candidate, parent));
                    }
                }
            }
            if let Some((score, parent)) = chosen {
                best.insert(id, (score, Some(parent)));
            }
        }

        for problem in structure.nodes_of_type(NodeType::Problem) {
            let Some(&(log_score, _)) = best.get(&problem.id) else {
                continue;
            };
            let mut nodes = vec![problem.id.clone()];
            let mut cursor = &problem.id;
            while let Some(&(_, Some(prev))) = best.get(cursor) {
                nodes.push(prev.clone());
                cursor = prev;
            }
            nodes.reverse();
            paths.push(CriticalPath {
                nodes,
                score: root_prior * log_score.exp(),
                root_prior,
                problem_high: risky_probability(network, &posterior, &problem.id).unwrap_or(0.0),
            });
        }
    }

    paths.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.nodes.cmp(&b.nodes)));
    debug!(target: event_names::ANALYSIS_PATHS_RANKED, paths = paths.len(), "critical paths ranked");
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpt::build_cpts;
    use crate::fit::fit;
    use crate::inference::{JunctionTreeBackend, UnavailableBackend};
    use crate::structure::build_structure;
    use bt_common::BowtieRow;
    use bt_config::EngineConfig;

    fn fitted(rows: &[BowtieRow]) -> FittedNetwork {
        let s = build_structure(rows, None);
        fit(&s, build_cpts(&s, rows, false, &EngineConfig::default()).unwrap()).unwrap()
    }

    #[test]
    fn test_single_chain_path() {
        let net = fitted(&[BowtieRow::chain("A", "P", "Prob", "C")]);
        let paths = find_critical_paths(&JunctionTreeBackend::default(), Some(&net));
        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        let ids: Vec<&str> = path.nodes.iter().map(NodeId::as_str).collect();
        assert_eq!(ids, vec!["ACT_A", "PRES_P", "PROB_Prob"]);
        assert!((path.root_prior - 0.5).abs() < 1e-12);
        assert!(path.score > 0.0 && path.score <= path.root_prior);
        assert!(path.problem_high > 0.0 && path.problem_high < 1.0);
    }

    #[test]
    fn test_paths_ranked_by_score() {
        let rows = vec![
            BowtieRow::chain("A", "P", "Prob", "C"),
            BowtieRow::chain("B", "Q", "Prob", "C").with_control("K"),
        ];
        let paths = find_critical_paths(&JunctionTreeBackend::default(), Some(&fitted(&rows)));
        assert_eq!(paths.len(), 2);
        assert!(paths[0].score >= paths[1].score);
        // the uncontrolled pressure ranks first
        assert_eq!(paths[0].root().as_str(), "ACT_A");
        assert_eq!(paths[1].problem().as_str(), "PROB_Prob");
    }

    #[test]
    fn test_pressure_roots_count() {
        let mut row = BowtieRow::chain("", "Runoff", "Prob", "C");
        row.activity = None;
        let paths = find_critical_paths(&JunctionTreeBackend::default(), Some(&fitted(&[row])));
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].nodes.len(), 2);
        assert!((paths[0].root_prior - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_degrades_to_empty() {
        let backend = JunctionTreeBackend::default();
        assert!(find_critical_paths(&backend, None).is_empty());
        let net = fitted(&[BowtieRow::chain("A", "P", "Prob", "C")]);
        assert!(find_critical_paths(&UnavailableBackend::new("x"), Some(&net)).is_empty());
    }
}
