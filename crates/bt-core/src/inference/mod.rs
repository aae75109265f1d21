//! Posterior inference over fitted networks.
//!
//! [`infer`] is the degrading entry point: a missing network, an unavailable
//! backend, impossible evidence or an intractable network all yield an empty
//! [`InferenceResult`] and a warning instead of an error.

pub mod backend;
pub mod discretize;
pub mod factor;
pub mod junction_tree;

pub use backend::{InferenceBackend, JunctionTreeBackend, UnavailableBackend};
pub use discretize::{discretize_all, discretize_risk_level, level_index, RiskInput, DEFAULT_LEVELS};
pub use junction_tree::JunctionTree;

use std::collections::BTreeMap;

use bt_common::NodeId;
use serde::Serialize;
use tracing::{debug, warn};

use crate::fit::FittedNetwork;
use crate::logging::event_names;

/// Evidence or scenario: node id to state name.
pub type Evidence = BTreeMap<NodeId, String>;

/// Ordered `(state, probability)` pairs for one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution(Vec<(String, f64)>);

impl Distribution {
    pub fn new(states: &[String], probs: Vec<f64>) -> Self {
        Self(states.iter().cloned().zip(probs).collect())
    }

    pub fn probability(&self, state: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(s, _)| s.eq_ignore_ascii_case(state))
            .map(|(_, p)| *p)
    }

    /// Probability at a state index (0 when out of range).
    pub fn at(&self, index: usize) -> f64 {
        self.0.get(index).map_or(0.0, |(_, p)| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(s, p)| (s.as_str(), *p))
    }

    pub fn total(&self) -> f64 {
        self.0.iter().map(|(_, p)| p).sum()
    }
}

/// Posterior marginals plus the evidence that was (and was not) applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InferenceResult {
    pub marginals: BTreeMap<NodeId, Distribution>,
    pub evidence: Evidence,
    pub rejected_evidence: Evidence,
}

impl InferenceResult {
    pub fn is_empty(&self) -> bool {
        self.marginals.is_empty()
    }

    pub fn get(&self, id: &NodeId) -> Option<&Distribution> {
        self.marginals.get(id)
    }
}

/// Posterior marginals for `query` (default: every unobserved node).
///
/// Never fails; every failure mode is logged and answered with an empty
/// result.
pub fn infer(
    backend: &dyn InferenceBackend,
    network: Option<&FittedNetwork>,
    evidence: &Evidence,
    query: Option<&[NodeId]>,
) -> InferenceResult {
    let Some(network) = network else {
        warn!(target: event_names::INFER_NO_NETWORK, "no fitted network, returning empty result");
        return InferenceResult::default();
    };

    match backend.query(network, evidence, query) {
        Ok(result) => {
            debug!(
                target: event_names::INFER_FINISHED,
                evidence = result.evidence.len(),
                rejected = result.rejected_evidence.len(),
                marginals = result.marginals.len(),
                "inference finished"
            );
            result
        }
        Err(err @ bt_common::Error::DependencyUnavailable(_)) => {
            warn!(target: event_names::INFER_BACKEND_UNAVAILABLE, error = %err, "inference unavailable");
            InferenceResult::default()
        }
        Err(err) => {
            warn!(target: event_names::INFER_FAILED, error = %err, code = err.code(), "inference failed");
            InferenceResult::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpt::build_cpts;
    use crate::fit::fit;
    use crate::structure::build_structure;
    use crate::test_log::{capture_events, event_names_of};
    use bt_common::{BowtieRow, NodeType};
    use bt_config::EngineConfig;

    fn network() -> FittedNetwork {
        let rows = vec![BowtieRow::chain("A", "P", "Prob", "C").with_control("K")];
        let s = build_structure(&rows, None);
        let cpts = build_cpts(&s, &rows, false, &EngineConfig::default()).unwrap();
        fit(&s, cpts).unwrap()
    }

    #[test]
    fn test_no_network_is_empty() {
        let (r, events) =
            capture_events(|| infer(&JunctionTreeBackend::default(), None, &Evidence::new(), None));
        assert!(r.is_empty());
        assert_eq!(event_names_of(&events), vec![event_names::INFER_NO_NETWORK]);
        assert_eq!(events[0]["level"], "warn");
    }

    #[test]
    fn test_unavailable_backend_is_empty() {
        let net = network();
        let (r, events) = capture_events(|| {
            infer(&UnavailableBackend::new("test"), Some(&net), &Evidence::new(), None)
        });
        assert!(r.is_empty());
        assert_eq!(event_names_of(&events), vec![event_names::INFER_BACKEND_UNAVAILABLE]);
    }

    #[test]
    fn test_compiled_tree_is_logged() {
        let net = network();
        let (r, events) = capture_events(|| {
            infer(&JunctionTreeBackend::default(), Some(&net), &Evidence::new(), None)
        });
        assert!(!r.is_empty());
        let compiled = events
            .iter()
            .find(|e| e["event"] == event_names::INFER_COMPILED)
            .expect("compile event");
        assert!(compiled["fields"]["cliques"].as_u64().unwrap() >= 1);
        assert!(compiled["fields"]["max_clique_states"].as_u64().unwrap() >= 3);
    }

    #[test]
    fn test_control_failure_raises_problem_risk() {
        let net = network();
        let backend = JunctionTreeBackend::default();
        let prob = NodeId::derive(NodeType::Problem, "Prob");
        let ctrl = NodeId::derive(NodeType::Control, "K");
        let query = [prob.clone()];

        let mut ev = Evidence::new();
        ev.insert(ctrl.clone(), "Effective".into());
        let ok = infer(&backend, Some(&net), &ev, Some(&query));
        ev.insert(ctrl, "Failed".into());
        let failed = infer(&backend, Some(&net), &ev, Some(&query));

        let high_ok = ok.get(&prob).unwrap().probability("High").unwrap();
        let high_failed = failed.get(&prob).unwrap().probability("High").unwrap();
        assert!(high_failed > high_ok);
        assert_eq!(failed.marginals.len(), 1);
    }

    #[test]
    fn test_intractable_network_degrades() {
        let net = network();
        let r = infer(&JunctionTreeBackend::new(2), Some(&net), &Evidence::new(), None);
        assert!(r.is_empty());
    }

    #[test]
    fn test_distribution_helpers() {
        let states: Vec<String> = ["Low", "Medium", "High"].iter().map(|s| s.to_string()).collect();
        let d = Distribution::new(&states, vec![0.2, 0.5, 0.3]);
        assert_eq!(d.probability("high"), Some(0.3));
        assert_eq!(d.at(7), 0.0);
        assert!((d.total() - 1.0).abs() < 1e-12);
        assert_eq!(serde_json::to_string(&d).unwrap(), r#"[["Low",0.2],["Medium",0.5],["High",0.3]]"#);
    }
}
