//! Control-failure ranking: which preventive control hurts most when it
//! fails.

use bt_common::{NodeId, NodeType};
use serde::Serialize;
use tracing::{debug, warn};

use super::{risky_evidence, risky_probability};
use crate::fit::FittedNetwork;
use crate::inference::{infer, Evidence, InferenceBackend};
use crate::logging::event_names;

/// Effect of forcing one control to Failed on its most affected problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlImpact {
    pub control: NodeId,
    pub problem: NodeId,
    pub baseline_high: f64,
    pub failed_high: f64,
    /// `failed_high - baseline_high`.
    pub delta: f64,
}

/// Rank controls by the largest increase in P(problem = High) their failure
/// causes. Controls whose failure leaves every problem unreachable are
/// omitted.
pub fn rank_control_failures(
    backend: &dyn InferenceBackend,
    network: Option<&FittedNetwork>,
) -> Vec<ControlImpact> {
    let Some(network) = network else {
        warn!(target: event_names::ANALYSIS_NO_NETWORK, "no fitted network for control ranking");
        return Vec::new();
    };

    let baseline = infer(backend, Some(network), &Evidence::new(), None);
    if baseline.is_empty() {
        return Vec::new();
    }
    let problems: Vec<&NodeId> = network
        .structure()
        .nodes_of_type(NodeType::Problem)
        .map(|n| &n.id)
        .collect();

    let mut impacts = Vec::new();
    for control in network.structure().nodes_of_type(NodeType::Control) {
        let failed = infer(
            backend,
            Some(network),
            &risky_evidence(&control.id, control.node_type),
            None,
        );
        if failed.is_empty() {
            warn!(
                target: event_names::ANALYSIS_ROOT_SKIPPED,
                root = %control.id,
                "no posterior for failed control"
            );
            continue;
        }

        let mut worst: Option<ControlImpact> = None;
        for problem in &problems {
            let (Some(before), Some(after)) = (
                risky_probability(network, &baseline, problem),
                risky_probability(network, &failed, problem),
            ) else {
                continue;
            };
            let delta = after - before;
            if worst.as_ref().map_or(true, |w| delta > w.delta) {
                worst = Some(ControlImpact {
                    control: control.id.clone(),
                    problem: (*problem).clone(),
                    baseline_high: before,
                    failed_high: after,
                    delta,
                });
            }
        }
        impacts.extend(worst);
    }

    impacts.sort_by(|a, b| b.delta.total_cmp(&a.delta).then_with(|| a.control.cmp(&b.control)));
    debug!(target: event_names::ANALYSIS_PATHS_RANKED, controls = impacts.len(), "control failures ranked");
    impacts
}
