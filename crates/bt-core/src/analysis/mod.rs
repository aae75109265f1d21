//! Risk analysis on fitted networks: what-if propagation, critical paths
//! from root causes to central problems, and control-failure ranking.
//!
//! All entry points degrade to empty output (with a warning) when the
//! network is missing or inference is unavailable.

pub mod controls;
pub mod critical_path;
pub mod propagation;

pub use controls::{rank_control_failures, ControlImpact};
pub use critical_path::{find_critical_paths, CriticalPath};
pub use propagation::calculate_risk_propagation;

use bt_common::{NodeId, NodeType};

use crate::fit::FittedNetwork;
use crate::inference::{Evidence, InferenceResult};

/// Evidence clamping `id` to its type's risky state.
pub(crate) fn risky_evidence(id: &NodeId, node_type: NodeType) -> Evidence {
    let mut ev = Evidence::new();
    ev.insert(
        id.clone(),
        node_type.states()[node_type.risky_state()].to_string(),
    );
    ev
}

/// Posterior probability that `id` is in its risky state.
pub(crate) fn risky_probability(
    network: &FittedNetwork,
    result: &InferenceResult,
    id: &NodeId,
) -> Option<f64> {
    let node_type = network.node(id)?.node_type;
    result.get(id).map(|d| d.at(node_type.risky_state()))
}
