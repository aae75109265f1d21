//! What-if scenarios.

use std::collections::BTreeMap;

use bt_common::NodeId;
use tracing::warn;

use crate::fit::FittedNetwork;
use crate::inference::{infer, Distribution, Evidence, InferenceBackend};
use crate::logging::event_names;

/// Marginals of every node not fixed by `scenario`.
///
/// A scenario is plain evidence, e.g. a control set to "Failed".
pub fn calculate_risk_propagation(
    backend: &dyn InferenceBackend,
    network: Option<&FittedNetwork>,
    scenario: &Evidence,
) -> BTreeMap<NodeId, Distribution> {
    if network.is_none() {
        warn!(target: event_names::ANALYSIS_NO_NETWORK, "no fitted network for risk propagation");
        return BTreeMap::new();
    }
    infer(backend, network, scenario, None).marginals
}
