//! Inference backends.
//!
//! The backend is chosen once (see [`crate::capabilities`]) and passed to
//! every inference call as a trait object.

use bt_common::{Error, NodeId, Result};
use tracing::debug;

use super::junction_tree::JunctionTree;
use super::{Evidence, InferenceResult};
use crate::capabilities::BackendKind;
use crate::fit::FittedNetwork;
use crate::logging::event_names;

/// Strategy for answering posterior queries on a fitted network.
pub trait InferenceBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn query(
        &self,
        network: &FittedNetwork,
        evidence: &Evidence,
        query: Option<&[NodeId]>,
    ) -> Result<InferenceResult>;
}

/// Exact inference, compiling a junction tree per call.
#[derive(Debug, Clone)]
pub struct JunctionTreeBackend {
    max_clique_states: usize,
}

impl JunctionTreeBackend {
    pub fn new(max_clique_states: usize) -> Self {
        Self { max_clique_states }
    }
}

impl Default for JunctionTreeBackend {
    fn default() -> Self {
        Self::new(bt_config::EngineConfig::default().max_clique_states)
    }
}

impl InferenceBackend for JunctionTreeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::JunctionTree
    }

    fn query(
        &self,
        network: &FittedNetwork,
        evidence: &Evidence,
        query: Option<&[NodeId]>,
    ) -> Result<InferenceResult> {
        let tree = JunctionTree::compile(network, self.max_clique_states)?;
        debug!(
            target: event_names::INFER_COMPILED,
            cliques = tree.n_cliques(),
            max_clique_states = tree.max_clique_size(),
            "junction tree compiled"
        );
        tree.query(evidence, query)
    }
}

/// Stand-in used when no inference engine is available on the host.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl InferenceBackend for UnavailableBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Unavailable
    }

    fn query(&self, _: &FittedNetwork, _: &Evidence, _: Option<&[NodeId]>) -> Result<InferenceResult> {
        Err(Error::DependencyUnavailable(self.reason.clone()))
    }
}
