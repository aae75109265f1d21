//! Engine facade.
//!
//! [`BowtieEngine`] bundles a validated [`EngineConfig`] with the inference
//! backend resolved at start-up, so callers do not thread either through
//! every call.

use std::collections::BTreeMap;

use bt_common::{BowtieRow, NodeId, Result};
use bt_config::EngineConfig;

use crate::analysis::{self, ControlImpact, CriticalPath};
use crate::capabilities::Capabilities;
use crate::cpt::{self, Cpt};
use crate::fit::{self, FittedNetwork};
use crate::inference::{self, Distribution, Evidence, InferenceBackend, InferenceResult};
use crate::structure::{BayesianStructure, StructureBuilder};

pub struct BowtieEngine {
    config: EngineConfig,
    capabilities: Capabilities,
    backend: Box<dyn InferenceBackend>,
}

impl std::fmt::Debug for BowtieEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BowtieEngine")
            .field("config", &self.config)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl Default for BowtieEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl BowtieEngine {
    /// Engine with capabilities detected from the environment.
    pub fn new(config: EngineConfig) -> Self {
        let capabilities = Capabilities::detect(config.max_clique_states);
        Self::with_capabilities(config, capabilities)
    }

    pub fn with_capabilities(config: EngineConfig, capabilities: Capabilities) -> Self {
        let backend = capabilities.backend();
        Self {
            config,
            capabilities,
            backend,
        }
    }

    /// Replace the inference backend, e.g. with a test double.
    pub fn with_backend(mut self, backend: Box<dyn InferenceBackend>) -> Self {
        self.capabilities = self.capabilities.with_backend(backend.kind());
        self.backend = backend;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn backend(&self) -> &dyn InferenceBackend {
        self.backend.as_ref()
    }

    /// Structure for `rows`, bounded by `max_nodes`.
    pub fn build_structure(
        &self,
        rows: &[BowtieRow],
        central_problem: Option<&str>,
    ) -> Result<BayesianStructure> {
        StructureBuilder::new()
            .max_nodes(self.config.max_nodes)
            .build(rows, central_problem)
    }

    pub fn build_cpts(
        &self,
        structure: &BayesianStructure,
        rows: &[BowtieRow],
        use_data: bool,
    ) -> Result<BTreeMap<NodeId, Cpt>> {
        cpt::build_cpts(structure, rows, use_data, &self.config)
    }

    pub fn fit(
        &self,
        structure: &BayesianStructure,
        cpts: BTreeMap<NodeId, Cpt>,
    ) -> Result<FittedNetwork> {
        fit::fit(structure, cpts)
    }

    pub fn learn_from_data(
        &self,
        structure: &BayesianStructure,
        rows: &[BowtieRow],
    ) -> Result<FittedNetwork> {
        fit::learn_from_data(structure, rows, &self.config)
    }

    /// Structure, CPTs and fit in one step.
    pub fn fit_rows(
        &self,
        rows: &[BowtieRow],
        central_problem: Option<&str>,
        use_data: bool,
    ) -> Result<FittedNetwork> {
        let structure = self.build_structure(rows, central_problem)?;
        let cpts = self.build_cpts(&structure, rows, use_data)?;
        self.fit(&structure, cpts)
    }

    pub fn infer(
        &self,
        network: Option<&FittedNetwork>,
        evidence: &Evidence,
        query: Option<&[NodeId]>,
    ) -> InferenceResult {
        inference::infer(self.backend(), network, evidence, query)
    }

    pub fn calculate_risk_propagation(
        &self,
        network: Option<&FittedNetwork>,
        scenario: &Evidence,
    ) -> BTreeMap<NodeId, Distribution> {
        analysis::calculate_risk_propagation(self.backend(), network, scenario)
    }

    pub fn find_critical_paths(&self, network: Option<&FittedNetwork>) -> Vec<CriticalPath> {
        analysis::find_critical_paths(self.backend(), network)
    }

    pub fn rank_control_failures(&self, network: Option<&FittedNetwork>) -> Vec<ControlImpact> {
        analysis::rank_control_failures(self.backend(), network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::BackendKind;
    use bt_common::{Error, NodeType};

    fn engine(backend: BackendKind) -> BowtieEngine {
        let config = EngineConfig::default();
        let caps = Capabilities::detect(config.max_clique_states).with_backend(backend);
        BowtieEngine::with_capabilities(config, caps)
    }

    fn rows() -> Vec<BowtieRow> {
        vec![BowtieRow::chain("Shipping", "Oil spill", "Water Pollution", "Fish kill")
            .with_control("Double hulls")]
    }

    #[test]
    fn test_pipeline_through_facade() {
        let engine = engine(BackendKind::JunctionTree);
        let net = engine.fit_rows(&rows(), None, false).unwrap();
        let result = engine.infer(Some(&net), &Evidence::new(), None);
        assert_eq!(result.marginals.len(), 5);
        assert_eq!(engine.find_critical_paths(Some(&net)).len(), 1);
        assert_eq!(engine.rank_control_failures(Some(&net)).len(), 1);
    }

    #[test]
    fn test_unavailable_backend_degrades() {
        let engine = engine(BackendKind::Unavailable);
        assert!(!engine.capabilities().inference_available());
        let net = engine.fit_rows(&rows(), None, false).unwrap();
        assert!(engine.infer(Some(&net), &Evidence::new(), None).is_empty());
        let mut scenario = Evidence::new();
        scenario.insert(NodeId::derive(NodeType::Control, "Double hulls"), "Failed".into());
        assert!(engine.calculate_risk_propagation(Some(&net), &scenario).is_empty());
        assert!(engine.find_critical_paths(Some(&net)).is_empty());
    }

    #[test]
    fn test_node_budget_from_config() {
        let config = EngineConfig {
            max_nodes: 3,
            ..EngineConfig::default()
        };
        let engine = BowtieEngine::with_capabilities(
            config.clone(),
            Capabilities::detect(config.max_clique_states),
        );
        let err = engine.build_structure(&rows(), None).unwrap_err();
        assert!(matches!(err, Error::ComplexityLimit { limit: 3, .. }));
    }

    #[test]
    fn test_with_backend_updates_capabilities() {
        let engine = engine(BackendKind::JunctionTree)
            .with_backend(Box::new(inference::UnavailableBackend::new("test")));
        assert_eq!(engine.capabilities().backend, BackendKind::Unavailable);
    }
}
