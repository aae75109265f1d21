//! Network fitting: structure + CPTs into an immutable, acyclic model.

use std::collections::BTreeMap;

use bt_common::{BowtieRow, Error, NodeId, Result};
use bt_config::EngineConfig;
use serde::Serialize;
use tracing::info;

use crate::cpt::{build_cpts, Cpt, CptSource};
use crate::logging::event_names;
use crate::structure::{break_cycles, BayesianStructure, Edge, Node};

/// Summary of where a fitted network's parameters came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSource {
    Data,
    Default,
    /// Some tables learned, some default (hand-assembled CPT maps).
    Mixed,
}

/// A validated, acyclic Bayesian network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedNetwork {
    structure: BayesianStructure,
    cpts: BTreeMap<NodeId, Cpt>,
    order: Vec<NodeId>,
    removed_edges: Vec<Edge>,
    parameter_source: ParameterSource,
}

impl FittedNetwork {
    /// The cycle-free structure the CPTs are defined on.
    pub fn structure(&self) -> &BayesianStructure {
        &self.structure
    }

    pub fn cpts(&self) -> &BTreeMap<NodeId, Cpt> {
        &self.cpts
    }

    pub fn cpt(&self, id: &NodeId) -> Option<&Cpt> {
        self.cpts.get(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.structure.node(id)
    }

    /// Node ids in topological order.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Edges dropped while breaking cycles.
    pub fn removed_edges(&self) -> &[Edge] {
        &self.removed_edges
    }

    pub fn parameter_source(&self) -> ParameterSource {
        self.parameter_source
    }

    pub fn is_empty(&self) -> bool {
        self.structure.is_empty()
    }
}

/// Fit `cpts` onto `structure`.
///
/// Cycles are broken first (never an error). Every remaining node needs a
/// CPT whose parents match its cycle-free parents; values are taken as
/// given so fitting the same inputs twice is bit-identical.
pub fn fit(structure: &BayesianStructure, cpts: BTreeMap<NodeId, Cpt>) -> Result<FittedNetwork> {
    let broken = break_cycles(structure)?;
    let acyclic = broken.kept;

    for node in acyclic.nodes() {
        let cpt = cpts
            .get(&node.id)
            .ok_or_else(|| Error::Structure(format!("no CPT for node {}", node.id)))?;
        check_cpt(&acyclic, node, cpt)?;
    }
    if let Some(extra) = cpts.keys().find(|id| !acyclic.contains(id)) {
        return Err(Error::Structure(format!("CPT for unknown node {extra}")));
    }

    let parameter_source = summarize_sources(&cpts);
    info!(
        target: event_names::FIT_FINISHED,
        nodes = acyclic.nodes().len(),
        edges = acyclic.edges().len(),
        removed_edges = broken.removed.len(),
        source = ?parameter_source,
        "network fitted"
    );

    Ok(FittedNetwork {
        structure: acyclic,
        cpts,
        order: broken.order,
        removed_edges: broken.removed,
        parameter_source,
    })
}

/// Build CPTs from `rows` (falling back to defaults below the row
/// threshold) and fit them.
pub fn learn_from_data(
    structure: &BayesianStructure,
    rows: &[BowtieRow],
    config: &EngineConfig,
) -> Result<FittedNetwork> {
    let cpts = build_cpts(structure, rows, true, config)?;
    fit(structure, cpts)
}

fn check_cpt(structure: &BayesianStructure, node: &Node, cpt: &Cpt) -> Result<()> {
    if cpt.node != node.id || cpt.node_type != node.node_type {
        return Err(Error::Structure(format!(
            "CPT for {} describes {} ({})",
            node.id, cpt.node, cpt.node_type
        )));
    }
    let expected_states = node.node_type.states();
    if cpt.states.len() != expected_states.len()
        || cpt.states.iter().zip(expected_states).any(|(a, b)| a != b)
    {
        return Err(Error::Structure(format!(
            "CPT for {} has states {:?}, expected {:?}",
            node.id, cpt.states, expected_states
        )));
    }
    let parents = structure.parents_of(&node.id);
    if cpt.parents.len() != parents.len() || cpt.parents.iter().zip(&parents).any(|(a, b)| a != *b) {
        return Err(Error::Structure(format!(
            "CPT parents of {} do not match the structure",
            node.id
        )));
    }
    for (parent, card) in cpt.parents.iter().zip(&cpt.parent_cards) {
        let expected = structure
            .node(parent)
            .map(|p| p.node_type.cardinality())
            .ok_or_else(|| Error::Structure(format!("parent {parent} of {} is unknown", node.id)))?;
        if *card != expected {
            return Err(Error::Structure(format!(
                "CPT of {} gives parent {parent} {card} states, expected {expected}",
                node.id
            )));
        }
    }
    cpt.validate()
}

fn summarize_sources(cpts: &BTreeMap<NodeId, Cpt>) -> ParameterSource {
    let data = cpts.values().filter(|c| c.source == CptSource::Data).count();
    if data == 0 {
        ParameterSource::Default
    } else if data == cpts.len() {
        ParameterSource::Data
    } else {
        ParameterSource::Mixed
    }
}
