//! Bowtie Bayesian Network Core Library
//!
//! This library turns flat bowtie risk rows into a discrete Bayesian network
//! and answers probabilistic questions over it:
//! - Structure derivation from rows (nodes, causal edges, cycle breaking)
//! - Conditional probability table synthesis (data-driven or heuristic)
//! - Network fitting into an immutable, validated model
//! - Exact junction-tree inference and risk discretization
//! - What-if propagation and critical-path ranking
//!
//! The binary entry point is in `main.rs`.

pub mod analysis;
pub mod capabilities;
pub mod cpt;
pub mod engine;
pub mod exit_codes;
pub mod fit;
pub mod inference;
pub mod logging;
pub mod structure;

#[cfg(test)]
mod test_log;

pub use bt_common::{BowtieRow, Error, NodeId, NodeType, Result};
pub use bt_config::EngineConfig;

pub use analysis::{
    calculate_risk_propagation, find_critical_paths, rank_control_failures, ControlImpact,
    CriticalPath,
};
pub use capabilities::{BackendKind, Capabilities};
pub use cpt::{build_cpts, Cpt, CptSource};
pub use engine::BowtieEngine;
pub use fit::{fit, learn_from_data, FittedNetwork, ParameterSource};
pub use inference::{
    discretize_risk_level, infer, Distribution, Evidence, InferenceBackend, InferenceResult,
    JunctionTreeBackend, RiskInput, UnavailableBackend,
};
pub use structure::{
    build_structure, rows_from_json, BayesianStructure, Edge, EdgeType, Node, StructureBuilder,
};
