//! Heuristic CPT columns used when data is missing or insufficient.
//!
//! Rules per child type:
//! - Pressure: noisy-OR over risky causes, reduced by each Effective control
//! - Mitigation: base efficacy, penalised per Present escalation
//! - Problem: interpolation between the low and high profiles by the share
//!   of parents in their risky state
//! - Consequence: interpolation by mean parent level, damped per Effective
//!   mitigation
//!
//! Other combinations only arise from hand-assembled structures and get a
//! generic binary rule.

use bt_common::NodeType;
use bt_config::CptDefaults;
use bt_math::{clamp_probability, interpolate, noisy_or, normalize_probs};

/// Prior column for a node without parents.
pub fn root_prior(node_type: NodeType, d: &CptDefaults) -> Vec<f64> {
    let r = &d.roots;
    let prior = match node_type {
        NodeType::Activity => &r.activity,
        NodeType::Pressure => &r.pressure,
        NodeType::Control => &r.control,
        NodeType::Escalation => &r.escalation,
        NodeType::Problem => &r.problem,
        NodeType::Mitigation => &r.mitigation,
        NodeType::Consequence => &r.consequence,
    };
    fit_to(prior, node_type.cardinality())
}

/// Default column for `node_type` given its parents' types and states.
pub fn default_column(
    node_type: NodeType,
    parent_types: &[NodeType],
    parent_states: &[usize],
    d: &CptDefaults,
) -> Vec<f64> {
    if parent_types.is_empty() {
        return root_prior(node_type, d);
    }
    let parents: Vec<(NodeType, usize)> = parent_types
        .iter()
        .copied()
        .zip(parent_states.iter().copied())
        .collect();

    match node_type {
        NodeType::Pressure => pressure_column(&parents, d),
        NodeType::Mitigation => mitigation_column(&parents, d),
        NodeType::Problem => {
            let t = risky_fraction(&parents);
            fit_to(&interpolate(&d.low_profile, &d.high_profile, t), 3)
        }
        NodeType::Consequence => consequence_column(&parents, d),
        NodeType::Activity | NodeType::Control | NodeType::Escalation => {
            let p = 0.1 + 0.8 * risky_fraction(&parents);
            binary(node_type, p, d.epsilon)
        }
    }
}

fn is_risky(node_type: NodeType, state: usize) -> bool {
    state == node_type.risky_state()
}

fn is_effective(node_type: NodeType, state: usize) -> bool {
    matches!(node_type, NodeType::Control | NodeType::Mitigation) && state == 0
}

fn risky_fraction(parents: &[(NodeType, usize)]) -> f64 {
    let risky = parents.iter().filter(|(t, s)| is_risky(*t, *s)).count();
    risky as f64 / parents.len() as f64
}

/// Two-state column with `p_risky` placed on the type's risky state.
fn binary(node_type: NodeType, p_risky: f64, eps: f64) -> Vec<f64> {
    let p = clamp_probability(p_risky, eps);
    let mut col = vec![1.0 - p; 2];
    col[node_type.risky_state()] = p;
    col
}

fn pressure_column(parents: &[(NodeType, usize)], d: &CptDefaults) -> Vec<f64> {
    let strengths: Vec<f64> = parents
        .iter()
        .filter(|(t, s)| !matches!(t, NodeType::Control) && is_risky(*t, *s))
        .map(|_| d.activity_strength)
        .collect();
    let mut p = noisy_or(d.pressure_leak, &strengths);
    for _ in parents.iter().filter(|(t, s)| is_effective(*t, *s)) {
        p *= 1.0 - d.control_efficacy;
    }
    binary(NodeType::Pressure, p, d.epsilon)
}

fn mitigation_column(parents: &[(NodeType, usize)], d: &CptDefaults) -> Vec<f64> {
    let escalations = parents.iter().filter(|(t, s)| is_risky(*t, *s)).count();
    let effective = d.mitigation_efficacy * (1.0 - d.escalation_penalty).powi(escalations as i32);
    binary(NodeType::Mitigation, 1.0 - effective, d.epsilon)
}

fn consequence_column(parents: &[(NodeType, usize)], d: &CptDefaults) -> Vec<f64> {
    let mut levels = Vec::new();
    let mut dampers = 0;
    for &(t, s) in parents {
        match t {
            NodeType::Mitigation => {
                if is_effective(t, s) {
                    dampers += 1;
                }
            }
            NodeType::Problem | NodeType::Consequence => levels.push(s as f64 / 2.0),
            _ => levels.push(if is_risky(t, s) { 1.0 } else { 0.0 }),
        }
    }
    // Mitigation-only consequences sit mid-scale.
    let mean = if levels.is_empty() {
        0.5
    } else {
        levels.iter().sum::<f64>() / levels.len() as f64
    };
    let t = mean * (1.0 - d.mitigation_damping).powi(dampers);
    fit_to(&interpolate(&d.low_profile, &d.high_profile, t), 3)
}

/// Normalize `v` to a distribution of exactly `k` entries.
fn fit_to(v: &[f64], k: usize) -> Vec<f64> {
    let mut out: Vec<f64> = v.iter().copied().take(k).map(|x| x.max(0.0)).collect();
    out.resize(k, 0.0);
    normalize_probs(&out)
}
