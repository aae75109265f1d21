//! CPT synthesis from rows (data mode) or heuristics (default mode).

use std::collections::BTreeMap;

use bt_common::{BowtieRow, Error, NodeId, NodeType, Result, RiskValue};
use bt_config::EngineConfig;
use bt_math::dirichlet::{smoothed_column, DirichletParams};
use tracing::{debug, info, warn};

use super::{column_index, default_column, parent_states, Cpt, CptSource};
use crate::inference::discretize::{level_index, RiskInput};
use crate::logging::event_names;
use crate::structure::{break_cycles, BayesianStructure, Node};

/// Build one CPT per node of `structure`.
///
/// Parent sets come from the cycle-free view of the structure. With
/// `use_data` and at least `config.min_rows` rows in scope, columns are
/// Dirichlet-smoothed counts centred on the default column; otherwise the
/// default columns are used directly.
pub fn build_cpts(
    structure: &BayesianStructure,
    rows: &[BowtieRow],
    use_data: bool,
    config: &EngineConfig,
) -> Result<BTreeMap<NodeId, Cpt>> {
    let acyclic = break_cycles(structure)?.kept;

    let scoped: Vec<&BowtieRow> = rows
        .iter()
        .filter(|r| match acyclic.central_problem() {
            Some(p) => r.label(NodeType::Problem) == Some(p),
            None => true,
        })
        .collect();

    let from_data = use_data && scoped.len() >= config.min_rows;
    if use_data && !from_data {
        warn!(
            target: event_names::CPT_INSUFFICIENT_DATA,
            rows = scoped.len(),
            min_rows = config.min_rows,
            "too few rows to learn from, using default CPTs"
        );
    }

    let mut cpts = BTreeMap::new();
    for node in acyclic.nodes() {
        let parents: Vec<&Node> = acyclic
            .parents_of(&node.id)
            .into_iter()
            .map(|p| {
                acyclic
                    .node(p)
                    .ok_or_else(|| Error::Structure(format!("parent {p} of {} is unknown", node.id)))
            })
            .collect::<Result<_>>()?;
        if parents.len() > config.max_parents {
            return Err(Error::ComplexityLimit {
                what: format!("parents of {}", node.id),
                actual: parents.len(),
                limit: config.max_parents,
            });
        }

        let cpt = if from_data {
            data_cpt(node, &parents, &scoped, config)
        } else {
            default_cpt(node, &parents, config)
        };
        cpt.validate()?;
        cpts.insert(node.id.clone(), cpt);
    }

    if from_data {
        info!(
            target: event_names::CPT_FROM_DATA,
            rows = scoped.len(),
            nodes = cpts.len(),
            "CPTs estimated from data"
        );
    } else {
        debug!(target: event_names::CPT_DEFAULTS, nodes = cpts.len(), "default CPTs built");
    }
    Ok(cpts)
}

fn parent_layout(parents: &[&Node]) -> (Vec<(NodeId, usize)>, Vec<NodeType>, Vec<usize>) {
    let layout: Vec<(NodeId, usize)> = parents
        .iter()
        .map(|p| (p.id.clone(), p.node_type.cardinality()))
        .collect();
    let types = parents.iter().map(|p| p.node_type).collect();
    let cards = layout.iter().map(|(_, c)| *c).collect();
    (layout, types, cards)
}

fn default_cpt(node: &Node, parents: &[&Node], config: &EngineConfig) -> Cpt {
    let (layout, types, cards) = parent_layout(parents);
    let n_columns: usize = cards.iter().product();
    let mut values = Vec::with_capacity(n_columns * node.node_type.cardinality());
    for j in 0..n_columns {
        values.extend(default_column(
            node.node_type,
            &types,
            &parent_states(&cards, j),
            &config.cpt,
        ));
    }
    Cpt::new(node.id.clone(), node.node_type, layout, values, CptSource::Default)
}

fn data_cpt(node: &Node, parents: &[&Node], rows: &[&BowtieRow], config: &EngineConfig) -> Cpt {
    let (layout, types, cards) = parent_layout(parents);
    let card = node.node_type.cardinality();
    let n_columns: usize = cards.iter().product();

    let mut counts = vec![0.0; n_columns * card];
    for row in rows {
        let states: Vec<usize> = parents.iter().map(|p| row_state(p, row)).collect();
        if let Some(j) = column_index(&cards, &states) {
            counts[j * card + row_state(node, row)] += 1.0;
        }
    }

    let mut values = Vec::with_capacity(counts.len());
    for j in 0..n_columns {
        let default = default_column(node.node_type, &types, &parent_states(&cards, j), &config.cpt);
        let column = match DirichletParams::informed(&default, config.laplace_alpha, config.prior_weight)
        {
            Some(prior) => smoothed_column(&prior, &counts[j * card..(j + 1) * card]),
            None => default,
        };
        values.extend(column);
    }
    Cpt::new(node.id.clone(), node.node_type, layout, values, CptSource::Data)
}

/// State index of `node` implied by one row.
///
/// Presence types are Present when the row names the node; Control and
/// Mitigation are Effective when named (an unnamed barrier is treated as
/// not in place). Problem and Consequence nodes are Low when not named,
/// otherwise the discretized Likelihood (resp. Severity), falling back to
/// Risk_Level and then Medium.
pub fn row_state(node: &Node, row: &BowtieRow) -> usize {
    let named = row.label(node.node_type) == Some(node.original_name.trim());
    match node.node_type {
        // Present / Effective is state 0 for every binary type.
        NodeType::Activity
        | NodeType::Pressure
        | NodeType::Escalation
        | NodeType::Control
        | NodeType::Mitigation => {
            if named {
                0
            } else {
                1
            }
        }
        NodeType::Problem | NodeType::Consequence => {
            if !named {
                return 0;
            }
            let rating = match node.node_type {
                NodeType::Problem => row.likelihood.as_ref(),
                _ => row.severity.as_ref(),
            };
            rating
                .and_then(|r| level_index(&RiskInput::from(r), 3))
                .or_else(|| row.risk_level.as_ref().and_then(risk_level_index))
                .unwrap_or(1)
        }
    }
}

fn risk_level_index(value: &RiskValue) -> Option<usize> {
    if let RiskValue::Text(s) = value {
        if let Some(i) = NodeType::Problem.state_index(s) {
            return Some(i);
        }
    }
    level_index(&RiskInput::from(value), 3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::build_structure;

    fn water_rows() -> Vec<BowtieRow> {
        vec![
            BowtieRow::chain("Agriculture", "Nutrient runoff", "Water Pollution", "Ecosystem Damage")
                .with_ratings(3.0, 4.0),
            BowtieRow::chain("Agriculture", "Nutrient runoff", "Water Pollution", "Human Health Risk")
                .with_ratings(4.0, 3.0),
        ]
    }

    fn scale_rows() -> Vec<BowtieRow> {
        // 16 rows: "Shipping" in 13, "Dredging" in 2, one row without activity.
        let mut rows = Vec::new();
        for i in 0..16 {
            let activity = match i {
                0..=12 => "Shipping",
                13 | 14 => "Dredging",
                _ => "",
            };
            let mut row = BowtieRow::chain(activity, "Oil spill", "Water Pollution", "Ecosystem Damage")
                .with_ratings((i % 5 + 1) as f64, ((i + 2) % 5 + 1) as f64);
            if i % 2 == 0 {
                row = row.with_control("Double hull");
            }
            rows.push(row);
        }
        rows
    }

    #[test]
    fn test_default_cpts_are_normalized() {
        let rows = water_rows();
        let s = build_structure(&rows, None);
        let cpts = build_cpts(&s, &rows, false, &EngineConfig::default()).unwrap();
        assert_eq!(cpts.len(), s.nodes().len());
        for cpt in cpts.values() {
            assert!(cpt.is_normalized(0.01), "{}", cpt.node);
            assert_eq!(cpt.source, CptSource::Default);
        }
        let prob = NodeId::derive(NodeType::Problem, "Water Pollution");
        assert_eq!(cpts[&prob].parents, vec![NodeId::derive(NodeType::Pressure, "Nutrient runoff")]);
    }

    #[test]
    fn test_insufficient_data_falls_back_to_defaults() {
        let rows = water_rows();
        let s = build_structure(&rows, None);
        let learned = build_cpts(&s, &rows, true, &EngineConfig::default()).unwrap();
        let defaults = build_cpts(&s, &rows, false, &EngineConfig::default()).unwrap();
        assert_eq!(learned, defaults);
    }

    #[test]
    fn test_data_mode_reflects_frequencies() {
        let rows = scale_rows();
        let s = build_structure(&rows, None);
        let cpts = build_cpts(&s, &rows, true, &EngineConfig::default()).unwrap();

        let shipping = &cpts[&NodeId::derive(NodeType::Activity, "Shipping")];
        let dredging = &cpts[&NodeId::derive(NodeType::Activity, "Dredging")];
        assert_eq!(shipping.source, CptSource::Data);
        // prior alpha = 1 + 2 * 0.5 = 2 per state
        assert!((shipping.values[0] - 15.0 / 20.0).abs() < 1e-9);
        assert!((dredging.values[0] - 4.0 / 20.0).abs() < 1e-9);
        assert!(shipping.values[0] > dredging.values[0] + 0.4);

        for cpt in cpts.values() {
            assert!(cpt.is_normalized(1e-9));
            assert!(cpt.values.iter().all(|v| *v > 0.0));
        }
    }

    #[test]
    fn test_scope_filters_rows() {
        let mut rows = scale_rows();
        rows.truncate(12);
        rows.extend((0..5).map(|_| BowtieRow::chain("Fishing", "Bycatch", "Biodiversity Loss", "Decline")));
        let s = build_structure(&rows, Some("Biodiversity Loss"));
        let cpts = build_cpts(&s, &rows, true, &EngineConfig::default()).unwrap();
        // only 5 rows in scope
        assert!(cpts.values().all(|c| c.source == CptSource::Default));
    }

    #[test]
    fn test_parent_limit() {
        let rows: Vec<BowtieRow> = (0..4)
            .map(|i| BowtieRow::chain(&format!("A{i}"), "P", "Prob", "C"))
            .collect();
        let s = build_structure(&rows, None);
        let config = EngineConfig {
            max_parents: 3,
            ..Default::default()
        };
        let err = build_cpts(&s, &rows, false, &config).unwrap_err();
        assert!(matches!(err, Error::ComplexityLimit { actual: 4, limit: 3, .. }));
    }

    #[test]
    fn test_row_state_mapping() {
        let rows = vec![BowtieRow::chain("A", "P", "Prob", "C")
            .with_control("K")
            .with_ratings(5.0, 1.0)];
        let s = build_structure(&rows, None);
        let node = |t, l| s.node(&NodeId::derive(t, l)).unwrap();

        assert_eq!(row_state(node(NodeType::Activity, "A"), &rows[0]), 0);
        assert_eq!(row_state(node(NodeType::Control, "K"), &rows[0]), 0);
        assert_eq!(row_state(node(NodeType::Problem, "Prob"), &rows[0]), 2);
        assert_eq!(row_state(node(NodeType::Consequence, "C"), &rows[0]), 0);

        let other = BowtieRow::chain("B", "P", "Prob", "C");
        assert_eq!(row_state(node(NodeType::Activity, "A"), &other), 1);
        assert_eq!(row_state(node(NodeType::Control, "K"), &other), 1);
        // no ratings, no risk level: Medium
        assert_eq!(row_state(node(NodeType::Problem, "Prob"), &other), 1);

        let mut labelled = other.clone();
        labelled.risk_level = Some(RiskValue::Text("high".into()));
        assert_eq!(row_state(node(NodeType::Problem, "Prob"), &labelled), 2);

        let mut text_rated = other.clone();
        text_rated.likelihood = Some(RiskValue::Text("4".into()));
        text_rated.severity = Some(RiskValue::Text("n/a".into()));
        assert_eq!(row_state(node(NodeType::Problem, "Prob"), &text_rated), 2);
        // unparseable severity falls through to Medium
        assert_eq!(row_state(node(NodeType::Consequence, "C"), &text_rated), 1);
    }
}
