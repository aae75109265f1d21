//! Conditional probability tables.
//!
//! A [`Cpt`] stores one probability column per parent configuration. Columns
//! are enumerated with the last parent varying fastest and each column holds
//! `card` values in the node's state order, so for a binary node with parents
//! `(A, B)` the layout is
//!
//! ```text
//! column 0: A=0,B=0   values[0..2]
//! column 1: A=0,B=1   values[2..4]
//! column 2: A=1,B=0   values[4..6]
//! ...
//! ```

pub mod defaults;
pub mod synth;

pub use defaults::{default_column, root_prior};
pub use synth::{build_cpts, row_state};

use bt_common::{Error, NodeId, NodeType, Result};
use serde::Serialize;

/// Tolerance for column sums.
pub const COLUMN_TOLERANCE: f64 = 0.01;

/// Where a table's numbers came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CptSource {
    /// Dirichlet-smoothed counts from bowtie rows.
    Data,
    /// Heuristic defaults.
    Default,
}

/// Conditional probability table for one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cpt {
    pub node: NodeId,
    pub node_type: NodeType,
    pub states: Vec<String>,
    pub parents: Vec<NodeId>,
    pub parent_cards: Vec<usize>,
    pub values: Vec<f64>,
    pub source: CptSource,
}

impl Cpt {
    /// Table with states taken from the node type.
    pub fn new(
        node: NodeId,
        node_type: NodeType,
        parents: Vec<(NodeId, usize)>,
        values: Vec<f64>,
        source: CptSource,
    ) -> Self {
        let (parents, parent_cards) = parents.into_iter().unzip();
        Self {
            node,
            node_type,
            states: node_type.states().iter().map(|s| s.to_string()).collect(),
            parents,
            parent_cards,
            values,
            source,
        }
    }

    pub fn card(&self) -> usize {
        self.states.len()
    }

    /// Number of parent configurations (1 for a root).
    pub fn n_columns(&self) -> usize {
        self.parent_cards.iter().product()
    }

    pub fn column(&self, j: usize) -> &[f64] {
        let card = self.card();
        &self.values[j * card..(j + 1) * card]
    }

    /// Column index of a parent configuration, last parent fastest.
    pub fn column_index(&self, parent_states: &[usize]) -> Option<usize> {
        column_index(&self.parent_cards, parent_states)
    }

    /// Parent configuration of column `j`.
    pub fn parent_states(&self, j: usize) -> Vec<usize> {
        parent_states(&self.parent_cards, j)
    }

    /// P(node = state | parents = parent_states).
    pub fn probability(&self, state: usize, parent_states: &[usize]) -> Option<f64> {
        if state >= self.card() {
            return None;
        }
        let j = self.column_index(parent_states)?;
        Some(self.values[j * self.card() + state])
    }

    /// True when every column is a distribution within `tol`.
    pub fn is_normalized(&self, tol: f64) -> bool {
        (0..self.n_columns()).all(|j| bt_math::is_distribution(self.column(j), tol))
    }

    /// Check shape and column sums.
    pub fn validate(&self) -> Result<()> {
        if self.parents.len() != self.parent_cards.len() {
            return Err(Error::Structure(format!(
                "CPT for {} lists {} parents but {} cardinalities",
                self.node,
                self.parents.len(),
                self.parent_cards.len()
            )));
        }
        let expected = self.n_columns() * self.card();
        if self.values.len() != expected {
            return Err(Error::Structure(format!(
                "CPT for {} has {} values, expected {}",
                self.node,
                self.values.len(),
                expected
            )));
        }
        for j in 0..self.n_columns() {
            let col = self.column(j);
            if !bt_math::is_distribution(col, COLUMN_TOLERANCE) {
                let total: f64 = col.iter().sum();
                return Err(Error::Structure(format!(
                    "CPT column {} of {} sums to {:.4}",
                    j, self.node, total
                )));
            }
        }
        Ok(())
    }
}

/// Column index for `states` under mixed-radix `cards`, last digit fastest.
pub fn column_index(cards: &[usize], states: &[usize]) -> Option<usize> {
    if cards.len() != states.len() {
        return None;
    }
    let mut idx = 0;
    for (&card, &s) in cards.iter().zip(states) {
        if s >= card {
            return None;
        }
        idx = idx * card + s;
    }
    Some(idx)
}

/// Inverse of [`column_index`].
pub fn parent_states(cards: &[usize], mut j: usize) -> Vec<usize> {
    let mut out = vec![0; cards.len()];
    for (slot, &card) in out.iter_mut().zip(cards).rev() {
        *slot = j % card;
        j /= card;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(t: NodeType, s: &str) -> NodeId {
        NodeId::derive(t, s)
    }

    #[test]
    fn test_mixed_radix_layout() {
        let cards = [2, 3];
        assert_eq!(column_index(&cards, &[0, 0]), Some(0));
        assert_eq!(column_index(&cards, &[0, 2]), Some(2));
        assert_eq!(column_index(&cards, &[1, 0]), Some(3));
        assert_eq!(column_index(&cards, &[1, 3]), None);
        for j in 0..6 {
            assert_eq!(column_index(&cards, &parent_states(&cards, j)), Some(j));
        }
        assert_eq!(column_index(&[], &[]), Some(0));
    }

    #[test]
    fn test_probability_lookup() {
        let cpt = Cpt::new(
            id(NodeType::Pressure, "p"),
            NodeType::Pressure,
            vec![(id(NodeType::Activity, "a"), 2)],
            vec![0.9, 0.1, 0.2, 0.8],
            CptSource::Default,
        );
        assert_eq!(cpt.n_columns(), 2);
        assert_eq!(cpt.probability(0, &[1]), Some(0.2));
        assert_eq!(cpt.probability(2, &[1]), None);
        assert!(cpt.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_columns() {
        let mut cpt = Cpt::new(
            id(NodeType::Problem, "x"),
            NodeType::Problem,
            vec![],
            vec![0.5, 0.3, 0.3],
            CptSource::Default,
        );
        assert!(matches!(cpt.validate(), Err(Error::Structure(_))));
        cpt.values = vec![0.5, 0.5];
        assert!(cpt.validate().is_err());
        cpt.values = vec![0.5, 0.3, 0.2];
        assert!(cpt.validate().is_ok());
        assert!(cpt.is_normalized(1e-9));
    }
}
