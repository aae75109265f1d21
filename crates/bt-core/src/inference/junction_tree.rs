//! Exact inference by junction-tree (Shafer-Shenoy) propagation.
//!
//! Compilation:
//! 1. moralize the DAG (marry co-parents, drop directions)
//! 2. triangulate with a greedy min-weight elimination order, keeping the
//!    maximal elimination cliques
//! 3. connect cliques by a maximum-weight spanning tree over separator sizes
//!    (empty separators join disconnected components into one tree)
//! 4. multiply each CPT into the smallest clique covering its family
//!
//! Querying clamps evidence, runs a collect pass towards clique 0 and a
//! distribute pass back out, then reads each marginal off the smallest
//! clique containing the variable. Messages are normalized as they go.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use bt_common::{Error, NodeId, Result};
use tracing::warn;

use super::factor::Factor;
use super::{Distribution, Evidence, InferenceResult};
use crate::fit::FittedNetwork;
use crate::logging::event_names;

/// A compiled network, reusable across queries.
#[derive(Debug, Clone)]
pub struct JunctionTree {
    ids: Vec<NodeId>,
    index: HashMap<NodeId, usize>,
    states: Vec<Vec<String>>,
    cliques: Vec<Vec<usize>>,
    neighbors: Vec<Vec<usize>>,
    potentials: Vec<Factor>,
    /// Smallest clique containing each variable.
    home: Vec<usize>,
}

impl JunctionTree {
    /// Compile `network`, failing if any clique table would exceed
    /// `max_clique_states` entries.
    pub fn compile(network: &FittedNetwork, max_clique_states: usize) -> Result<Self> {
        let ids: Vec<NodeId> = network.order().to_vec();
        let index: HashMap<NodeId, usize> =
            ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();

        let mut states = Vec::with_capacity(ids.len());
        let mut cards = Vec::with_capacity(ids.len());
        let mut families = Vec::with_capacity(ids.len());
        for id in &ids {
            let cpt = network
                .cpt(id)
                .ok_or_else(|| Error::Structure(format!("no CPT for node {id}")))?;
            let mut family = Vec::with_capacity(cpt.parents.len() + 1);
            for p in &cpt.parents {
                let pi = index
                    .get(p)
                    .copied()
                    .ok_or_else(|| Error::Structure(format!("parent {p} of {id} is unknown")))?;
                family.push(pi);
            }
            family.push(index[id]);
            states.push(cpt.states.clone());
            cards.push(cpt.card());
            families.push(family);
        }

        let cliques = triangulate(&families, &cards, max_clique_states)?;
        let neighbors = spanning_tree(&cliques);

        // Assign every family to the smallest covering clique.
        let mut potentials: Vec<Factor> = cliques
            .iter()
            .map(|c| Factor::ones(c.clone(), c.iter().map(|&v| cards[v]).collect()))
            .collect();
        for (child, family) in families.iter().enumerate() {
            let target = smallest_clique(&cliques, &cards, family).ok_or_else(|| {
                Error::Structure(format!("no clique covers the family of {}", ids[child]))
            })?;
            let cpt = &network.cpts()[&ids[child]];
            let family_cards: Vec<usize> = family.iter().map(|&v| cards[v]).collect();
            let factor = Factor::from_table(family, &family_cards, &cpt.values);
            potentials[target] = potentials[target].product(&factor);
        }

        let home = (0..ids.len())
            .map(|v| {
                smallest_clique(&cliques, &cards, &[v]).ok_or_else(|| {
                    Error::Structure(format!("variable {} is in no clique", ids[v]))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            ids,
            index,
            states,
            cliques,
            neighbors,
            potentials,
            home,
        })
    }

    pub fn n_cliques(&self) -> usize {
        self.cliques.len()
    }

    /// Largest clique table, in joint states.
    pub fn max_clique_size(&self) -> usize {
        self.potentials
            .iter()
            .map(|p| p.values().len())
            .max()
            .unwrap_or(0)
    }

    /// Posterior marginals given `evidence`.
    ///
    /// Unknown nodes or states in `evidence` are rejected (and reported);
    /// unknown query ids are skipped. `query = None` asks for every node not
    /// in the applied evidence. Evidence of zero probability is an
    /// [`Error::Inference`].
    pub fn query(&self, evidence: &Evidence, query: Option<&[NodeId]>) -> Result<InferenceResult> {
        let mut applied = BTreeMap::new();
        let mut rejected = BTreeMap::new();
        let mut clamps = Vec::new();
        for (id, state) in evidence {
            let found = self.index.get(id).and_then(|&v| {
                self.states[v]
                    .iter()
                    .position(|s| s.eq_ignore_ascii_case(state.trim()))
                    .map(|s| (v, s))
            });
            match found {
                Some((v, s)) => {
                    clamps.push((v, s));
                    applied.insert(id.clone(), self.states[v][s].clone());
                }
                None => {
                    warn!(
                        target: event_names::INFER_EVIDENCE_REJECTED,
                        node = %id,
                        state = %state,
                        "evidence references an unknown node or state"
                    );
                    rejected.insert(id.clone(), state.clone());
                }
            }
        }

        let targets: Vec<usize> = match query {
            None => (0..self.ids.len())
                .filter(|&v| !applied.contains_key(&self.ids[v]))
                .collect(),
            Some(ids) => ids
                .iter()
                .filter_map(|id| {
                    let v = self.index.get(id).copied();
                    if v.is_none() {
                        warn!(target: event_names::INFER_QUERY_UNKNOWN, node = %id, "unknown query node");
                    }
                    v
                })
                .collect(),
        };

        let marginals = self.propagate(&clamps, &targets)?;
        Ok(InferenceResult {
            marginals: targets
                .iter()
                .zip(marginals)
                .map(|(&v, probs)| (self.ids[v].clone(), Distribution::new(&self.states[v], probs)))
                .collect(),
            evidence: applied,
            rejected_evidence: rejected,
        })
    }

    fn propagate(&self, clamps: &[(usize, usize)], targets: &[usize]) -> Result<Vec<Vec<f64>>> {
        let mut potentials = self.potentials.clone();
        for &(v, s) in clamps {
            potentials[self.home[v]].clamp(v, s);
        }

        let (order, parent) = self.rooted_order();
        let mut messages: HashMap<(usize, usize), Factor> = HashMap::new();

        // collect: leaves towards the root
        for &c in order.iter().rev() {
            if let Some(p) = parent[c] {
                let msg = self.message(&potentials, &messages, c, p)?;
                messages.insert((c, p), msg);
            }
        }
        // distribute: root towards the leaves
        for &c in &order {
            for &n in &self.neighbors[c] {
                if parent[c] != Some(n) {
                    let msg = self.message(&potentials, &messages, c, n)?;
                    messages.insert((c, n), msg);
                }
            }
        }

        let mut beliefs: HashMap<usize, Factor> = HashMap::new();
        let mut out = Vec::with_capacity(targets.len());
        for &v in targets {
            let c = self.home[v];
            if !beliefs.contains_key(&c) {
                let mut belief = potentials[c].clone();
                for &n in &self.neighbors[c] {
                    if let Some(m) = messages.get(&(n, c)) {
                        belief = belief.product(m);
                    }
                }
                beliefs.insert(c, belief);
            }
            let mut marginal = beliefs[&c].marginalize_to(&[v]);
            let total = marginal.normalize();
            if !(total > 0.0 && total.is_finite()) {
                return Err(zero_evidence());
            }
            out.push(marginal.values().to_vec());
        }
        Ok(out)
    }

    /// Message from clique `from` to neighbour `to`.
    fn message(
        &self,
        potentials: &[Factor],
        messages: &HashMap<(usize, usize), Factor>,
        from: usize,
        to: usize,
    ) -> Result<Factor> {
        let mut f = potentials[from].clone();
        for &n in &self.neighbors[from] {
            if n != to {
                if let Some(m) = messages.get(&(n, from)) {
                    f = f.product(m);
                }
            }
        }
        let sep: Vec<usize> = intersection(&self.cliques[from], &self.cliques[to]);
        let mut msg = f.marginalize_to(&sep);
        let total = msg.normalize();
        if !(total > 0.0 && total.is_finite()) {
            return Err(zero_evidence());
        }
        Ok(msg)
    }

    /// BFS order from clique 0 and each clique's parent.
    fn rooted_order(&self) -> (Vec<usize>, Vec<Option<usize>>) {
        let n = self.cliques.len();
        let mut parent = vec![None; n];
        let mut seen = vec![false; n];
        let mut order = Vec::with_capacity(n);
        for root in 0..n {
            if seen[root] {
                continue;
            }
            seen[root] = true;
            let mut queue = VecDeque::from([root]);
            while let Some(c) = queue.pop_front() {
                order.push(c);
                for &nb in &self.neighbors[c] {
                    if !seen[nb] {
                        seen[nb] = true;
                        parent[nb] = Some(c);
                        queue.push_back(nb);
                    }
                }
            }
        }
        (order, parent)
    }
}

fn zero_evidence() -> Error {
    Error::Inference("evidence has zero probability".to_string())
}

fn intersection(a: &[usize], b: &[usize]) -> Vec<usize> {
    a.iter().filter(|v| b.binary_search(*v).is_ok()).copied().collect()
}

fn table_size(vars: &[usize], cards: &[usize]) -> usize {
    vars.iter()
        .map(|&v| cards[v])
        .try_fold(1usize, |acc, c| acc.checked_mul(c))
        .unwrap_or(usize::MAX)
}

/// Moralize, then eliminate greedily by min weight (ties: fewest fill-ins,
/// then lowest index). Returns maximal cliques as sorted variable lists.
fn triangulate(families: &[Vec<usize>], cards: &[usize], limit: usize) -> Result<Vec<Vec<usize>>> {
    let n = cards.len();
    let mut adj: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    for family in families {
        for (i, &a) in family.iter().enumerate() {
            for &b in &family[i + 1..] {
                if a != b {
                    adj[a].insert(b);
                    adj[b].insert(a);
                }
            }
        }
    }

    let mut remaining: BTreeSet<usize> = (0..n).collect();
    let mut cliques: Vec<Vec<usize>> = Vec::new();
    while !remaining.is_empty() {
        let mut best: Option<(usize, usize, usize)> = None;
        for &v in &remaining {
            let mut scope: Vec<usize> = adj[v].iter().copied().collect();
            scope.push(v);
            let weight = table_size(&scope, cards);
            let fill = fill_ins(&adj, v);
            let better = match best {
                None => true,
                Some((bw, bf, _)) => (weight, fill) < (bw, bf),
            };
            if better {
                best = Some((weight, fill, v));
            }
        }
        let Some((weight, _, v)) = best else {
            break;
        };

        if weight > limit {
            return Err(Error::ComplexityLimit {
                what: "junction tree clique states".to_string(),
                actual: weight,
                limit,
            });
        }

        let nbrs: Vec<usize> = adj[v].iter().copied().collect();
        let mut clique = nbrs.clone();
        clique.push(v);
        clique.sort_unstable();
        if !cliques.iter().any(|c| is_subset(&clique, c)) {
            cliques.push(clique);
        }

        for (i, &a) in nbrs.iter().enumerate() {
            for &b in &nbrs[i + 1..] {
                adj[a].insert(b);
                adj[b].insert(a);
            }
        }
        for &a in &nbrs {
            adj[a].remove(&v);
        }
        adj[v].clear();
        remaining.remove(&v);
    }
    Ok(cliques)
}

fn fill_ins(adj: &[BTreeSet<usize>], v: usize) -> usize {
    let nbrs: Vec<usize> = adj[v].iter().copied().collect();
    let mut count = 0;
    for (i, a) in nbrs.iter().enumerate() {
        for b in &nbrs[i + 1..] {
            if !adj[*a].contains(b) {
                count += 1;
            }
        }
    }
    count
}

fn is_subset(small: &[usize], big: &[usize]) -> bool {
    small.iter().all(|v| big.binary_search(v).is_ok())
}

/// Kruskal maximum spanning tree over separator sizes.
fn spanning_tree(cliques: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = cliques.len();
    let mut candidates = Vec::new();
    for i in 0..n {
        for j in i + 1..n {
            candidates.push((intersection(&cliques[i], &cliques[j]).len(), i, j));
        }
    }
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then((a.1, a.2).cmp(&(b.1, b.2))));

    let mut uf: Vec<usize> = (0..n).collect();
    fn find(uf: &mut [usize], mut x: usize) -> usize {
        while uf[x] != x {
            uf[x] = uf[uf[x]];
            x = uf[x];
        }
        x
    }

    let mut neighbors = vec![Vec::new(); n];
    for (_, i, j) in candidates {
        let (ri, rj) = (find(&mut uf, i), find(&mut uf, j));
        if ri != rj {
            uf[ri] = rj;
            neighbors[i].push(j);
            neighbors[j].push(i);
        }
    }
    neighbors
}

fn smallest_clique(cliques: &[Vec<usize>], cards: &[usize], vars: &[usize]) -> Option<usize> {
    cliques
        .iter()
        .enumerate()
        .filter(|(_, c)| vars.iter().all(|v| c.binary_search(v).is_ok()))
        .min_by_key(|(i, c)| (table_size(c, cards), *i))
        .map(|(i, _)| i)
}
