//! Discrete factors over integer-indexed variables.
//!
//! Variables are kept sorted; values are row-major with the last variable
//! varying fastest. Products and marginals walk the output (resp. input)
//! table once with an odometer, updating operand offsets incrementally.

/// A non-negative table over a set of discrete variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    vars: Vec<usize>,
    cards: Vec<usize>,
    values: Vec<f64>,
}

fn row_major_strides(cards: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; cards.len()];
    for i in (0..cards.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * cards[i + 1];
    }
    strides
}

/// Stride of each of `vars` inside `factor` (0 when absent).
fn strides_within(vars: &[usize], factor: &Factor) -> Vec<usize> {
    let own = row_major_strides(&factor.cards);
    vars.iter()
        .map(|v| factor.vars.binary_search(v).map_or(0, |p| own[p]))
        .collect()
}

/// Advance `assign` like an odometer (last digit fastest), keeping every
/// offset in `offsets` in step with its strides. Returns false on wrap.
fn advance(assign: &mut [usize], cards: &[usize], strides: &[&[usize]], offsets: &mut [usize]) -> bool {
    for pos in (0..assign.len()).rev() {
        assign[pos] += 1;
        for (off, st) in offsets.iter_mut().zip(strides) {
            *off += st[pos];
        }
        if assign[pos] < cards[pos] {
            return true;
        }
        for (off, st) in offsets.iter_mut().zip(strides) {
            *off -= st[pos] * cards[pos];
        }
        assign[pos] = 0;
    }
    false
}

impl Factor {
    /// The constant factor 1 with empty scope.
    pub fn unit() -> Self {
        Self {
            vars: Vec::new(),
            cards: Vec::new(),
            values: vec![1.0],
        }
    }

    /// All-ones factor over `vars` (must be sorted and distinct).
    pub fn ones(vars: Vec<usize>, cards: Vec<usize>) -> Self {
        let size = cards.iter().product();
        Self {
            vars,
            cards,
            values: vec![1.0; size],
        }
    }

    /// Build a factor from a row-major table over `vars` in any order.
    pub fn from_table(vars: &[usize], cards: &[usize], values: &[f64]) -> Self {
        let mut order: Vec<usize> = (0..vars.len()).collect();
        order.sort_by_key(|&i| vars[i]);
        let sorted_vars: Vec<usize> = order.iter().map(|&i| vars[i]).collect();
        let sorted_cards: Vec<usize> = order.iter().map(|&i| cards[i]).collect();

        // Stride in the source table of each sorted position.
        let src_strides = row_major_strides(cards);
        let strides: Vec<usize> = order.iter().map(|&i| src_strides[i]).collect();

        let size: usize = sorted_cards.iter().product();
        let mut out = Vec::with_capacity(size);
        let mut assign = vec![0; sorted_vars.len()];
        let mut offsets = [0usize];
        loop {
            out.push(values[offsets[0]]);
            if !advance(&mut assign, &sorted_cards, &[&strides[..]], &mut offsets) {
                break;
            }
        }
        Self {
            vars: sorted_vars,
            cards: sorted_cards,
            values: out,
        }
    }

    pub fn vars(&self) -> &[usize] {
        &self.vars
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn contains(&self, var: usize) -> bool {
        self.vars.binary_search(&var).is_ok()
    }

    /// Pointwise product over the union of both scopes.
    pub fn product(&self, other: &Factor) -> Factor {
        let mut vars = Vec::with_capacity(self.vars.len() + other.vars.len());
        let mut cards = Vec::with_capacity(vars.capacity());
        let (mut i, mut j) = (0, 0);
        while i < self.vars.len() || j < other.vars.len() {
            let take_self = j >= other.vars.len()
                || (i < self.vars.len() && self.vars[i] <= other.vars[j]);
            if take_self {
                if j < other.vars.len() && self.vars[i] == other.vars[j] {
                    j += 1;
                }
                vars.push(self.vars[i]);
                cards.push(self.cards[i]);
                i += 1;
            } else {
                vars.push(other.vars[j]);
                cards.push(other.cards[j]);
                j += 1;
            }
        }

        let sa = strides_within(&vars, self);
        let sb = strides_within(&vars, other);
        let size: usize = cards.iter().product();
        let mut values = Vec::with_capacity(size);
        let mut assign = vec![0; vars.len()];
        let mut offsets = [0usize, 0usize];
        loop {
            values.push(self.values[offsets[0]] * other.values[offsets[1]]);
            if !advance(&mut assign, &cards, &[&sa[..], &sb[..]], &mut offsets) {
                break;
            }
        }
        Factor { vars, cards, values }
    }

    /// Sum out every variable not in `keep`.
    pub fn marginalize_to(&self, keep: &[usize]) -> Factor {
        let (vars, cards): (Vec<usize>, Vec<usize>) = self
            .vars
            .iter()
            .zip(&self.cards)
            .filter(|(v, _)| keep.contains(*v))
            .map(|(v, c)| (*v, *c))
            .unzip();
        let mut out = Factor::ones(vars, cards);
        out.values.iter_mut().for_each(|v| *v = 0.0);

        let st = strides_within(&self.vars, &out);
        let mut assign = vec![0; self.vars.len()];
        let mut offsets = [0usize];
        for &v in &self.values {
            out.values[offsets[0]] += v;
            advance(&mut assign, &self.cards, &[&st[..]], &mut offsets);
        }
        out
    }

    /// Zero every entry where `var != state`.
    pub fn clamp(&mut self, var: usize, state: usize) {
        let Ok(pos) = self.vars.binary_search(&var) else {
            return;
        };
        let stride = row_major_strides(&self.cards)[pos];
        let card = self.cards[pos];
        for (i, v) in self.values.iter_mut().enumerate() {
            if (i / stride) % card != state {
                *v = 0.0;
            }
        }
    }

    /// Scale to sum 1; returns the previous total (0 leaves it untouched).
    pub fn normalize(&mut self) -> f64 {
        bt_math::normalize_in_place(&mut self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_vec(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-12, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn test_from_table_reorders() {
        // table over (2, 0) with cards (2, 3): value = 10*x2 + x0
        let values: Vec<f64> = (0..2)
            .flat_map(|a| (0..3).map(move |b| (10 * a + b) as f64))
            .collect();
        let f = Factor::from_table(&[2, 0], &[2, 3], &values);
        assert_eq!(f.vars(), &[0, 2]);
        // sorted layout (x0, x2), x2 fastest
        approx_vec(f.values(), &[0.0, 10.0, 1.0, 11.0, 2.0, 12.0]);
    }

    #[test]
    fn test_product_and_marginal() {
        let a = Factor::from_table(&[0], &[2], &[0.3, 0.7]);
        let b = Factor::from_table(&[0, 1], &[2, 2], &[0.9, 0.1, 0.2, 0.8]);
        let joint = a.product(&b);
        assert_eq!(joint.vars(), &[0, 1]);
        approx_vec(joint.values(), &[0.27, 0.03, 0.14, 0.56]);

        let m1 = joint.marginalize_to(&[1]);
        approx_vec(m1.values(), &[0.41, 0.59]);
        let m0 = joint.marginalize_to(&[0]);
        approx_vec(m0.values(), &[0.3, 0.7]);
        let total = joint.marginalize_to(&[]);
        approx_vec(total.values(), &[1.0]);
    }

    #[test]
    fn test_product_disjoint_scopes() {
        let a = Factor::from_table(&[3], &[2], &[0.5, 0.5]);
        let b = Factor::from_table(&[1], &[3], &[0.2, 0.3, 0.5]);
        let p = a.product(&b);
        assert_eq!(p.vars(), &[1, 3]);
        approx_vec(p.values(), &[0.1, 0.1, 0.15, 0.15, 0.25, 0.25]);
        assert_eq!(Factor::unit().product(&a), a);
    }

    #[test]
    fn test_clamp_and_normalize() {
        let mut f = Factor::from_table(&[0, 1], &[2, 2], &[0.1, 0.2, 0.3, 0.4]);
        f.clamp(0, 1);
        approx_vec(f.values(), &[0.0, 0.0, 0.3, 0.4]);
        f.clamp(5, 0);
        let total = f.normalize();
        assert!((total - 0.7).abs() < 1e-12);
        approx_vec(f.marginalize_to(&[1]).values(), &[3.0 / 7.0, 4.0 / 7.0]);
    }
}
