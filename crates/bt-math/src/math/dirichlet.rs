//! Dirichlet-Multinomial smoothing for categorical CPT columns.
//!
//! The model uses:
//! - Prior: `p = (p_1..p_K) ~ Dirichlet(α_1..α_K)`
//! - Likelihood: `n = (n_1..n_K) | p ~ Multinomial(N, p)` where `N = Σ_i n_i`
//! - Posterior: `p | n ~ Dirichlet(α_i + n_i)`
//!
//! The posterior predictive mean is the smoothed column. With a positive prior
//! every entry stays strictly above zero, which keeps exact inference away
//! from impossible-evidence corners.

/// Parameters for a Dirichlet distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct DirichletParams {
    /// Concentration parameters (all must be > 0)
    pub alpha: Vec<f64>,
}

impl DirichletParams {
    /// Create new Dirichlet parameters with validation.
    ///
    /// Returns None if any parameter is non-positive, NaN, or if the vector is empty.
    pub fn new(alpha: Vec<f64>) -> Option<Self> {
        if alpha.is_empty() {
            return None;
        }
        for &a in &alpha {
            if a.is_nan() || a <= 0.0 {
                return None;
            }
        }
        Some(Self { alpha })
    }

    /// Create a symmetric Dirichlet with all α_i = value.
    pub fn symmetric(k: usize, value: f64) -> Option<Self> {
        if k == 0 || value.is_nan() || value <= 0.0 {
            return None;
        }
        Some(Self {
            alpha: vec![value; k],
        })
    }

    /// Laplace prior: all α_i = 1.
    pub fn laplace(k: usize) -> Option<Self> {
        Self::symmetric(k, 1.0)
    }

    /// Prior centred on `mean` with extra mass `weight`, on top of a
    /// symmetric floor `alpha`: α_i = alpha + weight · mean_i.
    pub fn informed(mean: &[f64], alpha: f64, weight: f64) -> Option<Self> {
        if weight.is_nan() || weight < 0.0 {
            return None;
        }
        Self::new(mean.iter().map(|m| alpha + weight * m.max(0.0)).collect())
    }

    /// Number of categories K.
    pub fn k(&self) -> usize {
        self.alpha.len()
    }

    /// Sum of all concentration parameters: α_0 = Σ_i α_i.
    pub fn concentration(&self) -> f64 {
        self.alpha.iter().sum()
    }

    /// Mean of the Dirichlet distribution: E[p_i] = α_i / α_0.
    pub fn mean(&self) -> Vec<f64> {
        let sum = self.concentration();
        self.alpha.iter().map(|a| a / sum).collect()
    }
}

/// Compute posterior parameters after observing counts.
///
/// Returns None when the counts do not match the prior or are invalid.
pub fn posterior_params(prior: &DirichletParams, counts: &[f64]) -> Option<DirichletParams> {
    if counts.len() != prior.k() {
        return None;
    }
    for &c in counts {
        if c.is_nan() || c < 0.0 {
            return None;
        }
    }

    let new_alpha: Vec<f64> = prior
        .alpha
        .iter()
        .zip(counts.iter())
        .map(|(&a, &n)| a + n)
        .collect();

    DirichletParams::new(new_alpha)
}

/// Predictive probabilities for the next observation: α'_i / Σ_j α'_j.
pub fn predictive_probs(posterior: &DirichletParams) -> Vec<f64> {
    posterior.mean()
}

/// Smoothed probability column for observed `counts` under `prior`.
///
/// Falls back to the prior mean when the counts are unusable.
pub fn smoothed_column(prior: &DirichletParams, counts: &[f64]) -> Vec<f64> {
    match posterior_params(prior, counts) {
        Some(post) => predictive_probs(&post),
        None => prior.mean(),
    }
}
