//! Beta-Bernoulli arm model.
//!
//! Each arm keeps cumulative successes and trials; the posterior is
//! Beta(alpha_prior + successes, beta_prior + failures).

use rand::Rng;
use rand_distr::{Beta, Distribution};
use crate::errors::{BanditError, Result};

/// Prior pseudo-counts for one arm
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmPrior {
    pub alpha: f64,
    pub beta: f64,
}

impl ArmPrior {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// Uniform prior, Beta(1, 1)
    pub fn uniform() -> Self {
        Self { alpha: 1.0, beta: 1.0 }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(BanditError::InvalidParameter(format!("alpha prior must be finite and > 0, got {}", self.alpha)));
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(BanditError::InvalidParameter(format!("beta prior must be finite and > 0, got {}", self.beta)));
        }
        Ok(())
    }
}

impl Default for ArmPrior {
    fn default() -> Self {
        Self::uniform()
    }
}

/// One arm of the experiment with its cumulative counts and posterior
#[derive(Debug, Clone)]
pub struct Arm {
    pub arm_id: usize,
    pub successes: u64,
    pub trials: u64,
    prior: ArmPrior,
    alpha: f64,
    beta: f64,
}

impl Arm {
    /// Create an arm at its prior with zero counts
    pub fn new(arm_id: usize, prior: ArmPrior) -> Result<Self> {
        prior.validate()?;
        Ok(Self {
            arm_id,
            successes: 0,
            trials: 0,
            prior,
            alpha: prior.alpha,
            beta: prior.beta,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Mean of the Beta posterior
    pub fn posterior_mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    /// Add observed deltas to the cumulative counts and recompute the posterior
    ///
    /// # Arguments
    /// * `successes_delta` - Successes observed since the last update
    /// * `trials_delta` - Trials run since the last update (must be >= successes_delta)
    pub fn update(&mut self, successes_delta: u64, trials_delta: u64) -> Result<()> {
        if successes_delta > trials_delta {
            return Err(BanditError::InvalidParameter(format!(
                "arm {}: successes delta {} exceeds trials delta {}",
                self.arm_id, successes_delta, trials_delta
            )));
        }
        let successes = self.successes + successes_delta;
        let trials = self.trials + trials_delta;
        let alpha = self.prior.alpha + successes as f64;
        let beta = self.prior.beta + (trials - successes) as f64;
        if !(alpha > 0.0 && beta > 0.0) {
            return Err(BanditError::InvalidParameter(format!(
                "arm {}: posterior would become Beta({}, {})",
                self.arm_id, alpha, beta
            )));
        }
        self.successes = successes;
        self.trials = trials;
        self.alpha = alpha;
        self.beta = beta;
        Ok(())
    }

    /// Draw `n` independent values from the posterior. Does not touch the arm state.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<f64>> {
        let dist = Beta::new(self.alpha, self.beta).map_err(|e| {
            BanditError::InvalidParameter(format!(
                "arm {}: cannot build Beta({}, {}): {}",
                self.arm_id, self.alpha, self.beta, e
            ))
        })?;
        let mut samples = Vec::with_capacity(n);
        for _ in 0..n {
            samples.push(dist.sample(rng));
        }
        Ok(samples)
    }
}

/// Per-run arm state. Owned by exactly one simulation run and lent to the
/// policy while it decides a batch.
#[derive(Debug, Clone)]
pub struct Arms {
    pub arms: Vec<Arm>,
}

impl Arms {
    /// Create one arm per prior, IDs matching the Vec index
    pub fn new(priors: &[ArmPrior]) -> Result<Self> {
        let arms = priors
            .iter()
            .enumerate()
            .map(|(arm_id, prior)| Arm::new(arm_id, *prior))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { arms })
    }

    pub fn len(&self) -> usize {
        self.arms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }

    pub fn successes(&self) -> Vec<u64> {
        self.arms.iter().map(|a| a.successes).collect()
    }

    pub fn trials(&self) -> Vec<u64> {
        self.arms.iter().map(|a| a.trials).collect()
    }

    pub fn update(&mut self, arm_id: usize, successes_delta: u64, trials_delta: u64) -> Result<()> {
        match self.arms.get_mut(arm_id) {
            Some(arm) => arm.update(successes_delta, trials_delta),
            None => Err(BanditError::InvalidParameter(format!("arm {} out of range ({} arms)", arm_id, self.arms.len()))),
        }
    }
}
