use crate::arm::ArmPrior;
use crate::errors::{BanditError, Result};
use crate::planner::{SamplePlan, SampleSizePlanner};
use crate::utils::get_seed;

/// Everything a simulation needs except the policy itself
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    /// Ground-truth success probability of each arm
    pub bandit_returns: Vec<f64>,
    /// One prior per arm
    pub priors: Vec<ArmPrior>,
    pub batch_size: usize,
    pub batches: usize,
    pub simulations: usize,
    /// Base seed; replicate `i` runs with `seed + i`
    pub seed: u64,
}

impl ExperimentConfig {
    /// Create a config with an explicit batch count and uniform priors
    ///
    /// # Arguments
    /// * `bandit_returns` - Ground-truth return rate of every arm
    /// * `batch_size` - Trials per batch
    /// * `batches` - Number of batches per run
    /// * `simulations` - Number of independent replicates to average
    pub fn new(bandit_returns: Vec<f64>, batch_size: usize, batches: usize, simulations: usize) -> Result<Self> {
        let priors = vec![ArmPrior::uniform(); bandit_returns.len()];
        let config = Self {
            bandit_returns,
            priors,
            batch_size,
            batches,
            simulations,
            seed: get_seed(0),
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a config whose batch count comes from the sample size planner
    ///
    /// Returns the config together with the plan it was derived from.
    pub fn planned(bandit_returns: Vec<f64>, batch_size: usize, alpha: f64, simulations: usize) -> Result<(Self, SamplePlan)> {
        let planner = SampleSizePlanner::new(alpha)?;
        let plan = planner.plan(&bandit_returns, batch_size)?;
        let config = Self::new(bandit_returns, batch_size, plan.batches, simulations)?;
        Ok((config, plan))
    }

    /// Replace the priors; one per arm
    pub fn with_priors(mut self, priors: Vec<ArmPrior>) -> Result<Self> {
        self.priors = priors;
        self.validate()?;
        Ok(self)
    }

    #[cfg(test)]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn n_bandits(&self) -> usize {
        self.bandit_returns.len()
    }

    /// Seed used by replicate `simulation`
    pub fn run_seed(&self, simulation: usize) -> u64 {
        self.seed.wrapping_add(simulation as u64)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bandit_returns.is_empty() {
            return Err(BanditError::InvalidParameter("at least one arm is required".to_string()));
        }
        if let Some(bad) = self.bandit_returns.iter().find(|r| !(0.0..=1.0).contains(*r)) {
            return Err(BanditError::InvalidParameter(format!("return rate {} is outside [0, 1]", bad)));
        }
        if self.priors.len() != self.bandit_returns.len() {
            return Err(BanditError::InvalidParameter(format!(
                "{} priors given for {} arms",
                self.priors.len(),
                self.bandit_returns.len()
            )));
        }
        for prior in &self.priors {
            prior.validate()?;
        }
        if self.batch_size == 0 {
            return Err(BanditError::InvalidParameter("batch size must be positive".to_string()));
        }
        if self.batches == 0 {
            return Err(BanditError::InvalidParameter("number of batches must be positive".to_string()));
        }
        if self.simulations == 0 {
            return Err(BanditError::InvalidParameter("number of simulations must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates() {
        assert!(ExperimentConfig::new(vec![0.1, 0.2], 100, 5, 10).is_ok());
        assert!(ExperimentConfig::new(vec![], 100, 5, 10).is_err());
        assert!(ExperimentConfig::new(vec![0.1, 1.5], 100, 5, 10).is_err());
        assert!(ExperimentConfig::new(vec![0.1, 0.2], 0, 5, 10).is_err());
        assert!(ExperimentConfig::new(vec![0.1, 0.2], 100, 0, 10).is_err());
        assert!(ExperimentConfig::new(vec![0.1, 0.2], 100, 5, 0).is_err());
    }

    #[test]
    fn test_priors_must_match_arms() {
        let config = ExperimentConfig::new(vec![0.1, 0.2], 100, 5, 10).unwrap();
        assert!(config.clone().with_priors(vec![ArmPrior::uniform()]).is_err());
        assert!(config.clone().with_priors(vec![ArmPrior::uniform(), ArmPrior::new(0.0, 1.0)]).is_err());
        let config = config.with_priors(vec![ArmPrior::new(2.0, 8.0), ArmPrior::uniform()]).unwrap();
        assert_eq!(config.priors[0], ArmPrior::new(2.0, 8.0));
    }

    #[test]
    fn test_planned_uses_planner_batches() {
        let (config, plan) = ExperimentConfig::planned(vec![0.05, 0.10], 100, 0.01, 3).unwrap();
        assert_eq!(config.batches, plan.batches);
        assert!(config.batches > 0);
        assert!(matches!(
            ExperimentConfig::planned(vec![0.05], 100, 0.01, 3),
            Err(BanditError::InsufficientArms(1))
        ));
    }

    #[test]
    fn test_run_seeds_differ_per_replicate() {
        let config = ExperimentConfig::new(vec![0.1, 0.2], 100, 5, 10).unwrap().with_seed(42);
        assert_eq!(config.run_seed(0), 42);
        assert_eq!(config.run_seed(3), 45);
    }
}
