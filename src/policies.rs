use rand::rngs::StdRng;
use crate::arm::Arms;
use crate::errors::Result;
use crate::logger::Logger;

pub use crate::policy_split::PolicyFixedSplit;
pub use crate::policy_epsilon::PolicyEpsilonGreedy;
pub use crate::policy_thompson::PolicyThompsonSampling;

/// Policy type determining how a batch is split across arms
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyType {
    FIXED_SPLIT,
    EPSILON_GREEDY { epsilon: f64 },
    THOMPSON_SAMPLING { sample_size: usize },
}

impl PolicyType {
    /// Build the policy, validating its parameters
    pub fn create(&self) -> Result<Box<dyn AllocationPolicyTrait>> {
        Ok(match self {
            PolicyType::FIXED_SPLIT => Box::new(PolicyFixedSplit),
            PolicyType::EPSILON_GREEDY { epsilon } => Box::new(PolicyEpsilonGreedy::new(*epsilon)?),
            PolicyType::THOMPSON_SAMPLING { sample_size } => Box::new(PolicyThompsonSampling::new(*sample_size)?),
        })
    }

    /// Short name used for log and chart file names
    pub fn short_name(&self) -> &'static str {
        match self {
            PolicyType::FIXED_SPLIT => "split",
            PolicyType::EPSILON_GREEDY { .. } => "epsilon",
            PolicyType::THOMPSON_SAMPLING { .. } => "thompson",
        }
    }
}

/// Number of trials assigned to each arm for one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchAllocation {
    pub trials: Vec<u64>,
    /// Draws with at least one failed weighted choice, counted once per draw
    pub weighted_choice_fallbacks: usize,
}

impl BatchAllocation {
    pub fn new(trials: Vec<u64>) -> Self {
        Self { trials, weighted_choice_fallbacks: 0 }
    }

    pub fn total(&self) -> u64 {
        self.trials.iter().sum()
    }
}

/// Trait implemented by every allocation policy
pub trait AllocationPolicyTrait {
    /// Decide how many trials of batch `batch_index` go to each arm
    ///
    /// # Arguments
    /// * `batch_index` - 0-based index of the batch being decided
    /// * `batch_size` - Trials available in this batch
    /// * `arms` - Arm state through the previous batch; decisions precede outcomes
    /// * `rng` - Random source of the owning run
    /// * `logger` - Logger for batch-level detail and recovered failures
    fn allocate(&self, batch_index: usize, batch_size: usize, arms: &Arms, rng: &mut StdRng, logger: &mut Logger) -> Result<BatchAllocation>;

    /// Human readable description of the policy and its parameters
    fn policy_string(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BanditError;

    #[test]
    fn test_create_validates_parameters() {
        assert!(PolicyType::FIXED_SPLIT.create().is_ok());
        assert!(PolicyType::EPSILON_GREEDY { epsilon: 0.1 }.create().is_ok());
        assert!(matches!(PolicyType::EPSILON_GREEDY { epsilon: 1.5 }.create(), Err(BanditError::InvalidParameter(_))));
        assert!(matches!(PolicyType::THOMPSON_SAMPLING { sample_size: 0 }.create(), Err(BanditError::InvalidParameter(_))));
    }

    #[test]
    fn test_short_names_are_distinct() {
        let names = [
            PolicyType::FIXED_SPLIT.short_name(),
            PolicyType::EPSILON_GREEDY { epsilon: 0.2 }.short_name(),
            PolicyType::THOMPSON_SAMPLING { sample_size: 10 }.short_name(),
        ];
        assert_ne!(names[0], names[1]);
        assert_ne!(names[1], names[2]);
        assert_ne!(names[0], names[2]);
    }
}
