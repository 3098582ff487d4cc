//! Epsilon-greedy batch allocation.
//!
//! A fixed fraction `epsilon` of every batch is spread evenly across all arms
//! (exploration); everything left goes to the arm with the most cumulative
//! successes so far (exploitation). The very first batch of a run has no data
//! to pick a leader from and is split evenly instead.

use rand::rngs::StdRng;
use crate::arm::Arms;
use crate::errors::{BanditError, Result};
use crate::logger::{Logger, LogEvent};
use crate::logln;
use crate::policies::{AllocationPolicyTrait, BatchAllocation};

pub struct PolicyEpsilonGreedy {
    pub epsilon: f64,
}

impl PolicyEpsilonGreedy {
    pub fn new(epsilon: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(BanditError::InvalidParameter(format!("epsilon must be in [0, 1], got {}", epsilon)));
        }
        Ok(Self { epsilon })
    }

    /// Arm with the strictly highest cumulative successes.
    /// Ties go to the lowest index; arm 0 leads before any success is seen.
    pub fn best_arm(arms: &Arms) -> usize {
        let mut best = 0;
        let mut max_successes = 0;
        for arm in &arms.arms {
            if arm.successes > max_successes {
                max_successes = arm.successes;
                best = arm.arm_id;
            }
        }
        best
    }

    /// Exploration trials given to each arm in a regular batch
    pub fn exploration_per_arm(&self, batch_size: usize, n_arms: usize) -> u64 {
        let exploration_total = batch_size as f64 * self.epsilon;
        (exploration_total / n_arms as f64).floor() as u64
    }
}

impl AllocationPolicyTrait for PolicyEpsilonGreedy {
    fn allocate(&self, batch_index: usize, batch_size: usize, arms: &Arms, _rng: &mut StdRng, logger: &mut Logger) -> Result<BatchAllocation> {
        let n_arms = arms.len();
        if n_arms == 0 {
            return Err(BanditError::InvalidParameter("cannot allocate a batch across zero arms".to_string()));
        }

        if batch_index == 0 {
            let examples = (batch_size / n_arms) as u64;
            logln!(logger, LogEvent::Batch, "epsilon-greedy batch 0: even split of {} per arm", examples);
            return Ok(BatchAllocation::new(vec![examples; n_arms]));
        }

        let best = Self::best_arm(arms);
        let exploration = self.exploration_per_arm(batch_size, n_arms);
        let exploitation = (batch_size as u64).saturating_sub(exploration * n_arms as u64);

        let mut trials = vec![exploration; n_arms];
        trials[best] += exploitation;
        logln!(
            logger,
            LogEvent::Batch,
            "epsilon-greedy batch {}: best arm {}, exploration {} per arm, exploitation {}",
            batch_index,
            best,
            exploration,
            exploitation
        );
        Ok(BatchAllocation::new(trials))
    }

    fn policy_string(&self) -> String {
        format!("Epsilon greedy (epsilon={:.3})", self.epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::ArmPrior;
    use rand::SeedableRng;

    fn arms_with_successes(successes: &[u64]) -> Arms {
        let mut arms = Arms::new(&vec![ArmPrior::uniform(); successes.len()]).unwrap();
        for (arm_id, &s) in successes.iter().enumerate() {
            arms.update(arm_id, s, 1000).unwrap();
        }
        arms
    }

    #[test]
    fn test_rejects_epsilon_outside_unit_interval() {
        assert!(PolicyEpsilonGreedy::new(-0.1).is_err());
        assert!(PolicyEpsilonGreedy::new(1.01).is_err());
        assert!(PolicyEpsilonGreedy::new(0.0).is_ok());
        assert!(PolicyEpsilonGreedy::new(1.0).is_ok());
    }

    #[test]
    fn test_first_batch_is_even_regardless_of_epsilon() {
        let arms = arms_with_successes(&[0, 0, 0]);
        let mut rng = StdRng::seed_from_u64(0);
        for epsilon in [0.0, 0.1, 0.5, 1.0] {
            let policy = PolicyEpsilonGreedy::new(epsilon).unwrap();
            let allocation = policy.allocate(0, 1000, &arms, &mut rng, &mut Logger::new()).unwrap();
            assert_eq!(allocation.trials, vec![333, 333, 333]);
        }
    }

    #[test]
    fn test_best_arm_ties_and_default() {
        assert_eq!(PolicyEpsilonGreedy::best_arm(&arms_with_successes(&[0, 0, 0])), 0);
        assert_eq!(PolicyEpsilonGreedy::best_arm(&arms_with_successes(&[5, 9, 9])), 1);
        assert_eq!(PolicyEpsilonGreedy::best_arm(&arms_with_successes(&[5, 3, 7])), 2);
    }

    #[test]
    fn test_exploitation_goes_to_leader() {
        let arms = arms_with_successes(&[10, 40, 20]);
        let policy = PolicyEpsilonGreedy::new(0.1).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let allocation = policy.allocate(1, 1000, &arms, &mut rng, &mut Logger::new()).unwrap();
        // 100 exploration trials -> 33 per arm, remaining 901 to arm 1
        assert_eq!(allocation.trials, vec![33, 33 + 901, 33]);
        assert_eq!(allocation.total(), 1000);
    }

    #[test]
    fn test_exploitation_never_negative() {
        let arms = arms_with_successes(&[1, 2, 3, 4, 5, 6, 7]);
        let mut rng = StdRng::seed_from_u64(0);
        for epsilon in [0.0, 0.33, 0.999, 1.0] {
            let policy = PolicyEpsilonGreedy::new(epsilon).unwrap();
            for batch_size in [1, 7, 10, 999, 1000] {
                let allocation = policy.allocate(3, batch_size, &arms, &mut rng, &mut Logger::new()).unwrap();
                let exploration = policy.exploration_per_arm(batch_size, 7);
                assert!(exploration * 7 <= batch_size as u64);
                assert_eq!(allocation.total(), batch_size as u64);
            }
        }
    }
}
