use rand::rngs::StdRng;
use crate::arm::Arms;
use crate::errors::{BanditError, Result};
use crate::logger::Logger;
use crate::policies::{AllocationPolicyTrait, BatchAllocation};

/// Classic A/B split: the batch is divided evenly every time.
///
/// Integer division; the remainder of `batch_size / n_arms` is dropped from
/// the batch rather than assigned to any arm.
pub struct PolicyFixedSplit;

impl AllocationPolicyTrait for PolicyFixedSplit {
    fn allocate(&self, _batch_index: usize, batch_size: usize, arms: &Arms, _rng: &mut StdRng, _logger: &mut Logger) -> Result<BatchAllocation> {
        if arms.is_empty() {
            return Err(BanditError::InvalidParameter("cannot split a batch across zero arms".to_string()));
        }
        let examples = (batch_size / arms.len()) as u64;
        Ok(BatchAllocation::new(vec![examples; arms.len()]))
    }

    fn policy_string(&self) -> String {
        "Fixed split".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::ArmPrior;
    use rand::SeedableRng;

    #[test]
    fn test_even_split_drops_remainder() {
        let mut arms = Arms::new(&[ArmPrior::uniform(); 3]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let mut logger = Logger::new();
        for batch_index in 0..4 {
            let allocation = PolicyFixedSplit.allocate(batch_index, 1000, &arms, &mut rng, &mut logger).unwrap();
            assert_eq!(allocation.trials, vec![333, 333, 333]);
            assert_eq!(allocation.total(), 1000 - 1000 % 3);
            // Outcomes never change the split
            arms.update(2, 100, 333).unwrap();
        }
    }

    #[test]
    fn test_batch_smaller_than_arms() {
        let arms = Arms::new(&[ArmPrior::uniform(); 4]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let allocation = PolicyFixedSplit.allocate(0, 3, &arms, &mut rng, &mut Logger::new()).unwrap();
        assert_eq!(allocation.trials, vec![0, 0, 0, 0]);
    }
}
