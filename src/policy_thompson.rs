//! Thompson sampling batch allocation.
//!
//! Every arm's Beta posterior is sampled `sample_size` times; the fraction of
//! draws each arm wins becomes its weight, and the batch is filled with
//! `batch_size` independent weighted choices.

use rand::rngs::StdRng;
use rand::Rng;
use crate::arm::Arms;
use crate::errors::{BanditError, Result};
use crate::logger::{Logger, LogEvent};
use crate::{logln, warnln};
use crate::policies::{AllocationPolicyTrait, BatchAllocation};
use crate::utils::format_f64_slice;

/// Redraws attempted after a weighted choice fails before falling back to the last arm
pub const WEIGHTED_CHOICE_RETRIES: usize = 3;

/// Pick an index with probability given by `relative_frequencies`.
///
/// Subtracts each weight from a uniform draw in [0, 1) until the remainder
/// goes negative. If rounding leaves the weights summing to slightly less
/// than the draw, every arm is exhausted and the frequencies are returned in
/// the error.
pub fn weighted_choice<R: Rng + ?Sized>(relative_frequencies: &[f64], rng: &mut R) -> Result<usize> {
    let mut r: f64 = rng.gen();
    for (index, frequency) in relative_frequencies.iter().enumerate() {
        r -= frequency;
        if r < 0.0 {
            return Ok(index);
        }
    }
    Err(BanditError::WeightedChoice { relative_frequencies: relative_frequencies.to_vec() })
}

pub struct PolicyThompsonSampling {
    /// Posterior draws per arm used to estimate each arm's win probability
    pub sample_size: usize,
}

impl PolicyThompsonSampling {
    pub fn new(sample_size: usize) -> Result<Self> {
        if sample_size == 0 {
            return Err(BanditError::InvalidParameter("Thompson sample size must be at least 1".to_string()));
        }
        Ok(Self { sample_size })
    }

    /// Fraction of joint posterior draws in which each arm had the highest value.
    /// Ties within a draw go to the lowest index.
    pub fn relative_frequencies(&self, arms: &Arms, rng: &mut StdRng) -> Result<Vec<f64>> {
        let samples = arms
            .arms
            .iter()
            .map(|arm| arm.sample(self.sample_size, &mut *rng))
            .collect::<Result<Vec<_>>>()?;

        let mut wins = vec![0u64; arms.len()];
        for draw in 0..self.sample_size {
            let mut best = 0;
            for arm in 1..samples.len() {
                if samples[arm][draw] > samples[best][draw] {
                    best = arm;
                }
            }
            wins[best] += 1;
        }
        Ok(wins.iter().map(|&w| w as f64 / self.sample_size as f64).collect())
    }

    /// Fill a batch with weighted choices over `relative_frequencies`.
    ///
    /// A failed choice is redrawn up to `WEIGHTED_CHOICE_RETRIES` times and
    /// then assigned to the last arm. Every failed attempt is logged; a draw
    /// with at least one failed attempt is counted once.
    pub fn allocate_from_frequencies(relative_frequencies: &[f64], batch_size: usize, rng: &mut StdRng, logger: &mut Logger) -> BatchAllocation {
        let n_arms = relative_frequencies.len();
        let mut trials = vec![0u64; n_arms];
        let mut fallbacks = 0;

        for _ in 0..batch_size {
            let mut chosen = None;
            let mut failed = false;
            for attempt in 0..=WEIGHTED_CHOICE_RETRIES {
                match weighted_choice(relative_frequencies, rng) {
                    Ok(index) => {
                        chosen = Some(index);
                        break;
                    }
                    Err(e) => {
                        failed = true;
                        warnln!(logger, LogEvent::Batch, "{} (attempt {} of {})", e, attempt + 1, WEIGHTED_CHOICE_RETRIES + 1);
                    }
                }
            }
            if failed {
                fallbacks += 1;
            }
            let index = match chosen {
                Some(index) => index,
                None => {
                    warnln!(logger, LogEvent::Batch, "weighted choice retries exhausted, assigning trial to last arm {}", n_arms - 1);
                    n_arms - 1
                }
            };
            trials[index] += 1;
        }

        BatchAllocation { trials, weighted_choice_fallbacks: fallbacks }
    }
}

impl AllocationPolicyTrait for PolicyThompsonSampling {
    fn allocate(&self, batch_index: usize, batch_size: usize, arms: &Arms, rng: &mut StdRng, logger: &mut Logger) -> Result<BatchAllocation> {
        if arms.is_empty() {
            return Err(BanditError::InvalidParameter("cannot allocate a batch across zero arms".to_string()));
        }
        let relative_frequencies = self.relative_frequencies(arms, rng)?;
        if logger.is_enabled(LogEvent::Batch) {
            logln!(logger, LogEvent::Batch, "thompson batch {}: relative frequencies {}", batch_index, format_f64_slice(&relative_frequencies, 4));
        }
        Ok(Self::allocate_from_frequencies(&relative_frequencies, batch_size, rng, logger))
    }

    fn policy_string(&self) -> String {
        format!("Thompson sampling (sample_size={})", self.sample_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::ArmPrior;
    use crate::logger::MemoryReceiver;
    use rand::SeedableRng;

    fn arms_with(counts: &[(u64, u64)]) -> Arms {
        let mut arms = Arms::new(&vec![ArmPrior::uniform(); counts.len()]).unwrap();
        for (arm_id, &(successes, trials)) in counts.iter().enumerate() {
            arms.update(arm_id, successes, trials).unwrap();
        }
        arms
    }

    #[test]
    fn test_relative_frequencies_sum_to_one() {
        let policy = PolicyThompsonSampling::new(1000).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let states: Vec<Vec<(u64, u64)>> = vec![
            vec![(0, 0), (0, 0)],
            vec![(5, 100), (6, 100), (50, 1000)],
            vec![(0, 5000), (5000, 5000)],
            vec![(1, 3), (2, 3), (3, 3), (0, 3)],
        ];
        for state in states {
            let frequencies = policy.relative_frequencies(&arms_with(&state), &mut rng).unwrap();
            assert_eq!(frequencies.len(), state.len());
            let total: f64 = frequencies.iter().sum();
            assert!((total - 1.0).abs() < 1e-6, "frequencies {:?} sum to {}", frequencies, total);
            assert!(frequencies.iter().all(|&f| (0.0..=1.0).contains(&f)));
        }
    }

    #[test]
    fn test_clear_winner_takes_the_batch() {
        let policy = PolicyThompsonSampling::new(500).unwrap();
        let arms = arms_with(&[(10, 1000), (500, 1000)]);
        let mut rng = StdRng::seed_from_u64(3);
        let allocation = policy.allocate(4, 2000, &arms, &mut rng, &mut Logger::new()).unwrap();
        assert_eq!(allocation.total(), 2000);
        assert_eq!(allocation.trials, vec![0, 2000]);
        assert_eq!(allocation.weighted_choice_fallbacks, 0);
    }

    #[test]
    fn test_weighted_choice_in_range() {
        let mut rng = StdRng::seed_from_u64(5);
        let frequencies = [0.2, 0.3, 0.5];
        let mut counts = [0usize; 3];
        for _ in 0..10_000 {
            let index = weighted_choice(&frequencies, &mut rng).unwrap();
            assert!(index < 3);
            counts[index] += 1;
        }
        assert!((counts[2] as f64 / 10_000.0 - 0.5).abs() < 0.03);
    }

    #[test]
    fn test_weighted_choice_failure_carries_frequencies() {
        let mut rng = StdRng::seed_from_u64(5);
        let err = weighted_choice(&[0.0, 0.0], &mut rng).unwrap_err();
        assert_eq!(err, BanditError::WeightedChoice { relative_frequencies: vec![0.0, 0.0] });
    }

    #[test]
    fn test_exhausted_choices_fall_back_to_last_arm_and_are_reported() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut logger = Logger::new();
        let (receiver, lines) = MemoryReceiver::new(vec![LogEvent::Run]);
        logger.add_receiver(receiver);
        let allocation = PolicyThompsonSampling::allocate_from_frequencies(&[0.0, 0.0, 0.0], 4, &mut rng, &mut logger);
        assert_eq!(allocation.trials, vec![0, 0, 4]);
        assert_eq!(allocation.weighted_choice_fallbacks, 4);
        assert!(lines.borrow().contains("Weighted choice failed"));
    }

    #[test]
    fn test_single_failed_draw_counts_once() {
        let mut rng = StdRng::seed_from_u64(8);
        let allocation = PolicyThompsonSampling::allocate_from_frequencies(&[0.0, 0.0], 1, &mut rng, &mut Logger::new());
        assert_eq!(allocation.trials, vec![0, 1]);
        assert_eq!(allocation.weighted_choice_fallbacks, 1);
    }

    #[test]
    fn test_recovered_draws_count_at_most_once_each() {
        let mut rng = StdRng::seed_from_u64(21);
        let allocation = PolicyThompsonSampling::allocate_from_frequencies(&[0.5, 0.0], 1000, &mut rng, &mut Logger::new());
        assert_eq!(allocation.total(), 1000);
        assert!(allocation.weighted_choice_fallbacks > 0);
        assert!(allocation.weighted_choice_fallbacks <= 1000);
        // the last arm only receives draws whose every attempt failed
        assert!(allocation.trials[1] <= allocation.weighted_choice_fallbacks as u64);
    }

    #[test]
    fn test_rejects_zero_sample_size() {
        assert!(PolicyThompsonSampling::new(0).is_err());
    }
}
