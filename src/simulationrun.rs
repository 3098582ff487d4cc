//! This file contains the SimulationRun struct, which runs one single replicate of an experiment
//! (replicates are then averaged by experiment.rs).
//!
//! A run walks through its batches strictly in order: the policy decides the allocation from the
//! state through the previous batch, outcomes are drawn from each arm's ground-truth rate, and the
//! deltas are fed back into the arm posteriors.

use std::sync::atomic::Ordering;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Binomial, Distribution};
use crate::arm::Arms;
use crate::config::ExperimentConfig;
use crate::errors::{BanditError, Result};
use crate::logger::{Logger, LogEvent};
use crate::logln;
use crate::policies::AllocationPolicyTrait;
use crate::timeseries::{BatchOutcome, RunTimeSeries};
use crate::utils::{format_f64_slice, TOTAL_SIMULATION_RUNS};

/// Where a run currently is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Initialized,
    /// Index of the next batch to run
    Batch(usize),
    Completed,
}

/// One replicate: its own arms, its own RNG, its own series
pub struct SimulationRun<'a> {
    config: &'a ExperimentConfig,
    policy: &'a dyn AllocationPolicyTrait,
    arms: Arms,
    series: RunTimeSeries,
    rng: StdRng,
    state: RunState,
}

impl<'a> SimulationRun<'a> {
    /// Create a run with every arm at its prior
    ///
    /// # Arguments
    /// * `config` - Experiment the run belongs to (validated again here)
    /// * `policy` - Policy deciding every batch's allocation
    /// * `seed` - Seed of this run's RNG
    pub fn new(config: &'a ExperimentConfig, policy: &'a dyn AllocationPolicyTrait, seed: u64) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            policy,
            arms: Arms::new(&config.priors)?,
            series: RunTimeSeries::new(config.batches, config.n_bandits()),
            rng: StdRng::seed_from_u64(seed),
            state: RunState::Initialized,
        })
    }

    #[cfg(test)]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[cfg(test)]
    pub fn arms(&self) -> &Arms {
        &self.arms
    }

    /// Run exactly one batch. Returns false once the run is completed.
    pub fn step(&mut self, logger: &mut Logger) -> Result<bool> {
        let batch_index = match self.state {
            RunState::Initialized => 0,
            RunState::Batch(i) => i,
            RunState::Completed => return Ok(false),
        };

        let allocation = self.policy.allocate(batch_index, self.config.batch_size, &self.arms, &mut self.rng, logger)?;
        if allocation.trials.len() != self.arms.len() {
            return Err(BanditError::Configuration(format!(
                "policy allocated {} arms, experiment has {}",
                allocation.trials.len(),
                self.arms.len()
            )));
        }

        let mut batch_successes = Vec::with_capacity(self.arms.len());
        for (&trials, &rate) in allocation.trials.iter().zip(self.config.bandit_returns.iter()) {
            let binomial = Binomial::new(trials, rate)
                .map_err(|e| BanditError::InvalidParameter(format!("cannot draw Binomial({}, {}): {}", trials, rate, e)))?;
            batch_successes.push(binomial.sample(&mut self.rng));
        }

        for (arm_id, (&successes, &trials)) in batch_successes.iter().zip(allocation.trials.iter()).enumerate() {
            self.arms.update(arm_id, successes, trials)?;
        }

        self.series.push(&BatchOutcome {
            total_trials: self.arms.trials(),
            total_successes: self.arms.successes(),
        });
        self.series.weighted_choice_fallbacks += allocation.weighted_choice_fallbacks;

        if logger.is_enabled(LogEvent::Batch) {
            logln!(
                logger,
                LogEvent::Batch,
                "batch {}: allocated {} as {:?}, successes {:?}, cumulative trials {:?}, cumulative successes {:?}",
                batch_index,
                allocation.total(),
                allocation.trials,
                batch_successes,
                self.arms.trials(),
                self.arms.successes()
            );
        }

        self.state = if batch_index + 1 >= self.config.batches {
            TOTAL_SIMULATION_RUNS.fetch_add(1, Ordering::Relaxed);
            if logger.is_enabled(LogEvent::Batch) {
                let means: Vec<f64> = self.arms.arms.iter().map(|a| a.posterior_mean()).collect();
                let posteriors: Vec<String> = self.arms.arms.iter().map(|a| format!("Beta({:.1}, {:.1})", a.alpha(), a.beta())).collect();
                logln!(
                    logger,
                    LogEvent::Batch,
                    "completed after {} batches, posteriors {}, means {}",
                    batch_index + 1,
                    posteriors.join(" "),
                    format_f64_slice(&means, 4)
                );
            }
            RunState::Completed
        } else {
            RunState::Batch(batch_index + 1)
        };
        Ok(true)
    }

    /// Consume a completed run and hand out its series
    pub fn finish(self) -> Result<RunTimeSeries> {
        match self.state {
            RunState::Completed => Ok(self.series),
            state => Err(BanditError::Configuration(format!("run finished early in state {:?}", state))),
        }
    }

    /// Step through every batch and return the series
    pub fn run(mut self, logger: &mut Logger) -> Result<RunTimeSeries> {
        while self.step(logger)? {}
        self.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::MemoryReceiver;
    use crate::policies::PolicyType;

    fn all_policies() -> Vec<PolicyType> {
        vec![
            PolicyType::FIXED_SPLIT,
            PolicyType::EPSILON_GREEDY { epsilon: 0.1 },
            PolicyType::THOMPSON_SAMPLING { sample_size: 200 },
        ]
    }

    #[test]
    fn test_counts_never_decrease() {
        let config = ExperimentConfig::new(vec![0.05, 0.3, 0.1], 300, 8, 1).unwrap();
        for policy_type in all_policies() {
            let policy = policy_type.create().unwrap();
            let series = SimulationRun::new(&config, policy.as_ref(), 7).unwrap().run(&mut Logger::new()).unwrap();
            assert_eq!(series.batches(), 8);
            for batch in 1..series.batches() {
                for arm in 0..3 {
                    assert!(series.trials().get(batch, arm) >= series.trials().get(batch - 1, arm));
                    assert!(series.successes().get(batch, arm) >= series.successes().get(batch - 1, arm));
                    assert!(series.successes().get(batch, arm) <= series.trials().get(batch, arm));
                }
            }
        }
    }

    #[test]
    fn test_fixed_split_totals() {
        let config = ExperimentConfig::new(vec![0.2, 0.4, 0.6], 100, 5, 1).unwrap();
        let policy = PolicyType::FIXED_SPLIT.create().unwrap();
        let series = SimulationRun::new(&config, policy.as_ref(), 1).unwrap().run(&mut Logger::new()).unwrap();
        for batch in 0..5 {
            let total: u64 = series.trials().row(batch).iter().sum();
            assert_eq!(total, 99 * (batch as u64 + 1));
        }
    }

    #[test]
    fn test_same_seed_same_series() {
        let config = ExperimentConfig::new(vec![0.1, 0.12], 500, 6, 1).unwrap();
        let policy = PolicyType::THOMPSON_SAMPLING { sample_size: 100 }.create().unwrap();
        let a = SimulationRun::new(&config, policy.as_ref(), 99).unwrap().run(&mut Logger::new()).unwrap();
        let b = SimulationRun::new(&config, policy.as_ref(), 99).unwrap().run(&mut Logger::new()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_step_walks_states_and_finish_requires_completion() {
        let config = ExperimentConfig::new(vec![0.5, 0.5], 10, 2, 1).unwrap();
        let policy = PolicyType::FIXED_SPLIT.create().unwrap();
        let mut logger = Logger::new();

        let mut run = SimulationRun::new(&config, policy.as_ref(), 0).unwrap();
        assert_eq!(run.state(), RunState::Initialized);
        assert!(run.step(&mut logger).unwrap());
        assert_eq!(run.state(), RunState::Batch(1));
        assert!(run.finish().is_err());

        let mut run = SimulationRun::new(&config, policy.as_ref(), 0).unwrap();
        assert!(run.step(&mut logger).unwrap());
        assert!(run.step(&mut logger).unwrap());
        assert_eq!(run.state(), RunState::Completed);
        assert!(!run.step(&mut logger).unwrap());
        assert_eq!(run.arms().trials(), vec![10, 10]);
        assert_eq!(run.finish().unwrap().batches(), 2);
    }

    #[test]
    fn test_completion_logs_posteriors() {
        let config = ExperimentConfig::new(vec![0.0, 1.0], 10, 2, 1).unwrap();
        let policy = PolicyType::FIXED_SPLIT.create().unwrap();
        let mut logger = Logger::new();
        let (receiver, lines) = MemoryReceiver::new(vec![LogEvent::Batch]);
        logger.add_receiver(receiver);
        SimulationRun::new(&config, policy.as_ref(), 4).unwrap().run(&mut logger).unwrap();

        let lines = lines.borrow();
        assert!(lines.contains("batch 0: allocated 10 as [5, 5]"));
        assert!(lines.contains("completed after 2 batches, posteriors Beta(1.0, 11.0) Beta(11.0, 1.0)"));
    }

    #[test]
    fn test_extreme_rates() {
        let config = ExperimentConfig::new(vec![0.0, 1.0], 50, 3, 1).unwrap();
        let policy = PolicyType::EPSILON_GREEDY { epsilon: 0.2 }.create().unwrap();
        let series = SimulationRun::new(&config, policy.as_ref(), 3).unwrap().run(&mut Logger::new()).unwrap();
        let last = series.outcome(2);
        assert_eq!(last.total_successes[0], 0);
        assert_eq!(last.total_successes[1], last.total_trials[1]);
    }
}
