use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use crate::config::ExperimentConfig;
use crate::errors::Result;
use crate::logger::{Logger, LogEvent, FileReceiver, sanitize_filename};
use crate::policies::{AllocationPolicyTrait, PolicyType};
use crate::simulationrun::SimulationRun;
use crate::timeseries::{AggregatedTimeSeries, TimeSeriesAccumulator};
use crate::utils::VERBOSE_BATCH;
use crate::logln;

/// Runs one policy over every replicate of an experiment and averages the series
pub struct ExperimentAggregator {
    pub config: ExperimentConfig,
    policy: Box<dyn AllocationPolicyTrait>,
}

impl ExperimentAggregator {
    /// Create an aggregator, validating both the config and the policy parameters
    pub fn new(config: ExperimentConfig, policy_type: PolicyType) -> Result<Self> {
        config.validate()?;
        let policy = policy_type.create()?;
        Ok(Self { config, policy })
    }

    pub fn policy(&self) -> &dyn AllocationPolicyTrait {
        self.policy.as_ref()
    }

    /// Run `simulations` independent replicates and average them
    ///
    /// Replicate `i` is seeded with `config.run_seed(i)`. The first failing
    /// replicate aborts the whole aggregation.
    pub fn run(&self, logger: &mut Logger) -> Result<AggregatedTimeSeries> {
        let mut accumulator = TimeSeriesAccumulator::new(self.config.batches, self.config.n_bandits());
        for simulation in 0..self.config.simulations {
            let seed = self.config.run_seed(simulation);
            logln!(logger, LogEvent::Run, "run {} of {} (seed {})", simulation + 1, self.config.simulations, seed);
            let series = SimulationRun::new(&self.config, self.policy.as_ref(), seed)?.run(logger)?;
            let last = series.outcome(series.batches() - 1);
            logln!(
                logger,
                LogEvent::Run,
                "run {} done: trials {:?}, successes {:?}, weighted choice fallbacks {}",
                simulation + 1,
                last.total_trials,
                last.total_successes,
                series.weighted_choice_fallbacks
            );
            accumulator.add(&series)?;
        }
        logln!(logger, LogEvent::Run, "averaging {} runs", accumulator.runs());
        accumulator.finish()
    }

    /// Run the aggregation with per-variant log files attached
    ///
    /// # Arguments
    /// * `variant_description` - Description of the variant being run
    /// * `scenario_name` - Name of the scenario (for log file paths)
    /// * `variant_name` - Name of the variant (for log file paths)
    /// * `logger` - Logger for event-based logging
    pub fn run_variant(
        &self,
        variant_description: &str,
        scenario_name: &str,
        variant_name: &str,
        logger: &mut Logger,
    ) -> std::result::Result<AggregatedTimeSeries, Box<dyn Error>> {
        let scenario_dir = sanitize_filename(scenario_name);
        let variant_file = sanitize_filename(variant_name);

        let runs_receiver_id = logger.add_receiver(FileReceiver::new(
            &PathBuf::from(format!("log/{}/runs-{}.log", scenario_dir, variant_file)),
            vec![LogEvent::Run],
        )?);
        let variant_receiver_id = logger.add_receiver(FileReceiver::new(
            &PathBuf::from(format!("log/{}/variant-{}.log", scenario_dir, variant_file)),
            vec![LogEvent::Variant],
        )?);
        let batches_receiver_id = if VERBOSE_BATCH.load(Ordering::Relaxed) {
            Some(logger.add_receiver(FileReceiver::new(
                &PathBuf::from(format!("log/{}/batches-{}.log", scenario_dir, variant_file)),
                vec![LogEvent::Batch],
            )?))
        } else {
            None
        };

        logln!(logger, LogEvent::Variant, "\n=== {} ===", variant_description);
        logln!(logger, LogEvent::Variant, "Policy: {}", self.policy.policy_string());
        logln!(
            logger,
            LogEvent::Variant,
            "Arms: {}, batch size: {}, batches: {}, simulations: {}",
            self.config.n_bandits(),
            self.config.batch_size,
            self.config.batches,
            self.config.simulations
        );

        let result = self.run(logger);
        if let Ok(aggregated) = &result {
            printout(aggregated, logger);
        }

        if let Some(id) = batches_receiver_id {
            logger.remove_receiver(id);
        }
        logger.remove_receiver(variant_receiver_id);
        logger.remove_receiver(runs_receiver_id);

        Ok(result?)
    }
}

/// Output the final averaged per-arm allocation and reward
pub fn printout(aggregated: &AggregatedTimeSeries, logger: &mut Logger) {
    if aggregated.batches() == 0 {
        return;
    }
    let last = aggregated.batches() - 1;
    logln!(logger, LogEvent::Variant, "Averaged over {} simulations:", aggregated.simulations());
    let shares = aggregated.allocation_share(last);
    for arm in 0..aggregated.n_bandits() {
        let trials = aggregated.trials().get(last, arm);
        let successes = aggregated.successes().get(last, arm);
        let empirical_rate = if trials > 0.0 { successes / trials } else { 0.0 };
        logln!(
            logger,
            LogEvent::Variant,
            "  Arm {}: trials {:.1} ({:.2}%), successes {:.1}, empirical rate {:.4}",
            arm,
            trials,
            shares[arm],
            successes,
            empirical_rate
        );
    }
    logln!(
        logger,
        LogEvent::Variant,
        "Total trials: {:.1}, total successes: {:.1}",
        aggregated.total_trials(last),
        aggregated.total_successes(last)
    );
    if aggregated.weighted_choice_fallbacks() > 0 {
        logln!(logger, LogEvent::Variant, "Weighted choice fallbacks: {}", aggregated.weighted_choice_fallbacks());
    }
}
