use std::error::Error;
use std::sync::atomic::Ordering;
use crate::config::ExperimentConfig;
use crate::experiment::ExperimentAggregator;
use crate::logger::{Logger, LogEvent};
use crate::policies::PolicyType;
use crate::timeseries::AggregatedTimeSeries;
use crate::utils::CHARTS_ENABLED;
use crate::{errln, logln};

/// Function type for scenario entry functions
pub type ScenarioFn = fn(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn Error>>;

/// Entry in the scenario catalog
#[derive(Clone)]
pub struct ScenarioEntry {
    pub short_name: &'static str,
    pub run: ScenarioFn,
}

inventory::collect!(ScenarioEntry);

/// Get all registered scenarios from the catalog
pub fn get_scenario_catalog() -> Vec<ScenarioEntry> {
    inventory::iter::<ScenarioEntry>
        .into_iter()
        .map(|entry| entry.clone())
        .collect()
}

/// Averaged result of one policy within a scenario
pub struct VariantResult {
    pub policy_type: PolicyType,
    pub aggregated: AggregatedTimeSeries,
}

/// Run the same experiment once per policy, each as its own logged variant,
/// and render charts when enabled
pub fn run_policy_comparison(
    config: &ExperimentConfig,
    policies: &[PolicyType],
    scenario_name: &str,
    logger: &mut Logger,
) -> Result<Vec<VariantResult>, Box<dyn Error>> {
    let mut results = Vec::with_capacity(policies.len());
    for policy_type in policies {
        let aggregator = ExperimentAggregator::new(config.clone(), policy_type.clone())?;
        let description = format!("Running {}", aggregator.policy().policy_string());
        let aggregated = aggregator.run_variant(&description, scenario_name, policy_type.short_name(), logger)?;
        results.push(VariantResult { policy_type: policy_type.clone(), aggregated });
    }

    if CHARTS_ENABLED.load(Ordering::Relaxed) {
        let labelled: Vec<(&str, &AggregatedTimeSeries)> = results
            .iter()
            .map(|r| (r.policy_type.short_name(), &r.aggregated))
            .collect();
        for path in crate::charts::render_scenario_charts(scenario_name, &labelled)? {
            logln!(logger, LogEvent::Scenario, "Chart written to {}", path.display());
        }
    }
    Ok(results)
}

/// Collects pass/fail checks of a scenario
pub struct Validation {
    errors: Vec<String>,
}

impl Validation {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Log `msg` with ✓ or ✗ and remember failures
    pub fn check(&mut self, passed: bool, msg: String, logger: &mut Logger) {
        if passed {
            logln!(logger, LogEvent::Scenario, "✓ {}", msg);
        } else {
            errln!(logger, LogEvent::Scenario, "✗ {}", msg);
            self.errors.push(msg);
        }
    }

    pub fn finish(self, scenario_name: &str) -> Result<(), Box<dyn Error>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(format!("Scenario '{}' validation failed:\n{}", scenario_name, self.errors.join("\n")).into())
        }
    }
}

impl Default for Validation {
    fn default() -> Self {
        Self::new()
    }
}

/// Cumulative counts never go down and never exceed what was allocated
pub fn counts_are_monotonic(aggregated: &AggregatedTimeSeries) -> bool {
    let trials = aggregated.trials();
    let successes = aggregated.successes();
    (0..aggregated.batches()).all(|batch| {
        (0..aggregated.n_bandits()).all(|arm| {
            let within = successes.get(batch, arm) <= trials.get(batch, arm);
            let rising = batch == 0
                || (trials.get(batch, arm) >= trials.get(batch - 1, arm)
                    && successes.get(batch, arm) >= successes.get(batch - 1, arm));
            within && rising
        })
    })
}

pub mod two_arms;
pub mod three_arms;
pub mod planner_table;
