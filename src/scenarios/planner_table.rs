/// Sample size table for a growing set of arms.
///
/// The closest pair stays 5% vs 10% while arms are added, so only the Bonferroni correction
/// changes. No simulation is run.
///
/// Expected behavior:
/// - Every plan needs a finite, positive per-arm sample
/// - Adding arms never lowers the per-arm sample
/// - Total examples grow with the number of arms

use crate::planner::SampleSizePlanner;
use crate::logger::{Logger, LogEvent};
use crate::logln;
use crate::utils::format_f64_slice;
use crate::scenarios::Validation;

inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "planner_table",
    run,
});

const BATCH_SIZE: usize = 1000;

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let rate_sets = [
        vec![0.05, 0.10],
        vec![0.05, 0.10, 0.20],
        vec![0.05, 0.10, 0.20, 0.30],
        vec![0.05, 0.10, 0.20, 0.30, 0.45],
    ];
    let mut validation = Validation::new();

    for alpha in [0.05, 0.01] {
        let planner = SampleSizePlanner::new(alpha)?;
        logln!(logger, LogEvent::Scenario, "\n=== alpha {} ===", alpha);

        let mut previous: Option<(u64, u64)> = None;
        for rates in &rate_sets {
            let plan = planner.plan(rates, BATCH_SIZE)?;
            logln!(
                logger,
                LogEvent::Scenario,
                "{}: pair {:?}, corrected alpha {:.5}, per arm {}, examples {}, batches {}",
                format_f64_slice(rates, 2),
                plan.closest_pair,
                plan.corrected_alpha,
                plan.per_arm_sample,
                plan.examples_needed,
                plan.batches
            );

            let minimum = planner.minimum_sample(rates)?;
            validation.check(
                minimum == plan.per_arm_sample,
                format!("{} arms at alpha {}: minimum sample {} matches the plan", rates.len(), alpha, minimum),
                logger,
            );
            validation.check(
                plan.per_arm_sample > 0 && plan.batches > 0,
                format!("{} arms at alpha {} need a positive sample: {}", rates.len(), alpha, plan.per_arm_sample),
                logger,
            );
            if let Some((previous_sample, previous_examples)) = previous {
                validation.check(
                    plan.per_arm_sample >= previous_sample,
                    format!(
                        "{} arms at alpha {} need at least as many per arm as {}: {} >= {}",
                        rates.len(),
                        alpha,
                        rates.len() - 1,
                        plan.per_arm_sample,
                        previous_sample
                    ),
                    logger,
                );
                validation.check(
                    plan.examples_needed > previous_examples,
                    format!("{} arms at alpha {} need more examples in total: {} > {}", rates.len(), alpha, plan.examples_needed, previous_examples),
                    logger,
                );
            }
            previous = Some((plan.per_arm_sample, plan.examples_needed));
        }
    }

    validation.finish(scenario_name)
}
