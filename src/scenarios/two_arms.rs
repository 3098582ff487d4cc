/// Two arms with a one point lift: 5% against 6%.
///
/// The number of batches comes from the sample size planner (alpha 0.001, batches of 5000).
/// Every policy sees the same 100 replicates.
///
/// Expected behavior:
/// - Thompson sampling moves traffic to the better arm, so its final share on arm 1 beats the fixed split
/// - Thompson sampling collects more successes than the fixed split
/// - Both the fixed split and epsilon-greedy start with an even first batch
/// - Cumulative counts never decrease for any policy

use crate::config::ExperimentConfig;
use crate::policies::PolicyType;
use crate::logger::{Logger, LogEvent};
use crate::logln;
use crate::scenarios::{counts_are_monotonic, run_policy_comparison, Validation};

inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "two_arms",
    run,
});

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let (config, plan) = ExperimentConfig::planned(vec![0.05, 0.06], 5000, 0.001, 100)?;
    logln!(
        logger,
        LogEvent::Scenario,
        "Plan: closest pair {:?}, corrected alpha {}, {} per arm, {} examples, {} batches",
        plan.closest_pair,
        plan.corrected_alpha,
        plan.per_arm_sample,
        plan.examples_needed,
        plan.batches
    );

    let results = run_policy_comparison(
        &config,
        &[
            PolicyType::FIXED_SPLIT,
            PolicyType::EPSILON_GREEDY { epsilon: 0.1 },
            PolicyType::THOMPSON_SAMPLING { sample_size: 1000 },
        ],
        scenario_name,
        logger,
    )?;
    let split = &results[0].aggregated;
    let epsilon = &results[1].aggregated;
    let thompson = &results[2].aggregated;

    logln!(logger, LogEvent::Scenario, "");
    let mut validation = Validation::new();

    let split_share = split.final_allocation_share(1);
    let thompson_share = thompson.final_allocation_share(1);
    validation.check(
        thompson_share > split_share,
        format!("Thompson sampling gives the better arm a larger share than the fixed split: {:.2}% > {:.2}%", thompson_share, split_share),
        logger,
    );

    let last = config.batches - 1;
    validation.check(
        thompson.total_successes(last) > split.total_successes(last),
        format!(
            "Thompson sampling collects more successes than the fixed split: {:.1} > {:.1}",
            thompson.total_successes(last),
            split.total_successes(last)
        ),
        logger,
    );

    for (name, aggregated) in [("Fixed split", split), ("Epsilon greedy", epsilon)] {
        let first = aggregated.trials().row(0);
        validation.check(
            first.iter().all(|&t| t == first[0]),
            format!("{} first batch is even: {:?}", name, first),
            logger,
        );
    }

    for result in &results {
        validation.check(
            counts_are_monotonic(&result.aggregated),
            format!("{} cumulative counts never decrease", result.policy_type.short_name()),
            logger,
        );
    }

    validation.finish(scenario_name)
}
