/// Three arms where one clearly leads: 4%, 5% and 8%.
///
/// Uses an informative prior on the weakest arm to show that priors only shift the start of the
/// experiment, not where traffic ends up.
///
/// Expected behavior:
/// - Both adaptive policies collect more successes than the fixed split
/// - Thompson sampling ends with the largest share on arm 2
/// - The fixed split stays at an equal third per arm

use crate::arm::ArmPrior;
use crate::config::ExperimentConfig;
use crate::policies::PolicyType;
use crate::logger::{Logger, LogEvent};
use crate::logln;
use crate::utils::format_f64_slice;
use crate::scenarios::{counts_are_monotonic, run_policy_comparison, Validation};

inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "three_arms",
    run,
});

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let (config, plan) = ExperimentConfig::planned(vec![0.04, 0.05, 0.08], 1000, 0.01, 50)?;
    let config = config.with_priors(vec![ArmPrior::new(2.0, 38.0), ArmPrior::uniform(), ArmPrior::uniform()])?;
    logln!(logger, LogEvent::Scenario, "Plan: {} per arm over {} batches of {}", plan.per_arm_sample, plan.batches, config.batch_size);

    let results = run_policy_comparison(
        &config,
        &[
            PolicyType::FIXED_SPLIT,
            PolicyType::EPSILON_GREEDY { epsilon: 0.2 },
            PolicyType::THOMPSON_SAMPLING { sample_size: 500 },
        ],
        scenario_name,
        logger,
    )?;
    let split = &results[0].aggregated;
    let epsilon = &results[1].aggregated;
    let thompson = &results[2].aggregated;
    let last = config.batches - 1;

    logln!(logger, LogEvent::Scenario, "");
    for result in &results {
        logln!(
            logger,
            LogEvent::Scenario,
            "{}: final shares {}",
            result.policy_type.short_name(),
            format_f64_slice(&result.aggregated.allocation_share(last), 2)
        );
    }

    let mut validation = Validation::new();
    for (name, aggregated) in [("Epsilon greedy", epsilon), ("Thompson sampling", thompson)] {
        validation.check(
            aggregated.total_successes(last) > split.total_successes(last),
            format!(
                "{} collects more successes than the fixed split: {:.1} > {:.1}",
                name,
                aggregated.total_successes(last),
                split.total_successes(last)
            ),
            logger,
        );
    }

    let thompson_share = thompson.final_allocation_share(2);
    validation.check(
        thompson_share > split.final_allocation_share(2),
        format!("Thompson sampling moves traffic to arm 2: {:.2}% > {:.2}%", thompson_share, split.final_allocation_share(2)),
        logger,
    );

    let split_shares = split.allocation_share(last);
    validation.check(
        split_shares.iter().all(|s| (s - 100.0 / 3.0).abs() < 1e-9),
        format!("Fixed split keeps equal thirds: {}", format_f64_slice(&split_shares, 2)),
        logger,
    );

    validation.check(
        results.iter().all(|r| counts_are_monotonic(&r.aggregated)),
        "Cumulative counts never decrease for any policy".to_string(),
        logger,
    );

    validation.finish(scenario_name)
}
