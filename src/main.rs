mod arm;
mod charts;
mod config;
mod errors;
mod experiment;
mod logger;
mod planner;
mod policies;
mod policy_epsilon;
mod policy_split;
mod policy_thompson;
mod scenarios;
mod simulationrun;
mod timeseries;
mod utils;

use logger::{Logger, LogEvent, LogReceiver, ConsoleReceiver, FileReceiver, sanitize_filename};
use std::path::PathBuf;

use scenarios::get_scenario_catalog;
use utils::{RAND_SEED, TOTAL_SIMULATION_RUNS};
use std::sync::atomic::Ordering;

/// Open a log file receiver or exit with a message
fn file_receiver(path: &str, events: Vec<LogEvent>) -> Box<dyn LogReceiver> {
    match FileReceiver::new(&PathBuf::from(path), events) {
        Ok(receiver) => receiver,
        Err(e) => {
            eprintln!("Error: cannot open log file '{}': {}", path, e);
            std::process::exit(1);
        }
    }
}

fn parse_number(value: &str, what: &str) -> u64 {
    match value.parse::<u64>() {
        Ok(n) => n,
        Err(_) => {
            eprintln!("Error: Invalid {} parameter '{}'. Expected a number.", what, value);
            std::process::exit(1);
        }
    }
}

fn main() {
    let raw_args: Vec<String> = std::env::args().collect();

    // Parse and filter out --verbose, --fastbreak and --charts
    let mut args = Vec::new();
    let mut skip_next = false;
    let mut fastbreak = false;
    for (i, arg) in raw_args.iter().enumerate() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--verbose" {
            if i + 1 < raw_args.len() && raw_args[i + 1] == "batch" {
                utils::VERBOSE_BATCH.store(true, Ordering::Relaxed);
                skip_next = true;
            }
            continue;
        }
        if arg == "--fastbreak" {
            fastbreak = true;
            continue;
        }
        if arg == "--charts" {
            utils::CHARTS_ENABLED.store(true, Ordering::Relaxed);
            continue;
        }
        args.push(arg.clone());
    }

    if args.len() > 1 {
        let scenario_arg = &args[1];
        let iterations = if args.len() > 2 { parse_number(&args[2], "iterations") } else { 1 };
        let start_iteration = if args.len() > 3 { parse_number(&args[3], "start iteration") } else { 0 };

        let all_scenarios = get_scenario_catalog();
        let scenarios: Vec<_> = if scenario_arg == "all" {
            all_scenarios.clone()
        } else {
            match all_scenarios.iter().find(|s| s.short_name == scenario_arg) {
                Some(scenario) => vec![scenario.clone()],
                None => {
                    eprintln!("Error: Scenario '{}' not found.", scenario_arg);
                    eprintln!("Available scenarios:");
                    for s in &all_scenarios {
                        eprintln!("  - {}", s.short_name);
                    }
                    std::process::exit(1);
                }
            }
        };

        // Individual checks only go to the console for a single named scenario run once
        let mut logger = Logger::new();
        if scenario_arg != "all" && iterations == 1 {
            logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Validation, LogEvent::Scenario]));
        } else {
            logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Validation]));
        }
        let summary_receiver_id = logger.add_receiver(file_receiver("log/summary.log", vec![LogEvent::Validation]));

        TOTAL_SIMULATION_RUNS.store(0, Ordering::Relaxed);

        let target = if scenario_arg == "all" { "all scenarios".to_string() } else { format!("scenario '{}'", scenario_arg) };
        if iterations > 1 {
            logln!(&mut logger, LogEvent::Validation, "Running {} {} times...\n", target, iterations);
        } else {
            logln!(&mut logger, LogEvent::Validation, "Running {}...\n", target);
        }

        'scenarios: for scenario in &scenarios {
            log!(&mut logger, LogEvent::Validation, "{}: ", scenario.short_name);

            let scenario_receiver_id = logger.add_receiver(file_receiver(
                &format!("log/{}/scenario.log", sanitize_filename(scenario.short_name)),
                vec![LogEvent::Scenario],
            ));

            for i in start_iteration..(start_iteration + iterations) {
                if iterations > 1 {
                    log!(&mut logger, LogEvent::Validation, "[{}/{}] ", i - start_iteration + 1, iterations);
                }

                RAND_SEED.store(i, Ordering::Relaxed);

                match (scenario.run)(scenario.short_name, &mut logger) {
                    Ok(()) => {
                        if iterations > 1 {
                            logln!(&mut logger, LogEvent::Validation, "✓");
                        } else {
                            logln!(&mut logger, LogEvent::Validation, "✓ PASSED");
                        }
                    }
                    Err(e) => {
                        if iterations > 1 {
                            logln!(&mut logger, LogEvent::Validation, "✗");
                        } else {
                            logln!(&mut logger, LogEvent::Validation, "✗ FAILED: {}", e);
                        }

                        if fastbreak {
                            logger.remove_receiver(scenario_receiver_id);
                            logln!(&mut logger, LogEvent::Validation, "\nStopping scenario execution due to failure (--fastbreak enabled)");
                            if iterations > 1 {
                                logln!(&mut logger, LogEvent::Validation, "Error at iteration {}/{} (seed {}): {}", i - start_iteration + 1, iterations, i, e);
                            } else {
                                logln!(&mut logger, LogEvent::Validation, "Error: {}", e);
                            }
                            break 'scenarios;
                        }
                    }
                }

                let _ = logger.flush();
            }

            logger.remove_receiver(scenario_receiver_id);
        }

        let final_count = TOTAL_SIMULATION_RUNS.load(Ordering::Relaxed);
        logln!(&mut logger, LogEvent::Validation, "\nTotal simulation runs completed: {}", final_count);

        logger.remove_receiver(summary_receiver_id);
    } else {
        // Default: the two arm comparison with variant summaries on the console
        let mut logger = Logger::new();
        logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Variant, LogEvent::Scenario]));
        if let Err(e) = scenarios::two_arms::run("two_arms", &mut logger) {
            eprintln!("Error running scenario: {}", e);
            std::process::exit(1);
        }
    }
}
