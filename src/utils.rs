use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Global seed, set by main to the scenario iteration index
pub static RAND_SEED: AtomicU64 = AtomicU64::new(0);

/// When set, per-batch allocation detail is written to log files
pub static VERBOSE_BATCH: AtomicBool = AtomicBool::new(false);

/// When set, scenarios render their charts after running
pub static CHARTS_ENABLED: AtomicBool = AtomicBool::new(false);

/// Count of completed simulation runs across all scenarios
pub static TOTAL_SIMULATION_RUNS: AtomicUsize = AtomicUsize::new(0);

/// Combine the global seed with a per-purpose offset so that independent
/// random streams stay independent but reproducible
pub fn get_seed(offset: u64) -> u64 {
    RAND_SEED
        .load(Ordering::Relaxed)
        .wrapping_mul(1_000_003)
        .wrapping_add(offset)
}

/// Format a slice of floats for logs
pub fn format_f64_slice(values: &[f64], precision: usize) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{:.*}", precision, v)).collect();
    format!("[{}]", parts.join(", "))
}
