//! Sample size planning for a multi-arm experiment.
//!
//! The hardest pair to tell apart is the one with the smallest gap between
//! return rates, so that pair decides how many examples every arm needs.
//! Significance is Bonferroni-corrected by the number of arms.

use statrs::distribution::{ContinuousCDF, Normal};
use crate::errors::{BanditError, Result};

/// Upper bound on the per-arm sample search before giving up
pub const MAX_SAMPLE_SEARCH: u64 = 10_000_000;

/// Result of planning an experiment
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePlan {
    /// The two rates that are hardest to distinguish
    pub closest_pair: (f64, f64),
    /// alpha / number of arms
    pub corrected_alpha: f64,
    /// Smallest common per-arm sample reaching significance
    pub per_arm_sample: u64,
    /// per_arm_sample for every arm
    pub examples_needed: u64,
    pub batches: usize,
}

/// Pooled two-proportion z statistic
pub fn z_statistic(p1: f64, p2: f64, n1: u64, n2: u64) -> f64 {
    let n1 = n1 as f64;
    let n2 = n2 as f64;
    let p_star = (p1 * n1 + p2 * n2) / (n1 + n2);
    (p2 - p1) / (p_star * (1.0 - p_star) * ((1.0 / n1) + (1.0 / n2))).sqrt()
}

/// Find the pair of rates with the smallest gap after sorting.
///
/// When several adjacent pairs share the minimal gap, the last one wins.
pub fn closest_pair(rates: &[f64]) -> Result<(f64, f64)> {
    if rates.len() < 2 {
        return Err(BanditError::InsufficientArms(rates.len()));
    }
    let mut sorted = rates.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut min_diff = f64::INFINITY;
    let mut pair = (sorted[0], sorted[1]);
    for window in sorted.windows(2) {
        let diff = window[1] - window[0];
        if diff <= min_diff {
            min_diff = diff;
            pair = (window[0], window[1]);
        }
    }
    Ok(pair)
}

/// Smallest common sample size `n` at which the one-sided p-value of the
/// z-test between `p1` and `p2` drops below `alpha`. Expects `p1 < p2`.
pub fn sample_required(p1: f64, p2: f64, alpha: f64) -> Result<u64> {
    if !(p2 > p1) {
        return Err(BanditError::InvalidParameter(format!(
            "rates {} and {} cannot be distinguished (need p1 < p2)",
            p1, p2
        )));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| BanditError::InvalidParameter(format!("standard normal: {}", e)))?;

    for n in 1..=MAX_SAMPLE_SEARCH {
        let z = z_statistic(p1, p2, n, n);
        let p_value = 1.0 - normal.cdf(z);
        if p_value < alpha {
            return Ok(n);
        }
    }
    Err(BanditError::InvalidParameter(format!(
        "no sample size up to {} separates {} from {} at alpha {}",
        MAX_SAMPLE_SEARCH, p1, p2, alpha
    )))
}

/// Number of batches needed to collect `examples_needed` examples
pub fn define_batches(examples_needed: u64, batch_size: usize) -> Result<usize> {
    if batch_size == 0 {
        return Err(BanditError::InvalidParameter("batch size must be positive".to_string()));
    }
    Ok(examples_needed.div_ceil(batch_size as u64) as usize)
}

/// Planner holding the family-wise significance level
#[derive(Debug, Clone, Copy)]
pub struct SampleSizePlanner {
    pub alpha: f64,
}

impl SampleSizePlanner {
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(BanditError::InvalidParameter(format!("alpha must be in (0, 1), got {}", alpha)));
        }
        Ok(Self { alpha })
    }

    /// Minimum per-arm sample for the given rates, with Bonferroni correction
    pub fn minimum_sample(&self, rates: &[f64]) -> Result<u64> {
        Ok(self.plan_inner(rates)?.2)
    }

    /// Plan an experiment over `rates` with batches of `batch_size`
    ///
    /// # Arguments
    /// * `rates` - True (or assumed) return rate of every arm, each in [0, 1]
    /// * `batch_size` - Number of trials in one batch
    pub fn plan(&self, rates: &[f64], batch_size: usize) -> Result<SamplePlan> {
        let (closest_pair, corrected_alpha, per_arm_sample) = self.plan_inner(rates)?;
        let examples_needed = per_arm_sample * rates.len() as u64;
        let batches = define_batches(examples_needed, batch_size)?;
        Ok(SamplePlan {
            closest_pair,
            corrected_alpha,
            per_arm_sample,
            examples_needed,
            batches,
        })
    }

    fn plan_inner(&self, rates: &[f64]) -> Result<((f64, f64), f64, u64)> {
        if rates.len() < 2 {
            return Err(BanditError::InsufficientArms(rates.len()));
        }
        if let Some(bad) = rates.iter().find(|r| !(0.0..=1.0).contains(*r)) {
            return Err(BanditError::InvalidParameter(format!("return rate {} is outside [0, 1]", bad)));
        }
        let (p1, p2) = closest_pair(rates)?;
        let corrected_alpha = self.alpha / rates.len() as f64;
        let n = sample_required(p1, p2, corrected_alpha)?;
        Ok(((p1, p2), corrected_alpha, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_z_statistic_known_value() {
        // pooled p = 0.075, se = sqrt(0.075 * 0.925 * 0.02)
        let z = z_statistic(0.05, 0.10, 100, 100);
        assert!((z - 1.3423).abs() < 1e-3, "z = {}", z);
    }

    #[test]
    fn test_closest_pair_picks_smallest_gap() {
        let pair = closest_pair(&[0.30, 0.05, 0.06, 0.20]).unwrap();
        assert_eq!(pair, (0.05, 0.06));
    }

    #[test]
    fn test_closest_pair_ties_keep_last() {
        let pair = closest_pair(&[0.75, 0.25, 0.5]).unwrap();
        assert_eq!(pair, (0.5, 0.75));
    }

    #[test]
    fn test_single_arm_is_insufficient() {
        let planner = SampleSizePlanner::new(0.01).unwrap();
        assert_eq!(planner.plan(&[0.1], 100), Err(BanditError::InsufficientArms(1)));
        assert_eq!(closest_pair(&[]), Err(BanditError::InsufficientArms(0)));
    }

    #[test]
    fn test_two_arms_finite_positive_sample() {
        let planner = SampleSizePlanner::new(0.01).unwrap();
        let n = planner.minimum_sample(&[0.05, 0.10]).unwrap();
        assert!(n > 0);
        // Normal approximation: (2.576^2 * 2 * 0.069375) / 0.05^2 ~ 368
        assert!((300..450).contains(&n), "n = {}", n);

        // n is the first size that reaches significance
        let normal = Normal::new(0.0, 1.0).unwrap();
        let p_at = |m: u64| 1.0 - normal.cdf(z_statistic(0.05, 0.10, m, m));
        assert!(p_at(n) < 0.005);
        assert!(p_at(n - 1) >= 0.005);
    }

    #[test]
    fn test_more_arms_never_decreases_sample() {
        let planner = SampleSizePlanner::new(0.01).unwrap();
        let two = planner.minimum_sample(&[0.05, 0.10]).unwrap();
        let three = planner.minimum_sample(&[0.05, 0.10, 0.40]).unwrap();
        let four = planner.minimum_sample(&[0.05, 0.10, 0.40, 0.80]).unwrap();
        assert!(three >= two);
        assert!(four >= three);
    }

    #[test]
    fn test_identical_rates_rejected() {
        let planner = SampleSizePlanner::new(0.01).unwrap();
        assert!(matches!(planner.plan(&[0.1, 0.1], 100), Err(BanditError::InvalidParameter(_))));
    }

    #[test]
    fn test_invalid_alpha_and_rates_rejected() {
        assert!(SampleSizePlanner::new(0.0).is_err());
        assert!(SampleSizePlanner::new(1.5).is_err());
        let planner = SampleSizePlanner::new(0.05).unwrap();
        assert!(matches!(planner.plan(&[0.1, 1.2], 100), Err(BanditError::InvalidParameter(_))));
    }

    #[test]
    fn test_plan_converts_to_batches() {
        let planner = SampleSizePlanner::new(0.01).unwrap();
        let plan = planner.plan(&[0.05, 0.10], 100).unwrap();
        assert_eq!(plan.closest_pair, (0.05, 0.10));
        assert_eq!(plan.corrected_alpha, 0.005);
        assert_eq!(plan.examples_needed, plan.per_arm_sample * 2);
        assert_eq!(plan.batches as u64, (plan.examples_needed + 99) / 100);
    }

    #[test]
    fn test_define_batches_rounds_up() {
        assert_eq!(define_batches(1000, 1000).unwrap(), 1);
        assert_eq!(define_batches(1001, 1000).unwrap(), 2);
        assert_eq!(define_batches(0, 10).unwrap(), 0);
        assert!(define_batches(10, 0).is_err());
    }
}
