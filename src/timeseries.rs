//! Per-batch time series of cumulative allocation and success counts.
//!
//! Both the single-run and the averaged series are stored as fixed-shape
//! `batches x arms` tables, indexed positionally.

use std::ops::AddAssign;
use crate::errors::{BanditError, Result};

/// Row-major table with one row per batch and one column per arm
#[derive(Debug, Clone, PartialEq)]
pub struct CountTable<T> {
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> CountTable<T> {
    /// Empty table that rows get appended to
    pub fn with_capacity(rows: usize, cols: usize) -> Self {
        Self { cols, data: Vec::with_capacity(rows * cols) }
    }

    /// Table of `rows x cols` default values
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { cols, data: vec![T::default(); rows * cols] }
    }

    pub fn rows(&self) -> usize {
        if self.cols == 0 { 0 } else { self.data.len() / self.cols }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Append a full row; panics if the row has the wrong width
    pub fn push_row(&mut self, values: &[T]) {
        assert_eq!(values.len(), self.cols, "row width does not match table");
        self.data.extend_from_slice(values);
    }

    /// Apply `f` to every cell
    pub fn map<U, F: Fn(T) -> U>(&self, f: F) -> CountTable<U> {
        CountTable { cols: self.cols, data: self.data.iter().map(|&v| f(v)).collect() }
    }
}

impl<T: Copy + AddAssign> CountTable<T> {
    fn add_assign_table(&mut self, other: &CountTable<T>) {
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += *b;
        }
    }
}

/// Cumulative per-arm totals after one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub total_trials: Vec<u64>,
    pub total_successes: Vec<u64>,
}

/// The series produced by one completed simulation run
#[derive(Debug, Clone, PartialEq)]
pub struct RunTimeSeries {
    trials: CountTable<u64>,
    successes: CountTable<u64>,
    /// Draws with a failed weighted choice during the run, counted once per draw
    pub weighted_choice_fallbacks: usize,
}

impl RunTimeSeries {
    pub fn new(batches: usize, n_bandits: usize) -> Self {
        Self {
            trials: CountTable::with_capacity(batches, n_bandits),
            successes: CountTable::with_capacity(batches, n_bandits),
            weighted_choice_fallbacks: 0,
        }
    }

    pub fn push(&mut self, outcome: &BatchOutcome) {
        self.trials.push_row(&outcome.total_trials);
        self.successes.push_row(&outcome.total_successes);
    }

    pub fn batches(&self) -> usize {
        self.trials.rows()
    }

    pub fn n_bandits(&self) -> usize {
        self.trials.cols()
    }

    pub fn trials(&self) -> &CountTable<u64> {
        &self.trials
    }

    pub fn successes(&self) -> &CountTable<u64> {
        &self.successes
    }

    pub fn outcome(&self, batch: usize) -> BatchOutcome {
        BatchOutcome {
            total_trials: self.trials.row(batch).to_vec(),
            total_successes: self.successes.row(batch).to_vec(),
        }
    }
}

/// Element-wise sum of run series, turned into an average once every
/// replicate has been added
#[derive(Debug, Clone)]
pub struct TimeSeriesAccumulator {
    batches: usize,
    n_bandits: usize,
    runs: usize,
    weighted_choice_fallbacks: usize,
    trials: CountTable<u64>,
    successes: CountTable<u64>,
}

impl TimeSeriesAccumulator {
    pub fn new(batches: usize, n_bandits: usize) -> Self {
        Self {
            batches,
            n_bandits,
            runs: 0,
            weighted_choice_fallbacks: 0,
            trials: CountTable::zeros(batches, n_bandits),
            successes: CountTable::zeros(batches, n_bandits),
        }
    }

    /// Add one complete run. Every run must have the same shape.
    pub fn add(&mut self, run: &RunTimeSeries) -> Result<()> {
        if run.batches() != self.batches || run.n_bandits() != self.n_bandits {
            return Err(BanditError::Configuration(format!(
                "run has {} batches x {} arms, expected {} x {}",
                run.batches(),
                run.n_bandits(),
                self.batches,
                self.n_bandits
            )));
        }
        self.trials.add_assign_table(&run.trials);
        self.successes.add_assign_table(&run.successes);
        self.weighted_choice_fallbacks += run.weighted_choice_fallbacks;
        self.runs += 1;
        Ok(())
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Divide the sums by the number of runs
    pub fn finish(self) -> Result<AggregatedTimeSeries> {
        if self.runs == 0 {
            return Err(BanditError::Configuration("no runs to aggregate".to_string()));
        }
        let runs = self.runs as f64;
        Ok(AggregatedTimeSeries {
            simulations: self.runs,
            weighted_choice_fallbacks: self.weighted_choice_fallbacks,
            trials: self.trials.map(|v| v as f64 / runs),
            successes: self.successes.map(|v| v as f64 / runs),
        })
    }
}

/// Averaged series across all replicates of an experiment
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedTimeSeries {
    simulations: usize,
    weighted_choice_fallbacks: usize,
    trials: CountTable<f64>,
    successes: CountTable<f64>,
}

impl AggregatedTimeSeries {
    pub fn simulations(&self) -> usize {
        self.simulations
    }

    /// Draws with a failed weighted choice, summed over all replicates
    pub fn weighted_choice_fallbacks(&self) -> usize {
        self.weighted_choice_fallbacks
    }

    pub fn batches(&self) -> usize {
        self.trials.rows()
    }

    pub fn n_bandits(&self) -> usize {
        self.trials.cols()
    }

    /// Average cumulative allocation, batches x arms
    pub fn trials(&self) -> &CountTable<f64> {
        &self.trials
    }

    /// Average cumulative successes, batches x arms
    pub fn successes(&self) -> &CountTable<f64> {
        &self.successes
    }

    /// Percent of all trials through `batch` that went to each arm
    pub fn allocation_share(&self, batch: usize) -> Vec<f64> {
        let row = self.trials.row(batch);
        let total: f64 = row.iter().sum();
        if total <= 0.0 {
            return vec![0.0; row.len()];
        }
        row.iter().map(|v| v * 100.0 / total).collect()
    }

    /// Share of the last batch's cumulative allocation held by `arm`, in percent
    pub fn final_allocation_share(&self, arm: usize) -> f64 {
        match self.batches() {
            0 => 0.0,
            n => self.allocation_share(n - 1)[arm],
        }
    }

    /// Average total trials through `batch`
    pub fn total_trials(&self, batch: usize) -> f64 {
        self.trials.row(batch).iter().sum()
    }

    /// Average total successes (reward) through `batch`
    pub fn total_successes(&self, batch: usize) -> f64 {
        self.successes.row(batch).iter().sum()
    }

    /// Total successes for every batch
    pub fn gains(&self) -> Vec<f64> {
        (0..self.batches()).map(|b| self.total_successes(b)).collect()
    }
}
