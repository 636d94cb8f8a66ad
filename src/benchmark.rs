use log::info;
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::EvalConfig;
use crate::dataset::VosDataset;
use crate::error::Result;
use crate::evaluation::{EvaluationRequest, Evaluator};
use crate::results::{load_cached, write_tables, ResultTables};

/// Where the tables of a run came from.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ResultsSource {
    /// Loaded from tables persisted by an earlier run.
    Cached,
    /// Computed by the evaluator during this run.
    Computed,
}

/// Outcome of one benchmark run.
#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    pub tables: ResultTables,
    pub source: ResultsSource,
    pub elapsed: Duration,
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tables)?;
        write!(f, "\nTotal time: {:.3}s", self.elapsed.as_secs_f64())
    }
}

/// Evaluate a results folder, or reload its tables when both already exist.
///
/// Tables are only written after the evaluator has returned successfully.
pub fn run_benchmark<E>(config: &EvalConfig, evaluator: &E) -> Result<BenchmarkReport>
where
    E: Evaluator + ?Sized,
{
    let start = Instant::now();

    if let Some(tables) = load_cached(&config.results_path)? {
        info!("Using precomputed results...");
        return Ok(BenchmarkReport {
            tables,
            source: ResultsSource::Cached,
            elapsed: start.elapsed(),
        });
    }

    info!("Evaluating sequences");
    let dataset = VosDataset::new(config.dataset.clone())?;
    info!("Indexed {} sequences", dataset.len());

    let request = EvaluationRequest {
        dataset: &dataset,
        results_path: &config.results_path,
        separate_objects_masks: config.separate_objects_masks,
    };
    let output = evaluator.evaluate(&request)?;
    let tables = ResultTables::from_evaluation(&output)?;
    write_tables(&config.results_path, &tables)?;

    Ok(BenchmarkReport {
        tables,
        source: ResultsSource::Computed,
        elapsed: start.elapsed(),
    })
}
