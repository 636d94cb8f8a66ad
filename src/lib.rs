//! Video object segmentation benchmark evaluation.
//!
//! This library indexes a dataset of per-sequence frames and ground-truth masks,
//! decodes and decomposes those masks, and reduces per-object J/F statistics from
//! an external evaluator into global and per-sequence result tables.

pub mod benchmark;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod frames;
pub mod masks;
pub mod results;
pub mod summary;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use benchmark::{run_benchmark, BenchmarkReport, ResultsSource};
pub use config::{Args, DatasetConfig, EvalConfig, SequenceSelection};
pub use dataset::VosDataset;
pub use error::{Result, VosError};
pub use evaluation::{
    EvaluationOutput, EvaluationRequest, Evaluator, MeasureStatistics, MissingEvaluator,
    ProcessEvaluator,
};
pub use frames::{FrameArray, FrameStream, StackedArray};
pub use masks::{DecomposedMasks, ObjectMasks};
pub use results::{GlobalResults, ResultTables, SequenceResult};
pub use summary::{summarize_dataset, DatasetSummary};
pub use types::{ArrayKind, SequenceRecord, VOID_LABEL};
