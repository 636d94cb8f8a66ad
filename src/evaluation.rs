//! Interface to the per-frame metric evaluator.
//!
//! Region similarity (J) and boundary accuracy (F) are computed outside this
//! crate. An [`Evaluator`] receives the indexed dataset and a results folder and
//! returns per-object statistics for both measures. The wire form is JSON:
//!
//! ```json
//! {
//!   "J": {"M": [..], "R": [..], "D": [..], "M_per_object": {"bear_1": 0.91}},
//!   "F": {"M": [..], "R": [..], "D": [..], "M_per_object": {"bear_1": 0.88}}
//! }
//! ```

use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::dataset::VosDataset;
use crate::error::{Result, VosError};

/// Statistics of one measure over every scored object.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureStatistics {
    /// Mean score of each object ("M").
    pub mean: Vec<f64>,
    /// Recall of each object ("R").
    pub recall: Vec<f64>,
    /// Decay of each object ("D").
    pub decay: Vec<f64>,
    /// Mean score keyed by object identifier, in evaluator order ("M_per_object").
    pub mean_per_object: Vec<(String, f64)>,
}

impl MeasureStatistics {
    pub fn object_mean(&self, id: &str) -> Option<f64> {
        self.mean_per_object
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, value)| *value)
    }
}

#[derive(Deserialize)]
struct RawMeasure {
    #[serde(rename = "M")]
    mean: Vec<f64>,
    #[serde(rename = "R")]
    recall: Vec<f64>,
    #[serde(rename = "D")]
    decay: Vec<f64>,
    #[serde(rename = "M_per_object")]
    mean_per_object: serde_json::Map<String, Value>,
}

/// Region similarity and boundary accuracy statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutput {
    pub j: MeasureStatistics,
    pub f: MeasureStatistics,
}

impl EvaluationOutput {
    pub fn from_json(value: Value) -> Result<Self> {
        let mut root = match value {
            Value::Object(map) => map,
            other => {
                return Err(VosError::MalformedEvaluatorOutput(format!(
                    "expected an object at the top level, got {}",
                    other
                )))
            }
        };
        let j = parse_measure("J", root.remove("J"))?;
        let f = parse_measure("F", root.remove("F"))?;
        Ok(Self { j, f })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let value = serde_json::from_str(s)
            .map_err(|e| VosError::MalformedEvaluatorOutput(format!("invalid JSON: {}", e)))?;
        Self::from_json(value)
    }
}

fn parse_measure(key: &str, value: Option<Value>) -> Result<MeasureStatistics> {
    let value = value.ok_or_else(|| {
        VosError::MalformedEvaluatorOutput(format!("missing key \"{}\"", key))
    })?;
    let raw: RawMeasure = serde_json::from_value(value)
        .map_err(|e| VosError::MalformedEvaluatorOutput(format!("measure \"{}\": {}", key, e)))?;

    let mean_per_object = raw
        .mean_per_object
        .into_iter()
        .map(|(id, v)| match v.as_f64() {
            Some(score) => Ok((id, score)),
            None => Err(VosError::MalformedEvaluatorOutput(format!(
                "measure \"{}\": M_per_object[\"{}\"] is not a number",
                key, id
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(MeasureStatistics {
        mean: raw.mean,
        recall: raw.recall,
        decay: raw.decay,
        mean_per_object,
    })
}

/// What an evaluator is asked to score.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRequest<'a> {
    pub dataset: &'a VosDataset,
    /// Folder holding one predicted-mask folder per sequence.
    pub results_path: &'a Path,
    pub separate_objects_masks: bool,
}

/// Computes J and F statistics for a results folder.
pub trait Evaluator {
    fn evaluate(&self, request: &EvaluationRequest<'_>) -> Result<EvaluationOutput>;
}

/// Runs an external program and reads the statistics from its standard output.
///
/// The program receives its configured arguments followed by `--dataset_root`,
/// `--img_folder`, `--mask_folder`, `--results_path`, `--sequences` and, when
/// requested, `--separate_objects_masks`.
#[derive(Debug, Clone)]
pub struct ProcessEvaluator {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ProcessEvaluator {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn command(&self, request: &EvaluationRequest<'_>) -> Command {
        let config = request.dataset.config();
        let sequences: Vec<&str> = request.dataset.sequence_names().collect();

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--dataset_root")
            .arg(&config.root)
            .arg("--img_folder")
            .arg(&config.img_folder)
            .arg("--mask_folder")
            .arg(&config.mask_folder)
            .arg("--results_path")
            .arg(request.results_path)
            .arg("--sequences")
            .arg(sequences.join(","));
        if request.separate_objects_masks {
            command.arg("--separate_objects_masks");
        }
        command
    }
}

impl Evaluator for ProcessEvaluator {
    fn evaluate(&self, request: &EvaluationRequest<'_>) -> Result<EvaluationOutput> {
        let mut command = self.command(request);
        debug!("Running evaluator: {:?}", command);

        let output = command.output().map_err(|e| VosError::io(&self.program, e))?;
        if !output.status.success() {
            return Err(VosError::Evaluator(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        EvaluationOutput::from_json_str(&stdout)
    }
}

/// Stand-in used when no evaluator is configured. Fails if it is ever asked to evaluate.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingEvaluator;

impl Evaluator for MissingEvaluator {
    fn evaluate(&self, request: &EvaluationRequest<'_>) -> Result<EvaluationOutput> {
        Err(VosError::Evaluator(format!(
            "no evaluator configured and no precomputed results in {}",
            request.results_path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_evaluator_output() {
        let output = EvaluationOutput::from_json(json!({
            "J": {"M": [0.8, 0.6], "R": [1.0, 0.5], "D": [0.1, 0.2],
                  "M_per_object": {"dog_1": 0.8, "bear_1": 0.6}},
            "F": {"M": [0.7, 0.9], "R": [1.0, 1.0], "D": [0.0, 0.3],
                  "M_per_object": {"dog_1": 0.7, "bear_1": 0.9}}
        }))
        .unwrap();

        assert_eq!(output.j.mean, vec![0.8, 0.6]);
        assert_eq!(output.f.decay, vec![0.0, 0.3]);
        // Evaluator order is kept, not sorted
        assert_eq!(
            output.j.mean_per_object,
            vec![("dog_1".to_string(), 0.8), ("bear_1".to_string(), 0.6)]
        );
        assert_eq!(output.f.object_mean("bear_1"), Some(0.9));
        assert_eq!(output.f.object_mean("cat_1"), None);
    }

    #[test]
    fn test_missing_measure_is_malformed() {
        let err = EvaluationOutput::from_json(json!({
            "J": {"M": [], "R": [], "D": [], "M_per_object": {}}
        }))
        .unwrap_err();

        assert!(matches!(err, VosError::MalformedEvaluatorOutput(msg) if msg.contains("\"F\"")));
    }

    #[test]
    fn test_missing_statistic_is_malformed() {
        let err = EvaluationOutput::from_json(json!({
            "J": {"M": [0.5], "D": [0.0], "M_per_object": {"a": 0.5}},
            "F": {"M": [0.5], "R": [1.0], "D": [0.0], "M_per_object": {"a": 0.5}}
        }))
        .unwrap_err();

        assert!(matches!(err, VosError::MalformedEvaluatorOutput(msg) if msg.contains("R")));
    }

    #[test]
    fn test_non_numeric_object_mean_is_malformed() {
        let err = EvaluationOutput::from_json_str(
            r#"{"J": {"M": [0.5], "R": [1.0], "D": [0.0], "M_per_object": {"a": "high"}},
                "F": {"M": [0.5], "R": [1.0], "D": [0.0], "M_per_object": {"a": 0.5}}}"#,
        )
        .unwrap_err();

        assert!(matches!(err, VosError::MalformedEvaluatorOutput(_)));
        assert!(EvaluationOutput::from_json_str("not json").is_err());
    }
}
