//! Summary tables built from evaluator statistics.
//!
//! Both tables are persisted as CSV with three decimals. The in-memory values
//! keep full precision.

use log::{info, warn};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, VosError};
use crate::evaluation::EvaluationOutput;
use crate::types::{GLOBAL_RESULTS_FILE, PER_SEQUENCE_RESULTS_FILE};
use crate::utils::{csv_escape, mean, split_csv_line};

pub const GLOBAL_COLUMNS: [&str; 7] = [
    "J&F-Mean", "J-Mean", "J-Recall", "J-Decay", "F-Mean", "F-Recall", "F-Decay",
];
pub const SEQUENCE_COLUMNS: [&str; 3] = ["Sequence", "J-Mean", "F-Mean"];

/// Benchmark-wide means over every scored object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalResults {
    pub jf_mean: f64,
    pub j_mean: f64,
    pub j_recall: f64,
    pub j_decay: f64,
    pub f_mean: f64,
    pub f_recall: f64,
    pub f_decay: f64,
}

impl GlobalResults {
    /// Every object counts once, whatever the length of its sequence.
    pub fn from_evaluation(output: &EvaluationOutput) -> Self {
        if output.j.mean.is_empty() || output.f.mean.is_empty() {
            warn!("Evaluator returned no scored objects; global means are undefined");
        }
        let j_mean = mean(&output.j.mean);
        let f_mean = mean(&output.f.mean);
        Self {
            jf_mean: (j_mean + f_mean) / 2.0,
            j_mean,
            j_recall: mean(&output.j.recall),
            j_decay: mean(&output.j.decay),
            f_mean,
            f_recall: mean(&output.f.recall),
            f_decay: mean(&output.f.decay),
        }
    }

    pub fn values(&self) -> [f64; 7] {
        [
            self.jf_mean,
            self.j_mean,
            self.j_recall,
            self.j_decay,
            self.f_mean,
            self.f_recall,
            self.f_decay,
        ]
    }

    fn from_values(v: [f64; 7]) -> Self {
        Self {
            jf_mean: v[0],
            j_mean: v[1],
            j_recall: v[2],
            j_decay: v[3],
            f_mean: v[4],
            f_recall: v[5],
            f_decay: v[6],
        }
    }
}

/// Mean J and F of one scored object or sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceResult {
    pub sequence: String,
    pub j_mean: f64,
    pub f_mean: f64,
}

/// Rows in J's per-object order; each F value is matched by identifier.
pub fn per_sequence_results(output: &EvaluationOutput) -> Result<Vec<SequenceResult>> {
    output
        .j
        .mean_per_object
        .iter()
        .map(|(id, j_mean)| -> Result<SequenceResult> {
            let f_mean = output.f.object_mean(id).ok_or_else(|| {
                VosError::MalformedEvaluatorOutput(format!(
                    "F has no M_per_object entry for \"{}\"",
                    id
                ))
            })?;
            Ok(SequenceResult {
                sequence: id.clone(),
                j_mean: *j_mean,
                f_mean,
            })
        })
        .collect()
}

/// The global row and the per-sequence table of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTables {
    pub global: GlobalResults,
    pub per_sequence: Vec<SequenceResult>,
}

impl ResultTables {
    pub fn from_evaluation(output: &EvaluationOutput) -> Result<Self> {
        Ok(Self {
            global: GlobalResults::from_evaluation(output),
            per_sequence: per_sequence_results(output)?,
        })
    }

    pub fn global_csv(&self) -> String {
        let values: Vec<String> = self
            .global
            .values()
            .iter()
            .map(|v| format!("{:.3}", v))
            .collect();
        format!("{}\n{}\n", GLOBAL_COLUMNS.join(","), values.join(","))
    }

    pub fn per_sequence_csv(&self) -> String {
        let mut csv = String::with_capacity(32 * (self.per_sequence.len() + 1));
        csv.push_str(&SEQUENCE_COLUMNS.join(","));
        csv.push('\n');
        for row in &self.per_sequence {
            csv.push_str(&format!(
                "{},{:.3},{:.3}\n",
                csv_escape(&row.sequence),
                row.j_mean,
                row.f_mean
            ));
        }
        csv
    }
}

/// Locations of the global and per-sequence tables inside a results folder.
pub fn results_files(results_path: &Path) -> (PathBuf, PathBuf) {
    (
        results_path.join(GLOBAL_RESULTS_FILE),
        results_path.join(PER_SEQUENCE_RESULTS_FILE),
    )
}

/// Previously persisted tables, if both files exist.
///
/// Only file existence is checked. Tables written for other predictions are
/// returned as they are.
pub fn load_cached(results_path: &Path) -> Result<Option<ResultTables>> {
    let (global_path, per_sequence_path) = results_files(results_path);
    if !(global_path.exists() && per_sequence_path.exists()) {
        return Ok(None);
    }
    Ok(Some(ResultTables {
        global: read_global(&global_path)?,
        per_sequence: read_per_sequence(&per_sequence_path)?,
    }))
}

/// Persist both tables, replacing any existing files.
///
/// Both tables are fully written to temp files before either is renamed into
/// place. On failure neither table is left behind.
pub fn write_tables(results_path: &Path, tables: &ResultTables) -> Result<()> {
    let (global_path, per_sequence_path) = results_files(results_path);

    let global_tmp = write_temp(&global_path, &tables.global_csv())?;
    let per_sequence_tmp = match write_temp(&per_sequence_path, &tables.per_sequence_csv()) {
        Ok(tmp) => tmp,
        Err(e) => {
            let _ = fs::remove_file(&global_tmp);
            return Err(e);
        }
    };

    if let Err(e) = fs::rename(&global_tmp, &global_path) {
        let _ = fs::remove_file(&global_tmp);
        let _ = fs::remove_file(&per_sequence_tmp);
        return Err(VosError::io(&global_path, e));
    }
    if let Err(e) = fs::rename(&per_sequence_tmp, &per_sequence_path) {
        let _ = fs::remove_file(&per_sequence_tmp);
        // Never leave the global table without its partner
        let _ = fs::remove_file(&global_path);
        return Err(VosError::io(&per_sequence_path, e));
    }

    info!("Global results saved in {}", global_path.display());
    info!("Per-sequence results saved in {}", per_sequence_path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    path.with_extension("csv.tmp")
}

// Write `content` next to `path` and return the temp file's path
fn write_temp(path: &Path, content: &str) -> Result<PathBuf> {
    let tmp_path = temp_path(path);
    let written = File::create(&tmp_path).and_then(|file| {
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes())?;
        writer.flush()
    });
    match written {
        Ok(()) => Ok(tmp_path),
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            Err(VosError::io(&tmp_path, e))
        }
    }
}

fn read_table(path: &Path, columns: &[&str]) -> Result<Vec<Vec<String>>> {
    let content = fs::read_to_string(path).map_err(|e| VosError::io(path, e))?;
    let table_err = |msg: String| VosError::Table {
        path: path.to_path_buf(),
        msg,
    };

    let mut lines = content.lines().filter(|line| !line.trim().is_empty());
    let header = lines
        .next()
        .map(split_csv_line)
        .ok_or_else(|| table_err("empty file".to_string()))?;
    if header != columns {
        return Err(table_err(format!(
            "expected columns {:?}, found {:?}",
            columns, header
        )));
    }

    lines
        .enumerate()
        .map(|(i, line)| {
            let fields = split_csv_line(line);
            if fields.len() == columns.len() {
                Ok(fields)
            } else {
                Err(table_err(format!(
                    "row {} has {} fields, expected {}",
                    i + 1,
                    fields.len(),
                    columns.len()
                )))
            }
        })
        .collect()
}

fn parse_value(path: &Path, field: &str) -> Result<f64> {
    field.trim().parse().map_err(|_| VosError::Table {
        path: path.to_path_buf(),
        msg: format!("not a number: {:?}", field),
    })
}

pub fn read_global(path: &Path) -> Result<GlobalResults> {
    let rows = read_table(path, &GLOBAL_COLUMNS)?;
    let row = match rows.as_slice() {
        [row] => row,
        _ => {
            return Err(VosError::Table {
                path: path.to_path_buf(),
                msg: format!("expected exactly one row, found {}", rows.len()),
            })
        }
    };

    let mut values = [0.0; 7];
    for (value, field) in values.iter_mut().zip(row) {
        *value = parse_value(path, field)?;
    }
    Ok(GlobalResults::from_values(values))
}

pub fn read_per_sequence(path: &Path) -> Result<Vec<SequenceResult>> {
    read_table(path, &SEQUENCE_COLUMNS)?
        .into_iter()
        .map(|row| -> Result<SequenceResult> {
            Ok(SequenceResult {
                j_mean: parse_value(path, &row[1])?,
                f_mean: parse_value(path, &row[2])?,
                sequence: row.into_iter().next().unwrap_or_default(),
            })
        })
        .collect()
}

// Right-aligned columns, one space apart
fn render_table(f: &mut fmt::Formatter<'_>, columns: &[&str], rows: &[Vec<String>]) -> fmt::Result {
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:>width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" ")
    };

    writeln!(f, "{}", line(columns.to_vec()))?;
    for row in rows {
        writeln!(f, "{}", line(row.iter().map(String::as_str).collect()))?;
    }
    Ok(())
}

impl fmt::Display for GlobalResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row: Vec<String> = self.values().iter().map(|v| format!("{:.3}", v)).collect();
        render_table(f, &GLOBAL_COLUMNS, &[row])
    }
}

impl fmt::Display for ResultTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "--------------------------- Global results ---------------------------"
        )?;
        write!(f, "{}", self.global)?;
        writeln!(f, "\n---------- Per sequence results ----------")?;
        let rows: Vec<Vec<String>> = self
            .per_sequence
            .iter()
            .map(|row| {
                vec![
                    row.sequence.clone(),
                    format!("{:.3}", row.j_mean),
                    format!("{:.3}", row.f_mean),
                ]
            })
            .collect();
        render_table(f, &SEQUENCE_COLUMNS, &rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::MeasureStatistics;

    fn measure(mean: Vec<f64>, ids: &[&str]) -> MeasureStatistics {
        MeasureStatistics {
            mean_per_object: ids.iter().map(|id| id.to_string()).zip(mean.clone()).collect(),
            recall: vec![1.0; mean.len()],
            decay: vec![0.0; mean.len()],
            mean,
        }
    }

    fn output() -> EvaluationOutput {
        EvaluationOutput {
            j: measure(vec![0.8, 0.6], &["bear_1", "dog_1"]),
            f: measure(vec![0.7, 0.9], &["bear_1", "dog_1"]),
        }
    }

    #[test]
    fn test_global_row() {
        let global = GlobalResults::from_evaluation(&output());

        assert!((global.jf_mean - 0.75).abs() < 1e-12);
        assert!((global.j_mean - 0.70).abs() < 1e-12);
        assert!((global.f_mean - 0.80).abs() < 1e-12);
        assert_eq!(global.j_recall, 1.0);
        assert_eq!(global.f_decay, 0.0);
    }

    #[test]
    fn test_per_sequence_rows_follow_j_order() {
        let mut out = output();
        out.f.mean_per_object.reverse();
        let rows = per_sequence_results(&out).unwrap();

        assert_eq!(rows[0].sequence, "bear_1");
        assert_eq!(rows[0].f_mean, 0.7);
        assert_eq!(rows[1].sequence, "dog_1");
        assert_eq!(rows[1].f_mean, 0.9);
    }

    #[test]
    fn test_per_sequence_missing_f_entry() {
        let mut out = output();
        out.f.mean_per_object.pop();

        assert!(matches!(
            per_sequence_results(&out),
            Err(VosError::MalformedEvaluatorOutput(_))
        ));
    }

    #[test]
    fn test_csv_uses_three_decimals() {
        let tables = ResultTables::from_evaluation(&output()).unwrap();

        assert_eq!(
            tables.global_csv(),
            "J&F-Mean,J-Mean,J-Recall,J-Decay,F-Mean,F-Recall,F-Decay\n\
             0.750,0.700,1.000,0.000,0.800,1.000,0.000\n"
        );
        assert_eq!(
            tables.per_sequence_csv(),
            "Sequence,J-Mean,F-Mean\nbear_1,0.800,0.700\ndog_1,0.600,0.900\n"
        );
    }

    #[test]
    fn test_write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = output();
        out.j.mean_per_object[0].1 = 0.123456;
        out.j.mean_per_object[1].0 = "dog,2".to_string();
        out.f.mean_per_object[1].0 = "dog,2".to_string();
        let tables = ResultTables::from_evaluation(&out).unwrap();

        write_tables(dir.path(), &tables).unwrap();
        let loaded = load_cached(dir.path()).unwrap().unwrap();

        for (a, b) in loaded.global.values().iter().zip(tables.global.values()) {
            assert!((a - b).abs() <= 0.0005);
        }
        assert_eq!(loaded.per_sequence.len(), 2);
        assert_eq!(loaded.per_sequence[0].j_mean, 0.123);
        assert_eq!(loaded.per_sequence[1].sequence, "dog,2");
        assert!(!dir.path().join("global_results.csv.tmp").exists());
    }

    #[test]
    fn test_cache_requires_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let tables = ResultTables::from_evaluation(&output()).unwrap();
        fs::write(dir.path().join(GLOBAL_RESULTS_FILE), tables.global_csv()).unwrap();

        assert!(load_cached(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_failed_second_table_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let tables = ResultTables::from_evaluation(&output()).unwrap();
        let (global_path, per_sequence_path) = results_files(dir.path());
        // A directory in the way makes the per-sequence temp file uncreatable
        fs::create_dir(temp_path(&per_sequence_path)).unwrap();

        assert!(matches!(
            write_tables(dir.path(), &tables),
            Err(VosError::Io { .. })
        ));
        assert!(!global_path.exists());
        assert!(!temp_path(&global_path).exists());
        assert!(!per_sequence_path.exists());
    }

    #[test]
    fn test_bad_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(GLOBAL_RESULTS_FILE);
        fs::write(&path, "J,F\n0.1,0.2\n").unwrap();

        assert!(matches!(read_global(&path), Err(VosError::Table { .. })));
    }

    #[test]
    fn test_display_layout() {
        let tables = ResultTables::from_evaluation(&output()).unwrap();
        let rendered = tables.to_string();

        assert!(rendered.starts_with("--------------------------- Global results"));
        assert!(rendered.contains("J&F-Mean J-Mean J-Recall"));
        assert!(rendered.contains("   0.750  0.700    1.000"));
        assert!(rendered.contains("---------- Per sequence results ----------"));
        assert!(rendered.contains("Sequence J-Mean F-Mean"));
        assert!(rendered.contains("  bear_1  0.800  0.700"));
    }
}
