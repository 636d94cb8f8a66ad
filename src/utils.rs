use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use crate::error::{Result, VosError};

/// Progress bar over the sequences of a dataset; the message shows the
/// sequence being processed.
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let template = format!(
        "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {{msg}}",
        label
    );
    let style = ProgressStyle::default_bar()
        .template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    ProgressBar::new(len).with_style(style)
}

/// All files with extension `ext` directly inside `dir`, sorted lexicographically.
pub fn sorted_files_with_ext(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*.{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        ext
    );
    let mut files: Vec<PathBuf> = glob(&pattern)
        .map_err(|source| VosError::Pattern {
            pattern: pattern.clone(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .collect();
    files.sort();
    Ok(files)
}

/// Frame identifier: the file name with directory and extension stripped.
pub fn frame_id(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Unweighted arithmetic mean. Empty input yields NaN.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Quote a CSV field when it contains a separator, quote or line break.
pub fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Split one CSV line into fields, honouring double-quoted fields.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_id_strips_directory_and_extension() {
        assert_eq!(frame_id(Path::new("/data/JPEGImages/bear/00012.jpg")), "00012");
        assert_eq!(frame_id(Path::new("masks/frame.v2.png")), "frame.v2");
    }

    #[test]
    fn test_mean() {
        assert!((mean(&[0.8, 0.6]) - 0.7).abs() < 1e-12);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_escape("bear"), "bear");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");

        let line = format!("{},0.500,{}", csv_escape("a,b"), csv_escape("q\"x"));
        assert_eq!(split_csv_line(&line), vec!["a,b", "0.500", "q\"x"]);
    }

    #[test]
    fn test_sorted_files_with_ext() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["00002.jpg", "00000.jpg", "00001.jpg", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let files = sorted_files_with_ext(dir.path(), "jpg").unwrap();
        let ids: Vec<_> = files.iter().map(|f| frame_id(f)).collect();
        assert_eq!(ids, vec!["00000", "00001", "00002"]);
    }
}
