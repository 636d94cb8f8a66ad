use clap::Parser;
use std::path::{Component, Path, PathBuf};

use crate::types::{
    DEFAULT_DATASET_ROOT, DEFAULT_IMG_FOLDER, DEFAULT_MASK_FOLDER, DEFAULT_RESULTS_PATH, IMAGE_EXT,
    MASK_EXT,
};

/// Command-line arguments for evaluating a video object segmentation results folder.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Args {
    /// Path to the dataset root that contains the image and mask folders
    #[arg(long = "dataset_root", default_value = DEFAULT_DATASET_ROOT)]
    pub dataset_root: String,

    /// Path to the folder containing one predicted-mask folder per sequence
    #[arg(long = "results_path", default_value = DEFAULT_RESULTS_PATH)]
    pub results_path: String,

    /// Name of the folder containing the image sequence folders
    #[arg(long = "img_folder", default_value = DEFAULT_IMG_FOLDER, value_parser = validate_folder_name)]
    pub img_folder: String,

    /// Name of the folder containing the mask sequence folders
    #[arg(long = "mask_folder", default_value = DEFAULT_MASK_FOLDER, value_parser = validate_folder_name)]
    pub mask_folder: String,

    /// Imageset file (one sequence name per line), relative to the dataset root
    #[arg(long = "imagesets_path")]
    pub imagesets_path: Option<String>,

    /// Explicit list of sequences to evaluate; all sequences when empty
    #[arg(long = "sequences", value_delimiter = ',')]
    pub sequences: Vec<String>,

    /// Split each ground-truth mask into one boolean layer per object id
    #[arg(long = "separate_objects_masks")]
    pub separate_objects_masks: bool,

    /// Log a per-sequence dataset summary before evaluating
    #[arg(long = "summarize")]
    pub summarize: bool,

    /// External evaluator program that prints the J/F statistics as JSON
    #[arg(long = "evaluator")]
    pub evaluator: Option<String>,

    /// Extra arguments passed to the evaluator program
    #[arg(last = true)]
    pub evaluator_args: Vec<String>,
}

impl Args {
    pub fn to_eval_config(&self) -> EvalConfig {
        let sequences = if self.sequences.is_empty() {
            SequenceSelection::All
        } else {
            SequenceSelection::Names(self.sequences.clone())
        };

        EvalConfig {
            dataset: DatasetConfig {
                root: PathBuf::from(&self.dataset_root),
                img_folder: self.img_folder.clone(),
                mask_folder: self.mask_folder.clone(),
                imagesets_path: self.imagesets_path.as_ref().map(PathBuf::from),
                sequences,
                ..DatasetConfig::default()
            },
            results_path: PathBuf::from(&self.results_path),
            separate_objects_masks: self.separate_objects_masks,
        }
    }
}

/// Which sequences the index should load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SequenceSelection {
    /// Names come from the imageset file if one is configured, else from the mask folder listing.
    #[default]
    All,
    Names(Vec<String>),
}

/// Where the dataset lives and how it is laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetConfig {
    pub root: PathBuf,
    pub img_folder: String,
    pub mask_folder: String,
    /// Relative to `root`.
    pub imagesets_path: Option<PathBuf>,
    pub sequences: SequenceSelection,
    pub image_ext: String,
    pub mask_ext: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_DATASET_ROOT),
            img_folder: DEFAULT_IMG_FOLDER.to_string(),
            mask_folder: DEFAULT_MASK_FOLDER.to_string(),
            imagesets_path: None,
            sequences: SequenceSelection::All,
            image_ext: IMAGE_EXT.to_string(),
            mask_ext: MASK_EXT.to_string(),
        }
    }
}

impl DatasetConfig {
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn img_path(&self) -> PathBuf {
        self.root.join(&self.img_folder)
    }

    pub fn mask_path(&self) -> PathBuf {
        self.root.join(&self.mask_folder)
    }

    pub fn imagesets_file(&self) -> Option<PathBuf> {
        self.imagesets_path.as_ref().map(|p| self.root.join(p))
    }
}

/// Everything one evaluation run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalConfig {
    pub dataset: DatasetConfig,
    pub results_path: PathBuf,
    pub separate_objects_masks: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            results_path: PathBuf::from(DEFAULT_RESULTS_PATH),
            separate_objects_masks: false,
        }
    }
}

// A folder name must be a single, non-empty path component
fn validate_folder_name(s: &str) -> Result<String, String> {
    let mut components = Path::new(s).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(s.to_string()),
        _ => Err("FOLDER must be a single directory name".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_folder_name() {
        assert!(validate_folder_name("JPEGImages").is_ok());
        assert!(validate_folder_name("Annotations_unsupervised").is_ok());
        assert!(validate_folder_name("").is_err());
        assert!(validate_folder_name("a/b").is_err());
        assert!(validate_folder_name("..").is_err());
    }

    #[test]
    fn test_defaults_from_empty_command_line() {
        let args = Args::parse_from(["vos-eval"]);
        let config = args.to_eval_config();

        assert_eq!(config, EvalConfig::default());
        assert_eq!(config.dataset.img_path(), PathBuf::from("./datasets/DAVIS/JPEGImages"));
        assert_eq!(config.dataset.mask_path(), PathBuf::from("./datasets/DAVIS/Annotations"));
        assert!(config.dataset.imagesets_file().is_none());
    }

    #[test]
    fn test_sequence_list_and_imageset() {
        let args = Args::parse_from([
            "vos-eval",
            "--dataset_root",
            "/data/davis",
            "--imagesets_path",
            "ImageSets/2017/val.txt",
            "--sequences",
            "bear,blackswan",
            "--separate_objects_masks",
        ]);
        let config = args.to_eval_config();

        assert_eq!(
            config.dataset.sequences,
            SequenceSelection::Names(vec!["bear".to_string(), "blackswan".to_string()])
        );
        assert_eq!(
            config.dataset.imagesets_file(),
            Some(PathBuf::from("/data/davis/ImageSets/2017/val.txt"))
        );
        assert!(config.separate_objects_masks);
    }

    #[test]
    fn test_evaluator_trailing_args() {
        let args = Args::parse_from([
            "vos-eval",
            "--evaluator",
            "davis-metrics",
            "--",
            "--threads",
            "4",
        ]);

        assert_eq!(args.evaluator.as_deref(), Some("davis-metrics"));
        assert_eq!(args.evaluator_args, vec!["--threads", "4"]);
    }
}
