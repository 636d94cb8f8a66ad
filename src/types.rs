use std::path::PathBuf;

// Label value marking pixels excluded from scoring
pub const VOID_LABEL: u8 = 255;

// Default raster extensions for frames and ground-truth masks
pub const IMAGE_EXT: &str = "jpg";
pub const MASK_EXT: &str = "png";

// Default dataset layout
pub const DEFAULT_DATASET_ROOT: &str = "./datasets/DAVIS";
pub const DEFAULT_RESULTS_PATH: &str = "./results/DAVIS/rvos";
pub const DEFAULT_IMG_FOLDER: &str = "JPEGImages";
pub const DEFAULT_MASK_FOLDER: &str = "Annotations";

// Persisted result table names inside the results path
pub const GLOBAL_RESULTS_FILE: &str = "global_results.csv";
pub const PER_SEQUENCE_RESULTS_FILE: &str = "per-sequence_results.csv";

/// One benchmark sequence with its frame files and (possibly absent) mask files.
///
/// `masks` always has the same length as `images`. Positions without a mask file
/// hold `None`, which means "no supervision for this frame".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub name: String,
    pub images: Vec<PathBuf>,
    pub masks: Vec<Option<PathBuf>>,
}

impl SequenceRecord {
    /// Build a record, right-padding `masks` with `None` up to the image count.
    /// Masks beyond the last image have no frame to pair with and are dropped.
    pub fn new(name: String, images: Vec<PathBuf>, masks: Vec<PathBuf>) -> Self {
        let mut masks: Vec<Option<PathBuf>> = masks.into_iter().map(Some).collect();
        masks.resize(images.len(), None);
        Self {
            name,
            images,
            masks,
        }
    }

    pub fn num_frames(&self) -> usize {
        self.images.len()
    }

    /// Number of frames that carry a mask file.
    pub fn num_annotated(&self) -> usize {
        self.masks.iter().filter(|mask| mask.is_some()).count()
    }

    /// Mask files in frame order, skipping absent positions.
    pub fn mask_files(&self) -> Vec<PathBuf> {
        self.masks.iter().flatten().cloned().collect()
    }
}

/// Which file list of a sequence to batch-load.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ArrayKind {
    Images,
    Masks,
}

impl ArrayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArrayKind::Images => "images",
            ArrayKind::Masks => "masks",
        }
    }
}
