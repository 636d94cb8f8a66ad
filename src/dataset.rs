use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{DatasetConfig, SequenceSelection};
use crate::error::{Result, VosError};
use crate::frames::{stack_files, FrameStream, StackedArray};
use crate::masks::{decompose, DecomposedMasks};
use crate::types::{ArrayKind, SequenceRecord};
use crate::utils::{create_progress_bar, sorted_files_with_ext};

/// Index of the sequences of a video object segmentation dataset.
///
/// Built once from a [`DatasetConfig`]; frame data is decoded from disk on every
/// access and never cached.
#[derive(Debug)]
pub struct VosDataset {
    config: DatasetConfig,
    sequences: Vec<SequenceRecord>,
    by_name: HashMap<String, usize>,
}

impl VosDataset {
    pub fn new(config: DatasetConfig) -> Result<Self> {
        check_directories(&config)?;

        let names = sequence_names(&config)?;
        let img_path = config.img_path();
        let mask_path = config.mask_path();

        let mut sequences: Vec<SequenceRecord> = Vec::with_capacity(names.len());
        let mut by_name = HashMap::with_capacity(names.len());
        let pb = create_progress_bar(names.len() as u64, "Index");
        for name in names {
            pb.set_message(name.clone());
            let record = load_record(&name, &img_path, &mask_path, &config)?;
            // A repeated name keeps its first position
            match by_name.get(&name) {
                Some(&index) => sequences[index] = record,
                None => {
                    by_name.insert(name, sequences.len());
                    sequences.push(record);
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(Self {
            config,
            sequences,
            by_name,
        })
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Sequence names in discovery order.
    pub fn sequence_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.sequences.iter().map(|record| record.name.as_str())
    }

    pub fn records(&self) -> &[SequenceRecord] {
        &self.sequences
    }

    pub fn sequence(&self, name: &str) -> Result<&SequenceRecord> {
        self.by_name
            .get(name)
            .map(|&index| &self.sequences[index])
            .ok_or_else(|| VosError::UnknownSequence(name.to_string()))
    }

    /// Lazily decode the (image, mask) pairs of a sequence, one frame per step.
    pub fn stream_frames(&self, name: &str) -> Result<FrameStream<'_>> {
        Ok(FrameStream::new(self.sequence(name)?))
    }

    /// Decode every file of one kind into a single stack.
    ///
    /// For masks only the annotated frames are stacked; the ids tell which frames
    /// they are. [`VosDataset::get_all_masks`] adds the per-frame alignment.
    pub fn load_all(&self, name: &str, kind: ArrayKind) -> Result<StackedArray<u8>> {
        let record = self.sequence(name)?;
        let files = match kind {
            ArrayKind::Images => record.images.clone(),
            ArrayKind::Masks => record.mask_files(),
        };
        if files.is_empty() {
            return Err(VosError::NotFound {
                what: "mask files",
                path: self.config.mask_path().join(name),
            });
        }
        debug!("Loading {} {} for sequence {}", files.len(), kind.as_str(), name);
        stack_files(&files)
    }

    pub fn get_all_images(&self, name: &str) -> Result<StackedArray<u8>> {
        self.load_all(name, ArrayKind::Images)
    }

    /// Ground-truth masks split into object masks and a void mask.
    pub fn get_all_masks(&self, name: &str, separate_objects_masks: bool) -> Result<DecomposedMasks> {
        let record = self.sequence(name)?;
        let labels = self.load_all(name, ArrayKind::Masks)?;
        let annotated: Vec<bool> = record.masks.iter().map(Option::is_some).collect();
        Ok(decompose(labels, separate_objects_masks).aligned_to(&annotated))
    }
}

fn check_directories(config: &DatasetConfig) -> Result<()> {
    let required = [
        ("dataset root", config.root.clone()),
        ("image folder", config.img_path()),
        ("mask folder", config.mask_path()),
    ];
    for (what, path) in required {
        if !path.exists() {
            return Err(VosError::NotFound { what, path });
        }
    }
    if let Some(path) = config.imagesets_file() {
        if !path.exists() {
            return Err(VosError::NotFound {
                what: "imageset file",
                path,
            });
        }
    }
    Ok(())
}

fn sequence_names(config: &DatasetConfig) -> Result<Vec<String>> {
    if let SequenceSelection::Names(names) = &config.sequences {
        return Ok(names.clone());
    }

    if let Some(path) = config.imagesets_file() {
        info!("Using imageset file: {}", path.display());
        let content = fs::read_to_string(&path).map_err(|e| VosError::io(&path, e))?;
        return Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect());
    }

    info!("No imageset file found! Including all sequences inside this dataset.");
    let mask_path = config.mask_path();
    let entries = fs::read_dir(&mask_path).map_err(|e| VosError::io(&mask_path, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| VosError::io(&mask_path, e))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

fn load_record(
    name: &str,
    img_path: &Path,
    mask_path: &Path,
    config: &DatasetConfig,
) -> Result<SequenceRecord> {
    let image_dir: PathBuf = img_path.join(name);
    let images = sorted_files_with_ext(&image_dir, &config.image_ext)?;
    if images.is_empty() {
        return Err(VosError::NotFound {
            what: "image frames",
            path: image_dir,
        });
    }

    let masks = sorted_files_with_ext(&mask_path.join(name), &config.mask_ext)?;
    if masks.len() > images.len() {
        warn!(
            "Sequence {} has {} masks but only {} images; extra masks are ignored",
            name,
            masks.len(),
            images.len()
        );
    }
    debug!(
        "Sequence {}: {} images, {} masks, {} padded",
        name,
        images.len(),
        masks.len(),
        images.len().saturating_sub(masks.len())
    );

    Ok(SequenceRecord::new(name.to_string(), images, masks))
}
