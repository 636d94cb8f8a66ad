use log::{info, warn};

use crate::dataset::VosDataset;
use crate::error::Result;
use crate::masks::{infer_num_objects, ObjectMasks};
use crate::utils::create_progress_bar;

/// Ground-truth coverage of one sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceSummary {
    pub name: String,
    pub frames: usize,
    pub annotated_frames: usize,
    /// Largest object id in the first annotated frame, void excluded.
    pub objects: usize,
    pub void_pixels: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSummary {
    pub sequences: Vec<SequenceSummary>,
}

impl DatasetSummary {
    pub fn total_frames(&self) -> usize {
        self.sequences.iter().map(|s| s.frames).sum()
    }

    pub fn total_annotated(&self) -> usize {
        self.sequences.iter().map(|s| s.annotated_frames).sum()
    }

    pub fn total_objects(&self) -> usize {
        self.sequences.iter().map(|s| s.objects).sum()
    }

    pub fn print_summary(&self) {
        info!("=== Dataset Summary ===");
        for s in &self.sequences {
            info!(
                "{}: {} frames, {} annotated, {} objects, {} void pixels",
                s.name, s.frames, s.annotated_frames, s.objects, s.void_pixels
            );
        }
        info!("Sequences: {}", self.sequences.len());
        info!(
            "Frames: {} ({} annotated)",
            self.total_frames(),
            self.total_annotated()
        );
        info!("Objects: {}", self.total_objects());

        let unannotated = self
            .sequences
            .iter()
            .filter(|s| s.annotated_frames == 0)
            .count();
        if unannotated > 0 {
            warn!("{} sequences have no ground-truth masks", unannotated);
        }
    }
}

/// Decode every sequence's masks once and count frames, objects and void pixels.
pub fn summarize_dataset(dataset: &VosDataset) -> Result<DatasetSummary> {
    let pb = create_progress_bar(dataset.len() as u64, "Summary");
    let mut sequences = Vec::with_capacity(dataset.len());

    for record in dataset.records() {
        pb.set_message(record.name.clone());
        let mut summary = SequenceSummary {
            name: record.name.clone(),
            frames: record.num_frames(),
            annotated_frames: record.num_annotated(),
            ..SequenceSummary::default()
        };
        if summary.annotated_frames > 0 {
            let masks = dataset.get_all_masks(&record.name, false)?;
            summary.void_pixels = masks.void.data.iter().filter(|&&v| v).count();
            if let ObjectMasks::Combined(labels) = &masks.objects {
                summary.objects = infer_num_objects(labels);
            }
        }
        sequences.push(summary);
        pb.inc(1);
    }
    pb.finish_with_message("Summary complete");

    Ok(DatasetSummary { sequences })
}
