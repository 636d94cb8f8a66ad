//! Ground-truth label decomposition.
//!
//! A label stack is first split into a void mask and a void-free label stack.
//! Object ids are then optionally broken out into one boolean layer per id.
//! The object count is read from the first frame only and applied to the whole
//! sequence, so ids that appear later are not given a layer.

use crate::frames::StackedArray;
use crate::types::VOID_LABEL;

/// Object masks of a sequence, either as one label stack or one layer per object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectMasks {
    /// Void-free labels; 0 is background, any other value is foreground.
    Combined(StackedArray<u8>),
    /// Layer `i` is true exactly where the label equals object id `i + 1`.
    PerObject(Vec<StackedArray<bool>>),
}

impl ObjectMasks {
    /// Number of object layers; `Combined` counts as a single layer.
    pub fn num_layers(&self) -> usize {
        match self {
            ObjectMasks::Combined(_) => 1,
            ObjectMasks::PerObject(layers) => layers.len(),
        }
    }

    /// Foreground vs background for `Combined`, or each object's layer for `PerObject`.
    pub fn foreground(&self) -> Vec<StackedArray<bool>> {
        match self {
            ObjectMasks::Combined(labels) => vec![labels.map(|v| v != 0)],
            ObjectMasks::PerObject(layers) => layers.clone(),
        }
    }
}

/// Result of decomposing a sequence's ground-truth masks.
///
/// `objects` and `void` hold only the annotated frames. `frames` has one entry
/// per image frame of the sequence: the index of that frame's mask in the stacks,
/// or `None` where the frame has no ground truth.
#[derive(Debug, Clone, PartialEq)]
pub struct DecomposedMasks {
    pub objects: ObjectMasks,
    pub void: StackedArray<bool>,
    pub ids: Vec<String>,
    pub frames: Vec<Option<usize>>,
}

impl DecomposedMasks {
    /// Number of image frames, annotated or not.
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Position of frame `frame`'s mask in the stacks.
    pub fn mask_index(&self, frame: usize) -> Option<usize> {
        self.frames.get(frame).copied().flatten()
    }

    pub fn is_annotated(&self, frame: usize) -> bool {
        self.mask_index(frame).is_some()
    }

    /// Re-align `frames` to a sequence whose `annotated` flags give, per image
    /// frame, whether a mask file exists. Annotated frames take stack positions
    /// in order.
    pub fn aligned_to(mut self, annotated: &[bool]) -> Self {
        let mut next = 0;
        self.frames = annotated
            .iter()
            .map(|&present| {
                present.then(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect();
        debug_assert_eq!(next, self.void.num_frames());
        self
    }
}

/// Mark void pixels and rewrite them to background in place.
///
/// Returns a mask that is true exactly where the label was [`VOID_LABEL`].
pub fn separate_void(labels: &mut StackedArray<u8>) -> StackedArray<bool> {
    let void = labels.map(|v| v == VOID_LABEL);
    for value in labels.data.iter_mut().filter(|v| **v == VOID_LABEL) {
        *value = 0;
    }
    void
}

/// Object count of a void-free stack: the largest label in frame 0.
pub fn infer_num_objects(labels: &StackedArray<u8>) -> usize {
    if labels.num_frames() == 0 {
        return 0;
    }
    labels.frame(0).iter().copied().max().unwrap_or(0) as usize
}

/// One boolean layer per object id `1..=num_objects`, across every frame.
pub fn split_objects(labels: &StackedArray<u8>, num_objects: usize) -> Vec<StackedArray<bool>> {
    (1..=num_objects)
        .map(|id| labels.map(|v| v as usize == id))
        .collect()
}

/// Full decomposition of a raw label stack.
pub fn decompose(mut labels: StackedArray<u8>, separate_objects: bool) -> DecomposedMasks {
    let void = separate_void(&mut labels);
    let ids = labels.ids.clone();
    let frames = (0..labels.num_frames()).map(Some).collect();

    let objects = if separate_objects {
        let num_objects = infer_num_objects(&labels);
        log::debug!(
            "Splitting {} frames into {} object layers",
            labels.num_frames(),
            num_objects
        );
        ObjectMasks::PerObject(split_objects(&labels, num_objects))
    } else {
        ObjectMasks::Combined(labels)
    };

    DecomposedMasks {
        objects,
        void,
        ids,
        frames,
    }
}
