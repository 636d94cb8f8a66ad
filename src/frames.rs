//! Raster decoding and frame stacking.
//!
//! PNG files are decoded with the `png` crate so that palette images keep their
//! palette indices; ground-truth annotations store object ids that way. Every
//! other format goes through the `image` crate.

use image::ColorType;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{Result, VosError};
use crate::types::SequenceRecord;
use crate::utils::frame_id;

/// (height, width, channels)
pub type FrameShape = (usize, usize, usize);

/// One decoded raster, row-major with interleaved channels.
///
/// A single-channel frame is the 2-D case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameArray {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub data: Vec<u8>,
}

impl FrameArray {
    pub fn new(height: usize, width: usize, channels: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), height * width * channels);
        Self {
            height,
            width,
            channels,
            data,
        }
    }

    pub fn shape(&self) -> FrameShape {
        (self.height, self.width, self.channels)
    }
}

/// Frames of one sequence stacked along a leading frame axis, with the
/// identifier of each frame's source file in the same order.
#[derive(Debug, Clone, PartialEq)]
pub struct StackedArray<T> {
    pub frame_shape: FrameShape,
    pub data: Vec<T>,
    pub ids: Vec<String>,
}

impl<T: Copy> StackedArray<T> {
    pub fn num_frames(&self) -> usize {
        self.ids.len()
    }

    pub fn frame_len(&self) -> usize {
        let (h, w, c) = self.frame_shape;
        h * w * c
    }

    pub fn frame(&self, index: usize) -> &[T] {
        let len = self.frame_len();
        &self.data[index * len..(index + 1) * len]
    }

    /// New stack with the same shape and ids, every element mapped through `f`.
    pub fn map<U>(&self, f: impl Fn(T) -> U) -> StackedArray<U> {
        StackedArray {
            frame_shape: self.frame_shape,
            data: self.data.iter().map(|&v| f(v)).collect(),
            ids: self.ids.clone(),
        }
    }
}

/// Decode a single raster file.
pub fn decode_frame(path: &Path) -> Result<FrameArray> {
    let is_png = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if is_png {
        decode_png(path)
    } else {
        decode_with_image(path)
    }
}

fn decode_with_image(path: &Path) -> Result<FrameArray> {
    let img = image::open(path).map_err(|source| VosError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let (width, height) = (img.width() as usize, img.height() as usize);
    let (channels, data) = match img.color() {
        ColorType::L8 | ColorType::L16 => (1, img.to_luma8().into_raw()),
        ColorType::La8 | ColorType::La16 => (2, img.to_luma_alpha8().into_raw()),
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => {
            (4, img.to_rgba8().into_raw())
        }
        _ => (3, img.to_rgb8().into_raw()),
    };
    Ok(FrameArray::new(height, width, channels, data))
}

fn decode_png(path: &Path) -> Result<FrameArray> {
    let png_err = |source| VosError::Png {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|e| VosError::io(path, e))?;

    // No palette expansion: indexed images yield their raw indices
    let mut decoder = png::Decoder::new(BufReader::new(file));
    decoder.set_transformations(png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(png_err)?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).map_err(png_err)?;
    buf.truncate(info.buffer_size());

    let (width, height) = (info.width as usize, info.height as usize);
    let channels = info.color_type.samples();
    let bits = info.bit_depth as usize;

    let data = match bits {
        8 => {
            if info.line_size == width * channels {
                buf
            } else {
                buf.chunks(info.line_size)
                    .flat_map(|row| row[..width * channels].iter().copied())
                    .collect()
            }
        }
        1 | 2 | 4 if channels == 1 => unpack_rows(&buf, info.line_size, width, bits),
        _ => {
            return Err(VosError::UnsupportedPixelFormat {
                path: path.to_path_buf(),
                detail: format!("{:?} at {} bits", info.color_type, bits),
            })
        }
    };
    Ok(FrameArray::new(height, width, channels, data))
}

// Expand rows packed at 1, 2 or 4 bits per sample to one byte per sample
fn unpack_rows(buf: &[u8], line_size: usize, width: usize, bits: usize) -> Vec<u8> {
    let per_byte = 8 / bits;
    let mask = (1u8 << bits) - 1;
    let mut out = Vec::with_capacity(buf.len() / line_size.max(1) * width);
    for row in buf.chunks(line_size) {
        for x in 0..width {
            let shift = 8 - bits * (x % per_byte + 1);
            out.push((row[x / per_byte] >> shift) & mask);
        }
    }
    out
}

/// Decode every file into one stack. All frames must share the first frame's shape.
pub fn stack_files(files: &[PathBuf]) -> Result<StackedArray<u8>> {
    let mut data = Vec::new();
    let mut ids = Vec::with_capacity(files.len());
    let mut frame_shape = None;

    for path in files {
        let frame = decode_frame(path)?;
        match frame_shape {
            None => {
                frame_shape = Some(frame.shape());
                data.reserve(frame.data.len() * files.len());
            }
            Some(expected) if expected != frame.shape() => {
                return Err(VosError::ShapeMismatch {
                    path: path.clone(),
                    expected,
                    found: frame.shape(),
                });
            }
            Some(_) => {}
        }
        data.extend_from_slice(&frame.data);
        ids.push(frame_id(path));
    }

    Ok(StackedArray {
        frame_shape: frame_shape.unwrap_or((0, 0, 0)),
        data,
        ids,
    })
}

/// Single-pass iterator over the (image, mask) pairs of a sequence.
///
/// Each step decodes one frame pair from disk. A frame without a mask file
/// yields `None` for its mask.
pub struct FrameStream<'a> {
    images: std::slice::Iter<'a, PathBuf>,
    masks: std::slice::Iter<'a, Option<PathBuf>>,
}

impl<'a> FrameStream<'a> {
    pub fn new(record: &'a SequenceRecord) -> Self {
        Self {
            images: record.images.iter(),
            masks: record.masks.iter(),
        }
    }
}

impl Iterator for FrameStream<'_> {
    type Item = Result<(FrameArray, Option<FrameArray>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let image_path = self.images.next()?;
        let mask_path = self.masks.next()?;

        let pair = decode_frame(image_path).and_then(|image| {
            let mask = mask_path.as_deref().map(decode_frame).transpose()?;
            Ok((image, mask))
        });
        Some(pair)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.images.size_hint()
    }
}
