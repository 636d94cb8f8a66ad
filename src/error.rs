use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VosError>;

/// Errors raised while indexing, decoding or aggregating a benchmark run.
#[derive(Debug, Error)]
pub enum VosError {
    #[error("{what} not found: {path}")]
    NotFound { what: &'static str, path: PathBuf },

    #[error("unknown sequence: {0}")]
    UnknownSequence(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid glob pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("png decode error at {path}: {source}")]
    Png {
        path: PathBuf,
        #[source]
        source: png::DecodingError,
    },

    #[error("unsupported pixel format at {path}: {detail}")]
    UnsupportedPixelFormat { path: PathBuf, detail: String },

    #[error("frame shape mismatch at {path}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        path: PathBuf,
        expected: (usize, usize, usize),
        found: (usize, usize, usize),
    },

    #[error("malformed evaluator output: {0}")]
    MalformedEvaluatorOutput(String),

    #[error("evaluator failed: {0}")]
    Evaluator(String),

    #[error("malformed results table at {path}: {msg}")]
    Table { path: PathBuf, msg: String },
}

impl VosError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VosError::Io {
            path: path.into(),
            source,
        }
    }
}
