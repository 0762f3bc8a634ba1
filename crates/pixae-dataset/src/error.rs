use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::envs::EnvType;

/// Failure modes of frame-set assembly. All are fatal; the assembler never
/// skips bad files or retries.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Configuration error: the requested environment has no directory pair.
    #[error("no data directories configured for env type `{0}`")]
    EnvNotConfigured(EnvType),

    /// Precondition violation: the expert directory is too small.
    #[error("{dir} holds {available} png images, but {needed} were requested")]
    InsufficientExpertImages {
        dir: PathBuf,
        needed: usize,
        available: usize,
    },

    /// A frame's decoded dimensions differ from the rest of the set.
    #[error("{path}: frame is {got:?}, expected {expected:?} (height, width, channels)")]
    ShapeMismatch {
        path: PathBuf,
        expected: [usize; 3],
        got: [usize; 3],
    },

    #[error("failed to read directory {dir}")]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
