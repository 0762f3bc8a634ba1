pub mod assemble;
pub mod batch;
pub mod envs;
pub mod error;

pub use assemble::{assemble, FrameSet};
pub use batch::{FrameBatch, FrameBatcher, FrameItem};
pub use envs::{DataConfig, EnvDirs, EnvType};
pub use error::DatasetError;
