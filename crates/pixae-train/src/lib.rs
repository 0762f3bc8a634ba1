pub mod model;
pub mod train;

pub use model::{AutoencoderType, SpatialAe, SpatialAeConfig, VanillaAe, VanillaAeConfig};
pub use train::{run_dir, train, TrainConfig};
