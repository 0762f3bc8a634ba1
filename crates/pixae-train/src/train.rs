use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use burn::config::Config;
use burn::data::dataloader::DataLoaderBuilder;
use burn::data::dataset::InMemDataset;
use burn::module::Module;
use burn::optim::AdamConfig;
use burn::record::CompactRecorder;
use burn::tensor::backend::AutodiffBackend;
use burn::train::metric::LossMetric;
use burn::train::LearnerBuilder;
use chrono::Local;
use pixae_dataset::{EnvType, FrameBatcher, FrameItem, FrameSet};
use tracing::info;

use crate::model::{AutoencoderType, SpatialAeConfig, VanillaAeConfig};

#[derive(Config)]
pub struct TrainConfig {
    pub optimizer: AdamConfig,

    #[config(default = 100)]
    pub num_epochs: usize,

    #[config(default = 128)]
    pub batch_size: usize,

    /// Trailing fraction of the frame set held out for validation.
    #[config(default = 0.1)]
    pub valid_split: f64,

    #[config(default = 32)]
    pub latent_dim: usize,

    #[config(default = 1e-3)]
    pub learning_rate: f64,

    #[config(default = 1)]
    pub num_workers: usize,

    #[config(default = 42)]
    pub seed: u64,
}

/// Names a fresh run directory under `output_root`, encoding the run's
/// parameters: `<timestamp>_autoencoder_type-<ae>_num_expert_images-<n>_env_type-<env>`.
pub fn run_dir(
    output_root: &Path,
    ae_type: AutoencoderType,
    n_expert_images: usize,
    env: EnvType,
) -> PathBuf {
    let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    output_root.join(format!(
        "{stamp}_autoencoder_type-{ae_type}_num_expert_images-{n_expert_images}_env_type-{env}"
    ))
}

/// Fits the selected autoencoder to the frame set (reconstruction target =
/// input) and writes checkpoints, metric logs, the resolved config, and the
/// final model into `run_dir`.
pub fn train<B: AutodiffBackend>(
    frames: &FrameSet,
    ae_type: AutoencoderType,
    config: &TrainConfig,
    run_dir: &Path,
    device: B::Device,
) -> anyhow::Result<()> {
    fs::create_dir_all(run_dir)
        .with_context(|| format!("failed to create run directory {}", run_dir.display()))?;
    config
        .save(run_dir.join("config.json"))
        .context("failed to save training config")?;
    let artifact_dir = run_dir
        .to_str()
        .context("run directory path is not valid utf-8")?;

    B::seed(config.seed);

    let (height, width, channels) = frames.frame_dims();
    let (train_items, valid_items) = split_items(frames.items(), config.valid_split);
    anyhow::ensure!(
        !train_items.is_empty(),
        "no training frames left after the validation split"
    );
    info!(
        train = train_items.len(),
        valid = valid_items.len(),
        "training {ae_type} on {height}x{width}x{channels} frames"
    );

    let dataloader_train = DataLoaderBuilder::new(FrameBatcher::<B>::new(device.clone()))
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(InMemDataset::new(train_items));
    let dataloader_valid =
        DataLoaderBuilder::new(FrameBatcher::<B::InnerBackend>::new(device.clone()))
            .batch_size(config.batch_size)
            .num_workers(config.num_workers)
            .build(InMemDataset::new(valid_items));

    let frame_dims = [channels, height, width];
    match ae_type {
        AutoencoderType::SpatialAe => {
            let model = SpatialAeConfig::new(config.latent_dim, frame_dims).init::<B>(&device);
            let learner = LearnerBuilder::new(artifact_dir)
                .metric_train_numeric(LossMetric::new())
                .metric_valid_numeric(LossMetric::new())
                .with_file_checkpointer(CompactRecorder::new())
                .devices(vec![device.clone()])
                .num_epochs(config.num_epochs)
                .build(model, config.optimizer.init(), config.learning_rate);
            let trained = learner.fit(dataloader_train, dataloader_valid);
            trained
                .save_file(run_dir.join("model"), &CompactRecorder::new())
                .context("failed to save trained model")?;
        }
        AutoencoderType::VanillaAe => {
            let model = VanillaAeConfig::new(config.latent_dim, frame_dims).init::<B>(&device);
            let learner = LearnerBuilder::new(artifact_dir)
                .metric_train_numeric(LossMetric::new())
                .metric_valid_numeric(LossMetric::new())
                .with_file_checkpointer(CompactRecorder::new())
                .devices(vec![device.clone()])
                .num_epochs(config.num_epochs)
                .build(model, config.optimizer.init(), config.learning_rate);
            let trained = learner.fit(dataloader_train, dataloader_valid);
            trained
                .save_file(run_dir.join("model"), &CompactRecorder::new())
                .context("failed to save trained model")?;
        }
    }

    info!("training finished, artifacts in {}", run_dir.display());
    Ok(())
}

/// Keras-style validation split: the trailing fraction validates, the rest
/// trains, with no reordering.
fn split_items(mut items: Vec<FrameItem>, valid_split: f64) -> (Vec<FrameItem>, Vec<FrameItem>) {
    let n_valid = (items.len() as f64 * valid_split) as usize;
    let valid = items.split_off(items.len() - n_valid);
    (items, valid)
}
