use std::path::PathBuf;

use anyhow::Result;
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::optim::AdamConfig;
use clap::Parser;
use pixae_dataset::{assemble, DataConfig, EnvType};
use pixae_train::{run_dir, train, AutoencoderType, TrainConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Train an image autoencoder on a directory of expert and random PNG frames.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Autoencoder variant to train.
    #[arg(long = "autoencoder_type", default_value = "spatial_ae")]
    autoencoder_type: AutoencoderType,

    /// How many expert images to include; the expert directory must hold at
    /// least this many.
    #[arg(long = "n_expert_images", default_value_t = 200)]
    n_expert_images: usize,

    /// Environment variant selecting the expert / random directory pair.
    #[arg(long = "env_type", default_value = "sawyer_pusher_no_texture")]
    env_type: EnvType,

    /// Root holding expert_images/<env> and random_trajectories/<env>.
    #[arg(long = "data_root", default_value = "data")]
    data_root: PathBuf,

    /// Base directory for timestamped run outputs.
    #[arg(long = "output_root", default_value = "runs")]
    output_root: PathBuf,

    /// Training epochs.
    #[arg(long, default_value_t = 100)]
    epochs: usize,

    /// Training batch size.
    #[arg(long = "batch_size", default_value_t = 128)]
    batch_size: usize,

    /// Size of the latent bottleneck.
    #[arg(long = "latent_dim", default_value_t = 32)]
    latent_dim: usize,

    /// Adam learning rate.
    #[arg(long = "learning_rate", default_value_t = 1e-3)]
    learning_rate: f64,

    /// RNG seed for shuffling and weight init.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let data = DataConfig::from_root(&cli.data_root);
    let frames = assemble(&data, cli.env_type, cli.n_expert_images)?;

    let config = TrainConfig::new(AdamConfig::new())
        .with_num_epochs(cli.epochs)
        .with_batch_size(cli.batch_size)
        .with_latent_dim(cli.latent_dim)
        .with_learning_rate(cli.learning_rate)
        .with_seed(cli.seed);

    let dir = run_dir(
        &cli.output_root,
        cli.autoencoder_type,
        cli.n_expert_images,
        cli.env_type,
    );
    info!("writing run artifacts to {}", dir.display());

    train::<Autodiff<NdArray>>(
        &frames,
        cli.autoencoder_type,
        &config,
        &dir,
        NdArrayDevice::Cpu,
    )
}
