use std::fmt;
use std::str::FromStr;

use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig};
use burn::nn::loss::{MseLoss, Reduction};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::tensor::activation::{sigmoid, softmax};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{Tensor, TensorData};
use burn::train::{RegressionOutput, TrainOutput, TrainStep, ValidStep};
use pixae_dataset::FrameBatch;

/// The autoencoder variants this crate can train.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoencoderType {
    SpatialAe,
    VanillaAe,
}

impl AutoencoderType {
    pub const ALL: [AutoencoderType; 2] = [AutoencoderType::SpatialAe, AutoencoderType::VanillaAe];

    pub fn as_str(&self) -> &'static str {
        match self {
            AutoencoderType::SpatialAe => "spatial_ae",
            AutoencoderType::VanillaAe => "vanilla_ae",
        }
    }
}

impl fmt::Display for AutoencoderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoencoderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AutoencoderType::ALL
            .into_iter()
            .find(|ae| ae.as_str() == s)
            .ok_or_else(|| format!("unknown autoencoder type `{s}`, expected spatial_ae or vanilla_ae"))
    }
}

const DECODER_CHANNELS: [usize; 3] = [128, 64, 32];

/// Spatial size after one k3/s2/p1 convolution.
fn halved(size: usize) -> usize {
    (size + 1) / 2
}

/// Output padding a k3/s2/p1 transpose convolution needs to land exactly on
/// `target` when upsampling from `halved(target)`.
fn output_padding(target: usize) -> usize {
    target + 1 - 2 * halved(target)
}

fn strided_conv<B: Backend>(channels: [usize; 2], device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new(channels, [3, 3])
        .with_stride([2, 2])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .init(device)
}

fn strided_deconv<B: Backend>(
    channels: [usize; 2],
    target: [usize; 2],
    device: &B::Device,
) -> ConvTranspose2d<B> {
    ConvTranspose2dConfig::new(channels, [3, 3])
        .with_stride([2, 2])
        .with_padding([1, 1])
        .with_padding_out([output_padding(target[0]), output_padding(target[1])])
        .init(device)
}

/// Decoder shared by both variants: latent vector -> projected feature map ->
/// three transpose convolutions back up to the input size, sigmoid output.
#[derive(Module, Debug)]
pub struct FrameDecoder<B: Backend> {
    project: Linear<B>,
    deconv1: ConvTranspose2d<B>,
    deconv2: ConvTranspose2d<B>,
    deconv3: ConvTranspose2d<B>,
    activation: Relu,
    feat_height: usize,
    feat_width: usize,
}

impl<B: Backend> FrameDecoder<B> {
    fn new(latent_dim: usize, frame_dims: [usize; 3], device: &B::Device) -> Self {
        let [channels, height, width] = frame_dims;
        let (h1, w1) = (halved(height), halved(width));
        let (h2, w2) = (halved(h1), halved(w1));
        let (h3, w3) = (halved(h2), halved(w2));

        Self {
            project: LinearConfig::new(latent_dim, DECODER_CHANNELS[0] * h3 * w3).init(device),
            deconv1: strided_deconv([DECODER_CHANNELS[0], DECODER_CHANNELS[1]], [h2, w2], device),
            deconv2: strided_deconv([DECODER_CHANNELS[1], DECODER_CHANNELS[2]], [h1, w1], device),
            deconv3: strided_deconv([DECODER_CHANNELS[2], channels], [height, width], device),
            activation: Relu::new(),
            feat_height: h3,
            feat_width: w3,
        }
    }

    fn forward(&self, latent: Tensor<B, 2>) -> Tensor<B, 4> {
        let [batch, _] = latent.dims();
        let x = self.activation.forward(self.project.forward(latent));
        let x = x.reshape([
            batch,
            DECODER_CHANNELS[0],
            self.feat_height,
            self.feat_width,
        ]);
        let x = self.activation.forward(self.deconv1.forward(x));
        let x = self.activation.forward(self.deconv2.forward(x));
        sigmoid(self.deconv3.forward(x))
    }
}

/// Per-channel softmax over spatial positions, reduced to the expected (x, y)
/// coordinate of each channel's activation in [-1, 1]. Output is
/// [batch, 2 * channels]: an (x, y) pair per channel.
pub(crate) fn spatial_softmax<B: Backend>(features: Tensor<B, 4>) -> Tensor<B, 2> {
    let device = features.device();
    let [batch, channels, height, width] = features.dims();

    let attention = softmax(features.reshape([batch * channels, height * width]), 1);

    let mut xs = Vec::with_capacity(height * width);
    let mut ys = Vec::with_capacity(height * width);
    for y in 0..height {
        for x in 0..width {
            xs.push(coord(x, width));
            ys.push(coord(y, height));
        }
    }
    let pos_x = Tensor::<B, 1>::from_data(TensorData::new(xs, [height * width]), &device)
        .reshape([1, height * width]);
    let pos_y = Tensor::<B, 1>::from_data(TensorData::new(ys, [height * width]), &device)
        .reshape([1, height * width]);

    let expected_x = (attention.clone() * pos_x).sum_dim(1);
    let expected_y = (attention * pos_y).sum_dim(1);

    Tensor::cat(vec![expected_x, expected_y], 1).reshape([batch, 2 * channels])
}

/// Index `i` of `n` mapped to [-1, 1].
fn coord(i: usize, n: usize) -> f32 {
    if n <= 1 {
        return 0.0;
    }
    i as f32 * 2.0 / (n as f32 - 1.0) - 1.0
}

#[derive(Config, Debug)]
pub struct VanillaAeConfig {
    pub latent_dim: usize,
    /// (channels, height, width) of the input frames.
    pub frame_dims: [usize; 3],
}

/// Strided conv encoder with a dense bottleneck.
#[derive(Module, Debug)]
pub struct VanillaAe<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    to_latent: Linear<B>,
    decoder: FrameDecoder<B>,
    activation: Relu,
}

impl VanillaAeConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> VanillaAe<B> {
        let [channels, height, width] = self.frame_dims;
        let (h3, w3) = (
            halved(halved(halved(height))),
            halved(halved(halved(width))),
        );

        VanillaAe {
            conv1: strided_conv([channels, 32], device),
            conv2: strided_conv([32, 64], device),
            conv3: strided_conv([64, 128], device),
            to_latent: LinearConfig::new(128 * h3 * w3, self.latent_dim).init(device),
            decoder: FrameDecoder::new(self.latent_dim, self.frame_dims, device),
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> VanillaAe<B> {
    pub fn encode(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.conv1.forward(images));
        let x = self.activation.forward(self.conv2.forward(x));
        let x = self.activation.forward(self.conv3.forward(x));
        self.to_latent.forward(x.flatten(1, 3))
    }

    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        self.decoder.forward(self.encode(images))
    }

    pub fn forward_reconstruction(&self, images: Tensor<B, 4>) -> RegressionOutput<B> {
        reconstruction_output(self.forward(images.clone()), images)
    }
}

#[derive(Config, Debug)]
pub struct SpatialAeConfig {
    pub latent_dim: usize,
    /// (channels, height, width) of the input frames.
    pub frame_dims: [usize; 3],
}

/// Conv encoder whose bottleneck is a spatial softmax over the final feature
/// map: each channel contributes one expected image coordinate.
#[derive(Module, Debug)]
pub struct SpatialAe<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    to_latent: Linear<B>,
    decoder: FrameDecoder<B>,
    activation: Relu,
}

impl SpatialAeConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SpatialAe<B> {
        let [channels, _, _] = self.frame_dims;

        SpatialAe {
            conv1: strided_conv([channels, 32], device),
            conv2: strided_conv([32, 64], device),
            // 64 keypoint channels, an (x, y) pair each.
            to_latent: LinearConfig::new(128, self.latent_dim).init(device),
            decoder: FrameDecoder::new(self.latent_dim, self.frame_dims, device),
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> SpatialAe<B> {
    pub fn encode(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.conv1.forward(images));
        let x = self.activation.forward(self.conv2.forward(x));
        self.to_latent.forward(spatial_softmax(x))
    }

    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        self.decoder.forward(self.encode(images))
    }

    pub fn forward_reconstruction(&self, images: Tensor<B, 4>) -> RegressionOutput<B> {
        reconstruction_output(self.forward(images.clone()), images)
    }
}

/// Reconstruction target = input; mean squared error over all pixels.
fn reconstruction_output<B: Backend>(
    reconstruction: Tensor<B, 4>,
    images: Tensor<B, 4>,
) -> RegressionOutput<B> {
    let [batch, channels, height, width] = images.dims();
    let output = reconstruction.reshape([batch, channels * height * width]);
    let targets = images.reshape([batch, channels * height * width]);
    let loss = MseLoss::new().forward(output.clone(), targets.clone(), Reduction::Mean);
    RegressionOutput::new(loss, output, targets)
}

impl<B: AutodiffBackend> TrainStep<FrameBatch<B>, RegressionOutput<B>> for VanillaAe<B> {
    fn step(&self, batch: FrameBatch<B>) -> TrainOutput<RegressionOutput<B>> {
        let item = self.forward_reconstruction(batch.images);
        TrainOutput::new(self, item.loss.backward(), item)
    }
}

impl<B: Backend> ValidStep<FrameBatch<B>, RegressionOutput<B>> for VanillaAe<B> {
    fn step(&self, batch: FrameBatch<B>) -> RegressionOutput<B> {
        self.forward_reconstruction(batch.images)
    }
}

impl<B: AutodiffBackend> TrainStep<FrameBatch<B>, RegressionOutput<B>> for SpatialAe<B> {
    fn step(&self, batch: FrameBatch<B>) -> TrainOutput<RegressionOutput<B>> {
        let item = self.forward_reconstruction(batch.images);
        TrainOutput::new(self, item.loss.backward(), item)
    }
}

impl<B: Backend> ValidStep<FrameBatch<B>, RegressionOutput<B>> for SpatialAe<B> {
    fn step(&self, batch: FrameBatch<B>) -> RegressionOutput<B> {
        self.forward_reconstruction(batch.images)
    }
}
