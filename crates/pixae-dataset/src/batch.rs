use burn::data::dataloader::batcher::Batcher;
use burn::tensor::{backend::Backend, Tensor, TensorData};

use crate::assemble::FrameSet;

/// One frame flattened row-major in (height, width, channel) order; the unit
/// stored by burn's in-memory dataset.
#[derive(Clone, Debug)]
pub struct FrameItem {
    pub pixels: Vec<f32>,
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl FrameSet {
    /// The frames as individual dataloader items, preserving order.
    pub fn items(&self) -> Vec<FrameItem> {
        let (height, width, channels) = self.frame_dims();
        (0..self.len())
            .map(|i| FrameItem {
                pixels: self.frame(i).iter().copied().collect(),
                height,
                width,
                channels,
            })
            .collect()
    }
}

/// Stacks frame items into a [batch, channel, height, width] tensor. Pixel
/// values are consumed as-is; the assembler already normalized them to [0, 1].
#[derive(Clone)]
pub struct FrameBatcher<B: Backend> {
    device: B::Device,
}

#[derive(Clone, Debug)]
pub struct FrameBatch<B: Backend> {
    pub images: Tensor<B, 4>,
}

impl<B: Backend> FrameBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<FrameItem, FrameBatch<B>> for FrameBatcher<B> {
    fn batch(&self, items: Vec<FrameItem>) -> FrameBatch<B> {
        let frames = items
            .into_iter()
            .map(|item| {
                let shape = [item.height, item.width, item.channels];
                Tensor::<B, 3>::from_data(TensorData::new(item.pixels, shape), &self.device)
            })
            .collect::<Vec<_>>();

        let images = Tensor::stack::<4>(frames, 0).permute([0, 3, 1, 2]);
        FrameBatch { images }
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    use super::*;

    fn item(height: usize, width: usize, fill: f32) -> FrameItem {
        FrameItem {
            pixels: vec![fill; height * width * 3],
            height,
            width,
            channels: 3,
        }
    }

    #[test]
    fn batch_is_channel_first() {
        let batcher = FrameBatcher::<NdArray>::new(Default::default());
        let batch = batcher.batch(vec![item(4, 6, 0.25), item(4, 6, 0.75)]);
        assert_eq!(batch.images.dims(), [2, 3, 4, 6]);
    }

    #[test]
    fn batch_preserves_pixel_values() {
        let batcher = FrameBatcher::<NdArray>::new(Default::default());

        // One 1x2 RGB frame: pixel (0,0) = (0.0, 0.1, 0.2), pixel (0,1) = (0.3, 0.4, 0.5).
        let frame = FrameItem {
            pixels: vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5],
            height: 1,
            width: 2,
            channels: 3,
        };
        let batch = batcher.batch(vec![frame]);

        let values = batch
            .images
            .into_data()
            .to_vec::<f32>()
            .expect("batch holds f32 values");
        // [1, 3, 1, 2]: per channel, the two pixels in width order.
        assert_eq!(values, vec![0.0, 0.3, 0.1, 0.4, 0.2, 0.5]);
    }
}
