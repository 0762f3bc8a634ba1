use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array3, Array4, ArrayView3, Axis};
use tracing::{debug, info};

use crate::envs::{DataConfig, EnvType};
use crate::error::DatasetError;

/// All frames for one training run, stacked into a single dense
/// (count, height, width, channel) array of `f32` values in [0, 1].
#[derive(Clone, Debug, PartialEq)]
pub struct FrameSet {
    frames: Array4<f32>,
}

impl FrameSet {
    pub fn len(&self) -> usize {
        self.frames.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-frame (height, width, channels).
    pub fn frame_dims(&self) -> (usize, usize, usize) {
        let shape = self.frames.shape();
        (shape[1], shape[2], shape[3])
    }

    pub fn frame(&self, index: usize) -> ArrayView3<'_, f32> {
        self.frames.index_axis(Axis(0), index)
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.frames
    }
}

/// Builds the training frame set for `env`: the first `n_expert` expert
/// frames in lexicographic filename order, followed by every frame of the
/// random directory in the same order.
///
/// The expert-count precondition is checked against the directory listing
/// before anything is decoded and before the random directory is touched.
pub fn assemble(
    config: &DataConfig,
    env: EnvType,
    n_expert: usize,
) -> Result<FrameSet, DatasetError> {
    let dirs = config.dirs(env)?;

    let expert_files = list_png_files(&dirs.expert)?;
    if expert_files.len() < n_expert {
        return Err(DatasetError::InsufficientExpertImages {
            dir: dirs.expert.clone(),
            needed: n_expert,
            available: expert_files.len(),
        });
    }

    let mut frames = Vec::with_capacity(n_expert);
    let mut dims: Option<[usize; 3]> = None;
    for path in expert_files.iter().take(n_expert) {
        frames.push(decode_frame(path, &mut dims)?);
    }

    let random_files = list_png_files(&dirs.random)?;
    for path in &random_files {
        frames.push(decode_frame(path, &mut dims)?);
    }
    debug!(
        expert = n_expert,
        random = random_files.len(),
        "decoded all frames"
    );

    let stacked = stack_frames(frames);
    let (h, w, c) = {
        let shape = stacked.shape();
        (shape[1], shape[2], shape[3])
    };
    info!(
        "assembled {} frames of {}x{}x{} for {env}",
        stacked.shape()[0],
        h,
        w,
        c
    );

    Ok(FrameSet { frames: stacked })
}

/// Regular files with a `.png` suffix, sorted so the result is independent of
/// filesystem iteration order.
fn list_png_files(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let read_dir = fs::read_dir(dir).map_err(|source| DatasetError::ReadDir {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut files = vec![];
    for entry in read_dir {
        let entry = entry.map_err(|source| DatasetError::ReadDir {
            dir: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("png") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Decodes one frame to a (h, w, 3) array of `f32` in [0, 1]. The first frame
/// fixes the expected dimensions; later frames must match them.
fn decode_frame(path: &Path, dims: &mut Option<[usize; 3]>) -> Result<Array3<f32>, DatasetError> {
    let image = image::open(path).map_err(|source| DatasetError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let (h, w) = (image.height() as usize, image.width() as usize);
    let got = [h, w, 3];
    match dims {
        Some(expected) if *expected != got => {
            return Err(DatasetError::ShapeMismatch {
                path: path.to_path_buf(),
                expected: *expected,
                got,
            });
        }
        Some(_) => {}
        None => *dims = Some(got),
    }

    let data = image.into_rgb8().into_vec();
    let frame =
        Array3::from_shape_vec([h, w, 3], data).expect("rgb8 buffer matches image dimensions");
    Ok(frame.mapv(|v| f32::from(v) / 255.0))
}

fn stack_frames(frames: Vec<Array3<f32>>) -> Array4<f32> {
    if frames.is_empty() {
        return Array4::zeros((0, 0, 0, 0));
    }
    let views: Vec<_> = frames.iter().map(Array3::view).collect();
    ndarray::stack(Axis(0), &views).expect("frames share a common shape")
}
