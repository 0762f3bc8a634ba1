use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use pixae_dataset::{assemble, DataConfig, DatasetError, EnvType, FrameSet};
use tempfile::TempDir;

const ENV: EnvType = EnvType::SawyerPusherNoTexture;

/// Writes a 2x2 RGB png whose red channel encodes `tag`.
fn write_png(dir: &Path, name: &str, tag: u8) {
    write_png_sized(dir, name, tag, 2, 2);
}

fn write_png_sized(dir: &Path, name: &str, tag: u8, width: u32, height: u32) {
    let image = RgbImage::from_pixel(width, height, Rgb([tag, 128, 255]));
    image.save(dir.join(name)).unwrap();
}

/// A config with fresh expert/random directories under one temp root.
fn scratch_config() -> (TempDir, DataConfig) {
    let root = TempDir::new().unwrap();
    let expert = root.path().join("expert");
    let random = root.path().join("random");
    fs::create_dir_all(&expert).unwrap();
    fs::create_dir_all(&random).unwrap();
    let config = DataConfig::new().with_env(ENV, expert, random);
    (root, config)
}

fn expert_dir(config: &DataConfig) -> &Path {
    &config.dirs(ENV).unwrap().expert
}

fn random_dir(config: &DataConfig) -> &Path {
    &config.dirs(ENV).unwrap().random
}

/// The red-channel tag of frame `index`, denormalized back to [0, 255].
fn tag_of(frames: &FrameSet, index: usize) -> u8 {
    (frames.frame(index)[[0, 0, 0]] * 255.0).round() as u8
}

#[test]
fn assembles_expert_prefix_then_all_random_frames() {
    let (_root, config) = scratch_config();
    write_png(expert_dir(&config), "img_000.png", 0);
    write_png(expert_dir(&config), "img_001.png", 1);
    write_png(expert_dir(&config), "img_002.png", 2);
    write_png(random_dir(&config), "r_a.png", 10);
    write_png(random_dir(&config), "r_b.png", 11);

    let frames = assemble(&config, ENV, 2).unwrap();

    assert_eq!(frames.len(), 4);
    assert_eq!(frames.frame_dims(), (2, 2, 3));
    let tags: Vec<u8> = (0..frames.len()).map(|i| tag_of(&frames, i)).collect();
    assert_eq!(tags, vec![0, 1, 10, 11]);
}

#[test]
fn ordering_is_lexicographic_not_directory_order() {
    let (_root, config) = scratch_config();
    // Created out of order on purpose.
    write_png(expert_dir(&config), "b.png", 2);
    write_png(expert_dir(&config), "a.png", 1);
    write_png(expert_dir(&config), "c.png", 3);

    let frames = assemble(&config, ENV, 3).unwrap();
    let tags: Vec<u8> = (0..3).map(|i| tag_of(&frames, i)).collect();
    assert_eq!(tags, vec![1, 2, 3]);
}

#[test]
fn non_png_files_are_ignored() {
    let (_root, config) = scratch_config();
    write_png(expert_dir(&config), "frame.png", 7);
    fs::write(expert_dir(&config).join("notes.txt"), "not an image").unwrap();
    fs::write(expert_dir(&config).join("frame.jpg"), "wrong suffix").unwrap();

    let frames = assemble(&config, ENV, 1).unwrap();
    assert_eq!(frames.len(), 1);
}

#[test]
fn pixel_values_are_normalized_to_unit_range() {
    let (_root, config) = scratch_config();
    write_png(expert_dir(&config), "frame.png", 51);

    let frames = assemble(&config, ENV, 1).unwrap();
    let frame = frames.frame(0);
    assert!((frame[[0, 0, 0]] - 51.0 / 255.0).abs() < 1e-6);
    assert!((frame[[0, 0, 1]] - 128.0 / 255.0).abs() < 1e-6);
    assert!((frame[[0, 0, 2]] - 1.0).abs() < 1e-6);
    assert!(frames.as_array().iter().all(|&v| (0.0..=1.0).contains(&v)));
}

#[test]
fn assembly_is_deterministic() {
    let (_root, config) = scratch_config();
    for i in 0..5 {
        write_png(expert_dir(&config), &format!("e_{i}.png"), i);
        write_png(random_dir(&config), &format!("r_{i}.png"), 100 + i);
    }

    let first = assemble(&config, ENV, 3).unwrap();
    let second = assemble(&config, ENV, 3).unwrap();
    assert_eq!(first, second);
}

#[test]
fn too_few_expert_images_fails_before_the_random_directory_is_read() {
    let (_root, config) = scratch_config();
    write_png(expert_dir(&config), "only.png", 0);
    // A missing random directory would fail with ReadDir if it were scanned.
    fs::remove_dir(random_dir(&config)).unwrap();

    let err = assemble(&config, ENV, 2).unwrap_err();
    match err {
        DatasetError::InsufficientExpertImages {
            needed, available, ..
        } => {
            assert_eq!(needed, 2);
            assert_eq!(available, 1);
        }
        other => panic!("expected InsufficientExpertImages, got {other:?}"),
    }
}

#[test]
fn missing_expert_directory_is_an_io_error() {
    let (_root, config) = scratch_config();
    fs::remove_dir(expert_dir(&config)).unwrap();

    assert!(matches!(
        assemble(&config, ENV, 1),
        Err(DatasetError::ReadDir { .. })
    ));
}

#[test]
fn corrupt_image_is_a_decode_error() {
    let (_root, config) = scratch_config();
    fs::write(expert_dir(&config).join("bad.png"), b"definitely not a png").unwrap();

    assert!(matches!(
        assemble(&config, ENV, 1),
        Err(DatasetError::Decode { .. })
    ));
}

#[test]
fn mismatched_frame_sizes_are_rejected() {
    let (_root, config) = scratch_config();
    write_png_sized(expert_dir(&config), "a.png", 0, 2, 2);
    write_png_sized(expert_dir(&config), "b.png", 1, 3, 2);

    let err = assemble(&config, ENV, 2).unwrap_err();
    match err {
        DatasetError::ShapeMismatch { expected, got, .. } => {
            assert_eq!(expected, [2, 2, 3]);
            assert_eq!(got, [2, 3, 3]);
        }
        other => panic!("expected ShapeMismatch, got {other:?}"),
    }
}

#[test]
fn unconfigured_env_fails_without_touching_the_filesystem() {
    let config = DataConfig::new();
    assert!(matches!(
        assemble(&config, ENV, 1),
        Err(DatasetError::EnvNotConfigured(_))
    ));
}

#[test]
fn items_match_the_stacked_array() {
    let (_root, config) = scratch_config();
    write_png(expert_dir(&config), "a.png", 3);
    write_png(random_dir(&config), "b.png", 9);

    let frames = assemble(&config, ENV, 1).unwrap();
    let items = frames.items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].height, 2);
    assert_eq!(items[0].width, 2);
    assert_eq!(items[0].channels, 3);
    assert!((items[1].pixels[0] - 9.0 / 255.0).abs() < 1e-6);
}
