use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::DatasetError;

/// Environment variants a frame set can be assembled for. Each one maps to a
/// pair of image directories in the [`DataConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvType {
    SawyerPusherNoTexture,
    SawyerPusherTexture,
}

impl EnvType {
    pub const ALL: [EnvType; 2] = [EnvType::SawyerPusherNoTexture, EnvType::SawyerPusherTexture];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvType::SawyerPusherNoTexture => "sawyer_pusher_no_texture",
            EnvType::SawyerPusherTexture => "sawyer_pusher_texture",
        }
    }
}

impl fmt::Display for EnvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EnvType::ALL
            .into_iter()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<_> = EnvType::ALL.iter().map(EnvType::as_str).collect();
                format!("unknown env type `{s}`, expected one of: {}", known.join(", "))
            })
    }
}

/// The directory pair backing one environment.
#[derive(Clone, Debug)]
pub struct EnvDirs {
    /// Curated expert frames; only a fixed-size prefix is consumed.
    pub expert: PathBuf,
    /// Randomly generated frames; consumed in full.
    pub random: PathBuf,
}

/// Explicit map from environment to image directories, passed into the
/// assembler instead of living in process-wide constants.
#[derive(Clone, Debug, Default)]
pub struct DataConfig {
    envs: HashMap<EnvType, EnvDirs>,
}

impl DataConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, env: EnvType, expert: PathBuf, random: PathBuf) -> Self {
        self.envs.insert(env, EnvDirs { expert, random });
        self
    }

    /// Standard on-disk layout: `<root>/expert_images/<env>` and
    /// `<root>/random_trajectories/<env>` for every known environment.
    pub fn from_root(root: &Path) -> Self {
        EnvType::ALL.into_iter().fold(Self::new(), |config, env| {
            config.with_env(
                env,
                root.join("expert_images").join(env.as_str()),
                root.join("random_trajectories").join(env.as_str()),
            )
        })
    }

    pub fn dirs(&self, env: EnvType) -> Result<&EnvDirs, DatasetError> {
        self.envs.get(&env).ok_or(DatasetError::EnvNotConfigured(env))
    }
}
