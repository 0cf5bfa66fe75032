use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("posechain-apps: No pose file is specified.")]
    NoPoseFile,
    #[error("posechain-apps: Failed to parse {:?} as toml ({}).", .0, .1)]
    TomlParseFailure(PathBuf, #[source] toml::de::Error),
    #[error("posechain-apps: Failed to parse {:?} as json ({}).", .0, .1)]
    JsonParseFailure(PathBuf, #[source] serde_json::Error),
    #[error("posechain-apps: No File {:?} is found ({}).", .0, .1)]
    NoFile(PathBuf, #[source] std::io::Error),
    #[error("posechain-apps: Unsupported pose file {:?}, expected .toml or .json.", .0)]
    UnsupportedPoseFormat(PathBuf),
    #[error("posechain-apps: Invalid config {:?}: {}", .0, .1)]
    InvalidConfig(PathBuf, String),
    #[error("posechain-apps: posechain: {:?}", .0)]
    Posechain(#[from] posechain::Error),
}
