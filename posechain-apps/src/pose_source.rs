use std::path::Path;

use posechain::PoseTable;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, PlayerConfig};

/// Recorded poses, one row of joint angles in degrees per pose.
///
/// A missing cell (`null` in JSON, `nan` in TOML) marks a row without data,
/// which is skipped at playback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PoseFile {
    pub angles: Vec<Vec<Option<f64>>>,
}

impl PoseFile {
    pub fn try_new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| Error::NoFile(path.to_owned(), e))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&s, path),
            Some("json") => Self::from_json_str(&s, path),
            _ => Err(Error::UnsupportedPoseFormat(path.to_owned())),
        }
    }

    pub fn from_toml_str<P: AsRef<Path>>(s: &str, path: P) -> Result<Self, Error> {
        toml::from_str(s).map_err(|e| Error::TomlParseFailure(path.as_ref().to_owned(), e))
    }

    pub fn from_json_str<P: AsRef<Path>>(s: &str, path: P) -> Result<Self, Error> {
        serde_json::from_str(s).map_err(|e| Error::JsonParseFailure(path.as_ref().to_owned(), e))
    }

    /// Angles with missing cells replaced by NaN.
    pub fn degrees(&self) -> Vec<Vec<f64>> {
        self.angles
            .iter()
            .map(|row| row.iter().map(|cell| cell.unwrap_or(f64::NAN)).collect())
            .collect()
    }

    pub fn into_table(self, config: &PlayerConfig) -> Result<PoseTable, Error> {
        Ok(PoseTable::from_angles(
            config.joints.len(),
            &self.degrees(),
            &config.conversion,
        )?)
    }
}

/// Reads and converts the whole pose file before any device is touched.
pub fn load_pose_table<P: AsRef<Path>>(path: P, config: &PlayerConfig) -> Result<PoseTable, Error> {
    let table = PoseFile::try_new(path)?.into_table(config)?;
    debug!("goal table ({} rows):", table.len());
    for (index, row) in table.rows().iter().enumerate() {
        debug!("  {index}: {:?}", row.as_slice());
    }
    Ok(table)
}
