use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Duration,
};

use posechain::{
    EachJointToleranceCondition, JointId, JointSpec, Mirror, PositionCount, PositionLimits,
    SequencerConfig, UnitConverter, WaitBudget,
};
use posechain_dynamixel::{ControlTable, DynamixelChannel, DynamixelChannelConfig};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use tracing::debug;

use crate::Error;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct JointConfig {
    pub id: JointId,
    /// Set for actuators mounted in the opposite direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror: Option<Mirror>,
    #[serde(default)]
    pub control_table: ControlTable,
}

impl JointConfig {
    pub fn new(id: u8) -> Self {
        Self {
            id: JointId(id),
            mirror: None,
            control_table: ControlTable::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PlayerConfig {
    // TOML format has a restriction that if a table itself contains tables,
    // all keys with non-table values must be emitted first.
    // Therefore, these fields must be located at the start of the struct.
    /// Relative paths are resolved against the directory of the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose_file: Option<PathBuf>,
    /// Largest |goal - present| still counted as arrived, in counts.
    #[serde(default = "default_tolerance")]
    pub tolerance: PositionCount,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// 0 waits forever.
    #[serde(default = "default_convergence_timeout_ms")]
    pub convergence_timeout_ms: u64,
    /// Pause after a row skipped for missing data.
    #[serde(default = "default_skip_delay_ms")]
    pub skip_delay_ms: u64,

    #[serde(default)]
    pub link: DynamixelChannelConfig,
    #[serde(default)]
    pub conversion: UnitConverter,
    #[serde(default)]
    pub limits: PositionLimits,
    /// Joints in dispatch order.
    #[serde(default = "default_joints")]
    pub joints: Vec<JointConfig>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            pose_file: None,
            tolerance: default_tolerance(),
            poll_interval_ms: default_poll_interval_ms(),
            convergence_timeout_ms: default_convergence_timeout_ms(),
            skip_delay_ms: default_skip_delay_ms(),
            link: Default::default(),
            conversion: Default::default(),
            limits: Default::default(),
            joints: default_joints(),
        }
    }
}

fn default_tolerance() -> PositionCount {
    100
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_convergence_timeout_ms() -> u64 {
    30_000
}

fn default_skip_delay_ms() -> u64 {
    5_000
}

fn default_joints() -> Vec<JointConfig> {
    posechain::default_joints()
        .into_iter()
        .map(|spec| JointConfig {
            id: spec.id,
            mirror: spec.mirror,
            control_table: ControlTable::default(),
        })
        .collect()
}

impl PlayerConfig {
    pub fn try_new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        Self::from_str(
            &std::fs::read_to_string(path).map_err(|e| Error::NoFile(path.to_owned(), e))?,
            path,
        )
    }

    pub fn from_str<P: AsRef<Path>>(s: &str, path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let mut config: PlayerConfig =
            toml::from_str(s).map_err(|e| Error::TomlParseFailure(path.to_owned(), e))?;
        config
            .validate()
            .map_err(|message| Error::InvalidConfig(path.to_owned(), message))?;
        if let Some(pose_file) = &mut config.pose_file {
            resolve_relative_path(path, pose_file);
        }
        debug!("{:?}", config);
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.joints.is_empty() {
            return Err("no joints".into());
        }
        let mut ids = HashSet::new();
        for joint in &self.joints {
            if !ids.insert(joint.id) {
                return Err(format!("joint {} is listed twice", joint.id));
            }
        }
        if self.tolerance < 0 {
            return Err(format!("negative tolerance {}", self.tolerance));
        }
        PositionLimits::new(self.limits.floor, self.limits.ceiling).map_err(|e| e.to_string())?;
        if !(self.conversion.counts_per_degree.is_finite()
            && self.conversion.offset_deg.is_finite())
        {
            return Err("conversion factors must be finite".into());
        }
        Ok(())
    }

    pub fn joint_specs(&self) -> Vec<JointSpec> {
        self.joints
            .iter()
            .map(|joint| JointSpec {
                id: joint.id,
                mirror: joint.mirror,
            })
            .collect()
    }

    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            joints: self.joint_specs(),
            limits: self.limits,
            skip_delay: Duration::from_millis(self.skip_delay_ms),
        }
    }

    pub fn complete_condition(&self) -> EachJointToleranceCondition {
        EachJointToleranceCondition::new(
            self.tolerance,
            Duration::from_millis(self.poll_interval_ms),
            WaitBudget::from_millis(self.convergence_timeout_ms),
        )
    }

    /// Opens the serial link and registers every joint's control table.
    pub fn create_channel(&self) -> Result<DynamixelChannel<Box<dyn SerialPort>>, Error> {
        let mut channel = DynamixelChannel::open(&self.link)?;
        for joint in &self.joints {
            channel.set_control_table(joint.id, joint.control_table);
        }
        Ok(channel)
    }
}

fn resolve_relative_path(config_path: &Path, path: &mut PathBuf) {
    if path.is_relative() {
        if let Some(parent) = config_path.parent() {
            *path = parent.join(&*path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_four_joint_chain() {
        let config = PlayerConfig::default();
        let specs = config.joint_specs();
        assert_eq!(specs.len(), 4);
        assert_eq!(specs[1].mirror, Some(Mirror::new(3600, 1024)));
        assert!(specs.iter().enumerate().all(|(i, s)| i == 1 || s.mirror.is_none()));
        assert_eq!(config.limits, PositionLimits::new(1023, 3400).unwrap());
        assert_eq!(config.link.baud_rate, 57600);
    }

    #[test]
    fn relative_pose_file() {
        let config =
            PlayerConfig::from_str("pose_file = \"poses/a.toml\"", "/etc/posechain/player.toml")
                .unwrap();
        assert_eq!(
            config.pose_file,
            Some(PathBuf::from("/etc/posechain/poses/a.toml"))
        );

        let config = PlayerConfig::from_str("pose_file = \"/tmp/a.toml\"", "player.toml").unwrap();
        assert_eq!(config.pose_file, Some(PathBuf::from("/tmp/a.toml")));
    }

    #[test]
    fn complete_condition_from_config() {
        let config = PlayerConfig::from_str(
            "tolerance = 20\npoll_interval_ms = 5\nconvergence_timeout_ms = 0",
            "player.toml",
        )
        .unwrap();
        let c = config.complete_condition();
        assert_eq!(c.tolerance, 20);
        assert_eq!(c.poll_interval, Duration::from_millis(5));
        assert_eq!(c.budget, WaitBudget::Unbounded);
    }
}
