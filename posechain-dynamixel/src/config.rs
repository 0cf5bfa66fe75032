use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Register addresses used by the channel, per actuator model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ControlTable {
    /// 1 byte.
    pub torque_enable: u16,
    /// 4 bytes.
    pub goal_position: u16,
    /// 4 bytes.
    pub present_position: u16,
}

impl ControlTable {
    /// MX series with 2.0 firmware (also X series).
    pub const MX_2_0: Self = Self {
        torque_enable: 64,
        goal_position: 116,
        present_position: 132,
    };
}

impl Default for ControlTable {
    fn default() -> Self {
        Self::MX_2_0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DynamixelChannelConfig {
    /// e.g. `/dev/ttyUSB0`, `/dev/tty.usbserial-*`, `COM3`
    #[serde(default = "default_port_path")]
    pub port_path: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// How long to wait for each status packet.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for DynamixelChannelConfig {
    fn default() -> Self {
        Self {
            port_path: default_port_path(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_port_path() -> String {
    "/dev/ttyUSB0".to_owned()
}

fn default_baud_rate() -> u32 {
    57600
}

fn default_timeout_ms() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_toml() {
        let config: DynamixelChannelConfig = toml::from_str("").unwrap();
        assert_eq!(config, DynamixelChannelConfig::default());
        assert_eq!(config.baud_rate, 57600);
    }

    #[test]
    fn unknown_field() {
        assert!(toml::from_str::<DynamixelChannelConfig>("baudrate = 1").is_err());
    }

    #[test]
    fn control_table() {
        let table: ControlTable =
            toml::from_str("torque_enable = 24\ngoal_position = 30\npresent_position = 36")
                .unwrap();
        assert_eq!(table.goal_position, 30);
        assert_eq!(ControlTable::default(), ControlTable::MX_2_0);
    }
}
