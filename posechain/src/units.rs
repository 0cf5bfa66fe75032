use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::PositionCount;

/// Counts per degree of a 4096-step encoder.
pub const DEGREE_TO_COUNT: f64 = 4096.0 / 360.0;
/// Maps recorded angles centered on zero to the middle of the encoder range.
pub const ANGLE_OFFSET_DEG: f64 = 180.0;

/// Converts angles in degrees to actuator counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UnitConverter {
    #[serde(default = "default_offset_deg")]
    pub offset_deg: f64,
    #[serde(default = "default_counts_per_degree")]
    pub counts_per_degree: f64,
}

impl UnitConverter {
    pub fn new(offset_deg: f64, counts_per_degree: f64) -> Self {
        Self {
            offset_deg,
            counts_per_degree,
        }
    }

    /// `round((degrees + offset) * counts_per_degree)`.
    ///
    /// NaN maps to `0`, which pose validation reads as "no data for this
    /// joint". Results outside the `i32` range saturate.
    pub fn to_count(&self, degrees: f64) -> PositionCount {
        if degrees.is_nan() {
            return 0;
        }
        ((degrees + self.offset_deg) * self.counts_per_degree).round() as PositionCount
    }

    pub fn to_degrees(&self, count: PositionCount) -> f64 {
        count as f64 / self.counts_per_degree - self.offset_deg
    }
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::new(default_offset_deg(), default_counts_per_degree())
    }
}

fn default_offset_deg() -> f64 {
    ANGLE_OFFSET_DEG
}

fn default_counts_per_degree() -> f64 {
    DEGREE_TO_COUNT
}
