use std::ops::RangeInclusive;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::Error,
    types::{JointId, JointSpec, PoseRow, PositionCount},
};

/// Legal goal range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PositionLimits {
    pub floor: PositionCount,
    pub ceiling: PositionCount,
}

impl PositionLimits {
    pub fn new(floor: PositionCount, ceiling: PositionCount) -> Result<Self, Error> {
        if floor > ceiling {
            return Err(Error::InvalidLimits { floor, ceiling });
        }
        Ok(Self { floor, ceiling })
    }

    pub fn range(&self) -> RangeInclusive<PositionCount> {
        self.floor..=self.ceiling
    }
}

impl Default for PositionLimits {
    fn default() -> Self {
        Self {
            floor: 1023,
            ceiling: 3400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClampOutcome {
    /// A cell held the "no data" sentinel; nothing may be commanded for this
    /// pose.
    Skip { joint: JointId, value: PositionCount },
    /// Goals to dispatch, in joint order, mirroring already applied.
    Proceed(PoseRow),
}

impl ClampOutcome {
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }
}

/// Validates a pose row right before it is dispatched.
#[derive(Debug, Clone)]
pub struct PoseClamp {
    joints: Vec<JointSpec>,
    limits: PositionLimits,
}

impl PoseClamp {
    pub fn new(joints: Vec<JointSpec>, limits: PositionLimits) -> Self {
        Self { joints, limits }
    }

    pub fn joints(&self) -> &[JointSpec] {
        &self.joints
    }

    pub fn limits(&self) -> PositionLimits {
        self.limits
    }

    /// Clamps `row` in place and returns the goals to dispatch.
    ///
    /// Cells are visited in joint order. A non-positive cell stops the visit
    /// and skips the row; cells before it stay clamped. Mirroring only touches
    /// the returned goals, so the stored row remains a fixed point.
    ///
    /// A row whose width differs from the joint count is left untouched and
    /// reported as [`Error::LengthMismatch`].
    pub fn apply(&self, index: usize, row: &mut PoseRow) -> Result<ClampOutcome, Error> {
        if row.len() != self.joints.len() {
            return Err(Error::LengthMismatch {
                model: self.joints.len(),
                input: row.len(),
            });
        }
        for (joint, cell) in self.joints.iter().zip(row.cells_mut()) {
            if *cell <= 0 {
                return Ok(ClampOutcome::Skip {
                    joint: joint.id,
                    value: *cell,
                });
            }
            if *cell > self.limits.ceiling {
                debug!(
                    "Changing row {index} due to large values: joint={}, position={}, limit={:?}",
                    joint.id,
                    cell,
                    self.limits.range(),
                );
                *cell = self.limits.ceiling;
            } else if *cell < self.limits.floor {
                debug!(
                    "Changing row {index} due to small values: joint={}, position={}, limit={:?}",
                    joint.id,
                    cell,
                    self.limits.range(),
                );
                *cell = self.limits.floor;
            }
        }
        let goals = self
            .joints
            .iter()
            .zip(row.as_slice())
            .map(|(joint, &cell)| match joint.mirror {
                Some(mirror) => mirror.apply(cell),
                None => cell,
            })
            .collect();
        Ok(ClampOutcome::Proceed(PoseRow::new(goals)))
    }
}
