use std::{fmt, ops::Index};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{error::Error, units::UnitConverter};

/// Position in actuator-native units.
pub type PositionCount = i32;

/// Bus address of one actuator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct JointId(pub u8);

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID:{:03}", self.0)
    }
}

impl From<u8> for JointId {
    fn from(id: u8) -> Self {
        Self(id)
    }
}

/// Reflection of a joint's goal around a pivot, for actuators mounted in
/// the opposite direction to the rest of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Mirror {
    pub pivot: PositionCount,
    pub origin: PositionCount,
}

impl Mirror {
    pub fn new(pivot: PositionCount, origin: PositionCount) -> Self {
        Self { pivot, origin }
    }

    pub fn apply(&self, position: PositionCount) -> PositionCount {
        self.pivot - (position - self.origin)
    }
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new(3600, 1024)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JointSpec {
    pub id: JointId,
    pub mirror: Option<Mirror>,
}

impl JointSpec {
    pub fn new(id: u8) -> Self {
        Self {
            id: JointId(id),
            mirror: None,
        }
    }

    pub fn mirrored(id: u8, mirror: Mirror) -> Self {
        Self {
            id: JointId(id),
            mirror: Some(mirror),
        }
    }
}

/// Four joints with ids 1 to 4, the second one mirrored.
pub fn default_joints() -> Vec<JointSpec> {
    vec![
        JointSpec::new(1),
        JointSpec::mirrored(2, Mirror::default()),
        JointSpec::new(3),
        JointSpec::new(4),
    ]
}

/// Target counts for every joint, in joint order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseRow(Vec<PositionCount>);

impl PoseRow {
    pub fn new(positions: Vec<PositionCount>) -> Self {
        Self(positions)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[PositionCount] {
        &self.0
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [PositionCount] {
        &mut self.0
    }

    pub fn into_inner(self) -> Vec<PositionCount> {
        self.0
    }
}

impl Index<usize> for PoseRow {
    type Output = PositionCount;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl From<Vec<PositionCount>> for PoseRow {
    fn from(positions: Vec<PositionCount>) -> Self {
        Self::new(positions)
    }
}

/// Rows in playback order. The shape never changes after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseTable {
    joint_count: usize,
    rows: Vec<PoseRow>,
}

impl PoseTable {
    /// Builds a table from count rows, rejecting any row whose width differs
    /// from `joint_count`.
    pub fn try_new(joint_count: usize, rows: Vec<Vec<PositionCount>>) -> Result<Self, Error> {
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != joint_count {
                return Err(Error::PoseWidth {
                    row,
                    joints: joint_count,
                    cells: cells.len(),
                });
            }
        }
        Ok(Self {
            joint_count,
            rows: rows.into_iter().map(PoseRow::new).collect(),
        })
    }

    /// Builds a table from rows of angles in degrees.
    pub fn from_angles(
        joint_count: usize,
        angles: &[Vec<f64>],
        converter: &UnitConverter,
    ) -> Result<Self, Error> {
        let rows = angles
            .iter()
            .map(|row| row.iter().map(|&deg| converter.to_count(deg)).collect())
            .collect();
        Self::try_new(joint_count, rows)
    }

    pub fn joint_count(&self) -> usize {
        self.joint_count
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[PoseRow] {
        &self.rows
    }

    pub(crate) fn row_mut(&mut self, index: usize) -> &mut PoseRow {
        &mut self.rows[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joint_id_display() {
        assert_eq!(JointId(3).to_string(), "ID:003");
        assert_eq!(JointId(253).to_string(), "ID:253");
    }

    #[test]
    fn mirror_reflects_around_pivot() {
        let mirror = Mirror::default();
        assert_eq!(mirror.apply(1200), 3424);
        assert_eq!(mirror.apply(1024), 3600);
        assert_eq!(mirror.apply(mirror.apply(2000)), 2000);
    }

    #[test]
    fn table_rejects_ragged_rows() {
        let e = PoseTable::try_new(4, vec![vec![1100; 4], vec![1100; 3]]).unwrap_err();
        assert!(
            matches!(
                e,
                Error::PoseWidth {
                    row: 1,
                    joints: 4,
                    cells: 3
                }
            ),
            "{e:?}"
        );
    }

    #[test]
    fn table_from_angles() {
        let table =
            PoseTable::from_angles(2, &[vec![0.0, -90.0]], &UnitConverter::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.joint_count(), 2);
        assert_eq!(table.rows()[0].as_slice(), &[2048, 1024]);
    }

    #[test]
    fn empty_table() {
        let table = PoseTable::try_new(4, vec![]).unwrap();
        assert!(table.is_empty());
    }
}
