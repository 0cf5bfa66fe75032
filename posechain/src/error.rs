use std::time::Duration;

use thiserror::Error;

use crate::types::{JointId, PositionCount};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("posechain: Link fault on {:?}: {}", path, message)]
    Link { path: String, message: String },
    #[error("posechain: Channel fault on joint {}: {}", joint, fault)]
    Channel {
        joint: JointId,
        #[source]
        fault: ChannelFault,
    },
    #[error(
        "posechain: Convergence timeout {:?}: target={:?}, cur={:?} is_reached={:?}",
        timeout,
        target,
        current,
        is_reached
    )]
    ConvergenceTimeout {
        timeout: Duration,
        target: Vec<PositionCount>,
        current: Vec<Option<PositionCount>>,
        is_reached: Vec<bool>,
    },
    #[error("posechain: Length mismatch (model = {}, input = {})", model, input)]
    LengthMismatch { model: usize, input: usize },
    #[error(
        "posechain: Pose row {} has {} cells but there are {} joints",
        row,
        cells,
        joints
    )]
    PoseWidth {
        row: usize,
        joints: usize,
        cells: usize,
    },
    #[error("posechain: Invalid limits: floor {} is above ceiling {}", floor, ceiling)]
    InvalidLimits {
        floor: PositionCount,
        ceiling: PositionCount,
    },
    #[error("posechain: Operator gate : {}", message)]
    Gate { message: String },
    #[error("posechain: Other: {:?}", .0)]
    Other(#[from] anyhow::Error),
}

/// A failed bus transaction.
///
/// Faults never abort a session: the caller logs them and carries on with the
/// next transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ChannelFault {
    /// The request was not answered, or the answer could not be decoded.
    #[error("communication: {}", .0)]
    Communication(CommFault),
    /// The device answered with a non-zero error code.
    #[error("device error 0x{:02X}: {}", code, reason)]
    Device { code: u8, reason: String },
}

impl From<CommFault> for ChannelFault {
    fn from(fault: CommFault) -> Self {
        Self::Communication(fault)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CommFault {
    #[error("port is closed")]
    PortClosed,
    #[error("failed to transmit instruction packet: {}", .0)]
    TxFail(String),
    #[error("no status packet received")]
    RxTimeout,
    #[error("corrupt status packet: {}", .0)]
    RxCorrupt(String),
    #[error("status packet from unexpected id {} (expected {})", actual, expected)]
    WrongId { expected: u8, actual: u8 },
}
