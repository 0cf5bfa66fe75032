use std::collections::{HashMap, VecDeque};

use crate::{
    error::{ChannelFault, CommFault},
    traits::ActuatorChannel,
    types::{JointId, PositionCount},
};

/// One request seen by [`DummyActuatorChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCall {
    SetTorqueEnabled(JointId, bool),
    SetGoalPosition(JointId, PositionCount),
    PresentPosition(JointId),
    Close,
}

/// In-memory ActuatorChannel for debugging and tests.
///
/// Joints jump to their goal as soon as it is written unless readings have
/// been scripted with [`push_readings`](Self::push_readings).
#[derive(Debug, Default)]
pub struct DummyActuatorChannel {
    pub calls: Vec<ChannelCall>,
    torque: HashMap<JointId, bool>,
    positions: HashMap<JointId, PositionCount>,
    readings: HashMap<JointId, VecDeque<Result<PositionCount, ChannelFault>>>,
    torque_faults: HashMap<JointId, ChannelFault>,
    goal_faults: HashMap<JointId, ChannelFault>,
    closed: bool,
}

impl DummyActuatorChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues results for the next `present_position` calls on `joint`.
    /// Once the queue drains, reads report the last written goal again.
    pub fn push_readings(
        &mut self,
        joint: JointId,
        readings: impl IntoIterator<Item = Result<PositionCount, ChannelFault>>,
    ) {
        self.readings.entry(joint).or_default().extend(readings);
    }

    /// Makes every goal write to `joint` fail with `fault`.
    pub fn fail_goal_writes(&mut self, joint: JointId, fault: ChannelFault) {
        self.goal_faults.insert(joint, fault);
    }

    /// Makes every torque write to `joint` fail with `fault`.
    pub fn fail_torque_writes(&mut self, joint: JointId, fault: ChannelFault) {
        self.torque_faults.insert(joint, fault);
    }

    pub fn is_torque_enabled(&self, joint: JointId) -> bool {
        self.torque.get(&joint).copied().unwrap_or(false)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Goal writes in the order they were attempted, failed ones included.
    pub fn goal_writes(&self) -> Vec<(JointId, PositionCount)> {
        self.calls
            .iter()
            .filter_map(|call| match *call {
                ChannelCall::SetGoalPosition(joint, position) => Some((joint, position)),
                _ => None,
            })
            .collect()
    }

    pub fn count_calls(&self, f: impl Fn(&ChannelCall) -> bool) -> usize {
        self.calls.iter().filter(|call| f(call)).count()
    }

    fn check_open(&self) -> Result<(), ChannelFault> {
        if self.closed {
            Err(CommFault::PortClosed.into())
        } else {
            Ok(())
        }
    }
}

impl ActuatorChannel for DummyActuatorChannel {
    fn set_torque_enabled(&mut self, joint: JointId, enabled: bool) -> Result<(), ChannelFault> {
        self.calls.push(ChannelCall::SetTorqueEnabled(joint, enabled));
        self.check_open()?;
        if let Some(fault) = self.torque_faults.get(&joint) {
            return Err(fault.clone());
        }
        self.torque.insert(joint, enabled);
        Ok(())
    }

    fn set_goal_position(
        &mut self,
        joint: JointId,
        position: PositionCount,
    ) -> Result<(), ChannelFault> {
        self.calls.push(ChannelCall::SetGoalPosition(joint, position));
        self.check_open()?;
        if let Some(fault) = self.goal_faults.get(&joint) {
            return Err(fault.clone());
        }
        self.positions.insert(joint, position);
        Ok(())
    }

    fn present_position(&mut self, joint: JointId) -> Result<PositionCount, ChannelFault> {
        self.calls.push(ChannelCall::PresentPosition(joint));
        self.check_open()?;
        if let Some(reading) = self.readings.get_mut(&joint).and_then(VecDeque::pop_front) {
            return reading;
        }
        Ok(self.positions.get(&joint).copied().unwrap_or_default())
    }

    fn close(&mut self) {
        self.calls.push(ChannelCall::Close);
        self.closed = true;
    }
}
