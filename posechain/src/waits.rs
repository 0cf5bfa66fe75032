use std::{
    thread,
    time::{Duration, Instant},
};

use auto_impl::auto_impl;
use tracing::{debug, warn};

use crate::{
    error::Error,
    traits::ActuatorChannel,
    types::{JointId, PositionCount},
};

/// How long a convergence wait may last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitBudget {
    /// Poll until every joint arrives, however long that takes.
    Unbounded,
    /// Give up with [`Error::ConvergenceTimeout`] once this much time has
    /// passed without convergence.
    Bounded(Duration),
}

impl WaitBudget {
    /// `0` means unbounded.
    pub fn from_millis(millis: u64) -> Self {
        if millis == 0 {
            Self::Unbounded
        } else {
            Self::Bounded(Duration::from_millis(millis))
        }
    }

    fn is_exhausted(&self, start: Instant) -> Option<Duration> {
        match *self {
            Self::Unbounded => None,
            Self::Bounded(timeout) => (start.elapsed() >= timeout).then_some(timeout),
        }
    }
}

impl Default for WaitBudget {
    fn default() -> Self {
        Self::Bounded(Duration::from_secs(30))
    }
}

/// Decides when a dispatched pose has been reached.
#[auto_impl(&, Box, Arc)]
pub trait CompleteCondition {
    /// Blocks until `channel` reports that every joint reached its goal.
    /// Returns the number of poll cycles it took.
    fn wait(
        &self,
        channel: &mut dyn ActuatorChannel,
        joints: &[JointId],
        goals: &[PositionCount],
    ) -> Result<usize, Error>;
}

/// Readings of every joint taken in one pass over the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollCycle {
    /// `None` where the read failed.
    pub current: Vec<Option<PositionCount>>,
    pub is_reached: Vec<bool>,
}

impl PollCycle {
    pub fn evaluate(
        goals: &[PositionCount],
        current: Vec<Option<PositionCount>>,
        tolerance: PositionCount,
    ) -> Self {
        let is_reached = goals
            .iter()
            .zip(&current)
            .map(|(goal, cur)| matches!(cur, Some(cur) if (goal - cur).abs() <= tolerance))
            .collect();
        Self {
            current,
            is_reached,
        }
    }

    /// True only when every joint is within tolerance in this same cycle.
    pub fn is_converged(&self) -> bool {
        !self.is_reached.contains(&false)
    }
}

/// Converged when `|goal - present| <= tolerance` holds for every joint at
/// once. Nothing is latched between cycles.
#[derive(Clone, Debug)]
pub struct EachJointToleranceCondition {
    pub tolerance: PositionCount,
    pub poll_interval: Duration,
    pub budget: WaitBudget,
}

impl EachJointToleranceCondition {
    pub fn new(tolerance: PositionCount, poll_interval: Duration, budget: WaitBudget) -> Self {
        Self {
            tolerance,
            poll_interval,
            budget,
        }
    }

    /// Reads every joint once, in order.
    pub fn poll(
        &self,
        channel: &mut dyn ActuatorChannel,
        joints: &[JointId],
        goals: &[PositionCount],
    ) -> PollCycle {
        let current = joints
            .iter()
            .zip(goals)
            .map(|(&joint, goal)| match channel.present_position(joint) {
                Ok(present) => {
                    debug!("[{joint}] GoalPos:{goal:03}  PresPos:{present:03}");
                    Some(present)
                }
                Err(fault) => {
                    warn!("[{joint}] failed to read present position: {fault}");
                    None
                }
            })
            .collect();
        PollCycle::evaluate(goals, current, self.tolerance)
    }
}

impl Default for EachJointToleranceCondition {
    fn default() -> Self {
        Self::new(100, Duration::from_millis(10), WaitBudget::default())
    }
}

impl CompleteCondition for EachJointToleranceCondition {
    fn wait(
        &self,
        channel: &mut dyn ActuatorChannel,
        joints: &[JointId],
        goals: &[PositionCount],
    ) -> Result<usize, Error> {
        if joints.len() != goals.len() {
            return Err(Error::LengthMismatch {
                model: joints.len(),
                input: goals.len(),
            });
        }
        let start = Instant::now();
        let mut polls = 0;
        loop {
            let cycle = self.poll(channel, joints, goals);
            polls += 1;
            if cycle.is_converged() {
                return Ok(polls);
            }
            if let Some(timeout) = self.budget.is_exhausted(start) {
                return Err(Error::ConvergenceTimeout {
                    timeout,
                    target: goals.to_vec(),
                    current: cycle.current,
                    is_reached: cycle.is_reached,
                });
            }
            thread::sleep(self.poll_interval);
        }
    }
}
