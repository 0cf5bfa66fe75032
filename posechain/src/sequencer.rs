use std::{fmt, thread, time::Duration};

use tracing::{debug, error, info, warn};

use crate::{
    clamp::{ClampOutcome, PoseClamp, PositionLimits},
    error::{ChannelFault, Error},
    traits::{ActuatorChannel, GateSignal, OperatorGate},
    types::{default_joints, JointId, JointSpec, PoseRow, PoseTable},
    waits::{CompleteCondition, EachJointToleranceCondition},
};

#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Joints in dispatch order.
    pub joints: Vec<JointSpec>,
    pub limits: PositionLimits,
    /// Pause inserted when a row is skipped for missing data.
    pub skip_delay: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            joints: default_joints(),
            limits: PositionLimits::default(),
            skip_delay: Duration::from_secs(5),
        }
    }
}

/// What happened while playing pose tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    /// Completed passes over the table.
    pub batches: usize,
    /// Rows whose goals were sent.
    pub dispatched: usize,
    /// Rows dropped for missing data.
    pub skipped: usize,
    pub converged: usize,
    pub timed_out: usize,
    /// Failed torque and goal writes. Failed reads are only logged.
    pub faults: Vec<(JointId, ChannelFault)>,
}

impl PlaybackReport {
    fn merge(&mut self, other: Self) {
        self.batches += other.batches;
        self.dispatched += other.dispatched;
        self.skipped += other.skipped;
        self.converged += other.converged;
        self.timed_out += other.timed_out;
        self.faults.extend(other.faults);
    }
}

/// Drives the actuators through a pose table, one row at a time.
///
/// The sequencer owns the channel for its whole life. Torque is disabled and
/// the channel closed exactly once, by [`teardown`](Self::teardown) or, failing
/// that, on drop.
pub struct Sequencer<C>
where
    C: ActuatorChannel,
{
    channel: C,
    joint_ids: Vec<JointId>,
    clamp: PoseClamp,
    complete_condition: Box<dyn CompleteCondition>,
    skip_delay: Duration,
    is_torn_down: bool,
}

impl<C> Sequencer<C>
where
    C: ActuatorChannel,
{
    pub fn new(channel: C, config: SequencerConfig) -> Self {
        Self {
            channel,
            joint_ids: config.joints.iter().map(|joint| joint.id).collect(),
            clamp: PoseClamp::new(config.joints, config.limits),
            complete_condition: Box::new(EachJointToleranceCondition::default()),
            skip_delay: config.skip_delay,
            is_torn_down: false,
        }
    }

    pub fn set_complete_condition(&mut self, condition: Box<dyn CompleteCondition>) {
        self.complete_condition = condition;
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn joint_ids(&self) -> &[JointId] {
        &self.joint_ids
    }

    /// Enables holding torque on every joint. Failures are logged and
    /// returned, never fatal.
    pub fn enable_torque(&mut self) -> Vec<(JointId, ChannelFault)> {
        let mut faults = Vec::new();
        for &joint in &self.joint_ids {
            match self.channel.set_torque_enabled(joint, true) {
                Ok(()) => info!("[{joint}] torque enabled, actuator connected"),
                Err(fault) => {
                    warn!("[{joint}] failed to enable torque: {fault}");
                    faults.push((joint, fault));
                }
            }
        }
        faults
    }

    /// Enables torque, then plays `table` once per [`GateSignal::Advance`]
    /// until the gate says quit. Teardown always runs before returning.
    ///
    /// A gate that fails to read is treated as a quit.
    pub fn run<G>(mut self, table: &mut PoseTable, gate: &mut G) -> Result<PlaybackReport, Error>
    where
        G: OperatorGate + ?Sized,
    {
        self.check_table(table)?;
        let mut report = PlaybackReport {
            faults: self.enable_torque(),
            ..Default::default()
        };
        loop {
            match gate.wait_for_signal() {
                Ok(GateSignal::Advance) => {
                    let batch = self.play_table(table)?;
                    report.merge(batch);
                }
                Ok(GateSignal::Quit) => {
                    info!("quit requested");
                    break;
                }
                Err(e) => {
                    error!("{e}");
                    break;
                }
            }
        }
        self.teardown();
        Ok(report)
    }

    /// Plays every row of `table` once, in order.
    pub fn play_table(&mut self, table: &mut PoseTable) -> Result<PlaybackReport, Error> {
        self.check_table(table)?;
        let mut report = PlaybackReport {
            batches: 1,
            ..Default::default()
        };
        for index in 0..table.len() {
            self.play_row(index, table.row_mut(index), &mut report)?;
        }
        Ok(report)
    }

    fn play_row(
        &mut self,
        index: usize,
        row: &mut PoseRow,
        report: &mut PlaybackReport,
    ) -> Result<(), Error> {
        info!("new goal! row {index}");
        let goals = match self.clamp.apply(index, row)? {
            ClampOutcome::Skip { joint, value } => {
                warn!("Skipping row {index} due to missing data: joint={joint}, value={value}");
                report.skipped += 1;
                thread::sleep(self.skip_delay);
                return Ok(());
            }
            ClampOutcome::Proceed(goals) => goals,
        };

        for (&joint, &goal) in self.joint_ids.iter().zip(goals.as_slice()) {
            if let Err(fault) = self.channel.set_goal_position(joint, goal) {
                warn!("[{joint}] failed to write goal position {goal}: {fault}");
                report.faults.push((joint, fault));
            }
        }
        report.dispatched += 1;

        match self
            .complete_condition
            .wait(&mut self.channel, &self.joint_ids, goals.as_slice())
        {
            Ok(polls) => {
                debug!("row {index} converged after {polls} polls");
                report.converged += 1;
            }
            Err(e) => {
                error!("row {index} abandoned: {e}");
                if matches!(e, Error::ConvergenceTimeout { .. }) {
                    report.timed_out += 1;
                }
            }
        }
        Ok(())
    }

    /// Disables torque on every joint and closes the channel. Only the first
    /// call does anything.
    pub fn teardown(&mut self) {
        if self.is_torn_down {
            return;
        }
        self.is_torn_down = true;
        for &joint in &self.joint_ids {
            if let Err(fault) = self.channel.set_torque_enabled(joint, false) {
                warn!("[{joint}] failed to disable torque: {fault}");
            }
        }
        self.channel.close();
        info!("torque disabled and channel closed");
    }

    fn check_table(&self, table: &PoseTable) -> Result<(), Error> {
        if table.joint_count() != self.joint_ids.len() {
            return Err(Error::LengthMismatch {
                model: self.joint_ids.len(),
                input: table.joint_count(),
            });
        }
        Ok(())
    }
}

impl<C> fmt::Debug for Sequencer<C>
where
    C: ActuatorChannel + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequencer")
            .field("channel", &self.channel)
            .field("joint_ids", &self.joint_ids)
            .field("clamp", &self.clamp)
            .field("skip_delay", &self.skip_delay)
            .field("is_torn_down", &self.is_torn_down)
            .finish_non_exhaustive()
    }
}

impl<C> Drop for Sequencer<C>
where
    C: ActuatorChannel,
{
    fn drop(&mut self) {
        self.teardown();
    }
}
