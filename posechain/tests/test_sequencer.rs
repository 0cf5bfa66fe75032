use std::time::{Duration, Instant};

use posechain::{
    ChannelCall, ChannelFault, CommFault, DummyActuatorChannel, EachJointToleranceCondition,
    Error, GateSignal, JointId, JointSpec, OperatorGate, PoseTable, PositionLimits,
    ScriptedGate, Sequencer, SequencerConfig, WaitBudget,
};

const JOINTS: [JointId; 4] = [JointId(1), JointId(2), JointId(3), JointId(4)];

fn plain_config() -> SequencerConfig {
    SequencerConfig {
        joints: (1..=4).map(JointSpec::new).collect(),
        limits: PositionLimits::default(),
        skip_delay: Duration::from_millis(20),
    }
}

fn mirrored_config() -> SequencerConfig {
    SequencerConfig {
        skip_delay: Duration::from_millis(20),
        ..Default::default()
    }
}

fn condition(budget: WaitBudget) -> Box<EachJointToleranceCondition> {
    Box::new(EachJointToleranceCondition::new(
        100,
        Duration::from_millis(1),
        budget,
    ))
}

fn sequencer(
    channel: &mut DummyActuatorChannel,
    config: SequencerConfig,
    budget: WaitBudget,
) -> Sequencer<&mut DummyActuatorChannel> {
    let mut sequencer = Sequencer::new(channel, config);
    sequencer.set_complete_condition(condition(budget));
    sequencer
}

#[test]
fn single_row_converges() {
    let mut channel = DummyActuatorChannel::new();
    channel.push_readings(JointId(1), [Ok(500), Ok(900)]);
    channel.push_readings(JointId(3), [Ok(1250)]);
    let mut table = PoseTable::try_new(4, vec![vec![1100; 4]]).unwrap();

    let mut s = sequencer(&mut channel, plain_config(), WaitBudget::Unbounded);
    let report = s.play_table(&mut table).unwrap();
    drop(s);

    assert_eq!(report.batches, 1);
    assert_eq!(report.dispatched, 1);
    assert_eq!(report.converged, 1);
    assert_eq!(report.timed_out, 0);
    assert!(report.faults.is_empty());
    assert_eq!(
        channel.goal_writes(),
        JOINTS.iter().map(|&j| (j, 1100)).collect::<Vec<_>>()
    );
    // 500 and 900 are out of tolerance, so three full cycles are read.
    let reads = channel.count_calls(|c| matches!(c, ChannelCall::PresentPosition(_)));
    assert_eq!(reads, 12);
}

#[test]
fn sentinel_row_is_skipped() {
    let mut channel = DummyActuatorChannel::new();
    let mut table = PoseTable::try_new(4, vec![vec![-5, 1200, 1200, 1200]]).unwrap();

    let mut s = sequencer(&mut channel, mirrored_config(), WaitBudget::Unbounded);
    let start = Instant::now();
    let report = s.play_table(&mut table).unwrap();
    assert!(start.elapsed() >= Duration::from_millis(20));
    drop(s);

    assert_eq!(report.skipped, 1);
    assert_eq!(report.dispatched, 0);
    assert!(channel.goal_writes().is_empty());
    assert_eq!(
        channel.count_calls(|c| matches!(c, ChannelCall::PresentPosition(_))),
        0
    );
}

#[test]
fn skip_advances_to_next_row() {
    let mut channel = DummyActuatorChannel::new();
    let mut table = PoseTable::try_new(
        4,
        vec![vec![1200, 0, 1200, 1200], vec![1500, 1500, 1500, 1500]],
    )
    .unwrap();

    let mut s = sequencer(&mut channel, plain_config(), WaitBudget::Unbounded);
    let report = s.play_table(&mut table).unwrap();
    drop(s);

    assert_eq!(report.skipped, 1);
    assert_eq!(report.converged, 1);
    assert_eq!(
        channel.goal_writes(),
        JOINTS.iter().map(|&j| (j, 1500)).collect::<Vec<_>>()
    );
}

#[test]
fn out_of_range_is_clamped_before_dispatch() {
    let mut channel = DummyActuatorChannel::new();
    let mut table = PoseTable::try_new(4, vec![vec![4000, 1200, 1200, 1200]]).unwrap();

    let mut s = sequencer(&mut channel, mirrored_config(), WaitBudget::Unbounded);
    s.play_table(&mut table).unwrap();
    drop(s);

    assert_eq!(
        channel.goal_writes(),
        vec![
            (JointId(1), 3400),
            (JointId(2), 3424),
            (JointId(3), 1200),
            (JointId(4), 1200)
        ]
    );
    assert_eq!(table.rows()[0].as_slice(), &[3400, 1200, 1200, 1200]);
}

#[test]
fn replaying_the_table_sends_the_same_goals() {
    let mut channel = DummyActuatorChannel::new();
    let mut table = PoseTable::try_new(4, vec![vec![4000, 1200, 900, 1200]]).unwrap();

    let mut s = sequencer(&mut channel, mirrored_config(), WaitBudget::Unbounded);
    s.play_table(&mut table).unwrap();
    s.play_table(&mut table).unwrap();
    drop(s);

    let writes = channel.goal_writes();
    assert_eq!(writes.len(), 8);
    assert_eq!(writes[..4], writes[4..]);
}

#[test]
fn goal_fault_does_not_stop_other_joints() {
    let mut channel = DummyActuatorChannel::new();
    channel.fail_goal_writes(JointId(2), CommFault::RxTimeout.into());
    let mut table = PoseTable::try_new(4, vec![vec![1500; 4]]).unwrap();

    let mut s = sequencer(
        &mut channel,
        plain_config(),
        WaitBudget::Bounded(Duration::ZERO),
    );
    let report = s.play_table(&mut table).unwrap();
    drop(s);

    assert_eq!(channel.goal_writes().len(), 4);
    assert_eq!(
        report.faults,
        vec![(
            JointId(2),
            ChannelFault::Communication(CommFault::RxTimeout)
        )]
    );
    // Joint 2 never moved, so the row times out instead of hanging.
    assert_eq!(report.dispatched, 1);
    assert_eq!(report.timed_out, 1);
    assert_eq!(report.converged, 0);
}

#[test]
fn timeout_moves_on_to_next_row() {
    let mut channel = DummyActuatorChannel::new();
    channel.push_readings(JointId(4), (0..1000).map(|_| Ok(0)));
    let mut table = PoseTable::try_new(4, vec![vec![1500; 4], vec![2000; 4]]).unwrap();

    let mut s = sequencer(
        &mut channel,
        plain_config(),
        WaitBudget::Bounded(Duration::from_millis(5)),
    );
    let report = s.play_table(&mut table).unwrap();
    drop(s);

    assert_eq!(report.dispatched, 2);
    assert_eq!(report.timed_out + report.converged, 2);
    assert!(report.timed_out >= 1);
    assert_eq!(channel.goal_writes().len(), 8);
}

#[test]
fn run_plays_until_quit_then_tears_down() {
    let mut channel = DummyActuatorChannel::new();
    let mut table = PoseTable::try_new(4, vec![vec![1500; 4], vec![1600; 4]]).unwrap();
    let mut gate = ScriptedGate::cycles(2);

    let s = sequencer(&mut channel, plain_config(), WaitBudget::Unbounded);
    let report = s.run(&mut table, &mut gate).unwrap();

    assert_eq!(report.batches, 2);
    assert_eq!(report.converged, 4);
    assert_eq!(channel.goal_writes().len(), 16);
    assert_eq!(
        channel.calls[..4],
        JOINTS.map(|j| ChannelCall::SetTorqueEnabled(j, true))
    );
    let n = channel.calls.len();
    assert_eq!(
        channel.calls[n - 5..n - 1],
        JOINTS.map(|j| ChannelCall::SetTorqueEnabled(j, false))
    );
    assert_eq!(channel.calls[n - 1], ChannelCall::Close);
    assert!(channel.is_closed());
}

#[test]
fn quit_before_first_batch() {
    let mut channel = DummyActuatorChannel::new();
    let mut table = PoseTable::try_new(4, vec![vec![1500; 4]]).unwrap();
    let mut gate = ScriptedGate::new([GateSignal::Quit]);

    let s = sequencer(&mut channel, plain_config(), WaitBudget::Unbounded);
    let report = s.run(&mut table, &mut gate).unwrap();

    assert_eq!(report.batches, 0);
    assert!(channel.goal_writes().is_empty());
    assert_eq!(channel.count_calls(|c| *c == ChannelCall::Close), 1);
}

#[test]
fn torque_faults_are_not_fatal() {
    let mut channel = DummyActuatorChannel::new();
    let fault = ChannelFault::Device {
        code: 0x07,
        reason: "access error".to_owned(),
    };
    channel.fail_torque_writes(JointId(3), fault.clone());
    let mut table = PoseTable::try_new(4, vec![vec![1500; 4]]).unwrap();

    let s = sequencer(&mut channel, plain_config(), WaitBudget::Unbounded);
    let report = s.run(&mut table, &mut ScriptedGate::cycles(1)).unwrap();

    assert_eq!(report.faults, vec![(JointId(3), fault)]);
    assert_eq!(report.converged, 1);
    assert!(channel.is_closed());
}

#[derive(Debug)]
struct BrokenGate;

impl OperatorGate for BrokenGate {
    fn wait_for_signal(&mut self) -> Result<GateSignal, Error> {
        Err(Error::Gate {
            message: "stdin closed".to_owned(),
        })
    }
}

#[test]
fn gate_failure_still_tears_down() {
    let mut channel = DummyActuatorChannel::new();
    let mut table = PoseTable::try_new(4, vec![vec![1500; 4]]).unwrap();

    let s = sequencer(&mut channel, plain_config(), WaitBudget::Unbounded);
    let report = s.run(&mut table, &mut BrokenGate).unwrap();

    assert_eq!(report.batches, 0);
    assert!(channel.is_closed());
    assert!(!channel.is_torque_enabled(JointId(1)));
}

#[test]
fn width_mismatch_fails_before_any_motion() {
    let mut channel = DummyActuatorChannel::new();
    let mut table = PoseTable::try_new(3, vec![vec![1500; 3]]).unwrap();

    let s = sequencer(&mut channel, plain_config(), WaitBudget::Unbounded);
    let e = s.run(&mut table, &mut ScriptedGate::cycles(1)).unwrap_err();

    assert!(
        matches!(e, Error::LengthMismatch { model: 4, input: 3 }),
        "{e:?}"
    );
    assert!(channel.goal_writes().is_empty());
    assert!(channel.is_closed());
}

#[test]
fn teardown_runs_once() {
    let mut channel = DummyActuatorChannel::new();
    let mut s = sequencer(&mut channel, plain_config(), WaitBudget::Unbounded);
    s.teardown();
    s.teardown();
    drop(s);
    assert_eq!(channel.count_calls(|c| *c == ChannelCall::Close), 1);
    assert_eq!(
        channel.count_calls(|c| matches!(c, ChannelCall::SetTorqueEnabled(_, false))),
        4
    );
}
