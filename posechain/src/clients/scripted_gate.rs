use std::collections::VecDeque;

use crate::{
    error::Error,
    traits::{GateSignal, OperatorGate},
};

/// Replays a fixed list of signals, then quits.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGate {
    signals: VecDeque<GateSignal>,
}

impl ScriptedGate {
    pub fn new(signals: impl IntoIterator<Item = GateSignal>) -> Self {
        Self {
            signals: signals.into_iter().collect(),
        }
    }

    /// Advances `cycles` times.
    pub fn cycles(cycles: usize) -> Self {
        Self::new(std::iter::repeat(GateSignal::Advance).take(cycles))
    }

    pub fn remaining(&self) -> usize {
        self.signals.len()
    }
}

impl OperatorGate for ScriptedGate {
    fn wait_for_signal(&mut self) -> Result<GateSignal, Error> {
        Ok(self.signals.pop_front().unwrap_or(GateSignal::Quit))
    }
}
