use auto_impl::auto_impl;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateSignal {
    /// Play the pose table once more.
    Advance,
    /// Stop and tear the session down.
    Quit,
}

/// Human-in-the-loop pacing between pose batches.
#[auto_impl(&mut, Box)]
pub trait OperatorGate {
    /// Blocks until the operator asks to advance or to quit.
    fn wait_for_signal(&mut self) -> Result<GateSignal, Error>;
}
