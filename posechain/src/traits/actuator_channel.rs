use auto_impl::auto_impl;

use crate::{
    error::ChannelFault,
    types::{JointId, PositionCount},
};

/// Request/response access to the actuators sharing one bus.
///
/// Every call is one blocking round-trip. Implementations never retry; a
/// failed transaction is returned as a [`ChannelFault`] and the caller
/// decides what to do with it.
#[auto_impl(&mut, Box)]
pub trait ActuatorChannel {
    /// Enables or disables holding torque.
    fn set_torque_enabled(&mut self, joint: JointId, enabled: bool) -> Result<(), ChannelFault>;

    /// Writes the goal position register.
    fn set_goal_position(
        &mut self,
        joint: JointId,
        position: PositionCount,
    ) -> Result<(), ChannelFault>;

    /// Reads the present position register.
    fn present_position(&mut self, joint: JointId) -> Result<PositionCount, ChannelFault>;

    /// Releases the underlying link. Later calls fail with
    /// [`CommFault::PortClosed`](crate::CommFault::PortClosed).
    fn close(&mut self);
}
