mod dummy_actuator_channel;
mod scripted_gate;

pub use dummy_actuator_channel::*;
pub use scripted_gate::*;
