mod actuator_channel;
mod operator_gate;

pub use actuator_channel::*;
pub use operator_gate::*;
