#![doc = "[`posechain::ActuatorChannel`] implementation for Dynamixel Protocol 2.0 servos."]
#![warn(rust_2018_idioms)]

mod channel;
mod config;
pub mod packet;

pub use crate::{channel::*, config::*};
