#![doc = "Pose sequencing for chains of bus servos."]

mod clamp;
mod clients;
mod error;
mod sequencer;
mod traits;
mod types;
mod units;
mod waits;

pub use clamp::*;
pub use clients::*;
pub use error::*;
pub use sequencer::*;
pub use traits::*;
pub use types::*;
pub use units::*;
pub use waits::*;
