mod error;
mod player_config;
mod pose_source;
pub mod utils;

pub use error::*;
pub use player_config::*;
pub use pose_source::*;
