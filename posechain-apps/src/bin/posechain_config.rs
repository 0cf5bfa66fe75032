use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use posechain_apps::{utils, PlayerConfig};
use schemars::schema_for;
use tracing::{debug, info, warn};

#[derive(Debug, Parser)]
#[clap(name = env!("CARGO_BIN_NAME"))]
struct Args {
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(Debug, clap::Subcommand)]
enum Subcommand {
    /// Generate JSON schema for the specified config file.
    Schema {
        /// Kind of config file.
        #[clap(value_enum, ignore_case = true)]
        kind: ConfigKind,
    },
    /// Ping every configured joint and print its model number.
    Ping {
        /// Path to the setting file.
        #[clap(short, long, value_parser, env = "POSECHAIN_CONFIG_PATH")]
        config_path: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConfigKind {
    PlayerConfig,
    PoseFile,
}

fn main() -> Result<()> {
    utils::init_tracing();
    let args = Args::parse();
    debug!(?args);

    match args.subcommand {
        Subcommand::Schema { kind } => {
            let schema = match kind {
                ConfigKind::PlayerConfig => schema_for!(posechain_apps::PlayerConfig),
                ConfigKind::PoseFile => schema_for!(posechain_apps::PoseFile),
            };
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Subcommand::Ping { config_path } => {
            let config = match config_path {
                Some(path) => PlayerConfig::try_new(path)?,
                None => PlayerConfig::default(),
            };
            let mut channel = config.create_channel()?;
            for joint in &config.joints {
                match channel.ping(joint.id.0) {
                    Ok(model) => info!("[{}] ping succeeded, model number: {model}", joint.id),
                    Err(fault) => warn!(
                        "{}",
                        posechain::Error::Channel {
                            joint: joint.id,
                            fault
                        }
                    ),
                }
            }
        }
    }
    Ok(())
}
