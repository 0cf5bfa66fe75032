use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use posechain::{OperatorGate, ScriptedGate, Sequencer};
use posechain_apps::{load_pose_table, utils, Error, PlayerConfig};
use tracing::{error, info};

/// Plays recorded poses on a chain of Dynamixel servos.
#[derive(Parser, Debug)]
#[clap(name = env!("CARGO_BIN_NAME"))]
struct PosePlayerArgs {
    /// Path to the setting file.
    #[clap(short, long, value_parser, env = "POSECHAIN_CONFIG_PATH")]
    config_path: Option<PathBuf>,
    /// Pose file to play. Takes priority over `pose_file` in the setting file.
    #[clap(short, long, value_parser)]
    pose_file: Option<PathBuf>,
    /// Play the table this many times, then quit, without waiting for keys.
    #[clap(long)]
    cycles: Option<usize>,
    /// Prints the default setting as TOML.
    #[clap(long)]
    show_default_config: bool,
}

fn main() -> Result<()> {
    utils::init_tracing();
    let args = PosePlayerArgs::parse();
    info!("ParsedArgs {:?}", args);

    if args.show_default_config {
        print!("{}", toml::to_string(&PlayerConfig::default())?);
        return Ok(());
    }

    let config = match args.config_path {
        Some(path) => PlayerConfig::try_new(path)?,
        None => PlayerConfig::default(),
    };
    let pose_file = args
        .pose_file
        .or_else(|| config.pose_file.clone())
        .ok_or(Error::NoPoseFile)?;
    let mut table = load_pose_table(&pose_file, &config)?;
    info!("loaded {} poses from {:?}", table.len(), pose_file);

    let channel = match config.create_channel() {
        Ok(channel) => channel,
        Err(e) => {
            error!("{e}");
            return Err(e.into());
        }
    };
    let mut sequencer = Sequencer::new(channel, config.sequencer_config());
    sequencer.set_complete_condition(Box::new(config.complete_condition()));

    let mut gate = create_gate(args.cycles);
    let report = sequencer.run(&mut table, gate.as_mut())?;
    info!(
        "finished: {} batches, {} dispatched, {} skipped, {} converged, {} timed out",
        report.batches, report.dispatched, report.skipped, report.converged, report.timed_out
    );
    for (joint, fault) in &report.faults {
        info!("[{joint}] {fault}");
    }
    Ok(())
}

fn create_gate(cycles: Option<usize>) -> Box<dyn OperatorGate> {
    match cycles {
        Some(cycles) => Box::new(ScriptedGate::cycles(cycles)),
        #[cfg(unix)]
        None => Box::new(posechain_keyboard::KeyboardGate::new()),
        #[cfg(not(unix))]
        None => Box::new(ScriptedGate::cycles(1)),
    }
}
