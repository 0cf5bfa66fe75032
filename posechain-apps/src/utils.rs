use tracing_subscriber::EnvFilter;

/// Env var read when `--config-path` is not given.
pub const POSECHAIN_CONFIG_ENV_NAME: &str = "POSECHAIN_CONFIG_PATH";

/// Installs the global subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
