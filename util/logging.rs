/*!
Logging setup for the `gbeval` binaries. Library crates only emit `tracing` events; installing a subscriber is left to the binary.
*/

use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

#[derive(Debug, Error)]
pub enum LoggingError {
	#[error("failed to install global tracing subscriber: {0}")]
	SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install a subscriber that writes to stderr. `RUST_LOG` takes precedence over the default level, which is `debug` when `verbose` is set and `info` otherwise.
pub fn init(verbose: bool) -> Result<(), LoggingError> {
	let default_level = if verbose { "debug" } else { "info" };
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
	let stderr_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
	let subscriber = Registry::default().with(env_filter).with(stderr_layer);
	tracing::subscriber::set_global_default(subscriber)?;
	Ok(())
}
