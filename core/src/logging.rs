use crate::{
	config::{ConfigError, Environment, LibraryConfig},
	error::{Error, FileIOError},
};

use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
	filter::{Directive, LevelFilter},
	fmt,
	prelude::*,
	EnvFilter,
};

const LOG_FILE_PREFIX: &str = "tagshelf.log";

/// Installs the global subscriber: console output plus a daily rolling file under the
/// configured log directory.
///
/// The library itself never calls this; without a subscriber every event is dropped.
/// Keep the returned guard alive for as long as file logging is wanted.
pub fn init(config: &LibraryConfig) -> Result<WorkerGuard, Error> {
	std::fs::create_dir_all(&config.log_directory)
		.map_err(|e| ConfigError::from(FileIOError::from((&config.log_directory, e))))?;

	let (non_blocking, guard) =
		tracing_appender::non_blocking(rolling::daily(&config.log_directory, LOG_FILE_PREFIX));

	let env_filter = directives(config.environment)?
		.into_iter()
		.fold(EnvFilter::from_default_env(), EnvFilter::add_directive);

	tracing_subscriber::registry()
		.with(env_filter)
		.with(fmt::layer().with_filter(console_level(config.environment)))
		.with(
			fmt::layer()
				.with_writer(non_blocking)
				.with_ansi(false)
				.with_filter(LevelFilter::DEBUG),
		)
		.try_init()
		.map_err(|e| Error::AlreadyExists(format!("global tracing subscriber: {e}")))?;

	Ok(guard)
}

fn directives(environment: Environment) -> Result<Vec<Directive>, Error> {
	let crate_level = match environment {
		Environment::Development => "debug",
		Environment::Production => "info",
	};

	["warn".to_string(), format!("tagshelf_core={crate_level}")]
		.iter()
		.map(|directive| {
			directive.parse().map_err(|e| {
				Error::InvalidArgument(format!("tracing directive '{directive}': {e}"))
			})
		})
		.collect()
}

const fn console_level(environment: Environment) -> LevelFilter {
	match environment {
		Environment::Development => LevelFilter::DEBUG,
		Environment::Production => LevelFilter::INFO,
	}
}
