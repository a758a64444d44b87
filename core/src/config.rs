use crate::error::FileIOError;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

const APP_DIRECTORY_NAME: &str = "tagshelf";
const CONFIG_FILE_NAME: &str = "default.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("failed to parse config file: <path='{}'>: {source}", .path.display())]
	Toml {
		path: Box<Path>,
		#[source]
		source: toml::de::Error,
	},
	#[error("could not determine the {0} directory")]
	Dirs(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
	Production,
	Development,
}

impl Default for Environment {
	fn default() -> Self {
		if cfg!(debug_assertions) {
			Self::Development
		} else {
			Self::Production
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
	/// Directory every library path is relative to.
	pub image_root_directory: PathBuf,
	pub config_directory: PathBuf,
	pub log_directory: PathBuf,
	#[serde(default)]
	pub environment: Environment,
}

impl LibraryConfig {
	/// Pictures under the home directory, config under the platform config directory and
	/// logs in the temporary directory.
	pub fn defaults() -> Result<Self, ConfigError> {
		let home_directory = dirs::home_dir().ok_or(ConfigError::Dirs("home"))?;
		let config_directory = dirs::config_dir()
			.ok_or(ConfigError::Dirs("config"))?
			.join(APP_DIRECTORY_NAME);

		Ok(Self {
			image_root_directory: home_directory.join("Pictures").join(APP_DIRECTORY_NAME),
			config_directory,
			log_directory: std::env::temp_dir().join(APP_DIRECTORY_NAME).join("logs"),
			environment: Environment::default(),
		})
	}

	pub async fn load(path: impl AsRef<Path> + Send) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let contents = fs::read_to_string(path)
			.await
			.map_err(|e| FileIOError::from_std_io_err_with_msg(path, e, "read config file"))?;

		toml::from_str(&contents).map_err(|source| ConfigError::Toml {
			path: path.into(),
			source,
		})
	}

	/// Loads `default.toml` from the platform config directory, falling back to
	/// [`LibraryConfig::defaults`] when there is no such file.
	pub async fn load_or_default() -> Result<Self, ConfigError> {
		let defaults = Self::defaults()?;
		fs::create_dir_all(&defaults.config_directory)
			.await
			.map_err(|e| FileIOError::from((&defaults.config_directory, e)))?;

		let path = defaults.config_file_path();
		match fs::try_exists(&path).await {
			Ok(true) => Self::load(path).await,
			Ok(false) => {
				debug!(path = %path.display(), "No config file, using defaults");
				Ok(defaults)
			}
			Err(e) => Err(FileIOError::from((path, e)).into()),
		}
	}

	#[must_use]
	pub fn config_file_path(&self) -> PathBuf {
		self.config_directory.join(CONFIG_FILE_NAME)
	}

	#[must_use]
	pub fn is_development(&self) -> bool {
		self.environment == Environment::Development
	}
}
