//! Shared fixtures for the integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::{
	path::{Path, PathBuf},
	sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tagshelf_core::{
	Environment, ImageTagScores, Library, LibraryConfig, LibraryStore,
	MemoryStore, MemoryStoreBuilder, OracleError, TagScore, TagSuggestionOracle,
};

pub const IMAGE_ROOT: &str = "/library";

pub const D1: u64 = 1;
pub const F1: u64 = 2;
pub const F2: u64 = 3;
pub const D2: u64 = 4;
pub const F3: u64 = 5;
pub const F4: u64 = 6;

pub const TAG1: u64 = 1;
pub const TAG10: u64 = 10;
pub const OTHER: u64 = 20;

/// ```text
/// D1/
///   D2/
///     F3.jpg
///   F1.jpg
///   F2.jpg
/// F4.jpg
/// ```
/// with tags `tag1 > tag10` and `other`, and no associations.
pub fn fixture() -> MemoryStoreBuilder {
	MemoryStore::builder()
		.directory(D1, 0, "D1")
		.image(F1, D1, "F1.jpg")
		.image(F2, D1, "F2.jpg")
		.directory(D2, D1, "D2")
		.image(F3, D2, "F3.jpg")
		.image(F4, 0, "F4.jpg")
		.tag(TAG1, 0, "tag1")
		.tag(TAG10, TAG1, "tag10")
		.tag(OTHER, 0, "other")
}

pub fn config() -> LibraryConfig {
	LibraryConfig {
		image_root_directory: PathBuf::from(IMAGE_ROOT),
		config_directory: PathBuf::from("/config"),
		log_directory: PathBuf::from("/logs"),
		environment: Environment::Development,
	}
}

pub fn library(store: &Arc<MemoryStore>) -> Library {
	Library::new(config(), Arc::clone(store) as Arc<dyn LibraryStore>)
}

pub fn image_path(relative_path: impl AsRef<Path>) -> PathBuf {
	Path::new(IMAGE_ROOT).join(relative_path)
}

/// Answers every request with the same scores and remembers the paths it was asked about.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
	answer: Option<Vec<ImageTagScores>>,
	requests: Mutex<Vec<Vec<PathBuf>>>,
}

impl ScriptedOracle {
	pub fn answering(answer: Vec<Vec<(u64, f64)>>) -> Self {
		Self {
			answer: Some(
				answer
					.into_iter()
					.map(|scores| ImageTagScores {
						scores: scores
							.into_iter()
							.map(|(tag_id, score)| TagScore { tag_id, score })
							.collect(),
					})
					.collect(),
			),
			requests: Mutex::default(),
		}
	}

	pub fn unavailable() -> Self {
		Self::default()
	}

	pub fn requests(&self) -> Vec<Vec<PathBuf>> {
		self.requests.lock().unwrap().clone()
	}
}

#[async_trait]
impl TagSuggestionOracle for ScriptedOracle {
	async fn suggest(&self, image_paths: &[PathBuf]) -> Result<Vec<ImageTagScores>, OracleError> {
		self.requests.lock().unwrap().push(image_paths.to_vec());
		self.answer
			.clone()
			.ok_or_else(|| OracleError::Unavailable("scripted outage".to_string()))
	}
}
