//! Directory and tag hierarchy resolution for a personal media library.
//!
//! Files live in a directory tree and are classified by an independent tag forest. A tag
//! on a directory applies to everything below it, and searching for a tag also finds the
//! files carrying any tag below it. Every query rebuilds both trees from a fresh snapshot
//! of the [`LibraryStore`], so nothing is shared between requests.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tagshelf_core::{Library, LibraryConfig, MemoryStore, SearchRequest};
//!
//! # async fn run() -> Result<(), tagshelf_core::Error> {
//! let config = LibraryConfig::load_or_default().await?;
//! let library = Library::new(config, Arc::new(MemoryStore::default()));
//!
//! let result = library.search().search(SearchRequest::tag(1)).await?;
//! for image in result.images {
//!     println!("{}", image.path.display());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

use std::sync::Arc;

pub mod config;
pub mod directory;
pub mod error;
pub mod export;
pub mod logging;
pub mod search;
pub mod store;
pub mod suggestion;
pub mod tag;

mod tree;

pub use config::{ConfigError, Environment, LibraryConfig};
pub use directory::{Directory, DirectoryReader, DirectoryTree, FileNode, ImageFile};
pub use error::{Error, ErrorKind, ErrorList, FileIOError};
pub use export::{
	DatasetEntry, DatasetMetadata, DatasetOptions, DatasetPlan, DatasetPlanner, DatasetSplit,
};
pub use search::{SearchRequest, SearchResult, SearchRunner};
pub use store::{
	FileId, FileKind, FileRecord, FileTag, FileTagAddedBy, LibraryStore, MemoryStore,
	MemoryStoreBuilder, StoreError, TagId, TagRecord, TagType, ROOT_DIRECTORY_ID, ROOT_TAG_ID,
};
pub use suggestion::{
	ImageTagScores, OracleError, ReconcileOutcome, SuggestTagsResponse, SuggestionService,
	TagScore, TagSuggestion, TagSuggestionOracle,
};
pub use tag::{BatchImageTagChecker, FileTagsSummary, ImageTagChecker, Tag, TagReader, TagTree};

/// Every reader and service of a library, wired to one store.
#[derive(Debug, Clone)]
pub struct Library {
	config: LibraryConfig,
	store: Arc<dyn LibraryStore>,
	directory_reader: DirectoryReader,
	tag_reader: TagReader,
	search_runner: SearchRunner,
	dataset_planner: DatasetPlanner,
	suggestion_service: Option<SuggestionService>,
}

impl Library {
	pub fn new(config: LibraryConfig, store: Arc<dyn LibraryStore>) -> Self {
		let directory_reader =
			DirectoryReader::new(Arc::clone(&store), config.image_root_directory.clone());
		let tag_reader = TagReader::new(Arc::clone(&store), directory_reader.clone());

		Self {
			search_runner: SearchRunner::new(directory_reader.clone(), tag_reader.clone()),
			dataset_planner: DatasetPlanner::new(directory_reader.clone(), tag_reader.clone()),
			suggestion_service: None,
			config,
			store,
			directory_reader,
			tag_reader,
		}
	}

	/// Enables tag suggestions backed by `oracle`.
	#[must_use]
	pub fn with_oracle(mut self, oracle: Arc<dyn TagSuggestionOracle>) -> Self {
		self.suggestion_service = Some(SuggestionService::new(
			Arc::clone(&self.store),
			self.directory_reader.clone(),
			self.tag_reader.clone(),
			oracle,
		));
		self
	}

	#[must_use]
	pub const fn config(&self) -> &LibraryConfig {
		&self.config
	}

	#[must_use]
	pub const fn directories(&self) -> &DirectoryReader {
		&self.directory_reader
	}

	#[must_use]
	pub const fn tags(&self) -> &TagReader {
		&self.tag_reader
	}

	#[must_use]
	pub const fn search(&self) -> &SearchRunner {
		&self.search_runner
	}

	#[must_use]
	pub const fn datasets(&self) -> &DatasetPlanner {
		&self.dataset_planner
	}

	/// Fails with [`Error::InvalidArgument`] when the library was built without an oracle.
	pub fn suggestions(&self) -> Result<&SuggestionService, Error> {
		self.suggestion_service.as_ref().ok_or_else(|| {
			Error::InvalidArgument("tag suggestions need a suggestion service".to_string())
		})
	}
}
