//! Tag suggestions from an external scoring service, checked against the tags already in
//! effect before anything is offered or stored.

use crate::{
	directory::{DirectoryReader, ImageFile},
	error::{Error, ErrorList},
	store::{FileId, FileTag, FileTagAddedBy, LibraryStore, TagId},
	tag::{Tag, TagReader},
};

use std::{
	collections::{BTreeMap, HashSet},
	fmt,
	path::PathBuf,
	sync::Arc,
};

use async_trait::async_trait;
use futures::TryFutureExt;
use futures_concurrency::future::TryJoin;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TagScore {
	pub tag_id: TagId,
	pub score: f64,
}

/// Scores for one image, in the order the service ranked them.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTagScores {
	pub scores: Vec<TagScore>,
}

#[derive(Error, Debug)]
pub enum OracleError {
	#[error("tag suggestion service is unavailable: {0}")]
	Unavailable(String),
	#[error("tag suggestion service rejected the request: {0}")]
	Rejected(String),
}

/// The scoring service. Implementations answer with one [`ImageTagScores`] per path, in
/// request order.
#[async_trait]
pub trait TagSuggestionOracle: Send + Sync + fmt::Debug + 'static {
	async fn suggest(&self, image_paths: &[PathBuf]) -> Result<Vec<ImageTagScores>, OracleError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TagSuggestion {
	pub tag_id: TagId,
	pub score: f64,
	pub has_tag: bool,
	pub has_descendant_tag: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SuggestTagsResponse {
	pub image_files: Vec<ImageFile>,
	pub suggestions: BTreeMap<FileId, Vec<TagSuggestion>>,
	pub all_tags: BTreeMap<TagId, Tag>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
	/// Associations written, all added by [`FileTagAddedBy::Suggestion`].
	pub inserted: Vec<FileTag>,
	/// Selected tags that were already in effect, directly, inherited or through a more
	/// specific tag.
	pub duplicated_tags: BTreeMap<FileId, Vec<TagId>>,
}

#[derive(Debug, Clone)]
pub struct SuggestionService {
	store: Arc<dyn LibraryStore>,
	directory_reader: DirectoryReader,
	tag_reader: TagReader,
	oracle: Arc<dyn TagSuggestionOracle>,
}

impl SuggestionService {
	pub fn new(
		store: Arc<dyn LibraryStore>,
		directory_reader: DirectoryReader,
		tag_reader: TagReader,
		oracle: Arc<dyn TagSuggestionOracle>,
	) -> Self {
		Self {
			store,
			directory_reader,
			tag_reader,
			oracle,
		}
	}

	/// Asks the oracle about the images and flags every suggestion already in effect.
	///
	/// The oracle call and the checker construction run concurrently.
	#[instrument(skip(self), err)]
	pub async fn suggest_tags(&self, file_ids: &[FileId]) -> Result<SuggestTagsResponse, Error> {
		if file_ids.is_empty() {
			return Err(Error::InvalidArgument(
				"at least one image is required to suggest tags".to_string(),
			));
		}

		let image_files = self.directory_reader.read_images_by_ids(file_ids).await?;
		if image_files.is_empty() {
			return Err(Error::ImageFileNotFound(file_ids.to_vec()));
		}

		let image_ids = image_files.iter().map(|image| image.id).collect::<Vec<_>>();
		let image_paths = image_files
			.iter()
			.map(|image| image.path.clone())
			.collect::<Vec<_>>();

		let (scores, checker) = (
			self.oracle.suggest(&image_paths).map_err(Error::from),
			self.tag_reader.create_batch_tag_checker(&image_ids),
		)
			.try_join()
			.await?;

		if scores.len() != image_files.len() {
			warn!(
				requested = image_files.len(),
				received = scores.len(),
				"Tag suggestion service answered for a different number of images"
			);
			return Ok(SuggestTagsResponse::default());
		}
		debug!(images_count = image_files.len(), "Received tag suggestions");

		let tags = checker.tags();
		let suggestions = image_ids
			.iter()
			.zip(scores)
			.map(|(&image_id, image_scores)| {
				let suggestions = image_scores
					.scores
					.into_iter()
					.filter(|score| {
						let known = tags.contains(score.tag_id);
						if !known {
							warn!(tag_id = score.tag_id, "Suggested tag was not found");
						}
						known
					})
					.map(|score| TagSuggestion {
						tag_id: score.tag_id,
						score: score.score,
						has_tag: checker.has_tag(image_id, score.tag_id),
						has_descendant_tag: checker.has_descendant_tag(image_id, score.tag_id),
					})
					.collect::<Vec<_>>();

				(image_id, suggestions)
			})
			.collect();

		Ok(SuggestTagsResponse {
			all_tags: tags.iter().map(|tag| (tag.id, tag.clone())).collect(),
			image_files,
			suggestions,
		})
	}

	/// Stores the tags picked from the suggestions, skipping the ones already in effect.
	///
	/// Unknown images and tags are all reported together and nothing is written then.
	#[instrument(skip(self), err)]
	pub async fn add_suggested_tags(
		&self,
		selected_tags: &BTreeMap<FileId, Vec<TagId>>,
	) -> Result<ReconcileOutcome, Error> {
		let file_ids = selected_tags.keys().copied().collect::<Vec<_>>();
		let (directories, checker) = self.tag_reader.read_batch_tag_checker(&file_ids).await?;

		let mut errors = ErrorList::new();
		for (&file_id, tag_ids) in selected_tags {
			if directories.image(file_id).is_none() {
				errors.push(Error::ImageFileNotFound(vec![file_id]));
			}
			for &tag_id in tag_ids {
				if !checker.tags().contains(tag_id) {
					errors.push(Error::TagNotFound(tag_id));
				}
			}
		}
		errors.into_result(())?;

		let mut outcome = ReconcileOutcome::default();
		for (&file_id, tag_ids) in selected_tags {
			let mut seen = HashSet::with_capacity(tag_ids.len());
			for &tag_id in tag_ids {
				if !seen.insert(tag_id) {
					continue;
				}

				let duplicated =
					checker.has_tag(file_id, tag_id) || checker.has_descendant_tag(file_id, tag_id);
				if duplicated {
					outcome
						.duplicated_tags
						.entry(file_id)
						.or_default()
						.push(tag_id);
				} else {
					outcome.inserted.push(FileTag::new(
						file_id,
						tag_id,
						FileTagAddedBy::Suggestion,
					));
				}
			}
		}

		if outcome.inserted.is_empty() {
			debug!("Every selected tag is already in effect");
		} else {
			self.store.insert_file_tags(outcome.inserted.clone()).await?;
		}

		Ok(outcome)
	}
}
