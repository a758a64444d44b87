//! Finds the images carrying a tag, optionally within a single directory.

use crate::{
	directory::{DirectoryReader, FileNode, ImageFile},
	error::Error,
	store::{FileId, TagId, ROOT_DIRECTORY_ID, ROOT_TAG_ID},
	tag::{BatchImageTagChecker, TagReader},
};

use std::{
	collections::{BTreeMap, BTreeSet},
	sync::Arc,
};

use futures_concurrency::future::TryJoin;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
	/// `Some(0)` means no tag.
	pub tag_id: Option<TagId>,
	/// `Some(0)` means the whole library, same as `None`.
	pub directory_id: Option<FileId>,
	/// Images of the directory that do not carry the tag. Ignored without a tag.
	pub invert: bool,
}

impl SearchRequest {
	#[must_use]
	pub const fn tag(tag_id: TagId) -> Self {
		Self {
			tag_id: Some(tag_id),
			directory_id: None,
			invert: false,
		}
	}

	#[must_use]
	pub const fn directory(directory_id: FileId) -> Self {
		Self {
			tag_id: None,
			directory_id: Some(directory_id),
			invert: false,
		}
	}

	#[must_use]
	pub const fn in_directory(mut self, directory_id: FileId) -> Self {
		self.directory_id = Some(directory_id);
		self
	}

	#[must_use]
	pub const fn inverted(mut self) -> Self {
		self.invert = true;
		self
	}

	fn scope(&self) -> Option<FileId> {
		self.directory_id
			.filter(|&directory_id| directory_id != ROOT_DIRECTORY_ID)
	}

	fn tag_filter(&self) -> Option<TagId> {
		self.tag_id.filter(|&tag_id| tag_id != ROOT_TAG_ID)
	}
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
	/// Ordered by relative path, then id.
	pub images: Vec<ImageFile>,
	/// Tag id to the matched images it contributed, each listed once.
	pub tagged_images: BTreeMap<TagId, Vec<FileId>>,
}

/// Collects matches without counting an image or a tag grouping twice.
#[derive(Default)]
struct Matches<'tree> {
	images: BTreeMap<FileId, &'tree ImageFile>,
	tagged_images: BTreeMap<TagId, BTreeSet<FileId>>,
}

impl<'tree> Matches<'tree> {
	fn add(&mut self, image: &'tree ImageFile, tag_id: Option<TagId>) {
		self.images.entry(image.id).or_insert(image);
		if let Some(tag_id) = tag_id {
			self.tagged_images.entry(tag_id).or_default().insert(image.id);
		}
	}

	fn into_result(self) -> SearchResult {
		let mut images = self.images.into_values().cloned().collect::<Vec<_>>();
		images.sort_by(|a, b| {
			a.relative_path
				.cmp(&b.relative_path)
				.then_with(|| a.id.cmp(&b.id))
		});

		SearchResult {
			images,
			tagged_images: self
				.tagged_images
				.into_iter()
				.map(|(tag_id, file_ids)| (tag_id, file_ids.into_iter().collect()))
				.collect(),
		}
	}
}

#[derive(Debug, Clone)]
pub struct SearchRunner {
	directory_reader: DirectoryReader,
	tag_reader: TagReader,
}

impl SearchRunner {
	pub const fn new(directory_reader: DirectoryReader, tag_reader: TagReader) -> Self {
		Self {
			directory_reader,
			tag_reader,
		}
	}

	#[instrument(skip(self), err)]
	pub async fn search(&self, request: SearchRequest) -> Result<SearchResult, Error> {
		match (request.tag_filter(), request.scope()) {
			(None, None) => Err(Error::InvalidArgument(
				"a tag or a directory is required to search images".to_string(),
			)),
			(_, None) if request.invert => Err(Error::InvalidArgument(
				"an inverted search needs a directory".to_string(),
			)),
			(None, Some(directory_id)) => self.search_directory(directory_id).await,
			(Some(tag_id), None) => self.search_library(tag_id).await,
			(Some(tag_id), Some(directory_id)) => {
				self.search_in_directory(tag_id, directory_id, request.invert)
					.await
			}
		}
	}

	async fn search_directory(&self, directory_id: FileId) -> Result<SearchResult, Error> {
		let directories = self.directory_reader.read_directory_tree().await?;
		if directories.directory(directory_id).is_none() {
			return Err(Error::DirectoryNotFound(directory_id));
		}

		let mut matches = Matches::default();
		for image in directories.child_images(directory_id) {
			matches.add(image, None);
		}

		Ok(matches.into_result())
	}

	/// Images tagged with the tag or any tag below it, plus every image below a directory
	/// tagged the same way.
	///
	/// No matching association is an empty result, even for a library without files.
	async fn search_library(&self, tag_id: TagId) -> Result<SearchResult, Error> {
		let tags = self.tag_reader.read_all_tags().await?;
		let file_tags = self.tag_reader.file_tags_in_subtree(&tags, tag_id).await?;
		if file_tags.is_empty() {
			debug!(%tag_id, "No file carries the tag");
			return Ok(SearchResult::default());
		}

		let directories = match self.directory_reader.read_directory_tree().await {
			Ok(directories) => directories,
			Err(Error::EmptyLibrary) => {
				debug!(%tag_id, "Every association points outside an empty library");
				return Ok(SearchResult::default());
			}
			Err(e) => return Err(e),
		};

		let mut matches = Matches::default();
		for file_tag in &file_tags {
			match directories.find(file_tag.file_id) {
				Some(FileNode::Image(image)) => matches.add(image, Some(file_tag.tag_id)),
				Some(FileNode::Directory(directory)) => {
					for image in directories.image_files_under(directory.id) {
						matches.add(image, Some(file_tag.tag_id));
					}
				}
				None => {
					debug!(
						file_id = file_tag.file_id,
						"Skipping an association to a file outside the directory tree"
					);
				}
			}
		}

		Ok(matches.into_result())
	}

	/// Images directly inside the directory that carry the tag or a tag below it, either
	/// attached to them or inherited from the directory and its ancestors.
	///
	/// A tag in effect on the directory itself matches every image in it. Tagged
	/// subdirectories do not contribute.
	async fn search_in_directory(
		&self,
		tag_id: TagId,
		directory_id: FileId,
		invert: bool,
	) -> Result<SearchResult, Error> {
		let directories = self.directory_reader.read_directory_tree().await?;
		if directories.directory(directory_id).is_none() {
			return Err(Error::DirectoryNotFound(directory_id));
		}

		let scope = directories.child_images(directory_id).collect::<Vec<_>>();
		let image_ids = scope.iter().map(|image| image.id).collect::<Vec<_>>();

		let (tags, file_tags) = (
			self.tag_reader.read_all_tags(),
			self.tag_reader
				.read_file_tags_with_ancestors(&directories, &image_ids),
		)
			.try_join()
			.await?;

		let subtree = tags.subtree_ids(tag_id);
		let checker =
			BatchImageTagChecker::new(&image_ids, &directories, Arc::new(tags), &file_tags);

		let mut matches = Matches::default();
		for image in scope {
			let contributing = contributing_tags(&checker, image.id, &subtree);
			match (invert, contributing.is_empty()) {
				(false, false) => {
					for &contributing_tag_id in &contributing {
						matches.add(image, Some(contributing_tag_id));
					}
				}
				(true, true) => matches.add(image, None),
				_ => {}
			}
		}

		Ok(matches.into_result())
	}
}

/// Tags of `subtree` in effect for the image.
fn contributing_tags(
	checker: &BatchImageTagChecker,
	image_id: FileId,
	subtree: &[TagId],
) -> Vec<TagId> {
	subtree
		.iter()
		.copied()
		.filter(|&tag_id| checker.has_tag(image_id, tag_id))
		.collect()
}
