//! Plans a train/validation image dataset out of the library's curated images.
//!
//! Only the plan is produced here: which image goes to which split and the metadata line
//! describing it. Copying files is left to the caller.

use crate::{
	directory::{DirectoryReader, ImageFile},
	error::{Error, ErrorList},
	store::{FileTagAddedBy, TagId},
	tag::{BatchImageTagChecker, Tag, TagReader},
};

use std::{
	collections::{BTreeMap, HashSet},
	fmt,
	sync::Arc,
};

use futures_concurrency::future::TryJoin;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Share of the images without suggested tags that goes to the train split, in percent.
const TRAIN_PERCENTAGE: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSplit {
	Train,
	Validation,
}

impl DatasetSplit {
	pub const ALL: [Self; 2] = [Self::Train, Self::Validation];

	/// Directory name of the split inside the export directory.
	#[must_use]
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::Train => "train",
			Self::Validation => "validation",
		}
	}
}

impl fmt::Display for DatasetSplit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One line of a split's `metadata.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
	pub file_name: String,
	/// One-hot tag vector indexed by tag id.
	pub tags: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetEntry {
	pub image: ImageFile,
	pub split: DatasetSplit,
	pub metadata: DatasetMetadata,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetOptions {
	/// Also export images that only inherit tags from their directories.
	pub include_uncurated: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DatasetPlan {
	pub entries: Vec<DatasetEntry>,
	/// Every tag of the library, the index space of [`DatasetMetadata::tags`].
	pub tags: Vec<Tag>,
}

impl DatasetPlan {
	pub fn entries(&self, split: DatasetSplit) -> impl Iterator<Item = &DatasetEntry> + '_ {
		self.entries.iter().filter(move |entry| entry.split == split)
	}

	/// One JSON object per line, each line terminated by a newline.
	pub fn metadata_jsonl(&self, split: DatasetSplit) -> Result<String, serde_json::Error> {
		self.entries(split)
			.try_fold(String::new(), |mut jsonl, entry| {
				jsonl.push_str(&serde_json::to_string(&entry.metadata)?);
				jsonl.push('\n');
				Ok(jsonl)
			})
	}

	pub fn tags_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(&self.tags)
	}
}

#[derive(Debug, Clone)]
pub struct DatasetPlanner {
	directory_reader: DirectoryReader,
	tag_reader: TagReader,
}

impl DatasetPlanner {
	pub const fn new(directory_reader: DirectoryReader, tag_reader: TagReader) -> Self {
		Self {
			directory_reader,
			tag_reader,
		}
	}

	/// Images carrying a tag added by a suggestion always go to the train split, the
	/// others are split at random with `rng`.
	///
	/// Two images of the same split sharing a file name would overwrite each other once
	/// copied, so every such clash is reported instead of a plan.
	#[instrument(skip(self, rng), err)]
	pub async fn plan<R: Rng + Send + ?Sized>(
		&self,
		options: DatasetOptions,
		rng: &mut R,
	) -> Result<DatasetPlan, Error> {
		let directories = self.directory_reader.read_directory_tree().await?;
		let images = directories.images();
		let image_ids = images.iter().map(|image| image.id).collect::<Vec<_>>();

		let (tags, file_tags) = (
			self.tag_reader.read_all_tags(),
			self.tag_reader
				.read_file_tags_with_ancestors(&directories, &image_ids),
		)
			.try_join()
			.await?;

		let max_tag_id = tags.max_id();
		let tags = Arc::new(tags);
		let checker =
			BatchImageTagChecker::new(&image_ids, &directories, Arc::clone(&tags), &file_tags);

		let mut entries = Vec::with_capacity(images.len());
		for image in images {
			let Some(image_checker) = checker.checker(image.id) else {
				continue;
			};
			if !options.include_uncurated && !image_checker.has_direct_tag() {
				continue;
			}

			let tag_map = image_checker.tag_map();
			let split = if tag_map
				.values()
				.any(|&added_by| added_by == FileTagAddedBy::Suggestion)
			{
				DatasetSplit::Train
			} else if rng.gen_range(0..100) < TRAIN_PERCENTAGE {
				DatasetSplit::Train
			} else {
				DatasetSplit::Validation
			};

			entries.push(DatasetEntry {
				metadata: DatasetMetadata {
					file_name: image.name.clone(),
					tags: one_hot(&tag_map, max_tag_id),
				},
				image: image.clone(),
				split,
			});
		}
		debug!(entries_count = entries.len(), "Planned dataset");

		check_file_names(&entries)?;

		Ok(DatasetPlan {
			entries,
			tags: tags.iter().cloned().collect(),
		})
	}
}

fn one_hot(tag_map: &BTreeMap<TagId, FileTagAddedBy>, max_tag_id: TagId) -> Vec<f64> {
	let len = usize::try_from(max_tag_id).map_or(0, |max| max + 1);
	let mut tags = vec![0.0; len];
	for &tag_id in tag_map.keys() {
		if let Some(slot) = usize::try_from(tag_id)
			.ok()
			.and_then(|index| tags.get_mut(index))
		{
			*slot = 1.0;
		}
	}
	tags
}

fn check_file_names(entries: &[DatasetEntry]) -> Result<(), Error> {
	let mut seen = HashSet::with_capacity(entries.len());
	let mut errors = ErrorList::new();
	for entry in entries {
		if !seen.insert((entry.split, entry.image.name.as_str())) {
			errors.push(Error::AlreadyExists(format!(
				"{}/{}",
				entry.split, entry.image.name
			)));
		}
	}

	errors.into_result(())
}
