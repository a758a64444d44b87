use crate::{
	directory::{DirectoryReader, DirectoryTree},
	error::Error,
	store::{FileId, FileTag, FileTagAddedBy, LibraryStore, TagId},
};

use super::{BatchImageTagChecker, Tag, TagTree};

use std::{
	collections::{BTreeMap, HashSet},
	sync::Arc,
};

use futures_concurrency::future::TryJoin;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, instrument};

/// Tag statistics for a selection of files.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FileTagsSummary {
	/// Tag id to the selected files that inherit it from an ancestor directory.
	pub ancestor_map: BTreeMap<TagId, Vec<FileId>>,
	/// Tag id to how many selected files it is in effect for.
	pub tag_counts: BTreeMap<TagId, usize>,
}

#[derive(Debug, Clone)]
pub struct TagReader {
	store: Arc<dyn LibraryStore>,
	directory_reader: DirectoryReader,
}

impl TagReader {
	pub fn new(store: Arc<dyn LibraryStore>, directory_reader: DirectoryReader) -> Self {
		Self {
			store,
			directory_reader,
		}
	}

	/// An empty tag table is an empty tree, not an error.
	#[instrument(skip(self), err)]
	pub async fn read_all_tags(&self) -> Result<TagTree, Error> {
		let records = self.store.all_tags().await?;
		if records.is_empty() {
			debug!("No tag records, using an empty tag tree");
			return Ok(TagTree::default());
		}

		TagTree::build(records)
	}

	#[instrument(skip(self), err)]
	pub async fn read_tag(&self, tag_id: TagId) -> Result<Tag, Error> {
		self.read_all_tags()
			.await?
			.get(tag_id)
			.cloned()
			.ok_or(Error::TagNotFound(tag_id))
	}

	/// Associations of the tag and of every tag below it. Unknown tags have none.
	#[instrument(skip(self), err)]
	pub async fn read_file_tags_recursively(&self, tag_id: TagId) -> Result<Vec<FileTag>, Error> {
		let tags = self.read_all_tags().await?;
		self.file_tags_in_subtree(&tags, tag_id).await
	}

	pub(crate) async fn file_tags_in_subtree(
		&self,
		tags: &TagTree,
		tag_id: TagId,
	) -> Result<Vec<FileTag>, Error> {
		let tag_ids = tags.subtree_ids(tag_id);
		if tag_ids.is_empty() {
			debug!(%tag_id, "Tag not found, no associations to read");
			return Ok(Vec::new());
		}

		Ok(self.store.file_tags_by_tag_ids(&tag_ids).await?)
	}

	/// Builds the checkers for `file_ids`.
	///
	/// The tag tree and the file associations are read concurrently; the first failure
	/// aborts the whole construction.
	#[instrument(skip_all, fields(files_count = file_ids.len()), err)]
	pub async fn create_batch_tag_checker(
		&self,
		file_ids: &[FileId],
	) -> Result<BatchImageTagChecker, Error> {
		self.read_batch_tag_checker(file_ids)
			.await
			.map(|(_, checker)| checker)
	}

	/// Same as [`TagReader::create_batch_tag_checker`], also handing back the directory
	/// tree the checker was built from.
	pub(crate) async fn read_batch_tag_checker(
		&self,
		file_ids: &[FileId],
	) -> Result<(DirectoryTree, BatchImageTagChecker), Error> {
		let (tags, (directories, file_tags)) = (
			self.read_all_tags(),
			self.read_directories_and_file_tags(file_ids),
		)
			.try_join()
			.await?;

		let checker =
			BatchImageTagChecker::new(file_ids, &directories, Arc::new(tags), &file_tags);

		Ok((directories, checker))
	}

	/// Associations of `file_ids` and of all their ancestor directories, in one store call.
	pub(crate) async fn read_directories_and_file_tags(
		&self,
		file_ids: &[FileId],
	) -> Result<(DirectoryTree, Vec<FileTag>), Error> {
		let directories = self.directory_reader.read_directory_tree().await?;
		let file_tags = self.read_file_tags_with_ancestors(&directories, file_ids).await?;

		Ok((directories, file_tags))
	}

	pub(crate) async fn read_file_tags_with_ancestors(
		&self,
		directories: &DirectoryTree,
		file_ids: &[FileId],
	) -> Result<Vec<FileTag>, Error> {
		let ids = file_ids
			.iter()
			.copied()
			.chain(
				directories
					.ancestor_map(file_ids)
					.into_values()
					.flatten()
					.map(|directory| directory.id),
			)
			.unique()
			.collect::<Vec<_>>();

		Ok(self.store.file_tags_by_file_ids(&ids).await?)
	}

	#[instrument(skip_all, fields(files_count = file_ids.len()), err)]
	pub async fn read_tags_by_file_ids(&self, file_ids: &[FileId]) -> Result<FileTagsSummary, Error> {
		let checker = self.create_batch_tag_checker(file_ids).await?;

		Ok(FileTagsSummary {
			ancestor_map: checker.tags_from_ancestors(),
			tag_counts: checker.tag_counts(),
		})
	}

	/// Attaches `added_tag_ids` to every file that does not carry them yet and removes
	/// `deleted_tag_ids` from every file. Nothing is written when there is nothing to do.
	///
	/// The delete and the insert are two separate store calls and are not atomic: a failed
	/// insert leaves the deletions in place.
	#[instrument(skip(self), err)]
	pub async fn batch_update_tags_for_files(
		&self,
		file_ids: &[FileId],
		added_tag_ids: &[TagId],
		deleted_tag_ids: &[TagId],
	) -> Result<(), Error> {
		let existing = self
			.store
			.file_tags_by_file_ids(file_ids)
			.await?
			.into_iter()
			.map(|file_tag| (file_tag.file_id, file_tag.tag_id))
			.collect::<HashSet<_>>();

		let created = added_tag_ids
			.iter()
			.unique()
			.cartesian_product(file_ids.iter().unique())
			.filter(|&(&tag_id, &file_id)| !existing.contains(&(file_id, tag_id)))
			.map(|(&tag_id, &file_id)| FileTag::new(file_id, tag_id, FileTagAddedBy::User))
			.collect::<Vec<_>>();

		if !deleted_tag_ids.is_empty() {
			self.store
				.delete_file_tags(deleted_tag_ids, file_ids)
				.await?;
		}

		if !created.is_empty() {
			debug!(created_count = created.len(), "Adding file tags");
			self.store.insert_file_tags(created).await?;
		}

		Ok(())
	}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;
	use crate::store::MemoryStore;

	use pretty_assertions::assert_eq;

	fn reader(store: Arc<MemoryStore>) -> TagReader {
		TagReader::new(
			Arc::clone(&store) as Arc<dyn LibraryStore>,
			DirectoryReader::new(store, "/library"),
		)
	}

	fn store() -> Arc<MemoryStore> {
		Arc::new(
			MemoryStore::builder()
				.directory(1, 0, "directory1")
				.directory(2, 1, "directory2")
				.image(3, 2, "image3.jpg")
				.image(4, 1, "image4.jpg")
				.tag(1, 0, "tag1")
				.tag(10, 1, "tag10")
				.tag(2, 0, "tag2")
				.file_tag(1, 1, FileTagAddedBy::User)
				.file_tag(3, 10, FileTagAddedBy::Import)
				.file_tag(4, 2, FileTagAddedBy::User)
				.build(),
		)
	}

	#[tokio::test]
	async fn file_tags_are_read_for_the_whole_subtree() {
		let reader = reader(store());

		let mut file_ids = reader
			.read_file_tags_recursively(1)
			.await
			.unwrap()
			.into_iter()
			.map(|file_tag| file_tag.file_id)
			.collect::<Vec<_>>();
		file_ids.sort_unstable();

		assert_eq!(file_ids, vec![1, 3]);
		assert!(reader.read_file_tags_recursively(404).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn summary_counts_inherited_tags() {
		let summary = reader(store()).read_tags_by_file_ids(&[3, 4]).await.unwrap();

		assert_eq!(summary.ancestor_map, BTreeMap::from([(1, vec![3, 4])]));
		assert_eq!(
			summary.tag_counts,
			BTreeMap::from([(1, 2), (2, 1), (10, 1)])
		);
	}

	#[tokio::test]
	async fn batch_update_skips_existing_pairs() {
		let store = store();
		let reader = reader(Arc::clone(&store));

		reader
			.batch_update_tags_for_files(&[3, 4], &[2], &[10])
			.await
			.unwrap();

		let mut file_tags = store.file_tags().await;
		file_tags.sort_by_key(|file_tag| (file_tag.file_id, file_tag.tag_id));
		assert_eq!(
			file_tags,
			vec![
				FileTag::new(1, 1, FileTagAddedBy::User),
				FileTag::new(3, 2, FileTagAddedBy::User),
				FileTag::new(4, 2, FileTagAddedBy::User),
			]
		);
	}

	#[tokio::test]
	async fn batch_update_without_changes_does_not_write() {
		let store = store();

		reader(Arc::clone(&store))
			.batch_update_tags_for_files(&[4], &[2], &[])
			.await
			.unwrap();

		assert_eq!(store.write_count(), 0);
	}

	#[tokio::test]
	async fn checker_fails_when_the_store_is_down() {
		let store = store();
		store.set_unavailable(true);

		let err = reader(store).create_batch_tag_checker(&[3]).await.unwrap_err();
		assert!(matches!(err, Error::Store(_)));
	}
}
