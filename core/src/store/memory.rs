use super::{
	FileId, FileRecord, FileTag, FileTagAddedBy, LibraryStore, StoreError, TagId, TagRecord,
};

use std::{
	collections::{BTreeMap, HashSet},
	sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

#[derive(Debug, Default)]
struct Snapshot {
	files: BTreeMap<FileId, FileRecord>,
	tags: BTreeMap<TagId, TagRecord>,
	file_tags: Vec<FileTag>,
}

/// A [`LibraryStore`] holding the whole library in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
	snapshot: RwLock<Snapshot>,
	unavailable: AtomicBool,
	reads: AtomicUsize,
	writes: AtomicUsize,
}

impl MemoryStore {
	#[must_use]
	pub fn builder() -> MemoryStoreBuilder {
		MemoryStoreBuilder::default()
	}

	/// Makes every following call fail with [`StoreError::Unavailable`].
	pub fn set_unavailable(&self, unavailable: bool) {
		self.unavailable.store(unavailable, Ordering::Release);
	}

	/// Number of read calls that reached the store.
	pub fn read_count(&self) -> usize {
		self.reads.load(Ordering::Acquire)
	}

	/// Number of write calls that reached the store.
	pub fn write_count(&self) -> usize {
		self.writes.load(Ordering::Acquire)
	}

	pub async fn file_tags(&self) -> Vec<FileTag> {
		self.snapshot.read().await.file_tags.clone()
	}

	fn check_read(&self) -> Result<(), StoreError> {
		self.check_available()?;
		self.reads.fetch_add(1, Ordering::AcqRel);
		Ok(())
	}

	fn check_available(&self) -> Result<(), StoreError> {
		if self.unavailable.load(Ordering::Acquire) {
			Err(StoreError::Unavailable("memory store switched off".to_string()))
		} else {
			Ok(())
		}
	}
}

#[async_trait]
impl LibraryStore for MemoryStore {
	async fn all_files(&self) -> Result<Vec<FileRecord>, StoreError> {
		self.check_read()?;
		Ok(self.snapshot.read().await.files.values().cloned().collect())
	}

	async fn files_by_ids(&self, ids: &[FileId]) -> Result<Vec<FileRecord>, StoreError> {
		self.check_read()?;
		let snapshot = self.snapshot.read().await;
		let ids = ids.iter().collect::<HashSet<_>>();

		Ok(snapshot
			.files
			.values()
			.filter(|file| ids.contains(&file.id))
			.cloned()
			.collect())
	}

	async fn files_by_parent_ids(
		&self,
		parent_ids: &[FileId],
	) -> Result<Vec<FileRecord>, StoreError> {
		self.check_read()?;
		let snapshot = self.snapshot.read().await;
		let parent_ids = parent_ids.iter().collect::<HashSet<_>>();

		Ok(snapshot
			.files
			.values()
			.filter(|file| parent_ids.contains(&file.parent_id))
			.cloned()
			.collect())
	}

	async fn all_tags(&self) -> Result<Vec<TagRecord>, StoreError> {
		self.check_read()?;
		Ok(self.snapshot.read().await.tags.values().cloned().collect())
	}

	async fn file_tags_by_file_ids(
		&self,
		file_ids: &[FileId],
	) -> Result<Vec<FileTag>, StoreError> {
		self.check_read()?;
		let snapshot = self.snapshot.read().await;
		let file_ids = file_ids.iter().collect::<HashSet<_>>();

		Ok(snapshot
			.file_tags
			.iter()
			.filter(|file_tag| file_ids.contains(&file_tag.file_id))
			.copied()
			.collect())
	}

	async fn file_tags_by_tag_ids(&self, tag_ids: &[TagId]) -> Result<Vec<FileTag>, StoreError> {
		self.check_read()?;
		let snapshot = self.snapshot.read().await;
		let tag_ids = tag_ids.iter().collect::<HashSet<_>>();

		Ok(snapshot
			.file_tags
			.iter()
			.filter(|file_tag| tag_ids.contains(&file_tag.tag_id))
			.copied()
			.collect())
	}

	async fn insert_file_tags(&self, file_tags: Vec<FileTag>) -> Result<(), StoreError> {
		self.check_available()?;
		self.writes.fetch_add(1, Ordering::AcqRel);

		let mut snapshot = self.snapshot.write().await;
		let mut seen = snapshot
			.file_tags
			.iter()
			.map(|file_tag| (file_tag.file_id, file_tag.tag_id))
			.collect::<HashSet<_>>();

		for file_tag in &file_tags {
			if !seen.insert((file_tag.file_id, file_tag.tag_id)) {
				return Err(StoreError::Conflict {
					file_id: file_tag.file_id,
					tag_id: file_tag.tag_id,
				});
			}
		}

		trace!(count = file_tags.len(), "Inserting file tags");
		snapshot.file_tags.extend(file_tags);

		Ok(())
	}

	async fn delete_file_tags(
		&self,
		tag_ids: &[TagId],
		file_ids: &[FileId],
	) -> Result<(), StoreError> {
		self.check_available()?;
		self.writes.fetch_add(1, Ordering::AcqRel);

		let tag_ids = tag_ids.iter().collect::<HashSet<_>>();
		let file_ids = file_ids.iter().collect::<HashSet<_>>();

		self.snapshot.write().await.file_tags.retain(|file_tag| {
			!(tag_ids.contains(&file_tag.tag_id) && file_ids.contains(&file_tag.file_id))
		});

		Ok(())
	}
}

/// Fluent fixture builder for [`MemoryStore`].
#[derive(Debug, Default)]
pub struct MemoryStoreBuilder {
	snapshot: Snapshot,
}

impl MemoryStoreBuilder {
	#[must_use]
	pub fn directory(mut self, id: FileId, parent_id: FileId, name: impl Into<String>) -> Self {
		self.snapshot
			.files
			.insert(id, FileRecord::directory(id, parent_id, name));
		self
	}

	#[must_use]
	pub fn image(mut self, id: FileId, parent_id: FileId, name: impl Into<String>) -> Self {
		self.snapshot
			.files
			.insert(id, FileRecord::image(id, parent_id, name));
		self
	}

	#[must_use]
	pub fn tag(self, id: TagId, parent_id: TagId, name: impl Into<String>) -> Self {
		self.tag_record(TagRecord::new(id, parent_id, name))
	}

	#[must_use]
	pub fn tag_record(mut self, tag: TagRecord) -> Self {
		self.snapshot.tags.insert(tag.id, tag);
		self
	}

	/// Adds an association; a pair that is already present keeps its first provenance.
	#[must_use]
	pub fn file_tag(mut self, file_id: FileId, tag_id: TagId, added_by: FileTagAddedBy) -> Self {
		if !self
			.snapshot
			.file_tags
			.iter()
			.any(|file_tag| file_tag.file_id == file_id && file_tag.tag_id == tag_id)
		{
			self.snapshot
				.file_tags
				.push(FileTag::new(file_id, tag_id, added_by));
		}
		self
	}

	#[must_use]
	pub fn build(self) -> MemoryStore {
		MemoryStore {
			snapshot: RwLock::new(self.snapshot),
			..Default::default()
		}
	}
}
