//! Persistence boundary.
//!
//! The core never talks to a database directly. Every read it needs is expressed as a
//! single bulk call on [`LibraryStore`], so resolving a whole request costs a fixed number
//! of round trips no matter how many files are involved.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod memory;

pub use memory::{MemoryStore, MemoryStoreBuilder};

pub type FileId = u64;
pub type TagId = u64;

/// Parent id of every top level directory and image.
pub const ROOT_DIRECTORY_ID: FileId = 0;
/// Parent id of every top level tag.
pub const ROOT_TAG_ID: TagId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
	Directory,
	Image,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
	pub id: FileId,
	pub parent_id: FileId,
	pub name: String,
	pub kind: FileKind,
}

impl FileRecord {
	pub fn directory(id: FileId, parent_id: FileId, name: impl Into<String>) -> Self {
		Self {
			id,
			parent_id,
			name: name.into(),
			kind: FileKind::Directory,
		}
	}

	pub fn image(id: FileId, parent_id: FileId, name: impl Into<String>) -> Self {
		Self {
			id,
			parent_id,
			name: name.into(),
			kind: FileKind::Image,
		}
	}

	#[must_use]
	pub fn is_directory(&self) -> bool {
		self.kind == FileKind::Directory
	}

	#[must_use]
	pub fn is_image(&self) -> bool {
		self.kind == FileKind::Image
	}
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagType {
	Series,
	Season,
	#[default]
	Standard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
	pub id: TagId,
	pub parent_id: TagId,
	pub name: String,
	#[serde(default)]
	pub tag_type: TagType,
}

impl TagRecord {
	pub fn new(id: TagId, parent_id: TagId, name: impl Into<String>) -> Self {
		Self {
			id,
			parent_id,
			name: name.into(),
			tag_type: TagType::Standard,
		}
	}

	#[must_use]
	pub const fn with_type(mut self, tag_type: TagType) -> Self {
		self.tag_type = tag_type;
		self
	}
}

/// Who attached a tag to a file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileTagAddedBy {
	#[default]
	User,
	Import,
	Suggestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileTag {
	pub file_id: FileId,
	pub tag_id: TagId,
	#[serde(default)]
	pub added_by: FileTagAddedBy,
}

impl FileTag {
	#[must_use]
	pub const fn new(file_id: FileId, tag_id: TagId, added_by: FileTagAddedBy) -> Self {
		Self {
			file_id,
			tag_id,
			added_by,
		}
	}
}

#[derive(Error, Debug)]
pub enum StoreError {
	#[error("library store is unavailable: {0}")]
	Unavailable(String),
	#[error("file tag already exists: <file_id='{file_id}', tag_id='{tag_id}'>")]
	Conflict { file_id: FileId, tag_id: TagId },
	#[error("library store request was cancelled")]
	Cancelled,
}

/// Bulk access to the library's flat rows.
///
/// Implementations must answer each method with a single round trip; callers rely on
/// that to keep request cost independent of the number of ids passed in.
#[async_trait]
pub trait LibraryStore: Send + Sync + fmt::Debug + 'static {
	/// Every directory and image record.
	async fn all_files(&self) -> Result<Vec<FileRecord>, StoreError>;

	/// Lookups for hosts that edit single rows; the readers in this crate always load
	/// [`LibraryStore::all_files`] to rebuild the whole tree.
	async fn files_by_ids(&self, ids: &[FileId]) -> Result<Vec<FileRecord>, StoreError>;

	/// Same as [`LibraryStore::files_by_ids`], for the direct children of `parent_ids`.
	async fn files_by_parent_ids(
		&self,
		parent_ids: &[FileId],
	) -> Result<Vec<FileRecord>, StoreError>;

	async fn all_tags(&self) -> Result<Vec<TagRecord>, StoreError>;

	async fn file_tags_by_file_ids(&self, file_ids: &[FileId])
		-> Result<Vec<FileTag>, StoreError>;

	async fn file_tags_by_tag_ids(&self, tag_ids: &[TagId]) -> Result<Vec<FileTag>, StoreError>;

	/// Inserts the whole batch or nothing. A pair that is already stored is a
	/// [`StoreError::Conflict`].
	async fn insert_file_tags(&self, file_tags: Vec<FileTag>) -> Result<(), StoreError>;

	/// Removes every `(file, tag)` pair of the cartesian product `tag_ids x file_ids`.
	async fn delete_file_tags(
		&self,
		tag_ids: &[TagId],
		file_ids: &[FileId],
	) -> Result<(), StoreError>;
}
