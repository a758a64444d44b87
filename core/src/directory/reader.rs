use crate::{
	error::{Error, ErrorList},
	store::{FileId, LibraryStore, ROOT_DIRECTORY_ID},
};

use super::{Directory, DirectoryTree, ImageFile};

use std::{
	collections::HashMap,
	path::{Path, PathBuf},
	sync::Arc,
};

use tracing::{debug, instrument};

/// Reads the directory tree through the store and answers queries on it.
///
/// Each call fetches a fresh snapshot; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct DirectoryReader {
	store: Arc<dyn LibraryStore>,
	image_root_directory: PathBuf,
}

impl DirectoryReader {
	pub fn new(store: Arc<dyn LibraryStore>, image_root_directory: impl Into<PathBuf>) -> Self {
		Self {
			store,
			image_root_directory: image_root_directory.into(),
		}
	}

	#[must_use]
	pub fn image_root_directory(&self) -> &Path {
		&self.image_root_directory
	}

	#[instrument(skip(self), err)]
	pub async fn read_directory_tree(&self) -> Result<DirectoryTree, Error> {
		let files = self.store.all_files().await?;
		debug!(files_count = files.len(), "Read file records");

		DirectoryTree::build(files, &self.image_root_directory)
	}

	#[instrument(skip(self), err)]
	pub async fn read_directory(&self, id: FileId) -> Result<Directory, Error> {
		if id == ROOT_DIRECTORY_ID {
			return Ok(self.root_directory());
		}

		self.read_directory_tree()
			.await?
			.directory(id)
			.cloned()
			.ok_or(Error::DirectoryNotFound(id))
	}

	/// Every missing directory is reported, not just the first one.
	#[instrument(skip(self), err)]
	pub async fn read_directories(
		&self,
		ids: &[FileId],
	) -> Result<HashMap<FileId, Directory>, Error> {
		let tree = self.read_directory_tree().await?;

		let mut errors = ErrorList::new();
		let mut directories = HashMap::with_capacity(ids.len());
		for &id in ids {
			match tree.directory(id) {
				Some(directory) => {
					directories.insert(id, directory.clone());
				}
				None => errors.push(Error::DirectoryNotFound(id)),
			}
		}

		errors.into_result(directories)
	}

	/// Ancestors of each id ordered from the top level down. Top level entries and unknown
	/// ids have no key in the returned map.
	#[instrument(skip(self), err)]
	pub async fn read_ancestors(
		&self,
		ids: &[FileId],
	) -> Result<HashMap<FileId, Vec<Directory>>, Error> {
		let tree = self.read_directory_tree().await?;

		Ok(tree
			.ancestor_map(ids)
			.into_iter()
			.map(|(id, ancestors)| (id, ancestors.into_iter().cloned().collect()))
			.collect())
	}

	/// Images directly inside the directory.
	#[instrument(skip(self), err)]
	pub async fn read_image_files(&self, directory_id: FileId) -> Result<Vec<ImageFile>, Error> {
		let tree = self.read_directory_tree().await?;
		if tree.directory(directory_id).is_none() {
			return Err(Error::DirectoryNotFound(directory_id));
		}

		Ok(tree.child_images(directory_id).cloned().collect())
	}

	#[instrument(skip(self), err)]
	pub async fn read_image_files_recursively(
		&self,
		directory_id: FileId,
	) -> Result<Vec<ImageFile>, Error> {
		let tree = self.read_directory_tree().await?;
		if tree.directory(directory_id).is_none() {
			return Err(Error::DirectoryNotFound(directory_id));
		}

		Ok(tree
			.image_files_under(directory_id)
			.into_iter()
			.cloned()
			.collect())
	}

	#[instrument(skip(self), err)]
	pub async fn read_child_directories_recursively(
		&self,
		directory_id: FileId,
	) -> Result<Vec<Directory>, Error> {
		let tree = self.read_directory_tree().await?;
		if tree.directory(directory_id).is_none() {
			return Err(Error::DirectoryNotFound(directory_id));
		}

		Ok(tree
			.descendant_directories(directory_id)
			.into_iter()
			.cloned()
			.collect())
	}

	/// Images in the order of `ids`; ids that are not reachable images are skipped.
	#[instrument(skip(self), err)]
	pub async fn read_images_by_ids(&self, ids: &[FileId]) -> Result<Vec<ImageFile>, Error> {
		let tree = self.read_directory_tree().await?;

		Ok(ids
			.iter()
			.filter_map(|&id| {
				let image = tree.image(id);
				if image.is_none() {
					debug!(%id, "Skipping an id that is not a reachable image");
				}
				image.cloned()
			})
			.collect())
	}

	fn root_directory(&self) -> Directory {
		Directory {
			id: ROOT_DIRECTORY_ID,
			parent_id: ROOT_DIRECTORY_ID,
			name: String::new(),
			path: self.image_root_directory.clone(),
			relative_path: PathBuf::new(),
		}
	}
}
