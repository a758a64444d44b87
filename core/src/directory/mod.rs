use crate::{
	error::Error,
	store::{FileId, FileKind, FileRecord, ROOT_DIRECTORY_ID},
	tree::{Tree, TreeRecord},
};

use std::{
	collections::HashMap,
	path::{Path, PathBuf},
};

use serde::Serialize;

mod reader;

pub use reader::DirectoryReader;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directory {
	pub id: FileId,
	pub parent_id: FileId,
	pub name: String,
	/// Absolute path, rooted at the configured image root directory.
	pub path: PathBuf,
	pub relative_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageFile {
	pub id: FileId,
	pub parent_id: FileId,
	pub name: String,
	pub path: PathBuf,
	pub relative_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileNode {
	Directory(Directory),
	Image(ImageFile),
}

impl FileNode {
	#[must_use]
	pub const fn id(&self) -> FileId {
		match self {
			Self::Directory(Directory { id, .. }) | Self::Image(ImageFile { id, .. }) => *id,
		}
	}

	#[must_use]
	pub fn name(&self) -> &str {
		match self {
			Self::Directory(Directory { name, .. }) | Self::Image(ImageFile { name, .. }) => name,
		}
	}

	#[must_use]
	pub fn relative_path(&self) -> &Path {
		match self {
			Self::Directory(Directory { relative_path, .. })
			| Self::Image(ImageFile { relative_path, .. }) => relative_path,
		}
	}

	#[must_use]
	pub const fn as_directory(&self) -> Option<&Directory> {
		match self {
			Self::Directory(directory) => Some(directory),
			Self::Image(_) => None,
		}
	}

	#[must_use]
	pub const fn as_image(&self) -> Option<&ImageFile> {
		match self {
			Self::Image(image) => Some(image),
			Self::Directory(_) => None,
		}
	}
}

impl TreeRecord for FileRecord {
	fn id(&self) -> u64 {
		self.id
	}

	fn parent_id(&self) -> u64 {
		self.parent_id
	}

	fn name(&self) -> &str {
		&self.name
	}

	fn is_leaf(&self) -> bool {
		self.is_image()
	}
}

/// The library's directories and images, rebuilt from a flat snapshot of file records.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryTree {
	root: Directory,
	tree: Tree<FileNode>,
}

impl DirectoryTree {
	pub fn build(
		records: impl IntoIterator<Item = FileRecord>,
		image_root_directory: impl AsRef<Path>,
	) -> Result<Self, Error> {
		let image_root_directory = image_root_directory.as_ref();
		let mut records = records.into_iter().peekable();
		if records.peek().is_none() {
			return Err(Error::EmptyLibrary);
		}

		let tree = Tree::<FileNode>::build(records, ROOT_DIRECTORY_ID, |record, parent| {
			let relative_path = parent.map_or_else(
				|| PathBuf::from(&record.name),
				|parent| parent.relative_path().join(&record.name),
			);
			let path = image_root_directory.join(&relative_path);

			match record.kind {
				FileKind::Directory => FileNode::Directory(Directory {
					id: record.id,
					parent_id: record.parent_id,
					name: record.name,
					path,
					relative_path,
				}),
				FileKind::Image => FileNode::Image(ImageFile {
					id: record.id,
					parent_id: record.parent_id,
					name: record.name,
					path,
					relative_path,
				}),
			}
		});

		Ok(Self {
			root: Directory {
				id: ROOT_DIRECTORY_ID,
				parent_id: ROOT_DIRECTORY_ID,
				name: String::new(),
				path: image_root_directory.to_path_buf(),
				relative_path: PathBuf::new(),
			},
			tree,
		})
	}

	#[must_use]
	pub const fn root(&self) -> &Directory {
		&self.root
	}

	/// Number of reachable directories and images, the root excluded.
	#[must_use]
	pub fn len(&self) -> usize {
		self.tree.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.tree.len() == 0
	}

	#[must_use]
	pub fn find(&self, id: FileId) -> Option<&FileNode> {
		self.tree.get(id)
	}

	/// The root for [`ROOT_DIRECTORY_ID`], otherwise a reachable directory.
	#[must_use]
	pub fn directory(&self, id: FileId) -> Option<&Directory> {
		if id == ROOT_DIRECTORY_ID {
			Some(&self.root)
		} else {
			self.find(id).and_then(FileNode::as_directory)
		}
	}

	#[must_use]
	pub fn image(&self, id: FileId) -> Option<&ImageFile> {
		self.find(id).and_then(FileNode::as_image)
	}

	/// Directories and images directly inside `id`, ordered by name.
	pub fn children(&self, id: FileId) -> impl Iterator<Item = &FileNode> + '_ {
		self.tree.children(id)
	}

	pub fn child_directories(&self, id: FileId) -> impl Iterator<Item = &Directory> + '_ {
		self.children(id).filter_map(FileNode::as_directory)
	}

	pub fn child_images(&self, id: FileId) -> impl Iterator<Item = &ImageFile> + '_ {
		self.children(id).filter_map(FileNode::as_image)
	}

	/// Every directory below `id`, depth first.
	#[must_use]
	pub fn descendant_directories(&self, id: FileId) -> Vec<&Directory> {
		self.tree
			.descendants(id)
			.filter_map(FileNode::as_directory)
			.collect()
	}

	/// Every image below `id`, at any depth, depth first.
	#[must_use]
	pub fn image_files_under(&self, id: FileId) -> Vec<&ImageFile> {
		self.tree
			.descendants(id)
			.filter_map(FileNode::as_image)
			.collect()
	}

	/// Every image of the library.
	#[must_use]
	pub fn images(&self) -> Vec<&ImageFile> {
		self.image_files_under(ROOT_DIRECTORY_ID)
	}

	/// Directories on the way from the root (excluded) down to `id` (excluded).
	#[must_use]
	pub fn ancestors(&self, id: FileId) -> Vec<&Directory> {
		self.tree
			.ancestor_ids(id)
			.into_iter()
			.filter_map(|ancestor_id| self.directory(ancestor_id))
			.collect()
	}

	/// Ancestor chains for many ids at once.
	///
	/// Top level entries and ids missing from the tree get no key at all.
	#[must_use]
	pub fn ancestor_map(&self, ids: &[FileId]) -> HashMap<FileId, Vec<&Directory>> {
		ids.iter()
			.filter_map(|&id| {
				let ancestors = self.ancestors(id);
				(!ancestors.is_empty()).then_some((id, ancestors))
			})
			.collect()
	}

	#[must_use]
	pub fn contains(&self, id: FileId) -> bool {
		self.tree.contains(id)
	}

	/// Whether `id` sits somewhere below `ancestor_id`.
	#[must_use]
	pub fn is_under(&self, id: FileId, ancestor_id: FileId) -> bool {
		if ancestor_id == ROOT_DIRECTORY_ID {
			return self.contains(id);
		}
		self.tree.ancestor_ids(id).contains(&ancestor_id)
	}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;

	use pretty_assertions::assert_eq;

	fn records() -> Vec<FileRecord> {
		vec![
			FileRecord::directory(1, 0, "directory1"),
			FileRecord::directory(2, 0, "directory2"),
			FileRecord::directory(10, 1, "sub directory1"),
			FileRecord::image(11, 10, "image11.jpg"),
			FileRecord::image(12, 1, "image12.jpg"),
			FileRecord::image(20, 2, "image20.png"),
		]
	}

	#[test]
	fn paths_are_joined_from_the_root() {
		let tree = DirectoryTree::build(records(), "/library").unwrap();

		let image = tree.image(11).unwrap();
		assert_eq!(
			image.relative_path,
			PathBuf::from("directory1/sub directory1/image11.jpg")
		);
		assert_eq!(
			image.path,
			PathBuf::from("/library/directory1/sub directory1/image11.jpg")
		);
		assert_eq!(tree.root().path, PathBuf::from("/library"));
	}

	#[test]
	fn empty_library_is_not_found() {
		let err = DirectoryTree::build(Vec::new(), "/library").unwrap_err();
		assert!(matches!(err, Error::EmptyLibrary));
		assert!(err.is_not_found());
	}

	#[test]
	fn ancestor_map_omits_top_level_entries() {
		let tree = DirectoryTree::build(records(), "/library").unwrap();

		let map = tree.ancestor_map(&[1, 11, 12, 20, 404]);
		let ids = |id: FileId| map[&id].iter().map(|d| d.id).collect::<Vec<_>>();

		assert_eq!(map.len(), 3);
		assert_eq!(ids(11), vec![1, 10]);
		assert_eq!(ids(12), vec![1]);
		assert_eq!(ids(20), vec![2]);
		assert!(!map.contains_key(&1));
	}

	#[test]
	fn recursive_queries_walk_the_subtree() {
		let tree = DirectoryTree::build(records(), "/library").unwrap();

		let images = tree.image_files_under(1).iter().map(|i| i.id).collect::<Vec<_>>();
		assert_eq!(images, vec![12, 11]);

		let directories = tree
			.descendant_directories(ROOT_DIRECTORY_ID)
			.iter()
			.map(|d| d.id)
			.collect::<Vec<_>>();
		assert_eq!(directories, vec![1, 10, 2]);

		assert!(tree.is_under(11, 1));
		assert!(!tree.is_under(20, 1));
	}
}
