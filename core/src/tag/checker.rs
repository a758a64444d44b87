use crate::{
	directory::DirectoryTree,
	store::{FileId, FileTag, FileTagAddedBy, TagId},
};

use super::TagTree;

use std::{
	collections::{BTreeMap, BTreeSet, HashMap},
	sync::Arc,
};

/// Tags in effect for a single file, either attached to it or inherited from one of its
/// ancestor directories.
#[derive(Debug, Clone)]
pub struct ImageTagChecker {
	file_id: FileId,
	direct_tags: HashMap<TagId, FileTagAddedBy>,
	/// Tag id to every ancestor directory carrying it.
	ancestor_tags: HashMap<TagId, Vec<(FileId, FileTagAddedBy)>>,
	tags: Arc<TagTree>,
}

impl ImageTagChecker {
	#[must_use]
	pub const fn file_id(&self) -> FileId {
		self.file_id
	}

	/// Attached to the file itself or to any of its ancestor directories. Parent tags do
	/// not count: a file tagged `Season 1` does not have `Seasons`.
	#[must_use]
	pub fn has_tag(&self, tag_id: TagId) -> bool {
		self.direct_tags.contains_key(&tag_id) || self.ancestor_tags.contains_key(&tag_id)
	}

	/// Some tag below `tag_id` in the tag hierarchy is in effect.
	#[must_use]
	pub fn has_descendant_tag(&self, tag_id: TagId) -> bool {
		self.tags
			.descendants(tag_id)
			.into_iter()
			.any(|tag| self.has_tag(tag.id))
	}

	/// The file itself was tagged, as opposed to only inheriting directory tags.
	#[must_use]
	pub fn has_direct_tag(&self) -> bool {
		!self.direct_tags.is_empty()
	}

	#[must_use]
	pub fn has_inherited_tag(&self, tag_id: TagId) -> bool {
		self.ancestor_tags.contains_key(&tag_id)
	}

	/// Every tag in effect with who added it. `User` wins over any other provenance when
	/// the same tag comes from several places.
	#[must_use]
	pub fn tag_map(&self) -> BTreeMap<TagId, FileTagAddedBy> {
		let mut tag_map = BTreeMap::new();

		let inherited = self
			.ancestor_tags
			.iter()
			.flat_map(|(&tag_id, sources)| {
				sources.iter().map(move |&(_, added_by)| (tag_id, added_by))
			});

		for (tag_id, added_by) in self
			.direct_tags
			.iter()
			.map(|(&tag_id, &added_by)| (tag_id, added_by))
			.chain(inherited)
		{
			tag_map
				.entry(tag_id)
				.and_modify(|current| {
					if added_by == FileTagAddedBy::User {
						*current = FileTagAddedBy::User;
					}
				})
				.or_insert(added_by);
		}

		tag_map
	}

	/// Every tag in effect, ordered by id.
	#[must_use]
	pub fn tag_ids(&self) -> BTreeSet<TagId> {
		self.direct_tags
			.keys()
			.chain(self.ancestor_tags.keys())
			.copied()
			.collect()
	}

	/// Directories the tag is inherited from, nearest last.
	pub fn inherited_from(&self, tag_id: TagId) -> impl Iterator<Item = FileId> + '_ {
		self.ancestor_tags
			.get(&tag_id)
			.into_iter()
			.flatten()
			.map(|&(directory_id, _)| directory_id)
	}
}

/// [`ImageTagChecker`]s for a batch of files sharing one tag tree.
#[derive(Debug, Clone)]
pub struct BatchImageTagChecker {
	checkers: HashMap<FileId, ImageTagChecker>,
	tags: Arc<TagTree>,
}

impl BatchImageTagChecker {
	/// Splits `file_tags` into direct and inherited associations for every requested file.
	///
	/// `file_tags` must hold the associations of the requested files and of all their
	/// ancestor directories; anything else is ignored, as are tags missing from `tags`.
	#[must_use]
	pub fn new(
		file_ids: &[FileId],
		directories: &DirectoryTree,
		tags: Arc<TagTree>,
		file_tags: &[FileTag],
	) -> Self {
		let mut tags_by_file_id = HashMap::<_, Vec<_>>::new();
		for file_tag in file_tags.iter().filter(|file_tag| tags.contains(file_tag.tag_id)) {
			tags_by_file_id
				.entry(file_tag.file_id)
				.or_default()
				.push(file_tag);
		}

		let ancestor_map = directories.ancestor_map(file_ids);
		let checkers = file_ids
			.iter()
			.map(|&file_id| {
				let direct_tags = tags_by_file_id
					.get(&file_id)
					.into_iter()
					.flatten()
					.map(|file_tag| (file_tag.tag_id, file_tag.added_by))
					.collect();

				let mut ancestor_tags = HashMap::<_, Vec<_>>::new();
				for directory in ancestor_map.get(&file_id).into_iter().flatten() {
					for file_tag in tags_by_file_id.get(&directory.id).into_iter().flatten() {
						ancestor_tags
							.entry(file_tag.tag_id)
							.or_default()
							.push((directory.id, file_tag.added_by));
					}
				}

				(
					file_id,
					ImageTagChecker {
						file_id,
						direct_tags,
						ancestor_tags,
						tags: Arc::clone(&tags),
					},
				)
			})
			.collect();

		Self { checkers, tags }
	}

	#[must_use]
	pub fn checker(&self, file_id: FileId) -> Option<&ImageTagChecker> {
		self.checkers.get(&file_id)
	}

	#[must_use]
	pub fn tags(&self) -> &TagTree {
		&self.tags
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.checkers.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.checkers.is_empty()
	}

	/// `false` for files outside the batch.
	#[must_use]
	pub fn has_tag(&self, file_id: FileId, tag_id: TagId) -> bool {
		self.checker(file_id)
			.is_some_and(|checker| checker.has_tag(tag_id))
	}

	#[must_use]
	pub fn has_descendant_tag(&self, file_id: FileId, tag_id: TagId) -> bool {
		self.checker(file_id)
			.is_some_and(|checker| checker.has_descendant_tag(tag_id))
	}

	#[must_use]
	pub fn has_direct_tag(&self, file_id: FileId) -> bool {
		self.checker(file_id)
			.is_some_and(ImageTagChecker::has_direct_tag)
	}

	/// Tag id to the files of the batch inheriting it from an ancestor directory.
	#[must_use]
	pub fn tags_from_ancestors(&self) -> BTreeMap<TagId, Vec<FileId>> {
		let mut tags = BTreeMap::<_, BTreeSet<_>>::new();
		for checker in self.checkers.values() {
			for &tag_id in checker.ancestor_tags.keys() {
				tags.entry(tag_id).or_default().insert(checker.file_id);
			}
		}

		tags.into_iter()
			.map(|(tag_id, file_ids)| (tag_id, file_ids.into_iter().collect()))
			.collect()
	}

	/// Tag id to the number of files of the batch it is in effect for.
	#[must_use]
	pub fn tag_counts(&self) -> BTreeMap<TagId, usize> {
		let mut counts = BTreeMap::new();
		for checker in self.checkers.values() {
			for tag_id in checker.tag_ids() {
				*counts.entry(tag_id).or_default() += 1;
			}
		}
		counts
	}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;
	use crate::store::{FileRecord, TagRecord};

	use pretty_assertions::assert_eq;

	fn directories() -> DirectoryTree {
		DirectoryTree::build(
			vec![
				FileRecord::directory(1, 0, "directory1"),
				FileRecord::directory(2, 1, "directory2"),
				FileRecord::image(3, 2, "image3.jpg"),
				FileRecord::image(4, 0, "image4.jpg"),
			],
			"/library",
		)
		.unwrap()
	}

	fn tags() -> Arc<TagTree> {
		Arc::new(
			TagTree::build(vec![
				TagRecord::new(1, 0, "tag1"),
				TagRecord::new(10, 1, "tag10"),
				TagRecord::new(2, 0, "tag2"),
			])
			.unwrap(),
		)
	}

	#[test]
	fn descendant_tags_do_not_count_as_the_parent() {
		let batch = BatchImageTagChecker::new(
			&[4],
			&directories(),
			tags(),
			&[FileTag::new(4, 10, FileTagAddedBy::User)],
		);

		assert!(!batch.has_tag(4, 1));
		assert!(batch.has_descendant_tag(4, 1));
		assert!(batch.has_tag(4, 10));
		assert!(!batch.has_descendant_tag(4, 10));
	}

	#[test]
	fn directory_tags_are_inherited() {
		let batch = BatchImageTagChecker::new(
			&[3],
			&directories(),
			tags(),
			&[
				FileTag::new(1, 2, FileTagAddedBy::Import),
				FileTag::new(2, 2, FileTagAddedBy::User),
				FileTag::new(2, 10, FileTagAddedBy::Suggestion),
			],
		);

		let checker = batch.checker(3).unwrap();
		assert!(checker.has_tag(2));
		assert!(checker.has_descendant_tag(1));
		assert!(!checker.has_direct_tag());
		assert_eq!(checker.inherited_from(2).collect::<Vec<_>>(), vec![1, 2]);
		assert_eq!(
			checker.tag_map(),
			BTreeMap::from([
				(2, FileTagAddedBy::User),
				(10, FileTagAddedBy::Suggestion)
			])
		);
		assert_eq!(
			batch.tags_from_ancestors(),
			BTreeMap::from([(2, vec![3]), (10, vec![3])])
		);
	}

	#[test]
	fn files_outside_the_batch_have_no_tags() {
		let batch = BatchImageTagChecker::new(&[], &directories(), tags(), &[]);

		assert!(batch.is_empty());
		assert!(!batch.has_tag(3, 1));
		assert!(!batch.has_direct_tag(3));
	}

	#[test]
	fn empty_tag_tree_never_matches() {
		let batch = BatchImageTagChecker::new(
			&[4],
			&directories(),
			Arc::new(TagTree::default()),
			&[FileTag::new(4, 10, FileTagAddedBy::User)],
		);

		assert!(!batch.has_tag(4, 10));
		assert!(!batch.has_descendant_tag(4, 1));
		assert!(!batch.has_direct_tag(4));
		assert!(batch.tag_counts().is_empty());
	}
}
