use crate::{
	error::Error,
	store::{TagId, TagRecord, TagType, ROOT_TAG_ID},
	tree::{Tree, TreeRecord},
};

use serde::Serialize;

mod checker;
mod reader;

pub use checker::{BatchImageTagChecker, ImageTagChecker};
pub use reader::{FileTagsSummary, TagReader};

const FULL_NAME_SEPARATOR: &str = " > ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
	pub id: TagId,
	pub parent_id: TagId,
	pub name: String,
	/// Names from the top level tag down to this one, e.g. `Series > Seasons > Season 1`.
	pub full_name: String,
	pub tag_type: TagType,
	/// Child tag ids ordered by name.
	pub children: Vec<TagId>,
}

impl TreeRecord for TagRecord {
	fn id(&self) -> u64 {
		self.id
	}

	fn parent_id(&self) -> u64 {
		self.parent_id
	}

	fn name(&self) -> &str {
		&self.name
	}
}

/// The tag forest. Top level tags hang off the synthetic [`ROOT_TAG_ID`].
#[derive(Debug, Clone, Serialize)]
pub struct TagTree {
	tree: Tree<Tag>,
}

impl Default for TagTree {
	fn default() -> Self {
		Self {
			tree: Tree::empty(ROOT_TAG_ID),
		}
	}
}

impl TagTree {
	/// Fails when there is no tag record at all; use [`TagTree::default`] for an empty
	/// forest.
	pub fn build(records: impl IntoIterator<Item = TagRecord>) -> Result<Self, Error> {
		let mut records = records.into_iter().peekable();
		if records.peek().is_none() {
			return Err(Error::TagNotFound(ROOT_TAG_ID));
		}

		let mut tree = Tree::<Tag>::build(records, ROOT_TAG_ID, |record, parent| Tag {
			full_name: parent.map_or_else(
				|| record.name.clone(),
				|parent| format!("{}{FULL_NAME_SEPARATOR}{}", parent.full_name, record.name),
			),
			id: record.id,
			parent_id: record.parent_id,
			name: record.name,
			tag_type: record.tag_type,
			children: Vec::new(),
		});
		tree.attach_children(|tag, children| tag.children = children.to_vec());

		Ok(Self { tree })
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.tree.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.tree.len() == 0
	}

	#[must_use]
	pub fn get(&self, id: TagId) -> Option<&Tag> {
		self.tree.get(id)
	}

	#[must_use]
	pub fn contains(&self, id: TagId) -> bool {
		self.tree.contains(id)
	}

	/// Top level tags ordered by name.
	#[must_use]
	pub fn roots(&self) -> Vec<&Tag> {
		self.tree.children(self.tree.root_id()).collect()
	}

	/// Top level tags with series first, then seasons, then everything else.
	#[must_use]
	pub fn roots_by_type(&self) -> Vec<&Tag> {
		let mut roots = self.roots();
		// stable, so name order is kept inside each group
		roots.sort_by_key(|tag| match tag.tag_type {
			TagType::Series => 0,
			TagType::Season => 1,
			TagType::Standard => 2,
		});
		roots
	}

	#[must_use]
	pub fn children(&self, id: TagId) -> Vec<&Tag> {
		self.tree.children(id).collect()
	}

	/// Every tag below `id`, depth first, `id` itself excluded.
	#[must_use]
	pub fn descendants(&self, id: TagId) -> Vec<&Tag> {
		self.tree.descendants(id).collect()
	}

	/// `id` followed by all of its descendants. Unknown ids have an empty subtree.
	#[must_use]
	pub fn subtree_ids(&self, id: TagId) -> Vec<TagId> {
		if !self.tree.contains(id) {
			return Vec::new();
		}

		let mut ids = vec![id];
		ids.extend(self.tree.descendant_ids(id));
		ids
	}

	#[must_use]
	pub fn find_child_by_name(&self, parent_id: TagId, name: &str) -> Option<&Tag> {
		self.tree.children(parent_id).find(|tag| tag.name == name)
	}

	/// Largest reachable tag id, or [`ROOT_TAG_ID`] for an empty forest.
	#[must_use]
	pub fn max_id(&self) -> TagId {
		self.tree
			.descendant_ids(self.tree.root_id())
			.into_iter()
			.max()
			.unwrap_or(ROOT_TAG_ID)
	}

	/// Every tag, depth first from the top level.
	pub fn iter(&self) -> impl Iterator<Item = &Tag> + '_ {
		self.tree.descendants(self.tree.root_id())
	}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;

	use pretty_assertions::assert_eq;

	fn tree() -> TagTree {
		TagTree::build(vec![
			TagRecord::new(1, 0, "Genre"),
			TagRecord::new(2, 0, "Frieren").with_type(TagType::Series),
			TagRecord::new(3, 2, "Seasons"),
			TagRecord::new(4, 3, "Season 1").with_type(TagType::Season),
			TagRecord::new(5, 3, "Season 2").with_type(TagType::Season),
			TagRecord::new(6, 0, "2024 Fall").with_type(TagType::Season),
			TagRecord::new(7, 1, "Fantasy"),
		])
		.unwrap()
	}

	#[test]
	fn full_names_follow_the_parent_chain() {
		let tags = tree();

		assert_eq!(tags.get(4).unwrap().full_name, "Frieren > Seasons > Season 1");
		assert_eq!(tags.get(1).unwrap().full_name, "Genre");
		assert_eq!(tags.get(3).unwrap().children, vec![4, 5]);
	}

	#[test]
	fn subtree_contains_the_tag_and_its_descendants() {
		let tags = tree();

		assert_eq!(tags.subtree_ids(2), vec![2, 3, 4, 5]);
		assert_eq!(tags.subtree_ids(7), vec![7]);
		assert!(tags.subtree_ids(404).is_empty());
		assert_eq!(tags.max_id(), 7);
	}

	#[test]
	fn roots_group_series_before_seasons() {
		let tags = tree();

		let names = |tags: Vec<&Tag>| tags.into_iter().map(|t| t.id).collect::<Vec<_>>();
		assert_eq!(names(tags.roots()), vec![6, 2, 1]);
		assert_eq!(names(tags.roots_by_type()), vec![2, 6, 1]);
	}

	#[test]
	fn child_lookup_by_name() {
		let tags = tree();

		assert_eq!(tags.find_child_by_name(3, "Season 2").unwrap().id, 5);
		assert!(tags.find_child_by_name(0, "Season 2").is_none());
	}

	#[test]
	fn empty_tag_table() {
		assert!(TagTree::build(Vec::new()).unwrap_err().is_not_found());

		let tags = TagTree::default();
		assert!(tags.is_empty());
		assert_eq!(tags.max_id(), ROOT_TAG_ID);
		assert!(tags.roots().is_empty());
	}
}
