//! Rebuilds a rooted tree from flat parent-pointer rows.
//!
//! Building runs in two phases. The index phase groups rows by id and by parent id, with
//! every sibling list already ordered by name. The materialization phase then walks from
//! the synthetic root with an explicit stack, so every node is derived from an already
//! materialized parent. Nodes live in an id-keyed arena and only refer to each other by id.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

/// A flat row that names its parent by id.
pub(crate) trait TreeRecord {
	fn id(&self) -> u64;
	fn parent_id(&self) -> u64;
	fn name(&self) -> &str;

	/// Leaves never get children attached, even if some row names them as a parent.
	fn is_leaf(&self) -> bool {
		false
	}
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Tree<N> {
	root_id: u64,
	nodes: HashMap<u64, N>,
	parents: HashMap<u64, u64>,
	children: HashMap<u64, Vec<u64>>,
}

impl<N> Tree<N> {
	pub(crate) fn empty(root_id: u64) -> Self {
		Self {
			root_id,
			nodes: HashMap::new(),
			parents: HashMap::new(),
			children: HashMap::from([(root_id, Vec::new())]),
		}
	}

	/// `materialize` receives each row together with its already built parent, which is
	/// `None` for rows sitting directly under the root.
	///
	/// Rows that cannot be reached from the root (dangling parent ids, cycles, children of
	/// leaves) are left out.
	pub(crate) fn build<R: TreeRecord>(
		records: impl IntoIterator<Item = R>,
		root_id: u64,
		mut materialize: impl FnMut(R, Option<&N>) -> N,
	) -> Self {
		let mut records = records
			.into_iter()
			.filter(|record| {
				if record.id() == root_id {
					warn!(id = root_id, "Ignoring a record that uses the reserved root id");
					false
				} else {
					true
				}
			})
			.collect::<Vec<_>>();
		records.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id().cmp(&b.id())));

		let mut by_id = HashMap::with_capacity(records.len());
		let mut by_parent_id = HashMap::<_, Vec<_>>::new();
		for record in records {
			if by_id.contains_key(&record.id()) {
				warn!(id = record.id(), "Ignoring a duplicated record");
				continue;
			}
			by_parent_id
				.entry(record.parent_id())
				.or_default()
				.push(record.id());
			by_id.insert(record.id(), record);
		}

		let mut tree = Self::empty(root_id);
		let top_level = by_parent_id.remove(&root_id).unwrap_or_default();
		let mut stack = top_level.iter().rev().copied().collect::<Vec<_>>();
		tree.children.insert(root_id, top_level);

		while let Some(id) = stack.pop() {
			let Some(record) = by_id.remove(&id) else {
				continue;
			};

			let parent_id = record.parent_id();
			let children = if record.is_leaf() {
				Vec::new()
			} else {
				by_parent_id.remove(&id).unwrap_or_default()
			};
			stack.extend(children.iter().rev().copied());

			let node = materialize(record, tree.nodes.get(&parent_id));
			tree.nodes.insert(id, node);
			tree.parents.insert(id, parent_id);
			tree.children.insert(id, children);
		}

		if !by_id.is_empty() {
			debug!(
				unreachable_count = by_id.len(),
				"Dropped records that are not reachable from the root"
			);
		}

		tree
	}

	pub(crate) const fn root_id(&self) -> u64 {
		self.root_id
	}

	pub(crate) fn get(&self, id: u64) -> Option<&N> {
		self.nodes.get(&id)
	}

	pub(crate) fn contains(&self, id: u64) -> bool {
		self.nodes.contains_key(&id)
	}

	pub(crate) fn len(&self) -> usize {
		self.nodes.len()
	}

	pub(crate) fn parent_id(&self, id: u64) -> Option<u64> {
		self.parents.get(&id).copied()
	}

	/// Child ids ordered by name. Unknown ids have no children.
	pub(crate) fn child_ids(&self, id: u64) -> &[u64] {
		self.children.get(&id).map_or(&[][..], Vec::as_slice)
	}

	pub(crate) fn children(&self, id: u64) -> impl Iterator<Item = &N> + '_ {
		self.child_ids(id)
			.iter()
			.filter_map(|child_id| self.nodes.get(child_id))
	}

	/// Ids on the path from the root down to `id`, both excluded. Unknown ids yield nothing.
	pub(crate) fn ancestor_ids(&self, id: u64) -> Vec<u64> {
		let mut ancestors = Vec::new();
		let mut current = id;
		// Reachable nodes never form a cycle, so the walk ends at the root.
		while let Some(parent_id) = self.parent_id(current) {
			if parent_id == self.root_id {
				break;
			}
			ancestors.push(parent_id);
			current = parent_id;
		}
		ancestors.reverse();
		ancestors
	}

	/// Every id strictly below `id`, depth first with siblings in name order.
	pub(crate) fn descendant_ids(&self, id: u64) -> Vec<u64> {
		let mut descendants = Vec::new();
		let mut stack = self.child_ids(id).iter().rev().copied().collect::<Vec<_>>();
		while let Some(current) = stack.pop() {
			descendants.push(current);
			stack.extend(self.child_ids(current).iter().rev().copied());
		}
		descendants
	}

	pub(crate) fn descendants(&self, id: u64) -> impl Iterator<Item = &N> + '_ {
		self.descendant_ids(id)
			.into_iter()
			.filter_map(|descendant_id| self.nodes.get(&descendant_id))
	}

	/// Gives every node a look at its ordered child ids, after the whole tree is built.
	pub(crate) fn attach_children(&mut self, mut attach: impl FnMut(&mut N, &[u64])) {
		for (id, node) in &mut self.nodes {
			attach(node, self.children.get(id).map_or(&[][..], Vec::as_slice));
		}
	}
}
