//! In-memory model of one tree node.
//!
//! A [`TreeNode`] is the decoded content of a single page. Nodes refer to
//! each other only by [`PageId`]; the parent owns no child objects, and
//! following any reference means asking the pager for that page.

use crate::common::{Error, PageId, Result};

use super::value::Value;

/// An ordered (key, value) pair.
///
/// Internal nodes reuse `Entry` for their separator keys and leave the
/// value at its default.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: Value,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// A routing entry for an internal node.
    pub fn separator(key: impl Into<String>) -> Self {
        Self::new(key, Value::default())
    }
}

/// What [`TreeNode::upsert`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A new entry was added; the node grew by one.
    Inserted,
    /// An existing key had its value replaced in place.
    Replaced,
}

/// Decoded content of a node page.
///
/// # Invariants (for any node that is persisted)
/// - `entries` strictly ascending by key, at most `max_entries` long
/// - leaf: `children` is empty
/// - internal with `k` entries: exactly `k + 1` children, where
///   `children[i]` covers keys `< entries[i].key` (and `>= entries[i-1].key`)
///   and `children[k]` covers keys `>= entries[k-1].key`
/// - `parent` is [`PageId::NONE`] only for the root
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    page_id: PageId,
    is_leaf: bool,
    entries: Vec<Entry>,
    children: Vec<PageId>,
    parent: PageId,
    next: PageId,
}

impl TreeNode {
    /// An empty leaf living at `page_id`.
    pub fn new_leaf(page_id: PageId) -> Self {
        Self {
            page_id,
            is_leaf: true,
            entries: Vec::new(),
            children: Vec::new(),
            parent: PageId::NONE,
            next: PageId::NONE,
        }
    }

    /// An internal node with one separator and two children.
    ///
    /// This is the shape of a freshly grown root.
    pub fn new_root(page_id: PageId, separator: String, left: PageId, right: PageId) -> Self {
        Self {
            page_id,
            is_leaf: false,
            entries: vec![Entry::separator(separator)],
            children: vec![left, right],
            parent: PageId::NONE,
            next: PageId::NONE,
        }
    }

    /// Assemble a node from decoded parts.
    pub fn from_parts(
        page_id: PageId,
        is_leaf: bool,
        entries: Vec<Entry>,
        children: Vec<PageId>,
        parent: PageId,
        next: PageId,
    ) -> Self {
        Self {
            page_id,
            is_leaf,
            entries,
            children,
            parent,
            next,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn children(&self) -> &[PageId] {
        &self.children
    }

    pub fn parent(&self) -> PageId {
        self.parent
    }

    pub fn next(&self) -> PageId {
        self.next
    }

    pub fn set_parent(&mut self, parent: PageId) {
        self.parent = parent;
    }

    #[cfg(test)]
    fn set_next(&mut self, next: PageId) {
        self.next = next;
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_root(&self) -> bool {
        !self.parent.is_node()
    }

    /// True when the node holds more entries than may be persisted.
    pub fn is_overfull(&self, max_entries: usize) -> bool {
        self.entries.len() > max_entries
    }

    /// Index of the first entry whose key is strictly greater than `key`.
    ///
    /// This is the child slot to descend into for an internal node, and
    /// one past the candidate match for a leaf.
    pub fn upper_bound(&self, key: &str) -> usize {
        self.entries.partition_point(|e| e.key.as_str() <= key)
    }

    /// Child page that covers `key`.
    ///
    /// # Errors
    /// Returns `Error::System` if the node has no child at the computed
    /// slot (a leaf, or a corrupted internal node).
    pub fn child_for(&self, key: &str) -> Result<PageId> {
        let idx = self.upper_bound(key);
        self.children.get(idx).copied().ok_or_else(|| {
            Error::System(format!(
                "child index {} out of bounds for {} ({} children) looking up {:?}",
                idx,
                self.page_id,
                self.children.len(),
                key
            ))
        })
    }

    /// Value stored under `key` in this leaf.
    pub fn find(&self, key: &str) -> Option<&Value> {
        let idx = self.upper_bound(key);
        match idx.checked_sub(1).map(|i| &self.entries[i]) {
            Some(entry) if entry.key == key => Some(&entry.value),
            _ => None,
        }
    }

    /// Insert an entry at its sorted position, or replace the value of an
    /// existing entry with the same key.
    pub fn upsert(&mut self, entry: Entry) -> Upsert {
        match self
            .entries
            .binary_search_by(|e| e.key.as_str().cmp(entry.key.as_str()))
        {
            Ok(idx) => {
                self.entries[idx].value = entry.value;
                Upsert::Replaced
            }
            Err(idx) => {
                self.entries.insert(idx, entry);
                Upsert::Inserted
            }
        }
    }

    /// Record a child split in this internal node.
    ///
    /// `left` must already be a child of this node; `separator` is inserted
    /// at its sorted position and `right` becomes the child immediately
    /// after `left`.
    ///
    /// # Errors
    /// Returns `Error::System` when called on a leaf or when `left` is not
    /// the child that covers `separator`.
    pub fn insert_separator(&mut self, separator: String, left: PageId, right: PageId) -> Result<()> {
        if self.is_leaf {
            return Err(Error::System(format!(
                "insert_separator called on leaf {}",
                self.page_id
            )));
        }
        let idx = self.upper_bound(&separator);
        if self.children.get(idx) != Some(&left) {
            return Err(Error::System(format!(
                "{} expected child {} at slot {} for separator {:?}, found {:?}",
                self.page_id,
                left,
                idx,
                separator,
                self.children.get(idx)
            )));
        }
        self.entries.insert(idx, Entry::separator(separator));
        self.children.insert(idx + 1, right);
        Ok(())
    }

    /// Split this node in two, keeping the lower half.
    ///
    /// The upper half moves into a new node at `right_page` that shares this
    /// node's parent. Returns the key to promote into the parent and the new
    /// right node.
    ///
    /// - Leaf: `entries[..mid]` stay, `entries[mid..]` move, and the first
    ///   moved key is *copied* up. The leaf chain is relinked through the
    ///   new node.
    /// - Internal: `entries[..mid]` and `children[..=mid]` stay,
    ///   `entries[mid+1..]` and `children[mid+1..]` move, and `entries[mid]`
    ///   is *removed* and promoted.
    ///
    /// `mid` is `len / 2`.
    ///
    /// # Errors
    /// Returns `Error::System` if the node has fewer than two entries (a
    /// leaf) or three entries (internal), or an internal node's children do
    /// not match its entries.
    pub fn split(&mut self, right_page: PageId) -> Result<(String, TreeNode)> {
        let mid = self.entries.len() / 2;

        if self.is_leaf {
            if self.entries.len() < 2 {
                return Err(Error::System(format!(
                    "cannot split leaf {} with {} entries",
                    self.page_id,
                    self.entries.len()
                )));
            }
            let upper = self.entries.split_off(mid);
            let promoted = upper[0].key.clone();

            let mut right = TreeNode::new_leaf(right_page);
            right.entries = upper;
            right.parent = self.parent;
            right.next = self.next;
            self.next = right_page;

            return Ok((promoted, right));
        }

        if self.entries.len() < 3 || self.children.len() != self.entries.len() + 1 {
            return Err(Error::System(format!(
                "cannot split internal {} with {} entries and {} children",
                self.page_id,
                self.entries.len(),
                self.children.len()
            )));
        }
        let upper_entries = self.entries.split_off(mid + 1);
        let upper_children = self.children.split_off(mid + 1);
        let promoted = self
            .entries
            .pop()
            .map(|e| e.key)
            .ok_or_else(|| Error::System(format!("{} lost its middle entry", self.page_id)))?;

        let right = TreeNode {
            page_id: right_page,
            is_leaf: false,
            entries: upper_entries,
            children: upper_children,
            parent: self.parent,
            next: PageId::NONE,
        };
        Ok((promoted, right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_with(page: u32, keys: &[&str]) -> TreeNode {
        let mut node = TreeNode::new_leaf(PageId::new(page));
        for (i, key) in keys.iter().enumerate() {
            node.upsert(Entry::new(*key, Value::int(i as i64 + 1)));
        }
        node
    }

    fn internal_with(page: u32, keys: &[&str], children: &[u32]) -> TreeNode {
        TreeNode::from_parts(
            PageId::new(page),
            false,
            keys.iter().map(|k| Entry::separator(*k)).collect(),
            children.iter().copied().map(PageId::new).collect(),
            PageId::NONE,
            PageId::NONE,
        )
    }

    fn keys(node: &TreeNode) -> Vec<&str> {
        node.entries().iter().map(|e| e.key.as_str()).collect()
    }

    #[test]
    fn test_upsert_keeps_order() {
        let node = leaf_with(1, &["d", "b", "a", "c"]);
        assert_eq!(keys(&node), ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let mut node = leaf_with(1, &["x"]);
        assert_eq!(node.upsert(Entry::new("x", Value::int(20))), Upsert::Replaced);
        assert_eq!(node.len(), 1);
        assert_eq!(node.find("x"), Some(&Value::int(20)));
    }

    #[test]
    fn test_find_in_leaf() {
        let node = leaf_with(1, &["b", "d"]);
        assert!(node.find("b").is_some());
        assert!(node.find("a").is_none());
        assert!(node.find("c").is_none());
        assert!(node.find("e").is_none());
    }

    #[test]
    fn test_child_routing() {
        let node = internal_with(1, &["c", "f"], &[10, 11, 12]);
        assert_eq!(node.child_for("a").unwrap(), PageId::new(10));
        assert_eq!(node.child_for("c").unwrap(), PageId::new(11));
        assert_eq!(node.child_for("d").unwrap(), PageId::new(11));
        assert_eq!(node.child_for("f").unwrap(), PageId::new(12));
        assert_eq!(node.child_for("z").unwrap(), PageId::new(12));
    }

    #[test]
    fn test_child_for_out_of_bounds() {
        let node = leaf_with(1, &["a"]);
        assert!(matches!(node.child_for("b"), Err(Error::System(_))));
    }

    #[test]
    fn test_overfull() {
        let node = leaf_with(1, &["a", "b", "c", "d"]);
        assert!(!node.is_overfull(4));
        assert!(node.is_overfull(3));
    }

    #[test]
    fn test_leaf_split_copies_first_upper_key() {
        let mut node = leaf_with(1, &["a", "b", "c", "d", "e"]);
        node.set_parent(PageId::new(9));
        node.set_next(PageId::new(30));

        let (promoted, right) = node.split(PageId::new(2)).unwrap();

        assert_eq!(promoted, "c");
        assert_eq!(keys(&node), ["a", "b"]);
        assert_eq!(keys(&right), ["c", "d", "e"]);
        assert_eq!(right.parent(), PageId::new(9));
        assert_eq!(node.next(), PageId::new(2));
        assert_eq!(right.next(), PageId::new(30));
        assert!(right.is_leaf());
        assert!(right.children().is_empty());
    }

    #[test]
    fn test_internal_split_moves_middle_up() {
        let mut node = internal_with(1, &["b", "d", "f", "h", "j"], &[10, 11, 12, 13, 14, 15]);

        let (promoted, right) = node.split(PageId::new(2)).unwrap();

        assert_eq!(promoted, "f");
        assert_eq!(keys(&node), ["b", "d"]);
        assert_eq!(node.children(), [10, 11, 12].map(PageId::new));
        assert_eq!(keys(&right), ["h", "j"]);
        assert_eq!(right.children(), [13, 14, 15].map(PageId::new));
        assert!(!right.is_leaf());
    }

    #[test]
    fn test_internal_split_even_count() {
        let mut node = internal_with(1, &["b", "d", "f", "h"], &[10, 11, 12, 13, 14]);

        let (promoted, right) = node.split(PageId::new(2)).unwrap();

        assert_eq!(promoted, "f");
        assert_eq!(keys(&node), ["b", "d"]);
        assert_eq!(keys(&right), ["h"]);
        assert_eq!(node.children().len(), node.len() + 1);
        assert_eq!(right.children().len(), right.len() + 1);
    }

    #[test]
    fn test_split_rejects_tiny_nodes() {
        let mut leaf = leaf_with(1, &["a"]);
        assert!(leaf.split(PageId::new(2)).is_err());

        let mut internal = internal_with(1, &["a", "b"], &[3, 4, 5]);
        assert!(internal.split(PageId::new(2)).is_err());
    }

    #[test]
    fn test_insert_separator_places_right_after_left() {
        let mut node = internal_with(1, &["m"], &[10, 11]);

        node.insert_separator("t".to_string(), PageId::new(11), PageId::new(12))
            .unwrap();
        node.insert_separator("c".to_string(), PageId::new(10), PageId::new(13))
            .unwrap();

        assert_eq!(keys(&node), ["c", "m", "t"]);
        assert_eq!(node.children(), [10, 13, 11, 12].map(PageId::new));
    }

    #[test]
    fn test_insert_separator_checks_left_child() {
        let mut node = internal_with(1, &["m"], &[10, 11]);
        let result = node.insert_separator("c".to_string(), PageId::new(11), PageId::new(12));
        assert!(matches!(result, Err(Error::System(_))));

        let mut leaf = leaf_with(1, &["a"]);
        assert!(leaf
            .insert_separator("b".to_string(), PageId::new(1), PageId::new(2))
            .is_err());
    }

    #[test]
    fn test_new_root_shape() {
        let root = TreeNode::new_root(PageId::new(5), "c".to_string(), PageId::new(1), PageId::new(2));
        assert!(root.is_root());
        assert!(!root.is_leaf());
        assert_eq!(root.len(), 1);
        assert_eq!(root.children().len(), 2);
    }
}
