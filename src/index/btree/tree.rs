//! The B+ tree engine.
//!
//! [`BPlusTree`] drives the [`Pager`] and [`NodeCodec`] to implement insert,
//! search, and node splitting with promotion. All tree state lives in page
//! contents; the engine only caches the root page id, which it keeps in
//! lock-step with the superblock.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, info};

use crate::codec::binary;
use crate::common::config::TreeConfig;
use crate::common::{Error, PageId, Result};
use crate::storage::{IoStatsSnapshot, Page, Pager};

use super::codec::NodeCodec;
use super::node::{Entry, TreeNode, Upsert};
use super::value::Value;

/// A disk-backed B+ tree mapping string keys to [`Value`]s.
///
/// # Lifecycle
/// ```text
/// Pager::open ──▶ BPlusTree::new ──▶ init() ──▶ insert / search ... ──▶ close()
/// ```
/// [`BPlusTree::open`] bundles the first three steps.
///
/// # Durability
/// Every node touched by an operation is encoded, written and synced before
/// the operation returns. A split chain is written page by page, so a crash
/// part-way through can leave a child whose parent never received the
/// separator, or a new root the superblock does not yet point at. There is
/// no recovery for that.
///
/// # Concurrency
/// Single writer. Wrap the tree in a
/// [`SharedBPlusTree`](super::SharedBPlusTree) to share it between threads.
///
/// # Example
/// ```no_run
/// use pagetree::{BPlusTree, TreeConfig, Value};
///
/// let mut tree = BPlusTree::open("index.db", TreeConfig::default()).unwrap();
/// tree.insert("alpha", Value::int(1)).unwrap();
/// assert_eq!(tree.search("alpha").unwrap(), Some(Value::int(1)));
/// assert_eq!(tree.search("beta").unwrap(), None);
/// tree.close().unwrap();
/// ```
pub struct BPlusTree {
    /// Current root; [`PageId::NONE`] until `init` runs.
    root: PageId,
    pager: Pager,
    codec: NodeCodec,
    config: TreeConfig,
}

impl BPlusTree {
    /// Wrap a pager. The tree is unusable until [`BPlusTree::init`] runs.
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` if `config` fails
    /// [`TreeConfig::validate`].
    pub fn new(pager: Pager, config: TreeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            root: PageId::NONE,
            pager,
            codec: NodeCodec::new(),
            config,
        })
    }

    /// Open (or create) the file at `path` and initialize the tree.
    pub fn open<P: AsRef<Path>>(path: P, config: TreeConfig) -> Result<Self> {
        let pager = Pager::open(path)?;
        let mut tree = Self::new(pager, config)?;
        tree.init()?;
        Ok(tree)
    }

    /// Load the root from the superblock, bootstrapping an empty tree if the
    /// file has none.
    ///
    /// On an empty file this allocates the superblock (page 0) and an empty
    /// root leaf, writes both, and points the superblock at the leaf.
    ///
    /// # Errors
    /// Returns `Error::Init` if the file records a different `max_entries`
    /// than this tree's config, or the superblock names a non-root node.
    pub fn init(&mut self) -> Result<()> {
        if self.pager.num_pages() == 0 {
            let superblock = self.pager.allocate_page()?;
            if superblock != PageId::SUPERBLOCK {
                return Err(Error::System(format!(
                    "superblock allocated at {} instead of page 0",
                    superblock
                )));
            }
        }

        let page = self.pager.read_page(PageId::SUPERBLOCK)?;
        let root = PageId::new(binary::decode::<u32>(&page.as_slice()[..4])?);
        let stored_fanout = binary::decode::<u32>(&page.as_slice()[4..8])?;

        if !root.is_node() {
            let leaf_id = self.pager.allocate_page()?;
            self.save_node(&TreeNode::new_leaf(leaf_id))?;
            self.update_root(leaf_id)?;
            info!(path = %self.pager.path().display(), root = leaf_id.0, "bootstrapped empty tree");
            return Ok(());
        }

        if stored_fanout != 0 && stored_fanout as usize != self.config.max_entries {
            return Err(Error::Init(format!(
                "file was built with max_entries = {}, opened with {}",
                stored_fanout, self.config.max_entries
            )));
        }

        let node = self.load_node(root)?;
        if !node.is_root() {
            return Err(Error::Init(format!(
                "superblock points at {} whose parent is {}",
                root,
                node.parent()
            )));
        }
        if stored_fanout == 0 {
            // Superblock predates the recorded fanout.
            if node.is_overfull(self.config.max_entries) {
                return Err(Error::Init(format!(
                    "root {} holds {} entries, more than max_entries = {}",
                    root,
                    node.len(),
                    self.config.max_entries
                )));
            }
            self.update_root(root)?;
        }
        self.root = root;
        info!(path = %self.pager.path().display(), root = root.0, "loaded tree");
        Ok(())
    }

    /// Insert `key`, or replace its value if it is already present.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if the tree is not initialized, the key is
    ///   empty, or the key or string payload exceeds the configured limits
    /// - any storage or codec error hit along the way
    pub fn insert(&mut self, key: &str, value: Value) -> Result<()> {
        guarded("insert", || self.insert_inner(key, value))
    }

    /// Look `key` up. `Ok(None)` means the key is absent.
    ///
    /// # Errors
    /// Returns `Error::Init` if the tree is not initialized, or any read or
    /// decode error. Nothing is retried.
    pub fn search(&mut self, key: &str) -> Result<Option<Value>> {
        guarded("search", || {
            let leaf = self.find_leaf(key)?;
            Ok(leaf.find(key).cloned())
        })
    }

    /// Deletion is not implemented.
    ///
    /// # Errors
    /// Always returns `Error::NotSupported`.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        Err(Error::NotSupported(format!(
            "delete of {:?}: deletion and rebalancing are not implemented",
            key
        )))
    }

    /// Every entry in ascending key order, read along the leaf chain.
    pub fn scan(&mut self) -> Result<Vec<Entry>> {
        guarded("scan", || {
            let first = self.leftmost_leaf()?;
            self.collect_from(first, None, None)
        })
    }

    /// Entries with `start <= key < end`, in ascending key order.
    pub fn range(&mut self, start: &str, end: &str) -> Result<Vec<Entry>> {
        guarded("range", || {
            if start >= end {
                return Ok(Vec::new());
            }
            let first = self.find_leaf(start)?;
            self.collect_from(first, Some(start), Some(end))
        })
    }

    /// Walk the whole tree and verify its structural invariants.
    ///
    /// Checks, for every node: ascending unique keys, the entry bound,
    /// children count against entries, keys inside the separator bounds of
    /// the parent, the `parent` back-reference, uniform leaf depth, and that
    /// the leaf chain visits leaves in key order.
    ///
    /// # Errors
    /// Returns `Error::System` describing the first violation found.
    pub fn check_structure(&mut self) -> Result<TreeStats> {
        self.require_root()?;

        struct Frame {
            page: PageId,
            parent: PageId,
            depth: usize,
            lower: Option<String>,
            upper: Option<String>,
        }

        let mut stats = TreeStats::default();
        let mut leaf_depth = None;
        let mut leaves: Vec<(PageId, PageId)> = Vec::new();
        let mut stack = vec![Frame {
            page: self.root,
            parent: PageId::NONE,
            depth: 1,
            lower: None,
            upper: None,
        }];

        while let Some(frame) = stack.pop() {
            let node = self.load_node(frame.page)?;
            let id = node.page_id();

            if node.parent() != frame.parent {
                return Err(Error::System(format!(
                    "{} records parent {} but is referenced by {}",
                    id,
                    node.parent(),
                    frame.parent
                )));
            }
            if node.len() > self.config.max_entries {
                return Err(Error::System(format!(
                    "{} holds {} entries, max is {}",
                    id,
                    node.len(),
                    self.config.max_entries
                )));
            }
            for pair in node.entries().windows(2) {
                if pair[0].key >= pair[1].key {
                    return Err(Error::System(format!(
                        "{} keys out of order: {:?} before {:?}",
                        id, pair[0].key, pair[1].key
                    )));
                }
            }
            if let (Some(first), Some(lower)) = (node.entries().first(), &frame.lower) {
                if first.key < *lower {
                    return Err(Error::System(format!(
                        "{} key {:?} is below its separator {:?}",
                        id, first.key, lower
                    )));
                }
            }
            if let (Some(last), Some(upper)) = (node.entries().last(), &frame.upper) {
                if last.key >= *upper {
                    return Err(Error::System(format!(
                        "{} key {:?} is not below its separator {:?}",
                        id, last.key, upper
                    )));
                }
            }

            if node.is_leaf() {
                if !node.children().is_empty() {
                    return Err(Error::System(format!("leaf {} has children", id)));
                }
                match leaf_depth {
                    None => leaf_depth = Some(frame.depth),
                    Some(depth) if depth != frame.depth => {
                        return Err(Error::System(format!(
                            "leaf {} at depth {}, other leaves at depth {}",
                            id, frame.depth, depth
                        )));
                    }
                    Some(_) => {}
                }
                stats.leaf_nodes += 1;
                stats.entries += node.len();
                leaves.push((id, node.next()));
                continue;
            }

            if node.is_empty() || node.children().len() != node.len() + 1 {
                return Err(Error::System(format!(
                    "internal {} has {} entries and {} children",
                    id,
                    node.len(),
                    node.children().len()
                )));
            }
            stats.internal_nodes += 1;

            // Push right-to-left so leaves are visited in key order.
            for (i, &child) in node.children().iter().enumerate().rev() {
                let lower = if i == 0 {
                    frame.lower.clone()
                } else {
                    Some(node.entries()[i - 1].key.clone())
                };
                let upper = node
                    .entries()
                    .get(i)
                    .map(|e| e.key.clone())
                    .or_else(|| frame.upper.clone());
                stack.push(Frame {
                    page: child,
                    parent: id,
                    depth: frame.depth + 1,
                    lower,
                    upper,
                });
            }
        }

        for (i, &(leaf, next)) in leaves.iter().enumerate() {
            let expected = leaves.get(i + 1).map_or(PageId::NONE, |&(id, _)| id);
            if next != expected {
                return Err(Error::System(format!(
                    "leaf {} links to {}, expected {}",
                    leaf, next, expected
                )));
            }
        }

        stats.height = leaf_depth.unwrap_or(0);
        Ok(stats)
    }

    /// Number of levels from the root to the leaves.
    pub fn height(&mut self) -> Result<usize> {
        self.require_root()?;
        let mut height = 1;
        let mut node = self.load_node(self.root)?;
        while !node.is_leaf() {
            let child = first_child(&node)?;
            node = self.load_node(child)?;
            height += 1;
        }
        Ok(height)
    }

    /// Current root page.
    pub fn root_page_id(&self) -> PageId {
        self.root
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// I/O performed through this tree's pager so far.
    pub fn io_stats(&self) -> IoStatsSnapshot {
        self.pager.stats().snapshot()
    }

    /// Read and decode the node stored at `page_id`.
    ///
    /// # Errors
    /// - `Error::InvalidInput` for page 0
    /// - `Error::Deserialization` if the page does not hold the node it
    ///   should (its persisted page id differs)
    pub fn load_node(&mut self, page_id: PageId) -> Result<TreeNode> {
        if !page_id.is_node() {
            return Err(Error::InvalidInput(
                "cannot load a node from page 0".to_string(),
            ));
        }
        let page = self.pager.read_page(page_id)?;
        let node = self.codec.decode(page.as_slice())?;
        if node.page_id() != page_id {
            return Err(Error::Deserialization(format!(
                "{} holds a node for {}",
                page_id,
                node.page_id()
            )));
        }
        Ok(node)
    }

    /// Flush and close the backing file.
    pub fn close(self) -> Result<()> {
        info!(path = %self.pager.path().display(), root = self.root.0, "closing tree");
        self.pager.close()
    }

    fn insert_inner(&mut self, key: &str, value: Value) -> Result<()> {
        if !self.root.is_node() {
            return Err(Error::InvalidInput(format!(
                "tree is empty, cannot insert key {:?}",
                key
            )));
        }
        self.validate_entry(key, &value)?;

        let mut leaf = self.find_leaf(key)?;
        match leaf.upsert(Entry::new(key, value)) {
            Upsert::Replaced => return self.save_node(&leaf),
            Upsert::Inserted if !leaf.is_overfull(self.config.max_entries) => {
                return self.save_node(&leaf)
            }
            Upsert::Inserted => {}
        }

        let right_id = self.pager.allocate_page()?;
        let (separator, right) = leaf.split(right_id)?;
        debug!(
            left = leaf.page_id().0,
            right = right_id.0,
            separator = %separator,
            "split leaf"
        );
        self.save_node(&leaf)?;
        self.save_node(&right)?;

        self.promote(leaf, right, separator)
    }

    /// Push `separator` into the parent of a freshly split pair, splitting
    /// ancestors as needed. Iterates upward until a parent absorbs the key or
    /// a new root is grown.
    fn promote(
        &mut self,
        mut left: TreeNode,
        mut right: TreeNode,
        mut separator: String,
    ) -> Result<()> {
        loop {
            if left.is_root() {
                let root_id = self.pager.allocate_page()?;
                let new_root =
                    TreeNode::new_root(root_id, separator, left.page_id(), right.page_id());
                left.set_parent(root_id);
                right.set_parent(root_id);

                self.save_node(&new_root)?;
                self.save_node(&left)?;
                self.save_node(&right)?;
                self.update_root(root_id)?;
                info!(root = root_id.0, "grew new root");
                return Ok(());
            }

            let mut parent = self.load_node(left.parent())?;
            parent.insert_separator(separator, left.page_id(), right.page_id())?;
            if !parent.is_overfull(self.config.max_entries) {
                return self.save_node(&parent);
            }

            let new_id = self.pager.allocate_page()?;
            let (promoted, new_right) = parent.split(new_id)?;
            debug!(
                left = parent.page_id().0,
                right = new_id.0,
                separator = %promoted,
                "split internal node"
            );
            self.save_node(&parent)?;
            self.save_node(&new_right)?;

            for &child in new_right.children() {
                let mut node = self.load_node(child)?;
                node.set_parent(new_id);
                self.save_node(&node)?;
            }

            left = parent;
            right = new_right;
            separator = promoted;
        }
    }

    fn validate_entry(&self, key: &str, value: &Value) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidInput("key must not be empty".to_string()));
        }
        if key.len() > self.config.max_key_size {
            return Err(Error::InvalidInput(format!(
                "key of {} bytes exceeds the {}-byte limit",
                key.len(),
                self.config.max_key_size
            )));
        }
        if value.string_value().len() > self.config.max_string_value_size {
            return Err(Error::InvalidInput(format!(
                "string value of {} bytes exceeds the {}-byte limit",
                value.string_value().len(),
                self.config.max_string_value_size
            )));
        }
        Ok(())
    }

    fn require_root(&self) -> Result<()> {
        if self.root.is_node() {
            Ok(())
        } else {
            Err(Error::Init("root page id is not set".to_string()))
        }
    }

    /// Descend from the root to the leaf covering `key`.
    fn find_leaf(&mut self, key: &str) -> Result<TreeNode> {
        self.require_root()?;
        let mut current = self.root;
        let mut depth = 0u32;
        loop {
            let node = self.load_node(current)?;
            if node.is_leaf() {
                return Ok(node);
            }
            current = node.child_for(key)?;
            depth += 1;
            if depth > self.pager.num_pages() {
                return Err(Error::System(format!(
                    "descent for {:?} exceeded {} levels",
                    key, depth
                )));
            }
        }
    }

    fn leftmost_leaf(&mut self) -> Result<TreeNode> {
        self.require_root()?;
        let mut node = self.load_node(self.root)?;
        let mut depth = 0u32;
        while !node.is_leaf() {
            let child = first_child(&node)?;
            node = self.load_node(child)?;
            depth += 1;
            if depth > self.pager.num_pages() {
                return Err(Error::System("leftmost descent did not terminate".to_string()));
            }
        }
        Ok(node)
    }

    /// Follow the leaf chain from `leaf`, keeping entries in `[start, end)`.
    fn collect_from(
        &mut self,
        mut leaf: TreeNode,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<Entry>> {
        let mut out = Vec::new();
        let mut hops = 0u32;
        loop {
            for entry in leaf.entries() {
                if start.is_some_and(|s| entry.key.as_str() < s) {
                    continue;
                }
                if end.is_some_and(|e| entry.key.as_str() >= e) {
                    return Ok(out);
                }
                out.push(entry.clone());
            }
            if !leaf.next().is_node() {
                return Ok(out);
            }
            hops += 1;
            if hops > self.pager.num_pages() {
                return Err(Error::System("leaf chain contains a cycle".to_string()));
            }
            leaf = self.load_node(leaf.next())?;
        }
    }

    /// Encode, write and sync one node.
    fn save_node(&mut self, node: &TreeNode) -> Result<()> {
        if node.is_overfull(self.config.max_entries) {
            return Err(Error::System(format!(
                "refusing to persist {} with {} entries (max {})",
                node.page_id(),
                node.len(),
                self.config.max_entries
            )));
        }
        let page = self.codec.encode_page(node)?;
        self.pager.write_page(node.page_id(), &page)?;
        self.pager.sync()
    }

    /// Point the superblock at `new_root`, record the fanout, and refresh
    /// the cached root.
    fn update_root(&mut self, new_root: PageId) -> Result<()> {
        if !new_root.is_node() {
            return Err(Error::InvalidInput("new root page id is zero".to_string()));
        }
        let fanout = u32::try_from(self.config.max_entries).map_err(|_| {
            Error::InvalidInput(format!(
                "max_entries {} does not fit in u32",
                self.config.max_entries
            ))
        })?;
        let mut bytes = binary::encode(new_root.0);
        binary::encode_into(fanout, &mut bytes);
        let page = Page::from_bytes(&bytes)?;
        self.pager.write_page(PageId::SUPERBLOCK, &page)?;
        self.pager.sync()?;
        self.root = new_root;
        debug!(root = new_root.0, "superblock updated");
        Ok(())
    }
}

fn first_child(node: &TreeNode) -> Result<PageId> {
    node.children().first().copied().ok_or_else(|| {
        Error::System(format!("internal {} has no children", node.page_id()))
    })
}

/// Run `op`, turning a panic into `Error::Panic`.
fn guarded<T>(op: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            Err(Error::Panic(format!("{}: {}", op, message)))
        }
    }
}

/// Shape summary returned by [`BPlusTree::check_structure`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Levels from root to leaves (1 for a lone root leaf).
    pub height: usize,
    pub internal_nodes: usize,
    pub leaf_nodes: usize,
    /// Entries stored across all leaves.
    pub entries: usize,
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TreeStats {{ height: {}, internal: {}, leaves: {}, entries: {} }}",
            self.height, self.internal_nodes, self.leaf_nodes, self.entries
        )
    }
}
