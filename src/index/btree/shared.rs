//! Thread-safe handle around a [`BPlusTree`].

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::config::TreeConfig;
use crate::common::Result;

use super::node::Entry;
use super::tree::BPlusTree;
use super::value::Value;

/// A cloneable handle that serializes every operation through one mutex.
///
/// The engine is single-writer and even searches move the pager's file
/// cursor, so reads take the same lock as writes.
///
/// # Example
/// ```no_run
/// use pagetree::{SharedBPlusTree, TreeConfig, Value};
/// use std::thread;
///
/// let tree = SharedBPlusTree::open("index.db", TreeConfig::default()).unwrap();
/// let handles: Vec<_> = (0..4)
///     .map(|t| {
///         let tree = tree.clone();
///         thread::spawn(move || tree.insert(&format!("t{}", t), Value::int(t)).unwrap())
///     })
///     .collect();
/// for h in handles {
///     h.join().unwrap();
/// }
/// ```
#[derive(Clone)]
pub struct SharedBPlusTree {
    inner: Arc<Mutex<BPlusTree>>,
}

impl SharedBPlusTree {
    pub fn new(tree: BPlusTree) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tree)),
        }
    }

    /// Open (or create) and initialize a tree, then wrap it.
    pub fn open<P: AsRef<Path>>(path: P, config: TreeConfig) -> Result<Self> {
        Ok(Self::new(BPlusTree::open(path, config)?))
    }

    pub fn insert(&self, key: &str, value: Value) -> Result<()> {
        self.inner.lock().insert(key, value)
    }

    pub fn search(&self, key: &str) -> Result<Option<Value>> {
        self.inner.lock().search(key)
    }

    pub fn scan(&self) -> Result<Vec<Entry>> {
        self.inner.lock().scan()
    }

    /// Run `f` with exclusive access to the tree.
    pub fn with<R>(&self, f: impl FnOnce(&mut BPlusTree) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
