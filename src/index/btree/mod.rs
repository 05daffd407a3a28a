//! Disk-backed B+ tree.
//!
//! # Layout
//! ```text
//! page 0            superblock: root page id (u32 LE), max_entries (u32 LE),
//!                   rest zero
//! page 1..N         one encoded TreeNode per page
//! ```
//! Internal nodes hold `entries + 1` child page ids. Leaves hold the data
//! and are linked left-to-right through `next`.
//!
//! # Components
//! - [`BPlusTree`] - Insert, search, scans and structure checks
//! - [`TreeNode`] - In-memory node with sorted entries and split logic
//! - [`NodeCodec`] - Node <-> page bytes
//! - [`Value`] - Entry payload
//! - [`SharedBPlusTree`] - Mutex-guarded handle for multi-threaded callers

mod codec;
mod node;
mod shared;
mod tree;
mod value;

pub use codec::NodeCodec;
pub use node::{Entry, TreeNode, Upsert};
pub use shared::SharedBPlusTree;
pub use tree::{BPlusTree, TreeStats};
pub use value::{Value, ValueKind};
