//! pagetree - A single-writer, disk-backed B+ tree keyed by strings.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                        pagetree                         │
//! ├─────────────────────────────────────────────────────────┤
//! │  ┌───────────────────────────────────────────────────┐  │
//! │  │            Index Layer (index/btree/)             │  │
//! │  │   BPlusTree: insert, search, split + promotion    │  │
//! │  │   TreeNode + NodeCodec + Value                    │  │
//! │  └───────────────────────────────────────────────────┘  │
//! │                           ↓                             │
//! │  ┌───────────────────────────────────────────────────┐  │
//! │  │              Codec Layer (codec/)                 │  │
//! │  │      Fixed-width little-endian primitives         │  │
//! │  └───────────────────────────────────────────────────┘  │
//! │                           ↓                             │
//! │  ┌───────────────────────────────────────────────────┐  │
//! │  │             Storage Layer (storage/)              │  │
//! │  │        Pager + Page + IoStats (4 KiB pages)       │  │
//! │  └───────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Error, config)
//! - [`storage`] - Page-granular file access
//! - [`codec`] - Binary encoding of primitive values
//! - [`index`] - The B+ tree itself
//! - [`shell`] - Line commands used by the `pagetree` binary
//!
//! # Quick Start
//! ```no_run
//! use pagetree::{BPlusTree, TreeConfig, Value};
//!
//! let mut tree = BPlusTree::open("my_index.db", TreeConfig::default()).unwrap();
//! tree.insert("apple", Value::int(3)).unwrap();
//! tree.insert("pear", Value::string("ripe")).unwrap();
//!
//! assert_eq!(tree.search("apple").unwrap(), Some(Value::int(3)));
//! tree.close().unwrap();
//! ```

pub mod codec;
pub mod common;
pub mod index;
pub mod shell;
pub mod storage;

pub use common::config::{TreeConfig, PAGE_SIZE};
pub use common::{Error, ErrorKind, PageId, Result};

pub use index::btree::{BPlusTree, SharedBPlusTree, TreeStats, Value, ValueKind};
pub use storage::{Page, Pager};
