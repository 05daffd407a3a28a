//! Storage layer - disk I/O and the page unit.
//!
//! This module handles persistent storage:
//! - [`Pager`] - Page-granular file I/O and allocation
//! - [`Page`] - The 4KB buffer every read and write moves
//! - [`IoStats`] - Counters for the I/O performed

mod page;
mod pager;
mod stats;

pub use page::Page;
pub use pager::Pager;
pub use stats::{IoStats, IoStatsSnapshot};
