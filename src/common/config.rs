//! Configuration constants and tree tuning for pagetree.

use crate::common::{Error, Result};

/// Size of a page in bytes (4KB).
///
/// Every page of the backing file, the superblock included, is exactly this
/// size. Page N lives at file offset `N × PAGE_SIZE`.
pub const PAGE_SIZE: usize = 4096;

/// Page 0 holds the superblock: the current root `PageId` as a
/// little-endian u32 in its first 4 bytes, then the `max_entries` the tree
/// was built with (u32, 0 if not yet recorded).
pub const SUPERBLOCK_PAGE_ID: u32 = 0;

/// Maximum key length in bytes.
pub const MAX_KEY_SIZE: usize = 64;

/// Maximum length in bytes of a value's string field.
pub const MAX_STRING_VALUE_SIZE: usize = 64;

/// Fixed node header: page id (4) + leaf flag (1) + entry count (2) +
/// next (4) + parent (4).
pub const NODE_HEADER_SIZE: usize = 15;

/// Per-entry bytes that do not depend on key or string length:
/// key length (2) + string length (2) + bool (1) + f32 (4) + i64 (8).
pub const ENTRY_FIXED_SIZE: usize = 17;

/// Size of one encoded child reference.
pub const CHILD_REF_SIZE: usize = 4;

/// Maximum number of entries a persisted node may hold.
///
/// With 64-byte keys and 64-byte strings a full internal node encodes to
/// `15 + 27 × 145 + 28 × 4 = 4042` bytes, which fits in one page. One more
/// entry would not.
pub const MAX_ENTRIES: usize = 27;

/// Smallest fanout the split algorithm supports.
pub const MIN_ENTRIES: usize = 3;

/// Worst-case encoded size of a node with `entries` entries.
pub const fn max_node_size(entries: usize, max_key: usize, max_string: usize) -> usize {
    NODE_HEADER_SIZE
        + entries * (ENTRY_FIXED_SIZE + max_key + max_string)
        + (entries + 1) * CHILD_REF_SIZE
}

/// Tuning knobs for a [`BPlusTree`](crate::index::btree::BPlusTree).
///
/// The defaults are the build-time constants above. Smaller fanouts are
/// useful in tests, where they make splits happen after a handful of
/// inserts.
///
/// # Example
/// ```
/// use pagetree::TreeConfig;
///
/// let config = TreeConfig::default().with_max_entries(4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Entries a node may hold before it must split.
    pub max_entries: usize,
    /// Longest accepted key, in bytes.
    pub max_key_size: usize,
    /// Longest accepted string payload, in bytes.
    pub max_string_value_size: usize,
}

impl TreeConfig {
    /// Create a configuration with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fanout bound.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the key length limit.
    pub fn with_max_key_size(mut self, max_key_size: usize) -> Self {
        self.max_key_size = max_key_size;
        self
    }

    /// Set the string payload length limit.
    pub fn with_max_string_value_size(mut self, size: usize) -> Self {
        self.max_string_value_size = size;
        self
    }

    /// Worst-case encoded size of a full node under this configuration.
    pub fn max_node_size(&self) -> usize {
        max_node_size(
            self.max_entries,
            self.max_key_size,
            self.max_string_value_size,
        )
    }

    /// Check that a full node always fits in one page.
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` if the fanout is below [`MIN_ENTRIES`],
    /// a length limit exceeds what a u16 prefix can express, or the
    /// worst-case node is larger than [`PAGE_SIZE`].
    pub fn validate(&self) -> Result<()> {
        if self.max_entries < MIN_ENTRIES {
            return Err(Error::InvalidInput(format!(
                "max_entries must be >= {}, got {}",
                MIN_ENTRIES, self.max_entries
            )));
        }
        if self.max_key_size == 0 || self.max_key_size > u16::MAX as usize {
            return Err(Error::InvalidInput(format!(
                "max_key_size must be in 1..={}, got {}",
                u16::MAX,
                self.max_key_size
            )));
        }
        if self.max_string_value_size > u16::MAX as usize {
            return Err(Error::InvalidInput(format!(
                "max_string_value_size must be <= {}, got {}",
                u16::MAX,
                self.max_string_value_size
            )));
        }
        let worst = self.max_node_size();
        if worst > PAGE_SIZE {
            return Err(Error::InvalidInput(format!(
                "a full node may need {} bytes, page size is {}",
                worst, PAGE_SIZE
            )));
        }
        Ok(())
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_entries: MAX_ENTRIES,
            max_key_size: MAX_KEY_SIZE,
            max_string_value_size: MAX_STRING_VALUE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(PAGE_SIZE, 4096);
    }

    #[test]
    fn test_default_fanout_fits_in_page() {
        let config = TreeConfig::default();
        assert!(config.max_node_size() <= PAGE_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_one_more_entry_overflows_page() {
        let config = TreeConfig::default().with_max_entries(MAX_ENTRIES + 1);
        assert!(config.max_node_size() > PAGE_SIZE);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_small_fanout_rejected() {
        let config = TreeConfig::default().with_max_entries(2);
        assert!(matches!(config.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_larger_keys_need_smaller_fanout() {
        let config = TreeConfig::default().with_max_key_size(1024);
        assert!(config.validate().is_err());

        let config = config.with_max_entries(3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_node_size_layout() {
        // Empty internal node: header plus the single child reference.
        assert_eq!(max_node_size(0, 0, 0), NODE_HEADER_SIZE + CHILD_REF_SIZE);
        assert_eq!(max_node_size(27, 64, 64), 4042);
    }
}
