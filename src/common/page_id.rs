//! Page identifier type.

use std::fmt;

use super::config::SUPERBLOCK_PAGE_ID;

/// Identifies a page of the backing file.
///
/// Page ids are dense and start at 0. Page 0 is the superblock, so it never
/// holds a node; that lets 0 double as the "no page" value in node
/// back-references (`parent` of the root, `next` of the last leaf).
///
/// # Example
/// ```
/// use pagetree::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_node());
/// assert!(!PageId::NONE.is_node());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PageId(pub u32);

impl PageId {
    /// The superblock page.
    pub const SUPERBLOCK: PageId = PageId(SUPERBLOCK_PAGE_ID);

    /// Null back-reference. Shares its value with [`PageId::SUPERBLOCK`].
    pub const NONE: PageId = PageId(SUPERBLOCK_PAGE_ID);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this id can name a tree node (anything but page 0).
    #[inline]
    pub fn is_node(&self) -> bool {
        self.0 != SUPERBLOCK_PAGE_ID
    }

    /// Byte offset of this page in the backing file.
    #[inline]
    pub fn offset(&self, page_size: usize) -> u64 {
        self.0 as u64 * page_size as u64
    }
}

impl From<u32> for PageId {
    fn from(id: u32) -> Self {
        PageId(id)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({})", self.0)
    }
}
