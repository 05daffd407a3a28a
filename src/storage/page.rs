//! The 4KB buffer moved by every page read and write.
//!
//! The superblock and every encoded node travel between the
//! [`Pager`](super::Pager) and the tree as a [`Page`].

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, Result};

/// A page of data (4KB, 4KB-aligned).
///
/// Because the pager only accepts `Page`s, every write is exactly
/// `PAGE_SIZE` bytes long; shorter encodings are zero-padded on the way in
/// by [`Page::from_bytes`].
///
/// # Example
/// ```
/// use pagetree::storage::Page;
///
/// let page = Page::from_bytes(&[1, 2, 3]).unwrap();
/// assert_eq!(&page.as_slice()[..4], &[1, 2, 3, 0]);
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Copy `bytes` into the front of a zeroed page.
    ///
    /// # Errors
    /// Returns `Error::Serialization` if `bytes` is longer than a page; the
    /// data is never silently truncated.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > PAGE_SIZE {
            return Err(Error::Serialization(format!(
                "{} bytes do not fit in a {}-byte page",
                bytes.len(),
                PAGE_SIZE
            )));
        }
        let mut page = Page::new();
        page.data[..bytes.len()].copy_from_slice(bytes);
        Ok(page)
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Raw buffer the pager reads into.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self
            .data
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        f.debug_struct("Page").field("used", &used).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_and_alignment() {
        assert_eq!(std::mem::size_of::<Page>(), PAGE_SIZE);
        assert_eq!(std::mem::align_of::<Page>(), 4096);
    }

    #[test]
    fn test_page_new_is_zeroed() {
        let page = Page::new();
        assert!(page.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_from_bytes_pads_with_zeros() {
        let page = Page::from_bytes(&[0xAB; 10]).unwrap();
        assert_eq!(&page.as_slice()[..10], &[0xAB; 10]);
        assert!(page.as_slice()[10..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_from_bytes_full_page() {
        let page = Page::from_bytes(&[0xCD; PAGE_SIZE]).unwrap();
        assert_eq!(page.as_slice()[PAGE_SIZE - 1], 0xCD);
    }

    #[test]
    fn test_from_bytes_rejects_oversized() {
        let result = Page::from_bytes(&[0u8; PAGE_SIZE + 1]);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_debug_reports_used_bytes() {
        let page = Page::from_bytes(&[1, 0, 2]).unwrap();
        assert_eq!(format!("{:?}", page), "Page { used: 3 }");
    }
}
