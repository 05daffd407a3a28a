//! Pager - low-level file I/O for tree pages.
//!
//! The [`Pager`] is the only component that touches the backing file:
//! - Reading and writing whole pages by [`PageId`]
//! - Allocating new pages by appending to the file
//! - Flushing to stable storage

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::{IoStats, Page};

/// Manages page I/O for a single backing file.
///
/// # File Layout
/// ```text
/// ┌────────────┬─────────┬─────────┬─────────┬─────────┐
/// │   Page 0   │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ superblock │ node    │ node    │         │ node    │
/// └────────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// The pager never interprets page contents.
///
/// # Thread Safety
/// `Pager` is **single-threaded**. Allocation reads the page count and then
/// appends, so two allocators racing on one file would hand out the same
/// id. Share a pager only behind a lock (see
/// [`SharedBPlusTree`](crate::index::btree::SharedBPlusTree)).
///
/// # Durability
/// `write_page` does not flush; callers pair it with [`Pager::sync`].
/// `allocate_page` flushes the new zero page itself.
pub struct Pager {
    file: File,
    path: PathBuf,
    /// Number of pages in the file.
    page_count: u32,
    stats: IoStats,
}

impl Pager {
    /// Open the backing file, creating it if it does not exist.
    ///
    /// # Errors
    /// Returns `Error::Pagination` if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::pagination(format!("failed to open file {}", path.display()), e))?;
        Self::from_file(file, path)
    }

    /// Open an existing backing file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| Error::pagination(format!("failed to open file {}", path.display()), e))?;
        Self::from_file(file, path)
    }

    fn from_file(file: File, path: &Path) -> Result<Self> {
        // Calculate page count from file size
        let file_size = file
            .metadata()
            .map_err(|e| Error::pagination("failed to get file info", e))?
            .len();
        let page_count = u32::try_from(file_size / PAGE_SIZE as u64).map_err(|_| {
            Error::System(format!("file of {} bytes exceeds the page id space", file_size))
        })?;

        debug!(path = %path.display(), page_count, "pager opened");
        Ok(Self {
            file,
            path: path.to_path_buf(),
            page_count,
            stats: IoStats::new(),
        })
    }

    /// Read a page.
    ///
    /// Reads `PAGE_SIZE` bytes at offset `page_id × PAGE_SIZE`. A read that
    /// runs into end-of-file is zero-padded rather than rejected.
    ///
    /// # Errors
    /// Returns `Error::Pagination` if the underlying read fails.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        let offset = page_id.offset(PAGE_SIZE);
        let read_err = |e| Error::pagination(format!("failed to read page {}", page_id.0), e);

        self.file.seek(SeekFrom::Start(offset)).map_err(read_err)?;

        let mut page = Page::new();
        let buf = page.as_mut_slice();
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(read_err(e)),
            }
        }

        self.stats.record_read();
        trace!(page = page_id.0, bytes = filled, "read page");
        Ok(page)
    }

    /// Write a page.
    ///
    /// The page must have been previously allocated with `allocate_page()`.
    /// The write is not flushed; call [`Pager::sync`] afterwards.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page hasn't been allocated and
    /// `Error::Pagination` if the write fails.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id));
        }

        let offset = page_id.offset(PAGE_SIZE);
        let write_err = |e| Error::pagination(format!("failed to write page {}", page_id.0), e);
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(write_err)?;
        self.file.write_all(page.as_slice()).map_err(write_err)?;

        self.stats.record_write();
        trace!(page = page_id.0, "wrote page");
        Ok(())
    }

    /// Allocate a new page at the end of the file.
    ///
    /// Returns the `PageId` of the newly allocated page. The page is
    /// zero-filled and flushed before this returns.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        let page_id = PageId::new(self.page_count);
        let next_count = self
            .page_count
            .checked_add(1)
            .ok_or_else(|| Error::System("page id space exhausted".to_string()))?;

        let alloc_err = |e| Error::pagination(format!("failed to allocate page {}", page_id.0), e);
        self.file
            .seek(SeekFrom::Start(page_id.offset(PAGE_SIZE)))
            .map_err(alloc_err)?;
        self.file.write_all(&[0u8; PAGE_SIZE]).map_err(alloc_err)?;
        self.file.sync_all().map_err(alloc_err)?;

        self.page_count = next_count;
        self.stats.record_allocation();
        trace!(page = page_id.0, "allocated page");
        Ok(page_id)
    }

    /// Flush all written pages to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file
            .sync_all()
            .map_err(|e| Error::pagination("failed to sync main file", e))?;
        self.stats.record_sync();
        trace!("synced file");
        Ok(())
    }

    /// Flush and release the file handle.
    ///
    /// Dropping a `Pager` also closes the file, but without reporting
    /// failures. Nothing is retried.
    pub fn close(mut self) -> Result<()> {
        self.sync()
            .map_err(|e| match e {
                Error::Pagination { source, .. } => {
                    Error::pagination("failed to close main file", source)
                }
                other => other,
            })?;
        debug!(path = %self.path.display(), "pager closed");
        Ok(())
    }

    /// Get the number of pages in the file.
    #[inline]
    pub fn num_pages(&self) -> u32 {
        self.page_count
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// I/O counters for this pager.
    pub fn stats(&self) -> &IoStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_new_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let pager = Pager::open(&path).unwrap();
        assert_eq!(pager.num_pages(), 0);
    }

    #[test]
    fn test_open_existing_missing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.db");

        assert!(Pager::open_existing(&path).is_err());
    }

    #[test]
    fn test_open_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut pager = Pager::open(&path).unwrap();
            assert_eq!(pager.num_pages(), 0);
            pager.allocate_page().unwrap();
        }

        let pager = Pager::open(&path).unwrap();
        assert_eq!(pager.num_pages(), 1);
    }

    #[test]
    fn test_allocate_and_read_page() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();

        let page_id = pager.allocate_page().unwrap();
        assert_eq!(page_id, PageId::new(0));
        assert_eq!(pager.num_pages(), 1);

        let page = pager.read_page(page_id).unwrap();
        assert!(page.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_and_read_page() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();
        pager.allocate_page().unwrap();
        let page_id = pager.allocate_page().unwrap();

        let mut page = Page::new();
        page.as_mut_slice()[0] = 0xAB;
        page.as_mut_slice()[4095] = 0xEF;
        pager.write_page(page_id, &page).unwrap();
        pager.sync().unwrap();

        let read_back = pager.read_page(page_id).unwrap();
        assert_eq!(read_back.as_slice()[0], 0xAB);
        assert_eq!(read_back.as_slice()[4095], 0xEF);
    }

    #[test]
    fn test_read_past_end_is_zero_padded() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();
        pager.allocate_page().unwrap();

        let page = pager.read_page(PageId::new(7)).unwrap();
        assert!(page.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_short_trailing_page_is_zero_padded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        std::fs::write(&path, [0x11u8; PAGE_SIZE + 10]).unwrap();

        let mut pager = Pager::open(&path).unwrap();
        assert_eq!(pager.num_pages(), 1);

        let page = pager.read_page(PageId::new(1)).unwrap();
        assert_eq!(&page.as_slice()[..10], &[0x11; 10]);
        assert!(page.as_slice()[10..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_unallocated_page_fails() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();

        let result = pager.write_page(PageId::new(0), &Page::new());
        assert!(matches!(result, Err(Error::PageNotFound(PageId(0)))));
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut pager = Pager::open(&path).unwrap();
            let page_id = pager.allocate_page().unwrap();
            let page = Page::from_bytes(&[0x42]).unwrap();
            pager.write_page(page_id, &page).unwrap();
            pager.close().unwrap();
        }

        let mut pager = Pager::open_existing(&path).unwrap();
        assert_eq!(pager.num_pages(), 1);
        let page = pager.read_page(PageId::new(0)).unwrap();
        assert_eq!(page.as_slice()[0], 0x42);
    }

    #[test]
    fn test_multiple_pages_are_dense() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();

        for i in 0..10 {
            let page_id = pager.allocate_page().unwrap();
            assert_eq!(page_id.0, i);

            let page = Page::from_bytes(&[i as u8 + 1]).unwrap();
            pager.write_page(page_id, &page).unwrap();
        }

        assert_eq!(pager.num_pages(), 10);
        let len = std::fs::metadata(pager.path()).unwrap().len();
        assert_eq!(len, 10 * PAGE_SIZE as u64);

        for i in 0..10 {
            let page = pager.read_page(PageId::new(i)).unwrap();
            assert_eq!(page.as_slice()[0], i as u8 + 1);
        }
    }

    #[test]
    fn test_stats_track_io() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();

        let page_id = pager.allocate_page().unwrap();
        pager.write_page(page_id, &Page::new()).unwrap();
        pager.sync().unwrap();
        pager.read_page(page_id).unwrap();

        let snap = pager.stats().snapshot();
        assert_eq!(snap.pages_allocated, 1);
        assert_eq!(snap.pages_written, 1);
        assert_eq!(snap.pages_read, 1);
        assert_eq!(snap.syncs, 1);
    }
}
