//! Disk manager implementation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use super::error::DiskError;
use crate::page::{Page, PageId, PAGE_SIZE};

/// File-backed page storage.
///
/// Owns one backing file for its lifetime and performs all I/O in whole
/// pages at page-aligned offsets. New pages are allocated by appending to
/// the file; a page's id never changes once allocated.
///
/// # Concurrency
///
/// A `tokio::sync::Mutex` around the file handle serializes seek/read and
/// seek/write pairs, so the manager can be shared behind `&self`.
///
/// NOTE: For production systems with better concurrency, use positional
/// reads and writes (pread/pwrite) instead of a seek lock.
pub struct DiskManager {
    /// Path to the backing file.
    path: PathBuf,
    /// File handle behind an async mutex for serialized access.
    file: Mutex<File>,
    /// Number of pages currently in the file.
    num_pages: AtomicI32,
}

impl DiskManager {
    /// Opens or creates a backing file at the given path.
    ///
    /// The page count is derived from the file length with truncating
    /// division; a trailing partial page, which never arises from this
    /// manager's own writes, is ignored.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DiskError> {
        let path = path.into();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?;

        let file_size = file.metadata().await?.len();
        let num_pages = (file_size / PAGE_SIZE as u64) as i32;

        Ok(Self {
            path,
            file: Mutex::new(file),
            num_pages: AtomicI32::new(num_pages),
        })
    }

    /// Returns the path to the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current number of pages in the file.
    pub fn page_count(&self) -> i32 {
        self.num_pages.load(Ordering::Acquire)
    }

    /// Reads the page at `page_id` from disk into `page`.
    ///
    /// The previous contents of `page` are replaced; its buffers are reused
    /// rather than reallocated.
    ///
    /// # Errors
    ///
    /// - [`DiskError::PageNotFound`] if `page_id` is outside `[0, page_count)`
    /// - [`DiskError::Io`] on seek failure or short read
    /// - [`DiskError::Corrupted`] if the stored image fails to deserialize
    pub async fn read_page(&self, page_id: PageId, page: &mut Page) -> Result<(), DiskError> {
        if page_id.index() < 0 || page_id.index() >= self.page_count() {
            return Err(DiskError::PageNotFound(page_id));
        }

        let mut buf = [0u8; PAGE_SIZE];
        {
            let mut file = self.file.lock().await;
            file.seek(std::io::SeekFrom::Start(page_id.byte_offset()))
                .await?;
            file.read_exact(&mut buf).await?;
        }

        page.deserialize(&buf)?;
        Ok(())
    }

    /// Writes `page` to disk at `page_id`.
    ///
    /// Valid positions are `[0, page_count)` to overwrite an existing page
    /// and exactly `page_count` to append a new one. On a successful append
    /// the page count is incremented.
    ///
    /// # Errors
    ///
    /// - [`DiskError::PageNotFound`] if `page_id` is outside `[0, page_count]`
    /// - [`DiskError::Io`] on seek or write failure
    pub async fn write_page(&self, page_id: PageId, page: &Page) -> Result<(), DiskError> {
        let count = self.page_count();
        if page_id.index() < 0 || page_id.index() > count {
            return Err(DiskError::PageNotFound(page_id));
        }

        let mut buf = [0u8; PAGE_SIZE];
        page.serialize(&mut buf);

        {
            let mut file = self.file.lock().await;
            file.seek(std::io::SeekFrom::Start(page_id.byte_offset()))
                .await?;
            file.write_all(&buf).await?;
            file.flush().await?;
        }

        if page_id.index() == count {
            self.num_pages.store(count + 1, Ordering::Release);
        }
        Ok(())
    }

    /// Allocates a new page at the end of the file and returns its id.
    ///
    /// The new page is written as an empty slotted page whose header already
    /// carries the allocated id.
    pub async fn allocate_page(&self) -> Result<PageId, DiskError> {
        let page_id = PageId::new(self.page_count());

        let mut page = Page::new();
        page.set_page_id(page_id);
        self.write_page(page_id, &page).await?;

        Ok(page_id)
    }

    /// Syncs all pending writes to physical disk.
    ///
    /// `write_page` flushes the stream but leaves durability to the OS;
    /// this forces the data down with `File::sync_all`.
    pub async fn sync_all(&self) -> Result<(), DiskError> {
        let file = self.file.lock().await;
        file.sync_all().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    /// Helper owning the temp directory alongside the manager.
    struct TempDisk {
        dir: TempDir,
    }

    impl TempDisk {
        fn new() -> Self {
            Self {
                dir: tempdir().unwrap(),
            }
        }

        async fn manager(&self) -> DiskManager {
            DiskManager::open(self.dir.path().join("test.db")).await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_open_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let disk = DiskManager::open(&path).await.unwrap();
        assert_eq!(disk.page_count(), 0);
        assert!(path.exists());
        assert_eq!(disk.path(), path);
    }

    #[tokio::test]
    async fn test_allocate_sequential_ids() {
        let temp = TempDisk::new();
        let disk = temp.manager().await;

        assert_eq!(disk.allocate_page().await.unwrap(), PageId::new(0));
        assert_eq!(disk.allocate_page().await.unwrap(), PageId::new(1));
        assert_eq!(disk.allocate_page().await.unwrap(), PageId::new(2));
        assert_eq!(disk.page_count(), 3);
    }

    #[tokio::test]
    async fn test_allocated_page_reads_back_empty() {
        let temp = TempDisk::new();
        let disk = temp.manager().await;

        let page_id = disk.allocate_page().await.unwrap();

        let mut page = Page::new();
        disk.read_page(page_id, &mut page).await.unwrap();
        assert_eq!(page.page_id(), page_id);
        assert_eq!(page.slot_count(), 0);
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let temp = TempDisk::new();
        let disk = temp.manager().await;

        let page_id = disk.allocate_page().await.unwrap();

        let mut page = Page::new();
        disk.read_page(page_id, &mut page).await.unwrap();
        page.insert(b"alpha").unwrap();
        page.insert(b"beta").unwrap();
        disk.write_page(page_id, &page).await.unwrap();

        let mut restored = Page::new();
        disk.read_page(page_id, &mut restored).await.unwrap();
        assert_eq!(restored, page);
        assert_eq!(restored.read(0), Some(b"alpha".as_slice()));
        assert_eq!(restored.read(1), Some(b"beta".as_slice()));
    }

    #[tokio::test]
    async fn test_read_out_of_range() {
        let temp = TempDisk::new();
        let disk = temp.manager().await;

        let mut page = Page::new();
        let result = disk.read_page(PageId::new(0), &mut page).await;
        assert!(matches!(result, Err(DiskError::PageNotFound(_))));

        disk.allocate_page().await.unwrap();
        let result = disk.read_page(PageId::new(1), &mut page).await;
        assert!(matches!(result, Err(DiskError::PageNotFound(_))));

        let result = disk.read_page(PageId::INVALID, &mut page).await;
        assert!(matches!(result, Err(DiskError::PageNotFound(_))));
    }

    #[tokio::test]
    async fn test_write_append_window() {
        let temp = TempDisk::new();
        let disk = temp.manager().await;

        // Appending at exactly page_count is allowed.
        let mut page = Page::new();
        page.set_page_id(PageId::new(0));
        disk.write_page(PageId::new(0), &page).await.unwrap();
        assert_eq!(disk.page_count(), 1);

        // Writing past the append window is not.
        page.set_page_id(PageId::new(5));
        let result = disk.write_page(PageId::new(5), &page).await;
        assert!(matches!(result, Err(DiskError::PageNotFound(_))));
        assert_eq!(disk.page_count(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_keeps_page_count() {
        let temp = TempDisk::new();
        let disk = temp.manager().await;

        let page_id = disk.allocate_page().await.unwrap();
        disk.allocate_page().await.unwrap();

        let mut page = Page::new();
        disk.read_page(page_id, &mut page).await.unwrap();
        page.insert(b"overwritten").unwrap();
        disk.write_page(page_id, &page).await.unwrap();

        assert_eq!(disk.page_count(), 2);
    }

    #[tokio::test]
    async fn test_persistence_across_reopen() {
        let temp = TempDisk::new();
        let mut contents = Vec::new();

        {
            let disk = temp.manager().await;
            for i in 0..5u8 {
                let page_id = disk.allocate_page().await.unwrap();
                let mut page = Page::new();
                disk.read_page(page_id, &mut page).await.unwrap();
                let record = vec![i; 16];
                page.insert(&record).unwrap();
                disk.write_page(page_id, &page).await.unwrap();
                contents.push((page_id, record));
            }
            disk.sync_all().await.unwrap();
        }

        {
            let disk = temp.manager().await;
            assert_eq!(disk.page_count(), 5);
            for (page_id, record) in &contents {
                let mut page = Page::new();
                disk.read_page(*page_id, &mut page).await.unwrap();
                assert_eq!(page.read(0), Some(record.as_slice()));
            }
        }
    }

    #[tokio::test]
    async fn test_trailing_partial_page_is_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        tokio::fs::write(&path, vec![0u8; PAGE_SIZE + 100]).await.unwrap();

        let disk = DiskManager::open(&path).await.unwrap();
        assert_eq!(disk.page_count(), 1);
    }
}
