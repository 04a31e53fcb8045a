//! Buffer pool manager.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::error::BufferPoolError;
use super::frame::{Frame, FrameId, FrameMeta};
use super::guard::{PageReadGuard, PageWriteGuard};
use super::replacer::Replacer;
use crate::disk::DiskManager;
use crate::page::PageId;

/// Bounded cache of frames holding pages, sitting over a [`DiskManager`].
///
/// Fetching a page pins its frame and returns a guard; a page requested
/// while resident is served from memory, otherwise it is read from disk
/// into a free frame or, when none is left, into the frame of an evicted
/// unpinned page. Dirty pages are written back before their frame is
/// reused.
///
/// # Resolution order for a fetch
///
/// 1. **Hit**: the page is resident; pin its frame.
/// 2. **Free frame**: read the page from disk into an unused frame.
/// 3. **Eviction**: pick the least recently used unpinned frame, write it
///    back if dirty, and read the page into it. If every frame is pinned
///    the fetch fails with [`BufferPoolError::NoFreeFrames`].
///
/// # Locking
///
/// All bookkeeping (page table, frame metadata, free list, replacer) lives
/// behind one `parking_lot::Mutex`, which guard drops can take without
/// awaiting. Page bytes sit behind a per-frame `tokio::sync::RwLock`, so a
/// read fetch shares the frame and a write fetch gets it exclusively.
/// The state mutex is never held across an await point.
///
/// NOTE: For production, consider a background flusher for dirty pages and
/// hit/eviction counters; both bolt onto the state mutex without changing
/// the layout.
pub struct BufferPool<R: Replacer> {
    inner: BufferPoolInner<R>,
}

/// Internal state of the buffer pool, shared with the guards for unpinning.
pub(super) struct BufferPoolInner<R: Replacer> {
    /// The disk manager backing this pool.
    disk: DiskManager,

    /// Frame array; each frame's page sits behind its own lock. The vector
    /// itself is immutable after construction.
    frames: Vec<Frame>,

    /// Mutable bookkeeping, protected by a synchronous mutex.
    state: Mutex<PoolState<R>>,

    /// Number of frames in the pool.
    pool_size: usize,
}

/// Bookkeeping protected by the state mutex.
struct PoolState<R: Replacer> {
    /// Maps resident pages to their frames. Bijective with the set of
    /// non-empty frames.
    page_table: HashMap<PageId, FrameId>,

    /// Per-frame metadata, indexed by frame id.
    meta: Vec<FrameMeta>,

    /// Frames not currently holding any page.
    free_list: Vec<FrameId>,

    /// Replacement policy over the unpinned, occupied frames.
    replacer: R,
}

impl<R: Replacer> BufferPool<R> {
    /// Creates a buffer pool with `pool_size` frames over `disk`.
    ///
    /// All frame memory is allocated here; steady-state operation reuses it.
    ///
    /// # Panics
    ///
    /// Panics if `pool_size` is 0.
    pub fn new(disk: DiskManager, replacer: R, pool_size: usize) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Vec<_> = (0..pool_size).map(|_| Frame::new()).collect();
        let meta: Vec<_> = (0..pool_size).map(|_| FrameMeta::new()).collect();

        // Reversed so frames are handed out in ascending index order.
        let free_list: Vec<_> = (0..pool_size).rev().map(FrameId::new).collect();

        Self {
            inner: BufferPoolInner {
                disk,
                frames,
                state: Mutex::new(PoolState {
                    page_table: HashMap::with_capacity(pool_size),
                    meta,
                    free_list,
                    replacer,
                }),
                pool_size,
            },
        }
    }

    /// Fetches a page for reading.
    ///
    /// The returned guard pins the frame until dropped. The dirty flag is
    /// left as it was.
    ///
    /// # Errors
    ///
    /// - [`BufferPoolError::NoFreeFrames`] if every frame is pinned
    /// - [`BufferPoolError::PageNotFound`] if the page does not exist on disk
    /// - [`BufferPoolError::Disk`] if the read fails
    pub async fn fetch_page(
        &self,
        page_id: PageId,
    ) -> Result<PageReadGuard<'_, R>, BufferPoolError> {
        let frame_id = self.inner.get_or_allocate_frame(page_id, false).await?;

        let page = self.inner.frames[frame_id.as_usize()].page.read().await;
        Ok(PageReadGuard::new(&self.inner, frame_id, page_id, page))
    }

    /// Fetches a page for writing.
    ///
    /// Same resolution as [`fetch_page`](Self::fetch_page), but the guard
    /// provides mutable access and the frame is marked dirty, so the page
    /// is written back before its frame is reused.
    pub async fn fetch_page_mut(
        &self,
        page_id: PageId,
    ) -> Result<PageWriteGuard<'_, R>, BufferPoolError> {
        let frame_id = self.inner.get_or_allocate_frame(page_id, true).await?;

        let page = self.inner.frames[frame_id.as_usize()].page.write().await;
        Ok(PageWriteGuard::new(&self.inner, frame_id, page_id, page))
    }

    /// Allocates a new page on disk and fetches it for writing.
    pub async fn new_page(&self) -> Result<PageWriteGuard<'_, R>, BufferPoolError> {
        let page_id = self.inner.disk.allocate_page().await?;
        self.fetch_page_mut(page_id).await
    }

    /// Writes one page back to disk if it is resident, dirty, and unpinned.
    ///
    /// Pinned frames are skipped: their guards still hold the frame lock,
    /// and their content is written back at unpin-eviction or shutdown.
    pub async fn flush_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        let frame_id = {
            let state = self.inner.state.lock();
            match state.page_table.get(&page_id) {
                Some(&frame_id) => {
                    let meta = &state.meta[frame_id.as_usize()];
                    (meta.is_dirty && meta.pin_count == 0).then_some(frame_id)
                }
                None => None,
            }
        };

        if let Some(frame_id) = frame_id {
            self.inner.write_back(frame_id, page_id).await?;
        }
        Ok(())
    }

    /// Writes every dirty unpinned frame back to disk and syncs the file.
    ///
    /// Pinned dirty frames are skipped (they are in use). Returns the first
    /// error encountered; later frames stay unflushed in that case.
    pub async fn flush_all(&self) -> Result<(), BufferPoolError> {
        let dirty: Vec<(FrameId, PageId)> = {
            let state = self.inner.state.lock();
            state
                .meta
                .iter()
                .enumerate()
                .filter_map(|(i, meta)| {
                    if meta.is_dirty && meta.pin_count == 0 {
                        meta.page_id.map(|page_id| (FrameId::new(i), page_id))
                    } else {
                        None
                    }
                })
                .collect()
        };

        for (frame_id, page_id) in dirty {
            self.inner.write_back(frame_id, page_id).await?;
        }

        self.inner.disk.sync_all().await?;
        Ok(())
    }

    /// Flushes all unpinned dirty frames and shuts the pool down.
    ///
    /// Outstanding guards borrow the pool, so a pool with pinned frames
    /// cannot be closed; drop the guards first.
    pub async fn close(self) -> Result<(), BufferPoolError> {
        self.flush_all().await
    }

    /// Returns the number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.inner.pool_size
    }

    /// Returns the number of pages currently resident.
    pub fn page_count(&self) -> usize {
        self.inner.state.lock().page_table.len()
    }

    /// Returns true if the page is currently resident in a frame.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.inner.state.lock().page_table.contains_key(&page_id)
    }

    /// Returns the disk manager backing this pool.
    pub fn disk(&self) -> &DiskManager {
        &self.inner.disk
    }
}

impl<R: Replacer> BufferPoolInner<R> {
    /// Resolves a page to a pinned frame: hit, free frame, or eviction.
    ///
    /// On a hit the pin count rises and, for a write fetch, the dirty flag
    /// is set. On a miss the page is read from disk into a reclaimed frame
    /// whose metadata is then initialized with `pin_count = 1`.
    async fn get_or_allocate_frame(
        &self,
        page_id: PageId,
        for_write: bool,
    ) -> Result<FrameId, BufferPoolError> {
        // Fast path: the page is already resident.
        {
            let mut state = self.state.lock();
            let state = &mut *state;
            if let Some(&frame_id) = state.page_table.get(&page_id) {
                let meta = &mut state.meta[frame_id.as_usize()];
                meta.pin_count += 1;
                if for_write {
                    meta.is_dirty = true;
                }
                state.replacer.pin(frame_id);
                return Ok(frame_id);
            }
        }

        // Miss: claim a frame, then read the page into it.
        let frame_id = self.allocate_frame().await?;

        let read_result = {
            let mut page = self.frames[frame_id.as_usize()].page.write().await;
            self.disk.read_page(page_id, &mut page).await
        };

        // On a failed read the frame goes back to the free list; the page
        // table no longer mentions whatever the frame held before.
        if let Err(e) = read_result {
            let mut state = self.state.lock();
            state.free_list.push(frame_id);
            return Err(e.into());
        }

        {
            let mut state = self.state.lock();
            let state = &mut *state;

            // Another task may have loaded the same page while we were at
            // the disk; keep its frame and recycle ours.
            if let Some(&existing) = state.page_table.get(&page_id) {
                state.free_list.push(frame_id);
                let meta = &mut state.meta[existing.as_usize()];
                meta.pin_count += 1;
                if for_write {
                    meta.is_dirty = true;
                }
                state.replacer.pin(existing);
                return Ok(existing);
            }

            state.page_table.insert(page_id, frame_id);
            let meta = &mut state.meta[frame_id.as_usize()];
            meta.page_id = Some(page_id);
            meta.pin_count = 1;
            meta.is_dirty = for_write;
        }

        Ok(frame_id)
    }

    /// Claims a frame: from the free list if one is left, otherwise by
    /// evicting the least recently used unpinned frame.
    async fn allocate_frame(&self) -> Result<FrameId, BufferPoolError> {
        {
            let mut state = self.state.lock();
            if let Some(frame_id) = state.free_list.pop() {
                return Ok(frame_id);
            }
        }

        loop {
            let victim = {
                let mut state = self.state.lock();
                state.replacer.victim()
            };
            let frame_id = match victim {
                Some(frame_id) => frame_id,
                None => return Err(BufferPoolError::NoFreeFrames),
            };

            let (old_page_id, is_dirty) = {
                let state = self.state.lock();
                let meta = &state.meta[frame_id.as_usize()];
                (meta.page_id, meta.is_dirty)
            };

            // Write back before the frame is reused.
            if is_dirty {
                if let Some(old_page_id) = old_page_id {
                    let page = self.frames[frame_id.as_usize()].page.read().await;
                    self.disk.write_page(old_page_id, &page).await?;
                }
            }

            {
                let mut state = self.state.lock();

                // The frame may have been re-pinned while we were at the
                // disk; pick another victim in that case.
                if state.meta[frame_id.as_usize()].pin_count > 0 {
                    continue;
                }

                if let Some(old_page_id) = old_page_id {
                    state.page_table.remove(&old_page_id);
                }
                state.meta[frame_id.as_usize()].clear();

                return Ok(frame_id);
            }
        }
    }

    /// Writes one frame's page to disk and clears its dirty flag, verifying
    /// that the frame still holds the expected page around the I/O.
    async fn write_back(&self, frame_id: FrameId, page_id: PageId) -> Result<(), BufferPoolError> {
        let page = self.frames[frame_id.as_usize()].page.read().await;

        {
            let state = self.state.lock();
            if state.meta[frame_id.as_usize()].page_id != Some(page_id) {
                return Ok(());
            }
        }

        self.disk.write_page(page_id, &page).await?;

        let mut state = self.state.lock();
        let meta = &mut state.meta[frame_id.as_usize()];
        if meta.page_id == Some(page_id) {
            meta.is_dirty = false;
        }
        Ok(())
    }

    /// Releases one pin (called from guard drops).
    ///
    /// Decrements only a positive pin count, ORs in the dirty flag, and
    /// hands the frame to the replacer when the count reaches zero, which
    /// also refreshes its recency.
    pub(super) fn unpin(&self, frame_id: FrameId, is_dirty: bool) {
        let mut state = self.state.lock();
        let state = &mut *state;

        let meta = &mut state.meta[frame_id.as_usize()];
        if meta.pin_count == 0 {
            return;
        }

        meta.pin_count -= 1;
        if is_dirty {
            meta.is_dirty = true;
        }
        if meta.pin_count == 0 {
            state.replacer.unpin(frame_id);
        }
    }
}
