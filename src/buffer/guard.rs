//! RAII guards for pinned page access.
//!
//! A guard represents one pin on one frame. While it lives, the frame
//! cannot be evicted; dropping the guard releases the pin. A write guard
//! additionally leaves the frame marked dirty, so the pool writes the page
//! back before reusing the frame.

use std::ops::{Deref, DerefMut};

use tokio::sync::{RwLockReadGuard, RwLockWriteGuard};

use super::frame::FrameId;
use super::pool::BufferPoolInner;
use super::replacer::Replacer;
use crate::page::{Page, PageId};

/// RAII guard for read-only access to a pinned page.
///
/// Dereferences to [`Page`]. Dropping the guard unpins the frame.
pub struct PageReadGuard<'a, R: Replacer> {
    inner: &'a BufferPoolInner<R>,
    frame_id: FrameId,
    page_id: PageId,
    page: RwLockReadGuard<'a, Page>,
}

impl<'a, R: Replacer> PageReadGuard<'a, R> {
    pub(super) fn new(
        inner: &'a BufferPoolInner<R>,
        frame_id: FrameId,
        page_id: PageId,
        page: RwLockReadGuard<'a, Page>,
    ) -> Self {
        Self {
            inner,
            frame_id,
            page_id,
            page,
        }
    }

    /// Returns the id of the pinned page.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl<'a, R: Replacer> Deref for PageReadGuard<'a, R> {
    type Target = Page;

    fn deref(&self) -> &Self::Target {
        &self.page
    }
}

impl<'a, R: Replacer> Drop for PageReadGuard<'a, R> {
    fn drop(&mut self) {
        self.inner.unpin(self.frame_id, false);
    }
}

/// RAII guard for mutable access to a pinned page.
///
/// Dereferences to [`Page`]. Dropping the guard unpins the frame and leaves
/// it dirty, so the modification reaches disk on eviction or flush.
pub struct PageWriteGuard<'a, R: Replacer> {
    inner: &'a BufferPoolInner<R>,
    frame_id: FrameId,
    page_id: PageId,
    page: RwLockWriteGuard<'a, Page>,
}

impl<'a, R: Replacer> PageWriteGuard<'a, R> {
    pub(super) fn new(
        inner: &'a BufferPoolInner<R>,
        frame_id: FrameId,
        page_id: PageId,
        page: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            inner,
            frame_id,
            page_id,
            page,
        }
    }

    /// Returns the id of the pinned page.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl<'a, R: Replacer> Deref for PageWriteGuard<'a, R> {
    type Target = Page;

    fn deref(&self) -> &Self::Target {
        &self.page
    }
}

impl<'a, R: Replacer> DerefMut for PageWriteGuard<'a, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.page
    }
}

impl<'a, R: Replacer> Drop for PageWriteGuard<'a, R> {
    fn drop(&mut self) {
        self.inner.unpin(self.frame_id, true);
    }
}
