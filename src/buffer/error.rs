//! Buffer pool errors.

use std::fmt;

use crate::disk::DiskError;
use crate::page::PageId;

/// Errors from buffer pool operations.
#[derive(Debug)]
pub enum BufferPoolError {
    /// Every frame is pinned, so nothing can be loaded or evicted.
    ///
    /// The caller holds too many guards for the pool size; dropping one and
    /// retrying resolves it.
    NoFreeFrames,

    /// The requested page does not exist on disk.
    PageNotFound(PageId),

    /// Underlying disk I/O error.
    Disk(DiskError),
}

impl fmt::Display for BufferPoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferPoolError::NoFreeFrames => {
                write!(f, "no free frames available and all pages are pinned")
            }
            BufferPoolError::PageNotFound(page_id) => {
                write!(f, "page not found: {:?}", page_id)
            }
            BufferPoolError::Disk(e) => {
                write!(f, "disk error: {}", e)
            }
        }
    }
}

impl std::error::Error for BufferPoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BufferPoolError::Disk(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DiskError> for BufferPoolError {
    fn from(e: DiskError) -> Self {
        match e {
            DiskError::PageNotFound(page_id) => BufferPoolError::PageNotFound(page_id),
            other => BufferPoolError::Disk(other),
        }
    }
}
