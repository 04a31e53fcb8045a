//! Disk manager errors.

use std::fmt;

use crate::page::{PageError, PageId};

/// Errors from disk manager operations.
#[derive(Debug)]
pub enum DiskError {
    /// The page id is outside the valid range of the file.
    ///
    /// Reads require an existing page; writes additionally accept the
    /// position one past the end as an append.
    PageNotFound(PageId),

    /// I/O error from the underlying file system.
    Io(std::io::Error),

    /// A page image read from disk failed to deserialize.
    Corrupted(PageError),
}

impl fmt::Display for DiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskError::PageNotFound(page_id) => write!(f, "page not found: {:?}", page_id),
            DiskError::Io(e) => write!(f, "I/O error: {}", e),
            DiskError::Corrupted(e) => write!(f, "corrupted page on disk: {}", e),
        }
    }
}

impl std::error::Error for DiskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiskError::Io(e) => Some(e),
            DiskError::Corrupted(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DiskError {
    fn from(e: std::io::Error) -> Self {
        DiskError::Io(e)
    }
}

impl From<PageError> for DiskError {
    fn from(e: PageError) -> Self {
        DiskError::Corrupted(e)
    }
}
