//! Page errors.

use std::fmt;

use super::SlotId;

/// Errors from slotted page operations.
#[derive(Debug)]
pub enum PageError {
    /// Not enough free space for the record and its slot entry.
    PageFull {
        /// Bytes required for the record data and slot.
        required: usize,
        /// Bytes available in free space.
        available: usize,
    },
    /// Slot out of range, invalid, or already deleted.
    SlotNotFound(SlotId),
    /// A serialized page image failed validation.
    Corrupted(String),
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageError::PageFull {
                required,
                available,
            } => {
                write!(
                    f,
                    "page full: need {} bytes, have {} available",
                    required, available
                )
            }
            PageError::SlotNotFound(slot_id) => {
                write!(f, "slot {} not found or deleted", slot_id)
            }
            PageError::Corrupted(msg) => {
                write!(f, "corrupted page image: {}", msg)
            }
        }
    }
}

impl std::error::Error for PageError {}
