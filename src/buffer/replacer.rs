//! Page replacement policies for the buffer pool.
//!
//! The replacer tracks which frames are evictable (unpinned) and selects
//! victims for eviction when the buffer pool needs a frame.

use std::collections::HashMap;

use super::frame::FrameId;

/// Trait for page replacement policies.
///
/// The buffer pool calls [`pin`](Self::pin) when a frame's pin count rises
/// from zero, [`unpin`](Self::unpin) when it drops back to zero, and
/// [`victim`](Self::victim) when it needs to reclaim a frame.
///
/// # Usage
///
/// ```text
/// // When a page's pin count drops to 0
/// replacer.unpin(frame_id);
///
/// // When a page's pin count increases from 0
/// replacer.pin(frame_id);
///
/// // When the buffer pool needs a victim
/// if let Some(victim) = replacer.victim() {
///     // Evict the victim frame
/// }
/// ```
pub trait Replacer: Send {
    /// Selects a victim frame for eviction.
    ///
    /// Returns `None` if no frame is evictable. The returned frame is
    /// removed from the replacer's tracking.
    fn victim(&mut self) -> Option<FrameId>;

    /// Marks a frame as non-evictable.
    ///
    /// Called when a frame's pin count increases from 0 to 1. If the frame
    /// is not tracked, this is a no-op.
    fn pin(&mut self, frame_id: FrameId);

    /// Marks a frame as evictable, refreshing its recency.
    ///
    /// Called when a frame's pin count decreases to 0.
    fn unpin(&mut self, frame_id: FrameId);

    /// Returns the number of evictable frames.
    fn size(&self) -> usize;
}

/// LRU (Least Recently Used) page replacement policy.
///
/// Each evictable frame carries the value of a monotonically increasing
/// logical clock, stamped when the frame became (or was re-confirmed as)
/// evictable. [`victim`](Replacer::victim) picks the smallest stamp, so the
/// frame whose last use lies furthest in the past goes first. Comparisons
/// fall back to the lowest frame index, keeping eviction order fully
/// deterministic.
///
/// # Example
///
/// ```
/// use strata::buffer::{FrameId, LruReplacer, Replacer};
///
/// let mut replacer = LruReplacer::new();
///
/// replacer.unpin(FrameId::new(0));
/// replacer.unpin(FrameId::new(1));
/// replacer.unpin(FrameId::new(2));
///
/// // Oldest first.
/// assert_eq!(replacer.victim(), Some(FrameId::new(0)));
///
/// // Pinned frames are never selected.
/// replacer.pin(FrameId::new(1));
/// assert_eq!(replacer.victim(), Some(FrameId::new(2)));
/// ```
pub struct LruReplacer {
    /// Evictable frames and the clock value of their last unpin.
    stamps: HashMap<FrameId, u64>,

    /// Logical clock, advanced on every unpin.
    clock: u64,
}

impl LruReplacer {
    /// Creates a new LRU replacer.
    pub fn new() -> Self {
        Self {
            stamps: HashMap::new(),
            clock: 0,
        }
    }

    /// Creates a new LRU replacer sized for `capacity` frames.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            stamps: HashMap::with_capacity(capacity),
            clock: 0,
        }
    }
}

impl Default for LruReplacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Replacer for LruReplacer {
    fn victim(&mut self) -> Option<FrameId> {
        let frame_id = self
            .stamps
            .iter()
            .min_by_key(|&(frame_id, stamp)| (*stamp, frame_id.as_usize()))
            .map(|(&frame_id, _)| frame_id)?;
        self.stamps.remove(&frame_id);
        Some(frame_id)
    }

    fn pin(&mut self, frame_id: FrameId) {
        self.stamps.remove(&frame_id);
    }

    fn unpin(&mut self, frame_id: FrameId) {
        self.clock += 1;
        self.stamps.insert(frame_id, self.clock);
    }

    fn size(&self) -> usize {
        self.stamps.len()
    }
}
