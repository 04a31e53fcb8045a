//! Buffer pool for page caching.
//!
//! The buffer pool keeps a bounded set of frames, each able to hold one
//! [`Page`](crate::page::Page) in memory, and moves pages between the
//! frames and the [`DiskManager`](crate::disk::DiskManager) on demand.
//! Access goes through RAII guards: fetching a page pins its frame, and
//! dropping the guard unpins it. Unpinned frames are reclaimed by an LRU
//! replacement policy, with dirty pages written back before reuse.
//!
//! # Example
//!
//! ```no_run
//! use strata::buffer::{BufferPool, LruReplacer};
//! use strata::disk::DiskManager;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let disk = DiskManager::open("data.db").await?;
//! let pool = BufferPool::new(disk, LruReplacer::new(), 64);
//!
//! // Allocate a page and insert a record through a write guard.
//! let mut guard = pool.new_page().await?;
//! let page_id = guard.page_id();
//! let slot = guard.insert(b"hello")?;
//! drop(guard); // unpins and leaves the frame dirty
//!
//! // Read it back through a read guard.
//! let guard = pool.fetch_page(page_id).await?;
//! assert_eq!(guard.read(slot), Some(b"hello".as_slice()));
//! # Ok(())
//! # }
//! ```

mod error;
mod frame;
mod guard;
mod pool;
mod replacer;

pub use error::BufferPoolError;
pub use guard::{PageReadGuard, PageWriteGuard};
pub use pool::BufferPool;
pub use replacer::{LruReplacer, Replacer};

// FrameId is exposed for replacer implementations and diagnostics, but not
// the frame internals.
pub use frame::FrameId;
