//! Fixed-capacity FIFO queue persisted in a single file.
//!
//! Head and tail pointers are stored as double-buffered atomic scalars, so a
//! crash at any point leaves either the last committed value or the one before
//! it, never a torn one. See [`persistence`] for the on-disk primitives and
//! [`PersistentQueue`] for the ring buffer built on them.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod persistence;
pub mod queue;
pub mod typed;

/// Prelude for convenient imports of primary API types.
pub mod prelude {
    pub use crate::config::{QueueConfig, SyncPolicy};
    pub use crate::error::{BoundsError, QueueError, QueueResult};
    pub use crate::persistence::{Pointer, Storage};
    pub use crate::queue::PersistentQueue;
    pub use crate::typed::TypedQueue;
}

// Re-export primary types at crate root for convenience.
pub use config::{Geometry, QueueConfig, SyncPolicy, DEFAULT_ADDRESS_SIZE};
pub use error::{BoundsError, QueueError, QueueResult};
pub use metrics::{MetricsSnapshot, QueueMetrics};
pub use persistence::{AtomicValue, MetadataRegion, Pointer, Selector, Storage};
pub use queue::{Iter, PersistentQueue};
pub use typed::TypedQueue;
