//! On-disk primitives: the storage backend, the double-buffered atomic scalar
//! and the head/tail metadata region built from two of them.

pub mod atomic;
pub mod metadata;
pub mod storage;

pub use atomic::{AtomicValue, Selector, MAX_WIDTH};
pub use metadata::{MetadataRegion, Pointer};
pub use storage::Storage;
