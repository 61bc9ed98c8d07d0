//! Fixed-capacity FIFO over a single file.
//!
//! ## Layout
//!
//! ```text
//! [ head pointer | tail pointer ][ slot 0 ][ slot 1 ] ... [ slot capacity-1 ]
//! ```
//!
//! Each pointer is an [`AtomicValue`](crate::persistence::AtomicValue). The
//! queue is empty exactly when the head pointer is absent; otherwise the live
//! elements run from head to tail inclusive, wrapping at capacity.
//!
//! ## Commit order
//!
//! Element bytes are always written before the pointer commit that makes them
//! visible. An interrupted `put` therefore leaves, at worst, bytes in a slot no
//! pointer covers, and they vanish on reopen.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::Instant;

use tracing::{debug, warn};

use crate::config::{Geometry, QueueConfig, SyncPolicy};
use crate::error::{QueueError, QueueResult};
use crate::metrics::QueueMetrics;
use crate::persistence::storage::{self, read_exact_at, write_at};
use crate::persistence::{MetadataRegion, Pointer, Storage};

/// Crash-consistent ring buffer of fixed-size elements.
///
/// The queue owns its storage handle; dropping the queue closes it. Use
/// [`close`](Self::close) to sync and observe I/O errors on the way out.
pub struct PersistentQueue<S: Storage = File> {
    storage: S,
    metadata: MetadataRegion,
    geometry: Geometry,
    sync_policy: SyncPolicy,
    metrics: QueueMetrics,
}

impl PersistentQueue<File> {
    /// Open `path`, creating it if absent. An existing file is reused as is.
    ///
    /// The configuration is validated before the file is touched.
    pub fn open(path: impl AsRef<Path>, config: QueueConfig) -> QueueResult<Self> {
        config.geometry()?;

        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        debug!(path = %path.display(), "opened queue file");
        Self::with_storage(file, config)
    }
}

impl<S: Storage> PersistentQueue<S> {
    /// Build a queue over an arbitrary backend.
    pub fn with_storage(mut storage: S, config: QueueConfig) -> QueueResult<Self> {
        let geometry = config.geometry()?;

        let existing_len = storage::len(&mut storage)?;
        if existing_len < geometry.metadata_size {
            MetadataRegion::initialize(&mut storage, geometry.address_size, existing_len)?;
            storage.sync()?;
        }

        let ordered = config.sync_policy == SyncPolicy::Always;
        let metadata = MetadataRegion::load(&mut storage, geometry.address_size, ordered)?;

        let head = metadata.head();
        let tail = metadata.tail();
        let in_range = |p: Pointer| p.index().map_or(true, |i| i < geometry.capacity);
        // A stale tail behind an absent head is ignored.
        if !in_range(head) || (!head.is_empty() && !in_range(tail)) {
            warn!(%head, %tail, capacity = geometry.capacity, "queue metadata out of range");
            return Err(QueueError::CorruptMetadata {
                head,
                tail,
                capacity: geometry.capacity,
            });
        }

        let queue = Self {
            storage,
            metadata,
            geometry,
            sync_policy: config.sync_policy,
            metrics: QueueMetrics::new(),
        };

        debug!(
            capacity = geometry.capacity,
            elem_size = geometry.elem_size,
            fresh = existing_len == 0,
            %head,
            %tail,
            len = queue.len(),
            "queue ready"
        );
        Ok(queue)
    }

    #[inline(always)]
    pub fn capacity(&self) -> u64 {
        self.geometry.capacity
    }

    #[inline(always)]
    pub fn elem_size(&self) -> usize {
        self.geometry.elem_size as usize
    }

    #[inline(always)]
    pub fn metadata_size(&self) -> u64 {
        self.metadata.size()
    }

    #[inline(always)]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[inline(always)]
    pub fn sync_policy(&self) -> SyncPolicy {
        self.sync_policy
    }

    pub fn metrics(&self) -> &QueueMetrics {
        &self.metrics
    }

    /// Committed `(head, tail)` pointers. The tail is meaningless when the
    /// head is empty.
    #[inline]
    pub fn pointers(&self) -> (Pointer, Pointer) {
        (self.metadata.head(), self.metadata.tail())
    }

    /// Head and tail indices, or `None` when the queue is empty.
    #[inline]
    fn bounds(&self) -> Option<(u64, u64)> {
        match self.pointers() {
            (Pointer::At(head), Pointer::At(tail)) => Some((head, tail)),
            _ => None,
        }
    }

    pub fn len(&self) -> u64 {
        self.bounds()
            .map_or(0, |(head, tail)| self.geometry.span(head, tail))
    }

    pub fn is_empty(&self) -> bool {
        self.bounds().is_none()
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.geometry.capacity
    }

    /// Append `value`, evicting the oldest element when the queue is full.
    ///
    /// Use [`try_put`](Self::try_put) to reject instead. Under
    /// [`SyncPolicy::OnPut`] and [`SyncPolicy::Always`] the element is on
    /// stable storage when this returns.
    pub fn put(&mut self, value: &[u8]) -> QueueResult<()> {
        self.check_len(value.len())?;

        let started = Instant::now();
        self.push(value)?;
        if self.sync_policy != SyncPolicy::Never {
            self.sync()?;
        }

        self.metrics
            .record_put(value.len() as u64, started.elapsed().as_nanos() as u64);
        Ok(())
    }

    /// Append `value`, failing with [`QueueError::QueueIsFull`] instead of
    /// evicting.
    pub fn try_put(&mut self, value: &[u8]) -> QueueResult<()> {
        self.check_len(value.len())?;
        if self.is_full() {
            return Err(QueueError::QueueIsFull);
        }
        self.put(value)
    }

    fn push(&mut self, value: &[u8]) -> QueueResult<()> {
        let (head, tail) = match self.pointers() {
            (Pointer::At(head), Pointer::At(tail)) => (head, tail),
            // Empty, or only one pointer set: reuse the head slot if there is one.
            (head, _) => return self.push_first(value, head.index().unwrap_or(0)),
        };

        let new_tail = self.geometry.advance(tail);
        if new_tail == head {
            self.metrics.record_eviction();
            debug!(head, capacity = self.geometry.capacity, "queue full, evicting oldest element");

            if self.geometry.capacity == 1 {
                // The only slot is about to be overwritten. Drop to empty first
                // so the rewrite is committed by a fresh head pointer.
                self.metadata.write_head(&mut self.storage, Pointer::Empty)?;
                return self.push_first(value, 0);
            }
            self.metadata
                .write_head(&mut self.storage, Pointer::At(self.geometry.advance(head)))?;
        }

        self.write_slot(new_tail, value)?;
        self.barrier()?;
        self.metadata.write_tail(&mut self.storage, Pointer::At(new_tail))
    }

    /// Insert into an empty queue. The head commit is what makes the element
    /// visible, so it goes last.
    fn push_first(&mut self, value: &[u8], index: u64) -> QueueResult<()> {
        self.write_slot(index, value)?;
        self.barrier()?;
        self.metadata.write_tail(&mut self.storage, Pointer::At(index))?;
        if self.metadata.head() != Pointer::At(index) {
            self.metadata.write_head(&mut self.storage, Pointer::At(index))?;
        }
        Ok(())
    }

    /// Copy of the oldest element.
    pub fn head(&mut self) -> QueueResult<Vec<u8>> {
        let mut buf = vec![0u8; self.elem_size()];
        self.head_into(&mut buf)?;
        Ok(buf)
    }

    /// Read the oldest element into `buf`, which must be exactly `elem_size`
    /// bytes long.
    pub fn head_into(&mut self, buf: &mut [u8]) -> QueueResult<()> {
        self.check_len(buf.len())?;
        let (head, _) = self.bounds().ok_or(QueueError::QueueIsEmpty)?;
        self.read_slot(head, buf)
    }

    /// Drop the oldest element.
    pub fn pop(&mut self) -> QueueResult<()> {
        let (head, tail) = self.bounds().ok_or(QueueError::QueueIsEmpty)?;

        let next = if head == tail {
            Pointer::Empty
        } else {
            Pointer::At(self.geometry.advance(head))
        };
        self.metadata.write_head(&mut self.storage, next)?;

        if self.sync_policy == SyncPolicy::Always {
            self.sync()?;
        }
        self.metrics.record_pop();
        Ok(())
    }

    /// Remove and return the oldest element.
    pub fn pop_front(&mut self) -> QueueResult<Vec<u8>> {
        let value = self.head()?;
        self.pop()?;
        Ok(value)
    }

    /// Drop every element. Slot bytes are left in place.
    pub fn clear(&mut self) -> QueueResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        self.metadata.write_head(&mut self.storage, Pointer::Empty)?;
        if self.sync_policy == SyncPolicy::Always {
            self.sync()?;
        }
        Ok(())
    }

    /// Oldest-first view of the live elements. Does not modify the queue.
    pub fn iter(&mut self) -> Iter<'_, S> {
        let (next, remaining) = self
            .bounds()
            .map_or((0, 0), |(head, tail)| (head, self.geometry.span(head, tail)));
        Iter {
            storage: &mut self.storage,
            geometry: self.geometry,
            next,
            remaining,
        }
    }

    /// Flush and force everything written so far to stable storage.
    pub fn sync(&mut self) -> QueueResult<()> {
        self.storage.sync()?;
        self.metrics.record_fsync();
        Ok(())
    }

    /// Sync and release the storage handle.
    pub fn close(mut self) -> QueueResult<()> {
        self.sync()?;
        debug!(len = self.len(), "queue closed");
        Ok(())
    }

    /// Give back the storage without syncing.
    pub fn into_inner(self) -> S {
        self.storage
    }

    #[inline]
    fn check_len(&self, actual: usize) -> QueueResult<()> {
        let expected = self.elem_size();
        if actual != expected {
            return Err(QueueError::IncorrectValueLength { expected, actual });
        }
        Ok(())
    }

    #[inline]
    fn barrier(&mut self) -> QueueResult<()> {
        if self.sync_policy == SyncPolicy::Always {
            self.sync()?;
        }
        Ok(())
    }

    fn write_slot(&mut self, index: u64, value: &[u8]) -> QueueResult<()> {
        write_at(&mut self.storage, self.geometry.slot_offset(index), value)?;
        Ok(())
    }

    fn read_slot(&mut self, index: u64, buf: &mut [u8]) -> QueueResult<()> {
        read_exact_at(&mut self.storage, self.geometry.slot_offset(index), buf)?;
        Ok(())
    }
}

impl<S: Storage> fmt::Debug for PersistentQueue<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (head, tail) = self.pointers();
        f.debug_struct("PersistentQueue")
            .field("geometry", &self.geometry)
            .field("sync_policy", &self.sync_policy)
            .field("head", &head)
            .field("tail", &tail)
            .field("len", &self.len())
            .finish()
    }
}

/// Iterator returned by [`PersistentQueue::iter`].
pub struct Iter<'a, S: Storage> {
    storage: &'a mut S,
    geometry: Geometry,
    next: u64,
    remaining: u64,
}

impl<S: Storage> Iterator for Iter<'_, S> {
    type Item = QueueResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let mut buf = vec![0u8; self.geometry.elem_size as usize];
        if let Err(e) = read_exact_at(self.storage, self.geometry.slot_offset(self.next), &mut buf) {
            self.remaining = 0;
            return Some(Err(e.into()));
        }

        self.next = self.geometry.advance(self.next);
        self.remaining -= 1;
        Some(Ok(buf))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}
