//! Queue configuration and the slot geometry derived from it.

use crate::error::{BoundsError, QueueError, QueueResult};
use crate::persistence::{MetadataRegion, MAX_WIDTH};

/// Supports files up to roughly 4 billion slots.
pub const DEFAULT_ADDRESS_SIZE: usize = 4;

/// When the queue forces its writes to stable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// Never sync. Writes reach disk whenever the OS flushes them.
    Never,
    /// Sync at the end of every `put`. `pop` is not synced.
    #[default]
    OnPut,
    /// Sync after every mutation, with a barrier before each pointer commit.
    Always,
}

/// Options for opening a queue. The file path is passed separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Upper bound on the file size in bytes, metadata included.
    pub max_file_size: u64,
    /// Bytes per element. Fixed for the lifetime of the file.
    pub elem_size: usize,
    /// Bytes per stored pointer.
    pub address_size: usize,
    pub sync_policy: SyncPolicy,
}

impl QueueConfig {
    pub fn new(max_file_size: u64, elem_size: usize) -> Self {
        Self {
            max_file_size,
            elem_size,
            address_size: DEFAULT_ADDRESS_SIZE,
            sync_policy: SyncPolicy::default(),
        }
    }

    pub fn with_address_size(mut self, address_size: usize) -> Self {
        self.address_size = address_size;
        self
    }

    pub fn with_sync_policy(mut self, sync_policy: SyncPolicy) -> Self {
        self.sync_policy = sync_policy;
        self
    }

    /// Validate and compute the file geometry.
    pub fn geometry(&self) -> QueueResult<Geometry> {
        Geometry::compute(self.max_file_size, self.elem_size, self.address_size)
    }
}

/// Byte layout of a queue file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub address_size: usize,
    pub metadata_size: u64,
    pub elem_size: u64,
    pub capacity: u64,
}

impl Geometry {
    /// `capacity = (max_file_size - metadata_size) / elem_size`, which must be
    /// positive and addressable with `address_size` bytes.
    pub fn compute(max_file_size: u64, elem_size: usize, address_size: usize) -> QueueResult<Self> {
        if address_size == 0 || address_size > MAX_WIDTH {
            return Err(QueueError::InvalidAddressSize(address_size));
        }

        let metadata_size = MetadataRegion::size_for(address_size);
        let elem_size = elem_size as u64;
        if elem_size == 0 {
            return Err(BoundsError::TooSmall.into());
        }

        let capacity = max_file_size
            .checked_sub(metadata_size)
            .map(|slots| slots / elem_size)
            .unwrap_or(0);
        if capacity == 0 {
            return Err(BoundsError::TooSmall.into());
        }

        let addressable = 256u128.pow(address_size as u32);
        if u128::from(capacity) > addressable {
            return Err(BoundsError::TooBig.into());
        }

        Ok(Self {
            address_size,
            metadata_size,
            elem_size,
            capacity,
        })
    }

    /// File offset of slot `index`.
    #[inline(always)]
    pub fn slot_offset(&self, index: u64) -> u64 {
        self.metadata_size + index * self.elem_size
    }

    /// Index following `index`, wrapping at capacity.
    #[inline(always)]
    pub fn advance(&self, index: u64) -> u64 {
        if index + 1 >= self.capacity {
            0
        } else {
            index + 1
        }
    }

    /// Occupied slots from `head` to `tail` inclusive.
    #[inline]
    pub fn span(&self, head: u64, tail: u64) -> u64 {
        if tail >= head {
            tail - head + 1
        } else {
            self.capacity - (head - tail) + 1
        }
    }

    /// Bytes used once every slot has been written.
    #[inline]
    pub fn file_size(&self) -> u64 {
        self.slot_offset(self.capacity)
    }
}
