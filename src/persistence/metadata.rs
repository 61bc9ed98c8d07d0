//! Head/tail pointer region at the start of the queue file.

use std::fmt;

use super::atomic::AtomicValue;
use super::storage::{write_at, Storage};
use crate::error::QueueResult;

/// A slot index or nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Pointer {
    #[default]
    Empty,
    At(u64),
}

impl Pointer {
    #[inline(always)]
    pub const fn index(self) -> Option<u64> {
        match self {
            Pointer::Empty => None,
            Pointer::At(i) => Some(i),
        }
    }

    #[inline(always)]
    pub const fn is_empty(self) -> bool {
        matches!(self, Pointer::Empty)
    }
}

impl From<Option<u64>> for Pointer {
    fn from(value: Option<u64>) -> Self {
        match value {
            Some(i) => Pointer::At(i),
            None => Pointer::Empty,
        }
    }
}

impl From<Pointer> for Option<u64> {
    fn from(pointer: Pointer) -> Self {
        pointer.index()
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pointer::Empty => f.write_str("empty"),
            Pointer::At(i) => write!(f, "{i}"),
        }
    }
}

/// Two atomic pointers back to back at offset 0: head, then tail.
#[derive(Debug, Clone)]
pub struct MetadataRegion {
    head: AtomicValue,
    tail: AtomicValue,
}

impl MetadataRegion {
    /// Region size for pointers of `address_size` bytes.
    #[inline(always)]
    pub const fn size_for(address_size: usize) -> u64 {
        2 * AtomicValue::footprint_for(address_size)
    }

    pub fn load<S: Storage + ?Sized>(
        storage: &mut S,
        address_size: usize,
        ordered: bool,
    ) -> QueueResult<Self> {
        let head = AtomicValue::load(storage, 0, address_size)?.with_ordered_commit(ordered);
        let tail = AtomicValue::load(storage, head.footprint(), address_size)?
            .with_ordered_commit(ordered);
        Ok(Self { head, tail })
    }

    /// Zero-fill whatever part of the region lies at or beyond `existing_len`.
    ///
    /// Zero selectors mean both pointers are absent. Bytes below
    /// `existing_len` are left alone.
    pub fn initialize<S: Storage + ?Sized>(
        storage: &mut S,
        address_size: usize,
        existing_len: u64,
    ) -> QueueResult<()> {
        let size = Self::size_for(address_size);
        if existing_len < size {
            let zeros = vec![0u8; (size - existing_len) as usize];
            write_at(storage, existing_len, &zeros)?;
        }
        Ok(())
    }

    #[inline(always)]
    pub fn head(&self) -> Pointer {
        self.head.read().into()
    }

    #[inline(always)]
    pub fn tail(&self) -> Pointer {
        self.tail.read().into()
    }

    #[inline(always)]
    pub fn size(&self) -> u64 {
        self.head.footprint() + self.tail.footprint()
    }

    pub fn write_head<S: Storage + ?Sized>(
        &mut self,
        storage: &mut S,
        value: Pointer,
    ) -> QueueResult<()> {
        self.head.write(storage, value.index())
    }

    pub fn write_tail<S: Storage + ?Sized>(
        &mut self,
        storage: &mut S,
        value: Pointer,
    ) -> QueueResult<()> {
        self.tail.write(storage, value.index())
    }

    pub fn head_value(&self) -> &AtomicValue {
        &self.head
    }

    pub fn tail_value(&self) -> &AtomicValue {
        &self.tail
    }
}
