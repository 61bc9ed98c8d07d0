//! Double-buffered durable scalar.
//!
//! On-disk footprint is `[selector: 1][slot A: W][slot B: W]`, integers
//! big-endian. The selector names the slot holding the live value:
//!
//! - `0` (or anything other than 1/2): absent
//! - `1`: slot A
//! - `2`: slot B
//!
//! A write fills the inactive slot first and flips the selector last. The
//! one-byte selector write is the commit point, so a crash anywhere before it
//! leaves the previous value readable and intact.

use tracing::trace;

use super::storage::{read_at, read_exact_at, write_at, Storage};
use crate::error::{QueueError, QueueResult};

/// Widest supported value, in bytes.
pub const MAX_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Selector {
    Absent = 0,
    First = 1,
    Second = 2,
}

impl Selector {
    #[inline(always)]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            1 => Selector::First,
            2 => Selector::Second,
            _ => Selector::Absent,
        }
    }

    /// Slot the next write goes to.
    #[inline(always)]
    pub const fn inactive(self) -> Self {
        match self {
            Selector::First => Selector::Second,
            Selector::Second | Selector::Absent => Selector::First,
        }
    }
}

/// A durable `Option<u64>` of `width` bytes at a fixed offset.
///
/// Holds no handle of its own; every I/O call borrows the storage. The current
/// selector and value are cached at load time so `read` is free.
#[derive(Debug, Clone)]
pub struct AtomicValue {
    offset: u64,
    width: usize,
    selector: Selector,
    value: Option<u64>,
    ordered: bool,
}

impl AtomicValue {
    /// Bytes occupied on disk by a value of `width` bytes.
    #[inline(always)]
    pub const fn footprint_for(width: usize) -> u64 {
        1 + 2 * width as u64
    }

    /// Read the selector at `offset` and, if it names a slot, the value in it.
    ///
    /// A selector beyond end-of-file reads as absent.
    pub fn load<S: Storage + ?Sized>(
        storage: &mut S,
        offset: u64,
        width: usize,
    ) -> QueueResult<Self> {
        if width == 0 || width > MAX_WIDTH {
            return Err(QueueError::InvalidAddressSize(width));
        }

        let mut selector_buf = [0u8; 1];
        let selector = match read_at(storage, offset, &mut selector_buf)? {
            0 => Selector::Absent,
            _ => Selector::from_byte(selector_buf[0]),
        };

        let mut cell = Self {
            offset,
            width,
            selector,
            value: None,
            ordered: false,
        };

        if selector != Selector::Absent {
            let mut buf = [0u8; MAX_WIDTH];
            read_exact_at(storage, cell.slot_offset(selector), &mut buf[MAX_WIDTH - width..])?;
            cell.value = Some(u64::from_be_bytes(buf));
        }

        Ok(cell)
    }

    /// Issue a durability barrier between the slot write and the selector
    /// write, so the commit byte can never reach disk ahead of its payload.
    pub fn with_ordered_commit(mut self, ordered: bool) -> Self {
        self.ordered = ordered;
        self
    }

    #[inline(always)]
    pub fn read(&self) -> Option<u64> {
        self.value
    }

    #[inline(always)]
    pub fn selector(&self) -> Selector {
        self.selector
    }

    #[inline(always)]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    pub fn footprint(&self) -> u64 {
        Self::footprint_for(self.width)
    }

    /// Largest value that fits in `width` bytes.
    #[inline]
    pub fn max_value(&self) -> u64 {
        if self.width == MAX_WIDTH {
            u64::MAX
        } else {
            (1u64 << (8 * self.width)) - 1
        }
    }

    /// Offset of the slot `selector` points at. Absent maps to slot A.
    #[inline]
    pub fn slot_offset(&self, selector: Selector) -> u64 {
        match selector {
            Selector::Second => self.offset + 1 + self.width as u64,
            Selector::First | Selector::Absent => self.offset + 1,
        }
    }

    /// Atomically replace the stored value.
    ///
    /// `None` only rewrites the selector. `Some` goes to the inactive slot and
    /// is committed by the selector write that follows it.
    pub fn write<S: Storage + ?Sized>(
        &mut self,
        storage: &mut S,
        value: Option<u64>,
    ) -> QueueResult<()> {
        let Some(v) = value else {
            write_at(storage, self.offset, &[Selector::Absent as u8])?;
            self.selector = Selector::Absent;
            self.value = None;
            trace!(offset = self.offset, "cleared atomic value");
            return Ok(());
        };

        if v > self.max_value() {
            return Err(QueueError::ValueOutOfRange {
                value: v,
                width: self.width,
            });
        }

        let target = self.selector.inactive();
        let bytes = v.to_be_bytes();
        write_at(storage, self.slot_offset(target), &bytes[MAX_WIDTH - self.width..])?;

        if self.ordered {
            storage.sync()?;
        }

        // Commit point.
        write_at(storage, self.offset, &[target as u8])?;

        self.selector = target;
        self.value = Some(v);
        trace!(offset = self.offset, value = v, selector = ?target, "committed atomic value");
        Ok(())
    }
}
