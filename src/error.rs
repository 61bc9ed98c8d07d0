use std::io;

use thiserror::Error;

use crate::persistence::Pointer;

/// Result alias for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Construction-time geometry failures. The queue cannot be used; the caller
/// has to change `max_file_size`, `elem_size` or `address_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoundsError {
    #[error("too small bounds, try increasing max_file_size or decreasing elem_size")]
    TooSmall,

    #[error("too big bounds, try decreasing max_file_size or increasing elem_size")]
    TooBig,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("incorrect bounds: {0}")]
    IncorrectBounds(#[from] BoundsError),

    #[error("address size must be between 1 and 8 bytes, got {0}")]
    InvalidAddressSize(usize),

    #[error("incorrect value length: expected {expected} bytes, got {actual}")]
    IncorrectValueLength { expected: usize, actual: usize },

    #[error("queue is empty")]
    QueueIsEmpty,

    #[error("queue is full")]
    QueueIsFull,

    /// Committed pointers do not fit the configured geometry, usually because
    /// the file was reopened with a smaller `max_file_size` or larger `elem_size`.
    #[error("corrupt metadata: head {head:?} / tail {tail:?} outside capacity {capacity}")]
    CorruptMetadata {
        head: Pointer,
        tail: Pointer,
        capacity: u64,
    },

    #[error("value {value} does not fit in {width} bytes")]
    ValueOutOfRange { value: u64, width: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl QueueError {
    /// True for caller mistakes that leave the queue untouched.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            QueueError::IncorrectValueLength { .. }
                | QueueError::QueueIsEmpty
                | QueueError::QueueIsFull
        )
    }
}
