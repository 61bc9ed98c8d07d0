//! Typed view over [`PersistentQueue`] for plain-old-data elements.
//!
//! Elements are stored as their in-memory bytes via `zerocopy`, so a file
//! written on one target is only portable to targets with the same layout and
//! endianness for `T`.

use std::fs::File;
use std::marker::PhantomData;
use std::mem::size_of;
use std::path::Path;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::persistence::Storage;
use crate::queue::PersistentQueue;

/// A [`PersistentQueue`] whose slots hold one `T` each.
pub struct TypedQueue<T, S: Storage = File> {
    inner: PersistentQueue<S>,
    _marker: PhantomData<T>,
}

impl<T> TypedQueue<T, File>
where
    T: FromBytes + IntoBytes + KnownLayout + Immutable,
{
    /// Open `path` with `config.elem_size` equal to `size_of::<T>()`.
    pub fn open(path: impl AsRef<Path>, config: QueueConfig) -> QueueResult<Self> {
        check_elem_size::<T>(&config)?;
        Ok(Self::from_queue_unchecked(PersistentQueue::open(path, config)?))
    }
}

impl<T, S> TypedQueue<T, S>
where
    T: FromBytes + IntoBytes + KnownLayout + Immutable,
    S: Storage,
{
    pub fn with_storage(storage: S, config: QueueConfig) -> QueueResult<Self> {
        check_elem_size::<T>(&config)?;
        Ok(Self::from_queue_unchecked(PersistentQueue::with_storage(storage, config)?))
    }

    /// Wrap an untyped queue whose element size matches `T`.
    pub fn from_queue(inner: PersistentQueue<S>) -> QueueResult<Self> {
        if inner.elem_size() != size_of::<T>() {
            return Err(QueueError::IncorrectValueLength {
                expected: inner.elem_size(),
                actual: size_of::<T>(),
            });
        }
        Ok(Self::from_queue_unchecked(inner))
    }

    fn from_queue_unchecked(inner: PersistentQueue<S>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    pub fn put(&mut self, value: &T) -> QueueResult<()> {
        self.inner.put(value.as_bytes())
    }

    pub fn try_put(&mut self, value: &T) -> QueueResult<()> {
        self.inner.try_put(value.as_bytes())
    }

    pub fn head(&mut self) -> QueueResult<T> {
        let bytes = self.inner.head()?;
        T::read_from_bytes(&bytes).map_err(|_| QueueError::IncorrectValueLength {
            expected: size_of::<T>(),
            actual: bytes.len(),
        })
    }

    pub fn pop(&mut self) -> QueueResult<()> {
        self.inner.pop()
    }

    pub fn pop_front(&mut self) -> QueueResult<T> {
        let value = self.head()?;
        self.inner.pop()?;
        Ok(value)
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.inner.capacity()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn as_queue(&self) -> &PersistentQueue<S> {
        &self.inner
    }

    pub fn into_queue(self) -> PersistentQueue<S> {
        self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner.into_inner()
    }

    pub fn close(self) -> QueueResult<()> {
        self.inner.close()
    }
}

fn check_elem_size<T>(config: &QueueConfig) -> QueueResult<()> {
    if config.elem_size != size_of::<T>() {
        return Err(QueueError::IncorrectValueLength {
            expected: config.elem_size,
            actual: size_of::<T>(),
        });
    }
    Ok(())
}
