//! Byte-addressable backing store for the queue file.

use std::fs::File;
use std::io::{self, Cursor, ErrorKind, Read, Seek, SeekFrom, Write};

/// Backend the queue reads and writes through.
///
/// Anything seekable works. `sync` is the durability barrier: once it returns,
/// every byte written before the call must survive a crash.
pub trait Storage: Read + Write + Seek {
    fn sync(&mut self) -> io::Result<()>;
}

impl Storage for File {
    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_all()
    }
}

/// In-memory backend. Nothing to sync.
impl Storage for Cursor<Vec<u8>> {
    fn sync(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}

/// Read up to `buf.len()` bytes at `offset`, stopping early at end-of-file.
///
/// Returns the number of bytes read. Bytes past EOF are left untouched.
pub(crate) fn read_at<S: Storage + ?Sized>(
    storage: &mut S,
    offset: u64,
    buf: &mut [u8],
) -> io::Result<usize> {
    storage.seek(SeekFrom::Start(offset))?;
    let mut filled = 0;
    while filled < buf.len() {
        match storage.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read exactly `buf.len()` bytes at `offset`.
#[inline]
pub(crate) fn read_exact_at<S: Storage + ?Sized>(
    storage: &mut S,
    offset: u64,
    buf: &mut [u8],
) -> io::Result<()> {
    storage.seek(SeekFrom::Start(offset))?;
    storage.read_exact(buf)
}

#[inline]
pub(crate) fn write_at<S: Storage + ?Sized>(
    storage: &mut S,
    offset: u64,
    bytes: &[u8],
) -> io::Result<()> {
    storage.seek(SeekFrom::Start(offset))?;
    storage.write_all(bytes)
}

/// Current length of the store in bytes.
pub(crate) fn len<S: Storage + ?Sized>(storage: &mut S) -> io::Result<u64> {
    storage.seek(SeekFrom::End(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_at_stops_at_eof() {
        let mut disk = Cursor::new(vec![1u8, 2, 3]);
        let mut buf = [0xAAu8; 4];

        let n = read_at(&mut disk, 1, &mut buf).unwrap();

        assert_eq!(n, 2);
        assert_eq!(buf, [2, 3, 0xAA, 0xAA]);
    }

    #[test]
    fn test_read_at_past_eof_reads_nothing() {
        let mut disk = Cursor::new(Vec::new());
        let mut buf = [0u8; 1];
        assert_eq!(read_at(&mut disk, 10, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_write_at_extends() {
        let mut disk = Cursor::new(Vec::new());
        write_at(&mut disk, 2, &[7, 8]).unwrap();

        assert_eq!(len(&mut disk).unwrap(), 4);
        assert_eq!(disk.get_ref().as_slice(), &[0, 0, 7, 8]);
    }

    #[test]
    fn test_read_exact_at_short_is_error() {
        let mut disk = Cursor::new(vec![0u8; 3]);
        let mut buf = [0u8; 4];
        let err = read_exact_at(&mut disk, 0, &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }
}
