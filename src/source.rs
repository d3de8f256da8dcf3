//! Random-access byte sources.
//!
//! The reader never assumes a whole file is resident. It asks its source for
//! one bounded prefix (to find `moov`) and then for one small range per sample.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::{Arc, Mutex};

/// A random-access, read-only view of a file's bytes.
///
/// Implementations decide their own timeout and retry policy; the reader
/// performs neither.
pub trait ByteSource {
    /// Total length in bytes.
    fn len(&self) -> io::Result<u64>;

    /// Read `start..end`. The returned buffer is exactly `end - start` bytes
    /// long, or an `UnexpectedEof` error is returned.
    fn read_range(&self, start: u64, end: u64) -> io::Result<Vec<u8>>;

    fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn check_range(start: u64, end: u64, len: u64) -> io::Result<()> {
    if start > end {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("range start {} is past end {}", start, end),
        ));
    }
    if end > len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("range {}..{} is past source length {}", start, end, len),
        ));
    }
    Ok(())
}

impl ByteSource for [u8] {
    fn len(&self) -> io::Result<u64> {
        Ok(<[u8]>::len(self) as u64)
    }

    fn read_range(&self, start: u64, end: u64) -> io::Result<Vec<u8>> {
        check_range(start, end, <[u8]>::len(self) as u64)?;
        Ok(self[start as usize..end as usize].to_vec())
    }
}

impl ByteSource for Vec<u8> {
    fn len(&self) -> io::Result<u64> {
        ByteSource::len(self.as_slice())
    }

    fn read_range(&self, start: u64, end: u64) -> io::Result<Vec<u8>> {
        self.as_slice().read_range(start, end)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &T {
    fn len(&self) -> io::Result<u64> {
        (**self).len()
    }

    fn read_range(&self, start: u64, end: u64) -> io::Result<Vec<u8>> {
        (**self).read_range(start, end)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for Arc<T> {
    fn len(&self) -> io::Result<u64> {
        (**self).len()
    }

    fn read_range(&self, start: u64, end: u64) -> io::Result<Vec<u8>> {
        (**self).read_range(start, end)
    }
}

/// Adapts any `Read + Seek` (a `File`, a `Cursor`) into a [`ByteSource`].
///
/// The inner reader sits behind a mutex so reads can be issued through `&self`.
pub struct SeekSource<R> {
    inner: Mutex<R>,
    len: u64,
}

impl<R: Read + Seek> SeekSource<R> {
    pub fn new(mut inner: R) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner: Mutex::new(inner),
            len,
        })
    }

    pub fn into_inner(self) -> R {
        match self.inner.into_inner() {
            Ok(r) => r,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<R: Read + Seek> ByteSource for SeekSource<R> {
    fn len(&self) -> io::Result<u64> {
        Ok(self.len)
    }

    fn read_range(&self, start: u64, end: u64) -> io::Result<Vec<u8>> {
        check_range(start, end, self.len)?;
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("byte source lock poisoned"))?;
        read_slice(&mut *guard, start, end - start)
    }
}

pub fn read_slice<R: Read + Seek>(r: &mut R, offset: u64, len: u64) -> io::Result<Vec<u8>> {
    r.seek(SeekFrom::Start(offset))?;
    let mut v = vec![0u8; len as usize];
    r.read_exact(&mut v)?;
    Ok(v)
}

/// Read at most `max` bytes from the start of `source`.
pub fn read_prefix<S: ByteSource + ?Sized>(source: &S, max: u64) -> io::Result<Vec<u8>> {
    let len = source.len()?;
    source.read_range(0, len.min(max))
}
