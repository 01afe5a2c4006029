//! Capability interfaces shared by every stream in the crate.
//!
//! Composite traits carry no behavior of their own: anything implementing
//! the constituent capabilities implements the composite automatically.

use crate::errors::{IoError, Result};

/// Origin of a seek offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

pub trait Reader {
    /// Read at most `buf.len()` bytes into `buf`.
    ///
    /// A short read is not an error. Once no more bytes will ever be
    /// available the implementation reports [`IoError::Eof`]; a request
    /// for zero bytes always returns `Ok(0)`.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Append everything up to end-of-stream (or a zero-byte read) to
    /// `out`, returning how many bytes were appended.
    fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let mut chunk = [0u8; 512];
        let start = out.len();
        loop {
            match self.read(&mut chunk) {
                Ok(0) | Err(IoError::Eof) => return Ok(out.len() - start),
                Ok(n) => out.extend_from_slice(&chunk[..n]),
                Err(err) => return Err(err),
            }
        }
    }
}

pub trait Writer {
    /// Write all of `buf`.
    ///
    /// `Ok(n)` always means `n == buf.len()`. Anything less is reported
    /// as an error, see [`IoError::written`].
    fn write(&mut self, buf: &[u8]) -> Result<usize>;
}

pub trait Closer {
    /// Release the resource. A second call reports
    /// [`IoError::AlreadyClosed`] without running teardown again.
    fn close(&mut self) -> Result<()>;
}

pub trait Seeker {
    /// Move the cursor and return the new absolute position.
    ///
    /// Out-of-range targets report [`IoError::InvalidSeekOffset`] and leave
    /// the position untouched.
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64>;
}

pub trait ByteReader {
    fn read_byte(&mut self) -> Result<u8>;
}

pub trait ByteScanner: ByteReader {
    /// Push `byte` back so that the next `read_byte` returns it.
    /// Only one byte of pushback is guaranteed. Sources that cannot hold a
    /// foreign byte may accept only the byte they last produced.
    fn unread_byte(&mut self, byte: u8) -> Result<()>;
}

pub trait ReadWriter: Reader + Writer {}
pub trait ReadCloser: Reader + Closer {}
pub trait WriteCloser: Writer + Closer {}
pub trait ReadWriteCloser: Reader + Writer + Closer {}
pub trait ReadSeeker: Reader + Seeker {}
pub trait WriteSeeker: Writer + Seeker {}
pub trait ReadWriteSeeker: Reader + Writer + Seeker {}

impl<T: Reader + Writer + ?Sized> ReadWriter for T {}
impl<T: Reader + Closer + ?Sized> ReadCloser for T {}
impl<T: Writer + Closer + ?Sized> WriteCloser for T {}
impl<T: Reader + Writer + Closer + ?Sized> ReadWriteCloser for T {}
impl<T: Reader + Seeker + ?Sized> ReadSeeker for T {}
impl<T: Writer + Seeker + ?Sized> WriteSeeker for T {}
impl<T: Reader + Writer + Seeker + ?Sized> ReadWriteSeeker for T {}

impl<R: Reader + ?Sized> Reader for &mut R {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }
}

impl<R: Reader + ?Sized> Reader for Box<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }
}

impl<W: Writer + ?Sized> Writer for &mut W {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }
}

impl<W: Writer + ?Sized> Writer for Box<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }
}

impl<C: Closer + ?Sized> Closer for &mut C {
    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<C: Closer + ?Sized> Closer for Box<C> {
    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<S: Seeker + ?Sized> Seeker for &mut S {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        (**self).seek(offset, whence)
    }
}

impl<S: Seeker + ?Sized> Seeker for Box<S> {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        (**self).seek(offset, whence)
    }
}

/// Resolve a seek against an in-memory region of `len` bytes.
pub(crate) fn resolve_seek(
    cursor: usize,
    len: usize,
    offset: i64,
    whence: Whence,
) -> Result<usize> {
    let base = match whence {
        Whence::Start => 0,
        Whence::Current => cursor as i128,
        Whence::End => len as i128,
    };
    let target = base + offset as i128;
    if target < 0 || target > len as i128 {
        let attempted =
            i64::try_from(target).unwrap_or(if target < 0 {
                i64::MIN
            } else {
                i64::MAX
            });
        return Err(IoError::InvalidSeekOffset(attempted));
    }
    Ok(target as usize)
}

/// Single-byte read on top of [`Reader::read`], treating a zero-byte
/// read as end-of-stream.
pub(crate) fn read_one<R: Reader + ?Sized>(reader: &mut R) -> Result<u8> {
    let mut byte = [0u8; 1];
    match reader.read(&mut byte)? {
        0 => Err(IoError::Eof),
        _ => Ok(byte[0]),
    }
}
