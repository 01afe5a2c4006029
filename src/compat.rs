//! Interop with `std::io`.

use std::io::{self, SeekFrom};

use crate::errors::{IoError, Result};
use crate::traits::{Closer, Reader, Seeker, Whence, Writer};

/// Presents one of our streams as `std::io::{Read, Write, Seek}`.
#[derive(Debug, Clone, Default)]
pub struct StdAdapter<T>(pub T);

impl<T> StdAdapter<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Reader> io::Read for StdAdapter<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.read(buf) {
            Err(IoError::Eof) => Ok(0),
            other => Ok(other?),
        }
    }
}

impl<T: Writer> io::Write for StdAdapter<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.0.write(buf) {
            Err(IoError::ShortWrite { written, .. }) if written > 0 => {
                Ok(written)
            }
            other => Ok(other?),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Seeker> io::Seek for StdAdapter<T> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            SeekFrom::Start(offset) => (
                i64::try_from(offset)
                    .map_err(|_| IoError::InvalidSeekOffset(i64::MAX))?,
                Whence::Start,
            ),
            SeekFrom::Current(offset) => (offset, Whence::Current),
            SeekFrom::End(offset) => (offset, Whence::End),
        };
        Ok(self.0.seek(offset, whence)?)
    }
}

/// Presents a `std::io` type as one of our streams.
#[derive(Debug, Clone, Default)]
pub struct FromStd<T>(pub T);

impl<T> FromStd<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: io::Read> Reader for FromStd<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.0.read(buf) {
                Ok(0) => return Err(IoError::Eof),
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(IoError::read_failure(err)),
            }
        }
    }
}

impl<T: io::Write> Writer for FromStd<T> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut written = 0;
        let mut reason = None;
        while written < buf.len() {
            match self.0.write(&buf[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) if written == 0 => {
                    return Err(IoError::read_failure(err))
                }
                Err(err) => {
                    reason = Some(IoError::read_failure(err));
                    break;
                }
            }
        }
        if written < buf.len() {
            return Err(IoError::short_write(written, buf.len(), reason));
        }
        Ok(written)
    }
}

impl<T: io::Seek> Seeker for FromStd<T> {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let pos = match whence {
            Whence::Start => SeekFrom::Start(
                u64::try_from(offset)
                    .map_err(|_| IoError::InvalidSeekOffset(offset))?,
            ),
            Whence::Current => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };
        self.0.seek(pos).map_err(|err| match err.kind() {
            io::ErrorKind::InvalidInput => IoError::InvalidSeekOffset(offset),
            _ => IoError::os(err),
        })
    }
}

/// `std::io` types release their resources on drop.
impl<T> Closer for FromStd<T> {
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
