//! Small composition utilities layered on the capability traits.

use crate::errors::{IoError, Result};
use crate::traits::{
    read_one, ByteReader, ByteScanner, Closer, Reader, Writer,
};

/// A reader whose `close` does nothing.
#[derive(Debug, Clone, Default)]
pub struct NopCloser<R>(pub R);

impl<R> NopCloser<R> {
    pub fn into_inner(self) -> R {
        self.0
    }
}

impl<R: Reader> Reader for NopCloser<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.0.read(buf)
    }
}

impl<R> Closer for NopCloser<R> {
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// An independent reader and writer seen as one bidirectional stream.
/// Neither side's lifecycle is managed.
#[derive(Debug, Clone, Default)]
pub struct ReadWrite<R, W> {
    pub reader: R,
    pub writer: W,
}

impl<R, W> ReadWrite<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: Reader, W> Reader for ReadWrite<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.reader.read(buf)
    }
}

impl<R, W: Writer> Writer for ReadWrite<R, W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.writer.write(buf)
    }
}

/// Like [`ReadWrite`], but closing it closes both sides.
#[derive(Debug, Clone, Default)]
pub struct ReadWriteClose<R, W> {
    pub reader: R,
    pub writer: W,
}

impl<R, W> ReadWriteClose<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R: Reader, W> Reader for ReadWriteClose<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.reader.read(buf)
    }
}

impl<R, W: Writer> Writer for ReadWriteClose<R, W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.writer.write(buf)
    }
}

impl<R: Closer, W: Closer> Closer for ReadWriteClose<R, W> {
    /// Both sides are always closed. The reader's error wins if both fail.
    fn close(&mut self) -> Result<()> {
        let read = self.reader.close();
        let write = self.writer.close();
        read.and(write)
    }
}

/// One byte of pushback on top of any reader.
#[derive(Debug, Clone, Default)]
pub struct Pushback<R> {
    inner: R,
    slot: Option<u8>,
}

impl<R> Pushback<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, slot: None }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// The wrapped reader. A pending pushed-back byte is lost.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Reader> Reader for Pushback<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.slot.take() {
            Some(byte) => {
                buf[0] = byte;
                Ok(1)
            }
            None => self.inner.read(buf),
        }
    }
}

impl<R: Reader> ByteReader for Pushback<R> {
    fn read_byte(&mut self) -> Result<u8> {
        read_one(self)
    }
}

impl<R: Reader> ByteScanner for Pushback<R> {
    fn unread_byte(&mut self, byte: u8) -> Result<()> {
        if self.slot.is_some() {
            return Err(IoError::custom("pushback slot is already occupied"));
        }
        self.slot = Some(byte);
        Ok(())
    }
}

impl<R: Closer> Closer for Pushback<R> {
    fn close(&mut self) -> Result<()> {
        self.slot = None;
        self.inner.close()
    }
}

/// Outcome of [`using`].
#[must_use]
#[derive(Debug)]
pub enum Scoped<T> {
    /// The resource was acquired, used, and closed.
    Used(T),
    /// Acquisition failed; the body never ran.
    Failed(IoError),
}

impl<T> Scoped<T> {
    /// Produce a value from the acquisition error. `handler` only runs
    /// when acquisition failed.
    pub fn catch(self, handler: impl FnOnce(IoError) -> T) -> T {
        match self {
            Scoped::Used(value) => value,
            Scoped::Failed(err) => handler(err),
        }
    }

    pub fn into_result(self) -> Result<T> {
        match self {
            Scoped::Used(value) => Ok(value),
            Scoped::Failed(err) => Err(err),
        }
    }
}

/// Run `body` on a freshly acquired resource and close it afterwards.
///
/// The resource is closed on every exit path out of `body`, unwinding
/// included. Close failures are logged rather than returned, so they never
/// mask the body's result.
pub fn using<C, T>(
    acquired: Result<C>,
    body: impl FnOnce(&mut C) -> T,
) -> Scoped<T>
where
    C: Closer,
{
    let resource = match acquired {
        Ok(resource) => resource,
        Err(err) => return Scoped::Failed(err),
    };
    let mut guard = CloseGuard(resource);
    Scoped::Used(body(&mut guard.0))
}

struct CloseGuard<C: Closer>(C);

impl<C: Closer> Drop for CloseGuard<C> {
    fn drop(&mut self) {
        if let Err(err) = self.0.close() {
            log::warn!("Failed to close scoped resource: {}", err);
        }
    }
}
