use std::sync::Arc;

use super::pump::{PumpHandle, Readiness};
use super::{EventPump, NativeInput, NativeOutput, NativeStream, StreamId};
use super::StreamStatus;
use crate::errors::{IoError, Result};
use crate::traits::{read_one, ByteReader, Closer, Reader, Writer};

/// Registration of one native stream with a pump.
struct Attached<S: NativeStream> {
    stream: S,
    readiness: Arc<Readiness>,
    id: StreamId,
    pump: PumpHandle,
    closed: bool,
}

impl<S: NativeStream> Attached<S> {
    fn open(mut stream: S, pump: PumpHandle) -> Result<Self> {
        let status = stream.status();
        if status != StreamStatus::NotOpen {
            return Err(IoError::custom(format!(
                "native stream must not be opened yet, status is {:?}",
                status
            )));
        }

        let readiness = Arc::new(Readiness::default());
        let events = pump.register(readiness.clone());
        let id = events.stream_id();
        if let Err(err) = stream.open(events) {
            pump.deregister(id);
            return Err(err);
        }

        Ok(Self {
            stream,
            readiness,
            id,
            pump,
            closed: false,
        })
    }

    /// Park until `ready` holds or the stream can no longer become ready.
    fn wait_until(&self, ready: impl Fn(&S) -> bool) {
        while !ready(&self.stream) && !self.stream.status().is_terminal() {
            let event = self.readiness.wait();
            log::trace!("Stream {} woke up on {:?}", self.id, event);
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(IoError::AlreadyClosed);
        }
        self.closed = true;
        self.stream.close();
        self.pump.deregister(self.id);
        match self.stream.stream_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<S: NativeStream> Drop for Attached<S> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.close() {
            log::debug!("Stream {} closed on drop with {}", self.id, err);
        }
    }
}

/// Blocking [`Reader`] over an event-driven native input stream.
pub struct PushReader<S: NativeInput> {
    inner: Attached<S>,
}

impl<S: NativeInput> PushReader<S> {
    /// Open `stream` on the process-wide pump.
    pub fn new(stream: S) -> Result<Self> {
        Self::with_pump(stream, EventPump::global()?)
    }

    pub fn with_pump(stream: S, pump: &EventPump) -> Result<Self> {
        Ok(Self {
            inner: Attached::open(stream, pump.handle())?,
        })
    }

    pub fn get_ref(&self) -> &S {
        &self.inner.stream
    }

    pub fn stream_id(&self) -> StreamId {
        self.inner.id
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed
    }
}

impl<S: NativeInput> Reader for PushReader<S> {
    /// Blocks until the stream has bytes, reaches its end, or fails.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.inner.closed {
            return Err(IoError::AlreadyClosed);
        }

        self.inner.wait_until(|stream| stream.has_bytes_available());
        match self.inner.stream.read(buf) {
            n if n > 0 => Ok(n as usize),
            0 => Err(IoError::Eof),
            _ => Err(self.inner.stream.stream_error().unwrap_or_else(|| {
                IoError::ReadFailure {
                    message: "native stream read failed".to_owned(),
                    code: -1,
                }
            })),
        }
    }
}

impl<S: NativeInput> ByteReader for PushReader<S> {
    fn read_byte(&mut self) -> Result<u8> {
        read_one(self)
    }
}

impl<S: NativeInput> Closer for PushReader<S> {
    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

/// Blocking [`Writer`] over an event-driven native output stream.
pub struct PushWriter<S: NativeOutput> {
    inner: Attached<S>,
}

impl<S: NativeOutput> PushWriter<S> {
    /// Open `stream` on the process-wide pump.
    pub fn new(stream: S) -> Result<Self> {
        Self::with_pump(stream, EventPump::global()?)
    }

    pub fn with_pump(stream: S, pump: &EventPump) -> Result<Self> {
        Ok(Self {
            inner: Attached::open(stream, pump.handle())?,
        })
    }

    pub fn get_ref(&self) -> &S {
        &self.inner.stream
    }

    pub fn stream_id(&self) -> StreamId {
        self.inner.id
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed
    }
}

impl<S: NativeOutput> Writer for PushWriter<S> {
    /// Blocks until all of `buf` is accepted. A failure after some bytes
    /// went out is reported as [`IoError::ShortWrite`].
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.inner.closed {
            return Err(IoError::AlreadyClosed);
        }

        let mut written = 0;
        while written < buf.len() {
            self.inner.wait_until(|stream| stream.has_space_available());
            let n = self.inner.stream.write(&buf[written..]);
            if n > 0 {
                written += n as usize;
                continue;
            }

            let failure = self.inner.stream.stream_error();
            if written == 0 {
                return Err(failure.unwrap_or_else(|| IoError::Unknown {
                    message: "native stream accepted no bytes".to_owned(),
                    code: -1,
                }));
            }
            log::debug!(
                "Stream {} failed after {} of {} bytes",
                self.inner.id,
                written,
                buf.len()
            );
            return Err(IoError::short_write(written, buf.len(), failure));
        }

        Ok(written)
    }
}

impl<S: NativeOutput> Closer for PushWriter<S> {
    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}
