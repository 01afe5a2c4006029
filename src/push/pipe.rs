//! A bounded in-memory pipe whose two ends behave like event-driven native
//! streams.
//!
//! Bytes written to [`PipeOutput`] become readable from [`PipeInput`]. Each
//! end announces readiness of the other through its [`EventSink`], so the
//! pair can be driven by [`PushReader`](super::PushReader) and
//! [`PushWriter`](super::PushWriter) on separate threads.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    EventSink, NativeInput, NativeOutput, NativeStream, StreamEvent,
    StreamStatus,
};
use crate::errors::{IoError, Result};

/// Create a connected pipe holding at most `capacity` unread bytes
/// (at least one).
pub fn bound_pair(capacity: usize) -> (PipeInput, PipeOutput) {
    let channel = Arc::new(Mutex::new(Channel {
        buf: VecDeque::new(),
        capacity: capacity.max(1),
        input: End::default(),
        output: End::default(),
    }));
    (
        PipeInput {
            channel: channel.clone(),
        },
        PipeOutput { channel },
    )
}

struct Channel {
    buf: VecDeque<u8>,
    capacity: usize,
    input: End,
    output: End,
}

struct End {
    status: StreamStatus,
    events: Option<EventSink>,
    error: Option<IoError>,
}

impl Default for End {
    fn default() -> Self {
        Self {
            status: StreamStatus::NotOpen,
            events: None,
            error: None,
        }
    }
}

impl End {
    fn open(&mut self, events: EventSink) -> Result<()> {
        if self.status != StreamStatus::NotOpen {
            return Err(IoError::custom("pipe end was already opened"));
        }
        self.status = StreamStatus::Open;
        events.notify(StreamEvent::OpenCompleted);
        self.events = Some(events);
        Ok(())
    }

    fn notify(&self, event: StreamEvent) {
        if let Some(events) = &self.events {
            events.notify(event);
        }
    }

    fn is_finished(&self) -> bool {
        matches!(self.status, StreamStatus::Closed | StreamStatus::Error)
    }
}

/// The reading end.
pub struct PipeInput {
    channel: Arc<Mutex<Channel>>,
}

/// The writing end.
pub struct PipeOutput {
    channel: Arc<Mutex<Channel>>,
}

fn lock(channel: &Mutex<Channel>) -> MutexGuard<'_, Channel> {
    channel.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PipeInput {
    /// Unread bytes currently buffered.
    pub fn buffered(&self) -> usize {
        lock(&self.channel).buf.len()
    }
}

impl NativeStream for PipeInput {
    fn open(&mut self, events: EventSink) -> Result<()> {
        lock(&self.channel).input.open(events)
    }

    fn status(&self) -> StreamStatus {
        let channel = lock(&self.channel);
        match channel.input.status {
            StreamStatus::Open
                if channel.buf.is_empty() && channel.output.is_finished() =>
            {
                StreamStatus::AtEnd
            }
            status => status,
        }
    }

    /// Discards unread bytes. Further writes to the other end fail with a
    /// broken pipe.
    fn close(&mut self) {
        let mut channel = lock(&self.channel);
        if channel.input.status == StreamStatus::Closed {
            return;
        }
        channel.input.status = StreamStatus::Closed;
        channel.input.events = None;
        channel.buf.clear();

        if !channel.output.is_finished() {
            channel.output.status = StreamStatus::Error;
            channel.output.error = Some(IoError::os(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            )));
            channel.output.notify(StreamEvent::ErrorOccurred);
        }
    }

    fn stream_error(&self) -> Option<IoError> {
        lock(&self.channel).input.error.clone()
    }
}

impl NativeInput for PipeInput {
    fn has_bytes_available(&self) -> bool {
        let channel = lock(&self.channel);
        !channel.buf.is_empty() || channel.output.is_finished()
    }

    fn read(&mut self, buf: &mut [u8]) -> isize {
        let mut channel = lock(&self.channel);
        if channel.input.status == StreamStatus::Closed {
            return -1;
        }
        if channel.buf.is_empty() {
            if channel.output.is_finished() {
                channel.input.status = StreamStatus::AtEnd;
                return 0;
            }
            channel.input.error = Some(IoError::custom(
                "pipe read with no bytes available",
            ));
            return -1;
        }

        let n = buf.len().min(channel.buf.len());
        for (slot, byte) in buf.iter_mut().zip(channel.buf.drain(..n)) {
            *slot = byte;
        }
        channel.output.notify(StreamEvent::HasSpaceAvailable);
        n as isize
    }
}

impl Drop for PipeInput {
    fn drop(&mut self) {
        self.close();
    }
}

impl NativeStream for PipeOutput {
    fn open(&mut self, events: EventSink) -> Result<()> {
        lock(&self.channel).output.open(events)
    }

    fn status(&self) -> StreamStatus {
        lock(&self.channel).output.status
    }

    /// Marks the end of the data. The other end reads what is buffered and
    /// then reaches its end.
    fn close(&mut self) {
        let mut channel = lock(&self.channel);
        if channel.output.status == StreamStatus::Closed {
            return;
        }
        channel.output.status = StreamStatus::Closed;
        channel.output.events = None;
        channel.input.notify(StreamEvent::EndEncountered);
    }

    fn stream_error(&self) -> Option<IoError> {
        lock(&self.channel).output.error.clone()
    }
}

impl NativeOutput for PipeOutput {
    fn has_space_available(&self) -> bool {
        let channel = lock(&self.channel);
        channel.buf.len() < channel.capacity
    }

    fn write(&mut self, buf: &[u8]) -> isize {
        let mut channel = lock(&self.channel);
        if channel.output.is_finished() {
            return -1;
        }

        let n = buf.len().min(channel.capacity - channel.buf.len());
        if n > 0 {
            channel.buf.extend(&buf[..n]);
            channel.input.notify(StreamEvent::HasBytesAvailable);
        }
        n as isize
    }
}

impl Drop for PipeOutput {
    fn drop(&mut self) {
        self.close();
    }
}
