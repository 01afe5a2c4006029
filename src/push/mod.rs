//! Bridge from event-driven ("push-style") native streams to the blocking
//! [`Reader`](crate::Reader) / [`Writer`](crate::Writer) contract.
//!
//! A native stream never blocks: it is opened with an [`EventSink`] and
//! reports readiness by posting [`StreamEvent`]s into it. An [`EventPump`]
//! thread delivers those events to the adapter that owns the stream, which
//! parks the calling thread until the stream is ready and then performs the
//! transfer.

mod adapter;
pub mod pipe;
mod pump;

pub use adapter::{PushReader, PushWriter};
pub use pump::{EventPump, EventSink, StreamId};

use crate::errors::{IoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamEvent {
    OpenCompleted,
    HasBytesAvailable,
    HasSpaceAvailable,
    ErrorOccurred,
    EndEncountered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    NotOpen,
    Opening,
    Open,
    AtEnd,
    Closed,
    Error,
}

impl StreamStatus {
    /// No readiness event can follow this status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StreamStatus::AtEnd | StreamStatus::Closed | StreamStatus::Error
        )
    }
}

/// Lifecycle shared by native input and output streams.
pub trait NativeStream: Send {
    /// Start the stream. Events for it must be posted to `events` from now
    /// on. Called exactly once, on a stream whose status is `NotOpen`.
    fn open(&mut self, events: EventSink) -> Result<()>;

    fn status(&self) -> StreamStatus;

    fn close(&mut self);

    /// The error that put the stream into [`StreamStatus::Error`], if any.
    fn stream_error(&self) -> Option<IoError>;
}

pub trait NativeInput: NativeStream {
    fn has_bytes_available(&self) -> bool;

    /// Positive: bytes read. Zero: end of stream. Negative: failure, see
    /// [`NativeStream::stream_error`].
    fn read(&mut self, buf: &mut [u8]) -> isize;
}

pub trait NativeOutput: NativeStream {
    fn has_space_available(&self) -> bool;

    /// Positive: bytes accepted. Zero: no capacity left. Negative: failure,
    /// see [`NativeStream::stream_error`].
    fn write(&mut self, buf: &[u8]) -> isize;
}
