//! Minimal synchronous I/O layer: capability traits, in-memory streams,
//! native file descriptors, a bridge for event-driven native streams, and a
//! chunked copy between any reader and writer.

pub mod adapters;
pub mod buffer;
pub mod compat;
pub mod copy;
pub mod errors;
#[cfg(unix)]
pub mod file;
pub mod fixed;
pub mod push;
pub mod traits;

pub use adapters::{
    using, NopCloser, Pushback, ReadWrite, ReadWriteClose, Scoped,
};
pub use buffer::GrowableBuffer;
pub use compat::{FromStd, StdAdapter};
pub use copy::{
    copy, copy_limited, copy_with, CopyError, CopyOptions, DEFAULT_CHUNK_SIZE,
};
pub use errors::{IoError, Result};
#[cfg(unix)]
pub use file::{stderr, stdin, stdout, File};
pub use fixed::FixedBufferReader;
pub use push::{PushReader, PushWriter};
pub use traits::{
    ByteReader, ByteScanner, Closer, ReadCloser, ReadSeeker, ReadWriteCloser,
    ReadWriteSeeker, ReadWriter, Reader, Seeker, Whence, WriteCloser,
    WriteSeeker, Writer,
};
