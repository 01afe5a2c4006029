use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::errors::Result;
use crate::traits::{
    read_one, resolve_seek, ByteReader, Reader, Seeker, Whence, Writer,
};

/// Append-only byte buffer with an independent read cursor.
///
/// Writes always append, wherever the cursor is. Reads advance the cursor
/// and never report end-of-stream: an empty read only means nothing is
/// available yet, since the buffer may still grow.
///
/// One lock guards both ends, so a shared `&GrowableBuffer` can be read
/// from and written to by several threads at once.
#[derive(Debug, Default)]
pub struct GrowableBuffer {
    state: Mutex<BufferState>,
}

#[derive(Debug, Default)]
struct BufferState {
    data: Vec<u8>,
    cursor: usize,
}

impl GrowableBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from(Vec::with_capacity(capacity))
    }

    /// Total bytes ever written.
    pub fn len(&self) -> usize {
        self.lock().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self) -> usize {
        self.lock().cursor
    }

    pub fn remaining(&self) -> usize {
        let state = self.lock();
        state.data.len() - state.cursor
    }

    /// Snapshot of the whole region, independent of the cursor.
    pub fn to_vec(&self) -> Vec<u8> {
        self.lock().data.clone()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .data
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Vec<u8>> for GrowableBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self {
            state: Mutex::new(BufferState { data, cursor: 0 }),
        }
    }
}

impl Reader for &GrowableBuffer {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.lock();
        let start = state.cursor;
        let count = buf.len().min(state.data.len() - start);
        buf[..count].copy_from_slice(&state.data[start..start + count]);
        state.cursor += count;
        Ok(count)
    }
}

impl Writer for &GrowableBuffer {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.lock().data.extend_from_slice(buf);
        Ok(buf.len())
    }
}

impl Seeker for &GrowableBuffer {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let mut state = self.lock();
        state.cursor =
            resolve_seek(state.cursor, state.data.len(), offset, whence)?;
        Ok(state.cursor as u64)
    }
}

impl ByteReader for &GrowableBuffer {
    fn read_byte(&mut self) -> Result<u8> {
        read_one(self)
    }
}

impl Reader for GrowableBuffer {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (&*self).read(buf)
    }
}

impl Writer for GrowableBuffer {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (&*self).write(buf)
    }
}

impl Seeker for GrowableBuffer {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        (&*self).seek(offset, whence)
    }
}

impl ByteReader for GrowableBuffer {
    fn read_byte(&mut self) -> Result<u8> {
        (&*self).read_byte()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IoError;
    use rstest::rstest;

    #[rstest]
    #[case(b"")]
    #[case(b"a")]
    #[case(b"some longer payload")]
    fn write_reports_full_length_and_reads_back(#[case] payload: &[u8]) {
        let mut buffer = GrowableBuffer::from(b"prefix".to_vec());
        buffer.seek(0, Whence::End).unwrap();
        let cursor = buffer.position();

        assert_eq!(buffer.write(payload), Ok(payload.len()));
        assert_eq!(buffer.position(), cursor);

        let mut out = vec![0u8; payload.len()];
        assert_eq!(buffer.read(&mut out), Ok(payload.len()));
        assert_eq!(out, payload);
    }

    #[test]
    fn write_appends_regardless_of_cursor() {
        let mut buffer = GrowableBuffer::new();
        buffer.write(b"abc").unwrap();
        buffer.seek(1, Whence::Start).unwrap();
        buffer.write(b"def").unwrap();

        assert_eq!(buffer.to_vec(), b"abcdef");
        assert_eq!(buffer.position(), 1);
        assert_eq!(buffer.remaining(), 5);
    }

    #[test]
    fn empty_read_is_not_eof() {
        let mut buffer = GrowableBuffer::new();
        let mut out = [0u8; 8];
        assert_eq!(buffer.read(&mut out), Ok(0));

        buffer.write(b"late").unwrap();
        assert_eq!(buffer.read(&mut out), Ok(4));
        assert_eq!(&out[..4], b"late");
        assert_eq!(buffer.read(&mut out), Ok(0));
    }

    #[test]
    fn zero_length_read_is_a_no_op() {
        let mut buffer = GrowableBuffer::from(b"data".to_vec());
        assert_eq!(buffer.read(&mut []), Ok(0));
        assert_eq!(buffer.position(), 0);
    }

    #[rstest]
    #[case(-1, Whence::Start)]
    #[case(5, Whence::Start)]
    #[case(1, Whence::End)]
    #[case(-5, Whence::End)]
    fn seek_outside_bounds_is_not_clamped(
        #[case] offset: i64,
        #[case] whence: Whence,
    ) {
        let mut buffer = GrowableBuffer::from(b"data".to_vec());
        buffer.seek(2, Whence::Start).unwrap();
        assert!(matches!(
            buffer.seek(offset, whence),
            Err(IoError::InvalidSeekOffset(_))
        ));
        assert_eq!(buffer.position(), 2);
    }

    #[test]
    fn read_byte_reports_eof_when_drained() {
        let mut buffer = GrowableBuffer::from(vec![7]);
        assert_eq!(buffer.read_byte(), Ok(7));
        assert_eq!(buffer.read_byte(), Err(IoError::Eof));
    }

    #[test]
    fn shared_reference_is_usable_across_threads() {
        let buffer = std::sync::Arc::new(GrowableBuffer::new());
        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let buffer = buffer.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        (&*buffer).write(&[i; 8]).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let data = buffer.to_vec();
        assert_eq!(data.len(), 4 * 100 * 8);
        for chunk in data.chunks(8) {
            assert!(chunk.iter().all(|b| *b == chunk[0]));
        }
    }
}
