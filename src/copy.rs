//! Chunked transfer from a [`Reader`] to a [`Writer`].

use thiserror::Error;

use crate::errors::IoError;
use crate::traits::{Reader, Writer};

/// Bytes moved per read/write round trip.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOptions {
    pub chunk_size: usize,
    /// Stop after this many bytes. `None` copies until end-of-stream.
    pub limit: Option<u64>,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            limit: None,
        }
    }
}

/// A copy that stopped on a read or write failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("copy stopped after {copied} bytes: {source}")]
pub struct CopyError {
    /// Bytes the destination accepted before the failure.
    pub copied: u64,
    pub source: IoError,
}

/// Copy until `src` reports end-of-stream.
pub fn copy<W, R>(dst: &mut W, src: &mut R) -> Result<u64, CopyError>
where
    W: Writer + ?Sized,
    R: Reader + ?Sized,
{
    copy_with(dst, src, &CopyOptions::default())
}

/// Copy at most `limit` bytes.
pub fn copy_limited<W, R>(
    dst: &mut W,
    src: &mut R,
    limit: u64,
) -> Result<u64, CopyError>
where
    W: Writer + ?Sized,
    R: Reader + ?Sized,
{
    copy_with(
        dst,
        src,
        &CopyOptions {
            limit: Some(limit),
            ..CopyOptions::default()
        },
    )
}

/// Copy from `src` to `dst` in chunks of `options.chunk_size`.
///
/// Ends successfully when the limit is reached, when `src` reports
/// [`IoError::Eof`], or when `src` returns zero bytes for a non-empty
/// request. Any other read error, and any write error including a short
/// write, stops the copy and is returned together with the number of bytes
/// the destination accepted.
pub fn copy_with<W, R>(
    dst: &mut W,
    src: &mut R,
    options: &CopyOptions,
) -> Result<u64, CopyError>
where
    W: Writer + ?Sized,
    R: Reader + ?Sized,
{
    let mut buf = vec![0u8; options.chunk_size.max(1)];
    let mut copied: u64 = 0;

    loop {
        let want = match options.limit {
            Some(limit) => {
                let left = limit.saturating_sub(copied);
                if left == 0 {
                    break;
                }
                buf.len().min(usize::try_from(left).unwrap_or(usize::MAX))
            }
            None => buf.len(),
        };

        let read = match src.read(&mut buf[..want]) {
            Ok(0) | Err(IoError::Eof) => break,
            Ok(n) => n,
            Err(source) => return Err(CopyError { copied, source }),
        };

        match dst.write(&buf[..read]) {
            Ok(written) if written >= read => copied += read as u64,
            Ok(written) => {
                copied += written as u64;
                return Err(CopyError {
                    copied,
                    source: IoError::short_write(written, read, None),
                });
            }
            Err(source) => {
                copied += source.written() as u64;
                return Err(CopyError { copied, source });
            }
        }
        log::trace!("Copied chunk of {} bytes ({} total)", read, copied);
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use crate::{FixedBufferReader, GrowableBuffer};
    use rstest::rstest;

    /// Yields its chunks one per read, then `end`.
    struct Scripted {
        chunks: Vec<Vec<u8>>,
        end: IoError,
    }

    impl Reader for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            if self.chunks.is_empty() {
                return Err(self.end.clone());
            }
            let chunk = self.chunks.remove(0);
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            Ok(n)
        }
    }

    /// Accepts `capacity` bytes, then fails with a short write.
    struct Bounded {
        data: Vec<u8>,
        capacity: usize,
    }

    impl Writer for Bounded {
        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            let n = buf.len().min(self.capacity - self.data.len());
            self.data.extend_from_slice(&buf[..n]);
            if n < buf.len() {
                return Err(IoError::short_write(n, buf.len(), None));
            }
            Ok(n)
        }
    }

    #[test]
    fn copies_until_eof() {
        let mut src = Scripted {
            chunks: vec![b"a".to_vec(), b"bc".to_vec()],
            end: IoError::Eof,
        };
        let mut dst = GrowableBuffer::new();

        assert_eq!(copy(&mut dst, &mut src), Ok(3));
        assert_eq!(dst.to_vec(), b"abc");
    }

    #[rstest]
    #[case(0, 0)]
    #[case(2, 2)]
    #[case(5, 5)]
    #[case(9, 5)]
    fn limit_caps_transfer(#[case] limit: u64, #[case] expected: u64) {
        let mut src = FixedBufferReader::new(b"12345");
        let mut dst = GrowableBuffer::new();

        assert_eq!(copy_limited(&mut dst, &mut src, limit), Ok(expected));
        assert_eq!(dst.len() as u64, expected);
        assert_eq!(src.position() as u64, expected);
    }

    #[test]
    fn transfers_more_than_one_chunk() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let mut src = FixedBufferReader::new(&data);
        let mut dst = GrowableBuffer::new();

        assert_eq!(copy(&mut dst, &mut src), Ok(5000));
        assert_eq!(dst.into_inner(), data);
    }

    #[test]
    fn read_failure_is_surfaced_with_progress() {
        let failure = IoError::ReadFailure {
            message: "device gone".to_owned(),
            code: 5,
        };
        let mut src = Scripted {
            chunks: vec![b"abcd".to_vec()],
            end: failure.clone(),
        };
        let mut dst = GrowableBuffer::new();

        assert_eq!(
            copy(&mut dst, &mut src),
            Err(CopyError {
                copied: 4,
                source: failure
            })
        );
    }

    #[test]
    fn short_write_stops_immediately() {
        let mut src = FixedBufferReader::new(b"0123456789");
        let mut dst = Bounded {
            data: Vec::new(),
            capacity: 6,
        };
        let options = CopyOptions {
            chunk_size: 4,
            limit: None,
        };

        let err = copy_with(&mut dst, &mut src, &options).unwrap_err();
        assert_eq!(err.copied, 6);
        assert_eq!(err.source, IoError::short_write(2, 4, None));
        assert_eq!(dst.data, b"012345");
        assert_eq!(src.position(), 8);
    }

    /// Claims to have written more than it was given.
    struct Overreporting(Vec<u8>);

    impl Writer for Overreporting {
        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len() + 10)
        }
    }

    #[test]
    fn overreported_writes_count_only_bytes_supplied() {
        let mut src = FixedBufferReader::new(b"0123456789");
        let mut dst = Overreporting(Vec::new());
        let options = CopyOptions {
            chunk_size: 3,
            limit: Some(7),
        };
        assert_eq!(copy_with(&mut dst, &mut src, &options), Ok(7));
        assert_eq!(dst.0, b"0123456");
    }

    #[test]
    fn zero_chunk_size_still_makes_progress() {
        let mut src = FixedBufferReader::new(b"xyz");
        let mut dst = GrowableBuffer::new();
        let options = CopyOptions {
            chunk_size: 0,
            limit: None,
        };
        assert_eq!(copy_with(&mut dst, &mut src, &options), Ok(3));
    }

    #[test]
    fn works_through_trait_objects() {
        let mut src: Box<dyn Reader> =
            Box::new(GrowableBuffer::from(b"boxed".to_vec()));
        let mut dst: Box<dyn Writer> = Box::new(GrowableBuffer::new());
        assert_eq!(copy(&mut dst, &mut src), Ok(5));
    }
}
