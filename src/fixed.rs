use crate::errors::{IoError, Result};
use crate::traits::{
    read_one, resolve_seek, ByteReader, ByteScanner, Reader, Seeker, Whence,
};

/// Read-only, seekable view over a borrowed byte region.
///
/// There is no internal lock: the reader is meant for short-lived use by a
/// single owner, and every mutating call takes `&mut self`.
///
/// Reads never fail. At the end of the region they return `Ok(0)` rather
/// than [`IoError::Eof`]; callers who need an end marker either compare
/// [`position`](Self::position) against [`len`](Self::len) or use
/// [`read_byte`](ByteReader::read_byte), which does report EOF.
///
/// The region is immutable, so [`unread_byte`](ByteScanner::unread_byte)
/// only steps back over the byte that was just consumed.
#[derive(Debug, Clone)]
pub struct FixedBufferReader<'a> {
    data: &'a [u8],
    cursor: usize,
    unread: bool,
}

impl<'a> FixedBufferReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            cursor: 0,
            unread: false,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// Borrow the next `min(n, remaining)` bytes without copying them and
    /// advance past them.
    pub fn view(&mut self, n: usize) -> &'a [u8] {
        let data: &'a [u8] = self.data;
        let count = n.min(self.remaining());
        let view = &data[self.cursor..self.cursor + count];
        self.cursor += count;
        self.unread = false;
        view
    }
}

impl<'a> Reader for FixedBufferReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let view = self.view(buf.len());
        buf[..view.len()].copy_from_slice(view);
        Ok(view.len())
    }
}

impl<'a> Seeker for FixedBufferReader<'a> {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        self.cursor = resolve_seek(self.cursor, self.len(), offset, whence)?;
        self.unread = false;
        Ok(self.cursor as u64)
    }
}

impl<'a> ByteReader for FixedBufferReader<'a> {
    fn read_byte(&mut self) -> Result<u8> {
        read_one(self)
    }
}

impl<'a> ByteScanner for FixedBufferReader<'a> {
    /// Step back over the previous byte, which must equal `byte`.
    fn unread_byte(&mut self, byte: u8) -> Result<()> {
        if self.unread {
            return Err(IoError::custom("a byte was already unread"));
        }
        let previous = self
            .cursor
            .checked_sub(1)
            .ok_or_else(|| IoError::custom("unread at start of region"))?;
        if self.data[previous] != byte {
            return Err(IoError::custom(format!(
                "unread byte {:#04x} differs from the byte at {}",
                byte, previous
            )));
        }
        self.cursor = previous;
        self.unread = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const DATA: &[u8] = b"hello world";

    #[rstest]
    #[case(0, 0)]
    #[case(0, 5)]
    #[case(3, 5)]
    #[case(6, 100)]
    #[case(11, 4)]
    fn read_returns_min_of_request_and_remaining(
        #[case] cursor: i64,
        #[case] n: usize,
    ) {
        let mut reader = FixedBufferReader::new(DATA);
        reader.seek(cursor, Whence::Start).unwrap();

        let mut buf = vec![0u8; n];
        let read = reader.read(&mut buf).unwrap();

        let expected = n.min(DATA.len() - cursor as usize);
        assert_eq!(read, expected);
        assert_eq!(reader.position(), cursor as usize + expected);
        assert_eq!(&buf[..read], &DATA[cursor as usize..][..expected]);
    }

    #[test]
    fn exhausted_reader_returns_zero_without_error() {
        let mut reader = FixedBufferReader::new(b"ab");
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf), Ok(2));
        assert_eq!(reader.read(&mut buf), Ok(0));
        assert_eq!(reader.read(&mut buf), Ok(0));
        assert_eq!(reader.read_byte(), Err(IoError::Eof));
    }

    #[test]
    fn view_borrows_without_copying() {
        let mut reader = FixedBufferReader::new(DATA);
        let first = reader.view(5);
        assert_eq!(first, b"hello");
        assert_eq!(first.as_ptr(), DATA.as_ptr());
        assert_eq!(reader.view(100), b" world");
        assert!(reader.view(1).is_empty());
    }

    #[rstest]
    #[case(-1, Whence::Start, -1)]
    #[case(12, Whence::Start, 12)]
    #[case(1, Whence::End, 12)]
    #[case(-20, Whence::Current, -16)]
    fn out_of_range_seek_is_rejected(
        #[case] offset: i64,
        #[case] whence: Whence,
        #[case] attempted: i64,
    ) {
        let mut reader = FixedBufferReader::new(DATA);
        reader.seek(4, Whence::Start).unwrap();

        assert_eq!(
            reader.seek(offset, whence),
            Err(IoError::InvalidSeekOffset(attempted))
        );
        assert_eq!(reader.position(), 4);
    }

    #[test]
    fn seek_to_both_bounds_is_allowed() {
        let mut reader = FixedBufferReader::new(DATA);
        assert_eq!(reader.seek(0, Whence::End), Ok(DATA.len() as u64));
        assert_eq!(reader.seek(-(DATA.len() as i64), Whence::Current), Ok(0));
    }

    #[test]
    fn unread_byte_is_returned_next() {
        let mut reader = FixedBufferReader::new(b"xyz");
        assert_eq!(reader.read_byte(), Ok(b'x'));
        reader.unread_byte(b'x').unwrap();
        assert!(reader.unread_byte(b'x').is_err());

        let mut buf = [0u8; 3];
        assert_eq!(reader.read(&mut buf), Ok(3));
        assert_eq!(&buf, b"xyz");
        assert_eq!(reader.read_byte(), Err(IoError::Eof));
    }

    #[test]
    fn unread_keeps_position_consistent() {
        let mut reader = FixedBufferReader::new(b"abc");
        assert_eq!(reader.read_byte(), Ok(b'a'));
        reader.unread_byte(b'a').unwrap();

        assert_eq!(reader.position(), 0);
        assert_eq!(reader.remaining(), 3);
        assert_eq!(reader.seek(0, Whence::Current), Ok(0));
        assert_eq!(reader.read_byte(), Ok(b'a'));
        assert_eq!(reader.read_byte(), Ok(b'b'));

        reader.unread_byte(b'b').unwrap();
        assert_eq!(reader.view(2), b"bc");
    }

    #[rstest]
    #[case(b"", 0, b'a')]
    #[case(b"ab", 0, b'a')]
    #[case(b"ab", 1, b'b')]
    fn unread_rejects_anything_but_previous_byte(
        #[case] data: &[u8],
        #[case] cursor: i64,
        #[case] byte: u8,
    ) {
        let mut reader = FixedBufferReader::new(data);
        reader.seek(cursor, Whence::Start).unwrap();
        assert!(matches!(reader.unread_byte(byte), Err(IoError::Custom(_))));
        assert_eq!(reader.position(), cursor as usize);
    }

    #[test]
    fn seek_allows_a_new_unread() {
        let mut reader = FixedBufferReader::new(b"xyz");
        reader.seek(2, Whence::Start).unwrap();
        reader.unread_byte(b'y').unwrap();
        reader.seek(1, Whence::Current).unwrap();
        reader.unread_byte(b'y').unwrap();
        assert_eq!(reader.read_byte(), Ok(b'y'));
    }
}
