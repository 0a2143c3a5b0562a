//! Line framing over an unbounded byte stream.
//!
//! [`FrameBuffer`] accumulates whatever a socket read produced and hands out
//! complete `\n`-terminated lines, keeping a partial trailing line for the next
//! read. Capacity is fixed: a frame that cannot fit is an error, never a
//! silent truncation.

use bytes::BytesMut;

use crate::error::{ProtocolError, Result};
use crate::MAX_LINE_LEN;

/// Byte accumulator that yields complete protocol lines.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: BytesMut,
    /// Index of next byte to check for newline
    next_index: usize,
    capacity: usize,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Create a buffer holding at most [`MAX_LINE_LEN`] bytes per frame.
    pub fn new() -> Self {
        Self::with_capacity(MAX_LINE_LEN)
    }

    /// Create a buffer with a custom frame capacity (delimiter included).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            next_index: 0,
            capacity,
        }
    }

    /// Frame capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Room left before the buffer reaches its capacity.
    pub fn spare(&self) -> usize {
        self.capacity.saturating_sub(self.buf.len())
    }

    /// Whether a complete line is waiting to be taken.
    pub fn has_line(&self) -> bool {
        self.buf[self.next_index..].contains(&b'\n')
    }

    /// Discard everything buffered.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.next_index = 0;
    }

    /// Append freshly read bytes.
    ///
    /// Fails with [`ProtocolError::LineTooLong`] once the trailing undelimited
    /// segment can no longer fit in a frame.
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);

        let partial = match self.buf.iter().rposition(|b| *b == b'\n') {
            Some(pos) => self.buf.len() - pos - 1,
            None => self.buf.len(),
        };
        if partial >= self.capacity {
            return Err(ProtocolError::LineTooLong {
                actual: partial,
                limit: self.capacity,
            });
        }

        Ok(())
    }

    /// Remove and return the first complete line, without its `\r\n` or `\n`.
    ///
    /// Returns `Ok(None)` when no delimiter has arrived yet. Bytes that are not
    /// valid UTF-8 are replaced rather than rejected.
    pub fn take_line(&mut self) -> Result<Option<String>> {
        let Some(offset) = self.buf[self.next_index..].iter().position(|b| *b == b'\n') else {
            self.next_index = self.buf.len();
            return Ok(None);
        };

        let frame = self.buf.split_to(self.next_index + offset + 1);
        self.next_index = 0;

        if frame.len() > self.capacity {
            return Err(ProtocolError::LineTooLong {
                actual: frame.len(),
                limit: self.capacity,
            });
        }

        let mut line = &frame[..frame.len() - 1];
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }

        Ok(Some(String::from_utf8_lossy(line).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_complete_line() {
        let mut frames = FrameBuffer::new();
        frames.push(b"PING :tmi.twitch.tv\r\n").unwrap();

        let line = frames.take_line().unwrap();
        assert_eq!(line.as_deref(), Some("PING :tmi.twitch.tv"));
        assert!(frames.is_empty());
    }

    #[test]
    fn test_partial_line_is_kept() {
        let mut frames = FrameBuffer::new();
        frames.push(b":tmi.twitch.tv 001 bot :Wel").unwrap();

        assert_eq!(frames.take_line().unwrap(), None);
        assert_eq!(frames.len(), 27);

        frames.push(b"come, GLHF!\r\n").unwrap();
        assert_eq!(
            frames.take_line().unwrap().as_deref(),
            Some(":tmi.twitch.tv 001 bot :Welcome, GLHF!")
        );
    }

    #[test]
    fn test_multiple_lines_in_one_push() {
        let mut frames = FrameBuffer::new();
        frames.push(b"PING :a\r\nPING :b\nPING :c").unwrap();

        assert_eq!(frames.take_line().unwrap().as_deref(), Some("PING :a"));
        assert_eq!(frames.take_line().unwrap().as_deref(), Some("PING :b"));
        assert_eq!(frames.take_line().unwrap(), None);
        assert_eq!(frames.len(), "PING :c".len());
    }

    #[test]
    fn test_take_line_without_delimiter_is_stable() {
        let mut frames = FrameBuffer::new();
        frames.push(b"partial").unwrap();

        assert_eq!(frames.take_line().unwrap(), None);
        assert_eq!(frames.take_line().unwrap(), None);
        assert_eq!(frames.len(), 7);
    }

    #[test]
    fn test_overflow_without_delimiter() {
        let mut frames = FrameBuffer::with_capacity(16);
        frames.push(b"0123456789").unwrap();

        let result = frames.push(b"abcdef");
        assert!(matches!(
            result,
            Err(ProtocolError::LineTooLong {
                actual: 16,
                limit: 16
            })
        ));
    }

    #[test]
    fn test_frame_exactly_at_capacity_fits() {
        let mut frames = FrameBuffer::with_capacity(8);
        frames.push(b"1234567").unwrap();
        frames.push(b"\n").unwrap();

        assert_eq!(frames.take_line().unwrap().as_deref(), Some("1234567"));
    }

    #[test]
    fn test_oversized_complete_line() {
        let mut frames = FrameBuffer::with_capacity(8);
        frames.push(b"this is way too long\n").unwrap();

        assert!(matches!(
            frames.take_line(),
            Err(ProtocolError::LineTooLong { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut frames = FrameBuffer::new();
        frames.push(&[b'h', b'i', b' ', 0xFF, b'\r', b'\n']).unwrap();

        assert_eq!(frames.take_line().unwrap().as_deref(), Some("hi \u{FFFD}"));
    }

    #[test]
    fn test_has_line() {
        let mut frames = FrameBuffer::new();
        assert!(!frames.has_line());

        frames.push(b"PING :a\r\nPING").unwrap();
        assert!(frames.has_line());

        frames.take_line().unwrap();
        assert!(!frames.has_line());
        assert_eq!(frames.take_line().unwrap(), None);
        assert!(!frames.has_line());
    }

    #[test]
    fn test_spare_and_clear() {
        let mut frames = FrameBuffer::with_capacity(10);
        frames.push(b"abc").unwrap();
        assert_eq!(frames.spare(), 7);

        frames.clear();
        assert!(frames.is_empty());
        assert_eq!(frames.spare(), 10);
    }
}
