//! Streaming bridge between a codec engine and an in-memory codestream.
//!
//! The engine never sees the codestream buffer directly. It pulls and pushes
//! bytes through the four [`ByteStream`] primitives, which [`StreamBridge`]
//! implements over a growable `Vec<u8>` and a [`ByteCursor`].

use crate::cursor::ByteCursor;
use tracing::trace;

/// The backing-store contract a streaming codestream engine relies on.
pub trait ByteStream {
    /// Copies up to `buffer.len()` bytes at the current position.
    ///
    /// Returns `None` at end of stream, which is distinct from a short read.
    fn read(&mut self, buffer: &mut [u8]) -> Option<usize>;

    /// Writes `bytes` at the current position, growing the store as needed.
    /// Returns the number of bytes written.
    fn write(&mut self, bytes: &[u8]) -> usize;

    /// Moves the position by `count`, clamped to the stream bounds.
    /// Returns the new position.
    fn skip(&mut self, count: i64) -> usize;

    /// Moves to an absolute position. Fails, leaving the position unchanged,
    /// when `position` is not inside the stream.
    fn seek(&mut self, position: usize) -> bool;
}

/// [`ByteStream`] over a caller-owned codestream buffer.
///
/// The vector's length is the logical length reported to the engine; its
/// capacity grows geometrically while the engine writes and is trimmed by
/// [`StreamBridge::finish`].
pub struct StreamBridge<'a> {
    buffer: &'a mut Vec<u8>,
    cursor: ByteCursor,
}

impl<'a> StreamBridge<'a> {
    pub fn new(buffer: &'a mut Vec<u8>) -> Self {
        Self {
            buffer,
            cursor: ByteCursor::new(),
        }
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Releases spare capacity once the engine is done writing.
    pub fn finish(&mut self) {
        self.buffer.shrink_to_fit();
    }
}

impl ByteStream for StreamBridge<'_> {
    fn read(&mut self, buffer: &mut [u8]) -> Option<usize> {
        let len = self.buffer.len();
        let position = self.cursor.position();
        if len == 0 || position >= len {
            return None;
        }
        let count = buffer.len().min(len - position);
        buffer[..count].copy_from_slice(&self.buffer[position..position + count]);
        self.cursor.set_position(position + count);
        trace!(position, requested = buffer.len(), count, "stream read");
        Some(count)
    }

    fn write(&mut self, bytes: &[u8]) -> usize {
        let position = self.cursor.position();
        let end = position + bytes.len();
        if self.buffer.capacity() == 0 {
            self.buffer.reserve_exact(end);
        }
        if self.buffer.len() < end {
            self.buffer.resize(end, 0);
        }
        self.buffer[position..end].copy_from_slice(bytes);
        self.cursor.set_position(end);
        trace!(position, count = bytes.len(), len = self.buffer.len(), "stream write");
        bytes.len()
    }

    fn skip(&mut self, count: i64) -> usize {
        self.cursor.advance(count);
        self.cursor.clamp(self.buffer.len());
        trace!(count, position = self.cursor.position(), "stream skip");
        self.cursor.position()
    }

    fn seek(&mut self, position: usize) -> bool {
        trace!(position, "stream seek");
        if self.buffer.is_empty() || position >= self.buffer.len() {
            return false;
        }
        self.cursor.set_position(position);
        true
    }
}
