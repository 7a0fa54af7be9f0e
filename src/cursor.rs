//! Read/write position within a single contiguous byte buffer.

/// A position `p` into a buffer whose length is supplied by the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteCursor {
    position: usize,
}

impl ByteCursor {
    pub fn new() -> Self {
        Self { position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Bytes between the cursor and the end of a buffer of `len` bytes.
    pub fn remaining(&self, len: usize) -> usize {
        len.saturating_sub(self.position)
    }

    /// Moves the cursor by `delta`, saturating at zero.
    pub fn advance(&mut self, delta: i64) {
        self.position = if delta >= 0 {
            self.position.saturating_add(delta as usize)
        } else {
            self.position.saturating_sub(delta.unsigned_abs() as usize)
        };
    }

    /// Forces the position into `[0, len]`.
    pub fn clamp(&mut self, len: usize) {
        if self.position > len {
            self.position = len;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_to_length() {
        let mut cursor = ByteCursor::new();
        cursor.advance(40);
        cursor.clamp(16);
        assert_eq!(cursor.position(), 16);
        cursor.clamp(32);
        assert_eq!(cursor.position(), 16);
    }

    #[test]
    fn test_advance_backwards_saturates() {
        let mut cursor = ByteCursor::new();
        cursor.set_position(3);
        cursor.advance(-10);
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.remaining(8), 8);
    }
}
