//! Chunked big-endian readers and writers over a [`ByteStream`].

use crate::constants::STREAM_CHUNK_SIZE;
use crate::error::J2cError;
use crate::marker_code::{J2C_MARKER_START_BYTE, J2cMarkerCode};
use crate::stream::ByteStream;

/// Pulls the stream in chunks and hands out bytes from the current chunk.
///
/// Bytes fetched but not consumed are returned to the stream by
/// [`StreamReader::release`].
pub struct StreamReader<'s> {
    stream: &'s mut dyn ByteStream,
    chunk: Vec<u8>,
    start: usize,
    end: usize,
    consumed: usize,
}

impl<'s> StreamReader<'s> {
    pub fn new(stream: &'s mut dyn ByteStream) -> Self {
        Self {
            stream,
            chunk: vec![0; STREAM_CHUNK_SIZE],
            start: 0,
            end: 0,
            consumed: 0,
        }
    }

    /// Bytes consumed since the reader was created.
    pub fn position(&self) -> usize {
        self.consumed
    }

    fn fill(&mut self) -> Result<(), J2cError> {
        if self.start < self.end {
            return Ok(());
        }
        match self.stream.read(&mut self.chunk) {
            Some(count) if count > 0 => {
                self.start = 0;
                self.end = count;
                Ok(())
            }
            _ => Err(J2cError::NeedMoreData),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, J2cError> {
        self.fill()?;
        let value = self.chunk[self.start];
        self.start += 1;
        self.consumed += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, J2cError> {
        Ok(u16::from_be_bytes([self.read_u8()?, self.read_u8()?]))
    }

    pub fn read_u32(&mut self) -> Result<u32, J2cError> {
        Ok(u32::from_be_bytes([
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
        ]))
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, J2cError> {
        let mut bytes = Vec::with_capacity(count.min(STREAM_CHUNK_SIZE));
        while bytes.len() < count {
            self.fill()?;
            let take = (count - bytes.len()).min(self.end - self.start);
            bytes.extend_from_slice(&self.chunk[self.start..self.start + take]);
            self.start += take;
            self.consumed += take;
        }
        Ok(bytes)
    }

    /// Reads `0xFF xx` and maps it to a marker.
    pub fn read_marker(&mut self) -> Result<J2cMarkerCode, J2cError> {
        if self.read_u8()? != J2C_MARKER_START_BYTE {
            return Err(J2cError::InvalidData);
        }
        J2cMarkerCode::try_from(self.read_u8()?).map_err(|_| J2cError::UnexpectedMarker)
    }

    /// Skips `count` bytes, moving the stream itself once the chunk is used up.
    pub fn skip(&mut self, count: usize) -> Result<(), J2cError> {
        let buffered = (self.end - self.start).min(count);
        self.start += buffered;
        self.consumed += buffered;
        let rest = count - buffered;
        if rest == 0 {
            return Ok(());
        }
        let before = self.stream.skip(0);
        let after = self.stream.skip(rest as i64);
        let moved = after.saturating_sub(before);
        self.consumed += moved;
        if moved < rest {
            return Err(J2cError::NeedMoreData);
        }
        Ok(())
    }

    /// Skips a marker segment whose length field has not been read yet.
    pub fn skip_segment(&mut self) -> Result<(), J2cError> {
        let length = self.read_u16()? as usize;
        if length < 2 {
            return Err(J2cError::InvalidMarkerSegmentSize);
        }
        self.skip(length - 2)
    }

    /// Rewinds the stream over bytes fetched but not consumed.
    pub fn release(self) {
        let unread = self.end - self.start;
        if unread > 0 {
            self.stream.skip(-(unread as i64));
        }
    }
}

/// Collects output into chunks and pushes each full chunk to the stream.
pub struct StreamWriter<'s> {
    stream: &'s mut dyn ByteStream,
    chunk: Vec<u8>,
    flushed: usize,
}

impl<'s> StreamWriter<'s> {
    pub fn new(stream: &'s mut dyn ByteStream) -> Self {
        Self {
            stream,
            chunk: Vec::with_capacity(STREAM_CHUNK_SIZE),
            flushed: 0,
        }
    }

    /// Bytes written since the writer was created, flushed or not.
    pub fn len(&self) -> usize {
        self.flushed + self.chunk.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write_byte(&mut self, value: u8) -> Result<(), J2cError> {
        self.chunk.push(value);
        if self.chunk.len() >= STREAM_CHUNK_SIZE {
            self.flush()?;
        }
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), J2cError> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), J2cError> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), J2cError> {
        let mut rest = data;
        while !rest.is_empty() {
            let take = (STREAM_CHUNK_SIZE - self.chunk.len()).min(rest.len());
            self.chunk.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.chunk.len() >= STREAM_CHUNK_SIZE {
                self.flush()?;
            }
        }
        Ok(())
    }

    pub fn write_marker(&mut self, marker: J2cMarkerCode) -> Result<(), J2cError> {
        self.write_byte(J2C_MARKER_START_BYTE)?;
        self.write_byte(marker.into())
    }

    pub fn flush(&mut self) -> Result<(), J2cError> {
        if self.chunk.is_empty() {
            return Ok(());
        }
        let written = self.stream.write(&self.chunk);
        if written != self.chunk.len() {
            return Err(J2cError::NeedMoreData);
        }
        self.flushed += written;
        self.chunk.clear();
        Ok(())
    }

    /// Overwrites four bytes at `offset` (relative to where the writer
    /// started) and returns to the end of the output.
    pub fn patch_u32(&mut self, offset: usize, value: u32) -> Result<(), J2cError> {
        self.flush()?;
        let end = self.stream.skip(0);
        let start = end - self.flushed;
        if offset + 4 > self.flushed || !self.stream.seek(start + offset) {
            return Err(J2cError::InvalidData);
        }
        if self.stream.write(&value.to_be_bytes()) != 4 {
            return Err(J2cError::NeedMoreData);
        }
        let remaining = self.flushed - offset - 4;
        if self.stream.skip(remaining as i64) != end {
            return Err(J2cError::InvalidData);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamBridge;

    #[test]
    fn test_reader_spans_chunks_and_releases() {
        let mut data: Vec<u8> = (0..=255).cycle().take(STREAM_CHUNK_SIZE + 10).collect();
        let mut bridge = StreamBridge::new(&mut data);
        let mut reader = StreamReader::new(&mut bridge);
        reader.skip(STREAM_CHUNK_SIZE - 1).unwrap();
        // Straddles the chunk boundary.
        assert_eq!(reader.read_u16().unwrap(), u16::from_be_bytes([255, 0]));
        assert_eq!(reader.position(), STREAM_CHUNK_SIZE + 1);
        reader.release();
        assert_eq!(bridge.position(), STREAM_CHUNK_SIZE + 1);
    }

    #[test]
    fn test_reader_reports_truncation() {
        let mut data = vec![0xFF];
        let mut bridge = StreamBridge::new(&mut data);
        let mut reader = StreamReader::new(&mut bridge);
        assert_eq!(reader.read_u16(), Err(J2cError::NeedMoreData));
    }

    #[test]
    fn test_reader_skip_past_end_fails() {
        let mut data = vec![0u8; 4];
        let mut bridge = StreamBridge::new(&mut data);
        let mut reader = StreamReader::new(&mut bridge);
        reader.read_u8().unwrap();
        assert_eq!(reader.skip(10), Err(J2cError::NeedMoreData));
    }

    #[test]
    fn test_writer_patch_and_flush() {
        let mut data = Vec::new();
        let mut bridge = StreamBridge::new(&mut data);
        {
            let mut writer = StreamWriter::new(&mut bridge);
            writer.write_marker(J2cMarkerCode::StartOfCodestream).unwrap();
            writer.write_u32(0).unwrap();
            writer.write_bytes(&vec![7u8; STREAM_CHUNK_SIZE]).unwrap();
            writer.patch_u32(2, 0xDEADBEEF).unwrap();
            writer.write_marker(J2cMarkerCode::EndOfCodestream).unwrap();
            writer.flush().unwrap();
            assert_eq!(writer.len(), STREAM_CHUNK_SIZE + 8);
        }
        assert_eq!(&data[..6], &[0xFF, 0x4F, 0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(&data[data.len() - 2..], &[0xFF, 0xD9]);
        assert_eq!(data.len(), STREAM_CHUNK_SIZE + 8);
    }
}
