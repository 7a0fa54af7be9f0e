//! Resolution packets.
//!
//! The tile body is one packet per resolution, coarsest first. A packet is a
//! big-endian `u32` byte length followed by the coefficients of every band of
//! that resolution, component by component and band by band in
//! [`super::image::subbands`] order, rows top to bottom.
//!
//! Coefficients are written as LEB128 varint tokens. A token with the low bit
//! clear carries one non-zero coefficient, zigzag mapped, in the remaining
//! bits. A token with the low bit set carries the length of a run of zeros.
//! Readers reject coefficients whose magnitude exceeds the caller's limit.

use super::image::Subband;
use crate::cursor::ByteCursor;
use crate::error::J2cError;

pub fn zigzag(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

pub fn unzigzag(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub fn read_varint(data: &[u8], cursor: &mut ByteCursor) -> Result<u64, J2cError> {
    let mut value = 0u64;
    let mut shift = 0;
    loop {
        let byte = *data.get(cursor.position()).ok_or(J2cError::InvalidData)?;
        cursor.advance(1);
        if shift == 63 && byte > 0x01 {
            return Err(J2cError::InvalidData);
        }
        value |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Token encoder with zero-run folding.
struct TokenWriter {
    body: Vec<u8>,
    zeros: u64,
}

impl TokenWriter {
    fn new() -> Self {
        Self {
            body: Vec::new(),
            zeros: 0,
        }
    }

    fn push(&mut self, coefficient: i32) {
        if coefficient == 0 {
            self.zeros += 1;
            return;
        }
        self.flush_zeros();
        write_varint(&mut self.body, (zigzag(coefficient) as u64) << 1);
    }

    fn flush_zeros(&mut self) {
        if self.zeros > 0 {
            write_varint(&mut self.body, (self.zeros << 1) | 1);
            self.zeros = 0;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        self.flush_zeros();
        self.body
    }
}

struct TokenReader<'b> {
    body: &'b [u8],
    cursor: ByteCursor,
    zeros: u64,
    limit: u32,
}

impl<'b> TokenReader<'b> {
    fn new(body: &'b [u8], limit: u32) -> Self {
        Self {
            body,
            cursor: ByteCursor::new(),
            zeros: 0,
            limit,
        }
    }

    /// Reads the next token, leaving a zero run pending in `zeros`.
    fn read_token(&mut self) -> Result<Option<i32>, J2cError> {
        let token = read_varint(self.body, &mut self.cursor)?;
        if token & 1 == 0 {
            let value = u32::try_from(token >> 1).map_err(|_| J2cError::InvalidData)?;
            let coefficient = unzigzag(value);
            if coefficient.unsigned_abs() > self.limit {
                return Err(J2cError::InvalidData);
            }
            return Ok(Some(coefficient));
        }
        self.zeros = token >> 1;
        if self.zeros == 0 {
            return Err(J2cError::InvalidData);
        }
        Ok(None)
    }

    fn next(&mut self) -> Result<i32, J2cError> {
        if self.zeros == 0 {
            if let Some(coefficient) = self.read_token()? {
                return Ok(coefficient);
            }
        }
        self.zeros -= 1;
        Ok(0)
    }

    /// Consumes `count` coefficients without storing them.
    fn advance(&mut self, mut count: u64) -> Result<(), J2cError> {
        while count > 0 {
            if self.zeros == 0 && self.read_token()?.is_some() {
                count -= 1;
                continue;
            }
            let run = self.zeros.min(count);
            self.zeros -= run;
            count -= run;
        }
        Ok(())
    }

    /// True once every byte and every announced zero has been used.
    fn is_exhausted(&self) -> bool {
        self.zeros == 0 && self.cursor.remaining(self.body.len()) == 0
    }
}

fn resolution_bands(bands: &[Subband], resolution: u8) -> impl Iterator<Item = &Subband> {
    bands.iter().filter(move |band| band.resolution == resolution)
}

/// Serializes the coefficients of `resolution` from Mallat-ordered planes
/// with row stride `stride`.
pub fn write_packet(planes: &[Vec<i32>], stride: usize, bands: &[Subband], resolution: u8) -> Vec<u8> {
    let mut tokens = TokenWriter::new();
    for plane in planes {
        for band in resolution_bands(bands, resolution) {
            for y in band.y0..band.y0 + band.height {
                let row = &plane[y * stride + band.x0..y * stride + band.x0 + band.width];
                for &coefficient in row {
                    tokens.push(coefficient);
                }
            }
        }
    }
    tokens.finish()
}

/// Checks that a packet body holds exactly the coefficients of `resolution`
/// for `components` planes, each within `limit`, without decoding them.
pub fn check_packet(
    body: &[u8],
    components: usize,
    bands: &[Subband],
    resolution: u8,
    limit: u32,
) -> Result<(), J2cError> {
    let per_component: u64 = resolution_bands(bands, resolution)
        .map(|band| band.width as u64 * band.height as u64)
        .sum();
    let mut tokens = TokenReader::new(body, limit);
    tokens.advance(per_component * components as u64)?;
    if !tokens.is_exhausted() {
        return Err(J2cError::InvalidData);
    }
    Ok(())
}

/// Fills the bands of `resolution` from a packet body. The body must be
/// consumed exactly and every coefficient must be within `limit`.
pub fn read_packet(
    body: &[u8],
    planes: &mut [Vec<i32>],
    stride: usize,
    bands: &[Subband],
    resolution: u8,
    limit: u32,
) -> Result<(), J2cError> {
    let mut tokens = TokenReader::new(body, limit);
    for plane in planes.iter_mut() {
        for band in resolution_bands(bands, resolution) {
            for y in band.y0..band.y0 + band.height {
                let row = &mut plane[y * stride + band.x0..y * stride + band.x0 + band.width];
                for coefficient in row {
                    *coefficient = tokens.next()?;
                }
            }
        }
    }
    if !tokens.is_exhausted() {
        return Err(J2cError::InvalidData);
    }
    Ok(())
}
