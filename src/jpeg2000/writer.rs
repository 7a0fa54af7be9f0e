use super::image::{CodingStyle, ImageSize, QUANT_STYLE_NONE, Quantization};
use super::io::StreamWriter;
use crate::constants::SEGMENT_MAX_DATA_SIZE;
use crate::error::J2cError;
use crate::marker_code::{COMMENT_REGISTRATION_LATIN, J2cMarkerCode};
use crate::stream::ByteStream;

/// Emits J2K marker segments to a byte stream.
pub struct J2cWriter<'s> {
    writer: StreamWriter<'s>,
}

impl<'s> J2cWriter<'s> {
    pub fn new(stream: &'s mut dyn ByteStream) -> Self {
        Self {
            writer: StreamWriter::new(stream),
        }
    }

    pub fn len(&self) -> usize {
        self.writer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }

    pub fn write_soc(&mut self) -> Result<(), J2cError> {
        self.writer.write_marker(J2cMarkerCode::StartOfCodestream)
    }

    pub fn write_eoc(&mut self) -> Result<(), J2cError> {
        self.writer.write_marker(J2cMarkerCode::EndOfCodestream)
    }

    pub fn write_siz(&mut self, size: &ImageSize) -> Result<(), J2cError> {
        self.writer.write_marker(J2cMarkerCode::ImageAndTileSize)?;

        // Length: 2 (Rsiz) + 4(W) + 4(H) + 4(OX) + 4(OY) + 4(TW) + 4(TH) + 4(TOX) + 4(TOY) + 2(C) + 3*C
        let component_count = size.components.len();
        let length = 38 + 3 * component_count;
        if length > u16::MAX as usize {
            return Err(J2cError::UnsupportedFeature);
        }
        self.writer.write_u16(length as u16)?;
        self.writer.write_u16(0)?; // Rsiz (Capabilities) - 0 for default
        self.writer.write_u32(size.x1)?;
        self.writer.write_u32(size.y1)?;
        self.writer.write_u32(size.x0)?;
        self.writer.write_u32(size.y0)?;
        self.writer.write_u32(size.tile_width)?;
        self.writer.write_u32(size.tile_height)?;
        self.writer.write_u32(size.tile_x0)?;
        self.writer.write_u32(size.tile_y0)?;
        self.writer.write_u16(component_count as u16)?;

        for component in &size.components {
            // Precision - 1, sign in the top bit
            let ssiz = (component.precision - 1) | if component.is_signed { 0x80 } else { 0 };
            self.writer.write_byte(ssiz)?;
            self.writer.write_byte(component.dx)?;
            self.writer.write_byte(component.dy)?;
        }
        Ok(())
    }

    pub fn write_cod(&mut self, cod: &CodingStyle) -> Result<(), J2cError> {
        self.writer.write_marker(J2cMarkerCode::CodingStyleDefault)?;

        // Lcod + Scod (1) + SGcod (4) + SPcod (5)
        self.writer.write_u16(12)?;
        self.writer.write_byte(cod.coding_style)?;

        // SGcod
        self.writer.write_byte(cod.progression_order)?;
        self.writer.write_u16(cod.number_of_layers)?;
        self.writer.write_byte(u8::from(cod.mct))?;

        // SPcod
        self.writer.write_byte(cod.decomposition_levels)?;
        self.writer.write_byte(cod.codeblock_width_exp)?;
        self.writer.write_byte(cod.codeblock_height_exp)?;
        self.writer.write_byte(cod.codeblock_style)?;
        self.writer.write_byte(cod.transformation)?;
        Ok(())
    }

    pub fn write_qcd(&mut self, qcd: &Quantization) -> Result<(), J2cError> {
        self.writer.write_marker(J2cMarkerCode::QuantizationDefault)?;

        // Lqcd (2) + Sqcd (1) + SPqcd: one byte per band unquantized, two otherwise.
        let step_bytes = if qcd.quant_style == QUANT_STYLE_NONE { 1 } else { 2 };
        let length = 3 + qcd.step_sizes.len() * step_bytes;
        if length > u16::MAX as usize {
            return Err(J2cError::UnsupportedFeature);
        }
        self.writer.write_u16(length as u16)?;
        self.writer.write_byte((qcd.guard_bits << 5) | qcd.quant_style)?;

        for &step in &qcd.step_sizes {
            if step_bytes == 1 {
                self.writer.write_byte(step as u8)?;
            } else {
                self.writer.write_u16(step)?;
            }
        }
        Ok(())
    }

    /// Writes a Latin-1 comment, truncated to fit one segment.
    pub fn write_com(&mut self, comment: &str) -> Result<(), J2cError> {
        let text = comment.as_bytes();
        let text = &text[..text.len().min(SEGMENT_MAX_DATA_SIZE - 2)];
        self.writer.write_marker(J2cMarkerCode::Comment)?;
        self.writer.write_u16((4 + text.len()) as u16)?;
        self.writer.write_u16(COMMENT_REGISTRATION_LATIN)?;
        self.writer.write_bytes(text)
    }

    /// Writes SOT and returns the offset of its marker, for [`Self::patch_psot`].
    pub fn write_sot(
        &mut self,
        tile_index: u16,
        tile_len: u32,
        tile_part_index: u8,
        num_tile_parts: u8,
    ) -> Result<usize, J2cError> {
        let offset = self.writer.len();
        self.writer.write_marker(J2cMarkerCode::StartOfTile)?;
        self.writer.write_u16(10)?; // Length of marker segment (10 bytes)
        self.writer.write_u16(tile_index)?;
        self.writer.write_u32(tile_len)?; // Psot
        self.writer.write_byte(tile_part_index)?; // TPsot
        self.writer.write_byte(num_tile_parts)?; // TNsot
        Ok(offset)
    }

    /// Back-patches Psot of the tile-part started at `sot_offset` so it
    /// covers everything written since.
    pub fn patch_psot(&mut self, sot_offset: usize) -> Result<(), J2cError> {
        let psot = self.writer.len() - sot_offset;
        let psot = u32::try_from(psot).map_err(|_| J2cError::UnsupportedFeature)?;
        self.writer.patch_u32(sot_offset + 6, psot)
    }

    pub fn write_sod(&mut self) -> Result<(), J2cError> {
        self.writer.write_marker(J2cMarkerCode::StartOfData)
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), J2cError> {
        self.writer.write_bytes(data)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), J2cError> {
        self.writer.write_u32(value)
    }

    pub fn flush(&mut self) -> Result<(), J2cError> {
        self.writer.flush()
    }
}
