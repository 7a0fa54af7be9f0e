//! JPEG 2000 main header parser.
//!
//! Reads SOC through the first SOT marker. SIZ, COD and QCD are decoded,
//! comments are kept, and every other segment is skipped by its length.

use super::image::{
    CodingStyle, ComponentSize, ImageSize, QUANT_STYLE_NONE, QUANT_STYLE_SCALAR_EXPOUNDED,
    Quantization, TRANSFORM_REVERSIBLE_5_3,
};
use super::io::StreamReader;
use crate::constants::{MAX_DECOMPOSITION_LEVELS, MAX_IMAGE_SAMPLES};
use crate::error::J2cError;
use crate::marker_code::{COMMENT_REGISTRATION_LATIN, J2C_MARKER_START_BYTE, J2cMarkerCode};

/// Everything the main header says about the image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MainHeader {
    pub size: ImageSize,
    pub cod: CodingStyle,
    pub qcd: Quantization,
    pub comments: Vec<String>,
}

impl MainHeader {
    pub fn samples(&self) -> u64 {
        self.size.width() as u64 * self.size.height() as u64 * self.size.components.len() as u64
    }
}

pub struct J2cParser<'r, 's> {
    reader: &'r mut StreamReader<'s>,
    header: MainHeader,
    seen_cod: bool,
    seen_qcd: bool,
}

impl<'r, 's> J2cParser<'r, 's> {
    pub fn new(reader: &'r mut StreamReader<'s>) -> Self {
        Self {
            reader,
            header: MainHeader::default(),
            seen_cod: false,
            seen_qcd: false,
        }
    }

    /// Parses up to and including the SOT marker code. The SOT segment body
    /// is left for the tile reader.
    pub fn parse_main_header(mut self) -> Result<MainHeader, J2cError> {
        if self.reader.read_marker()? != J2cMarkerCode::StartOfCodestream {
            return Err(J2cError::InvalidData); // Expected SOC
        }
        // SIZ must follow SOC immediately.
        if self.reader.read_marker()? != J2cMarkerCode::ImageAndTileSize {
            return Err(J2cError::UnexpectedMarker);
        }
        self.parse_siz()?;

        loop {
            if self.reader.read_u8()? != J2C_MARKER_START_BYTE {
                return Err(J2cError::InvalidData);
            }
            let code = self.reader.read_u8()?;
            match J2cMarkerCode::try_from(code) {
                Ok(J2cMarkerCode::CodingStyleDefault) => self.parse_cod()?,
                Ok(J2cMarkerCode::QuantizationDefault) => self.parse_qcd()?,
                Ok(J2cMarkerCode::Comment) => self.parse_com()?,
                Ok(J2cMarkerCode::StartOfTile) => break,
                Ok(
                    J2cMarkerCode::StartOfCodestream
                    | J2cMarkerCode::ImageAndTileSize
                    | J2cMarkerCode::StartOfData
                    | J2cMarkerCode::EndOfCodestream,
                ) => return Err(J2cError::UnexpectedMarker),
                // COC, QCC, RGN, POC and unknown segments do not change how
                // this engine reads the tile data.
                _ => self.reader.skip_segment()?,
            }
        }

        if !self.seen_cod || !self.seen_qcd {
            return Err(J2cError::InvalidData);
        }
        self.validate()?;
        Ok(self.header)
    }

    fn parse_siz(&mut self) -> Result<(), J2cError> {
        let len = self.reader.read_u16()? as usize;
        let _capabilities = self.reader.read_u16()?; // Rsiz
        let size = &mut self.header.size;
        size.x1 = self.reader.read_u32()?;
        size.y1 = self.reader.read_u32()?;
        size.x0 = self.reader.read_u32()?;
        size.y0 = self.reader.read_u32()?;
        size.tile_width = self.reader.read_u32()?;
        size.tile_height = self.reader.read_u32()?;
        size.tile_x0 = self.reader.read_u32()?;
        size.tile_y0 = self.reader.read_u32()?;

        let count = self.reader.read_u16()? as usize;
        if count == 0 || len != 38 + 3 * count {
            return Err(J2cError::InvalidMarkerSegmentSize);
        }
        size.components = Vec::with_capacity(count);
        for _ in 0..count {
            let ssiz = self.reader.read_u8()?;
            let dx = self.reader.read_u8()?;
            let dy = self.reader.read_u8()?;
            size.components.push(ComponentSize {
                precision: (ssiz & 0x7F) + 1,
                is_signed: ssiz & 0x80 != 0,
                dx,
                dy,
            });
        }
        Ok(())
    }

    fn parse_cod(&mut self) -> Result<(), J2cError> {
        let len = self.reader.read_u16()? as usize;
        if len < 12 {
            return Err(J2cError::InvalidMarkerSegmentSize);
        }
        let cod = &mut self.header.cod;
        cod.coding_style = self.reader.read_u8()?;
        cod.progression_order = self.reader.read_u8()?;
        cod.number_of_layers = self.reader.read_u16()?;
        cod.mct = self.reader.read_u8()? != 0;
        cod.decomposition_levels = self.reader.read_u8()?;
        cod.codeblock_width_exp = self.reader.read_u8()?;
        cod.codeblock_height_exp = self.reader.read_u8()?;
        cod.codeblock_style = self.reader.read_u8()?;
        cod.transformation = self.reader.read_u8()?;
        // Precinct sizes (Scod bit 0) are irrelevant here.
        self.reader.skip(len - 12)?;
        self.seen_cod = true;
        Ok(())
    }

    fn parse_qcd(&mut self) -> Result<(), J2cError> {
        let len = self.reader.read_u16()? as usize;
        if len < 3 {
            return Err(J2cError::InvalidMarkerSegmentSize);
        }
        let sqcd = self.reader.read_u8()?;
        let quant_style = sqcd & 0x1F;
        let body = len - 3;
        let step_sizes = match quant_style {
            QUANT_STYLE_NONE => (0..body)
                .map(|_| self.reader.read_u8().map(u16::from))
                .collect::<Result<Vec<_>, _>>()?,
            QUANT_STYLE_SCALAR_EXPOUNDED if body % 2 == 0 => (0..body / 2)
                .map(|_| self.reader.read_u16())
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(J2cError::UnsupportedFeature),
        };
        self.header.qcd = Quantization {
            quant_style,
            guard_bits: sqcd >> 5,
            step_sizes,
        };
        self.seen_qcd = true;
        Ok(())
    }

    fn parse_com(&mut self) -> Result<(), J2cError> {
        let len = self.reader.read_u16()? as usize;
        if len < 4 {
            return Err(J2cError::InvalidMarkerSegmentSize);
        }
        let registration = self.reader.read_u16()?;
        let body = self.reader.read_bytes(len - 4)?;
        if registration == COMMENT_REGISTRATION_LATIN {
            // Latin-1 maps one to one onto the first 256 code points.
            self.header
                .comments
                .push(body.iter().map(|&b| char::from(b)).collect());
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), J2cError> {
        let size = &self.header.size;
        if size.width() == 0 || size.height() == 0 {
            return Err(J2cError::InvalidData);
        }
        if size.tile_width == 0 || size.tile_height == 0 {
            return Err(J2cError::InvalidData);
        }
        if size
            .components
            .iter()
            .any(|c| c.dx != 1 || c.dy != 1 || c.precision > 16)
        {
            return Err(J2cError::UnsupportedFeature);
        }
        if self.header.samples() > MAX_IMAGE_SAMPLES {
            return Err(J2cError::ImageTooLarge);
        }

        let cod = &self.header.cod;
        if cod.decomposition_levels > MAX_DECOMPOSITION_LEVELS {
            return Err(J2cError::InvalidData);
        }
        let reversible = cod.transformation == TRANSFORM_REVERSIBLE_5_3;
        let expected_style = if reversible {
            QUANT_STYLE_NONE
        } else {
            QUANT_STYLE_SCALAR_EXPOUNDED
        };
        let bands = 1 + 3 * cod.decomposition_levels as usize;
        if self.header.qcd.quant_style != expected_style || self.header.qcd.step_sizes.len() != bands
        {
            return Err(J2cError::UnsupportedFeature);
        }
        Ok(())
    }
}
