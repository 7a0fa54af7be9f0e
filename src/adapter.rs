//! Adapter entry points: decode, encode and metadata.
//!
//! Decode leans towards success. Once the inputs are known to be present,
//! any problem with the codestream itself discards the decode and reports
//! [`DecodeStatus::Discarded`], leaving the raster as it was. Encode and
//! metadata have nothing to fall back on and report errors.

use crate::codestream::Codestream;
use crate::constants::{
    DEFAULT_COMPRESS_RATIO, DEFAULT_DECOMPOSITION_LEVELS, LOSSY_LAYER_RATES, MAX_COMPONENTS,
    MAX_DECOMPOSITION_LEVELS,
};
use crate::engine::{
    CodecEngine, CodecParameters, ColorSpace, ComponentParameters, DecodeParameters,
    EncodeParameters, EngineImage,
};
use crate::error::{J2cError, Result, SoftFailure};
use crate::geometry;
use crate::jpeg2000::LiftingEngine;
use crate::marshal;
use crate::raster::Raster;
use crate::session::CodecSession;
use std::time::Instant;
use tracing::{debug, info};

/// Outcome of a decode that did not hit a hard failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// The raster now holds the decoded image.
    Decoded,
    /// The codestream was unusable; the raster is unchanged.
    Discarded(SoftFailure),
}

impl DecodeStatus {
    pub fn is_decoded(&self) -> bool {
        matches!(self, Self::Decoded)
    }
}

/// Encoder settings shared by every call on a [`J2cCodec`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodecOptions {
    compress_ratio: f32,
    max_components: usize,
    decomposition_levels: u8,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            compress_ratio: DEFAULT_COMPRESS_RATIO,
            max_components: MAX_COMPONENTS,
            decomposition_levels: DEFAULT_DECOMPOSITION_LEVELS,
        }
    }
}

impl CodecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scale applied to the lossy layer rates.
    pub fn set_compress_ratio(&mut self, compress_ratio: f32) {
        self.compress_ratio = if compress_ratio.is_finite() && compress_ratio > 0.0 {
            compress_ratio
        } else {
            DEFAULT_COMPRESS_RATIO
        };
    }

    /// Maximum number of raster channels encoded, at most [`MAX_COMPONENTS`].
    pub fn set_max_components(&mut self, max_components: usize) {
        self.max_components = max_components.clamp(1, MAX_COMPONENTS);
    }

    pub fn set_decomposition_levels(&mut self, levels: u8) {
        self.decomposition_levels = levels.min(MAX_DECOMPOSITION_LEVELS);
    }

    pub fn compress_ratio(&self) -> f32 {
        self.compress_ratio
    }

    pub fn max_components(&self) -> usize {
        self.max_components
    }

    pub fn decomposition_levels(&self) -> u8 {
        self.decomposition_levels
    }

    /// Engine parameters for an encode of `components` channels.
    pub fn encode_parameters(
        &self,
        reversible: bool,
        components: usize,
        comment: Option<&str>,
    ) -> EncodeParameters {
        let mut params = EncodeParameters {
            comment: comment.unwrap_or_default().to_string(),
            decomposition_levels: self.decomposition_levels,
            ..EncodeParameters::default()
        };
        if reversible {
            params.rates = vec![0.0];
        } else {
            params.rates = LOSSY_LAYER_RATES
                .iter()
                .map(|rate| rate * self.compress_ratio)
                .collect();
            params.irreversible = true;
            params.mct = components >= 3;
        }
        params
    }
}

/// JPEG 2000 adapter bound to a codec engine.
pub struct J2cCodec {
    engine: Box<dyn CodecEngine>,
    options: CodecOptions,
}

impl Default for J2cCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl J2cCodec {
    /// Adapter over the built-in [`LiftingEngine`].
    pub fn new() -> Self {
        Self::with_engine(Box::new(LiftingEngine::new()))
    }

    pub fn with_engine(engine: Box<dyn CodecEngine>) -> Self {
        Self {
            engine,
            options: CodecOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut CodecOptions {
        &mut self.options
    }

    /// Engine name and version.
    pub fn engine_info(&self) -> String {
        self.engine.version()
    }

    /// Decodes `codestream` at its requested discard level into `raster`.
    ///
    /// Channels `first_channel..first_channel + max_channel_count` of the
    /// image become raster channels `0..`. `decode_time` is the caller's time
    /// budget in seconds; it is logged, not enforced.
    pub fn decode(
        &self,
        codestream: &mut Codestream,
        raster: &mut Raster,
        decode_time: f32,
        first_channel: usize,
        max_channel_count: usize,
    ) -> Result<DecodeStatus> {
        if codestream.is_empty() {
            return Err(J2cError::EmptyCodestream);
        }
        if raster.is_empty() {
            return Err(J2cError::EmptyRaster);
        }

        let started = Instant::now();
        let discard_level = codestream.raw_discard_level();
        let params = CodecParameters::Decode(DecodeParameters {
            reduce: discard_level,
        });

        let image = {
            let mut session = CodecSession::new(
                self.engine.as_ref(),
                codestream.buffer_mut(),
                params,
            )?;
            session.decode(false)
        };

        let status = match image {
            None => DecodeStatus::Discarded(SoftFailure::DecodeFailed),
            Some(image) => {
                match Self::fill_raster(&image, discard_level, first_channel, max_channel_count, raster) {
                    Ok(()) => DecodeStatus::Decoded,
                    Err(reason) => DecodeStatus::Discarded(reason),
                }
            }
        };

        if let DecodeStatus::Discarded(reason) = status {
            debug!("decode: discarding image: {}", reason);
        }
        debug!(
            elapsed = ?started.elapsed(),
            budget = decode_time,
            "decode finished"
        );
        Ok(status)
    }

    fn fill_raster(
        image: &EngineImage,
        discard_level: u32,
        first_channel: usize,
        max_channel_count: usize,
        raster: &mut Raster,
    ) -> std::result::Result<(), SoftFailure> {
        for (i, comp) in image.comps.iter().enumerate() {
            debug!(
                "Component {} characteristics: {}x{}x{} {}",
                i,
                comp.w,
                comp.h,
                comp.prec,
                if comp.sgnd { "signed" } else { "unsigned" }
            );
        }

        let geometry = geometry::resolve(image, discard_level, first_channel, max_channel_count)?;
        // Validate before resizing so a bad component leaves the raster untouched.
        marshal::check_components(&image.comps, &geometry)?;

        raster.resize(geometry.width, geometry.height, geometry.channels);
        marshal::planar_to_interleaved(&image.comps, &geometry, raster.data_mut())
    }

    /// Encodes `raster` into `codestream`, replacing its contents.
    ///
    /// At most [`CodecOptions::max_components`] channels are encoded. A
    /// `reversible` encode is lossless; otherwise five quality layers are
    /// written at the configured compression ratio. On failure the
    /// codestream is left empty.
    pub fn encode(
        &self,
        codestream: &mut Codestream,
        raster: &Raster,
        comment: Option<&str>,
        encode_time: f32,
        reversible: bool,
    ) -> Result<()> {
        let width = raster.width();
        let height = raster.height();
        let raster_channels = raster.components();
        if width == 0 || height == 0 || raster_channels == 0 {
            return Err(J2cError::EmptyRaster);
        }
        if raster.data_size() < raster.expected_size() {
            return Err(J2cError::InvalidRaster);
        }

        let started = Instant::now();
        let numcomps = raster_channels.min(self.options.max_components);
        let params = self.options.encode_parameters(reversible, numcomps, comment);

        let cmptparm = vec![ComponentParameters::unsigned_8bit(width, height); numcomps];
        let mut image = EngineImage::new(&cmptparm, ColorSpace::Srgb);
        marshal::interleaved_to_planar(raster.data(), width, height, raster_channels, &mut image.comps);

        let buffer = codestream.buffer_mut();
        buffer.clear();
        let encoded = {
            let mut session = CodecSession::new(
                self.engine.as_ref(),
                buffer,
                CodecParameters::Encode(params),
            )?;
            session.encode(&image)
        };
        debug!(
            elapsed = ?started.elapsed(),
            budget = encode_time,
            bytes = codestream.data_size(),
            "encode finished"
        );

        if let Err(e) = encoded {
            info!("Failed to encode image: {}", e);
            // Leave no partial codestream behind.
            let buffer = codestream.buffer_mut();
            buffer.clear();
            buffer.shrink_to_fit();
            return Err(e);
        }
        codestream.set_size(width, height, numcomps);
        Ok(())
    }

    /// Reads only the codestream header and records the image size and
    /// component count on `codestream`.
    pub fn get_metadata(&self, codestream: &mut Codestream) -> Result<()> {
        if codestream.is_empty() {
            return Err(J2cError::EmptyCodestream);
        }

        let header = {
            let mut session = CodecSession::new(
                self.engine.as_ref(),
                codestream.buffer_mut(),
                CodecParameters::Decode(DecodeParameters::default()),
            )?;
            session.decode(true)
        };

        let Some(image) = header else {
            info!("get_metadata: failed to read codestream header");
            return Err(J2cError::HeaderUnreadable);
        };
        codestream.set_size(image.width(), image.height(), image.numcomps());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversible_parameters() {
        let params = CodecOptions::default().encode_parameters(true, 4, Some("hello"));
        assert!(!params.irreversible);
        assert!(!params.mct);
        assert_eq!(params.rates, vec![0.0]);
        assert_eq!(params.comment, "hello");
    }

    #[test]
    fn test_lossy_parameters_scale_rates() {
        let mut options = CodecOptions::default();
        options.set_compress_ratio(2.0);
        let params = options.encode_parameters(false, 3, None);
        assert!(params.irreversible);
        assert!(params.mct);
        assert_eq!(params.rates, vec![3840.0, 960.0, 240.0, 60.0, 20.0]);
        assert!(params.comment.is_empty());

        let params = options.encode_parameters(false, 2, None);
        assert!(!params.mct);
    }

    #[test]
    fn test_options_are_clamped() {
        let mut options = CodecOptions::new();
        options.set_max_components(9);
        options.set_compress_ratio(-1.0);
        options.set_decomposition_levels(200);
        assert_eq!(options.max_components(), MAX_COMPONENTS);
        assert_eq!(options.compress_ratio(), DEFAULT_COMPRESS_RATIO);
        assert_eq!(options.decomposition_levels(), MAX_DECOMPOSITION_LEVELS);
    }
}
