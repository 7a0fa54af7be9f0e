//! One engine session: a codec handle bound to a codestream buffer.
//!
//! A session is created per adapter call and dropped before the call
//! returns, which releases the engine handle on every exit path.

use crate::engine::{
    CodecEngine, CodecParameters, Compress, Decompress, DecodeParameters, EncodeParameters,
    EngineImage, EventManager, TileGeometry,
};
use crate::error::{J2cError, Result};
use crate::stream::StreamBridge;
use tracing::{debug, info};

enum SessionCodec {
    Decode {
        codec: Box<dyn Decompress>,
        params: DecodeParameters,
    },
    Encode {
        codec: Box<dyn Compress>,
        params: EncodeParameters,
    },
}

pub struct CodecSession<'a> {
    codec: SessionCodec,
    stream: StreamBridge<'a>,
}

impl<'a> CodecSession<'a> {
    /// Creates the engine handle matching `params` and binds it to `buffer`.
    pub fn new(
        engine: &dyn CodecEngine,
        buffer: &'a mut Vec<u8>,
        params: CodecParameters,
    ) -> Result<Self> {
        let codec = match params {
            CodecParameters::Decode(params) => {
                let mut codec = engine
                    .create_decompress()
                    .ok_or(J2cError::EngineUnavailable)?;
                codec.set_event_manager(EventManager::tracing());
                SessionCodec::Decode { codec, params }
            }
            CodecParameters::Encode(params) => {
                let mut codec = engine
                    .create_compress()
                    .ok_or(J2cError::EngineUnavailable)?;
                codec.set_event_manager(EventManager::tracing());
                SessionCodec::Encode { codec, params }
            }
        };
        Ok(Self {
            codec,
            stream: StreamBridge::new(buffer),
        })
    }

    /// Reads the header and returns it without decoding any samples.
    pub fn read_header(&mut self) -> Option<(EngineImage, TileGeometry)> {
        let SessionCodec::Decode { codec, params } = &mut self.codec else {
            info!("Invalid or not decode codec");
            return None;
        };
        if !codec.setup(params) {
            info!("decoder setup failed");
            return None;
        }
        let header = codec.read_header(&mut self.stream);
        match &header {
            Some((_, tiles)) => debug!(
                "Decoded header : x0={} y0={} width={} height={} tilesx={} tilesy={}",
                tiles.tile_x0,
                tiles.tile_y0,
                tiles.tile_width,
                tiles.tile_height,
                tiles.tiles_x,
                tiles.tiles_y
            ),
            None => info!("failed to decode image header"),
        }
        header
    }

    /// Reads the header and, unless `header_only`, decodes the image.
    pub fn decode(&mut self, header_only: bool) -> Option<EngineImage> {
        let (header, _) = self.read_header()?;
        if header_only {
            return Some(header);
        }
        let SessionCodec::Decode { codec, .. } = &mut self.codec else {
            return None;
        };
        let image = codec.decode(&mut self.stream);
        if image.is_none() {
            info!("failed to decode image");
        }
        image
    }

    /// Configures the compressor for `image` and encodes it into the buffer.
    pub fn encode(&mut self, image: &EngineImage) -> Result<()> {
        let SessionCodec::Encode { codec, params } = &mut self.codec else {
            info!("Invalid or not encode codec");
            return Err(J2cError::EngineSetupFailed);
        };
        if !codec.setup(params, image) {
            info!("encoder setup failed");
            return Err(J2cError::EngineSetupFailed);
        }
        let encoded = codec.encode(image, &mut self.stream);
        self.stream.finish();
        if encoded {
            Ok(())
        } else {
            Err(J2cError::EncodeFailed)
        }
    }

    pub fn bytes_written(&self) -> usize {
        self.stream.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ColorSpace, ComponentParameters};
    use crate::jpeg2000::LiftingEngine;

    fn encoded(buffer: &mut Vec<u8>) -> EngineImage {
        let params = [ComponentParameters::unsigned_8bit(6, 4); 2];
        let mut image = EngineImage::new(&params, ColorSpace::Srgb);
        for comp in image.comps.iter_mut() {
            comp.data = Some((0..24).map(|v| v * 10).collect());
        }
        let mut session = CodecSession::new(
            &LiftingEngine,
            buffer,
            CodecParameters::Encode(EncodeParameters::default()),
        )
        .unwrap();
        session.encode(&image).unwrap();
        assert!(session.bytes_written() > 0);
        image
    }

    #[test]
    fn test_header_only_decode_has_no_samples() {
        let mut buffer = Vec::new();
        encoded(&mut buffer);

        let mut session = CodecSession::new(
            &LiftingEngine,
            &mut buffer,
            CodecParameters::Decode(DecodeParameters::default()),
        )
        .unwrap();
        let header = session.decode(true).unwrap();
        assert_eq!((header.width(), header.height(), header.numcomps()), (6, 4, 2));
        assert!(header.comps.iter().all(|c| c.data.is_none()));
    }

    #[test]
    fn test_full_decode_returns_samples() {
        let mut buffer = Vec::new();
        let image = encoded(&mut buffer);

        let mut session = CodecSession::new(
            &LiftingEngine,
            &mut buffer,
            CodecParameters::Decode(DecodeParameters::default()),
        )
        .unwrap();
        let decoded = session.decode(false).unwrap();
        assert_eq!(decoded.comps[1].data, image.comps[1].data);
    }

    #[test]
    fn test_rejected_image_is_a_setup_failure() {
        let mut buffer = Vec::new();
        let mut session = CodecSession::new(
            &LiftingEngine,
            &mut buffer,
            CodecParameters::Encode(EncodeParameters::default()),
        )
        .unwrap();
        // No components: the compressor refuses the image before writing.
        assert_eq!(
            session.encode(&EngineImage::default()),
            Err(J2cError::EngineSetupFailed)
        );
        assert_eq!(session.bytes_written(), 0);
    }

    #[test]
    fn test_mode_mismatch_is_refused() {
        let mut buffer = vec![0xFF, 0x4F];
        let mut session = CodecSession::new(
            &LiftingEngine,
            &mut buffer,
            CodecParameters::Decode(DecodeParameters::default()),
        )
        .unwrap();
        assert_eq!(
            session.encode(&EngineImage::default()),
            Err(J2cError::EngineSetupFailed)
        );

        let mut empty = Vec::new();
        let mut session = CodecSession::new(
            &LiftingEngine,
            &mut empty,
            CodecParameters::Encode(EncodeParameters::default()),
        )
        .unwrap();
        assert!(session.decode(true).is_none());
        assert_eq!(session.bytes_written(), 0);
    }
}
