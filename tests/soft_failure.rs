//! Decode soft-failure policy, driven by a scripted engine.

use j2c_adapter::engine::{
    ColorSpace, ComponentParameters, EncodeParameters, TileGeometry,
};
use j2c_adapter::{
    ByteStream, CodecEngine, Codestream, Compress, DecodeParameters, DecodeStatus, Decompress,
    EngineImage, EventManager, J2cCodec, J2cError, Raster, SoftFailure,
};

/// Engine that hands back a fixed image whatever the codestream says.
#[derive(Clone)]
struct ScriptedEngine {
    header: Option<EngineImage>,
    decoded: Option<EngineImage>,
    can_compress: bool,
    compress_setup: bool,
}

struct ScriptedDecompress {
    engine: ScriptedEngine,
}

impl Decompress for ScriptedDecompress {
    fn set_event_manager(&mut self, _events: EventManager) {}

    fn setup(&mut self, _params: &DecodeParameters) -> bool {
        true
    }

    fn read_header(&mut self, _stream: &mut dyn ByteStream) -> Option<(EngineImage, TileGeometry)> {
        self.engine
            .header
            .clone()
            .map(|image| (image, TileGeometry::default()))
    }

    fn decode(&mut self, _stream: &mut dyn ByteStream) -> Option<EngineImage> {
        self.engine.decoded.clone()
    }
}

/// Writes a partial codestream, then reports failure.
struct FailingCompress {
    setup_ok: bool,
}

impl Compress for FailingCompress {
    fn set_event_manager(&mut self, _events: EventManager) {}

    fn setup(&mut self, _params: &EncodeParameters, _image: &EngineImage) -> bool {
        self.setup_ok
    }

    fn encode(&mut self, _image: &EngineImage, stream: &mut dyn ByteStream) -> bool {
        stream.write(&[0xFF, 0x4F]);
        false
    }
}

impl CodecEngine for ScriptedEngine {
    fn create_decompress(&self) -> Option<Box<dyn Decompress>> {
        Some(Box::new(ScriptedDecompress {
            engine: self.clone(),
        }))
    }

    fn create_compress(&self) -> Option<Box<dyn Compress>> {
        if self.can_compress {
            Some(Box::new(FailingCompress {
                setup_ok: self.compress_setup,
            }))
        } else {
            None
        }
    }

    fn version(&self) -> String {
        "scripted".to_string()
    }
}

/// A decoded 4x2 image whose components carry `factor`.
fn image(components: usize, factor: u32) -> EngineImage {
    let params = vec![ComponentParameters::unsigned_8bit(4, 2); components];
    let mut image = EngineImage::new(&params, ColorSpace::Srgb);
    for (c, comp) in image.comps.iter_mut().enumerate() {
        comp.factor = factor;
        comp.data = Some((0..8).map(|i| i * 10 + c as i32).collect());
    }
    image
}

fn codec(decoded: Option<EngineImage>) -> J2cCodec {
    J2cCodec::with_engine(Box::new(ScriptedEngine {
        header: Some(image(3, 0)),
        decoded,
        can_compress: true,
        compress_setup: true,
    }))
}

fn decode_with(
    codec: &J2cCodec,
    discard_level: u32,
    first_channel: usize,
    max_channel_count: usize,
) -> (DecodeStatus, Raster) {
    let mut codestream = Codestream::from_bytes(vec![0xFF, 0x4F]);
    codestream.set_raw_discard_level(discard_level);
    let mut raster = Raster::from_data(1, 1, 1, vec![77]);
    let status = codec
        .decode(&mut codestream, &mut raster, 0.0, first_channel, max_channel_count)
        .expect("soft failures are not errors");
    (status, raster)
}

fn untouched() -> Raster {
    Raster::from_data(1, 1, 1, vec![77])
}

#[test]
fn test_scripted_decode_flips_rows() {
    let codec = codec(Some(image(1, 0)));
    let (status, raster) = decode_with(&codec, 0, 0, 1);
    assert_eq!(status, DecodeStatus::Decoded);
    assert_eq!((raster.width(), raster.height()), (4, 2));
    // Codestream row 1 becomes raster row 0.
    assert_eq!(raster.data(), &[40, 50, 60, 70, 0, 10, 20, 30]);
}

#[test]
fn test_engine_decode_failure_is_discarded() {
    let codec = codec(None);
    let (status, raster) = decode_with(&codec, 0, 0, 3);
    assert_eq!(status, DecodeStatus::Discarded(SoftFailure::DecodeFailed));
    assert_eq!(raster, untouched());
}

#[test]
fn test_factor_mismatch_is_discarded() {
    let codec = codec(Some(image(3, 1)));
    let (status, raster) = decode_with(&codec, 2, 0, 3);
    assert_eq!(
        status,
        DecodeStatus::Discarded(SoftFailure::DiscardLevelMismatch {
            component: 0,
            factor: 1,
            expected: 2,
        })
    );
    assert_eq!(raster, untouched());
}

#[test]
fn test_first_channel_out_of_range_is_discarded() {
    let codec = codec(Some(image(3, 0)));
    let (status, raster) = decode_with(&codec, 0, 3, 1);
    assert_eq!(
        status,
        DecodeStatus::Discarded(SoftFailure::FirstChannelOutOfRange {
            first_channel: 3,
            components: 3,
        })
    );
    assert_eq!(raster, untouched());
}

#[test]
fn test_missing_component_data_is_discarded() {
    let mut decoded = image(3, 0);
    decoded.comps[1].data = None;
    let codec = codec(Some(decoded));
    let (status, raster) = decode_with(&codec, 0, 0, 3);
    assert_eq!(
        status,
        DecodeStatus::Discarded(SoftFailure::MissingComponentData(1))
    );
    assert_eq!(raster, untouched());

    // Channels outside the window are never looked at.
    let (status, _) = decode_with(&codec, 0, 0, 1);
    assert!(status.is_decoded());
}

#[test]
fn test_short_component_buffer_is_discarded() {
    let mut decoded = image(2, 0);
    decoded.comps[0].data = Some(vec![1, 2, 3]);
    let codec = codec(Some(decoded));
    let (status, raster) = decode_with(&codec, 0, 0, 2);
    assert_eq!(status, DecodeStatus::Discarded(SoftFailure::ComponentTooSmall(0)));
    assert_eq!(raster, untouched());
}

#[test]
fn test_no_components_is_discarded() {
    let mut decoded = image(1, 0);
    decoded.comps.clear();
    let codec = codec(Some(decoded));
    let (status, raster) = decode_with(&codec, 0, 0, 3);
    assert_eq!(status, DecodeStatus::Discarded(SoftFailure::NoComponents));
    assert_eq!(raster, untouched());
}

#[test]
fn test_zero_dimensions_are_discarded() {
    let mut decoded = image(1, 0);
    decoded.x1 = 0;
    let codec = codec(Some(decoded));
    let (status, raster) = decode_with(&codec, 0, 0, 1);
    assert_eq!(
        status,
        DecodeStatus::Discarded(SoftFailure::InvalidDimensions { width: 0, height: 2 })
    );
    assert_eq!(raster, untouched());
}

#[test]
fn test_unreadable_header_fails_metadata() {
    let codec = J2cCodec::with_engine(Box::new(ScriptedEngine {
        header: None,
        decoded: None,
        can_compress: false,
        compress_setup: true,
    }));
    let mut codestream = Codestream::from_bytes(vec![0xFF, 0x4F]);
    assert_eq!(
        codec.get_metadata(&mut codestream),
        Err(J2cError::HeaderUnreadable)
    );
}

#[test]
fn test_encode_failures_are_hard() {
    let raster = Raster::from_data(2, 2, 1, vec![1, 2, 3, 4]);

    let failing = codec(None);
    let mut codestream = Codestream::from_bytes(vec![7, 7, 7]);
    assert_eq!(
        failing.encode(&mut codestream, &raster, None, 0.0, true),
        Err(J2cError::EncodeFailed)
    );
    // The two bytes written before the failure are dropped too.
    assert!(codestream.is_empty());
    assert_eq!(codestream.width(), 0);

    let unavailable = J2cCodec::with_engine(Box::new(ScriptedEngine {
        header: None,
        decoded: None,
        can_compress: false,
        compress_setup: true,
    }));
    assert_eq!(
        unavailable.encode(&mut codestream, &raster, None, 0.0, true),
        Err(J2cError::EngineUnavailable)
    );
    assert_eq!(unavailable.engine_info(), "scripted");
}

#[test]
fn test_rejected_parameters_are_a_setup_failure() {
    let raster = Raster::from_data(2, 2, 1, vec![1, 2, 3, 4]);
    let codec = J2cCodec::with_engine(Box::new(ScriptedEngine {
        header: None,
        decoded: None,
        can_compress: true,
        compress_setup: false,
    }));
    let mut codestream = Codestream::from_bytes(vec![7, 7, 7]);
    assert_eq!(
        codec.encode(&mut codestream, &raster, None, 0.0, false),
        Err(J2cError::EngineSetupFailed)
    );
    assert!(codestream.is_empty());
}
