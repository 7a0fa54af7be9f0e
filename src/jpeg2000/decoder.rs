//! JPEG 2000 Decoder
//!
//! Reads codestreams written by [`super::encoder`]: a main header, one tile
//! with a packet per resolution, then EOC. With a reduction factor `f` only
//! the resolutions needed for the `1/2^f` image are read; the rest of the
//! tile is skipped on the stream.

use super::dwt::{Dwt53, Dwt97, inverse_2d};
use super::image::{Subband, subbands};
use super::io::StreamReader;
use super::mct::{inverse_ict, inverse_rct};
use super::packet::{check_packet, read_packet};
use super::parser::{J2cParser, MainHeader};
use super::quantization::{StepSize, dequantize_scalar, subband_gain};
use crate::constants::MAX_DECOMPOSITION_LEVELS;
use crate::engine::{
    ColorSpace, DecodeParameters, Decompress, EngineImage, EventManager, ImageComponent,
    TileGeometry,
};
use crate::error::J2cError;
use crate::geometry::ceil_div_pow2;
use crate::marker_code::{J2C_MARKER_START_BYTE, J2cMarkerCode};
use crate::stream::ByteStream;

/// Length of the SOT marker code consumed by the header parser.
const SOT_MARKER_SIZE: usize = 2;

/// Decompressor handle of the lifting engine.
#[derive(Debug, Default)]
pub struct LiftingDecompressor {
    events: EventManager,
    params: DecodeParameters,
    header: Option<MainHeader>,
}

impl LiftingDecompressor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decompress for LiftingDecompressor {
    fn set_event_manager(&mut self, events: EventManager) {
        self.events = events;
    }

    fn setup(&mut self, params: &DecodeParameters) -> bool {
        if params.reduce > MAX_DECOMPOSITION_LEVELS as u32 {
            self.events
                .error(&format!("invalid reduction factor {}\n", params.reduce));
            return false;
        }
        self.params = *params;
        true
    }

    fn read_header(&mut self, stream: &mut dyn ByteStream) -> Option<(EngineImage, TileGeometry)> {
        let mut reader = StreamReader::new(stream);
        let parsed = J2cParser::new(&mut reader).parse_main_header();
        reader.release();

        let header = match parsed {
            Ok(header) => header,
            Err(e) => {
                self.events
                    .error(&format!("failed to read the main header: {}\n", e));
                return None;
            }
        };
        let levels = header.cod.decomposition_levels as u32;
        if self.params.reduce > levels {
            self.events.error(&format!(
                "cannot discard {} resolution levels, the codestream has {}\n",
                self.params.reduce, levels
            ));
            return None;
        }
        for comment in &header.comments {
            self.events.info(&format!("comment: {}\n", comment));
        }

        let image = header_image(&header, self.params.reduce);
        let tiles = tile_geometry(&header);
        self.header = Some(header);
        Some((image, tiles))
    }

    fn decode(&mut self, stream: &mut dyn ByteStream) -> Option<EngineImage> {
        let Some(header) = self.header.take() else {
            self.events.error("decode called before read_header\n");
            return None;
        };
        match decode_tile(&header, self.params.reduce, stream, &mut self.events) {
            Ok(image) => {
                self.events.info(&format!(
                    "tile 1/1 decoded at reduction {}\n",
                    self.params.reduce
                ));
                Some(image)
            }
            Err(e) => {
                self.events.error(&format!("failed to decode tile: {}\n", e));
                None
            }
        }
    }
}

fn color_space(header: &MainHeader) -> ColorSpace {
    match header.size.components.len() {
        1 | 2 => ColorSpace::Gray,
        _ if header.cod.mct => ColorSpace::Srgb,
        _ => ColorSpace::Unspecified,
    }
}

/// Image descriptor as announced by the header, without sample data.
fn header_image(header: &MainHeader, reduce: u32) -> EngineImage {
    let size = &header.size;
    let comps = size
        .components
        .iter()
        .map(|component| ImageComponent {
            dx: component.dx as u32,
            dy: component.dy as u32,
            w: ceil_div_pow2(size.width(), reduce),
            h: ceil_div_pow2(size.height(), reduce),
            x0: ceil_div_pow2(size.x0, reduce),
            y0: ceil_div_pow2(size.y0, reduce),
            prec: component.precision as u32,
            sgnd: component.is_signed,
            factor: reduce,
            data: None,
        })
        .collect();
    EngineImage {
        x0: size.x0,
        y0: size.y0,
        x1: size.x1,
        y1: size.y1,
        color_space: color_space(header),
        comps,
    }
}

fn tile_geometry(header: &MainHeader) -> TileGeometry {
    let size = &header.size;
    let tiles = |end: u32, origin: u32, extent: u32| {
        (end.saturating_sub(origin) as u64).div_ceil(extent.max(1) as u64) as u32
    };
    TileGeometry {
        tile_x0: size.tile_x0,
        tile_y0: size.tile_y0,
        tile_width: size.tile_width,
        tile_height: size.tile_height,
        tiles_x: tiles(size.x1, size.tile_x0, size.tile_width),
        tiles_y: tiles(size.y1, size.tile_y0, size.tile_height),
    }
}

/// Reads the tile-part header that follows the SOT marker code and returns
/// Psot.
fn read_tile_part_header(reader: &mut StreamReader<'_>) -> Result<usize, J2cError> {
    if reader.read_u16()? != 10 {
        return Err(J2cError::InvalidMarkerSegmentSize);
    }
    if reader.read_u16()? != 0 {
        return Err(J2cError::InvalidData); // Only tile 0 exists.
    }
    let psot = reader.read_u32()? as usize;
    let _tile_part_index = reader.read_u8()?;
    let _tile_part_count = reader.read_u8()?;

    loop {
        if reader.read_u8()? != J2C_MARKER_START_BYTE {
            return Err(J2cError::InvalidData);
        }
        match J2cMarkerCode::try_from(reader.read_u8()?) {
            Ok(J2cMarkerCode::StartOfData) => return Ok(psot),
            Ok(
                J2cMarkerCode::StartOfCodestream
                | J2cMarkerCode::ImageAndTileSize
                | J2cMarkerCode::StartOfTile
                | J2cMarkerCode::EndOfCodestream,
            ) => return Err(J2cError::UnexpectedMarker),
            _ => reader.skip_segment()?,
        }
    }
}

/// Largest coefficient magnitude the encoder can produce for `header`:
/// the sample range grown by the color transform, the band gains and two
/// bits per decomposition level.
fn coefficient_limit(header: &MainHeader) -> u32 {
    let precision = header
        .size
        .components
        .iter()
        .map(|component| component.precision as u32)
        .max()
        .unwrap_or(0);
    let bits = precision + 4 + 2 * header.cod.decomposition_levels as u32;
    if bits >= 31 { i32::MAX as u32 } else { 1 << bits }
}

/// Coefficient planes of every component in Mallat layout, full tile size.
///
/// The kept packets are read and checked before the planes are allocated.
fn read_packets(
    header: &MainHeader,
    keep: u8,
    reader: &mut StreamReader<'_>,
    bands: &[Subband],
) -> Result<Vec<Vec<i32>>, J2cError> {
    let size = &header.size;
    let components = size.components.len();
    let limit = coefficient_limit(header);

    let psot = read_tile_part_header(reader)?;
    // Bytes left in the tile-part, when Psot gives its length.
    let tile_end =
        |position: usize| (psot != 0).then(|| psot.saturating_sub(SOT_MARKER_SIZE + position));

    let mut bodies = Vec::with_capacity(keep as usize + 1);
    for resolution in 0..=header.cod.decomposition_levels {
        if resolution > keep {
            // Everything left in the tile belongs to discarded resolutions.
            match tile_end(reader.position()) {
                Some(rest) => reader.skip(rest)?,
                None => {
                    let len = reader.read_u32()? as usize;
                    reader.skip(len)?;
                    continue;
                }
            }
            break;
        }
        let len = reader.read_u32()? as usize;
        if tile_end(reader.position()).is_some_and(|rest| len > rest) {
            return Err(J2cError::InvalidData);
        }
        let body = reader.read_bytes(len)?;
        check_packet(&body, components, bands, resolution, limit)?;
        bodies.push(body);
    }

    let stride = size.width() as usize;
    let plane_len = stride * size.height() as usize;
    let mut planes = vec![vec![0i32; plane_len]; components];
    for (resolution, body) in (0u8..).zip(&bodies) {
        read_packet(body, &mut planes, stride, bands, resolution, limit)?;
    }
    Ok(planes)
}

fn decode_tile(
    header: &MainHeader,
    reduce: u32,
    stream: &mut dyn ByteStream,
    events: &mut EventManager,
) -> Result<EngineImage, J2cError> {
    let tiles = tile_geometry(header);
    if tiles.tiles_x != 1 || tiles.tiles_y != 1 {
        return Err(J2cError::UnsupportedFeature);
    }
    let levels = header.cod.decomposition_levels;
    let reduce = u8::try_from(reduce)
        .ok()
        .filter(|&reduce| reduce <= levels)
        .ok_or(J2cError::InvalidData)?;

    let size = &header.size;
    let (width, height) = (size.width(), size.height());
    let stride = width as usize;
    let bands = subbands(width, height, levels);

    let mut reader = StreamReader::new(stream);
    let planes = read_packets(header, levels - reduce, &mut reader, &bands)?;
    match reader.read_marker() {
        Ok(J2cMarkerCode::EndOfCodestream) => {}
        _ => events.warning("stream does not end with EOC\n"),
    }
    reader.release();

    let (reduced_width, reduced_height) = (
        ceil_div_pow2(width, reduce as u32) as usize,
        ceil_div_pow2(height, reduce as u32) as usize,
    );

    let mct = header.cod.mct && planes.len() >= 3;
    let mut samples: Vec<Vec<i32>> = if header.cod.is_reversible() {
        let mut planes = planes;
        for plane in planes.iter_mut() {
            inverse_2d::<Dwt53>(plane, stride, width, height, levels, reduce);
        }
        let mut cropped: Vec<Vec<i32>> = planes
            .iter()
            .map(|plane| crop(plane, stride, reduced_width, reduced_height))
            .collect();
        if mct {
            inverse_rct(&mut cropped);
        }
        cropped
    } else {
        let mut planes = dequantize(header, &planes, &bands, levels - reduce);
        for plane in planes.iter_mut() {
            inverse_2d::<Dwt97>(plane, stride, width, height, levels, reduce);
        }
        let mut cropped: Vec<Vec<f32>> = planes
            .iter()
            .map(|plane| crop(plane, stride, reduced_width, reduced_height))
            .collect();
        if mct {
            inverse_ict(&mut cropped);
        }
        cropped
            .into_iter()
            .map(|plane| plane.into_iter().map(|s| s.round() as i32).collect())
            .collect()
    };

    let mut image = header_image(header, reduce as u32);
    for (comp, plane) in image.comps.iter_mut().zip(samples.iter_mut()) {
        let (low, high) = if comp.sgnd {
            (-(1i32 << (comp.prec - 1)), (1i32 << (comp.prec - 1)) - 1)
        } else {
            (0, (1i32 << comp.prec) - 1)
        };
        let offset = if comp.sgnd { 0 } else { 1i32 << (comp.prec - 1) };
        for sample in plane.iter_mut() {
            *sample = sample.saturating_add(offset).clamp(low, high);
        }
        comp.data = Some(std::mem::take(plane));
    }
    Ok(image)
}

/// Top-left `width` x `height` corner of a plane with row stride `stride`.
fn crop<T: Copy>(plane: &[T], stride: usize, width: usize, height: usize) -> Vec<T> {
    (0..height)
        .flat_map(|y| plane[y * stride..y * stride + width].iter().copied())
        .collect()
}

/// Reconstructs float coefficients of the kept resolutions from QCD steps.
fn dequantize(header: &MainHeader, planes: &[Vec<i32>], bands: &[Subband], keep: u8) -> Vec<Vec<f32>> {
    let stride = header.size.width() as usize;
    let precision = header.size.components[0].precision as u32;
    planes
        .iter()
        .map(|plane| {
            let mut out = vec![0f32; plane.len()];
            for (band, &step) in bands.iter().zip(&header.qcd.step_sizes) {
                if band.resolution > keep {
                    continue;
                }
                let delta = StepSize::from_u16(step).delta(precision + subband_gain(band.orientation));
                for y in band.y0..band.y0 + band.height {
                    for x in band.x0..band.x0 + band.width {
                        out[y * stride + x] = dequantize_scalar(plane[y * stride + x], delta);
                    }
                }
            }
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ColorSpace, Compress, ComponentParameters, EncodeParameters};
    use crate::jpeg2000::encoder::LiftingCompressor;
    use crate::stream::StreamBridge;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn sample(c: usize, x: u32, y: u32) -> i32 {
        ((x * 9 + y * 5 + c as u32 * 60) % 256) as i32
    }

    fn encode(width: u32, height: u32, comps: usize, params: &EncodeParameters) -> Vec<u8> {
        let shapes = vec![ComponentParameters::unsigned_8bit(width, height); comps];
        let mut image = EngineImage::new(&shapes, ColorSpace::Srgb);
        for (c, comp) in image.comps.iter_mut().enumerate() {
            let data = comp.data.as_mut().unwrap();
            for y in 0..height {
                for x in 0..width {
                    data[(y * width + x) as usize] = sample(c, x, y);
                }
            }
        }
        let mut buffer = Vec::new();
        let mut bridge = StreamBridge::new(&mut buffer);
        let mut compressor = LiftingCompressor::new();
        assert!(compressor.setup(params, &image));
        assert!(compressor.encode(&image, &mut bridge));
        drop(bridge);
        buffer
    }

    fn decode(data: &mut Vec<u8>, reduce: u32) -> Option<EngineImage> {
        let mut bridge = StreamBridge::new(data);
        let mut decompressor = LiftingDecompressor::new();
        assert!(decompressor.setup(&DecodeParameters { reduce }));
        decompressor.read_header(&mut bridge)?;
        decompressor.decode(&mut bridge)
    }

    #[test]
    fn test_reversible_roundtrip_is_exact() {
        let params = EncodeParameters {
            mct: true,
            decomposition_levels: 3,
            ..EncodeParameters::default()
        };
        let mut data = encode(13, 7, 3, &params);
        let image = decode(&mut data, 0).unwrap();
        assert_eq!(image.numcomps(), 3);
        assert_eq!(image.color_space, ColorSpace::Srgb);
        for (c, comp) in image.comps.iter().enumerate() {
            assert_eq!((comp.w, comp.h, comp.factor), (13, 7, 0));
            let data = comp.data.as_ref().unwrap();
            for y in 0..7 {
                for x in 0..13 {
                    assert_eq!(data[(y * 13 + x) as usize], sample(c, x, y));
                }
            }
        }
    }

    #[test]
    fn test_reduced_decode_compacts_components() {
        let mut data = encode(13, 7, 1, &EncodeParameters::default());
        let image = decode(&mut data, 2).unwrap();
        assert_eq!((image.width(), image.height()), (13, 7));
        let comp = &image.comps[0];
        assert_eq!((comp.w, comp.h, comp.factor), (4, 2, 2));
        assert_eq!(comp.data.as_ref().map(Vec::len), Some(8));
        assert!(comp.data.as_ref().unwrap().iter().all(|&s| (0..=255).contains(&s)));
    }

    #[test]
    fn test_irreversible_roundtrip_is_close() {
        let params = EncodeParameters {
            irreversible: true,
            rates: vec![15.0],
            mct: true,
            decomposition_levels: 2,
            ..EncodeParameters::default()
        };
        let mut data = encode(16, 16, 3, &params);
        let image = decode(&mut data, 0).unwrap();
        let mut total_error = 0i64;
        for (c, comp) in image.comps.iter().enumerate() {
            let data = comp.data.as_ref().unwrap();
            for y in 0..16 {
                for x in 0..16 {
                    total_error += (data[(y * 16 + x) as usize] - sample(c, x, y)).abs() as i64;
                }
            }
        }
        let mean_error = total_error as f64 / (16.0 * 16.0 * 3.0);
        assert!(mean_error < 16.0, "mean error {}", mean_error);
    }

    #[test]
    fn test_reduce_beyond_levels_fails_header() {
        let params = EncodeParameters {
            decomposition_levels: 1,
            ..EncodeParameters::default()
        };
        let mut data = encode(8, 8, 1, &params);
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&errors);
        let mut events = EventManager::new();
        events.set_error_handler(Box::new(move |msg| sink.borrow_mut().push(msg.to_string())));

        let mut bridge = StreamBridge::new(&mut data);
        let mut decompressor = LiftingDecompressor::new();
        decompressor.set_event_manager(events);
        assert!(decompressor.setup(&DecodeParameters { reduce: 2 }));
        assert!(decompressor.read_header(&mut bridge).is_none());
        assert_eq!(errors.borrow().len(), 1);
    }

    #[test]
    fn test_header_reports_geometry_without_data() {
        let params = EncodeParameters {
            comment: "hello".to_string(),
            ..EncodeParameters::default()
        };
        let mut data = encode(10, 6, 2, &params);
        let mut bridge = StreamBridge::new(&mut data);
        let mut decompressor = LiftingDecompressor::new();
        let (image, tiles) = decompressor.read_header(&mut bridge).unwrap();
        assert_eq!((image.width(), image.height(), image.numcomps()), (10, 6, 2));
        assert!(image.comps.iter().all(|comp| comp.data.is_none()));
        assert_eq!((tiles.tiles_x, tiles.tiles_y), (1, 1));
        assert_eq!((tiles.tile_width, tiles.tile_height), (10, 6));
    }

    #[test]
    fn test_truncated_tile_fails() {
        let mut data = encode(16, 16, 1, &EncodeParameters::default());
        let len = data.len();
        data.truncate(len - 20);
        assert!(decode(&mut data, 0).is_none());
    }

    #[test]
    fn test_missing_eoc_only_warns() {
        let mut data = encode(8, 8, 1, &EncodeParameters::default());
        let len = data.len();
        data.truncate(len - 2);
        let image = decode(&mut data, 0).unwrap();
        assert_eq!(image.comps[0].data.as_ref().unwrap()[9], sample(0, 1, 1));
    }

    #[test]
    fn test_decode_without_header_fails() {
        let mut data = encode(4, 4, 1, &EncodeParameters::default());
        let mut bridge = StreamBridge::new(&mut data);
        assert!(LiftingDecompressor::new().decode(&mut bridge).is_none());
    }
}
