//! JPEG 2000 Encoder
//!
//! Produces a single-tile codestream. Samples are level shifted, optionally
//! decorrelated (RCT or ICT on the first three components), transformed with
//! the 5/3 or 9/7 wavelet and, for the irreversible path, quantized with the
//! step sizes announced in QCD. The tile body is one packet per resolution
//! (see [`super::packet`]).

use super::dwt::{Dwt53, Dwt97, forward_2d};
use super::image::{
    CodingStyle, ComponentSize, ImageSize, QUANT_STYLE_NONE, QUANT_STYLE_SCALAR_EXPOUNDED,
    Quantization, TRANSFORM_IRREVERSIBLE_9_7, TRANSFORM_REVERSIBLE_5_3, subbands,
};
use super::mct::{forward_ict, forward_rct};
use super::packet::write_packet;
use super::quantization::{StepSize, quantize_scalar, subband_delta, subband_gain};
use super::writer::J2cWriter;
use crate::constants::{MAX_DECOMPOSITION_LEVELS, MAX_IMAGE_SAMPLES};
use crate::engine::{Compress, EncodeParameters, EngineImage, EventManager};
use crate::error::J2cError;
use crate::stream::ByteStream;

/// Guard bits announced in QCD.
const GUARD_BITS: u8 = 2;

/// Compressor handle of the lifting engine.
#[derive(Debug, Default)]
pub struct LiftingCompressor {
    events: EventManager,
    params: Option<EncodeParameters>,
}

impl LiftingCompressor {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_image(params: &EncodeParameters, image: &EngineImage) -> Result<(), String> {
        let (width, height) = (image.width(), image.height());
        if image.comps.is_empty() || width == 0 || height == 0 {
            return Err("image has no samples".to_string());
        }
        if image.numcomps() > u16::MAX as usize / 3 {
            return Err(format!("too many components: {}", image.numcomps()));
        }
        if width as u64 * height as u64 * image.numcomps() as u64 > MAX_IMAGE_SAMPLES {
            return Err(format!("image too large: {}x{}", width, height));
        }
        if params.decomposition_levels > MAX_DECOMPOSITION_LEVELS {
            return Err(format!(
                "too many decomposition levels: {}",
                params.decomposition_levels
            ));
        }
        if params.rates.is_empty() || params.rates.len() > u16::MAX as usize {
            return Err("no quality layers requested".to_string());
        }
        for (i, comp) in image.comps.iter().enumerate() {
            if comp.dx != 1 || comp.dy != 1 {
                return Err(format!("component {} is subsampled", i));
            }
            if comp.w != width || comp.h != height {
                return Err(format!("component {} does not cover the image", i));
            }
            if comp.prec == 0 || comp.prec > 16 {
                return Err(format!("component {} has precision {}", i, comp.prec));
            }
            let expected = width as usize * height as usize;
            if comp.data.as_ref().is_none_or(|data| data.len() < expected) {
                return Err(format!("component {} has no sample data", i));
            }
        }
        Ok(())
    }
}

impl Compress for LiftingCompressor {
    fn set_event_manager(&mut self, events: EventManager) {
        self.events = events;
    }

    fn setup(&mut self, params: &EncodeParameters, image: &EngineImage) -> bool {
        if let Err(msg) = Self::check_image(params, image) {
            self.events.error(&format!("{}\n", msg));
            return false;
        }
        self.params = Some(params.clone());
        true
    }

    fn encode(&mut self, image: &EngineImage, stream: &mut dyn ByteStream) -> bool {
        let Some(params) = self.params.as_ref() else {
            self.events.error("encode called before setup\n");
            return false;
        };
        match encode_image(params, image, stream) {
            Ok(bytes) => {
                self.events.info(&format!(
                    "tile 1/1 encoded, {} bytes for {}x{}x{}\n",
                    bytes,
                    image.width(),
                    image.height(),
                    image.numcomps()
                ));
                true
            }
            Err(e) => {
                self.events.error(&format!("encode failed: {}\n", e));
                false
            }
        }
    }
}

/// Transformed and quantized coefficients ready for packetization.
struct Coefficients {
    planes: Vec<Vec<i32>>,
    qcd: Quantization,
}

fn level_shift(image: &EngineImage) -> impl Iterator<Item = Vec<i32>> + '_ {
    image.comps.iter().map(|comp| {
        let offset = if comp.sgnd { 0 } else { 1 << (comp.prec - 1) };
        comp.data
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|&sample| sample - offset)
            .collect()
    })
}

fn reversible_coefficients(image: &EngineImage, cod: &CodingStyle) -> Coefficients {
    let (width, height) = (image.width(), image.height());
    let mut planes: Vec<Vec<i32>> = level_shift(image).collect();
    if cod.mct {
        forward_rct(&mut planes);
    }
    for plane in planes.iter_mut() {
        forward_2d::<Dwt53>(plane, width as usize, width, height, cod.decomposition_levels);
    }

    // Only the exponent is signalled: precision plus band gain.
    let precision = image.comps[0].prec;
    let step_sizes = subbands(width, height, cod.decomposition_levels)
        .iter()
        .map(|band| ((precision + subband_gain(band.orientation)) << 3) as u16)
        .collect();
    Coefficients {
        planes,
        qcd: Quantization {
            quant_style: QUANT_STYLE_NONE,
            guard_bits: GUARD_BITS,
            step_sizes,
        },
    }
}

fn irreversible_coefficients(image: &EngineImage, cod: &CodingStyle, rate: f32) -> Coefficients {
    let (width, height) = (image.width(), image.height());
    let stride = width as usize;
    let mut planes: Vec<Vec<f32>> = level_shift(image)
        .map(|plane| plane.into_iter().map(|s| s as f32).collect())
        .collect();
    if cod.mct {
        forward_ict(&mut planes);
    }
    for plane in planes.iter_mut() {
        forward_2d::<Dwt97>(plane, stride, width, height, cod.decomposition_levels);
    }

    let precision = image.comps[0].prec;
    let bands = subbands(width, height, cod.decomposition_levels);
    let steps: Vec<StepSize> = bands
        .iter()
        .map(|band| {
            StepSize::from_delta(
                subband_delta(band, rate),
                precision + subband_gain(band.orientation),
            )
        })
        .collect();

    let mut quantized = vec![vec![0i32; stride * height as usize]; planes.len()];
    for (plane, out) in planes.iter().zip(quantized.iter_mut()) {
        for (band, step) in bands.iter().zip(&steps) {
            // Quantize with the step the decoder will reconstruct from QCD.
            let delta = step.delta(precision + subband_gain(band.orientation));
            for y in band.y0..band.y0 + band.height {
                for x in band.x0..band.x0 + band.width {
                    out[y * stride + x] = quantize_scalar(plane[y * stride + x], delta);
                }
            }
        }
    }

    Coefficients {
        planes: quantized,
        qcd: Quantization {
            quant_style: QUANT_STYLE_SCALAR_EXPOUNDED,
            guard_bits: GUARD_BITS,
            step_sizes: steps.iter().map(|step| step.to_u16()).collect(),
        },
    }
}

/// Writes the whole codestream and returns its length.
fn encode_image(
    params: &EncodeParameters,
    image: &EngineImage,
    stream: &mut dyn ByteStream,
) -> Result<usize, J2cError> {
    let (width, height) = (image.width(), image.height());
    let levels = params.decomposition_levels;

    let cod = CodingStyle {
        number_of_layers: params.rates.len() as u16,
        mct: params.mct && image.numcomps() >= 3,
        decomposition_levels: levels,
        transformation: if params.irreversible {
            TRANSFORM_IRREVERSIBLE_9_7
        } else {
            TRANSFORM_REVERSIBLE_5_3
        },
        ..CodingStyle::default()
    };

    let coefficients = if params.irreversible {
        // The last layer is the finest; zero means lossless, the smallest ratio.
        let rate = params.rates.last().copied().unwrap_or(0.0).max(1.0);
        irreversible_coefficients(image, &cod, rate)
    } else {
        reversible_coefficients(image, &cod)
    };

    let size = ImageSize {
        x0: image.x0,
        y0: image.y0,
        x1: image.x1,
        y1: image.y1,
        tile_width: width,
        tile_height: height,
        tile_x0: image.x0,
        tile_y0: image.y0,
        components: image
            .comps
            .iter()
            .map(|comp| ComponentSize {
                precision: comp.prec as u8,
                is_signed: comp.sgnd,
                dx: comp.dx as u8,
                dy: comp.dy as u8,
            })
            .collect(),
    };

    let mut writer = J2cWriter::new(stream);
    writer.write_soc()?;
    writer.write_siz(&size)?;
    writer.write_cod(&cod)?;
    writer.write_qcd(&coefficients.qcd)?;
    if !params.comment.is_empty() {
        writer.write_com(&params.comment)?;
    }

    let sot = writer.write_sot(0, 0, 0, 1)?;
    writer.write_sod()?;
    let bands = subbands(width, height, levels);
    for resolution in 0..=levels {
        let body = write_packet(&coefficients.planes, width as usize, &bands, resolution);
        let len = u32::try_from(body.len()).map_err(|_| J2cError::ImageTooLarge)?;
        writer.write_u32(len)?;
        writer.write_bytes(&body)?;
    }
    writer.patch_psot(sot)?;
    writer.write_eoc()?;
    writer.flush()?;
    Ok(writer.len())
}
