//! Scalar quantization of irreversible subband coefficients.

use super::image::{Subband, SubbandOrientation};

/// Step size as written to QCD: `delta = 2^(R - exponent) * (1 + mantissa / 2^11)`
/// where `R` is the nominal dynamic range of the subband.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSize {
    pub exponent: u8,
    pub mantissa: u16,
}

impl StepSize {
    pub fn from_delta(delta: f32, range_bits: u32) -> Self {
        let log = delta.max(f32::MIN_POSITIVE).log2().floor() as i32;
        let exponent = (range_bits as i32 - log).clamp(0, 31);
        let base = 2f32.powi(range_bits as i32 - exponent);
        let mantissa = ((delta / base - 1.0) * 2048.0).round().clamp(0.0, 2047.0) as u16;
        Self {
            exponent: exponent as u8,
            mantissa,
        }
    }

    pub fn delta(&self, range_bits: u32) -> f32 {
        2f32.powi(range_bits as i32 - self.exponent as i32) * (1.0 + self.mantissa as f32 / 2048.0)
    }

    pub fn to_u16(self) -> u16 {
        ((self.exponent as u16) << 11) | (self.mantissa & 0x7FF)
    }

    pub fn from_u16(value: u16) -> Self {
        Self {
            exponent: (value >> 11) as u8,
            mantissa: value & 0x7FF,
        }
    }
}

/// Nominal dynamic range gain of a subband, in bits.
pub fn subband_gain(orientation: SubbandOrientation) -> u32 {
    match orientation {
        SubbandOrientation::LL => 0,
        SubbandOrientation::HL | SubbandOrientation::LH => 1,
        SubbandOrientation::HH => 2,
    }
}

/// Quantizer step for `band` when the finest quality layer targets `rate`
/// (compression ratio). Coarser levels get finer steps.
pub fn subband_delta(band: &Subband, rate: f32) -> f32 {
    if band.orientation == SubbandOrientation::LL {
        return 0.5;
    }
    let base = (rate / 8.0).max(1.0).sqrt();
    let level_scale = 2f32.powi(band.level as i32 - 1);
    (base / level_scale).max(0.5)
}

pub fn quantize_scalar(coeff: f32, step_size: f32) -> i32 {
    // Dead-zone scalar quantization
    // q = sign(x) * floor(|x| / delta)
    if step_size <= 0.0 {
        return coeff.round() as i32;
    }
    let q = (coeff.abs() / step_size).floor() as i32;
    if coeff < 0.0 { -q } else { q }
}

pub fn dequantize_scalar(q: i32, step_size: f32) -> f32 {
    // x = (|q| + 0.5) * delta * sign(q), 0 stays 0
    if q == 0 {
        return 0.0;
    }
    let magnitude = (q.unsigned_abs() as f32 + 0.5) * step_size;
    if q < 0 { -magnitude } else { magnitude }
}
