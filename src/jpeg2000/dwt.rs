//! Discrete Wavelet Transforms for JPEG 2000
//!
//! Both filters are implemented by lifting on an interleaved line, with
//! whole-sample symmetric extension at the edges, and then split into the
//! low-pass half (first `ceil(n/2)` entries) and high-pass half. The 2D
//! transforms work in place on a plane with an explicit row stride and leave
//! the subbands in Mallat order (see [`super::image::subbands`]).

use crate::geometry::ceil_div_pow2;

/// A 1D wavelet filter usable by [`forward_2d`] and [`inverse_2d`].
pub trait Wavelet {
    type Sample: Copy + Default;

    /// Spatial line to deinterleaved low/high coefficients.
    fn forward(line: &mut [Self::Sample], scratch: &mut Vec<Self::Sample>);

    /// Deinterleaved low/high coefficients back to the spatial line.
    fn inverse(line: &mut [Self::Sample], scratch: &mut Vec<Self::Sample>);
}

/// Reversible integer 5/3 filter.
pub struct Dwt53;

/// Irreversible 9/7 filter.
pub struct Dwt97;

impl Wavelet for Dwt53 {
    type Sample = i32;

    fn forward(x: &mut [i32], scratch: &mut Vec<i32>) {
        let n = x.len();
        if n < 2 {
            return;
        }
        // Prediction: y[2k+1] = x[2k+1] - floor((x[2k] + x[2k+2]) / 2)
        for i in (1..n).step_by(2) {
            let right = if i + 1 < n { x[i + 1] } else { x[i - 1] };
            x[i] -= (x[i - 1] + right) >> 1;
        }
        // Update: y[2k] = x[2k] + floor((y[2k-1] + y[2k+1] + 2) / 4)
        for i in (0..n).step_by(2) {
            let left = if i > 0 { x[i - 1] } else { x[1] };
            let right = if i + 1 < n { x[i + 1] } else { x[i - 1] };
            x[i] += (left + right + 2) >> 2;
        }
        deinterleave(x, scratch);
    }

    fn inverse(x: &mut [i32], scratch: &mut Vec<i32>) {
        let n = x.len();
        if n < 2 {
            return;
        }
        interleave(x, scratch);
        // Sums wrap on out-of-range coefficients.
        for i in (0..n).step_by(2) {
            let left = if i > 0 { x[i - 1] } else { x[1] };
            let right = if i + 1 < n { x[i + 1] } else { x[i - 1] };
            x[i] = x[i].wrapping_sub(left.wrapping_add(right).wrapping_add(2) >> 2);
        }
        for i in (1..n).step_by(2) {
            let right = if i + 1 < n { x[i + 1] } else { x[i - 1] };
            x[i] = x[i].wrapping_add(x[i - 1].wrapping_add(right) >> 1);
        }
    }
}

// CDF 9/7 lifting coefficients (ISO/IEC 15444-1, Table F.4).
const ALPHA: f32 = -1.586_134_3;
const BETA: f32 = -0.052_980_118;
const GAMMA: f32 = 0.882_911_1;
const DELTA: f32 = 0.443_506_87;
const K: f32 = 1.230_174_1;

fn lift(x: &mut [f32], parity: usize, coefficient: f32) {
    let n = x.len();
    for i in (parity..n).step_by(2) {
        let left = if i > 0 { x[i - 1] } else { x[1] };
        let right = if i + 1 < n { x[i + 1] } else { x[i - 1] };
        x[i] += coefficient * (left + right);
    }
}

impl Wavelet for Dwt97 {
    type Sample = f32;

    fn forward(x: &mut [f32], scratch: &mut Vec<f32>) {
        if x.len() < 2 {
            return;
        }
        lift(x, 1, ALPHA);
        lift(x, 0, BETA);
        lift(x, 1, GAMMA);
        lift(x, 0, DELTA);
        for (i, value) in x.iter_mut().enumerate() {
            *value *= if i % 2 == 0 { 1.0 / K } else { K / 2.0 };
        }
        deinterleave(x, scratch);
    }

    fn inverse(x: &mut [f32], scratch: &mut Vec<f32>) {
        if x.len() < 2 {
            return;
        }
        interleave(x, scratch);
        for (i, value) in x.iter_mut().enumerate() {
            *value *= if i % 2 == 0 { K } else { 2.0 / K };
        }
        lift(x, 0, -DELTA);
        lift(x, 1, -GAMMA);
        lift(x, 0, -BETA);
        lift(x, 1, -ALPHA);
    }
}

/// Even samples to the front, odd samples to the back.
fn deinterleave<T: Copy>(x: &mut [T], scratch: &mut Vec<T>) {
    scratch.clear();
    scratch.extend(x.iter().step_by(2));
    scratch.extend(x.iter().skip(1).step_by(2));
    x.copy_from_slice(scratch);
}

fn interleave<T: Copy>(x: &mut [T], scratch: &mut Vec<T>) {
    let low = x.len().div_ceil(2);
    scratch.clear();
    scratch.extend_from_slice(x);
    for (i, &value) in scratch[..low].iter().enumerate() {
        x[2 * i] = value;
    }
    for (i, &value) in scratch[low..].iter().enumerate() {
        x[2 * i + 1] = value;
    }
}

fn transform_rows<W: Wavelet>(
    data: &mut [W::Sample],
    stride: usize,
    width: usize,
    height: usize,
    step: fn(&mut [W::Sample], &mut Vec<W::Sample>),
    scratch: &mut Vec<W::Sample>,
) {
    for y in 0..height {
        step(&mut data[y * stride..y * stride + width], scratch);
    }
}

fn transform_columns<W: Wavelet>(
    data: &mut [W::Sample],
    stride: usize,
    width: usize,
    height: usize,
    step: fn(&mut [W::Sample], &mut Vec<W::Sample>),
    scratch: &mut Vec<W::Sample>,
) {
    let mut column = vec![W::Sample::default(); height];
    for x in 0..width {
        for (y, value) in column.iter_mut().enumerate() {
            *value = data[y * stride + x];
        }
        step(&mut column, scratch);
        for (y, &value) in column.iter().enumerate() {
            data[y * stride + x] = value;
        }
    }
}

/// Forward transform of the `width` x `height` plane, `levels` times.
pub fn forward_2d<W: Wavelet>(
    data: &mut [W::Sample],
    stride: usize,
    width: u32,
    height: u32,
    levels: u8,
) {
    let mut scratch = Vec::new();
    for level in 0..levels {
        let w = ceil_div_pow2(width, level as u32) as usize;
        let h = ceil_div_pow2(height, level as u32) as usize;
        transform_rows::<W>(data, stride, w, h, W::forward, &mut scratch);
        transform_columns::<W>(data, stride, w, h, W::forward, &mut scratch);
    }
}

/// Inverse transform down to decomposition level `reduce`. With `reduce > 0`
/// the top-left `ceil(width / 2^reduce)` x `ceil(height / 2^reduce)` corner
/// holds the reduced-resolution image.
pub fn inverse_2d<W: Wavelet>(
    data: &mut [W::Sample],
    stride: usize,
    width: u32,
    height: u32,
    levels: u8,
    reduce: u8,
) {
    let mut scratch = Vec::new();
    for level in (reduce..levels).rev() {
        let w = ceil_div_pow2(width, level as u32) as usize;
        let h = ceil_div_pow2(height, level as u32) as usize;
        transform_columns::<W>(data, stride, w, h, W::inverse, &mut scratch);
        transform_rows::<W>(data, stride, w, h, W::inverse, &mut scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dwt_53_roundtrip() {
        for len in 1..12 {
            let signal: Vec<i32> = (0..len).map(|i| (i * 37 % 255) - 128).collect();
            let mut x = signal.clone();
            let mut scratch = Vec::new();
            Dwt53::forward(&mut x, &mut scratch);
            Dwt53::inverse(&mut x, &mut scratch);
            assert_eq!(x, signal, "length {}", len);
        }
    }

    #[test]
    fn test_dwt_53_inverse_of_extreme_values_wraps() {
        let mut x = vec![i32::MAX, i32::MIN, i32::MAX, i32::MIN, i32::MAX];
        Dwt53::inverse(&mut x, &mut Vec::new());
        assert_eq!(x.len(), 5);
    }

    #[test]
    fn test_dwt_53_constant_signal_has_no_detail() {
        let mut x = vec![50; 8];
        Dwt53::forward(&mut x, &mut Vec::new());
        assert_eq!(&x[..4], &[50, 50, 50, 50]);
        assert_eq!(&x[4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_dwt_97_roundtrip() {
        let signal: Vec<f32> = (0..9).map(|i| (i * 29 % 200) as f32 - 100.0).collect();
        let mut x = signal.clone();
        let mut scratch = Vec::new();
        Dwt97::forward(&mut x, &mut scratch);
        Dwt97::inverse(&mut x, &mut scratch);
        for (a, b) in x.iter().zip(&signal) {
            assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_2d_roundtrip_with_padding_stride() {
        let (width, height, stride) = (7u32, 5u32, 9usize);
        let mut plane = vec![0i32; stride * height as usize];
        for y in 0..height as usize {
            for x in 0..width as usize {
                plane[y * stride + x] = ((x * 13 + y * 7) % 256) as i32 - 128;
            }
        }
        let original = plane.clone();
        forward_2d::<Dwt53>(&mut plane, stride, width, height, 3);
        assert_ne!(plane, original);
        inverse_2d::<Dwt53>(&mut plane, stride, width, height, 3, 0);
        assert_eq!(plane, original);
    }

    #[test]
    fn test_2d_reduce_keeps_constant_level() {
        let (width, height) = (8u32, 6u32);
        let mut plane = vec![40i32; 48];
        forward_2d::<Dwt53>(&mut plane, 8, width, height, 2);
        inverse_2d::<Dwt53>(&mut plane, 8, width, height, 2, 1);
        // Level 1 image is 4x3 in the top-left corner.
        for y in 0..3 {
            assert_eq!(&plane[y * 8..y * 8 + 4], &[40, 40, 40, 40]);
        }
    }
}
