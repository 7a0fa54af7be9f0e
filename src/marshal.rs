//! Conversion between planar engine components and interleaved rasters.
//!
//! Codestream row 0 is the raster's last row, so both directions walk the
//! rows bottom-up.

use crate::engine::ImageComponent;
use crate::error::SoftFailure;
use crate::geometry::OutputGeometry;

/// Checks that every component to be copied has data covering the output.
pub fn check_components(
    comps: &[ImageComponent],
    geometry: &OutputGeometry,
) -> Result<(), SoftFailure> {
    let stride = geometry.component_width as usize;
    let needed = if geometry.height == 0 {
        0
    } else {
        (geometry.height as usize - 1) * stride + geometry.width as usize
    };
    for index in geometry.first_channel..geometry.first_channel + geometry.channels {
        let Some(comp) = comps.get(index) else {
            return Err(SoftFailure::MissingComponentData(index));
        };
        let Some(data) = comp.data.as_ref() else {
            return Err(SoftFailure::MissingComponentData(index));
        };
        if stride < geometry.width as usize || data.len() < needed {
            return Err(SoftFailure::ComponentTooSmall(index));
        }
    }
    Ok(())
}

/// Copies decoded components into an interleaved raster buffer laid out as
/// `geometry` describes. Samples are clamped to `0..=255`.
pub fn planar_to_interleaved(
    comps: &[ImageComponent],
    geometry: &OutputGeometry,
    raster: &mut [u8],
) -> Result<(), SoftFailure> {
    check_components(comps, geometry)?;

    let width = geometry.width as usize;
    let height = geometry.height as usize;
    let channels = geometry.channels;
    let stride = geometry.component_width as usize;

    for dest in 0..channels {
        let comp = geometry.first_channel + dest;
        let Some(data) = comps[comp].data.as_deref() else {
            return Err(SoftFailure::MissingComponentData(comp));
        };
        let mut offset = dest;
        for y in (0..height).rev() {
            let row = &data[y * stride..y * stride + width];
            for &sample in row {
                raster[offset] = sample.clamp(0, 255) as u8;
                offset += channels;
            }
        }
    }
    Ok(())
}

/// Fills component buffers from an interleaved raster of `raster_channels`
/// channels. The first `comps.len()` channels are copied.
pub fn interleaved_to_planar(
    raster: &[u8],
    width: u32,
    height: u32,
    raster_channels: usize,
    comps: &mut [ImageComponent],
) {
    let width = width as usize;
    let height = height as usize;
    let channels = comps.len().min(raster_channels);
    let mut planes: Vec<&mut Vec<i32>> = comps
        .iter_mut()
        .take(channels)
        .filter_map(|comp| comp.data.as_mut())
        .collect();

    let mut i = 0;
    for y in (0..height).rev() {
        for x in 0..width {
            let pixel = &raster[(y * width + x) * raster_channels..][..channels];
            for (plane, &sample) in planes.iter_mut().zip(pixel) {
                plane[i] = sample as i32;
            }
            i += 1;
        }
    }
}
