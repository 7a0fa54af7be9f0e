//! Maps codestream geometry to output raster geometry under a discard level.

use crate::engine::EngineImage;
use crate::error::SoftFailure;

/// Ceiling division of `value` by `2^factor`.
pub fn ceil_div_pow2(value: u32, factor: u32) -> u32 {
    if factor >= u64::BITS - 1 {
        return u32::from(value > 0);
    }
    ((value as u64 + (1u64 << factor) - 1) >> factor) as u32
}

/// Output raster layout for one decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputGeometry {
    pub width: u32,
    pub height: u32,
    /// First component copied; lands in raster channel 0.
    pub first_channel: usize,
    pub channels: usize,
    /// Row stride of the component buffers.
    pub component_width: u32,
}

/// Validates a decoded image against the requested discard level and
/// derives the output raster geometry.
pub fn resolve(
    image: &EngineImage,
    discard_level: u32,
    first_channel: usize,
    max_channel_count: usize,
) -> Result<OutputGeometry, SoftFailure> {
    let components = image.numcomps();
    if components == 0 {
        return Err(SoftFailure::NoComponents);
    }

    for (component, comp) in image.comps.iter().enumerate() {
        if comp.factor != discard_level {
            return Err(SoftFailure::DiscardLevelMismatch {
                component,
                factor: comp.factor,
                expected: discard_level,
            });
        }
    }

    if first_channel >= components {
        return Err(SoftFailure::FirstChannelOutOfRange {
            first_channel,
            components,
        });
    }
    let channels = (components - first_channel).min(max_channel_count);

    // All components share the first one's stride and factor.
    let factor = image.comps[0].factor;
    let width = ceil_div_pow2(image.width(), factor);
    let height = ceil_div_pow2(image.height(), factor);
    if width == 0 || height == 0 || channels == 0 {
        return Err(SoftFailure::InvalidDimensions { width, height });
    }

    Ok(OutputGeometry {
        width,
        height,
        first_channel,
        channels,
        component_width: image.comps[0].w,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ColorSpace, ComponentParameters};

    fn image(width: u32, height: u32, components: usize, factor: u32) -> EngineImage {
        let params = vec![ComponentParameters::unsigned_8bit(width, height); components];
        let mut image = EngineImage::new(&params, ColorSpace::Srgb);
        for comp in &mut image.comps {
            comp.factor = factor;
        }
        image
    }

    #[test]
    fn test_ceil_div_pow2_values() {
        assert_eq!(ceil_div_pow2(0, 3), 0);
        assert_eq!(ceil_div_pow2(7, 0), 7);
        assert_eq!(ceil_div_pow2(7, 1), 4);
        assert_eq!(ceil_div_pow2(8, 1), 4);
        assert_eq!(ceil_div_pow2(9, 3), 2);
        assert_eq!(ceil_div_pow2(u32::MAX, 1), 1 << 31);
        assert_eq!(ceil_div_pow2(5, 40), 1);
        assert_eq!(ceil_div_pow2(5, 200), 1);
    }

    #[test]
    fn test_resolve_full_resolution() {
        let geometry = resolve(&image(10, 6, 4, 0), 0, 0, 3).unwrap();
        assert_eq!((geometry.width, geometry.height), (10, 6));
        assert_eq!(geometry.channels, 3);
        assert_eq!(geometry.component_width, 10);
    }

    #[test]
    fn test_resolve_reduced_uses_canvas_extent() {
        let mut img = image(5, 3, 1, 2);
        img.x0 = 2;
        img.x1 = 13;
        img.y1 = 9;
        let geometry = resolve(&img, 2, 0, 1).unwrap();
        assert_eq!((geometry.width, geometry.height), (3, 3));
    }

    #[test]
    fn test_resolve_channel_subset() {
        let geometry = resolve(&image(4, 4, 4, 0), 0, 3, 4).unwrap();
        assert_eq!(geometry.first_channel, 3);
        assert_eq!(geometry.channels, 1);
    }

    #[test]
    fn test_resolve_soft_failures() {
        assert_eq!(
            resolve(&EngineImage::default(), 0, 0, 4),
            Err(SoftFailure::NoComponents)
        );
        assert_eq!(
            resolve(&image(4, 4, 3, 1), 0, 0, 3),
            Err(SoftFailure::DiscardLevelMismatch {
                component: 0,
                factor: 1,
                expected: 0
            })
        );
        assert_eq!(
            resolve(&image(4, 4, 3, 0), 0, 3, 3),
            Err(SoftFailure::FirstChannelOutOfRange {
                first_channel: 3,
                components: 3
            })
        );
        assert_eq!(
            resolve(&image(0, 4, 1, 0), 0, 0, 1),
            Err(SoftFailure::InvalidDimensions {
                width: 0,
                height: 4
            })
        );
    }
}
