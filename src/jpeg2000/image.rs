//! Codestream parameter records and subband layout.

use crate::geometry::ceil_div_pow2;

/// Wavelet transform selected in COD.
pub const TRANSFORM_IRREVERSIBLE_9_7: u8 = 0;
pub const TRANSFORM_REVERSIBLE_5_3: u8 = 1;

/// Progression order written to COD: resolution-major.
pub const PROGRESSION_RLCP: u8 = 1;

/// QCD styles used by the engine.
pub const QUANT_STYLE_NONE: u8 = 0;
pub const QUANT_STYLE_SCALAR_EXPOUNDED: u8 = 2;

/// Coding Style Default (COD) marker information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodingStyle {
    pub coding_style: u8,
    pub progression_order: u8,
    pub number_of_layers: u16,
    pub mct: bool,
    pub decomposition_levels: u8,
    pub codeblock_width_exp: u8,
    pub codeblock_height_exp: u8,
    pub codeblock_style: u8,
    pub transformation: u8,
}

impl Default for CodingStyle {
    fn default() -> Self {
        Self {
            coding_style: 0,
            progression_order: PROGRESSION_RLCP,
            number_of_layers: 1,
            mct: false,
            decomposition_levels: 0,
            codeblock_width_exp: 4,
            codeblock_height_exp: 4,
            codeblock_style: 0,
            transformation: TRANSFORM_REVERSIBLE_5_3,
        }
    }
}

impl CodingStyle {
    pub fn is_reversible(&self) -> bool {
        self.transformation == TRANSFORM_REVERSIBLE_5_3
    }
}

/// Quantization Default (QCD) marker information. One step per subband in
/// [`subbands`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Quantization {
    pub quant_style: u8,
    pub guard_bits: u8,
    pub step_sizes: Vec<u16>,
}

/// Image and tile size (SIZ) marker information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSize {
    pub x1: u32,
    pub y1: u32,
    pub x0: u32,
    pub y0: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tile_x0: u32,
    pub tile_y0: u32,
    pub components: Vec<ComponentSize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentSize {
    pub precision: u8,
    pub is_signed: bool,
    pub dx: u8,
    pub dy: u8,
}

impl ImageSize {
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubbandOrientation {
    LL,
    HL,
    LH,
    HH,
}

/// A subband rectangle inside a Mallat-ordered coefficient plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subband {
    pub orientation: SubbandOrientation,
    /// Decomposition level, 1 is the finest.
    pub level: u8,
    /// Resolution the band belongs to, 0 is the coarsest.
    pub resolution: u8,
    pub x0: usize,
    pub y0: usize,
    pub width: usize,
    pub height: usize,
}

/// Subbands of a `width` x `height` plane after `levels` decompositions:
/// the coarsest LL first, then HL, LH, HH from the coarsest level down.
pub fn subbands(width: u32, height: u32, levels: u8) -> Vec<Subband> {
    let size = |level: u8| {
        (
            ceil_div_pow2(width, level as u32) as usize,
            ceil_div_pow2(height, level as u32) as usize,
        )
    };

    let mut bands = Vec::with_capacity(1 + 3 * levels as usize);
    let (ll_w, ll_h) = size(levels);
    bands.push(Subband {
        orientation: SubbandOrientation::LL,
        level: levels,
        resolution: 0,
        x0: 0,
        y0: 0,
        width: ll_w,
        height: ll_h,
    });

    for level in (1..=levels).rev() {
        let (pw, ph) = size(level - 1);
        let (lw, lh) = size(level);
        let resolution = levels - level + 1;
        let band = |orientation, x0, y0, width, height| Subband {
            orientation,
            level,
            resolution,
            x0,
            y0,
            width,
            height,
        };
        bands.push(band(SubbandOrientation::HL, lw, 0, pw - lw, lh));
        bands.push(band(SubbandOrientation::LH, 0, lh, lw, ph - lh));
        bands.push(band(SubbandOrientation::HH, lw, lh, pw - lw, ph - lh));
    }
    bands
}
