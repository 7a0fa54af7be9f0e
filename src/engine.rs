//! Codec engine capability.
//!
//! The wavelet/entropy engine is opaque to the adapter. It is reached through
//! handle traits that mirror a streaming codec library: create a handle,
//! install message handlers, configure it, then read a header, decode or
//! encode while pulling/pushing bytes through a [`ByteStream`]. Every failure
//! is reported through the return value; handles release their resources on
//! drop.

use crate::constants::{DEFAULT_DECOMPOSITION_LEVELS, SAMPLE_PRECISION};
use crate::stream::ByteStream;
use tracing::{info, warn};

pub type MessageHandler = Box<dyn FnMut(&str)>;

/// Receivers for engine info, warning and error messages.
///
/// Messages are observational: handlers never influence control flow.
#[derive(Default)]
pub struct EventManager {
    info_handler: Option<MessageHandler>,
    warning_handler: Option<MessageHandler>,
    error_handler: Option<MessageHandler>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes every message to `tracing`.
    pub fn tracing() -> Self {
        let mut events = Self::new();
        events.set_info_handler(Box::new(|msg| info!("J2C engine: {}", chomp(msg))));
        events.set_warning_handler(Box::new(|msg| warn!("J2C engine: {}", chomp(msg))));
        events.set_error_handler(Box::new(|msg| warn!("J2C engine: {}", chomp(msg))));
        events
    }

    pub fn set_info_handler(&mut self, handler: MessageHandler) {
        self.info_handler = Some(handler);
    }

    pub fn set_warning_handler(&mut self, handler: MessageHandler) {
        self.warning_handler = Some(handler);
    }

    pub fn set_error_handler(&mut self, handler: MessageHandler) {
        self.error_handler = Some(handler);
    }

    pub fn info(&mut self, msg: &str) {
        if let Some(handler) = self.info_handler.as_mut() {
            handler(msg);
        }
    }

    pub fn warning(&mut self, msg: &str) {
        if let Some(handler) = self.warning_handler.as_mut() {
            handler(msg);
        }
    }

    pub fn error(&mut self, msg: &str) {
        if let Some(handler) = self.error_handler.as_mut() {
            handler(msg);
        }
    }
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("info", &self.info_handler.is_some())
            .field("warning", &self.warning_handler.is_some())
            .field("error", &self.error_handler.is_some())
            .finish()
    }
}

/// Drops one trailing newline from an engine message.
pub fn chomp(msg: &str) -> &str {
    msg.strip_suffix('\n').unwrap_or(msg)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpace {
    #[default]
    Unspecified,
    Srgb,
    Gray,
    Sycc,
}

/// Shape of one component when creating an image for encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentParameters {
    pub dx: u32,
    pub dy: u32,
    pub w: u32,
    pub h: u32,
    pub x0: u32,
    pub y0: u32,
    pub prec: u32,
    pub sgnd: bool,
}

impl ComponentParameters {
    /// An unsigned 8-bit, unsubsampled component.
    pub fn unsigned_8bit(width: u32, height: u32) -> Self {
        Self {
            dx: 1,
            dy: 1,
            w: width,
            h: height,
            x0: 0,
            y0: 0,
            prec: SAMPLE_PRECISION,
            sgnd: false,
        }
    }
}

/// One planar sample buffer as produced or consumed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageComponent {
    pub dx: u32,
    pub dy: u32,
    /// Row stride and width of `data`.
    pub w: u32,
    pub h: u32,
    pub x0: u32,
    pub y0: u32,
    pub prec: u32,
    pub sgnd: bool,
    /// Resolution reduction the engine applied to this component.
    pub factor: u32,
    /// Samples, row-major. `None` when only the header was read.
    pub data: Option<Vec<i32>>,
}

impl ImageComponent {
    pub fn from_parameters(params: &ComponentParameters) -> Self {
        Self {
            dx: params.dx,
            dy: params.dy,
            w: params.w,
            h: params.h,
            x0: params.x0,
            y0: params.y0,
            prec: params.prec,
            sgnd: params.sgnd,
            factor: 0,
            data: Some(vec![0; params.w as usize * params.h as usize]),
        }
    }
}

/// Image descriptor: canvas extent plus one entry per component.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineImage {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
    pub color_space: ColorSpace,
    pub comps: Vec<ImageComponent>,
}

impl EngineImage {
    /// Allocates zeroed component buffers for the given shapes.
    pub fn new(params: &[ComponentParameters], color_space: ColorSpace) -> Self {
        let comps: Vec<ImageComponent> =
            params.iter().map(ImageComponent::from_parameters).collect();
        let (x1, y1) = params.first().map_or((0, 0), |p| (p.x0 + p.w, p.y0 + p.h));
        Self {
            x0: 0,
            y0: 0,
            x1,
            y1,
            color_space,
            comps,
        }
    }

    pub fn numcomps(&self) -> usize {
        self.comps.len()
    }

    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }
}

/// Tiling reported alongside the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileGeometry {
    pub tile_x0: u32,
    pub tile_y0: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeParameters {
    /// Number of highest resolution levels to discard.
    pub reduce: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParameters {
    /// Use the 9/7 wavelet with quantization instead of the lossless 5/3.
    pub irreversible: bool,
    /// Compression rate per quality layer; `0.0` means lossless. The layer
    /// count is `rates.len()`.
    pub rates: Vec<f32>,
    /// Multiple component (color decorrelation) transform on components 0..3.
    pub mct: bool,
    pub comment: String,
    pub decomposition_levels: u8,
}

impl Default for EncodeParameters {
    fn default() -> Self {
        Self {
            irreversible: false,
            rates: vec![0.0],
            mct: false,
            comment: String::new(),
            decomposition_levels: DEFAULT_DECOMPOSITION_LEVELS,
        }
    }
}

/// Parameters for one engine session. The variant fixes the session's mode.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecParameters {
    Decode(DecodeParameters),
    Encode(EncodeParameters),
}

/// Decompressor handle.
pub trait Decompress {
    fn set_event_manager(&mut self, events: EventManager);

    fn setup(&mut self, params: &DecodeParameters) -> bool;

    /// Reads the main header only. Component descriptors carry no data.
    fn read_header(&mut self, stream: &mut dyn ByteStream) -> Option<(EngineImage, TileGeometry)>;

    /// Decodes the image following a successful `read_header`.
    fn decode(&mut self, stream: &mut dyn ByteStream) -> Option<EngineImage>;
}

/// Compressor handle.
pub trait Compress {
    fn set_event_manager(&mut self, events: EventManager);

    fn setup(&mut self, params: &EncodeParameters, image: &EngineImage) -> bool;

    fn encode(&mut self, image: &EngineImage, stream: &mut dyn ByteStream) -> bool;
}

/// Factory for engine handles.
pub trait CodecEngine {
    fn create_decompress(&self) -> Option<Box<dyn Decompress>>;

    fn create_compress(&self) -> Option<Box<dyn Compress>>;

    fn version(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_chomp_strips_one_newline() {
        assert_eq!(chomp("tile decoded\n"), "tile decoded");
        assert_eq!(chomp("no newline"), "no newline");
        assert_eq!(chomp("two\n\n"), "two\n");
        assert_eq!(chomp(""), "");
    }

    #[test]
    fn test_event_manager_dispatches_by_severity() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut events = EventManager::new();
        let sink = Rc::clone(&seen);
        events.set_warning_handler(Box::new(move |msg| sink.borrow_mut().push(msg.to_string())));

        events.info("ignored");
        events.warning("kept");
        events.error("ignored too");
        assert_eq!(*seen.borrow(), vec!["kept".to_string()]);
    }

    #[test]
    fn test_image_new_allocates_components() {
        let params = [ComponentParameters::unsigned_8bit(4, 3); 2];
        let image = EngineImage::new(&params, ColorSpace::Srgb);
        assert_eq!(image.numcomps(), 2);
        assert_eq!((image.width(), image.height()), (4, 3));
        assert_eq!(image.comps[1].data.as_ref().map(Vec::len), Some(12));
    }
}
