//! Adapter between JPEG 2000 codestreams and 8-bit interleaved rasters.
//!
//! [`J2cCodec`] decodes a codestream (optionally at a reduced resolution and
//! over a subset of its components) into a bottom-up interleaved [`Raster`],
//! encodes a raster into a codestream, and reads codestream metadata. The
//! wavelet work is done by a [`CodecEngine`]; [`jpeg2000::LiftingEngine`] is
//! the built-in one.

pub mod adapter;
pub mod codestream;
pub mod constants;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod jpeg2000;
pub mod marker_code;
pub mod marshal;
pub mod raster;
pub mod session;
pub mod stream;

pub use adapter::{CodecOptions, DecodeStatus, J2cCodec};
pub use codestream::Codestream;
pub use engine::{
    CodecEngine, CodecParameters, Compress, Decompress, DecodeParameters, EncodeParameters,
    EngineImage, EventManager, ImageComponent,
};
pub use error::{J2cError, SoftFailure};
pub use geometry::ceil_div_pow2;
pub use raster::Raster;
pub use stream::{ByteStream, StreamBridge};
