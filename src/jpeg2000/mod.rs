//! Built-in JPEG 2000 engine (Part 1 codestream syntax, ISO/IEC 15444-1)
//!
//! The engine writes and reads raw J2K codestreams with the standard marker
//! framing and a simplified tile body. It is divided into several
//! sub-modules:
//!
//! - `io`: Chunked big-endian reading and writing over a [`ByteStream`](crate::stream::ByteStream).
//! - `parser` / `writer`: Handling of the Codestream syntax (Markers, Headers).
//! - `packet`: Per-resolution coefficient packets.
//! - `image`: Header records and the subband layout.
//! - `dwt`: Discrete Wavelet Transform (5-3 and 9-7).
//! - `mct`: Multiple component transforms (RCT and ICT).
//! - `quantization`: Scalar quantization.
//! - `encoder` / `decoder`: The compress and decompress handles.

pub mod decoder;
pub mod dwt;
pub mod encoder;
pub mod image;
pub mod io;
pub mod mct;
pub mod packet;
pub mod parser;
pub mod quantization;
pub mod writer;

use crate::engine::{CodecEngine, Compress, Decompress};
pub use decoder::LiftingDecompressor;
pub use encoder::LiftingCompressor;

/// Engine backed by the lifting wavelet codec in this module.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiftingEngine;

impl LiftingEngine {
    pub fn new() -> Self {
        Self
    }
}

impl CodecEngine for LiftingEngine {
    fn create_decompress(&self) -> Option<Box<dyn Decompress>> {
        Some(Box::new(LiftingDecompressor::new()))
    }

    fn create_compress(&self) -> Option<Box<dyn Compress>> {
        Some(Box::new(LiftingCompressor::new()))
    }

    fn version(&self) -> String {
        format!("J2C lifting engine {}", env!("CARGO_PKG_VERSION"))
    }
}
