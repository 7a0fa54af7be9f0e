// Encode clamps the raster's channel count to this many components.
pub const MAX_COMPONENTS: usize = 5;

// Every encoded sample is an unsigned 8-bit value.
pub const SAMPLE_PRECISION: u32 = 8;

// Scales the lossy layer rates; larger values mean smaller codestreams.
pub const DEFAULT_COMPRESS_RATIO: f32 = 1.5;

// Relative compression rates of the five lossy quality layers, coarsest first.
pub const LOSSY_LAYER_RATES: [f32; 5] = [1920.0, 480.0, 120.0, 30.0, 10.0];

// Number of wavelet decomposition levels written by default (six resolutions).
pub const DEFAULT_DECOMPOSITION_LEVELS: u8 = 5;

pub const MAX_DECOMPOSITION_LEVELS: u8 = 32;

// Size of the chunks the engine pulls from and pushes to the byte stream.
pub const STREAM_CHUNK_SIZE: usize = 0x1000;

// Upper bound on width * height * components accepted from a header, checked
// before any sample buffer is allocated.
pub const MAX_IMAGE_SAMPLES: u64 = 1 << 28;

// The size in bytes of the segment length field.
pub const SEGMENT_LENGTH_SIZE: usize = 2;

// The maximum size of the data bytes that fit in a segment.
pub const SEGMENT_MAX_DATA_SIZE: usize = u16::MAX as usize - SEGMENT_LENGTH_SIZE;
