use thiserror::Error;

/// Hard failures reported by the adapter entry points and the built-in engine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum J2cError {
    #[error("Codestream buffer is empty")]
    EmptyCodestream = 1,
    #[error("Raster buffer is empty")]
    EmptyRaster = 2,
    #[error("Raster dimensions do not match its buffer")]
    InvalidRaster = 3,
    #[error("Codec engine could not create a handle")]
    EngineUnavailable = 4,
    #[error("Codec engine rejected the parameters")]
    EngineSetupFailed = 5,
    #[error("Codestream header could not be read")]
    HeaderUnreadable = 6,
    #[error("Codec engine failed to encode the image")]
    EncodeFailed = 7,

    // Engine internals
    #[error("Invalid data")]
    InvalidData = 100,
    #[error("Need more data")]
    NeedMoreData = 101,
    #[error("Unsupported feature")]
    UnsupportedFeature = 102,
    #[error("Image exceeds the sample limit")]
    ImageTooLarge = 103,
    #[error("Invalid marker segment size")]
    InvalidMarkerSegmentSize = 104,
    #[error("Unexpected marker")]
    UnexpectedMarker = 105,
}

/// Reasons a decode was discarded while still reporting success.
///
/// Decode reports these as `DecodeStatus::Discarded`, never as an error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftFailure {
    #[error("engine failed to decode the codestream")]
    DecodeFailed,
    #[error("image has no components")]
    NoComponents,
    #[error("invalid output dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("component {component} decoded at factor {factor}, expected {expected}")]
    DiscardLevelMismatch {
        component: usize,
        factor: u32,
        expected: u32,
    },
    #[error("first channel {first_channel} out of range for {components} components")]
    FirstChannelOutOfRange {
        first_channel: usize,
        components: usize,
    },
    #[error("component {0} has no sample data")]
    MissingComponentData(usize),
    #[error("component {0} buffer is smaller than the output area")]
    ComponentTooSmall(usize),
}

pub type Result<T> = std::result::Result<T, J2cError>;
