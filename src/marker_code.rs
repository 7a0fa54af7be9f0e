use num_enum::{IntoPrimitive, TryFromPrimitive};

/// JPEG 2000 codestream markers (ISO/IEC 15444-1, Annex A). Each marker is
/// written as `0xFF` followed by this code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum J2cMarkerCode {
    /// SOC: Start of codestream.
    StartOfCodestream = 0x4F,

    /// CAP: Extended capabilities.
    Capability = 0x50,

    /// SIZ: Image and tile size.
    ImageAndTileSize = 0x51,

    /// COD: Coding style default.
    CodingStyleDefault = 0x52,

    /// COC: Coding style component.
    CodingStyleComponent = 0x53,

    /// TLM: Tile-part lengths.
    TilePartLengths = 0x55,

    /// PLM: Packet length, main header.
    PacketLengthMain = 0x57,

    /// QCD: Quantization default.
    QuantizationDefault = 0x5C,

    /// QCC: Quantization component.
    QuantizationComponent = 0x5D,

    /// RGN: Region of interest.
    RegionOfInterest = 0x5E,

    /// POC: Progression order change.
    ProgressionOrderChange = 0x5F,

    /// CRG: Component registration.
    ComponentRegistration = 0x63,

    /// COM: Comment.
    Comment = 0x64,

    /// SOT: Start of tile-part.
    StartOfTile = 0x90,

    /// SOD: Start of data.
    StartOfData = 0x93,

    /// EOC: End of codestream.
    EndOfCodestream = 0xD9,
}

pub const J2C_MARKER_START_BYTE: u8 = 0xFF;

// Rcom value for a Latin-1 text comment.
pub const COMMENT_REGISTRATION_LATIN: u16 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_from_byte() {
        assert_eq!(
            J2cMarkerCode::try_from(0x4F).ok(),
            Some(J2cMarkerCode::StartOfCodestream)
        );
        assert_eq!(J2cMarkerCode::try_from(0x93).ok(), Some(J2cMarkerCode::StartOfData));
        assert!(J2cMarkerCode::try_from(0xD8).is_err());
        assert_eq!(u8::from(J2cMarkerCode::EndOfCodestream), 0xD9);
    }
}
