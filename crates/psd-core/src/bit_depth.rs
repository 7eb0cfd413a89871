//! Bit depth information for image planes

/// Number of bits used to store a single channel sample.
///
/// Photoshop documents declare 1, 8, 16 or 32 bits per channel in
/// their header. One-bit documents can be walked at the container
/// level but expose no whole-byte samples, so the pixel oriented
/// routines reject them early.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum BitDepth {
    /// One bit per sample, bitmap color mode only.
    One,
    /// Eight bits per sample, the common case.
    Eight,
    /// Sixteen bits per sample, stored big endian on disk.
    Sixteen,
    /// Thirty two bits per sample, an IEEE-754 float stored big
    /// endian on disk.
    ThirtyTwo
}

impl BitDepth {
    /// Map the header's bits-per-channel field to a depth.
    pub const fn from_bit_count(bits: u16) -> Option<BitDepth> {
        match bits {
            1 => Some(BitDepth::One),
            8 => Some(BitDepth::Eight),
            16 => Some(BitDepth::Sixteen),
            32 => Some(BitDepth::ThirtyTwo),
            _ => None
        }
    }

    /// Number of bits written to the header for this depth.
    pub const fn bit_count(self) -> u16 {
        match self {
            BitDepth::One => 1,
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
            BitDepth::ThirtyTwo => 32
        }
    }

    /// Bytes needed to store one sample at this depth.
    ///
    /// # Panics
    /// For [`BitDepth::One`], which has no whole-byte sample size.
    /// Callers working on sample planes are expected to have rejected
    /// one-bit documents beforehand.
    pub const fn size_of(self) -> usize {
        match self {
            BitDepth::One => panic!("one bit samples have no whole-byte size"),
            BitDepth::Eight => 1,
            BitDepth::Sixteen => 2,
            BitDepth::ThirtyTwo => 4
        }
    }

    /// True for the depths the pixel oriented interfaces accept.
    pub const fn has_whole_byte_samples(self) -> bool {
        !matches!(self, BitDepth::One)
    }
}
