/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use core::fmt::{Debug, Formatter};

use psd_core::bytestream::ByteIoError;
use zune_inflate::errors::InflateDecodeErrors;

use crate::constants::PSD_IDENTIFIER_BE;

/// Errors that can occur when decoding a Photoshop document.
pub enum PsdDecodeErrors {
    /// The file does not start with `8BPS`.
    WrongMagicBytes(u32),
    /// The header version field is neither 1 nor 2.
    UnsupportedVersion(u16),
    /// The header declares a bit depth other than 1, 8, 16 or 32, or
    /// an operation was requested on a one bit document.
    UnsupportedBitDepth(u16),
    /// The header declares a color mode outside the documented set.
    UnsupportedColorMode(u16),
    /// A channel count outside `1..=56`.
    UnsupportedChannelCount(u16),
    /// Dimensions above the configured or format limit.
    // supported, found
    LargeDimensions(usize, usize),
    ZeroDimensions,
    /// A compression tag outside `0..=3`, or one that is not legal in
    /// the section it appeared in.
    UnknownCompression(u16),
    /// A run length stream that does not line up with its scanline
    /// count table.
    BadRle(&'static str),
    /// A compressed stream ended before producing the expected number
    /// of bytes.
    Truncated,
    /// The zlib stream of a plane could not be inflated.
    InflateError(InflateDecodeErrors),
    /// A section length prefix disagrees with the file layout.
    // expected, found
    SectionLengthMismatch(u64, u64),
    /// Sub-blocks of a layer record did not line up with the record's
    /// declared extra data length.
    // bound, position
    LayerSectionOverflow(u64, u64),
    Generic(&'static str),
    IoErrors(ByteIoError)
}

impl Debug for PsdDecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            PsdDecodeErrors::Generic(reason) => {
                writeln!(f, "{reason}")
            }
            PsdDecodeErrors::WrongMagicBytes(bytes) => {
                writeln!(
                    f,
                    "Expected {:?} but found {:?}, not a PSD image",
                    PSD_IDENTIFIER_BE.to_be_bytes(),
                    bytes.to_be_bytes()
                )
            }
            PsdDecodeErrors::UnsupportedVersion(version) => {
                writeln!(
                    f,
                    "Unsupported file version {version}, known versions are 1 (PSD) and 2 (PSB)"
                )
            }
            PsdDecodeErrors::UnsupportedBitDepth(depth) => {
                writeln!(
                    f,
                    "Unsupported bit depth {depth}, supported depths are 1, 8, 16 and 32"
                )
            }
            PsdDecodeErrors::UnsupportedColorMode(mode) => {
                writeln!(f, "Unknown color mode {mode}")
            }
            PsdDecodeErrors::UnsupportedChannelCount(channels) => {
                writeln!(f, "Unsupported channel count {channels}, expected 1..=56")
            }
            PsdDecodeErrors::LargeDimensions(supported, found) => {
                writeln!(
                    f,
                    "Too large dimensions, supported {supported} but found {found}"
                )
            }
            PsdDecodeErrors::ZeroDimensions => {
                writeln!(f, "Zero found where not expected")
            }
            PsdDecodeErrors::UnknownCompression(tag) => {
                writeln!(f, "Unknown compression tag {tag}")
            }
            PsdDecodeErrors::BadRle(reason) => {
                writeln!(f, "Bad RLE: {reason}")
            }
            PsdDecodeErrors::Truncated => {
                writeln!(f, "Compressed stream ended prematurely")
            }
            PsdDecodeErrors::InflateError(err) => {
                writeln!(f, "Could not inflate plane: {err:?}")
            }
            PsdDecodeErrors::SectionLengthMismatch(expected, found) => {
                writeln!(
                    f,
                    "Section length mismatch, expected section to end at {expected} but found {found}"
                )
            }
            PsdDecodeErrors::LayerSectionOverflow(bound, position) => {
                writeln!(
                    f,
                    "Layer record overflow, sub-blocks end at {position} but the record is bounded by {bound}"
                )
            }
            PsdDecodeErrors::IoErrors(e) => {
                writeln!(f, "I/O error: {e:?}")
            }
        }
    }
}

impl From<&'static str> for PsdDecodeErrors {
    fn from(r: &'static str) -> Self {
        Self::Generic(r)
    }
}

impl From<ByteIoError> for PsdDecodeErrors {
    fn from(r: ByteIoError) -> Self {
        Self::IoErrors(r)
    }
}

impl From<InflateDecodeErrors> for PsdDecodeErrors {
    fn from(r: InflateDecodeErrors) -> Self {
        Self::InflateError(r)
    }
}

/// Errors that can occur when building or writing a document.
pub enum PsdEncodeErrors {
    /// Dimensions of zero or above what the big document variant can
    /// express.
    BadDimensions(usize, usize),
    /// A bit depth the export surface does not accept.
    UnsupportedBitDepth(u16),
    /// The fixed layer table is exhausted.
    TooManyLayers(u32),
    /// The fixed alpha channel table is exhausted.
    TooManyAlphaChannels(u32),
    /// A layer index that was never returned by `add_layer`.
    InvalidLayerIndex(u32),
    /// An alpha channel index that was never returned by
    /// `add_alpha_channel`.
    InvalidChannelIndex(u32),
    /// The channel is not part of the document's color mode.
    InvalidChannel(&'static str),
    /// A plane whose length disagrees with its bounds.
    // expected, found
    MismatchedPlaneSize(usize, usize),
    /// A sample type that disagrees with the document's bit depth.
    MismatchedSampleType,
    /// A layer slot that was claimed but never given channel data.
    EmptyLayer(u32),
    /// Layer bounds that are inverted or too large.
    BadLayerBounds,
    Generic(&'static str),
    IoErrors(ByteIoError)
}

impl Debug for PsdEncodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            PsdEncodeErrors::BadDimensions(width, height) => {
                writeln!(f, "Cannot export a {width} x {height} document")
            }
            PsdEncodeErrors::UnsupportedBitDepth(depth) => {
                writeln!(
                    f,
                    "Unsupported bit depth {depth}, export supports 8, 16 and 32"
                )
            }
            PsdEncodeErrors::TooManyLayers(max) => {
                writeln!(f, "Layer table is full, at most {max} layers are supported")
            }
            PsdEncodeErrors::TooManyAlphaChannels(max) => {
                writeln!(
                    f,
                    "Alpha channel table is full, at most {max} channels are supported"
                )
            }
            PsdEncodeErrors::InvalidLayerIndex(index) => {
                writeln!(f, "Layer index {index} was never allocated")
            }
            PsdEncodeErrors::InvalidChannelIndex(index) => {
                writeln!(f, "Alpha channel index {index} was never allocated")
            }
            PsdEncodeErrors::InvalidChannel(reason) => {
                writeln!(f, "{reason}")
            }
            PsdEncodeErrors::MismatchedPlaneSize(expected, found) => {
                writeln!(
                    f,
                    "Plane size mismatch, bounds require {expected} samples but {found} were given"
                )
            }
            PsdEncodeErrors::MismatchedSampleType => {
                writeln!(f, "Sample type does not match the document bit depth")
            }
            PsdEncodeErrors::EmptyLayer(index) => {
                writeln!(f, "Layer {index} was added but never given channel data")
            }
            PsdEncodeErrors::BadLayerBounds => {
                writeln!(f, "Layer bounds are inverted or out of range")
            }
            PsdEncodeErrors::Generic(reason) => {
                writeln!(f, "{reason}")
            }
            PsdEncodeErrors::IoErrors(e) => {
                writeln!(f, "I/O error: {e:?}")
            }
        }
    }
}

impl From<&'static str> for PsdEncodeErrors {
    fn from(r: &'static str) -> Self {
        Self::Generic(r)
    }
}

impl From<ByteIoError> for PsdEncodeErrors {
    fn from(r: ByteIoError) -> Self {
        Self::IoErrors(r)
    }
}
