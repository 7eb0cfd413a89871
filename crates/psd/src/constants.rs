/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![allow(clippy::upper_case_acronyms)]

//! Wire constants of the Photoshop document format.
//!
//! Everything here mirrors Adobe's published numbering; multi byte
//! values are stored big endian on disk.

/// `8BPS`, the file signature.
pub const PSD_IDENTIFIER_BE: u32 = 0x3842_5053;

/// `8BIM`, the signature of image resource blocks, blend modes and
/// most additional layer information blocks.
pub const RESOURCE_IDENTIFIER: [u8; 4] = *b"8BIM";

/// `8B64`, the signature marking additional layer information blocks
/// whose length field is 64 bits wide.
pub const LARGE_LENGTH_IDENTIFIER: [u8; 4] = *b"8B64";

/// The document flavour declared in the header version field.
///
/// Both flavours share one layout; the big document variant widens
/// the layer section length prefixes and the run length count tables.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FileVersion {
    PSD = 1,
    PSB = 2
}

impl FileVersion {
    pub fn from_int(int: u16) -> Option<FileVersion> {
        match int {
            1 => Some(FileVersion::PSD),
            2 => Some(FileVersion::PSB),
            _ => None
        }
    }

    /// Width in bytes of the version dependent length prefixes in the
    /// layer and mask section.
    pub const fn length_size(self) -> usize {
        match self {
            FileVersion::PSD => 4,
            FileVersion::PSB => 8
        }
    }

    /// Width in bytes of one entry in a run length count table.
    pub const fn rle_count_size(self) -> usize {
        match self {
            FileVersion::PSD => 2,
            FileVersion::PSB => 4
        }
    }

    /// The largest canvas dimension the flavour can express.
    pub const fn max_dimension(self) -> usize {
        match self {
            FileVersion::PSD => 30_000,
            FileVersion::PSB => 300_000
        }
    }
}

/// Color modes a document header can declare.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ColorMode {
    Bitmap = 0,
    Grayscale = 1,
    Indexed = 2,
    RGB = 3,
    CMYK = 4,
    Multichannel = 7,
    Duotone = 8,
    Lab = 9
}

impl ColorMode {
    pub fn from_int(int: u16) -> Option<ColorMode> {
        use crate::constants::ColorMode::{
            Bitmap, Duotone, Grayscale, Indexed, Lab, Multichannel, CMYK, RGB
        };

        match int {
            0 => Some(Bitmap),
            1 => Some(Grayscale),
            2 => Some(Indexed),
            3 => Some(RGB),
            4 => Some(CMYK),
            7 => Some(Multichannel),
            8 => Some(Duotone),
            9 => Some(Lab),
            _ => None
        }
    }
}

/// Per plane compression methods, selected by a 16 bit tag in front
/// of each plane's bytes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CompressionMethod {
    /// Identity, samples stored big endian.
    Raw = 0,
    /// PackBits run length encoding with a per scanline count table.
    RLE = 1,
    /// A zlib wrapped Deflate stream over the whole plane.
    Zip = 2,
    /// Per row delta filtering followed by zlib; 32 bit planes are
    /// byte transposed before the delta.
    ZipWithPrediction = 3
}

impl CompressionMethod {
    pub fn from_int(int: u16) -> Option<CompressionMethod> {
        match int {
            0 => Some(Self::Raw),
            1 => Some(Self::RLE),
            2 => Some(Self::Zip),
            3 => Some(Self::ZipWithPrediction),
            _ => None
        }
    }
}

/// Channel identifiers used in layer records.
///
/// Non-negative values count color components in their natural order,
/// negative values are the masks.
pub mod channel_type {
    /// Red, or gray for grayscale documents.
    pub const RED: i16 = 0;
    pub const GREEN: i16 = 1;
    pub const BLUE: i16 = 2;
    /// The layer's own transparency.
    pub const TRANSPARENCY_MASK: i16 = -1;
    /// The raster mask painted by the user.
    pub const LAYER_MASK: i16 = -2;
    /// The mask rendered from vector data.
    pub const REAL_LAYER_MASK: i16 = -3;
}

/// Blend modes carried by layer records as four ASCII bytes.
///
/// Keys the codec does not recognize survive as
/// [`BlendMode::Unknown`] with their raw bytes; an unknown blend mode
/// is never a parse error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlendMode {
    PassThrough,
    Normal,
    Dissolve,
    Darken,
    Multiply,
    ColorBurn,
    LinearBurn,
    DarkerColor,
    Lighten,
    Screen,
    ColorDodge,
    LinearDodge,
    LighterColor,
    Overlay,
    SoftLight,
    HardLight,
    VividLight,
    LinearLight,
    PinLight,
    HardMix,
    Difference,
    Exclusion,
    Subtract,
    Divide,
    Hue,
    Saturation,
    Color,
    Luminosity,
    Unknown([u8; 4])
}

impl BlendMode {
    pub fn from_key(key: [u8; 4]) -> BlendMode {
        match &key {
            b"pass" => BlendMode::PassThrough,
            b"norm" => BlendMode::Normal,
            b"diss" => BlendMode::Dissolve,
            b"dark" => BlendMode::Darken,
            b"mul " => BlendMode::Multiply,
            b"idiv" => BlendMode::ColorBurn,
            b"lbrn" => BlendMode::LinearBurn,
            b"dkCl" => BlendMode::DarkerColor,
            b"lite" => BlendMode::Lighten,
            b"scrn" => BlendMode::Screen,
            b"div " => BlendMode::ColorDodge,
            b"lddg" => BlendMode::LinearDodge,
            b"lgCl" => BlendMode::LighterColor,
            b"over" => BlendMode::Overlay,
            b"sLit" => BlendMode::SoftLight,
            b"hLit" => BlendMode::HardLight,
            b"vLit" => BlendMode::VividLight,
            b"lLit" => BlendMode::LinearLight,
            b"pLit" => BlendMode::PinLight,
            b"hMix" => BlendMode::HardMix,
            b"diff" => BlendMode::Difference,
            b"smud" => BlendMode::Exclusion,
            b"fsub" => BlendMode::Subtract,
            b"fdiv" => BlendMode::Divide,
            b"hue " => BlendMode::Hue,
            b"sat " => BlendMode::Saturation,
            b"colr" => BlendMode::Color,
            b"lum " => BlendMode::Luminosity,
            _ => BlendMode::Unknown(key)
        }
    }

    pub const fn key(self) -> [u8; 4] {
        match self {
            BlendMode::PassThrough => *b"pass",
            BlendMode::Normal => *b"norm",
            BlendMode::Dissolve => *b"diss",
            BlendMode::Darken => *b"dark",
            BlendMode::Multiply => *b"mul ",
            BlendMode::ColorBurn => *b"idiv",
            BlendMode::LinearBurn => *b"lbrn",
            BlendMode::DarkerColor => *b"dkCl",
            BlendMode::Lighten => *b"lite",
            BlendMode::Screen => *b"scrn",
            BlendMode::ColorDodge => *b"div ",
            BlendMode::LinearDodge => *b"lddg",
            BlendMode::LighterColor => *b"lgCl",
            BlendMode::Overlay => *b"over",
            BlendMode::SoftLight => *b"sLit",
            BlendMode::HardLight => *b"hLit",
            BlendMode::VividLight => *b"vLit",
            BlendMode::LinearLight => *b"lLit",
            BlendMode::PinLight => *b"pLit",
            BlendMode::HardMix => *b"hMix",
            BlendMode::Difference => *b"diff",
            BlendMode::Exclusion => *b"smud",
            BlendMode::Subtract => *b"fsub",
            BlendMode::Divide => *b"fdiv",
            BlendMode::Hue => *b"hue ",
            BlendMode::Saturation => *b"sat ",
            BlendMode::Color => *b"colr",
            BlendMode::Luminosity => *b"lum ",
            BlendMode::Unknown(key) => key
        }
    }
}

/// The color label shown next to a layer in the layers panel,
/// carried by the `lclr` block.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum LayerColor {
    #[default]
    NoColor = 0,
    Red = 1,
    Orange = 2,
    Yellow = 3,
    Green = 4,
    Blue = 5,
    Violet = 6,
    Gray = 7
}

impl LayerColor {
    pub fn from_int(int: u16) -> LayerColor {
        match int {
            1 => LayerColor::Red,
            2 => LayerColor::Orange,
            3 => LayerColor::Yellow,
            4 => LayerColor::Green,
            5 => LayerColor::Blue,
            6 => LayerColor::Violet,
            7 => LayerColor::Gray,
            _ => LayerColor::NoColor
        }
    }
}

/// Group membership markers carried by `lsct`/`lsdk` blocks.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SectionDivider {
    /// A plain layer.
    #[default]
    Other = 0,
    /// A group shown expanded.
    OpenFolder = 1,
    /// A group shown collapsed.
    ClosedFolder = 2,
    /// The hidden layer closing a group.
    BoundingSection = 3
}

impl SectionDivider {
    pub fn from_int(int: u32) -> SectionDivider {
        match int {
            1 => SectionDivider::OpenFolder,
            2 => SectionDivider::ClosedFolder,
            3 => SectionDivider::BoundingSection,
            _ => SectionDivider::Other
        }
    }

    pub const fn is_folder(self) -> bool {
        matches!(
            self,
            SectionDivider::OpenFolder | SectionDivider::ClosedFolder
        )
    }
}

/// How an extra document channel is meant to be interpreted.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AlphaChannelMode {
    /// A straight alpha channel.
    Alpha = 0,
    /// Alpha stored inverted.
    InvertedAlpha = 1,
    /// A spot color plate.
    Spot = 2
}

impl AlphaChannelMode {
    pub fn from_int(int: u8) -> Option<AlphaChannelMode> {
        match int {
            0 => Some(AlphaChannelMode::Alpha),
            1 => Some(AlphaChannelMode::InvertedAlpha),
            2 => Some(AlphaChannelMode::Spot),
            _ => None
        }
    }
}

/// Color space selectors used by the channel display information
/// resource.
pub mod alpha_color_space {
    pub const RGB: u16 = 0;
    pub const HSB: u16 = 1;
    pub const CMYK: u16 = 2;
    pub const LAB: u16 = 7;
    pub const GRAYSCALE: u16 = 8;
}

/// Image resource ids the codec understands; everything else is kept
/// as opaque pass-through.
pub mod resource_id {
    /// ASCII names of the extra alpha channels, one Pascal string per
    /// channel.
    pub const ALPHA_CHANNEL_ASCII_NAMES: u16 = 1006;
    /// IPTC-NAA record.
    pub const IPTC_NAA: u16 = 1028;
    /// Thumbnail in BGR order, written by old Photoshop versions.
    pub const THUMBNAIL_BGR: u16 = 1033;
    /// Thumbnail in RGB order.
    pub const THUMBNAIL: u16 = 1036;
    /// Embedded ICC profile bytes.
    pub const ICC_PROFILE: u16 = 1039;
    /// Unicode names of the extra alpha channels.
    pub const UNICODE_ALPHA_NAMES: u16 = 1045;
    /// Stable ids of the extra alpha channels.
    pub const ALPHA_IDENTIFIERS: u16 = 1053;
    /// Writer and reader application info.
    pub const VERSION_INFO: u16 = 1057;
    /// EXIF data 1.
    pub const EXIF_DATA: u16 = 1058;
    /// EXIF data 3.
    pub const EXIF_DATA_3: u16 = 1059;
    /// XMP metadata packet, UTF-8 XML.
    pub const XMP_METADATA: u16 = 1060;
    /// Print scale style and factors.
    pub const PRINT_SCALE: u16 = 1062;
    /// Layer comps descriptor.
    pub const LAYER_COMPS: u16 = 1065;
    /// Per channel display colors, opacity and kind.
    pub const DISPLAY_INFO: u16 = 1077;
}

/// Additional layer information keys the codec interprets.
pub mod info_key {
    /// Unicode layer name.
    pub const UNICODE_NAME: [u8; 4] = *b"luni";
    /// Stable layer id.
    pub const LAYER_ID: [u8; 4] = *b"lyid";
    /// Group section divider.
    pub const SECTION_DIVIDER: [u8; 4] = *b"lsct";
    /// Nested group section divider.
    pub const NESTED_SECTION_DIVIDER: [u8; 4] = *b"lsdk";
    /// Layer color label.
    pub const SHEET_COLOR: [u8; 4] = *b"lclr";
    /// 16 bit documents store their layer records here.
    pub const LAYER_INFO_16: [u8; 4] = *b"Lr16";
    /// 32 bit documents store their layer records here.
    pub const LAYER_INFO_32: [u8; 4] = *b"Lr32";
    /// Overflow layer records.
    pub const LAYER_INFO: [u8; 4] = *b"Layr";
    /// The merged image carries transparency.
    pub const MERGED_TRANSPARENCY: [u8; 4] = *b"Mtrn";
    /// The merged image carries transparency, 16 bit documents.
    pub const MERGED_TRANSPARENCY_16: [u8; 4] = *b"Mt16";
    /// The merged image carries transparency, 32 bit documents.
    pub const MERGED_TRANSPARENCY_32: [u8; 4] = *b"Mt32";
}

/// Keys whose length field widens to 64 bits in big documents.
pub const LARGE_LENGTH_KEYS: [[u8; 4]; 13] = [
    *b"LMsk", *b"Lr16", *b"Lr32", *b"Layr", *b"Mt16", *b"Mt32", *b"Mtrn", *b"Alph", *b"FMsk",
    *b"lnk2", *b"FEid", *b"FXid", *b"PxSD"
];

/// True if `key` uses a 64 bit length field in big documents.
pub fn has_large_length(key: &[u8; 4]) -> bool {
    LARGE_LENGTH_KEYS.iter().any(|k| k == key)
}
