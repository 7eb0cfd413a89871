/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The fixed 26 byte file header and the color mode data section.

use psd_core::bit_depth::BitDepth;
use psd_core::bytestream::{ByteIoError, ByteReader, ByteReaderTrait, ByteWriter, ByteWriterTrait};
use psd_core::log::{trace, warn};
use psd_core::options::DecoderOptions;

use crate::constants::{ColorMode, FileVersion, PSD_IDENTIFIER_BE};
use crate::errors::PsdDecodeErrors;

/// The file header.
///
/// Laid out on disk as: `8BPS`, a version, six reserved zero bytes,
/// the channel count, height before width, the bit depth and the
/// color mode, every field big endian.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FileHeader {
    pub version:       FileVersion,
    pub channel_count: u16,
    pub width:         u32,
    pub height:        u32,
    pub depth:         BitDepth,
    pub color_mode:    ColorMode
}

impl FileHeader {
    pub(crate) fn parse<T: ByteReaderTrait>(
        stream: &mut ByteReader<T>, options: &DecoderOptions
    ) -> Result<FileHeader, PsdDecodeErrors> {
        let magic = stream.get_u32_be_err()?;
        if magic != PSD_IDENTIFIER_BE {
            return Err(PsdDecodeErrors::WrongMagicBytes(magic));
        }

        let version_int = stream.get_u16_be_err()?;
        let version = FileVersion::from_int(version_int)
            .ok_or(PsdDecodeErrors::UnsupportedVersion(version_int))?;

        // six reserved bytes, zero on write but not checked on read
        stream.skip(6)?;

        let channel_count = stream.get_u16_be_err()?;
        if channel_count == 0 || channel_count > 56 {
            return Err(PsdDecodeErrors::UnsupportedChannelCount(channel_count));
        }

        let height = stream.get_u32_be_err()?;
        let width = stream.get_u32_be_err()?;

        if width == 0 || height == 0 {
            return Err(PsdDecodeErrors::ZeroDimensions);
        }
        let hard_limit = version.max_dimension();
        for dimension in [width as usize, height as usize] {
            if dimension > hard_limit {
                return Err(PsdDecodeErrors::LargeDimensions(hard_limit, dimension));
            }
        }
        if width as usize > options.max_width() {
            return Err(PsdDecodeErrors::LargeDimensions(
                options.max_width(),
                width as usize
            ));
        }
        if height as usize > options.max_height() {
            return Err(PsdDecodeErrors::LargeDimensions(
                options.max_height(),
                height as usize
            ));
        }

        let depth_bits = stream.get_u16_be_err()?;
        let depth = BitDepth::from_bit_count(depth_bits)
            .ok_or(PsdDecodeErrors::UnsupportedBitDepth(depth_bits))?;

        let mode_int = stream.get_u16_be_err()?;
        let color_mode =
            ColorMode::from_int(mode_int).ok_or(PsdDecodeErrors::UnsupportedColorMode(mode_int))?;

        trace!("Document width: {}", width);
        trace!("Document height: {}", height);
        trace!("Channels: {}", channel_count);
        trace!("Bit depth: {:?}", depth);
        trace!("Color mode: {:?}", color_mode);

        Ok(FileHeader {
            version,
            channel_count,
            width,
            height,
            depth,
            color_mode
        })
    }

    pub(crate) fn write<T: ByteWriterTrait>(
        &self, writer: &mut ByteWriter<T>
    ) -> Result<(), ByteIoError> {
        writer.write_u32_be_err(PSD_IDENTIFIER_BE)?;
        writer.write_u16_be_err(self.version as u16)?;
        writer.write_const_bytes(&[0_u8; 6])?;
        writer.write_u16_be_err(self.channel_count)?;
        writer.write_u32_be_err(self.height)?;
        writer.write_u32_be_err(self.width)?;
        writer.write_u16_be_err(self.depth.bit_count())?;
        writer.write_u16_be_err(self.color_mode as u16)?;
        Ok(())
    }
}

/// The raw palette or duotone payload following the header.
///
/// Empty for every color mode except indexed documents, which store a
/// 768 byte palette here, and duotone documents, whose payload is
/// opaque and carried through untouched.
pub struct ColorModeData {
    pub data: Vec<u8>
}

impl ColorModeData {
    pub(crate) fn parse<T: ByteReaderTrait>(
        stream: &mut ByteReader<T>, header: &FileHeader, length: u64
    ) -> Result<Option<ColorModeData>, PsdDecodeErrors> {
        if length == 0 {
            return Ok(None);
        }
        if header.color_mode == ColorMode::Indexed && length != 768 {
            warn!("Indexed palette of {} bytes, expected 768", length);
        }

        let mut data = vec![0_u8; length as usize];
        stream.read_exact_bytes(&mut data)?;

        Ok(Some(ColorModeData { data }))
    }
}
