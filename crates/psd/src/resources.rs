/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The image resources section.
//!
//! A typed key/value multiplexer: a u32 section length followed by
//! back to back blocks of `8BIM`, a u16 resource id, a Pascal string
//! name padded to two, a u32 payload size and the payload padded to
//! two. A handful of ids get parsed into typed views, everything is
//! also retained raw and in file order so a rewrite reproduces the
//! source byte for byte.
//!
//! A malformed block never fails the section: parsing resumes at the
//! next block boundary computed from the size prefix, which is the
//! only part we have to trust.

use psd_core::bytestream::{
    ByteCursor, ByteIoError, ByteReader, ByteReaderTrait, ByteWriter, ByteWriterTrait
};
use psd_core::log::{trace, warn};

use crate::constants::{alpha_color_space, resource_id, AlphaChannelMode, RESOURCE_IDENTIFIER};
use crate::document::Section;
use crate::errors::PsdDecodeErrors;
use crate::strings;

/// One resource block, kept verbatim.
pub struct ResourceBlock {
    pub id:   u16,
    pub name: String,
    pub data: Vec<u8>
}

/// The embedded preview image.
///
/// The pixel payload is a JPEG stream; old documents (id 1033) store
/// it with blue and red swapped.
pub struct Thumbnail {
    /// 0 for raw RGB, 1 for JPEG compression.
    pub format: u32,
    pub width:  u32,
    pub height: u32,
    /// The undecoded JPEG bytes.
    pub jpeg:   Vec<u8>,
    /// True when the source block was the BGR variant.
    pub bgr:    bool
}

/// One extra document channel as described by the image resources.
///
/// Assembled from up to four blocks: ASCII names, Unicode names,
/// channel identifiers and the display information block carrying
/// color, opacity and kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaChannel {
    pub ascii_name:   String,
    pub unicode_name: Option<String>,
    pub identifier:   Option<u32>,
    /// One of the [`alpha_color_space`] selectors.
    pub color_space:  u16,
    pub color:        [u16; 4],
    /// Display opacity, 0..=100.
    pub opacity:      u16,
    pub mode:         AlphaChannelMode
}

/// Writer and reader application info, resource 1057.
pub struct VersionInfo {
    pub version:              u32,
    pub has_real_merged_data: bool,
    pub writer_name:          String,
    pub reader_name:          String,
    pub file_version:         u32
}

/// Print scale, resource 1062.
pub struct PrintScale {
    pub style: u16,
    pub x:     f32,
    pub y:     f32,
    pub scale: f32
}

/// The parsed image resources section.
#[derive(Default)]
pub struct ImageResourcesSection {
    /// Every block in file order, including the ones with typed views
    /// below. Rewriting emits this list verbatim.
    pub blocks: Vec<ResourceBlock>,

    /// XMP packet, UTF-8 XML. May be an empty string.
    pub xmp_metadata:   Option<String>,
    pub exif_data:      Option<Vec<u8>>,
    pub icc_profile:    Option<Vec<u8>>,
    pub iptc:           Option<Vec<u8>>,
    pub thumbnail:      Option<Thumbnail>,
    pub version_info:   Option<VersionInfo>,
    pub print_scale:    Option<PrintScale>,
    pub layer_comps:    Option<Vec<u8>>,
    pub alpha_channels: Vec<AlphaChannel>
}

impl ImageResourcesSection {
    /// Size in bytes of the embedded EXIF payload.
    pub fn exif_data_size(&self) -> usize {
        self.exif_data.as_ref().map_or(0, Vec::len)
    }

    /// Size in bytes of the embedded ICC profile.
    pub fn icc_profile_size(&self) -> usize {
        self.icc_profile.as_ref().map_or(0, Vec::len)
    }

    /// Serialize the whole section, length prefix included.
    ///
    /// Blocks go out in their original file order, so parsing and
    /// rewriting an untouched section reproduces the source bytes.
    pub fn write_to<T: ByteWriterTrait>(
        &self, writer: &mut ByteWriter<T>
    ) -> Result<(), ByteIoError> {
        let length_marker = writer.position()?;
        writer.write_u32_be_err(0)?;
        let start = writer.position()?;

        write_resource_blocks(writer, &self.blocks)?;

        let length = writer.position()? - start;
        writer.patch_u32_be(length_marker, length as u32)
    }
}

impl Default for Thumbnail {
    fn default() -> Self {
        Thumbnail {
            format: 1,
            width:  0,
            height: 0,
            jpeg:   Vec::new(),
            bgr:    false
        }
    }
}

pub(crate) fn parse_image_resources<T: ByteReaderTrait>(
    stream: &mut ByteReader<T>, section: &Section
) -> Result<ImageResourcesSection, PsdDecodeErrors> {
    let mut resources = ImageResourcesSection::default();

    if section.is_empty() {
        return Ok(resources);
    }
    stream.set_position(section.offset)?;
    let end = section.end();

    // names from 1006/1045, ids from 1053 and display entries from
    // 1077 are merged into AlphaChannel records once every block has
    // been seen
    let mut ascii_names: Vec<String> = Vec::new();
    let mut unicode_names: Vec<String> = Vec::new();
    let mut identifiers: Vec<u32> = Vec::new();
    let mut display_entries: Vec<(u16, [u16; 4], u16, AlphaChannelMode)> = Vec::new();

    // signature(4) + id(2) + empty name(2) + size(4)
    while stream.position()? + 12 <= end {
        let signature = stream.read_fixed_bytes_or_error::<4>()?;
        if signature != RESOURCE_IDENTIFIER {
            warn!("Unknown resource signature {:?}, stopping", signature);
            break;
        }

        let id = stream.get_u16_be_err()?;
        let name = strings::read_padded_2(stream)?;
        let size = u64::from(stream.get_u32_be_err()?);

        let data_start = stream.position()?;
        if data_start + size > end {
            warn!("Resource {} runs past the section end, stopping", id);
            break;
        }

        let mut data = vec![0_u8; size as usize];
        stream.read_exact_bytes(&mut data)?;
        // payloads are padded to two bytes
        if size % 2 == 1 {
            stream.skip(1)?;
        }

        match id {
            resource_id::XMP_METADATA => {
                resources.xmp_metadata = Some(String::from_utf8_lossy(&data).into_owned());
            }
            resource_id::EXIF_DATA | resource_id::EXIF_DATA_3 => {
                resources.exif_data = Some(data.clone());
            }
            resource_id::ICC_PROFILE => {
                resources.icc_profile = Some(data.clone());
            }
            resource_id::IPTC_NAA => {
                resources.iptc = Some(data.clone());
            }
            resource_id::LAYER_COMPS => {
                resources.layer_comps = Some(data.clone());
            }
            resource_id::THUMBNAIL | resource_id::THUMBNAIL_BGR => {
                match parse_thumbnail(&data, id == resource_id::THUMBNAIL_BGR) {
                    Ok(thumbnail) => resources.thumbnail = Some(thumbnail),
                    Err(e) => warn!("Skipping malformed thumbnail resource: {:?}", e)
                }
            }
            resource_id::VERSION_INFO => match parse_version_info(&data) {
                Ok(info) => resources.version_info = Some(info),
                Err(e) => warn!("Skipping malformed version info: {:?}", e)
            },
            resource_id::PRINT_SCALE => match parse_print_scale(&data) {
                Ok(scale) => resources.print_scale = Some(scale),
                Err(e) => warn!("Skipping malformed print scale: {:?}", e)
            },
            resource_id::ALPHA_CHANNEL_ASCII_NAMES => match parse_ascii_names(&data) {
                Ok(names) => ascii_names = names,
                Err(e) => warn!("Skipping malformed alpha channel names: {:?}", e)
            },
            resource_id::UNICODE_ALPHA_NAMES => match parse_unicode_names(&data) {
                Ok(names) => unicode_names = names,
                Err(e) => warn!("Skipping malformed unicode alpha names: {:?}", e)
            },
            resource_id::ALPHA_IDENTIFIERS => match parse_alpha_identifiers(&data) {
                Ok(ids) => identifiers = ids,
                Err(e) => warn!("Skipping malformed alpha identifiers: {:?}", e)
            },
            resource_id::DISPLAY_INFO => match parse_display_info(&data) {
                Ok(entries) => display_entries = entries,
                Err(e) => warn!("Skipping malformed display info: {:?}", e)
            },
            _ => {}
        }

        resources.blocks.push(ResourceBlock { id, name, data });
    }

    stream.set_position(end)?;

    let channel_count = ascii_names
        .len()
        .max(unicode_names.len())
        .max(display_entries.len());
    for i in 0..channel_count {
        let (color_space, color, opacity, mode) = display_entries.get(i).copied().unwrap_or((
            alpha_color_space::RGB,
            [0; 4],
            100,
            AlphaChannelMode::Alpha
        ));
        resources.alpha_channels.push(AlphaChannel {
            ascii_name: ascii_names.get(i).cloned().unwrap_or_default(),
            unicode_name: unicode_names.get(i).cloned(),
            identifier: identifiers.get(i).copied(),
            color_space,
            color,
            opacity,
            mode
        });
    }

    trace!("Parsed {} resource blocks", resources.blocks.len());
    trace!("Document has {} alpha channels", channel_count);

    Ok(resources)
}

/// Re-emit `blocks` in their original order.
pub(crate) fn write_resource_blocks<T: ByteWriterTrait>(
    writer: &mut ByteWriter<T>, blocks: &[ResourceBlock]
) -> Result<(), ByteIoError> {
    for block in blocks {
        write_resource_block(writer, block.id, &block.name, &block.data)?;
    }
    Ok(())
}

pub(crate) fn write_resource_block<T: ByteWriterTrait>(
    writer: &mut ByteWriter<T>, id: u16, name: &str, data: &[u8]
) -> Result<(), ByteIoError> {
    writer.write_const_bytes(&RESOURCE_IDENTIFIER)?;
    writer.write_u16_be_err(id)?;
    strings::write_padded_2(writer, name)?;
    writer.write_u32_be_err(data.len() as u32)?;
    writer.write_all(data)?;
    if data.len() % 2 == 1 {
        writer.write_u8_err(0)?;
    }
    Ok(())
}

fn parse_thumbnail(data: &[u8], bgr: bool) -> Result<Thumbnail, ByteIoError> {
    let mut reader = ByteReader::new(ByteCursor::new(data));

    let format = reader.get_u32_be_err()?;
    let width = reader.get_u32_be_err()?;
    let height = reader.get_u32_be_err()?;
    // width in bytes, total size, compressed size, bits per pixel,
    // plane count; all derivable, none needed
    reader.skip(12 + 2 + 2)?;

    let mut jpeg = Vec::new();
    reader.read_remaining(&mut jpeg)?;

    Ok(Thumbnail {
        format,
        width,
        height,
        jpeg,
        bgr
    })
}

fn parse_version_info(data: &[u8]) -> Result<VersionInfo, ByteIoError> {
    let mut reader = ByteReader::new(ByteCursor::new(data));

    Ok(VersionInfo {
        version:              reader.get_u32_be_err()?,
        has_real_merged_data: reader.read_u8_err()? != 0,
        writer_name:          strings::read_unicode_string(&mut reader)?,
        reader_name:          strings::read_unicode_string(&mut reader)?,
        file_version:         reader.get_u32_be_err()?
    })
}

fn parse_print_scale(data: &[u8]) -> Result<PrintScale, ByteIoError> {
    let mut reader = ByteReader::new(ByteCursor::new(data));

    Ok(PrintScale {
        style: reader.get_u16_be_err()?,
        x:     f32::from_bits(reader.get_u32_be_err()?),
        y:     f32::from_bits(reader.get_u32_be_err()?),
        scale: f32::from_bits(reader.get_u32_be_err()?)
    })
}

/// A bare sequence of Pascal strings, one per channel, no padding.
fn parse_ascii_names(data: &[u8]) -> Result<Vec<String>, ByteIoError> {
    let mut names = Vec::new();
    let mut position = 0_usize;

    while position < data.len() {
        let length = usize::from(data[position]);
        position += 1;
        let end = position + length;
        if end > data.len() {
            return Err(ByteIoError::NotEnoughBytes(data.len() - position, length));
        }
        names.push(String::from_utf8_lossy(&data[position..end]).into_owned());
        position = end;
    }

    Ok(names)
}

fn parse_unicode_names(data: &[u8]) -> Result<Vec<String>, ByteIoError> {
    let mut reader = ByteReader::new(ByteCursor::new(data));
    let mut names = Vec::new();

    while (reader.position()? as usize) + 4 <= data.len() {
        names.push(strings::read_unicode_string(&mut reader)?);
    }

    Ok(names)
}

fn parse_alpha_identifiers(data: &[u8]) -> Result<Vec<u32>, ByteIoError> {
    let mut reader = ByteReader::new(ByteCursor::new(data));
    let mut identifiers = Vec::new();

    for _ in 0..data.len() / 4 {
        identifiers.push(reader.get_u32_be_err()?);
    }

    Ok(identifiers)
}

type DisplayEntry = (u16, [u16; 4], u16, AlphaChannelMode);

fn parse_display_info(data: &[u8]) -> Result<Vec<DisplayEntry>, ByteIoError> {
    let mut reader = ByteReader::new(ByteCursor::new(data));

    let version = reader.get_u32_be_err()?;
    if version != 1 {
        return Err(ByteIoError::Generic("unknown display info version"));
    }

    // 13 bytes per channel: color space, four color components,
    // opacity, kind
    let mut entries = Vec::new();
    for _ in 0..(data.len() - 4) / 13 {
        let color_space = reader.get_u16_be_err()?;
        let mut color = [0_u16; 4];
        for component in &mut color {
            *component = reader.get_u16_be_err()?;
        }
        let opacity = reader.get_u16_be_err()?.min(100);
        let mode = AlphaChannelMode::from_int(reader.read_u8_err()?)
            .unwrap_or(AlphaChannelMode::Alpha);
        entries.push((color_space, color, opacity, mode));
    }

    Ok(entries)
}

pub(crate) fn write_display_info<T: ByteWriterTrait>(
    writer: &mut ByteWriter<T>, entries: &[DisplayEntry]
) -> Result<(), ByteIoError> {
    writer.write_u32_be_err(1)?;
    for (color_space, color, opacity, mode) in entries {
        writer.write_u16_be_err(*color_space)?;
        for component in color {
            writer.write_u16_be_err(*component)?;
        }
        writer.write_u16_be_err(*opacity)?;
        writer.write_u8_err(*mode as u8)?;
    }
    Ok(())
}
