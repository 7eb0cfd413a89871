/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The document writer.
//!
//! Turns an [`ExportDocument`] into a stream Photoshop will open:
//! header, empty color mode data, the synthesized image resources,
//! the layer and mask section and the merged image data, in that
//! order. Every length prefix that precedes its payload is emitted
//! as a placeholder and backpatched, which keeps the writer single
//! pass over an arbitrary seekable sink.

use std::sync::MutexGuard;

use psd_core::bit_depth::BitDepth;
use psd_core::bytestream::{ByteWriter, ByteWriterTrait, MemSink};
use psd_core::log::trace;

use crate::compression;
use crate::constants::{
    alpha_color_space, resource_id, AlphaChannelMode, BlendMode, CompressionMethod, FileVersion,
    RESOURCE_IDENTIFIER
};
use crate::errors::PsdEncodeErrors;
use crate::export::{ExportAlphaChannel, ExportDocument, ExportLayer, MergedImage};
use crate::header::FileHeader;
use crate::resources;
use crate::strings;

/// Threshold above which a single plane forces the big document
/// variant.
const MAX_PSD_PLANE_BYTES: u64 = 2 << 30;

/// Writes an [`ExportDocument`] to a seekable sink.
///
/// ```no_run
/// use psd::{ExportChannel, ExportColorMode, ExportDocument, PsdEncoder};
/// use psd::constants::CompressionMethod;
/// use psd_core::bit_depth::BitDepth;
///
/// let document = ExportDocument::new(16, 16, BitDepth::Eight, ExportColorMode::RGB).unwrap();
/// let layer = document.add_layer("background").unwrap();
/// let plane = [0_u8; 256];
/// document
///     .update_layer(layer, ExportChannel::Red, 0, 0, 16, 16, &plane, CompressionMethod::RLE)
///     .unwrap();
///
/// let mut sink = std::io::Cursor::new(Vec::new());
/// PsdEncoder::new(&document).encode(&mut sink).unwrap();
/// ```
pub struct PsdEncoder<'a> {
    document: &'a ExportDocument
}

impl<'a> PsdEncoder<'a> {
    /// Create an encoder over a finished builder.
    pub const fn new(document: &'a ExportDocument) -> PsdEncoder<'a> {
        PsdEncoder { document }
    }

    /// Write the document, returning the number of bytes emitted.
    ///
    /// All slot updates must have completed; the encoder takes every
    /// slot lock for the duration of the write.
    pub fn encode<T: ByteWriterTrait>(&self, sink: T) -> Result<usize, PsdEncodeErrors> {
        let document = self.document;

        let layer_count = document.layer_count() as usize;
        let layers: Vec<MutexGuard<ExportLayer>> = document.layers[..layer_count]
            .iter()
            .map(|slot| slot.lock().unwrap())
            .collect();

        for (index, layer) in layers.iter().enumerate() {
            if !layer.claimed || layer.channels.iter().all(Option::is_none) {
                return Err(PsdEncodeErrors::EmptyLayer(index as u32));
            }
        }

        let alpha_count = document.alpha_channel_count() as usize;
        let alpha_channels: Vec<MutexGuard<ExportAlphaChannel>> = document.alpha_channels
            [..alpha_count]
            .iter()
            .map(|slot| slot.lock().unwrap())
            .collect();

        let merged = document.merged.lock().unwrap();
        let metadata = document.metadata.lock().unwrap();
        let color_mode_data = document.color_mode_data.lock().unwrap();

        let depth = document.depth();
        let width = document.width;
        let height = document.height;
        let plane_bytes = compression::plane_size(depth, width as usize, height as usize);

        let version = if width > 30_000 || height > 30_000 || plane_bytes as u64 > MAX_PSD_PLANE_BYTES
        {
            FileVersion::PSB
        } else {
            FileVersion::PSD
        };

        let has_merged_alpha = merged.planes[3].is_some();
        // layer transparency is stored as true transparency; its
        // presence is flagged through the sign of the layer count
        let has_transparency =
            has_merged_alpha || layers.iter().any(|layer| layer.channels[3].is_some());

        let color_channels = document.color_mode.color_channels();
        let channel_count = color_channels + usize::from(has_merged_alpha) + alpha_count;

        trace!("Export flavour: {:?}", version);
        trace!("Export layers: {}", layer_count);
        trace!("Export channels: {}", channel_count);

        let mut writer = ByteWriter::new(sink);

        let header = FileHeader {
            version,
            channel_count: channel_count as u16,
            width,
            height,
            depth,
            color_mode: document.color_mode.color_mode()
        };
        header.write(&mut writer)?;

        // color mode data: empty except for the duotone ink payload,
        // which goes out verbatim
        writer.write_u32_be_err(color_mode_data.len() as u32)?;
        writer.write_all(&color_mode_data)?;

        write_image_resources(&mut writer, &metadata, &alpha_channels)?;
        write_layer_section(&mut writer, version, depth, has_transparency, &layers)?;
        write_image_data(
            &mut writer,
            color_channels,
            plane_bytes,
            &merged,
            &alpha_channels
        )?;

        writer.flush()?;
        Ok(writer.bytes_written())
    }
}

fn write_image_resources<T: ByteWriterTrait>(
    writer: &mut ByteWriter<T>, metadata: &[(String, String)],
    alpha_channels: &[MutexGuard<ExportAlphaChannel>]
) -> Result<(), PsdEncodeErrors> {
    let length_marker = writer.position()?;
    writer.write_u32_be_err(0)?;
    let start = writer.position()?;

    if !metadata.is_empty() {
        let xmp = synthesize_xmp(metadata);
        resources::write_resource_block(writer, resource_id::XMP_METADATA, "", xmp.as_bytes())?;
    }

    if !alpha_channels.is_empty() {
        // names as bare Pascal strings, no padding between them
        let mut names = ByteWriter::new(MemSink::new());
        for channel in alpha_channels {
            let bytes = channel.name.as_bytes();
            let length = bytes.len().min(255);
            names.write_u8_err(length as u8)?;
            names.write_all(&bytes[..length])?;
        }
        resources::write_resource_block(
            writer,
            resource_id::ALPHA_CHANNEL_ASCII_NAMES,
            "",
            names.inner().as_slice()
        )?;

        let mut unicode_names = ByteWriter::new(MemSink::new());
        for channel in alpha_channels {
            strings::write_unicode_string(&mut unicode_names, &channel.name)?;
        }
        resources::write_resource_block(
            writer,
            resource_id::UNICODE_ALPHA_NAMES,
            "",
            unicode_names.inner().as_slice()
        )?;

        let mut identifiers = ByteWriter::new(MemSink::new());
        for index in 0..alpha_channels.len() {
            identifiers.write_u32_be_err(index as u32)?;
        }
        resources::write_resource_block(
            writer,
            resource_id::ALPHA_IDENTIFIERS,
            "",
            identifiers.inner().as_slice()
        )?;

        let entries: Vec<(u16, [u16; 4], u16, AlphaChannelMode)> = alpha_channels
            .iter()
            .map(|channel| {
                (
                    alpha_color_space::RGB,
                    channel.color,
                    u16::from(channel.opacity),
                    channel.mode.unwrap_or(AlphaChannelMode::Alpha)
                )
            })
            .collect();
        let mut display_info = ByteWriter::new(MemSink::new());
        resources::write_display_info(&mut display_info, &entries)?;
        resources::write_resource_block(
            writer,
            resource_id::DISPLAY_INFO,
            "",
            display_info.inner().as_slice()
        )?;
    }

    let length = writer.position()? - start;
    writer.patch_u32_be(length_marker, length as u32)?;
    Ok(())
}

fn write_layer_section<T: ByteWriterTrait>(
    writer: &mut ByteWriter<T>, version: FileVersion, depth: BitDepth, has_transparency: bool,
    layers: &[MutexGuard<ExportLayer>]
) -> Result<(), PsdEncodeErrors> {
    let section_marker = write_length_placeholder(writer, version)?;
    let section_start = writer.position()?;

    // layer info subsection
    let info_marker = write_length_placeholder(writer, version)?;
    let info_start = writer.position()?;

    let count = layers.len() as i16;
    let signed_count = if has_transparency { -count } else { count };
    writer.write_u16_be_err(signed_count as u16)?;

    // channel data lengths are only known after compression; remember
    // where each length field lives and patch once the payload is out
    let mut channel_markers: Vec<Vec<u64>> = Vec::with_capacity(layers.len());

    for layer in layers {
        let mut markers = Vec::new();

        writer.write_u32_be_err(layer.top as u32)?;
        writer.write_u32_be_err(layer.left as u32)?;
        writer.write_u32_be_err(layer.bottom as u32)?;
        writer.write_u32_be_err(layer.right as u32)?;

        let slots = present_slots(layer);
        writer.write_u16_be_err(slots.len() as u16)?;

        for &slot in &slots {
            writer.write_u16_be_err(slot_channel_type(slot) as u16)?;
            markers.push(write_length_placeholder(writer, version)?);
        }
        channel_markers.push(markers);

        writer.write_const_bytes(&RESOURCE_IDENTIFIER)?;
        writer.write_const_bytes(&BlendMode::Normal.key())?;
        // opacity, clipping, flags, filler
        writer.write_u8_err(255)?;
        writer.write_u8_err(0)?;
        writer.write_u8_err(0)?;
        writer.write_u8_err(0)?;

        let extra_marker = writer.position()?;
        writer.write_u32_be_err(0)?;
        let extra_start = writer.position()?;

        // no mask, no blending ranges
        writer.write_u32_be_err(0)?;
        writer.write_u32_be_err(0)?;

        let ascii_name: String = layer
            .name
            .chars()
            .map(|c| if c.is_ascii() { c } else { '?' })
            .collect();
        strings::write_padded_4(writer, &ascii_name)?;

        // the Unicode name block keeps what the ASCII field lost
        let units = layer.name.encode_utf16().count() as u32;
        writer.write_const_bytes(&RESOURCE_IDENTIFIER)?;
        writer.write_const_bytes(b"luni")?;
        writer.write_u32_be_err(4 + units * 2)?;
        strings::write_unicode_string(writer, &layer.name)?;

        let mut extra_length = writer.position()? - extra_start;
        while extra_length % 4 != 0 {
            writer.write_u8_err(0)?;
            extra_length += 1;
        }
        writer.patch_u32_be(extra_marker, extra_length as u32)?;
    }

    // channel payloads, layer major then channel major
    for (layer, markers) in layers.iter().zip(&channel_markers) {
        let width = layer.width();
        let height = layer.height();

        for (&slot, &marker) in present_slots(layer).iter().zip(markers) {
            let channel = layer.channels[slot].as_ref().unwrap();

            writer.write_u16_be_err(channel.compression as u16)?;
            let payload = compression::encode_plane(
                &channel.data,
                channel.compression,
                depth,
                width,
                height,
                version
            )?;
            writer.write_all(&payload)?;

            patch_length(writer, version, marker, 2 + payload.len() as u64)?;
        }
    }

    let mut info_length = writer.position()? - info_start;
    if info_length % 2 == 1 {
        writer.write_u8_err(0)?;
        info_length += 1;
    }
    patch_length(writer, version, info_marker, info_length)?;

    // empty global mask info
    writer.write_u32_be_err(0)?;

    let mut section_length = writer.position()? - section_start;
    if section_length % 2 == 1 {
        writer.write_u8_err(0)?;
        section_length += 1;
    }
    patch_length(writer, version, section_marker, section_length)?;
    Ok(())
}

fn write_image_data<T: ByteWriterTrait>(
    writer: &mut ByteWriter<T>, color_channels: usize, plane_bytes: usize, merged: &MergedImage,
    alpha_channels: &[MutexGuard<ExportAlphaChannel>]
) -> Result<(), PsdEncodeErrors> {
    writer.write_u16_be_err(CompressionMethod::Raw as u16)?;

    // a missing merged image or channel plane exports as black
    let black = vec![0_u8; plane_bytes];

    for index in 0..color_channels {
        let plane = merged.planes[index].as_deref().unwrap_or(&black);
        writer.write_all(plane)?;
    }
    if let Some(alpha) = merged.planes[3].as_deref() {
        writer.write_all(alpha)?;
    }
    for channel in alpha_channels {
        let plane = if channel.data.is_empty() {
            &black
        } else {
            &channel.data
        };
        writer.write_all(plane)?;
    }

    Ok(())
}

fn present_slots(layer: &ExportLayer) -> Vec<usize> {
    // transparency first, then the color planes in their natural
    // order
    let mut slots = Vec::with_capacity(4);
    if layer.channels[3].is_some() {
        slots.push(3);
    }
    for slot in 0..3 {
        if layer.channels[slot].is_some() {
            slots.push(slot);
        }
    }
    slots
}

const fn slot_channel_type(slot: usize) -> i16 {
    match slot {
        3 => -1,
        _ => slot as i16
    }
}

fn write_length_placeholder<T: ByteWriterTrait>(
    writer: &mut ByteWriter<T>, version: FileVersion
) -> Result<u64, PsdEncodeErrors> {
    let marker = writer.position()?;
    match version {
        FileVersion::PSD => writer.write_u32_be_err(0)?,
        FileVersion::PSB => writer.write_u64_be_err(0)?
    }
    Ok(marker)
}

fn patch_length<T: ByteWriterTrait>(
    writer: &mut ByteWriter<T>, version: FileVersion, marker: u64, value: u64
) -> Result<(), PsdEncodeErrors> {
    match version {
        FileVersion::PSD => writer.patch_u32_be(marker, value as u32)?,
        FileVersion::PSB => writer.patch_u64_be(marker, value)?
    }
    Ok(())
}

fn synthesize_xmp(metadata: &[(String, String)]) -> String {
    let mut description = String::new();
    for (key, value) in metadata {
        description.push_str("   <xmp:");
        description.push_str(key);
        description.push('>');
        description.push_str(&escape_xml(value));
        description.push_str("</xmp:");
        description.push_str(key);
        description.push_str(">\n");
    }

    format!(
        "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">\n \
         <rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n  \
         <rdf:Description rdf:about=\"\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\">\n\
         {description}  \
         </rdf:Description>\n \
         </rdf:RDF>\n\
         </x:xmpmeta>"
    )
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c)
        }
    }
    escaped
}
