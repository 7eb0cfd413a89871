/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The image data section: the merged composite.
//!
//! One compression tag covers every plane. For run length encoding a
//! single scanline count table for all planes concatenated comes
//! first, then the row payloads plane by plane.

use psd_core::bytestream::{ByteReader, ByteReaderTrait};
use psd_core::log::trace;

use crate::compression;
use crate::constants::{CompressionMethod, FileVersion};
use crate::document::{Document, Section};
use crate::errors::PsdDecodeErrors;

/// The merged image: the color planes, optionally the document
/// transparency, then any extra alpha channels.
pub struct ImageDataSection {
    pub compression: CompressionMethod,
    /// Canvas sized planes of big endian samples, one per header
    /// channel.
    pub planes: Vec<Vec<u8>>
}

impl ImageDataSection {
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }
}

pub(crate) fn parse_image_data<T: ByteReaderTrait>(
    stream: &mut ByteReader<T>, document: &Document
) -> Result<Option<ImageDataSection>, PsdDecodeErrors> {
    let section: &Section = &document.image_data_section;
    if section.is_empty() {
        return Ok(None);
    }

    let depth = document.depth();
    if !depth.has_whole_byte_samples() {
        return Err(PsdDecodeErrors::UnsupportedBitDepth(depth.bit_count()));
    }

    stream.set_position(section.offset)?;

    let tag = stream.get_u16_be_err()?;
    let method =
        CompressionMethod::from_int(tag).ok_or(PsdDecodeErrors::UnknownCompression(tag))?;

    let width = document.width();
    let height = document.height();
    let channel_count = document.channel_count();
    let plane_bytes = compression::plane_size(depth, width, height);
    let row_bytes = width * depth.size_of();

    trace!("Merged image compression: {:?}", method);

    let mut planes = Vec::with_capacity(channel_count);
    match method {
        CompressionMethod::Raw => {
            for _ in 0..channel_count {
                let mut plane = vec![0_u8; plane_bytes];
                stream.read_exact_bytes(&mut plane)?;
                planes.push(plane);
            }
        }
        CompressionMethod::RLE => {
            // one count table covering every plane precedes all
            // payloads
            let mut counts = Vec::with_capacity(height * channel_count);
            for _ in 0..height * channel_count {
                let count = match document.version() {
                    FileVersion::PSD => usize::from(stream.get_u16_be_err()?),
                    FileVersion::PSB => stream.get_u32_be_err()? as usize
                };
                counts.push(count);
            }

            for plane_counts in counts.chunks_exact(height) {
                let payload_len: usize = plane_counts.iter().sum();
                let mut payload = vec![0_u8; payload_len];
                stream.read_exact_bytes(&mut payload)?;

                planes.push(compression::rle_decode_rows(
                    &payload,
                    plane_counts,
                    row_bytes,
                    height
                )?);
            }
        }
        CompressionMethod::Zip | CompressionMethod::ZipWithPrediction => {
            // the merged image only ever uses raw or run length
            // encoding
            return Err(PsdDecodeErrors::UnknownCompression(tag));
        }
    }

    Ok(Some(ImageDataSection {
        compression: method,
        planes
    }))
}
