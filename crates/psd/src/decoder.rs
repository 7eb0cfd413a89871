/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The document decoder.
//!
//! Decoding is section oriented: [`PsdDecoder::decode_headers`] reads
//! the header and resolves the four section descriptors, after which
//! each section can be parsed independently and in any order. Pixel
//! data is only touched by [`PsdDecoder::extract_layer`] and
//! [`PsdDecoder::parse_image_data`].

use psd_core::bit_depth::BitDepth;
use psd_core::bytestream::{ByteReader, ByteReaderTrait, ByteSeek};
use psd_core::log::trace;
use psd_core::options::DecoderOptions;

use crate::constants::{ColorMode, FileVersion};
use crate::document::{Document, Section};
use crate::errors::PsdDecodeErrors;
use crate::header::{ColorModeData, FileHeader};
use crate::image_data::{self, ImageDataSection};
use crate::layers::{self, Layer, LayerMaskSection};
use crate::resources::{self, ImageResourcesSection};

/// A Photoshop document reader.
///
/// ```no_run
/// use psd::PsdDecoder;
/// use psd::errors::PsdDecodeErrors;
/// use psd_core::bytestream::ByteCursor;
///
/// fn main() -> Result<(), PsdDecodeErrors> {
///     let bytes = std::fs::read("image.psd").unwrap();
///     let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));
///
///     decoder.decode_headers()?;
///     if let Some(mut section) = decoder.parse_layer_mask_section()? {
///         for layer in &mut section.layers {
///             decoder.extract_layer(layer)?;
///         }
///     }
///     Ok(())
/// }
/// ```
pub struct PsdDecoder<T: ByteReaderTrait> {
    stream:   ByteReader<T>,
    options:  DecoderOptions,
    document: Option<Document>
}

impl<T: ByteReaderTrait> PsdDecoder<T> {
    /// Create a new decoder reading a document from `data`.
    pub fn new(data: T) -> PsdDecoder<T> {
        Self::new_with_options(data, DecoderOptions::default())
    }

    /// Create a new decoder with options that influence decoding.
    pub fn new_with_options(data: T, options: DecoderOptions) -> PsdDecoder<T> {
        PsdDecoder {
            stream: ByteReader::new(data),
            options,
            document: None
        }
    }

    /// Parse the header and resolve the four section descriptors.
    ///
    /// Idempotent; every other `parse_` method calls this first.
    pub fn decode_headers(&mut self) -> Result<(), PsdDecodeErrors> {
        if self.document.is_some() {
            return Ok(());
        }

        let file_end = self.stream.seek(ByteSeek::End(0))?;
        self.stream.set_position(0)?;

        let header = FileHeader::parse(&mut self.stream, &self.options)?;

        // the three length prefixed sections follow back to back; the
        // image data section is whatever remains
        let color_mode_section = self.read_section(file_end, header.version, false)?;
        let image_resources_section = self.read_section(file_end, header.version, false)?;
        let layer_mask_section = self.read_section(file_end, header.version, true)?;

        let position = self.stream.position()?;
        let image_data_section = Section {
            offset: position,
            length: file_end - position
        };

        trace!("Color mode section: {:?}", color_mode_section);
        trace!("Image resources section: {:?}", image_resources_section);
        trace!("Layer mask section: {:?}", layer_mask_section);
        trace!("Image data section: {:?}", image_data_section);

        self.document = Some(Document {
            header,
            color_mode_section,
            image_resources_section,
            layer_mask_section,
            image_data_section
        });

        Ok(())
    }

    fn read_section(
        &mut self, file_end: u64, version: FileVersion, version_sized: bool
    ) -> Result<Section, PsdDecodeErrors> {
        let length = if version_sized && version == FileVersion::PSB {
            self.stream.get_u64_be_err()?
        } else {
            u64::from(self.stream.get_u32_be_err()?)
        };

        let offset = self.stream.position()?;
        let section = Section { offset, length };

        if section.end() > file_end {
            return Err(PsdDecodeErrors::SectionLengthMismatch(
                file_end,
                section.end()
            ));
        }
        self.stream.set_position(section.end())?;

        Ok(section)
    }

    /// The parsed document, if the headers have been decoded.
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Canvas width and height, if the headers have been decoded.
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.document.as_ref().map(|d| (d.width(), d.height()))
    }

    /// Bits per channel, if the headers have been decoded.
    pub fn bit_depth(&self) -> Option<BitDepth> {
        self.document.as_ref().map(Document::depth)
    }

    /// The header color mode, if the headers have been decoded.
    pub fn color_mode(&self) -> Option<ColorMode> {
        self.document.as_ref().map(Document::color_mode)
    }

    /// Read the raw palette or duotone payload.
    pub fn parse_color_mode_data(&mut self) -> Result<Option<ColorModeData>, PsdDecodeErrors> {
        self.decode_headers()?;
        let document = self.document.as_ref().unwrap();
        let section = document.color_mode_section;

        if section.is_empty() {
            return Ok(None);
        }
        self.stream.set_position(section.offset)?;
        ColorModeData::parse(&mut self.stream, &document.header, section.length)
    }

    /// Parse the image resources section into its typed views.
    pub fn parse_image_resources(&mut self) -> Result<ImageResourcesSection, PsdDecodeErrors> {
        self.decode_headers()?;
        let document = self.document.as_ref().unwrap();

        resources::parse_image_resources(&mut self.stream, &document.image_resources_section)
    }

    /// Parse the layer records, masks and additional information.
    ///
    /// Channel planes stay compressed; follow up with
    /// [`extract_layer`](Self::extract_layer) per layer.
    pub fn parse_layer_mask_section(
        &mut self
    ) -> Result<Option<LayerMaskSection>, PsdDecodeErrors> {
        self.decode_headers()?;
        let document = self.document.as_ref().unwrap();

        layers::parse_layer_mask_section(
            &mut self.stream,
            &document.layer_mask_section,
            &document.header
        )
    }

    /// Decompress every channel of one layer.
    ///
    /// For parallel extraction use the free standing
    /// [`layers::extract_layer`] with one reader per thread.
    pub fn extract_layer(&mut self, layer: &mut Layer) -> Result<(), PsdDecodeErrors> {
        self.decode_headers()?;
        let document = self.document.as_ref().unwrap();

        layers::extract_layer(&mut self.stream, document, layer)
    }

    /// Parse the merged composite planes.
    pub fn parse_image_data(&mut self) -> Result<Option<ImageDataSection>, PsdDecodeErrors> {
        self.decode_headers()?;
        let document = self.document.as_ref().unwrap();

        image_data::parse_image_data(&mut self.stream, document)
    }

    /// Parse the merged composite for the color modes the high level
    /// surface supports.
    ///
    /// The container level parsers accept every documented color
    /// mode; this convenience entry point declines anything but RGB,
    /// grayscale and duotone documents at 8, 16 or 32 bits.
    pub fn decode_merged(&mut self) -> Result<Option<ImageDataSection>, PsdDecodeErrors> {
        self.decode_headers()?;
        let document = self.document.as_ref().unwrap();

        if !matches!(
            document.color_mode(),
            ColorMode::RGB | ColorMode::Grayscale | ColorMode::Duotone
        ) {
            return Err(PsdDecodeErrors::UnsupportedColorMode(
                document.color_mode() as u16
            ));
        }
        if !document.depth().has_whole_byte_samples() {
            return Err(PsdDecodeErrors::UnsupportedBitDepth(
                document.depth().bit_count()
            ));
        }

        self.parse_image_data()
    }
}
