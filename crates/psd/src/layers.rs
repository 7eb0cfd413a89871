/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The layer and mask information section.
//!
//! Layout: a version dependent length prefix, the layer info
//! subsection (signed layer count, the layer records, then every
//! channel's compressed payload in record order), the global mask
//! info block, and a run of additional information blocks until the
//! section ends.
//!
//! Parsing records where each channel's payload lives but does not
//! decompress anything; [`extract_layer`] does that per layer, so
//! distinct layers can be extracted in parallel with independent
//! readers over the same file.

use psd_core::bytestream::{ByteReader, ByteReaderTrait};
use psd_core::log::{trace, warn};

use crate::compression;
use crate::constants::{
    channel_type, has_large_length, info_key, BlendMode, CompressionMethod, FileVersion,
    LayerColor, SectionDivider, LARGE_LENGTH_IDENTIFIER, RESOURCE_IDENTIFIER
};
use crate::document::{Document, Section};
use crate::errors::PsdDecodeErrors;
use crate::header::FileHeader;
use crate::strings;

/// A raster or vector mask attached to a layer.
///
/// Spatially independent of its layer: the bounds are absolute canvas
/// coordinates. `data` is one plane of `width x height` samples,
/// filled in by [`extract_layer`].
#[derive(Default)]
pub struct Mask {
    pub top:    i32,
    pub left:   i32,
    pub bottom: i32,
    pub right:  i32,

    /// Color the mask takes outside its bounds, 0 or 255.
    pub default_color: u8,
    pub flags:         u8,
    pub data:          Vec<u8>
}

impl Mask {
    pub const fn width(&self) -> usize {
        self.right.wrapping_sub(self.left) as usize
    }

    pub const fn height(&self) -> usize {
        self.bottom.wrapping_sub(self.top) as usize
    }
}

/// One channel of a layer.
///
/// After the section parse only the bookkeeping is filled in: the
/// absolute `file_offset` of the compression tag and the
/// `compressed_length` behind it. `data` stays empty until the layer
/// is extracted; mask channels deposit their plane into the owning
/// mask instead.
pub struct Channel {
    /// One of the [`channel_type`] values.
    pub channel_type: i16,
    /// Bytes of compressed payload including the two byte tag.
    pub compressed_length: u64,
    /// Absolute position of the compression tag in the source.
    pub file_offset: u64,
    /// How the plane was stored, known once the layer is extracted.
    pub compression: Option<CompressionMethod>,
    /// The decoded plane, big endian samples.
    pub data: Vec<u8>
}

impl Channel {
    /// True once the plane has been decompressed.
    pub fn is_loaded(&self) -> bool {
        !self.data.is_empty()
    }
}

/// An additional information block kept as opaque pass-through.
pub struct AdditionalInfoBlock {
    pub signature: [u8; 4],
    pub key:       [u8; 4],
    pub data:      Vec<u8>
}

/// One layer record.
pub struct Layer {
    pub top:    i32,
    pub left:   i32,
    pub bottom: i32,
    pub right:  i32,

    pub channels: Vec<Channel>,

    pub blend_mode: BlendMode,
    /// 0 transparent, 255 opaque.
    pub opacity:  u8,
    pub clipping: u8,
    pub flags:    u8,

    /// The ASCII name, possibly truncated by the writer.
    pub name: String,
    /// The Unicode name from the `luni` block. Preferred over `name`
    /// when present; the ASCII name is a lossy fallback.
    pub utf16_name: Option<String>,

    /// The raster mask painted by the user.
    pub layer_mask: Option<Mask>,
    /// The mask rendered from vector data.
    pub vector_mask: Option<Mask>,

    /// Stable id from the `lyid` block.
    pub layer_id: Option<u32>,
    /// Label color from the `lclr` block.
    pub color_label: LayerColor,
    /// Group divider role of this record.
    pub divider: SectionDivider,
    /// Index of the enclosing group layer, if any.
    pub parent: Option<usize>,

    /// Blending ranges, kept verbatim.
    pub blending_ranges: Vec<u8>,
    /// Uninterpreted additional information blocks, kept verbatim.
    pub additional_info: Vec<AdditionalInfoBlock>
}

impl Layer {
    pub const fn width(&self) -> usize {
        self.right.wrapping_sub(self.left) as usize
    }

    pub const fn height(&self) -> usize {
        self.bottom.wrapping_sub(self.top) as usize
    }

    /// Find a channel by its [`channel_type`] value.
    pub fn channel(&self, channel_type: i16) -> Option<&Channel> {
        self.channels
            .iter()
            .find(|channel| channel.channel_type == channel_type)
    }

    /// The best name available: Unicode when present, ASCII
    /// otherwise.
    pub fn display_name(&self) -> &str {
        self.utf16_name.as_deref().unwrap_or(&self.name)
    }
}

/// The global mask overlay, a nested length prefixed block.
pub struct GlobalMaskInfo {
    pub overlay_color_space: u16,
    pub color:               [u16; 4],
    pub opacity:             u16,
    pub kind:                u8
}

/// The parsed layer and mask information section.
pub struct LayerMaskSection {
    /// Layers in file order, bottom-most first.
    pub layers: Vec<Layer>,
    /// True when the merged image's first extra channel is real
    /// transparency rather than an alpha channel.
    pub has_transparency_mask: bool,
    /// Layers recovered from overflow tables rather than the layer
    /// info subsection.
    pub overflowed_layer_count: u32,
    pub global_mask: Option<GlobalMaskInfo>,
    /// Section level additional information blocks the codec does not
    /// interpret, kept verbatim.
    pub additional_info: Vec<AdditionalInfoBlock>
}

impl LayerMaskSection {
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

pub(crate) fn parse_layer_mask_section<T: ByteReaderTrait>(
    stream: &mut ByteReader<T>, section: &Section, header: &FileHeader
) -> Result<Option<LayerMaskSection>, PsdDecodeErrors> {
    if section.is_empty() {
        return Ok(None);
    }

    let version = header.version;
    stream.set_position(section.offset)?;
    let section_end = section.end();

    let mut parsed = LayerMaskSection {
        layers: Vec::new(),
        has_transparency_mask: false,
        overflowed_layer_count: 0,
        global_mask: None,
        additional_info: Vec::new()
    };

    // layer info subsection
    let info_length = read_version_length(stream, version)?;
    let info_end = stream.position()? + info_length;
    if info_end > section_end {
        return Err(PsdDecodeErrors::SectionLengthMismatch(section_end, info_end));
    }
    if info_length > 0 {
        parse_layer_info(stream, info_end, header, &mut parsed)?;
        stream.set_position(info_end)?;
    }

    // global mask info, zero length is legal
    if stream.position()? + 4 <= section_end {
        let mask_length = u64::from(stream.get_u32_be_err()?);
        let mask_end = stream.position()? + mask_length;
        if mask_end > section_end {
            return Err(PsdDecodeErrors::SectionLengthMismatch(section_end, mask_end));
        }
        if mask_length >= 13 {
            let overlay_color_space = stream.get_u16_be_err()?;
            let mut color = [0_u16; 4];
            for component in &mut color {
                *component = stream.get_u16_be_err()?;
            }
            let opacity = stream.get_u16_be_err()?;
            let kind = stream.read_u8_err()?;
            parsed.global_mask = Some(GlobalMaskInfo {
                overlay_color_space,
                color,
                opacity,
                kind
            });
        }
        stream.set_position(mask_end)?;
    }

    // additional information blocks to the end of the section
    while stream.position()? + 12 <= section_end {
        let signature = stream.read_fixed_bytes_or_error::<4>()?;
        if signature != RESOURCE_IDENTIFIER && signature != LARGE_LENGTH_IDENTIFIER {
            // the section may end in zero padding
            if signature != [0; 4] {
                warn!("Unknown block signature {:?}, stopping", signature);
            }
            break;
        }
        let key = stream.read_fixed_bytes_or_error::<4>()?;
        let length = read_info_length(stream, version, &signature, &key)?;
        let data_end = stream.position()? + length;
        if data_end > section_end {
            warn!("Block {:?} runs past the section end, stopping", key);
            break;
        }

        match key {
            info_key::LAYER_INFO_16 | info_key::LAYER_INFO_32 | info_key::LAYER_INFO => {
                // 16 and 32 bit documents store their layer records
                // here instead of the layer info subsection
                let before = parsed.layers.len();
                parse_layer_info(stream, data_end, header, &mut parsed)?;
                if before != 0 {
                    parsed.overflowed_layer_count += (parsed.layers.len() - before) as u32;
                }
            }
            info_key::MERGED_TRANSPARENCY
            | info_key::MERGED_TRANSPARENCY_16
            | info_key::MERGED_TRANSPARENCY_32 => {
                parsed.has_transparency_mask = true;
            }
            _ => {
                let mut data = vec![0_u8; length as usize];
                stream.read_exact_bytes(&mut data)?;
                parsed.additional_info.push(AdditionalInfoBlock {
                    signature,
                    key,
                    data
                });
            }
        }

        // block payloads are padded to two bytes
        stream.set_position(data_end + (length & 1))?;
    }

    derive_group_parents(&mut parsed.layers);

    trace!("Parsed {} layers", parsed.layers.len());
    trace!("Transparency mask: {}", parsed.has_transparency_mask);

    Ok(Some(parsed))
}

/// Parse a layer info table: signed count, records, channel payload
/// positions.
fn parse_layer_info<T: ByteReaderTrait>(
    stream: &mut ByteReader<T>, end: u64, header: &FileHeader, parsed: &mut LayerMaskSection
) -> Result<(), PsdDecodeErrors> {
    let raw_count = stream.get_u16_be_err()? as i16;

    // a negative count flags the merged image as carrying real
    // transparency in its first extra channel
    if raw_count < 0 {
        parsed.has_transparency_mask = true;
    }
    let count = raw_count.unsigned_abs() as usize;
    if count == 0 {
        return Ok(());
    }

    let first_new = parsed.layers.len();
    for _ in 0..count {
        let layer = parse_layer_record(stream, end, header.version)?;
        parsed.layers.push(layer);
    }

    // all channel payloads follow the records, layer major then
    // channel major; only their positions are recorded here
    for layer in &mut parsed.layers[first_new..] {
        for channel in &mut layer.channels {
            channel.file_offset = stream.position()?;
            let next = channel.file_offset + channel.compressed_length;
            if next > end {
                return Err(PsdDecodeErrors::LayerSectionOverflow(end, next));
            }
            stream.set_position(next)?;
        }
    }

    Ok(())
}

fn parse_layer_record<T: ByteReaderTrait>(
    stream: &mut ByteReader<T>, end: u64, version: FileVersion
) -> Result<Layer, PsdDecodeErrors> {
    let top = stream.get_u32_be_err()? as i32;
    let left = stream.get_u32_be_err()? as i32;
    let bottom = stream.get_u32_be_err()? as i32;
    let right = stream.get_u32_be_err()? as i32;

    check_bounds(top, left, bottom, right)?;

    let channel_count = stream.get_u16_be_err()?;
    if channel_count == 0 || channel_count > 56 {
        return Err(PsdDecodeErrors::UnsupportedChannelCount(channel_count));
    }

    let mut channels = Vec::with_capacity(usize::from(channel_count));
    for _ in 0..channel_count {
        let kind = stream.get_u16_be_err()? as i16;
        let length = match version {
            FileVersion::PSD => u64::from(stream.get_u32_be_err()?),
            FileVersion::PSB => stream.get_u64_be_err()?
        };
        channels.push(Channel {
            channel_type: kind,
            compressed_length: length,
            file_offset: 0,
            compression: None,
            data: Vec::new()
        });
    }

    let blend_signature = stream.read_fixed_bytes_or_error::<4>()?;
    if blend_signature != RESOURCE_IDENTIFIER {
        return Err(PsdDecodeErrors::Generic("bad blend mode signature"));
    }
    let blend_key = stream.read_fixed_bytes_or_error::<4>()?;
    let blend_mode = BlendMode::from_key(blend_key);
    if let BlendMode::Unknown(key) = blend_mode {
        warn!("Unknown blend mode {:?}, keeping raw key", key);
    }

    let opacity = stream.read_u8_err()?;
    let clipping = stream.read_u8_err()?;
    let flags = stream.read_u8_err()?;
    // filler
    stream.skip(1)?;

    let extra_length = u64::from(stream.get_u32_be_err()?);
    let extra_end = stream.position()? + extra_length;
    if extra_end > end {
        return Err(PsdDecodeErrors::LayerSectionOverflow(end, extra_end));
    }

    let mut layer = Layer {
        top,
        left,
        bottom,
        right,
        channels,
        blend_mode,
        opacity,
        clipping,
        flags,
        name: String::new(),
        utf16_name: None,
        layer_mask: None,
        vector_mask: None,
        layer_id: None,
        color_label: LayerColor::NoColor,
        divider: SectionDivider::Other,
        parent: None,
        blending_ranges: Vec::new(),
        additional_info: Vec::new()
    };

    parse_layer_masks(stream, extra_end, &mut layer)?;

    // blending ranges, kept verbatim
    let ranges_length = u64::from(stream.get_u32_be_err()?);
    if stream.position()? + ranges_length > extra_end {
        return Err(PsdDecodeErrors::LayerSectionOverflow(
            extra_end,
            stream.position()? + ranges_length
        ));
    }
    layer.blending_ranges = vec![0_u8; ranges_length as usize];
    stream.read_exact_bytes(&mut layer.blending_ranges)?;

    layer.name = strings::read_padded_4(stream)?;

    parse_additional_info(stream, extra_end, version, &mut layer)?;

    stream.set_position(extra_end)?;
    Ok(layer)
}

/// Parse the layer mask block inside a record's extra data.
///
/// A zero size means no mask. Otherwise the first header describes
/// the raster mask; when bit 4 of its flags is set a second header
/// with "real" parameters follows and the block yields two masks.
fn parse_layer_masks<T: ByteReaderTrait>(
    stream: &mut ByteReader<T>, extra_end: u64, layer: &mut Layer
) -> Result<(), PsdDecodeErrors> {
    let mask_length = u64::from(stream.get_u32_be_err()?);
    if mask_length == 0 {
        return Ok(());
    }
    let mask_end = stream.position()? + mask_length;
    if mask_end > extra_end {
        return Err(PsdDecodeErrors::LayerSectionOverflow(extra_end, mask_end));
    }

    let top = stream.get_u32_be_err()? as i32;
    let left = stream.get_u32_be_err()? as i32;
    let bottom = stream.get_u32_be_err()? as i32;
    let right = stream.get_u32_be_err()? as i32;
    check_bounds(top, left, bottom, right)?;
    let default_color = stream.read_u8_err()?;
    let flags = stream.read_u8_err()?;

    let first = Mask {
        top,
        left,
        bottom,
        right,
        default_color,
        flags,
        data: Vec::new()
    };

    let has_second = first.flags & (1 << 4) != 0;
    if has_second && stream.position()? + 18 <= mask_end {
        let flags = stream.read_u8_err()?;
        let default_color = stream.read_u8_err()?;
        let top = stream.get_u32_be_err()? as i32;
        let left = stream.get_u32_be_err()? as i32;
        let bottom = stream.get_u32_be_err()? as i32;
        let right = stream.get_u32_be_err()? as i32;
        check_bounds(top, left, bottom, right)?;

        layer.vector_mask = Some(Mask {
            top,
            left,
            bottom,
            right,
            default_color,
            flags,
            data: Vec::new()
        });
    }

    layer.layer_mask = Some(first);

    // remaining parameter bytes and padding
    stream.set_position(mask_end)?;
    Ok(())
}

fn parse_additional_info<T: ByteReaderTrait>(
    stream: &mut ByteReader<T>, extra_end: u64, version: FileVersion, layer: &mut Layer
) -> Result<(), PsdDecodeErrors> {
    while stream.position()? + 12 <= extra_end {
        let signature = stream.read_fixed_bytes_or_error::<4>()?;
        if signature != RESOURCE_IDENTIFIER && signature != LARGE_LENGTH_IDENTIFIER {
            // trailing zero padding inside the extra data bound is
            // tolerated
            if signature != [0; 4] {
                warn!("Unknown block signature {:?} in layer extra data", signature);
            }
            break;
        }
        let key = stream.read_fixed_bytes_or_error::<4>()?;
        let length = read_info_length(stream, version, &signature, &key)?;
        let data_end = stream.position()? + length;
        if data_end > extra_end {
            return Err(PsdDecodeErrors::LayerSectionOverflow(extra_end, data_end));
        }

        match key {
            info_key::UNICODE_NAME => {
                layer.utf16_name = Some(strings::read_unicode_string(stream)?);
            }
            info_key::LAYER_ID => {
                layer.layer_id = Some(stream.get_u32_be_err()?);
            }
            info_key::SECTION_DIVIDER | info_key::NESTED_SECTION_DIVIDER => {
                layer.divider = SectionDivider::from_int(stream.get_u32_be_err()?);
            }
            info_key::SHEET_COLOR => {
                layer.color_label = LayerColor::from_int(stream.get_u16_be_err()?);
            }
            _ => {
                let mut data = vec![0_u8; length as usize];
                stream.read_exact_bytes(&mut data)?;
                layer.additional_info.push(AdditionalInfoBlock {
                    signature,
                    key,
                    data
                });
            }
        }

        stream.set_position(data_end + (length & 1))?;
    }
    Ok(())
}

/// Assign each layer the index of its enclosing group.
///
/// Layers are stored bottom-most first; walking from the top, a
/// folder record opens a group for everything below it until its
/// bounding divider closes it again.
fn derive_group_parents(layers: &mut [Layer]) {
    let mut stack: Vec<usize> = Vec::new();

    for i in (0..layers.len()).rev() {
        layers[i].parent = stack.last().copied();

        if layers[i].divider.is_folder() {
            stack.push(i);
        } else if layers[i].divider == SectionDivider::BoundingSection {
            stack.pop();
        }
    }
}

/// Decompress every channel of `layer`, publishing color planes into
/// the layer's channels and mask planes into the owning mask.
///
/// `stream` is a reader over the file the layer was parsed from.
/// Extraction is a closed transaction against the recorded channel
/// offsets, so distinct layers can be extracted in parallel as long
/// as each thread brings its own reader.
pub fn extract_layer<T: ByteReaderTrait>(
    stream: &mut ByteReader<T>, document: &Document, layer: &mut Layer
) -> Result<(), PsdDecodeErrors> {
    let depth = document.depth();
    if !depth.has_whole_byte_samples() {
        return Err(PsdDecodeErrors::UnsupportedBitDepth(depth.bit_count()));
    }
    let version = document.version();

    for index in 0..layer.channels.len() {
        let kind = layer.channels[index].channel_type;
        let offset = layer.channels[index].file_offset;
        let compressed = layer.channels[index].compressed_length;

        if compressed == 0 {
            continue;
        }
        if compressed < 2 {
            return Err(PsdDecodeErrors::Truncated);
        }

        let (width, height) = match kind {
            channel_type::LAYER_MASK => match &layer.layer_mask {
                Some(mask) => (mask.width(), mask.height()),
                None => {
                    warn!("Mask channel without a mask header, skipping");
                    continue;
                }
            },
            channel_type::REAL_LAYER_MASK => match &layer.vector_mask {
                Some(mask) => (mask.width(), mask.height()),
                None => {
                    warn!("Vector mask channel without a mask header, skipping");
                    continue;
                }
            },
            _ => (layer.width(), layer.height())
        };

        stream.set_position(offset)?;
        let tag = stream.get_u16_be_err()?;
        let method =
            CompressionMethod::from_int(tag).ok_or(PsdDecodeErrors::UnknownCompression(tag))?;
        layer.channels[index].compression = Some(method);

        let mut payload = vec![0_u8; (compressed - 2) as usize];
        stream.read_exact_bytes(&mut payload)?;

        let plane = compression::decode_plane(&payload, method, depth, width, height, version)?;

        match kind {
            channel_type::LAYER_MASK => {
                if let Some(mask) = layer.layer_mask.as_mut() {
                    mask.data = plane;
                }
            }
            channel_type::REAL_LAYER_MASK => {
                if let Some(mask) = layer.vector_mask.as_mut() {
                    mask.data = plane;
                }
            }
            _ => layer.channels[index].data = plane
        }
    }

    Ok(())
}

fn check_bounds(top: i32, left: i32, bottom: i32, right: i32) -> Result<(), PsdDecodeErrors> {
    let width = i64::from(right) - i64::from(left);
    let height = i64::from(bottom) - i64::from(top);

    if width < 0 || height < 0 || width >= (1 << 30) || height >= (1 << 30) {
        return Err(PsdDecodeErrors::Generic("layer bounds out of range"));
    }
    Ok(())
}

fn read_version_length<T: ByteReaderTrait>(
    stream: &mut ByteReader<T>, version: FileVersion
) -> Result<u64, PsdDecodeErrors> {
    match version {
        FileVersion::PSD => Ok(u64::from(stream.get_u32_be_err()?)),
        FileVersion::PSB => Ok(stream.get_u64_be_err()?)
    }
}

/// Additional information lengths are u32 except for a fixed set of
/// keys in big documents, which widen to u64 and usually carry the
/// `8B64` signature.
fn read_info_length<T: ByteReaderTrait>(
    stream: &mut ByteReader<T>, version: FileVersion, signature: &[u8; 4], key: &[u8; 4]
) -> Result<u64, PsdDecodeErrors> {
    let wide = signature == &LARGE_LENGTH_IDENTIFIER
        || (version == FileVersion::PSB && has_large_length(key));

    if wide {
        Ok(stream.get_u64_be_err()?)
    } else {
        Ok(u64::from(stream.get_u32_be_err()?))
    }
}
