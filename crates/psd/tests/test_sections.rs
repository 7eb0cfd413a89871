/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Hand assembled documents exercising the section parsers on edge
//! cases a writer round-trip cannot reach.

use psd::constants::{BlendMode, FileVersion};
use psd::errors::PsdDecodeErrors;
use psd::PsdDecoder;
use psd_core::bytestream::ByteCursor;

fn header(version: u16, channels: u16, width: u32, height: u32, depth: u16, mode: u16) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(26);
    bytes.extend_from_slice(b"8BPS");
    bytes.extend_from_slice(&version.to_be_bytes());
    bytes.extend_from_slice(&[0_u8; 6]);
    bytes.extend_from_slice(&channels.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&depth.to_be_bytes());
    bytes.extend_from_slice(&mode.to_be_bytes());
    bytes
}

/// Prefix `content` with its u32 big endian length.
fn with_len(content: &[u8]) -> Vec<u8> {
    let mut bytes = (content.len() as u32).to_be_bytes().to_vec();
    bytes.extend_from_slice(content);
    bytes
}

/// A layer record with empty mask and blending range blocks.
fn layer_record(
    bounds: [i32; 4], channels: &[(i16, u32)], mask_block: &[u8], name: &[u8]
) -> Vec<u8> {
    let mut record = Vec::new();
    for value in bounds {
        record.extend_from_slice(&value.to_be_bytes());
    }
    record.extend_from_slice(&(channels.len() as u16).to_be_bytes());
    for (kind, length) in channels {
        record.extend_from_slice(&kind.to_be_bytes());
        record.extend_from_slice(&length.to_be_bytes());
    }
    record.extend_from_slice(b"8BIM");
    record.extend_from_slice(&BlendMode::Normal.key());
    // opacity, clipping, flags, filler
    record.extend_from_slice(&[255, 0, 0, 0]);

    let mut extra = Vec::new();
    extra.extend_from_slice(&with_len(mask_block));
    // empty blending ranges
    extra.extend_from_slice(&0_u32.to_be_bytes());
    // pascal name padded to four
    let mut pascal = vec![name.len() as u8];
    pascal.extend_from_slice(name);
    while pascal.len() % 4 != 0 {
        pascal.push(0);
    }
    extra.extend_from_slice(&pascal);

    record.extend_from_slice(&with_len(&extra));
    record
}

/// Glue a whole file together: header, color mode, resources, layer
/// section, image data.
fn document(header_bytes: &[u8], layer_section: &[u8], image_data: &[u8]) -> Vec<u8> {
    let mut bytes = header_bytes.to_vec();
    bytes.extend_from_slice(&with_len(&[]));
    bytes.extend_from_slice(&with_len(&[]));
    bytes.extend_from_slice(&with_len(layer_section));
    bytes.extend_from_slice(image_data);
    bytes
}

/// A raw compressed 8 bit plane: tag then the bytes.
fn raw_channel(data: &[u8]) -> Vec<u8> {
    let mut bytes = 0_u16.to_be_bytes().to_vec();
    bytes.extend_from_slice(data);
    bytes
}

#[test]
fn empty_sections_parse_to_nothing() {
    let bytes = document(&header(1, 3, 4, 4, 8, 3), &[], &[]);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));

    assert!(decoder.parse_color_mode_data().unwrap().is_none());
    assert!(decoder.parse_image_resources().unwrap().blocks.is_empty());
    assert!(decoder.parse_layer_mask_section().unwrap().is_none());
    assert!(decoder.parse_image_data().unwrap().is_none());
}

#[test]
fn sections_form_a_contiguous_prefix() {
    let plane = vec![0_u8; 16 * 3];
    let mut image_data = 0_u16.to_be_bytes().to_vec();
    image_data.extend_from_slice(&plane);

    let bytes = document(&header(1, 3, 4, 4, 8, 3), &[], &image_data);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));
    decoder.decode_headers().unwrap();

    let parsed = decoder.document().unwrap();
    assert_eq!(parsed.color_mode_section.offset, 26 + 4);
    assert_eq!(
        parsed.color_mode_section.end() + 4,
        parsed.image_resources_section.offset
    );
    assert_eq!(
        parsed.image_resources_section.end() + 4,
        parsed.layer_mask_section.offset
    );
    assert_eq!(
        parsed.layer_mask_section.end(),
        parsed.image_data_section.offset
    );
    assert_eq!(parsed.image_data_section.end(), bytes.len() as u64);

    let merged = decoder.parse_image_data().unwrap().unwrap();
    assert_eq!(merged.plane_count(), 3);
}

#[test]
fn layers_without_channels_are_rejected() {
    let mut info = 1_i16.to_be_bytes().to_vec();
    info.extend_from_slice(&layer_record([0, 0, 2, 2], &[], &[], b"hollow"));

    let mut section = with_len(&info);
    section.extend_from_slice(&0_u32.to_be_bytes());

    let bytes = document(&header(1, 3, 4, 4, 8, 3), &section, &[]);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));

    assert!(matches!(
        decoder.parse_layer_mask_section(),
        Err(PsdDecodeErrors::UnsupportedChannelCount(0))
    ));
}

#[test]
fn layer_count_zero_is_an_empty_section() {
    let mut section = Vec::new();
    section.extend_from_slice(&with_len(&0_i16.to_be_bytes()));
    // empty global mask info
    section.extend_from_slice(&0_u32.to_be_bytes());

    let bytes = document(&header(1, 3, 4, 4, 8, 3), &section, &[]);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));

    let parsed = decoder.parse_layer_mask_section().unwrap().unwrap();
    assert_eq!(parsed.layer_count(), 0);
    assert!(!parsed.has_transparency_mask);
    assert!(parsed.global_mask.is_none());
}

#[test]
fn negative_layer_count_flags_transparency() {
    let plane = [1_u8, 2, 3, 4];
    let channel = raw_channel(&plane);

    let mut info = (-1_i16).to_be_bytes().to_vec();
    info.extend_from_slice(&layer_record(
        [0, 0, 2, 2],
        &[(0, channel.len() as u32)],
        &[],
        b"only"
    ));
    info.extend_from_slice(&channel);

    let mut section = with_len(&info);
    section.extend_from_slice(&0_u32.to_be_bytes());

    let bytes = document(&header(1, 3, 4, 4, 8, 3), &section, &[]);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));

    let mut parsed = decoder.parse_layer_mask_section().unwrap().unwrap();
    assert!(parsed.has_transparency_mask);
    assert_eq!(parsed.layer_count(), 1);

    let layer = &mut parsed.layers[0];
    assert_eq!(layer.name, "only");
    decoder.extract_layer(layer).unwrap();
    assert_eq!(layer.channels[0].data, plane);
}

#[test]
fn mask_flags_bit_4_yields_two_masks() {
    // 36 byte mask block: raster mask header, then the "real"
    // parameters describing the second mask
    let mut mask_block = Vec::new();
    for value in [0_i32, 0, 4, 4] {
        mask_block.extend_from_slice(&value.to_be_bytes());
    }
    mask_block.push(255); // default color
    mask_block.push(1 << 4); // flags: real parameters follow
    mask_block.push(0); // real flags
    mask_block.push(0); // real default color
    for value in [0_i32, 0, 2, 2] {
        mask_block.extend_from_slice(&value.to_be_bytes());
    }
    assert_eq!(mask_block.len(), 36);

    let color = raw_channel(&[9; 16]);
    let raster = raw_channel(&[7; 16]);
    let vector = raw_channel(&[3; 4]);

    let mut info = 1_i16.to_be_bytes().to_vec();
    info.extend_from_slice(&layer_record(
        [0, 0, 4, 4],
        &[
            (0, color.len() as u32),
            (-2, raster.len() as u32),
            (-3, vector.len() as u32)
        ],
        &mask_block,
        b"masked"
    ));
    info.extend_from_slice(&color);
    info.extend_from_slice(&raster);
    info.extend_from_slice(&vector);

    let mut section = with_len(&info);
    section.extend_from_slice(&0_u32.to_be_bytes());

    let bytes = document(&header(1, 3, 8, 8, 8, 3), &section, &[]);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));

    let mut parsed = decoder.parse_layer_mask_section().unwrap().unwrap();
    let layer = &mut parsed.layers[0];
    decoder.extract_layer(layer).unwrap();

    let raster_mask = layer.layer_mask.as_ref().unwrap();
    assert_eq!((raster_mask.width(), raster_mask.height()), (4, 4));
    assert_eq!(raster_mask.default_color, 255);
    assert_eq!(raster_mask.data, vec![7; 16]);

    let vector_mask = layer.vector_mask.as_ref().unwrap();
    assert_eq!((vector_mask.width(), vector_mask.height()), (2, 2));
    assert_eq!(vector_mask.data, vec![3; 4]);

    assert_eq!(layer.channels[0].data, vec![9; 16]);
}

#[test]
fn out_of_canvas_layers_are_accepted() {
    let plane = vec![5_u8; 64];
    let channel = raw_channel(&plane);

    let mut info = 1_i16.to_be_bytes().to_vec();
    info.extend_from_slice(&layer_record(
        [-4, -4, 4, 4],
        &[(0, channel.len() as u32)],
        &[],
        b"offside"
    ));
    info.extend_from_slice(&channel);

    let mut section = with_len(&info);
    section.extend_from_slice(&0_u32.to_be_bytes());

    let bytes = document(&header(1, 3, 4, 4, 8, 3), &section, &[]);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));

    let mut parsed = decoder.parse_layer_mask_section().unwrap().unwrap();
    let layer = &mut parsed.layers[0];
    assert_eq!((layer.left, layer.top), (-4, -4));
    assert_eq!((layer.width(), layer.height()), (8, 8));

    decoder.extract_layer(layer).unwrap();
    assert_eq!(layer.channels[0].data, plane);
}

#[test]
fn zero_length_channels_stay_empty() {
    let mut info = 1_i16.to_be_bytes().to_vec();
    info.extend_from_slice(&layer_record([0, 0, 2, 2], &[(0, 0)], &[], b"empty"));

    let mut section = with_len(&info);
    section.extend_from_slice(&0_u32.to_be_bytes());

    let bytes = document(&header(1, 3, 4, 4, 8, 3), &section, &[]);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));

    let mut parsed = decoder.parse_layer_mask_section().unwrap().unwrap();
    let layer = &mut parsed.layers[0];
    decoder.extract_layer(layer).unwrap();

    assert!(!layer.channels[0].is_loaded());
}

#[test]
fn channel_count_limits_apply() {
    let bytes = document(&header(1, 56, 4, 4, 8, 3), &[], &[]);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));
    assert!(decoder.decode_headers().is_ok());

    let bytes = document(&header(1, 57, 4, 4, 8, 3), &[], &[]);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));
    assert!(matches!(
        decoder.decode_headers(),
        Err(PsdDecodeErrors::UnsupportedChannelCount(57))
    ));
}

#[test]
fn big_documents_use_wide_lengths_and_8b64() {
    // layer section of a big document: u64 subsection length, then a
    // merged transparency marker behind the 8B64 signature
    let mut section = Vec::new();
    let info = 0_i16.to_be_bytes();
    section.extend_from_slice(&(info.len() as u64).to_be_bytes());
    section.extend_from_slice(&info);
    section.extend_from_slice(&0_u32.to_be_bytes());
    section.extend_from_slice(b"8B64");
    section.extend_from_slice(b"Mtrn");
    section.extend_from_slice(&0_u64.to_be_bytes());

    let mut bytes = header(2, 3, 40_000, 4, 8, 3);
    bytes.extend_from_slice(&with_len(&[]));
    bytes.extend_from_slice(&with_len(&[]));
    // the layer and mask section length itself is u64 in big
    // documents
    bytes.extend_from_slice(&(section.len() as u64).to_be_bytes());
    bytes.extend_from_slice(&section);

    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));
    decoder.decode_headers().unwrap();
    assert_eq!(decoder.document().unwrap().version(), FileVersion::PSB);

    let parsed = decoder.parse_layer_mask_section().unwrap().unwrap();
    assert_eq!(parsed.layer_count(), 0);
    assert!(parsed.has_transparency_mask);
}

#[test]
fn section_lengths_must_fit_the_file() {
    let mut bytes = header(1, 3, 4, 4, 8, 3);
    bytes.extend_from_slice(&with_len(&[]));
    // resources claim 100 bytes the file does not have
    bytes.extend_from_slice(&100_u32.to_be_bytes());

    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));
    assert!(matches!(
        decoder.decode_headers(),
        Err(PsdDecodeErrors::SectionLengthMismatch(_, _))
    ));
}

#[test]
fn wrong_magic_is_rejected() {
    let mut bytes = header(1, 3, 4, 4, 8, 3);
    bytes[0] = b'X';

    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));
    assert!(matches!(
        decoder.decode_headers(),
        Err(PsdDecodeErrors::WrongMagicBytes(_))
    ));
}
