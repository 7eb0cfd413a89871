/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Unicode layer names, spot alpha channels, XMP metadata, duotone
//! export and big document selection.

use psd::constants::{AlphaChannelMode, ColorMode, CompressionMethod, FileVersion};
use psd::{ExportChannel, ExportColorMode, ExportDocument, PsdDecoder, PsdEncoder};
use psd_core::bit_depth::BitDepth;
use psd_core::bytestream::ByteCursor;

fn encode(document: &ExportDocument) -> Vec<u8> {
    let mut sink = std::io::Cursor::new(Vec::new());
    PsdEncoder::new(document).encode(&mut sink).unwrap();
    sink.into_inner()
}

fn flat(width: usize, height: usize, value: u8) -> Vec<u8> {
    vec![value; width * height]
}

#[test]
fn unicode_layer_names_survive() {
    // the clef is a surrogate pair; the ASCII field cannot hold any
    // of these
    let name = "π ☃ 𝄞";

    let document = ExportDocument::new(8, 8, BitDepth::Eight, ExportColorMode::RGB).unwrap();
    let layer = document.add_layer(name).unwrap();
    document
        .update_layer(
            layer,
            ExportChannel::Red,
            0,
            0,
            8,
            8,
            &flat(8, 8, 1),
            CompressionMethod::Raw
        )
        .unwrap();

    let bytes = encode(&document);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));
    let section = decoder.parse_layer_mask_section().unwrap().unwrap();

    let parsed = &section.layers[0];
    assert_eq!(parsed.utf16_name.as_deref(), Some(name));
    assert_eq!(parsed.display_name(), name);

    // the ASCII fallback is a lossy transliteration and is not
    // consulted while the Unicode block is present
    assert_eq!(parsed.name, "? ? ?");
}

#[test]
fn spot_alpha_channels_roundtrip() {
    const W: usize = 64;
    const H: usize = 48;

    let document =
        ExportDocument::new(W as u32, H as u32, BitDepth::Eight, ExportColorMode::RGB).unwrap();

    let layer = document.add_layer("base").unwrap();
    document
        .update_layer(
            layer,
            ExportChannel::Red,
            0,
            0,
            W as i32,
            H as i32,
            &flat(W, H, 10),
            CompressionMethod::Raw
        )
        .unwrap();

    let spots: [(&str, [u16; 4], u8); 4] = [
        ("Spot Red", [65535, 0, 0, 0], 100),
        ("Spot Green", [0, 65535, 0, 0], 75),
        ("Spot Blue", [0, 0, 65535, 0], 50),
        ("Mix", [20000, 50000, 30000, 0], 100)
    ];
    for (i, (name, color, opacity)) in spots.iter().enumerate() {
        let index = document
            .add_alpha_channel(
                name,
                color[0],
                color[1],
                color[2],
                color[3],
                *opacity,
                AlphaChannelMode::Spot
            )
            .unwrap();
        assert_eq!(index, i as u32);
        document
            .update_channel(index, &flat(W, H, (40 + i) as u8))
            .unwrap();
    }

    let bytes = encode(&document);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));

    // merged channel count is the three color planes plus the spots
    let merged = decoder.parse_image_data().unwrap().unwrap();
    assert_eq!(merged.plane_count(), 3 + 4);
    for (i, plane) in merged.planes[3..].iter().enumerate() {
        assert_eq!(plane, &flat(W, H, (40 + i) as u8));
    }

    let resources = decoder.parse_image_resources().unwrap();
    assert_eq!(resources.alpha_channels.len(), 4);
    for (channel, (name, color, opacity)) in resources.alpha_channels.iter().zip(&spots) {
        assert_eq!(channel.ascii_name, *name);
        assert_eq!(channel.unicode_name.as_deref(), Some(*name));
        assert_eq!(channel.color, *color);
        assert_eq!(channel.opacity, u16::from(*opacity));
        assert_eq!(channel.mode, AlphaChannelMode::Spot);
    }
}

#[test]
fn metadata_lands_in_xmp() {
    let document = ExportDocument::new(4, 4, BitDepth::Eight, ExportColorMode::RGB).unwrap();
    let layer = document.add_layer("only").unwrap();
    document
        .update_layer(
            layer,
            ExportChannel::Red,
            0,
            0,
            4,
            4,
            &flat(4, 4, 0),
            CompressionMethod::Raw
        )
        .unwrap();
    document.add_metadata("MyAttribute", "MyValue");
    document.add_metadata("Escaped", "a < b & c");

    let bytes = encode(&document);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));
    let resources = decoder.parse_image_resources().unwrap();

    let xmp = resources.xmp_metadata.unwrap();
    assert!(xmp.contains("<xmp:MyAttribute>MyValue</xmp:MyAttribute>"));
    assert!(xmp.contains("<xmp:Escaped>a &lt; b &amp; c</xmp:Escaped>"));
}

#[test]
fn duotone_documents_roundtrip_with_their_ink_payload() {
    const W: usize = 32;
    const H: usize = 32;

    // the ink specification is opaque to the codec and must come back
    // byte for byte
    let ink_payload: Vec<u8> = (0..64).map(|i| (i * 3) as u8).collect();
    let plane = flat(W, H, 130);

    let document =
        ExportDocument::new(W as u32, H as u32, BitDepth::Eight, ExportColorMode::Duotone)
            .unwrap();
    document.set_color_mode_data(&ink_payload);

    let layer = document.add_layer("tone").unwrap();
    document
        .update_layer(
            layer,
            ExportChannel::Gray,
            0,
            0,
            W as i32,
            H as i32,
            &plane,
            CompressionMethod::RLE
        )
        .unwrap();
    document.update_merged_duotone(&plane, None).unwrap();

    let bytes = encode(&document);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));
    decoder.decode_headers().unwrap();

    let parsed = decoder.document().unwrap();
    assert_eq!(parsed.color_mode(), ColorMode::Duotone);
    assert_eq!(parsed.channel_count(), 1);

    let color_mode_data = decoder.parse_color_mode_data().unwrap().unwrap();
    assert_eq!(color_mode_data.data, ink_payload);

    let mut section = decoder.parse_layer_mask_section().unwrap().unwrap();
    let parsed_layer = &mut section.layers[0];
    decoder.extract_layer(parsed_layer).unwrap();
    assert_eq!(parsed_layer.channels[0].data, plane);

    // duotone stays inside the consumer surface
    let merged = decoder.decode_merged().unwrap().unwrap();
    assert_eq!(merged.planes[0], plane);
}

#[test]
fn resource_blocks_rewrite_in_source_order() {
    let document = ExportDocument::new(4, 4, BitDepth::Eight, ExportColorMode::RGB).unwrap();
    let layer = document.add_layer("only").unwrap();
    document
        .update_layer(
            layer,
            ExportChannel::Red,
            0,
            0,
            4,
            4,
            &flat(4, 4, 0),
            CompressionMethod::Raw
        )
        .unwrap();
    document.add_metadata("Key", "Value");
    document
        .add_alpha_channel("extra", 1, 2, 3, 0, 100, AlphaChannelMode::Alpha)
        .unwrap();

    let bytes = encode(&document);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));
    let resources = decoder.parse_image_resources().unwrap();

    let mut rewritten = psd_core::bytestream::ByteWriter::new(std::io::Cursor::new(Vec::new()));
    resources.write_to(&mut rewritten).unwrap();
    let rewritten = rewritten.inner().into_inner();

    // the rewrite must reproduce the original section bytes: length
    // prefix and blocks in file order
    let section = decoder.document().unwrap().image_resources_section;
    let original_start = section.offset as usize - 4;
    let original_end = section.end() as usize;
    assert_eq!(rewritten, &bytes[original_start..original_end]);
}

#[test]
fn wide_documents_select_the_big_flavour() {
    const W: usize = 32_000;
    const H: usize = 100;

    let document =
        ExportDocument::new(W as u32, H as u32, BitDepth::Eight, ExportColorMode::Grayscale)
            .unwrap();
    let layer = document.add_layer("wide").unwrap();
    document
        .update_layer(
            layer,
            ExportChannel::Gray,
            0,
            0,
            W as i32,
            H as i32,
            &flat(W, H, 200),
            CompressionMethod::RLE
        )
        .unwrap();

    let bytes = encode(&document);

    // header version 2 marks the big document variant
    assert_eq!(&bytes[..4], b"8BPS");
    assert_eq!(&bytes[4..6], &[0, 2]);

    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));
    decoder.decode_headers().unwrap();
    assert_eq!(decoder.document().unwrap().version(), FileVersion::PSB);
    assert_eq!(decoder.dimensions(), Some((W, H)));

    // the layer section parses back through the 64 bit length fields
    let mut section = decoder.parse_layer_mask_section().unwrap().unwrap();
    assert_eq!(section.layer_count(), 1);
    let layer = &mut section.layers[0];
    decoder.extract_layer(layer).unwrap();
    assert_eq!(layer.channels[0].data, flat(W, H, 200));
}
