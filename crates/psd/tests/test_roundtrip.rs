/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Write documents through the export builder, read them back and
//! compare every decoded plane bit for bit.

use psd::constants::{channel_type, BlendMode, ColorMode, CompressionMethod, FileVersion};
use psd::layers::Layer;
use psd::{ExportChannel, ExportColorMode, ExportDocument, PsdDecoder, PsdEncoder};
use psd_core::bit_depth::BitDepth;
use psd_core::bytestream::ByteCursor;

const SIZE: usize = 256;

fn multiply_data() -> Vec<u8> {
    plane8(|x, y| ((x * y >> 8) & 0xFF) as u8)
}

fn xor_data() -> Vec<u8> {
    plane8(|x, y| ((x ^ y) & 0xFF) as u8)
}

fn or_data() -> Vec<u8> {
    plane8(|x, y| ((x | y) & 0xFF) as u8)
}

fn plane8(f: impl Fn(usize, usize) -> u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(SIZE * SIZE);
    for y in 0..SIZE {
        for x in 0..SIZE {
            out.push(f(x, y));
        }
    }
    out
}

fn plane16(f: impl Fn(usize, usize) -> u16) -> Vec<u16> {
    let mut out = Vec::with_capacity(SIZE * SIZE);
    for y in 0..SIZE {
        for x in 0..SIZE {
            out.push(f(x, y));
        }
    }
    out
}

fn plane32(f: impl Fn(usize, usize) -> f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(SIZE * SIZE);
    for y in 0..SIZE {
        for x in 0..SIZE {
            out.push(f(x, y));
        }
    }
    out
}

fn be_bytes_u16(samples: &[u16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_be_bytes()).collect()
}

fn be_bytes_f32(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_be_bytes()).collect()
}

fn encode(document: &ExportDocument) -> Vec<u8> {
    let mut sink = std::io::Cursor::new(Vec::new());
    PsdEncoder::new(document).encode(&mut sink).unwrap();
    sink.into_inner()
}

fn channel_plane<'a>(layer: &'a Layer, kind: i16) -> &'a [u8] {
    &layer.channel(kind).unwrap().data
}

#[test]
fn roundtrip_rgb8_three_layers() {
    let mul = multiply_data();
    let xor = xor_data();
    let or = or_data();

    let document = ExportDocument::new(
        SIZE as u32,
        SIZE as u32,
        BitDepth::Eight,
        ExportColorMode::RGB
    )
    .unwrap();

    let bounds = (0, 0, SIZE as i32, SIZE as i32);
    let layer_planes: [[&[u8]; 4]; 3] = [
        [&mul, &mul, &mul, &mul],
        [&xor, &xor, &xor, &xor],
        [&mul, &xor, &or, &or]
    ];

    for (name, planes) in ["MUL", "XOR", "Mixed"].iter().zip(&layer_planes) {
        let index = document.add_layer(name).unwrap();
        for (channel, plane) in [
            ExportChannel::Red,
            ExportChannel::Green,
            ExportChannel::Blue,
            ExportChannel::Alpha
        ]
        .iter()
        .zip(planes)
        {
            document
                .update_layer(
                    index,
                    *channel,
                    bounds.0,
                    bounds.1,
                    bounds.2,
                    bounds.3,
                    plane,
                    CompressionMethod::Raw
                )
                .unwrap();
        }
    }
    document.update_merged_image(&mul, &xor, &or, None).unwrap();

    let bytes = encode(&document);

    // signature, version 1, merged channel count 3
    assert_eq!(&bytes[..4], b"8BPS");
    assert_eq!(&bytes[4..6], &[0, 1]);
    assert_eq!(&bytes[12..14], &[0, 3]);

    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));
    decoder.decode_headers().unwrap();

    let parsed = decoder.document().unwrap();
    assert_eq!(parsed.version(), FileVersion::PSD);
    assert_eq!(parsed.color_mode(), ColorMode::RGB);
    assert_eq!((parsed.width(), parsed.height()), (SIZE, SIZE));
    assert_eq!(parsed.depth(), BitDepth::Eight);

    let mut section = decoder.parse_layer_mask_section().unwrap().unwrap();
    assert_eq!(section.layer_count(), 3);
    assert!(section.has_transparency_mask);

    for (layer, planes) in section.layers.iter_mut().zip(&layer_planes) {
        decoder.extract_layer(layer).unwrap();

        assert_eq!(layer.blend_mode, BlendMode::Normal);
        assert_eq!(layer.opacity, 255);
        assert_eq!(layer.flags, 0);
        assert_eq!(
            (layer.top, layer.left, layer.bottom, layer.right),
            (0, 0, SIZE as i32, SIZE as i32)
        );

        assert_eq!(channel_plane(layer, channel_type::RED), planes[0]);
        assert_eq!(channel_plane(layer, channel_type::GREEN), planes[1]);
        assert_eq!(channel_plane(layer, channel_type::BLUE), planes[2]);
        assert_eq!(
            channel_plane(layer, channel_type::TRANSPARENCY_MASK),
            planes[3]
        );
    }
    assert_eq!(section.layers[0].name, "MUL");
    assert_eq!(section.layers[1].name, "XOR");
    assert_eq!(section.layers[2].name, "Mixed");

    let merged = decoder.parse_image_data().unwrap().unwrap();
    assert_eq!(merged.plane_count(), 3);
    assert_eq!(merged.planes[0], mul);
    assert_eq!(merged.planes[1], xor);
    assert_eq!(merged.planes[2], or);
}

#[test]
fn roundtrip_grayscale16_mixed_compressions() {
    let mul = plane16(|x, y| (x * y) as u16);
    let xor = plane16(|x, y| (((x ^ y) * 256) & 0xFFFF) as u16);
    let and = plane16(|x, y| (((x & y) * 256) & 0xFFFF) as u16);
    let or = plane16(|x, y| (((x | y) * 256) & 0xFFFF) as u16);
    let checker = plane16(|x, y| if (x / 8 + y / 8) % 2 == 1 { 65535 } else { 32768 });

    let document = ExportDocument::new(
        SIZE as u32,
        SIZE as u32,
        BitDepth::Sixteen,
        ExportColorMode::Grayscale
    )
    .unwrap();

    let cases: [(&str, &[u16], CompressionMethod); 4] = [
        ("MUL", &mul, CompressionMethod::Raw),
        ("XOR", &xor, CompressionMethod::RLE),
        ("AND", &and, CompressionMethod::Zip),
        ("OR", &or, CompressionMethod::ZipWithPrediction)
    ];
    for (name, plane, compression) in cases {
        let index = document.add_layer(name).unwrap();
        document
            .update_layer(
                index,
                ExportChannel::Gray,
                0,
                0,
                SIZE as i32,
                SIZE as i32,
                plane,
                compression
            )
            .unwrap();
        if name == "OR" {
            document
                .update_layer(
                    index,
                    ExportChannel::Alpha,
                    0,
                    0,
                    SIZE as i32,
                    SIZE as i32,
                    &checker,
                    CompressionMethod::ZipWithPrediction
                )
                .unwrap();
        }
    }
    document.update_merged_monochrome(&mul, None).unwrap();

    let bytes = encode(&document);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));

    assert_eq!(decoder.parse_image_data().unwrap().unwrap().planes[0], be_bytes_u16(&mul));
    assert_eq!(decoder.color_mode(), Some(ColorMode::Grayscale));
    assert_eq!(decoder.bit_depth(), Some(BitDepth::Sixteen));

    let mut section = decoder.parse_layer_mask_section().unwrap().unwrap();
    assert_eq!(section.layer_count(), 4);

    let expected: [(&[u16], CompressionMethod); 4] = [
        (&mul, CompressionMethod::Raw),
        (&xor, CompressionMethod::RLE),
        (&and, CompressionMethod::Zip),
        (&or, CompressionMethod::ZipWithPrediction)
    ];
    for (layer, (plane, compression)) in section.layers.iter_mut().zip(&expected) {
        decoder.extract_layer(layer).unwrap();

        let gray = layer.channel(channel_type::RED).unwrap();
        assert_eq!(gray.compression, Some(*compression));
        assert_eq!(gray.data, be_bytes_u16(plane));
    }

    let last = &section.layers[3];
    let alpha = last.channel(channel_type::TRANSPARENCY_MASK).unwrap();
    assert_eq!(alpha.compression, Some(CompressionMethod::ZipWithPrediction));
    assert_eq!(alpha.data, be_bytes_u16(&checker));
}

#[test]
fn roundtrip_rgb32_with_transpose() {
    let mul = plane32(|x, y| (1.0 / 65025.0) * (x * y) as f32);
    let xor = plane32(|x, y| (1.0 / 65025.0) * ((x ^ y) * 256) as f32);
    let or = plane32(|x, y| (1.0 / 65025.0) * ((x | y) * 256) as f32);
    let checker = plane32(|x, y| if (x / 8 + y / 8) % 2 == 1 { 1.0 } else { 0.5 });

    let document = ExportDocument::new(
        SIZE as u32,
        SIZE as u32,
        BitDepth::ThirtyTwo,
        ExportColorMode::RGB
    )
    .unwrap();

    let layer1 = document.add_layer("MUL pattern").unwrap();
    let layer2 = document.add_layer("Mixed pattern with transparency").unwrap();

    let b = (0, 0, SIZE as i32, SIZE as i32);
    let first: [(ExportChannel, &[f32], CompressionMethod); 3] = [
        (ExportChannel::Red, &mul, CompressionMethod::Raw),
        (ExportChannel::Green, &mul, CompressionMethod::RLE),
        (ExportChannel::Blue, &mul, CompressionMethod::Zip)
    ];
    let second: [(ExportChannel, &[f32], CompressionMethod); 4] = [
        (ExportChannel::Red, &mul, CompressionMethod::RLE),
        (ExportChannel::Green, &xor, CompressionMethod::Zip),
        (ExportChannel::Blue, &or, CompressionMethod::ZipWithPrediction),
        (ExportChannel::Alpha, &checker, CompressionMethod::Raw)
    ];
    for (channel, plane, compression) in first {
        document
            .update_layer(layer1, channel, b.0, b.1, b.2, b.3, plane, compression)
            .unwrap();
    }
    for (channel, plane, compression) in second {
        document
            .update_layer(layer2, channel, b.0, b.1, b.2, b.3, plane, compression)
            .unwrap();
    }
    document.update_merged_image(&mul, &xor, &checker, None).unwrap();

    let bytes = encode(&document);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));

    let mut section = decoder.parse_layer_mask_section().unwrap().unwrap();
    assert_eq!(section.layer_count(), 2);

    for layer in &mut section.layers {
        decoder.extract_layer(layer).unwrap();
    }

    let first_layer = &section.layers[0];
    assert_eq!(channel_plane(first_layer, channel_type::RED), be_bytes_f32(&mul));
    assert_eq!(channel_plane(first_layer, channel_type::GREEN), be_bytes_f32(&mul));
    assert_eq!(channel_plane(first_layer, channel_type::BLUE), be_bytes_f32(&mul));

    // the predicted plane must reproduce the IEEE-754 bytes exactly
    // after the inverse transpose
    let second_layer = &section.layers[1];
    let predicted = second_layer.channel(channel_type::BLUE).unwrap();
    assert_eq!(predicted.compression, Some(CompressionMethod::ZipWithPrediction));
    assert_eq!(predicted.data, be_bytes_f32(&or));
    assert_eq!(
        channel_plane(second_layer, channel_type::TRANSPARENCY_MASK),
        be_bytes_f32(&checker)
    );
}

#[test]
fn parallel_slot_updates() {
    let mul = multiply_data();
    let xor = xor_data();

    let document =
        ExportDocument::new(SIZE as u32, SIZE as u32, BitDepth::Eight, ExportColorMode::RGB)
            .unwrap();

    // indices are claimed up front, channel updates land from
    // independent threads
    let indices: Vec<u32> = (0..8)
        .map(|i| document.add_layer(&format!("layer {i}")).unwrap())
        .collect();

    std::thread::scope(|scope| {
        for &index in &indices {
            let document = &document;
            let mul = &mul;
            let xor = &xor;
            scope.spawn(move || {
                let plane = if index % 2 == 0 { mul } else { xor };
                for channel in [ExportChannel::Red, ExportChannel::Green, ExportChannel::Blue] {
                    document
                        .update_layer(
                            index,
                            channel,
                            0,
                            0,
                            SIZE as i32,
                            SIZE as i32,
                            plane,
                            CompressionMethod::RLE
                        )
                        .unwrap();
                }
            });
        }
    });

    let bytes = encode(&document);
    let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));
    let mut section = decoder.parse_layer_mask_section().unwrap().unwrap();
    assert_eq!(section.layer_count(), 8);

    for (i, layer) in section.layers.iter_mut().enumerate() {
        decoder.extract_layer(layer).unwrap();
        let expected = if i % 2 == 0 { &mul } else { &xor };
        assert_eq!(channel_plane(layer, channel_type::RED), expected.as_slice());
    }
}
