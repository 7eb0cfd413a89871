/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Plane compression codecs.
//!
//! Each plane of channel data is stored behind a 16 bit tag selecting
//! one of four methods: raw, PackBits run length encoding, zlib, or
//! zlib over delta filtered rows. The functions here work on whole
//! planes with the tag already consumed; decoders and encoders are
//! pure functions parameterized by bit depth.
//!
//! Two depth specific quirks live here and nowhere else:
//!
//! - 16 bit prediction deltas big endian `u16` values per row, not
//!   bytes.
//! - 32 bit prediction first groups each row's bytes by significance
//!   (all high bytes, then the next, down to the low bytes) and only
//!   then applies a byte wise delta. Skipping the transpose produces
//!   planes Photoshop will not open.

use psd_core::bit_depth::BitDepth;
use zune_inflate::{DeflateDecoder, DeflateEncoder, DeflateOptions};

use crate::constants::{CompressionMethod, FileVersion};
use crate::errors::{PsdDecodeErrors, PsdEncodeErrors};

/// Number of bytes a decoded `width` x `height` plane occupies.
pub fn plane_size(depth: BitDepth, width: usize, height: usize) -> usize {
    width * height * depth.size_of()
}

/// Decode one plane of channel data.
///
/// `data` is the compressed payload without its compression tag. For
/// run length encoded planes the scanline count table is expected at
/// the start of `data`, which is how layer channels store it.
pub fn decode_plane(
    data: &[u8], method: CompressionMethod, depth: BitDepth, width: usize, height: usize,
    version: FileVersion
) -> Result<Vec<u8>, PsdDecodeErrors> {
    if !depth.has_whole_byte_samples() {
        return Err(PsdDecodeErrors::UnsupportedBitDepth(depth.bit_count()));
    }
    let expected = plane_size(depth, width, height);
    if expected == 0 {
        return Ok(Vec::new());
    }

    match method {
        CompressionMethod::Raw => {
            if data.len() < expected {
                return Err(PsdDecodeErrors::Truncated);
            }
            Ok(data[..expected].to_vec())
        }
        CompressionMethod::RLE => {
            let count_size = version.rle_count_size();
            let table_len = height * count_size;

            if data.len() < table_len {
                return Err(PsdDecodeErrors::Truncated);
            }
            let (table, payload) = data.split_at(table_len);

            let counts: Vec<usize> = table
                .chunks_exact(count_size)
                .map(|c| match version {
                    FileVersion::PSD => usize::from(u16::from_be_bytes([c[0], c[1]])),
                    FileVersion::PSB => u32::from_be_bytes([c[0], c[1], c[2], c[3]]) as usize
                })
                .collect();

            rle_decode_rows(payload, &counts, width * depth.size_of(), height)
        }
        CompressionMethod::Zip => {
            let plane = inflate(data, expected)?;
            Ok(plane)
        }
        CompressionMethod::ZipWithPrediction => {
            let mut plane = inflate(data, expected)?;
            undo_prediction(&mut plane, depth, width);
            Ok(plane)
        }
    }
}

/// Encode one plane of channel data.
///
/// Returns the payload without a compression tag; for run length
/// encoding the scanline count table is included at the start, sized
/// for `version`.
pub fn encode_plane(
    plane: &[u8], method: CompressionMethod, depth: BitDepth, width: usize, height: usize,
    version: FileVersion
) -> Result<Vec<u8>, PsdEncodeErrors> {
    if !depth.has_whole_byte_samples() {
        return Err(PsdEncodeErrors::UnsupportedBitDepth(depth.bit_count()));
    }
    let expected = plane_size(depth, width, height);
    if plane.len() != expected {
        return Err(PsdEncodeErrors::MismatchedPlaneSize(expected, plane.len()));
    }

    match method {
        CompressionMethod::Raw => Ok(plane.to_vec()),
        CompressionMethod::RLE => {
            let (counts, payload) = rle_encode_rows(plane, width * depth.size_of());

            let count_size = version.rle_count_size();
            let mut out = Vec::with_capacity(counts.len() * count_size + payload.len());
            for count in counts {
                match version {
                    FileVersion::PSD => out.extend_from_slice(&(count as u16).to_be_bytes()),
                    FileVersion::PSB => out.extend_from_slice(&count.to_be_bytes())
                }
            }
            out.extend_from_slice(&payload);
            Ok(out)
        }
        CompressionMethod::Zip => Ok(DeflateEncoder::new(plane).encode_zlib()),
        CompressionMethod::ZipWithPrediction => {
            let mut filtered = plane.to_vec();
            apply_prediction(&mut filtered, depth, width);
            Ok(DeflateEncoder::new(&filtered).encode_zlib())
        }
    }
}

/// PackBits encode every scanline of a plane.
///
/// Returns the per row compressed byte counts and the concatenated
/// row payloads. Rows are encoded independently, so no run ever
/// crosses a scanline boundary; the image data section uses this to
/// build its combined count table over all planes.
pub fn rle_encode_rows(plane: &[u8], row_bytes: usize) -> (Vec<u32>, Vec<u8>) {
    if row_bytes == 0 {
        return (Vec::new(), Vec::new());
    }

    let mut counts = Vec::with_capacity(plane.len() / row_bytes);
    let mut payload = Vec::new();

    for row in plane.chunks_exact(row_bytes) {
        let compressed = packbits_encode(row);
        counts.push(compressed.len() as u32);
        payload.extend_from_slice(&compressed);
    }

    (counts, payload)
}

/// Decode PackBits rows whose compressed sizes are given by `counts`.
pub fn rle_decode_rows(
    payload: &[u8], counts: &[usize], row_bytes: usize, rows: usize
) -> Result<Vec<u8>, PsdDecodeErrors> {
    if counts.len() != rows {
        return Err(PsdDecodeErrors::BadRle("scanline count table size mismatch"));
    }

    let mut out = Vec::with_capacity(rows * row_bytes);
    let mut position = 0_usize;

    for &count in counts {
        let end = position
            .checked_add(count)
            .filter(|end| *end <= payload.len())
            .ok_or(PsdDecodeErrors::Truncated)?;

        let row = packbits_decode(&payload[position..end], row_bytes)?;
        out.extend_from_slice(&row);
        position = end;
    }

    Ok(out)
}

/// Decode a single PackBits stream into exactly `expected` bytes.
pub fn packbits_decode(input: &[u8], expected: usize) -> Result<Vec<u8>, PsdDecodeErrors> {
    let mut out = Vec::with_capacity(expected);
    let mut position = 0_usize;

    while out.len() < expected {
        let Some(&control) = input.get(position) else {
            return Err(PsdDecodeErrors::Truncated);
        };
        position += 1;

        if control < 128 {
            // copy the next control + 1 bytes literally
            let count = usize::from(control) + 1;
            let end = position + count;
            if end > input.len() {
                return Err(PsdDecodeErrors::Truncated);
            }
            if out.len() + count > expected {
                return Err(PsdDecodeErrors::BadRle("literal run crosses scanline end"));
            }
            out.extend_from_slice(&input[position..end]);
            position = end;
        } else if control > 128 {
            // replicate the next byte 257 - control times
            let count = 257 - usize::from(control);
            let Some(&value) = input.get(position) else {
                return Err(PsdDecodeErrors::Truncated);
            };
            position += 1;
            if out.len() + count > expected {
                return Err(PsdDecodeErrors::BadRle("repeat run crosses scanline end"));
            }
            out.resize(out.len() + count, value);
        }
        // control == 128 is a no-op
    }

    Ok(out)
}

/// PackBits encode a single scanline.
pub fn packbits_encode(row: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(row.len() + row.len() / 128 + 1);
    let mut i = 0_usize;

    while i < row.len() {
        let mut run = 1_usize;
        while i + run < row.len() && row[i + run] == row[i] && run < 128 {
            run += 1;
        }

        if run >= 3 {
            out.push((257 - run) as u8);
            out.push(row[i]);
            i += run;
            continue;
        }

        // collect literals until a run of three shows up or the
        // literal limit is hit
        let start = i;
        while i < row.len() && i - start < 128 {
            if i + 2 < row.len() && row[i] == row[i + 1] && row[i] == row[i + 2] && i > start {
                break;
            }
            i += 1;
        }
        out.push((i - start - 1) as u8);
        out.extend_from_slice(&row[start..i]);
    }

    out
}

fn inflate(data: &[u8], expected: usize) -> Result<Vec<u8>, PsdDecodeErrors> {
    let options = DeflateOptions::default().set_size_hint(expected);
    let mut decoder = DeflateDecoder::new_with_options(data, options);

    let mut plane = decoder.decode_zlib().map_err(PsdDecodeErrors::from)?;
    if plane.len() < expected {
        return Err(PsdDecodeErrors::Truncated);
    }
    // tolerate zero padding past the plane
    plane.truncate(expected);
    Ok(plane)
}

/// Delta filter a plane in place, per row.
pub(crate) fn apply_prediction(plane: &mut [u8], depth: BitDepth, width: usize) {
    let row_bytes = width * depth.size_of();
    if row_bytes == 0 {
        return;
    }

    for row in plane.chunks_exact_mut(row_bytes) {
        match depth {
            BitDepth::Eight => delta_encode_bytes(row),
            BitDepth::Sixteen => {
                // deltas are computed between big endian u16 samples,
                // not between bytes
                let mut previous = 0_u16;
                for sample in row.chunks_exact_mut(2) {
                    let value = u16::from_be_bytes([sample[0], sample[1]]);
                    sample.copy_from_slice(&value.wrapping_sub(previous).to_be_bytes());
                    previous = value;
                }
            }
            BitDepth::ThirtyTwo => {
                transpose_row(row, width);
                delta_encode_bytes(row);
            }
            _ => unreachable!()
        }
    }
}

/// Reverse the delta filter in place, per row.
pub(crate) fn undo_prediction(plane: &mut [u8], depth: BitDepth, width: usize) {
    let row_bytes = width * depth.size_of();
    if row_bytes == 0 {
        return;
    }

    for row in plane.chunks_exact_mut(row_bytes) {
        match depth {
            BitDepth::Eight => delta_decode_bytes(row),
            BitDepth::Sixteen => {
                let mut previous = 0_u16;
                for sample in row.chunks_exact_mut(2) {
                    let delta = u16::from_be_bytes([sample[0], sample[1]]);
                    previous = previous.wrapping_add(delta);
                    sample.copy_from_slice(&previous.to_be_bytes());
                }
            }
            BitDepth::ThirtyTwo => {
                delta_decode_bytes(row);
                untranspose_row(row, width);
            }
            _ => unreachable!()
        }
    }
}

fn delta_encode_bytes(row: &mut [u8]) {
    for i in (1..row.len()).rev() {
        row[i] = row[i].wrapping_sub(row[i - 1]);
    }
}

fn delta_decode_bytes(row: &mut [u8]) {
    for i in 1..row.len() {
        row[i] = row[i].wrapping_add(row[i - 1]);
    }
}

/// Group a row of big endian 32 bit samples by byte significance: all
/// high bytes first, down to all low bytes.
fn transpose_row(row: &mut [u8], width: usize) {
    let mut transposed = vec![0_u8; row.len()];
    for (i, sample) in row.chunks_exact(4).enumerate() {
        transposed[i] = sample[0];
        transposed[width + i] = sample[1];
        transposed[2 * width + i] = sample[2];
        transposed[3 * width + i] = sample[3];
    }
    row.copy_from_slice(&transposed);
}

fn untranspose_row(row: &mut [u8], width: usize) {
    let mut samples = vec![0_u8; row.len()];
    for i in 0..width {
        samples[i * 4] = row[i];
        samples[i * 4 + 1] = row[width + i];
        samples[i * 4 + 2] = row[2 * width + i];
        samples[i * 4 + 3] = row[3 * width + i];
    }
    row.copy_from_slice(&samples);
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: usize = 47;
    const HEIGHT: usize = 11;

    fn pattern(bytes: usize) -> Vec<u8> {
        (0..bytes)
            .map(|i| ((i * 7) ^ (i >> 3)) as u8)
            .collect()
    }

    #[test]
    fn packbits_single_byte() {
        assert_eq!(packbits_encode(&[42]), vec![0, 42]);
    }

    #[test]
    fn packbits_run_and_literals() {
        assert_eq!(packbits_encode(&[0xAA; 5]), vec![0xFC, 0xAA]);
        assert_eq!(packbits_encode(&[1, 2, 3, 4]), vec![3, 1, 2, 3, 4]);
        assert_eq!(
            packbits_encode(&[1, 2, 3, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA]),
            vec![2, 1, 2, 3, 0xFC, 0xAA]
        );
    }

    #[test]
    fn packbits_decode_skips_noop() {
        // 128 in the control position does nothing
        let out = packbits_decode(&[128, 255, 7], 2).unwrap();
        assert_eq!(out, vec![7, 7]);
    }

    #[test]
    fn packbits_decode_rejects_overlong_runs() {
        // a 5 byte repeat into a 3 byte row must not silently spill
        assert!(packbits_decode(&[0xFC, 0xAA], 3).is_err());
    }

    #[test]
    fn packbits_roundtrips_long_runs() {
        let mut row = vec![9_u8; 300];
        row.extend(pattern(257));
        let compressed = packbits_encode(&row);
        assert_eq!(packbits_decode(&compressed, row.len()).unwrap(), row);
    }

    #[test]
    fn rle_rows_never_share_runs() {
        // two identical rows compress to two independent streams
        let plane = vec![5_u8; 32];
        let (counts, payload) = rle_encode_rows(&plane, 16);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0] as usize + counts[1] as usize, payload.len());

        let sizes: Vec<usize> = counts.iter().map(|c| *c as usize).collect();
        let decoded = rle_decode_rows(&payload, &sizes, 16, 2).unwrap();
        assert_eq!(decoded, plane);
    }

    #[test]
    fn prediction_roundtrips_per_depth() {
        for depth in [BitDepth::Eight, BitDepth::Sixteen, BitDepth::ThirtyTwo] {
            let plane = pattern(plane_size(depth, WIDTH, HEIGHT));
            let mut filtered = plane.clone();
            apply_prediction(&mut filtered, depth, WIDTH);
            assert_ne!(filtered, plane);
            undo_prediction(&mut filtered, depth, WIDTH);
            assert_eq!(filtered, plane);
        }
    }

    #[test]
    fn prediction_16_bit_works_on_samples() {
        // one row, two samples: 0x0102 then 0x0305, delta must be
        // 0x0102 and 0x0203 in big endian
        let mut row = vec![0x01, 0x02, 0x03, 0x05];
        apply_prediction(&mut row, BitDepth::Sixteen, 2);
        assert_eq!(row, vec![0x01, 0x02, 0x02, 0x03]);
    }

    #[test]
    fn prediction_32_bit_transposes_before_delta() {
        // two samples AABBCCDD and AABBCCDE: after grouping by
        // significance the row is AA AA BB BB CC CC DD DE, the delta
        // keeps the first byte and differences the rest
        let mut row = vec![0xAA, 0xBB, 0xCC, 0xDD, 0xAA, 0xBB, 0xCC, 0xDE];
        apply_prediction(&mut row, BitDepth::ThirtyTwo, 2);
        assert_eq!(
            row,
            vec![0xAA, 0x00, 0x11, 0x00, 0x11, 0x00, 0x11, 0x01]
        );
    }

    #[test]
    fn all_methods_roundtrip_at_all_depths() {
        let methods = [
            CompressionMethod::Raw,
            CompressionMethod::RLE,
            CompressionMethod::Zip,
            CompressionMethod::ZipWithPrediction
        ];
        for depth in [BitDepth::Eight, BitDepth::Sixteen, BitDepth::ThirtyTwo] {
            let plane = pattern(plane_size(depth, WIDTH, HEIGHT));
            for method in methods {
                for version in [FileVersion::PSD, FileVersion::PSB] {
                    let encoded =
                        encode_plane(&plane, method, depth, WIDTH, HEIGHT, version).unwrap();
                    let decoded =
                        decode_plane(&encoded, method, depth, WIDTH, HEIGHT, version).unwrap();
                    assert_eq!(decoded, plane, "{method:?} {depth:?} {version:?}");
                }
            }
        }
    }

    #[test]
    fn zip_emits_a_zlib_header() {
        let plane = pattern(plane_size(BitDepth::Eight, WIDTH, HEIGHT));
        let encoded = encode_plane(
            &plane,
            CompressionMethod::Zip,
            BitDepth::Eight,
            WIDTH,
            HEIGHT,
            FileVersion::PSD
        )
        .unwrap();
        assert_eq!(encoded[0], 0x78);
    }

    #[test]
    fn truncated_streams_error_out() {
        let plane = pattern(plane_size(BitDepth::Eight, WIDTH, HEIGHT));
        let err = decode_plane(
            &plane[..10],
            CompressionMethod::Raw,
            BitDepth::Eight,
            WIDTH,
            HEIGHT,
            FileVersion::PSD
        );
        assert!(matches!(err, Err(PsdDecodeErrors::Truncated)));
    }
}
