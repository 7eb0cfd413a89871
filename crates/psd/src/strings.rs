/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Pascal and Unicode string codecs.
//!
//! The format stores short ASCII strings as a length byte followed by
//! the payload, padded with zeros so the whole field hits an
//! alignment. Two alignments are in use and they are not
//! interchangeable: image resource block names pad to a multiple of
//! two, layer names inside the layer records pad to a multiple of
//! four. Using the wrong one silently shifts every parse that
//! follows.
//!
//! Unicode strings are a big endian u32 code unit count followed by
//! that many UTF-16BE code units.

use psd_core::bytestream::{ByteIoError, ByteReader, ByteReaderTrait, ByteWriter, ByteWriterTrait};

/// Read a Pascal string whose total field length, length byte
/// included, is padded to a multiple of two.
///
/// Used for image resource block names.
pub fn read_padded_2<T: ByteReaderTrait>(stream: &mut ByteReader<T>) -> Result<String, ByteIoError> {
    read_padded(stream, 2)
}

/// Read a Pascal string whose total field length, length byte
/// included, is padded to a multiple of four.
///
/// Used for the ASCII layer name in layer records.
pub fn read_padded_4<T: ByteReaderTrait>(stream: &mut ByteReader<T>) -> Result<String, ByteIoError> {
    read_padded(stream, 4)
}

/// Write a Pascal string padded to a multiple of two.
pub fn write_padded_2<T: ByteWriterTrait>(
    writer: &mut ByteWriter<T>, value: &str
) -> Result<(), ByteIoError> {
    write_padded(writer, value, 2)
}

/// Write a Pascal string padded to a multiple of four.
pub fn write_padded_4<T: ByteWriterTrait>(
    writer: &mut ByteWriter<T>, value: &str
) -> Result<(), ByteIoError> {
    write_padded(writer, value, 4)
}

/// Number of bytes [`write_padded_2`] emits for `value`.
pub fn padded_len_2(value: &str) -> usize {
    padded_len(value, 2)
}

/// Number of bytes [`write_padded_4`] emits for `value`.
pub fn padded_len_4(value: &str) -> usize {
    padded_len(value, 4)
}

fn padded_len(value: &str, pad: usize) -> usize {
    let total = 1 + value.len().min(255);
    total.next_multiple_of(pad)
}

fn read_padded<T: ByteReaderTrait>(
    stream: &mut ByteReader<T>, pad: usize
) -> Result<String, ByteIoError> {
    let length = usize::from(stream.read_u8_err()?);

    let mut raw = vec![0_u8; length];
    stream.read_exact_bytes(&mut raw)?;

    let total = 1 + length;
    let padding = total.next_multiple_of(pad) - total;
    stream.skip(padding)?;

    Ok(String::from_utf8_lossy(&raw).into_owned())
}

fn write_padded<T: ByteWriterTrait>(
    writer: &mut ByteWriter<T>, value: &str, pad: usize
) -> Result<(), ByteIoError> {
    let bytes = value.as_bytes();
    let length = bytes.len().min(255);

    writer.write_u8_err(length as u8)?;
    writer.write_all(&bytes[..length])?;

    let total = 1 + length;
    for _ in total..total.next_multiple_of(pad) {
        writer.write_u8_err(0)?;
    }
    Ok(())
}

/// Read a counted UTF-16BE string.
///
/// Unpaired surrogates are replaced rather than failing the parse;
/// a name should never take the whole document down.
pub fn read_unicode_string<T: ByteReaderTrait>(
    stream: &mut ByteReader<T>
) -> Result<String, ByteIoError> {
    let count = stream.get_u32_be_err()? as usize;

    let mut units = Vec::with_capacity(count);
    for _ in 0..count {
        units.push(stream.get_u16_be_err()?);
    }
    // Photoshop sometimes writes a trailing null inside the count
    if units.last() == Some(&0) {
        units.pop();
    }

    Ok(char::decode_utf16(units.into_iter())
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect())
}

/// Write a counted UTF-16BE string.
pub fn write_unicode_string<T: ByteWriterTrait>(
    writer: &mut ByteWriter<T>, value: &str
) -> Result<(), ByteIoError> {
    let units: Vec<u16> = value.encode_utf16().collect();

    writer.write_u32_be_err(units.len() as u32)?;
    for unit in units {
        writer.write_u16_be_err(unit)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use psd_core::bytestream::{ByteCursor, ByteReader, ByteWriter, MemSink};

    use super::*;

    fn write_2(value: &str) -> Vec<u8> {
        let mut writer = ByteWriter::new(MemSink::new());
        write_padded_2(&mut writer, value).unwrap();
        writer.inner().into_inner()
    }

    fn write_4(value: &str) -> Vec<u8> {
        let mut writer = ByteWriter::new(MemSink::new());
        write_padded_4(&mut writer, value).unwrap();
        writer.inner().into_inner()
    }

    #[test]
    fn the_two_paddings_differ() {
        // 1 + 4 = 5 bytes of content, so the variants land on
        // different field sizes
        let two = write_2("Test");
        let four = write_4("Test");

        assert_eq!(two.len(), 6);
        assert_eq!(four.len(), 8);
        assert_eq!(two.len(), padded_len_2("Test"));
        assert_eq!(four.len(), padded_len_4("Test"));

        assert_eq!(two[0], 4);
        assert_eq!(&two[1..5], b"Test");
        assert_eq!(&four[5..], &[0, 0, 0]);
    }

    #[test]
    fn empty_string_still_occupies_padding() {
        assert_eq!(write_2(""), vec![0, 0]);
        assert_eq!(write_4(""), vec![0, 0, 0, 0]);
    }

    #[test]
    fn roundtrip_both_variants() {
        for name in ["", "a", "ab", "abc", "abcd", "layer name"] {
            let mut reader = ByteReader::new(ByteCursor::new(write_2(name)));
            assert_eq!(read_padded_2(&mut reader).unwrap(), name);
            assert_eq!(reader.position().unwrap() as usize, padded_len_2(name));

            let mut reader = ByteReader::new(ByteCursor::new(write_4(name)));
            assert_eq!(read_padded_4(&mut reader).unwrap(), name);
            assert_eq!(reader.position().unwrap() as usize, padded_len_4(name));
        }
    }

    #[test]
    fn unicode_string_roundtrips_surrogates() {
        // the clef is a surrogate pair in UTF-16
        let name = "π ☃ 𝄞";

        let mut writer = ByteWriter::new(MemSink::new());
        write_unicode_string(&mut writer, name).unwrap();
        let bytes = writer.inner().into_inner();

        let count = u32::from_be_bytes(bytes[..4].try_into().unwrap()) as usize;
        assert_eq!(count, name.encode_utf16().count());

        let mut reader = ByteReader::new(ByteCursor::new(bytes));
        assert_eq!(read_unicode_string(&mut reader).unwrap(), name);
    }

    #[test]
    fn long_names_truncate_to_255_bytes() {
        let name = "x".repeat(300);
        let bytes = write_2(&name);
        assert_eq!(bytes[0], 255);
        assert_eq!(bytes.len(), 256);
    }
}
