/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use crate::bytestream::{ByteIoError, ByteSeek, ByteWriterTrait};

enum Mode {
    // Big endian
    BE,
    // Little Endian
    LE
}

/// Encapsulates a byte writer with support for endian aware writes
/// and backpatching.
///
/// Several on-disk structures in a Photoshop document start with a
/// length prefix whose value is only known after the payload has been
/// emitted. The writer handles that with a pair of primitives:
/// [`position`](Self::position) remembers where a placeholder was
/// written and [`patch_u32_be`](Self::patch_u32_be) /
/// [`patch_u64_be`](Self::patch_u64_be) overwrite it later without
/// disturbing the current cursor.
pub struct ByteWriter<T: ByteWriterTrait> {
    sink:          T,
    bytes_written: usize
}

impl<T: ByteWriterTrait> ByteWriter<T> {
    /// Create a new bytestream writer.
    pub fn new(sink: T) -> ByteWriter<T> {
        ByteWriter {
            sink,
            bytes_written: 0
        }
    }

    /// Write bytes from `buf` into the sink and return how many bytes
    /// were written.
    ///
    /// If you want to be sure that all bytes were written, see
    /// [`write_all`](Self::write_all).
    #[inline]
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, ByteIoError> {
        let bytes_written = self.sink.write_bytes(buf)?;
        self.bytes_written += bytes_written;
        Ok(bytes_written)
    }

    /// Write all bytes from `buf` into the sink, erroring out if not
    /// all could be written.
    pub fn write_all(&mut self, buf: &[u8]) -> Result<(), ByteIoError> {
        self.sink.write_all_bytes(buf)?;
        self.bytes_written += buf.len();
        Ok(())
    }

    /// Write a fixed compile time known number of bytes to the sink.
    #[inline]
    pub fn write_const_bytes<const N: usize>(&mut self, byte: &[u8; N]) -> Result<(), ByteIoError> {
        self.sink.write_const_bytes(byte)?;
        self.bytes_written += N;
        Ok(())
    }

    /// Write a single byte into the sink or error out if there is no
    /// space.
    #[inline]
    pub fn write_u8_err(&mut self, byte: u8) -> Result<(), ByteIoError> {
        self.write_const_bytes(&[byte])
    }

    /// Write a single byte into the sink, or don't write anything if
    /// the sink cannot accept it.
    #[inline]
    pub fn write_u8(&mut self, byte: u8) {
        let _ = self.write_const_bytes(&[byte]);
    }

    /// Return the number of bytes written through this writer.
    ///
    /// Backpatching placeholders does not count towards this value.
    pub const fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Return the current write position measured from the start of
    /// the sink.
    #[inline]
    pub fn position(&mut self) -> Result<u64, ByteIoError> {
        self.sink.cursor_position()
    }

    /// Move the write cursor to an absolute position.
    #[inline]
    pub fn set_position(&mut self, position: u64) -> Result<(), ByteIoError> {
        self.sink.seek_to(ByteSeek::Start(position))?;
        Ok(())
    }

    /// Overwrite the four bytes at `marker` with `value` in big
    /// endian, leaving the current cursor untouched.
    ///
    /// `marker` is a position previously returned by
    /// [`position`](Self::position).
    pub fn patch_u32_be(&mut self, marker: u64, value: u32) -> Result<(), ByteIoError> {
        self.patch_bytes(marker, &value.to_be_bytes())
    }

    /// Overwrite the eight bytes at `marker` with `value` in big
    /// endian, leaving the current cursor untouched.
    pub fn patch_u64_be(&mut self, marker: u64, value: u64) -> Result<(), ByteIoError> {
        self.patch_bytes(marker, &value.to_be_bytes())
    }

    /// Overwrite the two bytes at `marker` with `value` in big
    /// endian, leaving the current cursor untouched.
    pub fn patch_u16_be(&mut self, marker: u64, value: u16) -> Result<(), ByteIoError> {
        self.patch_bytes(marker, &value.to_be_bytes())
    }

    fn patch_bytes<const N: usize>(
        &mut self, marker: u64, bytes: &[u8; N]
    ) -> Result<(), ByteIoError> {
        let current = self.sink.cursor_position()?;
        self.sink.seek_to(ByteSeek::Start(marker))?;
        self.sink.write_const_bytes(bytes)?;
        self.sink.seek_to(ByteSeek::Start(current))?;
        Ok(())
    }

    /// Reserve some additional space to write.
    ///
    /// Growable sinks like `Vec<u8>` use this to avoid reallocation,
    /// everything else ignores it.
    pub fn reserve(&mut self, additional: usize) -> Result<(), ByteIoError> {
        self.sink.reserve_capacity(additional)
    }

    /// Ensure written bytes reach the underlying storage.
    pub fn flush(&mut self) -> Result<(), ByteIoError> {
        self.sink.flush_bytes()
    }

    /// Consume the writer and return the inner sink we were writing
    /// to.
    pub fn inner(self) -> T {
        self.sink
    }

    /// Return an immutable reference to the inner sink.
    pub fn inner_ref(&self) -> &T {
        &self.sink
    }

    /// Return a mutable reference to the inner sink.
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.sink
    }
}

macro_rules! write_single_type {
    ($name:tt,$name2:tt,$name3:tt,$name4:tt,$name5:tt,$name6:tt,$int_type:tt) => {
        impl<T: ByteWriterTrait> ByteWriter<T> {
            #[inline(always)]
            fn $name(&mut self, byte: $int_type, mode: Mode) -> Result<(), ByteIoError> {
                // mode is a compile time constant, the match folds
                // away after inlining.
                let bytes = match mode {
                    Mode::BE => byte.to_be_bytes(),
                    Mode::LE => byte.to_le_bytes()
                };
                self.write_const_bytes(&bytes)
            }

            #[inline(always)]
            fn $name2(&mut self, byte: $int_type, mode: Mode) {
                let bytes = match mode {
                    Mode::BE => byte.to_be_bytes(),
                    Mode::LE => byte.to_le_bytes()
                };
                let _ = self.write_const_bytes(&bytes);
            }

            #[doc=concat!("Write ",stringify!($int_type)," as a big endian integer")]
            #[doc=concat!("Returning an error if the underlying sink cannot support a ",stringify!($int_type)," write.")]
            #[inline]
            pub fn $name3(&mut self, byte: $int_type) -> Result<(), ByteIoError> {
                self.$name(byte, Mode::BE)
            }

            #[doc=concat!("Write ",stringify!($int_type)," as a little endian integer")]
            #[doc=concat!("Returning an error if the underlying sink cannot support a ",stringify!($int_type)," write.")]
            #[inline]
            pub fn $name4(&mut self, byte: $int_type) -> Result<(), ByteIoError> {
                self.$name(byte, Mode::LE)
            }

            #[doc=concat!("Write ",stringify!($int_type)," as a big endian integer")]
            #[doc=concat!("Or don't write anything if the sink cannot support a ",stringify!($int_type)," write.")]
            #[inline]
            pub fn $name5(&mut self, byte: $int_type) {
                self.$name2(byte, Mode::BE)
            }

            #[doc=concat!("Write ",stringify!($int_type)," as a little endian integer")]
            #[doc=concat!("Or don't write anything if the sink cannot support a ",stringify!($int_type)," write.")]
            #[inline]
            pub fn $name6(&mut self, byte: $int_type) {
                self.$name2(byte, Mode::LE)
            }
        }
    };
}

write_single_type!(
    write_u16_inner_or_die,
    write_u16_inner_or_none,
    write_u16_be_err,
    write_u16_le_err,
    write_u16_be,
    write_u16_le,
    u16
);

write_single_type!(
    write_u32_inner_or_die,
    write_u32_inner_or_none,
    write_u32_be_err,
    write_u32_le_err,
    write_u32_be,
    write_u32_le,
    u32
);

write_single_type!(
    write_u64_inner_or_die,
    write_u64_inner_or_none,
    write_u64_be_err,
    write_u64_le_err,
    write_u64_be,
    write_u64_le,
    u64
);

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use crate::bytestream::{ByteWriter, MemSink};

    #[test]
    fn patch_placeholder_keeps_cursor() {
        let mut writer = ByteWriter::new(MemSink::new());

        writer.write_u16_be_err(0xCAFE).unwrap();
        let marker = writer.position().unwrap();
        writer.write_u32_be_err(0).unwrap();
        writer.write_all(b"payload").unwrap();

        writer.patch_u32_be(marker, 7).unwrap();
        writer.write_u8_err(0xFF).unwrap();

        let bytes: Vec<u8> = writer.inner().into_inner();
        assert_eq!(&bytes[..2], &[0xCA, 0xFE]);
        assert_eq!(&bytes[2..6], &[0, 0, 0, 7]);
        assert_eq!(&bytes[6..13], b"payload");
        assert_eq!(bytes[13], 0xFF);
    }

    #[test]
    fn bytes_written_ignores_patches() {
        let mut writer = ByteWriter::new(MemSink::new());
        let marker = writer.position().unwrap();
        writer.write_u64_be_err(0).unwrap();
        writer.patch_u64_be(marker, u64::MAX).unwrap();

        assert_eq!(writer.bytes_written(), 8);
        assert_eq!(writer.inner().into_inner(), alloc::vec![0xFF; 8]);
    }
}
