/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::vec::Vec;
use core::fmt::Formatter;

use crate::bytestream::ByteReaderTrait;

/// Enumeration of possible methods to seek within an I/O object.
///
/// It is analogous to [SeekFrom](std::io::SeekFrom) in the std
/// library but also usable in no-std crates.
#[derive(Copy, PartialEq, Eq, Clone, Debug)]
pub enum ByteSeek {
    /// Sets the offset to the provided number of bytes.
    Start(u64),

    /// Sets the offset to the size of this object plus the specified
    /// number of bytes.
    End(i64),

    /// Sets the offset to the current position plus the specified
    /// number of bytes.
    Current(i64)
}

impl ByteSeek {
    /// Convert to [SeekFrom](std::io::SeekFrom) from the `std::io`
    /// library.
    #[cfg(feature = "std")]
    pub(crate) fn to_std_seek(self) -> std::io::SeekFrom {
        match self {
            ByteSeek::Start(pos) => std::io::SeekFrom::Start(pos),
            ByteSeek::End(pos) => std::io::SeekFrom::End(pos),
            ByteSeek::Current(pos) => std::io::SeekFrom::Current(pos)
        }
    }
}

/// Errors produced by byte sources and sinks.
pub enum ByteIoError {
    /// A standard library error.
    /// Only available with the `std` feature.
    #[cfg(feature = "std")]
    StdIoError(std::io::Error),
    /// An error converting from one integer type to another.
    TryFromIntError(core::num::TryFromIntError),
    /// Not enough bytes to satisfy a read.
    // found, requested
    NotEnoughBytes(usize, usize),
    /// The sink cannot hold the bytes we want to write.
    NotEnoughBuffer(usize, usize),
    /// A generic error.
    Generic(&'static str),
    /// An error that occurred during a seek operation.
    SeekError(&'static str)
}

impl core::fmt::Debug for ByteIoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            #[cfg(feature = "std")]
            ByteIoError::StdIoError(err) => {
                writeln!(f, "Underlying I/O error {err}")
            }
            ByteIoError::TryFromIntError(err) => {
                writeln!(f, "Cannot convert to int {err}")
            }
            ByteIoError::NotEnoughBytes(found, expected) => {
                writeln!(f, "Not enough bytes, expected {expected} but found {found}")
            }
            ByteIoError::NotEnoughBuffer(expected, found) => {
                writeln!(
                    f,
                    "Not enough buffer to write {expected} bytes, buffer size is {found}"
                )
            }
            ByteIoError::Generic(err) => {
                writeln!(f, "Generic I/O error: {err}")
            }
            ByteIoError::SeekError(err) => {
                writeln!(f, "Seek error: {err}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for ByteIoError {
    fn from(value: std::io::Error) -> Self {
        ByteIoError::StdIoError(value)
    }
}

impl From<core::num::TryFromIntError> for ByteIoError {
    fn from(value: core::num::TryFromIntError) -> Self {
        ByteIoError::TryFromIntError(value)
    }
}

impl From<&'static str> for ByteIoError {
    fn from(value: &'static str) -> Self {
        ByteIoError::Generic(value)
    }
}

/// The reader wrapper.
///
/// This wraps anything that implements [`ByteReaderTrait`] and
/// extends the core trait methods with endian aware integer reads,
/// so that each codec doesn't have to provide its own.
pub struct ByteReader<T> {
    inner: T
}

impl<T: ByteReaderTrait> ByteReader<T> {
    /// Create a new reader from a source that implements the
    /// [`ByteReaderTrait`].
    pub fn new(source: T) -> ByteReader<T> {
        ByteReader { inner: source }
    }

    /// Destroy this reader returning the underlying source of the
    /// bytes.
    #[inline(always)]
    pub fn consume(self) -> T {
        self.inner
    }

    /// Skip ahead ignoring `num` bytes.
    ///
    /// # Returns
    ///  - `Ok(u64)`: The new position from the start of the stream.
    #[inline(always)]
    pub fn skip(&mut self, num: usize) -> Result<u64, ByteIoError> {
        self.inner.seek_to(ByteSeek::Current(num as i64))
    }

    /// Move back `num` bytes from the current position.
    #[inline(always)]
    pub fn rewind(&mut self, num: usize) -> Result<u64, ByteIoError> {
        self.inner.seek_to(ByteSeek::Current(-(num as i64)))
    }

    /// Move around the stream of bytes.
    ///
    /// Analogous to the [std::io::Seek] trait, implemented here to
    /// also work in a `no_std` environment.
    #[inline(always)]
    pub fn seek(&mut self, from: ByteSeek) -> Result<u64, ByteIoError> {
        self.inner.seek_to(from)
    }

    /// Move the cursor to exactly `position` bytes from the start of
    /// the stream.
    #[inline]
    pub fn set_position(&mut self, position: u64) -> Result<(), ByteIoError> {
        self.seek(ByteSeek::Start(position))?;
        Ok(())
    }

    /// Read a single byte from the underlying stream.
    ///
    /// On error this returns `0`, which cannot be told apart from a
    /// real zero byte; for that there is [`Self::read_u8_err`].
    #[inline(always)]
    pub fn read_u8(&mut self) -> u8 {
        self.inner.read_byte_no_error()
    }

    /// Read a single byte returning an error if the read cannot be
    /// satisfied.
    #[inline(always)]
    pub fn read_u8_err(&mut self) -> Result<u8, ByteIoError> {
        let mut buf = [0];
        self.inner.read_const_bytes(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a compile time known number of bytes returning them or an
    /// error.
    #[inline(always)]
    pub fn read_fixed_bytes_or_error<const N: usize>(&mut self) -> Result<[u8; N], ByteIoError> {
        let mut byte_store: [u8; N] = [0; N];
        match self.inner.read_const_bytes(&mut byte_store) {
            Ok(_) => Ok(byte_store),
            Err(e) => Err(e)
        }
    }

    /// Read a compile time known number of bytes, returning an array
    /// of zeros if that is impossible.
    #[inline(always)]
    pub fn read_fixed_bytes_or_zero<const N: usize>(&mut self) -> [u8; N] {
        let mut byte_store: [u8; N] = [0; N];
        self.inner.read_const_bytes_no_error(&mut byte_store);
        byte_store
    }

    /// Return true if the underlying source can no longer produce
    /// bytes.
    #[inline(always)]
    pub fn eof(&mut self) -> Result<bool, ByteIoError> {
        self.inner.is_eof()
    }

    /// Return the current position of the inner reader.
    #[inline(always)]
    pub fn position(&mut self) -> Result<u64, ByteIoError> {
        self.inner.cursor_position()
    }

    /// Fill `buf` entirely, failing if that cannot be satisfied.
    ///
    /// Similar to [std::io::Read::read_exact].
    pub fn read_exact_bytes(&mut self, buf: &mut [u8]) -> Result<(), ByteIoError> {
        self.inner.read_exact_bytes(buf)
    }

    /// Read some bytes from the inner reader, returning the number of
    /// bytes read.
    ///
    /// Similar to [std::io::Read::read].
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, ByteIoError> {
        self.inner.read_bytes(buf)
    }

    /// Append everything left in the stream to `sink`.
    pub fn read_remaining(&mut self, sink: &mut Vec<u8>) -> Result<usize, ByteIoError> {
        self.inner.read_remaining(sink)
    }
}

enum Mode {
    // Big endian
    BE,
    // Little Endian
    LE
}

macro_rules! get_single_type {
    ($name:tt,$name2:tt,$name3:tt,$name4:tt,$name5:tt,$name6:tt,$int_type:tt) => {
        impl<T: ByteReaderTrait> ByteReader<T> {
            #[inline(always)]
            fn $name(&mut self, mode: Mode) -> $int_type {
                const SIZE_OF_VAL: usize = core::mem::size_of::<$int_type>();

                let mut space = [0; SIZE_OF_VAL];

                self.inner.read_const_bytes_no_error(&mut space);

                match mode {
                    Mode::BE => $int_type::from_be_bytes(space),
                    Mode::LE => $int_type::from_le_bytes(space)
                }
            }

            #[inline(always)]
            fn $name2(&mut self, mode: Mode) -> Result<$int_type, ByteIoError> {
                const SIZE_OF_VAL: usize = core::mem::size_of::<$int_type>();

                let mut space = [0; SIZE_OF_VAL];

                match self.inner.read_const_bytes(&mut space) {
                    Ok(_) => match mode {
                        Mode::BE => Ok($int_type::from_be_bytes(space)),
                        Mode::LE => Ok($int_type::from_le_bytes(space))
                    },
                    Err(e) => Err(e)
                }
            }

            #[doc=concat!("Read ",stringify!($int_type)," as a big endian integer")]
            #[doc=concat!("Returning an error if the underlying buffer cannot support a ",stringify!($int_type)," read.")]
            #[inline]
            pub fn $name3(&mut self) -> Result<$int_type, ByteIoError> {
                self.$name2(Mode::BE)
            }

            #[doc=concat!("Read ",stringify!($int_type)," as a little endian integer")]
            #[doc=concat!("Returning an error if the underlying buffer cannot support a ",stringify!($int_type)," read.")]
            #[inline]
            pub fn $name4(&mut self) -> Result<$int_type, ByteIoError> {
                self.$name2(Mode::LE)
            }

            #[doc=concat!("Read ",stringify!($int_type)," as a big endian integer")]
            #[doc=concat!("Returning 0 if the underlying buffer does not have enough bytes for a ",stringify!($int_type)," read.")]
            #[inline(always)]
            pub fn $name5(&mut self) -> $int_type {
                self.$name(Mode::BE)
            }

            #[doc=concat!("Read ",stringify!($int_type)," as a little endian integer")]
            #[doc=concat!("Returning 0 if the underlying buffer does not have enough bytes for a ",stringify!($int_type)," read.")]
            #[inline(always)]
            pub fn $name6(&mut self) -> $int_type {
                self.$name(Mode::LE)
            }
        }
    };
}

get_single_type!(
    get_u16_inner_or_default,
    get_u16_inner_or_die,
    get_u16_be_err,
    get_u16_le_err,
    get_u16_be,
    get_u16_le,
    u16
);
get_single_type!(
    get_u32_inner_or_default,
    get_u32_inner_or_die,
    get_u32_be_err,
    get_u32_le_err,
    get_u32_be,
    get_u32_le,
    u32
);
get_single_type!(
    get_u64_inner_or_default,
    get_u64_inner_or_die,
    get_u64_be_err,
    get_u64_le_err,
    get_u64_be,
    get_u64_le,
    u64
);

#[cfg(feature = "std")]
impl<T> std::io::Read for ByteReader<T>
where
    T: ByteReaderTrait
{
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        use std::io::ErrorKind;
        self.read_bytes(buf)
            .map_err(|e| std::io::Error::new(ErrorKind::Other, format!("{e:?}")))
    }
}
