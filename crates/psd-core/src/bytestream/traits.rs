/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Traits implemented by byte sources and byte sinks.
//!
//! The codec crates never talk to files or buffers directly, they go
//! through these traits. In-memory buffers get a dedicated
//! implementation via [`ByteCursor`](crate::bytestream::ByteCursor),
//! anything from `std::io` is covered by blanket implementations when
//! the `std` feature is on.

use alloc::vec::Vec;

use crate::bytestream::reader::{ByteIoError, ByteSeek};

/// A random access source of bytes.
pub trait ByteReaderTrait {
    /// Read a single byte, returning `0` when the source is
    /// exhausted.
    ///
    /// Hot loops use this to avoid a branch per byte; callers that
    /// must distinguish an error from a zero byte use
    /// [`read_exact_bytes`](Self::read_exact_bytes).
    fn read_byte_no_error(&mut self) -> u8;

    /// Fill `buf` completely or fail without advancing the position.
    fn read_exact_bytes(&mut self, buf: &mut [u8]) -> Result<(), ByteIoError>;

    /// Fill a compile time sized buffer completely or fail.
    ///
    /// Same contract as [`read_exact_bytes`](Self::read_exact_bytes),
    /// split out so implementations can turn it into a constant-size
    /// copy.
    fn read_const_bytes<const N: usize>(&mut self, buf: &mut [u8; N]) -> Result<(), ByteIoError>;

    /// Fill a compile time sized buffer, leaving it untouched on
    /// failure.
    fn read_const_bytes_no_error<const N: usize>(&mut self, buf: &mut [u8; N]);

    /// Read up to `buf.len()` bytes and return how many were read.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, ByteIoError>;

    /// Move the cursor and return the new position from the start.
    fn seek_to(&mut self, from: ByteSeek) -> Result<u64, ByteIoError>;

    /// True if no more bytes can be produced.
    ///
    /// May cost a syscall for file backed sources.
    fn is_eof(&mut self) -> Result<bool, ByteIoError>;

    /// The current position measured from the start of the source.
    fn cursor_position(&mut self) -> Result<u64, ByteIoError>;

    /// Append everything from the current position to `sink`,
    /// returning the number of bytes added.
    fn read_remaining(&mut self, sink: &mut Vec<u8>) -> Result<usize, ByteIoError>;
}

/// A random access sink of bytes.
///
/// Sinks must support seeking: section and channel length prefixes are
/// emitted as placeholders and patched once their payload has been
/// written.
pub trait ByteWriterTrait {
    /// Write some bytes, returning how many were accepted.
    fn write_bytes(&mut self, buf: &[u8]) -> Result<usize, ByteIoError>;

    /// Write all of `buf` or fail.
    fn write_all_bytes(&mut self, buf: &[u8]) -> Result<(), ByteIoError>;

    /// Write a compile time sized buffer or fail.
    fn write_const_bytes<const N: usize>(&mut self, buf: &[u8; N]) -> Result<(), ByteIoError>;

    /// Ensure previously written bytes reach the underlying storage.
    fn flush_bytes(&mut self) -> Result<(), ByteIoError>;

    /// Hint how many additional bytes are about to be written.
    ///
    /// Growable sinks can use it to reserve memory, everything else
    /// may ignore it.
    fn reserve_capacity(&mut self, size: usize) -> Result<(), ByteIoError>;

    /// Move the write cursor and return the new position from the
    /// start.
    fn seek_to(&mut self, from: ByteSeek) -> Result<u64, ByteIoError>;

    /// The current write position measured from the start of the sink.
    fn cursor_position(&mut self) -> Result<u64, ByteIoError>;
}
