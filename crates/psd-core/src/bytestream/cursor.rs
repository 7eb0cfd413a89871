/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! In-memory byte sources and sinks.
//!
//! [`ByteCursor`] wraps any `AsRef<[u8]>` and is the preferred way to
//! decode from a buffer. [`MemSink`] is a growable, seekable `Vec`
//! backed sink for encoding into memory.
//!
//! With the `std` feature on, both types implement the `std::io`
//! traits and pick up the bytestream traits through the blanket
//! implementations; without it they implement the traits directly.

use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use crate::bytestream::traits::{ByteReaderTrait, ByteWriterTrait};
#[cfg(not(feature = "std"))]
use crate::bytestream::ByteIoError;
use crate::bytestream::ByteSeek;

/// An in-memory reader over anything that dereferences to bytes.
pub struct ByteCursor<T: AsRef<[u8]>> {
    inner:    T,
    position: u64
}

impl<T: AsRef<[u8]>> ByteCursor<T> {
    /// Create a new cursor positioned at the start of `inner`.
    pub const fn new(inner: T) -> ByteCursor<T> {
        ByteCursor { inner, position: 0 }
    }

    /// Return the wrapped buffer.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Return a reference to the wrapped buffer.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    fn remaining(&self) -> &[u8] {
        let bytes = self.inner.as_ref();
        let start = (self.position as usize).min(bytes.len());
        &bytes[start..]
    }

    fn read_bytes_impl(&mut self, buf: &mut [u8]) -> usize {
        let remaining = self.remaining();
        let can_read = remaining.len().min(buf.len());
        buf[..can_read].copy_from_slice(&remaining[..can_read]);
        self.position += can_read as u64;
        can_read
    }

    fn seek_impl(&mut self, from: ByteSeek) -> Result<u64, &'static str> {
        let len = self.inner.as_ref().len() as i64;
        let target = match from {
            ByteSeek::Start(pos) => pos as i64,
            ByteSeek::End(off) => len + off,
            ByteSeek::Current(off) => self.position as i64 + off
        };
        if target < 0 {
            return Err("cannot seek before the start of the buffer");
        }
        self.position = target as u64;
        Ok(self.position)
    }
}

#[cfg(not(feature = "std"))]
impl<T: AsRef<[u8]>> ByteReaderTrait for ByteCursor<T> {
    #[inline(always)]
    fn read_byte_no_error(&mut self) -> u8 {
        let mut buf = [0];
        self.read_bytes_impl(&mut buf);
        buf[0]
    }

    #[inline(always)]
    fn read_exact_bytes(&mut self, buf: &mut [u8]) -> Result<(), ByteIoError> {
        let remaining = self.remaining().len();
        if remaining < buf.len() {
            return Err(ByteIoError::NotEnoughBytes(remaining, buf.len()));
        }
        self.read_bytes_impl(buf);
        Ok(())
    }

    #[inline(always)]
    fn read_const_bytes<const N: usize>(&mut self, buf: &mut [u8; N]) -> Result<(), ByteIoError> {
        self.read_exact_bytes(buf)
    }

    #[inline(always)]
    fn read_const_bytes_no_error<const N: usize>(&mut self, buf: &mut [u8; N]) {
        let _ = self.read_exact_bytes(buf);
    }

    #[inline(always)]
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, ByteIoError> {
        Ok(self.read_bytes_impl(buf))
    }

    #[inline(always)]
    fn seek_to(&mut self, from: ByteSeek) -> Result<u64, ByteIoError> {
        self.seek_impl(from).map_err(ByteIoError::SeekError)
    }

    #[inline(always)]
    fn is_eof(&mut self) -> Result<bool, ByteIoError> {
        Ok(self.remaining().is_empty())
    }

    #[inline(always)]
    fn cursor_position(&mut self) -> Result<u64, ByteIoError> {
        Ok(self.position)
    }

    fn read_remaining(&mut self, sink: &mut Vec<u8>) -> Result<usize, ByteIoError> {
        let remaining = self.remaining();
        sink.extend_from_slice(remaining);
        let read = remaining.len();
        self.position += read as u64;
        Ok(read)
    }
}

#[cfg(feature = "std")]
impl<T: AsRef<[u8]>> std::io::Read for ByteCursor<T> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.read_bytes_impl(buf))
    }
}

#[cfg(feature = "std")]
impl<T: AsRef<[u8]>> std::io::BufRead for ByteCursor<T> {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        let bytes = self.inner.as_ref();
        let start = (self.position as usize).min(bytes.len());
        Ok(&bytes[start..])
    }

    fn consume(&mut self, amt: usize) {
        self.position += amt as u64;
    }
}

#[cfg(feature = "std")]
impl<T: AsRef<[u8]>> std::io::Seek for ByteCursor<T> {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        let from = match pos {
            std::io::SeekFrom::Start(p) => ByteSeek::Start(p),
            std::io::SeekFrom::End(p) => ByteSeek::End(p),
            std::io::SeekFrom::Current(p) => ByteSeek::Current(p)
        };
        self.seek_impl(from)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    }

    fn stream_position(&mut self) -> std::io::Result<u64> {
        Ok(self.position)
    }
}

/// A growable in-memory sink with a movable write cursor.
///
/// Writing past the end extends the buffer; seeking back and writing
/// overwrites in place, which is what length backpatching needs.
#[derive(Default)]
pub struct MemSink {
    buf:      Vec<u8>,
    position: usize
}

impl MemSink {
    /// Create an empty sink.
    pub fn new() -> MemSink {
        MemSink::default()
    }

    /// Create an empty sink with `capacity` bytes preallocated.
    pub fn with_capacity(capacity: usize) -> MemSink {
        MemSink {
            buf:      Vec::with_capacity(capacity),
            position: 0
        }
    }

    /// Return the written bytes, consuming the sink.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// View the written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    fn write_impl(&mut self, buf: &[u8]) {
        // seeking past the end then writing zero-fills the gap,
        // matching file semantics
        if self.position > self.buf.len() {
            self.buf.resize(self.position, 0);
        }
        let overlap = (self.buf.len() - self.position).min(buf.len());
        self.buf[self.position..self.position + overlap].copy_from_slice(&buf[..overlap]);
        self.buf.extend_from_slice(&buf[overlap..]);
        self.position += buf.len();
    }

    fn seek_impl(&mut self, from: ByteSeek) -> Result<u64, &'static str> {
        let len = self.buf.len() as i64;
        let target = match from {
            ByteSeek::Start(pos) => pos as i64,
            ByteSeek::End(off) => len + off,
            ByteSeek::Current(off) => self.position as i64 + off
        };
        if target < 0 {
            return Err("cannot seek before the start of the sink");
        }
        self.position = target as usize;
        Ok(self.position as u64)
    }
}

#[cfg(not(feature = "std"))]
impl ByteWriterTrait for MemSink {
    #[inline(always)]
    fn write_bytes(&mut self, buf: &[u8]) -> Result<usize, ByteIoError> {
        self.write_impl(buf);
        Ok(buf.len())
    }

    #[inline(always)]
    fn write_all_bytes(&mut self, buf: &[u8]) -> Result<(), ByteIoError> {
        self.write_impl(buf);
        Ok(())
    }

    #[inline(always)]
    fn write_const_bytes<const N: usize>(&mut self, buf: &[u8; N]) -> Result<(), ByteIoError> {
        self.write_impl(buf);
        Ok(())
    }

    fn flush_bytes(&mut self) -> Result<(), ByteIoError> {
        Ok(())
    }

    fn reserve_capacity(&mut self, size: usize) -> Result<(), ByteIoError> {
        self.buf.reserve(size);
        Ok(())
    }

    #[inline(always)]
    fn seek_to(&mut self, from: ByteSeek) -> Result<u64, ByteIoError> {
        self.seek_impl(from).map_err(ByteIoError::SeekError)
    }

    #[inline(always)]
    fn cursor_position(&mut self) -> Result<u64, ByteIoError> {
        Ok(self.position as u64)
    }
}

#[cfg(feature = "std")]
impl std::io::Write for MemSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_impl(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::io::Seek for MemSink {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        let from = match pos {
            std::io::SeekFrom::Start(p) => ByteSeek::Start(p),
            std::io::SeekFrom::End(p) => ByteSeek::End(p),
            std::io::SeekFrom::Current(p) => ByteSeek::Current(p)
        };
        self.seek_impl(from)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    }

    fn stream_position(&mut self) -> std::io::Result<u64> {
        Ok(self.position as u64)
    }
}
