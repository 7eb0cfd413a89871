/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The bytestream readers and writers used by the codec crates.
//!
//! Everything on disk in a Photoshop document is big endian, and the
//! four top level sections are addressed by absolute offsets, so both
//! the reader and the writer are random access. The writer grows the
//! reader's feature set by one primitive: length prefixes can be
//! backpatched once the size of the payload that follows them is
//! known.

mod cursor;
mod reader;
mod std_io;
mod traits;
mod writer;

pub use cursor::{ByteCursor, MemSink};
pub use reader::{ByteIoError, ByteReader, ByteSeek};
pub use traits::{ByteReaderTrait, ByteWriterTrait};
pub use writer::ByteWriter;
