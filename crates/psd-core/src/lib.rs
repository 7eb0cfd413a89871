//! Core routines shared by the psd decoder and encoder
//!
//! This crate provides the pieces the codec crates build on:
//!
//! - A bytestream reader and writer with endian aware reads, writes
//!   and backpatching of length prefixes
//! - Bit depth information for image planes
//! - Decoder options
//! - A logging facade that compiles away when disabled
//!
//! The library is `#[no_std]` with the `alloc` crate needed for `Vec`
//! storage of decoded bytes.
//!
//! # Features
//! - `std`: Implements the stream traits for `std::io` types.
//! - `log`: Routes the log macros to the `log` crate.
#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;

pub mod bit_depth;
pub mod bytestream;
pub mod log;
pub mod options;
