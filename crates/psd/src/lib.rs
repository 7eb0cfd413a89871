//! A Photoshop PSD/PSB reader and writer
//!
//! This crate parses layered Photoshop documents into a section
//! oriented model and writes documents Photoshop will open back out.
//! It handles both the classic and the big document flavour, all four
//! plane compression methods at 8, 16 and 32 bits per channel, layer
//! masks, Unicode layer names, extra alpha channels and the merged
//! composite.
//!
//! Photoshop is a complicated format; this library does not try to
//! render it. Blending layers into a composite, ICC transforms and
//! the long tail of additional information blocks are out of scope;
//! unrecognized blocks survive a parse as opaque bytes.
//!
//! # Reading
//! ```no_run
//! use psd::PsdDecoder;
//! use psd_core::bytestream::ByteCursor;
//!
//! let bytes = std::fs::read("image.psd").unwrap();
//! let mut decoder = PsdDecoder::new(ByteCursor::new(&bytes));
//!
//! let mut layers = decoder.parse_layer_mask_section().unwrap().unwrap();
//! for layer in &mut layers.layers {
//!     decoder.extract_layer(layer).unwrap();
//!     println!("{}: {} channels", layer.display_name(), layer.channels.len());
//! }
//! ```
//!
//! # Writing
//! ```
//! use psd::{ExportChannel, ExportColorMode, ExportDocument, PsdEncoder};
//! use psd::constants::CompressionMethod;
//! use psd_core::bit_depth::BitDepth;
//!
//! let document = ExportDocument::new(4, 4, BitDepth::Eight, ExportColorMode::Grayscale).unwrap();
//! let layer = document.add_layer("noise").unwrap();
//! let plane: Vec<u8> = (0..16).collect();
//! document
//!     .update_layer(layer, ExportChannel::Gray, 0, 0, 4, 4, &plane, CompressionMethod::RLE)
//!     .unwrap();
//!
//! let mut sink = std::io::Cursor::new(Vec::new());
//! PsdEncoder::new(&document).encode(&mut sink).unwrap();
//! ```
pub extern crate psd_core;

pub use crate::decoder::PsdDecoder;
pub use crate::encoder::PsdEncoder;
pub use crate::export::{ExportChannel, ExportColorMode, ExportDocument, Sample};

pub mod compression;
pub mod constants;
pub mod decoder;
pub mod document;
pub mod encoder;
pub mod errors;
pub mod export;
pub mod header;
pub mod image_data;
pub mod layers;
pub mod resources;
pub mod strings;
