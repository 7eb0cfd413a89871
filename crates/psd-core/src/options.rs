//! Decoder options
//!
//! This module exposes a struct with the knobs shared by the decoding
//! routines. The same `DecoderOptions` value can be reused across
//! documents.

/// Decoder options.
///
/// The limits exist to keep hostile files from requesting absurd
/// allocations; the defaults admit the largest dimensions the big
/// document variant of the format allows.
#[derive(Debug, Copy, Clone)]
pub struct DecoderOptions {
    max_width:  usize,
    max_height: usize
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_width:  300_000,
            max_height: 300_000
        }
    }
}

impl DecoderOptions {
    /// Maximum width for which the decoder will not try to decode
    /// documents wider than the specified width.
    ///
    /// - Default value: 300 000
    pub const fn max_width(&self) -> usize {
        self.max_width
    }

    /// Maximum height for which the decoder will not try to decode
    /// documents taller than the specified height.
    ///
    /// - Default value: 300 000
    pub const fn max_height(&self) -> usize {
        self.max_height
    }

    /// Set the maximum document width the decoder accepts.
    pub fn set_max_width(mut self, width: usize) -> Self {
        self.max_width = width;
        self
    }

    /// Set the maximum document height the decoder accepts.
    pub fn set_max_height(mut self, height: usize) -> Self {
        self.max_height = height;
        self
    }
}
