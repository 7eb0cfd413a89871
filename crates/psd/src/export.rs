/*
 * Copyright (c) 2024.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The export document builder.
//!
//! [`ExportDocument`] collects everything a write needs: layers with
//! planar channel data, extra alpha channels, the merged composite
//! and free form metadata. Indices are allocated from atomic
//! counters into fixed slot tables, so once [`add_layer`] or
//! [`add_alpha_channel`] has returned an index, independent threads
//! can fill disjoint slots in parallel through `&self`. Two writers
//! racing on the same slot serialize on the slot lock and the later
//! one wins; the contract is one writer per slot.
//!
//! [`add_layer`]: ExportDocument::add_layer
//! [`add_alpha_channel`]: ExportDocument::add_alpha_channel

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use psd_core::bit_depth::BitDepth;

use crate::constants::{AlphaChannelMode, ColorMode, CompressionMethod};
use crate::errors::PsdEncodeErrors;

/// Size of the preallocated layer table.
pub const MAX_LAYER_COUNT: u32 = 128;
/// Size of the preallocated alpha channel table.
pub const MAX_ALPHA_CHANNEL_COUNT: u32 = 128;

/// Color modes the export surface produces.
///
/// Transparency is always available regardless of the mode; it is
/// written as true layer transparency, not as an extra alpha channel.
///
/// Duotone documents carry their pixel data exactly like grayscale
/// ones; the ink specification is an opaque blob supplied through
/// [`ExportDocument::set_color_mode_data`] and passed through
/// untouched.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExportColorMode {
    Grayscale,
    RGB,
    Duotone
}

impl ExportColorMode {
    pub(crate) const fn color_mode(self) -> ColorMode {
        match self {
            ExportColorMode::Grayscale => ColorMode::Grayscale,
            ExportColorMode::RGB => ColorMode::RGB,
            ExportColorMode::Duotone => ColorMode::Duotone
        }
    }

    /// Number of color planes, the merged alpha and extra channels
    /// not included.
    pub(crate) const fn color_channels(self) -> usize {
        match self {
            ExportColorMode::Grayscale | ExportColorMode::Duotone => 1,
            ExportColorMode::RGB => 3
        }
    }
}

/// Channels addressable through [`ExportDocument::update_layer`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExportChannel {
    Gray,
    Red,
    Green,
    Blue,
    Alpha
}

impl ExportChannel {
    /// Slot inside the per layer channel table.
    pub(crate) const fn slot(self) -> usize {
        match self {
            ExportChannel::Gray | ExportChannel::Red => 0,
            ExportChannel::Green => 1,
            ExportChannel::Blue => 2,
            ExportChannel::Alpha => 3
        }
    }

    const fn fits(self, mode: ExportColorMode) -> bool {
        match self {
            ExportChannel::Gray => {
                matches!(mode, ExportColorMode::Grayscale | ExportColorMode::Duotone)
            }
            ExportChannel::Alpha => true,
            _ => matches!(mode, ExportColorMode::RGB)
        }
    }
}

/// Planar sample types the builder accepts.
///
/// Sealed to the three types the format stores: `u8`, `u16` and
/// `f32`. Samples are converted to big endian bytes on the way in, so
/// the expensive copies happen on the callers' threads rather than
/// during the single threaded write.
pub trait Sample: private::Sealed + Copy {
    /// Bytes one sample occupies on disk.
    const SIZE: usize;

    fn be_bytes(samples: &[Self]) -> Vec<u8>;
}

mod private {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for f32 {}
}

impl Sample for u8 {
    const SIZE: usize = 1;

    fn be_bytes(samples: &[Self]) -> Vec<u8> {
        samples.to_vec()
    }
}

impl Sample for u16 {
    const SIZE: usize = 2;

    fn be_bytes(samples: &[Self]) -> Vec<u8> {
        let mut out = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            out.extend_from_slice(&sample.to_be_bytes());
        }
        out
    }
}

impl Sample for f32 {
    const SIZE: usize = 4;

    fn be_bytes(samples: &[Self]) -> Vec<u8> {
        let mut out = Vec::with_capacity(samples.len() * 4);
        for sample in samples {
            out.extend_from_slice(&sample.to_be_bytes());
        }
        out
    }
}

#[derive(Clone)]
pub(crate) struct ExportChannelData {
    pub compression: CompressionMethod,
    /// Big endian sample bytes, `width x height` of the layer bounds.
    pub data:        Vec<u8>
}

#[derive(Default)]
pub(crate) struct ExportLayer {
    pub claimed: bool,
    pub name:    String,
    pub top:     i32,
    pub left:    i32,
    pub bottom:  i32,
    pub right:   i32,
    /// Gray/red, green, blue, alpha.
    pub channels: [Option<ExportChannelData>; 4]
}

impl ExportLayer {
    pub(crate) const fn width(&self) -> usize {
        self.right.wrapping_sub(self.left) as usize
    }

    pub(crate) const fn height(&self) -> usize {
        self.bottom.wrapping_sub(self.top) as usize
    }
}

#[derive(Default)]
pub(crate) struct ExportAlphaChannel {
    pub claimed: bool,
    pub name:    String,
    pub color:   [u16; 4],
    /// 0..=100.
    pub opacity: u8,
    pub mode:    Option<AlphaChannelMode>,
    /// Big endian sample bytes, canvas sized. May stay empty; the
    /// writer substitutes a black plane.
    pub data:    Vec<u8>
}

pub(crate) struct MergedImage {
    /// Color planes then the optional transparency, big endian bytes.
    pub planes: [Option<Vec<u8>>; 4]
}

/// Builder state for writing a document.
///
/// See the [module documentation](self) for the concurrency contract.
pub struct ExportDocument {
    pub(crate) width:      u32,
    pub(crate) height:     u32,
    pub(crate) depth:      BitDepth,
    pub(crate) color_mode: ExportColorMode,

    pub(crate) layers:      Vec<Mutex<ExportLayer>>,
    layer_counter:          AtomicU32,
    pub(crate) alpha_channels: Vec<Mutex<ExportAlphaChannel>>,
    alpha_counter:          AtomicU32,

    pub(crate) merged:   Mutex<MergedImage>,
    pub(crate) metadata: Mutex<Vec<(String, String)>>,
    /// Opaque palette or duotone ink payload, written verbatim.
    pub(crate) color_mode_data: Mutex<Vec<u8>>
}

impl ExportDocument {
    /// Create a builder for a `width` x `height` document.
    ///
    /// The export surface accepts 8, 16 and 32 bits per channel and
    /// the RGB, grayscale and duotone color modes.
    pub fn new(
        width: u32, height: u32, depth: BitDepth, color_mode: ExportColorMode
    ) -> Result<ExportDocument, PsdEncodeErrors> {
        if !depth.has_whole_byte_samples() {
            return Err(PsdEncodeErrors::UnsupportedBitDepth(depth.bit_count()));
        }
        if width == 0 || height == 0 || width > 300_000 || height > 300_000 {
            return Err(PsdEncodeErrors::BadDimensions(
                width as usize,
                height as usize
            ));
        }

        Ok(ExportDocument {
            width,
            height,
            depth,
            color_mode,
            layers: (0..MAX_LAYER_COUNT)
                .map(|_| Mutex::new(ExportLayer::default()))
                .collect(),
            layer_counter: AtomicU32::new(0),
            alpha_channels: (0..MAX_ALPHA_CHANNEL_COUNT)
                .map(|_| Mutex::new(ExportAlphaChannel::default()))
                .collect(),
            alpha_counter: AtomicU32::new(0),
            merged: Mutex::new(MergedImage {
                planes: [None, None, None, None]
            }),
            metadata: Mutex::new(Vec::new()),
            color_mode_data: Mutex::new(Vec::new())
        })
    }

    pub(crate) const fn depth(&self) -> BitDepth {
        self.depth
    }

    /// Number of layers claimed so far.
    pub fn layer_count(&self) -> u32 {
        self.layer_counter.load(Ordering::Acquire).min(MAX_LAYER_COUNT)
    }

    /// Number of alpha channels claimed so far.
    pub fn alpha_channel_count(&self) -> u32 {
        self.alpha_counter
            .load(Ordering::Acquire)
            .min(MAX_ALPHA_CHANNEL_COUNT)
    }

    /// Claim the next layer slot and name it.
    ///
    /// The returned index is stable; channel updates through it can
    /// run on any thread.
    pub fn add_layer(&self, name: &str) -> Result<u32, PsdEncodeErrors> {
        let index = self.layer_counter.fetch_add(1, Ordering::AcqRel);
        if index >= MAX_LAYER_COUNT {
            return Err(PsdEncodeErrors::TooManyLayers(MAX_LAYER_COUNT));
        }

        let mut slot = self.layers[index as usize].lock().unwrap();
        slot.claimed = true;
        slot.name = name.to_string();
        Ok(index)
    }

    /// Set one channel of a claimed layer.
    ///
    /// `data` holds `right - left` by `bottom - top` planar samples in
    /// row major order; the layer takes the given bounds. The sample
    /// type must match the document depth.
    #[allow(clippy::too_many_arguments)]
    pub fn update_layer<S: Sample>(
        &self, index: u32, channel: ExportChannel, left: i32, top: i32, right: i32, bottom: i32,
        data: &[S], compression: CompressionMethod
    ) -> Result<(), PsdEncodeErrors> {
        if S::SIZE != self.depth.size_of() {
            return Err(PsdEncodeErrors::MismatchedSampleType);
        }
        if !channel.fits(self.color_mode) {
            return Err(PsdEncodeErrors::InvalidChannel(
                "channel does not exist in the document color mode"
            ));
        }

        let width = i64::from(right) - i64::from(left);
        let height = i64::from(bottom) - i64::from(top);
        if width < 0 || height < 0 || width >= (1 << 30) || height >= (1 << 30) {
            return Err(PsdEncodeErrors::BadLayerBounds);
        }
        let expected = (width * height) as usize;
        if data.len() != expected {
            return Err(PsdEncodeErrors::MismatchedPlaneSize(expected, data.len()));
        }

        let mut slot = self.layer_slot(index)?;
        slot.top = top;
        slot.left = left;
        slot.bottom = bottom;
        slot.right = right;
        slot.channels[channel.slot()] = Some(ExportChannelData {
            compression,
            data: S::be_bytes(data)
        });
        Ok(())
    }

    /// Claim the next alpha channel slot.
    ///
    /// `color` components and `opacity` (0..=100) describe how the
    /// channel is displayed; spot channels carry their ink color
    /// here.
    #[allow(clippy::too_many_arguments)]
    pub fn add_alpha_channel(
        &self, name: &str, r: u16, g: u16, b: u16, b2: u16, opacity: u8, mode: AlphaChannelMode
    ) -> Result<u32, PsdEncodeErrors> {
        let index = self.alpha_counter.fetch_add(1, Ordering::AcqRel);
        if index >= MAX_ALPHA_CHANNEL_COUNT {
            return Err(PsdEncodeErrors::TooManyAlphaChannels(
                MAX_ALPHA_CHANNEL_COUNT
            ));
        }

        let mut slot = self.alpha_channels[index as usize].lock().unwrap();
        slot.claimed = true;
        slot.name = name.to_string();
        slot.color = [r, g, b, b2];
        slot.opacity = opacity.min(100);
        slot.mode = Some(mode);
        Ok(index)
    }

    /// Set the canvas sized plane of a claimed alpha channel.
    pub fn update_channel<S: Sample>(
        &self, index: u32, data: &[S]
    ) -> Result<(), PsdEncodeErrors> {
        if S::SIZE != self.depth.size_of() {
            return Err(PsdEncodeErrors::MismatchedSampleType);
        }
        let expected = (self.width as usize) * (self.height as usize);
        if data.len() != expected {
            return Err(PsdEncodeErrors::MismatchedPlaneSize(expected, data.len()));
        }

        let count = self.alpha_channel_count();
        if index >= count {
            return Err(PsdEncodeErrors::InvalidChannelIndex(index));
        }
        let mut slot = self.alpha_channels[index as usize].lock().unwrap();
        slot.data = S::be_bytes(data);
        Ok(())
    }

    /// Set the merged composite of an RGB document.
    ///
    /// The merged image is optional; without one the writer exports
    /// black planes instead.
    pub fn update_merged_image<S: Sample>(
        &self, r: &[S], g: &[S], b: &[S], a: Option<&[S]>
    ) -> Result<(), PsdEncodeErrors> {
        if self.color_mode != ExportColorMode::RGB {
            return Err(PsdEncodeErrors::InvalidChannel(
                "merged RGB planes on a non RGB document"
            ));
        }
        self.set_merged(&[Some(r), Some(g), Some(b), a])
    }

    /// Set the merged composite of a grayscale document.
    pub fn update_merged_monochrome<S: Sample>(
        &self, gray: &[S], a: Option<&[S]>
    ) -> Result<(), PsdEncodeErrors> {
        if self.color_mode != ExportColorMode::Grayscale {
            return Err(PsdEncodeErrors::InvalidChannel(
                "merged monochrome plane on a non grayscale document"
            ));
        }
        self.set_merged(&[Some(gray), None, None, a])
    }

    /// Set the merged composite of a duotone document.
    ///
    /// Duotone pixel data is a single plane, like grayscale; the inks
    /// applied to it come from the color mode payload.
    pub fn update_merged_duotone<S: Sample>(
        &self, plane: &[S], a: Option<&[S]>
    ) -> Result<(), PsdEncodeErrors> {
        if self.color_mode != ExportColorMode::Duotone {
            return Err(PsdEncodeErrors::InvalidChannel(
                "merged duotone plane on a non duotone document"
            ));
        }
        self.set_merged(&[Some(plane), None, None, a])
    }

    /// Supply the raw color mode data payload.
    ///
    /// Required for duotone documents, whose ink specification lives
    /// here and is carried through without interpretation. Documents
    /// in other export color modes leave this empty.
    pub fn set_color_mode_data(&self, data: &[u8]) {
        let mut payload = self.color_mode_data.lock().unwrap();
        payload.clear();
        payload.extend_from_slice(data);
    }

    fn set_merged<S: Sample>(
        &self, planes: &[Option<&[S]>; 4]
    ) -> Result<(), PsdEncodeErrors> {
        if S::SIZE != self.depth.size_of() {
            return Err(PsdEncodeErrors::MismatchedSampleType);
        }
        let expected = (self.width as usize) * (self.height as usize);
        for plane in planes.iter().flatten() {
            if plane.len() != expected {
                return Err(PsdEncodeErrors::MismatchedPlaneSize(expected, plane.len()));
            }
        }

        let mut merged = self.merged.lock().unwrap();
        for (stored, plane) in merged.planes.iter_mut().zip(planes) {
            *stored = plane.map(S::be_bytes);
        }
        Ok(())
    }

    /// Attach a key/value pair that will surface in the document's
    /// XMP metadata as `<xmp:Key>Value</xmp:Key>`.
    pub fn add_metadata(&self, key: &str, value: &str) {
        let mut metadata = self.metadata.lock().unwrap();
        metadata.push((key.to_string(), value.to_string()));
    }

    fn layer_slot(
        &self, index: u32
    ) -> Result<std::sync::MutexGuard<'_, ExportLayer>, PsdEncodeErrors> {
        if index >= self.layer_count() {
            return Err(PsdEncodeErrors::InvalidLayerIndex(index));
        }
        let slot = self.layers[index as usize].lock().unwrap();
        if !slot.claimed {
            return Err(PsdEncodeErrors::InvalidLayerIndex(index));
        }
        Ok(slot)
    }
}
