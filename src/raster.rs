//! The decoded image: channel-separated float samples plus the ancillary
//! metadata that survives decoding.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use num_enum::TryFromPrimitive;

use crate::chunk::{BitDepth, ChunkType, Header};

/// Gamma assumed when the stream carries no gAMA chunk.
pub const DEFAULT_GAMMA: f32 = 1.0 / 2.2;

/// The semantic meaning of one sample plane.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    Gray,
    Red,
    Green,
    Blue,
    Alpha,
    /// Raw palette indices of an indexed image that has not (yet) had its
    /// palette applied. Samples are whole index values, not normalized.
    PaletteIndex,
}

/// One named channel of `width * height` float samples in row-major order.
///
/// Samples are normalized to `[0, 1]`, except for [`Channel::PaletteIndex`]
/// where each sample is the index itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageComponent {
    pub channel: Channel,
    pub width: u32,
    pub height: u32,
    pub samples: Vec<f32>,
}

impl ImageComponent {
    pub(crate) fn new(channel: Channel, width: u32, height: u32, samples: Vec<f32>) -> Self {
        debug_assert_eq!(samples.len(), width as usize * height as usize);
        Self { channel, width, height, samples }
    }

    /// The sample at `(x, y)`, with `(0, 0)` the top-left pixel.
    pub fn sample(&self, x: u32, y: u32) -> f32 {
        self.samples[y as usize * self.width as usize + x as usize]
    }
}

/// Primary chromaticities and white point from a cHRM chunk, as CIE x/y
/// coordinate pairs.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Chromaticity {
    pub white: (f32, f32),
    pub red: (f32, f32),
    pub green: (f32, f32),
    pub blue: (f32, f32),
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive)]
pub enum PhysicalUnit {
    Unknown = 0,
    Meter = 1,
}

/// Intended physical pixel density from a pHYs chunk.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PhysicalSize {
    /// Pixels per unit along the x axis.
    pub x: u32,
    /// Pixels per unit along the y axis.
    pub y: u32,
    pub unit: PhysicalUnit,
}

/// The PLTE color table: up to 256 RGB triples, each component in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub entries: Vec<[f32; 3]>,
}

impl Palette {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One entry of a suggested palette, RGBA in `[0, 1]` plus a relative usage
/// frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuggestedPaletteEntry {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
    pub frequency: u16,
}

/// A named sPLT suggested palette.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedPalette {
    pub name: String,
    /// 8 or 16, the bit depth the entries were stored at.
    pub sample_depth: u8,
    pub entries: Vec<SuggestedPaletteEntry>,
}

/// The fully decoded image: per-channel float planes plus metadata.
/// A failed decode never leaks one of these.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRaster {
    pub header: Header,
    pub width: u32,
    pub height: u32,
    /// One entry per channel implied by the color type.
    pub components: BTreeMap<Channel, ImageComponent>,
    /// From gAMA, or [`DEFAULT_GAMMA`] when absent.
    pub gamma: f32,
    pub chromaticity: Option<Chromaticity>,
    pub physical_size: Option<PhysicalSize>,
    /// The PLTE table, retained after indexed colors are resolved. May also
    /// be present as a quantization hint on truecolor images.
    pub palette: Option<Palette>,
    /// Significant bits per channel from sBIT.
    pub significant_bits: Option<Vec<BitDepth>>,
    /// sPLT palettes keyed by their name.
    pub suggested_palettes: BTreeMap<String, SuggestedPalette>,
    /// Verbatim payloads of ancillary chunks whose content this decoder does
    /// not interpret (tEXt, iTXt, iCCP, unknown ancillary types, ...), in
    /// stream order, for the caller to inspect.
    pub extra: Vec<(ChunkType, Vec<u8>)>,
}

impl ImageRaster {
    pub(crate) fn new(header: Header) -> Self {
        Self {
            width: header.width,
            height: header.height,
            header,
            components: BTreeMap::new(),
            gamma: DEFAULT_GAMMA,
            chromaticity: None,
            physical_size: None,
            palette: None,
            significant_bits: None,
            suggested_palettes: BTreeMap::new(),
            extra: Vec::new(),
        }
    }

    /// The component for `channel`, if the color type implies it.
    pub fn component(&self, channel: Channel) -> Option<&ImageComponent> {
        self.components.get(&channel)
    }
}
