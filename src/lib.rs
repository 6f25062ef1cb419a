//! A streaming PNG decoder that produces channel-separated float rasters.
//!
//! The decoder frames the byte stream into checksummed chunks, decodes each
//! known chunk type into a structured value, reassembles the compressed image
//! payload split across IDAT chunks, reverses the per-scanline predictive
//! filtering, and unpacks the samples into one normalized `f32` plane per
//! channel, alongside the ancillary metadata the stream carries.
//!
//! Decoding is strict by default: chunk CRCs are verified, the container
//! grammar (IHDR first, contiguous IDAT, IEND last) is enforced, and any
//! violation fails the decode without yielding a partial image. The
//! permissive escape hatches live on [`DecoderOptions`].
//!
//! ```
//! use png_raster::{decode, Channel};
//!
//! # // A complete 1x1 grayscale PNG, pixel value 0x7F.
//! # let png: &[u8] = &[
//! #     0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48,
//! #     0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x00, 0x00, 0x00,
//! #     0x00, 0x3A, 0x7E, 0x9B, 0x55, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78,
//! #     0x9C, 0x63, 0xA8, 0x07, 0x00, 0x00, 0x81, 0x00, 0x80, 0xD3, 0x94, 0x53, 0x4A, 0x00,
//! #     0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
//! # ];
//! let raster = decode(png)?;
//!
//! assert_eq!((raster.width, raster.height), (1, 1));
//! let gray = raster.component(Channel::Gray).unwrap();
//! assert!((gray.sample(0, 0) - 127.0 / 255.0).abs() < 1e-6);
//! # Ok::<(), png_raster::DecodeError>(())
//! ```
//!
//! Interlaced (Adam7) streams are rejected, and the content of textual and
//! ICC-profile chunks is passed through unopened in `ImageRaster::extra`.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod chunk;
mod decoder;
mod error;
mod extract;
mod filter;
mod raster;
mod source;

#[cfg(test)]
mod test_util;

pub use chunk::{
    BitDepth, ChunkReader, ChunkType, ColorType, CompressionMethod, FilterMethod, Header,
    InterlaceMethod, RawChunk, TypedChunk, PNG_SIGNATURE,
};
pub use decoder::{decode, decode_with_options, Decoder, DecoderOptions};
pub use error::{DecodeError, FormatError};
pub use filter::FilterType;
pub use raster::{
    Channel, Chromaticity, ImageComponent, ImageRaster, Palette, PhysicalSize, PhysicalUnit,
    SuggestedPalette, SuggestedPaletteEntry, DEFAULT_GAMMA,
};
pub use source::ByteSource;

#[cfg(feature = "std")]
pub use source::ReadSource;
