//! Chunk framing and per-type decoding.
//!
//! [`ChunkReader`] turns the raw byte stream into [`RawChunk`] records,
//! validating the signature and each chunk's CRC-32. [`TypedChunk::decode`]
//! then dispatches on the 4-byte type code and produces a structured variant
//! with its fields parsed, or preserves the payload opaquely for the types
//! whose content is out of scope.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::{self, Debug, Display, Formatter};
use crc32fast::Hasher;
use log::trace;
use num_enum::TryFromPrimitive;

use crate::error::FormatError;
use crate::raster::{
    Channel, Chromaticity, Palette, PhysicalSize, PhysicalUnit, SuggestedPalette,
    SuggestedPaletteEntry,
};
use crate::source::ByteSource;

/// The 8-byte magic every PNG stream starts with.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// A 4-byte chunk type code.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkType(pub [u8; 4]);

#[allow(nonstandard_style)]
impl ChunkType {
    pub const IHDR: Self = Self(*b"IHDR");
    pub const PLTE: Self = Self(*b"PLTE");
    pub const IDAT: Self = Self(*b"IDAT");
    pub const IEND: Self = Self(*b"IEND");
    pub const tRNS: Self = Self(*b"tRNS");
    pub const cHRM: Self = Self(*b"cHRM");
    pub const gAMA: Self = Self(*b"gAMA");
    pub const iCCP: Self = Self(*b"iCCP");
    pub const sBIT: Self = Self(*b"sBIT");
    pub const sRGB: Self = Self(*b"sRGB");
    pub const tEXt: Self = Self(*b"tEXt");
    pub const zTXt: Self = Self(*b"zTXt");
    pub const iTXt: Self = Self(*b"iTXt");
    pub const bKGD: Self = Self(*b"bKGD");
    pub const hIST: Self = Self(*b"hIST");
    pub const pHYs: Self = Self(*b"pHYs");
    pub const sPLT: Self = Self(*b"sPLT");
    pub const tIME: Self = Self(*b"tIME");
    pub const dSIG: Self = Self(*b"dSIG");
    pub const eXIf: Self = Self(*b"eXIf");
    pub const sTER: Self = Self(*b"sTER");
}

impl ChunkType {
    /// The type code as a big-endian u32, as it appears on the wire.
    pub fn code(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Critical chunks have bit 5 of the first type byte clear (an uppercase
    /// first letter). Unknown critical chunks abort the decode; unknown
    /// ancillary chunks are preserved opaquely.
    pub fn is_critical(self) -> bool {
        self.0[0] & 0x20 == 0
    }
}

impl Display for ChunkType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_alphabetic() { b as char } else { '?' };
            f.write_fmt(format_args!("{c}"))?;
        }
        Ok(())
    }
}

impl Debug for ChunkType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// An unparsed chunk: its type code and payload, checksum already verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    pub chunk_type: ChunkType,
    pub data: Vec<u8>,
}

/// Frames a byte source into a lazy, single-use sequence of [`RawChunk`]s.
/// The sequence ends right after an IEND chunk has been yielded; bytes past
/// IEND are never read.
pub struct ChunkReader<S> {
    source: S,
    verify_checksums: bool,
    finished: bool,
}

impl<S: ByteSource> ChunkReader<S> {
    /// Validate the PNG signature and wrap the source. Checksums are
    /// verified on every chunk.
    pub fn open(source: S) -> Result<Self, FormatError> {
        Self::open_with(source, true)
    }

    /// Like [`open`](Self::open), optionally skipping CRC verification for
    /// known-good-but-unchecked inputs.
    pub fn open_with(source: S, verify_checksums: bool) -> Result<Self, FormatError> {
        let mut reader = Self { source, verify_checksums, finished: false };

        let mut signature = [0u8; 8];
        if reader.source.fill(&mut signature) < signature.len() || signature != PNG_SIGNATURE {
            return Err(FormatError::BadSignature);
        }

        Ok(reader)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), FormatError> {
        if self.source.fill(buf) < buf.len() {
            return Err(FormatError::Truncated);
        }
        Ok(())
    }

    /// Read the next chunk, or `Ok(None)` once IEND has been yielded.
    ///
    /// A stream that ends before IEND fails with [`FormatError::Truncated`];
    /// a chunk whose declared CRC disagrees with its contents fails with
    /// [`FormatError::ChecksumMismatch`].
    pub fn next_chunk(&mut self) -> Result<Option<RawChunk>, FormatError> {
        if self.finished {
            return Ok(None);
        }

        let mut length_bytes = [0u8; 4];
        self.read_exact(&mut length_bytes)?;
        let length = u32::from_be_bytes(length_bytes);

        // The PNG length field must not have its high bit set.
        if length > i32::MAX as u32 {
            return Err(FormatError::InvalidField);
        }

        let mut type_bytes = [0u8; 4];
        self.read_exact(&mut type_bytes)?;
        let chunk_type = ChunkType(type_bytes);

        let mut data = vec![0u8; length as usize];
        self.read_exact(&mut data)?;

        let mut crc_bytes = [0u8; 4];
        self.read_exact(&mut crc_bytes)?;
        let declared_crc = u32::from_be_bytes(crc_bytes);

        if self.verify_checksums {
            let mut hasher = Hasher::new();
            hasher.update(&type_bytes);
            hasher.update(&data);

            if hasher.finalize() != declared_crc {
                return Err(FormatError::ChecksumMismatch);
            }
        }

        trace!("chunk {} ({} bytes)", chunk_type, data.len());

        if chunk_type == ChunkType::IEND {
            self.finished = true;
        }

        Ok(Some(RawChunk { chunk_type, data }))
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive)]
pub enum BitDepth {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
    Sixteen = 16,
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive)]
pub enum ColorType {
    Grayscale = 0,
    Rgb = 2,
    Indexed = 3,
    GrayscaleAlpha = 4,
    RgbAlpha = 6,
}

impl ColorType {
    /// The sample planes this color type stores, in scanline order.
    pub fn channels(self) -> &'static [Channel] {
        match self {
            ColorType::Grayscale => &[Channel::Gray],
            ColorType::Rgb => &[Channel::Red, Channel::Green, Channel::Blue],
            ColorType::Indexed => &[Channel::PaletteIndex],
            ColorType::GrayscaleAlpha => &[Channel::Gray, Channel::Alpha],
            ColorType::RgbAlpha => {
                &[Channel::Red, Channel::Green, Channel::Blue, Channel::Alpha]
            }
        }
    }

    pub fn channel_count(self) -> usize {
        self.channels().len()
    }

    /// Channel count as sBIT sees it: indexed images describe the palette's
    /// RGB components, not the index plane.
    pub(crate) fn significant_bit_count(self) -> usize {
        match self {
            ColorType::Indexed => 3,
            other => other.channel_count(),
        }
    }

    fn permits_bit_depth(self, bit_depth: BitDepth) -> bool {
        match self {
            ColorType::Grayscale => true,
            ColorType::Indexed => bit_depth != BitDepth::Sixteen,
            ColorType::Rgb | ColorType::GrayscaleAlpha | ColorType::RgbAlpha => {
                matches!(bit_depth, BitDepth::Eight | BitDepth::Sixteen)
            }
        }
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive)]
pub enum CompressionMethod {
    Deflate = 0,
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive)]
pub enum FilterMethod {
    Adaptive = 0,
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive)]
pub enum InterlaceMethod {
    None = 0,
    Adam7 = 1,
}

/// The decoded IHDR chunk. Exactly one per stream, and it must come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub width: u32,
    pub height: u32,
    pub bit_depth: BitDepth,
    pub color_type: ColorType,
    pub compression_method: CompressionMethod,
    pub filter_method: FilterMethod,
    pub interlace_method: InterlaceMethod,
}

impl Header {
    fn from_payload(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() != 13 {
            return Err(FormatError::InvalidField);
        }

        let width = read_u32(data, 0);
        let height = read_u32(data, 4);

        if width == 0 || height == 0 {
            return Err(FormatError::InvalidField);
        }

        let header = Header {
            width,
            height,
            bit_depth: BitDepth::try_from(data[8]).map_err(|_| FormatError::InvalidField)?,
            color_type: ColorType::try_from(data[9]).map_err(|_| FormatError::InvalidField)?,
            compression_method: CompressionMethod::try_from(data[10])
                .map_err(|_| FormatError::InvalidField)?,
            filter_method: FilterMethod::try_from(data[11])
                .map_err(|_| FormatError::InvalidField)?,
            interlace_method: InterlaceMethod::try_from(data[12])
                .map_err(|_| FormatError::InvalidField)?,
        };

        if !header.color_type.permits_bit_depth(header.bit_depth) {
            return Err(FormatError::InvalidField);
        }

        Ok(header)
    }

    /// Bits per pixel rounded up to whole bytes, the filter's lookback
    /// distance. Never less than 1, even for sub-byte depths.
    pub fn bytes_per_pixel(&self) -> usize {
        (self.color_type.channel_count() * self.bit_depth as usize + 7) / 8
    }

    /// Packed byte length of one scanline, excluding the filter-type byte.
    pub fn bytes_per_line(&self) -> usize {
        let bits = self.width as u64
            * self.color_type.channel_count() as u64
            * self.bit_depth as u64;
        ((bits + 7) / 8) as usize
    }

    /// Total bytes the inflated image payload must hold: `height` records of
    /// one filter byte plus one packed scanline.
    pub(crate) fn expected_data_len(&self) -> Result<usize, FormatError> {
        (1 + self.bytes_per_line())
            .checked_mul(self.height as usize)
            .ok_or(FormatError::InvalidField)
    }
}

/// A chunk with its type-specific fields decoded.
///
/// One variant per known chunk type; payloads whose content is out of scope
/// (text, ICC profiles, ...) are carried verbatim. Unknown ancillary types
/// land in [`TypedChunk::Opaque`].
#[derive(Debug, Clone, PartialEq)]
pub enum TypedChunk {
    Header(Header),
    Palette(Palette),
    /// One piece of the compressed image payload.
    ImageData(Vec<u8>),
    End,
    Gamma(f32),
    Chromaticity(Chromaticity),
    SignificantBits(Vec<BitDepth>),
    PhysicalSize(PhysicalSize),
    SuggestedPalette(SuggestedPalette),
    Text(Vec<u8>),
    CompressedText(Vec<u8>),
    InternationalText(Vec<u8>),
    Background(Vec<u8>),
    Histogram(Vec<u8>),
    Time(Vec<u8>),
    IccProfile(Vec<u8>),
    StandardRgb(Vec<u8>),
    Transparency(Vec<u8>),
    DigitalSignature(Vec<u8>),
    Exif(Vec<u8>),
    Stereo(Vec<u8>),
    /// An unrecognized ancillary chunk, preserved untouched.
    Opaque { chunk_type: ChunkType, data: Vec<u8> },
}

impl TypedChunk {
    /// Decode a raw chunk into its typed form. Pure dispatch on the type
    /// code; unknown critical types are fatal.
    pub fn decode(raw: RawChunk) -> Result<Self, FormatError> {
        let RawChunk { chunk_type, data } = raw;

        let chunk = match &chunk_type.0 {
            b"IHDR" => TypedChunk::Header(Header::from_payload(&data)?),
            b"PLTE" => TypedChunk::Palette(decode_palette(&data)?),
            b"IDAT" => TypedChunk::ImageData(data),
            b"IEND" => TypedChunk::End,
            b"gAMA" => TypedChunk::Gamma(decode_gamma(&data)?),
            b"cHRM" => TypedChunk::Chromaticity(decode_chromaticity(&data)?),
            b"sBIT" => TypedChunk::SignificantBits(decode_significant_bits(&data)?),
            b"pHYs" => TypedChunk::PhysicalSize(decode_physical_size(&data)?),
            b"sPLT" => TypedChunk::SuggestedPalette(decode_suggested_palette(&data)?),
            b"tEXt" => TypedChunk::Text(data),
            b"zTXt" => TypedChunk::CompressedText(data),
            b"iTXt" => TypedChunk::InternationalText(data),
            b"bKGD" => TypedChunk::Background(data),
            b"hIST" => TypedChunk::Histogram(data),
            b"tIME" => TypedChunk::Time(data),
            b"iCCP" => TypedChunk::IccProfile(data),
            b"sRGB" => TypedChunk::StandardRgb(data),
            b"tRNS" => TypedChunk::Transparency(data),
            b"dSIG" => TypedChunk::DigitalSignature(data),
            b"eXIf" => TypedChunk::Exif(data),
            b"sTER" => TypedChunk::Stereo(data),
            _ => {
                if chunk_type.is_critical() {
                    return Err(FormatError::UnsupportedCriticalChunk);
                }
                TypedChunk::Opaque { chunk_type, data }
            }
        };

        Ok(chunk)
    }

    /// The wire type code this chunk was decoded from.
    pub fn chunk_type(&self) -> ChunkType {
        match self {
            TypedChunk::Header(_) => ChunkType::IHDR,
            TypedChunk::Palette(_) => ChunkType::PLTE,
            TypedChunk::ImageData(_) => ChunkType::IDAT,
            TypedChunk::End => ChunkType::IEND,
            TypedChunk::Gamma(_) => ChunkType::gAMA,
            TypedChunk::Chromaticity(_) => ChunkType::cHRM,
            TypedChunk::SignificantBits(_) => ChunkType::sBIT,
            TypedChunk::PhysicalSize(_) => ChunkType::pHYs,
            TypedChunk::SuggestedPalette(_) => ChunkType::sPLT,
            TypedChunk::Text(_) => ChunkType::tEXt,
            TypedChunk::CompressedText(_) => ChunkType::zTXt,
            TypedChunk::InternationalText(_) => ChunkType::iTXt,
            TypedChunk::Background(_) => ChunkType::bKGD,
            TypedChunk::Histogram(_) => ChunkType::hIST,
            TypedChunk::Time(_) => ChunkType::tIME,
            TypedChunk::IccProfile(_) => ChunkType::iCCP,
            TypedChunk::StandardRgb(_) => ChunkType::sRGB,
            TypedChunk::Transparency(_) => ChunkType::tRNS,
            TypedChunk::DigitalSignature(_) => ChunkType::dSIG,
            TypedChunk::Exif(_) => ChunkType::eXIf,
            TypedChunk::Stereo(_) => ChunkType::sTER,
            TypedChunk::Opaque { chunk_type, .. } => *chunk_type,
        }
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

fn decode_palette(data: &[u8]) -> Result<Palette, FormatError> {
    if data.is_empty() || data.len() % 3 != 0 || data.len() / 3 > 256 {
        return Err(FormatError::MalformedPalette);
    }

    let entries = data
        .chunks_exact(3)
        .map(|rgb| [rgb[0] as f32 / 255.0, rgb[1] as f32 / 255.0, rgb[2] as f32 / 255.0])
        .collect();

    Ok(Palette { entries })
}

fn decode_gamma(data: &[u8]) -> Result<f32, FormatError> {
    if data.len() != 4 {
        return Err(FormatError::InvalidField);
    }
    Ok(read_u32(data, 0) as f32 / 100_000.0)
}

fn decode_chromaticity(data: &[u8]) -> Result<Chromaticity, FormatError> {
    if data.len() != 32 {
        return Err(FormatError::InvalidField);
    }

    let coord = |i: usize| read_u32(data, i * 4) as f32 / 100_000.0;

    Ok(Chromaticity {
        white: (coord(0), coord(1)),
        red: (coord(2), coord(3)),
        green: (coord(4), coord(5)),
        blue: (coord(6), coord(7)),
    })
}

fn decode_significant_bits(data: &[u8]) -> Result<Vec<BitDepth>, FormatError> {
    if data.is_empty() || data.len() > 4 {
        return Err(FormatError::InvalidField);
    }

    data.iter()
        .map(|&b| BitDepth::try_from(b).map_err(|_| FormatError::InvalidField))
        .collect()
}

fn decode_physical_size(data: &[u8]) -> Result<PhysicalSize, FormatError> {
    if data.len() != 9 {
        return Err(FormatError::InvalidField);
    }

    Ok(PhysicalSize {
        x: read_u32(data, 0),
        y: read_u32(data, 4),
        unit: PhysicalUnit::try_from(data[8]).map_err(|_| FormatError::InvalidField)?,
    })
}

fn decode_suggested_palette(data: &[u8]) -> Result<SuggestedPalette, FormatError> {
    let nul = data.iter().position(|&b| b == 0).ok_or(FormatError::MalformedPalette)?;
    if nul == 0 || nul > 79 {
        return Err(FormatError::MalformedPalette);
    }

    // The name is ISO-8859-1, whose code points map straight onto Unicode.
    let name: String = data[..nul].iter().map(|&b| b as char).collect();

    let rest = &data[nul + 1..];
    let (&sample_depth, entry_bytes) = rest.split_first().ok_or(FormatError::MalformedPalette)?;

    let entry_size = match sample_depth {
        8 => 6,
        16 => 10,
        _ => return Err(FormatError::InvalidField),
    };

    if entry_bytes.len() % entry_size != 0 {
        return Err(FormatError::MalformedPalette);
    }

    let entries = entry_bytes
        .chunks_exact(entry_size)
        .map(|entry| {
            let (rgba, frequency) = if sample_depth == 8 {
                let max = u8::MAX as f32;
                (
                    [
                        entry[0] as f32 / max,
                        entry[1] as f32 / max,
                        entry[2] as f32 / max,
                        entry[3] as f32 / max,
                    ],
                    u16::from_be_bytes([entry[4], entry[5]]),
                )
            } else {
                let max = u16::MAX as f32;
                let sample =
                    |i: usize| u16::from_be_bytes([entry[i * 2], entry[i * 2 + 1]]) as f32 / max;
                ([sample(0), sample(1), sample(2), sample(3)], u16::from_be_bytes([entry[8], entry[9]]))
            };

            SuggestedPaletteEntry {
                red: rgba[0],
                green: rgba[1],
                blue: rgba[2],
                alpha: rgba[3],
                frequency,
            }
        })
        .collect();

    Ok(SuggestedPalette { name, sample_depth, entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{chunk, ihdr_payload, png_stream};

    fn decode_payload(ty: &[u8; 4], payload: &[u8]) -> Result<TypedChunk, FormatError> {
        TypedChunk::decode(RawChunk { chunk_type: ChunkType(*ty), data: payload.to_vec() })
    }

    #[test]
    fn signature_is_checked_before_any_chunk() {
        let mut stream = png_stream(&[chunk(b"IEND", &[])]);
        stream[0] = 0x88;

        assert_eq!(
            ChunkReader::open(stream.as_slice()).err(),
            Some(FormatError::BadSignature)
        );
    }

    #[test]
    fn short_signature_is_a_bad_signature() {
        let bytes: &[u8] = &PNG_SIGNATURE[..5];
        assert_eq!(ChunkReader::open(bytes).err(), Some(FormatError::BadSignature));
    }

    #[test]
    fn frames_chunks_and_stops_after_iend() {
        let stream = png_stream(&[
            chunk(b"IHDR", &ihdr_payload(1, 1, 8, 0)),
            chunk(b"IEND", &[]),
            chunk(b"gAMA", &220_000u32.to_be_bytes()),
        ]);

        let mut reader = ChunkReader::open(stream.as_slice()).unwrap();

        let first = reader.next_chunk().unwrap().unwrap();
        assert_eq!(first.chunk_type, ChunkType::IHDR);
        assert_eq!(first.data.len(), 13);

        let second = reader.next_chunk().unwrap().unwrap();
        assert_eq!(second.chunk_type, ChunkType::IEND);

        // The gAMA chunk after IEND is never read.
        assert_eq!(reader.next_chunk().unwrap(), None);
        assert_eq!(reader.next_chunk().unwrap(), None);
    }

    #[test]
    fn payload_lengths_match_declared_lengths_exactly() {
        let payloads: [&[u8]; 3] = [&[1, 2, 3], &[], &[9; 41]];
        let stream = png_stream(&[
            chunk(b"abCd", payloads[0]),
            chunk(b"abCe", payloads[1]),
            chunk(b"abCf", payloads[2]),
            chunk(b"IEND", &[]),
        ]);

        let mut reader = ChunkReader::open(stream.as_slice()).unwrap();
        let mut total = 0;
        while let Some(raw) = reader.next_chunk().unwrap() {
            total += raw.data.len();
        }

        assert_eq!(total, payloads.iter().map(|p| p.len()).sum::<usize>());
    }

    #[test]
    fn corrupt_crc_is_rejected() {
        let mut stream = png_stream(&[chunk(b"IHDR", &ihdr_payload(1, 1, 8, 0))]);
        let last = stream.len() - 1;
        stream[last] ^= 0xFF;

        let mut reader = ChunkReader::open(stream.as_slice()).unwrap();
        assert_eq!(reader.next_chunk().err(), Some(FormatError::ChecksumMismatch));
    }

    #[test]
    fn corrupt_crc_is_accepted_when_verification_is_off() {
        let mut stream = png_stream(&[chunk(b"IHDR", &ihdr_payload(1, 1, 8, 0))]);
        let last = stream.len() - 1;
        stream[last] ^= 0xFF;

        let mut reader = ChunkReader::open_with(stream.as_slice(), false).unwrap();
        let raw = reader.next_chunk().unwrap().unwrap();
        assert_eq!(raw.chunk_type, ChunkType::IHDR);
    }

    #[test]
    fn truncated_payload_is_reported() {
        let stream = png_stream(&[chunk(b"IHDR", &ihdr_payload(1, 1, 8, 0))]);
        let cut = &stream[..stream.len() - 6];

        let mut reader = ChunkReader::open(&cut[..]).unwrap();
        assert_eq!(reader.next_chunk().err(), Some(FormatError::Truncated));
    }

    #[test]
    fn header_fields_round_trip() {
        let raw = decode_payload(b"IHDR", &ihdr_payload(640, 480, 8, 2)).unwrap();
        let TypedChunk::Header(header) = raw else { panic!("expected header") };

        assert_eq!(header.width, 640);
        assert_eq!(header.height, 480);
        assert_eq!(header.bit_depth, BitDepth::Eight);
        assert_eq!(header.color_type, ColorType::Rgb);
        assert_eq!(header.interlace_method, InterlaceMethod::None);
        assert_eq!(header.bytes_per_pixel(), 3);
        assert_eq!(header.bytes_per_line(), 640 * 3);
    }

    #[test]
    fn header_rejects_bad_enumerations() {
        // bit depth 3 does not exist
        assert_eq!(
            decode_payload(b"IHDR", &ihdr_payload(1, 1, 3, 0)).err(),
            Some(FormatError::InvalidField)
        );
        // color type 5 does not exist
        assert_eq!(
            decode_payload(b"IHDR", &ihdr_payload(1, 1, 8, 5)).err(),
            Some(FormatError::InvalidField)
        );
        // rgb at 4 bits per sample is not a legal combination
        assert_eq!(
            decode_payload(b"IHDR", &ihdr_payload(1, 1, 4, 2)).err(),
            Some(FormatError::InvalidField)
        );
        // zero dimensions
        assert_eq!(
            decode_payload(b"IHDR", &ihdr_payload(0, 1, 8, 0)).err(),
            Some(FormatError::InvalidField)
        );
    }

    #[test]
    fn sub_byte_lines_round_up() {
        let TypedChunk::Header(header) =
            decode_payload(b"IHDR", &ihdr_payload(9, 2, 1, 0)).unwrap()
        else {
            panic!("expected header")
        };

        // 9 one-bit samples need two bytes; the filter lookback stays 1.
        assert_eq!(header.bytes_per_line(), 2);
        assert_eq!(header.bytes_per_pixel(), 1);
    }

    #[test]
    fn gamma_survives_an_encode_decode_round_trip() {
        let encoded = (2.2f32 * 100_000.0) as u32;
        let TypedChunk::Gamma(gamma) =
            decode_payload(b"gAMA", &encoded.to_be_bytes()).unwrap()
        else {
            panic!("expected gamma")
        };

        assert!((gamma - 2.2).abs() < 1.0 / 100_000.0);
    }

    #[test]
    fn chromaticity_fields_decode_in_order() {
        let mut payload = Vec::new();
        for value in [31_270u32, 32_900, 64_000, 33_000, 30_000, 60_000, 15_000, 6_000] {
            payload.extend_from_slice(&value.to_be_bytes());
        }

        let TypedChunk::Chromaticity(chrm) = decode_payload(b"cHRM", &payload).unwrap() else {
            panic!("expected chromaticity")
        };

        assert!((chrm.white.0 - 0.3127).abs() < 1e-6);
        assert!((chrm.white.1 - 0.329).abs() < 1e-6);
        assert!((chrm.red.0 - 0.64).abs() < 1e-6);
        assert!((chrm.blue.1 - 0.06).abs() < 1e-6);
    }

    #[test]
    fn physical_size_decodes_and_validates_unit() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&2835u32.to_be_bytes());
        payload.extend_from_slice(&2835u32.to_be_bytes());
        payload.push(1);

        let TypedChunk::PhysicalSize(phys) = decode_payload(b"pHYs", &payload).unwrap() else {
            panic!("expected physical size")
        };
        assert_eq!(phys.x, 2835);
        assert_eq!(phys.unit, PhysicalUnit::Meter);

        payload[8] = 7;
        assert_eq!(decode_payload(b"pHYs", &payload).err(), Some(FormatError::InvalidField));
    }

    #[test]
    fn palette_normalizes_and_validates_length() {
        let TypedChunk::Palette(palette) =
            decode_payload(b"PLTE", &[0, 0, 0, 255, 128, 0]).unwrap()
        else {
            panic!("expected palette")
        };

        assert_eq!(palette.len(), 2);
        assert_eq!(palette.entries[0], [0.0, 0.0, 0.0]);
        assert!((palette.entries[1][0] - 1.0).abs() < 1e-6);
        assert!((palette.entries[1][1] - 128.0 / 255.0).abs() < 1e-6);

        assert_eq!(
            decode_payload(b"PLTE", &[1, 2, 3, 4]).err(),
            Some(FormatError::MalformedPalette)
        );
    }

    #[test]
    fn suggested_palette_decodes_both_depths() {
        let mut payload = b"sunset\0".to_vec();
        payload.push(8);
        payload.extend_from_slice(&[255, 0, 0, 255, 0, 7]);
        payload.extend_from_slice(&[0, 255, 0, 128, 0, 3]);

        let TypedChunk::SuggestedPalette(splt) = decode_payload(b"sPLT", &payload).unwrap()
        else {
            panic!("expected suggested palette")
        };

        assert_eq!(splt.name, "sunset");
        assert_eq!(splt.sample_depth, 8);
        assert_eq!(splt.entries.len(), 2);
        assert!((splt.entries[0].red - 1.0).abs() < 1e-6);
        assert_eq!(splt.entries[0].frequency, 7);
        assert!((splt.entries[1].alpha - 128.0 / 255.0).abs() < 1e-6);

        let mut wide = b"w\0".to_vec();
        wide.push(16);
        wide.extend_from_slice(&[0xFF, 0xFF, 0, 0, 0, 0, 0xFF, 0xFF, 0, 9]);

        let TypedChunk::SuggestedPalette(splt) = decode_payload(b"sPLT", &wide).unwrap() else {
            panic!("expected suggested palette")
        };
        assert!((splt.entries[0].red - 1.0).abs() < 1e-6);
        assert!((splt.entries[0].alpha - 1.0).abs() < 1e-6);
        assert_eq!(splt.entries[0].frequency, 9);
    }

    #[test]
    fn suggested_palette_rejects_ragged_entries() {
        let mut payload = b"bad\0".to_vec();
        payload.push(8);
        payload.extend_from_slice(&[1, 2, 3, 4, 5]); // five bytes, not six

        assert_eq!(
            decode_payload(b"sPLT", &payload).err(),
            Some(FormatError::MalformedPalette)
        );
    }

    #[test]
    fn significant_bits_must_be_valid_depths() {
        let TypedChunk::SignificantBits(bits) = decode_payload(b"sBIT", &[8, 8, 4]).unwrap()
        else {
            panic!("expected significant bits")
        };
        assert_eq!(bits, vec![BitDepth::Eight, BitDepth::Eight, BitDepth::Four]);

        assert_eq!(decode_payload(b"sBIT", &[8, 3]).err(), Some(FormatError::InvalidField));
        assert_eq!(
            decode_payload(b"sBIT", &[8, 8, 8, 8, 8]).err(),
            Some(FormatError::InvalidField)
        );
    }

    #[test]
    fn unknown_ancillary_is_opaque_unknown_critical_is_fatal() {
        let opaque = decode_payload(b"puNk", &[1, 2, 3]).unwrap();
        assert_eq!(
            opaque,
            TypedChunk::Opaque { chunk_type: ChunkType(*b"puNk"), data: vec![1, 2, 3] }
        );
        assert!(!ChunkType(*b"puNk").is_critical());

        assert_eq!(
            decode_payload(b"PuNk", &[1, 2, 3]).err(),
            Some(FormatError::UnsupportedCriticalChunk)
        );
    }

    #[test]
    fn verbatim_chunks_keep_their_payload() {
        let text = decode_payload(b"tEXt", b"Title\0hello").unwrap();
        assert_eq!(text, TypedChunk::Text(b"Title\0hello".to_vec()));
        assert_eq!(text.chunk_type(), ChunkType::tEXt);

        let trns = decode_payload(b"tRNS", &[0, 128]).unwrap();
        assert_eq!(trns, TypedChunk::Transparency(vec![0, 128]));
    }
}
