//! The image assembler: drives the chunk reader, enforces the container's
//! structural rules, accumulates the compressed image payload, and builds the
//! final raster once IEND closes the stream.

use alloc::vec::Vec;
use core::mem;
use log::{debug, warn};

use crate::chunk::{ChunkReader, ColorType, Header, InterlaceMethod, TypedChunk};
use crate::error::{DecodeError, FormatError};
use crate::extract::{extract_components, resolve_palette};
use crate::filter::unfilter_image;
use crate::raster::{ImageRaster, Palette};
use crate::source::ByteSource;

/// Knobs for the permissive modes the strict defaults allow opting out of.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DecoderOptions {
    verify_checksums: bool,
    allow_fragmented_idat: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderOptions {
    pub const fn new() -> Self {
        Self { verify_checksums: true, allow_fragmented_idat: false }
    }

    /// Verify each chunk's CRC-32 (default `true`). Turning this off admits
    /// known-good streams whose checksums were never filled in.
    pub const fn verify_checksums(mut self, yes: bool) -> Self {
        self.verify_checksums = yes;
        self
    }

    /// Accept IDAT runs separated by other chunks (default `false`). The PNG
    /// specification calls such streams non-conformant, so by default a
    /// second run fails with [`FormatError::ChunkOrderViolation`]; permissive
    /// mode inflates each run independently and concatenates the outputs in
    /// stream order.
    pub const fn allow_fragmented_idat(mut self, yes: bool) -> Self {
        self.allow_fragmented_idat = yes;
        self
    }

    pub const fn checksum_verification(&self) -> bool {
        self.verify_checksums
    }

    pub const fn fragmented_idat_allowed(&self) -> bool {
        self.allow_fragmented_idat
    }
}

/// Concatenates consecutive IDAT payloads and inflates the run when a
/// non-IDAT chunk closes it.
enum IdatRun {
    Idle,
    Accumulating(Vec<u8>),
    Drained,
}

struct IdatAccumulator {
    run: IdatRun,
    inflated: Vec<u8>,
    compressed_total: usize,
}

impl IdatAccumulator {
    fn new() -> Self {
        Self { run: IdatRun::Idle, inflated: Vec::new(), compressed_total: 0 }
    }

    fn push(&mut self, data: Vec<u8>, allow_fragmented: bool) -> Result<(), DecodeError> {
        self.compressed_total += data.len();

        match &mut self.run {
            IdatRun::Idle => self.run = IdatRun::Accumulating(data),
            IdatRun::Accumulating(buffer) => buffer.extend_from_slice(&data),
            IdatRun::Drained => {
                if !allow_fragmented {
                    return Err(FormatError::ChunkOrderViolation.into());
                }
                self.run = IdatRun::Accumulating(data);
            }
        }

        Ok(())
    }

    /// A non-IDAT chunk arrived: if a run is open, close it and inflate.
    /// A run of zero bytes is drained without inflating, so a stream whose
    /// only IDAT chunk is empty still reports [`FormatError::NoImageData`].
    fn interrupt(&mut self) -> Result<(), DecodeError> {
        match mem::replace(&mut self.run, IdatRun::Drained) {
            IdatRun::Accumulating(buffer) if !buffer.is_empty() => {
                let inflated = miniz_oxide::inflate::decompress_to_vec_zlib(&buffer)
                    .map_err(DecodeError::Inflate)?;
                debug!("inflated {} compressed bytes into {}", buffer.len(), inflated.len());
                self.inflated.extend_from_slice(&inflated);
            }
            IdatRun::Accumulating(_) => {}
            other => self.run = other,
        }

        Ok(())
    }

    fn begun(&self) -> bool {
        self.compressed_total > 0
    }

    fn into_inflated(self) -> Vec<u8> {
        self.inflated
    }
}

enum DecodeState {
    AwaitingHeader,
    Collecting,
    Finalized,
    Failed,
}

/// The decode-wide state machine described in the container rules:
/// `AwaitingHeader -> Collecting -> Finalized | Failed`.
struct Assembler {
    options: DecoderOptions,
    state: DecodeState,
    raster: Option<ImageRaster>,
    palette: Option<Palette>,
    transparency: Option<Vec<u8>>,
    idat: IdatAccumulator,
}

impl Assembler {
    fn new(options: DecoderOptions) -> Self {
        Self {
            options,
            state: DecodeState::AwaitingHeader,
            raster: None,
            palette: None,
            transparency: None,
            idat: IdatAccumulator::new(),
        }
    }

    fn process(&mut self, chunk: TypedChunk) -> Result<(), DecodeError> {
        let result = self.step(chunk);
        if result.is_err() {
            // Fail-fast: drop the partial raster so it can never escape.
            self.state = DecodeState::Failed;
            self.raster = None;
        }
        result
    }

    fn step(&mut self, chunk: TypedChunk) -> Result<(), DecodeError> {
        match self.state {
            DecodeState::AwaitingHeader => match chunk {
                TypedChunk::Header(header) => self.begin(header),
                _ => Err(FormatError::HeaderMissing.into()),
            },
            DecodeState::Collecting => self.collect(chunk),
            // The reader stops at IEND and `process` is never called after a
            // failure, so chunks cannot arrive in the terminal states.
            DecodeState::Finalized | DecodeState::Failed => {
                Err(FormatError::ChunkOrderViolation.into())
            }
        }
    }

    fn begin(&mut self, header: Header) -> Result<(), DecodeError> {
        if header.interlace_method == InterlaceMethod::Adam7 {
            return Err(FormatError::UnsupportedInterlace.into());
        }

        debug!(
            "IHDR {}x{} depth {:?} color {:?}",
            header.width, header.height, header.bit_depth, header.color_type
        );

        self.raster = Some(ImageRaster::new(header));
        self.state = DecodeState::Collecting;
        Ok(())
    }

    fn collect(&mut self, chunk: TypedChunk) -> Result<(), DecodeError> {
        match chunk {
            TypedChunk::ImageData(data) => {
                return self.idat.push(data, self.options.fragmented_idat_allowed());
            }
            TypedChunk::End => {
                self.finalize()?;
                self.state = DecodeState::Finalized;
                return Ok(());
            }
            _ => {}
        }

        // Any other chunk closes an open IDAT run before being processed.
        self.idat.interrupt()?;

        let chunk_type = chunk.chunk_type();

        match chunk {
            TypedChunk::Header(_) => return Err(FormatError::DuplicateHeader.into()),
            TypedChunk::Palette(palette) => {
                // PLTE is forbidden outright for the grayscale color types.
                let color_type = self.raster_mut()?.header.color_type;
                if matches!(color_type, ColorType::Grayscale | ColorType::GrayscaleAlpha)
                    || self.idat.begun()
                    || self.palette.is_some()
                {
                    return Err(FormatError::ChunkOrderViolation.into());
                }
                self.palette = Some(palette);
            }
            TypedChunk::Gamma(gamma) => self.raster_mut()?.gamma = gamma,
            TypedChunk::Chromaticity(chromaticity) => {
                self.raster_mut()?.chromaticity = Some(chromaticity);
            }
            TypedChunk::PhysicalSize(physical) => {
                self.raster_mut()?.physical_size = Some(physical);
            }
            TypedChunk::SignificantBits(bits) => {
                let raster = self.raster_mut()?;
                if bits.len() != raster.header.color_type.significant_bit_count() {
                    return Err(FormatError::InvalidField.into());
                }
                raster.significant_bits = Some(bits);
            }
            TypedChunk::SuggestedPalette(splt) => {
                self.raster_mut()?.suggested_palettes.insert(splt.name.clone(), splt);
            }
            TypedChunk::Transparency(data) => {
                self.transparency = Some(data.clone());
                self.raster_mut()?.extra.push((chunk_type, data));
            }
            TypedChunk::Text(data)
            | TypedChunk::CompressedText(data)
            | TypedChunk::InternationalText(data)
            | TypedChunk::Background(data)
            | TypedChunk::Histogram(data)
            | TypedChunk::Time(data)
            | TypedChunk::IccProfile(data)
            | TypedChunk::StandardRgb(data)
            | TypedChunk::DigitalSignature(data)
            | TypedChunk::Exif(data)
            | TypedChunk::Stereo(data) => self.raster_mut()?.extra.push((chunk_type, data)),
            TypedChunk::Opaque { chunk_type, data } => {
                warn!("preserving unknown ancillary chunk {}", chunk_type);
                self.raster_mut()?.extra.push((chunk_type, data));
            }
            TypedChunk::ImageData(_) | TypedChunk::End => unreachable!("handled above"),
        }

        Ok(())
    }

    /// IEND arrived: close the image-data run, inflate, unfilter, extract,
    /// and resolve indexed colors.
    fn finalize(&mut self) -> Result<(), DecodeError> {
        self.idat.interrupt()?;

        if !self.idat.begun() {
            return Err(FormatError::NoImageData.into());
        }

        let mut raster = self.raster.take().ok_or(FormatError::HeaderMissing)?;
        let mut data = mem::replace(&mut self.idat, IdatAccumulator::new()).into_inflated();

        unfilter_image(&raster.header, &mut data)?;
        let mut components = extract_components(&raster.header, &data)?;

        if raster.header.color_type == ColorType::Indexed {
            if let Some(palette) = &self.palette {
                resolve_palette(&mut components, palette, self.transparency.as_deref())?;
            }
        }

        raster.components = components;
        raster.palette = self.palette.take();
        self.raster = Some(raster);
        Ok(())
    }

    fn raster_mut(&mut self) -> Result<&mut ImageRaster, DecodeError> {
        self.raster.as_mut().ok_or_else(|| FormatError::HeaderMissing.into())
    }

    fn finish(self) -> Result<ImageRaster, DecodeError> {
        match (self.state, self.raster) {
            (DecodeState::Finalized, Some(raster)) => Ok(raster),
            // The reader ran dry without ever yielding IEND.
            _ => Err(FormatError::Truncated.into()),
        }
    }
}

/// Streaming decoder over any [`ByteSource`]. One decoder decodes one
/// stream and is consumed doing so.
pub struct Decoder<S> {
    reader: ChunkReader<S>,
    options: DecoderOptions,
}

impl<S: ByteSource> Decoder<S> {
    /// Open `source` with the strict default options, validating the PNG
    /// signature immediately.
    pub fn new(source: S) -> Result<Self, DecodeError> {
        Self::with_options(source, DecoderOptions::new())
    }

    pub fn with_options(source: S, options: DecoderOptions) -> Result<Self, DecodeError> {
        let reader = ChunkReader::open_with(source, options.checksum_verification())?;
        Ok(Self { reader, options })
    }

    /// Decode the whole stream into an [`ImageRaster`].
    pub fn decode(self) -> Result<ImageRaster, DecodeError> {
        self.decode_with(|_| {})
    }

    /// Like [`decode`](Self::decode), invoking `observer` with every typed
    /// chunk as it is processed. This is the progress/inspection hook; there
    /// is no ambient listener state.
    pub fn decode_with<F>(mut self, mut observer: F) -> Result<ImageRaster, DecodeError>
    where
        F: FnMut(&TypedChunk),
    {
        let mut assembler = Assembler::new(self.options);

        while let Some(raw) = self.reader.next_chunk()? {
            let chunk = TypedChunk::decode(raw)?;
            observer(&chunk);
            assembler.process(chunk)?;
        }

        assembler.finish()
    }
}

/// Decode an in-memory PNG stream with the strict default options.
pub fn decode(bytes: &[u8]) -> Result<ImageRaster, DecodeError> {
    Decoder::new(bytes)?.decode()
}

/// Decode an in-memory PNG stream with explicit options.
pub fn decode_with_options(
    bytes: &[u8],
    options: DecoderOptions,
) -> Result<ImageRaster, DecodeError> {
    Decoder::with_options(bytes, options)?.decode()
}
