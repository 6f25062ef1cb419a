use core::fmt::{self, Display, Formatter};
use miniz_oxide::inflate::TINFLStatus;

/// A structural violation of the PNG container format.
///
/// Every variant is terminal for the decode that produced it: the decoder
/// stops at the offending chunk and no partial image is returned.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The stream does not begin with the 8-byte PNG signature.
    BadSignature,
    /// A chunk's CRC-32 over type + payload disagrees with the declared value.
    ChecksumMismatch,
    /// The byte source ended before the declared bytes were available.
    Truncated,
    /// A chunk field holds a value outside its permitted enumeration.
    InvalidField,
    /// A PLTE or sPLT payload does not divide evenly into entries, or a
    /// palette index points past the end of the palette.
    MalformedPalette,
    /// An unrecognized chunk type with the critical bit set.
    UnsupportedCriticalChunk,
    /// The header declares Adam7 interlacing, which this decoder does not
    /// reconstruct.
    UnsupportedInterlace,
    /// The stream ended without a single byte of image data.
    NoImageData,
    /// A second IHDR chunk appeared.
    DuplicateHeader,
    /// The first chunk of the stream was not IHDR.
    HeaderMissing,
    /// A chunk appeared somewhere the container grammar forbids, e.g. PLTE
    /// after the image data began, or a second IDAT run.
    ChunkOrderViolation,
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadSignature => write!(f, "missing PNG signature, not a png"),
            Self::ChecksumMismatch => write!(f, "chunk CRC-32 does not match its payload"),
            Self::Truncated => write!(f, "byte source ended mid-chunk"),
            Self::InvalidField => write!(f, "chunk field holds an invalid value"),
            Self::MalformedPalette => write!(f, "palette payload is malformed"),
            Self::UnsupportedCriticalChunk => {
                write!(f, "unknown chunk type is marked critical")
            }
            Self::UnsupportedInterlace => write!(f, "Adam7 interlacing is not supported"),
            Self::NoImageData => write!(f, "stream ended without any image data"),
            Self::DuplicateHeader => write!(f, "more than one IHDR chunk"),
            Self::HeaderMissing => write!(f, "first chunk was not IHDR"),
            Self::ChunkOrderViolation => write!(f, "chunk appeared out of order"),
        }
    }
}

/// Top-level decode failure: either the container was malformed or the
/// compressed image payload would not inflate.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The container violated the PNG grammar or a field constraint.
    Format(FormatError),
    /// The accumulated IDAT payload was not a valid zlib stream.
    Inflate(TINFLStatus),
}

impl From<FormatError> for DecodeError {
    fn from(err: FormatError) -> Self {
        Self::Format(err)
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format(err) => Display::fmt(err, f),
            Self::Inflate(status) => write!(f, "image data failed to inflate: {status:?}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FormatError {}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Format(err) => Some(err),
            Self::Inflate(_) => None,
        }
    }
}
