//! Helpers that synthesize bit-exact PNG streams for the tests.

use alloc::vec::Vec;

use crate::chunk::PNG_SIGNATURE;

/// One length-prefixed chunk record with a correct CRC-32.
pub(crate) fn chunk(chunk_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(12 + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(payload);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(payload);
    out.extend_from_slice(&hasher.finalize().to_be_bytes());

    out
}

/// Signature plus the given chunk records, in order.
pub(crate) fn png_stream(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = PNG_SIGNATURE.to_vec();
    for chunk in chunks {
        out.extend_from_slice(chunk);
    }
    out
}

/// An IHDR payload with compression/filter 0 and no interlacing.
pub(crate) fn ihdr_payload(width: u32, height: u32, bit_depth: u8, color_type: u8) -> [u8; 13] {
    let mut payload = [0u8; 13];
    payload[..4].copy_from_slice(&width.to_be_bytes());
    payload[4..8].copy_from_slice(&height.to_be_bytes());
    payload[8] = bit_depth;
    payload[9] = color_type;
    payload
}

/// Raw scanlines with a filter-type-None byte prepended to each.
pub(crate) fn filtered(rows: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for row in rows {
        out.push(0);
        out.extend_from_slice(row);
    }
    out
}

/// zlib-compress an image payload the way an encoder would.
pub(crate) fn zlib(data: &[u8]) -> Vec<u8> {
    miniz_oxide::deflate::compress_to_vec_zlib(data, 6)
}
