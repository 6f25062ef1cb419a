//! Reversal of the per-scanline predictive filter.
//!
//! Each record of the inflated image payload starts with a filter-type byte
//! followed by one packed scanline. Reconstruction is strictly sequential:
//! Up, Average and Paeth read the previous *reconstructed* line, so rows are
//! processed in order and the first row sees an implied all-zero prior line.

use log::trace;
use num_enum::TryFromPrimitive;

use crate::chunk::Header;
use crate::error::FormatError;

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive)]
pub enum FilterType {
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}

/// The PNG predictor: whichever of left `a`, above `b`, upper-left `c` is
/// closest to `a + b - c`, ties broken in the order a, b, c. The order of the
/// comparisons is mandated by the format and must not be rearranged.
fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Reconstruct one scanline in place. `prior` is the already-reconstructed
/// previous line, or empty for the first row. All arithmetic is modulo 256;
/// bytes left of the first pixel read as zero.
pub(crate) fn unfilter_line(filter: FilterType, bpp: usize, line: &mut [u8], prior: &[u8]) {
    match filter {
        FilterType::None => {}
        FilterType::Sub => {
            for i in bpp..line.len() {
                line[i] = line[i].wrapping_add(line[i - bpp]);
            }
        }
        FilterType::Up => {
            if !prior.is_empty() {
                for (current, above) in line.iter_mut().zip(prior) {
                    *current = current.wrapping_add(*above);
                }
            }
        }
        FilterType::Average => {
            for i in 0..line.len() {
                let left = if i >= bpp { line[i - bpp] as u16 } else { 0 };
                let above = if prior.is_empty() { 0 } else { prior[i] as u16 };
                line[i] = line[i].wrapping_add(((left + above) / 2) as u8);
            }
        }
        FilterType::Paeth => {
            for i in 0..line.len() {
                let left = if i >= bpp { line[i - bpp] } else { 0 };
                let above = if prior.is_empty() { 0 } else { prior[i] };
                let above_left = if i >= bpp && !prior.is_empty() { prior[i - bpp] } else { 0 };
                line[i] = line[i].wrapping_add(paeth_predictor(left, above, above_left));
            }
        }
    }
}

/// Reconstruct every scanline of the inflated buffer in place.
///
/// The buffer must hold `height` records of `1 + bytes_per_line` bytes; a
/// shorter buffer fails with [`FormatError::Truncated`], an unknown filter
/// byte with [`FormatError::InvalidField`]. Filter bytes are reset to zero
/// as rows are reconstructed, so the buffer can be walked again afterwards.
pub(crate) fn unfilter_image(header: &Header, data: &mut [u8]) -> Result<(), FormatError> {
    let bpp = header.bytes_per_pixel();
    let stride = 1 + header.bytes_per_line();
    let needed = header.expected_data_len()?;

    if data.len() < needed {
        return Err(FormatError::Truncated);
    }

    trace!("unfiltering {} scanlines of {} bytes", header.height, stride - 1);

    for y in 0..header.height as usize {
        let (done, rest) = data.split_at_mut(y * stride);
        let row = &mut rest[..stride];

        let filter =
            FilterType::try_from(row[0]).map_err(|_| FormatError::InvalidField)?;
        row[0] = 0;

        let prior: &[u8] =
            if y == 0 { &[] } else { &done[(y - 1) * stride + 1..y * stride] };

        unfilter_line(filter, bpp, &mut row[1..], prior);
    }

    Ok(())
}

/// The inverse of [`unfilter_line`]: apply `filter` to a raw scanline given
/// the raw previous line. Used to synthesize filtered streams in tests.
#[cfg(test)]
pub(crate) fn filter_line(
    filter: FilterType,
    bpp: usize,
    raw: &[u8],
    prior: &[u8],
) -> alloc::vec::Vec<u8> {
    let mut out = alloc::vec::Vec::with_capacity(raw.len());

    for i in 0..raw.len() {
        let left = if i >= bpp { raw[i - bpp] } else { 0 };
        let above = if prior.is_empty() { 0 } else { prior[i] };
        let above_left = if i >= bpp && !prior.is_empty() { prior[i - bpp] } else { 0 };

        let predicted = match filter {
            FilterType::None => 0,
            FilterType::Sub => left,
            FilterType::Up => above,
            FilterType::Average => ((left as u16 + above as u16) / 2) as u8,
            FilterType::Paeth => paeth_predictor(left, above, above_left),
        };

        out.push(raw[i].wrapping_sub(predicted));
    }

    out
}
