//! Sample extraction: packed, unfiltered scanlines into normalized
//! per-channel float planes.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::chunk::{BitDepth, ColorType, Header};
use crate::error::FormatError;
use crate::raster::{Channel, ImageComponent, Palette};

/// Reads samples of 1, 2, 4, 8 or 16 bits from a packed scanline, MSB first.
/// Scanlines are byte-aligned, so the cursor resets per row.
struct SampleCursor<'a> {
    row: &'a [u8],
    bit: usize,
}

impl<'a> SampleCursor<'a> {
    fn new(row: &'a [u8]) -> Self {
        Self { row, bit: 0 }
    }

    fn next(&mut self, depth: BitDepth) -> u16 {
        match depth {
            BitDepth::Eight => {
                let value = self.row[self.bit / 8] as u16;
                self.bit += 8;
                value
            }
            BitDepth::Sixteen => {
                let offset = self.bit / 8;
                let value = u16::from_be_bytes([self.row[offset], self.row[offset + 1]]);
                self.bit += 16;
                value
            }
            sub_byte => {
                let width = sub_byte as usize;
                let byte = self.row[self.bit / 8];
                let shift = 8 - self.bit % 8 - width;
                self.bit += width;
                ((byte >> shift) & ((1 << width) - 1)) as u16
            }
        }
    }
}

/// Unpack the unfiltered image buffer (filter bytes still interleaved, one
/// per row) into one float component per channel of the color type.
///
/// Samples are normalized to `[0, 1]` by `2^bit_depth - 1`, except palette
/// indices which are kept as raw index values for the palette pass.
pub(crate) fn extract_components(
    header: &Header,
    data: &[u8],
) -> Result<BTreeMap<Channel, ImageComponent>, FormatError> {
    let stride = 1 + header.bytes_per_line();
    let needed = header.expected_data_len()?;

    if data.len() < needed {
        return Err(FormatError::Truncated);
    }

    let channels = header.color_type.channels();
    let pixel_count = header.width as usize * header.height as usize;
    let max_sample = ((1u32 << header.bit_depth as u32) - 1) as f32;
    let normalize = header.color_type != ColorType::Indexed;

    let mut planes: Vec<Vec<f32>> = channels.iter().map(|_| Vec::with_capacity(pixel_count)).collect();

    for y in 0..header.height as usize {
        let row = &data[y * stride + 1..(y + 1) * stride];
        let mut cursor = SampleCursor::new(row);

        for _x in 0..header.width {
            for plane in planes.iter_mut() {
                let sample = cursor.next(header.bit_depth) as f32;
                plane.push(if normalize { sample / max_sample } else { sample });
            }
        }
    }

    Ok(channels
        .iter()
        .zip(planes)
        .map(|(&channel, samples)| {
            (channel, ImageComponent::new(channel, header.width, header.height, samples))
        })
        .collect())
}

/// Replace the PaletteIndex component of an indexed image with resolved
/// Red/Green/Blue planes. An indexed tRNS payload adds an Alpha plane with
/// per-index opacity; indices past the end of the table are opaque.
pub(crate) fn resolve_palette(
    components: &mut BTreeMap<Channel, ImageComponent>,
    palette: &Palette,
    transparency: Option<&[u8]>,
) -> Result<(), FormatError> {
    let indices = match components.remove(&Channel::PaletteIndex) {
        Some(component) => component,
        None => return Ok(()),
    };

    let pixel_count = indices.samples.len();
    let mut red = Vec::with_capacity(pixel_count);
    let mut green = Vec::with_capacity(pixel_count);
    let mut blue = Vec::with_capacity(pixel_count);
    let mut alpha = transparency.map(|_| Vec::with_capacity(pixel_count));

    for &sample in &indices.samples {
        let index = sample as usize;
        let entry = palette.entries.get(index).ok_or(FormatError::MalformedPalette)?;

        red.push(entry[0]);
        green.push(entry[1]);
        blue.push(entry[2]);

        if let (Some(alpha), Some(table)) = (alpha.as_mut(), transparency) {
            let opacity = table.get(index).copied().unwrap_or(u8::MAX);
            alpha.push(opacity as f32 / 255.0);
        }
    }

    let (width, height) = (indices.width, indices.height);
    components.insert(Channel::Red, ImageComponent::new(Channel::Red, width, height, red));
    components.insert(Channel::Green, ImageComponent::new(Channel::Green, width, height, green));
    components.insert(Channel::Blue, ImageComponent::new(Channel::Blue, width, height, blue));

    if let Some(alpha) = alpha {
        components.insert(Channel::Alpha, ImageComponent::new(Channel::Alpha, width, height, alpha));
    }

    Ok(())
}
