//! Conversion of decompressed sample buffers into the canonical BGRA raster.

use super::stream::ByteOrder;
use crate::error::{TiffFormatError, TiffResult, TiffUnsupportedError};
use crate::tags::{PhotometricInterpretation, PlanarConfiguration};

/// Sample layout of a decompressed buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SampleLayout {
    pub photometric: PhotometricInterpretation,
    pub bits_per_sample: u16,
    pub samples_per_pixel: u16,
    pub planar: PlanarConfiguration,
    pub byte_order: ByteOrder,
}

/// Maps raw samples to `width * height * 4` B,G,R,A bytes.
///
/// The dispatch is exhaustive: combinations outside the table fail typed
/// rather than guessing.
pub(crate) fn to_bgra(
    samples: &[u8],
    width: u32,
    height: u32,
    layout: &SampleLayout,
) -> TiffResult<Vec<u8>> {
    use PhotometricInterpretation::{BlackIsZero, WhiteIsZero, RGB};

    let width = width as usize;
    let height = height as usize;

    match (
        layout.photometric,
        layout.bits_per_sample,
        layout.samples_per_pixel,
    ) {
        (WhiteIsZero, 1, 1) | (BlackIsZero, 1, 1) => {
            bilevel_to_bgra(samples, width, height, layout.photometric == WhiteIsZero)
        }
        (BlackIsZero, 8, 1) => gray8_to_bgra(samples, width, height),
        (WhiteIsZero, 16, 1) | (BlackIsZero, 16, 1) => gray16_to_bgra(
            samples,
            width,
            height,
            layout.byte_order,
            layout.photometric == WhiteIsZero,
        ),
        (RGB, 8, 3) | (RGB, 8, 4) => rgb8_to_bgra(
            samples,
            width,
            height,
            usize::from(layout.samples_per_pixel),
            layout.planar,
        ),
        (RGB, 16, 3) | (RGB, 16, 4) => rgb16_to_bgra(
            samples,
            width,
            height,
            usize::from(layout.samples_per_pixel),
            layout.planar,
            layout.byte_order,
        ),
        (photometric, bits_per_sample, samples_per_pixel) => {
            Err(TiffUnsupportedError::UnsupportedPixelFormat {
                photometric,
                bits_per_sample,
                samples_per_pixel,
            }
            .into())
        }
    }
}

fn ensure_len(samples: &[u8], expected: usize) -> TiffResult<()> {
    if samples.len() < expected {
        return Err(TiffFormatError::ChunkTooShort {
            expected,
            actual: samples.len(),
        }
        .into());
    }
    Ok(())
}

/// Bit-unpacks byte-aligned 1-bpp rows, MSB first.
fn bilevel_to_bgra(
    samples: &[u8],
    width: usize,
    height: usize,
    white_is_zero: bool,
) -> TiffResult<Vec<u8>> {
    let row_bytes = (width + 7) / 8;
    ensure_len(samples, row_bytes * height)?;

    let (set, clear) = if white_is_zero { (0, 0xFF) } else { (0xFF, 0) };
    let mut out = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        let row = &samples[y * row_bytes..(y + 1) * row_bytes];
        for x in 0..width {
            let bit = row[x / 8] & (0x80 >> (x % 8)) != 0;
            let v = if bit { set } else { clear };
            out.extend_from_slice(&[v, v, v, 0xFF]);
        }
    }
    Ok(out)
}

fn gray8_to_bgra(samples: &[u8], width: usize, height: usize) -> TiffResult<Vec<u8>> {
    ensure_len(samples, width * height)?;

    let mut out = Vec::with_capacity(width * height * 4);
    for &v in &samples[..width * height] {
        out.extend_from_slice(&[v, v, v, 0xFF]);
    }
    Ok(out)
}

/// 16-bit grayscale is contrast-stretched over the image's own sample range.
fn gray16_to_bgra(
    samples: &[u8],
    width: usize,
    height: usize,
    byte_order: ByteOrder,
    white_is_zero: bool,
) -> TiffResult<Vec<u8>> {
    let count = width * height;
    ensure_len(samples, count * 2)?;

    let sample_at = |i: usize| byte_order.u16_from_bytes([samples[2 * i], samples[2 * i + 1]]);

    let mut min = u16::MAX;
    let mut max = u16::MIN;
    for i in 0..count {
        let v = sample_at(i);
        min = min.min(v);
        max = max.max(v);
    }
    let scale = if max > min {
        255.0 / f64::from(max - min)
    } else {
        0.0
    };

    let mut out = Vec::with_capacity(count * 4);
    for i in 0..count {
        let stretched = (f64::from(sample_at(i) - min) * scale) as u8;
        let v = if white_is_zero {
            0xFF - stretched
        } else {
            stretched
        };
        out.extend_from_slice(&[v, v, v, 0xFF]);
    }
    Ok(out)
}

fn rgb8_to_bgra(
    samples: &[u8],
    width: usize,
    height: usize,
    samples_per_pixel: usize,
    planar: PlanarConfiguration,
) -> TiffResult<Vec<u8>> {
    let count = width * height;
    ensure_len(samples, count * samples_per_pixel)?;

    let mut out = Vec::with_capacity(count * 4);
    match planar {
        PlanarConfiguration::Chunky => {
            for px in samples[..count * samples_per_pixel].chunks_exact(samples_per_pixel) {
                let a = if samples_per_pixel == 4 { px[3] } else { 0xFF };
                out.extend_from_slice(&[px[2], px[1], px[0], a]);
            }
        }
        PlanarConfiguration::Planar => {
            // Full-image channel blocks: R plane, G plane, B plane (, A plane).
            for i in 0..count {
                let a = if samples_per_pixel == 4 {
                    samples[3 * count + i]
                } else {
                    0xFF
                };
                out.extend_from_slice(&[samples[2 * count + i], samples[count + i], samples[i], a]);
            }
        }
    }
    Ok(out)
}

/// Round-to-nearest 16-to-8 downsampling, saturated at 255.
#[inline]
fn downsample16(v: u16) -> u8 {
    ((u32::from(v) + 128) >> 8).min(255) as u8
}

fn rgb16_to_bgra(
    samples: &[u8],
    width: usize,
    height: usize,
    samples_per_pixel: usize,
    planar: PlanarConfiguration,
    byte_order: ByteOrder,
) -> TiffResult<Vec<u8>> {
    let count = width * height;
    ensure_len(samples, count * samples_per_pixel * 2)?;

    let sample_at = |i: usize| byte_order.u16_from_bytes([samples[2 * i], samples[2 * i + 1]]);
    let channel = |pixel: usize, c: usize| match planar {
        PlanarConfiguration::Chunky => sample_at(pixel * samples_per_pixel + c),
        PlanarConfiguration::Planar => sample_at(c * count + pixel),
    };

    let mut out = Vec::with_capacity(count * 4);
    for i in 0..count {
        let r = downsample16(channel(i, 0));
        let g = downsample16(channel(i, 1));
        let b = downsample16(channel(i, 2));
        let a = if samples_per_pixel == 4 {
            downsample16(channel(i, 3))
        } else {
            0xFF
        };
        out.extend_from_slice(&[b, g, r, a]);
    }
    Ok(out)
}
