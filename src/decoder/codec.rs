//! Per-chunk decompression.
//!
//! Strip and tile payloads are routed here with the directory they came from,
//! since several schemes need tag-derived options (fill order, fax coding
//! options, predictor). The bit-level fax, LZW and inflate algorithms live in
//! external codec crates; this module prepares their inputs and consumes
//! their outputs.

use std::io::Read;

use super::ifd::Directory;
use crate::error::{TiffFormatError, TiffResult, TiffUnsupportedError};
use crate::tags::{
    CompressionMethod, FillOrder, PhotometricInterpretation, Predictor, Tag,
};

/// Decompresses one strip or tile payload into raw sample bytes.
///
/// `width` and `height` are the chunk dimensions, not the image dimensions.
/// Embedded JPEG chunks do not pass through here; they decode straight to
/// BGRA (see [`decode_jpeg_chunk`]).
pub(crate) fn decompress(
    data: &[u8],
    method: CompressionMethod,
    width: u32,
    height: u32,
    photometric: PhotometricInterpretation,
    dir: &Directory,
) -> TiffResult<Vec<u8>> {
    let _ = (width, height, photometric, dir);
    match method {
        CompressionMethod::None => Ok(data.to_vec()),

        #[cfg(feature = "fax")]
        CompressionMethod::CcittRle | CompressionMethod::Fax3 | CompressionMethod::Fax4 => {
            let options = CcittOptions::from_directory(method, photometric, dir);
            let reversed;
            let data = match FillOrder::from_u16(dir.u16_or(Tag::FillOrder, 1)) {
                Some(FillOrder::LeastSignificantFirst) => {
                    let mut bytes = data.to_vec();
                    reverse_bit_order(&mut bytes);
                    reversed = bytes;
                    &reversed[..]
                }
                _ => data,
            };
            ccitt_decompress(data, width, height, &options)
        }

        #[cfg(feature = "lzw")]
        CompressionMethod::LZW => {
            let primary = match FillOrder::from_u16(dir.u16_or(Tag::FillOrder, 1)) {
                Some(FillOrder::LeastSignificantFirst) => weezl::BitOrder::Lsb,
                _ => weezl::BitOrder::Msb,
            };
            let fallback = match primary {
                weezl::BitOrder::Msb => weezl::BitOrder::Lsb,
                weezl::BitOrder::Lsb => weezl::BitOrder::Msb,
            };

            // Real-world encoders disagree on bit order and early-change
            // timing; try the declared order first, then the alternatives.
            // The first stream that decodes without error wins.
            let attempts = [
                (primary, true),
                (fallback, true),
                (primary, false),
                (fallback, false),
            ];

            let mut last_error = None;
            for (order, early_change) in attempts {
                match lzw_decompress(data, order, early_change) {
                    Ok(out) => return Ok(out),
                    Err(err) => last_error = Some(err),
                }
            }
            Err(TiffFormatError::Decompression {
                method,
                detail: last_error
                    .map(|err| err.to_string())
                    .unwrap_or_default(),
            }
            .into())
        }

        CompressionMethod::PackBits => Ok(unpack_packbits(data)),

        #[cfg(feature = "deflate")]
        CompressionMethod::Deflate | CompressionMethod::OldDeflate => {
            let mut out = Vec::new();
            flate2::read::ZlibDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|err| TiffFormatError::Decompression {
                    method,
                    detail: err.to_string(),
                })?;
            if Predictor::from_u16(dir.u16_or(Tag::Predictor, 1)) == Some(Predictor::Horizontal) {
                undo_horizontal_predictor(&mut out, height);
            }
            Ok(out)
        }

        method => Err(TiffUnsupportedError::UnsupportedCompressionMethod(method).into()),
    }
}

/// Reverses the bit order of every byte in place.
pub(crate) fn reverse_bit_order(data: &mut [u8]) {
    for byte in data.iter_mut() {
        let mut b = *byte;
        b = (b & 0xF0) >> 4 | (b & 0x0F) << 4;
        b = (b & 0xCC) >> 2 | (b & 0x33) << 2;
        b = (b & 0xAA) >> 1 | (b & 0x55) << 1;
        *byte = b;
    }
}

/// Classic byte-oriented PackBits RLE.
///
/// Truncated trailing runs are clamped to the available input rather than
/// rejected.
pub(crate) fn unpack_packbits(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut pos = 0;
    while pos < data.len() {
        let header = data[pos] as i8;
        pos += 1;
        if header >= 0 {
            let count = header as usize + 1;
            let end = (pos + count).min(data.len());
            out.extend_from_slice(&data[pos..end]);
            pos = end;
        } else if header != -128 {
            let count = (1 - header as isize) as usize;
            if let Some(&value) = data.get(pos) {
                out.extend(std::iter::repeat(value).take(count));
                pos += 1;
            }
        }
        // header == -128 is a no-op.
    }
    out
}

/// Undoes bytewise horizontal differencing, independently per scanline.
pub(crate) fn undo_horizontal_predictor(buf: &mut [u8], height: u32) {
    let height = height as usize;
    if height == 0 || buf.len() < height {
        return;
    }
    let row_bytes = buf.len() / height;
    for row in buf.chunks_exact_mut(row_bytes) {
        for i in 1..row.len() {
            row[i] = row[i].wrapping_add(row[i - 1]);
        }
    }
}

/// Parameters handed to the external CCITT decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CcittOptions {
    /// 2 for modified-Huffman RLE, 3 for Group 3, 4 for Group 4.
    pub group: u8,
    /// Group 3 coding dimension: 0 pure 1-D, 2 mixed 1-D/2-D, -1 for Group 4.
    pub k: i32,
    /// Whether a 1 bit encodes black in the unpacked rows.
    pub black_is_1: bool,
    pub end_of_line: bool,
    pub end_of_block: bool,
}

impl CcittOptions {
    pub(crate) fn from_directory(
        method: CompressionMethod,
        photometric: PhotometricInterpretation,
        dir: &Directory,
    ) -> CcittOptions {
        let black_is_1 = photometric == PhotometricInterpretation::WhiteIsZero;
        match method {
            CompressionMethod::Fax4 => CcittOptions {
                group: 4,
                k: -1,
                black_is_1,
                end_of_line: false,
                end_of_block: true,
            },
            CompressionMethod::Fax3 => {
                let t4_options = dir.u32_or(Tag::T4Options, 0);
                CcittOptions {
                    group: 3,
                    k: if t4_options & 1 != 0 { 2 } else { 0 },
                    black_is_1,
                    end_of_line: false,
                    end_of_block: true,
                }
            }
            _ => CcittOptions {
                group: 2,
                k: 0,
                black_is_1,
                end_of_line: false,
                end_of_block: false,
            },
        }
    }
}

/// Runs the external fax decoder and packs its per-row output into MSB-first
/// 1-bpp rows.
#[cfg(feature = "fax")]
fn ccitt_decompress(
    data: &[u8],
    width: u32,
    height: u32,
    options: &CcittOptions,
) -> TiffResult<Vec<u8>> {
    use fax34::decoder::{decode_g3, decode_g4, pels};
    use fax34::Color;

    let method = match options.group {
        4 => CompressionMethod::Fax4,
        3 => CompressionMethod::Fax3,
        _ => CompressionMethod::CcittRle,
    };
    let width16 = u16::try_from(width).map_err(|_| TiffFormatError::Decompression {
        method,
        detail: format!("width {} exceeds fax line limit", width),
    })?;
    let height16 = u16::try_from(height).ok();

    let row_bytes = (width as usize + 7) / 8;
    let expected = row_bytes * height as usize;
    let mut out = Vec::with_capacity(expected);
    let mut rows = 0usize;

    let line_cb = |transitions: &[u16]| {
        if rows >= height as usize {
            return;
        }
        let mut row = vec![0u8; row_bytes];
        for (i, color) in pels(transitions, width16).enumerate().take(width as usize) {
            let black = color == Color::Black;
            if black == options.black_is_1 {
                row[i / 8] |= 0x80 >> (i % 8);
            }
        }
        out.extend_from_slice(&row);
        rows += 1;
    };

    let status = match options.group {
        4 => decode_g4(data.iter().copied(), width16, height16, line_cb),
        _ => decode_g3(data.iter().copied(), line_cb),
    };
    if status.is_none() {
        return Err(TiffFormatError::Decompression {
            method,
            detail: "invalid fax code word".into(),
        }
        .into());
    }
    if out.len() < expected {
        return Err(TiffFormatError::ChunkTooShort {
            expected,
            actual: out.len(),
        }
        .into());
    }
    Ok(out)
}

#[cfg(feature = "lzw")]
fn lzw_decompress(
    data: &[u8],
    order: weezl::BitOrder,
    early_change: bool,
) -> std::io::Result<Vec<u8>> {
    // `with_tiff_size_switch` is the early-change table growth; plain `new`
    // grows one code later.
    let mut decoder = if early_change {
        weezl::decode::Decoder::with_tiff_size_switch(order, 8)
    } else {
        weezl::decode::Decoder::new(order, 8)
    };
    let mut out = Vec::new();
    decoder.into_stream(&mut out).decode_all(data).status?;
    Ok(out)
}

/// Splices a `JPEGTables` payload and a chunk payload into one interchange
/// stream per TIFF Technical Note #2.
#[cfg(feature = "jpeg")]
pub(crate) fn splice_jpeg_tables(tables: &[u8], payload: &[u8]) -> Vec<u8> {
    let tables = strip_jpeg_markers(tables);
    let payload = strip_jpeg_markers(payload);
    let mut out = Vec::with_capacity(4 + tables.len() + payload.len());
    out.extend_from_slice(&[0xFF, 0xD8]);
    out.extend_from_slice(tables);
    out.extend_from_slice(payload);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

#[cfg(feature = "jpeg")]
fn strip_jpeg_markers(data: &[u8]) -> &[u8] {
    let mut data = data;
    if data.starts_with(&[0xFF, 0xD8]) {
        data = &data[2..];
    }
    if data.ends_with(&[0xFF, 0xD9]) {
        data = &data[..data.len() - 2];
    }
    data
}

/// Decodes one embedded JPEG chunk to BGRA, validating its dimensions.
#[cfg(feature = "jpeg")]
pub(crate) fn decode_jpeg_chunk(
    payload: &[u8],
    tables: Option<&[u8]>,
    expected: (u32, u32),
    method: CompressionMethod,
) -> TiffResult<Vec<u8>> {
    use zune_jpeg::zune_core::bytestream::ZCursor;
    use zune_jpeg::zune_core::colorspace::ColorSpace;
    use zune_jpeg::zune_core::options::DecoderOptions;

    let spliced;
    let stream: &[u8] = match tables {
        Some(tables) => {
            spliced = splice_jpeg_tables(tables, payload);
            &spliced
        }
        None => payload,
    };

    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGB);
    let mut decoder = zune_jpeg::JpegDecoder::new_with_options(ZCursor::new(stream), options);
    let rgb = decoder
        .decode()
        .map_err(|err| TiffFormatError::Decompression {
            method,
            detail: err.to_string(),
        })?;
    let (width, height) = decoder
        .dimensions()
        .ok_or(TiffFormatError::Decompression {
            method,
            detail: "missing frame header".into(),
        })?;
    let actual = (width as u32, height as u32);
    if actual != expected {
        return Err(TiffFormatError::JpegDimensionMismatch { expected, actual }.into());
    }

    let pixels = width * height;
    if rgb.len() < pixels * 3 {
        return Err(TiffFormatError::ChunkTooShort {
            expected: pixels * 3,
            actual: rgb.len(),
        }
        .into());
    }
    let mut out = Vec::with_capacity(pixels * 4);
    for px in rgb[..pixels * 3].chunks_exact(3) {
        out.extend_from_slice(&[px[2], px[1], px[0], 0xFF]);
    }
    Ok(out)
}
