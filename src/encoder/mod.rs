//! TIFF encoding of BGRA rasters.
//!
//! The encoder is deliberately narrow compared to the decoder: one image,
//! one strip, chunky 8-bit RGB, uncompressed or LZW. The file is laid out
//! front to back (header, strip data, IFD, deferred values) so it can be
//! written to a plain `Write` sink.

use std::io::Write;

use crate::error::{TiffResult, TiffUnsupportedError};
use crate::raster::Raster;
use crate::tags::{
    CompressionMethod, PhotometricInterpretation, PlanarConfiguration, ResolutionUnit, Tag, Type,
};

mod writer;

use self::writer::TiffWriter;

const HEADER_BYTES: u32 = 8;
const ENTRY_BYTES: u32 = 12;

/// One IFD entry staged for emission.
struct RawEntry {
    tag: Tag,
    field_type: Type,
    count: u32,
    /// Little-endian value bytes; placed inline when at most 4 bytes.
    payload: Vec<u8>,
}

impl RawEntry {
    fn short(tag: Tag, value: u16) -> RawEntry {
        RawEntry {
            tag,
            field_type: Type::SHORT,
            count: 1,
            payload: value.to_le_bytes().to_vec(),
        }
    }

    fn shorts(tag: Tag, values: &[u16]) -> RawEntry {
        RawEntry {
            tag,
            field_type: Type::SHORT,
            count: values.len() as u32,
            payload: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn long(tag: Tag, value: u32) -> RawEntry {
        RawEntry {
            tag,
            field_type: Type::LONG,
            count: 1,
            payload: value.to_le_bytes().to_vec(),
        }
    }

    fn rational(tag: Tag, numerator: u32, denominator: u32) -> RawEntry {
        let mut payload = numerator.to_le_bytes().to_vec();
        payload.extend_from_slice(&denominator.to_le_bytes());
        RawEntry {
            tag,
            field_type: Type::RATIONAL,
            count: 1,
            payload,
        }
    }
}

/// Tiff encoder.
///
/// Writes a single-image little-endian TIFF with a fixed baseline tag set.
pub struct TiffEncoder<W> {
    writer: TiffWriter<W>,
}

impl<W: Write> TiffEncoder<W> {
    pub fn new(writer: W) -> TiffEncoder<W> {
        TiffEncoder {
            writer: TiffWriter::new(writer),
        }
    }

    /// Encodes the raster as chunky RGB in one strip.
    ///
    /// Only [`CompressionMethod::None`] and [`CompressionMethod::LZW`] are
    /// accepted; the decode side supports more schemes than this.
    pub fn write_image(
        &mut self,
        raster: &Raster,
        compression: CompressionMethod,
    ) -> TiffResult<()> {
        let strip = compress_strip(&bgra_to_rgb(raster.data()), compression)?;

        let entries = [
            RawEntry::long(Tag::ImageWidth, raster.width()),
            RawEntry::long(Tag::ImageLength, raster.height()),
            RawEntry::shorts(Tag::BitsPerSample, &[8, 8, 8]),
            RawEntry::short(Tag::Compression, compression.to_u16()),
            RawEntry::short(
                Tag::PhotometricInterpretation,
                PhotometricInterpretation::RGB.to_u16(),
            ),
            RawEntry::long(Tag::StripOffsets, HEADER_BYTES),
            RawEntry::short(Tag::SamplesPerPixel, 3),
            RawEntry::long(Tag::RowsPerStrip, raster.height()),
            RawEntry::long(Tag::StripByteCounts, strip.len() as u32),
            RawEntry::rational(Tag::XResolution, 72, 1),
            RawEntry::rational(Tag::YResolution, 72, 1),
            RawEntry::short(
                Tag::PlanarConfiguration,
                PlanarConfiguration::Chunky.to_u16(),
            ),
            RawEntry::short(Tag::ResolutionUnit, ResolutionUnit::Inch.to_u16()),
        ];

        // Header; the IFD sits directly behind the strip data.
        let ifd_offset = HEADER_BYTES + strip.len() as u32;
        self.writer.write_bytes(b"II")?;
        self.writer.write_u16(42)?;
        self.writer.write_u32(ifd_offset)?;

        self.writer.write_bytes(&strip)?;

        // Values wider than the 4-byte field land behind the IFD, placed by a
        // running offset.
        let mut deferred_offset =
            ifd_offset + 2 + entries.len() as u32 * ENTRY_BYTES + 4;
        let mut deferred: Vec<&[u8]> = Vec::new();

        self.writer.write_u16(entries.len() as u16)?;
        for entry in &entries {
            self.writer.write_u16(entry.tag.to_u16())?;
            self.writer.write_u16(entry.field_type.to_u16())?;
            self.writer.write_u32(entry.count)?;
            if entry.payload.len() <= 4 {
                let mut value = [0u8; 4];
                value[..entry.payload.len()].copy_from_slice(&entry.payload);
                self.writer.write_bytes(&value)?;
            } else {
                self.writer.write_u32(deferred_offset)?;
                deferred_offset += entry.payload.len() as u32;
                deferred.push(&entry.payload);
            }
        }
        // No further directories.
        self.writer.write_u32(0)?;

        for payload in deferred {
            self.writer.write_bytes(payload)?;
        }
        Ok(())
    }
}

/// Encodes a raster into an in-memory TIFF.
pub fn encode_to_vec(raster: &Raster, compression: CompressionMethod) -> TiffResult<Vec<u8>> {
    let mut out = Vec::new();
    TiffEncoder::new(&mut out).write_image(raster, compression)?;
    Ok(out)
}

fn bgra_to_rgb(bgra: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(bgra.len() / 4 * 3);
    for px in bgra.chunks_exact(4) {
        rgb.extend_from_slice(&[px[2], px[1], px[0]]);
    }
    rgb
}

#[cfg(feature = "lzw")]
fn compress_strip(rgb: &[u8], compression: CompressionMethod) -> TiffResult<Vec<u8>> {
    match compression {
        CompressionMethod::None => Ok(rgb.to_vec()),
        CompressionMethod::LZW => {
            let mut out = Vec::new();
            let mut encoder =
                weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8);
            encoder
                .into_stream(&mut out)
                .encode_all(rgb)
                .status
                .map_err(crate::error::TiffError::IoError)?;
            Ok(out)
        }
        method => Err(TiffUnsupportedError::UnsupportedCompressionForEncoding(method).into()),
    }
}

#[cfg(not(feature = "lzw"))]
fn compress_strip(rgb: &[u8], compression: CompressionMethod) -> TiffResult<Vec<u8>> {
    match compression {
        CompressionMethod::None => Ok(rgb.to_vec()),
        method => Err(TiffUnsupportedError::UnsupportedCompressionForEncoding(method).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster_2x1() -> Raster {
        Raster::from_bgra(2, 1, vec![3, 2, 1, 0xFF, 6, 5, 4, 0xFF]).unwrap()
    }

    #[test]
    fn header_and_strip_layout() {
        let encoded = encode_to_vec(&raster_2x1(), CompressionMethod::None).unwrap();
        assert_eq!(&encoded[..4], b"II\x2A\x00");
        // Strip data sits right behind the header, RGB order.
        assert_eq!(&encoded[8..14], &[1, 2, 3, 4, 5, 6]);
        // IFD offset points behind the strip.
        assert_eq!(u32::from_le_bytes(encoded[4..8].try_into().unwrap()), 14);
    }

    #[test]
    fn ifd_entries_are_ascending_and_terminated() {
        let encoded = encode_to_vec(&raster_2x1(), CompressionMethod::None).unwrap();
        let ifd = u32::from_le_bytes(encoded[4..8].try_into().unwrap()) as usize;
        let count = u16::from_le_bytes(encoded[ifd..ifd + 2].try_into().unwrap()) as usize;
        assert_eq!(count, 13);

        let mut previous = 0u16;
        for i in 0..count {
            let at = ifd + 2 + i * 12;
            let tag = u16::from_le_bytes(encoded[at..at + 2].try_into().unwrap());
            assert!(tag > previous, "tag {} out of order", tag);
            previous = tag;
        }
        let next_ifd_at = ifd + 2 + count * 12;
        assert_eq!(
            u32::from_le_bytes(encoded[next_ifd_at..next_ifd_at + 4].try_into().unwrap()),
            0
        );
    }

    #[test]
    fn wide_values_are_deferred_behind_the_ifd() {
        let encoded = encode_to_vec(&raster_2x1(), CompressionMethod::None).unwrap();
        let ifd = u32::from_le_bytes(encoded[4..8].try_into().unwrap()) as usize;
        let deferred_start = (ifd + 2 + 13 * 12 + 4) as u32;

        // BitsPerSample is the first deferred value: three SHORTs of 8.
        let mut bits_offset = None;
        for i in 0..13 {
            let at = ifd + 2 + i * 12;
            let tag = u16::from_le_bytes(encoded[at..at + 2].try_into().unwrap());
            if tag == Tag::BitsPerSample.to_u16() {
                bits_offset =
                    Some(u32::from_le_bytes(encoded[at + 8..at + 12].try_into().unwrap()));
            }
        }
        assert_eq!(bits_offset, Some(deferred_start));
        let bits = deferred_start as usize;
        assert_eq!(&encoded[bits..bits + 6], &[8, 0, 8, 0, 8, 0]);
        // Deferred region: 6 bytes of BitsPerSample + two 8-byte rationals.
        assert_eq!(encoded.len(), bits + 6 + 16);
    }

    #[test]
    fn rejects_unsupported_compression() {
        let err = encode_to_vec(&raster_2x1(), CompressionMethod::PackBits).unwrap_err();
        assert!(matches!(
            err,
            crate::TiffError::UnsupportedError(
                TiffUnsupportedError::UnsupportedCompressionForEncoding(_)
            )
        ));
    }
}
