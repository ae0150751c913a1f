//! TIFF decoding to BGRA rasters.

use std::io::{Read, Seek};

use crate::error::{TiffFormatError, TiffResult};
use crate::raster::Raster;
use crate::tags::{CompressionMethod, PhotometricInterpretation, PlanarConfiguration, Tag};

pub mod ifd;

mod codec;
mod convert;
mod resample;
mod stream;

pub use self::ifd::{Directory, Value};
pub use self::stream::ByteOrder;

use self::convert::SampleLayout;
use self::stream::{EndianReader, SmartReader};

/// The representation of a TIFF decoder.
///
/// Decodes the first image file directory; multi-page files are out of scope
/// and their remaining directories are ignored.
#[derive(Debug)]
pub struct Decoder<R>
where
    R: Read + Seek,
{
    reader: SmartReader<R>,
    directory: Directory,
    width: u32,
    height: u32,
    bits_per_sample: Vec<u16>,
    samples: u16,
    photometric_interpretation: PhotometricInterpretation,
    compression_method: CompressionMethod,
    planar_config: PlanarConfiguration,
}

impl<R: Read + Seek> Decoder<R> {
    /// Create a new decoder that decodes from the stream `r`.
    ///
    /// Reads the header and parses the first IFD eagerly; image data is only
    /// touched by [`read_image`](Self::read_image).
    pub fn new(r: R) -> TiffResult<Decoder<R>> {
        let mut reader = SmartReader::wrap(r, ByteOrder::LittleEndian);

        let mut marker = [0u8; 2];
        reader.read_exact(&mut marker)?;
        reader.byte_order = match &marker {
            b"II" => ByteOrder::LittleEndian,
            b"MM" => ByteOrder::BigEndian,
            _ => return Err(TiffFormatError::TiffSignatureNotFound.into()),
        };

        if reader.read_u16()? != 42 {
            return Err(TiffFormatError::TiffSignatureInvalid.into());
        }

        let ifd_offset = u64::from(reader.read_u32()?);
        let directory = Directory::parse(&mut reader, ifd_offset)?;

        let width = directory.require_u32(Tag::ImageWidth)?;
        let height = directory.require_u32(Tag::ImageLength)?;
        if width == 0 || height == 0 {
            return Err(TiffFormatError::InvalidDimensions(width, height).into());
        }

        let compression_method =
            CompressionMethod::from_u16_exhaustive(directory.u16_or(Tag::Compression, 1));

        // CCITT payloads default to WhiteIsZero when the tag is absent; the
        // same resolved value feeds both the fax options and the converter so
        // polarity cannot diverge.
        let photometric_interpretation = match directory.u16(Tag::PhotometricInterpretation) {
            Some(value) => PhotometricInterpretation::from_u16(value).ok_or(
                TiffFormatError::InvalidTagValueType(Tag::PhotometricInterpretation),
            )?,
            None if compression_method.is_fax() => PhotometricInterpretation::WhiteIsZero,
            None => PhotometricInterpretation::BlackIsZero,
        };

        let planar_config = PlanarConfiguration::from_u16(
            directory.u16_or(Tag::PlanarConfiguration, 1),
        )
        .ok_or(TiffFormatError::InvalidTagValueType(
            Tag::PlanarConfiguration,
        ))?;

        let samples = directory.u16_or(Tag::SamplesPerPixel, 1);
        let bits_per_sample = directory
            .u16_vec(Tag::BitsPerSample)
            .filter(|bits| !bits.is_empty())
            .unwrap_or_else(|| vec![1]);

        Ok(Decoder {
            reader,
            directory,
            width,
            height,
            bits_per_sample,
            samples,
            photometric_interpretation,
            compression_method,
            planar_config,
        })
    }

    /// Image dimensions in pixels, before aspect-ratio correction.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The parsed first directory.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Returns the byte_order
    pub fn byte_order(&self) -> ByteOrder {
        self.reader.byte_order
    }

    pub fn compression_method(&self) -> CompressionMethod {
        self.compression_method
    }

    pub fn photometric_interpretation(&self) -> PhotometricInterpretation {
        self.photometric_interpretation
    }

    /// Decodes the image behind the first directory into a BGRA raster,
    /// including the resolution-driven vertical resampling.
    pub fn read_image(&mut self) -> TiffResult<Raster> {
        let raster = if self.compression_method.is_jpeg() {
            self.read_jpeg_image()?
        } else {
            let samples = self.read_samples()?;
            let layout = SampleLayout {
                photometric: self.photometric_interpretation,
                bits_per_sample: self.bits(),
                samples_per_pixel: self.samples,
                planar: self.planar_config,
                byte_order: self.reader.byte_order,
            };
            let bgra = convert::to_bgra(&samples, self.width, self.height, &layout)?;
            Raster::from_bgra(self.width, self.height, bgra)?
        };

        let x_res = resample::resolution_value(self.directory.rational(Tag::XResolution));
        let y_res = resample::resolution_value(self.directory.rational(Tag::YResolution));
        Ok(resample::correct_aspect_ratio(raster, x_res, y_res))
    }

    fn bits(&self) -> u16 {
        self.bits_per_sample[0]
    }

    /// Bytes per pixel of the flat sample buffer.
    fn bytes_per_pixel(&self) -> usize {
        (usize::from(self.bits()) * usize::from(self.samples) + 7) / 8
    }

    /// `RowsPerStrip` with the whole-image sentinel values normalized.
    ///
    /// `0xFFFF_FFFF`, zero and anything at least as tall as the image all
    /// mean a single strip spanning every row.
    fn rows_per_strip(&self) -> u32 {
        let rows = self.directory.u32_or(Tag::RowsPerStrip, self.height);
        if rows == 0 || rows >= self.height {
            self.height
        } else {
            rows
        }
    }

    /// Reads the offset and byte-count arrays of one layout, which must agree
    /// in length.
    fn chunk_layout(&self, offsets: Tag, byte_counts: Tag) -> TiffResult<(Vec<u32>, Vec<u32>)> {
        let offsets = self.directory.require_u32_vec(offsets)?;
        let byte_counts = self.directory.require_u32_vec(byte_counts)?;
        if offsets.len() != byte_counts.len() {
            return Err(TiffFormatError::InconsistentChunkCounts {
                offsets: offsets.len(),
                byte_counts: byte_counts.len(),
            }
            .into());
        }
        Ok((offsets, byte_counts))
    }

    fn read_chunk(&mut self, offset: u32, byte_count: u32) -> TiffResult<Vec<u8>> {
        self.reader.goto_offset(u64::from(offset))?;
        let mut payload = vec![0; byte_count as usize];
        self.reader.read_exact(&mut payload)?;
        Ok(payload)
    }

    fn decompress_chunk(
        &mut self,
        offset: u32,
        byte_count: u32,
        chunk_width: u32,
        chunk_height: u32,
    ) -> TiffResult<Vec<u8>> {
        let payload = self.read_chunk(offset, byte_count)?;
        codec::decompress(
            &payload,
            self.compression_method,
            chunk_width,
            chunk_height,
            self.photometric_interpretation,
            &self.directory,
        )
    }

    /// Reconstructs the flat sample buffer from whichever layout the
    /// directory declares.
    fn read_samples(&mut self) -> TiffResult<Vec<u8>> {
        if self.directory.contains(Tag::StripOffsets) {
            self.read_stripped_samples()
        } else if self.directory.contains(Tag::TileOffsets) {
            self.read_tiled_samples()
        } else {
            Err(TiffFormatError::LayoutTagsNotFound.into())
        }
    }

    fn read_stripped_samples(&mut self) -> TiffResult<Vec<u8>> {
        let (offsets, byte_counts) = self.chunk_layout(Tag::StripOffsets, Tag::StripByteCounts)?;

        // Non-conformant but observed: strip tags combined with tile
        // dimensions. Each strip is then a tile, laid out row-major.
        if self.directory.contains(Tag::TileWidth) && self.directory.contains(Tag::TileLength) {
            return self.read_strips_as_tiles(&offsets, &byte_counts);
        }

        if self.compression_method == CompressionMethod::None {
            let total: usize = byte_counts.iter().map(|&n| n as usize).sum();
            let mut out = Vec::with_capacity(total);
            for (&offset, &byte_count) in offsets.iter().zip(&byte_counts) {
                out.extend_from_slice(&self.read_chunk(offset, byte_count)?);
            }
            return Ok(out);
        }

        // Planar images store each channel's rows as separate strips.
        let plane_rows = match self.planar_config {
            PlanarConfiguration::Chunky => u64::from(self.height),
            PlanarConfiguration::Planar => u64::from(self.height) * u64::from(self.samples),
        };
        let rows_per_strip = u64::from(self.rows_per_strip());

        let mut out = Vec::new();
        let mut remaining_rows = plane_rows;
        for (&offset, &byte_count) in offsets.iter().zip(&byte_counts) {
            if remaining_rows == 0 {
                break;
            }
            let strip_height = rows_per_strip.min(remaining_rows) as u32;
            remaining_rows -= u64::from(strip_height);
            out.extend_from_slice(&self.decompress_chunk(
                offset,
                byte_count,
                self.width,
                strip_height,
            )?);
        }
        Ok(out)
    }

    fn tile_dimensions(&self) -> TiffResult<(u32, u32)> {
        let tile_width = self.directory.require_u32(Tag::TileWidth)?;
        let tile_length = self.directory.require_u32(Tag::TileLength)?;
        if tile_width == 0 {
            return Err(TiffFormatError::InvalidTagValueType(Tag::TileWidth).into());
        }
        if tile_length == 0 {
            return Err(TiffFormatError::InvalidTagValueType(Tag::TileLength).into());
        }
        Ok((tile_width, tile_length))
    }

    fn tile_grid(&self, tile_width: u32, tile_length: u32) -> (usize, usize) {
        let across = (self.width as usize + tile_width as usize - 1) / tile_width as usize;
        let down = (self.height as usize + tile_length as usize - 1) / tile_length as usize;
        (across, down)
    }

    fn read_strips_as_tiles(
        &mut self,
        offsets: &[u32],
        byte_counts: &[u32],
    ) -> TiffResult<Vec<u8>> {
        let (tile_width, tile_length) = self.tile_dimensions()?;
        let (tiles_across, tiles_down) = self.tile_grid(tile_width, tile_length);
        let tile_count = tiles_across * tiles_down;
        if offsets.len() < tile_count {
            return Err(TiffFormatError::InconsistentChunkCounts {
                offsets: offsets.len(),
                byte_counts: tile_count,
            }
            .into());
        }

        let bytes_per_pixel = self.bytes_per_pixel();
        let mut out =
            vec![0; self.width as usize * self.height as usize * bytes_per_pixel];
        for index in 0..tile_count {
            let tile_x = index % tiles_across;
            let tile_y = index / tiles_across;
            let tile = if self.compression_method == CompressionMethod::None {
                self.read_chunk(offsets[index], byte_counts[index])?
            } else {
                self.decompress_chunk(offsets[index], byte_counts[index], tile_width, tile_length)?
            };
            self.place_tile(
                &mut out,
                bytes_per_pixel,
                &tile,
                tile_width as usize,
                tile_length as usize,
                tile_x,
                tile_y,
            )?;
        }
        Ok(out)
    }

    fn read_tiled_samples(&mut self) -> TiffResult<Vec<u8>> {
        let (offsets, byte_counts) = self.chunk_layout(Tag::TileOffsets, Tag::TileByteCounts)?;
        let (tile_width, tile_length) = self.tile_dimensions()?;
        let (tiles_across, tiles_down) = self.tile_grid(tile_width, tile_length);
        let tile_count = tiles_across * tiles_down;
        if offsets.len() < tile_count {
            return Err(TiffFormatError::InconsistentChunkCounts {
                offsets: offsets.len(),
                byte_counts: tile_count,
            }
            .into());
        }

        let bytes_per_pixel = self.bytes_per_pixel();
        let mut out =
            vec![0; self.width as usize * self.height as usize * bytes_per_pixel];
        for index in 0..tile_count {
            // Genuine tile sets are ordered column-major; the strip-as-tile
            // hybrid above is row-major. Both orderings are kept as observed.
            let tile_x = index / tiles_down;
            let tile_y = index % tiles_down;
            let tile = if self.compression_method == CompressionMethod::None {
                self.read_chunk(offsets[index], byte_counts[index])?
            } else {
                self.decompress_chunk(offsets[index], byte_counts[index], tile_width, tile_length)?
            };
            self.place_tile(
                &mut out,
                bytes_per_pixel,
                &tile,
                tile_width as usize,
                tile_length as usize,
                tile_x,
                tile_y,
            )?;
        }
        Ok(out)
    }

    /// Copies one decompressed tile into the output buffer, clipping edge
    /// tiles to the image boundary.
    #[allow(clippy::too_many_arguments)]
    fn place_tile(
        &self,
        out: &mut [u8],
        bytes_per_pixel: usize,
        tile: &[u8],
        tile_width: usize,
        tile_length: usize,
        tile_x: usize,
        tile_y: usize,
    ) -> TiffResult<()> {
        let image_width = self.width as usize;
        let image_height = self.height as usize;
        let x0 = tile_x * tile_width;
        let y0 = tile_y * tile_length;
        if x0 >= image_width || y0 >= image_height {
            return Ok(());
        }

        let copy_width = tile_width.min(image_width - x0) * bytes_per_pixel;
        let copy_height = tile_length.min(image_height - y0);
        let tile_row_bytes = tile_width * bytes_per_pixel;

        let needed = (copy_height - 1) * tile_row_bytes + copy_width;
        if tile.len() < needed {
            return Err(TiffFormatError::ChunkTooShort {
                expected: needed,
                actual: tile.len(),
            }
            .into());
        }

        for row in 0..copy_height {
            let src = &tile[row * tile_row_bytes..row * tile_row_bytes + copy_width];
            let dst = ((y0 + row) * image_width + x0) * bytes_per_pixel;
            out[dst..dst + copy_width].copy_from_slice(src);
        }
        Ok(())
    }

    /// Embedded-JPEG chunks decode straight to BGRA and skip the sample
    /// converter.
    #[cfg(feature = "jpeg")]
    fn read_jpeg_image(&mut self) -> TiffResult<Raster> {
        let jpeg_tables = self.directory.raw(Tag::JPEGTables).map(<[u8]>::to_vec);

        if self.directory.contains(Tag::StripOffsets) {
            let (offsets, byte_counts) =
                self.chunk_layout(Tag::StripOffsets, Tag::StripByteCounts)?;
            let rows_per_strip = u64::from(self.rows_per_strip());

            let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
            let mut remaining_rows = u64::from(self.height);
            for (&offset, &byte_count) in offsets.iter().zip(&byte_counts) {
                if remaining_rows == 0 {
                    break;
                }
                let strip_height = rows_per_strip.min(remaining_rows) as u32;
                remaining_rows -= u64::from(strip_height);

                let payload = self.read_chunk(offset, byte_count)?;
                out.extend_from_slice(&codec::decode_jpeg_chunk(
                    &payload,
                    jpeg_tables.as_deref(),
                    (self.width, strip_height),
                    self.compression_method,
                )?);
            }
            Raster::from_bgra(self.width, self.height, out)
        } else if self.directory.contains(Tag::TileOffsets) {
            let (offsets, byte_counts) =
                self.chunk_layout(Tag::TileOffsets, Tag::TileByteCounts)?;
            let (tile_width, tile_length) = self.tile_dimensions()?;
            let (tiles_across, tiles_down) = self.tile_grid(tile_width, tile_length);
            let tile_count = tiles_across * tiles_down;
            if offsets.len() < tile_count {
                return Err(TiffFormatError::InconsistentChunkCounts {
                    offsets: offsets.len(),
                    byte_counts: tile_count,
                }
                .into());
            }

            let mut out = vec![0; self.width as usize * self.height as usize * 4];
            for index in 0..tile_count {
                let tile_x = index / tiles_down;
                let tile_y = index % tiles_down;
                let payload = self.read_chunk(offsets[index], byte_counts[index])?;
                let tile = codec::decode_jpeg_chunk(
                    &payload,
                    jpeg_tables.as_deref(),
                    (tile_width, tile_length),
                    self.compression_method,
                )?;
                self.place_tile(
                    &mut out,
                    4,
                    &tile,
                    tile_width as usize,
                    tile_length as usize,
                    tile_x,
                    tile_y,
                )?;
            }
            Raster::from_bgra(self.width, self.height, out)
        } else {
            Err(TiffFormatError::LayoutTagsNotFound.into())
        }
    }

    #[cfg(not(feature = "jpeg"))]
    fn read_jpeg_image(&mut self) -> TiffResult<Raster> {
        Err(crate::error::TiffUnsupportedError::UnsupportedCompressionMethod(
            self.compression_method,
        )
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn rejects_bad_signature() {
        let err = Decoder::new(Cursor::new(b"XX\x2A\x00".to_vec())).unwrap_err();
        assert!(matches!(
            err,
            crate::TiffError::FormatError(TiffFormatError::TiffSignatureNotFound)
        ));
    }

    #[test]
    fn rejects_bad_magic() {
        let err = Decoder::new(Cursor::new(b"II\x2B\x00\x08\x00\x00\x00".to_vec())).unwrap_err();
        assert!(matches!(
            err,
            crate::TiffError::FormatError(TiffFormatError::TiffSignatureInvalid)
        ));
    }
}
