use std::error::Error;
use std::fmt;
use std::io;

use crate::tags::{CompressionMethod, PhotometricInterpretation, Tag};

/// Tiff error kinds.
#[derive(Debug)]
pub enum TiffError {
    /// The image is not formatted properly.
    FormatError(TiffFormatError),

    /// The decoder does not support features of this image.
    UnsupportedError(TiffUnsupportedError),

    /// An I/O Error occurred while decoding the image.
    IoError(io::Error),
}

/// The image is not formatted properly.
///
/// This indicates that the encoder producing the image might behave
/// incorrectly or that the input file has been corrupted.
#[derive(Debug)]
#[non_exhaustive]
pub enum TiffFormatError {
    /// The file does not start with `II` or `MM`.
    TiffSignatureNotFound,
    /// The magic number after the byte-order marker is not 42.
    TiffSignatureInvalid,
    /// A tag the pipeline cannot proceed without is absent.
    RequiredTagNotFound(Tag),
    /// Neither strip nor tile layout tags are present.
    LayoutTagsNotFound,
    /// The chunk offset and byte-count arrays disagree in length.
    InconsistentChunkCounts { offsets: usize, byte_counts: usize },
    /// A decompressed strip or tile is smaller than the region it must fill.
    ChunkTooShort { expected: usize, actual: usize },
    /// An embedded JPEG chunk decoded to unexpected dimensions.
    JpegDimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    /// A chunk payload could not be decompressed.
    Decompression {
        method: CompressionMethod,
        detail: String,
    },
    /// A raster must have nonzero width and height.
    InvalidDimensions(u32, u32),
    /// A tag value has a type or count unusable in its role.
    InvalidTagValueType(Tag),
}

impl fmt::Display for TiffFormatError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::TiffFormatError::*;
        match *self {
            TiffSignatureNotFound => write!(fmt, "TIFF signature not found."),
            TiffSignatureInvalid => write!(fmt, "TIFF signature invalid."),
            RequiredTagNotFound(ref tag) => write!(fmt, "Required tag `{:?}` not found.", tag),
            LayoutTagsNotFound => write!(fmt, "No strip or tile layout tags found."),
            InconsistentChunkCounts {
                offsets,
                byte_counts,
            } => write!(
                fmt,
                "Image has {} chunk offsets but {} chunk byte counts.",
                offsets, byte_counts
            ),
            ChunkTooShort { expected, actual } => write!(
                fmt,
                "Decompressed chunk holds {} bytes where at least {} are needed.",
                actual, expected
            ),
            JpegDimensionMismatch { expected, actual } => write!(
                fmt,
                "Embedded JPEG decoded to {}x{}, expected {}x{}.",
                actual.0, actual.1, expected.0, expected.1
            ),
            Decompression {
                ref method,
                ref detail,
            } => write!(
                fmt,
                "Could not decompress data with method {} ({}).",
                method.to_u16(),
                detail
            ),
            InvalidDimensions(width, height) => {
                write!(fmt, "Invalid raster dimensions {}x{}.", width, height)
            }
            InvalidTagValueType(ref tag) => {
                write!(fmt, "Tag `{:?}` did not have the expected value type.", tag)
            }
        }
    }
}

/// The decoder or encoder does not support features of the image.
#[derive(Debug)]
#[non_exhaustive]
pub enum TiffUnsupportedError {
    /// The compression scheme is outside the supported set, or its codec
    /// feature is disabled.
    UnsupportedCompressionMethod(CompressionMethod),
    /// The photometric/bit-depth/sample-count combination has no conversion
    /// rule.
    UnsupportedPixelFormat {
        photometric: PhotometricInterpretation,
        bits_per_sample: u16,
        samples_per_pixel: u16,
    },
    /// The encoder only writes uncompressed or LZW data.
    UnsupportedCompressionForEncoding(CompressionMethod),
}

impl fmt::Display for TiffUnsupportedError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::TiffUnsupportedError::*;
        match *self {
            UnsupportedCompressionMethod(ref method) => {
                write!(fmt, "Compression method {} is unsupported", method.to_u16())
            }
            UnsupportedPixelFormat {
                ref photometric,
                bits_per_sample,
                samples_per_pixel,
            } => write!(
                fmt,
                "Pixel format {:?} with {} bits and {} samples per pixel is unsupported",
                photometric, bits_per_sample, samples_per_pixel
            ),
            UnsupportedCompressionForEncoding(ref method) => write!(
                fmt,
                "Compression method {} cannot be used for encoding",
                method.to_u16()
            ),
        }
    }
}

impl fmt::Display for TiffError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TiffError::FormatError(ref e) => write!(fmt, "Format error: {}", e),
            TiffError::UnsupportedError(ref f) => write!(
                fmt,
                "The Decoder does not support the image format `{}`",
                f
            ),
            TiffError::IoError(ref e) => e.fmt(fmt),
        }
    }
}

impl Error for TiffError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            TiffError::IoError(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TiffError {
    fn from(err: io::Error) -> TiffError {
        TiffError::IoError(err)
    }
}

impl From<TiffFormatError> for TiffError {
    fn from(err: TiffFormatError) -> TiffError {
        TiffError::FormatError(err)
    }
}

impl From<TiffUnsupportedError> for TiffError {
    fn from(err: TiffUnsupportedError) -> TiffError {
        TiffError::UnsupportedError(err)
    }
}

/// Result of an image decoding/encoding process
pub type TiffResult<T> = Result<T, TiffError>;
