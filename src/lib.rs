//! Decoding and Encoding of TIFF Images
//!
//! TIFF (Tagged Image File Format) is a versatile image format that supports
//! lossless and lossy compression.
//!
//! This crate reconstructs the first image of a TIFF container — across its
//! strip/tile layouts, bit depths, sample layouts and compression schemes —
//! into one canonical 32-bit B,G,R,A raster, and writes such rasters back out
//! as baseline RGB TIFFs. The bit-level fax, LZW, inflate and JPEG algorithms
//! are delegated to external codec crates.
//!
//! # Related Links
//! * <https://web.archive.org/web/20210108073850/https://www.adobe.io/open/standards/TIFF.html> - The TIFF specification
//!
//! # Examples
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let file = BufReader::new(File::open("image.tif").unwrap());
//! let mut decoder = rastiff::decoder::Decoder::new(file).unwrap();
//! let raster = decoder.read_image().unwrap();
//! assert_eq!(raster.data().len() as u32, raster.width() * raster.height() * 4);
//! ```

pub mod decoder;
pub mod encoder;
mod error;
mod raster;
pub mod tags;

pub use self::error::{TiffError, TiffFormatError, TiffResult, TiffUnsupportedError};
pub use self::raster::Raster;
