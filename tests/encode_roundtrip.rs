//! Encode/decode round-trips through the public API.

use std::io::Cursor;

use rastiff::decoder::Decoder;
use rastiff::encoder::{encode_to_vec, TiffEncoder};
use rastiff::tags::CompressionMethod;
use rastiff::Raster;

/// An RGB test raster with opaque alpha (the encoder drops alpha, the decoder
/// restores it as 0xFF, so only opaque rasters round-trip bit for bit).
fn test_raster(width: u32, height: u32) -> Raster {
    let mut raster = Raster::new(width, height).unwrap();
    for y in 0..height {
        for x in 0..width {
            let seed = (x * 31 + y * 97) as u8;
            raster.set_pixel(x, y, [seed, seed.wrapping_add(85), seed.wrapping_mul(3), 0xFF]);
        }
    }
    raster
}

fn decode(bytes: Vec<u8>) -> Raster {
    Decoder::new(Cursor::new(bytes)).unwrap().read_image().unwrap()
}

#[test]
fn uncompressed_round_trip() {
    for (width, height) in [(1, 1), (3, 5), (16, 2)] {
        let raster = test_raster(width, height);
        let encoded = encode_to_vec(&raster, CompressionMethod::None).unwrap();
        let decoded = decode(encoded);
        assert_eq!(decoded, raster, "{width}x{height}");
    }
}

#[cfg(feature = "lzw")]
#[test]
fn lzw_round_trip_is_lossless() {
    let raster = test_raster(23, 9);
    let encoded = encode_to_vec(&raster, CompressionMethod::LZW).unwrap();
    let decoded = decode(encoded);
    assert_eq!(decoded, raster);
}

#[cfg(feature = "lzw")]
#[test]
fn lzw_output_is_actually_compressed() {
    // A constant image compresses well; this guards against the LZW branch
    // silently writing raw bytes with the wrong compression tag.
    let raster = Raster::new(64, 64).unwrap();
    let plain = encode_to_vec(&raster, CompressionMethod::None).unwrap();
    let lzw = encode_to_vec(&raster, CompressionMethod::LZW).unwrap();
    assert!(lzw.len() < plain.len());
    assert_eq!(decode(lzw), raster);
}

#[test]
fn encoded_resolution_is_square() {
    // 72/72 dpi must not trigger the aspect-ratio resampler on decode.
    let raster = test_raster(4, 7);
    let encoded = encode_to_vec(&raster, CompressionMethod::None).unwrap();
    let decoded = decode(encoded);
    assert_eq!((decoded.width(), decoded.height()), (4, 7));
}

#[test]
fn encoder_writes_through_any_sink() {
    let raster = test_raster(2, 2);
    let mut sink = Vec::new();
    TiffEncoder::new(&mut sink)
        .write_image(&raster, CompressionMethod::None)
        .unwrap();
    assert_eq!(decode(sink), raster);
}

#[test]
fn decoder_sees_the_fixed_tag_set() {
    use rastiff::tags::Tag;

    let encoded = encode_to_vec(&test_raster(5, 3), CompressionMethod::None).unwrap();
    let decoder = Decoder::new(Cursor::new(encoded)).unwrap();
    let dir = decoder.directory();

    assert_eq!(dir.len(), 13);
    assert_eq!(dir.u32(Tag::ImageWidth), Some(5));
    assert_eq!(dir.u32(Tag::ImageLength), Some(3));
    assert_eq!(dir.u16_vec(Tag::BitsPerSample), Some(vec![8, 8, 8]));
    assert_eq!(dir.u16(Tag::SamplesPerPixel), Some(3));
    assert_eq!(dir.u32(Tag::RowsPerStrip), Some(3));
    assert_eq!(dir.rational(Tag::XResolution), Some((72, 1)));
    assert_eq!(dir.rational(Tag::YResolution), Some((72, 1)));
    assert_eq!(dir.u16(Tag::PlanarConfiguration), Some(1));
    assert_eq!(dir.u16(Tag::ResolutionUnit), Some(2));
}
