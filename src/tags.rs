macro_rules! tags {
    {
        // Permit arbitrary meta items, which include documentation.
        $( #[$enum_attr:meta] )*
        $vis:vis enum $name:ident($ty:tt) $(unknown(#[$unknown_meta:meta] $unknown_doc:ident))* {
            // Each of the `Name = Val,` permitting documentation.
            $($(#[$ident_attr:meta])* $tag:ident = $val:expr,)*
        }
    } => {
        $( #[$enum_attr] )*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
        #[non_exhaustive]
        #[repr($ty)]
        pub enum $name {
            $($(#[$ident_attr])* $tag = $val,)*
            $(
                #[$unknown_meta]
                Unknown($ty),
            )*
        }

        impl $name {
            #[inline(always)]
            const fn __from_inner_type(n: $ty) -> Result<Self, $ty> {
                match n {
                    $( $val => Ok($name::$tag), )*
                    n => Err(n),
                }
            }

            #[inline(always)]
            const fn __to_inner_type(&self) -> $ty {
                match *self {
                    $( $name::$tag => $val, )*
                    $( $name::Unknown($unknown_doc) => { $unknown_doc }, )*
                }
            }

            #[inline(always)]
            pub const fn from_u16(val: $ty) -> Option<Self> {
                match Self::__from_inner_type(val) {
                    Ok(v) => Some(v),
                    Err(_) => None,
                }
            }

            $(
            #[inline(always)]
            pub const fn from_u16_exhaustive($unknown_doc: $ty) -> Self {
                match Self::__from_inner_type($unknown_doc) {
                    Ok(v) => v,
                    Err(_) => $name::Unknown($unknown_doc),
                }
            }
            )*

            #[inline(always)]
            pub const fn to_u16(&self) -> $ty {
                Self::__to_inner_type(self)
            }
        }
    };
}

// Note: These tags appear in the order they are mentioned in the TIFF reference
tags! {
/// TIFF tags
pub enum Tag(u16) unknown(
    /// A private or extension tag
    unknown
) {
    // Baseline tags:
    Artist = 315,
    BitsPerSample = 258,
    Compression = 259,
    DateTime = 306,
    FillOrder = 266,
    HostComputer = 316,
    ImageDescription = 270,
    ImageLength = 257,
    ImageWidth = 256,
    Make = 271,
    Model = 272,
    NewSubfileType = 254,
    Orientation = 274,
    PhotometricInterpretation = 262,
    PlanarConfiguration = 284,
    ResolutionUnit = 296,
    RowsPerStrip = 278,
    SamplesPerPixel = 277,
    Software = 305,
    StripByteCounts = 279,
    StripOffsets = 273,
    SubfileType = 255,
    XResolution = 282,
    YResolution = 283,
    // Fax tags
    T4Options = 292,
    T6Options = 293,
    // Advanced tags
    Predictor = 317,
    TileWidth = 322,
    TileLength = 323,
    TileOffsets = 324,
    TileByteCounts = 325,
    // JPEG
    JPEGTables = 347,
}
}

tags! {
/// The type of an IFD entry (a 2 byte field).
///
/// Only the five original TIFF 6.0 baseline types are interpreted; any other
/// type code is carried through as raw bytes.
pub enum Type(u16) {
    /// 8-bit unsigned integer
    BYTE = 1,
    /// 8-bit byte that contains a 7-bit ASCII code; the last byte must be zero
    ASCII = 2,
    /// 16-bit unsigned integer
    SHORT = 3,
    /// 32-bit unsigned integer
    LONG = 4,
    /// Fraction stored as two 32-bit unsigned integers
    RATIONAL = 5,
}
}

impl Type {
    /// Byte size of a single value of this field type.
    ///
    /// Unknown type codes are sized as single bytes so their payloads can be
    /// preserved without interpretation.
    pub(crate) fn byte_len(ty: Option<Type>) -> u32 {
        match ty {
            Some(Type::BYTE) | Some(Type::ASCII) | None => 1,
            Some(Type::SHORT) => 2,
            Some(Type::LONG) => 4,
            Some(Type::RATIONAL) => 8,
        }
    }
}

tags! {
/// See [TIFF compression tags](https://www.awaresystems.be/imaging/tiff/tifftags/compression.html)
/// for reference.
pub enum CompressionMethod(u16) unknown(
    /// A custom compression method
    unknown
) {
    None = 1,
    CcittRle = 2,
    Fax3 = 3,
    Fax4 = 4,
    LZW = 5,
    OldJpeg = 6,
    // "Extended JPEG" or "new JPEG" style
    Jpeg = 7,
    Deflate = 8,
    OldDeflate = 0x80B2,
    PackBits = 0x8005,
}
}

impl CompressionMethod {
    /// Whether the scheme is one of the CCITT bilevel fax family.
    pub fn is_fax(&self) -> bool {
        matches!(
            self,
            CompressionMethod::CcittRle | CompressionMethod::Fax3 | CompressionMethod::Fax4
        )
    }

    /// Whether the scheme stores chunks as embedded JPEG streams.
    pub fn is_jpeg(&self) -> bool {
        matches!(self, CompressionMethod::OldJpeg | CompressionMethod::Jpeg)
    }
}

tags! {
pub enum PhotometricInterpretation(u16) {
    WhiteIsZero = 0,
    BlackIsZero = 1,
    RGB = 2,
    RGBPalette = 3,
    TransparencyMask = 4,
    CMYK = 5,
    YCbCr = 6,
    CIELab = 8,
}
}

tags! {
pub enum PlanarConfiguration(u16) {
    Chunky = 1,
    Planar = 2,
}
}

tags! {
pub enum Predictor(u16) {
    /// No changes were made to the data
    None = 1,
    /// Each scanline stores the byte-wise difference from its predecessor
    Horizontal = 2,
}
}

tags! {
/// Bit ordering within the bytes of a compressed bilevel payload.
pub enum FillOrder(u16) {
    MostSignificantFirst = 1,
    LeastSignificantFirst = 2,
}
}

tags! {
/// Type to represent resolution units
pub enum ResolutionUnit(u16) {
    None = 1,
    Inch = 2,
    Centimeter = 3,
}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_fixed() {
        assert_eq!(Tag::ImageWidth.to_u16(), 256);
        assert_eq!(Tag::Compression.to_u16(), 259);
        assert_eq!(Tag::StripOffsets.to_u16(), 273);
        assert_eq!(Tag::TileWidth.to_u16(), 322);
        assert_eq!(Tag::Predictor.to_u16(), 317);
        assert_eq!(Tag::JPEGTables.to_u16(), 347);
        assert_eq!(CompressionMethod::PackBits.to_u16(), 32773);
        assert_eq!(CompressionMethod::OldDeflate.to_u16(), 32946);
    }

    #[test]
    fn unknown_tags_round_trip() {
        let tag = Tag::from_u16_exhaustive(0xC612);
        assert_eq!(tag, Tag::Unknown(0xC612));
        assert_eq!(tag.to_u16(), 0xC612);
        assert_eq!(Tag::from_u16(0xC612), None);
    }

    #[test]
    fn unknown_compression_is_named() {
        let method = CompressionMethod::from_u16_exhaustive(0xC350);
        assert_eq!(method.to_u16(), 0xC350);
        assert!(!method.is_fax());
        assert!(!method.is_jpeg());
    }
}
