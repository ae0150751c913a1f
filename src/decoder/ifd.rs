//! Function for reading TIFF tags

use std::collections::HashMap;
use std::io::{Read, Seek};

use super::stream::{ByteOrder, EndianReader, SmartReader};
use crate::error::{TiffFormatError, TiffResult};
use crate::tags::{Tag, Type};

/// A decoded tag value.
///
/// This is a closed sum over the five baseline field types. RATIONAL fields
/// and unknown field types are carried as their raw payload bytes and
/// interpreted only where a consumer knows what they mean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Byte(u8),
    Bytes(Vec<u8>),
    Ascii(String),
    Short(u16),
    Shorts(Vec<u16>),
    Long(u32),
    Longs(Vec<u32>),
    Raw(Vec<u8>),
}

impl Value {
    pub fn as_u16(&self) -> Option<u16> {
        match *self {
            Value::Byte(v) => Some(u16::from(v)),
            Value::Short(v) => Some(v),
            Value::Long(v) => u16::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Value::Byte(v) => Some(u32::from(v)),
            Value::Short(v) => Some(u32::from(v)),
            Value::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u16_vec(&self) -> Option<Vec<u16>> {
        match *self {
            Value::Short(v) => Some(vec![v]),
            Value::Shorts(ref v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_u32_vec(&self) -> Option<Vec<u32>> {
        match *self {
            Value::Short(v) => Some(vec![u32::from(v)]),
            Value::Shorts(ref v) => Some(v.iter().map(|&v| u32::from(v)).collect()),
            Value::Long(v) => Some(vec![v]),
            Value::Longs(ref v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_ascii(&self) -> Option<&str> {
        match *self {
            Value::Ascii(ref v) => Some(v),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&[u8]> {
        match *self {
            Value::Bytes(ref v) | Value::Raw(ref v) => Some(v),
            _ => None,
        }
    }
}

/// One parsed Image File Directory.
///
/// Built once per decode and read-only afterwards. The byte order is kept so
/// raw RATIONAL payloads can be interpreted lazily.
#[derive(Debug, Clone)]
pub struct Directory {
    byte_order: ByteOrder,
    entries: HashMap<Tag, Value>,
}

impl Directory {
    /// Parses the IFD at `offset`, leaving the reader position unspecified.
    ///
    /// Entries whose values do not fit the 4-byte offset field are fetched by
    /// seeking to their payload and restoring the entry cursor afterwards.
    /// Unknown field types never fail the parse; their payloads are preserved
    /// verbatim.
    pub fn parse<R: Read + Seek>(
        reader: &mut SmartReader<R>,
        offset: u64,
    ) -> TiffResult<Directory> {
        let byte_order = reader.byte_order;
        reader.goto_offset(offset)?;

        let num_entries = reader.read_u16()?;
        let mut entries = HashMap::with_capacity(usize::from(num_entries));

        for _ in 0..num_entries {
            let tag = Tag::from_u16_exhaustive(reader.read_u16()?);
            let field_type = Type::from_u16(reader.read_u16()?);
            let count = reader.read_u32()?;
            let mut offset_field = [0u8; 4];
            reader.read_exact(&mut offset_field)?;

            let value_bytes = u64::from(count) * u64::from(Type::byte_len(field_type));
            let value = if value_bytes <= 4 {
                // The offset field is the value, left-aligned.
                decode_value(
                    field_type,
                    &offset_field[..value_bytes as usize],
                    byte_order,
                )
            } else {
                let restore = reader.position()?;
                reader.goto_offset(u64::from(byte_order.u32_from_bytes(offset_field)))?;
                let mut buf = vec![0; value_bytes as usize];
                reader.read_exact(&mut buf)?;
                reader.goto_offset(restore)?;
                decode_value(field_type, &buf, byte_order)
            };

            entries.insert(tag, value);
        }

        let dir = Directory {
            byte_order,
            entries,
        };

        for required in [Tag::ImageWidth, Tag::ImageLength] {
            if !dir.contains(required) {
                return Err(TiffFormatError::RequiredTagNotFound(required).into());
            }
        }

        Ok(dir)
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn get(&self, tag: Tag) -> Option<&Value> {
        self.entries.get(&tag)
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.entries.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn u16(&self, tag: Tag) -> Option<u16> {
        self.get(tag).and_then(Value::as_u16)
    }

    pub fn u16_or(&self, tag: Tag, default: u16) -> u16 {
        self.u16(tag).unwrap_or(default)
    }

    pub fn u32(&self, tag: Tag) -> Option<u32> {
        self.get(tag).and_then(Value::as_u32)
    }

    pub fn u32_or(&self, tag: Tag, default: u32) -> u32 {
        self.u32(tag).unwrap_or(default)
    }

    /// Fetches a tag the caller cannot proceed without.
    pub fn require_u32(&self, tag: Tag) -> TiffResult<u32> {
        match self.get(tag) {
            Some(value) => value
                .as_u32()
                .ok_or_else(|| TiffFormatError::InvalidTagValueType(tag).into()),
            None => Err(TiffFormatError::RequiredTagNotFound(tag).into()),
        }
    }

    pub fn u16_vec(&self, tag: Tag) -> Option<Vec<u16>> {
        self.get(tag).and_then(Value::as_u16_vec)
    }

    pub fn u32_vec(&self, tag: Tag) -> Option<Vec<u32>> {
        self.get(tag).and_then(Value::as_u32_vec)
    }

    /// Fetches an offset/byte-count style array tag, failing typed if the
    /// value cannot be read as unsigned integers.
    pub fn require_u32_vec(&self, tag: Tag) -> TiffResult<Vec<u32>> {
        match self.get(tag) {
            Some(value) => value
                .as_u32_vec()
                .ok_or_else(|| TiffFormatError::InvalidTagValueType(tag).into()),
            None => Err(TiffFormatError::RequiredTagNotFound(tag).into()),
        }
    }

    pub fn raw(&self, tag: Tag) -> Option<&[u8]> {
        self.get(tag).and_then(Value::as_raw)
    }

    /// Interprets a RATIONAL tag as (numerator, denominator).
    pub fn rational(&self, tag: Tag) -> Option<(u32, u32)> {
        let data = self.raw(tag)?;
        if data.len() < 8 {
            return None;
        }
        let numerator = self
            .byte_order
            .u32_from_bytes([data[0], data[1], data[2], data[3]]);
        let denominator = self
            .byte_order
            .u32_from_bytes([data[4], data[5], data[6], data[7]]);
        Some((numerator, denominator))
    }
}

fn decode_value(field_type: Option<Type>, data: &[u8], byte_order: ByteOrder) -> Value {
    match field_type {
        Some(Type::BYTE) => match data {
            [single] => Value::Byte(*single),
            _ => Value::Bytes(data.to_vec()),
        },
        Some(Type::ASCII) => {
            // The declared count includes the trailing NUL.
            let text = match data.split_last() {
                Some((_, rest)) => rest,
                None => &[],
            };
            Value::Ascii(String::from_utf8_lossy(text).into_owned())
        }
        Some(Type::SHORT) => {
            let values: Vec<u16> = data
                .chunks_exact(2)
                .map(|c| byte_order.u16_from_bytes([c[0], c[1]]))
                .collect();
            if values.len() == 1 {
                Value::Short(values[0])
            } else {
                Value::Shorts(values)
            }
        }
        Some(Type::LONG) => {
            let values: Vec<u32> = data
                .chunks_exact(4)
                .map(|c| byte_order.u32_from_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            if values.len() == 1 {
                Value::Long(values[0])
            } else {
                Value::Longs(values)
            }
        }
        Some(Type::RATIONAL) | None => Value::Raw(data.to_vec()),
    }
}
