use std::io::{self, Write};

/// Little-endian TIFF output with a running byte offset.
///
/// The encoder lays the file out front to back, so the current offset is the
/// value every deferred IFD entry needs; no seeking is required.
pub struct TiffWriter<W> {
    writer: W,
    offset: u64,
}

impl<W: Write> TiffWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, offset: 0 }
    }

    /// Bytes written so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), io::Error> {
        self.writer.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, n: u8) -> Result<(), io::Error> {
        self.write_bytes(&[n])
    }

    pub fn write_u16(&mut self, n: u16) -> Result<(), io::Error> {
        self.write_bytes(&n.to_le_bytes())
    }

    pub fn write_u32(&mut self, n: u32) -> Result<(), io::Error> {
        self.write_bytes(&n.to_le_bytes())
    }
}
