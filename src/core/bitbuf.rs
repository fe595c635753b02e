//! # Bit Buffers
//!
//! Bit-granular reader and writer for engine packets.
//!
//! Fields are packed least-significant bit first, and multi-byte integers are
//! little-endian, so a byte-aligned `write_i32` produces the same four bytes as
//! `i32::to_le_bytes`. Fields narrower than a byte (6-bit message types, 4-bit
//! command tags) shift every following field off the byte grid.
//!
//! ## Example
//! ```rust
//! use source_connector::core::bitbuf::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::with_capacity(16);
//! writer.write_bits(6, 6).unwrap();
//! writer.write_cstring(b"hi").unwrap();
//! let bytes = writer.into_bytes();
//!
//! let mut reader = BitReader::new(&bytes);
//! assert_eq!(reader.read_bits(6).unwrap(), 6);
//! assert_eq!(reader.read_cstring(64).unwrap(), "hi");
//! ```

use crate::error::{constants, ProtocolError, Result};

/// Fixed-capacity bit writer.
#[derive(Debug, Clone)]
pub struct BitWriter {
    buf: Vec<u8>,
    bit_pos: usize,
}

impl BitWriter {
    /// Create a writer backed by a zeroed scratch buffer of `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity],
            bit_pos: 0,
        }
    }

    /// Scratch buffer size in bytes
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of bits written so far
    pub fn bits_written(&self) -> usize {
        self.bit_pos
    }

    fn ensure_room(&self, bits: usize) -> Result<()> {
        if self.bit_pos + bits > self.capacity() * 8 {
            return Err(ProtocolError::BufferOverflow {
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Append the low `bits` bits of `value`.
    ///
    /// # Errors
    /// `Custom` for a bit count outside 1..=32, `BufferOverflow` when the
    /// field does not fit. Nothing is written on error.
    pub fn write_bits(&mut self, value: u32, bits: u32) -> Result<()> {
        if bits == 0 || bits > 32 {
            return Err(ProtocolError::Custom(constants::ERR_INVALID_BIT_COUNT.into()));
        }
        self.ensure_room(bits as usize)?;

        for i in 0..bits {
            if (value >> i) & 1 == 1 {
                self.buf[self.bit_pos / 8] |= 1 << (self.bit_pos % 8);
            }
            self.bit_pos += 1;
        }
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bits(u32::from(value), 8)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_bits(u32::from(value), 16)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_bits(value as u32, 32)
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.ensure_room(64)?;
        self.write_bits(value as u32, 32)?;
        self.write_bits((value >> 32) as u32, 32)
    }

    /// Append raw bytes. Either all of them fit or none are written.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_room(bytes.len() * 8)?;
        for &b in bytes {
            self.write_u8(b)?;
        }
        Ok(())
    }

    /// Append bytes followed by a terminating zero byte
    pub fn write_cstring(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_room((bytes.len() + 1) * 8)?;
        self.write_bytes(bytes)?;
        self.write_u8(0)
    }

    /// The written bytes, up to and including the last partially filled byte
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buf.truncate(self.bit_pos.div_ceil(8));
        self.buf
    }
}

/// Bit reader over a borrowed packet.
///
/// A failed read leaves the cursor untouched.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    pub fn bits_read(&self) -> usize {
        self.bit_pos
    }

    pub fn bits_remaining(&self) -> usize {
        self.data.len() * 8 - self.bit_pos
    }

    fn ensure_available(&self, bits: usize) -> Result<()> {
        if bits > self.bits_remaining() {
            return Err(ProtocolError::Decode(constants::ERR_UNEXPECTED_END.into()));
        }
        Ok(())
    }

    /// Read a `bits`-wide unsigned field (1..=32 bits)
    pub fn read_bits(&mut self, bits: u32) -> Result<u32> {
        if bits == 0 || bits > 32 {
            return Err(ProtocolError::Custom(constants::ERR_INVALID_BIT_COUNT.into()));
        }
        self.ensure_available(bits as usize)?;

        let mut value = 0u32;
        for i in 0..bits {
            let bit = (self.data[self.bit_pos / 8] >> (self.bit_pos % 8)) & 1;
            value |= u32::from(bit) << i;
            self.bit_pos += 1;
        }
        Ok(value)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bits(8).map(|v| v as u8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_bits(16).map(|v| v as u16)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_bits(32).map(|v| v as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure_available(64)?;
        let lo = u64::from(self.read_bits(32)?);
        let hi = u64::from(self.read_bits(32)?);
        Ok(lo | (hi << 32))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.ensure_available(len * 8)?;
        (0..len).map(|_| self.read_u8()).collect()
    }

    /// Read the raw bytes of a NUL-terminated string of at most `max` bytes.
    ///
    /// Stops at the terminator (consumed, not returned), at the end of the
    /// data, or after `max` bytes, whichever comes first. Fails only when not
    /// even one byte is left to read.
    pub fn read_cstring_bytes(&mut self, max: usize) -> Result<Vec<u8>> {
        self.ensure_available(8)?;

        let mut bytes = Vec::new();
        while bytes.len() < max && self.bits_remaining() >= 8 {
            let b = self.read_u8()?;
            if b == 0 {
                break;
            }
            bytes.push(b);
        }
        Ok(bytes)
    }

    /// [`read_cstring_bytes`](Self::read_cstring_bytes) as text. Invalid
    /// UTF-8 is replaced with U+FFFD rather than rejected.
    pub fn read_cstring(&mut self, max: usize) -> Result<String> {
        let bytes = self.read_cstring_bytes(max)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
