//! Length-prefixed little-endian byte-stream contract used for every
//! on-wire and on-disk record (§ external interfaces).
//!
//! Variable-length quantities use the compact-size convention: values below
//! `0xfd` occupy one byte; larger values are tagged with `0xfd`/`0xfe`/`0xff`
//! followed by the little-endian integer.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Types that can append themselves to a byte stream.
pub trait Encodable {
    /// Appends the serialized representation to `out`.
    fn encode(&self, out: &mut Vec<u8>);

    /// Serializes into a fresh byte vector.
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

/// Types that can be read back from a byte stream.
pub trait Decodable: Sized {
    /// Reads one value, advancing the reader.
    fn decode(r: &mut Reader<'_>) -> Result<Self>;

    /// Deserializes from a byte slice, requiring full consumption.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let value = Self::decode(&mut reader)?;
        if !reader.is_empty() {
            return Err(Error::Encoding("trailing bytes after record".into()));
        }
        Ok(value)
    }
}

/// Cursor over an immutable byte slice.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Takes the next `n` bytes or fails with a truncation error.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Encoding(format!(
                "unexpected end of stream: wanted {} bytes, {} left",
                n,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// Reads a compact-size length prefix.
    pub fn read_varint(&mut self) -> Result<u64> {
        let tag = self.read_u8()?;
        let value = match tag {
            0xfd => u64::from(LittleEndian::read_u16(self.take(2)?)),
            0xfe => u64::from(self.read_u32()?),
            0xff => self.read_u64()?,
            n => u64::from(n),
        };
        Ok(value)
    }
}

/// Writes a compact-size length prefix.
pub fn write_varint(out: &mut Vec<u8>, value: u64) {
    if value < 0xfd {
        out.push(value as u8);
    } else if value <= u64::from(u16::MAX) {
        out.push(0xfd);
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, value as u16);
        out.extend_from_slice(&buf);
    } else if value <= u64::from(u32::MAX) {
        out.push(0xfe);
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, value as u32);
        out.extend_from_slice(&buf);
    } else {
        out.push(0xff);
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, value);
        out.extend_from_slice(&buf);
    }
}

impl Encodable for u8 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl Decodable for u8 {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        r.read_u8()
    }
}

impl Encodable for u32 {
    fn encode(&self, out: &mut Vec<u8>) {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, *self);
        out.extend_from_slice(&buf);
    }
}

impl Decodable for u32 {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        r.read_u32()
    }
}

impl Encodable for u64 {
    fn encode(&self, out: &mut Vec<u8>) {
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, *self);
        out.extend_from_slice(&buf);
    }
}

impl Decodable for u64 {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        r.read_u64()
    }
}

impl<T: Encodable> Encodable for [T] {
    fn encode(&self, out: &mut Vec<u8>) {
        write_varint(out, self.len() as u64);
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn encode(&self, out: &mut Vec<u8>) {
        self.as_slice().encode(out);
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let count = r.read_varint()? as usize;
        // Guard against absurd counts from hostile prefixes.
        if count > r.remaining() {
            return Err(Error::Encoding("vector length exceeds stream".into()));
        }
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::decode(r)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_roundtrip() {
        for value in &[0u64, 1, 0xfc, 0xfd, 0xffff, 0x1_0000, 0xffff_ffff, u64::MAX] {
            let mut buf = Vec::new();
            write_varint(&mut buf, *value);
            let mut reader = Reader::new(&buf);
            assert_eq!(reader.read_varint().unwrap(), *value);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let bytes = 123_456u64.to_bytes();
        let mut reader = Reader::new(&bytes[..5]);
        assert!(u64::decode(&mut reader).is_err());
    }

    #[test]
    fn vec_roundtrip() {
        let values: Vec<u32> = vec![7, 0, u32::MAX];
        let bytes = values.to_bytes();
        assert_eq!(Vec::<u32>::from_bytes(&bytes).unwrap(), values);
    }
}
