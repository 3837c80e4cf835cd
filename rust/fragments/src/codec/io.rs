// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Little-endian primitive reader/writer and the `Encode`/`Decode` traits.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Error, Result};

/// Growable output buffer.
pub struct ByteWriter {
    buf: BytesMut,
}

impl ByteWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    #[inline]
    pub fn put_u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    #[inline]
    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    #[inline]
    pub fn put_u64(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    #[inline]
    pub fn put_f32(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    #[inline]
    pub fn put_f64(&mut self, v: f64) {
        self.buf.put_f64_le(v);
    }

    pub fn put_bytes(&mut self, v: &[u8]) {
        self.buf.put_slice(v);
    }

    /// Writes a collection length as `u32`.
    pub fn put_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len)
            .map_err(|_| Error::codec(format!("column of {len} entries exceeds u32")))?;
        self.put_u32(len);
        Ok(())
    }

    pub fn put_str(&mut self, v: &str) -> Result<()> {
        self.put_len(v.len())?;
        self.buf.put_slice(v.as_bytes());
        Ok(())
    }

    pub fn put_vec3(&mut self, v: &[f32; 3]) {
        for c in v {
            self.put_f32(*c);
        }
    }

    /// Writes a length-prefixed column.
    pub fn put_col<T: Encode>(&mut self, values: &[T]) -> Result<()> {
        self.put_len(values.len())?;
        for value in values {
            value.encode(self)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

/// Bounds-checked cursor over document bytes.
pub struct ByteReader<'a> {
    buf: &'a [u8],
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    #[inline]
    fn need(&self, n: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(Error::codec(format!(
                "unexpected end of data reading {what}: need {n} bytes, {} left",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        self.need(1, "u8")?;
        Ok(self.buf.get_u8())
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        self.need(2, "u16")?;
        Ok(self.buf.get_u16_le())
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        self.need(4, "u32")?;
        Ok(self.buf.get_u32_le())
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        self.need(8, "u64")?;
        Ok(self.buf.get_u64_le())
    }

    pub fn get_f32(&mut self) -> Result<f32> {
        self.need(4, "f32")?;
        Ok(self.buf.get_f32_le())
    }

    pub fn get_f64(&mut self) -> Result<f64> {
        self.need(8, "f64")?;
        Ok(self.buf.get_f64_le())
    }

    pub fn get_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.need(n, "bytes")?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    pub fn get_len(&mut self) -> Result<usize> {
        Ok(self.get_u32()? as usize)
    }

    pub fn get_str(&mut self) -> Result<String> {
        let len = self.get_len()?;
        let raw = self.get_bytes(len)?;
        String::from_utf8(raw.to_vec()).map_err(|e| Error::codec(format!("invalid UTF-8: {e}")))
    }

    pub fn get_vec3(&mut self) -> Result<[f32; 3]> {
        Ok([self.get_f32()?, self.get_f32()?, self.get_f32()?])
    }

    /// Reads a length-prefixed column.
    pub fn get_col<T: Decode>(&mut self) -> Result<Vec<T>> {
        let len = self.get_len()?;
        // A corrupt length must not turn into a huge allocation.
        let mut out = Vec::with_capacity(len.min(self.remaining()));
        for _ in 0..len {
            out.push(T::decode(self)?);
        }
        Ok(out)
    }
}

/// Types with a fixed binary layout inside a column.
pub trait Encode {
    fn encode(&self, w: &mut ByteWriter) -> Result<()>;
}

/// Inverse of [`Encode`].
pub trait Decode: Sized {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self>;
}

impl Encode for u32 {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        w.put_u32(*self);
        Ok(())
    }
}

impl Decode for u32 {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        r.get_u32()
    }
}

impl Encode for u64 {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        w.put_u64(*self);
        Ok(())
    }
}

impl Decode for u64 {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        r.get_u64()
    }
}

impl Encode for f64 {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        w.put_f64(*self);
        Ok(())
    }
}

impl Decode for f64 {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        r.get_f64()
    }
}

impl Encode for String {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        w.put_str(self)
    }
}

impl Decode for String {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        r.get_str()
    }
}

impl Encode for [f32; 3] {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        w.put_vec3(self);
        Ok(())
    }
}

impl Decode for [f32; 3] {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        r.get_vec3()
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        w.put_col(self)
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        r.get_col()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_little_endian() {
        let mut w = ByteWriter::with_capacity(16);
        w.put_u32(0x0102_0304);
        w.put_u16(0x0506);
        assert_eq!(w.into_vec(), vec![0x04, 0x03, 0x02, 0x01, 0x06, 0x05]);
    }

    #[test]
    fn short_read_is_codec_error() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        assert!(matches!(r.get_u32(), Err(Error::Codec(_))));
    }

    #[test]
    fn corrupt_column_length_does_not_allocate_blindly() {
        let mut w = ByteWriter::with_capacity(8);
        w.put_u32(u32::MAX);
        w.put_u64(7);
        let bytes = w.into_vec();
        let mut r = ByteReader::new(&bytes);
        assert!(matches!(r.get_col::<u64>(), Err(Error::Codec(_))));
    }

    #[test]
    fn nested_columns() {
        let nested: Vec<Vec<u32>> = vec![vec![1, 2], vec![], vec![3]];
        let mut w = ByteWriter::with_capacity(32);
        w.put_col(&nested).unwrap();
        let bytes = w.into_vec();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.get_col::<Vec<u32>>().unwrap(), nested);
        assert_eq!(r.remaining(), 0);
    }
}
