//! Little-endian primitive codec shared by every packet variant.
//!
//! ```text
//! byte     u8
//! int      i32 little-endian
//! float    f32 bits written as an int
//! long     i64 little-endian
//! bool     one byte, 0 or 1
//! string   [len: int][UTF-8 bytes]
//! blob     [len: int][bytes]
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::{Error, LENGTH_PREFIX_SIZE, Result};

/// Append-only encoder for packet payloads.
#[derive(Debug, Default, Clone)]
pub struct WriteBuffer {
    data: BytesMut,
}

impl WriteBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with reserved capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
        }
    }

    /// Append a single byte.
    pub fn write_byte(&mut self, value: u8) {
        self.data.put_u8(value);
    }

    /// Append a 32-bit signed integer.
    pub fn write_int(&mut self, value: i32) {
        self.data.put_i32_le(value);
    }

    /// Append a 32-bit float through its integer bit pattern.
    #[allow(clippy::cast_possible_wrap)]
    pub fn write_float(&mut self, value: f32) {
        self.write_int(value.to_bits() as i32);
    }

    /// Append a 64-bit signed integer.
    pub fn write_long(&mut self, value: i64) {
        self.data.put_i64_le(value);
    }

    /// Append a boolean as `0` or `1`.
    pub fn write_bool(&mut self, value: bool) {
        self.data.put_u8(u8::from(value));
    }

    /// Append a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_blob(value.as_bytes())
    }

    /// Append a length-prefixed opaque blob.
    pub fn write_blob(&mut self, value: &[u8]) -> Result<()> {
        let len = i32::try_from(value.len()).map_err(|_| Error::LengthOverflow { len: value.len() })?;
        self.data.reserve(LENGTH_PREFIX_SIZE + value.len());
        self.write_int(len);
        self.data.put_slice(value);
        Ok(())
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the accumulated bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Discard everything written so far.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Consume the buffer and freeze the accumulated bytes.
    #[must_use]
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }
}

/// Cursor over a fixed byte sequence.
///
/// Every read checks bounds first; a read that would run past the end fails
/// with [`Error::OutOfBounds`] and leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct ReadBuffer {
    data: Bytes,
    position: usize,
}

impl ReadBuffer {
    /// Wrap a byte sequence.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            position: 0,
        }
    }

    /// Read a single byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        let [byte] = self.take_array::<1>()?;
        Ok(byte)
    }

    /// Read a 32-bit signed integer.
    pub fn read_int(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    /// Read a 32-bit float from its integer bit pattern.
    #[allow(clippy::cast_sign_loss)]
    pub fn read_float(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_int()? as u32))
    }

    /// Read a 64-bit signed integer.
    pub fn read_long(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    /// Read a boolean; any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_byte()? != 0)
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let start = self.position;
        let bytes = self.read_blob()?;
        String::from_utf8(bytes.to_vec()).map_err(|err| {
            self.position = start;
            Error::from(err)
        })
    }

    /// Read a length-prefixed blob without copying.
    pub fn read_blob(&mut self) -> Result<Bytes> {
        let start = self.position;
        let length = self.read_int()?;
        let len = usize::try_from(length).map_err(|_| {
            self.position = start;
            Error::NegativeLength { length }
        })?;
        if let Err(err) = self.check_bounds(len) {
            self.position = start;
            return Err(err);
        }
        let blob = self.data.slice(self.position..self.position + len);
        self.position += len;
        Ok(blob)
    }

    /// Whether unread bytes remain.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Current cursor position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.check_bounds(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.position..self.position + N]);
        self.position += N;
        Ok(out)
    }

    fn check_bounds(&self, required: usize) -> Result<()> {
        if required > self.remaining() {
            return Err(Error::OutOfBounds {
                offset: self.position,
                needed: required,
                len: self.data.len(),
            });
        }
        Ok(())
    }
}
