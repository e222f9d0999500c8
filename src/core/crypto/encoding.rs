/*!
Serialized key layout shared by the built-in key managers.

A serialized key is a version byte followed by big-endian `u32` parameters
and length-prefixed byte fields, in an order fixed by each key type:

```text
+---------+-------------+-----+---------------+---------+-----+
| version | param (u32) | ... | len (u32) BE  | field   | ... |
+---------+-------------+-----+---------------+---------+-----+
```
*/

use bytes::{Buf, BufMut};

use crate::core::{
    constants::KEY_VERSION,
    error::{CryptoError, Result},
};

/// Builds a serialized key.
///
/// Writes go straight into the returned `Vec`, so no copy of the key
/// material outlives [`KeyWriter::finish`].
pub(crate) struct KeyWriter {
    buf: Vec<u8>,
}

impl KeyWriter {
    pub(crate) fn new() -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.put_u8(KEY_VERSION);
        Self { buf }
    }

    pub(crate) fn param(mut self, value: u32) -> Self {
        self.buf.put_u32(value);
        self
    }

    pub(crate) fn field(mut self, value: &[u8]) -> Self {
        self.buf.put_u32(value.len() as u32);
        self.buf.put_slice(value);
        self
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads a serialized key written by [`KeyWriter`]
pub(crate) struct KeyReader<'a> {
    buf: &'a [u8],
}

impl<'a> KeyReader<'a> {
    /// Check the version byte and position the reader after it
    pub(crate) fn new(serialized_key: &'a [u8]) -> Result<Self> {
        let mut buf = serialized_key;
        if !buf.has_remaining() {
            return Err(CryptoError::InvalidKeyFormat.into());
        }
        let version = buf.get_u8();
        if version > KEY_VERSION {
            return Err(CryptoError::UnsupportedKeyVersion(version).into());
        }
        Ok(Self { buf })
    }

    pub(crate) fn param(&mut self) -> Result<u32> {
        if self.buf.remaining() < 4 {
            return Err(CryptoError::InvalidKeyFormat.into());
        }
        Ok(self.buf.get_u32())
    }

    pub(crate) fn field(&mut self) -> Result<&'a [u8]> {
        let len = self.param()? as usize;
        if self.buf.remaining() < len {
            return Err(CryptoError::InvalidKeyFormat.into());
        }
        let (value, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(value)
    }

    /// Fail on trailing bytes
    pub(crate) fn finish(self) -> Result<()> {
        if self.buf.has_remaining() {
            return Err(CryptoError::InvalidKeyFormat.into());
        }
        Ok(())
    }
}
