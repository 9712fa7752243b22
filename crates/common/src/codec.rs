//! Canonical binary packing for signed records
//!
//! Every record is signed over `varint(tag) || field*`, where a string or byte
//! field is `varint(len) || bytes` and integers are bare varints. The varint is
//! little-endian base-128: seven bits per byte, with the continuation bit
//! (`0x80`) set on every byte except the last. Zero encodes as a single `0x00`.
//!
//! The remote ledger re-packs the JSON projection of a record and checks the
//! signature against those bytes, so field order and encoding here are part
//! of the wire contract.

/// Maximum encoded size of a u64 varint
pub const MAX_VARINT_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("varint is truncated")]
    Truncated,
    #[error("varint overflows u64")]
    Overflow,
}

/// Append the varint encoding of `value` to `buffer`
pub fn encode_varint(buffer: &mut Vec<u8>, mut value: u64) {
    loop {
        let group = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buffer.push(group);
            return;
        }
        buffer.push(group | 0x80);
    }
}

/// Decode a varint from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_varint(bytes: &[u8]) -> Result<(u64, usize), CodecError> {
    let mut value = 0u64;
    for (i, byte) in bytes.iter().enumerate().take(MAX_VARINT_SIZE) {
        let group = u64::from(byte & 0x7f);
        // the tenth byte may only carry the single top bit of a u64
        if i == MAX_VARINT_SIZE - 1 && group > 1 {
            return Err(CodecError::Overflow);
        }
        value |= group << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if bytes.len() >= MAX_VARINT_SIZE {
        Err(CodecError::Overflow)
    } else {
        Err(CodecError::Truncated)
    }
}

/// Builder for the canonical signing bytes of a record
///
/// ```ignore
/// let message = Packed::tagged(ASSET_TAG)
///     .string(&name)
///     .string(&fingerprint)
///     .bytes(&registrant.to_bytes())
///     .into_bytes();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packed(Vec<u8>);

impl Packed {
    /// Start a message with the record kind tag
    pub fn tagged(tag: u64) -> Self {
        let mut buffer = Vec::with_capacity(128);
        encode_varint(&mut buffer, tag);
        Self(buffer)
    }

    /// Length-prefixed UTF-8 string
    pub fn string(self, value: &str) -> Self {
        self.bytes(value.as_bytes())
    }

    /// Length-prefixed byte field
    pub fn bytes(mut self, value: &[u8]) -> Self {
        encode_varint(&mut self.0, value.len() as u64);
        self.0.extend_from_slice(value);
        self
    }

    /// Bare varint integer
    pub fn uint(mut self, value: u64) -> Self {
        encode_varint(&mut self.0, value);
        self
    }

    /// Single raw byte, no length prefix
    pub fn byte(mut self, value: u8) -> Self {
        self.0.push(value);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}
