use crate::{read_u8, write_bytes, DnsError};
use core::fmt::{Debug, Display, Formatter};
use fixed_buffer::FixedBuf;

/// First octet of a two-byte name compression pointer has both high bits set.
const POINTER_BITS: u8 = 0xC0;

/// A DNS owner name exactly as it appeared on the wire: a run of
/// length-prefixed labels through and including the zero terminator, a single
/// zero byte (the root), or a two-byte compression pointer.
///
/// Names are stored and compared as raw bytes and serve directly as cache
/// keys. A name holding a compression pointer is only meaningful to the
/// responder that emitted it — fine for a key, not fit for showing to people.
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DnsName(Vec<u8>);

impl DnsName {
    /// Reads the leading name field from `buf`, consuming exactly the bytes
    /// that belong to it.
    ///
    /// # Errors
    /// Returns [`DnsError::MalformedMessage`] when the buffer ends before the
    /// name does.
    pub fn read<const N: usize>(buf: &mut FixedBuf<N>) -> Result<Self, DnsError> {
        let first = read_u8(buf)?;
        if first & POINTER_BITS == POINTER_BITS {
            let second = read_u8(buf)?;
            return Ok(Self(vec![first, second]));
        }
        if first == 0 {
            return Ok(Self(vec![0]));
        }
        let mut bytes = vec![first];
        let mut label_len = first as usize;
        loop {
            for _ in 0..label_len {
                bytes.push(read_u8(buf)?);
            }
            let len = read_u8(buf)?;
            bytes.push(len);
            if len == 0 {
                return Ok(Self(bytes));
            }
            label_len = len as usize;
        }
    }

    /// Writes the stored bytes verbatim. No re-compression is attempted.
    ///
    /// # Errors
    /// Returns [`DnsError::ResponseBufferFull`] when `out` has no room.
    pub fn write<const N: usize>(&self, out: &mut FixedBuf<N>) -> Result<(), DnsError> {
        write_bytes(out, &self.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn is_pointer(&self) -> bool {
        self.0[0] & POINTER_BITS == POINTER_BITS
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}
impl Display for DnsName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), core::fmt::Error> {
        if self.0 == [0] {
            return write!(f, ".");
        }
        if self.is_pointer() {
            return write!(f, "<pointer 0x{:02x}{:02x}>", self.0[0], self.0[1]);
        }
        let mut pos = 0;
        while pos < self.0.len() {
            let len = self.0[pos] as usize;
            if len == 0 {
                break;
            }
            if pos > 0 {
                write!(f, ".")?;
            }
            let end = (pos + 1 + len).min(self.0.len());
            for b in &self.0[pos + 1..end] {
                if b.is_ascii_graphic() {
                    write!(f, "{}", *b as char)?;
                } else {
                    write!(f, "\\{:03}", b)?;
                }
            }
            pos = end;
        }
        Ok(())
    }
}
impl Debug for DnsName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), core::fmt::Error> {
        write!(f, "DnsName({})", self)
    }
}
