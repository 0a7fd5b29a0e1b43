use crate::{read_u16_be, read_u32_be, read_vec, write_bytes, write_u16_be, write_u32_be};
use crate::{DnsClass, DnsError, DnsName, DnsType};
use fixed_buffer::FixedBuf;

/// Wire size of the fixed portion after the name: type (2) + class (2) +
/// ttl (4) + data length (2). Serialized back to back, never padded.
const FIXED_TAIL_LEN: usize = 10;

/// A resource record with opaque payload. The forwarder never looks inside
/// `rdata`; it relays and caches whatever the upstream produced.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DnsRecord {
    pub name: DnsName,
    pub typ: DnsType,
    pub class: DnsClass,
    /// Remaining validity in seconds, host order while resident so the cache
    /// can do arithmetic on it. `write` reapplies network order.
    pub ttl: u32,
    pub rdata: Vec<u8>,
}
impl DnsRecord {
    /// # Errors
    /// Returns [`DnsError::MalformedMessage`] when `buf` runs out before the
    /// record (including its `rdata`) does.
    pub fn read<const N: usize>(buf: &mut FixedBuf<N>) -> Result<Self, DnsError> {
        let name = DnsName::read(buf)?;
        let typ = DnsType::new(read_u16_be(buf)?);
        let class = DnsClass::new(read_u16_be(buf)?);
        let ttl = read_u32_be(buf)?;
        let data_len = read_u16_be(buf)? as usize;
        let rdata = read_vec(buf, data_len)?;
        Ok(Self {
            name,
            typ,
            class,
            ttl,
            rdata,
        })
    }

    /// # Errors
    /// Returns [`DnsError::ResponseBufferFull`] when `out` has no room or
    /// `rdata` exceeds what a 16-bit length can describe.
    pub fn write<const N: usize>(&self, out: &mut FixedBuf<N>) -> Result<(), DnsError> {
        self.name.write(out)?;
        write_u16_be(out, self.typ.num())?;
        write_u16_be(out, self.class.num())?;
        write_u32_be(out, self.ttl)?;
        let data_len = u16::try_from(self.rdata.len()).map_err(|_| DnsError::ResponseBufferFull)?;
        write_u16_be(out, data_len)?;
        write_bytes(out, &self.rdata)
    }

    /// Octets `write` would produce.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.name.len() + FIXED_TAIL_LEN + self.rdata.len()
    }
}
