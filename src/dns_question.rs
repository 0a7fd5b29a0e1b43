use crate::{read_u16_be, write_u16_be, DnsClass, DnsError, DnsName, DnsType};
use fixed_buffer::FixedBuf;

/// > The question section is used to carry the "question" in most queries, i.e., the parameters
/// > that define what is being asked.  The section contains QDCOUNT (usually 1) entries, each of
/// > the following format:
/// >
/// > ```text
/// >                                 1  1  1  1  1  1
/// >   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// > +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// > |                                               |
/// > /                     QNAME                     /
/// > /                                               /
/// > +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// > |                     QTYPE                     |
/// > +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// > |                     QCLASS                    |
/// > +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// > ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DnsQuestion {
    pub name: DnsName,
    pub typ: DnsType,
    pub class: DnsClass,
}
impl DnsQuestion {
    /// # Errors
    /// Returns [`DnsError::MalformedMessage`] when `buf` runs out before the
    /// question does.
    pub fn read<const N: usize>(buf: &mut FixedBuf<N>) -> Result<Self, DnsError> {
        let name = DnsName::read(buf)?;
        let typ = DnsType::new(read_u16_be(buf)?);
        let class = DnsClass::new(read_u16_be(buf)?);
        Ok(Self { name, typ, class })
    }

    /// # Errors
    /// Returns [`DnsError::ResponseBufferFull`] when `out` has no room.
    pub fn write<const N: usize>(&self, out: &mut FixedBuf<N>) -> Result<(), DnsError> {
        self.name.write(out)?;
        write_u16_be(out, self.typ.num())?;
        write_u16_be(out, self.class.num())
    }

    /// Octets `write` would produce: the name plus the 4-octet fixed tail.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.name.len() + 4
    }
}
