use crate::{read_exact, write_bytes, write_u16_be, DnsError, DnsOpCode, DnsResponseCode};
use fixed_buffer::FixedBuf;

/// > 4.1.1. Header section format
/// >
/// > The header contains the following fields:
/// >
/// > ```text
/// >                                 1  1  1  1  1  1
/// >   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// > +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// > |                      ID                       |
/// > +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// > |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
/// > +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// > |                    QDCOUNT                    |
/// > +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// > |                    ANCOUNT                    |
/// > +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// > |                    NSCOUNT                    |
/// > +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// > |                    ARCOUNT                    |
/// > +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// > ```
///
/// <https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.1>
///
/// The Z bits are carried as `reserved`, `authenticated_data`, and
/// `checking_disabled` (RFC 4035 reuses two of them); the forwarder preserves
/// whatever the client or upstream set.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DnsHeader {
    /// Transaction id, copied into the reply so the client can match it up.
    pub id: u16,
    pub is_response: bool,
    pub op_code: DnsOpCode,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub reserved: bool,
    pub authenticated_data: bool,
    pub checking_disabled: bool,
    pub response_code: DnsResponseCode,
    pub question_count: u16,
    pub answer_count: u16,
    pub name_server_count: u16,
    pub additional_count: u16,
}
impl DnsHeader {
    /// Wire size of the header: always exactly 12 octets.
    pub const LEN: usize = 12;

    /// # Errors
    /// Returns [`DnsError::MalformedMessage`] when fewer than 12 octets
    /// remain in `buf`.
    pub fn parse<const N: usize>(buf: &mut FixedBuf<N>) -> Result<Self, DnsError> {
        let bytes: [u8; 12] = read_exact(buf)?;
        Ok(Self {
            id: u16::from_be_bytes([bytes[0], bytes[1]]),
            is_response: (bytes[2] >> 7) == 1,
            op_code: DnsOpCode::new((bytes[2] >> 3) & 0xF),
            authoritative: ((bytes[2] >> 2) & 1) == 1,
            truncated: ((bytes[2] >> 1) & 1) == 1,
            recursion_desired: (bytes[2] & 1) == 1,
            recursion_available: (bytes[3] >> 7) == 1,
            reserved: ((bytes[3] >> 6) & 1) == 1,
            authenticated_data: ((bytes[3] >> 5) & 1) == 1,
            checking_disabled: ((bytes[3] >> 4) & 1) == 1,
            response_code: DnsResponseCode::new(bytes[3] & 0xF),
            question_count: u16::from_be_bytes([bytes[4], bytes[5]]),
            answer_count: u16::from_be_bytes([bytes[6], bytes[7]]),
            name_server_count: u16::from_be_bytes([bytes[8], bytes[9]]),
            additional_count: u16::from_be_bytes([bytes[10], bytes[11]]),
        })
    }

    /// # Errors
    /// Returns [`DnsError::ResponseBufferFull`] when `out` has no room.
    pub fn write<const N: usize>(&self, out: &mut FixedBuf<N>) -> Result<(), DnsError> {
        write_u16_be(out, self.id)?;
        let b = ((self.is_response as u8) << 7)
            | (self.op_code.num() << 3)
            | ((self.authoritative as u8) << 2)
            | ((self.truncated as u8) << 1)
            | (self.recursion_desired as u8);
        write_bytes(out, &[b])?;
        let b = ((self.recursion_available as u8) << 7)
            | ((self.reserved as u8) << 6)
            | ((self.authenticated_data as u8) << 5)
            | ((self.checking_disabled as u8) << 4)
            | self.response_code.num();
        write_bytes(out, &[b])?;
        for count in [
            self.question_count,
            self.answer_count,
            self.name_server_count,
            self.additional_count,
        ] {
            write_u16_be(out, count)?;
        }
        Ok(())
    }
}
