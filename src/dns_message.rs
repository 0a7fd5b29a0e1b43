use crate::{DnsError, DnsHeader, DnsQuestion, DnsRecord};
use fixed_buffer::FixedBuf;

/// A full DNS message: header plus the four ordered sections. This is the
/// unit the codec produces and the cache stores.
///
/// All numeric fields are host order in memory; byte order is applied exactly
/// once in each direction, at `parse` and `write`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DnsMessage {
    pub header: DnsHeader,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<DnsRecord>,
    /// The authority section.
    pub name_servers: Vec<DnsRecord>,
    pub additional: Vec<DnsRecord>,
}
impl DnsMessage {
    /// Decodes one message from `buf`, reading the sections in wire order
    /// with the lengths the header counts dictate.
    ///
    /// # Errors
    /// Returns [`DnsError::MalformedMessage`] when any read would overrun the
    /// buffer: a short header, a section count requiring more bytes than
    /// remain, a name whose label run never terminates, or `rdata` shorter
    /// than its declared length.
    pub fn parse<const N: usize>(buf: &mut FixedBuf<N>) -> Result<Self, DnsError> {
        let header = DnsHeader::parse(buf)?;
        let mut questions = Vec::with_capacity(header.question_count as usize);
        for _ in 0..header.question_count {
            questions.push(DnsQuestion::read(buf)?);
        }
        let answers = read_records(buf, header.answer_count)?;
        let name_servers = read_records(buf, header.name_server_count)?;
        let additional = read_records(buf, header.additional_count)?;
        Ok(Self {
            header,
            questions,
            answers,
            name_servers,
            additional,
        })
    }

    /// Serializes the message into `out`, sized to the exact wire length with
    /// no trailing padding.
    ///
    /// Section counts are re-derived from the vector lengths before the
    /// header goes out, so a message whose sections were edited (the cache
    /// does this when records expire) still encodes consistently.
    ///
    /// # Errors
    /// Returns [`DnsError::ResponseBufferFull`] when `out` has no room, or
    /// [`DnsError::MalformedMessage`] when a section holds more than
    /// `u16::MAX` items.
    pub fn write<const N: usize>(&self, out: &mut FixedBuf<N>) -> Result<(), DnsError> {
        let mut header = self.header.clone();
        header.question_count = section_count(self.questions.len())?;
        header.answer_count = section_count(self.answers.len())?;
        header.name_server_count = section_count(self.name_servers.len())?;
        header.additional_count = section_count(self.additional.len())?;
        header.write(out)?;
        for question in &self.questions {
            question.write(out)?;
        }
        for record in self
            .answers
            .iter()
            .chain(self.name_servers.iter())
            .chain(self.additional.iter())
        {
            record.write(out)?;
        }
        Ok(())
    }

    /// Octets `write` would produce. Callers use this to pre-size buffers.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let mut size = DnsHeader::LEN;
        for question in &self.questions {
            size += question.encoded_len();
        }
        for record in self
            .answers
            .iter()
            .chain(self.name_servers.iter())
            .chain(self.additional.iter())
        {
            size += record.encoded_len();
        }
        size
    }
}

fn read_records<const N: usize>(
    buf: &mut FixedBuf<N>,
    count: u16,
) -> Result<Vec<DnsRecord>, DnsError> {
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        records.push(DnsRecord::read(buf)?);
    }
    Ok(records)
}

fn section_count(len: usize) -> Result<u16, DnsError> {
    u16::try_from(len).map_err(|_| DnsError::MalformedMessage)
}
