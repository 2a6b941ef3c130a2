pub mod data_type;
pub mod header;
pub mod source;

pub use header::{
    header_checksum, ChecksumPolicy, HeaderError, PacketHeader, FLAG_SECONDARY_HEADER,
    HEADER_LEN, RTC_MASK, SYNC_PATTERN,
};
pub use source::{read_packet_at, Packet, PacketReader, ReaderOptions, SourceError};

/// Header fields chosen by a packet producer; lengths and checksum are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketFields {
    pub channel_id: u16,
    pub header_version: u8,
    pub sequence_number: u8,
    pub flags: u8,
    pub data_type: u8,
    pub rtc: u64,
}

impl Default for PacketFields {
    fn default() -> Self {
        Self {
            channel_id: 0,
            header_version: 0x06,
            sequence_number: 0,
            flags: 0,
            data_type: 0,
            rtc: 0,
        }
    }
}

/// Serialises a complete packet, padding the body to a four-byte boundary.
pub fn encode_packet(fields: &PacketFields, body: &[u8]) -> Result<Vec<u8>, HeaderError> {
    let filler = (4 - body.len() % 4) % 4;
    let overflow = || HeaderError::PacketLengthOverflow {
        body_len: body.len(),
    };
    let data_length = u32::try_from(body.len()).map_err(|_| overflow())?;
    let packet_length = data_length
        .checked_add(HEADER_LEN as u32 + filler as u32)
        .ok_or_else(overflow)?;

    let header = PacketHeader {
        channel_id: fields.channel_id,
        packet_length,
        data_length,
        header_version: fields.header_version,
        sequence_number: fields.sequence_number,
        flags: fields.flags,
        data_type: fields.data_type,
        rtc: fields.rtc & RTC_MASK,
    };

    let mut bytes = Vec::with_capacity(packet_length as usize);
    bytes.extend_from_slice(&header.encode());
    bytes.extend_from_slice(body);
    bytes.resize(packet_length as usize, 0);
    Ok(bytes)
}
