use thiserror::Error;

pub const SYNC_PATTERN: u16 = 0xEB25;
/// Fixed header size, checksum included.
pub const HEADER_LEN: usize = 24;
/// Mask for the 48-bit relative time counter.
pub const RTC_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;
/// Packet flag bit announcing a 12-byte secondary header.
pub const FLAG_SECONDARY_HEADER: u8 = 0x80;

const CHECKSUM_OFFSET: usize = 22;

/// Fixed fields of a packet header. `rtc` holds the 48-bit relative time counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub channel_id: u16,
    pub packet_length: u32,
    pub data_length: u32,
    pub header_version: u8,
    pub sequence_number: u8,
    pub flags: u8,
    pub data_type: u8,
    pub rtc: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChecksumPolicy {
    #[default]
    Verify,
    Ignore,
}

impl PacketHeader {
    #[must_use]
    pub const fn rtc_low(&self) -> u32 {
        (self.rtc & 0xFFFF_FFFF) as u32
    }

    #[must_use]
    pub const fn rtc_high(&self) -> u16 {
        ((self.rtc >> 32) & 0xFFFF) as u16
    }

    #[must_use]
    pub const fn has_secondary_header(&self) -> bool {
        self.flags & FLAG_SECONDARY_HEADER != 0
    }

    /// Bytes following the fixed header, filler included.
    #[must_use]
    pub const fn body_len(&self) -> u32 {
        self.packet_length.saturating_sub(HEADER_LEN as u32)
    }

    /// Packs the header and appends its checksum.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0_u8; HEADER_LEN];
        bytes[0..2].copy_from_slice(&SYNC_PATTERN.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.channel_id.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.packet_length.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.data_length.to_le_bytes());
        bytes[12] = self.header_version;
        bytes[13] = self.sequence_number;
        bytes[14] = self.flags;
        bytes[15] = self.data_type;
        bytes[16..20].copy_from_slice(&self.rtc_low().to_le_bytes());
        bytes[20..22].copy_from_slice(&self.rtc_high().to_le_bytes());

        let checksum = header_checksum(&bytes[..CHECKSUM_OFFSET]);
        bytes[CHECKSUM_OFFSET..].copy_from_slice(&checksum.to_le_bytes());
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, HeaderError> {
        Self::decode_with(bytes, ChecksumPolicy::Verify)
    }

    pub fn decode_with(bytes: &[u8], checksum: ChecksumPolicy) -> Result<Self, HeaderError> {
        if bytes.len() < HEADER_LEN {
            return Err(HeaderError::TooShort { len: bytes.len() });
        }

        let sync = le_u16(bytes, 0);
        if sync != SYNC_PATTERN {
            return Err(HeaderError::BadSync { found: sync });
        }

        if checksum == ChecksumPolicy::Verify {
            let expected = le_u16(bytes, CHECKSUM_OFFSET);
            let actual = header_checksum(&bytes[..CHECKSUM_OFFSET]);
            if expected != actual {
                return Err(HeaderError::ChecksumMismatch { expected, actual });
            }
        }

        let header = Self {
            channel_id: le_u16(bytes, 2),
            packet_length: le_u32(bytes, 4),
            data_length: le_u32(bytes, 8),
            header_version: bytes[12],
            sequence_number: bytes[13],
            flags: bytes[14],
            data_type: bytes[15],
            rtc: u64::from(le_u32(bytes, 16)) | (u64::from(le_u16(bytes, 20)) << 32),
        };

        if (header.packet_length as usize) < HEADER_LEN {
            return Err(HeaderError::PacketLengthTooSmall {
                packet_length: header.packet_length,
            });
        }

        if header.data_length > header.body_len() {
            return Err(HeaderError::DataLengthExceedsPacket {
                data_length: header.data_length,
                packet_length: header.packet_length,
            });
        }

        Ok(header)
    }
}

/// Sum of little-endian 16-bit words, wrapping at 65536.
#[must_use]
pub fn header_checksum(bytes: &[u8]) -> u16 {
    bytes.chunks_exact(2).fold(0_u16, |sum, word| {
        sum.wrapping_add(u16::from_le_bytes([word[0], word[1]]))
    })
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Header-level corruption. Every variant is fatal to a copy pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("header needs {HEADER_LEN} bytes, found {len}")]
    TooShort { len: usize },

    #[error("bad sync pattern {found:#06x}")]
    BadSync { found: u16 },

    #[error("header checksum mismatch: stored {expected:#06x}, computed {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("packet length {packet_length} is shorter than the header")]
    PacketLengthTooSmall { packet_length: u32 },

    #[error("data length {data_length} exceeds packet length {packet_length}")]
    DataLengthExceedsPacket {
        data_length: u32,
        packet_length: u32,
    },

    #[error("packet length {packet_length} exceeds max_source_packet_bytes {max_packet_bytes}")]
    PacketTooLarge {
        packet_length: u32,
        max_packet_bytes: usize,
    },

    #[error("packet body of {body_len} bytes does not fit the 32-bit length field")]
    PacketLengthOverflow { body_len: usize },
}
