//! Binary layout of recording index packets (computer-generated format 3).

use c10_packet::data_type::RECORDING_INDEX;
use c10_packet::{encode_packet, PacketFields, HEADER_LEN, RTC_MASK};
use thiserror::Error;

use crate::error::IndexError;

pub const INDEX_CHANNEL_ID: u16 = 0;
pub const INDEX_HEADER_VERSION: u8 = 0x06;

/// CSDW bit 31: set for node packets, clear for root packets.
pub const CSDW_NODE_INDEX: u32 = 1 << 31;
/// CSDW bit 30: a file-length field follows the CSDW.
pub const CSDW_FILE_SIZE_PRESENT: u32 = 1 << 30;
pub const CSDW_COUNT_MASK: u32 = CSDW_FILE_SIZE_PRESENT - 1;

pub const NODE_ENTRY_LEN: usize = 20;
pub const ROOT_ENTRY_LEN: usize = 16;

const CSDW_LEN: usize = 4;
const FILE_LENGTH_LEN: usize = 8;
const BACK_POINTER_LEN: usize = 8;
const NODE_FIXED_LEN: usize = CSDW_LEN + FILE_LENGTH_LEN;
const ROOT_FIXED_LEN: usize = CSDW_LEN + FILE_LENGTH_LEN + BACK_POINTER_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Node,
    Root,
}

impl IndexKind {
    #[must_use]
    pub const fn csdw_flags(self) -> u32 {
        match self {
            Self::Node => CSDW_NODE_INDEX | CSDW_FILE_SIZE_PRESENT,
            Self::Root => CSDW_FILE_SIZE_PRESENT,
        }
    }
}

/// Location and identity of one copied data packet in the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub offset: u64,
    pub channel_id: u16,
    pub data_type: u8,
    pub rtc: u64,
}

/// A sealed node as referenced from a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRef {
    pub offset: u64,
    pub rtc: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBody {
    Node {
        file_length: u64,
        entries: Vec<IndexEntry>,
    },
    Root {
        file_length: u64,
        nodes: Vec<NodeRef>,
        back_pointer: u64,
    },
}

impl IndexBody {
    #[must_use]
    pub const fn kind(&self) -> IndexKind {
        match self {
            Self::Node { .. } => IndexKind::Node,
            Self::Root { .. } => IndexKind::Root,
        }
    }

    #[must_use]
    pub const fn file_length(&self) -> u64 {
        match self {
            Self::Node { file_length, .. } | Self::Root { file_length, .. } => *file_length,
        }
    }
}

pub fn node_packet_len(entries: usize) -> Result<u32, IndexError> {
    index_packet_len(NODE_FIXED_LEN, entries, NODE_ENTRY_LEN)
}

pub fn root_packet_len(nodes: usize) -> Result<u32, IndexError> {
    index_packet_len(ROOT_FIXED_LEN, nodes, ROOT_ENTRY_LEN)
}

fn index_packet_len(fixed: usize, count: usize, record_len: usize) -> Result<u32, IndexError> {
    let overflow = || IndexError::Overflow {
        field: "packet_length",
        value: u64::try_from(count).unwrap_or(u64::MAX),
    };
    let len = count
        .checked_mul(record_len)
        .and_then(|records| records.checked_add(HEADER_LEN + fixed))
        .ok_or_else(overflow)?;
    u32::try_from(len).map_err(|_| overflow())
}

pub fn pack_csdw(kind: IndexKind, count: usize) -> Result<u32, IndexError> {
    let count = u32::try_from(count)
        .ok()
        .filter(|count| *count <= CSDW_COUNT_MASK)
        .ok_or(IndexError::Overflow {
            field: "csdw_count",
            value: u64::try_from(count).unwrap_or(u64::MAX),
        })?;
    Ok(kind.csdw_flags() | count)
}

pub fn encode_node_body(file_length: u64, entries: &[IndexEntry]) -> Result<Vec<u8>, IndexError> {
    let csdw = pack_csdw(IndexKind::Node, entries.len())?;
    let mut body = Vec::with_capacity(NODE_FIXED_LEN + entries.len() * NODE_ENTRY_LEN);
    body.extend_from_slice(&csdw.to_le_bytes());
    body.extend_from_slice(&file_length.to_le_bytes());
    for entry in entries {
        body.extend_from_slice(&(entry.rtc & RTC_MASK).to_le_bytes());
        body.push(0);
        body.push(entry.data_type);
        body.extend_from_slice(&entry.channel_id.to_le_bytes());
        body.extend_from_slice(&entry.offset.to_le_bytes());
    }
    Ok(body)
}

pub fn encode_root_body(
    file_length: u64,
    nodes: &[NodeRef],
    back_pointer: u64,
) -> Result<Vec<u8>, IndexError> {
    let csdw = pack_csdw(IndexKind::Root, nodes.len())?;
    let mut body = Vec::with_capacity(ROOT_FIXED_LEN + nodes.len() * ROOT_ENTRY_LEN);
    body.extend_from_slice(&csdw.to_le_bytes());
    body.extend_from_slice(&file_length.to_le_bytes());
    for node in nodes {
        body.extend_from_slice(&(node.rtc & RTC_MASK).to_le_bytes());
        body.extend_from_slice(&node.offset.to_le_bytes());
    }
    body.extend_from_slice(&back_pointer.to_le_bytes());
    Ok(body)
}

/// Wraps an index body in a channel-0 header.
pub fn encode_index_packet(sequence: u8, rtc: u64, body: &[u8]) -> Result<Vec<u8>, IndexError> {
    let fields = PacketFields {
        channel_id: INDEX_CHANNEL_ID,
        header_version: INDEX_HEADER_VERSION,
        sequence_number: sequence,
        flags: 0,
        data_type: RECORDING_INDEX,
        rtc,
    };
    encode_packet(&fields, body).map_err(|_| IndexError::Overflow {
        field: "packet_length",
        value: body.len() as u64,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexFormatError {
    #[error("index body needs at least {needed} bytes, found {found}")]
    TooShort { needed: usize, found: usize },

    #[error("index CSDW {csdw:#010x} has no file-length field")]
    FileSizeAbsent { csdw: u32 },
}

/// Parses a node or root body; trailing filler is ignored.
pub fn decode_index_body(body: &[u8]) -> Result<IndexBody, IndexFormatError> {
    ensure_len(body, NODE_FIXED_LEN)?;
    let csdw = u32::from_le_bytes(array_at(body, 0));
    if csdw & CSDW_FILE_SIZE_PRESENT == 0 {
        return Err(IndexFormatError::FileSizeAbsent { csdw });
    }

    let count = (csdw & CSDW_COUNT_MASK) as usize;
    let file_length = u64::from_le_bytes(array_at(body, CSDW_LEN));

    if csdw & CSDW_NODE_INDEX != 0 {
        ensure_len(body, NODE_FIXED_LEN.saturating_add(count.saturating_mul(NODE_ENTRY_LEN)))?;
        let entries = body[NODE_FIXED_LEN..]
            .chunks_exact(NODE_ENTRY_LEN)
            .take(count)
            .map(|record| IndexEntry {
                rtc: u64::from_le_bytes(array_at(record, 0)),
                data_type: record[9],
                channel_id: u16::from_le_bytes(array_at(record, 10)),
                offset: u64::from_le_bytes(array_at(record, 12)),
            })
            .collect();
        return Ok(IndexBody::Node {
            file_length,
            entries,
        });
    }

    let records_end = NODE_FIXED_LEN.saturating_add(count.saturating_mul(ROOT_ENTRY_LEN));
    ensure_len(body, records_end.saturating_add(BACK_POINTER_LEN))?;
    let nodes = body[NODE_FIXED_LEN..records_end]
        .chunks_exact(ROOT_ENTRY_LEN)
        .map(|record| NodeRef {
            rtc: u64::from_le_bytes(array_at(record, 0)),
            offset: u64::from_le_bytes(array_at(record, 8)),
        })
        .collect();
    Ok(IndexBody::Root {
        file_length,
        nodes,
        back_pointer: u64::from_le_bytes(array_at(body, records_end)),
    })
}

fn ensure_len(body: &[u8], needed: usize) -> Result<(), IndexFormatError> {
    if body.len() < needed {
        return Err(IndexFormatError::TooShort {
            needed,
            found: body.len(),
        });
    }
    Ok(())
}

fn array_at<const N: usize>(bytes: &[u8], at: usize) -> [u8; N] {
    let mut out = [0_u8; N];
    out.copy_from_slice(&bytes[at..at + N]);
    out
}
