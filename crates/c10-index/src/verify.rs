use std::io::{Read, Seek, SeekFrom};

use c10_packet::data_type::RECORDING_INDEX;
use c10_packet::{read_packet_at, Packet, PacketReader, ReaderOptions, SourceError, HEADER_LEN};
use thiserror::Error;
use tracing::debug;

use crate::format::{decode_index_body, IndexBody, IndexEntry, IndexFormatError, IndexKind, NodeRef};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub roots: usize,
    pub nodes: usize,
    pub entries: usize,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("file contains no packets")]
    Empty,

    #[error("final packet at offset {offset} is not a root index")]
    MissingRootIndex { offset: u64 },

    #[error("expected a {expected:?} index packet at offset {offset}")]
    WrongIndexKind { offset: u64, expected: IndexKind },

    #[error("index packet at offset {offset} has an unreadable body: {source}")]
    Format {
        offset: u64,
        #[source]
        source: IndexFormatError,
    },

    #[error("index packet at offset {offset} declares file length {declared}, expected {expected}")]
    FileLengthMismatch {
        offset: u64,
        declared: u64,
        expected: u64,
    },

    #[error("index packet at offset {from} references offset {to}, which is not earlier")]
    ForwardReference { from: u64, to: u64 },

    #[error("index packet at offset {from} references offset {to}, where no packet starts")]
    DanglingOffset { from: u64, to: u64 },

    #[error("root at offset {root} records rtc {recorded} for node {node}, node carries {actual}")]
    NodeTimeMismatch {
        root: u64,
        node: u64,
        recorded: u64,
        actual: u64,
    },

    #[error(
        "node at offset {node} indexes ({expected_channel}, {expected_type:#04x}) at offset \
         {offset}, found ({found_channel}, {found_type:#04x})"
    )]
    EntryMismatch {
        node: u64,
        offset: u64,
        expected_channel: u16,
        expected_type: u8,
        found_channel: u16,
        found_type: u8,
    },
}

/// Walks the index chain ending at the final packet of `source`.
///
/// A stream without a trailing root reports `MissingRootIndex`; readers
/// should fall back to a linear scan in that case.
pub fn verify_index<R: Read + Seek>(
    source: &mut R,
    options: ReaderOptions,
) -> Result<IndexSummary, VerifyError> {
    source
        .seek(SeekFrom::Start(0))
        .map_err(SourceError::from)?;
    let mut last = None;
    for packet in PacketReader::with_options(&mut *source, options) {
        last = Some(packet?);
    }
    let last = last.ok_or(VerifyError::Empty)?;

    if last.header.data_type != RECORDING_INDEX {
        return Err(VerifyError::MissingRootIndex {
            offset: last.offset,
        });
    }

    let mut root = last;
    let mut summary = IndexSummary::default();
    loop {
        let IndexBody::Root {
            nodes,
            back_pointer,
            ..
        } = decode_index_packet(&root, IndexKind::Root)?
        else {
            if summary.roots == 0 {
                return Err(VerifyError::MissingRootIndex {
                    offset: root.offset,
                });
            }
            return Err(VerifyError::WrongIndexKind {
                offset: root.offset,
                expected: IndexKind::Root,
            });
        };

        summary.roots += 1;
        for node_ref in &nodes {
            summary.entries += verify_node(source, options, root.offset, node_ref)?;
            summary.nodes += 1;
        }
        debug!(offset = root.offset, nodes = nodes.len(), "verified root index");

        if back_pointer == root.offset {
            break;
        }
        if back_pointer > root.offset {
            return Err(VerifyError::ForwardReference {
                from: root.offset,
                to: back_pointer,
            });
        }
        root = load(source, options, root.offset, back_pointer)?;
    }

    Ok(summary)
}

fn verify_node<R: Read + Seek>(
    source: &mut R,
    options: ReaderOptions,
    root_offset: u64,
    node_ref: &NodeRef,
) -> Result<usize, VerifyError> {
    if node_ref.offset >= root_offset {
        return Err(VerifyError::ForwardReference {
            from: root_offset,
            to: node_ref.offset,
        });
    }

    let node = load(source, options, root_offset, node_ref.offset)?;
    let IndexBody::Node { entries, .. } = decode_index_packet(&node, IndexKind::Node)? else {
        return Err(VerifyError::WrongIndexKind {
            offset: node.offset,
            expected: IndexKind::Node,
        });
    };

    if node.header.rtc != node_ref.rtc {
        return Err(VerifyError::NodeTimeMismatch {
            root: root_offset,
            node: node.offset,
            recorded: node_ref.rtc,
            actual: node.header.rtc,
        });
    }

    for entry in &entries {
        verify_entry(source, options, node.offset, entry)?;
    }
    Ok(entries.len())
}

fn verify_entry<R: Read + Seek>(
    source: &mut R,
    options: ReaderOptions,
    node_offset: u64,
    entry: &IndexEntry,
) -> Result<(), VerifyError> {
    if entry.offset >= node_offset {
        return Err(VerifyError::ForwardReference {
            from: node_offset,
            to: entry.offset,
        });
    }

    let packet = load(source, options, node_offset, entry.offset)?;
    let header = &packet.header;
    if (header.channel_id, header.data_type) != (entry.channel_id, entry.data_type) {
        return Err(VerifyError::EntryMismatch {
            node: node_offset,
            offset: entry.offset,
            expected_channel: entry.channel_id,
            expected_type: entry.data_type,
            found_channel: header.channel_id,
            found_type: header.data_type,
        });
    }
    Ok(())
}

fn load<R: Read + Seek>(
    source: &mut R,
    options: ReaderOptions,
    from: u64,
    to: u64,
) -> Result<Packet, VerifyError> {
    read_packet_at(source, to, options)?.ok_or(VerifyError::DanglingOffset { from, to })
}

fn decode_index_packet(packet: &Packet, expected: IndexKind) -> Result<IndexBody, VerifyError> {
    if packet.header.data_type != RECORDING_INDEX {
        return Err(VerifyError::WrongIndexKind {
            offset: packet.offset,
            expected,
        });
    }

    let data_end = HEADER_LEN.saturating_add(packet.header.data_length as usize);
    let body = packet.raw.get(HEADER_LEN..data_end).unwrap_or_default();
    let decoded = decode_index_body(body).map_err(|source| VerifyError::Format {
        offset: packet.offset,
        source,
    })?;

    let end = packet
        .offset
        .saturating_add(u64::from(packet.header.packet_length));
    if decoded.file_length() != end {
        return Err(VerifyError::FileLengthMismatch {
            offset: packet.offset,
            declared: decoded.file_length(),
            expected: end,
        });
    }

    Ok(decoded)
}
