use bytes::Bytes;
use c10_limits::IndexLimits;
use tracing::debug;

use crate::error::IndexError;
use crate::format::{
    encode_index_packet, encode_node_body, encode_root_body, node_packet_len, root_packet_len,
    IndexEntry, IndexKind, NodeRef,
};

/// A serialised node or root packet and where it lands in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPacket {
    pub kind: IndexKind,
    pub offset: u64,
    pub sequence: u8,
    pub rtc: u64,
    pub count: usize,
    pub bytes: Bytes,
}

impl IndexPacket {
    #[must_use]
    pub fn end_offset(&self) -> u64 {
        self.offset.saturating_add(self.bytes.len() as u64)
    }
}

/// Buffers index metadata for copied packets and seals it into node and root
/// packets. The caller owns the output stream and passes the current output
/// position to every flush.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    limits: IndexLimits,
    pending_entries: Vec<IndexEntry>,
    pending_nodes: Vec<NodeRef>,
    last_root_offset: Option<u64>,
    sequence: u8,
}

impl IndexBuilder {
    #[must_use]
    pub fn new(limits: IndexLimits) -> Self {
        Self {
            limits,
            pending_entries: Vec::new(),
            pending_nodes: Vec::new(),
            last_root_offset: None,
            sequence: 0,
        }
    }

    #[must_use]
    pub fn limits(&self) -> &IndexLimits {
        &self.limits
    }

    #[must_use]
    pub fn pending_entries(&self) -> &[IndexEntry] {
        &self.pending_entries
    }

    #[must_use]
    pub fn pending_nodes(&self) -> &[NodeRef] {
        &self.pending_nodes
    }

    #[must_use]
    pub const fn last_root_offset(&self) -> Option<u64> {
        self.last_root_offset
    }

    /// Sequence number the next index packet will carry.
    #[must_use]
    pub const fn next_sequence(&self) -> u8 {
        self.sequence
    }

    /// Adopts the sequence number of a copied channel-0 packet.
    pub fn resync_sequence(&mut self, sequence: u8) {
        self.sequence = sequence;
    }

    pub fn record(&mut self, entry: IndexEntry) {
        self.pending_entries.push(entry);
    }

    /// True when a node built from the pending entries would exceed the ceiling.
    pub fn node_is_full(&self) -> Result<bool, IndexError> {
        let projected = node_packet_len(self.pending_entries.len())?;
        Ok(projected as usize > self.limits.max_index_packet_bytes)
    }

    /// True when a root built from the pending nodes would exceed the ceiling.
    pub fn root_is_full(&self) -> Result<bool, IndexError> {
        let projected = root_packet_len(self.pending_nodes.len())?;
        Ok(projected as usize > self.limits.max_index_packet_bytes)
    }

    pub fn maybe_flush_node(
        &mut self,
        trigger: bool,
        position: u64,
    ) -> Result<Option<IndexPacket>, IndexError> {
        if self.pending_entries.is_empty() {
            return Ok(None);
        }

        if trigger || self.node_is_full()? {
            return self.flush_node(position);
        }

        Ok(None)
    }

    /// Seals every pending entry into a node written at `position`.
    pub fn flush_node(&mut self, position: u64) -> Result<Option<IndexPacket>, IndexError> {
        let Some(last) = self.pending_entries.last() else {
            return Ok(None);
        };
        let rtc = last.rtc;
        let count = self.pending_entries.len();

        let file_length = end_of_packet(position, node_packet_len(count)?)?;
        let body = encode_node_body(file_length, &self.pending_entries)?;
        let sequence = self.sequence;
        let bytes = encode_index_packet(sequence, rtc, &body)?;

        self.sequence = sequence.wrapping_add(1);
        self.pending_entries.clear();
        self.pending_nodes.push(NodeRef {
            offset: position,
            rtc,
        });

        debug!(offset = position, entries = count, sequence, "sealed index node");
        Ok(Some(IndexPacket {
            kind: IndexKind::Node,
            offset: position,
            sequence,
            rtc,
            count,
            bytes: Bytes::from(bytes),
        }))
    }

    pub fn maybe_flush_root(&mut self, position: u64) -> Result<Option<IndexPacket>, IndexError> {
        if self.pending_nodes.is_empty() {
            return Ok(None);
        }

        if self.root_is_full()? {
            return self.flush_root(position);
        }

        Ok(None)
    }

    /// Seals every pending node into a root written at `position`, chained to
    /// the previous root or to itself when none exists.
    pub fn flush_root(&mut self, position: u64) -> Result<Option<IndexPacket>, IndexError> {
        let Some(last) = self.pending_nodes.last() else {
            return Ok(None);
        };
        let rtc = last.rtc;
        let count = self.pending_nodes.len();

        let file_length = end_of_packet(position, root_packet_len(count)?)?;
        let back_pointer = self.last_root_offset.unwrap_or(position);
        let body = encode_root_body(file_length, &self.pending_nodes, back_pointer)?;
        let sequence = self.sequence;
        let bytes = encode_index_packet(sequence, rtc, &body)?;

        self.sequence = sequence.wrapping_add(1);
        self.pending_nodes.clear();
        self.last_root_offset = Some(position);

        debug!(
            offset = position,
            nodes = count,
            back_pointer,
            sequence,
            "sealed root index"
        );
        Ok(Some(IndexPacket {
            kind: IndexKind::Root,
            offset: position,
            sequence,
            rtc,
            count,
            bytes: Bytes::from(bytes),
        }))
    }

    /// Flushes the trailing node and root at end of stream, in output order.
    pub fn finalize(&mut self, position: u64) -> Result<Vec<IndexPacket>, IndexError> {
        let mut packets = Vec::with_capacity(2);
        let mut position = position;

        if let Some(node) = self.flush_node(position)? {
            position = node.end_offset();
            packets.push(node);
        }

        if let Some(root) = self.flush_root(position)? {
            packets.push(root);
        }

        Ok(packets)
    }
}

fn end_of_packet(position: u64, packet_len: u32) -> Result<u64, IndexError> {
    position
        .checked_add(u64::from(packet_len))
        .ok_or(IndexError::Overflow {
            field: "file_length",
            value: position,
        })
}
