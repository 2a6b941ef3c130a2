use std::io::Write;

use c10_limits::IndexLimits;
use c10_packet::data_type::{closes_index_node, is_recording_index};
use c10_packet::{Packet, SourceError};
use tracing::{info, trace, warn};

use crate::builder::{IndexBuilder, IndexPacket};
use crate::error::{IndexError, ReindexError};
use crate::format::{IndexEntry, IndexKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// Drop existing indices and emit fresh node and root packets.
    Rebuild,
    /// Drop existing indices and emit nothing in their place.
    StripOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyState {
    Streaming,
    Done,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub packets_read: u64,
    pub packets_copied: u64,
    pub index_packets_dropped: u64,
    pub truncated_packets: u64,
    pub nodes_written: u64,
    pub roots_written: u64,
    pub bytes_written: u64,
}

/// Single pass from a packet source to an output stream.
#[derive(Debug)]
pub struct StreamCopier<W: Write> {
    sink: W,
    mode: CopyMode,
    builder: IndexBuilder,
    start_offset: u64,
    position: u64,
    last_source_offset: u64,
    state: CopyState,
    report: CopyReport,
}

impl<W: Write> StreamCopier<W> {
    pub fn new(sink: W, mode: CopyMode, limits: IndexLimits) -> Self {
        Self {
            sink,
            mode,
            builder: IndexBuilder::new(limits),
            start_offset: 0,
            position: 0,
            last_source_offset: 0,
            state: CopyState::Streaming,
            report: CopyReport::default(),
        }
    }

    /// Output offset of the first byte this copier writes, for sinks that
    /// already hold a prefix.
    #[must_use]
    pub fn with_start_offset(mut self, offset: u64) -> Self {
        self.start_offset = offset;
        self.position = offset;
        self
    }

    #[must_use]
    pub const fn mode(&self) -> CopyMode {
        self.mode
    }

    #[must_use]
    pub const fn state(&self) -> CopyState {
        self.state
    }

    /// Bytes written to the output so far.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    #[must_use]
    pub const fn report(&self) -> &CopyReport {
        &self.report
    }

    #[must_use]
    pub const fn builder(&self) -> &IndexBuilder {
        &self.builder
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    pub fn copy_packet(&mut self, packet: &Packet) -> Result<(), ReindexError> {
        if self.state == CopyState::Done {
            return Err(ReindexError::Finished);
        }

        self.report.packets_read += 1;
        self.last_source_offset = packet.offset;
        let header = &packet.header;

        if is_recording_index(header.data_type) {
            self.report.index_packets_dropped += 1;
            trace!(offset = packet.offset, "dropped existing index packet");
            return Ok(());
        }

        if !packet.is_complete() {
            self.drop_truncated(
                packet.offset,
                u64::from(header.packet_length),
                packet.raw.len() as u64,
            );
            return Ok(());
        }

        let offset = self.position;
        self.write_bytes(&packet.raw)?;
        self.report.packets_copied += 1;

        if self.mode == CopyMode::StripOnly {
            return Ok(());
        }

        if header.channel_id == 0 {
            self.builder.resync_sequence(header.sequence_number);
        }

        self.builder.record(IndexEntry {
            offset,
            channel_id: header.channel_id,
            data_type: header.data_type,
            rtc: header.rtc,
        });

        let trigger = closes_index_node(header.data_type);
        let node = self
            .builder
            .maybe_flush_node(trigger, self.position)
            .map_err(|source| self.overflow(source))?;
        if let Some(node) = node {
            self.write_index(&node)?;
        }

        let root = self
            .builder
            .maybe_flush_root(self.position)
            .map_err(|source| self.overflow(source))?;
        if let Some(root) = root {
            self.write_index(&root)?;
        }

        Ok(())
    }

    /// Truncated packets are counted and skipped; anything else is fatal.
    pub fn handle_source_error(&mut self, error: SourceError) -> Result<(), ReindexError> {
        match error {
            SourceError::Truncated {
                offset,
                declared,
                available,
            } => {
                self.report.packets_read += 1;
                self.drop_truncated(offset, declared, available);
                Ok(())
            }
            SourceError::MalformedHeader { offset, source } => {
                Err(ReindexError::MalformedHeader { offset, source })
            }
            SourceError::Io(error) => Err(ReindexError::Io(error)),
        }
    }

    /// Emits the trailing index (rebuild mode) and flushes the sink.
    pub fn finish(&mut self) -> Result<CopyReport, ReindexError> {
        if self.state == CopyState::Done {
            return Ok(self.report.clone());
        }

        if self.mode == CopyMode::Rebuild {
            let packets = self
                .builder
                .finalize(self.position)
                .map_err(|source| self.overflow(source))?;
            for packet in &packets {
                self.write_index(packet)?;
            }
        }

        self.sink.flush()?;
        self.state = CopyState::Done;
        info!(
            mode = ?self.mode,
            packets_read = self.report.packets_read,
            packets_copied = self.report.packets_copied,
            index_packets_dropped = self.report.index_packets_dropped,
            truncated_packets = self.report.truncated_packets,
            nodes_written = self.report.nodes_written,
            roots_written = self.report.roots_written,
            bytes_written = self.report.bytes_written,
            "copy pass complete"
        );
        Ok(self.report.clone())
    }

    /// Drives the whole pass. On a fatal error the output written so far is
    /// flushed before the error is returned.
    pub fn run<I>(mut self, packets: I) -> Result<(W, CopyReport), ReindexError>
    where
        I: IntoIterator<Item = Result<Packet, SourceError>>,
    {
        for item in packets {
            let result = match item {
                Ok(packet) => self.copy_packet(&packet),
                Err(error) => self.handle_source_error(error),
            };
            if let Err(error) = result {
                self.abort();
                return Err(error);
            }
        }

        match self.finish() {
            Ok(report) => Ok((self.sink, report)),
            Err(error) => {
                self.abort();
                Err(error)
            }
        }
    }

    fn abort(&mut self) {
        if let Err(error) = self.sink.flush() {
            warn!(%error, "failed to flush partial output");
        }
    }

    fn drop_truncated(&mut self, offset: u64, declared: u64, available: u64) {
        self.report.truncated_packets += 1;
        warn!(offset, declared, available, "dropped truncated packet");
    }

    fn write_index(&mut self, packet: &IndexPacket) -> Result<(), ReindexError> {
        self.write_bytes(&packet.bytes)?;
        match packet.kind {
            IndexKind::Node => self.report.nodes_written += 1,
            IndexKind::Root => self.report.roots_written += 1,
        }
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ReindexError> {
        self.sink.write_all(bytes)?;
        self.position = self.position.saturating_add(bytes.len() as u64);
        self.report.bytes_written = self.position.saturating_sub(self.start_offset);
        Ok(())
    }

    fn overflow(&self, source: IndexError) -> ReindexError {
        ReindexError::IndexOverflow {
            offset: self.last_source_offset,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use c10_limits::IndexLimits;
    use c10_packet::{encode_packet, HeaderError, Packet, PacketFields, PacketHeader, SourceError};

    use super::{CopyMode, CopyState, StreamCopier};
    use crate::error::{IndexError, ReindexError};

    fn packet(offset: u64, channel_id: u16, data_type: u8, sequence_number: u8) -> Packet {
        let raw = encode_packet(
            &PacketFields {
                channel_id,
                data_type,
                sequence_number,
                rtc: offset * 10,
                ..PacketFields::default()
            },
            b"payload!",
        )
        .expect("encode");
        Packet {
            offset,
            header: PacketHeader::decode(&raw).expect("header"),
            raw: Bytes::from(raw),
        }
    }

    #[test]
    fn strip_only_copies_data_and_drops_indices() {
        let mut copier = StreamCopier::new(Vec::new(), CopyMode::StripOnly, IndexLimits::default());
        copier.copy_packet(&packet(0, 1, 0x19, 0)).expect("copy");
        copier.copy_packet(&packet(32, 0, 0x03, 1)).expect("copy");
        copier.copy_packet(&packet(64, 0, 0x11, 2)).expect("copy");
        let report = copier.finish().expect("finish");

        assert_eq!(report.packets_read, 3);
        assert_eq!(report.packets_copied, 2);
        assert_eq!(report.index_packets_dropped, 1);
        assert_eq!(report.nodes_written, 0);
        assert_eq!(report.roots_written, 0);
        assert_eq!(copier.into_inner().len(), 64);
    }

    #[test]
    fn time_packet_closes_node_inline() {
        let mut copier = StreamCopier::new(Vec::new(), CopyMode::Rebuild, IndexLimits::default());
        copier.copy_packet(&packet(0, 1, 0x19, 0)).expect("copy");
        assert_eq!(copier.report().nodes_written, 0);
        copier.copy_packet(&packet(32, 2, 0x11, 0)).expect("copy");
        assert_eq!(copier.report().nodes_written, 1);
        assert_eq!(copier.position(), 64 + 36 + 40);
    }

    #[test]
    fn channel_zero_packets_resync_index_sequence() {
        let mut copier = StreamCopier::new(Vec::new(), CopyMode::Rebuild, IndexLimits::default());
        copier.copy_packet(&packet(0, 0, 0x01, 200)).expect("copy");
        assert_eq!(copier.builder().next_sequence(), 200);

        copier.copy_packet(&packet(32, 1, 0x11, 9)).expect("copy");
        assert_eq!(copier.report().nodes_written, 1);
        assert_eq!(copier.builder().next_sequence(), 201);
    }

    #[test]
    fn incomplete_packet_is_dropped_and_not_indexed() {
        let mut short = packet(0, 1, 0x19, 0);
        short.raw = short.raw.slice(..20);

        let mut copier = StreamCopier::new(Vec::new(), CopyMode::Rebuild, IndexLimits::default());
        copier.copy_packet(&short).expect("dropped, not fatal");
        assert_eq!(copier.report().truncated_packets, 1);
        assert_eq!(copier.position(), 0);
        assert!(copier.builder().pending_entries().is_empty());
    }

    #[test]
    fn malformed_header_error_is_fatal() {
        let mut copier = StreamCopier::new(Vec::new(), CopyMode::Rebuild, IndexLimits::default());
        let error = copier
            .handle_source_error(SourceError::MalformedHeader {
                offset: 96,
                source: HeaderError::BadSync { found: 0 },
            })
            .expect_err("fatal");
        assert!(matches!(error, ReindexError::MalformedHeader { offset: 96, .. }));
    }

    #[test]
    fn index_overflow_carries_the_source_offset() {
        let copier = StreamCopier::new(Vec::new(), CopyMode::Rebuild, IndexLimits::default());
        let mut copier = copier.with_start_offset(u64::MAX - 40);
        let error = copier
            .copy_packet(&packet(4096, 1, 0x11, 0))
            .expect_err("node file length cannot be encoded");

        assert!(matches!(
            error,
            ReindexError::IndexOverflow {
                offset: 4096,
                source: IndexError::Overflow {
                    field: "file_length",
                    ..
                },
            }
        ));
        assert_eq!(copier.report().nodes_written, 0);
        assert_eq!(copier.report().bytes_written, 32);
    }

    #[test]
    fn finished_copier_rejects_more_packets() {
        let mut copier = StreamCopier::new(Vec::new(), CopyMode::Rebuild, IndexLimits::default());
        copier.copy_packet(&packet(0, 1, 0x19, 0)).expect("copy");
        let report = copier.finish().expect("finish");
        assert_eq!(copier.state(), CopyState::Done);
        assert_eq!(report.nodes_written, 1);
        assert_eq!(report.roots_written, 1);

        let error = copier
            .copy_packet(&packet(32, 1, 0x19, 0))
            .expect_err("already done");
        assert!(matches!(error, ReindexError::Finished));
        assert_eq!(copier.finish().expect("idempotent"), report);
    }
}
