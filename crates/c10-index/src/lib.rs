//! Streaming construction and removal of recording index packets.
//!
//! The copy pass reads packets in order, writes every non-index packet
//! through unchanged and, in rebuild mode, emits node packets (one record per
//! copied packet) and root packets (one record per node) inline. Roots chain
//! to their predecessor; the first root points to itself.

pub mod builder;
pub mod copier;
pub mod error;
pub mod format;
pub mod verify;

use std::io::{Read, Write};

use c10_limits::IndexLimits;
use c10_packet::{PacketReader, ReaderOptions};

pub use builder::{IndexBuilder, IndexPacket};
pub use copier::{CopyMode, CopyReport, CopyState, StreamCopier};
pub use error::{IndexError, ReindexError};
pub use format::{
    decode_index_body, node_packet_len, pack_csdw, root_packet_len, IndexBody, IndexEntry,
    IndexFormatError, IndexKind, NodeRef,
};
pub use verify::{verify_index, IndexSummary, VerifyError};

/// Copies `source` into `sink`, dropping existing indices and, in rebuild
/// mode, writing fresh ones.
pub fn reindex<R: Read, W: Write>(
    source: R,
    sink: W,
    mode: CopyMode,
    options: ReaderOptions,
    limits: IndexLimits,
) -> Result<(W, CopyReport), ReindexError> {
    let packets = PacketReader::with_options(source, options);
    StreamCopier::new(sink, mode, limits).run(packets)
}
