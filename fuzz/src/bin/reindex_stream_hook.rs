use std::io::{Cursor, Read};

use c10_index::{reindex, verify_index, CopyMode};
use c10_limits::{IndexLimits, MIN_ROOT_PACKET_BYTES};
use c10_packet::{ChecksumPolicy, ReaderOptions};

fn main() {
    let mut data = Vec::new();
    if std::io::stdin().read_to_end(&mut data).is_err() {
        return;
    }
    let Some((&selector, stream)) = data.split_first() else {
        return;
    };

    let mode = if selector & 0x01 == 0 {
        CopyMode::Rebuild
    } else {
        CopyMode::StripOnly
    };
    let checksum = if selector & 0x02 == 0 {
        ChecksumPolicy::Ignore
    } else {
        ChecksumPolicy::Verify
    };
    let limits = IndexLimits {
        max_index_packet_bytes: MIN_ROOT_PACKET_BYTES + 16 * usize::from(selector >> 2),
        max_source_packet_bytes: 64 * 1024,
    };
    let options = ReaderOptions::from_limits(&limits, checksum);

    let Ok((output, _report)) = reindex(Cursor::new(stream), Vec::new(), mode, options, limits)
    else {
        return;
    };
    let _ = verify_index(&mut Cursor::new(output), options);
}
