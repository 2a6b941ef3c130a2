use std::io::Read;

use c10_index::decode_index_body;
use c10_packet::{ChecksumPolicy, PacketHeader, HEADER_LEN};

fn main() {
    let mut data = Vec::new();
    if std::io::stdin().read_to_end(&mut data).is_err() {
        return;
    }

    let _ = PacketHeader::decode(&data);
    let Ok(header) = PacketHeader::decode_with(&data, ChecksumPolicy::Ignore) else {
        return;
    };

    let encoded = header.encode();
    let _ = PacketHeader::decode(&encoded);

    let body_end = data.len().min(HEADER_LEN + header.body_len() as usize);
    let _ = decode_index_body(&data[HEADER_LEN..body_end]);
}
