//! Data type codes carried in byte 15 of the packet header.

/// Computer-generated format 1: TMATS setup record.
pub const TMATS: u8 = 0x01;
/// Computer-generated format 2: recording events.
pub const RECORDING_EVENT: u8 = 0x02;
/// Computer-generated format 3: recording index (node and root packets).
pub const RECORDING_INDEX: u8 = 0x03;
/// Time data format 1.
pub const TIME_F1: u8 = 0x11;

#[must_use]
pub const fn is_recording_index(data_type: u8) -> bool {
    data_type == RECORDING_INDEX
}

/// Packet types after which an index node must be closed.
#[must_use]
pub const fn closes_index_node(data_type: u8) -> bool {
    matches!(data_type, RECORDING_EVENT | TIME_F1)
}

#[cfg(test)]
mod tests {
    use super::{closes_index_node, is_recording_index, RECORDING_EVENT, TIME_F1, TMATS};

    #[test]
    fn only_events_and_time_close_a_node() {
        assert!(closes_index_node(RECORDING_EVENT));
        assert!(closes_index_node(TIME_F1));
        assert!(!closes_index_node(TMATS));
        assert!(!closes_index_node(0x19));
    }

    #[test]
    fn index_type_is_recognised() {
        assert!(is_recording_index(0x03));
        assert!(!is_recording_index(0x02));
    }
}
