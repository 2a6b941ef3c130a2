use thiserror::Error;

/// Validation failures for the shared `IndexLimits` contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitsError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error(
        "max_index_packet_bytes ({max_index_packet_bytes}) cannot hold a single-record index \
         packet of {minimum} bytes"
    )]
    IndexPacketBelowMinimum {
        max_index_packet_bytes: usize,
        minimum: usize,
    },

    #[error("{field} ({value}) exceeds the 32-bit packet length field")]
    ExceedsPacketLengthField { field: &'static str, value: usize },
}
