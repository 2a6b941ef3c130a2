use std::io;

use c10_packet::HeaderError;
use thiserror::Error;

/// A count, length or offset that no longer fits its fixed-width field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("{field} value {value} overflows its fixed-width encoding")]
    Overflow { field: &'static str, value: u64 },
}

#[derive(Debug, Error)]
pub enum ReindexError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed packet header at source offset {offset}: {source}")]
    MalformedHeader {
        offset: u64,
        #[source]
        source: HeaderError,
    },

    #[error("index overflow at source offset {offset}: {source}")]
    IndexOverflow {
        offset: u64,
        #[source]
        source: IndexError,
    },

    #[error("copy pass already finished")]
    Finished,
}
