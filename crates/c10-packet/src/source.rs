use std::io::{self, Read, Seek, SeekFrom};

use bytes::Bytes;
use c10_limits::IndexLimits;
use thiserror::Error;

use crate::header::{ChecksumPolicy, HeaderError, PacketHeader, HEADER_LEN};

/// One packet as it appeared in the source, raw bytes included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub offset: u64,
    pub header: PacketHeader,
    pub raw: Bytes,
}

impl Packet {
    /// True when the raw bytes span exactly the declared packet length.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.raw.len() as u64 == u64::from(self.header.packet_length)
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.raw.get(HEADER_LEN..).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    pub checksum: ChecksumPolicy,
    pub max_packet_bytes: usize,
}

impl ReaderOptions {
    #[must_use]
    pub const fn from_limits(limits: &IndexLimits, checksum: ChecksumPolicy) -> Self {
        Self {
            checksum,
            max_packet_bytes: limits.max_source_packet_bytes,
        }
    }
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self::from_limits(&IndexLimits::default(), ChecksumPolicy::Verify)
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed packet header at offset {offset}: {source}")]
    MalformedHeader {
        offset: u64,
        #[source]
        source: HeaderError,
    },

    #[error("truncated packet at offset {offset}: declared {declared} bytes, {available} available")]
    Truncated {
        offset: u64,
        declared: u64,
        available: u64,
    },
}

impl SourceError {
    /// Truncation drops a single packet; everything else ends the pass.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }
}

/// Sequential packet cursor over a byte stream.
///
/// The reader never resynchronises: after a malformed header or a truncated
/// tail it yields nothing further.
#[derive(Debug)]
pub struct PacketReader<R> {
    source: R,
    options: ReaderOptions,
    position: u64,
    finished: bool,
}

impl<R: Read> PacketReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_options(source, ReaderOptions::default())
    }

    pub fn with_options(source: R, options: ReaderOptions) -> Self {
        Self {
            source,
            options,
            position: 0,
            finished: false,
        }
    }

    /// Byte offset of the next packet, relative to where reading started.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    #[must_use]
    pub const fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    pub fn read_packet(&mut self) -> Result<Option<Packet>, SourceError> {
        let offset = self.position;
        let mut header_bytes = [0_u8; HEADER_LEN];
        let read = read_up_to(&mut self.source, &mut header_bytes)?;
        if read == 0 {
            return Ok(None);
        }

        self.position = self.position.saturating_add(read as u64);
        if read < HEADER_LEN {
            return Err(SourceError::Truncated {
                offset,
                declared: HEADER_LEN as u64,
                available: read as u64,
            });
        }

        let header = PacketHeader::decode_with(&header_bytes, self.options.checksum)
            .map_err(|source| SourceError::MalformedHeader { offset, source })?;

        let packet_len = header.packet_length as usize;
        if packet_len > self.options.max_packet_bytes {
            return Err(SourceError::MalformedHeader {
                offset,
                source: HeaderError::PacketTooLarge {
                    packet_length: header.packet_length,
                    max_packet_bytes: self.options.max_packet_bytes,
                },
            });
        }

        let mut raw = Vec::with_capacity(packet_len);
        raw.extend_from_slice(&header_bytes);
        let body_len = u64::from(header.body_len());
        let body_read = (&mut self.source).take(body_len).read_to_end(&mut raw)?;
        self.position = self.position.saturating_add(body_read as u64);

        if (body_read as u64) < body_len {
            return Err(SourceError::Truncated {
                offset,
                declared: u64::from(header.packet_length),
                available: raw.len() as u64,
            });
        }

        Ok(Some(Packet {
            offset,
            header,
            raw: Bytes::from(raw),
        }))
    }
}

impl<R: Read> Iterator for PacketReader<R> {
    type Item = Result<Packet, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_packet() {
            Ok(Some(packet)) => Some(Ok(packet)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(error) => {
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}

/// Reads the single packet starting at `offset`.
pub fn read_packet_at<R: Read + Seek>(
    source: &mut R,
    offset: u64,
    options: ReaderOptions,
) -> Result<Option<Packet>, SourceError> {
    source.seek(SeekFrom::Start(offset))?;
    let mut reader = PacketReader::with_options(source, options);
    let packet = reader.read_packet().map_err(|error| rebase(error, offset))?;
    Ok(packet.map(|mut packet| {
        packet.offset = offset;
        packet
    }))
}

fn rebase(error: SourceError, base: u64) -> SourceError {
    match error {
        SourceError::MalformedHeader { offset, source } => SourceError::MalformedHeader {
            offset: offset.saturating_add(base),
            source,
        },
        SourceError::Truncated {
            offset,
            declared,
            available,
        } => SourceError::Truncated {
            offset: offset.saturating_add(base),
            declared,
            available,
        },
        other => other,
    }
}

fn read_up_to<R: Read>(source: &mut R, buffer: &mut [u8]) -> Result<usize, io::Error> {
    let mut read_total = 0;
    while read_total < buffer.len() {
        match source.read(&mut buffer[read_total..]) {
            Ok(0) => break,
            Ok(read) => read_total += read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }

    Ok(read_total)
}
