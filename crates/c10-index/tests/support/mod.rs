//! Deterministic synthetic Chapter 10 streams for integration tests.

#![allow(dead_code)]

use std::io::Cursor;

use c10_packet::{encode_packet, Packet, PacketFields, PacketReader};

const PAYLOAD_TYPES: [u8; 4] = [0x19, 0x38, 0x09, 0x21];

#[derive(Debug, Clone)]
pub struct StreamShape {
    pub target_bytes: usize,
    pub channels: u16,
    /// Insert a time packet after this many data packets; 0 disables.
    pub time_every: usize,
    /// Insert a channel-0 recording event after this many data packets; 0 disables.
    pub event_every: usize,
    /// Insert a stale index packet after this many data packets; 0 disables.
    pub stale_index_every: usize,
    pub channel_zero_start: u8,
}

impl Default for StreamShape {
    fn default() -> Self {
        Self {
            target_bytes: 64 * 1024,
            channels: 20,
            time_every: 50,
            event_every: 0,
            stale_index_every: 0,
            channel_zero_start: 0,
        }
    }
}

pub fn synthetic_stream(shape: &StreamShape) -> Vec<u8> {
    let mut stream = Vec::with_capacity(shape.target_bytes + 1024);
    let mut channel_seq = vec![0_u8; usize::from(shape.channels) + 2];
    let mut channel_zero_seq = shape.channel_zero_start;
    let mut rng = 0x2545_F491_u32;
    let mut rtc = 1_000_000_u64;
    let time_channel = shape.channels + 1;

    push(
        &mut stream,
        PacketFields {
            channel_id: 0,
            data_type: 0x01,
            sequence_number: channel_zero_seq,
            rtc,
            ..PacketFields::default()
        },
        b"TMATS\\R-1:ABC;",
    );

    let mut count = 0_usize;
    while stream.len() < shape.target_bytes {
        rng ^= rng << 13;
        rng ^= rng >> 17;
        rng ^= rng << 5;
        rtc += 1_000 + u64::from(rng % 500);

        let channel_id = 1 + (count % usize::from(shape.channels)) as u16;
        let seq = &mut channel_seq[usize::from(channel_id)];
        let body = vec![(rng & 0xFF) as u8; 8 + (rng % 200) as usize];
        push(
            &mut stream,
            PacketFields {
                channel_id,
                data_type: PAYLOAD_TYPES[(rng as usize >> 8) % PAYLOAD_TYPES.len()],
                sequence_number: *seq,
                rtc,
                ..PacketFields::default()
            },
            &body,
        );
        *seq = seq.wrapping_add(1);
        count += 1;

        if shape.time_every > 0 && count % shape.time_every == 0 {
            let seq = &mut channel_seq[usize::from(time_channel)];
            push(
                &mut stream,
                PacketFields {
                    channel_id: time_channel,
                    data_type: 0x11,
                    sequence_number: *seq,
                    rtc,
                    ..PacketFields::default()
                },
                &[0x12, 0x34, 0x56, 0x78, 0x01, 0x00, 0x00, 0x00],
            );
            *seq = seq.wrapping_add(1);
        }

        if shape.event_every > 0 && count % shape.event_every == 0 {
            channel_zero_seq = channel_zero_seq.wrapping_add(1);
            push(
                &mut stream,
                PacketFields {
                    channel_id: 0,
                    data_type: 0x02,
                    sequence_number: channel_zero_seq,
                    rtc,
                    ..PacketFields::default()
                },
                &[0x01, 0x00, 0x00, 0x00],
            );
        }

        if shape.stale_index_every > 0 && count % shape.stale_index_every == 0 {
            push(
                &mut stream,
                PacketFields {
                    channel_id: 0,
                    data_type: 0x03,
                    sequence_number: 0xEE,
                    rtc,
                    ..PacketFields::default()
                },
                &[0xFF; 48],
            );
        }
    }

    stream
}

pub fn data_packet(channel_id: u16, data_type: u8, rtc: u64) -> Vec<u8> {
    encode_packet(
        &PacketFields {
            channel_id,
            data_type,
            rtc,
            ..PacketFields::default()
        },
        &[0x5A; 24],
    )
    .expect("encode packet")
}

pub fn packets(bytes: &[u8]) -> Vec<Packet> {
    PacketReader::new(Cursor::new(bytes))
        .collect::<Result<Vec<_>, _>>()
        .expect("stream should parse")
}

fn push(stream: &mut Vec<u8>, fields: PacketFields, body: &[u8]) {
    stream.extend(encode_packet(&fields, body).expect("encode packet"));
}
