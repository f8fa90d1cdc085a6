//! RTMP chunk stream: basic header, Type 0-3 message headers, per-stream
//! reassembly, and window acknowledgement bookkeeping.
//!
//! Grounded on `rtmpconnection.h`'s `RTMPChunkInputStream`/
//! `RTMPChunkOutputStream` shape (each chunk stream owns its last header
//! for delta decoding plus an in-progress assembly buffer) and on this
//! workspace's `protocol.rs` read-loop style for the surrounding
//! accumulate-until-enough-bytes pattern, adapted to RTMP's variable-width
//! framing instead of a fixed 4-byte length prefix.

use std::collections::HashMap;

use crate::error::{Result, RtmpError};
use crate::message::RtmpMessage;

pub const DEFAULT_MAX_CHUNK_SIZE: u32 = 128;
const EXTENDED_TIMESTAMP_MARKER: u32 = 0x00FF_FFFF;

/// A chunk stream's last-seen absolute header, used to fill in the fields a
/// Type 1/2/3 chunk omits.
#[derive(Debug, Clone)]
struct ChunkHeader {
    timestamp: u32,
    message_length: u32,
    message_type_id: u8,
    message_stream_id: u32,
    has_extended_timestamp: bool,
}

struct ChunkInputStream {
    last_header: Option<ChunkHeader>,
    assembling_header: Option<ChunkHeader>,
    assembly: Vec<u8>,
}

impl ChunkInputStream {
    fn new() -> Self {
        ChunkInputStream {
            last_header: None,
            assembling_header: None,
            assembly: Vec::new(),
        }
    }
}

/// Decodes an incoming byte stream into complete [`RtmpMessage`]s,
/// maintaining per-`chunkStreamId` reassembly state and the inbound window
/// acknowledgement counter.
pub struct ChunkDecoder {
    max_chunk_size: usize,
    streams: HashMap<u32, ChunkInputStream>,
    buffer: Vec<u8>,
    window_ack_size: Option<u32>,
    bytes_since_ack: u32,
    total_in_bytes: u64,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        ChunkDecoder {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE as usize,
            streams: HashMap::new(),
            buffer: Vec::new(),
            window_ack_size: None,
            bytes_since_ack: 0,
            total_in_bytes: 0,
        }
    }

    pub fn set_max_chunk_size(&mut self, size: u32) {
        self.max_chunk_size = size.max(1) as usize;
    }

    pub fn set_window_ack_size(&mut self, size: u32) {
        self.window_ack_size = Some(size);
    }

    pub fn total_in_bytes(&self) -> u64 {
        self.total_in_bytes
    }

    /// Feeds newly received bytes, returning every message whose body
    /// became complete as a result, plus whether the inbound window
    /// acknowledgement threshold was crossed (the caller sends the actual
    /// `Acknowledgement` control message).
    pub fn feed(&mut self, data: &[u8]) -> Result<(Vec<RtmpMessage>, bool)> {
        self.buffer.extend_from_slice(data);
        self.total_in_bytes += data.len() as u64;

        let mut messages = Vec::new();
        let mut ack_due = false;

        if let Some(window) = self.window_ack_size {
            self.bytes_since_ack += data.len() as u32;
            if self.bytes_since_ack >= window {
                self.bytes_since_ack %= window.max(1);
                ack_due = true;
            }
        }

        loop {
            match self.try_decode_one_chunk()? {
                Some(message) => messages.push(message),
                None => break,
            }
        }

        Ok((messages, ack_due))
    }

    /// Attempts to decode exactly one chunk from the front of `self.buffer`.
    /// Returns `Ok(None)` both when more bytes are needed and when the
    /// chunk completed without finishing its message.
    fn try_decode_one_chunk(&mut self) -> Result<Option<RtmpMessage>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let (fmt, csid, basic_len) = match parse_basic_header(&self.buffer) {
            Some(v) => v,
            None => return Ok(None),
        };

        let header_len = match fmt {
            0 => 11,
            1 => 7,
            2 => 3,
            3 => 0,
            _ => unreachable!("fmt is masked to 2 bits"),
        };

        if self.buffer.len() < basic_len + header_len {
            return Ok(None);
        }

        let raw_header = &self.buffer[basic_len..basic_len + header_len];
        let prior = self.streams.get(&csid).and_then(|s| s.last_header.clone());

        let (mut timestamp_field, message_length, message_type_id, message_stream_id) = match fmt {
            0 => {
                let ts = read_u24(raw_header, 0);
                let len = read_u24(raw_header, 3);
                let type_id = raw_header[6];
                let stream_id = u32::from_le_bytes(raw_header[7..11].try_into().unwrap());
                (ts, len, type_id, stream_id)
            }
            1 => {
                let prior = prior
                    .as_ref()
                    .ok_or_else(|| RtmpError::Protocol("Type 1 chunk with no prior header".to_string()))?;
                let delta = read_u24(raw_header, 0);
                let len = read_u24(raw_header, 3);
                let type_id = raw_header[6];
                (delta, len, type_id, prior.message_stream_id)
            }
            2 => {
                let prior = prior
                    .as_ref()
                    .ok_or_else(|| RtmpError::Protocol("Type 2 chunk with no prior header".to_string()))?;
                let delta = read_u24(raw_header, 0);
                (delta, prior.message_length, prior.message_type_id, prior.message_stream_id)
            }
            3 => {
                let prior = prior
                    .as_ref()
                    .ok_or_else(|| RtmpError::Protocol("Type 3 chunk with no prior header".to_string()))?;
                (prior.timestamp, prior.message_length, prior.message_type_id, prior.message_stream_id)
            }
            _ => unreachable!(),
        };

        // A Type 3 chunk carries an extended timestamp iff the chunk it
        // continues did; Types 0-2 signal it via the 0xFFFFFF sentinel.
        let needs_extended = if fmt == 3 {
            prior.as_ref().map(|p| p.has_extended_timestamp).unwrap_or(false)
        } else {
            timestamp_field == EXTENDED_TIMESTAMP_MARKER
        };

        let mut consumed = basic_len + header_len;
        let mut extended_timestamp = None;
        if needs_extended {
            if self.buffer.len() < consumed + 4 {
                return Ok(None);
            }
            let ext = u32::from_be_bytes(self.buffer[consumed..consumed + 4].try_into().unwrap());
            extended_timestamp = Some(ext);
            consumed += 4;
        }

        let absolute_timestamp = if fmt == 0 {
            extended_timestamp.unwrap_or(timestamp_field)
        } else {
            let delta = extended_timestamp.unwrap_or(timestamp_field);
            prior.as_ref().map(|p| p.timestamp).unwrap_or(0).wrapping_add(delta)
        };
        timestamp_field = absolute_timestamp;

        let stream = self.streams.entry(csid).or_insert_with(ChunkInputStream::new);

        // Establish (or validate) the header for the message currently
        // being assembled on this chunk stream.
        if stream.assembling_header.is_none() {
            stream.assembling_header = Some(ChunkHeader {
                timestamp: timestamp_field,
                message_length,
                message_type_id,
                message_stream_id,
                has_extended_timestamp: needs_extended,
            });
        }
        let assembling = stream.assembling_header.as_ref().unwrap();
        let remaining = assembling.message_length as usize - stream.assembly.len();
        let take = remaining.min(self.max_chunk_size);

        if self.buffer.len() < consumed + take {
            return Ok(None);
        }

        let payload = &self.buffer[consumed..consumed + take];
        stream.assembly.extend_from_slice(payload);
        consumed += take;

        stream.last_header = Some(ChunkHeader {
            timestamp: timestamp_field,
            message_length,
            message_type_id,
            message_stream_id,
            has_extended_timestamp: needs_extended,
        });

        self.buffer.drain(0..consumed);

        if stream.assembly.len() == assembling.message_length as usize {
            let header = stream.assembling_header.take().unwrap();
            let body = std::mem::take(&mut stream.assembly);
            Ok(Some(RtmpMessage {
                message_stream_id: header.message_stream_id,
                message_type_id: header.message_type_id,
                timestamp: header.timestamp,
                body,
            }))
        } else {
            Ok(None)
        }
    }
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn read_u24(data: &[u8], offset: usize) -> u32 {
    ((data[offset] as u32) << 16) | ((data[offset + 1] as u32) << 8) | (data[offset + 2] as u32)
}

/// Parses the basic header (`fmt<<6 | csid`) at the front of `data`,
/// returning `(fmt, csid, byte_length)`. `csid` values 0 and 1 trigger the
/// 1- and 2-extra-byte encodings for `csid in [64, 65599]`.
fn parse_basic_header(data: &[u8]) -> Option<(u8, u32, usize)> {
    let first = *data.first()?;
    let fmt = (first >> 6) & 0x03;
    let low = first & 0x3F;

    match low {
        0 => {
            let second = *data.get(1)?;
            Some((fmt, 64 + second as u32, 2))
        }
        1 => {
            let second = *data.get(1)? as u32;
            let third = *data.get(2)? as u32;
            Some((fmt, 64 + second + third * 256, 3))
        }
        csid => Some((fmt, csid as u32, 1)),
    }
}

/// Encodes the basic header for a given `fmt`/`csid` pair.
pub fn encode_basic_header(fmt: u8, csid: u32, out: &mut Vec<u8>) {
    debug_assert!(fmt <= 3);
    if csid < 64 {
        out.push((fmt << 6) | csid as u8);
    } else if csid < 320 {
        out.push(fmt << 6);
        out.push((csid - 64) as u8);
    } else {
        out.push((fmt << 6) | 1);
        let rel = csid - 64;
        out.push((rel & 0xFF) as u8);
        out.push((rel >> 8) as u8);
    }
}

/// Encodes `message` onto `csid`, splitting its body into chunks of at most
/// `max_chunk_size`: the first chunk uses a full Type 0 header, subsequent
/// chunks of the same message use Type 3 continuation headers.
pub fn encode_message(csid: u32, message: &RtmpMessage, max_chunk_size: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let body = &message.body;
    let mut offset = 0usize;
    let use_extended = message.timestamp >= EXTENDED_TIMESTAMP_MARKER;

    while offset < body.len() || (offset == 0 && body.is_empty()) {
        let fmt = if offset == 0 { 0 } else { 3 };
        encode_basic_header(fmt, csid, &mut out);

        if fmt == 0 {
            let ts_field = if use_extended { EXTENDED_TIMESTAMP_MARKER } else { message.timestamp };
            push_u24(&mut out, ts_field);
            push_u24(&mut out, body.len() as u32);
            out.push(message.message_type_id);
            out.extend_from_slice(&message.message_stream_id.to_le_bytes());
        }

        if use_extended {
            out.extend_from_slice(&message.timestamp.to_be_bytes());
        }

        let take = (body.len() - offset).min(max_chunk_size);
        out.extend_from_slice(&body[offset..offset + take]);
        offset += take;

        if body.is_empty() {
            break;
        }
    }

    out
}

fn push_u24(out: &mut Vec<u8>, value: u32) {
    out.push(((value >> 16) & 0xFF) as u8);
    out.push(((value >> 8) & 0xFF) as u8);
    out.push((value & 0xFF) as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_header_small_csid() {
        let mut out = Vec::new();
        encode_basic_header(0, 3, &mut out);
        assert_eq!(out, vec![0x03]);
        assert_eq!(parse_basic_header(&out), Some((0, 3, 1)));
    }

    #[test]
    fn basic_header_one_extra_byte() {
        let mut out = Vec::new();
        encode_basic_header(1, 100, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(parse_basic_header(&out), Some((1, 100, 2)));
    }

    #[test]
    fn basic_header_two_extra_bytes() {
        let mut out = Vec::new();
        encode_basic_header(2, 1000, &mut out);
        assert_eq!(out.len(), 3);
        assert_eq!(parse_basic_header(&out), Some((2, 1000, 3)));
    }

    #[test]
    fn type0_message_round_trips_through_decoder() {
        let message = RtmpMessage {
            message_stream_id: 1,
            message_type_id: 20,
            timestamp: 500,
            body: vec![1, 2, 3, 4, 5],
        };
        let encoded = encode_message(3, &message, 128);

        let mut decoder = ChunkDecoder::new();
        let (messages, _) = decoder.feed(&encoded).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, message.body);
        assert_eq!(messages[0].timestamp, 500);
        assert_eq!(messages[0].message_type_id, 20);
    }

    #[test]
    fn message_split_across_chunk_size_reassembles() {
        let body: Vec<u8> = (0..300u32).map(|v| (v % 256) as u8).collect();
        let message = RtmpMessage {
            message_stream_id: 1,
            message_type_id: 9,
            timestamp: 10,
            body: body.clone(),
        };
        let encoded = encode_message(4, &message, 128);

        let mut decoder = ChunkDecoder::new();
        decoder.set_max_chunk_size(128);
        let (messages, _) = decoder.feed(&encoded).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, body);
    }

    #[test]
    fn feed_handles_partial_delivery() {
        let message = RtmpMessage {
            message_stream_id: 1,
            message_type_id: 20,
            timestamp: 1,
            body: vec![9, 9, 9],
        };
        let encoded = encode_message(3, &message, 128);

        let mut decoder = ChunkDecoder::new();
        let (first, _) = decoder.feed(&encoded[..5]).unwrap();
        assert!(first.is_empty());
        let (second, _) = decoder.feed(&encoded[5..]).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].body, vec![9, 9, 9]);
    }

    #[test]
    fn type3_continuation_inherits_prior_header() {
        // Two back-to-back messages on the same csid: the second one is
        // encoded with a Type 0 header again by `encode_message` (since it
        // starts a new message), but a real Type 3 "same everything" chunk
        // for a *new* message must still be accepted by inheriting csid
        // state -- simulate this explicitly.
        let mut decoder = ChunkDecoder::new();
        let first = RtmpMessage {
            message_stream_id: 1,
            message_type_id: 8,
            timestamp: 0,
            body: vec![1, 2, 3],
        };
        let encoded_first = encode_message(5, &first, 128);
        let (messages, _) = decoder.feed(&encoded_first).unwrap();
        assert_eq!(messages.len(), 1);

        // Type 2 chunk: timestamp delta only, same length/type/stream id.
        let mut raw = Vec::new();
        encode_basic_header(2, 5, &mut raw);
        push_u24(&mut raw, 33); // timestamp delta
        raw.extend_from_slice(&[4, 5, 6]);
        let (messages, _) = decoder.feed(&raw).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, vec![4, 5, 6]);
        assert_eq!(messages[0].timestamp, 33);
    }

    #[test]
    fn window_ack_threshold_is_reported() {
        let mut decoder = ChunkDecoder::new();
        decoder.set_window_ack_size(10);
        let (_, ack1) = decoder.feed(&[0u8; 5]).unwrap();
        assert!(!ack1);
        let (_, ack2) = decoder.feed(&[0u8; 10]).unwrap();
        assert!(ack2);
    }
}
