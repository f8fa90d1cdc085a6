//! RTMP message types and the control-message (protocol control / user
//! control) payload helpers layered directly on top of the chunk stream.
//!
//! Grounded on `rtmpconnection.h`'s message dispatch (the connection reacts
//! to message type ids 1, 3, 5, 6 as protocol control messages before
//! anything reaches the AMF command layer).

use crate::error::{Result, RtmpError};

pub const MSG_SET_CHUNK_SIZE: u8 = 1;
pub const MSG_ABORT: u8 = 2;
pub const MSG_ACKNOWLEDGEMENT: u8 = 3;
pub const MSG_USER_CONTROL: u8 = 4;
pub const MSG_WINDOW_ACK_SIZE: u8 = 5;
pub const MSG_SET_PEER_BANDWIDTH: u8 = 6;
pub const MSG_AUDIO: u8 = 8;
pub const MSG_VIDEO: u8 = 9;
pub const MSG_AMF3_DATA: u8 = 15;
pub const MSG_AMF3_SHARED_OBJECT: u8 = 16;
pub const MSG_AMF3_COMMAND: u8 = 17;
pub const MSG_AMF0_DATA: u8 = 18;
pub const MSG_AMF0_SHARED_OBJECT: u8 = 19;
pub const MSG_AMF0_COMMAND: u8 = 20;
pub const MSG_AGGREGATE: u8 = 22;

/// A fully reassembled RTMP message, ready for dispatch by type id.
#[derive(Debug, Clone)]
pub struct RtmpMessage {
    pub message_stream_id: u32,
    pub message_type_id: u8,
    pub timestamp: u32,
    pub body: Vec<u8>,
}

impl RtmpMessage {
    pub fn control(message_type_id: u8, body: Vec<u8>) -> Self {
        RtmpMessage {
            message_stream_id: 0,
            message_type_id,
            timestamp: 0,
            body,
        }
    }
}

pub fn encode_set_chunk_size(size: u32) -> RtmpMessage {
    RtmpMessage::control(MSG_SET_CHUNK_SIZE, size.to_be_bytes().to_vec())
}

pub fn decode_set_chunk_size(message: &RtmpMessage) -> Result<u32> {
    read_u32(&message.body)
}

pub fn encode_window_ack_size(size: u32) -> RtmpMessage {
    RtmpMessage::control(MSG_WINDOW_ACK_SIZE, size.to_be_bytes().to_vec())
}

pub fn decode_window_ack_size(message: &RtmpMessage) -> Result<u32> {
    read_u32(&message.body)
}

/// Limit types for `Set Peer Bandwidth`: 0 hard, 1 soft, 2 dynamic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitType {
    Hard,
    Soft,
    Dynamic,
}

impl LimitType {
    fn as_byte(self) -> u8 {
        match self {
            LimitType::Hard => 0,
            LimitType::Soft => 1,
            LimitType::Dynamic => 2,
        }
    }

    fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(LimitType::Hard),
            1 => Ok(LimitType::Soft),
            2 => Ok(LimitType::Dynamic),
            other => Err(RtmpError::Parse(format!("unknown limit type {}", other))),
        }
    }
}

pub fn encode_set_peer_bandwidth(size: u32, limit: LimitType) -> RtmpMessage {
    let mut body = size.to_be_bytes().to_vec();
    body.push(limit.as_byte());
    RtmpMessage::control(MSG_SET_PEER_BANDWIDTH, body)
}

pub fn decode_set_peer_bandwidth(message: &RtmpMessage) -> Result<(u32, LimitType)> {
    if message.body.len() < 5 {
        return Err(RtmpError::Parse("short Set Peer Bandwidth body".to_string()));
    }
    let size = read_u32(&message.body)?;
    let limit = LimitType::from_byte(message.body[4])?;
    Ok((size, limit))
}

pub fn encode_acknowledgement(sequence_number: u32) -> RtmpMessage {
    RtmpMessage::control(MSG_ACKNOWLEDGEMENT, sequence_number.to_be_bytes().to_vec())
}

pub fn decode_acknowledgement(message: &RtmpMessage) -> Result<u32> {
    read_u32(&message.body)
}

fn read_u32(body: &[u8]) -> Result<u32> {
    if body.len() < 4 {
        return Err(RtmpError::Parse("short control message body".to_string()));
    }
    Ok(u32::from_be_bytes(body[0..4].try_into().unwrap()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_chunk_size_round_trips() {
        let message = encode_set_chunk_size(4096);
        assert_eq!(message.message_type_id, MSG_SET_CHUNK_SIZE);
        assert_eq!(decode_set_chunk_size(&message).unwrap(), 4096);
    }

    #[test]
    fn window_ack_size_round_trips() {
        let message = encode_window_ack_size(2_500_000);
        assert_eq!(decode_window_ack_size(&message).unwrap(), 2_500_000);
    }

    #[test]
    fn set_peer_bandwidth_round_trips() {
        let message = encode_set_peer_bandwidth(2_500_000, LimitType::Dynamic);
        let (size, limit) = decode_set_peer_bandwidth(&message).unwrap();
        assert_eq!(size, 2_500_000);
        assert_eq!(limit, LimitType::Dynamic);
    }

    #[test]
    fn acknowledgement_round_trips() {
        let message = encode_acknowledgement(123456);
        assert_eq!(decode_acknowledgement(&message).unwrap(), 123456);
    }

    #[test]
    fn decode_rejects_short_body() {
        let message = RtmpMessage::control(MSG_SET_CHUNK_SIZE, vec![0, 1]);
        assert!(decode_set_chunk_size(&message).is_err());
    }
}
