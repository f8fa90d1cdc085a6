//! H.265 RTP Packetizer Implementation
//!
//! Implements RFC 7798 - RTP Payload Format for HEVC.
//!
//! # NAL Unit Header (2 bytes, RFC 7798 Section 1.1.4)
//! ```text
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |F|   Type    |  LayerId  | TID |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! # FU Packet (Section 4.4.3)
//! A 2-byte PayloadHdr (type 49) followed by a 1-byte FU header
//! (`S|E|FuType`), then the fragment itself. Only `sprop-max-don-diff == 0`
//! streams (no DONL/DOND fields) are produced.

use crate::packet::{RtpHeader, RtpPacket};
use crate::packetizers::fragment::fair_split;
use crate::traits::RtpPacketizer;
use bitstream::split_annex_b;
use rand::Rng;

const FU_NAL_TYPE: u8 = 49;

pub struct H265RtpPacketizer {
    ssrc: u32,
    sequence_number: u16,
    timestamp: u32,
    payload_type: u8,
    max_payload_size: usize,
    timestamp_increment: u32,
}

impl H265RtpPacketizer {
    pub fn new(payload_type: u8, max_payload_size: usize, fps: f64) -> Self {
        let mut rng = rand::thread_rng();
        let timestamp_increment = (90000.0 / fps).round() as u32;

        H265RtpPacketizer {
            ssrc: rng.gen_range(0..=u32::MAX),
            sequence_number: rng.gen_range(0..=u16::MAX),
            timestamp: 0,
            payload_type,
            max_payload_size,
            timestamp_increment,
        }
    }

    fn packetize_single_nal(&mut self, nal_unit: &[u8], is_last: bool) -> Vec<RtpPacket> {
        vec![self.create_rtp_packet(nal_unit.to_vec(), is_last)]
    }

    fn packetize_fu(&mut self, nal_unit: &[u8], is_last_nal: bool) -> Vec<RtpPacket> {
        if nal_unit.len() < 2 {
            return Vec::new();
        }

        let (nal_type, layer_id, tid) = parse_nal_header(nal_unit[0], nal_unit[1]);
        let payload = &nal_unit[2..];
        let fragment_size = self.max_payload_size - 3;

        let fragments = fair_split(payload, fragment_size);
        let mut packets = Vec::with_capacity(fragments.len());

        for (i, fragment) in fragments.iter().enumerate() {
            let is_first = i == 0;
            let is_last_fragment = i == fragments.len() - 1;
            let (byte0, byte1) = build_payload_hdr(layer_id, tid);
            let fu_header = build_fu_header(nal_type, is_first, is_last_fragment);
            let mut rtp_payload = Vec::with_capacity(fragment.len() + 3);
            rtp_payload.push(byte0);
            rtp_payload.push(byte1);
            rtp_payload.push(fu_header);
            rtp_payload.extend_from_slice(fragment);

            packets.push(self.create_rtp_packet(rtp_payload, is_last_nal && is_last_fragment));
        }

        packets
    }

    fn create_rtp_packet(&mut self, payload: Vec<u8>, marker: bool) -> RtpPacket {
        let mut header = RtpHeader::new(self.payload_type, self.ssrc);
        header.sequence_number = self.sequence_number;
        header.timestamp = self.timestamp;
        header.marker = marker;

        self.sequence_number = self.sequence_number.wrapping_add(1);
        RtpPacket::new(header, payload)
    }
}

fn parse_nal_header(byte0: u8, byte1: u8) -> (u8, u8, u8) {
    let nal_type = (byte0 >> 1) & 0x3F;
    let layer_id = ((byte0 & 0x01) << 5) | (byte1 >> 3);
    let tid = byte1 & 0x07;
    (nal_type, layer_id, tid)
}

fn build_payload_hdr(layer_id: u8, tid: u8) -> (u8, u8) {
    let byte0 = (FU_NAL_TYPE << 1) | (layer_id >> 5);
    let byte1 = ((layer_id & 0x1F) << 3) | tid;
    (byte0, byte1)
}

fn build_fu_header(nal_type: u8, is_first: bool, is_last: bool) -> u8 {
    let mut fu_header = nal_type & 0x3F;
    if is_first {
        fu_header |= 0x80;
    }
    if is_last {
        fu_header |= 0x40;
    }
    fu_header
}

impl RtpPacketizer for H265RtpPacketizer {
    fn packetize(&mut self, data: &[u8]) -> Vec<RtpPacket> {
        let mut packets = Vec::new();

        let nal_units = split_annex_b(data);
        let nal_count = nal_units.len();

        for (i, nal_unit) in nal_units.into_iter().enumerate() {
            let is_last_nal = i == nal_count - 1;

            if nal_unit.len() <= self.max_payload_size {
                packets.extend(self.packetize_single_nal(nal_unit, is_last_nal));
            } else {
                packets.extend(self.packetize_fu(nal_unit, is_last_nal));
            }
        }

        self.timestamp = self.timestamp.wrapping_add(self.timestamp_increment);

        packets
    }

    fn get_payload_type(&self) -> u8 {
        self.payload_type
    }

    fn get_ssrc(&self) -> u32 {
        self.ssrc
    }

    fn get_timestamp(&self) -> u32 {
        self.timestamp
    }

    fn get_sequence_number(&self) -> u16 {
        self.sequence_number
    }
}
