//! H.264 RTP Packetizer Implementation
//!
//! Implements RFC 6184 - RTP Payload Format for H.264 Video.
//!
//! # Packetization Modes
//!
//! ## Single NAL Unit Mode (Section 5.6)
//! Used when a complete NAL unit fits within the MTU. The NAL unit is sent
//! as-is in the RTP payload without modification.
//!
//! ## FU-A Fragmentation Mode (Section 5.8)
//! Used when a NAL unit exceeds the MTU and must be fragmented. Fragment
//! sizes are fair-rounded (see [`crate::packetizers::fragment::fair_split`])
//! rather than chunked at a fixed size, so no single fragment ends up much
//! smaller than the rest.
//!
//! FU Indicator (1 byte):
//! ```text
//!  0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+
//! |F|NRI|  Type   |
//! +-+-+-+-+-+-+-+-+
//! ```
//!
//! FU Header (1 byte):
//! ```text
//!  0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+
//! |S|E|R|  Type   |
//! +-+-+-+-+-+-+-+-+
//! ```

use crate::packet::{RtpHeader, RtpPacket};
use crate::packetizers::fragment::fair_split;
use crate::traits::RtpPacketizer;
use bitstream::split_annex_b;
use rand::Rng;

/// FU-A fragmentation unit type (RFC 6184 Section 5.8)
const FU_A_TYPE: u8 = 28;

pub struct H264RtpPacketizer {
    ssrc: u32,
    sequence_number: u16,
    timestamp: u32,
    payload_type: u8,
    max_payload_size: usize,
    timestamp_increment: u32,
}

impl H264RtpPacketizer {
    /// `max_payload_size` is the MTU budget available to the RTP payload
    /// (MTU minus IP/UDP/RTP headers); `fps` drives the 90 kHz timestamp
    /// increment applied per call to [`packetize`](Self::packetize).
    pub fn new(payload_type: u8, max_payload_size: usize, fps: f64) -> Self {
        let mut rng = rand::thread_rng();
        let timestamp_increment = (90000.0 / fps).round() as u32;

        H264RtpPacketizer {
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

    fn packetize_fu_a(&mut self, nal_unit: &[u8], is_last_nal: bool) -> Vec<RtpPacket> {
        if nal_unit.is_empty() {
            return Vec::new();
        }

        let (nal_type, nri) = parse_nal_header(nal_unit[0]);
        let fu_indicator = (nri << 5) | FU_A_TYPE;
        let payload = &nal_unit[1..];
        let fragment_size = self.max_payload_size - 2;

        let fragments = fair_split(payload, fragment_size);
        let mut packets = Vec::with_capacity(fragments.len());

        for (i, fragment) in fragments.iter().enumerate() {
            let is_first = i == 0;
            let is_last_fragment = i == fragments.len() - 1;
            let fu_header = build_fu_header(nal_type, is_first, is_last_fragment);
            let rtp_payload = build_fu_a_payload(fu_indicator, fu_header, fragment);

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

fn parse_nal_header(nal_header: u8) -> (u8, u8) {
    let nal_type = nal_header & 0x1F;
    let nri = (nal_header >> 5) & 0x03;
    (nal_type, nri)
}

fn build_fu_header(nal_type: u8, is_first: bool, is_last: bool) -> u8 {
    let mut fu_header = nal_type;
    if is_first {
        fu_header |= 0x80;
    }
    if is_last {
        fu_header |= 0x40;
    }
    fu_header
}

fn build_fu_a_payload(fu_indicator: u8, fu_header: u8, fragment: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(fragment.len() + 2);
    payload.push(fu_indicator);
    payload.push(fu_header);
    payload.extend_from_slice(fragment);
    payload
}

impl RtpPacketizer for H264RtpPacketizer {
    fn packetize(&mut self, data: &[u8]) -> Vec<RtpPacket> {
        let mut packets = Vec::new();

        let nal_units = split_annex_b(data);
        let nal_count = nal_units.len();

        for (i, nal_unit) in nal_units.into_iter().enumerate() {
            let is_last_nal = i == nal_count - 1;

            if nal_unit.len() <= self.max_payload_size {
                packets.extend(self.packetize_single_nal(nal_unit, is_last_nal));
            } else {
                packets.extend(self.packetize_fu_a(nal_unit, is_last_nal));
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
