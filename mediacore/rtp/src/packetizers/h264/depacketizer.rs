//! H.264 RTP Depacketizer Implementation
//!
//! Reassembles RFC 6184 single-NAL and FU-A fragmented RTP packets into
//! [`VideoFrame`]s. STAP-A (type 24) aggregation is not produced by
//! [`super::packetizer::H264RtpPacketizer`] but is accepted here since
//! third-party senders use it.

use crate::error::RtpError;
use crate::frame::{VideoCodec, VideoFrame};
use crate::packet::RtpPacket;
use crate::traits::RtpDepacketizer;
use bitstream::h264::SeqParameterSet;

const STAP_A_TYPE: u8 = 24;
const FU_A_TYPE: u8 = 28;

const NAL_TYPE_SPS: u8 = 7;
const NAL_TYPE_PPS: u8 = 8;
const NAL_TYPE_IDR: u8 = 5;

pub struct H264RtpDepacketizer {
    clock_rate: u32,
    fu_buffer: Vec<u8>,
    fu_in_progress: bool,
    fu_nal_header: u8,
    current_frame: Option<VideoFrame>,
    width: u32,
    height: u32,
}

impl H264RtpDepacketizer {
    pub fn new(clock_rate: u32) -> Self {
        H264RtpDepacketizer {
            clock_rate,
            fu_buffer: Vec::new(),
            fu_in_progress: false,
            fu_nal_header: 0,
            current_frame: None,
            width: 0,
            height: 0,
        }
    }

    fn frame_for(&mut self, packet: &RtpPacket, arrival_time_ms: u64) -> &mut VideoFrame {
        if self.current_frame.is_none()
            || self.current_frame.as_ref().unwrap().timestamp != packet.header.timestamp
        {
            self.current_frame = Some(VideoFrame::new(
                VideoCodec::H264,
                packet.header.ssrc,
                packet.header.timestamp,
                self.clock_rate,
                arrival_time_ms,
            ));
        }
        self.current_frame.as_mut().unwrap()
    }

    fn push_nal_to_frame(&mut self, packet: &RtpPacket, arrival_time_ms: u64, nal: &[u8]) {
        if nal.is_empty() {
            return;
        }
        let nal_type = nal[0] & 0x1F;
        if nal_type == NAL_TYPE_SPS && nal.len() > 1 {
            if let Some(sps) = SeqParameterSet::decode(&nal[1..]) {
                self.width = sps.width;
                self.height = sps.height;
            }
        }
        let is_idr = nal_type == NAL_TYPE_IDR;
        let width = self.width;
        let height = self.height;
        let frame = self.frame_for(packet, arrival_time_ms);
        frame.push_nal(nal);
        if is_idr {
            frame.is_intra = true;
        }
        frame.width = width;
        frame.height = height;
    }

    fn handle_stap_a(&mut self, packet: &RtpPacket, arrival_time_ms: u64) -> Result<(), RtpError> {
        let payload = &packet.payload[1..];
        let mut pos = 0;
        while pos + 2 <= payload.len() {
            let nal_size = u16::from_be_bytes([payload[pos], payload[pos + 1]]) as usize;
            pos += 2;
            if pos + nal_size > payload.len() {
                return Err(RtpError::InvalidPacket(
                    "STAP-A NAL size exceeds payload".to_string(),
                ));
            }
            self.push_nal_to_frame(packet, arrival_time_ms, &payload[pos..pos + nal_size]);
            pos += nal_size;
        }
        Ok(())
    }

    fn handle_fu_a(&mut self, packet: &RtpPacket, arrival_time_ms: u64) -> Result<Option<VideoFrame>, RtpError> {
        if packet.payload.len() < 2 {
            return Err(RtpError::InvalidPacket("FU-A packet too short".to_string()));
        }
        let fu_indicator = packet.payload[0];
        let fu_header = packet.payload[1];
        let start = fu_header & 0x80 != 0;
        let end = fu_header & 0x40 != 0;
        let nal_type = fu_header & 0x1F;

        if start {
            let nri = (fu_indicator >> 5) & 0x03;
            self.fu_nal_header = (nri << 5) | nal_type;
            self.fu_buffer.clear();
            self.fu_buffer.push(self.fu_nal_header);
            self.fu_in_progress = true;
        }

        if !self.fu_in_progress {
            return Ok(None);
        }

        self.fu_buffer.extend_from_slice(&packet.payload[2..]);

        if end {
            self.fu_in_progress = false;
            let nal = std::mem::take(&mut self.fu_buffer);
            self.push_nal_to_frame(packet, arrival_time_ms, &nal);
        }

        if packet.header.marker {
            return Ok(self.current_frame.take());
        }
        Ok(None)
    }
}

impl RtpDepacketizer for H264RtpDepacketizer {
    fn process_packet(&mut self, packet: &RtpPacket, arrival_time_ms: u64) -> Option<crate::frame::MediaFrame> {
        if packet.payload.is_empty() {
            return None;
        }
        let nal_type = packet.payload[0] & 0x1F;

        let result = match nal_type {
            STAP_A_TYPE => {
                if self.handle_stap_a(packet, arrival_time_ms).is_err() {
                    return None;
                }
                if packet.header.marker {
                    self.current_frame.take()
                } else {
                    None
                }
            }
            FU_A_TYPE => self.handle_fu_a(packet, arrival_time_ms).ok().flatten(),
            1..=23 => {
                self.push_nal_to_frame(packet, arrival_time_ms, &packet.payload);
                if packet.header.marker {
                    self.current_frame.take()
                } else {
                    None
                }
            }
            _ => None,
        };

        result.map(crate::frame::MediaFrame::Video)
    }

    fn reset(&mut self) {
        self.fu_buffer.clear();
        self.fu_in_progress = false;
        self.current_frame = None;
    }

    fn has_pending_data(&self) -> bool {
        self.fu_in_progress || self.current_frame.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::RtpHeader;

    fn make_packet(payload: Vec<u8>, seq: u16, timestamp: u32, marker: bool) -> RtpPacket {
        let mut header = RtpHeader::new(96, 42);
        header.sequence_number = seq;
        header.timestamp = timestamp;
        header.marker = marker;
        RtpPacket::new(header, payload)
    }

    #[test]
    fn single_nal_unit_produces_frame_on_marker() {
        let mut dep = H264RtpDepacketizer::new(90000);
        let packet = make_packet(vec![0x65, 0x01, 0x02, 0x03], 1, 1000, true);
        let frame = dep.process_packet(&packet, 10).unwrap();
        match frame {
            crate::frame::MediaFrame::Video(f) => {
                assert!(f.is_intra);
                assert_eq!(f.nal_units().count(), 1);
            }
            _ => panic!("expected video frame"),
        }
    }

    #[test]
    fn fu_a_reassembly_across_fragments() {
        let mut dep = H264RtpDepacketizer::new(90000);

        let fu_indicator = (3 << 5) | FU_A_TYPE;
        let start_header = 0x80 | NAL_TYPE_IDR;
        let mid_header = NAL_TYPE_IDR;
        let end_header = 0x40 | NAL_TYPE_IDR;

        let p1 = make_packet(vec![fu_indicator, start_header, 0xAA, 0xBB], 1, 2000, false);
        let p2 = make_packet(vec![fu_indicator, mid_header, 0xCC, 0xDD], 2, 2000, false);
        let p3 = make_packet(vec![fu_indicator, end_header, 0xEE], 3, 2000, true);

        assert!(dep.process_packet(&p1, 1).is_none());
        assert!(dep.process_packet(&p2, 2).is_none());
        let frame = dep.process_packet(&p3, 3).unwrap();

        match frame {
            crate::frame::MediaFrame::Video(f) => {
                let nals: Vec<&[u8]> = f.nal_units().collect();
                assert_eq!(nals.len(), 1);
                assert_eq!(nals[0], &[NAL_TYPE_IDR, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE]);
                assert!(f.is_intra);
            }
            _ => panic!("expected video frame"),
        }
    }

    #[test]
    fn reset_clears_in_progress_fragment() {
        let mut dep = H264RtpDepacketizer::new(90000);
        let fu_indicator = (3 << 5) | FU_A_TYPE;
        let start_header = 0x80 | NAL_TYPE_IDR;
        let p1 = make_packet(vec![fu_indicator, start_header, 0xAA], 1, 3000, false);
        dep.process_packet(&p1, 1);
        assert!(dep.has_pending_data());
        dep.reset();
        assert!(!dep.has_pending_data());
    }

    #[test]
    fn different_timestamp_starts_new_frame() {
        let mut dep = H264RtpDepacketizer::new(90000);
        let p1 = make_packet(vec![NAL_TYPE_PPS, 0x01], 1, 1000, false);
        dep.process_packet(&p1, 1);
        assert!(dep.has_pending_data());

        let p2 = make_packet(vec![0x65, 0x02], 2, 2000, true);
        let frame = dep.process_packet(&p2, 2).unwrap();
        match frame {
            crate::frame::MediaFrame::Video(f) => {
                assert_eq!(f.nal_units().count(), 1);
                assert_eq!(f.timestamp, 2000);
            }
            _ => panic!("expected video frame"),
        }
    }
}
