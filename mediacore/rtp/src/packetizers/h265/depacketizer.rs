//! H.265 RTP Depacketizer Implementation
//!
//! Reassembles RFC 7798 single-NAL, AP (type 48), and FU (type 49) packets
//! into [`VideoFrame`]s. Only `sprop-max-don-diff == 0` streams are
//! supported: a DONL/DOND field on an AP packet is rejected with
//! [`RtpError::UnsupportedDon`] rather than silently misparsed.

use crate::error::RtpError;
use crate::frame::{MediaFrame, VideoCodec, VideoFrame};
use crate::packet::RtpPacket;
use crate::traits::RtpDepacketizer;
use bitstream::h265::SeqParameterSet;

const AP_NAL_TYPE: u8 = 48;
const FU_NAL_TYPE: u8 = 49;

const NAL_TYPE_SPS: u8 = 33;
const NAL_TYPE_PPS: u8 = 34;

/// Expect AP/FU streams without DONL/DOND fields (`sprop-max-don-diff == 0`).
/// Hard-coded since the SDP negotiation that would carry this parameter is
/// out of scope here; streams using DON must be rejected rather than
/// misparsed.
const SPROP_MAX_DON_DIFF: u32 = 0;

fn parse_nal_header(byte0: u8, byte1: u8) -> (u8, u8, u8) {
    let nal_type = (byte0 >> 1) & 0x3F;
    let layer_id = ((byte0 & 0x01) << 5) | (byte1 >> 3);
    let tid = byte1 & 0x07;
    (nal_type, layer_id, tid)
}

fn is_irap(nal_type: u8) -> bool {
    (16..=23).contains(&nal_type)
}

pub struct H265RtpDepacketizer {
    clock_rate: u32,
    fu_buffer: Vec<u8>,
    fu_in_progress: bool,
    current_frame: Option<VideoFrame>,
    width: u32,
    height: u32,
}

impl H265RtpDepacketizer {
    pub fn new(clock_rate: u32) -> Self {
        H265RtpDepacketizer {
            clock_rate,
            fu_buffer: Vec::new(),
            fu_in_progress: false,
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
                VideoCodec::H265,
                packet.header.ssrc,
                packet.header.timestamp,
                self.clock_rate,
                arrival_time_ms,
            ));
        }
        self.current_frame.as_mut().unwrap()
    }

    fn push_nal_to_frame(&mut self, packet: &RtpPacket, arrival_time_ms: u64, nal: &[u8]) {
        if nal.len() < 2 {
            return;
        }
        let (nal_type, layer_id, _tid) = parse_nal_header(nal[0], nal[1]);

        if nal_type == NAL_TYPE_SPS {
            if let Some(sps) = SeqParameterSet::decode(&nal[2..], layer_id) {
                self.width = sps.pic_width_in_luma_samples;
                self.height = sps.pic_height_in_luma_samples;
            }
        }

        let marks_intra = is_irap(nal_type) || nal_type == NAL_TYPE_SPS || nal_type == NAL_TYPE_PPS;
        let width = self.width;
        let height = self.height;
        let frame = self.frame_for(packet, arrival_time_ms);
        frame.push_nal(nal);
        if marks_intra {
            frame.is_intra = true;
        }
        frame.width = width;
        frame.height = height;
    }

    fn handle_ap(&mut self, packet: &RtpPacket, arrival_time_ms: u64) -> Result<(), RtpError> {
        let payload = &packet.payload[2..];
        let mut pos = 0;

        if SPROP_MAX_DON_DIFF != 0 {
            return Err(RtpError::UnsupportedDon);
        }

        while pos + 2 <= payload.len() {
            let nal_size = u16::from_be_bytes([payload[pos], payload[pos + 1]]) as usize;
            pos += 2;
            if pos + nal_size > payload.len() {
                return Err(RtpError::InvalidPacket(
                    "AP NAL size exceeds payload".to_string(),
                ));
            }
            self.push_nal_to_frame(packet, arrival_time_ms, &payload[pos..pos + nal_size]);
            pos += nal_size;
        }
        Ok(())
    }

    fn handle_fu(&mut self, packet: &RtpPacket, arrival_time_ms: u64) -> Result<Option<VideoFrame>, RtpError> {
        if packet.payload.len() < 3 {
            return Err(RtpError::InvalidPacket("FU packet too short".to_string()));
        }
        let byte0 = packet.payload[0];
        let byte1 = packet.payload[1];
        let fu_header = packet.payload[2];

        let start = fu_header & 0x80 != 0;
        let end = fu_header & 0x40 != 0;
        let fu_type = fu_header & 0x3F;

        let (_, layer_id, tid) = parse_nal_header(byte0, byte1);

        if start {
            let nal_byte0 = (fu_type << 1) | (layer_id >> 5);
            let nal_byte1 = ((layer_id & 0x1F) << 3) | tid;
            self.fu_buffer.clear();
            self.fu_buffer.push(nal_byte0);
            self.fu_buffer.push(nal_byte1);
            self.fu_in_progress = true;
        }

        if !self.fu_in_progress {
            return Ok(None);
        }

        self.fu_buffer.extend_from_slice(&packet.payload[3..]);

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

impl RtpDepacketizer for H265RtpDepacketizer {
    fn process_packet(&mut self, packet: &RtpPacket, arrival_time_ms: u64) -> Option<MediaFrame> {
        if packet.payload.len() < 2 {
            return None;
        }
        let (nal_type, _, _) = parse_nal_header(packet.payload[0], packet.payload[1]);

        let result = match nal_type {
            AP_NAL_TYPE => {
                if self.handle_ap(packet, arrival_time_ms).is_err() {
                    return None;
                }
                if packet.header.marker {
                    self.current_frame.take()
                } else {
                    None
                }
            }
            FU_NAL_TYPE => self.handle_fu(packet, arrival_time_ms).ok().flatten(),
            _ => {
                self.push_nal_to_frame(packet, arrival_time_ms, &packet.payload);
                if packet.header.marker {
                    self.current_frame.take()
                } else {
                    None
                }
            }
        };

        result.map(MediaFrame::Video)
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
        let mut dep = H265RtpDepacketizer::new(90000);
        // type 19 (IDR_W_RADL), layer 0, tid 1
        let packet = make_packet(vec![0x26, 0x01, 0xAA, 0xBB], 1, 1000, true);
        let frame = dep.process_packet(&packet, 10).unwrap();
        match frame {
            MediaFrame::Video(f) => {
                assert!(f.is_intra);
                assert_eq!(f.nal_units().count(), 1);
            }
            _ => panic!("expected video frame"),
        }
    }

    #[test]
    fn fu_reassembly_across_fragments() {
        let mut dep = H265RtpDepacketizer::new(90000);

        let payload_hdr_byte0 = (FU_NAL_TYPE << 1) | 0; // layer_id high bit 0
        let payload_hdr_byte1 = (0 << 3) | 1; // layer_id low 0, tid 1
        let nal_type = 19u8; // IDR_W_RADL

        let start_fu = 0x80 | nal_type;
        let mid_fu = nal_type;
        let end_fu = 0x40 | nal_type;

        let p1 = make_packet(
            vec![payload_hdr_byte0, payload_hdr_byte1, start_fu, 0xAA, 0xBB],
            1,
            2000,
            false,
        );
        let p2 = make_packet(
            vec![payload_hdr_byte0, payload_hdr_byte1, mid_fu, 0xCC, 0xDD],
            2,
            2000,
            false,
        );
        let p3 = make_packet(vec![payload_hdr_byte0, payload_hdr_byte1, end_fu, 0xEE], 3, 2000, true);

        assert!(dep.process_packet(&p1, 1).is_none());
        assert!(dep.process_packet(&p2, 2).is_none());
        let frame = dep.process_packet(&p3, 3).unwrap();

        match frame {
            MediaFrame::Video(f) => {
                let nals: Vec<&[u8]> = f.nal_units().collect();
                assert_eq!(nals.len(), 1);
                let (reconstructed_type, _, _) = parse_nal_header(nals[0][0], nals[0][1]);
                assert_eq!(reconstructed_type, nal_type);
                assert_eq!(&nals[0][2..], &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE]);
                assert!(f.is_intra);
            }
            _ => panic!("expected video frame"),
        }
    }

    #[test]
    fn ap_packet_yields_multiple_nals() {
        let mut dep = H265RtpDepacketizer::new(90000);

        let mut payload = vec![(AP_NAL_TYPE << 1) | 0, 0x01];
        let nal1 = [0x26, 0x01, 0x01, 0x02];
        let nal2 = [0x02, 0x01, 0x03];
        payload.extend_from_slice(&(nal1.len() as u16).to_be_bytes());
        payload.extend_from_slice(&nal1);
        payload.extend_from_slice(&(nal2.len() as u16).to_be_bytes());
        payload.extend_from_slice(&nal2);

        let packet = make_packet(payload, 1, 4000, true);
        let frame = dep.process_packet(&packet, 5).unwrap();

        match frame {
            MediaFrame::Video(f) => {
                assert_eq!(f.nal_units().count(), 2);
                assert!(f.is_intra);
            }
            _ => panic!("expected video frame"),
        }
    }

    #[test]
    fn pps_only_packet_marks_frame_intra() {
        let mut dep = H265RtpDepacketizer::new(90000);
        // type 34 (PPS), layer 0, tid 1
        let packet = make_packet(vec![(NAL_TYPE_PPS << 1) | 0, 0x01, 0xAA], 1, 6000, true);
        let frame = dep.process_packet(&packet, 10).unwrap();
        match frame {
            MediaFrame::Video(f) => assert!(f.is_intra),
            _ => panic!("expected video frame"),
        }
    }

    #[test]
    fn reset_clears_in_progress_fragment() {
        let mut dep = H265RtpDepacketizer::new(90000);
        let payload_hdr_byte0 = (FU_NAL_TYPE << 1) | 0;
        let payload_hdr_byte1 = 1u8;
        let start_fu = 0x80 | 19u8;
        let p1 = make_packet(vec![payload_hdr_byte0, payload_hdr_byte1, start_fu, 0xAA], 1, 3000, false);
        dep.process_packet(&p1, 1);
        assert!(dep.has_pending_data());
        dep.reset();
        assert!(!dep.has_pending_data());
    }
}
