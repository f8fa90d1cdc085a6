//! Packetizer/depacketizer capability traits shared by all codec
//! implementations in [`crate::packetizers`].

use crate::frame::MediaFrame;
use crate::packet::RtpPacket;

/// Turns an Annex-B access unit into one or more RTP packets.
pub trait RtpPacketizer {
    /// Packetizes one Annex-B access unit (NAL units delimited by start
    /// codes), advancing the packetizer's internal timestamp for the next
    /// call.
    fn packetize(&mut self, data: &[u8]) -> Vec<RtpPacket>;
    fn get_payload_type(&self) -> u8;
    fn get_ssrc(&self) -> u32;
    fn get_timestamp(&self) -> u32;
    fn get_sequence_number(&self) -> u16;
}

/// Reassembles RTP packets for one SSRC into complete [`MediaFrame`]s.
pub trait RtpDepacketizer {
    /// Feeds one RTP packet into the reassembly state machine.
    ///
    /// Returns `Some(frame)` once the packet carrying `marker == true`
    /// completes a frame, `None` while more fragments are still expected.
    fn process_packet(&mut self, packet: &RtpPacket, arrival_time_ms: u64) -> Option<MediaFrame>;
    /// Discards any in-progress reassembly state.
    fn reset(&mut self);
    /// Whether a partially reassembled frame is currently buffered.
    fn has_pending_data(&self) -> bool;
}
