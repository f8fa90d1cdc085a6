//! Codec-agnostic media frame produced by an [`crate::RtpDepacketizer`] and
//! consumed by the simulcast layer and frame-delay calculator.

/// Video codec carried by a [`VideoFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    H264,
    H265,
}

/// Audio codec carried by an [`AudioFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    Opus,
    Pcma,
    Pcmu,
}

/// Describes where one RTP packet's contribution landed inside
/// [`VideoFrame::payload`], so a frame can be re-packetized without
/// re-deriving fragment boundaries.
#[derive(Debug, Clone)]
pub struct RtpPacketInfo {
    pub position: usize,
    pub length: usize,
}

/// One decoded access unit: a length-prefixed run of NAL units.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub codec: VideoCodec,
    pub ssrc: u32,
    pub timestamp: u32,
    pub clock_rate: u32,
    pub arrival_time_ms: u64,
    pub sender_time_ms: Option<u64>,
    pub width: u32,
    pub height: u32,
    pub is_intra: bool,
    /// Concatenated NAL units, each prefixed with a 4-byte big-endian length.
    pub payload: Vec<u8>,
    pub rtp_info: Vec<RtpPacketInfo>,
}

impl VideoFrame {
    pub fn new(codec: VideoCodec, ssrc: u32, timestamp: u32, clock_rate: u32, arrival_time_ms: u64) -> Self {
        VideoFrame {
            codec,
            ssrc,
            timestamp,
            clock_rate,
            arrival_time_ms,
            sender_time_ms: None,
            width: 0,
            height: 0,
            is_intra: false,
            payload: Vec::new(),
            rtp_info: Vec::new(),
        }
    }

    /// Appends one NAL unit (without start code) to the frame payload with a
    /// 4-byte big-endian length prefix, recording its position for
    /// [`VideoFrame::rtp_info`].
    pub fn push_nal(&mut self, nal: &[u8]) {
        let position = self.payload.len();
        self.payload.extend_from_slice(&(nal.len() as u32).to_be_bytes());
        self.payload.extend_from_slice(nal);
        self.rtp_info.push(RtpPacketInfo {
            position,
            length: nal.len(),
        });
    }

    /// Iterates the length-prefixed NAL units in this frame's payload.
    pub fn nal_units(&self) -> impl Iterator<Item = &[u8]> {
        let payload = &self.payload;
        let mut pos = 0usize;
        std::iter::from_fn(move || {
            if pos + 4 > payload.len() {
                return None;
            }
            let len = u32::from_be_bytes(payload[pos..pos + 4].try_into().unwrap()) as usize;
            let start = pos + 4;
            if start + len > payload.len() {
                return None;
            }
            pos = start + len;
            Some(&payload[start..start + len])
        })
    }
}

#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub codec: AudioCodec,
    pub ssrc: u32,
    pub timestamp: u32,
    pub clock_rate: u32,
    pub arrival_time_ms: u64,
    pub sender_time_ms: Option<u64>,
    pub payload: Vec<u8>,
}

/// Either a video or an audio access unit.
#[derive(Debug, Clone)]
pub enum MediaFrame {
    Video(VideoFrame),
    Audio(AudioFrame),
}

impl MediaFrame {
    pub fn ssrc(&self) -> u32 {
        match self {
            MediaFrame::Video(f) => f.ssrc,
            MediaFrame::Audio(f) => f.ssrc,
        }
    }

    pub fn timestamp(&self) -> u32 {
        match self {
            MediaFrame::Video(f) => f.timestamp,
            MediaFrame::Audio(f) => f.timestamp,
        }
    }

    pub fn clock_rate(&self) -> u32 {
        match self {
            MediaFrame::Video(f) => f.clock_rate,
            MediaFrame::Audio(f) => f.clock_rate,
        }
    }

    pub fn arrival_time_ms(&self) -> u64 {
        match self {
            MediaFrame::Video(f) => f.arrival_time_ms,
            MediaFrame::Audio(f) => f.arrival_time_ms,
        }
    }
}
