//! # mediacore
//!
//! Aggregates this workspace's media-plane crates behind one dependency:
//! bit-level/H.264/H.265 parsing, RTP packetization, the RTMP ingest
//! protocol engine, and simulcast layer selection with frame-delay
//! calculation.
//!
//! ## Public API
//!
//! ### Bitstream (`bitstream`)
//! - **`BitReader`** - bit-level cursor over an RBSP/NAL payload
//! - **`RbspReader`** - emulation-prevention-byte-aware RBSP reader
//! - **`split_annex_b`** - splits an Annex B byte stream into NAL units
//! - **`h264::SeqParameterSet`**, **`h265::SeqParameterSet`** - parameter-set
//!   decoders recovering frame dimensions
//!
//! ### RTP (`rtp`)
//! - **`VideoFrame`**, **`AudioFrame`**, **`MediaFrame`** - codec-agnostic media frames
//! - **`H264RtpPacketizer`**, **`H264RtpDepacketizer`** - RFC 6184
//! - **`H265RtpPacketizer`**, **`H265RtpDepacketizer`** - RFC 7798
//!
//! ### RTMP (`rtmp`)
//! - **`RtmpConnection`** - handshake + chunk + command state machine
//! - **`CommandMessage`**, **`ApplicationRegistry`** - NetConnection/NetStream command layer
//!
//! ### Simulcast (`simulcast`)
//! - **`SimulcastMediaFrameListener`** - per-timestamp layer selection
//! - **`FrameDelayCalculator`** - reference-clock recovery

pub use bitstream::{h264, h265, split_annex_b, AnnexBNals, BitReader, BitstreamError, RbspReader};
pub use rtp::{
    AudioFrame, AudioCodec, H264RtpDepacketizer, H264RtpPacketizer, H265RtpDepacketizer,
    H265RtpPacketizer, MediaFrame, RtpDepacketizer, RtpHeader, RtpPacket, RtpPacketizer, RtpError,
    VideoCodec, VideoFrame,
};
pub use rtmp::{
    AmfValue, ApplicationRegistry, CommandMessage, ConnectionState, ExitCode, NetStream,
    NetStreamState, RtmpConnection, RtmpError, RtmpEvent, RtmpMessage,
};
pub use simulcast::{
    FrameDelayCalculator, FrameDelayConfig, SimulcastConfig, SimulcastError,
    SimulcastMediaFrameListener,
};
