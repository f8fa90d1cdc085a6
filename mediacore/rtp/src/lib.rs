//! RTP packetization and depacketization for H.264 and H.265 video.
//!
//! Implements RFC 3550 (RTP), RFC 6184 (H.264 payload format) and RFC 7798
//! (H.265 payload format).

pub mod error;
pub mod frame;
pub mod packet;
pub mod packetizers;
pub mod traits;

pub use error::{Result, RtpError};
pub use frame::{AudioCodec, AudioFrame, MediaFrame, RtpPacketInfo, VideoCodec, VideoFrame};
pub use packet::{RtpHeader, RtpPacket};
pub use packetizers::{H264RtpDepacketizer, H264RtpPacketizer, H265RtpDepacketizer, H265RtpPacketizer};
pub use traits::{RtpDepacketizer, RtpPacketizer};
