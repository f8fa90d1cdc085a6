mod fragment;
pub mod h264;
pub mod h265;

pub use h264::{H264RtpDepacketizer, H264RtpPacketizer};
pub use h265::{H265RtpDepacketizer, H265RtpPacketizer};
