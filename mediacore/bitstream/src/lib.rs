//! Bit-level readers and H.264/H.265 parameter-set parsing.
//!
//! This crate knows nothing about RTP or RTMP: it turns raw NAL payload
//! bytes into structured syntax elements, and is shared by the `rtp` crate's
//! depacketizer (which needs SPS dimensions and intra detection) and by
//! anything else that needs to look inside an H.26x bitstream.

mod bits;
mod bit_reader;
pub mod error;
pub mod h264;
pub mod h265;
pub mod nal;
mod rbsp_reader;

pub use bit_reader::BitReader;
pub use error::{BitstreamError, Result};
pub use nal::{AnnexBNals, split_annex_b};
pub use rbsp_reader::RbspReader;
