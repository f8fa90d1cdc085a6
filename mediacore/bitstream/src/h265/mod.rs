//! H.265/HEVC parameter set and profile-tier-level parsing.

mod pps;
mod ptl;
mod sps;
mod vps;

pub use pps::PictureParameterSet;
pub use ptl::{ProfileBlock, ProfileTierLevel, decode_profile_tier_level};
pub use sps::{ConformanceWindow, SeqParameterSet};
pub use vps::VideoParameterSet;
