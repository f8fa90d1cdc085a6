//! H.265 Video Parameter Set, ITU-T H.265 clause 7.3.2.1 (header fields plus
//! the shared profile_tier_level() block).

use crate::RbspReader;
use crate::h265::ptl::{ProfileTierLevel, decode_profile_tier_level};

#[derive(Debug, Clone, Default)]
pub struct VideoParameterSet {
    pub vps_id: u8,
    pub vps_max_layers_minus1: u8,
    pub vps_max_sub_layers_minus1: u8,
    pub vps_temporal_id_nesting_flag: bool,
    pub profile_tier_level: ProfileTierLevel,
}

impl VideoParameterSet {
    pub fn decode(raw_rbsp: &[u8]) -> Option<Self> {
        let mut r = RbspReader::new(raw_rbsp);

        let vps_id = r.get(4) as u8;
        r.skip(2); // vps_base_layer_internal_flag, vps_base_layer_available_flag
        let vps_max_layers_minus1 = r.get(6) as u8;
        let vps_max_sub_layers_minus1 = r.get(3) as u8;
        let vps_temporal_id_nesting_flag = r.get(1) == 1;
        r.skip(16); // vps_reserved_0xffff_16bits

        let profile_tier_level = decode_profile_tier_level(&mut r, vps_max_sub_layers_minus1);

        if r.error() {
            return None;
        }

        Some(VideoParameterSet {
            vps_id,
            vps_max_layers_minus1,
            vps_max_sub_layers_minus1,
            vps_temporal_id_nesting_flag,
            profile_tier_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_VPS: [u8; 22] = [
        0x0c, 0x01, 0xff, 0xff, 0x01, 0x60, 0x00, 0x00, 0x03, 0x00, 0xb0, 0x00, 0x00, 0x03, 0x00,
        0x00, 0x03, 0x00, 0x5d, 0xac, 0x59, 0x00,
    ];

    #[test]
    fn decodes_sample_vps() {
        let vps = VideoParameterSet::decode(&SAMPLE_VPS).expect("sample VPS should parse");

        assert_eq!(vps.vps_id, 0);
        assert_eq!(vps.vps_max_layers_minus1, 0);
        assert_eq!(vps.vps_max_sub_layers_minus1, 0);
        assert!(vps.vps_temporal_id_nesting_flag);
        assert_eq!(vps.profile_tier_level.general.profile_idc, 1);
        assert_eq!(vps.profile_tier_level.general_level_idc, 93);
    }
}
