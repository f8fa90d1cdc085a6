//! H.265 Profile-Tier-Level (PTL) syntax, ITU-T H.265 clause 7.3.3.
//!
//! Bit order here matches the reference HEVC parser's `H265ProfileTierLevel`
//! exactly, including the quirk where a profile-compatibility flag can
//! retroactively assign `profile_idc` the first time it is seen set at an
//! index greater than zero while `profile_idc` itself decoded as zero.

use crate::RbspReader;

/// One profile/tier/constraint-flags block (general or per sub-layer).
#[derive(Debug, Clone, Default)]
pub struct ProfileBlock {
    pub profile_space: u8,
    pub tier_flag: bool,
    pub profile_idc: u8,
    pub profile_compatibility_flags: u32,
    pub progressive_source_flag: bool,
    pub interlaced_source_flag: bool,
    pub non_packed_constraint_flag: bool,
    pub frame_only_constraint_flag: bool,
    pub inbld_flag: bool,
}

fn decode_profile_block(r: &mut RbspReader) -> ProfileBlock {
    let profile_space = r.get(2) as u8;
    let tier_flag = r.get(1) == 1;
    let mut profile_idc = r.get(5) as u8;

    let mut compatibility_flags = 0u32;
    for i in 0..32u32 {
        let flag = r.get(1) == 1;
        if flag {
            compatibility_flags |= 1 << i;
            if profile_idc == 0 && i > 0 {
                profile_idc = i as u8;
            }
        }
    }

    let progressive_source_flag = r.get(1) == 1;
    let interlaced_source_flag = r.get(1) == 1;
    let non_packed_constraint_flag = r.get(1) == 1;
    let frame_only_constraint_flag = r.get(1) == 1;

    const EXTENDED_RANGE_MASK: u32 = (1 << 4) | (1 << 5) | (1 << 6) | (1 << 7) | (1 << 8) | (1 << 9) | (1 << 10);
    let in_extended_range =
        matches!(profile_idc, 4..=10) || (compatibility_flags & EXTENDED_RANGE_MASK) != 0;

    if in_extended_range {
        r.skip(9); // nine further constraint flags
        if matches!(profile_idc, 5 | 9 | 10) {
            r.skip(1); // max_14bit_constraint_flag
            r.skip(33);
        } else {
            r.skip(34);
        }
    } else if profile_idc == 2 {
        r.skip(7);
        r.skip(1); // one_picture_only_constraint_flag
        r.skip(35);
    } else {
        r.skip(43);
    }

    let inbld_flag = if matches!(profile_idc, 1 | 2 | 3 | 4 | 5 | 9) {
        r.get(1) == 1
    } else {
        r.skip(1);
        false
    };

    ProfileBlock {
        profile_space,
        tier_flag,
        profile_idc,
        profile_compatibility_flags: compatibility_flags,
        progressive_source_flag,
        interlaced_source_flag,
        non_packed_constraint_flag,
        frame_only_constraint_flag,
        inbld_flag,
    }
}

/// Full profile_tier_level() syntax structure, general layer plus sub-layers.
#[derive(Debug, Clone, Default)]
pub struct ProfileTierLevel {
    pub general: ProfileBlock,
    pub general_level_idc: u8,
    pub sub_layer_profiles: Vec<Option<ProfileBlock>>,
    pub sub_layer_level_idc: Vec<Option<u8>>,
}

/// Decodes `profile_tier_level(profilePresentFlag=1, maxNumSubLayersMinus1)`.
pub fn decode_profile_tier_level(r: &mut RbspReader, max_num_sub_layers_minus1: u8) -> ProfileTierLevel {
    let general = decode_profile_block(r);
    let general_level_idc = r.get(8) as u8;

    let mut profile_present = Vec::with_capacity(max_num_sub_layers_minus1 as usize);
    let mut level_present = Vec::with_capacity(max_num_sub_layers_minus1 as usize);
    for _ in 0..max_num_sub_layers_minus1 {
        profile_present.push(r.get(1) == 1);
        level_present.push(r.get(1) == 1);
    }

    if max_num_sub_layers_minus1 > 0 {
        for _ in max_num_sub_layers_minus1..8 {
            r.skip(2); // reserved_zero_2bits
        }
    }

    let mut sub_layer_profiles = Vec::with_capacity(max_num_sub_layers_minus1 as usize);
    let mut sub_layer_level_idc = Vec::with_capacity(max_num_sub_layers_minus1 as usize);
    for i in 0..max_num_sub_layers_minus1 as usize {
        sub_layer_profiles.push(if profile_present[i] {
            Some(decode_profile_block(r))
        } else {
            None
        });
        sub_layer_level_idc.push(if level_present[i] {
            Some(r.get(8) as u8)
        } else {
            None
        });
    }

    ProfileTierLevel {
        general,
        general_level_idc,
        sub_layer_profiles,
        sub_layer_level_idc,
    }
}
