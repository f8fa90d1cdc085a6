//! H.265 Sequence Parameter Set, ITU-T H.265 clause 7.3.2.2.
//!
//! Decode order follows the reference parser through the conformance window,
//! then continues in standard H.265 SPS RBSP order (the reference parser's
//! own test suite asserts on fields past that point that its shipped
//! implementation never reaches — see the design ledger's open-question
//! entry on this).

use crate::RbspReader;
use crate::h265::ptl::{ProfileTierLevel, decode_profile_tier_level};

const HEVC_MAX_SUB_LAYERS: u32 = 7;

/// Chroma subsampling factors indexed by `chroma_format_idc` (0..=3).
const SUB_WIDTH_C: [u32; 4] = [1, 2, 2, 1];
const SUB_HEIGHT_C: [u32; 4] = [1, 2, 1, 1];

#[derive(Debug, Clone, Default)]
pub struct ConformanceWindow {
    pub left_offset: u32,
    pub right_offset: u32,
    pub top_offset: u32,
    pub bottom_offset: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SeqParameterSet {
    pub vps_id: u8,
    pub max_sub_layers_minus1: u8,
    pub temporal_id_nesting_flag: bool,
    pub profile_tier_level: ProfileTierLevel,
    pub seq_parameter_set_id: u32,
    pub chroma_format_idc: u32,
    pub separate_colour_plane_flag: bool,
    pub pic_width_in_luma_samples: u32,
    pub pic_height_in_luma_samples: u32,
    pub conformance_window: Option<ConformanceWindow>,
    pub bit_depth_luma_minus8: u32,
    pub bit_depth_chroma_minus8: u32,
    pub log2_max_pic_order_cnt_lsb_minus4: u32,
    pub sps_sub_layer_ordering_info_present_flag: bool,
    pub log2_min_luma_coding_block_size_minus3: u32,
    pub log2_diff_max_min_luma_coding_block_size: u32,
    pub log2_min_luma_transform_block_size_minus2: u32,
    pub log2_diff_max_min_luma_transform_block_size: u32,
}

impl SeqParameterSet {
    /// Decodes a SPS RBSP payload (NAL header already stripped).
    ///
    /// `nuh_layer_id` selects between `max_sub_layers_minus1` (base layer)
    /// and `ext_or_max_sub_layers_minus1` (non-zero layers, multilayer
    /// extension profiles); this decoder only supports the base-layer case,
    /// matching the reference parser.
    pub fn decode(raw_rbsp: &[u8], nuh_layer_id: u8) -> Option<Self> {
        let mut r = RbspReader::new(raw_rbsp);

        let vps_id = r.get(4) as u8;
        let max_sub_layers_minus1 = r.get(3) as u8;
        if nuh_layer_id != 0 {
            // Non-base-layer SPS (multilayer extension) is out of scope.
            return None;
        }
        if max_sub_layers_minus1 as u32 >= HEVC_MAX_SUB_LAYERS {
            return None;
        }

        let temporal_id_nesting_flag = r.get(1) == 1;
        let profile_tier_level = decode_profile_tier_level(&mut r, max_sub_layers_minus1);

        let seq_parameter_set_id = r.get_ue();
        let mut chroma_format_idc = r.get_ue();
        let separate_colour_plane_flag = if chroma_format_idc == 3 {
            let flag = r.get(1) == 1;
            if flag {
                chroma_format_idc = 0;
            }
            flag
        } else {
            false
        };

        let pic_width_in_luma_samples = r.get_ue();
        let pic_height_in_luma_samples = r.get_ue();

        let conformance_window_flag = r.get(1) == 1;
        let conformance_window = if conformance_window_flag {
            let sub_width_c = SUB_WIDTH_C[(chroma_format_idc as usize).min(3)];
            let sub_height_c = SUB_HEIGHT_C[(chroma_format_idc as usize).min(3)];
            Some(ConformanceWindow {
                left_offset: r.get_ue() * sub_width_c,
                right_offset: r.get_ue() * sub_width_c,
                top_offset: r.get_ue() * sub_height_c,
                bottom_offset: r.get_ue() * sub_height_c,
            })
        } else {
            None
        };

        let bit_depth_luma_minus8 = r.get_ue();
        let bit_depth_chroma_minus8 = r.get_ue();
        let log2_max_pic_order_cnt_lsb_minus4 = r.get_ue();

        let sps_sub_layer_ordering_info_present_flag = r.get(1) == 1;
        let first_sub_layer = if sps_sub_layer_ordering_info_present_flag {
            0
        } else {
            max_sub_layers_minus1
        };
        for _ in first_sub_layer..=max_sub_layers_minus1 {
            r.get_ue(); // sps_max_dec_pic_buffering_minus1
            r.get_ue(); // sps_max_num_reorder_pics
            r.get_ue(); // sps_max_latency_increase_plus1
        }

        let log2_min_luma_coding_block_size_minus3 = r.get_ue();
        let log2_diff_max_min_luma_coding_block_size = r.get_ue();
        let log2_min_luma_transform_block_size_minus2 = r.get_ue();
        let log2_diff_max_min_luma_transform_block_size = r.get_ue();

        if r.error() {
            return None;
        }

        Some(SeqParameterSet {
            vps_id,
            max_sub_layers_minus1,
            temporal_id_nesting_flag,
            profile_tier_level,
            seq_parameter_set_id,
            chroma_format_idc,
            separate_colour_plane_flag,
            pic_width_in_luma_samples,
            pic_height_in_luma_samples,
            conformance_window,
            bit_depth_luma_minus8,
            bit_depth_chroma_minus8,
            log2_max_pic_order_cnt_lsb_minus4,
            sps_sub_layer_ordering_info_present_flag,
            log2_min_luma_coding_block_size_minus3,
            log2_diff_max_min_luma_coding_block_size,
            log2_min_luma_transform_block_size_minus2,
            log2_diff_max_min_luma_transform_block_size,
        })
    }
}
