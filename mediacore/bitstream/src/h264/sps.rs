//! H.264 Sequence Parameter Set, ITU-T H.264 clause 7.3.2.1.1.
//!
//! Only the fields needed to recover frame dimensions and detect the
//! high-profile chroma/scaling-matrix extension are kept; everything else
//! is consumed (to keep the bit position correct for the fields that
//! matter) and discarded.

use crate::RbspReader;

/// `profile_idc` values whose SPS carries the chroma-format / bit-depth /
/// scaling-matrix extension (ITU-T H.264 Table, clause 7.3.2.1.1).
const HIGH_PROFILES_WITH_CHROMA_INFO: [u8; 14] = [
    100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134, 135, 183,
];

#[derive(Debug, Clone, Default)]
pub struct SeqParameterSet {
    pub profile_idc: u8,
    pub level_idc: u8,
    pub seq_parameter_set_id: u32,
    pub chroma_format_idc: u32,
    pub width: u32,
    pub height: u32,
}

fn skip_scaling_list(r: &mut RbspReader, size: usize) {
    let mut last_scale = 8i32;
    let mut next_scale = 8i32;
    for j in 0..size {
        if next_scale != 0 {
            let delta_scale = r.get_se();
            next_scale = (last_scale + delta_scale + 256) % 256;
            if j == 0 && next_scale == 0 {
                // useDefaultScalingMatrixFlag, nothing further to read.
            }
        }
        last_scale = if next_scale == 0 { last_scale } else { next_scale };
    }
}

impl SeqParameterSet {
    /// Decodes a SPS RBSP payload (1-byte NAL header already stripped).
    pub fn decode(raw_rbsp: &[u8]) -> Option<Self> {
        let mut r = RbspReader::new(raw_rbsp);

        let profile_idc = r.get(8) as u8;
        let _constraint_flags_and_reserved = r.get(8);
        let level_idc = r.get(8) as u8;
        let seq_parameter_set_id = r.get_ue();

        let mut chroma_format_idc = 1u32;
        if HIGH_PROFILES_WITH_CHROMA_INFO.contains(&profile_idc) {
            chroma_format_idc = r.get_ue();
            if chroma_format_idc == 3 {
                let _separate_colour_plane_flag = r.get(1);
            }
            let _bit_depth_luma_minus8 = r.get_ue();
            let _bit_depth_chroma_minus8 = r.get_ue();
            let _qpprime_y_zero_transform_bypass_flag = r.get(1);
            let seq_scaling_matrix_present_flag = r.get(1) == 1;
            if seq_scaling_matrix_present_flag {
                let count = if chroma_format_idc != 3 { 8 } else { 12 };
                for i in 0..count {
                    let present = r.get(1) == 1;
                    if present {
                        skip_scaling_list(&mut r, if i < 6 { 16 } else { 64 });
                    }
                }
            }
        }

        let _log2_max_frame_num_minus4 = r.get_ue();
        let pic_order_cnt_type = r.get_ue();
        if pic_order_cnt_type == 0 {
            let _log2_max_pic_order_cnt_lsb_minus4 = r.get_ue();
        } else if pic_order_cnt_type == 1 {
            let _delta_pic_order_always_zero_flag = r.get(1);
            let _offset_for_non_ref_pic = r.get_se();
            let _offset_for_top_to_bottom_field = r.get_se();
            let num_ref_frames_in_pic_order_cnt_cycle = r.get_ue();
            for _ in 0..num_ref_frames_in_pic_order_cnt_cycle {
                let _offset_for_ref_frame = r.get_se();
            }
        }

        let _max_num_ref_frames = r.get_ue();
        let _gaps_in_frame_num_value_allowed_flag = r.get(1);

        let pic_width_in_mbs_minus1 = r.get_ue();
        let pic_height_in_map_units_minus1 = r.get_ue();
        let frame_mbs_only_flag = r.get(1) == 1;
        if !frame_mbs_only_flag {
            let _mb_adaptive_frame_field_flag = r.get(1);
        }
        let _direct_8x8_inference_flag = r.get(1);

        let frame_cropping_flag = r.get(1) == 1;
        let (mut crop_left, mut crop_right, mut crop_top, mut crop_bottom) = (0u32, 0u32, 0u32, 0u32);
        if frame_cropping_flag {
            crop_left = r.get_ue();
            crop_right = r.get_ue();
            crop_top = r.get_ue();
            crop_bottom = r.get_ue();
        }

        if r.error() {
            return None;
        }

        let (sub_width_c, sub_height_c) = match chroma_format_idc {
            1 => (2u32, 2u32),
            2 => (2, 1),
            3 => (1, 1),
            _ => (1, 1),
        };
        let crop_unit_x = if chroma_format_idc == 0 { 1 } else { sub_width_c };
        let frame_mb_height_factor = if frame_mbs_only_flag { 1 } else { 2 };
        let crop_unit_y = if chroma_format_idc == 0 {
            frame_mb_height_factor
        } else {
            sub_height_c * frame_mb_height_factor as u32
        };

        let width = (pic_width_in_mbs_minus1 + 1) * 16 - (crop_left + crop_right) * crop_unit_x;
        let height = (2 - frame_mbs_only_flag as u32) * (pic_height_in_map_units_minus1 + 1) * 16
            - (crop_top + crop_bottom) * crop_unit_y;

        Some(SeqParameterSet {
            profile_idc,
            level_idc,
            seq_parameter_set_id,
            chroma_format_idc,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Baseline profile (profile_idc=66, no chroma-info extension),
    // pic_order_cnt_type=2 (no POC fields), 640x480, no cropping.
    const SAMPLE_SPS: [u8; 7] = [0x42, 0x00, 0x1e, 0xda, 0x02, 0x80, 0xf6];

    #[test]
    fn decodes_baseline_sps_dimensions() {
        let sps = SeqParameterSet::decode(&SAMPLE_SPS).expect("sample SPS should parse");
        assert_eq!(sps.profile_idc, 0x42);
        assert_eq!(sps.level_idc, 0x1e);
        assert_eq!(sps.chroma_format_idc, 1);
        assert_eq!(sps.seq_parameter_set_id, 0);
        assert_eq!(sps.width, 640);
        assert_eq!(sps.height, 480);
    }

    #[test]
    fn rejects_truncated_sps() {
        assert!(SeqParameterSet::decode(&[0x42]).is_none());
    }
}
