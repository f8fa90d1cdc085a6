//! H.265 Picture Parameter Set, ITU-T H.265 clause 7.3.2.3 (prefix fields only
//! — this core only needs `pps_id`/`sps_id` association and the handful of
//! header flags exercised by the reference parser's own test fixture).

use crate::RbspReader;

#[derive(Debug, Clone, Default)]
pub struct PictureParameterSet {
    pub pps_id: u32,
    pub sps_id: u32,
    pub dependent_slice_segments_enabled_flag: bool,
    pub output_flag_present_flag: bool,
    pub num_extra_slice_header_bits: u8,
    pub sign_data_hiding_enabled_flag: bool,
    pub cabac_init_present_flag: bool,
    pub num_ref_idx_l0_default_active_minus1: u32,
    pub num_ref_idx_l1_default_active_minus1: u32,
}

impl PictureParameterSet {
    pub fn decode(raw_rbsp: &[u8]) -> Option<Self> {
        let mut r = RbspReader::new(raw_rbsp);

        let pps_id = r.get_ue();
        let sps_id = r.get_ue();
        let dependent_slice_segments_enabled_flag = r.get(1) == 1;
        let output_flag_present_flag = r.get(1) == 1;
        let num_extra_slice_header_bits = r.get(3) as u8;
        let sign_data_hiding_enabled_flag = r.get(1) == 1;
        let cabac_init_present_flag = r.get(1) == 1;
        let num_ref_idx_l0_default_active_minus1 = r.get_ue();
        let num_ref_idx_l1_default_active_minus1 = r.get_ue();

        if r.error() {
            return None;
        }

        Some(PictureParameterSet {
            pps_id,
            sps_id,
            dependent_slice_segments_enabled_flag,
            output_flag_present_flag,
            num_extra_slice_header_bits,
            sign_data_hiding_enabled_flag,
            cabac_init_present_flag,
            num_ref_idx_l0_default_active_minus1,
            num_ref_idx_l1_default_active_minus1,
        })
    }
}
