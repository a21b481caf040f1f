use super::types::*;
use crate::codec::annexb::remove_emulation_prevention;
use crate::codec::h264::TimingInfo;
use crate::error::{DemuxError, Result};
use crate::utils::bits::BitReader;

const MAX_SHORT_TERM_REF_PIC_SETS: u32 = 64;
const MAX_DELTA_POCS: u32 = 16;

/// Reads the general profile, tier and level: 88 bits of profile data
/// followed by general_level_idc.
pub fn parse_general_profile_tier_level(reader: &mut BitReader) -> Result<ProfileTierLevel> {
    Ok(ProfileTierLevel {
        general_profile_space: reader.read_bits(2)? as u8,
        general_tier_flag: reader.read_bit()?,
        general_profile_idc: reader.read_bits(5)? as u8,
        general_profile_compatibility_flags: reader.read_bits(32)?,
        general_constraint_indicator_flags: reader.read_bits64(48)?,
        general_level_idc: reader.read_bits(8)? as u8,
    })
}

/// profile_tier_level(1, max_sub_layers_minus1); sub-layer data is skipped.
pub fn parse_profile_tier_level(
    reader: &mut BitReader,
    max_sub_layers_minus1: u8,
) -> Result<ProfileTierLevel> {
    let ptl = parse_general_profile_tier_level(reader)?;

    let mut sub_layer_flags = Vec::with_capacity(max_sub_layers_minus1 as usize);
    for _ in 0..max_sub_layers_minus1 {
        let profile_present = reader.read_bit()?;
        let level_present = reader.read_bit()?;
        sub_layer_flags.push((profile_present, level_present));
    }
    if max_sub_layers_minus1 > 0 {
        // reserved_zero_2bits up to eight sub-layers
        reader.skip_bits(2 * (8 - max_sub_layers_minus1 as u32))?;
    }
    for (profile_present, level_present) in sub_layer_flags {
        if profile_present {
            reader.skip_bits(88)?;
        }
        if level_present {
            reader.skip_bits(8)?;
        }
    }
    Ok(ptl)
}

fn skip_scaling_list_data(reader: &mut BitReader) -> Result<()> {
    for size_id in 0..4u32 {
        let mut matrix_id = 0;
        while matrix_id < 6 {
            if !reader.read_bit()? {
                reader.read_golomb()?; // scaling_list_pred_matrix_id_delta
            } else {
                let coef_num = 64.min(1u32 << (4 + (size_id << 1)));
                if size_id > 1 {
                    reader.read_signed_golomb()?; // dc coefficient
                }
                for _ in 0..coef_num {
                    reader.read_signed_golomb()?;
                }
            }
            matrix_id += if size_id == 3 { 3 } else { 1 };
        }
    }
    Ok(())
}

fn skip_short_term_ref_pic_set(
    reader: &mut BitReader,
    idx: usize,
    num_delta_pocs: &mut [u32],
) -> Result<()> {
    let inter_ref_pic_set_prediction = idx != 0 && reader.read_bit()?;
    if inter_ref_pic_set_prediction {
        // delta_idx_minus1 is only present in slice headers
        let _delta_rps_sign = reader.read_bit()?;
        let _abs_delta_rps_minus1 = reader.read_golomb()?;
        let mut count = 0;
        for _ in 0..=num_delta_pocs[idx - 1] {
            let used_by_curr_pic = reader.read_bit()?;
            let use_delta = used_by_curr_pic || reader.read_bit()?;
            if use_delta {
                count += 1;
            }
        }
        num_delta_pocs[idx] = count;
    } else {
        let num_negative = reader.read_golomb()?;
        let num_positive = reader.read_golomb()?;
        if num_negative > MAX_DELTA_POCS || num_positive > MAX_DELTA_POCS {
            return Err(DemuxError::Codec("short term ref pic set too large".into()));
        }
        for _ in 0..num_negative + num_positive {
            reader.read_golomb()?; // delta_poc_minus1
            reader.read_bit()?; // used_by_curr_pic_flag
        }
        num_delta_pocs[idx] = num_negative + num_positive;
    }
    Ok(())
}

/// Parses a sequence parameter set NAL unit (two byte header included,
/// emulation prevention bytes still present) through the VUI timing info.
pub fn parse_sps(nalu: &[u8]) -> Result<SequenceParameterSet> {
    match nalu.first() {
        Some(&header) if nalu.len() > 2 && nal_unit_type(header) == NAL_SPS => {}
        _ => return Err(DemuxError::Codec("not an H.265 SPS NAL unit".into())),
    }
    let rbsp = remove_emulation_prevention(&nalu[2..]);
    let mut reader = BitReader::new(&rbsp);

    let mut sps = SequenceParameterSet {
        sps_video_parameter_set_id: reader.read_bits(4)? as u8,
        sps_max_sub_layers_minus1: reader.read_bits(3)? as u8,
        ..Default::default()
    };
    let _temporal_id_nesting = reader.read_bit()?;
    sps.profile_tier_level = parse_profile_tier_level(&mut reader, sps.sps_max_sub_layers_minus1)?;
    sps.sps_seq_parameter_set_id = reader.read_golomb()?;
    sps.chroma_format_idc = reader.read_golomb()?;
    if sps.chroma_format_idc == 3 {
        sps.separate_colour_plane_flag = reader.read_bit()?;
    }
    sps.pic_width_in_luma_samples = reader.read_golomb()?;
    sps.pic_height_in_luma_samples = reader.read_golomb()?;
    if reader.read_bit()? {
        sps.conf_win_left_offset = reader.read_golomb()?;
        sps.conf_win_right_offset = reader.read_golomb()?;
        sps.conf_win_top_offset = reader.read_golomb()?;
        sps.conf_win_bottom_offset = reader.read_golomb()?;
    }
    sps.bit_depth_luma_minus8 = reader.read_golomb()?;
    sps.bit_depth_chroma_minus8 = reader.read_golomb()?;
    sps.log2_max_pic_order_cnt_lsb_minus4 = reader.read_golomb()?;
    log::trace!(
        "H.265 SPS {}x{} profile {} level {}",
        sps.pic_width_in_luma_samples,
        sps.pic_height_in_luma_samples,
        sps.profile_tier_level.general_profile_idc,
        sps.profile_tier_level.general_level_idc
    );

    let sub_layer_ordering_info_present = reader.read_bit()?;
    let first = if sub_layer_ordering_info_present {
        0
    } else {
        sps.sps_max_sub_layers_minus1
    };
    for _ in first..=sps.sps_max_sub_layers_minus1 {
        reader.read_golomb()?; // sps_max_dec_pic_buffering_minus1
        reader.read_golomb()?; // sps_max_num_reorder_pics
        reader.read_golomb()?; // sps_max_latency_increase_plus1
    }

    reader.read_golomb()?; // log2_min_luma_coding_block_size_minus3
    reader.read_golomb()?; // log2_diff_max_min_luma_coding_block_size
    reader.read_golomb()?; // log2_min_luma_transform_block_size_minus2
    reader.read_golomb()?; // log2_diff_max_min_luma_transform_block_size
    reader.read_golomb()?; // max_transform_hierarchy_depth_inter
    reader.read_golomb()?; // max_transform_hierarchy_depth_intra
    if reader.read_bit()? && reader.read_bit()? {
        skip_scaling_list_data(&mut reader)?;
    }
    let _amp_enabled = reader.read_bit()?;
    let _sample_adaptive_offset_enabled = reader.read_bit()?;
    if reader.read_bit()? {
        // pcm sample bit depths
        reader.skip_bits(8)?;
        reader.read_golomb()?;
        reader.read_golomb()?;
        let _pcm_loop_filter_disabled = reader.read_bit()?;
    }

    let num_short_term_ref_pic_sets = reader.read_golomb()?;
    if num_short_term_ref_pic_sets > MAX_SHORT_TERM_REF_PIC_SETS {
        return Err(DemuxError::Codec(format!(
            "num_short_term_ref_pic_sets {} out of range",
            num_short_term_ref_pic_sets
        )));
    }
    let mut num_delta_pocs = vec![0u32; num_short_term_ref_pic_sets as usize];
    for idx in 0..num_short_term_ref_pic_sets as usize {
        skip_short_term_ref_pic_set(&mut reader, idx, &mut num_delta_pocs)?;
    }

    if reader.read_bit()? {
        let num_long_term_ref_pics = reader.read_golomb()?;
        let lsb_bits = sps.log2_max_pic_order_cnt_lsb_minus4 + 4;
        for _ in 0..num_long_term_ref_pics {
            reader.skip_bits(lsb_bits + 1)?;
        }
    }
    let _temporal_mvp_enabled = reader.read_bit()?;
    let _strong_intra_smoothing_enabled = reader.read_bit()?;

    if reader.read_bit()? {
        parse_vui(&mut reader, &mut sps)?;
    }
    Ok(sps)
}

fn parse_vui(reader: &mut BitReader, sps: &mut SequenceParameterSet) -> Result<()> {
    if reader.read_bit()? {
        sps.aspect_ratio_idc = reader.read_bits(8)? as u8;
        if sps.aspect_ratio_idc == 255 {
            sps.sar_width = reader.read_bits(16)? as u16;
            sps.sar_height = reader.read_bits(16)? as u16;
        }
    }
    if reader.read_bit()? {
        let _overscan_appropriate = reader.read_bit()?;
    }
    if reader.read_bit()? {
        reader.skip_bits(4)?;
        if reader.read_bit()? {
            reader.skip_bits(24)?;
        }
    }
    if reader.read_bit()? {
        reader.read_golomb()?;
        reader.read_golomb()?;
    }
    // neutral_chroma_indication, field_seq, frame_field_info_present
    reader.skip_bits(3)?;
    if reader.read_bit()? {
        for _ in 0..4 {
            reader.read_golomb()?; // default display window offsets
        }
    }
    if reader.read_bit()? {
        sps.timing_info = Some(TimingInfo {
            num_units_in_tick: reader.read_bits(32)?,
            time_scale: reader.read_bits(32)?,
            fixed_frame_rate_flag: false,
        });
    }
    Ok(())
}
