use super::types::*;
use crate::codec::annexb::remove_emulation_prevention;
use crate::error::{DemuxError, Result};
use crate::utils::bits::BitReader;

fn has_chroma_info(profile_idc: u8) -> bool {
    matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135
    )
}

fn skip_scaling_list(reader: &mut BitReader, size: usize) -> Result<()> {
    let mut last_scale = 8i32;
    let mut next_scale = 8i32;
    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = reader.read_signed_golomb()?;
            next_scale = (last_scale + delta_scale + 256) % 256;
        }
        last_scale = if next_scale == 0 { last_scale } else { next_scale };
    }
    Ok(())
}

/// Parses a sequence parameter set NAL unit (header byte included, emulation
/// prevention bytes still present) through the VUI timing info.
pub fn parse_sps(nalu: &[u8]) -> Result<SequenceParameterSet> {
    match nalu.first() {
        Some(&header) if nal_unit_type(header) == NAL_SPS => {}
        _ => return Err(DemuxError::Codec("not an H.264 SPS NAL unit".into())),
    }
    let rbsp = remove_emulation_prevention(&nalu[1..]);
    let mut reader = BitReader::new(&rbsp);
    let mut sps = SequenceParameterSet {
        profile_idc: reader.read_bits(8)? as u8,
        constraint_flags: reader.read_bits(8)? as u8,
        level_idc: reader.read_bits(8)? as u8,
        seq_parameter_set_id: reader.read_golomb()?,
        chroma_format_idc: 1,
        ..Default::default()
    };
    log::trace!(
        "H.264 SPS profile {} level {}",
        sps.profile_idc,
        sps.level_idc
    );

    if has_chroma_info(sps.profile_idc) {
        sps.chroma_format_idc = reader.read_golomb()?;
        if sps.chroma_format_idc == 3 {
            sps.separate_colour_plane_flag = reader.read_bit()?;
        }
        sps.bit_depth_luma_minus8 = reader.read_golomb()?;
        sps.bit_depth_chroma_minus8 = reader.read_golomb()?;
        let _qpprime_y_zero_transform_bypass_flag = reader.read_bit()?;
        if reader.read_bit()? {
            let count = if sps.chroma_format_idc != 3 { 8 } else { 12 };
            for i in 0..count {
                if reader.read_bit()? {
                    skip_scaling_list(&mut reader, if i < 6 { 16 } else { 64 })?;
                }
            }
        }
    }

    sps.log2_max_frame_num_minus4 = reader.read_golomb()?;
    sps.pic_order_cnt_type = reader.read_golomb()?;
    match sps.pic_order_cnt_type {
        0 => sps.log2_max_pic_order_cnt_lsb_minus4 = reader.read_golomb()?,
        1 => {
            let _delta_pic_order_always_zero_flag = reader.read_bit()?;
            reader.read_signed_golomb()?; // offset_for_non_ref_pic
            reader.read_signed_golomb()?; // offset_for_top_to_bottom_field
            let cycle = reader.read_golomb()?;
            for _ in 0..cycle {
                reader.read_signed_golomb()?;
            }
        }
        _ => {}
    }

    sps.max_num_ref_frames = reader.read_golomb()?;
    let _gaps_in_frame_num_value_allowed_flag = reader.read_bit()?;
    sps.pic_width_in_mbs_minus1 = reader.read_golomb()?;
    sps.pic_height_in_map_units_minus1 = reader.read_golomb()?;
    sps.frame_mbs_only_flag = reader.read_bit()?;
    if !sps.frame_mbs_only_flag {
        sps.mb_adaptive_frame_field_flag = reader.read_bit()?;
    }
    let _direct_8x8_inference_flag = reader.read_bit()?;
    if reader.read_bit()? {
        sps.frame_crop_left_offset = reader.read_golomb()?;
        sps.frame_crop_right_offset = reader.read_golomb()?;
        sps.frame_crop_top_offset = reader.read_golomb()?;
        sps.frame_crop_bottom_offset = reader.read_golomb()?;
    }

    // Some encoders stop right after the cropping window.
    if reader.remaining_bits() > 0 && reader.read_bit()? {
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
        let _overscan_appropriate_flag = reader.read_bit()?;
    }
    if reader.read_bit()? {
        // video_format, video_full_range_flag
        reader.skip_bits(4)?;
        if reader.read_bit()? {
            // colour_primaries, transfer_characteristics, matrix_coefficients
            reader.skip_bits(24)?;
        }
    }
    if reader.read_bit()? {
        reader.read_golomb()?; // chroma_sample_loc_type_top_field
        reader.read_golomb()?; // chroma_sample_loc_type_bottom_field
    }
    if reader.read_bit()? {
        sps.timing_info = Some(TimingInfo {
            num_units_in_tick: reader.read_bits(32)?,
            time_scale: reader.read_bits(32)?,
            fixed_frame_rate_flag: reader.read_bit()?,
        });
    }
    Ok(())
}
