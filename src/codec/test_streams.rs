//! Synthetic parameter sets shared by codec and demuxer tests.

use crate::utils::BitWriter;

pub(crate) fn put_ue(writer: &mut BitWriter, value: u32) {
    let code = value as u64 + 1;
    let len = 64 - code.leading_zeros();
    writer.put_bits64(0, len - 1);
    writer.put_bits64(code, len);
}

/// Inserts emulation prevention bytes the way an encoder would.
pub(crate) fn escape_rbsp(nalu: Vec<u8>, header_len: usize) -> Vec<u8> {
    let mut out = nalu[..header_len].to_vec();
    let mut zeros = 0;
    for &byte in &nalu[header_len..] {
        if zeros >= 2 && byte <= 3 {
            out.push(3);
            zeros = 0;
        }
        zeros = if byte == 0 { zeros + 1 } else { 0 };
        out.push(byte);
    }
    out
}

/// H.264 High profile 1080p SPS NAL unit with cropping and 29.97 fps VUI timing.
pub(crate) fn h264_sps_1080p() -> Vec<u8> {
    let mut w = BitWriter::new();
    w.put_bits(0x67, 8);
    w.put_bits(100, 8); // profile_idc
    w.put_bits(0, 8); // constraint flags
    w.put_bits(40, 8); // level_idc
    put_ue(&mut w, 0); // sps id
    put_ue(&mut w, 1); // chroma_format_idc
    put_ue(&mut w, 0); // bit_depth_luma_minus8
    put_ue(&mut w, 0); // bit_depth_chroma_minus8
    w.put_bits(0, 1); // qpprime
    w.put_bits(0, 1); // seq_scaling_matrix_present_flag
    put_ue(&mut w, 0); // log2_max_frame_num_minus4
    put_ue(&mut w, 0); // pic_order_cnt_type
    put_ue(&mut w, 2); // log2_max_pic_order_cnt_lsb_minus4
    put_ue(&mut w, 4); // max_num_ref_frames
    w.put_bits(0, 1); // gaps
    put_ue(&mut w, 119); // width in mbs - 1
    put_ue(&mut w, 67); // height in map units - 1
    w.put_bits(1, 1); // frame_mbs_only_flag
    w.put_bits(1, 1); // direct_8x8_inference_flag
    w.put_bits(1, 1); // frame_cropping_flag
    put_ue(&mut w, 0);
    put_ue(&mut w, 0);
    put_ue(&mut w, 0);
    put_ue(&mut w, 4);
    w.put_bits(1, 1); // vui_parameters_present_flag
    w.put_bits(1, 1); // aspect_ratio_info_present_flag
    w.put_bits(1, 8); // 1:1
    w.put_bits(0, 1); // overscan
    w.put_bits(0, 1); // video signal type
    w.put_bits(0, 1); // chroma loc
    w.put_bits(1, 1); // timing_info_present_flag
    w.put_bits(1001, 32);
    w.put_bits(60000, 32);
    w.put_bits(1, 1);
    w.put_bits(1, 1); // rbsp stop bit
    w.align_to_bytes(0);
    escape_rbsp(w.finish().to_vec(), 1)
}

/// H.265 Main profile 1080p SPS NAL unit, level 3.1, 25 fps VUI timing.
pub(crate) fn h265_sps_1080p() -> Vec<u8> {
    let mut w = BitWriter::new();
    w.put_bits(0x4201, 16); // nal header, type 33
    w.put_bits(0, 4); // vps id
    w.put_bits(0, 3); // max_sub_layers_minus1
    w.put_bits(1, 1); // temporal_id_nesting
    w.put_bits(0, 2); // profile space
    w.put_bits(0, 1); // tier
    w.put_bits(1, 5); // Main
    w.put_bits(0x6000_0000, 32); // compatible with 1 and 2
    w.put_bits(0b1001, 4); // progressive, frame only
    w.put_bits64(0, 44);
    w.put_bits(93, 8); // level 3.1
    put_ue(&mut w, 0); // sps id
    put_ue(&mut w, 1); // chroma_format_idc
    put_ue(&mut w, 1920);
    put_ue(&mut w, 1088);
    w.put_bits(1, 1); // conformance_window_flag
    put_ue(&mut w, 0);
    put_ue(&mut w, 0);
    put_ue(&mut w, 0);
    put_ue(&mut w, 4);
    put_ue(&mut w, 0); // bit_depth_luma_minus8
    put_ue(&mut w, 0); // bit_depth_chroma_minus8
    put_ue(&mut w, 4); // log2_max_pic_order_cnt_lsb_minus4
    w.put_bits(1, 1); // sub_layer_ordering_info_present
    put_ue(&mut w, 4);
    put_ue(&mut w, 0);
    put_ue(&mut w, 0);
    put_ue(&mut w, 0); // log2_min_luma_coding_block_size_minus3
    put_ue(&mut w, 3);
    put_ue(&mut w, 0);
    put_ue(&mut w, 3);
    put_ue(&mut w, 0);
    put_ue(&mut w, 0);
    w.put_bits(0, 1); // scaling_list_enabled
    w.put_bits(1, 1); // amp
    w.put_bits(1, 1); // sao
    w.put_bits(0, 1); // pcm
    put_ue(&mut w, 2); // num_short_term_ref_pic_sets
    put_ue(&mut w, 1); // set 0: one negative picture
    put_ue(&mut w, 0);
    put_ue(&mut w, 0);
    w.put_bits(1, 1);
    w.put_bits(1, 1); // set 1: predicted from set 0
    w.put_bits(0, 1);
    put_ue(&mut w, 0);
    w.put_bits(1, 1);
    w.put_bits(1, 1);
    w.put_bits(0, 1); // long_term_ref_pics_present
    w.put_bits(1, 1); // temporal mvp
    w.put_bits(1, 1); // strong intra smoothing
    w.put_bits(1, 1); // vui_parameters_present
    w.put_bits(1, 1); // aspect_ratio_info_present
    w.put_bits(1, 8);
    w.put_bits(0, 1); // overscan
    w.put_bits(0, 1); // video signal type
    w.put_bits(0, 1); // chroma loc
    w.put_bits(0, 3);
    w.put_bits(0, 1); // default display window
    w.put_bits(1, 1); // vui_timing_info_present
    w.put_bits(1, 32);
    w.put_bits(25, 32);
    w.put_bits(0, 1);
    w.put_bits(1, 1); // rbsp stop bit
    w.align_to_bytes(0);
    escape_rbsp(w.finish().to_vec(), 2)
}
