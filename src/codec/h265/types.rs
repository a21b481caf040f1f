use crate::av::{AspectRatio, Crop, FrameRate};
use crate::codec::h264::{aspect_ratio_from_idc, TimingInfo};

pub const NAL_BLA_W_LP: u8 = 16;
pub const NAL_CRA: u8 = 21;
pub const NAL_VPS: u8 = 32;
pub const NAL_SPS: u8 = 33;
pub const NAL_PPS: u8 = 34;
pub const NAL_AUD: u8 = 35;
pub const NAL_FILLER: u8 = 38;

/// nal_unit_type from the first of the two header bytes.
pub fn nal_unit_type(header: u8) -> u8 {
    (header >> 1) & 0x3F
}

/// BLA, IDR and CRA pictures (types 16..=21) start a decodable sequence.
pub fn is_irap(nal_type: u8) -> bool {
    (NAL_BLA_W_LP..=NAL_CRA).contains(&nal_type)
}

/// The general part of profile_tier_level(), also the head of the
/// HEVC video descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfileTierLevel {
    pub general_profile_space: u8,
    pub general_tier_flag: bool,
    pub general_profile_idc: u8,
    /// general_profile_compatibility_flag[0] is the most significant bit.
    pub general_profile_compatibility_flags: u32,
    /// progressive, interlaced, non_packed, frame_only and the 44 following
    /// bits: 48 bits, progressive_source_flag most significant.
    pub general_constraint_indicator_flags: u64,
    pub general_level_idc: u8,
}

impl ProfileTierLevel {
    /// RFC 6381 / ISO/IEC 14496-15 codec string, e.g. `hvc1.1.6.L93.B0`.
    pub fn rfc6381_codec(&self) -> String {
        let space = match self.general_profile_space {
            0 => "",
            1 => "A",
            2 => "B",
            _ => "C",
        };
        let mut codec = format!(
            "hvc1.{}{}.{:X}.{}{}",
            space,
            self.general_profile_idc,
            self.general_profile_compatibility_flags.reverse_bits(),
            if self.general_tier_flag { 'H' } else { 'L' },
            self.general_level_idc
        );
        let constraint_bytes = &self.general_constraint_indicator_flags.to_be_bytes()[2..];
        let used = constraint_bytes
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |last| last + 1);
        for byte in &constraint_bytes[..used] {
            codec.push_str(&format!(".{:X}", byte));
        }
        codec
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SequenceParameterSet {
    pub sps_video_parameter_set_id: u8,
    pub sps_max_sub_layers_minus1: u8,
    pub profile_tier_level: ProfileTierLevel,
    pub sps_seq_parameter_set_id: u32,
    pub chroma_format_idc: u32,
    pub separate_colour_plane_flag: bool,
    pub pic_width_in_luma_samples: u32,
    pub pic_height_in_luma_samples: u32,
    pub conf_win_left_offset: u32,
    pub conf_win_right_offset: u32,
    pub conf_win_top_offset: u32,
    pub conf_win_bottom_offset: u32,
    pub bit_depth_luma_minus8: u32,
    pub bit_depth_chroma_minus8: u32,
    pub log2_max_pic_order_cnt_lsb_minus4: u32,
    pub aspect_ratio_idc: u8,
    pub sar_width: u16,
    pub sar_height: u16,
    pub timing_info: Option<TimingInfo>,
}

impl SequenceParameterSet {
    fn sub_sampling(&self) -> (u32, u32) {
        if self.separate_colour_plane_flag {
            return (1, 1);
        }
        match self.chroma_format_idc {
            1 => (2, 2),
            2 => (2, 1),
            _ => (1, 1),
        }
    }

    /// Conformance window in luma samples.
    pub fn crop(&self) -> Crop {
        let (sub_width, sub_height) = self.sub_sampling();
        Crop {
            left: self.conf_win_left_offset * sub_width,
            right: self.conf_win_right_offset * sub_width,
            top: self.conf_win_top_offset * sub_height,
            bottom: self.conf_win_bottom_offset * sub_height,
        }
    }

    pub fn width(&self) -> u32 {
        let crop = self.crop();
        self.pic_width_in_luma_samples
            .saturating_sub(crop.left + crop.right)
    }

    pub fn height(&self) -> u32 {
        let crop = self.crop();
        self.pic_height_in_luma_samples
            .saturating_sub(crop.top + crop.bottom)
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        aspect_ratio_from_idc(self.aspect_ratio_idc, self.sar_width, self.sar_height)
    }

    /// Frame rate from VUI timing; one picture per tick.
    pub fn frame_rate(&self) -> Option<FrameRate> {
        let timing = self.timing_info?;
        if timing.num_units_in_tick == 0 || timing.time_scale == 0 {
            return None;
        }
        Some(FrameRate {
            numerator: timing.time_scale,
            denominator: timing.num_units_in_tick,
        })
    }

    pub fn rfc6381_codec(&self) -> String {
        self.profile_tier_level.rfc6381_codec()
    }
}
