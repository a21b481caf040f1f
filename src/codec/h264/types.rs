use crate::av::{AspectRatio, Crop, FrameRate};

pub const NAL_SLICE_IDR: u8 = 5;
pub const NAL_SPS: u8 = 7;
pub const NAL_PPS: u8 = 8;
pub const NAL_AUD: u8 = 9;
pub const NAL_FILLER: u8 = 12;

/// nal_unit_type from the first header byte.
pub fn nal_unit_type(header: u8) -> u8 {
    header & 0x1F
}

/// Sample aspect ratios for aspect_ratio_idc 1..=16 (Table E-1).
const PIXEL_ASPECT_RATIOS: [(u32, u32); 16] = [
    (1, 1),
    (12, 11),
    (10, 11),
    (16, 11),
    (40, 33),
    (24, 11),
    (20, 11),
    (32, 11),
    (80, 33),
    (18, 11),
    (15, 11),
    (64, 33),
    (160, 99),
    (4, 3),
    (3, 2),
    (2, 1),
];

/// Aspect ratio for a VUI aspect_ratio_idc; 255 means explicit SAR fields.
pub fn aspect_ratio_from_idc(idc: u8, sar_width: u16, sar_height: u16) -> AspectRatio {
    let (width, height) = match idc {
        1..=16 => PIXEL_ASPECT_RATIOS[idc as usize - 1],
        255 if sar_width != 0 && sar_height != 0 => (sar_width as u32, sar_height as u32),
        _ => (1, 1),
    };
    AspectRatio { width, height }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingInfo {
    pub num_units_in_tick: u32,
    pub time_scale: u32,
    pub fixed_frame_rate_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SequenceParameterSet {
    pub profile_idc: u8,
    /// constraint_set0..5 flags plus the two reserved bits, as one byte.
    pub constraint_flags: u8,
    pub level_idc: u8,
    pub seq_parameter_set_id: u32,
    pub chroma_format_idc: u32,
    pub separate_colour_plane_flag: bool,
    pub bit_depth_luma_minus8: u32,
    pub bit_depth_chroma_minus8: u32,
    pub log2_max_frame_num_minus4: u32,
    pub pic_order_cnt_type: u32,
    pub log2_max_pic_order_cnt_lsb_minus4: u32,
    pub max_num_ref_frames: u32,
    pub pic_width_in_mbs_minus1: u32,
    pub pic_height_in_map_units_minus1: u32,
    pub frame_mbs_only_flag: bool,
    pub mb_adaptive_frame_field_flag: bool,
    pub frame_crop_left_offset: u32,
    pub frame_crop_right_offset: u32,
    pub frame_crop_top_offset: u32,
    pub frame_crop_bottom_offset: u32,
    pub aspect_ratio_idc: u8,
    pub sar_width: u16,
    pub sar_height: u16,
    pub timing_info: Option<TimingInfo>,
}

impl SequenceParameterSet {
    fn chroma_array_type(&self) -> u32 {
        if self.separate_colour_plane_flag {
            0
        } else {
            self.chroma_format_idc
        }
    }

    fn crop_units(&self) -> (u32, u32) {
        let field_factor = 2 - self.frame_mbs_only_flag as u32;
        match self.chroma_array_type() {
            1 => (2, 2 * field_factor),
            2 => (2, field_factor),
            _ => (1, field_factor),
        }
    }

    /// Decoded picture width before cropping.
    pub fn coded_width(&self) -> u32 {
        (self.pic_width_in_mbs_minus1 + 1) * 16
    }

    /// Decoded picture height before cropping.
    pub fn coded_height(&self) -> u32 {
        (2 - self.frame_mbs_only_flag as u32) * (self.pic_height_in_map_units_minus1 + 1) * 16
    }

    /// Cropping window in luma samples.
    pub fn crop(&self) -> Crop {
        let (unit_x, unit_y) = self.crop_units();
        Crop {
            left: self.frame_crop_left_offset * unit_x,
            right: self.frame_crop_right_offset * unit_x,
            top: self.frame_crop_top_offset * unit_y,
            bottom: self.frame_crop_bottom_offset * unit_y,
        }
    }

    pub fn width(&self) -> u32 {
        let crop = self.crop();
        self.coded_width().saturating_sub(crop.left + crop.right)
    }

    pub fn height(&self) -> u32 {
        let crop = self.crop();
        self.coded_height().saturating_sub(crop.top + crop.bottom)
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        aspect_ratio_from_idc(self.aspect_ratio_idc, self.sar_width, self.sar_height)
    }

    /// Frame rate from VUI timing; one frame is two ticks.
    pub fn frame_rate(&self) -> Option<FrameRate> {
        let timing = self.timing_info?;
        if timing.num_units_in_tick == 0 || timing.time_scale == 0 {
            return None;
        }
        Some(FrameRate {
            numerator: timing.time_scale,
            denominator: timing.num_units_in_tick.saturating_mul(2),
        })
    }

    /// RFC 6381 codec string, e.g. `avc1.64001f`.
    pub fn rfc6381_codec(&self) -> String {
        format!(
            "avc1.{:02x}{:02x}{:02x}",
            self.profile_idc, self.constraint_flags, self.level_idc
        )
    }
}
