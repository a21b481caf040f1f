//! MPEG-1/2/2.5 audio frame header decoding (ISO/IEC 11172-3, 13818-3).
//!
//! All functions take the 32-bit big-endian frame header. Reserved field
//! values yield `None`.

/// Bits that must stay constant between frames of one stream:
/// sync, version, layer and sampling rate index.
pub const HEADER_SYNC_MASK: u32 = 0xfffe0c00;

/// Bytes in a frame header.
pub const HEADER_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    V1,
    V2,
    V2_5,
}

impl MpegVersion {
    /// 1 for MPEG-1, 2 for MPEG-2 and 2.5 (reported as 3).
    pub fn number(&self) -> u32 {
        match self {
            MpegVersion::V1 => 1,
            MpegVersion::V2 => 2,
            MpegVersion::V2_5 => 3,
        }
    }
}

const BITRATES_KBPS: [[[u16; 15]; 3]; 2] = [
    // MPEG-1: layer I, II, III
    [
        [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448],
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384],
        [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320],
    ],
    // MPEG-2/2.5: layer I, II, III
    [
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160],
    ],
];

const SAMPLING_RATES: [[u32; 3]; 3] = [
    [44100, 48000, 32000],
    [22050, 24000, 16000],
    [11025, 12000, 8000],
];

/// Returns true when the 11-bit frame sync is present.
pub fn has_sync(header: u32) -> bool {
    header & 0xffe00000 == 0xffe00000
}

pub fn version(header: u32) -> Option<MpegVersion> {
    match (header >> 19) & 3 {
        0 => Some(MpegVersion::V2_5),
        2 => Some(MpegVersion::V2),
        3 => Some(MpegVersion::V1),
        _ => None,
    }
}

/// Layer 1, 2 or 3.
pub fn layer(header: u32) -> Option<u32> {
    match (header >> 17) & 3 {
        0 => None,
        bits => Some(4 - bits),
    }
}

pub fn bitrate_index(header: u32) -> u32 {
    (header >> 12) & 15
}

pub fn sampling_rate_index(header: u32) -> u32 {
    (header >> 10) & 3
}

pub fn has_padding(header: u32) -> bool {
    (header >> 9) & 1 == 1
}

/// Bitrate in bits per second. Free format (index 0) reports 0.
pub fn bitrate(header: u32) -> Option<u32> {
    let version = version(header)?;
    let layer = layer(header)?;
    let index = bitrate_index(header);
    if index == 15 {
        return None;
    }
    let row = if version == MpegVersion::V1 { 0 } else { 1 };
    Some(BITRATES_KBPS[row][layer as usize - 1][index as usize] as u32 * 1000)
}

pub fn sampling_rate(header: u32) -> Option<u32> {
    let row = match version(header)? {
        MpegVersion::V1 => 0,
        MpegVersion::V2 => 1,
        MpegVersion::V2_5 => 2,
    };
    SAMPLING_RATES[row].get(sampling_rate_index(header) as usize).copied()
}

/// 1 for single channel mode, 2 otherwise.
pub fn channel_count(header: u32) -> u32 {
    if (header >> 6) & 3 == 3 {
        1
    } else {
        2
    }
}

pub fn samples_per_frame(header: u32) -> Option<u32> {
    let version = version(header)?;
    match layer(header)? {
        1 => Some(384),
        2 => Some(1152),
        _ if version == MpegVersion::V1 => Some(1152),
        _ => Some(576),
    }
}

/// Size of the whole frame in bytes, header included. `None` for reserved
/// fields and for free-format streams whose size is not signalled.
pub fn frame_size(header: u32) -> Option<usize> {
    let version = version(header)?;
    let layer = layer(header)?;
    let bitrate = bitrate(header)?;
    let sampling_rate = sampling_rate(header)?;
    if bitrate == 0 {
        return None;
    }
    let padding = has_padding(header) as u32;
    let size = match layer {
        1 => (12 * bitrate / sampling_rate + padding) * 4,
        3 if version != MpegVersion::V1 => 72 * bitrate / sampling_rate + padding,
        _ => 144 * bitrate / sampling_rate + padding,
    };
    Some(size as usize)
}

/// Returns true for a header the TS extractor accepts: sync present, MPEG-1
/// or MPEG-2 (2.5 is rejected), and no reserved layer, bitrate or rate index.
pub fn is_supported_header(header: u32) -> bool {
    has_sync(header)
        && matches!(version(header), Some(MpegVersion::V1 | MpegVersion::V2))
        && layer(header).is_some()
        && bitrate_index(header) != 15
        && sampling_rate_index(header) != 3
}
