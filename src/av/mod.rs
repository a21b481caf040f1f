//! Elementary stream description types shared by the codec parsers and the
//! transport stream demuxer.

use bytes::Bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecType {
    #[default]
    Unknown,
    H264,
    H265,
    AAC,
    MPEGAudio,
}

impl CodecType {
    /// Elementary stream kind carried by this codec.
    pub fn stream_type(&self) -> StreamType {
        match self {
            CodecType::H264 | CodecType::H265 => StreamType::Video,
            CodecType::AAC | CodecType::MPEGAudio => StreamType::Audio,
            CodecType::Unknown => StreamType::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamType {
    #[default]
    Unknown,
    Video,
    Audio,
}

/// Decoder-facing view of a stream description.
pub trait CodecData {
    fn codec_type(&self) -> CodecType;
    fn width(&self) -> Option<u32>;
    fn height(&self) -> Option<u32>;
    fn extra_data(&self) -> Option<&[u8]>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Crop {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// Sample aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
        }
    }
}

/// Frames per second as `numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

/// Everything known about one elementary stream: what the PMT announced and,
/// once an access unit carried it, what the codec configuration says.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamCodecInformation {
    pub stream_type: StreamType,
    pub codec: CodecType,
    pub mime_type: String,
    pub codec_4cc: u32,
    /// RFC 6381 `codecs` parameter, e.g. `avc1.64001f` or `mp4a.40.2`.
    pub codec_specifier_rfc6381: String,
    pub profile: u32,
    pub profile_level: u32,
    pub profile_space: u32,
    pub profile_tier: u32,
    pub profile_constraints: u64,
    pub profile_compatibility_flags: u32,
    pub resolution: Resolution,
    pub crop: Crop,
    pub aspect_ratio: AspectRatio,
    pub frame_rate: Option<FrameRate>,
    pub sampling_rate: u32,
    pub num_channels: u32,
    pub channel_configuration: u32,
    pub samples_per_block: u32,
    /// ISO 639-2 code from the PMT, lowercase.
    pub language: Option<String>,
    pub codec_specific_data: Bytes,
}

impl StreamCodecInformation {
    /// Empty description for `codec` with the stream kind filled in.
    pub fn for_codec(codec: CodecType) -> Self {
        Self {
            stream_type: codec.stream_type(),
            codec,
            ..Default::default()
        }
    }
}

impl CodecData for StreamCodecInformation {
    fn codec_type(&self) -> CodecType {
        self.codec
    }

    fn width(&self) -> Option<u32> {
        (self.stream_type == StreamType::Video && self.resolution.width > 0)
            .then_some(self.resolution.width)
    }

    fn height(&self) -> Option<u32> {
        (self.stream_type == StreamType::Video && self.resolution.height > 0)
            .then_some(self.resolution.height)
    }

    fn extra_data(&self) -> Option<&[u8]> {
        (!self.codec_specific_data.is_empty()).then_some(&self.codec_specific_data[..])
    }
}

/// Builds a big-endian four character code.
pub const fn make_4cc(code: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*code)
}

mod packet;
pub use packet::*;
