use bytes::Bytes;
use std::time::Duration;

/// 90 kHz clock used by PTS/DTS.
pub const PTS_HZ: u64 = 90_000;

/// Decode and presentation timestamps in 90 kHz units, 33 bits wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DtsPts {
    pub dts: Option<u64>,
    pub pts: Option<u64>,
}

impl DtsPts {
    pub fn new(dts: Option<u64>, pts: Option<u64>) -> Self {
        Self { dts, pts }
    }
}

/// One elementary stream access unit extracted from a PES packet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EsPacket {
    /// Codec configuration in effect for this access unit. For AVC/HEVC the
    /// parameter sets in Annex-B form, for AAC an AudioSpecificConfig, for
    /// MPEG audio the 4-byte frame header.
    pub csd: Bytes,
    /// Access unit payload. AVC/HEVC NALUs carry 4-byte big-endian sizes.
    pub data: Bytes,
    pub dts: Option<u64>,
    pub pts: Option<u64>,
    pub is_sync_frame: bool,
    /// Index of this frame within its PES packet.
    pub sub_packet_num: u32,
    /// PMT stream_type of the originating elementary stream.
    pub stream_type: u8,
}

impl EsPacket {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_csd(mut self, csd: impl Into<Bytes>) -> Self {
        self.csd = csd.into();
        self
    }

    pub fn with_timestamps(mut self, dts_pts: DtsPts) -> Self {
        self.dts = dts_pts.dts;
        self.pts = dts_pts.pts;
        self
    }

    pub fn with_sync_flag(mut self, is_sync_frame: bool) -> Self {
        self.is_sync_frame = is_sync_frame;
        self
    }

    pub fn with_sub_packet_num(mut self, sub_packet_num: u32) -> Self {
        self.sub_packet_num = sub_packet_num;
        self
    }

    /// Presentation time, if a PTS is present.
    pub fn pts_time(&self) -> Option<Duration> {
        self.pts.map(ticks_to_duration)
    }

    /// Decode time; falls back to the PTS when no DTS was signalled.
    pub fn dts_time(&self) -> Option<Duration> {
        self.dts.or(self.pts).map(ticks_to_duration)
    }
}

fn ticks_to_duration(ticks: u64) -> Duration {
    Duration::from_nanos(ticks * 1_000_000_000 / PTS_HZ)
}
