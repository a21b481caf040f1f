use std::time::Duration;

// Constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const SYNC_BYTE: u8 = 0x47;
pub const PCR_HZ: u64 = 27_000_000;

// PIDs
pub const PID_PAT: u16 = 0x0000;
pub const PID_CAT: u16 = 0x0001;
pub const PID_SDT: u16 = 0x0011;
pub const PID_NULL: u16 = 0x1fff;
/// PIDs below this value are never elementary streams.
pub const FIRST_ELEMENTARY_PID: u16 = 32;

// Table IDs
pub const TABLE_ID_PAT: u8 = 0x00;
pub const TABLE_ID_CAT: u8 = 0x01;
pub const TABLE_ID_PMT: u8 = 0x02;
pub const TABLE_ID_TSDT: u8 = 0x03;
pub const TABLE_ID_SDT: u8 = 0x42;
pub const TABLE_ID_FORBIDDEN: u8 = 0xff;

// Elementary Stream Types
pub const STREAM_TYPE_MPEG1_AUDIO: u8 = 0x03;
pub const STREAM_TYPE_AAC: u8 = 0x0f;
pub const STREAM_TYPE_H264: u8 = 0x1b;
pub const STREAM_TYPE_H265: u8 = 0x24;

/// Returns true for PIDs 5..=15 and the null PID, which carry nothing the
/// demuxer can use.
pub fn is_reserved_pid(pid: u16) -> bool {
    (5..=15).contains(&pid) || pid == PID_NULL
}

/// Returns true for PIDs that carry sections without being announced in a
/// PAT or PMT: 0..=4 (PAT, CAT, TSDT, IPMP) and 16..=31 (DVB/ATSC tables).
pub fn is_implicit_section_pid(pid: u16) -> bool {
    pid <= 4 || (16..=31).contains(&pid)
}

/// Elementary stream formats the extractors understand, keyed by PMT
/// stream_type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementaryStreamKind {
    Unknown,
    MPEG1Audio,
    AACADTS,
    AVC,
    HEVC,
}

impl ElementaryStreamKind {
    pub fn from_stream_type(stream_type: u8) -> Self {
        match stream_type {
            STREAM_TYPE_MPEG1_AUDIO => ElementaryStreamKind::MPEG1Audio,
            STREAM_TYPE_AAC => ElementaryStreamKind::AACADTS,
            STREAM_TYPE_H264 => ElementaryStreamKind::AVC,
            STREAM_TYPE_H265 => ElementaryStreamKind::HEVC,
            _ => ElementaryStreamKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdaptationField {
    /// adaptation_field_length, the length byte itself excluded.
    pub length: usize,
    pub discontinuity: bool,
    pub random_access: bool,
    pub es_priority: bool,
    /// Program clock reference in 27 MHz units (base * 300 + extension).
    pub pcr: Option<u64>,
    pub opcr: Option<u64>,
    pub splice_countdown: Option<i8>,
    pub private_data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TSHeader {
    pub sync_byte: u8, // Always 0x47
    pub transport_error: bool,
    pub payload_unit_start: bool,
    pub transport_priority: bool,
    pub pid: u16,
    pub scrambling_control: u8,
    pub adaptation_field_exists: bool,
    pub contains_payload: bool,
    pub continuity_counter: u8,
}

impl Default for TSHeader {
    fn default() -> Self {
        Self {
            sync_byte: SYNC_BYTE,
            transport_error: false,
            payload_unit_start: false,
            transport_priority: false,
            pid: 0,
            scrambling_control: 0,
            adaptation_field_exists: false,
            contains_payload: true,
            continuity_counter: 0,
        }
    }
}

impl TSHeader {
    /// The 2-bit adaptation_field_control value.
    pub fn adaptation_field_control(&self) -> u8 {
        (self.adaptation_field_exists as u8) << 1 | self.contains_payload as u8
    }

    /// Packets with adaptation_field_control '00' are to be discarded.
    pub fn is_discardable(&self) -> bool {
        self.adaptation_field_control() == 0
    }

    pub fn is_scrambled(&self) -> bool {
        self.scrambling_control != 0
    }

    pub fn to_bytes(&self) -> [u8; TS_HEADER_SIZE] {
        let mut b1 = ((self.pid >> 8) & 0x1f) as u8;
        if self.transport_error {
            b1 |= 0x80;
        }
        if self.payload_unit_start {
            b1 |= 0x40;
        }
        if self.transport_priority {
            b1 |= 0x20;
        }

        let mut b3 = (self.scrambling_control & 0x03) << 6;
        if self.adaptation_field_exists {
            b3 |= 0x20;
        }
        if self.contains_payload {
            b3 |= 0x10;
        }
        b3 |= self.continuity_counter & 0x0f;

        [self.sync_byte, b1, (self.pid & 0xff) as u8, b3]
    }
}

/// Converts a 27 MHz program clock reference to wall time.
pub fn pcr_to_time(pcr: u64) -> Duration {
    Duration::from_nanos((pcr as u128 * 1_000_000_000 / PCR_HZ as u128) as u64)
}
