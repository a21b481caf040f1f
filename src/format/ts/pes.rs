use bytes::{BufMut, Bytes, BytesMut};

/// PES start code prefix, 0x000001.
pub const PES_START_CODE: u32 = 0x000001;
/// start code, stream_id and PES_packet_length.
pub const PES_FIXED_HEADER_SIZE: usize = 6;
/// PTS and DTS are 33-bit counters.
pub const TIMESTAMP_MASK: u64 = 0x1_ffff_ffff;

pub const STREAM_ID_PROGRAM_STREAM_MAP: u8 = 0xbc;
pub const STREAM_ID_PADDING: u8 = 0xbe;
pub const STREAM_ID_PRIVATE_STREAM_2: u8 = 0xbf;
pub const STREAM_ID_ECM: u8 = 0xf0;
pub const STREAM_ID_EMM: u8 = 0xf1;
pub const STREAM_ID_DSMCC: u8 = 0xf2;
pub const STREAM_ID_H222_1_TYPE_E: u8 = 0xf8;
pub const STREAM_ID_PROGRAM_STREAM_DIRECTORY: u8 = 0xff;

/// Outcome of turning a PES packet into elementary stream packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PesPacketResult {
    Ok,
    /// More bytes are needed; whatever remains is kept for the next packet.
    Truncated,
    Invalid,
    NotSupported,
}

/// A reassembled PES packet as handed out by the demuxer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PesData {
    pub pid: u16,
    /// PMT stream_type of the elementary stream.
    pub stream_type: u8,
    /// The whole PES packet, header included. `None` asks the parser to flush
    /// what it still holds for `pid`; only produced at end of stream.
    pub packet_data: Option<Bytes>,
    /// random_access_indicator of the transport packet that started this PES.
    pub random_access: bool,
    /// PCR carried by the transport packet that started this PES, 27 MHz.
    pub pcr: Option<u64>,
}

/// Video streams (stream_id 0xE0..=0xEF) may leave PES_packet_length at 0.
pub fn allows_unbounded_length(stream_id: u8) -> bool {
    (0xe0..=0xef).contains(&stream_id)
}

/// Stream ids whose PES packets carry no optional header and no elementary
/// stream data the extractors understand.
pub fn is_unsupported_stream_id(stream_id: u8) -> bool {
    matches!(
        stream_id,
        STREAM_ID_PROGRAM_STREAM_MAP
            | STREAM_ID_PADDING
            | STREAM_ID_PRIVATE_STREAM_2
            | STREAM_ID_ECM
            | STREAM_ID_EMM
            | STREAM_ID_DSMCC
            | STREAM_ID_H222_1_TYPE_E
            | STREAM_ID_PROGRAM_STREAM_DIRECTORY
    )
}

/// Returns true when `data` starts with the PES start code.
pub fn has_start_code(data: &[u8]) -> bool {
    data.len() >= 3 && data[..3] == [0x00, 0x00, 0x01]
}

/// Packetized Elementary Stream (PES) header structure
///
/// Contains the fixed part of the header plus the optional header fields
/// for stream ids that carry one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PESHeader {
    /// Stream identifier indicating content type (video/audio/etc.)
    pub stream_id: u8,
    /// Length of the PES packet after this field; 0 means unbounded
    pub packet_length: u16,
    /// Control field for scrambling mode
    pub scrambling_control: u8,
    /// Priority flag for the packet
    pub priority: bool,
    /// Data alignment indicator
    pub data_alignment: bool,
    /// Copyright indicator
    pub copyright: bool,
    /// Original/copy indicator
    pub original: bool,
    /// Flags indicating presence of PTS/DTS fields
    pub pts_dts_flags: u8,
    /// ESCR (Extended System Clock Reference) flag
    pub escr_flag: bool,
    /// Elementary Stream rate flag
    pub es_rate_flag: bool,
    /// DSM trick mode flag
    pub dsm_trick_mode_flag: bool,
    /// Additional copy info flag
    pub additional_copy_info_flag: bool,
    /// CRC flag
    pub crc_flag: bool,
    /// Extension flag
    pub extension_flag: bool,
    /// Length of the header data following this field
    pub header_data_length: u8,
    /// Presentation Time Stamp (33 bits)
    pub pts: Option<u64>,
    /// Decoding Time Stamp (33 bits)
    pub dts: Option<u64>,
    /// Offset of the elementary stream data inside the PES packet
    pub payload_offset: usize,
}

impl PESHeader {
    /// Parses the header of a complete PES packet.
    ///
    /// A packet shorter than its PES_packet_length is `Truncated`, a longer
    /// one `Invalid`. Stream ids without an optional header are
    /// `NotSupported`.
    pub fn parse(data: &[u8]) -> std::result::Result<Self, PesPacketResult> {
        if data.len() < PES_FIXED_HEADER_SIZE || !has_start_code(data) {
            return Err(PesPacketResult::Invalid);
        }

        let mut header = PESHeader {
            stream_id: data[3],
            packet_length: u16::from_be_bytes([data[4], data[5]]),
            ..Default::default()
        };

        if header.packet_length != 0 {
            let declared = header.packet_length as usize + PES_FIXED_HEADER_SIZE;
            if data.len() < declared {
                return Err(PesPacketResult::Truncated);
            }
            if data.len() > declared {
                return Err(PesPacketResult::Invalid);
            }
        }

        if is_unsupported_stream_id(header.stream_id) {
            return Err(PesPacketResult::NotSupported);
        }

        if data.len() < 9 {
            return Err(PesPacketResult::Invalid);
        }
        let flags = data[6];
        if flags >> 6 != 0b10 {
            return Err(PesPacketResult::Invalid);
        }
        header.scrambling_control = (flags >> 4) & 0x03;
        header.priority = (flags & 0x08) != 0;
        header.data_alignment = (flags & 0x04) != 0;
        header.copyright = (flags & 0x02) != 0;
        header.original = (flags & 0x01) != 0;

        let flags2 = data[7];
        header.pts_dts_flags = flags2 >> 6;
        header.escr_flag = (flags2 & 0x20) != 0;
        header.es_rate_flag = (flags2 & 0x10) != 0;
        header.dsm_trick_mode_flag = (flags2 & 0x08) != 0;
        header.additional_copy_info_flag = (flags2 & 0x04) != 0;
        header.crc_flag = (flags2 & 0x02) != 0;
        header.extension_flag = (flags2 & 0x01) != 0;
        header.header_data_length = data[8];

        header.payload_offset = 9 + header.header_data_length as usize;
        if header.payload_offset > data.len() {
            return Err(PesPacketResult::Invalid);
        }

        let optional = &data[9..header.payload_offset];
        match header.pts_dts_flags {
            0b10 => {
                header.pts = Some(read_timestamp(optional)?);
            }
            0b11 => {
                header.pts = Some(read_timestamp(optional)?);
                header.dts = Some(read_timestamp(optional.get(5..).unwrap_or(&[]))?);
            }
            // '01' is forbidden
            0b01 => return Err(PesPacketResult::Invalid),
            _ => {}
        }

        Ok(header)
    }
}

/// Reads a 33-bit timestamp spread over 5 bytes with marker bits.
fn read_timestamp(data: &[u8]) -> std::result::Result<u64, PesPacketResult> {
    if data.len() < 5 {
        return Err(PesPacketResult::Invalid);
    }
    let high = ((data[0] as u64) >> 1) & 0x07;
    let mid = ((data[1] as u64) << 7) | ((data[2] as u64) >> 1);
    let low = ((data[3] as u64) << 7) | ((data[4] as u64) >> 1);
    Ok((high << 30) | (mid << 15) | low)
}

/// Shifts a timestamp by `offset`, wrapping within 33 bits.
pub fn apply_timestamp_offset(timestamp: u64, offset: u64) -> u64 {
    timestamp.wrapping_add(offset) & TIMESTAMP_MASK
}

/// Writes a 33-bit timestamp with its 4-bit prefix and marker bits.
pub fn write_timestamp(buf: &mut BytesMut, prefix: u8, ts: u64) {
    let ts = ts & TIMESTAMP_MASK;

    // First byte: prefix bits and 3 MSB of timestamp
    buf.put_u8((prefix << 4) | ((ts >> 29) & 0x0E) as u8 | 0x01);

    // Middle 15 bits and marker
    buf.put_u16((((ts >> 14) & 0xFFFE) | 0x01) as u16);

    // Final 15 bits and marker
    buf.put_u16((((ts << 1) & 0xFFFE) | 0x01) as u16);
}

/// Builds a PES packet around `payload`, mostly for feeding the demuxer in
/// tests. `bounded` controls whether PES_packet_length is filled in.
pub fn build_pes_packet(
    stream_id: u8,
    pts: Option<u64>,
    dts: Option<u64>,
    payload: &[u8],
    bounded: bool,
) -> Bytes {
    let mut optional = BytesMut::new();
    let mut pts_dts_flags = 0u8;
    if let Some(pts) = pts {
        if let Some(dts) = dts {
            pts_dts_flags = 0b11;
            write_timestamp(&mut optional, 0b0011, pts);
            write_timestamp(&mut optional, 0b0001, dts);
        } else {
            pts_dts_flags = 0b10;
            write_timestamp(&mut optional, 0b0010, pts);
        }
    }

    let mut buf = BytesMut::with_capacity(9 + optional.len() + payload.len());
    buf.put_slice(&[0x00, 0x00, 0x01, stream_id]);
    let length = 3 + optional.len() + payload.len();
    buf.put_u16(if bounded && length <= u16::MAX as usize {
        length as u16
    } else {
        0
    });
    buf.put_u8(0x80);
    buf.put_u8(pts_dts_flags << 6);
    buf.put_u8(optional.len() as u8);
    buf.put_slice(&optional);
    buf.put_slice(payload);
    buf.freeze()
}
