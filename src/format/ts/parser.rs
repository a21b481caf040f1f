use super::types::*;
use crate::error::{DemuxError, Result};

/// One 188-byte transport packet split into header, adaptation field and
/// payload.
#[derive(Debug, Clone)]
pub struct TSPacket<'a> {
    pub header: TSHeader,
    pub adaptation_field: Option<AdaptationField>,
    /// Bytes after the adaptation field; empty when the packet carries none.
    pub payload: &'a [u8],
}

impl<'a> TSPacket<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() != TS_PACKET_SIZE {
            return Err(DemuxError::InvalidData(format!(
                "TS packet must be {} bytes, got {}",
                TS_PACKET_SIZE,
                data.len()
            )));
        }
        let header = parse_header(data)?;

        let mut payload_offset = TS_HEADER_SIZE;
        let mut adaptation_field = None;
        if header.adaptation_field_exists {
            let field = parse_adaptation_field(&data[TS_HEADER_SIZE..])?;
            payload_offset += 1 + field.length;
            adaptation_field = Some(field);
        }

        let payload = if header.contains_payload {
            &data[payload_offset..]
        } else {
            &[]
        };

        Ok(TSPacket {
            header,
            adaptation_field,
            payload,
        })
    }

    pub fn random_access(&self) -> bool {
        self.adaptation_field
            .as_ref()
            .map_or(false, |af| af.random_access)
    }

    pub fn discontinuity(&self) -> bool {
        self.adaptation_field
            .as_ref()
            .map_or(false, |af| af.discontinuity)
    }

    pub fn pcr(&self) -> Option<u64> {
        self.adaptation_field.as_ref().and_then(|af| af.pcr)
    }
}

pub fn parse_header(data: &[u8]) -> Result<TSHeader> {
    if data.len() < TS_HEADER_SIZE {
        return Err(DemuxError::InvalidData("TS packet too short".into()));
    }

    if data[0] != SYNC_BYTE {
        return Err(DemuxError::InvalidData("Invalid sync byte".into()));
    }

    Ok(TSHeader {
        sync_byte: data[0],
        transport_error: (data[1] & 0x80) != 0,
        payload_unit_start: (data[1] & 0x40) != 0,
        transport_priority: (data[1] & 0x20) != 0,
        pid: (((data[1] & 0x1F) as u16) << 8) | data[2] as u16,
        scrambling_control: (data[3] >> 6) & 0x03,
        adaptation_field_exists: (data[3] & 0x20) != 0,
        contains_payload: (data[3] & 0x10) != 0,
        continuity_counter: data[3] & 0x0F,
    })
}

/// 33-bit base, 6 reserved bits, 9-bit extension.
fn read_clock_reference(data: &[u8]) -> u64 {
    let base = ((data[0] as u64) << 25)
        | ((data[1] as u64) << 17)
        | ((data[2] as u64) << 9)
        | ((data[3] as u64) << 1)
        | ((data[4] & 0x80) as u64 >> 7);
    let ext = (((data[4] & 0x01) as u64) << 8) | (data[5] as u64);
    base * 300 + ext
}

/// Parses an adaptation field starting at its length byte.
///
/// A length of 183 leaves no room for payload; some muxers use it for pure
/// stuffing even with a payload signalled, so it is accepted.
pub fn parse_adaptation_field(data: &[u8]) -> Result<AdaptationField> {
    let length = *data
        .first()
        .ok_or_else(|| DemuxError::InvalidData("Adaptation field missing".into()))?
        as usize;
    if length > TS_PACKET_SIZE - TS_HEADER_SIZE - 1 || data.len() < 1 + length {
        return Err(DemuxError::InvalidData(format!(
            "Adaptation field length {} exceeds the packet",
            length
        )));
    }

    let mut field = AdaptationField {
        length,
        ..Default::default()
    };
    if length == 0 {
        return Ok(field);
    }

    let body = &data[1..1 + length];
    let flags = body[0];
    field.discontinuity = (flags & 0x80) != 0;
    field.random_access = (flags & 0x40) != 0;
    field.es_priority = (flags & 0x20) != 0;
    let pcr_flag = (flags & 0x10) != 0;
    let opcr_flag = (flags & 0x08) != 0;
    let splicing_point_flag = (flags & 0x04) != 0;
    let private_data_flag = (flags & 0x02) != 0;

    let mut pos = 1;

    if pcr_flag {
        if body.len() < pos + 6 {
            return Err(DemuxError::InvalidData("PCR data too short".into()));
        }
        field.pcr = Some(read_clock_reference(&body[pos..]));
        pos += 6;
    }

    if opcr_flag {
        if body.len() < pos + 6 {
            return Err(DemuxError::InvalidData("OPCR data too short".into()));
        }
        field.opcr = Some(read_clock_reference(&body[pos..]));
        pos += 6;
    }

    if splicing_point_flag {
        if body.len() < pos + 1 {
            return Err(DemuxError::InvalidData("Splice countdown too short".into()));
        }
        field.splice_countdown = Some(body[pos] as i8);
        pos += 1;
    }

    if private_data_flag {
        if body.len() < pos + 1 {
            return Err(DemuxError::InvalidData(
                "Private data length byte missing".into(),
            ));
        }
        let private_data_length = body[pos] as usize;
        pos += 1;
        if body.len() < pos + private_data_length {
            return Err(DemuxError::InvalidData("Private data too short".into()));
        }
        field.private_data = Some(body[pos..pos + private_data_length].to_vec());
    }

    // The adaptation field extension and stuffing are covered by `length`.
    Ok(field)
}
