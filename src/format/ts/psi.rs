//! Program specific information: section headers, PAT, PMT and the DVB
//! service description table.

use super::types::*;
use crate::av::{CodecType, StreamCodecInformation, StreamType};
use crate::codec::h265::parse_general_profile_tier_level;
use crate::error::{DemuxError, Result};
use crate::utils::BitReader;
use log::trace;
use std::collections::BTreeMap;

/// section_length limit for PAT, CAT, PMT and TSDT.
pub const MAX_PSI_SECTION_LENGTH: usize = 1021;
/// section_length limit for private sections.
pub const MAX_PRIVATE_SECTION_LENGTH: usize = 4093;

/// Bytes of CRC_32 trailing every long-form section.
const CRC_SIZE: usize = 4;
/// table_id through last_section_number.
const LONG_HEADER_SIZE: usize = 8;

pub const DESCRIPTOR_ISO_639_LANGUAGE: u8 = 10;
pub const DESCRIPTOR_HEVC_VIDEO: u8 = 56;
pub const DESCRIPTOR_AAC: u8 = 124;
pub const DESCRIPTOR_SERVICE: u8 = 0x48;

/// First three bytes common to all sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub table_id: u8,
    pub section_syntax_indicator: bool,
    pub section_length: usize,
}

/// The five bytes following the section header in long-form sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableHeader {
    /// transport_stream_id, program_number or service table id, per table.
    pub table_id_extension: u16,
    pub version_number: u8,
    pub current_next: bool,
    pub section_number: u8,
    pub last_section_number: u8,
}

/// Validates the common section header.
///
/// Rejects the forbidden table_id, a cleared section_syntax_indicator on
/// PAT/CAT/PMT, a set '0' bit on tables 0..=3 and oversized sections.
pub fn parse_section_header(section: &[u8]) -> Result<SectionHeader> {
    let mut reader = BitReader::new(section);
    let table_id = reader.read_bits(8)? as u8;
    if table_id == TABLE_ID_FORBIDDEN {
        return Err(DemuxError::InvalidData(
            "section table_id is set to the forbidden value".into(),
        ));
    }
    let section_syntax_indicator = reader.read_bit()?;
    if table_id <= TABLE_ID_PMT && !section_syntax_indicator {
        return Err(DemuxError::InvalidData(format!(
            "section_syntax_indicator is 0 for table_id {}",
            table_id
        )));
    }
    let zero = reader.read_bit()?;
    if table_id <= TABLE_ID_TSDT && zero {
        return Err(DemuxError::InvalidData(format!(
            "'0' bit is set for table_id {}",
            table_id
        )));
    }
    reader.skip_bits(2)?;
    let section_length = reader.read_bits(12)? as usize;
    let max_length = if table_id <= TABLE_ID_TSDT {
        MAX_PSI_SECTION_LENGTH
    } else {
        MAX_PRIVATE_SECTION_LENGTH
    };
    if section_length > max_length {
        return Err(DemuxError::InvalidData(format!(
            "section_length {} exceeds {}",
            section_length, max_length
        )));
    }
    Ok(SectionHeader {
        table_id,
        section_syntax_indicator,
        section_length,
    })
}

/// Splits a complete long-form section into its table header and the bytes
/// between that header and the CRC.
pub fn split_long_section(section: &[u8]) -> Result<(TableHeader, &[u8])> {
    if section.len() < LONG_HEADER_SIZE + CRC_SIZE {
        return Err(DemuxError::InvalidData(format!(
            "section of {} bytes is too short",
            section.len()
        )));
    }
    let mut reader = BitReader::new(&section[3..LONG_HEADER_SIZE]);
    let table_id_extension = reader.read_bits(16)? as u16;
    reader.skip_bits(2)?;
    let header = TableHeader {
        table_id_extension,
        version_number: reader.read_bits(5)? as u8,
        current_next: reader.read_bit()?,
        section_number: reader.read_bits(8)? as u8,
        last_section_number: reader.read_bits(8)? as u8,
    };
    Ok((header, &section[LONG_HEADER_SIZE..section.len() - CRC_SIZE]))
}

/// Contents of one program association section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramAssociation {
    pub version_number: u8,
    pub network_pid: Option<u16>,
    /// program_number to program_map_PID.
    pub programs: BTreeMap<u16, u16>,
}

pub fn parse_pat(table: &TableHeader, body: &[u8]) -> Result<ProgramAssociation> {
    let mut pat = ProgramAssociation {
        version_number: table.version_number,
        ..Default::default()
    };
    for entry in body.chunks_exact(4) {
        let program_number = u16::from_be_bytes([entry[0], entry[1]]);
        let pid = u16::from_be_bytes([entry[2] & 0x1f, entry[3]]);
        if program_number == 0 {
            pat.network_pid = Some(pid);
        } else {
            pat.programs.insert(program_number, pid);
        }
    }
    Ok(pat)
}

/// One elementary stream as announced by a PMT.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramStreamInfo {
    pub stream_type: u8,
    pub codec_info: StreamCodecInformation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramMap {
    pub program_number: u16,
    /// PID the PMT was received on.
    pub program_map_pid: u16,
    pub version_number: u8,
    pub pcr_pid: u16,
    /// Elementary PID to stream description, in PID order.
    pub streams: BTreeMap<u16, ProgramStreamInfo>,
}

pub fn parse_pmt(table: &TableHeader, body: &[u8], pid: u16) -> Result<ProgramMap> {
    let mut pmt = ProgramMap {
        program_number: table.table_id_extension,
        program_map_pid: pid,
        version_number: table.version_number,
        ..Default::default()
    };

    if body.len() < 4 {
        return Err(DemuxError::InvalidData("PMT too short for PCR PID".into()));
    }
    pmt.pcr_pid = u16::from_be_bytes([body[0] & 0x1f, body[1]]);
    // only 10 bits are used, the upper 2 must be zero
    let program_info_length = u16::from_be_bytes([body[2] & 0x03, body[3]]) as usize;
    let mut pos = 4;
    if pos + program_info_length > body.len() {
        return Err(DemuxError::InvalidData("Program info data too short".into()));
    }
    for (tag, _) in descriptors(&body[pos..pos + program_info_length])? {
        trace!("program {} descriptor {} ignored", pmt.program_number, tag);
    }
    pos += program_info_length;

    while pos + 5 <= body.len() {
        let stream_type = body[pos];
        let elementary_pid = u16::from_be_bytes([body[pos + 1] & 0x1f, body[pos + 2]]);
        let es_info_length = u16::from_be_bytes([body[pos + 3] & 0x03, body[pos + 4]]) as usize;
        pos += 5;

        if pos + es_info_length > body.len() {
            return Err(DemuxError::InvalidData("ES info data too short".into()));
        }

        let mut codec_info = StreamCodecInformation::default();
        for (tag, data) in descriptors(&body[pos..pos + es_info_length])? {
            apply_descriptor(tag, data, &mut codec_info)?;
        }
        pos += es_info_length;

        apply_stream_type(stream_type, &mut codec_info);
        pmt.streams.insert(
            elementary_pid,
            ProgramStreamInfo {
                stream_type,
                codec_info,
            },
        );
    }

    Ok(pmt)
}

/// Splits a descriptor loop into `(tag, data)` pairs.
pub fn descriptors(data: &[u8]) -> Result<Vec<(u8, &[u8])>> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos + 2 <= data.len() {
        let tag = data[pos];
        let length = data[pos + 1] as usize;
        pos += 2;
        if pos + length > data.len() {
            return Err(DemuxError::InvalidData("Descriptor data too short".into()));
        }
        out.push((tag, &data[pos..pos + length]));
        pos += length;
    }
    Ok(out)
}

/// Fills what a stream_type alone says about a stream.
fn apply_stream_type(stream_type: u8, info: &mut StreamCodecInformation) {
    match ElementaryStreamKind::from_stream_type(stream_type) {
        ElementaryStreamKind::AVC => {
            info.stream_type = StreamType::Video;
            info.codec = CodecType::H264;
        }
        ElementaryStreamKind::HEVC => {
            info.stream_type = StreamType::Video;
            info.codec = CodecType::H265;
        }
        ElementaryStreamKind::MPEG1Audio => {
            info.stream_type = StreamType::Audio;
            info.codec = CodecType::MPEGAudio;
            info.mime_type = "audio/mpeg".into();
            info.codec_4cc = crate::av::make_4cc(b"mpga");
            info.profile = 1;
            info.codec_specifier_rfc6381 = "mp4a.6b".into();
        }
        ElementaryStreamKind::AACADTS => {
            info.stream_type = StreamType::Audio;
            info.codec = CodecType::AAC;
        }
        ElementaryStreamKind::Unknown => {}
    }
}

/// Applies one elementary stream descriptor to the stream description.
pub fn apply_descriptor(tag: u8, data: &[u8], info: &mut StreamCodecInformation) -> Result<()> {
    match tag {
        DESCRIPTOR_ISO_639_LANGUAGE => {
            for entry in data.chunks_exact(4) {
                let code: String = entry[..3]
                    .iter()
                    .map(|&b| (b as char).to_ascii_lowercase())
                    .collect();
                info.language = Some(code);
                let audio_type = entry[3];
                // undefined or primary
                if audio_type == 0 || audio_type == 0x80 {
                    break;
                }
            }
        }
        DESCRIPTOR_HEVC_VIDEO => {
            let mut reader = BitReader::new(data);
            let ptl = parse_general_profile_tier_level(&mut reader)?;
            let temporal_layer_subset_flag = reader.read_bit()?;
            let _still_present = reader.read_bit()?;
            let _picture_24hr_present = reader.read_bit()?;
            let _sub_pic_hrd_params_not_present = reader.read_bit()?;
            reader.skip_bits(2)?;
            let _hdr_wcg_idc = reader.read_bits(2)?;
            if temporal_layer_subset_flag {
                let temporal_id_min = reader.read_bits(3)?;
                reader.skip_bits(5)?;
                let temporal_id_max = reader.read_bits(3)?;
                reader.skip_bits(5)?;
                trace!("HEVC temporal layers {}..={}", temporal_id_min, temporal_id_max);
            }
            info.stream_type = StreamType::Video;
            info.codec = CodecType::H265;
            info.profile_space = ptl.general_profile_space as u32;
            info.profile_tier = ptl.general_tier_flag as u32;
            info.profile = ptl.general_profile_idc as u32;
            info.profile_level = ptl.general_level_idc as u32;
            info.profile_constraints = ptl.general_constraint_indicator_flags;
            info.profile_compatibility_flags = ptl.general_profile_compatibility_flags;
            info.codec_specifier_rfc6381 = ptl.rfc6381_codec();
        }
        DESCRIPTOR_AAC => {
            let mut reader = BitReader::new(data);
            let profile_and_level = reader.read_bits(8)?;
            let mut aac_type = None;
            if data.len() > 1 {
                let aac_type_flag = reader.read_bit()?;
                let _saoc_de_flag = reader.read_bit()?;
                reader.skip_bits(6)?;
                if aac_type_flag {
                    aac_type = Some(reader.read_bits(8)?);
                }
                // additional_info_bytes follow
            }
            trace!(
                "AAC descriptor: profile_and_level 0x{:02x}, AAC_type {:?}",
                profile_and_level,
                aac_type
            );
        }
        _ => {}
    }
    Ok(())
}

/// One entry of a service description table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDescription {
    pub service_id: u16,
    pub running_status: u8,
    pub free_ca_mode: bool,
    /// From the service descriptor, when present.
    pub service_type: Option<u8>,
    pub provider_name: Option<String>,
    pub service_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDescriptionTable {
    pub transport_stream_id: u16,
    pub version_number: u8,
    pub original_network_id: u16,
    pub services: Vec<ServiceDescription>,
}

/// ETSI EN 300 468 5.2.3.
pub fn parse_sdt(table: &TableHeader, body: &[u8]) -> Result<ServiceDescriptionTable> {
    let mut reader = BitReader::new(body);
    let mut sdt = ServiceDescriptionTable {
        transport_stream_id: table.table_id_extension,
        version_number: table.version_number,
        original_network_id: reader.read_bits(16)? as u16,
        services: Vec::new(),
    };
    reader.skip_bits(8)?;

    while reader.remaining_bytes() >= 5 {
        let mut service = ServiceDescription {
            service_id: reader.read_bits(16)? as u16,
            ..Default::default()
        };
        reader.skip_bits(6)?;
        let _eit_schedule = reader.read_bit()?;
        let _eit_present_following = reader.read_bit()?;
        service.running_status = reader.read_bits(3)? as u8;
        service.free_ca_mode = reader.read_bit()?;
        let descriptors_length = reader.read_bits(12)? as usize;
        let loop_data = reader
            .get_aligned_bytes(descriptors_length)
            .ok_or_else(|| DemuxError::InvalidData("SDT descriptor loop too short".into()))?;
        for (tag, data) in descriptors(loop_data)? {
            if tag == DESCRIPTOR_SERVICE {
                parse_service_descriptor(data, &mut service)?;
            }
        }
        sdt.services.push(service);
    }
    Ok(sdt)
}

fn parse_service_descriptor(data: &[u8], service: &mut ServiceDescription) -> Result<()> {
    let mut reader = BitReader::new(data);
    service.service_type = Some(reader.read_bits(8)? as u8);
    for name in [&mut service.provider_name, &mut service.service_name] {
        let length = reader.read_bits(8)? as usize;
        let text = reader
            .get_aligned_bytes(length)
            .ok_or_else(|| DemuxError::InvalidData("service descriptor too short".into()))?;
        *name = Some(decode_dvb_string(text));
    }
    Ok(())
}

/// Decodes a DVB text field, treating the default table as ISO 8859-1 and
/// dropping a leading character table selector.
fn decode_dvb_string(text: &[u8]) -> String {
    let text = match text.first() {
        Some(0x10) => text.get(3..).unwrap_or(&[]),
        Some(0x1f) => text.get(2..).unwrap_or(&[]),
        Some(&b) if b < 0x20 => &text[1..],
        _ => text,
    };
    text.iter()
        .filter(|&&b| !(0x80..0xa0).contains(&b))
        .map(|&b| b as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Crc32Mpeg2;
    use pretty_assertions::assert_eq;

    /// Wraps a long-form body with header and CRC.
    fn section(table_id: u8, extension: u16, version: u8, body: &[u8]) -> Vec<u8> {
        let section_length = 5 + body.len() + 4;
        let mut data = vec![
            table_id,
            0xB0 | (section_length >> 8) as u8,
            section_length as u8,
        ];
        data.extend_from_slice(&extension.to_be_bytes());
        data.push(0xC1 | (version << 1));
        data.extend_from_slice(&[0x00, 0x00]);
        data.extend_from_slice(body);
        let crc = Crc32Mpeg2::new().calculate(&data);
        data.extend_from_slice(&crc.to_be_bytes());
        data
    }

    #[test]
    fn test_parse_pat() {
        let data = section(
            TABLE_ID_PAT,
            1,
            3,
            &[
                0x00, 0x00, 0xE0, 0x10, // network PID
                0x00, 0x01, 0xF0, 0x00, // program 1 -> 0x1000
                0x00, 0x02, 0xE1, 0x00, // program 2 -> 0x100
            ],
        );
        let header = parse_section_header(&data).unwrap();
        assert_eq!(header.section_length + 3, data.len());
        let (table, body) = split_long_section(&data).unwrap();
        assert_eq!(table.version_number, 3);
        assert!(table.current_next);
        let pat = parse_pat(&table, body).unwrap();
        assert_eq!(pat.network_pid, Some(0x10));
        assert_eq!(pat.programs.len(), 2);
        assert_eq!(pat.programs[&1], 0x1000);
        assert_eq!(pat.programs[&2], 0x100);
    }

    #[test]
    fn test_section_header_validation() {
        assert!(parse_section_header(&[0xFF, 0xB0, 0x0D]).is_err());
        // PMT without section_syntax_indicator
        assert!(parse_section_header(&[0x02, 0x30, 0x0D]).is_err());
        // PAT with the '0' bit set
        assert!(parse_section_header(&[0x00, 0xF0, 0x0D]).is_err());
        // 1022 bytes is too long for a PMT but fine for a private table
        assert!(parse_section_header(&[0x02, 0xB3, 0xFE]).is_err());
        assert!(parse_section_header(&[0x42, 0xF3, 0xFE]).is_ok());
        assert!(split_long_section(&[0x00, 0xB0, 0x05, 0, 1, 0xC1, 0, 0]).is_err());
    }

    #[test]
    fn test_parse_pmt_with_descriptors() {
        let body = [
            0xE1, 0x00, // PCR PID 0x100
            0xF0, 0x03, // program info
            0x05, 0x01, 0x00, // registration-like descriptor, ignored
            STREAM_TYPE_H264, 0xE1, 0x00, 0xF0, 0x00, // video
            STREAM_TYPE_AAC, 0xE1, 0x01, 0xF0, 0x06, // audio with language
            DESCRIPTOR_ISO_639_LANGUAGE, 0x04, b'E', b'N', b'G', 0x00,
            0x86, 0xE1, 0x02, 0xF0, 0x00, // unknown stream type
        ];
        let data = section(TABLE_ID_PMT, 1, 0, &body);
        let (table, body) = split_long_section(&data).unwrap();
        let pmt = parse_pmt(&table, body, 0x1000).unwrap();
        assert_eq!(pmt.program_number, 1);
        assert_eq!(pmt.program_map_pid, 0x1000);
        assert_eq!(pmt.pcr_pid, 0x100);
        assert_eq!(pmt.streams.len(), 3);

        let video = &pmt.streams[&0x100];
        assert_eq!(video.stream_type, STREAM_TYPE_H264);
        assert_eq!(video.codec_info.codec, CodecType::H264);
        assert_eq!(video.codec_info.stream_type, StreamType::Video);

        let audio = &pmt.streams[&0x101];
        assert_eq!(audio.codec_info.codec, CodecType::AAC);
        assert_eq!(audio.codec_info.language.as_deref(), Some("eng"));

        let other = &pmt.streams[&0x102];
        assert_eq!(other.codec_info.codec, CodecType::Unknown);
    }

    #[test]
    fn test_mpeg_audio_stream_type() {
        let mut info = StreamCodecInformation::default();
        apply_stream_type(STREAM_TYPE_MPEG1_AUDIO, &mut info);
        assert_eq!(info.codec, CodecType::MPEGAudio);
        assert_eq!(info.mime_type, "audio/mpeg");
        assert_eq!(info.codec_specifier_rfc6381, "mp4a.6b");
        assert_eq!(info.profile, 1);
    }

    #[test]
    fn test_hevc_video_descriptor() {
        // Main profile, main tier, level 3.1, progressive + frame only
        let descriptor = [
            0x01, 0x60, 0x00, 0x00, 0x00, 0x90, 0x00, 0x00, 0x00, 0x00, 0x00, 0x5D,
            0x00, // no temporal subset
        ];
        let mut info = StreamCodecInformation::default();
        apply_descriptor(DESCRIPTOR_HEVC_VIDEO, &descriptor, &mut info).unwrap();
        assert_eq!(info.codec, CodecType::H265);
        assert_eq!(info.profile, 1);
        assert_eq!(info.profile_level, 93);
        assert_eq!(info.profile_tier, 0);
        assert_eq!(info.codec_specifier_rfc6381, "hvc1.1.6.L93.90");

        assert!(apply_descriptor(DESCRIPTOR_HEVC_VIDEO, &descriptor[..6], &mut info).is_err());
    }

    #[test]
    fn test_language_prefers_primary() {
        let mut info = StreamCodecInformation::default();
        apply_descriptor(
            DESCRIPTOR_ISO_639_LANGUAGE,
            &[b'd', b'e', b'u', 0x03, b'F', b'R', b'A', 0x80, b'i', b't', b'a', 0x00],
            &mut info,
        )
        .unwrap();
        assert_eq!(info.language.as_deref(), Some("fra"));
    }

    #[test]
    fn test_parse_sdt() {
        let mut body = vec![0x00, 0x01, 0xFF]; // original_network_id, reserved
        let descriptor = [
            DESCRIPTOR_SERVICE, 0x0B, 0x01, // digital television
            0x03, b'A', b'C', b'M', // provider
            0x05, 0x15, b'O', b'n', b'e', b'!', // name with UTF-8 selector byte
        ];
        body.extend_from_slice(&[0x00, 0x07, 0xFC, 0x80, descriptor.len() as u8]);
        body.extend_from_slice(&descriptor);
        let data = section(TABLE_ID_SDT, 0x22, 1, &body);
        let (table, body) = split_long_section(&data).unwrap();
        let sdt = parse_sdt(&table, body).unwrap();
        assert_eq!(sdt.transport_stream_id, 0x22);
        assert_eq!(sdt.original_network_id, 1);
        assert_eq!(
            sdt.services,
            vec![ServiceDescription {
                service_id: 7,
                running_status: 4,
                free_ca_mode: false,
                service_type: Some(1),
                provider_name: Some("ACM".into()),
                service_name: Some("One!".into()),
            }]
        );
    }
}
