//! MPEG-4 ES_Descriptor (ISO/IEC 14496-1 7.2.6.5) as carried in `esds` boxes.

use crate::codec::aac::{parse_audio_specific_config, AudioSpecificConfig};
use crate::error::{DemuxError, Result};
use crate::utils::BitReader;
use bytes::Bytes;

pub const TAG_ES_DESCRIPTOR: u8 = 3;
pub const TAG_DECODER_CONFIG: u8 = 4;
pub const TAG_DECODER_SPECIFIC_INFO: u8 = 5;
pub const TAG_SL_CONFIG: u8 = 6;

/// objectTypeIndication values.
pub const OBJECT_TYPE_MPEG4_AUDIO: u8 = 0x40;
pub const OBJECT_TYPE_MPEG1_AUDIO: u8 = 0x6b;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EsDescriptor {
    pub es_id: u16,
    pub depends_on_es_id: Option<u16>,
    pub stream_priority: u8,
    pub object_type_id: u8,
    pub stream_type_id: u8,
    pub buffer_size: u32,
    pub max_bitrate: u32,
    pub avg_bitrate: u32,
    pub codec_specific_data: Bytes,
}

impl EsDescriptor {
    /// AudioSpecificConfig from the decoder specific info of an MPEG-4 audio stream.
    pub fn audio_specific_config(&self) -> Result<AudioSpecificConfig> {
        if self.object_type_id != OBJECT_TYPE_MPEG4_AUDIO {
            return Err(DemuxError::Unsupported(format!(
                "object type 0x{:02x} is not MPEG-4 audio",
                self.object_type_id
            )));
        }
        parse_audio_specific_config(&self.codec_specific_data)
    }
}

/// Reads a tag byte followed by its expandable size field (1 to 4 bytes of
/// 7 bits each, MSB set meaning "more follows").
fn read_tag_and_size(reader: &mut BitReader) -> Result<(u8, usize)> {
    let tag = reader.read_bits(8)? as u8;
    let mut size = 0usize;
    for _ in 0..4 {
        let byte = reader.read_bits(8)?;
        size = (size << 7) | (byte & 0x7f) as usize;
        if byte & 0x80 == 0 {
            return Ok((tag, size));
        }
    }
    Err(DemuxError::InvalidData("descriptor size field too long".into()))
}

fn expect_tag(reader: &mut BitReader, expected: u8) -> Result<usize> {
    let (tag, size) = read_tag_and_size(reader)?;
    if tag != expected {
        return Err(DemuxError::InvalidData(format!(
            "expected descriptor tag {}, found {}",
            expected, tag
        )));
    }
    if size > reader.remaining_bytes() {
        return Err(DemuxError::InvalidData(format!(
            "descriptor tag {} overruns its container",
            tag
        )));
    }
    Ok(size)
}

/// Parses ES_Descriptor -> DecoderConfigDescriptor -> [DecoderSpecificInfo]
/// -> SLConfigDescriptor.
pub fn parse_es_descriptor(data: &[u8]) -> Result<EsDescriptor> {
    let mut reader = BitReader::new(data);
    let mut esd = EsDescriptor::default();

    expect_tag(&mut reader, TAG_ES_DESCRIPTOR)?;
    esd.es_id = reader.read_bits(16)? as u16;
    let stream_dependence_flag = reader.read_bit()?;
    let url_flag = reader.read_bit()?;
    let ocr_stream_flag = reader.read_bit()?;
    esd.stream_priority = reader.read_bits(5)? as u8;
    if stream_dependence_flag {
        esd.depends_on_es_id = Some(reader.read_bits(16)? as u16);
    }
    if url_flag {
        let url_length = reader.read_bits(8)?;
        reader.skip_bits(url_length * 8)?;
    }
    if ocr_stream_flag {
        // OCR_ES_Id
        reader.skip_bits(16)?;
    }

    let config_size = expect_tag(&mut reader, TAG_DECODER_CONFIG)?;
    let config_end = reader.byte_position() + config_size;
    esd.object_type_id = reader.read_bits(8)? as u8;
    esd.stream_type_id = reader.read_bits(6)? as u8;
    let _up_stream = reader.read_bit()?;
    reader.skip_bits(1)?;
    esd.buffer_size = reader.read_bits(24)?;
    esd.max_bitrate = reader.read_bits(32)?;
    esd.avg_bitrate = reader.read_bits(32)?;

    if reader.byte_position() < config_end
        && reader.peek_bits(8) == TAG_DECODER_SPECIFIC_INFO as u32
    {
        let dsi_size = expect_tag(&mut reader, TAG_DECODER_SPECIFIC_INFO)?;
        let dsi = reader
            .get_aligned_bytes(dsi_size)
            .ok_or_else(|| DemuxError::InvalidData("truncated DecoderSpecificInfo".into()))?;
        esd.codec_specific_data = Bytes::copy_from_slice(dsi);
    }
    // profileLevelIndicationIndexDescriptors are not interpreted
    if reader.byte_position() < config_end {
        reader.skip_bytes(config_end - reader.byte_position());
    }

    let sl_size = expect_tag(&mut reader, TAG_SL_CONFIG)?;
    reader.skip_bytes(sl_size);

    Ok(esd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_esds(dsi: &[u8]) -> Vec<u8> {
        let mut dcd = vec![OBJECT_TYPE_MPEG4_AUDIO, 0x15, 0x00, 0x18, 0x00];
        dcd.extend_from_slice(&128_000u32.to_be_bytes());
        dcd.extend_from_slice(&96_000u32.to_be_bytes());
        dcd.push(TAG_DECODER_SPECIFIC_INFO);
        dcd.push(dsi.len() as u8);
        dcd.extend_from_slice(dsi);

        let mut es = vec![0x00, 0x01, 0x00];
        es.push(TAG_DECODER_CONFIG);
        // four byte expandable size
        es.extend_from_slice(&[0x80, 0x80, 0x80, dcd.len() as u8]);
        es.extend_from_slice(&dcd);
        es.extend_from_slice(&[TAG_SL_CONFIG, 0x01, 0x02]);

        let mut out = vec![TAG_ES_DESCRIPTOR, es.len() as u8];
        out.extend_from_slice(&es);
        out
    }

    #[test]
    fn test_parse_audio_esds() {
        let esd = parse_es_descriptor(&sample_esds(&[0x12, 0x10])).unwrap();
        assert_eq!(esd.es_id, 1);
        assert_eq!(esd.object_type_id, OBJECT_TYPE_MPEG4_AUDIO);
        assert_eq!(esd.stream_type_id, 5);
        assert_eq!(esd.buffer_size, 0x1800);
        assert_eq!(esd.max_bitrate, 128_000);
        assert_eq!(esd.avg_bitrate, 96_000);
        assert_eq!(&esd.codec_specific_data[..], &[0x12, 0x10]);

        let asc = esd.audio_specific_config().unwrap();
        assert_eq!(asc.sampling_rate, 44100);
        assert_eq!(asc.channel_configuration, 2);
    }

    #[test]
    fn test_wrong_tag_order() {
        let mut data = sample_esds(&[0x12, 0x10]);
        data[0] = TAG_DECODER_CONFIG;
        assert!(parse_es_descriptor(&data).is_err());
    }

    #[test]
    fn test_truncated() {
        let data = sample_esds(&[0x12, 0x10]);
        assert!(parse_es_descriptor(&data[..data.len() - 3]).is_err());
    }
}
