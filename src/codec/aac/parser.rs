use super::types::*;
use crate::error::{DemuxError, Result};
use crate::utils::BitReader;
use bytes::Bytes;

/// Parses the 7 byte fixed+variable ADTS header. A following CRC word is not
/// consumed.
pub fn parse_adts_header(data: &[u8]) -> Result<ADTSHeader> {
    if data.len() < ADTS_HEADER_SIZE {
        return Err(DemuxError::Parser("ADTS header too short".into()));
    }

    let mut reader = BitReader::new(data);

    let sync_word = reader.read_bits(12)?;
    if sync_word != 0xFFF {
        return Err(DemuxError::Parser("Invalid ADTS sync word".into()));
    }

    let id = reader.read_bits(1)? as u8;
    let layer = reader.read_bits(2)? as u8;
    let protection_absent = reader.read_bits(1)? == 1;
    let profile = ProfileType::from(reader.read_bits(2)? as u8);
    let sample_rate_index = reader.read_bits(4)? as u8;
    let private_bit = reader.read_bits(1)? == 1;
    let channel_configuration = reader.read_bits(3)? as u8;
    let original_copy = reader.read_bits(1)? == 1;
    let home = reader.read_bits(1)? == 1;
    let copyright_id_bit = reader.read_bits(1)? == 1;
    let copyright_id_start = reader.read_bits(1)? == 1;
    let frame_length = reader.read_bits(13)? as u16;
    let buffer_fullness = reader.read_bits(11)? as u16;
    let number_of_raw_blocks = reader.read_bits(2)? as u8;

    Ok(ADTSHeader {
        sync_word,
        id,
        layer,
        protection_absent,
        profile,
        sample_rate_index,
        private_bit,
        channel_configuration,
        original_copy,
        home,
        copyright_id_bit,
        copyright_id_start,
        frame_length,
        buffer_fullness,
        number_of_raw_blocks,
    })
}

fn read_audio_object_type(reader: &mut BitReader) -> Result<u32> {
    let aot = reader.read_bits(5)?;
    if aot == 31 {
        Ok(32 + reader.read_bits(6)?)
    } else {
        Ok(aot)
    }
}

fn read_sampling_rate(reader: &mut BitReader) -> Result<u32> {
    let index = reader.read_bits(4)?;
    if index == 15 {
        reader.read_bits(24)
    } else {
        Ok(SAMPLING_RATES[index as usize])
    }
}

/// Parses an MPEG-4 AudioSpecificConfig (ISO/IEC 14496-3 1.6.2.1), including
/// explicit (AOT 5/29) and backward compatible (sync extension 0x2b7)
/// SBR/PS signalling.
pub fn parse_audio_specific_config(data: &[u8]) -> Result<AudioSpecificConfig> {
    let mut reader = BitReader::new(data);
    let mut asc = AudioSpecificConfig {
        sbr_signal: -1,
        ps_signal: -1,
        codec_specific_data: Bytes::copy_from_slice(data),
        ..Default::default()
    };

    asc.audio_object_type = read_audio_object_type(&mut reader)?;
    asc.sampling_rate = read_sampling_rate(&mut reader)?;
    asc.channel_configuration = reader.read_bits(4)?;

    if asc.audio_object_type == AOT_SBR || asc.audio_object_type == AOT_PS {
        asc.extension_audio_object_type = AOT_SBR;
        asc.sbr_signal = 1;
        if asc.audio_object_type == AOT_PS {
            asc.ps_signal = 1;
        }
        asc.extension_sampling_rate = read_sampling_rate(&mut reader)?;
        asc.audio_object_type = read_audio_object_type(&mut reader)?;
    }

    let aot = asc.audio_object_type;
    match aot {
        1 | 2 | 3 | 4 | 6 | 7 | 17 | 19 | 20 | 21 | 22 | 23 => {
            // GASpecificConfig
            let _frame_length_flag = reader.read_bits(1)?;
            if reader.read_bit()? {
                // coreCoderDelay
                reader.skip_bits(14)?;
            }
            let extension_flag = reader.read_bit()?;
            if asc.channel_configuration == 0 {
                return Err(DemuxError::Unsupported(
                    "AudioSpecificConfig with program_config_element".into(),
                ));
            }
            if aot == 6 || aot == 20 {
                // layerNr
                reader.skip_bits(3)?;
            }
            if extension_flag {
                if aot == AOT_ER_BSAC {
                    // numOfSubFrame, layer_length
                    reader.skip_bits(5 + 11)?;
                }
                if matches!(aot, 17 | 19 | 20 | 23) {
                    // aacSectionDataResilienceFlag and friends
                    reader.skip_bits(3)?;
                }
                let _extension_flag3 = reader.read_bits(1)?;
            }
        }
        _ => {
            return Err(DemuxError::Unsupported(format!(
                "audio object type {}",
                aot
            )))
        }
    }

    if matches!(aot, 17 | 19..=27) {
        let ep_config = reader.read_bits(2)?;
        if ep_config == 2 || ep_config == 3 {
            return Err(DemuxError::Unsupported(format!("epConfig {}", ep_config)));
        }
    }

    if asc.extension_audio_object_type != AOT_SBR && reader.remaining_bits() >= 16 {
        if reader.read_bits(11)? == SYNC_EXTENSION_SBR {
            asc.extension_audio_object_type = read_audio_object_type(&mut reader)?;
            if asc.extension_audio_object_type == AOT_SBR {
                asc.sbr_signal = reader.read_bits(1)? as i32;
                if asc.sbr_signal > 0 {
                    asc.extension_sampling_rate = read_sampling_rate(&mut reader)?;
                    if reader.remaining_bits() >= 12
                        && reader.read_bits(11)? == SYNC_EXTENSION_PS
                    {
                        asc.ps_signal = reader.read_bits(1)? as i32;
                    }
                }
            } else if asc.extension_audio_object_type == AOT_ER_BSAC {
                asc.sbr_signal = reader.read_bits(1)? as i32;
                if asc.sbr_signal > 0 {
                    asc.extension_sampling_rate = read_sampling_rate(&mut reader)?;
                }
                asc.extension_channel_configuration = reader.read_bits(4)?;
            } else {
                asc.extension_audio_object_type = 0;
            }
        }
    }

    Ok(asc)
}
