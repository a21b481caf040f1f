use crate::utils::BitWriter;
use bytes::Bytes;

/// Sampling rates indexed by `sampling_frequency_index` (ISO/IEC 14496-3 1.6.3.4).
pub const SAMPLING_RATES: [u32; 16] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350, 0,
    0, 0,
];

/// Output channels per `channel_configuration`; 0 means signalled in-band.
pub const CHANNELS_PER_CONFIGURATION: [u32; 16] = [0, 1, 2, 3, 4, 5, 6, 8, 0, 0, 0, 7, 8, 0, 8, 0];

pub const AOT_AAC_MAIN: u32 = 1;
pub const AOT_AAC_LC: u32 = 2;
pub const AOT_SBR: u32 = 5;
pub const AOT_PS: u32 = 29;
pub const AOT_ER_BSAC: u32 = 22;

pub const SYNC_EXTENSION_SBR: u32 = 0x2b7;
pub const SYNC_EXTENSION_PS: u32 = 0x548;

/// ADTS header size without and with the CRC word.
pub const ADTS_HEADER_SIZE: usize = 7;
pub const ADTS_HEADER_SIZE_WITH_CRC: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileType {
    Main = 0,
    LC = 1,
    SSR = 2,
    LTP = 3,
}

impl From<u8> for ProfileType {
    fn from(value: u8) -> Self {
        match value & 3 {
            0 => ProfileType::Main,
            1 => ProfileType::LC,
            2 => ProfileType::SSR,
            _ => ProfileType::LTP,
        }
    }
}

impl ProfileType {
    /// MPEG-4 audio object type matching this ADTS profile.
    pub fn audio_object_type(&self) -> u32 {
        *self as u32 + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ADTSHeader {
    pub sync_word: u32,          // 12 bits
    pub id: u8,                  // 1 bit, 0=MPEG-4, 1=MPEG-2
    pub layer: u8,               // 2 bits
    pub protection_absent: bool, // 1 bit
    pub profile: ProfileType,    // 2 bits
    pub sample_rate_index: u8,   // 4 bits
    pub private_bit: bool,       // 1 bit
    pub channel_configuration: u8, // 3 bits
    pub original_copy: bool,     // 1 bit
    pub home: bool,              // 1 bit
    pub copyright_id_bit: bool,  // 1 bit
    pub copyright_id_start: bool, // 1 bit
    pub frame_length: u16,       // 13 bits, header included
    pub buffer_fullness: u16,    // 11 bits
    pub number_of_raw_blocks: u8, // 2 bits, frames minus one
}

impl ADTSHeader {
    pub fn sync_word_valid(&self) -> bool {
        self.sync_word == 0xFFF
    }

    pub fn sample_rate(&self) -> Option<u32> {
        match SAMPLING_RATES[self.sample_rate_index as usize & 15] {
            0 => None,
            rate => Some(rate),
        }
    }

    /// 7 bytes, or 9 when a CRC follows the fixed header.
    pub fn header_size(&self) -> usize {
        if self.protection_absent {
            ADTS_HEADER_SIZE
        } else {
            ADTS_HEADER_SIZE_WITH_CRC
        }
    }

    /// Raw data block size; negative when `frame_length` is corrupt.
    pub fn payload_size(&self) -> isize {
        self.frame_length as isize - self.header_size() as isize
    }

    /// Two byte AudioSpecificConfig equivalent to this header.
    pub fn audio_specific_config(&self) -> Bytes {
        let mut writer = BitWriter::new();
        writer.put_bits(self.profile.audio_object_type(), 5);
        writer.put_bits(self.sample_rate_index as u32, 4);
        writer.put_bits(self.channel_configuration as u32, 4);
        // frameLengthFlag, dependsOnCoreCoder, extensionFlag
        writer.put_bits(0, 3);
        writer.finish()
    }
}

/// Decoded MPEG-4 AudioSpecificConfig.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AudioSpecificConfig {
    pub audio_object_type: u32,
    /// 5 when SBR is signalled, 22 for ER-BSAC extensions, 0 otherwise.
    pub extension_audio_object_type: u32,
    pub sampling_rate: u32,
    pub extension_sampling_rate: u32,
    pub channel_configuration: u32,
    pub extension_channel_configuration: u32,
    /// -1 unknown, 0 absent, 1 present.
    pub sbr_signal: i32,
    pub ps_signal: i32,
    pub codec_specific_data: Bytes,
}

impl AudioSpecificConfig {
    /// Sampling rate after SBR upsampling, if signalled.
    pub fn output_sampling_rate(&self) -> u32 {
        if self.extension_sampling_rate != 0 {
            self.extension_sampling_rate
        } else {
            self.sampling_rate
        }
    }

    pub fn num_channels(&self) -> u32 {
        let channels = CHANNELS_PER_CONFIGURATION[self.channel_configuration as usize & 15];
        if channels == 1 && self.ps_signal > 0 {
            2
        } else {
            channels
        }
    }

    /// Decoded samples per access unit.
    pub fn samples_per_block(&self) -> u32 {
        if self.sbr_signal > 0 {
            2048
        } else {
            1024
        }
    }

    /// `mp4a.40.N`, N being the extension object type when one is signalled.
    pub fn rfc6381_codec(&self) -> String {
        let aot = if self.extension_audio_object_type != 0 {
            self.extension_audio_object_type
        } else {
            self.audio_object_type
        };
        format!("mp4a.40.{}", aot)
    }

    pub fn format_name(&self) -> &'static str {
        if self.ps_signal > 0 {
            "HE-AAC v2"
        } else if self.sbr_signal > 0 {
            "HE-AAC"
        } else {
            "AAC"
        }
    }
}
