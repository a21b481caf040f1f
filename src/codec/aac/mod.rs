//! AAC: ADTS framing and MPEG-4 AudioSpecificConfig.

pub mod parser;
pub mod types;

pub use parser::{parse_adts_header, parse_audio_specific_config};
pub use types::{ADTSHeader, AudioSpecificConfig, ProfileType};
