//! Codec configuration parsers: bitstream headers and decoder configuration
//! records for the codecs carried in transport streams.

pub mod aac;
pub mod annexb;
pub mod es_descriptor;
pub mod h264;
pub mod h265;
pub mod mpeg_audio;

#[cfg(test)]
pub(crate) mod test_streams;

pub use annexb::{parse_bitstream_for_nalus, NaluInfo};
pub use es_descriptor::{parse_es_descriptor, EsDescriptor};
