/// Byte sources for the demuxer
pub mod reader;
/// MPEG transport stream demuxing
pub mod ts;

pub use self::reader::{DataReader, ReadAdapter, SliceReader};
pub use self::ts::{ParseState, TsDemuxer};
