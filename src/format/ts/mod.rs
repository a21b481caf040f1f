//! # MPEG Transport Stream (TS) Demuxing
//!
//! This module implements the receive side of ISO/IEC 13818-1 transport
//! streams:
//!
//! - TS packet and adaptation field parsing
//! - Program Specific Information (PAT, PMT) and the DVB SDT
//! - Per-PID section and PES reassembly with continuity tracking
//! - Access unit extraction for ADTS AAC, MPEG audio, H.264 and H.265
//!
//! ## Example Usage
//!
//! ```rust
//! use tsdemux::config::SourceInfo;
//! use tsdemux::format::reader::SliceReader;
//! use tsdemux::format::ts::{ParseState, PesPacketResult, TsDemuxer};
//!
//! # fn demux(stream: Vec<u8>) {
//! let mut demuxer = TsDemuxer::new();
//! demuxer.begin_parsing(SourceInfo::default());
//! let mut reader = SliceReader::new(stream);
//!
//! loop {
//!     match demuxer.parse(&mut reader) {
//!         ParseState::Continue => {}
//!         ParseState::NewProgram => {
//!             // enable every stream of the first program
//!             let table = demuxer.current_program_table().cloned().unwrap_or_default();
//!             if let Some((number, program)) = table.iter().next() {
//!                 let pids: Vec<u16> = program.streams.keys().copied().collect();
//!                 demuxer.select_program_streams(Some(*number), &pids);
//!             }
//!         }
//!         ParseState::HavePESPacket => {
//!             while let Some(pes) = demuxer.get_pes_packet() {
//!                 let mut frames = Vec::new();
//!                 if demuxer.parse_pes_packet(&mut frames, &pes) == PesPacketResult::Ok {
//!                     for frame in frames {
//!                         println!("PID {} pts {:?} {} bytes", pes.pid, frame.pts, frame.data.len());
//!                     }
//!                 }
//!             }
//!         }
//!         _ => break,
//!     }
//! }
//! # }
//! ```

/// Session state machine
pub mod demuxer;
/// Access unit extraction from PES payloads
pub mod extract;
/// TS packet parsing
pub mod parser;
/// PES header parsing
pub mod pes;
/// Per-PID reassembly
pub mod pid_stream;
/// PSI and SDT tables
pub mod psi;
/// Constants and header types
pub mod types;

pub use demuxer::{ParseState, ProgramTable, TsDemuxer};
pub use parser::TSPacket;
pub use pes::{PESHeader, PesData, PesPacketResult};
pub use psi::{ProgramAssociation, ProgramMap, ProgramStreamInfo, ServiceDescription};
pub use types::*;
