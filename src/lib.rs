#![doc(html_root_url = "https://docs.rs/tsdemux/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::missing_crate_level_docs)]

//! # tsdemux - MPEG transport stream demuxer
//!
//! `tsdemux` pulls elementary streams out of MPEG-2 transport streams, as
//! found in HLS segments and broadcast captures, and describes them well
//! enough to configure a decoder.
//!
//! ## Features
//!
//! ### Transport Stream
//! - TS packet and adaptation field parsing, PCR extraction
//! - PAT, PMT and DVB SDT with CRC-32 verification
//! - Per-PID continuity tracking, section and PES reassembly
//! - Init segments carrying the program tables of a fragmented stream
//!
//! ### Elementary Streams
//! - H.264/AVC and H.265/HEVC access units split on access unit delimiters
//! - AAC in ADTS framing
//! - MPEG-1/2 audio
//! - Codec descriptions from SPS, AudioSpecificConfig and MPEG audio headers
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tsdemux = "0.1.0"
//! ```
//!
//! ### Demuxing a File
//!
//! ```rust,no_run
//! use std::fs::File;
//! use tsdemux::config::{ParserConfig, SourceInfo};
//! use tsdemux::format::reader::ReadAdapter;
//! use tsdemux::format::ts::{ParseState, TsDemuxer};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut reader = ReadAdapter::new(File::open("input.ts")?);
//!     let mut demuxer = TsDemuxer::new();
//!     demuxer.begin_parsing(SourceInfo::new(ParserConfig::load()?));
//!
//!     loop {
//!         match demuxer.parse(&mut reader) {
//!             ParseState::NewProgram => demuxer.select_program_streams(Some(1), &[256, 257]),
//!             ParseState::HavePESPacket => {
//!                 while let Some(pes) = demuxer.get_pes_packet() {
//!                     let mut frames = Vec::new();
//!                     demuxer.parse_pes_packet(&mut frames, &pes);
//!                     for frame in &frames {
//!                         if let Some(info) = TsDemuxer::parse_csd(frame) {
//!                             println!("{} {}", info.mime_type, info.codec_specifier_rfc6381);
//!                         }
//!                     }
//!                 }
//!             }
//!             ParseState::Continue => {}
//!             ParseState::EOS => break,
//!             ParseState::Failed | ParseState::ReadError => {
//!                 return Err(format!("{:?}", demuxer.last_error()).into());
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - `av`: Elementary stream packets and codec descriptions
//!
//! - `codec`: Bitstream parsers
//!   - H.264/AVC and H.265/HEVC sequence parameter sets
//!   - AAC ADTS headers and AudioSpecificConfig
//!   - MPEG audio frame headers
//!   - Annex-B NAL unit scanning
//!
//! - `format`: Byte sources and the transport stream demuxer
//!
//! - `error`: Error type and `Result` alias
//!
//! - `utils`: Bit reading/writing and CRC calculations
//!
/// Elementary stream packets and codec descriptions
pub mod av;

/// Codec bitstream and configuration parsers
pub mod codec;

/// Error types and utilities
pub mod error;

/// Byte sources and the transport stream demuxer
pub mod format;

/// Common utilities and helper functions
pub mod utils;

/// Configuration module
pub mod config;

pub use error::{DemuxError, Result};
