//! # H.265/HEVC
//!
//! NAL unit classification, profile_tier_level and sequence parameter set
//! parsing, and the `hvc1` codec string.
//!
//! ```rust
//! use tsdemux::codec::h265::{is_irap, nal_unit_type};
//!
//! // IDR_W_RADL
//! assert!(is_irap(nal_unit_type(0x26)));
//! ```

/// SPS and profile_tier_level parsing
pub mod parser;
/// NAL unit and SPS types
pub mod types;


pub use parser::*;
pub use types::*;
