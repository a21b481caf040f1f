//! # H.264/AVC
//!
//! NAL unit classification and sequence parameter set parsing.
//!
//! ```rust
//! use tsdemux::codec::h264::{nal_unit_type, NAL_SPS};
//!
//! assert_eq!(nal_unit_type(0x67), NAL_SPS);
//! ```

/// SPS parsing
pub mod parser;
/// NAL unit and SPS types
pub mod types;

#[doc(inline)]
pub use parser::*;
#[doc(inline)]
pub use types::*;
