//! # Utility Functions and Types
//!
//! Bit-level reading/writing and the MPEG-2 CRC used by PSI sections.
//!
//! ## Bit Operations
//!
//! ```rust
//! use tsdemux::utils::BitReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = vec![0b10110011u8];
//! let mut reader = BitReader::new(&data);
//!
//! // Read specific number of bits
//! let value = reader.read_bits(3)?; // Reads first 3 bits (101)
//! assert_eq!(value, 0b101);
//! # Ok(())
//! # }
//! ```
//!
//! ## CRC Calculation
//!
//! ```rust
//! use tsdemux::utils::Crc32Mpeg2;
//!
//! # fn main() {
//! let crc = Crc32Mpeg2::new().calculate(b"Hello, world!");
//! println!("CRC32: {:08x}", crc);
//! # }
//! ```

/// Bitstream reader and writer
pub mod bits;

/// CRC calculation implementations
pub mod crc;

// Re-export commonly used types
pub use bits::{BitReader, BitWriter};
pub use crc::Crc32Mpeg2;
